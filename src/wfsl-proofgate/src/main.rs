//! wfsl-proofgate - repo guard and manifest signature verification.
//!
//! ## Usage
//!
//! ```bash
//! # Enforce the repo guard, then verify the manifest signature
//! wfsl-proofgate verify --manifest proof/manifest.json
//!
//! # Ask an external verifier first, falling back to built-in Ed25519
//! wfsl-proofgate verify --manifest proof/manifest.json --verifier wfsl-hsm --verifier-arg --slot=2
//!
//! # Print the repo guard verdict; fail only with --strict
//! wfsl-proofgate status --manifest proof/manifest.json --json --strict
//!
//! # Verify a detached signature without a manifest
//! wfsl-proofgate verify-direct --message dist.tar.gz --signature dist.sig --public-key wfsl.pub
//! ```

use std::path::PathBuf;

use clap::error::ErrorKind as ClapErrorKind;
use clap::{Parser, Subcommand};
use tracing::Level;
use wfsl_proofgate::{
    load_manifest, run_repo_guard, verify_direct, verify_gated, CommandVerifier, ExitCode,
    ExternalVerifier, GitCli, ProofgateError, VerifyOptions,
};

const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Repo guard and manifest signature verification for WFSL releases.
#[derive(Parser)]
#[command(name = "wfsl-proofgate")]
#[command(version = VERSION)]
#[command(about = "Repo guard and manifest signature verification for WFSL releases")]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Verify a manifest (repo guard enforced when configured)
    Verify {
        /// Proof manifest path
        #[arg(long)]
        manifest: PathBuf,

        /// Public key file overriding the manifest
        #[arg(long)]
        public_key: Option<PathBuf>,

        /// External verifier program, run as `<program> [args..] <manifest>`
        #[arg(long)]
        verifier: Option<PathBuf>,

        /// Argument passed to the external verifier before the manifest path
        #[arg(long = "verifier-arg", requires = "verifier", allow_hyphen_values = true)]
        verifier_args: Vec<String>,
    },

    /// Print the repo guard verdict
    Status {
        /// Proof manifest path
        #[arg(long)]
        manifest: PathBuf,

        /// Print the verdict as JSON
        #[arg(long)]
        json: bool,

        /// Exit non-zero when the repository is INVALID
        #[arg(long)]
        strict: bool,
    },

    /// Verify a detached signature without a manifest
    VerifyDirect {
        /// Message file
        #[arg(long)]
        message: PathBuf,

        /// Base64 signature file
        #[arg(long)]
        signature: PathBuf,

        /// Base64 public key file
        #[arg(long)]
        public_key: PathBuf,
    },
}

fn main() {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => {
            let code = match e.kind() {
                ClapErrorKind::DisplayHelp | ClapErrorKind::DisplayVersion => ExitCode::Ok,
                _ => ExitCode::Usage,
            };
            let _ = e.print();
            std::process::exit(code.code());
        },
    };

    // Logs go to stderr; stdout carries the verdict.
    tracing_subscriber::fmt()
        .with_max_level(if cli.verbose { Level::DEBUG } else { Level::WARN })
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let code = match run(cli.command) {
        Ok(code) => code,
        Err(err) => {
            report(&err);
            err.exit_code()
        },
    };
    std::process::exit(code.code());
}

fn report(err: &ProofgateError) {
    match err {
        ProofgateError::RepoGuard(verdict) => {
            let json = serde_json::to_string_pretty(verdict)
                .unwrap_or_else(|_| verdict.to_text());
            eprintln!("REPO_GUARD_FAILED\n{json}");
        },
        other => eprintln!("{other}"),
    }
}

fn run(command: Commands) -> Result<ExitCode, ProofgateError> {
    match command {
        Commands::Verify {
            manifest,
            public_key,
            verifier,
            verifier_args,
        } => {
            let external =
                verifier.map(|program| CommandVerifier::new(program).with_args(verifier_args));
            let options = VerifyOptions {
                public_key_override: public_key,
                external: external.as_ref().map(|v| v as &dyn ExternalVerifier),
            };

            let report = verify_gated(&manifest, &options, &GitCli)?;
            if let Some(failure) = &report.external_failure {
                eprintln!("EXTERNAL_VERIFIER: {failure}; used built-in verification");
            }
            println!("OK: {}", report.result.reason);
            Ok(ExitCode::Ok)
        },

        Commands::Status {
            manifest,
            json,
            strict,
        } => {
            let loaded = load_manifest(&manifest)?;
            let verdict = run_repo_guard(&loaded, &GitCli)?;

            if json {
                let out = serde_json::to_string_pretty(&verdict)
                    .map_err(|e| ProofgateError::Internal(e.to_string()))?;
                println!("{out}");
            } else {
                println!("{}", verdict.to_text());
            }

            if strict && !verdict.is_valid() {
                Ok(ExitCode::VerifyFailed)
            } else {
                Ok(ExitCode::Ok)
            }
        },

        Commands::VerifyDirect {
            message,
            signature,
            public_key,
        } => {
            let result = verify_direct(&message, &signature, &public_key)?;
            if !result.ok {
                return Err(ProofgateError::VerifyFailed {
                    reason: result.reason,
                });
            }
            println!("OK: {}", result.reason);
            Ok(ExitCode::Ok)
        },
    }
}
