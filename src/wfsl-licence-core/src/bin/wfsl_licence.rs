//! wfsl-licence - issue, verify and enforce WFSL entitlement tokens.
//!
//! Keys and the licence token come from the `WFSL_*` environment variables;
//! see [`LicenceConfig::from_env`].
//!
//! ## Usage
//!
//! ```bash
//! # Issue a 30 day Pro token and record it in the issuance log
//! WFSL_SIGNING_KEY_PATH=keys/issuer.pem \
//!     wfsl-licence issue --sub org_123 --plan pro --exp-hours 720 --out token.txt
//!
//! # Check the chain of the issuance log
//! wfsl-licence ledger verify
//!
//! # Gate a Pro operation
//! WFSL_PUBLIC_KEY_PATH=keys/issuer.pub.pem WFSL_LICENCE_TOKEN_FILE=token.txt \
//!     wfsl-licence require --feature evidence-pack
//! ```

use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use serde_json::json;
use tracing::{debug, Level};
use wfsl_licence_core::{
    build, issue, issue_receipt, load_signer, load_verifier, output_hash, verify, Enforcer,
    EntitlementParams, ErrorKind, IssuanceLedger, LicenceConfig, LicenceError, ReceiptRequest,
    SignedReceipt, TokenSource,
};

const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Issue, verify and enforce WFSL entitlement tokens.
#[derive(Parser)]
#[command(name = "wfsl-licence")]
#[command(version = VERSION)]
#[command(about = "Issue, verify and enforce WFSL entitlement tokens")]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Issue a signed entitlement token and record it in the issuance log
    Issue {
        /// Licence subject (organisation or user id)
        #[arg(long)]
        sub: String,

        /// Plan name
        #[arg(long)]
        plan: String,

        /// Validity from now, in hours
        #[arg(long)]
        exp_hours: i64,

        /// Comma-separated feature list
        #[arg(long, value_delimiter = ',')]
        features: Vec<String>,

        /// Policy identifier
        #[arg(long)]
        policy: Option<String>,

        /// Issuer (defaults to "wfsl")
        #[arg(long)]
        iss: Option<String>,

        /// Write the token to this file instead of into the printed summary
        #[arg(long)]
        out: Option<PathBuf>,

        /// Issuance log path
        #[arg(long)]
        log: Option<PathBuf>,
    },

    /// Verify a token and print the resulting authority
    Verify {
        /// Token text
        #[arg(long, conflicts_with = "token_file")]
        token: Option<String>,

        /// File holding the token
        #[arg(long)]
        token_file: Option<PathBuf>,
    },

    /// Require a Pro licence using the configured token and public key
    Require {
        /// Feature that must be enabled
        #[arg(long)]
        feature: Option<String>,
    },

    /// Execution receipts
    #[command(subcommand)]
    Receipt(ReceiptCommands),

    /// Issuance log maintenance
    #[command(subcommand)]
    Ledger(LedgerCommands),
}

#[derive(Subcommand)]
enum ReceiptCommands {
    /// Sign a receipt for a tool output under the configured Pro licence
    Issue {
        /// Tool name
        #[arg(long)]
        tool: String,

        /// Tool version
        #[arg(long)]
        tool_version: String,

        /// File whose contents are the tool output
        #[arg(long)]
        output: PathBuf,

        /// Write the signed receipt to this file instead of stdout
        #[arg(long)]
        out: Option<PathBuf>,
    },

    /// Verify a signed receipt file
    Verify {
        /// Signed receipt JSON
        #[arg(long)]
        receipt: PathBuf,
    },
}

#[derive(Subcommand)]
enum LedgerCommands {
    /// Verify the hash chain of the issuance log
    Verify {
        /// Issuance log path
        #[arg(long)]
        log: Option<PathBuf>,
    },
}

fn main() {
    let cli = Cli::parse();

    // Logs go to stderr; stdout carries tokens and JSON.
    tracing_subscriber::fmt()
        .with_max_level(if cli.verbose { Level::DEBUG } else { Level::WARN })
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let config = LicenceConfig::from_env();

    if let Err(err) = run(cli.command, &config) {
        report(&err, cli.verbose);
        std::process::exit(err.exit_code());
    }
}

fn report(err: &LicenceError, verbose: bool) {
    eprintln!("{err}");
    if verbose {
        eprintln!("  code: {}", err.kind());
        if let Some(detail) = err.detail() {
            eprintln!("  detail: {detail}");
        }
        if let Some(hint) = err.hint() {
            eprintln!("  hint: {hint}");
        }
    }
}

fn run(command: Commands, config: &LicenceConfig) -> Result<(), LicenceError> {
    match command {
        Commands::Issue {
            sub,
            plan,
            exp_hours,
            features,
            policy,
            iss,
            out,
            log,
        } => {
            let signer = load_signer(&config.key_provider())?;
            let expires_at = wfsl_licence_core::entitlement::unix_now()
                .checked_add(exp_hours.saturating_mul(3600))
                .ok_or_else(|| {
                    LicenceError::new(ErrorKind::ConfigError)
                        .with_detail("exp must be a valid epoch seconds number.")
                })?;

            let entitlement = build(&EntitlementParams {
                subject: sub,
                plan,
                features,
                policy,
                expires_at,
                issuer: Some(iss.unwrap_or_else(|| config.issuer.clone())),
            })?;
            let issued = issue(&entitlement, &signer)?;

            let ledger = IssuanceLedger::new(log.unwrap_or_else(|| config.issuance_log.clone()));
            let entry = ledger.append(&entitlement, &issued.token)?;

            let mut summary = json!({
                "jti": entitlement.token_id(),
                "sub": entitlement.subject(),
                "plan": entitlement.plan(),
                "exp": entitlement.expires_at(),
                "entryHash": entry.entry_hash,
            });
            match out {
                Some(path) => {
                    write_file(&path, &format!("{}\n", issued.token))?;
                    summary["out"] = json!(path.display().to_string());
                },
                None => summary["token"] = json!(issued.token),
            }

            print_json(&summary)
        },

        Commands::Verify { token, token_file } => {
            let source = match (token, token_file) {
                (Some(token), _) => TokenSource::Inline(token),
                (None, Some(path)) => TokenSource::File(path),
                (None, None) => config.token_source.clone(),
            };
            let verifier = load_verifier(&config.key_provider())?;
            let authority = verify(&source.load()?, &verifier)?;
            print_json(&authority)
        },

        Commands::Require { feature } => {
            let keys = config.key_provider();
            let authority = Enforcer::from_config(config, &keys).require_pro(feature.as_deref())?;
            debug!(sub = %authority.subject(), "Pro licence accepted");
            print_json(&authority)
        },

        Commands::Receipt(ReceiptCommands::Issue {
            tool,
            tool_version,
            output,
            out,
        }) => {
            let keys = config.key_provider();
            let authority = Enforcer::from_config(config, &keys).require_pro(None)?;
            let signer = load_signer(&keys)?;

            let bytes = std::fs::read(&output).map_err(|e| {
                LicenceError::new(ErrorKind::IoError)
                    .with_detail(format!("Unable to read {}: {e}", output.display()))
            })?;

            let signed = issue_receipt(
                &authority,
                &ReceiptRequest {
                    tool,
                    tool_version,
                    output_hash: output_hash(&bytes),
                },
                &signer,
            )?;

            match out {
                Some(path) => write_file(&path, &to_pretty_json(&signed)?),
                None => print_json(&signed),
            }
        },

        Commands::Receipt(ReceiptCommands::Verify { receipt }) => {
            let raw = std::fs::read_to_string(&receipt).map_err(|e| {
                LicenceError::new(ErrorKind::IoError)
                    .with_detail(format!("Unable to read {}: {e}", receipt.display()))
            })?;
            let signed: SignedReceipt = serde_json::from_str(&raw).map_err(|e| {
                LicenceError::new(ErrorKind::ConfigError)
                    .with_detail(format!("Receipt file is not valid JSON: {e}"))
            })?;

            let verifier = load_verifier(&config.key_provider())?;
            let verified = signed.verify(&verifier)?;
            print_json(&verified)
        },

        Commands::Ledger(LedgerCommands::Verify { log }) => {
            let ledger = IssuanceLedger::new(log.unwrap_or_else(|| config.issuance_log.clone()));
            let report = ledger.verify_chain()?;
            print_json(&report)?;
            if report.valid {
                Ok(())
            } else {
                Err(LicenceError::new(ErrorKind::TamperDetected)
                    .with_detail("Issuance log hash chain is broken."))
            }
        },
    }
}

fn to_pretty_json<T: serde::Serialize>(value: &T) -> Result<String, LicenceError> {
    serde_json::to_string_pretty(value).map_err(|e| {
        LicenceError::new(ErrorKind::InternalError).with_detail(format!("JSON encoding: {e}"))
    })
}

fn print_json<T: serde::Serialize>(value: &T) -> Result<(), LicenceError> {
    println!("{}", to_pretty_json(value)?);
    Ok(())
}

fn write_file(path: &Path, contents: &str) -> Result<(), LicenceError> {
    std::fs::write(path, contents).map_err(|e| {
        LicenceError::new(ErrorKind::IoError)
            .with_detail(format!("Unable to write {}: {e}", path.display()))
    })
}
