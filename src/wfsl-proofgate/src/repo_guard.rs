//! Repository hygiene checks run before a manifest is verified.
//!
//! Each check runs only when the manifest's `repoGuard` block enables it.
//! All paths and git queries are anchored at the manifest directory.

use std::fmt;
use std::path::Path;
use std::process::{Command, Stdio};

use serde::Serialize;
use serde_json::{Map, Value};
use tracing::{debug, instrument, warn};

use crate::error::ProofgateError;
use crate::manifest::{LoadedManifest, RepoGuardPolicy};

/// Mismatches listed individually before the rest are summarized.
pub const MAX_REPORTED_MISMATCHES: usize = 25;

const DEPENDENCY_GROUPS: [&str; 3] = ["dependencies", "devDependencies", "optionalDependencies"];

/// Overall repository state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RepoState {
    /// No violations.
    Valid,
    /// At least one violation.
    Invalid,
}

/// Lockfile check outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LockfileStatus {
    /// Every declared dependency matches the lockfile root.
    InSync,
    /// Files missing or versions disagree.
    OutOfSync,
    /// Check not enabled.
    NotRequired,
}

/// `.gitignore` check outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum GitignoreStatus {
    /// Present and tracked.
    Tracked,
    /// Not present.
    Missing,
    /// Present but not tracked.
    Untracked,
    /// Check not enabled.
    NotRequired,
}

/// Build output check outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BuildOutputStatus {
    /// Output is not tracked.
    Ignored,
    /// Output is tracked, or is declared as tracked.
    Tracked,
    /// Check not enabled.
    NotRequired,
}

macro_rules! display_as_json_name {
    ($($ty:ty => { $($variant:ident = $name:literal),+ $(,)? })+) => {
        $(
            impl fmt::Display for $ty {
                fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                    f.write_str(match self {
                        $(Self::$variant => $name,)+
                    })
                }
            }
        )+
    };
}

display_as_json_name! {
    RepoState => { Valid = "VALID", Invalid = "INVALID" }
    LockfileStatus => { InSync = "IN_SYNC", OutOfSync = "OUT_OF_SYNC", NotRequired = "NOT_REQUIRED" }
    GitignoreStatus => {
        Tracked = "TRACKED",
        Missing = "MISSING",
        Untracked = "UNTRACKED",
        NotRequired = "NOT_REQUIRED",
    }
    BuildOutputStatus => { Ignored = "IGNORED", Tracked = "TRACKED", NotRequired = "NOT_REQUIRED" }
}

/// Result of running the repo guard.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RepoGuardVerdict {
    /// `Invalid` exactly when `violations` is non-empty.
    pub repo_state: RepoState,
    /// Lockfile status.
    pub lockfile: LockfileStatus,
    /// `.gitignore` status.
    pub gitignore: GitignoreStatus,
    /// Build output status.
    pub build_output: BuildOutputStatus,
    /// Human-readable violations, in check order.
    pub violations: Vec<String>,
}

impl RepoGuardVerdict {
    /// Verdict for a manifest without a `repoGuard` block.
    pub fn not_required() -> Self {
        Self {
            repo_state: RepoState::Valid,
            lockfile: LockfileStatus::NotRequired,
            gitignore: GitignoreStatus::NotRequired,
            build_output: BuildOutputStatus::NotRequired,
            violations: Vec::new(),
        }
    }

    /// Whether the repository passed.
    pub fn is_valid(&self) -> bool {
        self.repo_state == RepoState::Valid
    }

    /// Multi-line text form used by `status`.
    pub fn to_text(&self) -> String {
        let mut lines = vec![
            format!("repoState: {}", self.repo_state),
            format!("lockfile: {}", self.lockfile),
            format!("gitignore: {}", self.gitignore),
            format!("buildOutput: {}", self.build_output),
        ];
        if self.violations.is_empty() {
            lines.push("violations: none".to_string());
        } else {
            lines.push("violations:".to_string());
            lines.extend(self.violations.iter().map(|v| format!("- {v}")));
        }
        lines.join("\n")
    }
}

/// Git tracking queries.
pub trait GitProbe {
    /// Whether exactly `path` is tracked in the repository at `repo_dir`.
    fn is_tracked(&self, repo_dir: &Path, path: &str) -> bool;

    /// Whether any tracked file matches `pathspec`.
    fn tracks_any(&self, repo_dir: &Path, pathspec: &str) -> bool;
}

/// [`GitProbe`] that shells out to `git ls-files`.
///
/// A git that cannot be started, or fails, reports nothing tracked.
#[derive(Debug, Clone, Default)]
pub struct GitCli;

impl GitCli {
    fn ls_files(repo_dir: &Path, args: &[&str]) -> Option<String> {
        let output = Command::new("git")
            .arg("ls-files")
            .args(args)
            .current_dir(repo_dir)
            .stdin(Stdio::null())
            .stderr(Stdio::null())
            .output();

        match output {
            Ok(out) if out.status.success() => {
                Some(String::from_utf8_lossy(&out.stdout).trim().to_string())
            },
            Ok(out) => {
                debug!(status = ?out.status.code(), ?args, "git ls-files failed");
                None
            },
            Err(e) => {
                warn!(error = %e, "Unable to run git");
                None
            },
        }
    }
}

impl GitProbe for GitCli {
    fn is_tracked(&self, repo_dir: &Path, path: &str) -> bool {
        Self::ls_files(repo_dir, &["--error-unmatch", "--", path]).is_some()
    }

    fn tracks_any(&self, repo_dir: &Path, pathspec: &str) -> bool {
        Self::ls_files(repo_dir, &["--", pathspec]).is_some_and(|out| !out.is_empty())
    }
}

/// Run every enabled check for `loaded`.
#[instrument(skip_all, fields(manifest = %loaded.path.display()))]
pub fn run_repo_guard(
    loaded: &LoadedManifest,
    git: &dyn GitProbe,
) -> Result<RepoGuardVerdict, ProofgateError> {
    let Some(policy) = loaded.manifest.repo_guard.as_ref() else {
        return Ok(RepoGuardVerdict::not_required());
    };
    evaluate(policy, &loaded.base_dir, git)
}

/// Run the checks of `policy` against the repository at `base_dir`.
pub fn evaluate(
    policy: &RepoGuardPolicy,
    base_dir: &Path,
    git: &dyn GitProbe,
) -> Result<RepoGuardVerdict, ProofgateError> {
    let mut violations = Vec::new();

    let gitignore = if policy.requires_gitignore() {
        if !base_dir.join(".gitignore").exists() {
            violations.push(".gitignore missing".to_string());
            GitignoreStatus::Missing
        } else if git.is_tracked(base_dir, ".gitignore") {
            GitignoreStatus::Tracked
        } else {
            violations.push(".gitignore exists but is not tracked".to_string());
            GitignoreStatus::Untracked
        }
    } else {
        GitignoreStatus::NotRequired
    };

    let lockfile = if policy.requires_lockfile() {
        check_lockfile(base_dir, &mut violations)?
    } else {
        LockfileStatus::NotRequired
    };

    let build_output = match policy.build_expectation() {
        Some((output, false)) => {
            if git.tracks_any(base_dir, output) {
                violations.push(format!("build output '{output}' is tracked but must be ignored"));
                BuildOutputStatus::Tracked
            } else {
                BuildOutputStatus::Ignored
            }
        },
        // Declared as tracked: reported as such without consulting git.
        Some((_, true)) => BuildOutputStatus::Tracked,
        None => BuildOutputStatus::NotRequired,
    };

    let repo_state = if violations.is_empty() {
        RepoState::Valid
    } else {
        warn!(count = violations.len(), "Repo guard violations");
        RepoState::Invalid
    };

    Ok(RepoGuardVerdict {
        repo_state,
        lockfile,
        gitignore,
        build_output,
        violations,
    })
}

fn check_lockfile(
    base_dir: &Path,
    violations: &mut Vec<String>,
) -> Result<LockfileStatus, ProofgateError> {
    let pkg_path = base_dir.join("package.json");
    let lock_path = base_dir.join("package-lock.json");

    if !pkg_path.exists() || !lock_path.exists() {
        violations.push("package.json or package-lock.json missing".to_string());
        return Ok(LockfileStatus::OutOfSync);
    }

    let pkg = read_json(&pkg_path, "package.json")?;
    let lock = read_json(&lock_path, "package-lock.json")?;
    let mismatches = compare_lockfile(&pkg, &lock);

    if mismatches.is_empty() {
        return Ok(LockfileStatus::InSync);
    }

    violations.extend(
        mismatches
            .iter()
            .take(MAX_REPORTED_MISMATCHES)
            .map(|m| format!("lockfile mismatch: {m}")),
    );
    if mismatches.len() > MAX_REPORTED_MISMATCHES {
        violations.push(format!(
            "lockfile mismatch: +{} more",
            mismatches.len() - MAX_REPORTED_MISMATCHES
        ));
    }
    Ok(LockfileStatus::OutOfSync)
}

fn read_json(path: &Path, label: &str) -> Result<Value, ProofgateError> {
    let raw = std::fs::read(path).map_err(|_| ProofgateError::not_found(label, path))?;
    serde_json::from_slice(&raw).map_err(|e| ProofgateError::parse(label, e))
}

/// Compare declared dependencies in `package.json` with the root package
/// entry (`packages[""]`) of `package-lock.json`.
///
/// Returns one message per mismatch, in declaration order.
pub fn compare_lockfile(package_json: &Value, lockfile: &Value) -> Vec<String> {
    let empty = Map::new();
    let lock_root = lockfile.get("packages").and_then(|p| p.get(""));

    let mut mismatches = Vec::new();
    for group in DEPENDENCY_GROUPS {
        let declared = package_json
            .get(group)
            .and_then(Value::as_object)
            .unwrap_or(&empty);
        let locked = lock_root
            .and_then(|root| root.get(group))
            .and_then(Value::as_object)
            .unwrap_or(&empty);

        for (name, version) in declared {
            let version = display_value(version);
            match locked.get(name).and_then(Value::as_str) {
                None => mismatches.push(format!("{group}: '{name}' missing in lockfile root")),
                Some(lv) if lv.trim() != version.trim() => mismatches.push(format!(
                    "{group}: '{name}' package.json={version} lockfile={lv}"
                )),
                Some(_) => {},
            }
        }
    }
    mismatches
}

fn display_value(v: &Value) -> String {
    match v {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
