//! Doctor command for the lightbox CLI.
//!
//! Reports whether the external tools project generation relies on are
//! available.
//!
//! ## Usage
//!
//! ```bash
//! lightbox doctor
//! ```
//!
//! ## Checks Performed
//!
//! - `git` binary (required)
//! - git identity for the initial commit
//! - `pyenv` binary and the `pyenv-virtualenv` plugin (optional)
//! - `python3` interpreter (optional)

use anyhow::Result;
use std::path::Path;

use crate::process::{CommandRunner, SystemRunner, ToolOutcome};

/// Status of a doctor check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DoctorCheckStatus {
    /// Check passed.
    Ok,
    /// Generation works, with reduced functionality.
    Warning,
    /// Generation will fail.
    Error,
}

/// Result of a single doctor check.
#[derive(Debug, Clone)]
pub struct DoctorCheck {
    pub name: String,
    pub status: DoctorCheckStatus,
    pub message: String,
}

impl DoctorCheck {
    #[must_use]
    pub fn ok(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(name, DoctorCheckStatus::Ok, message)
    }

    #[must_use]
    pub fn warning(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(name, DoctorCheckStatus::Warning, message)
    }

    #[must_use]
    pub fn error(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(name, DoctorCheckStatus::Error, message)
    }

    fn new(name: impl Into<String>, status: DoctorCheckStatus, message: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            status,
            message: message.into(),
        }
    }

    /// Returns the CLI prefix for this check status.
    #[must_use]
    pub fn prefix(&self) -> &'static str {
        match self.status {
            DoctorCheckStatus::Ok => "[OK]",
            DoctorCheckStatus::Warning => "[WARN]",
            DoctorCheckStatus::Error => "[FAIL]",
        }
    }
}

/// Executes the doctor command.
///
/// # Errors
///
/// Never fails; failed checks are reported, not returned.
#[allow(clippy::unnecessary_wraps)]
pub fn execute() -> Result<()> {
    println!("Checking lightbox prerequisites...");
    println!();

    let cwd = std::env::current_dir().unwrap_or_else(|_| Path::new(".").to_path_buf());
    let checks = run_all_checks(&SystemRunner, &cwd);

    let mut has_errors = false;
    let mut has_warnings = false;

    for check in &checks {
        println!("  {} {}: {}", check.prefix(), check.name, check.message);
        match check.status {
            DoctorCheckStatus::Ok => {}
            DoctorCheckStatus::Warning => has_warnings = true,
            DoctorCheckStatus::Error => has_errors = true,
        }
    }

    println!();

    if has_errors {
        println!("Some checks failed. Install git before running 'lightbox new'.");
    } else if has_warnings {
        println!("Some warnings were found. Projects can be generated, but optional steps will be skipped.");
    } else {
        println!("All checks passed.");
    }

    Ok(())
}

/// Runs every check through `runner` from `cwd`.
pub fn run_all_checks(runner: &dyn CommandRunner, cwd: &Path) -> Vec<DoctorCheck> {
    let mut checks = vec![check_git(runner, cwd)];
    if checks[0].status == DoctorCheckStatus::Ok {
        checks.push(check_git_identity(runner, cwd));
    }
    checks.push(check_pyenv(runner, cwd));
    checks.push(check_python(runner, cwd));
    checks
}

fn first_line(outcome: &ToolOutcome) -> String {
    outcome
        .stdout()
        .and_then(|out| out.lines().next())
        .unwrap_or_default()
        .trim()
        .to_string()
}

fn check_git(runner: &dyn CommandRunner, cwd: &Path) -> DoctorCheck {
    match runner.run("git", &["--version"], cwd) {
        outcome @ ToolOutcome::Success { .. } => DoctorCheck::ok("git", first_line(&outcome)),
        ToolOutcome::Missing => DoctorCheck::error("git", "Not found in PATH."),
        ToolOutcome::Failed { stderr, .. } => {
            DoctorCheck::error("git", format!("Found but not working: {stderr}"))
        }
    }
}

fn check_git_identity(runner: &dyn CommandRunner, cwd: &Path) -> DoctorCheck {
    let name = first_line(&runner.run("git", &["config", "user.name"], cwd));
    let email = first_line(&runner.run("git", &["config", "user.email"], cwd));

    if name.is_empty() || email.is_empty() {
        DoctorCheck::warning(
            "git identity",
            "user.name or user.email is not set; the initial commit will fail unless GIT_AUTHOR_* is set.",
        )
    } else {
        DoctorCheck::ok("git identity", format!("{name} <{email}>"))
    }
}

fn check_pyenv(runner: &dyn CommandRunner, cwd: &Path) -> DoctorCheck {
    if !runner.is_available("pyenv") {
        return DoctorCheck::warning(
            "pyenv",
            "Not found. --create-virtualenv yes will be skipped.",
        );
    }
    match runner.run("pyenv", &["commands"], cwd) {
        ToolOutcome::Success { stdout, .. }
            if stdout.lines().any(|line| line.trim() == "virtualenv") =>
        {
            DoctorCheck::ok("pyenv", "pyenv-virtualenv plugin installed")
        }
        ToolOutcome::Success { .. } => DoctorCheck::warning(
            "pyenv",
            "pyenv-virtualenv plugin not installed. --create-virtualenv yes will be skipped.",
        ),
        other => DoctorCheck::warning(
            "pyenv",
            format!("Could not list pyenv commands: {}", other.stderr()),
        ),
    }
}

fn check_python(runner: &dyn CommandRunner, cwd: &Path) -> DoctorCheck {
    match runner.run("python3", &["--version"], cwd) {
        outcome @ ToolOutcome::Success { .. } => {
            DoctorCheck::ok("python3", first_line(&outcome))
        }
        _ => DoctorCheck::warning("python3", "Not found in PATH."),
    }
}
