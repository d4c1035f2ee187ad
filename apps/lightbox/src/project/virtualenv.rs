//! Optional interpreter environment provisioning through `pyenv`.
//!
//! Nothing in here can fail generation. Every problem (no `pyenv`, no
//! `pyenv-virtualenv` plugin, the requested Python not installed, the
//! environment command failing) ends as [`EnvironmentOutcome::Skipped`]
//! with a reason the caller prints as a warning.

use crate::process::{CommandRunner, ToolOutcome};
use std::path::Path;

/// Marker file read by `pyenv` to auto-activate an environment.
pub const PYTHON_VERSION_FILE: &str = ".python-version";

/// Result of trying to provision an environment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EnvironmentOutcome {
    /// A new environment was created from the given interpreter version.
    Created { name: String, python: String },
    /// An environment of that name already existed and was reused.
    AlreadyExists { name: String },
    /// Provisioning did not happen.
    Skipped { reason: String },
}

impl EnvironmentOutcome {
    /// Whether the environment exists and the marker file was written.
    #[must_use]
    pub fn is_ready(&self) -> bool {
        !matches!(self, Self::Skipped { .. })
    }

    fn skipped(reason: impl Into<String>) -> Self {
        Self::Skipped {
            reason: reason.into(),
        }
    }
}

/// Creates the `name` environment for Python `requested` and writes the
/// marker file into `root`.
pub fn provision(
    runner: &dyn CommandRunner,
    root: &Path,
    name: &str,
    requested: &str,
) -> EnvironmentOutcome {
    if !runner.is_available("pyenv") {
        return EnvironmentOutcome::skipped(
            "pyenv not found. Install pyenv and pyenv-virtualenv to create environments.",
        );
    }

    match runner.run("pyenv", &["commands"], root) {
        ToolOutcome::Success { stdout, .. } => {
            if !stdout.lines().any(|line| line.trim() == "virtualenv") {
                return EnvironmentOutcome::skipped(
                    "pyenv-virtualenv plugin not installed. Skipping environment creation.",
                );
            }
        }
        ToolOutcome::Missing => return EnvironmentOutcome::skipped("pyenv not found."),
        ToolOutcome::Failed { stderr, .. } => {
            return EnvironmentOutcome::skipped(format!("could not list pyenv commands: {stderr}"));
        }
    }

    let installed = match runner.run("pyenv", &["versions", "--bare"], root) {
        ToolOutcome::Success { stdout, .. } => stdout,
        other => {
            return EnvironmentOutcome::skipped(format!(
                "could not list installed Python versions: {}",
                other.stderr()
            ));
        }
    };

    let Some(python) = select_installed_version(&installed, requested) else {
        return EnvironmentOutcome::skipped(format!(
            "Python {requested} is not installed. Run 'pyenv install {requested}' and create the environment manually."
        ));
    };

    let outcome = match runner.run("pyenv", &["virtualenv", &python, name], root) {
        ToolOutcome::Success { .. } => EnvironmentOutcome::Created {
            name: name.to_string(),
            python,
        },
        ToolOutcome::Failed { stderr, .. } if stderr.contains("already exists") => {
            EnvironmentOutcome::AlreadyExists {
                name: name.to_string(),
            }
        }
        ToolOutcome::Failed { stderr, .. } => {
            return EnvironmentOutcome::skipped(format!("pyenv virtualenv failed: {stderr}"));
        }
        ToolOutcome::Missing => return EnvironmentOutcome::skipped("pyenv not found."),
    };

    let marker = root.join(PYTHON_VERSION_FILE);
    if let Err(e) = std::fs::write(&marker, format!("{name}\n")) {
        return EnvironmentOutcome::skipped(format!(
            "environment '{name}' is ready but {} could not be written: {e}",
            marker.display()
        ));
    }

    tracing::info!(environment = name, "interpreter environment ready");
    outcome
}

/// Picks the newest installed interpreter matching `requested`.
///
/// `installed` is the output of `pyenv versions --bare`. Named environments
/// (`3.10.4/envs/foo`, `myenv`) are ignored. An entry matches when it equals
/// `requested` or extends it by further dotted components, so `3.1` does
/// not match `3.10.4`.
#[must_use]
pub fn select_installed_version(installed: &str, requested: &str) -> Option<String> {
    let extended = format!("{requested}.");
    installed
        .lines()
        .map(str::trim)
        .filter(|entry| entry.starts_with(|c: char| c.is_ascii_digit()) && !entry.contains('/'))
        .filter(|entry| *entry == requested || entry.starts_with(&extended))
        .max_by_key(|entry| version_key(entry))
        .map(String::from)
}

/// Numeric sort key for a dotted version; trailing pre-release text in a
/// component is ignored.
fn version_key(version: &str) -> Vec<u64> {
    version
        .split('.')
        .map(|part| {
            let digits: String = part.chars().take_while(char::is_ascii_digit).collect();
            digits.parse().unwrap_or(0)
        })
        .collect()
}
