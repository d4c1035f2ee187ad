//! External process invocation.
//!
//! Every external tool lightbox drives (`git`, `pyenv`) goes through a
//! [`CommandRunner`], and every result is classified into a [`ToolOutcome`]:
//! success, the tool being absent, or the tool exiting with an error. Call
//! sites decide whether a non-success outcome is fatal or advisory.

use crate::errors::LightboxError;
use std::path::Path;
use std::process::Command;

/// Classified result of running an external tool.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ToolOutcome {
    /// The tool ran and exited with status 0.
    Success {
        /// Captured standard output.
        stdout: String,
        /// Captured standard error (git reports progress here).
        stderr: String,
    },
    /// The tool is not installed or not in `PATH`.
    Missing,
    /// The tool ran but exited unsuccessfully.
    Failed {
        /// Exit code, or -1 when unavailable (signal, spawn error).
        code: i32,
        /// Captured standard error, trimmed.
        stderr: String,
    },
}

impl ToolOutcome {
    #[must_use]
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success { .. })
    }

    /// Standard output of a successful run.
    #[must_use]
    pub fn stdout(&self) -> Option<&str> {
        match self {
            Self::Success { stdout, .. } => Some(stdout),
            _ => None,
        }
    }

    /// Standard error of the run, empty when the tool was missing.
    #[must_use]
    pub fn stderr(&self) -> &str {
        match self {
            Self::Success { stderr, .. } | Self::Failed { stderr, .. } => stderr,
            Self::Missing => "",
        }
    }

    /// Turns a git outcome into a fatal error unless it succeeded.
    ///
    /// # Errors
    ///
    /// Returns `ToolNotFound` when git is absent and `GitFailed` on a
    /// non-zero exit.
    pub fn require_git(self, step: &str) -> Result<String, LightboxError> {
        match self {
            Self::Success { stdout, .. } => Ok(stdout),
            Self::Missing => Err(LightboxError::tool_not_found("git")),
            Self::Failed { code, stderr } => Err(LightboxError::git_failed(step, code, stderr)),
        }
    }
}

/// Runs external programs on behalf of the hook.
///
/// The hook only talks to the outside world through this trait, which lets
/// tests substitute a scripted runner for `pyenv` and friends.
pub trait CommandRunner {
    /// Runs `program` with `args` in `cwd` and classifies the result.
    fn run(&self, program: &str, args: &[&str], cwd: &Path) -> ToolOutcome;

    /// Returns true if `program` can be found.
    fn is_available(&self, program: &str) -> bool;
}

/// Runner backed by `std::process::Command`.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemRunner;

impl CommandRunner for SystemRunner {
    fn run(&self, program: &str, args: &[&str], cwd: &Path) -> ToolOutcome {
        tracing::debug!(program, ?args, cwd = %cwd.display(), "running external tool");

        let Ok(resolved) = which::which(program) else {
            tracing::debug!(program, "tool not found in PATH");
            return ToolOutcome::Missing;
        };

        let outcome = match Command::new(resolved).args(args).current_dir(cwd).output() {
            Ok(output) if output.status.success() => ToolOutcome::Success {
                stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
                stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
            },
            Ok(output) => ToolOutcome::Failed {
                code: output.status.code().unwrap_or(-1),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            },
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => ToolOutcome::Missing,
            Err(e) => ToolOutcome::Failed {
                code: -1,
                stderr: e.to_string(),
            },
        };

        tracing::debug!(program, ?outcome, "external tool finished");
        outcome
    }

    fn is_available(&self, program: &str) -> bool {
        which::which(program).is_ok()
    }
}

/// Formats a command line for progress output.
#[must_use]
pub fn display_command(program: &str, args: &[&str]) -> String {
    std::iter::once(program)
        .chain(args.iter().copied())
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
pub(crate) mod scripted {
    use super::{CommandRunner, ToolOutcome, display_command};
    use std::cell::RefCell;
    use std::collections::HashMap;
    use std::path::Path;

    /// Runner answering from a table keyed by the full command line.
    ///
    /// Commands without an entry get the fallback outcome, which fails
    /// unless the runner was built with [`ScriptedRunner::permissive`].
    pub struct ScriptedRunner {
        available: bool,
        responses: HashMap<String, ToolOutcome>,
        fallback: Option<ToolOutcome>,
        pub calls: RefCell<Vec<String>>,
    }

    impl ScriptedRunner {
        pub fn new(available: bool) -> Self {
            Self {
                available,
                responses: HashMap::new(),
                fallback: None,
                calls: RefCell::new(Vec::new()),
            }
        }

        /// Every unscripted command succeeds with empty output.
        pub fn permissive() -> Self {
            Self {
                fallback: Some(ToolOutcome::Success {
                    stdout: String::new(),
                    stderr: String::new(),
                }),
                ..Self::new(true)
            }
        }

        pub fn respond(mut self, command: &str, outcome: ToolOutcome) -> Self {
            self.responses.insert(command.to_string(), outcome);
            self
        }

        pub fn ok(self, command: &str, stdout: &str) -> Self {
            self.respond(
                command,
                ToolOutcome::Success {
                    stdout: stdout.to_string(),
                    stderr: String::new(),
                },
            )
        }

        pub fn fail(self, command: &str, stderr: &str) -> Self {
            self.respond(
                command,
                ToolOutcome::Failed {
                    code: 1,
                    stderr: stderr.to_string(),
                },
            )
        }

        pub fn calls(&self) -> Vec<String> {
            self.calls.borrow().clone()
        }
    }

    impl CommandRunner for ScriptedRunner {
        fn run(&self, program: &str, args: &[&str], _cwd: &Path) -> ToolOutcome {
            let line = display_command(program, args);
            self.calls.borrow_mut().push(line.clone());
            if let Some(outcome) = self.responses.get(&line) {
                return outcome.clone();
            }
            self.fallback.clone().unwrap_or(ToolOutcome::Failed {
                code: 1,
                stderr: format!("unexpected command: {line}"),
            })
        }

        fn is_available(&self, _program: &str) -> bool {
            self.available
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_program_is_classified_as_missing() {
        let outcome = SystemRunner.run(
            "lightbox-definitely-not-a-real-tool",
            &["--version"],
            Path::new("."),
        );
        assert_eq!(outcome, ToolOutcome::Missing);
        assert!(!SystemRunner.is_available("lightbox-definitely-not-a-real-tool"));
    }

    #[test]
    fn require_git_maps_missing_to_tool_not_found() {
        let err = ToolOutcome::Missing.require_git("init").unwrap_err();
        assert!(matches!(err, LightboxError::ToolNotFound { .. }));
    }

    #[test]
    fn require_git_maps_failure_to_git_failed() {
        let outcome = ToolOutcome::Failed {
            code: 128,
            stderr: "fatal: not a git repository".to_string(),
        };
        let err = outcome.require_git("commit").unwrap_err();
        assert_eq!(
            err.to_string(),
            "git commit failed (exit code 128): fatal: not a git repository"
        );
    }

    #[test]
    fn require_git_returns_stdout_on_success() {
        let outcome = ToolOutcome::Success {
            stdout: "ok\n".to_string(),
            stderr: String::new(),
        };
        assert_eq!(outcome.require_git("init").unwrap(), "ok\n");
    }

    #[test]
    fn stderr_is_empty_for_missing_tool() {
        assert_eq!(ToolOutcome::Missing.stderr(), "");
        assert!(ToolOutcome::Missing.stdout().is_none());
    }

    #[test]
    fn display_command_joins_program_and_args() {
        assert_eq!(
            display_command("git", &["submodule", "add", "url", "external/X"]),
            "git submodule add url external/X"
        );
    }

    #[cfg(unix)]
    #[test]
    fn failing_program_reports_exit_code() {
        if !SystemRunner.is_available("false") {
            return;
        }
        let outcome = SystemRunner.run("false", &[], Path::new("."));
        assert!(matches!(outcome, ToolOutcome::Failed { code: 1, .. }));
    }
}
