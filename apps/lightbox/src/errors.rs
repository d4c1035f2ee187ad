//! Error types for the lightbox CLI.
//!
//! `LightboxError` covers the fatal failures of project generation. Advisory
//! failures (a missing `pyenv`, an unreachable submodule source) are never
//! turned into errors; they are reported as warnings and generation goes on.

use std::path::PathBuf;
use thiserror::Error;

/// Consolidated error type for lightbox operations.
#[derive(Debug, Error)]
pub enum LightboxError {
    /// An option value failed validation.
    #[error("invalid option '{option}': {message}")]
    InvalidOption {
        /// Name of the offending option.
        option: String,
        /// Why the value was rejected.
        message: String,
    },

    /// The target project directory is already present.
    #[error(
        "directory '{}' already exists. Choose a different name or delete the existing directory.",
        path.display()
    )]
    DirectoryExists {
        /// The path that already exists.
        path: PathBuf,
    },

    /// A template failed to render.
    #[error("template error in {template}: {message}")]
    TemplateError {
        /// The template path (unrendered).
        template: String,
        /// Description of the render failure.
        message: String,
    },

    /// The rendered tree violates a generation invariant.
    #[error("generated project is inconsistent: {message}")]
    InvariantViolation {
        /// Description of the violated invariant.
        message: String,
    },

    /// A required external tool could not be found.
    #[error("{tool} not found in PATH")]
    ToolNotFound {
        /// The program that was looked up.
        tool: String,
    },

    /// A fatal git step exited with a non-zero code.
    #[error("git {step} failed (exit code {code}): {stderr}")]
    GitFailed {
        /// The git subcommand that failed.
        step: String,
        /// The exit code, or -1 when terminated by a signal.
        code: i32,
        /// Captured standard error, trimmed.
        stderr: String,
    },

    /// The configuration file could not be parsed.
    #[error("config error in {}: {message}", path.display())]
    ConfigError {
        /// The config file path.
        path: PathBuf,
        /// Description of the parse failure.
        message: String,
    },
}

impl LightboxError {
    /// Creates a new `InvalidOption` error.
    #[must_use]
    pub fn invalid_option(option: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidOption {
            option: option.into(),
            message: message.into(),
        }
    }

    /// Creates a new `DirectoryExists` error.
    #[must_use]
    pub fn directory_exists(path: PathBuf) -> Self {
        Self::DirectoryExists { path }
    }

    /// Creates a new `TemplateError`.
    #[must_use]
    pub fn template_error(template: impl Into<String>, message: impl Into<String>) -> Self {
        Self::TemplateError {
            template: template.into(),
            message: message.into(),
        }
    }

    /// Creates a new `InvariantViolation`.
    #[must_use]
    pub fn invariant_violation(message: impl Into<String>) -> Self {
        Self::InvariantViolation {
            message: message.into(),
        }
    }

    /// Creates a new `ToolNotFound` error.
    #[must_use]
    pub fn tool_not_found(tool: impl Into<String>) -> Self {
        Self::ToolNotFound { tool: tool.into() }
    }

    /// Creates a new `GitFailed` error.
    #[must_use]
    pub fn git_failed(step: impl Into<String>, code: i32, stderr: impl Into<String>) -> Self {
        Self::GitFailed {
            step: step.into(),
            code,
            stderr: stderr.into(),
        }
    }

    /// Creates a new `ConfigError`.
    #[must_use]
    pub fn config_error(path: PathBuf, message: impl Into<String>) -> Self {
        Self::ConfigError {
            path,
            message: message.into(),
        }
    }
}
