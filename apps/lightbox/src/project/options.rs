//! Generation options.
//!
//! A project is generated from a single [`ProjectOptions`] value. It is
//! resolved once from layered [`OptionOverrides`] (built-in defaults, the
//! config file, command-line flags), validated, and then only ever borrowed,
//! so rendering and the post-generation hook cannot observe different
//! option values.
//!
//! ## Derived Names
//!
//! | option         | default                                        |
//! |----------------|------------------------------------------------|
//! | `project_slug` | project name, lowercased, separators as `-`    |
//! | `package_name` | slug with `-` replaced by `_`                  |
//! | `model_name`   | package name                                   |

use crate::errors::LightboxError;
use crate::project::verify::TEMPLATE_MARKERS;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::fmt;

/// Python keywords, which cannot name a package or module.
pub const PYTHON_KEYWORDS: &[&str] = &[
    "False", "None", "True", "and", "as", "assert", "async", "await", "break", "class",
    "continue", "def", "del", "elif", "else", "except", "finally", "for", "from", "global",
    "if", "import", "in", "is", "lambda", "nonlocal", "not", "or", "pass", "raise", "return",
    "try", "while", "with", "yield",
];

/// Names that collide with the generated top-level layout.
pub const RESERVED_NAMES: &[&str] = &["configs", "scripts", "tests", "external", "tmp"];

/// A yes/no generation switch.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum Toggle {
    Yes,
    #[default]
    No,
}

impl Toggle {
    #[must_use]
    pub const fn is_enabled(self) -> bool {
        matches!(self, Self::Yes)
    }
}

impl From<bool> for Toggle {
    fn from(enabled: bool) -> Self {
        if enabled { Self::Yes } else { Self::No }
    }
}

impl fmt::Display for Toggle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Yes => "yes",
            Self::No => "no",
        })
    }
}

/// One layer of option values. Unset fields fall through to lower layers.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct OptionOverrides {
    pub project_slug: Option<String>,
    pub package_name: Option<String>,
    pub model_name: Option<String>,
    pub description: Option<String>,
    pub author: Option<String>,
    pub author_email: Option<String>,
    pub python_version: Option<String>,
    pub pytest_workers: Option<String>,
    pub use_hpo: Option<Toggle>,
    pub use_wandb: Option<Toggle>,
    pub use_dataporter: Option<Toggle>,
    pub create_virtualenv: Option<Toggle>,
}

impl OptionOverrides {
    /// Returns a layer where values set in `upper` win over `self`.
    #[must_use]
    pub fn overlay(self, upper: Self) -> Self {
        Self {
            project_slug: upper.project_slug.or(self.project_slug),
            package_name: upper.package_name.or(self.package_name),
            model_name: upper.model_name.or(self.model_name),
            description: upper.description.or(self.description),
            author: upper.author.or(self.author),
            author_email: upper.author_email.or(self.author_email),
            python_version: upper.python_version.or(self.python_version),
            pytest_workers: upper.pytest_workers.or(self.pytest_workers),
            use_hpo: upper.use_hpo.or(self.use_hpo),
            use_wandb: upper.use_wandb.or(self.use_wandb),
            use_dataporter: upper.use_dataporter.or(self.use_dataporter),
            create_virtualenv: upper.create_virtualenv.or(self.create_virtualenv),
        }
    }
}

/// The resolved, validated option snapshot for one generation run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProjectOptions {
    pub project_name: String,
    pub project_slug: String,
    pub package_name: String,
    pub model_name: String,
    pub description: String,
    pub author: String,
    pub author_email: String,
    pub python_version: String,
    pub pytest_workers: String,
    pub use_hpo: Toggle,
    pub use_wandb: Toggle,
    pub use_dataporter: Toggle,
    pub create_virtualenv: Toggle,
}

impl ProjectOptions {
    /// Resolves options for `project_name` from `overrides` on top of the
    /// built-in defaults, then validates the result.
    ///
    /// # Errors
    ///
    /// Returns `InvalidOption` if any resolved value is invalid.
    pub fn resolve(project_name: &str, overrides: OptionOverrides) -> Result<Self, LightboxError> {
        let project_name = project_name.trim();
        if project_name.is_empty() {
            return Err(LightboxError::invalid_option(
                "project_name",
                "must not be empty",
            ));
        }

        let project_slug = overrides
            .project_slug
            .unwrap_or_else(|| derive_slug(project_name));
        let package_name = overrides
            .package_name
            .unwrap_or_else(|| project_slug.replace('-', "_"));
        let model_name = overrides
            .model_name
            .unwrap_or_else(|| package_name.clone());

        let options = Self {
            project_name: project_name.to_string(),
            project_slug,
            package_name,
            model_name,
            description: overrides
                .description
                .unwrap_or_else(|| String::from("A LightningReflow machine-learning project")),
            author: overrides.author.unwrap_or_else(|| String::from("Your Name")),
            author_email: overrides
                .author_email
                .unwrap_or_else(|| String::from("you@example.com")),
            python_version: overrides
                .python_version
                .unwrap_or_else(|| String::from("3.10")),
            pytest_workers: overrides
                .pytest_workers
                .unwrap_or_else(|| String::from("auto")),
            use_hpo: overrides.use_hpo.unwrap_or(Toggle::Yes),
            use_wandb: overrides.use_wandb.unwrap_or(Toggle::Yes),
            use_dataporter: overrides.use_dataporter.unwrap_or(Toggle::No),
            create_virtualenv: overrides.create_virtualenv.unwrap_or(Toggle::No),
        };

        options.validate()?;
        Ok(options)
    }

    fn validate(&self) -> Result<(), LightboxError> {
        validate_slug(&self.project_slug)?;
        validate_identifier("package_name", &self.package_name)?;
        validate_identifier("model_name", &self.model_name)?;
        validate_python_version(&self.python_version)?;
        validate_pytest_workers(&self.pytest_workers)?;
        // Free text lands inside Python string literals and docstrings.
        for (option, value) in [
            ("project_name", &self.project_name),
            ("description", &self.description),
            ("author", &self.author),
            ("author_email", &self.author_email),
        ] {
            validate_free_text(option, value)?;
        }
        Ok(())
    }

    /// Variables exposed to templates.
    #[must_use]
    pub fn template_context(&self) -> serde_json::Value {
        json!({
            "project_name": self.project_name,
            "project_slug": self.project_slug,
            "package_name": self.package_name,
            "model_name": self.model_name,
            "description": self.description,
            "author": self.author,
            "author_email": self.author_email,
            "python_version": self.python_version,
            "python_tag": self.python_version.split('.').take(2).collect::<String>(),
            "pytest_workers": self.pytest_workers,
            "parallel_tests": self.pytest_workers != "0",
            "env_prefix": self.package_name.to_ascii_uppercase(),
            "use_hpo": self.use_hpo.is_enabled(),
            "use_wandb": self.use_wandb.is_enabled(),
            "use_dataporter": self.use_dataporter.is_enabled(),
            "create_virtualenv": self.create_virtualenv.is_enabled(),
        })
    }
}

/// Derives a directory slug from a human-readable project name.
///
/// `"Test ML Project"` becomes `"test-ml-project"`.
#[must_use]
pub fn derive_slug(project_name: &str) -> String {
    let mut slug = String::with_capacity(project_name.len());
    let mut pending_separator = false;
    for c in project_name.chars() {
        if c.is_ascii_alphanumeric() {
            if pending_separator && !slug.is_empty() {
                slug.push('-');
            }
            pending_separator = false;
            slug.push(c.to_ascii_lowercase());
        } else if c.is_whitespace() || c == '_' || c == '-' {
            pending_separator = true;
        }
    }
    slug
}

/// Validates a name used as a Python package or module name.
///
/// # Errors
///
/// Returns `InvalidOption` if the name is not a Python identifier, is a
/// Python keyword, or collides with the generated layout.
pub fn validate_identifier(option: &str, name: &str) -> Result<(), LightboxError> {
    let mut chars = name.chars();
    let Some(first) = chars.next() else {
        return Err(LightboxError::invalid_option(option, "must not be empty"));
    };

    if !(first.is_ascii_alphabetic() || first == '_') {
        return Err(LightboxError::invalid_option(
            option,
            format!("'{name}' must start with a letter or underscore"),
        ));
    }

    if let Some(bad) = chars.find(|c| !(c.is_ascii_alphanumeric() || *c == '_')) {
        return Err(LightboxError::invalid_option(
            option,
            format!("'{name}' contains invalid character '{bad}'"),
        ));
    }

    if PYTHON_KEYWORDS.contains(&name) {
        return Err(LightboxError::invalid_option(
            option,
            format!("'{name}' is a reserved Python keyword"),
        ));
    }

    if RESERVED_NAMES.contains(&name) {
        return Err(LightboxError::invalid_option(
            option,
            format!("'{name}' is reserved by the project layout"),
        ));
    }

    Ok(())
}

fn validate_slug(slug: &str) -> Result<(), LightboxError> {
    if slug.is_empty() {
        return Err(LightboxError::invalid_option(
            "project_slug",
            "must contain at least one letter or digit",
        ));
    }
    if slug.starts_with('.') {
        return Err(LightboxError::invalid_option(
            "project_slug",
            format!("'{slug}' must not start with a dot"),
        ));
    }
    if let Some(bad) = slug
        .chars()
        .find(|c| !(c.is_ascii_lowercase() || c.is_ascii_digit() || matches!(c, '-' | '_' | '.')))
    {
        return Err(LightboxError::invalid_option(
            "project_slug",
            format!("'{slug}' contains invalid character '{bad}'"),
        ));
    }
    Ok(())
}

fn validate_free_text(option: &str, value: &str) -> Result<(), LightboxError> {
    if let Some(bad) = value.chars().find(|c| matches!(c, '"' | '\\' | '\n' | '\r')) {
        return Err(LightboxError::invalid_option(option, format!("must not contain {bad:?}")));
    }
    if let Some(marker) = TEMPLATE_MARKERS.iter().find(|m| value.contains(**m)) {
        return Err(LightboxError::invalid_option(
            option,
            format!("must not contain the template marker '{marker}'"),
        ));
    }
    Ok(())
}

fn validate_python_version(version: &str) -> Result<(), LightboxError> {
    let well_formed = !version.is_empty()
        && version
            .split('.')
            .all(|part| !part.is_empty() && part.chars().all(|c| c.is_ascii_digit()));
    if well_formed {
        Ok(())
    } else {
        Err(LightboxError::invalid_option(
            "python_version",
            format!("'{version}' is not a version like 3.10"),
        ))
    }
}

fn validate_pytest_workers(workers: &str) -> Result<(), LightboxError> {
    if workers == "auto" || workers.parse::<u32>().is_ok() {
        Ok(())
    } else {
        Err(LightboxError::invalid_option(
            "pytest_workers",
            format!("'{workers}' must be 'auto' or a number"),
        ))
    }
}
