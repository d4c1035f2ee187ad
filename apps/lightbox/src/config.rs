//! User configuration.
//!
//! An optional TOML file supplies default option values and submodule
//! source overrides:
//!
//! ```toml
//! [default_context]
//! author = "Jane Doe"
//! author_email = "jane@example.com"
//! use_wandb = "no"
//!
//! [sources]
//! LightningReflow = "/srv/mirrors/Reflow.git"
//! ```
//!
//! The file is looked up at `--config <path>`, then `$LIGHTBOX_CONFIG`, then
//! `<config dir>/lightbox/config.toml`. An explicitly named file must exist;
//! the default location is optional. Source overrides from the environment
//! (`LIGHTBOX_SOURCE_<NAME>`) win over the file.

use crate::errors::LightboxError;
use crate::project::options::OptionOverrides;
use crate::project::submodule::{Submodule, SubmoduleSources};
use anyhow::{Context, Result};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Environment variable naming the config file.
pub const CONFIG_ENV: &str = "LIGHTBOX_CONFIG";

/// Contents of a config file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ConfigFile {
    #[serde(default)]
    pub default_context: OptionOverrides,
    #[serde(default)]
    pub sources: BTreeMap<String, String>,
}

impl ConfigFile {
    /// Parses config file content. `path` is only used for messages.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if the content is not valid TOML of the
    /// expected shape.
    pub fn parse(content: &str, path: &Path) -> Result<Self, LightboxError> {
        toml::from_str(content)
            .map_err(|e| LightboxError::config_error(path.to_path_buf(), e.to_string()))
    }

    /// Reads and parses the config file at `path`.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        Ok(Self::parse(&content, path)?)
    }

    /// Converts the `[sources]` table into submodule source overrides.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` for a name that is not a known submodule.
    pub fn submodule_sources(&self, path: &Path) -> Result<SubmoduleSources, LightboxError> {
        let mut sources = SubmoduleSources::default();
        for (name, source) in &self.sources {
            let submodule = Submodule::from_name(name).ok_or_else(|| {
                LightboxError::config_error(
                    path.to_path_buf(),
                    format!("unknown submodule '{name}' in [sources]"),
                )
            })?;
            sources.set(submodule, source.clone());
        }
        Ok(sources)
    }
}

/// Everything the configuration layer contributes to a run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Settings {
    /// Option values from the config file, below command-line flags.
    pub defaults: OptionOverrides,
    /// Effective submodule sources.
    pub sources: SubmoduleSources,
    /// The config file that was read, if any.
    pub path: Option<PathBuf>,
}

impl Settings {
    /// Loads settings from the config file and the process environment.
    ///
    /// # Errors
    ///
    /// Returns an error if an explicitly requested config file is missing or
    /// any config file is invalid.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        let env_path = std::env::var_os(CONFIG_ENV).map(PathBuf::from);
        let default_path = dirs::config_dir().map(|dir| dir.join("lightbox").join("config.toml"));

        let mut settings = match locate(explicit, env_path, default_path) {
            Some(path) => {
                tracing::debug!(path = %path.display(), "loading config file");
                let file = ConfigFile::load(&path)?;
                Self {
                    defaults: file.default_context.clone(),
                    sources: file.submodule_sources(&path)?,
                    path: Some(path),
                }
            }
            None => Self::default(),
        };

        apply_source_env(&mut settings.sources, |var| std::env::var(var).ok());
        Ok(settings)
    }
}

/// Picks the config file to read.
///
/// Explicit and environment paths are returned even if missing so that
/// reading them fails loudly; the default path only if it exists.
fn locate(
    explicit: Option<&Path>,
    env_path: Option<PathBuf>,
    default_path: Option<PathBuf>,
) -> Option<PathBuf> {
    explicit
        .map(Path::to_path_buf)
        .or(env_path)
        .or_else(|| default_path.filter(|path| path.is_file()))
}

/// Applies `LIGHTBOX_SOURCE_<NAME>` overrides read through `lookup`.
pub fn apply_source_env(sources: &mut SubmoduleSources, lookup: impl Fn(&str) -> Option<String>) {
    for submodule in Submodule::ALL {
        let var = submodule.source_env_var();
        if let Some(source) = lookup(&var).filter(|s| !s.trim().is_empty()) {
            tracing::debug!(%submodule, %source, "source overridden from environment");
            sources.set(submodule, source);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::project::options::Toggle;

    #[test]
    fn parses_default_context_and_sources() {
        let content = r#"
[default_context]
author = "Jane Doe"
use_wandb = "no"

[sources]
lightningreflow = "/srv/Reflow.git"
"#;
        let path = Path::new("config.toml");
        let file = ConfigFile::parse(content, path).unwrap();
        assert_eq!(file.default_context.author.as_deref(), Some("Jane Doe"));
        assert_eq!(file.default_context.use_wandb, Some(Toggle::No));

        let sources = file.submodule_sources(path).unwrap();
        assert_eq!(sources.source(Submodule::LightningReflow), "/srv/Reflow.git");
        assert_eq!(
            sources.source(Submodule::DataPorter),
            Submodule::DataPorter.default_source()
        );
    }

    #[test]
    fn empty_file_is_valid() {
        let file = ConfigFile::parse("", Path::new("config.toml")).unwrap();
        assert_eq!(file, ConfigFile::default());
    }

    #[test]
    fn unknown_option_is_rejected() {
        let err = ConfigFile::parse(
            "[default_context]\nuse_gpu = \"yes\"\n",
            Path::new("config.toml"),
        )
        .unwrap_err();
        assert!(matches!(err, LightboxError::ConfigError { .. }));
    }

    #[test]
    fn invalid_toggle_is_rejected() {
        let result = ConfigFile::parse(
            "[default_context]\nuse_hpo = \"maybe\"\n",
            Path::new("config.toml"),
        );
        assert!(result.is_err());
    }

    #[test]
    fn unknown_source_is_rejected() {
        let path = Path::new("config.toml");
        let file = ConfigFile::parse("[sources]\nReflow = \"x\"\n", path).unwrap();
        let err = file.submodule_sources(path).unwrap_err();
        assert!(err.to_string().contains("unknown submodule 'Reflow'"));
    }

    #[test]
    fn load_reports_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = ConfigFile::load(&dir.path().join("missing.toml")).unwrap_err();
        assert!(err.to_string().contains("Failed to read config file"));
    }

    #[test]
    fn explicit_path_wins_and_default_must_exist() {
        let dir = tempfile::tempdir().unwrap();
        let explicit = dir.path().join("explicit.toml");
        let from_env = dir.path().join("env.toml");
        let default = dir.path().join("default.toml");

        assert_eq!(
            locate(Some(&explicit), Some(from_env.clone()), Some(default.clone())),
            Some(explicit)
        );
        assert_eq!(
            locate(None, Some(from_env.clone()), Some(default.clone())),
            Some(from_env)
        );
        assert_eq!(locate(None, None, Some(default.clone())), None);

        std::fs::write(&default, "").unwrap();
        assert_eq!(locate(None, None, Some(default.clone())), Some(default));
    }

    #[test]
    fn environment_overrides_sources() {
        let mut sources = SubmoduleSources::default();
        sources.set(Submodule::LightningTune, "/from/config");
        apply_source_env(&mut sources, |var| match var {
            "LIGHTBOX_SOURCE_LIGHTNINGTUNE" => Some("/from/env".to_string()),
            "LIGHTBOX_SOURCE_DATAPORTER" => Some("  ".to_string()),
            _ => None,
        });

        assert_eq!(sources.source(Submodule::LightningTune), "/from/env");
        assert_eq!(
            sources.source(Submodule::DataPorter),
            Submodule::DataPorter.default_source()
        );
    }
}
