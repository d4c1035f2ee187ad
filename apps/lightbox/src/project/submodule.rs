//! External repositories registered as git submodules.
//!
//! Every generated project references `LightningReflow`; `LightningTune`
//! and `DataPorter` are optional. All of them live under `external/`.

use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;

/// Directory that holds every submodule checkout.
pub const EXTERNAL_DIR: &str = "external";

/// Prefix of environment variables that override a submodule source.
pub const SOURCE_ENV_PREFIX: &str = "LIGHTBOX_SOURCE_";

/// The external repositories a project can reference.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub enum Submodule {
    LightningReflow,
    LightningTune,
    DataPorter,
}

impl Submodule {
    pub const ALL: [Self; 3] = [Self::LightningReflow, Self::LightningTune, Self::DataPorter];

    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::LightningReflow => "LightningReflow",
            Self::LightningTune => "LightningTune",
            Self::DataPorter => "DataPorter",
        }
    }

    #[must_use]
    pub const fn default_source(self) -> &'static str {
        match self {
            Self::LightningReflow => "https://github.com/robotic-ai-core/Reflow.git",
            Self::LightningTune => "https://github.com/robotic-ai-core/LightningTune.git",
            Self::DataPorter => "https://github.com/robotic-ai-core/DataPorter.git",
        }
    }

    /// Path of the checkout relative to the project root.
    #[must_use]
    pub fn destination(self) -> String {
        format!("{EXTERNAL_DIR}/{}", self.name())
    }

    /// Environment variable that overrides this submodule's source.
    #[must_use]
    pub fn source_env_var(self) -> String {
        format!("{SOURCE_ENV_PREFIX}{}", self.name().to_ascii_uppercase())
    }

    /// Looks up a submodule by logical name, ignoring ASCII case.
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|s| s.name().eq_ignore_ascii_case(name))
    }
}

impl fmt::Display for Submodule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Where each submodule is fetched from.
///
/// Starts from the built-in URLs; overrides come from the config file and
/// the environment and may be URLs or local paths.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SubmoduleSources {
    overrides: BTreeMap<Submodule, String>,
}

impl SubmoduleSources {
    /// Replaces the source of `submodule`.
    pub fn set(&mut self, submodule: Submodule, source: impl Into<String>) {
        self.overrides.insert(submodule, source.into());
    }

    /// Returns the effective source of `submodule`.
    #[must_use]
    pub fn source(&self, submodule: Submodule) -> &str {
        self.overrides
            .get(&submodule)
            .map_or_else(|| submodule.default_source(), String::as_str)
    }
}

/// A submodule registration: logical name, source and destination.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SubmoduleRecord {
    pub name: String,
    pub source: String,
    pub path: String,
}

impl SubmoduleRecord {
    #[must_use]
    pub fn new(submodule: Submodule, sources: &SubmoduleSources) -> Self {
        Self {
            name: submodule.name().to_string(),
            source: sources.source(submodule).to_string(),
            path: submodule.destination(),
        }
    }
}

/// One `[submodule "..."]` stanza from a `.gitmodules` file.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GitmoduleEntry {
    /// The quoted stanza name, e.g. `external/LightningReflow`.
    pub name: String,
    pub path: Option<String>,
    pub url: Option<String>,
}

impl GitmoduleEntry {
    /// Last path component of the stanza name (`LightningReflow`).
    #[must_use]
    pub fn short_name(&self) -> &str {
        self.name.rsplit('/').next().unwrap_or(&self.name)
    }
}

/// Parses the stanzas of a `.gitmodules` file.
///
/// Only the keys lightbox cares about (`path`, `url`) are kept.
#[must_use]
pub fn parse_gitmodules(content: &str) -> Vec<GitmoduleEntry> {
    let mut entries: Vec<GitmoduleEntry> = Vec::new();

    for line in content.lines().map(str::trim) {
        if let Some(header) = line.strip_prefix("[submodule ") {
            let name = header.trim_end_matches(']').trim().trim_matches('"');
            entries.push(GitmoduleEntry {
                name: name.to_string(),
                ..GitmoduleEntry::default()
            });
            continue;
        }

        let Some(current) = entries.last_mut() else {
            continue;
        };
        let Some((key, value)) = line.split_once('=') else {
            continue;
        };
        let value = value.trim().to_string();
        match key.trim() {
            "path" => current.path = Some(value),
            "url" => current.url = Some(value),
            _ => {}
        }
    }

    entries
}
