//! Declared generation plan.
//!
//! [`Plan::new`] is a pure function from the option snapshot to the facts a
//! finished project must satisfy: which submodules are registered, which
//! option-owned artifacts exist, whether the configuration carries a logger
//! section, and whether an interpreter environment is provisioned. The hook
//! reconciles the filesystem against these facts and the verifier checks
//! them; neither re-derives anything from the raw options.

use crate::project::options::ProjectOptions;
use crate::project::submodule::{Submodule, SubmoduleRecord, SubmoduleSources};
use serde::Serialize;

/// A generation feature controlled by a toggle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Feature {
    Hpo,
    Wandb,
    DataPorter,
    Virtualenv,
}

impl Feature {
    /// The option key owning this feature.
    #[must_use]
    pub const fn option_name(self) -> &'static str {
        match self {
            Self::Hpo => "use_hpo",
            Self::Wandb => "use_wandb",
            Self::DataPorter => "use_dataporter",
            Self::Virtualenv => "create_virtualenv",
        }
    }

    #[must_use]
    pub const fn is_enabled(self, options: &ProjectOptions) -> bool {
        match self {
            Self::Hpo => options.use_hpo.is_enabled(),
            Self::Wandb => options.use_wandb.is_enabled(),
            Self::DataPorter => options.use_dataporter.is_enabled(),
            Self::Virtualenv => options.create_virtualenv.is_enabled(),
        }
    }
}

impl Submodule {
    /// The feature that owns an optional submodule; `None` when required.
    #[must_use]
    pub const fn owner(self) -> Option<Feature> {
        match self {
            Self::LightningReflow => None,
            Self::LightningTune => Some(Feature::Hpo),
            Self::DataPorter => Some(Feature::DataPorter),
        }
    }
}

/// Whether an artifact is a single file or a directory subtree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ArtifactKind {
    File,
    Directory,
}

/// Presence decision for one submodule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SubmoduleDecision {
    #[serde(flatten)]
    pub record: SubmoduleRecord,
    pub required: bool,
    pub present: bool,
}

/// Presence decision for one option-owned artifact.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ArtifactDecision {
    /// Path relative to the project root, `/`-separated.
    pub path: String,
    pub kind: ArtifactKind,
    pub owner: Feature,
    pub present: bool,
}

/// The complete set of option-derived facts for one project.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Plan {
    pub project_slug: String,
    pub submodules: Vec<SubmoduleDecision>,
    pub artifacts: Vec<ArtifactDecision>,
    /// Whether `trainer.logger` must appear in the model config.
    pub logger_section: bool,
    /// Name of the interpreter environment to provision, if any.
    pub virtualenv: Option<String>,
}

impl Plan {
    /// Derives the plan for `options`, resolving sources from `sources`.
    #[must_use]
    pub fn new(options: &ProjectOptions, sources: &SubmoduleSources) -> Self {
        let submodules = Submodule::ALL
            .into_iter()
            .map(|submodule| SubmoduleDecision {
                record: SubmoduleRecord::new(submodule, sources),
                required: submodule.owner().is_none(),
                present: submodule
                    .owner()
                    .is_none_or(|feature| feature.is_enabled(options)),
            })
            .collect();

        let hpo = Feature::Hpo.is_enabled(options);
        let artifacts = hpo_artifacts(options)
            .into_iter()
            .map(|(path, kind)| ArtifactDecision {
                path,
                kind,
                owner: Feature::Hpo,
                present: hpo,
            })
            .collect();

        Self {
            project_slug: options.project_slug.clone(),
            submodules,
            artifacts,
            logger_section: Feature::Wandb.is_enabled(options),
            virtualenv: Feature::Virtualenv
                .is_enabled(options)
                .then(|| options.project_slug.clone()),
        }
    }

    /// Submodules that must be registered, required one first.
    pub fn enabled_submodules(&self) -> impl Iterator<Item = &SubmoduleDecision> {
        self.submodules.iter().filter(|s| s.present)
    }

    /// Artifacts that must be absent from the finished tree.
    pub fn pruned_artifacts(&self) -> impl Iterator<Item = &ArtifactDecision> {
        self.artifacts.iter().filter(|a| !a.present)
    }
}

/// Paths owned by the HPO toggle.
fn hpo_artifacts(options: &ProjectOptions) -> Vec<(String, ArtifactKind)> {
    vec![
        (
            format!("scripts/{}_hpo.py", options.model_name),
            ArtifactKind::File,
        ),
        (
            format!("{}/hpo", options.package_name),
            ArtifactKind::Directory,
        ),
        (String::from("tests/helpers"), ArtifactKind::Directory),
        (
            String::from("tests/test_hpo_search_space.py"),
            ArtifactKind::File,
        ),
    ]
}
