//! Project generation.
//!
//! ## Modules
//!
//! - [`options`] - option layers and the resolved option snapshot
//! - [`submodule`] - external repositories and their sources
//! - [`plan`] - option-derived facts a finished project must satisfy
//! - [`verify`] - invariant checks on the generated tree
//! - [`hook`] - post-generation steps (git, pruning, environment)
//! - [`virtualenv`] - optional `pyenv` environment provisioning

pub mod hook;
pub mod options;
pub mod plan;
pub mod submodule;
pub mod verify;
pub mod virtualenv;

pub use options::{OptionOverrides, ProjectOptions, Toggle};
pub use plan::Plan;
