//! Command modules for the lightbox CLI.
//!
//! - [`new`] - Generate a project and its repository
//! - [`plan`] - Show what `new` would generate
//! - [`doctor`] - Check external tool prerequisites
//! - [`version`] - Display version information

pub mod doctor;
pub mod new;
pub mod plan;
pub mod version;
