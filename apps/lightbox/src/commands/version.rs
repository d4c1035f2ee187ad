//! Version command for the lightbox CLI.
//!
//! Displays version information. In verbose mode, shows the build commit
//! and platform as well.

use anyhow::Result;
use clap::Args;

/// Arguments for the version command.
#[derive(Args)]
pub struct VersionArgs {
    /// Show the build commit and platform as well.
    #[clap(short = 'v', long = "verbose", action = clap::ArgAction::SetTrue)]
    pub verbose: bool,
}

/// Executes the version command.
#[allow(clippy::unnecessary_wraps)]
pub fn execute(args: &VersionArgs) -> Result<()> {
    println!("lightbox {}", env!("CARGO_PKG_VERSION"));
    if args.verbose {
        println!();
        println!("Build Information:");
        println!("  Commit:   {}", git_commit());
        println!("  Platform: {}", platform_string());
    }
    Ok(())
}

/// Returns the git commit hash recorded at build time, or a fallback.
fn git_commit() -> &'static str {
    option_env!("LIGHTBOX_GIT_COMMIT").unwrap_or("unknown")
}

fn platform_string() -> String {
    format!("{}-{}", std::env::consts::OS, std::env::consts::ARCH)
}
