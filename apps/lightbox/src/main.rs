#![warn(clippy::pedantic)]

//! # LightBox project generator
//!
//! The `lightbox` command generates LightningReflow machine-learning
//! projects: a Python package skeleton, YAML model config, training and
//! optional HPO entry points, test scaffolding, and a git repository with
//! the external libraries registered as submodules under `external/`.
//!
//! ## Subcommands
//!
//! - `new` - Generate a project
//! - `plan` - Show what `new` would generate
//! - `doctor` - Check external tool prerequisites
//! - `version` - Display version information
//!
//! ## Examples
//!
//! ```bash
//! lightbox new "Test ML Project"
//! lightbox new "Test ML Project" --use-hpo no --use-wandb no
//! lightbox plan "Test ML Project" --json
//! lightbox -vv new "Test ML Project"
//! ```

mod commands;
mod config;
mod errors;
mod process;
mod project;
mod template;

use anyhow::Result;
use clap::{Parser, Subcommand};
use commands::{doctor, new, plan, version};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

/// Environment variable holding a `tracing` filter directive.
const LOG_ENV: &str = "LIGHTBOX_LOG";

/// LightningReflow project generator.
#[derive(Parser)]
#[command(
    name = "lightbox",
    author,
    version,
    about = "Generate LightningReflow machine-learning projects",
    after_help = "\
ENVIRONMENT VARIABLES:
    LIGHTBOX_CONFIG                   Config file (default: <config dir>/lightbox/config.toml)
    LIGHTBOX_LOG                      Log filter, e.g. 'lightbox=debug'
    LIGHTBOX_SOURCE_LIGHTNINGREFLOW   Source of the LightningReflow submodule
    LIGHTBOX_SOURCE_LIGHTNINGTUNE     Source of the LightningTune submodule
    LIGHTBOX_SOURCE_DATAPORTER        Source of the DataPorter submodule"
)]
pub struct Cli {
    /// Increase log verbosity (-v info, -vv debug).
    #[clap(short = 'v', long = "verbose", action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// The subcommand to execute.
    #[command(subcommand)]
    pub command: Commands,
}

/// Available subcommands for the lightbox CLI.
#[derive(Subcommand)]
pub enum Commands {
    /// Generate a new project.
    ///
    /// Renders the project template into <output-dir>/<project_slug>,
    /// initializes a git repository, registers submodules, removes files of
    /// disabled features, optionally creates a pyenv environment, and makes
    /// the initial commit.
    New(new::NewArgs),

    /// Show what `new` would generate, without touching the filesystem.
    Plan(plan::PlanArgs),

    /// Check that git, pyenv and python3 are available.
    Doctor,

    /// Display version information.
    Version(version::VersionArgs),
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    if let Err(e) = run(&cli) {
        std::process::exit(handle_error(&e));
    }
}

/// Installs the stderr log subscriber.
///
/// `LIGHTBOX_LOG` wins over the `-v` count.
fn init_logging(verbose: u8) {
    let default = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new(default));

    let _ = tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr).with_target(false))
        .with(filter)
        .try_init();
}

/// Prints an error and returns the exit code.
fn handle_error(e: &anyhow::Error) -> i32 {
    eprintln!("Error: {e:?}");
    1
}

fn run(cli: &Cli) -> Result<()> {
    match &cli.command {
        Commands::New(args) => new::execute(args),
        Commands::Plan(args) => plan::execute(args),
        Commands::Doctor => doctor::execute(),
        Commands::Version(args) => version::execute(args),
    }
}
