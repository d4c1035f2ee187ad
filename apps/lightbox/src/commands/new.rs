//! New project command for the lightbox CLI.
//!
//! Generates a LightningReflow project and its git repository.
//!
//! ## Usage
//!
//! ```bash
//! lightbox new "My Project"                          # all defaults
//! lightbox new "My Project" --use-hpo no             # no HPO scaffolding
//! lightbox new "My Project" --output-dir ~/work      # choose the parent
//! lightbox new "My Project" --create-virtualenv yes  # pyenv environment
//! ```
//!
//! ## Pipeline
//!
//! 1. Resolve options (defaults, config file, flags)
//! 2. Render the template into `<output-dir>/<project_slug>`
//! 3. Check the rendered tree (model config, leftover template markers)
//! 4. Run the post-generation hook
//! 5. Check option-owned artifacts and `.gitmodules`

use anyhow::{Context, Result};
use clap::Args;
use std::path::{Path, PathBuf};

use crate::config::Settings;
use crate::errors::LightboxError;
use crate::process::SystemRunner;
use crate::project::hook::{self, HookReport};
use crate::project::virtualenv::EnvironmentOutcome;
use crate::project::{OptionOverrides, Plan, ProjectOptions, Toggle, verify};
use crate::template::render_project;

/// Option flags shared by `new` and `plan`.
///
/// Every flag is optional; unset flags fall back to the config file and
/// then to the built-in defaults.
#[derive(Args, Debug, Default)]
pub struct OptionArgs {
    /// Config file with default options and submodule sources.
    #[clap(long = "config", value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Directory name and environment name (derived from the project name).
    #[clap(long = "slug")]
    pub project_slug: Option<String>,

    /// Python package name (derived from the slug).
    #[clap(long)]
    pub package_name: Option<String>,

    /// Model name used in script and config file names.
    #[clap(long)]
    pub model_name: Option<String>,

    /// One-line project description.
    #[clap(long)]
    pub description: Option<String>,

    #[clap(long)]
    pub author: Option<String>,

    #[clap(long)]
    pub author_email: Option<String>,

    /// Python version, e.g. 3.10.
    #[clap(long)]
    pub python_version: Option<String>,

    /// pytest-xdist worker count: auto, 0 (serial) or a number.
    #[clap(long)]
    pub pytest_workers: Option<String>,

    /// Include hyperparameter optimization scaffolding and LightningTune.
    #[clap(long, value_enum)]
    pub use_hpo: Option<Toggle>,

    /// Configure Weights & Biases experiment logging.
    #[clap(long, value_enum)]
    pub use_wandb: Option<Toggle>,

    /// Register the DataPorter submodule.
    #[clap(long, value_enum)]
    pub use_dataporter: Option<Toggle>,

    /// Create a pyenv virtualenv named after the project slug.
    #[clap(long, value_enum)]
    pub create_virtualenv: Option<Toggle>,
}

impl OptionArgs {
    /// The command-line override layer.
    #[must_use]
    pub fn overrides(&self) -> OptionOverrides {
        OptionOverrides {
            project_slug: self.project_slug.clone(),
            package_name: self.package_name.clone(),
            model_name: self.model_name.clone(),
            description: self.description.clone(),
            author: self.author.clone(),
            author_email: self.author_email.clone(),
            python_version: self.python_version.clone(),
            pytest_workers: self.pytest_workers.clone(),
            use_hpo: self.use_hpo,
            use_wandb: self.use_wandb,
            use_dataporter: self.use_dataporter,
            create_virtualenv: self.create_virtualenv,
        }
    }

    /// Loads settings and resolves the option snapshot for `project_name`.
    ///
    /// # Errors
    ///
    /// Returns an error if the config file is invalid or an option fails
    /// validation.
    pub fn resolve(&self, project_name: &str) -> Result<(ProjectOptions, Settings)> {
        let settings = Settings::load(self.config.as_deref())?;
        let overrides = settings.defaults.clone().overlay(self.overrides());
        let options = ProjectOptions::resolve(project_name, overrides)?;
        tracing::debug!(?options, "resolved options");
        Ok((options, settings))
    }
}

/// Arguments for the `new` command.
#[derive(Args)]
pub struct NewArgs {
    /// Human-readable project name, e.g. "Test ML Project".
    pub name: String,

    /// Parent directory for the project (defaults to current directory).
    #[clap(long = "output-dir", short = 'o', default_value = ".")]
    pub output_dir: PathBuf,

    #[command(flatten)]
    pub options: OptionArgs,
}

/// Executes the `new` command.
///
/// # Errors
///
/// Returns an error if:
/// - An option is invalid or the config file cannot be read
/// - The target directory already exists
/// - Rendering fails or the rendered tree is inconsistent
/// - The repository cannot be initialized or committed
pub fn execute(args: &NewArgs) -> Result<()> {
    let (options, settings) = args.options.resolve(&args.name)?;
    let plan = Plan::new(&options, &settings.sources);
    let root = args.output_dir.join(&options.project_slug);

    if root.exists() {
        return Err(LightboxError::directory_exists(root).into());
    }

    if let Some(path) = &settings.path {
        println!("Using config file {}", path.display());
    }
    println!("Creating project '{}' in {}", options.project_name, root.display());
    std::fs::create_dir_all(&root)
        .with_context(|| format!("Failed to create directory: {}", root.display()))?;

    if let Err(e) = render_checked(&options, &plan, &root) {
        // Nothing outside the tree has happened yet.
        let _ = std::fs::remove_dir_all(&root);
        return Err(e);
    }

    println!();
    println!("Running post-generation setup...");
    let report = hook::run(&SystemRunner, &options, &plan, &root)?;
    verify::check_artifacts(&plan, &root)?;

    let failed: Vec<&str> = report.failed.iter().map(|(name, _)| name.as_str()).collect();
    for problem in verify::gitmodules_discrepancies(&plan, &root) {
        if !failed.iter().any(|name| problem.contains(&format!("'{name}'"))) {
            println!("Warning: {problem}");
        }
    }

    print_summary(&options, &root, &report);
    Ok(())
}

fn render_checked(options: &ProjectOptions, plan: &Plan, root: &Path) -> Result<()> {
    let written = render_project(options, root)?;
    tracing::info!(files = written.len(), "rendered template");
    verify::check_rendered(options, plan, root)
}

fn print_summary(options: &ProjectOptions, root: &Path, report: &HookReport) {
    let model = &options.model_name;
    let package = &options.package_name;

    println!();
    println!("Created project '{}'", options.project_name);
    if !report.registered.is_empty() {
        println!("  Submodules: {}", report.registered.join(", "));
    }
    if !report.pruned.is_empty() {
        println!("  Removed (use_hpo=no): {}", report.pruned.join(", "));
    }
    match &report.environment {
        Some(EnvironmentOutcome::Created { name, python }) => {
            println!("  Environment: {name} (Python {python})");
        }
        Some(EnvironmentOutcome::AlreadyExists { name }) => {
            println!("  Environment: {name} (existing)");
        }
        _ => {}
    }
    if report.warning_count() > 0 {
        println!("  Finished with {} warning(s).", report.warning_count());
    }

    println!();
    println!("Next steps:");
    println!("  1. cd {}", root.display());
    println!("  2. git submodule update --init --recursive");
    println!("  3. pip install -e .");
    println!("  4. Implement your model in {package}/models/base.py");
    println!("  5. Implement your datamodule in {package}/data/datamodule.py");
    println!("  6. Update configs/{model}.yaml with your settings");
    println!("  7. Run training:");
    println!("     python scripts/train_{model}.py fit --config configs/{model}.yaml");
    if options.use_hpo.is_enabled() {
        println!("  8. Run HPO:");
        println!(
            "     python scripts/{model}_hpo.py --config configs/{model}.yaml --n-trials 50"
        );
    }
}
