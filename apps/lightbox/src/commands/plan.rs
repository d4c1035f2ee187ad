//! Plan command for the lightbox CLI.
//!
//! Prints what `lightbox new` would generate for the given options without
//! touching the filesystem.
//!
//! ## Usage
//!
//! ```bash
//! lightbox plan "My Project" --use-hpo no
//! lightbox plan "My Project" --json
//! ```

use anyhow::{Context, Result};
use clap::Args;
use serde::Serialize;

use super::new::OptionArgs;
use crate::project::{Plan, ProjectOptions};

/// Arguments for the `plan` command.
#[derive(Args)]
pub struct PlanArgs {
    /// Human-readable project name.
    pub name: String,

    /// Print the resolved options and plan as JSON.
    #[clap(long = "json", action = clap::ArgAction::SetTrue)]
    pub json: bool,

    #[command(flatten)]
    pub options: OptionArgs,
}

#[derive(Serialize)]
struct PlanOutput<'a> {
    options: &'a ProjectOptions,
    plan: &'a Plan,
}

/// Executes the `plan` command.
///
/// # Errors
///
/// Returns an error if the config file is invalid or an option fails
/// validation.
pub fn execute(args: &PlanArgs) -> Result<()> {
    let (options, settings) = args.options.resolve(&args.name)?;
    let plan = Plan::new(&options, &settings.sources);

    if args.json {
        let output = PlanOutput {
            options: &options,
            plan: &plan,
        };
        let json = serde_json::to_string_pretty(&output).context("Failed to serialize plan")?;
        println!("{json}");
    } else {
        print!("{}", render_text(&options, &plan));
    }
    Ok(())
}

fn render_text(options: &ProjectOptions, plan: &Plan) -> String {
    let mut out = String::new();
    let mut line = |text: String| {
        out.push_str(&text);
        out.push('\n');
    };

    line(format!("Project:  {} ({})", options.project_name, plan.project_slug));
    line(format!("Package:  {}", options.package_name));
    line(format!("Model:    {}", options.model_name));
    line(format!("Python:   {}", options.python_version));
    line(String::new());

    line("Submodules:".to_string());
    for decision in &plan.submodules {
        let mark = if decision.present { "+" } else { "-" };
        line(format!(
            "  {mark} {:<16} {} <- {}",
            decision.record.name, decision.record.path, decision.record.source
        ));
    }

    line("Artifacts:".to_string());
    for artifact in &plan.artifacts {
        let mark = if artifact.present { "+" } else { "-" };
        line(format!(
            "  {mark} {} ({})",
            artifact.path,
            artifact.owner.option_name()
        ));
    }

    line(format!(
        "Logger section: {}",
        if plan.logger_section { "yes" } else { "no" }
    ));
    line(format!(
        "Environment:    {}",
        plan.virtualenv.as_deref().unwrap_or("none")
    ));
    out
}
