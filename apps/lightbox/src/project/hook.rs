//! Post-generation hook.
//!
//! Reconciles a freshly rendered tree with its [`Plan`]. Steps run in a
//! fixed order:
//!
//! 1. `git init` (fatal on failure)
//! 2. `git submodule add` for every enabled submodule (warning on failure)
//! 3. removal of artifacts owned by disabled options
//! 4. a notice when experiment logging is disabled
//! 5. interpreter environment provisioning (warning on failure)
//! 6. `git add .` and the initial commit (fatal on failure)
//!
//! Submodule registration precedes pruning so that pruning never touches
//! `external/`, and the commit comes last so it captures the reconciled
//! tree.

use crate::errors::LightboxError;
use crate::process::{CommandRunner, display_command};
use crate::project::options::ProjectOptions;
use crate::project::plan::{ArtifactKind, Plan};
use crate::project::virtualenv::{self, EnvironmentOutcome};
use anyhow::{Context, Result};
use std::path::Path;

/// Message of the single commit every generated repository starts with.
pub const INITIAL_COMMIT_MESSAGE: &str = "Initial commit from LightBox template";

/// What the hook did, for the final summary.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HookReport {
    /// Names of submodules registered successfully.
    pub registered: Vec<String>,
    /// Submodules whose registration failed, with git's error output.
    pub failed: Vec<(String, String)>,
    /// Artifact paths removed from the tree.
    pub pruned: Vec<String>,
    /// Provisioning result; `None` when no environment was requested.
    pub environment: Option<EnvironmentOutcome>,
}

impl HookReport {
    /// Number of advisory failures encountered.
    #[must_use]
    pub fn warning_count(&self) -> usize {
        let environment = self
            .environment
            .as_ref()
            .is_some_and(|outcome| !outcome.is_ready());
        self.failed.len() + usize::from(environment)
    }
}

/// Runs every hook step against the project at `root`.
///
/// # Errors
///
/// Returns an error if the repository cannot be initialized or committed,
/// or if a disabled artifact cannot be removed.
pub fn run(
    runner: &dyn CommandRunner,
    options: &ProjectOptions,
    plan: &Plan,
    root: &Path,
) -> Result<HookReport> {
    let mut report = HookReport::default();

    init_repository(runner, root)?;
    register_submodules(runner, plan, root, &mut report);
    report.pruned = prune_artifacts(plan, root)?;

    if !plan.logger_section {
        println!("Experiment logging disabled; the model config has no logger section.");
    }

    if let Some(name) = &plan.virtualenv {
        println!("Creating pyenv environment '{name}'...");
        let outcome = virtualenv::provision(runner, root, name, &options.python_version);
        if let EnvironmentOutcome::Skipped { reason } = &outcome {
            println!("Warning: {reason}");
        }
        report.environment = Some(outcome);
    }

    commit(runner, root)?;
    Ok(report)
}

/// Initializes the git repository.
///
/// # Errors
///
/// Returns `ToolNotFound` or `GitFailed`.
pub fn init_repository(runner: &dyn CommandRunner, root: &Path) -> Result<(), LightboxError> {
    run_git(runner, root, "init", &["init"])?;
    tracing::info!(root = %root.display(), "initialized git repository");
    Ok(())
}

/// Registers each enabled submodule, one independent call per submodule.
pub fn register_submodules(
    runner: &dyn CommandRunner,
    plan: &Plan,
    root: &Path,
    report: &mut HookReport,
) {
    for decision in plan.enabled_submodules() {
        let record = &decision.record;
        let args = ["submodule", "add", record.source.as_str(), record.path.as_str()];
        println!("  Running: {}", display_command("git", &args));

        let outcome = runner.run("git", &args, root);
        if outcome.is_success() {
            tracing::info!(submodule = %record.name, source = %record.source, "registered submodule");
            report.registered.push(record.name.clone());
        } else {
            let stderr = outcome.stderr().trim().to_string();
            println!("Warning: Failed to add submodule {}: {stderr}", record.name);
            report.failed.push((record.name.clone(), stderr));
        }
    }
}

/// Removes every artifact the plan declares absent.
///
/// Paths that do not exist are skipped, so running this twice is
/// harmless. Returns the paths actually removed.
///
/// # Errors
///
/// Returns an error if an existing path cannot be removed.
pub fn prune_artifacts(plan: &Plan, root: &Path) -> Result<Vec<String>> {
    let mut removed = Vec::new();

    for artifact in plan.pruned_artifacts() {
        let path = root.join(&artifact.path);
        if !path.exists() {
            continue;
        }
        let result = match artifact.kind {
            ArtifactKind::File => std::fs::remove_file(&path),
            ArtifactKind::Directory => std::fs::remove_dir_all(&path),
        };
        result.with_context(|| format!("Failed to remove {}", path.display()))?;

        println!("  Removed {}", artifact.path);
        tracing::info!(path = %artifact.path, owner = artifact.owner.option_name(), "pruned artifact");
        removed.push(artifact.path.clone());
    }

    Ok(removed)
}

/// Stages the whole tree and creates the initial commit.
///
/// # Errors
///
/// Returns `ToolNotFound` or `GitFailed`.
pub fn commit(runner: &dyn CommandRunner, root: &Path) -> Result<(), LightboxError> {
    run_git(runner, root, "add", &["add", "."])?;
    run_git(
        runner,
        root,
        "commit",
        &["commit", "-m", INITIAL_COMMIT_MESSAGE],
    )?;
    tracing::info!("created initial commit");
    Ok(())
}

fn run_git(
    runner: &dyn CommandRunner,
    root: &Path,
    step: &str,
    args: &[&str],
) -> Result<String, LightboxError> {
    println!("  Running: {}", display_command("git", args));
    runner.run("git", args, root).require_git(step)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::process::ToolOutcome;
    use crate::process::scripted::ScriptedRunner;
    use crate::project::options::{OptionOverrides, Toggle};
    use crate::project::submodule::SubmoduleSources;
    use crate::project::verify::check_artifacts;
    use crate::template::render_project;

    fn setup(hpo: Toggle, dataporter: Toggle) -> (tempfile::TempDir, ProjectOptions, Plan) {
        let overrides = OptionOverrides {
            model_name: Some("testmodel".to_string()),
            use_hpo: Some(hpo),
            use_dataporter: Some(dataporter),
            ..OptionOverrides::default()
        };
        let options = ProjectOptions::resolve("Test ML Project", overrides).unwrap();
        let plan = Plan::new(&options, &SubmoduleSources::default());
        let dir = tempfile::tempdir().unwrap();
        render_project(&options, dir.path()).unwrap();
        (dir, options, plan)
    }

    #[test]
    fn prune_removes_hpo_artifacts_and_is_idempotent() {
        let (dir, _options, plan) = setup(Toggle::No, Toggle::No);

        let removed = prune_artifacts(&plan, dir.path()).unwrap();
        assert_eq!(removed.len(), 4);
        check_artifacts(&plan, dir.path()).unwrap();

        let removed_again = prune_artifacts(&plan, dir.path()).unwrap();
        assert!(removed_again.is_empty());
        check_artifacts(&plan, dir.path()).unwrap();
    }

    #[test]
    fn prune_keeps_everything_when_hpo_enabled() {
        let (dir, _options, plan) = setup(Toggle::Yes, Toggle::No);
        assert!(prune_artifacts(&plan, dir.path()).unwrap().is_empty());
        assert!(dir.path().join("scripts/testmodel_hpo.py").is_file());
        assert!(dir.path().join("test_ml_project/hpo").is_dir());
    }

    #[test]
    fn prune_skips_partially_missing_artifacts() {
        let (dir, _options, plan) = setup(Toggle::No, Toggle::No);
        std::fs::remove_dir_all(dir.path().join("tests/helpers")).unwrap();

        let removed = prune_artifacts(&plan, dir.path()).unwrap();
        assert_eq!(removed.len(), 3);
        assert!(dir.path().join("tests/test_paths.py").is_file());
    }

    #[test]
    fn steps_run_in_order() {
        let (dir, options, plan) = setup(Toggle::Yes, Toggle::Yes);
        let runner = ScriptedRunner::permissive();

        let report = run(&runner, &options, &plan, dir.path()).unwrap();

        let calls = runner.calls();
        assert_eq!(calls.first().map(String::as_str), Some("git init"));
        assert_eq!(
            calls.last().map(String::as_str),
            Some("git commit -m Initial commit from LightBox template")
        );
        let adds = calls
            .iter()
            .filter(|c| c.starts_with("git submodule add"))
            .count();
        assert_eq!(adds, 3);
        assert_eq!(
            report.registered,
            ["LightningReflow", "LightningTune", "DataPorter"]
        );
        assert_eq!(report.warning_count(), 0);
    }

    #[test]
    fn submodule_failure_is_advisory() {
        let (dir, options, plan) = setup(Toggle::No, Toggle::No);
        let reflow = plan.enabled_submodules().next().unwrap().record.clone();
        let runner = ScriptedRunner::permissive().fail(
            &format!("git submodule add {} {}", reflow.source, reflow.path),
            "fatal: repository not found",
        );

        let report = run(&runner, &options, &plan, dir.path()).unwrap();

        assert!(report.registered.is_empty());
        assert_eq!(report.failed.len(), 1);
        assert_eq!(report.warning_count(), 1);
        assert!(runner.calls().iter().any(|c| c.starts_with("git commit")));
        assert!(!dir.path().join("scripts/testmodel_hpo.py").exists());
    }

    #[test]
    fn init_failure_stops_the_hook() {
        let (dir, options, plan) = setup(Toggle::No, Toggle::No);
        let runner = ScriptedRunner::permissive().fail("git init", "permission denied");

        let err = run(&runner, &options, &plan, dir.path()).unwrap_err();

        assert!(err.to_string().contains("git init failed"));
        assert_eq!(runner.calls(), ["git init"]);
        assert!(dir.path().join("scripts/testmodel_hpo.py").exists());
    }

    #[test]
    fn missing_git_is_fatal() {
        let (dir, options, plan) = setup(Toggle::No, Toggle::No);
        let runner = ScriptedRunner::permissive().respond("git init", ToolOutcome::Missing);

        let err = run(&runner, &options, &plan, dir.path()).unwrap_err();
        let err = err.downcast::<LightboxError>().unwrap();
        assert!(matches!(err, LightboxError::ToolNotFound { .. }));
    }

    #[test]
    fn commit_failure_is_fatal() {
        let (dir, options, plan) = setup(Toggle::Yes, Toggle::No);
        let runner = ScriptedRunner::permissive().fail(
            "git commit -m Initial commit from LightBox template",
            "Please tell me who you are.",
        );

        let err = run(&runner, &options, &plan, dir.path()).unwrap_err();
        assert!(err.to_string().contains("git commit failed"));
    }

    #[test]
    fn environment_failure_does_not_block_commit() {
        let overrides = OptionOverrides {
            create_virtualenv: Some(Toggle::Yes),
            ..OptionOverrides::default()
        };
        let options = ProjectOptions::resolve("Env Project", overrides).unwrap();
        let plan = Plan::new(&options, &SubmoduleSources::default());
        let dir = tempfile::tempdir().unwrap();
        render_project(&options, dir.path()).unwrap();

        // `pyenv commands` prints nothing, so the plugin check fails.
        let runner = ScriptedRunner::permissive();
        let report = run(&runner, &options, &plan, dir.path()).unwrap();

        assert!(matches!(
            report.environment,
            Some(EnvironmentOutcome::Skipped { .. })
        ));
        assert_eq!(report.warning_count(), 1);
        assert!(runner.calls().iter().any(|c| c.starts_with("git commit")));
    }
}
