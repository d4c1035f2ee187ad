//! Invariant checks for a generated project.
//!
//! Rendering decides the content of the model configuration, the hook
//! decides which files survive. These checks hold both of them to the
//! [`Plan`]:
//!
//! - the model config parses, has `trainer`, `model` and `data`, and has a
//!   `trainer.logger` section iff the plan asks for one
//! - no unrendered template marker survives anywhere in the tree
//! - option-owned artifacts are present or absent as declared
//! - `.gitmodules` lists exactly the declared submodules, all under
//!   `external/`

use crate::errors::LightboxError;
use crate::project::options::ProjectOptions;
use crate::project::plan::Plan;
use crate::project::submodule::{EXTERNAL_DIR, parse_gitmodules};
use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Top-level keys every model config must define.
pub const REQUIRED_CONFIG_KEYS: &[&str] = &["trainer", "model", "data"];

/// Text that only appears in unrendered templates.
pub const TEMPLATE_MARKERS: &[&str] = &["{{", "{%"];

/// Checks a freshly rendered tree before the hook runs.
///
/// # Errors
///
/// Returns `InvariantViolation` if the model config or any rendered file
/// breaks an invariant, or an I/O error if the tree cannot be read.
pub fn check_rendered(options: &ProjectOptions, plan: &Plan, root: &Path) -> Result<()> {
    check_model_config(options, plan, root)?;

    let leftovers = find_template_markers(root)?;
    if let Some(first) = leftovers.first() {
        return Err(LightboxError::invariant_violation(format!(
            "unrendered template marker in {}",
            first.display()
        ))
        .into());
    }

    Ok(())
}

/// Validates `configs/<model_name>.yaml` against the plan.
///
/// # Errors
///
/// Returns `InvariantViolation` if the config is not a YAML mapping, lacks
/// a required key, or disagrees with the plan about the logger section.
pub fn check_model_config(options: &ProjectOptions, plan: &Plan, root: &Path) -> Result<()> {
    let path = root
        .join("configs")
        .join(format!("{}.yaml", options.model_name));
    let content = std::fs::read_to_string(&path)
        .with_context(|| format!("Failed to read config: {}", path.display()))?;

    let config: serde_yaml::Value = serde_yaml::from_str(&content).map_err(|e| {
        LightboxError::invariant_violation(format!("{} is not valid YAML: {e}", path.display()))
    })?;

    if !config.is_mapping() {
        return Err(LightboxError::invariant_violation(format!(
            "{} must be a YAML mapping",
            path.display()
        ))
        .into());
    }

    if let Some(missing) = REQUIRED_CONFIG_KEYS
        .iter()
        .find(|key| config.get(**key).is_none())
    {
        return Err(LightboxError::invariant_violation(format!(
            "{} is missing the '{missing}' section",
            path.display()
        ))
        .into());
    }

    let has_logger = config
        .get("trainer")
        .and_then(|trainer| trainer.get("logger"))
        .is_some_and(|logger| !logger.is_null());

    if has_logger != plan.logger_section {
        return Err(LightboxError::invariant_violation(format!(
            "logger section {} in {} but use_wandb={}",
            if has_logger { "present" } else { "absent" },
            path.display(),
            options.use_wandb
        ))
        .into());
    }

    Ok(())
}

/// Lists files under `root` that still contain a template marker.
///
/// The `.git` directory is skipped, as are files that are not UTF-8.
///
/// # Errors
///
/// Returns an error if the directory tree cannot be walked.
pub fn find_template_markers(root: &Path) -> Result<Vec<PathBuf>> {
    let mut offenders = Vec::new();

    let walker = WalkDir::new(root)
        .into_iter()
        .filter_entry(|entry| entry.file_name() != ".git");

    for entry in walker {
        let entry = entry.with_context(|| format!("Failed to walk {}", root.display()))?;
        if !entry.file_type().is_file() {
            continue;
        }
        let Ok(content) = std::fs::read_to_string(entry.path()) else {
            continue;
        };
        if TEMPLATE_MARKERS.iter().any(|m| content.contains(m)) {
            let relative = entry.path().strip_prefix(root).unwrap_or(entry.path());
            offenders.push(relative.to_path_buf());
        }
    }

    Ok(offenders)
}

/// Checks that option-owned artifacts match the plan after pruning.
///
/// # Errors
///
/// Returns `InvariantViolation` naming the first mismatching path.
pub fn check_artifacts(plan: &Plan, root: &Path) -> Result<(), LightboxError> {
    for artifact in &plan.artifacts {
        let exists = root.join(&artifact.path).exists();
        if exists != artifact.present {
            return Err(LightboxError::invariant_violation(format!(
                "{} should be {} ({}={})",
                artifact.path,
                if artifact.present { "present" } else { "absent" },
                artifact.owner.option_name(),
                if artifact.present { "yes" } else { "no" },
            )));
        }
    }
    Ok(())
}

/// Compares `.gitmodules` with the plan and describes every discrepancy.
///
/// Registration is best-effort, so discrepancies are reported rather than
/// treated as errors. A missing `.gitmodules` reads as no entries.
#[must_use]
pub fn gitmodules_discrepancies(plan: &Plan, root: &Path) -> Vec<String> {
    let content = std::fs::read_to_string(root.join(".gitmodules")).unwrap_or_default();
    let entries = parse_gitmodules(&content);
    let mut problems = Vec::new();

    for entry in &entries {
        let declared = plan
            .enabled_submodules()
            .find(|s| s.record.name == entry.short_name());
        match declared {
            None => problems.push(format!("unexpected submodule '{}'", entry.name)),
            Some(decision) if entry.url.as_deref() != Some(decision.record.source.as_str()) => {
                problems.push(format!(
                    "submodule '{}' points at {}, expected {}",
                    decision.record.name,
                    entry.url.as_deref().unwrap_or("nothing"),
                    decision.record.source
                ));
            }
            Some(_) => {}
        }
        match entry.path.as_deref() {
            Some(path) if path.starts_with(&format!("{EXTERNAL_DIR}/")) => {}
            Some(path) => problems.push(format!(
                "submodule '{}' is outside {EXTERNAL_DIR}/: {path}",
                entry.name
            )),
            None => problems.push(format!("submodule '{}' has no path", entry.name)),
        }
    }

    for expected in plan.enabled_submodules() {
        if !entries.iter().any(|e| e.short_name() == expected.record.name) {
            problems.push(format!("submodule '{}' is not registered", expected.record.name));
        }
    }

    problems
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::project::options::{OptionOverrides, Toggle};
    use crate::project::submodule::SubmoduleSources;
    use crate::template::render_project;
    use std::fs;

    fn setup(hpo: Toggle, wandb: Toggle) -> (tempfile::TempDir, ProjectOptions, Plan) {
        let overrides = OptionOverrides {
            model_name: Some("testmodel".to_string()),
            use_hpo: Some(hpo),
            use_wandb: Some(wandb),
            ..OptionOverrides::default()
        };
        let options = ProjectOptions::resolve("Test ML Project", overrides).unwrap();
        let plan = Plan::new(&options, &SubmoduleSources::default());
        let dir = tempfile::tempdir().unwrap();
        render_project(&options, dir.path()).unwrap();
        (dir, options, plan)
    }

    #[test]
    fn rendered_project_passes_checks() {
        for wandb in [Toggle::Yes, Toggle::No] {
            let (dir, options, plan) = setup(Toggle::Yes, wandb);
            check_rendered(&options, &plan, dir.path()).unwrap();
        }
    }

    #[test]
    fn stray_logger_section_is_rejected() {
        let (dir, options, plan) = setup(Toggle::Yes, Toggle::No);
        let config = dir.path().join("configs/testmodel.yaml");
        let mut content = fs::read_to_string(&config).unwrap();
        content = content.replace(
            "trainer:\n",
            "trainer:\n  logger:\n    class_path: lightning.pytorch.loggers.WandbLogger\n",
        );
        fs::write(&config, content).unwrap();

        let err = check_model_config(&options, &plan, dir.path()).unwrap_err();
        assert!(err.to_string().contains("logger section present"));
    }

    #[test]
    fn missing_required_section_is_rejected() {
        let (dir, options, plan) = setup(Toggle::No, Toggle::No);
        fs::write(
            dir.path().join("configs/testmodel.yaml"),
            "trainer:\n  max_epochs: 1\nmodel: {}\n",
        )
        .unwrap();

        let err = check_model_config(&options, &plan, dir.path()).unwrap_err();
        assert!(err.to_string().contains("'data'"));
    }

    #[test]
    fn invalid_yaml_is_rejected() {
        let (dir, options, plan) = setup(Toggle::No, Toggle::No);
        fs::write(dir.path().join("configs/testmodel.yaml"), "trainer: [unclosed\n").unwrap();
        let err = check_model_config(&options, &plan, dir.path()).unwrap_err();
        assert!(err.to_string().contains("not valid YAML"));
    }

    #[test]
    fn markers_are_found_outside_git_dir() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir_all(dir.path().join(".git")).unwrap();
        fs::write(dir.path().join(".git/config"), "{{ignored}}").unwrap();
        fs::write(dir.path().join("clean.py"), "x = {'a': 1}\n").unwrap();
        fs::write(dir.path().join("dirty.py"), "name = '{{project_name}}'\n").unwrap();
        fs::write(dir.path().join("control.txt"), "{% if use_hpo %}\n").unwrap();

        let mut found = find_template_markers(dir.path()).unwrap();
        found.sort();
        assert_eq!(
            found,
            [PathBuf::from("control.txt"), PathBuf::from("dirty.py")]
        );
    }

    #[test]
    fn artifacts_must_match_plan() {
        let (dir, _options, plan) = setup(Toggle::No, Toggle::No);
        // Nothing has been pruned yet, so the HPO script is still there.
        let err = check_artifacts(&plan, dir.path()).unwrap_err();
        assert!(err.to_string().contains("scripts/testmodel_hpo.py should be absent"));
    }

    #[test]
    fn gitmodules_discrepancies_report_missing_and_extra_entries() {
        let (dir, _options, plan) = setup(Toggle::No, Toggle::No);
        fs::write(
            dir.path().join(".gitmodules"),
            "[submodule \"external/DataPorter\"]\n\tpath = vendor/DataPorter\n\turl = x\n",
        )
        .unwrap();

        let problems = gitmodules_discrepancies(&plan, dir.path());
        assert!(problems.iter().any(|p| p.contains("unexpected submodule")));
        assert!(problems.iter().any(|p| p.contains("outside external/")));
        assert!(
            problems
                .iter()
                .any(|p| p.contains("'LightningReflow' is not registered"))
        );
    }

    #[test]
    fn matching_gitmodules_has_no_discrepancies() {
        let (dir, _options, plan) = setup(Toggle::No, Toggle::No);
        fs::write(
            dir.path().join(".gitmodules"),
            "[submodule \"external/LightningReflow\"]\n\tpath = external/LightningReflow\n\turl = https://github.com/robotic-ai-core/Reflow.git\n",
        )
        .unwrap();
        assert!(gitmodules_discrepancies(&plan, dir.path()).is_empty());
    }

    #[test]
    fn gitmodules_url_must_match_source() {
        let (dir, _options, plan) = setup(Toggle::No, Toggle::No);
        fs::write(
            dir.path().join(".gitmodules"),
            "[submodule \"external/LightningReflow\"]\n\tpath = external/LightningReflow\n\turl = /elsewhere\n",
        )
        .unwrap();
        let problems = gitmodules_discrepancies(&plan, dir.path());
        assert_eq!(problems.len(), 1);
        assert!(problems[0].contains("points at /elsewhere"));
    }
}
