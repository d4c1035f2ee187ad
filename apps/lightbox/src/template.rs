//! Embedded project template and its renderer.
//!
//! Template files are compiled into the binary. Both their paths and their
//! contents are handlebars templates rendered in strict mode, so a reference
//! to an unknown variable is a render error instead of an empty string.
//! HTML escaping is disabled; the output is source code and YAML.
//!
//! The rendered tree is option-agnostic except for content conditionals:
//! HPO artifacts are always written and pruned later by the hook.

use crate::errors::LightboxError;
use crate::project::options::ProjectOptions;
use anyhow::{Context, Result};
use handlebars::Handlebars;
use std::path::{Path, PathBuf};

/// One file of the project template.
#[derive(Debug, Clone, Copy)]
pub struct TemplateFile {
    /// Destination path relative to the project root (a template itself).
    pub path: &'static str,
    /// File content template.
    pub content: &'static str,
    /// Whether the rendered file gets the executable bit.
    pub executable: bool,
}

impl TemplateFile {
    const fn new(path: &'static str, content: &'static str) -> Self {
        Self {
            path,
            content,
            executable: false,
        }
    }

    const fn script(path: &'static str, content: &'static str) -> Self {
        Self {
            path,
            content,
            executable: true,
        }
    }
}

/// Every file of the project template.
pub const TEMPLATE_FILES: &[TemplateFile] = &[
    TemplateFile::new("pyproject.toml", include_str!("../templates/pyproject.toml")),
    TemplateFile::new("setup.py", include_str!("../templates/setup.py")),
    TemplateFile::new("requirements.txt", include_str!("../templates/requirements.txt")),
    TemplateFile::new("README.md", include_str!("../templates/README.md")),
    TemplateFile::new("CLAUDE.md", include_str!("../templates/claude/CLAUDE.md")),
    TemplateFile::new(
        ".claude/skills/lightbox/SKILL.md",
        include_str!("../templates/claude/skills/lightbox/SKILL.md"),
    ),
    TemplateFile::new(".gitignore", include_str!("../templates/gitignore")),
    TemplateFile::new(
        "configs/{{model_name}}.yaml",
        include_str!("../templates/configs/model.yaml"),
    ),
    TemplateFile::new(
        "{{package_name}}/__init__.py",
        include_str!("../templates/package/__init__.py"),
    ),
    TemplateFile::new(
        "{{package_name}}/paths.py",
        include_str!("../templates/package/paths.py"),
    ),
    TemplateFile::new(
        "{{package_name}}/models/__init__.py",
        include_str!("../templates/package/models/__init__.py"),
    ),
    TemplateFile::new(
        "{{package_name}}/models/base.py",
        include_str!("../templates/package/models/base.py"),
    ),
    TemplateFile::new(
        "{{package_name}}/data/__init__.py",
        include_str!("../templates/package/data/__init__.py"),
    ),
    TemplateFile::new(
        "{{package_name}}/data/datamodule.py",
        include_str!("../templates/package/data/datamodule.py"),
    ),
    TemplateFile::new(
        "{{package_name}}/hpo/__init__.py",
        include_str!("../templates/package/hpo/__init__.py"),
    ),
    TemplateFile::new(
        "{{package_name}}/hpo/config.py",
        include_str!("../templates/package/hpo/config.py"),
    ),
    TemplateFile::script(
        "scripts/train_{{model_name}}.py",
        include_str!("../templates/scripts/train.py"),
    ),
    TemplateFile::script(
        "scripts/{{model_name}}_hpo.py",
        include_str!("../templates/scripts/hpo.py"),
    ),
    TemplateFile::new("tests/__init__.py", include_str!("../templates/tests/__init__.py")),
    TemplateFile::new("tests/conftest.py", include_str!("../templates/tests/conftest.py")),
    TemplateFile::new(
        "tests/test_paths.py",
        include_str!("../templates/tests/test_paths.py"),
    ),
    TemplateFile::new(
        "tests/helpers/__init__.py",
        include_str!("../templates/tests/helpers/__init__.py"),
    ),
    TemplateFile::new(
        "tests/helpers/hpo_utils.py",
        include_str!("../templates/tests/helpers/hpo_utils.py"),
    ),
    TemplateFile::new(
        "tests/test_hpo_search_space.py",
        include_str!("../templates/tests/test_hpo_search_space.py"),
    ),
    TemplateFile::new(
        "external/.gitkeep",
        include_str!("../templates/external/gitkeep"),
    ),
];

/// Strict, non-escaping handlebars renderer.
pub struct Renderer {
    registry: Handlebars<'static>,
}

impl Default for Renderer {
    fn default() -> Self {
        Self::new()
    }
}

impl Renderer {
    #[must_use]
    pub fn new() -> Self {
        let mut registry = Handlebars::new();
        registry.set_strict_mode(true);
        registry.register_escape_fn(handlebars::no_escape);
        Self { registry }
    }

    /// Renders a single template string.
    ///
    /// # Errors
    ///
    /// Returns `TemplateError` naming `name` if rendering fails.
    pub fn render(
        &self,
        name: &str,
        template: &str,
        context: &serde_json::Value,
    ) -> Result<String, LightboxError> {
        self.registry
            .render_template(template, context)
            .map_err(|e| LightboxError::template_error(name, e.to_string()))
    }
}

/// Renders the whole template into `root`, which must already exist.
///
/// Returns the rendered paths relative to `root`.
///
/// # Errors
///
/// Returns an error if a template fails to render or a file cannot be
/// written.
pub fn render_project(options: &ProjectOptions, root: &Path) -> Result<Vec<PathBuf>> {
    let renderer = Renderer::new();
    let context = options.template_context();
    let mut written = Vec::with_capacity(TEMPLATE_FILES.len());

    for file in TEMPLATE_FILES {
        let relative = PathBuf::from(renderer.render(file.path, file.path, &context)?);
        let content = renderer.render(file.path, file.content, &context)?;
        let target = root.join(&relative);

        if let Some(parent) = target.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
        }
        std::fs::write(&target, content)
            .with_context(|| format!("Failed to write {}", target.display()))?;
        if file.executable {
            make_executable(&target)?;
        }

        tracing::debug!(path = %relative.display(), "rendered template file");
        written.push(relative);
    }

    Ok(written)
}

#[cfg(unix)]
fn make_executable(path: &Path) -> Result<()> {
    use std::os::unix::fs::PermissionsExt;

    let mut permissions = std::fs::metadata(path)
        .with_context(|| format!("Failed to read metadata: {}", path.display()))?
        .permissions();
    permissions.set_mode(permissions.mode() | 0o755);
    std::fs::set_permissions(path, permissions)
        .with_context(|| format!("Failed to set permissions: {}", path.display()))
}

#[cfg(not(unix))]
#[allow(clippy::unnecessary_wraps)]
fn make_executable(_path: &Path) -> Result<()> {
    Ok(())
}
