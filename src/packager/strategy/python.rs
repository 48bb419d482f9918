//! Python strategy: pass-through sources, pip-vendored dependencies at the bundle root.

use super::{BundleLayout, RuntimeStrategy, StrategyBase};
use crate::packager::{
    error::{CompileError, DependencyInstallError, ErrorExt},
    utils::process::ToolCommand,
};
use std::{
    ffi::OsString,
    path::{Path, PathBuf},
};

const REQUIREMENTS_FILE: &str = "requirements.txt";
const PYPROJECT_FILE: &str = "pyproject.toml";

#[derive(Clone, Debug)]
pub struct PythonStrategy {
    base: StrategyBase,
}

impl PythonStrategy {
    pub fn new(base: StrategyBase) -> Self {
        Self { base }
    }

    /// pip arguments naming what to install, or `None` when nothing is declared.
    async fn requirement_args(&self) -> Result<Option<Vec<OsString>>, DependencyInstallError> {
        let workspace = self.base.workspace();

        let requirements = workspace.join(REQUIREMENTS_FILE);
        if requirements.is_file() {
            let content = tokio::fs::read_to_string(&requirements)
                .await
                .fs_context("reading requirements.txt", &requirements)?;
            if !declares_requirements(&content) {
                return Ok(None);
            }
            return Ok(Some(vec!["-r".into(), requirements.into_os_string()]));
        }

        let pyproject = workspace.join(PYPROJECT_FILE);
        if pyproject.is_file() {
            let dependencies = pyproject_dependencies(&pyproject).await?;
            if !dependencies.is_empty() {
                return Ok(Some(dependencies.into_iter().map(OsString::from).collect()));
            }
        }

        Ok(None)
    }
}

/// Whether a requirements file has anything besides blank lines and comments.
fn declares_requirements(content: &str) -> bool {
    content.lines().map(str::trim).any(|line| !line.is_empty() && !line.starts_with('#'))
}

/// Reads `[project].dependencies` from a `pyproject.toml`.
async fn pyproject_dependencies(path: &Path) -> Result<Vec<String>, DependencyInstallError> {
    let content = tokio::fs::read_to_string(path)
        .await
        .fs_context("reading pyproject.toml", path)?;
    let table: toml::Table = toml::from_str(&content).map_err(|e| DependencyInstallError::InvalidManifest {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })?;

    let Some(dependencies) = table.get("project").and_then(|p| p.get("dependencies")) else {
        return Ok(Vec::new());
    };
    let entries = dependencies
        .as_array()
        .ok_or_else(|| DependencyInstallError::InvalidManifest {
            path: path.to_path_buf(),
            reason: "[project].dependencies must be an array".to_string(),
        })?;

    entries
        .iter()
        .map(|entry| {
            entry.as_str().map(String::from).ok_or_else(|| DependencyInstallError::InvalidManifest {
                path: path.to_path_buf(),
                reason: format!("dependency {entry} is not a string"),
            })
        })
        .collect()
}

impl RuntimeStrategy for PythonStrategy {
    fn base(&self) -> &StrategyBase {
        &self.base
    }

    fn base_mut(&mut self) -> &mut StrategyBase {
        &mut self.base
    }

    async fn compile(&self) -> Result<(), CompileError> {
        self.base.copy_sources().await?;
        self.base.verify_entry_point()
    }

    async fn install_dependencies(&self) -> Result<(), DependencyInstallError> {
        let vendor = self.base.prepare_vendor_dir().await?;

        let Some(requirements) = self.requirement_args().await? else {
            log::info!("No Python dependencies declared");
            return Ok(());
        };

        let command = ToolCommand::new(&self.base.options().toolchain().python, self.base.workspace())
            .args(["-m", "pip", "install"])
            .arg("--target")
            .arg(&vendor)
            .args(["--no-input", "--disable-pip-version-check", "--no-cache-dir"])
            .args(requirements)
            .env("PIP_NO_INPUT", "1");
        self.base.run_tool(command).await?;
        Ok(())
    }

    fn layout(&self) -> BundleLayout {
        BundleLayout {
            vendored_dir: self.base.options().vendor_dir(),
            dependencies_prefix: PathBuf::new(),
        }
    }
}
