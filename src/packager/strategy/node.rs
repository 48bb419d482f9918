//! Node.js strategy: optional TypeScript compilation and npm-vendored dependencies.

use super::{BundleLayout, RuntimeStrategy, StrategyBase};
use crate::{
    metadata::MANIFEST_FILE,
    packager::{
        error::{CompileError, DependencyInstallError},
        utils::{fs, process::ToolCommand, tool_detection::resolve_local_or_global},
    },
};
use std::path::PathBuf;

/// Lock files that make `npm ci` usable, in preference order.
const LOCK_FILES: &[&str] = &["npm-shrinkwrap.json", "package-lock.json"];

/// Files copied next to `package.json` so npm resolves the same registry and versions.
const INSTALL_FILES: &[&str] = &[MANIFEST_FILE, "npm-shrinkwrap.json", "package-lock.json", ".npmrc"];

#[derive(Clone, Debug)]
pub struct NodeStrategy {
    base: StrategyBase,
}

impl NodeStrategy {
    pub fn new(base: StrategyBase) -> Self {
        Self { base }
    }

    fn node_modules(&self) -> PathBuf {
        self.base.options().vendor_dir().join("node_modules")
    }

    /// Runs `tsc` into `compiled/` and copies `package.json` alongside.
    async fn transpile(&self) -> Result<(), CompileError> {
        let workspace = self.base.workspace();
        let compiled = self.base.options().compiled_dir();
        fs::create_dir_all(&compiled, true).await?;

        let local_tsc = workspace.join("node_modules").join(".bin").join("tsc");
        let tsc = resolve_local_or_global(&local_tsc, &self.base.options().toolchain().tsc)?;

        self.base
            .run_tool(
                ToolCommand::new(tsc, workspace)
                    .arg("-p")
                    .arg(workspace)
                    .arg("--outDir")
                    .arg(&compiled),
            )
            .await?;

        let manifest = workspace.join(MANIFEST_FILE);
        if manifest.is_file() {
            fs::copy_file(&manifest, &compiled.join(MANIFEST_FILE)).await?;
        }
        Ok(())
    }
}

impl RuntimeStrategy for NodeStrategy {
    fn base(&self) -> &StrategyBase {
        &self.base
    }

    fn base_mut(&mut self) -> &mut StrategyBase {
        &mut self.base
    }

    async fn compile(&self) -> Result<(), CompileError> {
        if self.base.workspace().join("tsconfig.json").is_file() {
            log::info!("Transpiling TypeScript project");
            self.transpile().await?;
        } else {
            self.base.copy_sources().await?;
        }
        self.base.verify_entry_point()
    }

    async fn install_dependencies(&self) -> Result<(), DependencyInstallError> {
        let vendor = self.base.prepare_vendor_dir().await?;
        let node_modules = self.node_modules();

        let has_dependencies = self
            .base
            .manifest()?
            .is_some_and(|manifest| manifest.has_dependencies());
        if !has_dependencies {
            log::info!("No production dependencies declared in {MANIFEST_FILE}");
            fs::create_dir_all(&node_modules, false).await?;
            return Ok(());
        }

        let workspace = self.base.workspace();
        for name in INSTALL_FILES {
            let src = workspace.join(name);
            if src.is_file() {
                fs::copy_file(&src, &vendor.join(name)).await?;
            }
        }

        let use_ci = LOCK_FILES.iter().any(|lock| vendor.join(lock).is_file());
        let command = ToolCommand::new(&self.base.options().toolchain().npm, &vendor)
            .arg(if use_ci { "ci" } else { "install" })
            .args(["--omit=dev", "--no-audit", "--no-fund"]);
        self.base.run_tool(command).await?;

        // A manifest whose dependencies all resolve to nothing still yields the directory.
        fs::create_dir_all(&node_modules, false).await?;
        Ok(())
    }

    fn layout(&self) -> BundleLayout {
        BundleLayout {
            vendored_dir: self.node_modules(),
            dependencies_prefix: PathBuf::from("node_modules"),
        }
    }
}
