//! Logic shared by every runtime strategy.

use crate::{
    metadata::{self, ActionDefinition, ActionManifest, ManifestError},
    packager::{
        ActionType, PackagerOptions,
        builder::lock_path,
        error::{CompileError, FsError, ToolError},
        utils::{fs, ignore::IgnoreList, process::ToolCommand},
    },
};
use std::path::{Path, PathBuf};

/// Where a strategy's vendored dependencies come from and where they land in the bundle.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BundleLayout {
    /// Directory holding the installed third-party packages.
    pub vendored_dir: PathBuf,
    /// Bundle-relative directory the vendored tree is placed under; empty for the bundle root.
    pub dependencies_prefix: PathBuf,
}

/// State and helpers common to all strategies: the bound options and runtime.
#[derive(Clone, Debug)]
pub struct StrategyBase {
    options: PackagerOptions,
    action_type: ActionType,
}

impl StrategyBase {
    pub fn new(options: PackagerOptions, action_type: ActionType) -> Self {
        Self { options, action_type }
    }

    pub fn options(&self) -> &PackagerOptions {
        &self.options
    }

    pub(crate) fn rebind(&mut self, options: PackagerOptions) {
        self.options = options;
    }

    pub fn action_type(&self) -> ActionType {
        self.action_type
    }

    pub fn workspace(&self) -> &Path {
        self.options.workspace()
    }

    /// Reads `package.json`, if the workspace has one.
    pub fn manifest(&self) -> Result<Option<ActionManifest>, ManifestError> {
        metadata::load_manifest(self.workspace())
    }

    /// Resolves the action definition from the manifest and defaults.
    pub fn definition(&self) -> Result<ActionDefinition, ManifestError> {
        let manifest = self.manifest()?;
        Ok(ActionDefinition::resolve(
            self.workspace(),
            manifest.as_ref(),
            self.action_type,
        ))
    }

    /// Ignore list for pass-through copies: the fixed list plus the staging
    /// directory, its lock file and the output directory.
    pub fn ignore_list(&self) -> IgnoreList {
        let staging = self.options.bundle_staging_path();
        let mut ignore = IgnoreList::default()
            .exclude_path(staging)
            .exclude_path(lock_path(staging));
        if let Some(output_dir) = self.options.output_archive_path().parent() {
            // Excluding the workspace or one of its ancestors would skip everything.
            if self.workspace().starts_with(output_dir) {
                ignore = ignore.exclude_path(self.options.output_archive_path());
            } else {
                ignore = ignore.exclude_path(output_dir);
            }
        }
        if self.options.metadata_output_path().starts_with(self.workspace()) {
            ignore = ignore.exclude_path(self.options.metadata_output_path());
        }
        ignore
    }

    /// Recreates `compiled/` and copies the workspace sources into it.
    pub async fn copy_sources(&self) -> Result<(), CompileError> {
        let compiled = self.options.compiled_dir();
        fs::create_dir_all(&compiled, true).await?;
        let copied = fs::copy_dir(self.workspace(), &compiled, self.ignore_list()).await?;
        log::info!("Copied {copied} source file(s) to {}", compiled.display());
        Ok(())
    }

    /// Checks the compiled output contains the module named by the entrypoint.
    pub fn verify_entry_point(&self) -> Result<(), CompileError> {
        let definition = self.definition()?;
        let expected = self.options.compiled_dir().join(definition.entry_module_path());
        if !expected.is_file() {
            return Err(CompileError::MissingEntryPoint {
                entrypoint: definition.entrypoint,
                expected,
            });
        }
        log::debug!("Entry point {} found at {}", definition.entrypoint, expected.display());
        Ok(())
    }

    /// Recreates `vendor/` and returns its path.
    pub async fn prepare_vendor_dir(&self) -> Result<PathBuf, FsError> {
        let vendor = self.options.vendor_dir();
        fs::create_dir_all(&vendor, true).await?;
        Ok(vendor)
    }

    /// Runs a tool with the configured progress sink and timeout.
    pub async fn run_tool(&self, command: ToolCommand) -> Result<(), ToolError> {
        command
            .run(self.options.progress_sink(), self.options.tool_timeout())
            .await
    }
}
