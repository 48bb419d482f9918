//! Builder for constructing PackagerOptions.

use super::{ActionType, PackagerOptions, ProgressSink, Toolchain, options::{DEFAULT_TOOL_TIMEOUT, METADATA_DIR_NAME}};
use crate::packager::error::{PackagingError, Result};
use path_absolutize::Absolutize;
use std::{
    path::{Path, PathBuf},
    time::Duration,
};

/// Staging directory used when none is configured, relative to the workspace.
pub const DEFAULT_STAGING_DIR: &str = "out";

/// Archive path used when none is configured, relative to the workspace.
pub const DEFAULT_ARCHIVE_PATH: &str = "dist/bundle.zip";

/// Builder for constructing [`PackagerOptions`].
///
/// Relative paths are resolved against the current directory. Output and
/// staging paths default to `dist/bundle.zip` and `out` inside the workspace.
///
/// # Examples
///
/// ```no_run
/// use polyglotpkg::packager::{ActionType, PackagerOptionsBuilder};
///
/// # fn example() -> polyglotpkg::packager::Result<()> {
/// let options = PackagerOptionsBuilder::new()
///     .workspace("actions/sum")
///     .runtime_override(ActionType::Python)
///     .skip_metadata_packaging(true)
///     .build()?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Default)]
pub struct PackagerOptionsBuilder {
    workspace: Option<PathBuf>,
    output_archive_path: Option<PathBuf>,
    bundle_staging_path: Option<PathBuf>,
    skip_metadata_packaging: bool,
    runtime_override: Option<ActionType>,
    progress_sink: Option<ProgressSink>,
    toolchain: Toolchain,
    tool_timeout: Option<Duration>,
}

impl PackagerOptionsBuilder {
    pub fn new() -> Self {
        Default::default()
    }

    /// Sets the project root.
    ///
    /// # Required
    ///
    /// This field is required for building.
    pub fn workspace<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.workspace = Some(path.as_ref().to_path_buf());
        self
    }

    /// Sets the final bundle file.
    pub fn output_archive_path<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.output_archive_path = Some(path.as_ref().to_path_buf());
        self
    }

    /// Sets the scratch directory. Its contents are erased at the start of every run.
    pub fn bundle_staging_path<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.bundle_staging_path = Some(path.as_ref().to_path_buf());
        self
    }

    pub fn skip_metadata_packaging(mut self, skip: bool) -> Self {
        self.skip_metadata_packaging = skip;
        self
    }

    /// Forces a runtime instead of detecting it.
    pub fn runtime_override(mut self, runtime: ActionType) -> Self {
        self.runtime_override = Some(runtime);
        self
    }

    pub fn progress_sink(mut self, sink: ProgressSink) -> Self {
        self.progress_sink = Some(sink);
        self
    }

    pub fn toolchain(mut self, toolchain: Toolchain) -> Self {
        self.toolchain = toolchain;
        self
    }

    /// Default: 30 minutes.
    pub fn tool_timeout(mut self, timeout: Duration) -> Self {
        self.tool_timeout = Some(timeout);
        self
    }

    /// Builds the options.
    ///
    /// # Errors
    ///
    /// Returns [`PackagingError::InvalidOptions`] if:
    /// - `workspace` is missing
    /// - `runtime_override` is [`ActionType::Unknown`]
    /// - the staging directory is the workspace or one of its ancestors
    /// - the output archive lies inside the staging directory
    pub fn build(self) -> Result<PackagerOptions> {
        let workspace = self
            .workspace
            .ok_or_else(|| PackagingError::InvalidOptions("workspace is required".into()))?;
        let workspace = absolutize(&workspace)?;

        if self.runtime_override == Some(ActionType::Unknown) {
            return Err(PackagingError::InvalidOptions(
                "runtime override must name a supported runtime".into(),
            ));
        }

        let output_archive_path = match self.output_archive_path {
            Some(path) => absolutize(&path)?,
            None => workspace.join(DEFAULT_ARCHIVE_PATH),
        };
        let bundle_staging_path = match self.bundle_staging_path {
            Some(path) => absolutize(&path)?,
            None => workspace.join(DEFAULT_STAGING_DIR),
        };

        if workspace.starts_with(&bundle_staging_path) {
            return Err(PackagingError::InvalidOptions(format!(
                "staging directory {} would erase the workspace",
                bundle_staging_path.display()
            )));
        }
        if output_archive_path.starts_with(&bundle_staging_path) {
            return Err(PackagingError::InvalidOptions(format!(
                "output archive {} must not be inside the staging directory {}",
                output_archive_path.display(),
                bundle_staging_path.display()
            )));
        }

        let metadata_output_path = output_archive_path
            .parent()
            .map(|parent| parent.join(METADATA_DIR_NAME))
            .ok_or_else(|| {
                PackagingError::InvalidOptions(format!(
                    "output archive {} has no parent directory",
                    output_archive_path.display()
                ))
            })?;

        Ok(PackagerOptions::new(
            workspace,
            output_archive_path,
            bundle_staging_path,
            metadata_output_path,
            self.skip_metadata_packaging,
            self.runtime_override,
            self.progress_sink,
            self.toolchain,
            self.tool_timeout.unwrap_or(DEFAULT_TOOL_TIMEOUT),
        ))
    }
}

fn absolutize(path: &Path) -> Result<PathBuf> {
    path.absolutize()
        .map(|p| p.into_owned())
        .map_err(|e| PackagingError::InvalidOptions(format!("cannot resolve {}: {e}", path.display())))
}
