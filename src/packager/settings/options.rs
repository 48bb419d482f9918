//! Immutable per-workspace packager configuration.

use super::{ActionType, Toolchain};
use std::{
    fmt,
    io::Write,
    path::{Path, PathBuf},
    sync::{Arc, Mutex},
    time::Duration,
};

/// Name of the metadata directory created next to the output archive.
pub const METADATA_DIR_NAME: &str = "vro";

/// Default upper bound for a single external tool invocation.
pub const DEFAULT_TOOL_TIMEOUT: Duration = Duration::from_secs(30 * 60);

/// Append-only sink for compiler and package manager output.
///
/// Cloning shares the underlying writer. Writes are serialised, and a failing
/// write is logged and otherwise ignored: losing progress text never fails a run.
#[derive(Clone)]
pub struct ProgressSink {
    inner: Arc<Mutex<Box<dyn Write + Send>>>,
}

impl ProgressSink {
    pub fn new(writer: impl Write + Send + 'static) -> Self {
        Self {
            inner: Arc::new(Mutex::new(Box::new(writer))),
        }
    }

    /// Writes one line of tool output.
    pub fn write_line(&self, line: &str) {
        let mut writer = match self.inner.lock() {
            Ok(writer) => writer,
            Err(poisoned) => poisoned.into_inner(),
        };
        if let Err(e) = writeln!(writer, "{line}").and_then(|_| writer.flush()) {
            log::warn!("Failed to write to progress sink: {e}");
        }
    }
}

impl fmt::Debug for ProgressSink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ProgressSink")
    }
}

/// Configuration for packaging one workspace, built with
/// [`PackagerOptionsBuilder`](super::PackagerOptionsBuilder).
///
/// # Examples
///
/// ```no_run
/// use polyglotpkg::packager::PackagerOptionsBuilder;
///
/// # fn example() -> polyglotpkg::packager::Result<()> {
/// let options = PackagerOptionsBuilder::new()
///     .workspace("/work/my-action")
///     .output_archive_path("/work/my-action/dist/bundle.zip")
///     .bundle_staging_path("/work/my-action/out")
///     .build()?;
///
/// assert!(options.metadata_output_path().ends_with("dist/vro"));
/// # Ok(())
/// # }
/// ```
#[derive(Clone, Debug)]
pub struct PackagerOptions {
    workspace: PathBuf,
    output_archive_path: PathBuf,
    bundle_staging_path: PathBuf,
    metadata_output_path: PathBuf,
    skip_metadata_packaging: bool,
    runtime_override: Option<ActionType>,
    progress_sink: Option<ProgressSink>,
    toolchain: Toolchain,
    tool_timeout: Duration,
}

impl PackagerOptions {
    /// Absolute path to the project root.
    pub fn workspace(&self) -> &Path {
        &self.workspace
    }

    /// Final bundle file.
    pub fn output_archive_path(&self) -> &Path {
        &self.output_archive_path
    }

    /// Scratch directory owned by the run.
    pub fn bundle_staging_path(&self) -> &Path {
        &self.bundle_staging_path
    }

    /// Metadata directory, a `vro` sibling of the output archive.
    pub fn metadata_output_path(&self) -> &Path {
        &self.metadata_output_path
    }

    pub fn skip_metadata_packaging(&self) -> bool {
        self.skip_metadata_packaging
    }

    /// Runtime to use instead of detecting one.
    pub fn runtime_override(&self) -> Option<ActionType> {
        self.runtime_override
    }

    pub fn progress_sink(&self) -> Option<&ProgressSink> {
        self.progress_sink.as_ref()
    }

    pub fn toolchain(&self) -> &Toolchain {
        &self.toolchain
    }

    pub fn tool_timeout(&self) -> Duration {
        self.tool_timeout
    }

    /// Staging subdirectory holding compile output.
    pub fn compiled_dir(&self) -> PathBuf {
        self.bundle_staging_path.join("compiled")
    }

    /// Staging subdirectory where dependencies are installed.
    pub fn vendor_dir(&self) -> PathBuf {
        self.bundle_staging_path.join("vendor")
    }

    /// Staging subdirectory holding the tree that gets archived.
    pub fn assembly_dir(&self) -> PathBuf {
        self.bundle_staging_path.join("bundle")
    }

    /// Staging subdirectory where metadata is prepared before it is moved into place.
    pub fn staged_metadata_dir(&self) -> PathBuf {
        self.bundle_staging_path.join(METADATA_DIR_NAME)
    }

    #[allow(clippy::too_many_arguments)]
    pub(super) fn new(
        workspace: PathBuf,
        output_archive_path: PathBuf,
        bundle_staging_path: PathBuf,
        metadata_output_path: PathBuf,
        skip_metadata_packaging: bool,
        runtime_override: Option<ActionType>,
        progress_sink: Option<ProgressSink>,
        toolchain: Toolchain,
        tool_timeout: Duration,
    ) -> Self {
        Self {
            workspace,
            output_archive_path,
            bundle_staging_path,
            metadata_output_path,
            skip_metadata_packaging,
            runtime_override,
            progress_sink,
            toolchain,
            tool_timeout,
        }
    }
}
