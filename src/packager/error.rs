//! Error types for every packaging stage.
//!
//! Each stage has its own error enum so callers can match on the failure kind,
//! and [`PackagingError`] wraps them with the failing stage identified.

use std::{
    fmt,
    path::{Path, PathBuf},
    process::ExitStatus,
};
use thiserror::Error;

/// Result alias for whole-run packaging operations.
pub type Result<T> = std::result::Result<T, PackagingError>;

/// Pipeline stage identifier, used in error messages and the run state.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub enum Stage {
    /// Workspace classification.
    Detect,
    /// Source compilation or pass-through copy.
    Compile,
    /// Dependency resolution and vendoring.
    Dependencies,
    /// Bundle assembly and archiving.
    Bundle,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Stage::Detect => "detect",
            Stage::Compile => "compile",
            Stage::Dependencies => "dependencies",
            Stage::Bundle => "bundle",
        })
    }
}

/// A filesystem operation that failed, with what was being done and where.
#[derive(Debug, Error)]
#[error("{context} ({}): {source}", .path.display())]
pub struct FsError {
    /// Short description of the operation, e.g. "copying compiled sources".
    pub context: &'static str,
    /// Path the operation was acting on.
    pub path: PathBuf,
    /// Underlying I/O error.
    #[source]
    pub source: std::io::Error,
}

/// Attaches operation context and a path to I/O results.
pub trait ErrorExt<T> {
    /// Converts an `io::Error` into an [`FsError`] carrying `context` and `path`.
    fn fs_context(self, context: &'static str, path: impl AsRef<Path>) -> std::result::Result<T, FsError>;
}

impl<T> ErrorExt<T> for std::result::Result<T, std::io::Error> {
    fn fs_context(self, context: &'static str, path: impl AsRef<Path>) -> std::result::Result<T, FsError> {
        self.map_err(|source| FsError {
            context,
            path: path.as_ref().to_path_buf(),
            source,
        })
    }
}

/// Failure of an external tool invocation.
#[derive(Debug, Error)]
pub enum ToolError {
    /// The program could not be located on `PATH` or at the given path.
    #[error("`{program}` not found: {reason}. Install it or point the toolchain at it")]
    NotFound {
        /// Program as configured in the toolchain.
        program: String,
        /// Why resolution failed.
        reason: String,
    },

    /// The process could not be started.
    #[error("failed to start `{command}`: {source}")]
    Spawn {
        /// Rendered command line.
        command: String,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// The process ran and exited unsuccessfully.
    #[error("`{command}` exited with {}{}", describe_status(.code), render_tail(.stderr_tail))]
    Failed {
        /// Rendered command line.
        command: String,
        /// Exit code, `None` when terminated by a signal.
        code: Option<i32>,
        /// Last lines written to stderr.
        stderr_tail: Vec<String>,
    },

    /// The process exceeded the configured tool timeout and was killed.
    #[error("`{command}` timed out after {seconds}s")]
    TimedOut {
        /// Rendered command line.
        command: String,
        /// Timeout that elapsed.
        seconds: u64,
    },
}

impl ToolError {
    pub(crate) fn failed(command: String, status: ExitStatus, stderr_tail: Vec<String>) -> Self {
        ToolError::Failed {
            command,
            code: status.code(),
            stderr_tail,
        }
    }
}

fn describe_status(code: &Option<i32>) -> String {
    match code {
        Some(code) => format!("exit code {code}"),
        None => "termination by signal".to_string(),
    }
}

fn render_tail(lines: &[String]) -> String {
    if lines.is_empty() {
        String::new()
    } else {
        format!("\n{}", lines.join("\n"))
    }
}

/// Workspace could not be classified.
#[derive(Debug, Error)]
pub enum DetectionError {
    #[error("workspace does not exist: {}", .0.display())]
    NotFound(PathBuf),

    #[error("workspace is not a directory: {}", .0.display())]
    NotADirectory(PathBuf),

    #[error("workspace is not readable: {0}")]
    Unreadable(#[from] FsError),

    /// Detection completed but matched no supported runtime.
    #[error("unsupported project type: no recognized runtime marker in {}", .0.display())]
    UnsupportedProjectType(PathBuf),

    #[error("invalid manifest {}: {reason}", .path.display())]
    InvalidManifest { path: PathBuf, reason: String },
}

/// Compile stage failure.
#[derive(Debug, Error)]
pub enum CompileError {
    #[error(transparent)]
    Tool(#[from] ToolError),

    /// The compiled output lacks the module the action entrypoint refers to.
    #[error("entry point `{entrypoint}` not found: expected {}", .expected.display())]
    MissingEntryPoint { entrypoint: String, expected: PathBuf },

    #[error(transparent)]
    Fs(#[from] FsError),

    #[error("invalid manifest {}: {reason}", .path.display())]
    InvalidManifest { path: PathBuf, reason: String },

    #[error("{0}")]
    TaskFailed(String),
}

/// Dependency install stage failure.
#[derive(Debug, Error)]
pub enum DependencyInstallError {
    #[error(transparent)]
    Tool(#[from] ToolError),

    #[error(transparent)]
    Fs(#[from] FsError),

    #[error("invalid manifest {}: {reason}", .path.display())]
    InvalidManifest { path: PathBuf, reason: String },
}

/// Bundle assembly failure.
#[derive(Debug, Error)]
pub enum BundleError {
    /// A vendored file would overwrite a compiled file at the same bundle path.
    #[error("path conflict: `{}` exists in both compiled sources and vendored dependencies", .path.display())]
    PathConflict {
        /// Path relative to the bundle root.
        path: PathBuf,
    },

    #[error(transparent)]
    Fs(#[from] FsError),

    #[error("archive error: {0}")]
    Archive(#[from] zip::result::ZipError),

    #[error("directory walk failed: {0}")]
    Walk(#[from] walkdir::Error),

    #[error("metadata serialization failed: {0}")]
    Metadata(#[from] serde_json::Error),

    #[error("invalid manifest {}: {reason}", .path.display())]
    InvalidManifest { path: PathBuf, reason: String },

    #[error("{0}")]
    TaskFailed(String),
}

/// Umbrella error for a packaging run.
///
/// Stage failures render as `<stage> stage failed: <cause>`; callers decide how
/// to present them.
#[derive(Debug, Error)]
pub enum PackagingError {
    #[error("detect stage failed: {0}")]
    Detection(#[from] DetectionError),

    #[error("compile stage failed: {0}")]
    Compile(#[from] CompileError),

    #[error("dependencies stage failed: {0}")]
    Dependencies(#[from] DependencyInstallError),

    #[error("bundle stage failed: {0}")]
    Bundle(#[from] BundleError),

    /// Another run is already in flight on this packager.
    #[error("a packaging run is already in progress")]
    RunInProgress,

    /// Another run owns the staging directory.
    #[error("staging directory {} is in use by another run", .0.display())]
    StagingBusy(PathBuf),

    /// The staging lock could not be created.
    #[error("staging directory unavailable: {0}")]
    Staging(#[from] FsError),

    /// The run was cancelled between stages.
    #[error("packaging cancelled before the {before} stage")]
    Cancelled { before: Stage },

    #[error("invalid packager options: {0}")]
    InvalidOptions(String),
}

impl PackagingError {
    /// Stage the failure belongs to, if it came from a pipeline stage.
    pub fn stage(&self) -> Option<Stage> {
        match self {
            PackagingError::Detection(_) => Some(Stage::Detect),
            PackagingError::Compile(_) => Some(Stage::Compile),
            PackagingError::Dependencies(_) => Some(Stage::Dependencies),
            PackagingError::Bundle(_) => Some(Stage::Bundle),
            PackagingError::Cancelled { before } => Some(*before),
            _ => None,
        }
    }
}

macro_rules! impl_from_manifest_error {
    ($($ty:ty),*) => {
        $(
            impl From<crate::metadata::ManifestError> for $ty {
                fn from(e: crate::metadata::ManifestError) -> Self {
                    Self::InvalidManifest {
                        path: e.path,
                        reason: e.reason,
                    }
                }
            }
        )*
    };
}

impl_from_manifest_error!(DetectionError, CompileError, DependencyInstallError, BundleError);
