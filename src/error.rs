//! Application-level error types.
//!
//! Packaging failures keep their stage and cause; this layer adds CLI errors
//! and recovery hints for the command line.

use crate::packager::{BundleError, CompileError, DependencyInstallError, DetectionError, PackagingError, ToolError};
use thiserror::Error;

/// Result type alias for CLI operations
pub type Result<T> = std::result::Result<T, AppError>;

/// Main error type for the command line tool
#[derive(Error, Debug)]
pub enum AppError {
    /// CLI argument errors
    #[error("CLI error: {0}")]
    Cli(#[from] CliError),

    /// Packaging pipeline errors
    #[error(transparent)]
    Packaging(#[from] PackagingError),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Generic errors from anyhow
    #[error("{0}")]
    Anyhow(#[from] anyhow::Error),
}

/// CLI-specific errors
#[derive(Error, Debug)]
pub enum CliError {
    /// Invalid command line arguments
    #[error("Invalid arguments: {reason}")]
    InvalidArguments {
        /// Reason for the error
        reason: String,
    },
}

impl AppError {
    /// Get actionable recovery suggestions for this error
    pub fn recovery_suggestions(&self) -> Vec<String> {
        let AppError::Packaging(error) = self else {
            return vec!["Run with --help for usage".to_string()];
        };

        match error {
            PackagingError::Detection(DetectionError::UnsupportedProjectType(_)) => vec![
                "Add package.json, requirements.txt, pyproject.toml or a PowerShell .psd1/.ps1 file to the workspace root"
                    .to_string(),
                "Or pass --runtime nodejs|python|powershell".to_string(),
            ],
            PackagingError::Compile(CompileError::Tool(tool))
            | PackagingError::Dependencies(DependencyInstallError::Tool(tool)) => tool_suggestions(tool),
            PackagingError::Compile(CompileError::MissingEntryPoint { .. }) => vec![
                "Set platform.entrypoint in package.json to <module>.<function>".to_string(),
            ],
            PackagingError::Bundle(BundleError::PathConflict { path }) => vec![format!(
                "Remove {} from the workspace or from the declared dependencies",
                path.display()
            )],
            PackagingError::StagingBusy(_) => vec![
                "Wait for the other run to finish or pass a different --staging directory".to_string(),
            ],
            _ => vec!["Re-run with RUST_LOG=debug for details".to_string()],
        }
    }

    /// Process exit code for this error: 2 for usage errors, 1 otherwise.
    pub fn exit_code(&self) -> i32 {
        match self {
            AppError::Cli(_) => 2,
            _ => 1,
        }
    }
}

fn tool_suggestions(error: &ToolError) -> Vec<String> {
    match error {
        ToolError::NotFound { program, .. } => vec![format!(
            "Install `{program}` or point the matching --npm/--tsc/--python/--pwsh option at it"
        )],
        ToolError::TimedOut { .. } => vec!["Raise --tool-timeout for slow registries".to_string()],
        ToolError::Failed { .. } | ToolError::Spawn { .. } => {
            vec!["Check the tool output above; the last stderr lines are included in the error".to_string()]
        }
    }
}
