//! Command line interface for polyglotpkg.
//!
//! This module provides argument parsing, command execution and user
//! feedback for the `package` and `detect` commands.

mod args;
pub mod commands;
mod output;

pub use args::{Args, Command, PackageArgs, RuntimeConfig};
pub use output::OutputManager;

use crate::error::{CliError, Result};

/// Main CLI entry point
pub async fn run() -> Result<i32> {
    let args = Args::parse_args();
    validate_args(&args).map_err(|reason| CliError::InvalidArguments { reason })?;
    let config = create_runtime_config(&args);

    match &args.command {
        Command::Package(package) => commands::package(package, &config).await,
        Command::Detect { workspace } => commands::detect(workspace),
    }
}

/// Validate arguments without executing (for testing)
pub fn validate_args(args: &Args) -> std::result::Result<(), String> {
    args.validate()
}

/// Create runtime configuration from arguments
pub fn create_runtime_config(args: &Args) -> RuntimeConfig {
    RuntimeConfig::from(args)
}
