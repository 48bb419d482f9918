//! Command line argument parsing and validation.
//!
//! Every option can also be set through a `POLYGLOTPKG_*` environment variable.

use crate::packager::ActionType;
use clap::{Parser, Subcommand};
use std::{ffi::OsString, path::PathBuf};

/// Packager for polyglot automation actions
#[derive(Parser, Debug)]
#[command(
    name = "polyglotpkg",
    version,
    about = "Packages Node.js, Python and PowerShell actions into deployable bundles",
    long_about = "Packages an action workspace into a deployable bundle.

Detects the runtime from the workspace root, compiles or copies the sources,
vendors production dependencies with the runtime's package manager and writes
a zip archive plus a vro/action.json metadata file next to it.

Usage:
  polyglotpkg package
  polyglotpkg package --workspace ./sum --output ./dist/sum.zip
  polyglotpkg package --runtime python --skip-metadata
  polyglotpkg detect ./sum

Exit code 0 = archive guaranteed to exist at the output path."
)]
pub struct Args {
    #[command(subcommand)]
    pub command: Command,

    /// Suppress progress and tool output
    #[arg(short, long, global = true, env = "POLYGLOTPKG_QUIET")]
    pub quiet: bool,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Package a workspace into an action bundle
    Package(PackageArgs),

    /// Print the runtime detected for a workspace
    Detect {
        /// Workspace directory
        #[arg(value_name = "DIR", default_value = ".")]
        workspace: PathBuf,
    },
}

#[derive(clap::Args, Debug)]
pub struct PackageArgs {
    /// Workspace directory
    #[arg(short, long, value_name = "DIR", default_value = ".", env = "POLYGLOTPKG_WORKSPACE")]
    pub workspace: PathBuf,

    /// Output archive path [default: <workspace>/dist/bundle.zip]
    #[arg(short, long, value_name = "FILE", env = "POLYGLOTPKG_OUTPUT")]
    pub output: Option<PathBuf>,

    /// Staging directory, erased stage by stage [default: <workspace>/out]
    #[arg(long, value_name = "DIR", env = "POLYGLOTPKG_STAGING")]
    pub staging: Option<PathBuf>,

    /// Runtime to use instead of detecting one: nodejs, python, powershell
    #[arg(short, long, value_name = "RUNTIME", env = "POLYGLOTPKG_RUNTIME")]
    pub runtime: Option<ActionType>,

    /// Do not write the vro/ metadata directory
    #[arg(long, env = "POLYGLOTPKG_SKIP_METADATA")]
    pub skip_metadata: bool,

    /// Upper bound for a single compiler or package manager run
    #[arg(long, value_name = "SECONDS", env = "POLYGLOTPKG_TOOL_TIMEOUT")]
    pub tool_timeout: Option<u64>,

    /// npm executable
    #[arg(long, value_name = "PROGRAM", env = "POLYGLOTPKG_NPM")]
    pub npm: Option<OsString>,

    /// TypeScript compiler
    #[arg(long, value_name = "PROGRAM", env = "POLYGLOTPKG_TSC")]
    pub tsc: Option<OsString>,

    /// Python interpreter used to run pip
    #[arg(long, value_name = "PROGRAM", env = "POLYGLOTPKG_PYTHON")]
    pub python: Option<OsString>,

    /// PowerShell executable
    #[arg(long, value_name = "PROGRAM", env = "POLYGLOTPKG_PWSH")]
    pub pwsh: Option<OsString>,
}

impl Args {
    /// Parse command line arguments
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Validate arguments for consistency
    pub fn validate(&self) -> Result<(), String> {
        if let Command::Package(package) = &self.command {
            if package.tool_timeout == Some(0) {
                return Err("--tool-timeout must be at least 1 second".to_string());
            }
            if package
                .output
                .as_ref()
                .is_some_and(|output| output.file_name().is_none())
            {
                return Err("--output must name a file".to_string());
            }
        }
        Ok(())
    }
}

/// Configuration derived from command line arguments
#[derive(Debug, Clone)]
pub struct RuntimeConfig {
    /// Output manager for terminal output
    output: super::OutputManager,
}

impl From<&Args> for RuntimeConfig {
    fn from(args: &Args) -> Self {
        Self {
            output: super::OutputManager::new(args.quiet),
        }
    }
}

impl RuntimeConfig {
    /// Get a reference to the output manager
    pub fn output(&self) -> &super::OutputManager {
        &self.output
    }

    pub fn is_quiet(&self) -> bool {
        self.output.is_quiet()
    }

    /// Print success message if not in quiet mode
    pub fn success(&self, message: &str) {
        self.output.success(message)
    }

    /// Print progress message if not in quiet mode
    pub fn progress(&self, message: &str) {
        self.output.progress(message)
    }

    /// Print indented text if not in quiet mode
    pub fn indent(&self, message: &str) {
        self.output.indent(message)
    }
}
