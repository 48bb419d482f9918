//! Polyglot action packager library
//!
//! This library packages automation actions written for different runtimes
//! into a single deployable bundle:
//! - Node.js projects (optionally TypeScript), dependencies vendored with npm
//! - Python projects, dependencies vendored with pip
//! - PowerShell scripts and modules, dependencies vendored with `Save-Module`
//!
//! It can be used both as a CLI tool and as a library dependency.

pub mod cli;
pub mod error;
pub mod metadata;
pub mod packager;

// Re-export commonly used types
pub use error::{AppError, CliError, Result};
pub use packager::{ActionType, BundledArchive, LifecycleEvent, Packager, PackagerOptionsBuilder, PackagingError};
