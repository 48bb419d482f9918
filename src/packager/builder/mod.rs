//! Packaging orchestration and coordination.
//!
//! [`Packager`] ties the pieces together:
//! 1. Claims the staging directory
//! 2. Detects the workspace runtime (or reuses the cached strategy)
//! 3. Runs the strategy's compile, dependency and bundle stages
//! 4. Emits lifecycle events and tracks [`PackagerState`]
//!
//! # Module Organization
//!
//! - [`orchestrator`] - Main [`Packager`] struct and run state
//! - [`staging_lock`] - Exclusive staging directory ownership

mod orchestrator;
mod staging_lock;

pub use orchestrator::{Packager, PackagerState};
pub use staging_lock::{StagingLock, lock_path};
