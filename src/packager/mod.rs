//! Polyglot action packaging.
//!
//! Turns a workspace written for one of the supported runtimes into a
//! deployable action bundle:
//!
//! 1. [`detect`] classifies the workspace as an [`ActionType`]
//! 2. a [`Strategy`] compiles it into the staging area
//! 3. the strategy vendors third-party dependencies with the runtime's own tool
//! 4. [`BundleWriter`] archives compiled sources and dependencies, and writes
//!    the action metadata next to the archive
//!
//! [`Packager`] drives the whole pipeline and reports progress through
//! [`LifecycleEvent`]s.
//!
//! # Example
//!
//! ```no_run
//! use polyglotpkg::packager::{Packager, PackagerOptionsBuilder};
//!
//! # async fn example() -> polyglotpkg::packager::Result<()> {
//! let options = PackagerOptionsBuilder::new()
//!     .workspace("/work/my-action")
//!     .skip_metadata_packaging(false)
//!     .build()?;
//!
//! let packager = Packager::new();
//! let mut events = packager.subscribe();
//! tokio::spawn(async move {
//!     while let Some(event) = events.recv().await {
//!         println!("{event}");
//!     }
//! });
//!
//! let archive = packager.package_project(options).await?;
//! println!("Created: {} ({} bytes)", archive.path.display(), archive.size);
//! println!("SHA256: {}", archive.checksum);
//! # Ok(())
//! # }
//! ```

pub mod builder;
pub mod bundle;
pub mod detect;
pub mod error;
pub mod events;
pub mod settings;
pub mod strategy;
pub mod utils;

pub use builder::{Packager, PackagerState};
pub use bundle::{BundleWriter, BundledArchive};
pub use detect::{detect, validate_workspace};
pub use error::{
    BundleError, CompileError, DependencyInstallError, DetectionError, FsError, PackagingError, Result, Stage,
    ToolError,
};
pub use events::{EventHub, LifecycleEvent, ListenerId};
pub use settings::{ActionType, PackagerOptions, PackagerOptionsBuilder, ProgressSink, Toolchain};
pub use strategy::{BundleLayout, Strategy};
