//! Configuration structures for packaging runs.
//!
//! [`PackagerOptions`] is immutable once built; construct it with
//! [`PackagerOptionsBuilder`].

mod action_type;
mod builder;
mod options;
mod toolchain;

pub use action_type::ActionType;
pub use builder::{DEFAULT_ARCHIVE_PATH, DEFAULT_STAGING_DIR, PackagerOptionsBuilder};
pub use options::{DEFAULT_TOOL_TIMEOUT, METADATA_DIR_NAME, PackagerOptions, ProgressSink};
pub use toolchain::Toolchain;
