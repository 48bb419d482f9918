//! Final bundle creation.
//!
//! [`BundleWriter`] turns a strategy's compiled output and vendored tree into
//! the deployable zip plus its metadata directory:
//!
//! ```text
//! dist/
//! ├── bundle.zip        entry module, sources, vendored dependencies
//! └── vro/
//!     └── action.json   action definition for the target platform
//! ```

mod archive;
mod checksum;
mod writer;

pub use archive::write_zip;
pub use checksum::calculate_sha256;
pub use writer::{BundleWriter, METADATA_FILE};

use crate::packager::ActionType;
use std::path::PathBuf;

/// Result of a successful bundle stage.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BundledArchive {
    /// Final archive location.
    pub path: PathBuf,
    /// Archive size in bytes.
    pub size: u64,
    /// Hex-encoded SHA-256 of the archive.
    pub checksum: String,
    /// Number of archive entries, directories included.
    pub entries: usize,
    pub action_type: ActionType,
    /// Metadata directory, unless metadata packaging was skipped.
    pub metadata_dir: Option<PathBuf>,
}
