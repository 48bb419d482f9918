//! `polyglotpkg detect`: print a workspace's runtime.

use crate::{
    error::Result,
    packager::{self, PackagingError},
};
use std::path::Path;

/// Prints the detected runtime. Exits with 1 when no supported runtime matches.
pub fn detect(workspace: &Path) -> Result<i32> {
    let action_type = packager::detect(workspace).map_err(PackagingError::from)?;
    println!("{action_type}");

    if action_type.is_supported() {
        Ok(0)
    } else {
        log::info!("No runtime marker found in {}", workspace.display());
        Ok(1)
    }
}
