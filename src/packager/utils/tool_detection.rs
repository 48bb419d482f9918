//! External tool resolution.

use crate::packager::error::ToolError;
use std::{
    ffi::OsStr,
    path::{Path, PathBuf},
};

/// Resolves `program` to an executable path.
///
/// Bare names are searched on `PATH`; anything containing a path separator
/// is checked in place.
pub fn resolve_program(program: &OsStr) -> Result<PathBuf, ToolError> {
    match which::which(program) {
        Ok(path) => {
            log::debug!("Resolved {} to {}", program.to_string_lossy(), path.display());
            Ok(path)
        }
        Err(e) => Err(ToolError::NotFound {
            program: program.to_string_lossy().into_owned(),
            reason: e.to_string(),
        }),
    }
}

/// Returns `local` when it exists, otherwise resolves `program` on `PATH`.
///
/// Used for tools a project may pin in `node_modules/.bin`.
pub fn resolve_local_or_global(local: &Path, program: &OsStr) -> Result<PathBuf, ToolError> {
    if local.is_file() {
        log::debug!("Using workspace-local {}", local.display());
        return Ok(local.to_path_buf());
    }
    resolve_program(program)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_program_reports_not_found() {
        let err = resolve_program(OsStr::new("polyglotpkg-definitely-not-installed")).unwrap_err();
        assert!(matches!(err, ToolError::NotFound { .. }));
    }

    #[test]
    fn local_tool_wins_when_present() {
        let dir = tempfile::tempdir().unwrap();
        let local = dir.path().join("tsc");
        std::fs::write(&local, "").unwrap();
        let resolved = resolve_local_or_global(&local, OsStr::new("polyglotpkg-missing-tsc")).unwrap();
        assert_eq!(resolved, local);
    }
}
