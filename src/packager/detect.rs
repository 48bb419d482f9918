//! Workspace runtime classification.
//!
//! Only the workspace root is inspected. Markers are checked in a fixed
//! priority order and the first match wins:
//!
//! 1. `package.json` declaring a supported `platform.runtime`
//! 2. `package.json` (Node)
//! 3. `requirements.txt` (Python)
//! 4. `pyproject.toml` (Python)
//! 5. any `*.psd1` module manifest (PowerShell)
//! 6. any `*.ps1` script (PowerShell)
//!
//! A workspace with none of these is [`ActionType::Unknown`].

use super::{
    ActionType,
    error::{DetectionError, ErrorExt},
};
use crate::metadata::{self, MANIFEST_FILE};
use std::path::Path;

/// A file marker and the runtime it indicates.
enum Marker {
    /// Exact file name in the workspace root.
    File(&'static str, ActionType),
    /// Any root file with this extension.
    Extension(&'static str, ActionType),
}

/// File markers after the declared-runtime check, highest priority first.
const MARKERS: &[Marker] = &[
    Marker::File(MANIFEST_FILE, ActionType::Node),
    Marker::File("requirements.txt", ActionType::Python),
    Marker::File("pyproject.toml", ActionType::Python),
    Marker::Extension("psd1", ActionType::PowerShell),
    Marker::Extension("ps1", ActionType::PowerShell),
];

/// Checks that `workspace` exists and is a directory.
pub fn validate_workspace(workspace: &Path) -> Result<(), DetectionError> {
    let metadata = match std::fs::metadata(workspace) {
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Err(DetectionError::NotFound(workspace.to_path_buf()));
        }
        other => other.fs_context("reading workspace", workspace)?,
    };
    if !metadata.is_dir() {
        return Err(DetectionError::NotADirectory(workspace.to_path_buf()));
    }
    Ok(())
}

/// Classifies `workspace` into a runtime.
///
/// Returns [`ActionType::Unknown`] when no marker matches; only a missing or
/// unreadable workspace (or an unparseable `package.json`) is an error.
///
/// # Examples
///
/// ```no_run
/// use polyglotpkg::packager::{ActionType, detect};
///
/// # fn example() -> Result<(), polyglotpkg::packager::DetectionError> {
/// match detect(std::path::Path::new("./my-action"))? {
///     ActionType::Unknown => eprintln!("unsupported project type"),
///     runtime => println!("detected {runtime}"),
/// }
/// # Ok(())
/// # }
/// ```
pub fn detect(workspace: &Path) -> Result<ActionType, DetectionError> {
    validate_workspace(workspace)?;

    if let Some(runtime) = metadata::load_manifest(workspace)?.and_then(|m| m.declared_runtime()) {
        log::debug!("{} declares runtime {runtime}", MANIFEST_FILE);
        return Ok(runtime);
    }

    let mut root_files: Vec<String> = Vec::new();
    for entry in std::fs::read_dir(workspace).fs_context("listing workspace", workspace)? {
        let entry = entry.fs_context("listing workspace", workspace)?;
        // Symlinked markers count when their target is a regular file.
        if entry.path().is_file() {
            root_files.push(entry.file_name().to_string_lossy().into_owned());
        }
    }
    root_files.sort();

    for marker in MARKERS {
        let matched = match marker {
            Marker::File(name, runtime) => root_files.iter().any(|f| f == name).then_some((*name, *runtime)),
            Marker::Extension(ext, runtime) => root_files
                .iter()
                .find(|f| Path::new(f).extension().is_some_and(|e| e.eq_ignore_ascii_case(ext)))
                .map(|f| (f.as_str(), *runtime)),
        };
        if let Some((file, runtime)) = matched {
            log::debug!("Detected {runtime} workspace from marker {file}");
            return Ok(runtime);
        }
    }

    log::debug!("No runtime marker found in {}", workspace.display());
    Ok(ActionType::Unknown)
}
