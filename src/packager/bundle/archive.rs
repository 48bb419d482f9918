//! Reproducible zip archives.
//!
//! Entries are written in path order with a fixed timestamp and normalised
//! permissions, so the same tree always produces the same bytes.

use crate::packager::{
    error::{BundleError, ErrorExt},
    utils::fs::walk_error,
};
use std::{
    fs::File,
    io,
    path::{Path, PathBuf},
};
use walkdir::WalkDir;
use zip::{CompressionMethod, DateTime, ZipWriter, write::SimpleFileOptions};

const DIR_MODE: u32 = 0o755;
const EXECUTABLE_MODE: u32 = 0o755;
const FILE_MODE: u32 = 0o644;
const SYMLINK_MODE: u32 = 0o777;

enum EntryKind {
    Directory,
    File { executable: bool },
    Symlink(PathBuf),
}

struct Entry {
    /// `/`-separated path inside the archive.
    name: String,
    source: PathBuf,
    kind: EntryKind,
}

fn entry_options(mode: u32) -> SimpleFileOptions {
    SimpleFileOptions::default()
        .compression_method(CompressionMethod::Deflated)
        .last_modified_time(DateTime::default())
        .unix_permissions(mode)
}

/// Archives the contents of `source_dir` into a new zip file at `destination`.
///
/// Returns the number of entries written. Blocking; run it off the async runtime.
pub fn write_zip(source_dir: &Path, destination: &Path) -> Result<usize, BundleError> {
    let entries = collect_entries(source_dir)?;

    let file = File::create(destination).fs_context("creating archive", destination)?;
    let mut zip = ZipWriter::new(file);

    for entry in &entries {
        match &entry.kind {
            EntryKind::Directory => {
                zip.add_directory(entry.name.clone(), entry_options(DIR_MODE))?;
            }
            EntryKind::File { executable } => {
                let mode = if *executable { EXECUTABLE_MODE } else { FILE_MODE };
                zip.start_file(entry.name.clone(), entry_options(mode))?;
                let mut source = File::open(&entry.source).fs_context("opening bundle file", &entry.source)?;
                io::copy(&mut source, &mut zip).fs_context("writing archive entry", &entry.source)?;
            }
            EntryKind::Symlink(target) => {
                zip.add_symlink(
                    entry.name.clone(),
                    target.to_string_lossy().replace('\\', "/"),
                    entry_options(SYMLINK_MODE),
                )?;
            }
        }
        log::trace!("Archived {}", entry.name);
    }

    let file = zip.finish()?;
    file.sync_all().fs_context("flushing archive", destination)?;
    Ok(entries.len())
}

fn collect_entries(root: &Path) -> Result<Vec<Entry>, BundleError> {
    let mut entries = Vec::new();

    for entry in WalkDir::new(root).follow_links(false).min_depth(1) {
        let entry = entry.map_err(walk_error)?;
        let Ok(rel_path) = entry.path().strip_prefix(root) else {
            continue;
        };
        let name = rel_path
            .components()
            .map(|c| c.as_os_str().to_string_lossy())
            .collect::<Vec<_>>()
            .join("/");

        let file_type = entry.file_type();
        let kind = if file_type.is_symlink() {
            let target = std::fs::read_link(entry.path()).fs_context("reading symlink", entry.path())?;
            EntryKind::Symlink(target)
        } else if file_type.is_dir() {
            EntryKind::Directory
        } else {
            let metadata = entry.metadata().map_err(walk_error)?;
            EntryKind::File {
                executable: is_executable(&metadata),
            }
        };

        entries.push(Entry {
            name,
            source: entry.into_path(),
            kind,
        });
    }

    entries.sort_by(|a, b| a.name.cmp(&b.name));
    Ok(entries)
}

#[cfg(unix)]
fn is_executable(metadata: &std::fs::Metadata) -> bool {
    use std::os::unix::fs::PermissionsExt;
    metadata.permissions().mode() & 0o111 != 0
}

#[cfg(not(unix))]
fn is_executable(_metadata: &std::fs::Metadata) -> bool {
    false
}
