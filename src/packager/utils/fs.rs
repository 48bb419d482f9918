//! File system utilities for staging.
//!
//! Idempotent directory creation/removal and tree copies that preserve
//! symlinks and visit entries in sorted order.

use super::ignore::IgnoreList;
use crate::packager::error::{ErrorExt, FsError};
use std::{
    io,
    path::{Path, PathBuf},
};
use tokio::fs;

/// Creates all of the directories of the specified path, erasing it first if specified.
pub async fn create_dir_all(path: &Path, erase: bool) -> Result<(), FsError> {
    if erase {
        remove_dir_all(path).await?;
    }
    fs::create_dir_all(path)
        .await
        .fs_context("creating directory", path)
}

/// Removes the directory and its contents if it exists.
pub async fn remove_dir_all(path: &Path) -> Result<(), FsError> {
    match fs::remove_dir_all(path).await {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e).fs_context("removing directory", path),
    }
}

/// Removes a file if it exists.
pub async fn remove_file(path: &Path) -> Result<(), FsError> {
    match fs::remove_file(path).await {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e).fs_context("removing file", path),
    }
}

/// Copies a regular file, creating parent directories of the destination.
pub async fn copy_file(from: &Path, to: &Path) -> Result<(), FsError> {
    if let Some(dest_dir) = to.parent() {
        fs::create_dir_all(dest_dir)
            .await
            .fs_context("creating directory", dest_dir)?;
    }
    fs::copy(from, to).await.fs_context("copying file", from)?;
    Ok(())
}

/// Recursively copies `from` into `to`, skipping entries matched by `ignore`.
///
/// Symlinks are recreated rather than followed. Returns the number of files
/// (including symlinks) copied.
pub async fn copy_dir(from: &Path, to: &Path, ignore: IgnoreList) -> Result<usize, FsError> {
    let from = from.to_path_buf();
    let to = to.to_path_buf();
    let task_path = from.clone();

    tokio::task::spawn_blocking(move || copy_dir_blocking(&from, &to, &ignore))
        .await
        .map_err(|e| FsError {
            context: "directory copy task",
            path: task_path,
            source: io::Error::other(e.to_string()),
        })?
}

fn copy_dir_blocking(from: &Path, to: &Path, ignore: &IgnoreList) -> Result<usize, FsError> {
    std::fs::create_dir_all(to).fs_context("creating directory", to)?;

    let walker = walkdir::WalkDir::new(from)
        .follow_links(false)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|entry| entry.depth() == 0 || !ignore.is_ignored(entry.path()));

    let mut copied = 0;
    for entry in walker {
        let entry = entry.map_err(walk_error)?;
        if entry.depth() == 0 {
            continue;
        }
        let rel_path = entry
            .path()
            .strip_prefix(from)
            .map_err(|e| FsError {
                context: "resolving relative path",
                path: entry.path().to_path_buf(),
                source: io::Error::other(e.to_string()),
            })?;
        let dest_path = to.join(rel_path);

        if entry.file_type().is_symlink() {
            let target = std::fs::read_link(entry.path()).fs_context("reading symlink", entry.path())?;
            symlink(&target, &dest_path, entry.path().is_dir()).fs_context("creating symlink", &dest_path)?;
            copied += 1;
        } else if entry.file_type().is_dir() {
            std::fs::create_dir_all(&dest_path).fs_context("creating directory", &dest_path)?;
        } else {
            log::trace!("Copying {}", rel_path.display());
            std::fs::copy(entry.path(), &dest_path).fs_context("copying file", entry.path())?;
            copied += 1;
        }
    }

    Ok(copied)
}

/// Converts a directory walk failure into an [`FsError`].
pub fn walk_error(err: walkdir::Error) -> FsError {
    let path = err.path().map(Path::to_path_buf).unwrap_or_else(PathBuf::new);
    FsError {
        context: "walking directory",
        path,
        source: err.into(),
    }
}

#[cfg(unix)]
pub(crate) fn symlink(target: &Path, link: &Path, _is_dir: bool) -> io::Result<()> {
    std::os::unix::fs::symlink(target, link)
}

#[cfg(windows)]
pub(crate) fn symlink(target: &Path, link: &Path, is_dir: bool) -> io::Result<()> {
    if is_dir {
        std::os::windows::fs::symlink_dir(target, link)
    } else {
        std::os::windows::fs::symlink_file(target, link)
    }
}
