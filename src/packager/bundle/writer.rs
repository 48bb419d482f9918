//! Bundle assembly: staging tree, metadata, archive, atomic publish.

use super::{BundledArchive, archive, checksum::calculate_sha256};
use crate::{
    metadata::{ActionDefinition, ActionMetadata},
    packager::{
        PackagerOptions,
        error::{BundleError, ErrorExt},
        strategy::BundleLayout,
        utils::fs::{self, symlink, walk_error},
    },
};
use std::path::{Path, PathBuf};
use uuid::Uuid;
use walkdir::WalkDir;

/// File name of the metadata document inside the metadata directory.
pub const METADATA_FILE: &str = "action.json";

/// Removes a temporary file on drop unless disarmed.
struct TempFileGuard {
    path: PathBuf,
    armed: bool,
}

impl TempFileGuard {
    fn new(path: PathBuf) -> Self {
        Self { path, armed: true }
    }

    fn disarm(&mut self) {
        self.armed = false;
    }
}

impl Drop for TempFileGuard {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        match std::fs::remove_file(&self.path) {
            Ok(()) => log::debug!("Removed temporary archive {}", self.path.display()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => log::warn!("Failed to remove temporary archive {}: {e}", self.path.display()),
        }
    }
}

/// Assembles compiled sources and vendored dependencies into the final archive.
#[derive(Debug)]
pub struct BundleWriter<'a> {
    options: &'a PackagerOptions,
}

impl<'a> BundleWriter<'a> {
    pub fn new(options: &'a PackagerOptions) -> Self {
        Self { options }
    }

    /// Writes the bundle for `definition`.
    ///
    /// Recreates the assembly directory, copies `compiled_dir` into it, merges
    /// the vendored tree from `layout` under its prefix, stages metadata unless
    /// skipped, then archives to a temporary sibling of the output path. Size,
    /// checksum and metadata are settled against the temporary file before it
    /// is renamed into place.
    ///
    /// # Errors
    ///
    /// [`BundleError::PathConflict`] when a vendored file would overwrite a
    /// compiled one. On any error no archive is left at the output path.
    pub async fn write(
        &self,
        compiled_dir: &Path,
        layout: &BundleLayout,
        definition: &ActionDefinition,
    ) -> Result<BundledArchive, BundleError> {
        let assembly = self.options.assembly_dir();
        fs::create_dir_all(&assembly, true).await?;

        let copied = merge_tree(compiled_dir.to_path_buf(), assembly.clone(), PathBuf::new()).await?;
        log::debug!("Assembled {copied} compiled file(s)");

        if layout.vendored_dir.is_dir() {
            let merged = merge_tree(
                layout.vendored_dir.clone(),
                assembly.join(&layout.dependencies_prefix),
                layout.dependencies_prefix.clone(),
            )
            .await?;
            log::debug!("Assembled {merged} vendored file(s)");
        }

        let output = self.options.output_archive_path();
        let bundle_name = output
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| "bundle.zip".to_string());

        let staged_metadata = if self.options.skip_metadata_packaging() {
            None
        } else {
            Some(self.stage_metadata(definition, &bundle_name).await?)
        };

        let output_dir = output.parent().unwrap_or_else(|| Path::new("."));
        fs::create_dir_all(output_dir, false).await?;

        let temp_path = output_dir.join(format!(".{bundle_name}.{}.tmp", Uuid::new_v4()));
        let mut guard = TempFileGuard::new(temp_path.clone());

        let entries = {
            let assembly = assembly.clone();
            let temp_path = temp_path.clone();
            tokio::task::spawn_blocking(move || archive::write_zip(&assembly, &temp_path))
                .await
                .map_err(|e| BundleError::TaskFailed(format!("archive task failed: {e}")))??
        };

        let size = tokio::fs::metadata(&temp_path)
            .await
            .fs_context("reading archive metadata", &temp_path)?
            .len();
        let checksum = calculate_sha256(&temp_path).await?;

        let metadata_dir = match staged_metadata {
            Some(staged) => Some(self.publish_metadata(&staged).await?),
            None => None,
        };

        // The archive rename is the last fallible step.
        if let Err(e) = replace_path(&temp_path, output).await {
            if let Some(published) = &metadata_dir {
                if let Err(cleanup) = fs::remove_dir_all(published).await {
                    log::warn!("Failed to remove metadata {}: {cleanup}", published.display());
                }
            }
            return Err(e);
        }
        guard.disarm();
        log::info!("Wrote {entries} entries to {}", output.display());

        Ok(BundledArchive {
            path: output.to_path_buf(),
            size,
            checksum,
            entries,
            action_type: definition.runtime,
            metadata_dir,
        })
    }

    /// Writes `action.json` into the staged metadata directory.
    async fn stage_metadata(&self, definition: &ActionDefinition, bundle_name: &str) -> Result<PathBuf, BundleError> {
        let staged = self.options.staged_metadata_dir();
        fs::create_dir_all(&staged, true).await?;

        let mut document = serde_json::to_string_pretty(&ActionMetadata::new(definition, bundle_name))?;
        document.push('\n');
        let path = staged.join(METADATA_FILE);
        tokio::fs::write(&path, document)
            .await
            .fs_context("writing action metadata", &path)?;
        Ok(staged)
    }

    /// Replaces the metadata output directory with the staged one.
    async fn publish_metadata(&self, staged: &Path) -> Result<PathBuf, BundleError> {
        let target = self.options.metadata_output_path();
        fs::remove_dir_all(target).await?;
        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent, false).await?;
        }

        if let Err(e) = tokio::fs::rename(staged, target).await {
            // Staging and output may live on different filesystems.
            log::debug!("Rename of {} failed ({e}), copying instead", staged.display());
            merge_tree(staged.to_path_buf(), target.to_path_buf(), PathBuf::new()).await?;
            fs::remove_dir_all(staged).await?;
        }
        log::info!("Wrote action metadata to {}", target.display());
        Ok(target.to_path_buf())
    }
}

/// Moves `from` over `to`, replacing an existing file.
async fn replace_path(from: &Path, to: &Path) -> Result<(), BundleError> {
    #[cfg(windows)]
    fs::remove_file(to).await?;

    tokio::fs::rename(from, to)
        .await
        .fs_context("moving archive into place", to)?;
    Ok(())
}

/// Copies the tree at `from` into `to`, failing on any file that already exists.
///
/// `prefix` is the bundle-relative location of `to`, used in conflict reports.
async fn merge_tree(from: PathBuf, to: PathBuf, prefix: PathBuf) -> Result<usize, BundleError> {
    tokio::task::spawn_blocking(move || merge_tree_blocking(&from, &to, &prefix))
        .await
        .map_err(|e| BundleError::TaskFailed(format!("merge task failed: {e}")))?
}

fn merge_tree_blocking(from: &Path, to: &Path, prefix: &Path) -> Result<usize, BundleError> {
    let mut merged = 0;

    for entry in WalkDir::new(from).follow_links(false).sort_by_file_name() {
        let entry = entry.map_err(walk_error)?;
        let Ok(rel_path) = entry.path().strip_prefix(from) else {
            continue;
        };
        let dest = to.join(rel_path);
        let existing = std::fs::symlink_metadata(&dest).ok();
        let conflict = || BundleError::PathConflict {
            path: prefix.join(rel_path),
        };

        if entry.file_type().is_dir() {
            match existing {
                Some(metadata) if !metadata.is_dir() => return Err(conflict()),
                Some(_) => {}
                None => std::fs::create_dir_all(&dest).fs_context("creating directory", &dest)?,
            }
            continue;
        }

        if existing.is_some() {
            return Err(conflict());
        }
        if entry.file_type().is_symlink() {
            let target = std::fs::read_link(entry.path()).fs_context("reading symlink", entry.path())?;
            symlink(&target, &dest, entry.path().is_dir()).fs_context("creating symlink", &dest)?;
        } else {
            std::fs::copy(entry.path(), &dest).fs_context("copying bundle file", entry.path())?;
        }
        merged += 1;
    }

    Ok(merged)
}
