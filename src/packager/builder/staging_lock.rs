//! Exclusive ownership of a staging directory.
//!
//! A process-wide registry rejects a second run on the same staging path
//! inside this process; on unix an advisory `flock` on `<staging>.lock` does
//! the same across processes. Both are released when the lock is dropped.

use crate::packager::error::{ErrorExt, FsError, PackagingError};
use std::{
    collections::HashSet,
    path::{Path, PathBuf},
    sync::{LazyLock, Mutex, MutexGuard},
};

static ACTIVE_STAGING: LazyLock<Mutex<HashSet<PathBuf>>> = LazyLock::new(|| Mutex::new(HashSet::new()));

fn active() -> MutexGuard<'static, HashSet<PathBuf>> {
    match ACTIVE_STAGING.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}

/// Held for the duration of a packaging run.
pub struct StagingLock {
    staging: PathBuf,
    #[cfg(unix)]
    _file: nix::fcntl::Flock<std::fs::File>,
}

impl StagingLock {
    /// Claims `staging` for the current run.
    ///
    /// # Errors
    ///
    /// [`PackagingError::StagingBusy`] when another run holds it.
    pub fn acquire(staging: &Path) -> Result<Self, PackagingError> {
        if !active().insert(staging.to_path_buf()) {
            return Err(PackagingError::StagingBusy(staging.to_path_buf()));
        }

        #[cfg(unix)]
        let file = match lock_file(staging) {
            Ok(file) => file,
            Err(e) => {
                active().remove(staging);
                return Err(e);
            }
        };

        log::debug!("Acquired staging directory {}", staging.display());
        Ok(Self {
            staging: staging.to_path_buf(),
            #[cfg(unix)]
            _file: file,
        })
    }
}

impl std::fmt::Debug for StagingLock {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StagingLock").field("staging", &self.staging).finish()
    }
}

impl Drop for StagingLock {
    fn drop(&mut self) {
        active().remove(&self.staging);
        log::debug!("Released staging directory {}", self.staging.display());
    }
}

/// `<staging>.lock`, next to the staging directory.
pub fn lock_path(staging: &Path) -> PathBuf {
    match staging.file_name() {
        Some(name) => {
            let mut lock_name = name.to_os_string();
            lock_name.push(".lock");
            staging.with_file_name(lock_name)
        }
        None => staging.join(".lock"),
    }
}

#[cfg(unix)]
fn lock_file(staging: &Path) -> Result<nix::fcntl::Flock<std::fs::File>, PackagingError> {
    use nix::{
        errno::Errno,
        fcntl::{Flock, FlockArg},
    };

    let path = lock_path(staging);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).fs_context("creating staging lock directory", parent)?;
    }
    let file = std::fs::OpenOptions::new()
        .create(true)
        .write(true)
        .truncate(false)
        .open(&path)
        .fs_context("opening staging lock", &path)?;

    Flock::lock(file, FlockArg::LockExclusiveNonblock).map_err(|(_, errno)| {
        if errno == Errno::EWOULDBLOCK {
            PackagingError::StagingBusy(staging.to_path_buf())
        } else {
            PackagingError::Staging(FsError {
                context: "locking staging directory",
                path,
                source: std::io::Error::from(errno),
            })
        }
    })
}
