//! Exclusive writer lock for a store.
//!
//! The lock is an OS advisory lock on `<store>.lock`, held for the lifetime
//! of the writer handle and released when it is dropped (or the process
//! exits). Readers never touch it.

use std::fs::{File, OpenOptions, TryLockError};
use std::path::{Path, PathBuf};

use climate_common::{ClimateError, ClimateResult};
use tracing::debug;

/// Held exclusive lock on a store's lock file.
#[derive(Debug)]
pub struct WriterLock {
    _file: File,
    path: PathBuf,
}

impl WriterLock {
    /// Lock file path for a store database.
    pub fn lock_path(store_path: &Path) -> PathBuf {
        let mut name = store_path.as_os_str().to_os_string();
        name.push(".lock");
        PathBuf::from(name)
    }

    /// Try to take the lock without blocking.
    ///
    /// Returns [`ClimateError::StoreLocked`] if another writer holds it.
    pub fn acquire(store_path: &Path) -> ClimateResult<Self> {
        let path = Self::lock_path(store_path);
        let file = OpenOptions::new()
            .create(true)
            .truncate(false)
            .write(true)
            .open(&path)
            .map_err(|e| {
                ClimateError::StoreUnavailable(format!("cannot open {}: {}", path.display(), e))
            })?;

        match file.try_lock() {
            Ok(()) => {
                debug!(path = %path.display(), "Acquired store writer lock");
                Ok(Self { _file: file, path })
            }
            Err(TryLockError::WouldBlock) => Err(ClimateError::StoreLocked {
                path: store_path.display().to_string(),
            }),
            Err(TryLockError::Error(e)) => Err(ClimateError::StoreUnavailable(format!(
                "cannot lock {}: {}",
                path.display(),
                e
            ))),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}
