//! Status-file locking via fd-lock for concurrent orchestrator safety.
//!
//! Two orchestrators sharing one status file would interleave
//! read-modify-write cycles; the exclusive lock makes the second fail
//! fast instead.

use std::fs::File;
use std::path::{Path, PathBuf};

use fd_lock::RwLock;

use gauntlet_core::errors::StoreError;

/// Cross-platform advisory lock guarding a status file.
pub struct StoreLock {
    lock_file: RwLock<File>,
    lock_path: PathBuf,
}

impl StoreLock {
    /// Create the lock next to the status file (`<status_file>.lock`).
    pub fn new(status_path: &Path) -> Result<Self, StoreError> {
        let lock_path = lock_path_for(status_path);
        if let Some(parent) = lock_path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| StoreError::io(parent, &e))?;
        }
        let file = File::create(&lock_path).map_err(|e| StoreError::io(&lock_path, &e))?;
        Ok(Self {
            lock_file: RwLock::new(file),
            lock_path,
        })
    }

    /// Acquire the exclusive lock (non-blocking). Held for the guard's
    /// lifetime — callers keep it in scope for the whole run.
    pub fn exclusive(&mut self) -> Result<fd_lock::RwLockWriteGuard<'_, File>, StoreError> {
        let path = self.lock_path.clone();
        self.lock_file.try_write().map_err(|_| StoreError::Locked {
            path: path.display().to_string(),
        })
    }

    /// Get the lock file path.
    pub fn path(&self) -> &Path {
        &self.lock_path
    }
}

fn lock_path_for(status_path: &Path) -> PathBuf {
    let mut name = status_path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "status".to_string());
    name.push_str(".lock");
    status_path.with_file_name(name)
}
