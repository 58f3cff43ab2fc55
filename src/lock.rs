//! Per-dependency lock records.
//!
//! A lock file inside a destination promises that the directory contents
//! were fully materialized from the recorded hash. It is written last and
//! removed first.

use std::{io::ErrorKind, path::Path, path::PathBuf};

use log::{debug, trace};
use thiserror::Error;

use crate::model::lock::{DependencyLock, LOCK_FILE_NAME};

#[derive(Error, Debug)]
pub enum LockError {
    #[error("Could not serialize lock for {path}: {source}")]
    Serialize {
        path: PathBuf,
        source: serde_json::Error,
    },
    #[error("Could not write lock {path}: {source}")]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Could not remove lock {path}: {source}")]
    Remove {
        path: PathBuf,
        source: std::io::Error,
    },
}

pub fn lock_file_path(destination: &Path) -> PathBuf {
    destination.join(LOCK_FILE_NAME)
}

/// True when `destination` is a directory holding a readable lock for `hash`.
/// Any failure to read or parse the lock counts as out of date.
pub fn is_up_to_date(destination: &Path, hash: &str) -> bool {
    if !destination.is_dir() {
        return false;
    }
    let path = lock_file_path(destination);
    if !path.is_file() {
        trace!("No lock file at {}", path.display());
        return false;
    }
    match DependencyLock::from_file(&path) {
        Ok(lock) => lock.dependency_hash == hash,
        Err(error) => {
            debug!("Treating unreadable lock as stale: {}", error);
            false
        }
    }
}

pub fn write(destination: &Path, hash: &str) -> Result<(), LockError> {
    let path = lock_file_path(destination);
    let contents = DependencyLock::new(hash)
        .to_string()
        .map_err(|source| LockError::Serialize {
            path: path.clone(),
            source,
        })?;
    std::fs::write(&path, contents).map_err(|source| LockError::Write { path, source })
}

pub fn clear(destination: &Path) -> Result<(), LockError> {
    let path = lock_file_path(destination);
    match std::fs::remove_file(&path) {
        Ok(()) => Ok(()),
        Err(error) if error.kind() == ErrorKind::NotFound => Ok(()),
        Err(source) => Err(LockError::Remove { path, source }),
    }
}
