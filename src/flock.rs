use std::{
    fs::File,
    path::Path,
    time::{Duration, Instant},
};

use fs4::fs_std::FileExt;
use log::debug;
use thiserror::Error;

pub const LOCK_FILE_NAME: &str = ".depfetch-lock";

/// Exclusive advisory lock held for as long as the value lives.
pub struct FileLock {
    _file: File,
}

#[derive(Error, Debug)]
#[error(transparent)]
pub struct Error(#[from] std::io::Error);

impl FileLock {
    /// Locks `path`, creating it if needed, retrying until `timeout` elapses.
    pub fn new(path: &Path, timeout: Duration) -> Result<Self, Error> {
        let file = File::create(path)?;
        let start = Instant::now();
        loop {
            match file.try_lock_exclusive() {
                Ok(true) => {
                    return Ok(Self { _file: file });
                }
                Ok(false) if start.elapsed() < timeout => {
                    debug!("Failed to acquire a lock on {}, retrying", path.display());
                    std::thread::sleep(Duration::from_secs(1));
                }
                Ok(false) => return Err(timed_out(path)),
                Err(error) => return Err(error.into()),
            }
        }
    }
}

fn timed_out(path: &Path) -> Error {
    Error(std::io::Error::new(
        std::io::ErrorKind::WouldBlock,
        format!("timed out waiting for a lock on {}", path.display()),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lock_is_exclusive_until_dropped() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(LOCK_FILE_NAME);

        let held = FileLock::new(&path, Duration::ZERO).unwrap();
        let contended = FileLock::new(&path, Duration::ZERO);
        assert!(matches!(
            contended,
            Err(Error(ref error)) if error.kind() == std::io::ErrorKind::WouldBlock
        ));

        drop(held);
        FileLock::new(&path, Duration::ZERO).unwrap();
    }
}
