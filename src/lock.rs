//! The startup lockfile guarding against a second server instance.

use std::fs::{File, OpenOptions};
use std::io;
use std::os::fd::AsRawFd;
use std::path::PathBuf;

/// Where the lock lives in production.
pub const LOCK_PATH: &str = "/var/run/ethersrv.lock";

/// An exclusively held lockfile. Dropping it removes the file and releases
/// the lock.
pub struct LockFile {
    file: File,
    path: PathBuf,
}

impl LockFile {
    /// Creates (if needed) and exclusively locks the file at `path`,
    /// without blocking: a second instance fails immediately.
    pub fn acquire(path: impl Into<PathBuf>) -> io::Result<Self> {
        let path = path.into();
        let file = OpenOptions::new()
            .create(true)
            .read(true)
            .write(true)
            .open(&path)?;
        let rc = unsafe { libc::flock(file.as_raw_fd(), libc::LOCK_EX | libc::LOCK_NB) };
        if rc != 0 {
            return Err(io::Error::last_os_error());
        }
        Ok(Self { file, path })
    }
}

impl Drop for LockFile {
    fn drop(&mut self) {
        let _ = std::fs::remove_file(&self.path);
        // The lock itself dies with `file`.
        let _ = &self.file;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn second_acquisition_fails_until_release() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("ethersrv.lock");

        let lock = LockFile::acquire(&path).unwrap();
        assert!(LockFile::acquire(&path).is_err());

        drop(lock);
        assert!(!path.exists());
        let _relock = LockFile::acquire(&path).unwrap();
    }
}
