//! Directory-scoped advisory lock connector.
//!
//! # Invariants
//! - One sentinel file per directory; acquisition never waits.
//! - The sentinel file is never deleted. Deleting it would let a later opener
//!   lock a fresh inode while an earlier holder still owns the old one.

use super::{Connector, ConnectorError, ConnectorResult};
use fs2::FileExt;
use log::{info, warn};
use std::fs::{self, File, OpenOptions};
use std::io;
use std::path::{Path, PathBuf};

/// Sentinel file created inside every locked directory.
pub const LOCK_FILE_NAME: &str = "qbackup.lock";

/// Exclusive, non-blocking lock over a data directory.
#[derive(Debug)]
pub struct DirLockConnector {
    dir: PathBuf,
    lock_path: PathBuf,
    lock_file: Option<File>,
}

impl DirLockConnector {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        let dir = dir.into();
        let lock_path = dir.join(LOCK_FILE_NAME);
        Self {
            dir,
            lock_path,
            lock_file: None,
        }
    }

    pub fn directory(&self) -> &Path {
        &self.dir
    }

    pub fn lock_path(&self) -> &Path {
        &self.lock_path
    }

    /// Path of a document living under the locked directory.
    pub fn document_path(&self, name: &str) -> PathBuf {
        self.dir.join(name)
    }

    fn io_error(&self, path: &Path, source: io::Error) -> ConnectorError {
        ConnectorError::Io {
            path: path.to_path_buf(),
            source,
        }
    }
}

impl Connector for DirLockConnector {
    /// Takes the directory lock.
    ///
    /// # Errors
    /// - `ConnectorError::LockUnavailable` when another holder owns the lock;
    ///   the connector stays unconnected.
    /// - `ConnectorError::Io` when the directory or sentinel cannot be opened.
    fn connect(&mut self) -> ConnectorResult<()> {
        if self.lock_file.is_some() {
            return Ok(());
        }

        fs::create_dir_all(&self.dir).map_err(|err| self.io_error(&self.dir, err))?;
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(&self.lock_path)
            .map_err(|err| self.io_error(&self.lock_path, err))?;

        match file.try_lock_exclusive() {
            Ok(()) => {
                info!(
                    "event=lock_acquire module=connector status=ok path={}",
                    self.lock_path.display()
                );
                self.lock_file = Some(file);
                Ok(())
            }
            Err(err) if is_contended(&err) => {
                warn!(
                    "event=lock_acquire module=connector status=error error_code=lock_contended path={}",
                    self.lock_path.display()
                );
                Err(ConnectorError::LockUnavailable {
                    path: self.lock_path.clone(),
                })
            }
            Err(err) => Err(self.io_error(&self.lock_path, err)),
        }
    }

    fn close(&mut self) -> ConnectorResult<()> {
        let Some(file) = self.lock_file.take() else {
            return Ok(());
        };

        FileExt::unlock(&file).map_err(|err| self.io_error(&self.lock_path, err))?;
        info!(
            "event=lock_release module=connector status=ok path={}",
            self.lock_path.display()
        );
        Ok(())
    }

    fn is_connected(&self) -> bool {
        self.lock_file.is_some()
    }
}

impl Drop for DirLockConnector {
    fn drop(&mut self) {
        let _ = self.close();
    }
}

fn is_contended(err: &io::Error) -> bool {
    err.kind() == io::ErrorKind::WouldBlock
        || err.raw_os_error() == fs2::lock_contended_error().raw_os_error()
}
