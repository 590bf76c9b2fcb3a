//! Connector contract and backing-resource implementations.
//!
//! # Responsibility
//! - Guard exclusive access to a backing store for the lifetime of a session.
//! - Provide a scoped helper that releases the resource on every exit path.
//!
//! # Invariants
//! - `connect()` on a connected connector is a no-op.
//! - `close()` is best-effort and safe without a prior successful `connect()`.
//! - Dropping a connector releases whatever it still holds.

use crate::db::DbError;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::io;
use std::path::PathBuf;

mod dir_lock;
mod memory;
mod sqlite;

pub use dir_lock::{DirLockConnector, LOCK_FILE_NAME};
pub use memory::MemoryConnector;
pub use sqlite::SqliteConnector;

pub type ConnectorResult<T> = Result<T, ConnectorError>;

#[derive(Debug)]
pub enum ConnectorError {
    /// Another holder owns the directory lock.
    LockUnavailable { path: PathBuf },
    Io { path: PathBuf, source: io::Error },
    Db(DbError),
    /// Operation requires a connected connector.
    NotConnected,
}

impl Display for ConnectorError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::LockUnavailable { path } => {
                write!(f, "lock is held by another process: {}", path.display())
            }
            Self::Io { path, source } => write!(f, "{}: {source}", path.display()),
            Self::Db(err) => write!(f, "{err}"),
            Self::NotConnected => write!(f, "connector is not connected"),
        }
    }
}

impl Error for ConnectorError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Io { source, .. } => Some(source),
            Self::Db(err) => Some(err),
            Self::LockUnavailable { .. } | Self::NotConnected => None,
        }
    }
}

impl From<DbError> for ConnectorError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

/// Lifecycle of a backing resource.
pub trait Connector {
    /// Acquires the backing resource.
    fn connect(&mut self) -> ConnectorResult<()>;

    /// Releases the backing resource.
    fn close(&mut self) -> ConnectorResult<()>;

    fn is_connected(&self) -> bool;
}

/// Connects, runs `work`, then closes the connector regardless of outcome.
///
/// An error from `work` takes precedence over an error from `close()`.
pub fn scoped<C, T, E, F>(connector: &mut C, work: F) -> Result<T, E>
where
    C: Connector,
    E: From<ConnectorError>,
    F: FnOnce(&mut C) -> Result<T, E>,
{
    if let Err(err) = connector.connect() {
        let _ = connector.close();
        return Err(err.into());
    }

    let outcome = work(connector);
    let closed = connector.close();
    let value = outcome?;
    closed?;
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::{scoped, Connector, ConnectorError, ConnectorResult};

    #[derive(Default)]
    struct Probe {
        connected: bool,
        fail_connect: bool,
        closes: usize,
    }

    impl Connector for Probe {
        fn connect(&mut self) -> ConnectorResult<()> {
            if self.fail_connect {
                return Err(ConnectorError::NotConnected);
            }
            self.connected = true;
            Ok(())
        }

        fn close(&mut self) -> ConnectorResult<()> {
            self.connected = false;
            self.closes += 1;
            Ok(())
        }

        fn is_connected(&self) -> bool {
            self.connected
        }
    }

    #[test]
    fn scoped_closes_after_success() {
        let mut probe = Probe::default();
        let seen = scoped(&mut probe, |c| Ok::<_, ConnectorError>(c.is_connected())).unwrap();
        assert!(seen);
        assert!(!probe.is_connected());
        assert_eq!(probe.closes, 1);
    }

    #[test]
    fn scoped_closes_after_failure_and_keeps_work_error() {
        let mut probe = Probe::default();
        let err = scoped(&mut probe, |_| {
            Err::<(), _>(ConnectorError::LockUnavailable {
                path: "held".into(),
            })
        })
        .unwrap_err();
        assert!(matches!(err, ConnectorError::LockUnavailable { .. }));
        assert_eq!(probe.closes, 1);
    }

    #[test]
    fn scoped_skips_work_when_connect_fails() {
        let mut probe = Probe {
            fail_connect: true,
            ..Probe::default()
        };
        let mut ran = false;
        let err = scoped(&mut probe, |_| {
            ran = true;
            Ok::<_, ConnectorError>(())
        })
        .unwrap_err();
        assert!(matches!(err, ConnectorError::NotConnected));
        assert!(!ran);
        assert_eq!(probe.closes, 1);
    }
}
