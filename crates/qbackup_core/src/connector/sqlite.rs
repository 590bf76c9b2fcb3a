//! Relational connector over a single SQLite connection.

use super::{Connector, ConnectorError, ConnectorResult};
use crate::db::{open_connection, DbError, MEMORY_LOCATION};
use log::info;
use rusqlite::Connection;
use std::path::{Path, PathBuf};

/// Owns one SQLite connection for the duration of a session.
#[derive(Debug)]
pub struct SqliteConnector {
    location: PathBuf,
    bootstrap_sql: Option<String>,
    conn: Option<Connection>,
}

impl SqliteConnector {
    /// Creates a connector for a database file, or `:memory:`.
    pub fn new(location: impl AsRef<Path>) -> Self {
        Self {
            location: location.as_ref().to_path_buf(),
            bootstrap_sql: None,
            conn: None,
        }
    }

    /// Creates a connector over a private in-memory database.
    pub fn in_memory() -> Self {
        Self::new(MEMORY_LOCATION)
    }

    /// Schema text run on first connect to a store that was never bootstrapped.
    pub fn with_bootstrap(mut self, sql: impl Into<String>) -> Self {
        self.bootstrap_sql = Some(sql.into());
        self
    }

    pub fn location(&self) -> &Path {
        &self.location
    }

    /// Returns the open connection.
    ///
    /// # Errors
    /// - `ConnectorError::NotConnected` before `connect()` or after `close()`.
    pub fn connection(&self) -> ConnectorResult<&Connection> {
        self.conn.as_ref().ok_or(ConnectorError::NotConnected)
    }
}

impl Connector for SqliteConnector {
    fn connect(&mut self) -> ConnectorResult<()> {
        if self.conn.is_some() {
            return Ok(());
        }

        let conn = open_connection(&self.location, self.bootstrap_sql.as_deref())?;
        self.conn = Some(conn);
        Ok(())
    }

    /// Closes the connection. Uncommitted work is rolled back by SQLite.
    fn close(&mut self) -> ConnectorResult<()> {
        let Some(conn) = self.conn.take() else {
            return Ok(());
        };

        conn.close()
            .map_err(|(_, err)| ConnectorError::Db(DbError::Sqlite(err)))?;
        info!("event=db_close module=connector status=ok");
        Ok(())
    }

    fn is_connected(&self) -> bool {
        self.conn.is_some()
    }
}
