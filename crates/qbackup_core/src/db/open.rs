//! Connection bootstrap utilities for SQLite.
//!
//! # Invariants
//! - Returned connections have `foreign_keys=ON` and a busy timeout.
//! - Returned connections have bootstrap schema applied when one was given.

use super::bootstrap::apply_bootstrap;
use super::DbResult;
use log::{error, info};
use rusqlite::Connection;
use std::path::Path;
use std::time::{Duration, Instant};

/// Location string selecting a private in-memory database.
pub const MEMORY_LOCATION: &str = ":memory:";

const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// Opens the SQLite store at `location` and applies optional bootstrap SQL.
///
/// # Side effects
/// - Emits `db_open` logging events with duration and status.
pub fn open_connection(location: &Path, bootstrap_sql: Option<&str>) -> DbResult<Connection> {
    let started_at = Instant::now();
    let in_memory = location == Path::new(MEMORY_LOCATION);
    let mode = if in_memory {
        "memory"
    } else {
        "file"
    };
    info!("event=db_open module=db status=start mode={mode}");

    let opened = if in_memory {
        Connection::open_in_memory()
    } else {
        Connection::open(location)
    };
    let mut conn = match opened {
        Ok(conn) => conn,
        Err(err) => {
            error!(
                "event=db_open module=db status=error mode={mode} duration_ms={} error_code=db_open_failed error={err}",
                started_at.elapsed().as_millis()
            );
            return Err(err.into());
        }
    };

    match configure(&mut conn, bootstrap_sql) {
        Ok(()) => {
            info!(
                "event=db_open module=db status=ok mode={mode} duration_ms={}",
                started_at.elapsed().as_millis()
            );
            Ok(conn)
        }
        Err(err) => {
            error!(
                "event=db_open module=db status=error mode={mode} duration_ms={} error_code=db_bootstrap_failed error={err}",
                started_at.elapsed().as_millis()
            );
            Err(err)
        }
    }
}

fn configure(conn: &mut Connection, bootstrap_sql: Option<&str>) -> DbResult<()> {
    conn.execute_batch("PRAGMA foreign_keys = ON;")?;
    conn.busy_timeout(BUSY_TIMEOUT)?;
    if let Some(sql) = bootstrap_sql {
        apply_bootstrap(conn, sql)?;
    }
    Ok(())
}
