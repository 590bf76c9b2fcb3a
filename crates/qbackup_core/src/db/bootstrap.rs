//! One-shot schema bootstrap.
//!
//! # Invariants
//! - Bootstrap SQL and the `user_version` bump commit in one transaction.
//! - Stores with `user_version != 0` are left untouched.

use crate::db::{DbError, DbResult};
use log::info;
use rusqlite::Connection;

/// Schema for the backup record kinds (`periods`, `groups`, `qubes`).
pub const BOOTSTRAP_SQL: &str = include_str!("bootstrap.sql");

/// `user_version` written once bootstrap has run.
pub const BOOTSTRAPPED_VERSION: u32 = 1;

/// Returns whether the store already went through bootstrap.
pub fn is_bootstrapped(conn: &Connection) -> DbResult<bool> {
    Ok(user_version(conn)? != 0)
}

/// Runs `sql` when the store has never been bootstrapped.
///
/// Returns `true` when the schema was applied, `false` when skipped.
pub fn apply_bootstrap(conn: &mut Connection, sql: &str) -> DbResult<bool> {
    if is_bootstrapped(conn)? {
        return Ok(false);
    }

    let tx = conn.transaction()?;
    tx.execute_batch(sql).map_err(DbError::Bootstrap)?;
    tx.execute_batch(&format!("PRAGMA user_version = {BOOTSTRAPPED_VERSION};"))?;
    tx.commit()?;

    info!("event=db_bootstrap module=db status=ok version={BOOTSTRAPPED_VERSION}");
    Ok(true)
}

fn user_version(conn: &Connection) -> DbResult<u32> {
    let version = conn.query_row("PRAGMA user_version;", [], |row| row.get::<_, u32>(0))?;
    Ok(version)
}

#[cfg(test)]
mod tests {
    use super::{apply_bootstrap, is_bootstrapped, BOOTSTRAP_SQL};
    use crate::db::DbError;
    use rusqlite::Connection;

    #[test]
    fn bootstrap_runs_once() {
        let mut conn = Connection::open_in_memory().unwrap();
        assert!(!is_bootstrapped(&conn).unwrap());

        assert!(apply_bootstrap(&mut conn, BOOTSTRAP_SQL).unwrap());
        assert!(is_bootstrapped(&conn).unwrap());
        assert!(!apply_bootstrap(&mut conn, "CREATE TABLE never (id TEXT);").unwrap());

        let created: i64 = conn
            .query_row(
                "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name = 'never';",
                [],
                |row| row.get(0),
            )
            .unwrap();
        assert_eq!(created, 0);
    }

    #[test]
    fn failing_bootstrap_leaves_store_fresh() {
        let mut conn = Connection::open_in_memory().unwrap();
        let err = apply_bootstrap(&mut conn, "CREATE TABLE ok (id TEXT); NOT SQL;").unwrap_err();
        assert!(matches!(err, DbError::Bootstrap(_)));
        assert!(!is_bootstrapped(&conn).unwrap());
    }
}
