//! SQLite connection bootstrap for the relational backend.
//!
//! # Responsibility
//! - Open file or in-memory SQLite connections with required pragmas.
//! - Run caller-supplied bootstrap schema exactly once per store.
//!
//! # Invariants
//! - Bootstrap state is tracked via `PRAGMA user_version`.
//! - A store whose `user_version` is non-zero is never bootstrapped again.

use std::error::Error;
use std::fmt::{Display, Formatter};

mod bootstrap;
mod open;

pub use bootstrap::{apply_bootstrap, is_bootstrapped, BOOTSTRAP_SQL, BOOTSTRAPPED_VERSION};
pub use open::{open_connection, MEMORY_LOCATION};

pub type DbResult<T> = Result<T, DbError>;

#[derive(Debug)]
pub enum DbError {
    Sqlite(rusqlite::Error),
    /// Bootstrap schema text failed to execute; nothing was committed.
    Bootstrap(rusqlite::Error),
}

impl Display for DbError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Sqlite(err) => write!(f, "{err}"),
            Self::Bootstrap(err) => write!(f, "bootstrap schema failed: {err}"),
        }
    }
}

impl Error for DbError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Sqlite(err) | Self::Bootstrap(err) => Some(err),
        }
    }
}

impl From<rusqlite::Error> for DbError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Sqlite(value)
    }
}
