//! Storage core for qbackup.
//!
//! One record-access contract (`Manager`) over three interchangeable
//! backends: an in-memory map, a directory-locked JSON document and SQLite.

pub mod config;
pub mod connector;
pub mod db;
pub mod id;
pub mod logging;
pub mod manager;
pub mod model;
pub mod stream;
pub mod table;

pub use config::{Backend, ConfigError, StoreConfig};
pub use connector::{
    scoped, Connector, ConnectorError, ConnectorResult, DirLockConnector, MemoryConnector,
    SqliteConnector, LOCK_FILE_NAME,
};
pub use logging::{default_log_level, init_logging, logging_status};
pub use manager::{
    DocumentManager, Manager, ManagerError, ManagerResult, MemoryManager, Predicate,
    SqliteManager,
};
pub use model::backup::{Group, Period, Qube};
pub use model::record::{FieldMap, FieldValue, Record, RecordError};
pub use stream::{Document, DocumentStream, JsonFileStream, StreamError};

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
