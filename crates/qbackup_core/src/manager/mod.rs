//! Manager contract: CRUD and queries over one record kind.
//!
//! # Responsibility
//! - Define the operations every backend answers identically.
//! - Keep query semantics (`get`, `find_where`, `slow_find_*`) in one place
//!   so backends only supply raw field-map access.
//!
//! # Invariants
//! - Missing keys are `None` for lookups and `NotFound` for `get_or_fail`
//!   and `delete`.
//! - `upsert` never conflicts; `create` is the insert-only variant.
//! - `slow_find_*` are full scans over `fetch_all` on every backend.

use crate::connector::ConnectorError;
use crate::db::DbError;
use crate::model::record::{FieldMap, FieldValue, Record, RecordError};
use crate::stream::StreamError;
use std::error::Error;
use std::fmt::{Display, Formatter};

mod document;
mod memory;
mod records;
mod sqlite;

pub use document::{DocumentManager, DOCUMENT_FILE_NAME};
pub use memory::MemoryManager;
pub use sqlite::SqliteManager;

pub type ManagerResult<T> = Result<T, ManagerError>;

#[derive(Debug)]
pub enum ManagerError {
    NotFound { partition: String, key: String },
    Conflict { partition: String, key: String },
    /// Backing data does not have the expected structured shape.
    Malformed(String),
    /// Field name is not declared by the record kind.
    UnknownField { field: String },
    /// Partition or field name cannot be used as an SQL identifier.
    InvalidIdentifier(String),
    NotConnected,
    Record(RecordError),
    Connector(ConnectorError),
    Stream(StreamError),
    Db(DbError),
}

impl Display for ManagerError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NotFound { partition, key } => {
                write!(f, "record not found in `{partition}`: {key}")
            }
            Self::Conflict { partition, key } => {
                write!(f, "record already exists in `{partition}`: {key}")
            }
            Self::Malformed(message) => write!(f, "malformed backing data: {message}"),
            Self::UnknownField { field } => write!(f, "unknown field `{field}`"),
            Self::InvalidIdentifier(name) => write!(f, "invalid identifier `{name}`"),
            Self::NotConnected => write!(f, "connector is not connected"),
            Self::Record(err) => write!(f, "{err}"),
            Self::Connector(err) => write!(f, "{err}"),
            Self::Stream(err) => write!(f, "{err}"),
            Self::Db(err) => write!(f, "{err}"),
        }
    }
}

impl Error for ManagerError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Record(err) => Some(err),
            Self::Connector(err) => Some(err),
            Self::Stream(err) => Some(err),
            Self::Db(err) => Some(err),
            _ => None,
        }
    }
}

impl From<RecordError> for ManagerError {
    fn from(value: RecordError) -> Self {
        Self::Record(value)
    }
}

impl From<ConnectorError> for ManagerError {
    fn from(value: ConnectorError) -> Self {
        match value {
            ConnectorError::NotConnected => Self::NotConnected,
            other => Self::Connector(other),
        }
    }
}

impl From<StreamError> for ManagerError {
    fn from(value: StreamError) -> Self {
        Self::Stream(value)
    }
}

impl From<DbError> for ManagerError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for ManagerError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

/// Conjunction of field equality terms for `slow_find_*`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Predicate {
    terms: Vec<(String, FieldValue)>,
}

impl Predicate {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a `field == value` term.
    pub fn eq(mut self, field: impl Into<String>, value: impl Into<FieldValue>) -> Self {
        self.terms.push((field.into(), value.into()));
        self
    }

    pub fn terms(&self) -> &[(String, FieldValue)] {
        &self.terms
    }

    pub fn is_empty(&self) -> bool {
        self.terms.is_empty()
    }

    /// Returns whether every term holds for `fields`. Empty matches all.
    pub fn matches(&self, fields: &FieldMap) -> bool {
        self.terms
            .iter()
            .all(|(field, value)| fields.get(field) == Some(value))
    }
}

/// CRUD contract over records of kind `R` stored in one partition.
///
/// Backends implement the raw field-map primitives; lookups, listing and the
/// slow scans are shared.
pub trait Manager<R: Record> {
    /// Partition (table name or document branch) holding this kind.
    fn partition(&self) -> &str;

    fn key_field(&self) -> &str {
        R::KEY_FIELD
    }

    /// First stored field map whose `field` equals `value`.
    fn fetch_by_field(&self, field: &str, value: &FieldValue) -> ManagerResult<Option<FieldMap>>;

    /// Every stored field map, in backend order.
    fn fetch_all(&self) -> ManagerResult<Vec<FieldMap>>;

    /// Inserts or updates `record`, returning its key.
    fn upsert(&mut self, record: &R) -> ManagerResult<String>;

    /// Removes the record stored under `keyid`.
    ///
    /// # Errors
    /// - `ManagerError::NotFound` when no such record exists.
    fn delete(&mut self, keyid: &str) -> ManagerResult<()>;

    /// Flushes buffered changes to the backing store.
    fn save(&mut self) -> ManagerResult<()>;

    fn get(&self, keyid: &str) -> ManagerResult<Option<R>> {
        let key = FieldValue::String(keyid.to_string());
        self.fetch_by_field(self.key_field(), &key)?
            .map(build_record::<R>)
            .transpose()
    }

    fn get_or_fail(&self, keyid: &str) -> ManagerResult<R> {
        self.get(keyid)?.ok_or_else(|| ManagerError::NotFound {
            partition: self.partition().to_string(),
            key: keyid.to_string(),
        })
    }

    /// First record whose `field` equals `value`.
    ///
    /// Constant time on the key field for map backends, a scan otherwise.
    fn find_where(&self, field: &str, value: impl Into<FieldValue>) -> ManagerResult<Option<R>> {
        ensure_declared::<R>(field)?;
        self.fetch_by_field(field, &value.into())?
            .map(build_record::<R>)
            .transpose()
    }

    fn list(&self) -> ManagerResult<Vec<R>> {
        self.fetch_all()?
            .into_iter()
            .map(build_record::<R>)
            .collect()
    }

    /// Every record matching `predicate`, in list order. Always O(n).
    fn slow_find_all(&self, predicate: &Predicate) -> ManagerResult<Vec<R>> {
        for (field, _) in predicate.terms() {
            ensure_declared::<R>(field)?;
        }
        self.fetch_all()?
            .into_iter()
            .filter(|fields| predicate.matches(fields))
            .map(build_record::<R>)
            .collect()
    }

    fn slow_find_one(&self, predicate: &Predicate) -> ManagerResult<Option<R>> {
        Ok(self.slow_find_all(predicate)?.into_iter().next())
    }

    /// Inserts `record`, refusing to overwrite an existing key.
    ///
    /// # Errors
    /// - `ManagerError::Conflict` when the key is already stored.
    fn create(&mut self, record: &R) -> ManagerResult<String> {
        let key = record.keyid();
        if self.get(&key)?.is_some() {
            return Err(ManagerError::Conflict {
                partition: self.partition().to_string(),
                key,
            });
        }
        self.upsert(record)
    }
}

fn build_record<R: Record>(fields: FieldMap) -> ManagerResult<R> {
    Ok(R::from_fields(fields)?)
}

pub(crate) fn ensure_declared<R: Record>(field: &str) -> ManagerResult<()> {
    if R::FIELDS.contains(&field) {
        Ok(())
    } else {
        Err(ManagerError::UnknownField {
            field: field.to_string(),
        })
    }
}

/// Serializes `record` and checks that its key matches the key field value.
pub(crate) fn serialize_checked<R: Record>(record: &R) -> ManagerResult<(String, FieldMap)> {
    ensure_declared::<R>(R::KEY_FIELD)?;
    let (key, fields) = record.serialize_record()?;
    match fields.get(R::KEY_FIELD) {
        Some(FieldValue::String(stored)) if *stored == key => Ok((key, fields)),
        _ => Err(ManagerError::Malformed(format!(
            "key `{key}` does not match field `{}`",
            R::KEY_FIELD
        ))),
    }
}
