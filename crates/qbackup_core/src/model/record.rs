//! Record contract shared by every manager backend.
//!
//! # Responsibility
//! - Describe a record kind: declared fields, identifying field, codec.
//! - Convert records to insertion-ordered field maps and back.
//!
//! # Invariants
//! - `to_fields` yields exactly `FIELDS`, in declaration order.
//! - `keyid()` equals the value stored under `KEY_FIELD`.

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{Map, Value};
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Value of a single record field.
pub type FieldValue = Value;

/// Field name to value mapping, ordered by insertion.
pub type FieldMap = Map<String, Value>;

pub type RecordResult<T> = Result<T, RecordError>;

/// Errors raised while converting a record to or from its field map.
#[derive(Debug)]
pub enum RecordError {
    /// Serialized form does not match the declared field list.
    Shape(String),
    /// Field map could not be encoded or decoded.
    Codec(serde_json::Error),
}

impl Display for RecordError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Shape(message) => write!(f, "unexpected record shape: {message}"),
            Self::Codec(err) => write!(f, "record codec failed: {err}"),
        }
    }
}

impl Error for RecordError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Shape(_) => None,
            Self::Codec(err) => Some(err),
        }
    }
}

impl From<serde_json::Error> for RecordError {
    fn from(value: serde_json::Error) -> Self {
        Self::Codec(value)
    }
}

/// A persisted entity kind.
///
/// Field iteration is driven by `FIELDS` rather than runtime reflection, and
/// the serde derive on the implementing type is the per-kind codec.
pub trait Record: Serialize + DeserializeOwned {
    /// Declared field names, in declaration order.
    const FIELDS: &'static [&'static str];

    /// Name of the identifying field.
    const KEY_FIELD: &'static str = "id";

    /// Returns the identifying field value.
    fn keyid(&self) -> String;

    /// Serializes this record into an ordered field map.
    ///
    /// # Errors
    /// - `RecordError::Shape` when the serialized form is not an object, or
    ///   when it misses or adds fields compared to `FIELDS`.
    fn to_fields(&self) -> RecordResult<FieldMap> {
        let mut serialized = match serde_json::to_value(self)? {
            Value::Object(map) => map,
            other => {
                return Err(RecordError::Shape(format!(
                    "expected an object, found {}",
                    value_kind(&other)
                )));
            }
        };

        let mut fields = FieldMap::new();
        for name in Self::FIELDS {
            let value = serialized.shift_remove(*name).ok_or_else(|| {
                RecordError::Shape(format!("declared field `{name}` is missing"))
            })?;
            fields.insert((*name).to_string(), value);
        }

        if let Some(extra) = serialized.keys().next() {
            return Err(RecordError::Shape(format!("undeclared field `{extra}`")));
        }

        Ok(fields)
    }

    /// Builds a record from a field map. This is the record constructor.
    fn from_fields(fields: FieldMap) -> RecordResult<Self> {
        Ok(serde_json::from_value(Value::Object(fields))?)
    }

    /// Returns `(keyid, field_map)` for persistence.
    fn serialize_record(&self) -> RecordResult<(String, FieldMap)> {
        Ok((self.keyid(), self.to_fields()?))
    }
}

/// Short label of a JSON value kind, used in error messages.
pub(crate) fn value_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
