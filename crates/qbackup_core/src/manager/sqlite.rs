//! Relational manager: one SQLite table per record kind.
//!
//! # Responsibility
//! - Translate manager operations into parameterized SQL.
//! - Map rows back into field maps by declared column order.
//!
//! # Invariants
//! - Table and column names are validated identifiers and always quoted in
//!   generated SQL; values are bound as positional parameters in column order.
//! - Bool fields need a column declared `BOOLEAN`; such columns read back as
//!   JSON bools, and binding a bool anywhere else is refused.
//! - The first mutation opens a transaction; `save()` commits it. Managers
//!   sharing a connector share that transaction.

use super::{ensure_declared, serialize_checked, Manager, ManagerError, ManagerResult};
use crate::connector::SqliteConnector;
use crate::model::record::{value_kind, FieldMap, FieldValue, Record};
use log::{debug, info};
use once_cell::sync::Lazy;
use regex::Regex;
use rusqlite::types::{Value as SqlValue, ValueRef};
use rusqlite::{params_from_iter, Connection, Row};
use std::collections::HashSet;
use std::marker::PhantomData;

static SQL_IDENTIFIER_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").expect("valid identifier regex"));

/// Manager persisting `R` into the table named by its partition.
pub struct SqliteManager<'c, R> {
    conn: &'c Connection,
    partition: String,
    columns: String,
    bool_columns: HashSet<String>,
    _kind: PhantomData<R>,
}

impl<'c, R: Record> SqliteManager<'c, R> {
    /// Binds the manager to table `partition` on a connected connector.
    ///
    /// # Errors
    /// - `ManagerError::InvalidIdentifier` when the partition or a declared
    ///   field is not a plain SQL identifier.
    /// - `ManagerError::NotConnected` when the connector is closed.
    pub fn new(partition: impl Into<String>, connector: &'c SqliteConnector) -> ManagerResult<Self> {
        let partition = partition.into();
        ensure_identifier(&partition)?;
        for field in R::FIELDS {
            ensure_identifier(field)?;
        }
        ensure_declared::<R>(R::KEY_FIELD)?;

        let conn = connector.connection()?;
        let bool_columns = declared_bool_columns(conn, &partition)?;
        Ok(Self {
            conn,
            partition,
            columns: R::FIELDS
                .iter()
                .map(|field| quoted(field))
                .collect::<Vec<_>>()
                .join(", "),
            bool_columns,
            _kind: PhantomData,
        })
    }

    fn begin_if_needed(&self) -> ManagerResult<()> {
        if self.conn.is_autocommit() {
            self.conn.execute_batch("BEGIN DEFERRED;")?;
        }
        Ok(())
    }

    fn query_fields(&self, sql: &str, params: Vec<SqlValue>) -> ManagerResult<Vec<FieldMap>> {
        let mut stmt = self.conn.prepare(sql)?;
        let mut rows = stmt.query(params_from_iter(params))?;
        let mut found = Vec::new();
        while let Some(row) = rows.next()? {
            found.push(self.row_to_fields(row)?);
        }
        Ok(found)
    }

    fn row_to_fields(&self, row: &Row<'_>) -> ManagerResult<FieldMap> {
        let mut fields = FieldMap::new();
        for (idx, name) in R::FIELDS.iter().enumerate() {
            let value = match row.get_ref(idx)? {
                ValueRef::Integer(int) if self.bool_columns.contains(*name) => {
                    FieldValue::Bool(int != 0)
                }
                other => from_sql_value(name, other)?,
            };
            fields.insert((*name).to_string(), value);
        }
        Ok(fields)
    }

    /// Converts a field value for binding against column `name`.
    fn bind(&self, name: &str, value: &FieldValue) -> ManagerResult<SqlValue> {
        if value.is_boolean() && !self.bool_columns.contains(name) {
            return Err(ManagerError::Malformed(format!(
                "bool field `{name}` needs a BOOLEAN column in `{}`",
                self.partition
            )));
        }
        to_sql_value(value)
    }

    fn insert(&self, fields: &FieldMap) -> ManagerResult<()> {
        let columns: Vec<String> = fields.keys().map(|name| quoted(name)).collect();
        let placeholders: Vec<String> = (1..=columns.len()).map(|idx| format!("?{idx}")).collect();
        let values = fields
            .iter()
            .map(|(name, value)| self.bind(name, value))
            .collect::<ManagerResult<Vec<_>>>()?;

        self.conn.execute(
            &format!(
                "INSERT INTO {} ({}) VALUES ({});",
                quoted(&self.partition),
                columns.join(", "),
                placeholders.join(", ")
            ),
            params_from_iter(values),
        )?;
        Ok(())
    }

    fn update(&self, key: &str, fields: &FieldMap) -> ManagerResult<()> {
        let mut assignments = Vec::new();
        let mut values = Vec::new();
        for (name, value) in fields {
            if name == R::KEY_FIELD {
                continue;
            }
            values.push(self.bind(name, value)?);
            assignments.push(format!("{} = ?{}", quoted(name), values.len()));
        }
        if assignments.is_empty() {
            return Ok(());
        }
        values.push(SqlValue::Text(key.to_string()));

        self.conn.execute(
            &format!(
                "UPDATE {} SET {} WHERE {} = ?{};",
                quoted(&self.partition),
                assignments.join(", "),
                quoted(R::KEY_FIELD),
                values.len()
            ),
            params_from_iter(values),
        )?;
        Ok(())
    }
}

impl<R: Record> Manager<R> for SqliteManager<'_, R> {
    fn partition(&self) -> &str {
        &self.partition
    }

    fn fetch_by_field(&self, field: &str, value: &FieldValue) -> ManagerResult<Option<FieldMap>> {
        ensure_declared::<R>(field)?;
        let sql = format!(
            "SELECT {} FROM {} WHERE {} = ?1 LIMIT 1;",
            self.columns,
            quoted(&self.partition),
            quoted(field)
        );
        Ok(self
            .query_fields(&sql, vec![to_sql_value(value)?])?
            .into_iter()
            .next())
    }

    fn fetch_all(&self) -> ManagerResult<Vec<FieldMap>> {
        let sql = format!(
            "SELECT {} FROM {};",
            self.columns,
            quoted(&self.partition)
        );
        self.query_fields(&sql, Vec::new())
    }

    fn upsert(&mut self, record: &R) -> ManagerResult<String> {
        let (key, fields) = serialize_checked(record)?;
        let exists = self
            .fetch_by_field(R::KEY_FIELD, &FieldValue::String(key.clone()))?
            .is_some();

        self.begin_if_needed()?;
        if exists {
            self.update(&key, &fields)?;
        } else {
            self.insert(&fields)?;
        }
        debug!(
            "event=record_upsert module=manager status=ok partition={} mode={}",
            self.partition,
            if exists { "update" } else { "insert" }
        );
        Ok(key)
    }

    fn delete(&mut self, keyid: &str) -> ManagerResult<()> {
        self.get_or_fail(keyid)?;

        self.begin_if_needed()?;
        self.conn.execute(
            &format!(
                "DELETE FROM {} WHERE {} = ?1;",
                quoted(&self.partition),
                quoted(R::KEY_FIELD)
            ),
            [keyid],
        )?;
        Ok(())
    }

    /// Commits the open transaction, if any.
    fn save(&mut self) -> ManagerResult<()> {
        if self.conn.is_autocommit() {
            return Ok(());
        }
        self.conn.execute_batch("COMMIT;")?;
        info!(
            "event=sqlite_commit module=manager status=ok partition={}",
            self.partition
        );
        Ok(())
    }
}

fn ensure_identifier(name: &str) -> ManagerResult<()> {
    if SQL_IDENTIFIER_RE.is_match(name) {
        Ok(())
    } else {
        Err(ManagerError::InvalidIdentifier(name.to_string()))
    }
}

/// Wraps a validated identifier in double quotes so keywords stay names.
fn quoted(name: &str) -> String {
    format!("\"{name}\"")
}

/// Columns of `table` whose declared type names a boolean.
///
/// A table that does not exist yet has no columns here; statements against
/// it fail later with the database error.
fn declared_bool_columns(conn: &Connection, table: &str) -> ManagerResult<HashSet<String>> {
    let mut stmt = conn.prepare(&format!("PRAGMA table_info({});", quoted(table)))?;
    let columns = stmt.query_map([], |row| {
        Ok((row.get::<_, String>(1)?, row.get::<_, String>(2)?))
    })?;

    let mut found = HashSet::new();
    for column in columns {
        let (name, declared) = column?;
        if declared.to_ascii_uppercase().contains("BOOL") {
            found.insert(name);
        }
    }
    Ok(found)
}

fn to_sql_value(value: &FieldValue) -> ManagerResult<SqlValue> {
    match value {
        FieldValue::Null => Ok(SqlValue::Null),
        FieldValue::Bool(flag) => Ok(SqlValue::Integer(i64::from(*flag))),
        FieldValue::Number(number) => match number.as_i64() {
            Some(int) => Ok(SqlValue::Integer(int)),
            None => number.as_f64().map(SqlValue::Real).ok_or_else(|| {
                ManagerError::Malformed(format!("number `{number}` cannot be stored"))
            }),
        },
        FieldValue::String(text) => Ok(SqlValue::Text(text.clone())),
        FieldValue::Array(_) | FieldValue::Object(_) => Err(ManagerError::Malformed(format!(
            "{} field values cannot be stored in a column",
            value_kind(value)
        ))),
    }
}

fn from_sql_value(column: &str, value: ValueRef<'_>) -> ManagerResult<FieldValue> {
    match value {
        ValueRef::Null => Ok(FieldValue::Null),
        ValueRef::Integer(int) => Ok(FieldValue::from(int)),
        ValueRef::Real(real) => serde_json::Number::from_f64(real)
            .map(FieldValue::Number)
            .ok_or_else(|| {
                ManagerError::Malformed(format!("column `{column}` holds non-finite real"))
            }),
        ValueRef::Text(bytes) => String::from_utf8(bytes.to_vec())
            .map(FieldValue::String)
            .map_err(|_| ManagerError::Malformed(format!("column `{column}` holds invalid UTF-8"))),
        ValueRef::Blob(_) => Err(ManagerError::Malformed(format!(
            "column `{column}` holds a blob"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::{ensure_identifier, from_sql_value, quoted, to_sql_value};
    use crate::manager::ManagerError;
    use rusqlite::types::{Value as SqlValue, ValueRef};
    use serde_json::json;

    #[test]
    fn identifiers_reject_sql_fragments() {
        ensure_identifier("groups").unwrap();
        ensure_identifier("_tmp2").unwrap();
        for bad in ["", "2groups", "groups;DROP", "a b", "name\""] {
            assert!(matches!(
                ensure_identifier(bad).unwrap_err(),
                ManagerError::InvalidIdentifier(_)
            ));
        }
    }

    #[test]
    fn identifiers_are_quoted() {
        assert_eq!(quoted("order"), "\"order\"");
    }

    #[test]
    fn scalar_values_bind_to_sql() {
        assert_eq!(to_sql_value(&json!(null)).unwrap(), SqlValue::Null);
        assert_eq!(to_sql_value(&json!(true)).unwrap(), SqlValue::Integer(1));
        assert_eq!(to_sql_value(&json!(42)).unwrap(), SqlValue::Integer(42));
        assert_eq!(to_sql_value(&json!(1.5)).unwrap(), SqlValue::Real(1.5));
        assert_eq!(
            to_sql_value(&json!("g1")).unwrap(),
            SqlValue::Text("g1".to_string())
        );
        assert!(matches!(
            to_sql_value(&json!(["a"])).unwrap_err(),
            ManagerError::Malformed(_)
        ));
    }

    #[test]
    fn columns_map_back_to_json() {
        assert_eq!(from_sql_value("n", ValueRef::Integer(7)).unwrap(), json!(7));
        assert_eq!(from_sql_value("n", ValueRef::Text(b"x")).unwrap(), json!("x"));
        assert!(matches!(
            from_sql_value("n", ValueRef::Blob(b"\x00")).unwrap_err(),
            ManagerError::Malformed(_)
        ));
    }
}
