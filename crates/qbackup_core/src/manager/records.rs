//! Field-map access over an ordered key -> record mapping.
//!
//! Shared by the in-memory and document-store managers, whose partitions are
//! both JSON objects keyed by the identifying field value.

use super::{serialize_checked, ManagerError, ManagerResult};
use crate::model::record::{value_kind, FieldMap, FieldValue, Record};
use crate::stream::Document;

pub(crate) fn fetch_by_field(
    records: &Document,
    key_field: &str,
    field: &str,
    value: &FieldValue,
) -> ManagerResult<Option<FieldMap>> {
    if field == key_field {
        let Some(key) = value.as_str() else {
            return Ok(None);
        };
        return records
            .get(key)
            .map(|entry| as_field_map(key, entry).cloned())
            .transpose();
    }

    for (key, entry) in records {
        let fields = as_field_map(key, entry)?;
        if fields.get(field) == Some(value) {
            return Ok(Some(fields.clone()));
        }
    }
    Ok(None)
}

pub(crate) fn fetch_all(records: &Document) -> ManagerResult<Vec<FieldMap>> {
    records
        .iter()
        .map(|(key, entry)| as_field_map(key, entry).cloned())
        .collect()
}

/// Inserts or replaces in place; an existing key keeps its position.
pub(crate) fn upsert<R: Record>(records: &mut Document, record: &R) -> ManagerResult<String> {
    let (key, fields) = serialize_checked(record)?;
    records.insert(key.clone(), FieldValue::Object(fields));
    Ok(key)
}

pub(crate) fn delete(records: &mut Document, partition: &str, keyid: &str) -> ManagerResult<()> {
    match records.shift_remove(keyid) {
        Some(_) => Ok(()),
        None => Err(ManagerError::NotFound {
            partition: partition.to_string(),
            key: keyid.to_string(),
        }),
    }
}

fn as_field_map<'a>(key: &str, entry: &'a FieldValue) -> ManagerResult<&'a FieldMap> {
    entry.as_object().ok_or_else(|| {
        ManagerError::Malformed(format!(
            "record `{key}` must be an object, found {}",
            value_kind(entry)
        ))
    })
}

#[cfg(test)]
mod tests {
    use super::{delete, fetch_all, fetch_by_field};
    use crate::manager::ManagerError;
    use crate::stream::Document;
    use serde_json::json;

    fn records() -> Document {
        let mut records = Document::new();
        records.insert("a".to_string(), json!({"id": "a", "name": "x"}));
        records.insert("b".to_string(), json!({"id": "b", "name": "y"}));
        records.insert("c".to_string(), json!({"id": "c", "name": "y"}));
        records
    }

    #[test]
    fn key_lookup_and_scan_return_first_match() {
        let records = records();
        let by_key = fetch_by_field(&records, "id", "id", &json!("b")).unwrap().unwrap();
        assert_eq!(by_key["name"], json!("y"));

        let by_scan = fetch_by_field(&records, "id", "name", &json!("y")).unwrap().unwrap();
        assert_eq!(by_scan["id"], json!("b"));

        assert!(fetch_by_field(&records, "id", "id", &json!(7)).unwrap().is_none());
    }

    #[test]
    fn delete_keeps_remaining_order() {
        let mut records = records();
        delete(&mut records, "test", "a").unwrap();
        let ids: Vec<_> = fetch_all(&records)
            .unwrap()
            .into_iter()
            .map(|fields| fields["id"].clone())
            .collect();
        assert_eq!(ids, vec![json!("b"), json!("c")]);

        let err = delete(&mut records, "test", "a").unwrap_err();
        assert!(matches!(err, ManagerError::NotFound { .. }));
    }

    #[test]
    fn non_object_entries_are_malformed() {
        let mut records = Document::new();
        records.insert("a".to_string(), json!("flat"));
        assert!(matches!(
            fetch_all(&records).unwrap_err(),
            ManagerError::Malformed(_)
        ));
    }
}
