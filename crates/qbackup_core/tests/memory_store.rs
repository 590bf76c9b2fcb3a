use qbackup_core::{Connector, Group, Manager, ManagerError, MemoryConnector, MemoryManager};
use serde_json::json;

#[test]
fn connector_sees_records_only_after_save() {
    let mut connector = MemoryConnector::new();
    connector.connect().unwrap();
    let mut groups = MemoryManager::<Group>::new("groups", &connector).unwrap();

    groups.upsert(&Group::new("baz", "monthly")).unwrap();
    assert!(connector.load("groups").is_empty());

    groups.save().unwrap();
    assert_eq!(
        serde_json::Value::Object(connector.load("groups")),
        json!({"baz": {"name": "baz", "period": "monthly"}})
    );
}

#[test]
fn later_manager_starts_from_saved_mapping() {
    let mut connector = MemoryConnector::new();
    connector.connect().unwrap();
    {
        let mut groups = MemoryManager::<Group>::new("groups", &connector).unwrap();
        groups.upsert(&Group::new("g1", "monthly")).unwrap();
        groups.save().unwrap();
    }

    let groups = MemoryManager::<Group>::new("groups", &connector).unwrap();
    assert_eq!(groups.list().unwrap(), vec![Group::new("g1", "monthly")]);
}

#[test]
fn closed_connector_is_refused() {
    let connector = MemoryConnector::new();
    let err = MemoryManager::<Group>::new("groups", &connector)
        .err()
        .unwrap();
    assert!(matches!(err, ManagerError::NotConnected));
}
