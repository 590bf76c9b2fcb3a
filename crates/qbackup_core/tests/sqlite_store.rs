use qbackup_core::db::BOOTSTRAP_SQL;
use qbackup_core::{
    Connector, Group, Manager, ManagerError, Period, Predicate, Qube, Record, SqliteConnector,
    SqliteManager,
};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Record stored in a table whose name and non-key columns are SQL keywords.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
struct Step {
    id: String,
    order: i64,
    on: bool,
}

impl Record for Step {
    const FIELDS: &'static [&'static str] = &["id", "order", "on"];

    fn keyid(&self) -> String {
        self.id.clone()
    }
}

const STEP_SQL: &str = r#"
CREATE TABLE "group" (
    id VARCHAR NOT NULL PRIMARY KEY,
    "order" INTEGER NOT NULL,
    "on" BOOLEAN NOT NULL
);
"#;

fn open(path: &Path) -> SqliteConnector {
    let mut connector = SqliteConnector::new(path).with_bootstrap(BOOTSTRAP_SQL);
    connector.connect().unwrap();
    connector
}

#[test]
fn saved_group_survives_reconnect() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("qbackup.db");
    {
        let mut connector = open(&path);
        let mut groups = SqliteManager::<Group>::new("groups", &connector).unwrap();
        groups.upsert(&Group::new("g1", "monthly")).unwrap();
        groups.save().unwrap();
        drop(groups);
        connector.close().unwrap();
    }

    let connector = open(&path);
    let groups = SqliteManager::<Group>::new("groups", &connector).unwrap();
    assert_eq!(groups.get("g1").unwrap(), Some(Group::new("g1", "monthly")));
    assert_eq!(groups.list().unwrap(), vec![Group::new("g1", "monthly")]);
}

#[test]
fn keyword_identifiers_are_usable() {
    let mut connector = SqliteConnector::in_memory().with_bootstrap(STEP_SQL);
    connector.connect().unwrap();
    let mut steps = SqliteManager::<Step>::new("group", &connector).unwrap();

    let first = Step {
        id: "a".to_string(),
        order: 1,
        on: true,
    };
    let second = Step {
        id: "b".to_string(),
        order: 2,
        on: false,
    };
    steps.upsert(&first).unwrap();
    steps.upsert(&second).unwrap();
    steps
        .upsert(&Step {
            order: 3,
            ..first.clone()
        })
        .unwrap();

    assert_eq!(steps.find_where("order", 2).unwrap(), Some(second.clone()));
    assert_eq!(steps.get_or_fail("a").unwrap().order, 3);
    steps.delete("a").unwrap();
    steps.save().unwrap();
    assert_eq!(steps.list().unwrap(), vec![second]);
}

#[test]
fn bool_into_undeclared_column_is_refused() {
    let sql = r#"CREATE TABLE "group" (id VARCHAR PRIMARY KEY, "order" INTEGER, "on" INTEGER);"#;
    let mut connector = SqliteConnector::in_memory().with_bootstrap(sql);
    connector.connect().unwrap();
    let mut steps = SqliteManager::<Step>::new("group", &connector).unwrap();

    let err = steps
        .upsert(&Step {
            id: "a".to_string(),
            order: 1,
            on: true,
        })
        .unwrap_err();
    assert!(matches!(err, ManagerError::Malformed(_)));
    assert!(steps.list().unwrap().is_empty());
}

#[test]
fn unsaved_changes_roll_back_on_close() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("qbackup.db");
    {
        let mut connector = open(&path);
        let mut groups = SqliteManager::<Group>::new("groups", &connector).unwrap();
        groups.upsert(&Group::new("g1", "monthly")).unwrap();
        assert!(groups.get("g1").unwrap().is_some());
        drop(groups);
        connector.close().unwrap();
    }

    let connector = open(&path);
    let groups = SqliteManager::<Group>::new("groups", &connector).unwrap();
    assert!(groups.list().unwrap().is_empty());
}

#[test]
fn bootstrap_is_skipped_for_existing_store() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("qbackup.db");
    {
        let connector = open(&path);
        let mut periods = SqliteManager::<Period>::new("periods", &connector).unwrap();
        periods.upsert(&Period::new("daily")).unwrap();
        periods.save().unwrap();
    }

    let mut connector = SqliteConnector::new(&path)
        .with_bootstrap("DROP TABLE periods; CREATE TABLE periods (name VARCHAR PRIMARY KEY);");
    connector.connect().unwrap();
    let periods = SqliteManager::<Period>::new("periods", &connector).unwrap();
    assert_eq!(periods.list().unwrap(), vec![Period::new("daily")]);
}

#[test]
fn managers_on_one_connector_share_the_transaction() {
    let connector = {
        let mut connector = SqliteConnector::in_memory().with_bootstrap(BOOTSTRAP_SQL);
        connector.connect().unwrap();
        connector
    };
    let mut groups = SqliteManager::<Group>::new("groups", &connector).unwrap();
    let mut qubes = SqliteManager::<Qube>::new("qubes", &connector).unwrap();

    groups.upsert(&Group::new("g1", "monthly")).unwrap();
    let work = Qube::new("work", "g1");
    let vault = Qube::new("vault", "g1");
    qubes.upsert(&work).unwrap();
    qubes.upsert(&vault).unwrap();
    groups.save().unwrap();

    assert_eq!(qubes.list().unwrap(), vec![work.clone(), vault]);
    let in_group = qubes
        .slow_find_one(&Predicate::new().eq("group_name", "g1").eq("name", "work"))
        .unwrap();
    assert_eq!(in_group, Some(work));
    // Nothing left to commit.
    qubes.save().unwrap();
}

#[test]
fn key_only_record_update_is_a_noop() {
    let mut connector = SqliteConnector::in_memory().with_bootstrap(BOOTSTRAP_SQL);
    connector.connect().unwrap();
    let mut periods = SqliteManager::<Period>::new("periods", &connector).unwrap();

    periods.upsert(&Period::new("daily")).unwrap();
    periods.upsert(&Period::new("daily")).unwrap();
    assert_eq!(periods.list().unwrap().len(), 1);
}

#[test]
fn invalid_partition_name_is_rejected() {
    let mut connector = SqliteConnector::in_memory();
    connector.connect().unwrap();

    let err = SqliteManager::<Group>::new("groups; DROP TABLE groups", &connector)
        .err()
        .unwrap();
    assert!(matches!(err, ManagerError::InvalidIdentifier(_)));
}

#[test]
fn unconnected_connector_is_refused() {
    let connector = SqliteConnector::in_memory();
    let err = SqliteManager::<Group>::new("groups", &connector)
        .err()
        .unwrap();
    assert!(matches!(err, ManagerError::NotConnected));
}

#[test]
fn missing_table_surfaces_database_error() {
    let mut connector = SqliteConnector::in_memory();
    connector.connect().unwrap();
    let groups = SqliteManager::<Group>::new("groups", &connector).unwrap();

    assert!(matches!(groups.list().unwrap_err(), ManagerError::Db(_)));
}
