use qbackup_core::{scoped, Connector, ConnectorError, DirLockConnector};
use std::sync::mpsc;
use std::thread;

#[test]
fn lock_held_by_another_thread_refuses_connect() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().to_path_buf();
    let (locked_tx, locked_rx) = mpsc::channel();
    let (release_tx, release_rx) = mpsc::channel::<()>();

    let holder = thread::spawn(move || {
        let mut connector = DirLockConnector::new(path);
        connector.connect().unwrap();
        locked_tx.send(()).unwrap();
        release_rx.recv().unwrap();
        connector.close().unwrap();
    });
    locked_rx.recv().unwrap();

    let mut contender = DirLockConnector::new(dir.path());
    let err = contender.connect().unwrap_err();
    assert!(matches!(err, ConnectorError::LockUnavailable { .. }));
    assert!(!contender.is_connected());

    release_tx.send(()).unwrap();
    holder.join().unwrap();

    contender.connect().unwrap();
    assert!(contender.is_connected());
}

#[test]
fn scoped_session_releases_lock_on_error() {
    let dir = tempfile::tempdir().unwrap();
    let mut connector = DirLockConnector::new(dir.path());

    let result: Result<(), ConnectorError> = scoped(&mut connector, |_| {
        Err(ConnectorError::NotConnected)
    });
    assert!(result.is_err());
    assert!(!connector.is_connected());

    let mut next = DirLockConnector::new(dir.path());
    next.connect().unwrap();
}

#[test]
fn scoped_session_reports_contention() {
    let dir = tempfile::tempdir().unwrap();
    let mut holder = DirLockConnector::new(dir.path());
    holder.connect().unwrap();

    let mut contender = DirLockConnector::new(dir.path());
    let mut ran = false;
    let result: Result<(), ConnectorError> = scoped(&mut contender, |_| {
        ran = true;
        Ok(())
    });

    assert!(matches!(result, Err(ConnectorError::LockUnavailable { .. })));
    assert!(!ran);
}
