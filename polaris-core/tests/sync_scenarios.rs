//! End-to-end behavior of the Polaris components over a shared database

use polaris_core::core_polaris::{
    is_safe_to_apply, merge_boundary, BufferedChange, ConflictBuffer, ContentChangeLog, ContentHash, EpochTracker,
    FetchQueue, MetaChange, MetaChangeLog, ObjectType, PolarisDatabase, RemoteContentIndex, RemoteLinkTree, Sidx,
    Soid, StoreLifecycle, VersionStore,
};
use polaris_core::test_utils::{test_did, test_oid, TestDatabase};

const S: Sidx = Sidx(1);

#[test]
fn test_meta_changes_are_logged_in_order() {
    let mut db = TestDatabase::new().with_stores(&[S]);
    let log = MetaChangeLog::new();
    let (o, p) = (test_oid(1), test_oid(2));

    let tx = db.transaction();
    assert_eq!(log.insert_change(&tx, S, &o, Some(&p), Some("a"), None).unwrap(), 1);
    assert_eq!(log.insert_change(&tx, S, &o, Some(&p), Some("b"), None).unwrap(), 2);

    let changes = log.get_changes_since(&tx, S, 0).unwrap();
    assert_eq!(
        changes,
        vec![
            MetaChange { sidx: S, idx: 1, oid: o, new_parent: Some(p), new_name: Some("a".to_string()), migrant: None },
            MetaChange { sidx: S, idx: 2, oid: o, new_parent: Some(p), new_name: Some("b".to_string()), migrant: None },
        ]
    );

    assert!(log.delete_change(&tx, S, 1).unwrap());
    let changes = log.get_changes_since(&tx, S, 0).unwrap();
    assert_eq!(changes.len(), 1);
    assert_eq!(changes[0].idx, 2);
    assert_eq!(changes[0].new_name.as_deref(), Some("b"));
}

#[test]
fn test_remote_content_version_tracking() {
    let mut db = TestDatabase::new().with_stores(&[S]);
    let index = RemoteContentIndex::new();
    let (o, a) = (test_oid(1), test_did(1));
    let h1 = ContentHash::digest(b"first");

    let tx = db.transaction();
    index.insert(&tx, S, &o, 5, &a, &h1, 100).unwrap();
    assert!(index.has_remote_change(&tx, S, &o, 5).unwrap());
    assert!(index.has_remote_changes(&tx, S, &o, 4).unwrap());
    assert_eq!(index.get_max_version(&tx, S, &o).unwrap(), Some(5));

    index.insert(&tx, S, &o, 5, &a, &h1, 100).unwrap();
    let rows = index.get_remote_changes(&tx, S, &o).unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].length, 100);
}

#[test]
fn test_buffered_change_waits_for_boundary() {
    let mut db = TestDatabase::new().with_stores(&[S]);
    let buffer = ConflictBuffer::new();
    let o = test_oid(1);

    let tx = db.transaction();
    buffer.insert(&tx, S, &o, ObjectType::Dir, 10).unwrap();
    assert_eq!(buffer.get_buffered_change(&tx, S, 9).unwrap(), None);
    assert_eq!(
        buffer.get_buffered_change(&tx, S, 10).unwrap(),
        Some(BufferedChange { oid: o, object_type: ObjectType::Dir })
    );

    buffer.remove(&tx, S, &o).unwrap();
    assert!(!buffer.is_buffered(&tx, &Soid::new(S, o)).unwrap());
}

#[test]
fn test_remote_change_round_trip_through_buffer() {
    let mut db = TestDatabase::new().with_stores(&[S]);
    let epochs = EpochTracker::new();
    let buffer = ConflictBuffer::new();
    let tree = RemoteLinkTree::new();
    let versions = VersionStore::new();
    let (root, dir) = (test_oid(1), test_oid(2));

    // the server log is known to reach 12 when a change at tick 7 arrives
    let tx = db.transaction();
    epochs.set_remote_change_epoch(&tx, S, 7).unwrap();
    let boundary = merge_boundary(7, 12);
    buffer.insert(&tx, S, &dir, ObjectType::Dir, boundary).unwrap();
    tx.commit().unwrap();

    let remote_epoch = epochs.get_remote_change_epoch(db.conn(), S).unwrap();
    assert!(!is_safe_to_apply(boundary, remote_epoch));
    assert!(buffer.get_buffered_change(db.conn(), S, remote_epoch.unwrap()).unwrap().is_none());

    let tx = db.transaction();
    epochs.set_remote_change_epoch(&tx, S, 12).unwrap();
    let until = epochs.get_remote_change_epoch(&tx, S).unwrap().unwrap();
    let applied = buffer
        .drain(&tx, S, until, |tx, change| {
            tree.insert_parent(tx, S, &change.oid, &root, "docs", 7)?;
            versions.set(tx, S, &change.oid, 7)
        })
        .unwrap();
    tx.commit().unwrap();

    assert_eq!(applied, 1);
    assert_eq!(tree.get_parent(db.conn(), S, &dir).unwrap().unwrap().name, "docs");
    assert_eq!(versions.get(db.conn(), S, &dir).unwrap(), Some(7));
    assert!(!buffer.is_buffered(db.conn(), &Soid::new(S, dir)).unwrap());
}

#[test]
fn test_content_submission_keeps_newer_edit() {
    let mut db = TestDatabase::new().with_stores(&[S]);
    let log = ContentChangeLog::new();
    let o = test_oid(1);

    let tx = db.transaction();
    let submitted = log.insert_change(&tx, S, &o).unwrap();
    // edited again while the submission was in flight
    let newer = log.insert_change(&tx, S, &o).unwrap();
    assert!(newer > submitted);

    assert!(!log.delete_change_at(&tx, S, submitted).unwrap());
    assert!(log.has_change(&tx, S, &o).unwrap());
    assert!(log.delete_change_at(&tx, S, newer).unwrap());
    assert!(!log.has_change(&tx, S, &o).unwrap());
}

#[test]
fn test_download_pipeline() {
    let mut db = TestDatabase::new().with_stores(&[S]);
    let index = RemoteContentIndex::new();
    let queue = FetchQueue::new();
    let (o, a, b) = (test_oid(1), test_did(1), test_did(2));

    let tx = db.transaction();
    index.insert(&tx, S, &o, 3, &a, &ContentHash::digest(b"3"), 3).unwrap();
    index.insert(&tx, S, &o, 8, &b, &ContentHash::digest(b"8"), 8).unwrap();
    assert!(queue.insert(&tx, S, &o).unwrap());
    tx.commit().unwrap();

    let next = queue.list(db.conn(), S, 0).unwrap();
    assert_eq!(next.len(), 1);
    assert_eq!(index.get_originator(db.conn(), S, &o).unwrap(), Some(a));

    // version 8 downloaded
    let tx = db.transaction();
    index.delete_up_to_version(&tx, S, &o, 9).unwrap();
    queue.remove(&tx, S, &o).unwrap();
    tx.commit().unwrap();

    assert!(!index.has_remote_changes(db.conn(), S, &o, 0).unwrap());
    assert!(queue.list(db.conn(), S, next[0].idx).unwrap().is_empty());
}

#[test]
fn test_rolled_back_transaction_leaves_no_trace() {
    let mut db = TestDatabase::new().with_stores(&[S]);
    let log = MetaChangeLog::new();

    {
        let tx = db.transaction();
        log.insert_change(&tx, S, &test_oid(1), None, Some("gone"), None).unwrap();
        // dropped without commit
    }

    assert!(!log.has_changes(db.conn(), S).unwrap());
}

#[test]
fn test_pooled_database_shares_state() {
    let db = PolarisDatabase::memory().unwrap();
    let lifecycle = StoreLifecycle::with_defaults();
    let queue = FetchQueue::new();
    let o = test_oid(9);

    {
        let mut conn = db.connection().unwrap();
        let tx = conn.transaction().unwrap();
        lifecycle.store_created(&tx, S, true).unwrap();
        queue.insert(&tx, S, &o).unwrap();
        tx.commit().unwrap();
    }

    let conn = db.connection().unwrap();
    assert!(queue.contains(&conn, S, &o).unwrap());
}
