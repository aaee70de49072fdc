use threaded_inventory::store::{InventoryStore, NewRecord, StoreError, DEFAULT_MAX_INSERT_BATCH};
use tempfile::tempdir;

fn records(n: usize) -> Vec<NewRecord> {
    (0..n)
        .map(|i| NewRecord::new(format!("/data/dir{}/file{i}.bin", i % 7), i as u64 * 3))
        .collect()
}

#[test]
fn test_batched_insert_spanning_boundaries() {
    let dir = tempdir().unwrap();
    let mut store = InventoryStore::open(&dir.path().join("inv.db")).unwrap();
    for chunk in records(250).chunks(DEFAULT_MAX_INSERT_BATCH) {
        store.insert_batch(chunk).unwrap();
    }

    assert_eq!(store.count().unwrap(), 250);
    assert_eq!(store.count_unhashed().unwrap(), 250);
    let all = store.select_unhashed(1000).unwrap();
    assert_eq!(all.len(), 250);
    assert!(all.iter().all(|r| !r.hashed && r.content_hash.is_empty()));
    // largest first
    assert!(all.windows(2).all(|w| w[0].file_size >= w[1].file_size));
}

#[test]
fn test_records_survive_reopen() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("inv.db");
    {
        let mut store = InventoryStore::open(&path).unwrap();
        store.insert_batch(&records(10)).unwrap();
        let mut rec = store.get(3).unwrap().unwrap();
        rec.content_hash = "abc".into();
        rec.hashed = true;
        store.update(&rec).unwrap();
    }

    let store = InventoryStore::open(&path).unwrap();
    assert_eq!(store.count().unwrap(), 10);
    assert_eq!(store.count_unhashed().unwrap(), 9);
    assert!(store.has_hash("abc").unwrap());
    assert_eq!(store.select_by_hash("abc", Some(2)).unwrap()[0].id, 3);
}

#[test]
fn test_rescan_appends_duplicates_of_paths() {
    let dir = tempdir().unwrap();
    let mut store = InventoryStore::open(&dir.path().join("inv.db")).unwrap();
    store.insert_batch(&records(5)).unwrap();
    store.insert_batch(&records(5)).unwrap();
    assert_eq!(store.count().unwrap(), 10);
    assert_eq!(store.delete_by_path("/data/dir0/file0.bin").unwrap(), 2);
}

#[test]
fn test_newer_schema_is_rejected() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("future.db");
    {
        let conn = rusqlite::Connection::open(&path).unwrap();
        conn.pragma_update(None, "user_version", 99).unwrap();
    }
    let err = InventoryStore::open(&path).unwrap_err();
    assert!(matches!(err, StoreError::SchemaVersion { found: 99, .. }));
}

#[test]
fn test_open_existing_requires_inventory() {
    let dir = tempdir().unwrap();
    let missing = dir.path().join("missing.db");
    assert!(matches!(
        InventoryStore::open_existing(&missing),
        Err(StoreError::Open { .. })
    ));
    assert!(!missing.exists());

    let other = dir.path().join("other.db");
    rusqlite::Connection::open(&other)
        .unwrap()
        .execute_batch("CREATE TABLE t (x INTEGER);")
        .unwrap();
    assert!(matches!(
        InventoryStore::open_existing(&other),
        Err(StoreError::NotAnInventory(_))
    ));
}

#[test]
fn test_open_rejects_non_database_file() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("notes.db");
    std::fs::write(&path, "this is not sqlite, just some text that is long enough").unwrap();
    assert!(InventoryStore::open(&path).is_err());
}
