use std::fs;
use std::path::Path;

use tempfile::TempDir;
use threaded_inventory::compare::{CompareConfig, ConnectionPolicy, InventoryComparator};
use threaded_inventory::ingest::{IngestConfig, Ingestor};
use threaded_inventory::pipeline::{HashPipeline, PipelineConfig};
use threaded_inventory::scanner::hash_bytes;
use threaded_inventory::store::InventoryStore;

fn inventory(db: &Path, root: &Path, files: &[(&str, &[u8])]) {
    for (rel, content) in files {
        let path = root.join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, content).unwrap();
    }
    let mut store = InventoryStore::open(db).unwrap();
    Ingestor::new(IngestConfig::default().with_count_first(false))
        .ingest(&mut store, root)
        .unwrap();
    HashPipeline::new(&store, PipelineConfig::default())
        .run()
        .unwrap();
}

#[test]
fn test_shared_duplicate_found_end_to_end() {
    let dir = TempDir::new().unwrap();
    let first_db = dir.path().join("laptop.db");
    let second_db = dir.path().join("backup.db");
    inventory(
        &first_db,
        &dir.path().join("laptop"),
        &[
            ("a/photo.jpg", b"holiday"),
            ("b/photo copy.jpg", b"holiday"),
            ("c/notes.txt", b"notes"),
            ("d/notes.txt", b"notes"),
            ("e/unique.txt", b"only here"),
        ],
    );
    inventory(
        &second_db,
        &dir.path().join("backup"),
        &[("photo.jpg", b"holiday"), ("unique.txt", b"only here")],
    );

    for policy in [ConnectionPolicy::PerLookup, ConnectionPolicy::Persistent] {
        let report = InventoryComparator::new(
            &first_db,
            &second_db,
            CompareConfig::default().with_policy(policy),
        )
        .compare()
        .unwrap();

        assert_eq!(report.candidates, 2);
        assert_eq!(report.len(), 1);
        let m = report.get(&hash_bytes(b"holiday")).unwrap();
        assert_eq!(m.first_examples.len(), 2);
        assert_eq!(m.second_examples, vec![dir.path().join("backup/photo.jpg")]);
        assert!(report.get(&hash_bytes(b"notes")).is_none());
    }
}

#[test]
fn test_example_limit_caps_both_sides() {
    let dir = TempDir::new().unwrap();
    let first_db = dir.path().join("one.db");
    let second_db = dir.path().join("two.db");
    let copies: Vec<(String, &[u8])> = (0..5).map(|i| (format!("c{i}"), &b"same"[..])).collect();
    let files: Vec<(&str, &[u8])> = copies.iter().map(|(n, c)| (n.as_str(), *c)).collect();
    inventory(&first_db, &dir.path().join("one"), &files);
    inventory(&second_db, &dir.path().join("two"), &files);

    let report = InventoryComparator::new(
        &first_db,
        &second_db,
        CompareConfig::default().with_example_limit(3),
    )
    .compare()
    .unwrap();
    let m = &report.matches[0];
    assert_eq!(m.first_examples.len(), 3);
    assert_eq!(m.second_examples.len(), 3);
}

#[test]
fn test_compare_never_writes_either_inventory() {
    let dir = TempDir::new().unwrap();
    let first_db = dir.path().join("one.db");
    let second_db = dir.path().join("two.db");
    inventory(&first_db, &dir.path().join("one"), &[("x", b"1"), ("y", b"1")]);
    inventory(&second_db, &dir.path().join("two"), &[("z", b"1")]);
    let before = (fs::read(&first_db).unwrap(), fs::read(&second_db).unwrap());

    InventoryComparator::new(&first_db, &second_db, CompareConfig::default())
        .compare()
        .unwrap();
    let after = (fs::read(&first_db).unwrap(), fs::read(&second_db).unwrap());
    assert!(before == after);
}
