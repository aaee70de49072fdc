use std::fs;

use tempfile::TempDir;
use threaded_inventory::duplicates::DuplicateFinder;
use threaded_inventory::ingest::Ingestor;
use threaded_inventory::output::{duplicate_report_path, DuplicateReport};
use threaded_inventory::pipeline::{HashPipeline, PipelineConfig};
use threaded_inventory::scanner::hash_bytes;
use threaded_inventory::store::InventoryStore;

#[test]
fn test_report_file_from_hashed_tree() {
    let dir = TempDir::new().unwrap();
    let root = dir.path().join("tree");
    fs::create_dir_all(root.join("x")).unwrap();
    fs::write(root.join("one"), b"dup").unwrap();
    fs::write(root.join("x/two"), b"dup").unwrap();
    fs::write(root.join("x/three"), b"dup").unwrap();
    fs::write(root.join("lonely"), b"solo").unwrap();
    fs::write(root.join("empty1"), b"").unwrap();
    fs::write(root.join("empty2"), b"").unwrap();

    let db = dir.path().join("tree.db");
    let mut store = InventoryStore::open(&db).unwrap();
    Ingestor::default().ingest(&mut store, &root).unwrap();
    HashPipeline::new(&store, PipelineConfig::default())
        .run()
        .unwrap();

    let target = duplicate_report_path(&db);
    assert_eq!(target, dir.path().join("tree_duplicate_report.tsv"));
    let stats = DuplicateReport::new(DuplicateFinder::new(&store))
        .write_file(&target)
        .unwrap();
    assert_eq!(stats.groups, 1);

    let text = fs::read_to_string(&target).unwrap();
    let lines: Vec<&str> = text.lines().collect();
    assert_eq!(lines[0], "Hash\tCount\tFilename");
    let summary: Vec<&str> = lines[1].split('\t').collect();
    assert_eq!(summary[0], hash_bytes(b"dup"));
    assert_eq!(summary[1], "3");
    assert_eq!(lines.len(), 5);
    assert!(lines[2..].iter().all(|l| l.starts_with("\t\t")));
    assert_eq!(lines[2], format!("\t\t{}", summary[2]));
    assert!(!text.contains("empty1"));
}
