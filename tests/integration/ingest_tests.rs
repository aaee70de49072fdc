use std::fs;
use std::path::PathBuf;

use tempfile::TempDir;
use threaded_inventory::ingest::{IngestConfig, Ingestor};
use threaded_inventory::scanner::load_excludes;
use threaded_inventory::store::InventoryStore;

fn tree() -> TempDir {
    let dir = TempDir::new().unwrap();
    for rel in [
        "root/a.txt",
        "root/photos/b.jpg",
        "root/photos/cache/c.tmp",
        "root/photos/cache/deep/d.tmp",
        "root/music/e.mp3",
        "root/music/cache/f.mp3",
    ] {
        let path = dir.path().join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, rel.as_bytes()).unwrap();
    }
    dir
}

fn stored_paths(store: &InventoryStore) -> Vec<PathBuf> {
    let mut paths: Vec<PathBuf> = store
        .select_unhashed(usize::MAX)
        .unwrap()
        .into_iter()
        .map(|r| PathBuf::from(r.file_path))
        .collect();
    paths.sort();
    paths
}

#[test]
fn test_excluded_subtrees_never_ingested() {
    let dir = tree();
    let root = dir.path().join("root");
    let excludes_file = dir.path().join("excludes.txt");
    fs::write(
        &excludes_file,
        format!("\n{}\n  \n", root.join("photos").join("cache").display()),
    )
    .unwrap();
    let excludes = load_excludes(&excludes_file).unwrap();
    assert_eq!(excludes.len(), 1);

    let mut store = InventoryStore::open_in_memory().unwrap();
    let stats = Ingestor::new(IngestConfig::default().with_excludes(excludes))
        .ingest(&mut store, &root)
        .unwrap();

    assert_eq!(stats.files_recorded, 4);
    let paths = stored_paths(&store);
    assert!(paths.iter().all(|p| !p.starts_with(root.join("photos/cache"))));
    // same name elsewhere is not excluded
    assert!(paths.contains(&root.join("music/cache/f.mp3")));
}

#[test]
fn test_record_fields_from_traversal() {
    let dir = tree();
    let root = dir.path().join("root");
    let mut store = InventoryStore::open_in_memory().unwrap();
    Ingestor::default().ingest(&mut store, &root).unwrap();

    let rec = store
        .select_unhashed(usize::MAX)
        .unwrap()
        .into_iter()
        .find(|r| r.file_name == "e.mp3")
        .unwrap();
    assert_eq!(PathBuf::from(&rec.file_path), root.join("music/e.mp3"));
    assert_eq!(rec.file_size, "root/music/e.mp3".len() as u64);
    assert!(!rec.hashed);
}

#[test]
#[cfg(unix)]
fn test_unreadable_entries_become_bad_paths() {
    let dir = tree();
    let root = dir.path().join("root");
    let dangling = root.join("dangling");
    std::os::unix::fs::symlink(root.join("nowhere"), &dangling).unwrap();

    let mut store = InventoryStore::open_in_memory().unwrap();
    let stats = Ingestor::default().ingest(&mut store, &root).unwrap();
    assert_eq!(stats.bad_paths, vec![dangling]);
    assert_eq!(stats.files_recorded, 6);
}
