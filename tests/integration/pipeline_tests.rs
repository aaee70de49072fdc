use std::fs;
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use tempfile::TempDir;
use threaded_inventory::ingest::{IngestConfig, Ingestor};
use threaded_inventory::pipeline::{HashPipeline, PipelineConfig};
use threaded_inventory::progress::{Phase, ProgressCallback};
use threaded_inventory::scanner::{hash_bytes, is_digest};
use threaded_inventory::store::{InventoryStore, PendingFilter};

#[derive(Default)]
struct Recorder {
    total: AtomicU64,
    bytes: AtomicU64,
    paths: Mutex<Vec<String>>,
    phases: Mutex<Vec<Phase>>,
}

impl ProgressCallback for Recorder {
    fn on_phase_start(&self, phase: Phase, total: u64) {
        self.phases.lock().unwrap().push(phase);
        if phase == Phase::Hash {
            self.total.store(total, Ordering::SeqCst);
        }
    }

    fn on_progress(&self, _current: u64, path: &str) {
        self.paths.lock().unwrap().push(path.to_string());
    }

    fn on_item_completed(&self, bytes: u64) {
        self.bytes.fetch_add(bytes, Ordering::SeqCst);
    }

    fn on_phase_end(&self, _phase: Phase) {}
}

fn ingested(files: &[(&str, usize)]) -> (TempDir, InventoryStore) {
    let dir = TempDir::new().unwrap();
    for (rel, size) in files {
        let path = dir.path().join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(&path, vec![b'a' + (*size % 26) as u8; *size]).unwrap();
    }
    let mut store = InventoryStore::open(&dir.path().join("inv.db")).unwrap();
    let root = dir.path().join("tree");
    Ingestor::new(IngestConfig::default().with_count_first(false))
        .ingest(&mut store, &root)
        .unwrap();
    (dir, store)
}

#[test]
fn test_pipeline_consumes_largest_first_in_order() {
    let (_dir, store) = ingested(&[
        ("tree/small", 10),
        ("tree/big", 5000),
        ("tree/sub/mid", 700),
        ("tree/sub/tiny", 1),
        ("tree/sub/deeper/large", 3000),
    ]);
    let recorder = Arc::new(Recorder::default());
    let config = PipelineConfig::default()
        .with_batch_size(2)
        .with_prefetch_depth(1)
        .with_progress_callback(recorder.clone());
    let stats = HashPipeline::new(&store, config).run().unwrap();

    let names: Vec<String> = recorder
        .paths
        .lock()
        .unwrap()
        .iter()
        .map(|p| Path::new(p).file_name().unwrap().to_string_lossy().into_owned())
        .collect();
    assert_eq!(names, vec!["big", "large", "mid", "small", "tiny"]);
    assert_eq!(recorder.total.load(Ordering::SeqCst), 8711);
    assert_eq!(recorder.bytes.load(Ordering::SeqCst), stats.bytes_hashed);
    assert_eq!(stats.bytes_hashed, 8711);
    assert_eq!(*recorder.phases.lock().unwrap(), vec![Phase::Hash]);
}

#[test]
fn test_every_hashed_record_has_digest_or_empty() {
    let (dir, store) = ingested(&[("tree/a", 100), ("tree/b", 100), ("tree/c", 42)]);
    fs::remove_file(dir.path().join("tree/c")).unwrap();
    HashPipeline::new(&store, PipelineConfig::default())
        .run()
        .unwrap();

    for id in 1..=3 {
        let rec = store.get(id).unwrap().unwrap();
        assert!(rec.hashed);
        assert!(rec.content_hash.is_empty() || is_digest(&rec.content_hash));
    }
    assert_eq!(store.count_hash_empty().unwrap(), 1);
    assert_eq!(store.count_by_hash(&hash_bytes(&[b'w'; 100])).unwrap(), 2);
}

#[test]
fn test_second_run_changes_nothing() {
    let (_dir, store) = ingested(&[("tree/a", 3), ("tree/b", 4)]);
    HashPipeline::new(&store, PipelineConfig::default())
        .run()
        .unwrap();
    let before: Vec<_> = (1..=2).map(|id| store.get(id).unwrap().unwrap()).collect();

    let stats = HashPipeline::new(&store, PipelineConfig::default())
        .run()
        .unwrap();
    let after: Vec<_> = (1..=2).map(|id| store.get(id).unwrap().unwrap()).collect();
    assert_eq!(stats.processed(), 0);
    assert_eq!(stats.batches, 0);
    assert_eq!(before, after);
}

#[test]
fn test_vanished_file_never_selected_again() {
    let (dir, store) = ingested(&[("tree/gone", 64), ("tree/kept", 32)]);
    fs::remove_file(dir.path().join("tree/gone")).unwrap();

    let stats = HashPipeline::new(&store, PipelineConfig::default())
        .run()
        .unwrap();
    assert_eq!(stats.failed_files, 1);
    assert_eq!(stats.failed_paths, vec![dir.path().join("tree/gone")]);
    assert!(store.select_unhashed(100).unwrap().is_empty());
    assert_eq!(store.sum_unhashed_bytes().unwrap(), 0);
    assert_eq!(
        store.sum_pending_bytes(PendingFilter::EmptyHash).unwrap(),
        64
    );
}

#[test]
fn test_retry_recovers_restored_file() {
    let (dir, store) = ingested(&[("tree/flaky", 16)]);
    let flaky = dir.path().join("tree/flaky");
    let content = fs::read(&flaky).unwrap();
    fs::remove_file(&flaky).unwrap();
    HashPipeline::new(&store, PipelineConfig::default())
        .run()
        .unwrap();
    assert!(store.get(1).unwrap().unwrap().is_failed());

    fs::write(&flaky, &content).unwrap();
    let stats = HashPipeline::new(
        &store,
        PipelineConfig::default().with_target(PendingFilter::EmptyHash),
    )
    .run()
    .unwrap();
    assert_eq!(stats.hashed_files, 1);
    assert_eq!(store.get(1).unwrap().unwrap().content_hash, hash_bytes(&content));
}
