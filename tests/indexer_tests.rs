//! Batch indexer: flush thresholds, drain protocol, failure aggregation.

use mediadex::engine::indexer::{BatchIndexer, IndexerConfig, IndexerState, ProgressFn};
use mediadex::engine::store::{DocPair, DocumentStore, SqliteStore};
use mediadex::{FileRecord, IngestError};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::{Duration, Instant};

fn store_with_index(name: &str) -> Arc<SqliteStore> {
    let store = SqliteStore::open_in_memory().unwrap();
    store.create_index(name).unwrap();
    Arc::new(store)
}

fn record(i: usize) -> FileRecord {
    let mut rec = FileRecord::new(format!("/vol/file-{i}"));
    rec.name = Some(format!("file-{i}"));
    rec
}

fn small_batches(max_actions: usize) -> IndexerConfig {
    let mut config = IndexerConfig::new("archive");
    config.max_actions = max_actions;
    config.flush_timeout = Duration::from_secs(10);
    config
}

/// Records every batch size; optionally fails or stalls.
struct ScriptedStore {
    batches: Mutex<Vec<usize>>,
    fail: bool,
    stall: Duration,
}

impl ScriptedStore {
    fn new(fail: bool, stall: Duration) -> Self {
        Self {
            batches: Mutex::new(Vec::new()),
            fail,
            stall,
        }
    }
}

impl DocumentStore for ScriptedStore {
    fn create_index(&self, _index: &str) -> Result<bool, IngestError> {
        Ok(true)
    }
    fn delete_index(&self, _index: &str) -> Result<bool, IngestError> {
        Ok(true)
    }
    fn index_exists(&self, _index: &str) -> Result<bool, IngestError> {
        Ok(true)
    }
    fn bulk_write(&self, _index: &str, docs: &[DocPair]) -> Result<(), IngestError> {
        thread::sleep(self.stall);
        self.batches.lock().unwrap().push(docs.len());
        if self.fail {
            return Err(IngestError::Backend("rejected".into()));
        }
        Ok(())
    }
    fn write(&self, _index: &str, _key: &str, _doc: &[u8]) -> Result<(), IngestError> {
        Ok(())
    }
    fn count(&self, _index: &str) -> Result<usize, IngestError> {
        Ok(0)
    }
}

#[test]
fn test_all_submitted_records_are_flushed_on_close() {
    let store = store_with_index("archive");
    let indexer = BatchIndexer::start(store.clone(), small_batches(10), None);
    for i in 0..25 {
        indexer.submit(record(i)).unwrap();
    }
    let report = indexer.close(25).unwrap();
    assert_eq!(report.submitted, 25);
    assert_eq!(report.indexed, 25);
    assert_eq!(report.failed_batches, 0);
    assert_eq!(store.count("archive").unwrap(), 25);
    assert_eq!(indexer.state(), IndexerState::Closed);
}

#[test]
fn test_action_threshold_splits_batches() {
    let store = Arc::new(ScriptedStore::new(false, Duration::ZERO));
    let indexer = BatchIndexer::start(store.clone(), small_batches(10), None);
    for i in 0..25 {
        indexer.submit(record(i)).unwrap();
    }
    indexer.close(25).unwrap();
    let mut sizes = store.batches.lock().unwrap().clone();
    sizes.sort_unstable();
    assert_eq!(sizes, vec![5, 10, 10]);
}

#[test]
fn test_byte_threshold_flushes_early() {
    let store = Arc::new(ScriptedStore::new(false, Duration::ZERO));
    let mut config = small_batches(1_000);
    config.max_bytes = 1;
    let indexer = BatchIndexer::start(store.clone(), config, None);
    for i in 0..3 {
        indexer.submit(record(i)).unwrap();
    }
    indexer.close(3).unwrap();
    assert_eq!(*store.batches.lock().unwrap(), vec![1, 1, 1]);
}

#[test]
fn test_same_path_overwrites_within_batch() {
    let store = store_with_index("archive");
    let indexer = BatchIndexer::start(store.clone(), small_batches(100), None);
    let mut first = FileRecord::new("/vol/a");
    first.name = Some("old".into());
    let mut second = FileRecord::new("/vol/a");
    second.name = Some("new".into());
    indexer.submit(first).unwrap();
    indexer.submit(second).unwrap();
    let report = indexer.close(2).unwrap();
    assert_eq!(report.submitted, 2);
    assert_eq!(store.count("archive").unwrap(), 1);

    let body = store.get("archive", "/vol/a").unwrap().unwrap();
    let v: serde_json::Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(v["name"], "new");
    assert_eq!(v["index"], "archive");
}

#[test]
fn test_batch_failures_surface_at_close() {
    let store = Arc::new(ScriptedStore::new(true, Duration::ZERO));
    let indexer = BatchIndexer::start(store, small_batches(2), None);
    for i in 0..5 {
        indexer.submit(record(i)).unwrap();
    }
    match indexer.close(5) {
        Err(IngestError::BatchFailures {
            failed_batches,
            failed_docs,
        }) => {
            assert_eq!(failed_batches, 3);
            assert_eq!(failed_docs, 5);
        }
        other => panic!("expected batch failures, got {other:?}"),
    }
}

#[test]
fn test_submit_after_close_is_rejected() {
    let store = store_with_index("archive");
    let indexer = BatchIndexer::start(store, small_batches(10), None);
    indexer.close(0).unwrap();
    assert!(matches!(
        indexer.submit(record(1)),
        Err(IngestError::IndexerClosed)
    ));
    assert!(matches!(indexer.close(0), Err(IngestError::IndexerClosed)));
}

#[test]
fn test_empty_path_is_rejected() {
    let store = store_with_index("archive");
    let indexer = BatchIndexer::start(store, small_batches(10), None);
    assert!(matches!(
        indexer.submit(FileRecord::default()),
        Err(IngestError::EmptyPath)
    ));
    assert_eq!(indexer.close(0).unwrap().submitted, 0);
}

#[test]
fn test_close_waits_for_producers_in_flight() {
    let store = store_with_index("archive");
    let indexer = BatchIndexer::start(store.clone(), small_batches(7), None);
    thread::scope(|s| {
        s.spawn(|| {
            for i in 0..50 {
                indexer.submit(record(i)).unwrap();
                if i % 10 == 0 {
                    thread::sleep(Duration::from_millis(20));
                }
            }
        });
        let report = indexer.close(50).unwrap();
        assert_eq!(report.indexed, 50);
    });
    assert_eq!(store.count("archive").unwrap(), 50);
}

#[test]
fn test_flush_timeout_is_fatal() {
    let store = Arc::new(ScriptedStore::new(false, Duration::from_secs(2)));
    let mut config = small_batches(10);
    config.flush_timeout = Duration::from_millis(200);
    let indexer = BatchIndexer::start(store, config, None);
    indexer.submit(record(1)).unwrap();
    let started = Instant::now();
    match indexer.close(1) {
        Err(IngestError::FlushTimeout { open_requests, .. }) => assert_eq!(open_requests, 1),
        other => panic!("expected timeout, got {other:?}"),
    }
    assert!(started.elapsed() < Duration::from_secs(2));
}

#[test]
fn test_cancel_stops_waiting_for_submissions() {
    let store = store_with_index("archive");
    let cancel = Arc::new(AtomicBool::new(false));
    let mut config = small_batches(10);
    config.cancel = Some(Arc::clone(&cancel));
    let indexer = BatchIndexer::start(store.clone(), config, None);
    indexer.submit(record(1)).unwrap();
    cancel.store(true, Ordering::Relaxed);
    assert!(matches!(indexer.close(100), Err(IngestError::Cancelled)));
    // what was already handed over is still written
    assert_eq!(store.count("archive").unwrap(), 1);
}

#[test]
fn test_progress_reports_indexed_against_expected() {
    let store = store_with_index("archive");
    let last = Arc::new(AtomicUsize::new(0));
    let expected_seen = Arc::new(AtomicUsize::new(0));
    let (l, e) = (Arc::clone(&last), Arc::clone(&expected_seen));
    let progress: ProgressFn = Box::new(move |indexed: usize, expected: usize| {
        l.store(indexed, Ordering::SeqCst);
        e.store(expected, Ordering::SeqCst);
    });
    let indexer = BatchIndexer::start(store, small_batches(4), Some(progress));
    for i in 0..10 {
        indexer.submit(record(i)).unwrap();
    }
    indexer.close(10).unwrap();
    assert_eq!(last.load(Ordering::SeqCst), 10);
    assert_eq!(expected_seen.load(Ordering::SeqCst), 10);
}

#[test]
fn test_state_moves_from_open_to_accumulating() {
    let store = Arc::new(ScriptedStore::new(false, Duration::ZERO));
    let indexer = BatchIndexer::start(store, small_batches(100), None);
    assert_eq!(indexer.state(), IndexerState::Open);
    indexer.submit(record(1)).unwrap();
    assert_eq!(indexer.state(), IndexerState::Accumulating);
    indexer.close(1).unwrap();
    assert_eq!(indexer.state(), IndexerState::Closed);
}

#[test]
fn test_submit_while_draining_is_refused() {
    let store = Arc::new(ScriptedStore::new(false, Duration::from_millis(500)));
    let indexer = BatchIndexer::start(store.clone(), small_batches(10), None);
    indexer.submit(record(1)).unwrap();
    thread::scope(|s| {
        let closing = s.spawn(|| indexer.close(1));
        // close has taken the last batch and is waiting on the slow store
        thread::sleep(Duration::from_millis(200));
        assert_eq!(indexer.state(), IndexerState::Draining);
        assert!(matches!(
            indexer.submit(record(2)),
            Err(IngestError::IndexerClosed)
        ));
        let report = closing.join().unwrap().unwrap();
        assert_eq!(report.submitted, 1);
        assert_eq!(report.indexed, 1);
    });
    assert_eq!(*store.batches.lock().unwrap(), vec![1]);
}
