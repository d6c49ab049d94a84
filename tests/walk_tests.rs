//! Crawl tests: walker completeness, record contents, crawl pipeline end to end.

use mediadex::catalog::AutoDecider;
use mediadex::engine::indexer::{BatchIndexer, IndexerConfig};
use mediadex::engine::mime::{MimeDetector, detector_for};
use mediadex::engine::store::{DocumentStore, SqliteStore};
use mediadex::engine::tools::{canonicalize_root, path_to_doc_string};
use mediadex::pipeline::{
    DirectoryWalker, RunContext, WalkOutcome, build_walk_pool, crawl_root_with_detector,
    record_queue,
};
use mediadex::{FileRecord, IngestError, IngestMode, MimeStrategy, Opts};
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::AtomicBool;

fn context(opts: Opts) -> RunContext {
    RunContext::new(opts, Arc::new(AtomicBool::new(false)))
}

/// Walk `root` with an unbounded queue; returns the records, the outcome and the run context.
fn walk_with(
    root: &Path,
    opts: Opts,
    detector: Box<dyn MimeDetector>,
) -> (Vec<FileRecord>, WalkOutcome, RunContext) {
    let ctx = context(opts);
    let root = canonicalize_root(root).unwrap();
    let (tx, rx) = record_queue(0);
    let pool = build_walk_pool(ctx.opts.num_threads).unwrap();
    let walker = DirectoryWalker::new(root, detector, tx, &ctx);
    let outcome = walker.walk(&pool);
    let records: Vec<FileRecord> = rx.try_iter().collect();
    assert_eq!(outcome.queued, records.len());
    (records, outcome, ctx)
}

fn walk_all(root: &Path, opts: Opts) -> Vec<FileRecord> {
    let detector = detector_for(opts.mime);
    walk_with(root, opts, detector).0
}

/// Deletes `victim` the first time a file is classified. With one walker thread the files of a
/// directory are handled before its subdirectories are entered, so `victim` vanishes mid-walk.
struct Vanishing {
    victim: PathBuf,
}

impl MimeDetector for Vanishing {
    fn detect(&self, _path: &Path) -> Option<String> {
        let _ = fs::remove_dir_all(&self.victim);
        Some("n/a".to_string())
    }
}

/// Root with `a.txt`, `kept/b.txt` and `gone/c.txt`; returns the canonical root.
fn build_vanishing_tree(root: &Path) -> PathBuf {
    fs::write(root.join("a.txt"), b"a").unwrap();
    fs::create_dir(root.join("kept")).unwrap();
    fs::write(root.join("kept/b.txt"), b"b").unwrap();
    fs::create_dir(root.join("gone")).unwrap();
    fs::write(root.join("gone/c.txt"), b"c").unwrap();
    canonicalize_root(root).unwrap()
}

fn one_thread(strict: bool) -> Opts {
    Opts {
        strict,
        num_threads: Some(1),
        ..Opts::default()
    }
}

fn names(records: &[FileRecord]) -> Vec<String> {
    let mut names: Vec<String> = records.iter().filter_map(|r| r.name.clone()).collect();
    names.sort();
    names
}

fn build_tree(root: &Path) {
    for d in 0..4 {
        let dir = root.join(format!("d{d}"));
        fs::create_dir(&dir).unwrap();
        for f in 0..5 {
            fs::write(dir.join(format!("f{f}.txt")), vec![b'x'; f * 700]).unwrap();
        }
        for s in 0..3 {
            let sub = dir.join(format!("s{s}"));
            fs::create_dir(&sub).unwrap();
            fs::write(sub.join("leaf.bin"), b"leaf").unwrap();
            fs::create_dir(sub.join("empty")).unwrap();
        }
    }
    fs::write(root.join("top.txt"), b"top").unwrap();
}

#[test]
fn test_empty_dir_and_zero_byte_file() {
    let dir = tempfile::tempdir().unwrap();
    fs::create_dir(dir.path().join("empty")).unwrap();
    fs::write(dir.path().join("zero.dat"), b"").unwrap();

    let mut records = walk_all(dir.path(), Opts::default());
    records.sort_by(|a, b| a.path.cmp(&b.path));
    assert_eq!(records.len(), 2);
    for rec in &records {
        assert_eq!(rec.size_display(), Some("0 B (0 Bytes)"));
        assert_eq!(rec.size_bytes(), Some(0));
        assert!(rec.created.is_some());
        assert!(rec.last_changed.is_some());
    }
    assert_eq!(records[0].name.as_deref(), Some("empty"));
    assert_eq!(records[0].resource_type.as_deref(), Some("folder"));
    assert_eq!(records[1].name.as_deref(), Some("zero.dat"));
    assert_eq!(records[1].resource_type.as_deref(), Some("n/a"));
}

#[test]
fn test_walker_emits_every_entry_once() {
    let dir = tempfile::tempdir().unwrap();
    build_tree(dir.path());
    let root = canonicalize_root(dir.path()).unwrap();

    let expected: HashSet<String> = walkdir::WalkDir::new(&root)
        .min_depth(1)
        .into_iter()
        .map(|e| path_to_doc_string(e.unwrap().path()))
        .collect();

    for threads in [1, 4] {
        let opts = Opts {
            num_threads: Some(threads),
            ..Opts::default()
        };
        let records = walk_all(&root, opts);
        let paths: HashSet<String> = records.iter().map(|r| r.path.clone()).collect();
        assert_eq!(paths.len(), records.len(), "duplicates with {threads} threads");
        assert_eq!(paths, expected, "{threads} threads");
    }
}

#[test]
fn test_file_record_contents() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("doc.pdf"), vec![0_u8; 2048]).unwrap();
    let opts = Opts {
        mime: MimeStrategy::Extension,
        ..Opts::default()
    };
    let records = walk_all(dir.path(), opts);
    assert_eq!(records.len(), 1);
    let rec = &records[0];
    assert_eq!(rec.size_display(), Some("2.00 KB (2,048 Bytes)"));
    assert_eq!(rec.resource_type.as_deref(), Some("application/pdf"));
    assert!(rec.volume.is_none() && rec.catalog.is_none());
    let modified = rec.last_changed.as_deref().unwrap();
    assert!(chrono::NaiveDateTime::parse_from_str(modified, "%m/%d/%Y %H:%M:%S").is_ok());
}

#[cfg(unix)]
#[test]
fn test_symlinks_are_not_followed() {
    let dir = tempfile::tempdir().unwrap();
    fs::create_dir(dir.path().join("real")).unwrap();
    fs::write(dir.path().join("real/a.txt"), b"a").unwrap();
    std::os::unix::fs::symlink(dir.path().join("real"), dir.path().join("link")).unwrap();

    let records = walk_all(dir.path(), Opts::default());
    assert_eq!(names(&records), vec!["a.txt", "link", "real"]);
}

#[test]
fn test_missing_root_is_io_error() {
    let dir = tempfile::tempdir().unwrap();
    let err = canonicalize_root(&dir.path().join("gone")).unwrap_err();
    assert!(matches!(err, IngestError::Io { .. }));
    assert_eq!(err.exit_code(), 4);
}

#[test]
fn test_crawl_through_bounded_queue_indexes_everything() {
    let dir = tempfile::tempdir().unwrap();
    build_tree(dir.path());
    let root = canonicalize_root(dir.path()).unwrap();
    let total = walkdir::WalkDir::new(&root).min_depth(1).into_iter().count();

    let store = Arc::new(SqliteStore::open_in_memory().unwrap());
    let opts = Opts {
        mode: IngestMode::Crawl,
        queue_capacity: 2,
        batch_actions: 7,
        num_threads: Some(3),
        ..Opts::default()
    };
    let summary = mediadex::ingest(
        &[root.clone()],
        &opts,
        store.clone(),
        &mut AutoDecider { accept: false },
        None,
    )
    .unwrap();
    assert_eq!(summary.read, total);
    assert_eq!(summary.submitted, total);
    assert_eq!(summary.indexed, total);
    assert_eq!(store.count(&opts.index_name).unwrap(), total);

    let key = path_to_doc_string(&root.join("top.txt"));
    let body = store.get(&opts.index_name, &key).unwrap().unwrap();
    let doc: serde_json::Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(doc["volume"], path_to_doc_string(&root));
    assert!(doc["catalog"].as_str().is_some_and(|c| !c.is_empty()));
    assert_eq!(doc["sizeBytes"], 3);
}

#[test]
fn test_strict_crawl_of_clean_tree_releases_held_records() {
    let dir = tempfile::tempdir().unwrap();
    build_tree(dir.path());
    let store = Arc::new(SqliteStore::open_in_memory().unwrap());
    let opts = Opts {
        strict: true,
        ..Opts::default()
    };
    let summary = mediadex::ingest(
        &[dir.path().to_path_buf()],
        &opts,
        store.clone(),
        &mut AutoDecider { accept: false },
        None,
    )
    .unwrap();
    assert!(summary.read > 0);
    assert_eq!(summary.indexed, summary.read);
    assert_eq!(store.count(&opts.index_name).unwrap(), summary.read);
}

#[test]
fn test_recrawl_overwrites_instead_of_duplicating() {
    let dir = tempfile::tempdir().unwrap();
    build_tree(dir.path());
    let store = Arc::new(SqliteStore::open_in_memory().unwrap());
    let opts = Opts::default();
    let roots = [dir.path().to_path_buf()];
    let mut decider = AutoDecider { accept: false };
    let first = mediadex::ingest(&roots, &opts, store.clone(), &mut decider, None).unwrap();
    mediadex::ingest(&roots, &opts, store.clone(), &mut decider, None).unwrap();
    assert_eq!(store.count(&opts.index_name).unwrap(), first.read);
}

#[test]
fn test_vanished_directory_is_skipped_when_lenient() {
    let dir = tempfile::tempdir().unwrap();
    let root = build_vanishing_tree(dir.path());
    let detector = Box::new(Vanishing {
        victim: root.join("gone"),
    });
    let (records, outcome, ctx) = walk_with(&root, one_thread(false), detector);

    assert_eq!(outcome.skipped, 1);
    assert_eq!(outcome.failed, 0);
    assert_eq!(names(&records), vec!["a.txt", "b.txt", "kept"]);
    let skipped = ctx.skipped_paths.lock().unwrap();
    assert_eq!(skipped.len(), 1);
    assert_eq!(skipped[0].0, root.join("gone"));
}

#[test]
fn test_vanished_directory_fails_strict_walk_but_siblings_finish() {
    let dir = tempfile::tempdir().unwrap();
    let root = build_vanishing_tree(dir.path());
    let detector = Box::new(Vanishing {
        victim: root.join("gone"),
    });
    let (records, outcome, ctx) = walk_with(&root, one_thread(true), detector);

    assert_eq!(outcome.failed, 1);
    assert_eq!(outcome.skipped, 0);
    assert_eq!(names(&records), vec!["a.txt", "b.txt", "kept"]);
    assert!(ctx.first_error.lock().unwrap().is_some());
    assert!(ctx.skipped_paths.lock().unwrap().is_empty());
}

#[test]
fn test_strict_crawl_failure_indexes_nothing() {
    let dir = tempfile::tempdir().unwrap();
    let root = build_vanishing_tree(dir.path());
    let store = Arc::new(SqliteStore::open_in_memory().unwrap());
    store.create_index("archive").unwrap();
    let indexer = BatchIndexer::start(store.clone(), IndexerConfig::new("archive"), None);
    let ctx = context(one_thread(true));
    let detector = Box::new(Vanishing {
        victim: root.join("gone"),
    });

    let err = crawl_root_with_detector(&root, detector, &ctx, &indexer).unwrap_err();
    match err {
        IngestError::WalkFailed { failures, .. } => assert_eq!(failures, 1),
        other => panic!("expected walk failure, got {other}"),
    }
    let report = indexer.close(indexer.submitted()).unwrap();
    assert_eq!(report.submitted, 0);
    assert_eq!(store.count("archive").unwrap(), 0);
}

#[test]
fn test_lenient_crawl_indexes_what_remains() {
    let dir = tempfile::tempdir().unwrap();
    let root = build_vanishing_tree(dir.path());
    let store = Arc::new(SqliteStore::open_in_memory().unwrap());
    store.create_index("archive").unwrap();
    let indexer = BatchIndexer::start(store.clone(), IndexerConfig::new("archive"), None);
    let ctx = context(one_thread(false));
    let detector = Box::new(Vanishing {
        victim: root.join("gone"),
    });

    let (read, submitted) = crawl_root_with_detector(&root, detector, &ctx, &indexer).unwrap();
    assert_eq!((read, submitted), (3, 3));
    indexer.close(submitted).unwrap();
    assert_eq!(store.count("archive").unwrap(), 3);
}

/// A directory nobody may list. None when permissions are not enforced (running as root).
#[cfg(unix)]
fn locked_subdir(root: &Path) -> Option<PathBuf> {
    use std::os::unix::fs::PermissionsExt;
    let locked = root.join("locked");
    fs::create_dir(&locked).unwrap();
    fs::write(locked.join("secret.txt"), b"s").unwrap();
    fs::set_permissions(&locked, fs::Permissions::from_mode(0o000)).unwrap();
    if fs::read_dir(&locked).is_ok() {
        unlock(&locked);
        return None;
    }
    Some(locked)
}

#[cfg(unix)]
fn unlock(path: &Path) {
    use std::os::unix::fs::PermissionsExt;
    fs::set_permissions(path, fs::Permissions::from_mode(0o755)).unwrap();
}

#[cfg(unix)]
#[test]
fn test_unreadable_subtree_is_skipped_when_lenient() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("top.txt"), b"t").unwrap();
    let Some(locked) = locked_subdir(dir.path()) else {
        return;
    };
    let detector = detector_for(MimeStrategy::None);
    let (records, outcome, ctx) = walk_with(dir.path(), Opts::default(), detector);
    unlock(&locked);

    assert_eq!(outcome.skipped, 1);
    assert_eq!(names(&records), vec!["top.txt"]);
    let skipped = ctx.skipped_paths.lock().unwrap();
    assert_eq!(skipped[0].1, "Access denied");
}

#[cfg(unix)]
#[test]
fn test_unreadable_subtree_fails_strict_ingest() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("top.txt"), b"t").unwrap();
    let Some(locked) = locked_subdir(dir.path()) else {
        return;
    };
    let store = Arc::new(SqliteStore::open_in_memory().unwrap());
    let opts = Opts {
        strict: true,
        ..Opts::default()
    };
    let result = mediadex::ingest(
        &[dir.path().to_path_buf()],
        &opts,
        store.clone(),
        &mut AutoDecider { accept: false },
        None,
    );
    unlock(&locked);

    assert!(matches!(result, Err(IngestError::WalkFailed { failures: 1, .. })));
    assert_eq!(store.count(&opts.index_name).unwrap(), 0);
}

#[test]
fn test_run_closes_indexer_with_producer_total() {
    use mediadex::engine::indexer::ProgressFn;
    use std::sync::Mutex;

    let dir = tempfile::tempdir().unwrap();
    build_tree(dir.path());
    let store = Arc::new(SqliteStore::open_in_memory().unwrap());
    let calls = Arc::new(Mutex::new(Vec::new()));
    let seen = Arc::clone(&calls);
    let progress: ProgressFn = Box::new(move |indexed: usize, expected: usize| {
        seen.lock().unwrap().push((indexed, expected));
    });
    let mut ctx = context(Opts::default());
    let summary = mediadex::pipeline::run(
        &[dir.path().to_path_buf()],
        &mut ctx,
        store,
        Some(progress),
        &mut AutoDecider { accept: false },
    )
    .unwrap();

    // one batch, flushed by close once it knows the producer's total
    let calls = calls.lock().unwrap();
    assert_eq!(*calls, vec![(summary.submitted, summary.submitted)]);
    assert_eq!(summary.indexed, summary.read);
}
