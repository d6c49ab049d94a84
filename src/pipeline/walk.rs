//! Parallel directory walker: one rayon task per directory, forked recursively.
//!
//! Each unit lists its directory, then in parallel (a) emits the records of the files it found
//! and (b) forks one unit per subdirectory. Read failures are isolated to the failing entry and
//! its subtree: lenient walks skip and note them, strict walks count them so the orchestrator can
//! refuse the import once the whole tree has been visited.

use log::{error, warn};
use rayon::prelude::*;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use crate::FileRecord;
use crate::engine::dates::format_system_time;
use crate::engine::mime::{FOLDER_TYPE, MimeDetector, UNDETECTED_TYPE};
use crate::engine::size::format_size;
use crate::engine::tools::path_to_doc_string;
use crate::error::IngestError;

use super::context::RunContext;
use super::queue::RecordSender;

/// Counts for one subtree; merged up the recursion.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct WalkOutcome {
    /// Records pushed onto the queue.
    pub queued: usize,
    /// Strict-mode read failures.
    pub failed: usize,
    /// Lenient-mode skipped entries.
    pub skipped: usize,
}

impl WalkOutcome {
    pub fn merge(self, other: WalkOutcome) -> WalkOutcome {
        WalkOutcome {
            queued: self.queued + other.queued,
            failed: self.failed + other.failed,
            skipped: self.skipped + other.skipped,
        }
    }

    fn queued_one() -> Self {
        Self {
            queued: 1,
            ..Self::default()
        }
    }
}

pub struct DirectoryWalker {
    root: PathBuf,
    detector: Box<dyn MimeDetector>,
    strict: bool,
    tx: RecordSender,
    cancel: Arc<AtomicBool>,
    first_error: Arc<Mutex<Option<String>>>,
    skipped_paths: Arc<Mutex<Vec<(PathBuf, String)>>>,
}

impl DirectoryWalker {
    /// `root` must already be canonical (see [`crate::engine::tools::canonicalize_root`]).
    pub fn new(
        root: PathBuf,
        detector: Box<dyn MimeDetector>,
        tx: RecordSender,
        ctx: &RunContext,
    ) -> Self {
        Self {
            root,
            detector,
            strict: ctx.opts.strict,
            tx,
            cancel: Arc::clone(&ctx.cancel),
            first_error: Arc::clone(&ctx.first_error),
            skipped_paths: Arc::clone(&ctx.skipped_paths),
        }
    }

    /// Walk the whole tree on `pool`. The root itself is the volume and gets no record.
    /// Consumes the walker so the queue sender is released when the walk returns.
    pub fn walk(self, pool: &rayon::ThreadPool) -> WalkOutcome {
        let root = self.root.clone();
        pool.install(|| self.walk_dir(&root, None))
    }

    fn cancelled(&self) -> bool {
        self.cancel.load(Ordering::Relaxed)
    }

    /// List `dir`; if listing worked, emit `own` (the directory's record) and process children.
    fn walk_dir(&self, dir: &Path, own: Option<FileRecord>) -> WalkOutcome {
        if self.cancelled() {
            return WalkOutcome::default();
        }
        let listing = match fs::read_dir(dir) {
            Ok(l) => l,
            Err(e) => return self.read_failed(dir, &e),
        };

        let mut outcome = WalkOutcome::default();
        if let Some(rec) = own {
            match self.push(dir, rec) {
                Some(o) => outcome = outcome.merge(o),
                None => return outcome.merge(self.queue_closed(dir)),
            }
        }

        let mut files = Vec::new();
        let mut subdirs = Vec::new();
        for entry in listing {
            match entry {
                Ok(entry) => match entry.file_type() {
                    // file_type never follows links, so a link to a directory lands in `files`
                    Ok(ft) if ft.is_dir() => subdirs.push(entry.path()),
                    Ok(_) => files.push(entry.path()),
                    Err(e) => outcome = outcome.merge(self.read_failed(&entry.path(), &e)),
                },
                Err(e) => outcome = outcome.merge(self.read_failed(dir, &e)),
            }
        }

        let (from_files, from_dirs) = rayon::join(
            || self.emit_files(&files),
            || {
                subdirs
                    .par_iter()
                    .map(|d| self.enter_subdir(d))
                    .reduce(WalkOutcome::default, WalkOutcome::merge)
            },
        );
        outcome.merge(from_files).merge(from_dirs)
    }

    fn enter_subdir(&self, dir: &Path) -> WalkOutcome {
        match self.build_record(dir) {
            Ok(rec) => self.walk_dir(dir, Some(rec)),
            Err(e) => self.read_failed(dir, &e),
        }
    }

    fn emit_files(&self, files: &[PathBuf]) -> WalkOutcome {
        let mut outcome = WalkOutcome::default();
        for path in files {
            if self.cancelled() {
                break;
            }
            let one = match self.build_record(path) {
                Ok(rec) => match self.push(path, rec) {
                    Some(o) => o,
                    None => return outcome.merge(self.queue_closed(path)),
                },
                Err(e) => self.read_failed(path, &e),
            };
            outcome = outcome.merge(one);
        }
        outcome
    }

    /// Blocking push. `None` when the queue is closed or the run was cancelled.
    fn push(&self, path: &Path, rec: FileRecord) -> Option<WalkOutcome> {
        if self.cancelled() {
            return Some(WalkOutcome::default());
        }
        match self.tx.send(rec) {
            Ok(()) => Some(WalkOutcome::queued_one()),
            Err(_) => {
                log::debug!("queue closed before {} was pushed", path.display());
                None
            }
        }
    }

    fn queue_closed(&self, path: &Path) -> WalkOutcome {
        if self.cancelled() {
            return WalkOutcome::default();
        }
        let msg = format!("{}: record queue closed", path.display());
        error!("{}", msg);
        if let Ok(mut first) = self.first_error.lock() {
            first.get_or_insert(msg);
        }
        WalkOutcome {
            failed: 1,
            ..WalkOutcome::default()
        }
    }

    fn read_failed(&self, path: &Path, err: &std::io::Error) -> WalkOutcome {
        let reason = if err.kind() == std::io::ErrorKind::PermissionDenied {
            "Access denied".to_string()
        } else {
            err.to_string()
        };
        if self.strict {
            let msg = format!("Could not read '{}': {}", path.display(), reason);
            error!("{}", msg);
            if let Ok(mut first) = self.first_error.lock() {
                first.get_or_insert(msg);
            }
            WalkOutcome {
                failed: 1,
                ..WalkOutcome::default()
            }
        } else {
            warn!("Ignoring '{}': {}", path.display(), reason);
            if let Ok(mut skipped) = self.skipped_paths.lock() {
                skipped.push((path.to_path_buf(), reason));
            }
            WalkOutcome {
                skipped: 1,
                ..WalkOutcome::default()
            }
        }
    }

    /// Metadata for one entry, without following links.
    fn build_record(&self, path: &Path) -> std::io::Result<FileRecord> {
        let meta = fs::symlink_metadata(path)?;
        let mut rec = FileRecord::new(path_to_doc_string(path));
        rec.name = Some(
            path.file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_else(|| rec.path.clone()),
        );
        if meta.is_dir() {
            rec.resource_type = Some(FOLDER_TYPE.to_string());
            rec.set_size(format_size(0));
        } else {
            rec.resource_type = Some(
                self.detector
                    .detect(path)
                    .unwrap_or_else(|| UNDETECTED_TYPE.to_string()),
            );
            rec.set_size(format_size(meta.len()));
        }
        let modified = meta.modified().ok();
        let created = meta.created().ok().or(modified);
        rec.last_changed = modified.or(created).map(format_system_time);
        rec.created = created.map(format_system_time);
        Ok(rec)
    }
}

/// Dedicated pool for one crawl, sized by the thread cap (all cores when None).
pub fn build_walk_pool(num_threads: Option<usize>) -> Result<rayon::ThreadPool, IngestError> {
    let mut builder = rayon::ThreadPoolBuilder::new().thread_name(|i| format!("walk-{i}"));
    if let Some(n) = num_threads {
        builder = builder.num_threads(n.max(1));
    }
    builder
        .build()
        .map_err(|e| IngestError::Argument(format!("cannot start walker pool: {e}")))
}
