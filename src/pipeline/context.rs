//! Per-run context: everything that would otherwise be process-wide state.

use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use crate::Opts;
use crate::engine::tools::local_hostname;

/// Owned by the orchestrator for one run and lent to each component.
pub struct RunContext {
    pub opts: Opts,
    /// Set by the interrupt handler; walker, collector and indexer poll it.
    pub cancel: Arc<AtomicBool>,
    /// Recorded as `catalog` on crawled entries.
    pub hostname: String,
    /// Paths accepted so far in this run (catalog imports). Single-threaded.
    pub seen_paths: HashSet<String>,
    /// First strict-mode walk failure, for the summary.
    pub first_error: Arc<Mutex<Option<String>>>,
    /// Entries skipped in lenient crawls: (path, reason).
    pub skipped_paths: Arc<Mutex<Vec<(PathBuf, String)>>>,
}

impl RunContext {
    pub fn new(opts: Opts, cancel: Arc<AtomicBool>) -> Self {
        Self {
            opts,
            cancel,
            hostname: local_hostname(),
            seen_paths: HashSet::new(),
            first_error: Arc::new(Mutex::new(None)),
            skipped_paths: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.load(Ordering::Relaxed)
    }
}
