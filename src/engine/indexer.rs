//! Batch indexer: accumulates serialized records and writes them to the backend in bulk.
//!
//! `submit` only serializes and appends to the current batch. A batch that reaches the action
//! count or byte size is handed to a small pool of flush workers over a channel, so backend
//! latency never reaches the producer. `close` is the drain protocol: wait for the expected
//! number of submissions, flush the remainder, then wait (bounded) for every in-flight batch.

use crossbeam_channel::{Receiver, Sender, unbounded};
use log::{debug, error, info};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use crate::FileRecord;
use crate::Opts;
use crate::engine::store::{DocPair, DocumentStore};
use crate::error::IngestError;
use crate::utils::config::BatchConsts;

/// Called after each completed batch with (indexed so far, expected total or 0 if unknown).
pub type ProgressFn = Box<dyn Fn(usize, usize) + Send + Sync>;

#[derive(Clone, Debug)]
pub struct IndexerConfig {
    pub index: String,
    pub max_actions: usize,
    pub max_bytes: usize,
    pub flush_workers: usize,
    pub flush_timeout: Duration,
    /// When set, `close` stops waiting for outstanding submissions once this is true.
    pub cancel: Option<Arc<AtomicBool>>,
}

impl IndexerConfig {
    pub fn new(index: impl Into<String>) -> Self {
        Self {
            index: index.into(),
            max_actions: BatchConsts::ACTIONS,
            max_bytes: BatchConsts::BYTES,
            flush_workers: BatchConsts::FLUSH_WORKERS,
            flush_timeout: Duration::from_secs(BatchConsts::FLUSH_TIMEOUT_SECS),
            cancel: None,
        }
    }

    pub fn from_opts(opts: &Opts, cancel: Option<Arc<AtomicBool>>) -> Self {
        Self {
            index: opts.index_name.clone(),
            max_actions: opts.batch_actions.max(1),
            max_bytes: opts.batch_bytes.max(1),
            flush_workers: BatchConsts::FLUSH_WORKERS,
            flush_timeout: Duration::from_secs(opts.flush_timeout_secs),
            cancel,
        }
    }
}

/// Lifecycle as observed from outside. `Closed` is terminal.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum IndexerState {
    Open,
    Accumulating,
    Flushing,
    Draining,
    Closed,
}

/// Counters at a point in time.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct IndexReport {
    pub submitted: usize,
    pub indexed: usize,
    pub failed_batches: usize,
    pub failed_docs: usize,
}

/// Pending documents keyed by path; re-adding a key replaces its body in place.
#[derive(Default)]
struct Batch {
    docs: Vec<DocPair>,
    slots: HashMap<String, usize>,
    bytes: usize,
}

impl Batch {
    /// Returns true when `key` was already pending and its body was replaced.
    fn add(&mut self, key: String, body: Vec<u8>) -> bool {
        if let Some(&i) = self.slots.get(&key) {
            self.bytes = self.bytes - self.docs[i].1.len() + body.len();
            self.docs[i].1 = body;
            true
        } else {
            self.bytes += body.len();
            self.slots.insert(key.clone(), self.docs.len());
            self.docs.push((key, body));
            false
        }
    }

    fn len(&self) -> usize {
        self.docs.len()
    }

    fn is_empty(&self) -> bool {
        self.docs.is_empty()
    }
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Phase {
    Open,
    Draining,
    /// Final batch taken; submissions are refused while in-flight batches finish.
    Sealed,
    Closed,
}

struct BatchState {
    phase: Phase,
    batch: Batch,
}

struct FlushJob {
    id: u64,
    docs: Vec<DocPair>,
}

/// State shared with the flush workers.
struct Shared {
    store: Arc<dyn DocumentStore>,
    index: String,
    open_requests: AtomicUsize,
    /// Documents handed to the store so far, across all batches.
    taken_docs: AtomicUsize,
    indexed: AtomicUsize,
    failed_batches: AtomicUsize,
    failed_docs: AtomicUsize,
    expected: AtomicUsize,
    progress: Option<ProgressFn>,
}

impl Shared {
    fn execute(&self, job: FlushJob) {
        let n = job.docs.len();
        match self.store.bulk_write(&self.index, &job.docs) {
            Ok(()) => {
                let indexed = self.indexed.fetch_add(n, Ordering::AcqRel) + n;
                debug!("batch {}: {} documents written", job.id, n);
                if let Some(ref cb) = self.progress {
                    cb(indexed, self.expected.load(Ordering::Acquire));
                }
            }
            Err(e) => {
                self.failed_batches.fetch_add(1, Ordering::AcqRel);
                self.failed_docs.fetch_add(n, Ordering::AcqRel);
                error!("batch {} ({} documents) failed: {}", job.id, n, e);
            }
        }
        self.open_requests.fetch_sub(1, Ordering::AcqRel);
    }
}

fn flush_worker_loop(job_rx: Receiver<FlushJob>, shared: Arc<Shared>) {
    while let Ok(job) = job_rx.recv() {
        shared.execute(job);
    }
}

pub struct BatchIndexer {
    shared: Arc<Shared>,
    state: Mutex<BatchState>,
    submitted: AtomicUsize,
    /// Submissions folded into a pending document with the same path.
    merged: AtomicUsize,
    next_batch_id: AtomicU64,
    job_tx: Mutex<Option<Sender<FlushJob>>>,
    workers: Mutex<Vec<JoinHandle<()>>>,
    config: IndexerConfig,
}

impl BatchIndexer {
    /// Create the indexer and start its flush workers.
    pub fn start(
        store: Arc<dyn DocumentStore>,
        config: IndexerConfig,
        progress: Option<ProgressFn>,
    ) -> Self {
        let shared = Arc::new(Shared {
            store,
            index: config.index.clone(),
            open_requests: AtomicUsize::new(0),
            taken_docs: AtomicUsize::new(0),
            indexed: AtomicUsize::new(0),
            failed_batches: AtomicUsize::new(0),
            failed_docs: AtomicUsize::new(0),
            expected: AtomicUsize::new(0),
            progress,
        });
        let (job_tx, job_rx) = unbounded::<FlushJob>();
        let workers = (0..config.flush_workers.max(1))
            .map(|_| {
                let job_rx = job_rx.clone();
                let shared = Arc::clone(&shared);
                thread::spawn(move || flush_worker_loop(job_rx, shared))
            })
            .collect();
        Self {
            shared,
            state: Mutex::new(BatchState {
                phase: Phase::Open,
                batch: Batch::default(),
            }),
            submitted: AtomicUsize::new(0),
            merged: AtomicUsize::new(0),
            next_batch_id: AtomicU64::new(1),
            job_tx: Mutex::new(Some(job_tx)),
            workers: Mutex::new(workers),
            config,
        }
    }

    fn lock_state(&self) -> MutexGuard<'_, BatchState> {
        // batch updates are single statements, so a poisoned lock still guards a whole batch
        self.state.lock().unwrap_or_else(|p| p.into_inner())
    }

    /// Serialize `record` and add it to the current batch under its path.
    pub fn submit(&self, mut record: FileRecord) -> Result<(), IngestError> {
        if record.path.is_empty() {
            return Err(IngestError::EmptyPath);
        }
        record.index = Some(self.config.index.clone());
        let body = serde_json::to_vec(&record)?;

        let mut st = self.lock_state();
        if matches!(st.phase, Phase::Sealed | Phase::Closed) {
            return Err(IngestError::IndexerClosed);
        }
        if st.batch.add(record.path, body) {
            self.merged.fetch_add(1, Ordering::AcqRel);
        }
        self.submitted.fetch_add(1, Ordering::AcqRel);
        if st.batch.len() >= self.config.max_actions || st.batch.bytes >= self.config.max_bytes {
            let full = Self::take_batch(&mut st, &self.shared);
            drop(st);
            self.dispatch(full);
        }
        Ok(())
    }

    /// Take the current batch and count it as in flight. Must run under the state lock so
    /// `close` never sees a taken batch that is not yet counted.
    fn take_batch(st: &mut BatchState, shared: &Shared) -> Option<Batch> {
        if st.batch.is_empty() {
            return None;
        }
        shared.open_requests.fetch_add(1, Ordering::AcqRel);
        shared.taken_docs.fetch_add(st.batch.len(), Ordering::AcqRel);
        Some(std::mem::take(&mut st.batch))
    }

    fn dispatch(&self, batch: Option<Batch>) {
        let Some(batch) = batch else {
            return;
        };
        let job = FlushJob {
            id: self.next_batch_id.fetch_add(1, Ordering::Relaxed),
            docs: batch.docs,
        };
        let tx = self
            .job_tx
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .clone();
        match tx {
            Some(tx) => {
                if let Err(e) = tx.send(job) {
                    self.shared.execute(e.into_inner());
                }
            }
            // closing: no workers left to hand it to
            None => self.shared.execute(job),
        }
    }

    pub fn submitted(&self) -> usize {
        self.submitted.load(Ordering::Acquire)
    }

    pub fn report(&self) -> IndexReport {
        IndexReport {
            submitted: self.submitted(),
            indexed: self.shared.indexed.load(Ordering::Acquire),
            failed_batches: self.shared.failed_batches.load(Ordering::Acquire),
            failed_docs: self.shared.failed_docs.load(Ordering::Acquire),
        }
    }

    pub fn state(&self) -> IndexerState {
        let st = self.lock_state();
        match st.phase {
            Phase::Closed => IndexerState::Closed,
            Phase::Draining | Phase::Sealed => IndexerState::Draining,
            Phase::Open if self.shared.open_requests.load(Ordering::Acquire) > 0 => {
                IndexerState::Flushing
            }
            Phase::Open if !st.batch.is_empty() => IndexerState::Accumulating,
            Phase::Open => IndexerState::Open,
        }
    }

    fn cancelled(&self) -> bool {
        self.config
            .cancel
            .as_ref()
            .is_some_and(|c| c.load(Ordering::Relaxed))
    }

    /// Drain and close. Blocks until `expected_total` records were submitted (or the run was
    /// cancelled), flushes the remainder, and waits up to the flush timeout for every in-flight
    /// batch. Failed batches are reported here, in aggregate. From the final flush on, `submit`
    /// returns [`IngestError::IndexerClosed`].
    pub fn close(&self, expected_total: usize) -> Result<IndexReport, IngestError> {
        {
            let mut st = self.lock_state();
            if st.phase != Phase::Open {
                return Err(IngestError::IndexerClosed);
            }
            st.phase = Phase::Draining;
        }
        self.shared
            .expected
            .store(expected_total, Ordering::Release);

        while self.submitted() < expected_total {
            if self.cancelled() {
                info!(
                    "Cancelled with {}/{} records submitted; flushing what arrived",
                    self.submitted(),
                    expected_total
                );
                break;
            }
            thread::sleep(BatchConsts::CLOSE_POLL);
        }

        let rest = {
            let mut st = self.lock_state();
            st.phase = Phase::Sealed;
            Self::take_batch(&mut st, &self.shared)
        };
        self.dispatch(rest);
        // no sender left: workers exit once the queued jobs are done
        self.job_tx.lock().unwrap_or_else(|p| p.into_inner()).take();

        let deadline = Instant::now() + self.config.flush_timeout;
        loop {
            let open = self.shared.open_requests.load(Ordering::Acquire);
            if open == 0 {
                break;
            }
            let now = Instant::now();
            if now >= deadline {
                self.lock_state().phase = Phase::Closed;
                return Err(IngestError::FlushTimeout {
                    secs: self.config.flush_timeout.as_secs(),
                    open_requests: open,
                });
            }
            thread::sleep(BatchConsts::CLOSE_POLL.min(deadline - now));
        }
        let workers = std::mem::take(&mut *self.workers.lock().unwrap_or_else(|p| p.into_inner()));
        for h in workers {
            let _ = h.join();
        }
        self.lock_state().phase = Phase::Closed;

        let report = self.report();
        debug!(
            "indexer closed: {} submitted, {} indexed, {} failed batches",
            report.submitted, report.indexed, report.failed_batches
        );
        let accounted =
            self.shared.taken_docs.load(Ordering::Acquire) + self.merged.load(Ordering::Acquire);
        if report.submitted > accounted {
            return Err(IngestError::Unflushed {
                submitted: report.submitted,
                accounted,
            });
        }
        if report.failed_batches > 0 {
            return Err(IngestError::BatchFailures {
                failed_batches: report.failed_batches,
                failed_docs: report.failed_docs,
            });
        }
        if self.cancelled() {
            return Err(IngestError::Cancelled);
        }
        Ok(report)
    }
}
