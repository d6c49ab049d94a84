//! Collector: the single consumer between the record queue and the batch indexer.

use log::debug;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;

use crate::FileRecord;
use crate::engine::indexer::BatchIndexer;
use crate::error::IngestError;
use crate::utils::config::QueueConsts;

use super::queue::RecordReceiver;

/// What the collector did by the time it stopped.
#[derive(Debug, Default)]
pub struct CollectorOutcome {
    pub submitted: usize,
    /// Records buffered in hold mode, not yet submitted.
    pub held: Vec<FileRecord>,
}

pub struct Collector<'a> {
    rx: RecordReceiver,
    indexer: &'a BatchIndexer,
    volume: String,
    catalog: String,
    hold: bool,
    finished: Arc<AtomicBool>,
    cancel: Arc<AtomicBool>,
}

impl<'a> Collector<'a> {
    pub fn new(
        rx: RecordReceiver,
        indexer: &'a BatchIndexer,
        volume: String,
        catalog: String,
        cancel: Arc<AtomicBool>,
    ) -> Self {
        Self {
            rx,
            indexer,
            volume,
            catalog,
            hold: false,
            finished: Arc::new(AtomicBool::new(false)),
            cancel,
        }
    }

    /// Buffer records instead of submitting them; the caller decides after the walk.
    pub fn hold(mut self, hold: bool) -> Self {
        self.hold = hold;
        self
    }

    /// Flag to raise once the producer side has returned. Raising it earlier loses records.
    pub fn finish_signal(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.finished)
    }

    /// Drain until finished and empty. Dropping the receiver on return (including on error)
    /// closes the queue, so blocked producers wake up instead of hanging.
    pub fn run(self) -> Result<CollectorOutcome, IngestError> {
        let mut out = CollectorOutcome::default();
        loop {
            // read the flag before draining: a record pushed before the flag was raised is
            // guaranteed to be seen by this drain
            let done = self.finished.load(Ordering::Acquire);
            let mut drained = 0_usize;
            for mut rec in self.rx.try_iter() {
                drained += 1;
                rec.tag_origin(Some(&self.volume), Some(&self.catalog));
                if self.hold {
                    out.held.push(rec);
                } else {
                    self.indexer.submit(rec)?;
                    out.submitted += 1;
                }
            }
            if self.cancel.load(Ordering::Relaxed) {
                debug!("collector: cancelled after {} records", out.submitted);
                break;
            }
            if done {
                break;
            }
            if drained == 0 {
                thread::sleep(QueueConsts::COLLECTOR_IDLE_WAIT);
            }
        }
        debug!(
            "collector: {} submitted, {} held",
            out.submitted,
            out.held.len()
        );
        Ok(out)
    }
}
