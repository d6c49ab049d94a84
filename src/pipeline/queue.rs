//! Record queue between walker units (many producers) and the collector (one consumer).

use crossbeam_channel::{Receiver, Sender, bounded, unbounded};

use crate::FileRecord;

pub type RecordSender = Sender<FileRecord>;
pub type RecordReceiver = Receiver<FileRecord>;

/// Create the queue. `capacity == 0` means unbounded; otherwise pushes block when full.
pub fn record_queue(capacity: usize) -> (RecordSender, RecordReceiver) {
    if capacity == 0 {
        unbounded()
    } else {
        bounded(capacity)
    }
}
