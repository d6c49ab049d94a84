//! Progress bar utilities for displaying indexing status

use kdam::{Animation, Bar, BarExt};
use std::sync::{Arc, Mutex};

use crate::engine::indexer::ProgressFn;

// Progress bar type alias
pub type ProgressBar = Arc<Mutex<Bar>>;

/// Counter-style bar: the expected total is unknown until the indexer is closed.
pub fn create_counter(desc: &'static str) -> ProgressBar {
    Arc::new(Mutex::new(kdam::tqdm!(
        total = 0,
        desc = desc,
        animation = Animation::Classic,
        position = 0,
        unit = " docs"
    )))
}

/// Move the bar to `indexed` and, once known, set its total.
/// Uses try_lock so a contended bar never holds up a flush worker; the next batch catches up.
pub fn set_bar_progress(pb: &ProgressBar, indexed: usize, expected: usize) {
    if let Ok(mut bar) = pb.try_lock() {
        if expected > 0 && bar.total != expected {
            bar.total = expected;
        }
        let _ = bar.update_to(indexed);
    }
}

/// Final refresh, then leave the line so log output starts clean.
pub fn finish_bar(pb: &ProgressBar) {
    if let Ok(mut bar) = pb.lock() {
        let _ = bar.refresh();
        eprintln!();
    }
}

/// Indexer callback that drives `bar`.
pub fn indexer_progress(bar: &ProgressBar) -> ProgressFn {
    let bar = Arc::clone(bar);
    Box::new(move |indexed, expected| set_bar_progress(&bar, indexed, expected))
}
