//! mediadex: ingest file metadata from directory crawls or catalog exports into a document index.

pub mod catalog;
pub mod engine;
pub mod error;
pub mod pipeline;
pub mod types;
pub mod utils;

/// Re-export types for API
pub use error::IngestError;
pub use types::*;

use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::AtomicBool;

use crate::catalog::Decider;
use crate::engine::store::DocumentStore;
use crate::pipeline::RunContext;

/// Ingest `inputs` into `store` with `opts`, answering operator questions with `decider`.
///
/// `opts.mode` selects crawling (inputs are directories) or catalog import (inputs are catalog
/// files or directories holding them). Pass `cancel` to stop the run from another thread.
pub fn ingest(
    inputs: &[PathBuf],
    opts: &Opts,
    store: Arc<dyn DocumentStore>,
    decider: &mut dyn Decider,
    cancel: Option<Arc<AtomicBool>>,
) -> Result<RunSummary, IngestError> {
    let cancel = cancel.unwrap_or_default();
    let mut ctx = RunContext::new(opts.clone(), cancel);
    pipeline::run(inputs, &mut ctx, store, None, decider)
}
