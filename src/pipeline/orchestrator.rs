//! Wires a run together: prepare the index, run crawl or catalog imports, drain the indexer.

use log::{debug, error, info};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::Ordering;
use std::thread;

use crate::catalog::{CatalogReader, CatalogStats, Decider};
use crate::engine::indexer::{BatchIndexer, IndexerConfig, ProgressFn};
use crate::engine::mime::{MimeDetector, detector_for};
use crate::engine::store::{DocumentStore, prepare_index};
use crate::engine::tools::{
    canonicalize_root, expand_catalog_inputs, is_catalog_file, path_to_doc_string,
};
use crate::error::IngestError;
use crate::{IngestMode, RunSummary};

use super::collector::Collector;
use super::context::RunContext;
use super::error_handler::check_walk_outcome;
use super::queue::record_queue;
use super::walk::{DirectoryWalker, build_walk_pool};

/// Crawl one root into `indexer`. Returns (records read, records submitted).
///
/// The walker runs on its own pool while the collector drains the queue on a second thread.
/// The collector is told to finish only after the walker returned. Strict crawls hold every
/// record until the walk is known to be clean.
pub fn crawl_root(
    root: &Path,
    ctx: &RunContext,
    indexer: &BatchIndexer,
) -> Result<(usize, usize), IngestError> {
    crawl_root_with_detector(root, detector_for(ctx.opts.mime), ctx, indexer)
}

/// [`crawl_root`] with a caller-supplied resource-type detector.
pub fn crawl_root_with_detector(
    root: &Path,
    detector: Box<dyn MimeDetector>,
    ctx: &RunContext,
    indexer: &BatchIndexer,
) -> Result<(usize, usize), IngestError> {
    let root = canonicalize_root(root)?;
    info!("Crawling {}", root.display());
    let pool = build_walk_pool(ctx.opts.num_threads)?;
    let (tx, rx) = record_queue(ctx.opts.queue_capacity);

    let walker = DirectoryWalker::new(root.clone(), detector, tx, ctx);
    let collector = Collector::new(
        rx,
        indexer,
        path_to_doc_string(&root),
        ctx.hostname.clone(),
        Arc::clone(&ctx.cancel),
    )
    .hold(ctx.opts.strict);
    let finished = collector.finish_signal();

    let (walk_outcome, collected) = thread::scope(|s| {
        let collector_handle = s.spawn(move || collector.run());
        let outcome = walker.walk(&pool);
        finished.store(true, Ordering::Release);
        let collected = collector_handle
            .join()
            .unwrap_or_else(|_| Err(IngestError::Backend("collector thread panicked".into())));
        (outcome, collected)
    });
    let mut collected = collected?;
    debug!(
        "walk done: {} queued, {} failed, {} skipped",
        walk_outcome.queued, walk_outcome.failed, walk_outcome.skipped
    );

    // a strict failure drops everything the collector held
    check_walk_outcome(&root, &walk_outcome, ctx)?;

    if !collected.held.is_empty() {
        debug!("releasing {} held records", collected.held.len());
        for rec in collected.held.drain(..) {
            indexer.submit(rec)?;
            collected.submitted += 1;
        }
    }
    Ok((walk_outcome.queued, collected.submitted))
}

/// Import catalog files (directories expand to their catalog files). File-level failures are
/// logged and counted; run-fatal ones stop the import.
pub fn import_catalogs(
    inputs: &[PathBuf],
    ctx: &mut RunContext,
    indexer: &BatchIndexer,
    decider: &mut dyn Decider,
) -> Result<RunSummary, IngestError> {
    let reader = CatalogReader::new(&ctx.opts);
    let mut summary = RunSummary::default();
    let mut totals = CatalogStats::default();

    for file in expand_catalog_inputs(inputs)? {
        if ctx.is_cancelled() {
            return Err(IngestError::Cancelled);
        }
        if !is_catalog_file(&file) {
            info!("Skipping {} (no csv or txt)", file.display());
            continue;
        }
        match reader.read_file(&file, &mut ctx.seen_paths, decider) {
            Ok(outcome) => {
                totals.add(&outcome.stats);
                summary.read += outcome.records.len();
                for rec in outcome.records {
                    indexer.submit(rec)?;
                    summary.submitted += 1;
                }
            }
            Err(e) if !e.is_run_fatal() => {
                error!("{}", e);
                summary.rejected_files += 1;
            }
            Err(e) => return Err(e),
        }
    }
    info!(
        "Catalogs: {} rows, {} recovered, {} skipped, {} lost, {} file(s) rejected",
        totals.rows,
        totals.recovered_rows,
        totals.lines_skipped,
        totals.lost_lines,
        summary.rejected_files
    );
    Ok(summary)
}

/// Run one ingestion over `inputs` into `store`.
///
/// The indexer is drained even when the producer side failed, so batches that were already
/// accepted reach the backend; the producer error wins over a close error.
pub fn run(
    inputs: &[PathBuf],
    ctx: &mut RunContext,
    store: Arc<dyn DocumentStore>,
    progress: Option<ProgressFn>,
    decider: &mut dyn Decider,
) -> Result<RunSummary, IngestError> {
    if inputs.is_empty() {
        return Err(IngestError::Argument("no input paths given".into()));
    }
    let config_str = format!(
        "{} CONFIG:{:#?}",
        env!("CARGO_PKG_NAME").to_uppercase(),
        ctx.opts
    );
    debug!("{}", config_str);

    prepare_index(store.as_ref(), &ctx.opts.index_name, ctx.opts.replace_index)?;
    let config = IndexerConfig::from_opts(&ctx.opts, Some(Arc::clone(&ctx.cancel)));
    let indexer = BatchIndexer::start(store, config, progress);

    let produced = match ctx.opts.mode {
        IngestMode::Crawl => {
            let mut summary = RunSummary::default();
            let mut result = Ok(());
            for root in inputs {
                match crawl_root(root, ctx, &indexer) {
                    Ok((read, submitted)) => {
                        summary.read += read;
                        summary.submitted += submitted;
                    }
                    Err(e) => {
                        result = Err(e);
                        break;
                    }
                }
            }
            result.map(|()| summary)
        }
        IngestMode::Catalog => import_catalogs(inputs, ctx, &indexer, decider),
    };

    // a failed producer has no reliable total; drain what reached the indexer
    let expected = match &produced {
        Ok(summary) => summary.submitted,
        Err(_) => indexer.submitted(),
    };
    let closed = indexer.close(expected);
    let mut summary = produced?;
    let report = closed?;
    summary.indexed = report.indexed;
    info!(
        "{} read, {} submitted, {} indexed into '{}'",
        summary.read, summary.submitted, summary.indexed, ctx.opts.index_name
    );
    Ok(summary)
}
