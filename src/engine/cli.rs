//! CLI command handler: merge settings, open the backend, run, map failures to exit codes.

use anyhow::{Context, Result};
use log::{debug, error, info, warn};
use std::process::ExitCode;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use crate::catalog::decider_for;
use crate::engine::arg_parser::Cli;
use crate::engine::progress::{create_counter, finish_bar, indexer_progress};
use crate::engine::store::{DocumentStore, SqliteStore};
use crate::error::IngestError;
use crate::pipeline::{RunContext, run};
use crate::utils::config::PackagePaths;
use crate::utils::settings_toml::{SettingsToml, apply_file_to_opts, load_settings_toml};
use crate::utils::setup_logging;
use crate::{FieldSet, IngestMode, Opts, RunSummary};

/// Overwrite opts field from a CLI flag when given.
macro_rules! apply_cli_opt {
    ($cli:expr, $opts:expr, $cli_field:ident => $opts_field:ident) => {
        if let Some(v) = $cli.$cli_field.clone() {
            $opts.$opts_field = v;
        }
    };
}

/// Defaults, then the settings file, then flags.
fn build_opts(cli: &Cli, file: Option<&SettingsToml>) -> Opts {
    let mut opts = Opts::default();
    if let Some(file) = file {
        apply_file_to_opts(file, &mut opts);
    }
    if cli.db.is_some() {
        opts.db_path = cli.db.clone();
    }
    apply_cli_opt!(cli, opts, index => index_name);
    apply_cli_opt!(cli, opts, replace => replace_index);
    apply_cli_opt!(cli, opts, strict => strict);
    apply_cli_opt!(cli, opts, auto_correct => auto_correct);
    apply_cli_opt!(cli, opts, mime => mime);
    apply_cli_opt!(cli, opts, verbose => verbose);
    apply_cli_opt!(cli, opts, assume_yes => assume_yes);
    apply_cli_opt!(cli, opts, queue_capacity => queue_capacity);
    apply_cli_opt!(cli, opts, batch_actions => batch_actions);
    apply_cli_opt!(cli, opts, flush_timeout => flush_timeout_secs);
    if cli.threads.is_some() {
        opts.num_threads = cli.threads;
    }
    if let Some(mb) = cli.batch_mb {
        opts.batch_bytes = mb.max(1) * 1024 * 1024;
    }
    if !cli.ignore.is_empty() {
        opts.ignore_fields = cli.ignore.iter().cloned().collect();
    }
    if cli.catalog == Some(true) {
        opts.mode = IngestMode::Catalog;
    }
    if cli.minimal == Some(true) {
        opts.field_set = FieldSet::Minimal;
    }
    opts
}

fn check_opts(opts: &Opts) -> Result<(), IngestError> {
    if opts.index_name.trim().is_empty() {
        return Err(IngestError::Argument("index name is empty".into()));
    }
    if opts.num_threads == Some(0) {
        return Err(IngestError::Argument("--threads must be at least 1".into()));
    }
    if opts.strict && opts.auto_correct {
        warn!("--strict and --auto-correct both set; dates are repaired, over-long lines rejected");
    }
    Ok(())
}

fn execute(cli: &Cli, opts: Opts) -> Result<RunSummary> {
    check_opts(&opts)?;

    let cancel = Arc::new(AtomicBool::new(false));
    let cancel_handler = Arc::clone(&cancel);
    ctrlc::set_handler(move || {
        cancel_handler.store(true, Ordering::Relaxed);
    })
    .context("set Ctrl+C handler")?;

    let db_path = PackagePaths::get().resolve_db_path(opts.db_path.as_ref());
    debug!("Backend: {}", db_path.display());
    let store: Arc<dyn DocumentStore> = Arc::new(SqliteStore::open(&db_path)?);

    let bar = create_counter("Indexing");
    let mut decider = decider_for(opts.assume_yes);
    let mut ctx = RunContext::new(opts, cancel);
    let result = run(
        &cli.paths,
        &mut ctx,
        store,
        Some(indexer_progress(&bar)),
        decider.as_mut(),
    );
    finish_bar(&bar);
    let summary = result?;
    if summary.rejected_files > 0 {
        warn!("{} catalog file(s) were not imported", summary.rejected_files);
    }
    Ok(summary)
}

/// Run the CLI and return the process exit code.
pub fn handle_run(cli: &Cli) -> ExitCode {
    let _ = dotenvy::dotenv();
    let loaded = std::env::current_dir()
        .context("working directory")
        .and_then(|cwd| load_settings_toml(&cwd));
    let (file, file_err) = match loaded {
        Ok(file) => (file, None),
        Err(e) => (None, Some(e)),
    };
    let opts = build_opts(cli, file.as_ref());
    setup_logging(opts.verbose);
    if let Some(e) = file_err {
        warn!("Ignoring settings file: {:#}", e);
    }

    match execute(cli, opts) {
        Ok(summary) => {
            info!(
                "Done: {} read, {} indexed, {} file(s) rejected",
                summary.read, summary.indexed, summary.rejected_files
            );
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!("{:#}", e);
            let code = e
                .downcast_ref::<IngestError>()
                .map(IngestError::exit_code)
                .unwrap_or(1);
            ExitCode::from(code)
        }
    }
}
