use clap::Parser;
use std::path::PathBuf;

use crate::MimeStrategy;

/// Index file metadata from a live directory tree or from catalog exports.
#[derive(Clone, Debug, Parser)]
#[command(name = "mediadex", version)]
#[command(
    about = "Crawl directories (default) or import tab-separated catalog exports (--catalog) into a document index."
)]
pub struct Cli {
    /// Directories to crawl, or catalog files / directories of catalog files with --catalog.
    #[arg(value_name = "PATHS", required = true, num_args = 1..)]
    pub paths: Vec<PathBuf>,

    /// Read catalog exports instead of crawling.
    #[arg(long, short = 'c', num_args = 0..=1, default_missing_value = "true", value_parser = clap::value_parser!(bool))]
    pub catalog: Option<bool>,

    /// Crawl: import nothing if any entry was unreadable. Catalog: never accept over-long lines.
    #[arg(long, num_args = 0..=1, default_missing_value = "true", value_parser = clap::value_parser!(bool))]
    pub strict: Option<bool>,

    /// Catalog: repair unparseable dates from the other date column, skip broken fragments.
    #[arg(long, short = 'a', num_args = 0..=1, default_missing_value = "true", value_parser = clap::value_parser!(bool))]
    pub auto_correct: Option<bool>,

    /// How crawled files get their type.
    #[arg(long, short = 'm', value_enum)]
    pub mime: Option<MimeStrategy>,

    /// Worker threads for the crawler. Default: all cores.
    #[arg(long, short = 't')]
    pub threads: Option<usize>,

    /// Fields whose empty values are tolerated: name size created lastChanged resourceType catalog volume
    #[arg(long, short = 'i', num_args = 1..)]
    pub ignore: Vec<String>,

    /// Catalog: require only path and volume columns.
    #[arg(long, num_args = 0..=1, default_missing_value = "true", value_parser = clap::value_parser!(bool))]
    pub minimal: Option<bool>,

    /// Verbose output.
    #[arg(long, short = 'v', num_args = 0..=1, default_missing_value = "true", value_parser = clap::value_parser!(bool))]
    pub verbose: Option<bool>,

    /// Backend database. Default: $MEDIADEX_DB, else mediadex.db in the working directory.
    #[arg(long, short)]
    pub db: Option<PathBuf>,

    /// Target index name.
    #[arg(long)]
    pub index: Option<String>,

    /// Delete and recreate the index before writing.
    #[arg(long, num_args = 0..=1, default_missing_value = "true", value_parser = clap::value_parser!(bool))]
    pub replace: Option<bool>,

    /// Answer yes to every question (over-long lines, duplicate paths).
    #[arg(long, short = 'y', num_args = 0..=1, default_missing_value = "true", value_parser = clap::value_parser!(bool))]
    pub assume_yes: Option<bool>,

    /// Record queue capacity between crawler and indexer; 0 = unbounded.
    #[arg(long)]
    pub queue_capacity: Option<usize>,

    /// Documents per batch.
    #[arg(long)]
    pub batch_actions: Option<usize>,

    /// Batch size limit in MiB.
    #[arg(long)]
    pub batch_mb: Option<usize>,

    /// Seconds to wait for in-flight batches at shutdown.
    #[arg(long)]
    pub flush_timeout: Option<u64>,
}
