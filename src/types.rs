//! Public and internal types for the mediadex API and pipelines.

use serde::Serialize;
use std::collections::HashSet;
use std::path::PathBuf;

use crate::engine::size::parse_size;

/// One file or directory entry destined for the document index.
///
/// `path` is the document key. The byte count is always derived from the display string through
/// [`FileRecord::set_size`], so the two never disagree.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FileRecord {
    pub path: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resource_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub catalog: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub volume: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    size_display: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    size_bytes: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_changed: Option<String>,
    /// Target index. Assigned by the batch indexer, never by a producer.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub index: Option<String>,
}

impl FileRecord {
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            ..Self::default()
        }
    }

    /// Set the display size and derive the byte count from it. Returns the parsed byte count,
    /// `None` when the display string carries no parseable count.
    pub fn set_size(&mut self, display: impl Into<String>) -> Option<u64> {
        let display = display.into();
        self.size_bytes = parse_size(&display);
        self.size_display = Some(display);
        self.size_bytes
    }

    pub fn size_display(&self) -> Option<&str> {
        self.size_display.as_deref()
    }

    pub fn size_bytes(&self) -> Option<u64> {
        self.size_bytes
    }

    /// Fill `volume` and `catalog` when the producer left them unset.
    pub fn tag_origin(&mut self, volume: Option<&str>, catalog: Option<&str>) {
        if self.volume.is_none() {
            self.volume = volume.map(str::to_string);
        }
        if self.catalog.is_none() {
            self.catalog = catalog.map(str::to_string);
        }
    }
}

/// How the walker classifies files. Directories are always `folder`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, clap::ValueEnum, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MimeStrategy {
    /// No detection; files are typed `n/a`.
    #[default]
    None,
    /// Guess from the file extension.
    Extension,
    /// Inspect the leading bytes, fall back to the extension.
    Content,
}

/// Which header columns a catalog must provide.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum FieldSet {
    #[default]
    Full,
    Minimal,
}

/// Input selection for a run.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum IngestMode {
    #[default]
    Crawl,
    Catalog,
}

/// Full options for a run (CLI, config file, or lib callers).
#[derive(Clone, Debug)]
pub struct Opts {
    /// Backend database path. When None, uses the package default in the working directory.
    pub db_path: Option<PathBuf>,
    /// Target index name.
    pub index_name: String,
    /// Delete and recreate the index before writing.
    pub replace_index: bool,
    pub mode: IngestMode,
    /// Crawl: abort indexing when any subtree failed. Catalog: reject malformed lines.
    pub strict: bool,
    /// Catalog: repair dates instead of rejecting rows.
    pub auto_correct: bool,
    pub mime: MimeStrategy,
    /// Worker thread cap for the crawler. When None, uses all available threads.
    pub num_threads: Option<usize>,
    /// Catalog fields whose empty values are tolerated (`name`, `size`, `created`, ...).
    pub ignore_fields: HashSet<String>,
    pub field_set: FieldSet,
    pub verbose: bool,
    /// Answer every operator question with yes (batch mode).
    pub assume_yes: bool,
    /// Record queue capacity; 0 means unbounded.
    pub queue_capacity: usize,
    pub batch_actions: usize,
    pub batch_bytes: usize,
    pub flush_timeout_secs: u64,
}

impl Default for Opts {
    fn default() -> Self {
        use crate::utils::config::{BatchConsts, DEFAULT_INDEX_NAME, QueueConsts};
        Self {
            db_path: None,
            index_name: DEFAULT_INDEX_NAME.to_string(),
            replace_index: false,
            mode: IngestMode::Crawl,
            strict: false,
            auto_correct: false,
            mime: MimeStrategy::None,
            num_threads: None,
            ignore_fields: HashSet::new(),
            field_set: FieldSet::Full,
            verbose: false,
            assume_yes: false,
            queue_capacity: QueueConsts::DEFAULT_CAPACITY,
            batch_actions: BatchConsts::ACTIONS,
            batch_bytes: BatchConsts::BYTES,
            flush_timeout_secs: BatchConsts::FLUSH_TIMEOUT_SECS,
        }
    }
}

/// Totals reported at the end of a run.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RunSummary {
    /// Records produced by the walker or accepted from catalogs.
    pub read: usize,
    /// Records handed to the batch indexer.
    pub submitted: usize,
    /// Documents acknowledged by the backend.
    pub indexed: usize,
    /// Catalog files rejected as a whole.
    pub rejected_files: usize,
}
