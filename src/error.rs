//! Typed failures surfaced by the crawl, catalog, and indexing core.
//!
//! Per-entry and per-line problems are recovered where they happen (counted and logged); what
//! reaches this type is file-level or run-level. The CLI maps each variant to a process exit
//! code through [`IngestError::exit_code`].

use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum IngestError {
    #[error("invalid argument: {0}")]
    Argument(String),

    #[error("document backend unavailable: {0}")]
    Backend(String),

    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("{file}: header has no column for required field(s): {}", fields.join(", "))]
    MissingColumns { file: PathBuf, fields: Vec<&'static str> },

    #[error("{file}:{line}: row has no path; cannot index an entry without its key")]
    MissingPath { file: PathBuf, line: usize },

    #[error("{file}:{line}: duplicate path '{path}'")]
    DuplicatePath {
        file: PathBuf,
        line: usize,
        path: String,
    },

    #[error("{file}:{line}: neither date column could be parsed")]
    UnparseableDates { file: PathBuf, line: usize },

    #[error(
        "{file}: {potentially_invalid} potentially invalid field(s), {invalid_lines} invalid line(s); no data imported"
    )]
    CatalogRejected {
        file: PathBuf,
        potentially_invalid: usize,
        invalid_lines: usize,
    },

    #[error("{root}: {failures} entries could not be read; no data imported")]
    WalkFailed { root: PathBuf, failures: usize },

    #[error("{failed_batches} batch(es) failed, {failed_docs} document(s) not indexed")]
    BatchFailures {
        failed_batches: usize,
        failed_docs: usize,
    },

    #[error("backend did not acknowledge {open_requests} batch(es) within {secs}s")]
    FlushTimeout { secs: u64, open_requests: usize },

    #[error("{submitted} record(s) submitted but only {accounted} reached a batch")]
    Unflushed { submitted: usize, accounted: usize },

    #[error("batch indexer is closed")]
    IndexerClosed,

    #[error("record has no path")]
    EmptyPath,

    #[error("cancelled by user")]
    Cancelled,

    #[error("could not serialize record: {0}")]
    Serialize(#[from] serde_json::Error),
}

impl IngestError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Process exit code for this failure.
    pub fn exit_code(&self) -> u8 {
        match self {
            Self::Argument(_) => 2,
            Self::Backend(_) => 3,
            Self::Io { .. } => 4,
            Self::UnparseableDates { .. } => 5,
            _ => 1,
        }
    }

    /// True when the whole run must stop; false when only the current file is lost.
    pub fn is_run_fatal(&self) -> bool {
        !matches!(
            self,
            Self::MissingColumns { .. } | Self::CatalogRejected { .. } | Self::Io { .. }
        )
    }
}

impl From<rusqlite::Error> for IngestError {
    fn from(e: rusqlite::Error) -> Self {
        Self::Backend(e.to_string())
    }
}
