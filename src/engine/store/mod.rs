//! Document-index backend: the operations the ingestion core consumes, and a SQLite store.

mod sqlite;

pub use sqlite::SqliteStore;

use crate::error::IngestError;

/// One document ready to write: (key, serialized JSON).
pub type DocPair = (String, Vec<u8>);

/// What the core needs from a document index. Writes must be idempotent per key: writing the
/// same key twice leaves one document holding the second body.
pub trait DocumentStore: Send + Sync {
    /// Create `index`. Returns false if it already existed.
    fn create_index(&self, index: &str) -> Result<bool, IngestError>;
    /// Delete `index` and its documents. Returns false if it did not exist.
    fn delete_index(&self, index: &str) -> Result<bool, IngestError>;
    fn index_exists(&self, index: &str) -> Result<bool, IngestError>;
    /// Write a whole batch; all or nothing.
    fn bulk_write(&self, index: &str, docs: &[DocPair]) -> Result<(), IngestError>;
    fn write(&self, index: &str, key: &str, doc: &[u8]) -> Result<(), IngestError>;
    fn count(&self, index: &str) -> Result<usize, IngestError>;
}

/// Make sure `index` exists, recreating it when `replace` is set.
pub fn prepare_index(
    store: &dyn DocumentStore,
    index: &str,
    replace: bool,
) -> Result<(), IngestError> {
    if replace && store.delete_index(index)? {
        log::info!("Deleted index '{}'", index);
    }
    if store.create_index(index)? {
        log::info!("Created index '{}'", index);
    } else {
        log::info!("Adding to index '{}'", index);
    }
    Ok(())
}

/// WAL tuning pragmas (synchronous, autocheckpoint, size limit). Use after PRAGMA journal_mode = WAL.
pub(crate) const WAL_PRAGMAS: &str = r#"
        PRAGMA synchronous = NORMAL;
        PRAGMA wal_autocheckpoint = 10000;
        PRAGMA journal_size_limit = 67108864;
        PRAGMA foreign_keys = ON;
        "#;

/// Upsert keeps writes idempotent per (index, key).
pub(crate) const UPSERT_DOC_SQL: &str =
    "INSERT OR REPLACE INTO documents (idx, key, body) VALUES (?1, ?2, ?3)";

/// Schema for indices and their documents.
pub(crate) const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS indices (
    name TEXT PRIMARY KEY,
    created_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP
);

CREATE TABLE IF NOT EXISTS documents (
    idx TEXT NOT NULL REFERENCES indices(name) ON DELETE CASCADE,
    key TEXT NOT NULL,
    body BLOB NOT NULL,
    PRIMARY KEY (idx, key)
);
"#;
