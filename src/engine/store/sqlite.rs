//! SQLite-backed document store.

use rusqlite::{Connection, OptionalExtension};
use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use crate::error::IngestError;

use super::{DocPair, DocumentStore, SCHEMA, UPSERT_DOC_SQL, WAL_PRAGMAS};

pub struct SqliteStore {
    conn: Mutex<Connection>,
}

/// Enable WAL and apply schema to an open connection (idempotent).
fn apply_wal_and_schema(conn: &Connection) -> Result<(), IngestError> {
    conn.query_row("PRAGMA journal_mode = WAL", [], |_| Ok(()))?;
    conn.execute_batch(WAL_PRAGMAS)?;
    conn.execute_batch(SCHEMA)?;
    Ok(())
}

impl SqliteStore {
    /// Open or create the store at `path`. A failure here means the backend is unreachable.
    pub fn open(path: &Path) -> Result<Self, IngestError> {
        let conn = Connection::open(path)
            .map_err(|e| IngestError::Backend(format!("{}: {}", path.display(), e)))?;
        apply_wal_and_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// In-memory store with the same schema (tests, dry runs).
    pub fn open_in_memory() -> Result<Self, IngestError> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        conn.execute_batch(SCHEMA)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>, IngestError> {
        self.conn
            .lock()
            .map_err(|_| IngestError::Backend("connection lock poisoned".to_string()))
    }

    /// Stored body of one document, if present.
    pub fn get(&self, index: &str, key: &str) -> Result<Option<Vec<u8>>, IngestError> {
        let conn = self.lock()?;
        let body = conn
            .query_row(
                "SELECT body FROM documents WHERE idx = ?1 AND key = ?2",
                (index, key),
                |row| row.get(0),
            )
            .optional()?;
        Ok(body)
    }
}

impl DocumentStore for SqliteStore {
    fn create_index(&self, index: &str) -> Result<bool, IngestError> {
        let n = self
            .lock()?
            .execute("INSERT OR IGNORE INTO indices (name) VALUES (?1)", [index])?;
        Ok(n > 0)
    }

    fn delete_index(&self, index: &str) -> Result<bool, IngestError> {
        let n = self
            .lock()?
            .execute("DELETE FROM indices WHERE name = ?1", [index])?;
        Ok(n > 0)
    }

    fn index_exists(&self, index: &str) -> Result<bool, IngestError> {
        let found = self
            .lock()?
            .query_row("SELECT 1 FROM indices WHERE name = ?1", [index], |_| Ok(()))
            .optional()?;
        Ok(found.is_some())
    }

    fn bulk_write(&self, index: &str, docs: &[DocPair]) -> Result<(), IngestError> {
        let mut conn = self.lock()?;
        let tx = conn.transaction()?;
        {
            let mut stmt = tx.prepare_cached(UPSERT_DOC_SQL)?;
            for (key, body) in docs {
                stmt.execute((index, key.as_str(), body.as_slice()))?;
            }
        }
        tx.commit()?;
        Ok(())
    }

    fn write(&self, index: &str, key: &str, doc: &[u8]) -> Result<(), IngestError> {
        self.lock()?.execute(UPSERT_DOC_SQL, (index, key, doc))?;
        Ok(())
    }

    fn count(&self, index: &str) -> Result<usize, IngestError> {
        let n: i64 = self.lock()?.query_row(
            "SELECT COUNT(*) FROM documents WHERE idx = ?1",
            [index],
            |row| row.get(0),
        )?;
        Ok(n.max(0) as usize)
    }
}
