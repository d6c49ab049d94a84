//! Application configuration constants.
//! Tuning and thresholds in one place.

use std::path::PathBuf;
use std::sync::OnceLock;
use std::time::Duration;

// ---- Package / paths (from CARGO_PKG_NAME, cached) ----

/// Package-derived names: built once from `CARGO_PKG_NAME`, then cached.
pub struct PackagePaths {
    db_filename: String,
    settings_filename: String,
    db_env_var: String,
}

static PACKAGE_PATHS: OnceLock<PackagePaths> = OnceLock::new();

impl PackagePaths {
    /// Build and cache names from `CARGO_PKG_NAME`. Called once on first use.
    pub fn get() -> &'static PackagePaths {
        PACKAGE_PATHS.get_or_init(|| {
            let pkg = env!("CARGO_PKG_NAME");
            PackagePaths {
                db_filename: format!("{pkg}.db"),
                settings_filename: format!(".{pkg}.toml"),
                db_env_var: format!("{}_DB", pkg.to_uppercase()),
            }
        })
    }

    pub fn settings_filename(&self) -> &str {
        &self.settings_filename
    }

    /// Backend location: explicit path, else `$MEDIADEX_DB`, else `mediadex.db` in the working dir.
    pub fn resolve_db_path(&self, explicit: Option<&PathBuf>) -> PathBuf {
        if let Some(p) = explicit {
            return p.clone();
        }
        std::env::var_os(&self.db_env_var)
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(&self.db_filename))
    }
}

/// Index used when none is given.
pub const DEFAULT_INDEX_NAME: &str = "archive";

// ---- Record queue / collector ----

pub struct QueueConsts;

impl QueueConsts {
    /// Bounded so a fast walker cannot outrun the indexer without limit.
    pub const DEFAULT_CAPACITY: usize = 50_000;
    /// How long the collector sleeps when the queue is momentarily empty.
    pub const COLLECTOR_IDLE_WAIT: Duration = Duration::from_millis(10);
}

// ---- Batch indexer ----

pub struct BatchConsts;

impl BatchConsts {
    /// Flush when a batch holds this many documents.
    pub const ACTIONS: usize = 10_000;
    /// Flush when a batch's serialized size reaches this many bytes (10 MiB).
    pub const BYTES: usize = 10 * 1024 * 1024;
    /// Threads executing batch writes against the backend.
    pub const FLUSH_WORKERS: usize = 1;
    /// Budget for in-flight batches to be acknowledged at close.
    pub const FLUSH_TIMEOUT_SECS: u64 = 60;
    /// Poll interval while close waits on submissions and in-flight batches.
    pub const CLOSE_POLL: Duration = Duration::from_millis(100);
}

// ---- Catalog parsing ----

/// Extensions accepted as catalog exports.
pub const CATALOG_EXTENSIONS: &[&str] = &["csv", "txt"];

/// Date values that catalog tools write for "no date"; never parsed.
pub const DATE_PLACEHOLDERS: &[&str] = &["n.v.", "n.a."];
