//! Engine: backend store, batch indexer, value formats, and the CLI edge.

pub mod arg_parser;
pub mod cli;
pub mod dates;
pub mod indexer;
pub mod mime;
pub mod progress;
pub mod size;
pub mod store;
pub mod tools;

// Re-export commonly used items
pub use arg_parser::Cli;
pub use cli::handle_run;
pub use dates::normalize_date;
pub use indexer::{BatchIndexer, IndexReport, IndexerConfig, IndexerState, ProgressFn};
pub use size::{format_size, parse_size};
pub use store::{DocumentStore, SqliteStore, prepare_index};
