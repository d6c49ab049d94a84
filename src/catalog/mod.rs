//! Tab-separated catalog exports: header mapping, line recovery, row building, decisions.

pub mod decide;
pub mod header;
pub mod lines;
pub mod reader;
pub mod row;

pub use decide::{AutoDecider, Decider, Question, TerminalDecider, decider_for};
pub use header::{Field, HeaderMap};
pub use reader::{CatalogOutcome, CatalogReader, CatalogStats};
