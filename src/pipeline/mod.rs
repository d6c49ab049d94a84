//! Pipeline components: run context, record queue, walker, collector, orchestration.

pub mod collector;
pub mod context;
pub mod error_handler;
pub mod orchestrator;
pub mod queue;
pub mod walk;

pub use collector::{Collector, CollectorOutcome};
pub use context::RunContext;
pub use error_handler::check_walk_outcome;
pub use orchestrator::{crawl_root, crawl_root_with_detector, import_catalogs, run};
pub use queue::{RecordReceiver, RecordSender, record_queue};
pub use walk::{DirectoryWalker, WalkOutcome, build_walk_pool};
