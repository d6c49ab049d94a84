use std::path::Path;

use crate::error::IngestError;

use super::context::RunContext;
use super::walk::WalkOutcome;

/// Check a finished walk: in strict mode any failure refuses the import; otherwise log skipped
/// paths. Call after the walker returned and the collector stopped.
pub fn check_walk_outcome(
    root: &Path,
    outcome: &WalkOutcome,
    ctx: &RunContext,
) -> Result<(), IngestError> {
    if ctx.opts.strict && outcome.failed > 0 {
        if let Ok(mut first) = ctx.first_error.lock()
            && let Some(msg) = first.take()
        {
            log::error!("First failure: {}", msg);
        }
        return Err(IngestError::WalkFailed {
            root: root.to_path_buf(),
            failures: outcome.failed,
        });
    }
    if outcome.skipped > 0 {
        log::warn!(
            "Skipped {} entries due to permission errors or access issues",
            outcome.skipped
        );
        if ctx.opts.verbose
            && let Ok(skipped) = ctx.skipped_paths.lock()
        {
            for (p, reason) in skipped.iter() {
                eprintln!("  skipped: {} ({})", p.display(), reason);
            }
        }
    }
    Ok(())
}
