use colored::Colorize;
use env_logger::Builder;
use log::{Level, LevelFilter};
use std::io::Write;

/// Install the process logger: our crate at Info (Debug when verbose), dependencies at Warn.
/// `RUST_LOG` still wins for anything it names. Safe to call twice; the second call is a no-op.
pub fn setup_logging(verbose: bool) {
    let level = if verbose {
        LevelFilter::Debug
    } else {
        LevelFilter::Info
    };

    let _ = Builder::new()
        .filter_level(LevelFilter::Warn)
        .filter_module(env!("CARGO_PKG_NAME"), level)
        .parse_default_env()
        .format(|buf, record| {
            let name = env!("CARGO_PKG_NAME");
            let line = match record.level() {
                Level::Error => format!(
                    "[{} {} {}] {}",
                    name.cyan(),
                    "ERROR".red(),
                    record.target().white(),
                    record.args()
                ),
                Level::Warn => format!("[{} {}] {}", name.cyan(), "WARN".yellow(), record.args()),
                Level::Debug | Level::Trace => {
                    format!("[{}] {}", name.cyan(), record.args().to_string().dimmed())
                }
                Level::Info => format!("[{}] {}", name.cyan(), record.args()),
            };
            // leading \r clears a progress bar drawn on the same line
            writeln!(buf, "\r{}", line)
        })
        .try_init();
}
