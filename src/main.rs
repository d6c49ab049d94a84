//! mediadex CLI: crawl directories or import catalog exports into the document index.

use clap::Parser;
use mediadex::engine::arg_parser::Cli;
use mediadex::engine::handle_run;
use std::process::ExitCode;
use std::time::Instant;

fn main() -> ExitCode {
    let start_time = Instant::now();
    let cli = Cli::parse();
    let code = handle_run(&cli);
    log::debug!("Total time: {:?}", start_time.elapsed());
    code
}
