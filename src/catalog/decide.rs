//! Operator decisions the reader cannot make alone.

use colored::Colorize;
use std::io::{BufRead, IsTerminal, Write};
use std::path::Path;

#[derive(Clone, Copy, Debug)]
pub enum Question<'a> {
    /// Accept a line with more fields than the header (extra fields are dropped)?
    OverlongLine {
        file: &'a Path,
        line: usize,
        fields: usize,
        expected: usize,
    },
    /// Continue after a duplicate path (the line is lost)?
    DuplicatePath {
        file: &'a Path,
        line: usize,
        path: &'a str,
    },
}

impl std::fmt::Display for Question<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Question::OverlongLine {
                file,
                line,
                fields,
                expected,
            } => write!(
                f,
                "{}:{}: line has {} fields, header has {}. Import it anyway?",
                file.display(),
                line,
                fields,
                expected
            ),
            Question::DuplicatePath { file, line, path } => write!(
                f,
                "{}:{}: duplicate path '{}'. Skip this line and continue?",
                file.display(),
                line,
                path
            ),
        }
    }
}

pub trait Decider {
    fn confirm(&mut self, question: &Question<'_>) -> bool;
}

/// Fixed answer. `accept: false` is the non-interactive default.
pub struct AutoDecider {
    pub accept: bool,
}

impl Decider for AutoDecider {
    fn confirm(&mut self, question: &Question<'_>) -> bool {
        log::debug!("{} -> {}", question, if self.accept { "yes" } else { "no" });
        self.accept
    }
}

/// Asks on stderr, reads y/N from stdin. Anything but yes is no.
pub struct TerminalDecider;

impl Decider for TerminalDecider {
    fn confirm(&mut self, question: &Question<'_>) -> bool {
        let label = format!("[{}]", env!("CARGO_PKG_NAME")).cyan().bold();
        eprint!("\r{} {} [y/N] ", label, question);
        let _ = std::io::stderr().flush();
        let mut answer = String::new();
        if std::io::stdin().lock().read_line(&mut answer).is_err() {
            return false;
        }
        matches!(answer.trim().to_ascii_lowercase().as_str(), "y" | "yes")
    }
}

/// `assume_yes` answers everything; otherwise prompt only when stdin is a terminal.
pub fn decider_for(assume_yes: bool) -> Box<dyn Decider> {
    if assume_yes {
        Box::new(AutoDecider { accept: true })
    } else if std::io::stdin().is_terminal() {
        Box::new(TerminalDecider)
    } else {
        Box::new(AutoDecider { accept: false })
    }
}
