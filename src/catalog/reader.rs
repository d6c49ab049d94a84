//! Catalog reader: one export file to accepted records plus line statistics.
//!
//! A file is all or nothing. Any potentially invalid value or invalid line rejects the whole
//! file; its paths only join the run's duplicate set once it is accepted.

use log::{info, warn};
use std::collections::HashSet;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use crate::error::IngestError;
use crate::{FileRecord, Opts};

use super::decide::{Decider, Question};
use super::header::{Field, HeaderMap};
use super::lines::{Assembled, LineAssembler};
use super::row::{RowBuilder, RowError};

/// Per-file counters.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct CatalogStats {
    /// Data lines read (header excluded).
    pub physical_lines: usize,
    /// Rows built from those lines.
    pub rows: usize,
    /// Rows rebuilt from more than one physical line.
    pub recovered_rows: usize,
    /// Blank lines and, under auto-correct, abandoned fragments.
    pub lines_skipped: usize,
    pub potentially_invalid: usize,
    pub invalid_lines: usize,
    /// Duplicates the operator chose to drop.
    pub lost_lines: usize,
}

impl CatalogStats {
    pub fn add(&mut self, other: &CatalogStats) {
        self.physical_lines += other.physical_lines;
        self.rows += other.rows;
        self.recovered_rows += other.recovered_rows;
        self.lines_skipped += other.lines_skipped;
        self.potentially_invalid += other.potentially_invalid;
        self.invalid_lines += other.invalid_lines;
        self.lost_lines += other.lost_lines;
    }
}

#[derive(Debug, Default)]
pub struct CatalogOutcome {
    pub records: Vec<FileRecord>,
    pub stats: CatalogStats,
}

pub struct CatalogReader {
    field_set: crate::FieldSet,
    strict: bool,
    auto_correct: bool,
    ignore: HashSet<Field>,
}

/// Mutable state while one file is read.
struct FileScan<'a> {
    file: &'a Path,
    stem: Option<String>,
    seen: &'a HashSet<String>,
    file_paths: HashSet<String>,
    outcome: CatalogOutcome,
}

impl CatalogReader {
    pub fn new(opts: &Opts) -> Self {
        let mut ignore = HashSet::new();
        for name in &opts.ignore_fields {
            match Field::from_key(name) {
                Some(f) => {
                    ignore.insert(f);
                }
                None => warn!("Unknown field '{}' in ignore list", name),
            }
        }
        Self {
            field_set: opts.field_set,
            strict: opts.strict,
            auto_correct: opts.auto_correct,
            ignore,
        }
    }

    /// Read `path`. `seen` holds the paths accepted earlier in the run and receives this file's
    /// paths on success.
    pub fn read_file(
        &self,
        path: &Path,
        seen: &mut HashSet<String>,
        decider: &mut dyn Decider,
    ) -> Result<CatalogOutcome, IngestError> {
        info!("Catalog file: {}", path.display());
        let file = File::open(path).map_err(|e| IngestError::io(path, e))?;
        let mut lines = BufReader::new(file).lines();

        let header_line = match lines.next() {
            Some(l) => l.map_err(|e| IngestError::io(path, e))?,
            None => String::new(),
        };
        let header = HeaderMap::parse(&header_line, path, self.field_set)?;
        let rows = RowBuilder::new(&header, &self.ignore, self.auto_correct);
        let mut assembler = LineAssembler::new(header.width());

        let mut scan = FileScan {
            file: path,
            stem: path.file_stem().map(|s| s.to_string_lossy().into_owned()),
            seen,
            file_paths: HashSet::new(),
            outcome: CatalogOutcome::default(),
        };

        for (i, line) in lines.enumerate() {
            let line = line.map_err(|e| IngestError::io(path, e))?;
            scan.outcome.stats.physical_lines += 1;
            // header is line 1
            for piece in assembler.push(i + 2, &line) {
                self.handle(piece, &header, &rows, &mut scan, decider)?;
            }
        }
        if let Some(piece) = assembler.finish() {
            self.handle(piece, &header, &rows, &mut scan, decider)?;
        }

        let FileScan {
            file_paths,
            outcome,
            ..
        } = scan;
        let stats = outcome.stats;
        if stats.potentially_invalid > 0 {
            warn!(
                "File '{}' has {} potentially invalid field(s).",
                path.display(),
                stats.potentially_invalid
            );
        }
        if stats.potentially_invalid > 0 || stats.invalid_lines > 0 {
            return Err(IngestError::CatalogRejected {
                file: path.to_path_buf(),
                potentially_invalid: stats.potentially_invalid,
                invalid_lines: stats.invalid_lines,
            });
        }
        seen.extend(file_paths);
        info!(
            "{}: {} records ({} recovered, {} skipped, {} lost)",
            path.display(),
            outcome.records.len(),
            stats.recovered_rows,
            stats.lines_skipped,
            stats.lost_lines
        );
        Ok(outcome)
    }

    fn handle(
        &self,
        piece: Assembled,
        header: &HeaderMap,
        rows: &RowBuilder<'_>,
        scan: &mut FileScan<'_>,
        decider: &mut dyn Decider,
    ) -> Result<(), IngestError> {
        match piece {
            Assembled::Row {
                fields,
                line,
                recovered,
            } => {
                scan.outcome.stats.rows += 1;
                if recovered {
                    scan.outcome.stats.recovered_rows += 1;
                }
                self.accept_row(&fields, line, rows, scan, decider)
            }
            Assembled::Overlong { mut fields, line } => {
                let q = Question::OverlongLine {
                    file: scan.file,
                    line,
                    fields: fields.len(),
                    expected: header.width(),
                };
                if !self.strict && decider.confirm(&q) {
                    fields.truncate(header.width());
                    scan.outcome.stats.rows += 1;
                    self.accept_row(&fields, line, rows, scan, decider)
                } else {
                    self.invalid(scan, line, "more fields than the header");
                    Ok(())
                }
            }
            Assembled::Abandoned { line, text } => {
                if self.auto_correct {
                    warn!(
                        "{}:{}: skipping unrecoverable fragment '{}'",
                        scan.file.display(),
                        line,
                        text.replace('\t', " | ")
                    );
                    scan.outcome.stats.lines_skipped += 1;
                } else {
                    self.invalid(scan, line, "missing columns");
                }
                Ok(())
            }
            Assembled::Blank { .. } => {
                scan.outcome.stats.lines_skipped += 1;
                Ok(())
            }
        }
    }

    fn accept_row(
        &self,
        fields: &[String],
        line: usize,
        rows: &RowBuilder<'_>,
        scan: &mut FileScan<'_>,
        decider: &mut dyn Decider,
    ) -> Result<(), IngestError> {
        let built = match rows.build(fields) {
            Ok(b) => b,
            Err(RowError::Invalid(reason)) => {
                self.invalid(scan, line, &reason);
                return Ok(());
            }
            Err(RowError::MissingPath) => {
                return Err(IngestError::MissingPath {
                    file: scan.file.to_path_buf(),
                    line,
                });
            }
            Err(RowError::UnparseableDates) => {
                return Err(IngestError::UnparseableDates {
                    file: scan.file.to_path_buf(),
                    line,
                });
            }
        };
        for field in &built.potentially_invalid {
            warn!(
                "{}:{}: potentially invalid data, no value for field '{}'",
                scan.file.display(),
                line,
                field.key()
            );
        }
        scan.outcome.stats.potentially_invalid += built.potentially_invalid.len();

        let mut record = built.record;
        if scan.seen.contains(&record.path) || scan.file_paths.contains(&record.path) {
            let q = Question::DuplicatePath {
                file: scan.file,
                line,
                path: &record.path,
            };
            if !decider.confirm(&q) {
                return Err(IngestError::DuplicatePath {
                    file: scan.file.to_path_buf(),
                    line,
                    path: record.path,
                });
            }
            warn!("{}:{}: duplicate '{}' not indexed", scan.file.display(), line, record.path);
            scan.outcome.stats.lost_lines += 1;
            return Ok(());
        }
        scan.file_paths.insert(record.path.clone());
        record.tag_origin(None, scan.stem.as_deref());
        scan.outcome.records.push(record);
        Ok(())
    }

    fn invalid(&self, scan: &mut FileScan<'_>, line: usize, reason: &str) {
        warn!("{}:{}: invalid line: {}", scan.file.display(), line, reason);
        scan.outcome.stats.invalid_lines += 1;
    }
}
