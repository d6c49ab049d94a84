//! Date normalization into the one format stored in documents: `MM/DD/YYYY HH:MM:SS`.

use chrono::{DateTime, Local, NaiveDateTime};
use std::time::SystemTime;

use crate::utils::config::DATE_PLACEHOLDERS;

/// Canonical output pattern. Listed first in [`ACCEPTED_PATTERNS`] so normalizing is idempotent.
pub const CANONICAL_PATTERN: &str = "%m/%d/%Y %H:%M:%S";

/// Input patterns tried in order. Day-first forms use dots so they never collide with the
/// slash-separated month-first canonical form.
pub const ACCEPTED_PATTERNS: &[&str] = &[
    CANONICAL_PATTERN,
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M",
    "%d.%m.%Y %H:%M:%S",
    // two-digit year before %Y, which would read "12" as year 12
    "%d.%m.%y %H:%M",
    "%d.%m.%Y %H:%M",
    // NeoFinder long form, English and (after translation) German
    "%A, %B %d, %Y, %H:%M:%S",
    "%A, %d. %B %Y, %H:%M:%S",
];

const GERMAN_NAMES: &[(&str, &str)] = &[
    ("Montag", "Monday"),
    ("Dienstag", "Tuesday"),
    ("Mittwoch", "Wednesday"),
    ("Donnerstag", "Thursday"),
    ("Freitag", "Friday"),
    ("Samstag", "Saturday"),
    ("Sonntag", "Sunday"),
    ("Januar", "January"),
    ("Februar", "February"),
    ("März", "March"),
    ("Mai", "May"),
    ("Juni", "June"),
    ("Juli", "July"),
    ("Oktober", "October"),
    ("Dezember", "December"),
];

fn translate_german(raw: &str) -> Option<String> {
    let mut out = raw.to_string();
    let mut changed = false;
    for (de, en) in GERMAN_NAMES {
        if out.contains(de) {
            out = out.replace(de, en);
            changed = true;
        }
    }
    changed.then_some(out)
}

fn parse_any(raw: &str) -> Option<NaiveDateTime> {
    ACCEPTED_PATTERNS
        .iter()
        .find_map(|p| NaiveDateTime::parse_from_str(raw, p).ok())
}

/// Parse `raw` against the accepted patterns and render it canonically.
/// Returns None for empty input, placeholders like `n.v.`, and anything no pattern accepts.
pub fn normalize_date(raw: &str) -> Option<String> {
    let raw = raw.trim();
    if raw.is_empty() || DATE_PLACEHOLDERS.contains(&raw) {
        return None;
    }
    let parsed = parse_any(raw).or_else(|| translate_german(raw).and_then(|t| parse_any(&t)))?;
    Some(parsed.format(CANONICAL_PATTERN).to_string())
}

/// Render a file-system timestamp in local time, canonical format.
pub fn format_system_time(t: SystemTime) -> String {
    DateTime::<Local>::from(t).format(CANONICAL_PATTERN).to_string()
}
