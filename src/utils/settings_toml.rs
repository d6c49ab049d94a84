//! Load `.mediadex.toml` from the working directory (CLI only). Lib callers build [`Opts`] directly.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::utils::config::PackagePaths;
use crate::{MimeStrategy, Opts};

#[derive(Debug, Default, Deserialize)]
pub(crate) struct SettingsToml {
    #[serde(default)]
    settings: SettingsSection,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct SettingsSection {
    db_path: Option<String>,
    index: Option<String>,
    strict: Option<bool>,
    auto_correct: Option<bool>,
    mime: Option<MimeStrategy>,
    threads: Option<usize>,
    ignore: Option<Vec<String>>,
    verbose: Option<bool>,
    queue_capacity: Option<usize>,
    batch_actions: Option<usize>,
    batch_mb: Option<usize>,
    flush_timeout: Option<u64>,
}

/// Load the settings file from `dir`. `Ok(None)` when there is none; a file that exists but
/// cannot be read or parsed is an error, left to the caller to report once logging is up.
pub(crate) fn load_settings_toml(dir: &Path) -> Result<Option<SettingsToml>> {
    let path = dir.join(PackagePaths::get().settings_filename());
    let s = match std::fs::read_to_string(&path) {
        Ok(s) => s,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(e).with_context(|| format!("read {}", path.display())),
    };
    let file = parse_settings(&s).with_context(|| format!("parse {}", path.display()))?;
    Ok(Some(file))
}

pub(crate) fn parse_settings(s: &str) -> Result<SettingsToml, toml::de::Error> {
    toml::from_str(s)
}

/// Overwrite opts field from file when present.
macro_rules! apply_file_opt {
    ($sec:expr, $opts:expr, $sec_field:ident => $opts_field:ident) => {
        if let Some(v) = $sec.$sec_field.clone() {
            $opts.$opts_field = v;
        }
    };
}

/// Apply file settings to opts (only fields present in the file). Call before applying CLI flags.
pub(crate) fn apply_file_to_opts(file: &SettingsToml, opts: &mut Opts) {
    let sec = &file.settings;
    if let Some(ref p) = sec.db_path {
        opts.db_path = Some(PathBuf::from(p));
    }
    apply_file_opt!(sec, opts, index => index_name);
    apply_file_opt!(sec, opts, strict => strict);
    apply_file_opt!(sec, opts, auto_correct => auto_correct);
    apply_file_opt!(sec, opts, mime => mime);
    if let Some(n) = sec.threads {
        opts.num_threads = Some(n);
    }
    if let Some(ref v) = sec.ignore {
        opts.ignore_fields = v.iter().cloned().collect();
    }
    apply_file_opt!(sec, opts, verbose => verbose);
    apply_file_opt!(sec, opts, queue_capacity => queue_capacity);
    apply_file_opt!(sec, opts, batch_actions => batch_actions);
    if let Some(mb) = sec.batch_mb {
        opts.batch_bytes = mb * 1024 * 1024;
    }
    apply_file_opt!(sec, opts, flush_timeout => flush_timeout_secs);
}
