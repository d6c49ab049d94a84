//! Path and host utilities

use std::path::{Path, PathBuf};

use crate::error::IngestError;
use crate::utils::config::CATALOG_EXTENSIONS;

/// Path as stored in documents. Separators are normalized to `/` so catalogs exported on
/// Windows and crawls on Unix share one key space.
pub fn path_to_doc_string(path: &Path) -> String {
    path.to_string_lossy().replace('\\', "/")
}

/// Resolve the crawl root once: symlinks in the root itself are followed, none below it.
pub fn canonicalize_root(path: &Path) -> Result<PathBuf, IngestError> {
    let root = path
        .canonicalize()
        .map_err(|e| IngestError::io(path, e))?;
    if !root.is_dir() {
        return Err(IngestError::Argument(format!(
            "not a directory: {}",
            root.display()
        )));
    }
    Ok(root)
}

/// Name of this machine, recorded as the catalog of crawled entries.
pub fn local_hostname() -> String {
    sysinfo::System::host_name().unwrap_or_else(|| "unknown".to_string())
}

/// True if the file name has a catalog export extension (`.csv`, `.txt`).
pub fn is_catalog_file(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| {
            CATALOG_EXTENSIONS
                .iter()
                .any(|c| c.eq_ignore_ascii_case(e))
        })
}

/// Expand catalog inputs: files are taken as given, directories contribute their catalog files
/// (sorted, not recursive).
pub fn expand_catalog_inputs(inputs: &[PathBuf]) -> Result<Vec<PathBuf>, IngestError> {
    let mut files = Vec::new();
    for input in inputs {
        if input.is_dir() {
            let mut found: Vec<PathBuf> = std::fs::read_dir(input)
                .map_err(|e| IngestError::io(input, e))?
                .filter_map(|e| e.ok().map(|e| e.path()))
                .filter(|p| p.is_file() && is_catalog_file(p))
                .collect();
            found.sort();
            files.extend(found);
        } else {
            files.push(input.clone());
        }
    }
    Ok(files)
}
