//! Replace deprecated header paths in user sources.
//!
//! The build declares every moved header as `deprecated_header(<old> <new>)`;
//! both paths are relative to the `open62541pp/` include root.

use anyhow::{Context, Result};
use indexmap::IndexMap;
use once_cell::sync::Lazy;
use regex::Regex;
use std::fs;
use std::path::{Path, PathBuf};

static DEPRECATED_HEADER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"deprecated_header\((\S+)\s+(\S+)\)").expect("valid regex"));

const INCLUDE_ROOT: &str = "open62541pp/";

/// Old include path to new include path, in declaration order.
pub fn parse_deprecations(cmake: &str) -> IndexMap<String, String> {
    DEPRECATED_HEADER
        .captures_iter(cmake)
        .map(|captures| {
            (
                format!("{INCLUDE_ROOT}{}", &captures[1]),
                format!("{INCLUDE_ROOT}{}", &captures[2]),
            )
        })
        .collect()
}

pub fn load_deprecations(cmake_lists: &Path) -> Result<IndexMap<String, String>> {
    let content = fs::read_to_string(cmake_lists)
        .with_context(|| format!("failed to read {:?}", cmake_lists))?;
    Ok(parse_deprecations(&content))
}

/// Literal replacement of every old path, applied in declaration order.
pub fn replace_includes(content: &str, deprecations: &IndexMap<String, String>) -> String {
    deprecations
        .iter()
        .fold(content.to_string(), |acc, (old, new)| acc.replace(old.as_str(), new))
}

/// Rewrite `files` in place; returns the files that changed.
pub fn update_includes(
    deprecations: &IndexMap<String, String>,
    files: &[PathBuf],
) -> Result<Vec<PathBuf>> {
    for (old, new) in deprecations {
        tracing::debug!(old = %old, new = %new, "deprecated header");
    }

    let mut changed = Vec::new();
    for path in files {
        let content =
            fs::read_to_string(path).with_context(|| format!("failed to read {:?}", path))?;
        let updated = replace_includes(&content, deprecations);
        if updated != content {
            fs::write(path, updated).with_context(|| format!("failed to write {:?}", path))?;
            changed.push(path.clone());
        }
    }

    tracing::info!(
        deprecations = deprecations.len(),
        files = files.len(),
        changed = changed.len(),
        "updated includes"
    );
    Ok(changed)
}
