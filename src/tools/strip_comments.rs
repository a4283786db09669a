//! Prepare the bundled C headers for the documentation build.
//!
//! Upstream documents its API with plain `/* */` comments and hides the
//! symbols behind export macros that confuse the doc parser. This pass drops
//! the existing `/** */` blocks, promotes the plain comments to doc comments
//! and removes the macros. It is purely textual.

use anyhow::{Context, Result};
use once_cell::sync::Lazy;
use regex::Regex;
use std::fs;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

static DOC_BLOCK: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?m)/\*\*[\s\S]+?\*/$").expect("valid regex"));
static PLAIN_COMMENT_START: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?m)^/\* ").expect("valid regex"));

/// Removed verbatim, including the surrounding spaces.
pub const REMOVED_TOKENS: &[&str] = &[
    " UA_EXPORT",
    " UA_INLINE",
    " UA_FUNC_ATTR_WARN_UNUSED_RESULT",
    " UA_FUNC_ATTR_MALLOC",
    " UA_RESTRICT ",
];

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct StripReport {
    pub scanned: usize,
    pub rewritten: Vec<PathBuf>,
}

/// Apply the rewrite to one header's text.
pub fn strip_header(content: &str) -> String {
    let stripped = DOC_BLOCK.replace_all(content, "");
    let mut result = PLAIN_COMMENT_START.replace_all(&stripped, "/** ").into_owned();
    for token in REMOVED_TOKENS {
        result = result.replace(token, "");
    }
    result
}

/// Rewrite every `.h` file under `dir` in place, in sorted path order.
///
/// Files whose content does not change are left untouched.
pub fn strip_comments(dir: &Path) -> Result<StripReport> {
    anyhow::ensure!(dir.is_dir(), "{:?} is not a directory", dir);

    let mut report = StripReport::default();
    for entry in WalkDir::new(dir).sort_by_file_name() {
        let entry = entry.with_context(|| format!("failed to walk {:?}", dir))?;
        let path = entry.path();
        if !entry.file_type().is_file() || path.extension().is_none_or(|ext| ext != "h") {
            continue;
        }

        report.scanned += 1;
        let content =
            fs::read_to_string(path).with_context(|| format!("failed to read {:?}", path))?;
        let rewritten = strip_header(&content);
        if rewritten != content {
            fs::write(path, rewritten).with_context(|| format!("failed to write {:?}", path))?;
            tracing::debug!(path = %path.display(), "rewrote header");
            report.rewritten.push(path.to_path_buf());
        }
    }

    tracing::info!(
        scanned = report.scanned,
        rewritten = report.rewritten.len(),
        "stripped comments"
    );
    Ok(report)
}
