//! Run the formatter over the project's C++ sources.

use crate::codegen::output::FormatterCommand;
use anyhow::{Context, Result, anyhow};
use globset::{Glob, GlobSet, GlobSetBuilder};
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

pub const SOURCE_DIRS: &[&str] = &["examples", "include", "src", "tests"];
pub const SOURCE_PATTERNS: &[&str] = &["*.cpp", "*.h", "*.hpp"];

fn source_globs() -> Result<GlobSet> {
    let mut builder = GlobSetBuilder::new();
    for pattern in SOURCE_PATTERNS {
        let glob = Glob::new(pattern).map_err(|err| anyhow!("invalid glob pattern {pattern}: {err}"))?;
        builder.add(glob);
    }
    builder.build().context("failed to build source globs")
}

/// Sorted list of formattable files under the source directories of `root`.
/// Missing source directories are skipped.
pub fn collect_sources(root: &Path) -> Result<Vec<PathBuf>> {
    let globs = source_globs()?;
    let mut files = Vec::new();
    for dir in SOURCE_DIRS.iter().map(|dir| root.join(dir)) {
        if !dir.is_dir() {
            tracing::debug!(dir = %dir.display(), "source directory missing");
            continue;
        }
        for entry in WalkDir::new(&dir).sort_by_file_name() {
            let entry = entry.with_context(|| format!("failed to walk {:?}", dir))?;
            if entry.file_type().is_file()
                && let Some(name) = entry.path().file_name()
                && globs.is_match(name)
            {
                files.push(entry.into_path());
            }
        }
    }
    Ok(files)
}

/// Format every collected file in place; the first failure aborts.
pub fn format_sources(root: &Path, formatter: &FormatterCommand) -> Result<Vec<PathBuf>> {
    let files = collect_sources(root)?;
    for path in &files {
        tracing::debug!(path = %path.display(), "formatting");
        formatter.run(path)?;
    }
    tracing::info!(files = files.len(), command = %formatter.command_line(), "formatted sources");
    Ok(files)
}
