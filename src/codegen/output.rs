//! Header assembly, formatting and transactional writes.
//!
//! Rendering produces bare fragments. The assembler joins them, wraps them in
//! the fixed skeleton of a generated header, then stages the result in a
//! temporary file near its target. The formatter runs on the staged file;
//! targets are only replaced once every header of the run has been staged and
//! formatted.

use crate::error::{GenError, GenResult};
use once_cell::sync::Lazy;
use regex::Regex;
use sha2::{Digest, Sha256};
use similar::TextDiff;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::Command;
use tempfile::{NamedTempFile, TempPath};

const BANNER_WIDTH: usize = 100;
const BANNER_TITLE: &str = "Generated - do not modify!";

static BARE_DOC_CONTINUATION: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\s*\*\s*$").expect("valid regex"));

/// `/* --- */` rule, centered title, rule.
pub fn banner() -> String {
    let inner = BANNER_WIDTH - 4;
    let rule = format!("/* {} */", "-".repeat(inner - 2));
    let title = format!("/*{BANNER_TITLE:^inner$}*/");
    format!("{rule}\n{title}\n{rule}")
}

/// Compiler diagnostic silenced around the whole body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiagnosticSuppression {
    pub flag: &'static str,
    pub reason: &'static [&'static str],
}

impl DiagnosticSuppression {
    /// GCC flags enum members that share a name with a type (e.g.
    /// `MonitoringParameters`) as shadowing.
    pub const fn gcc_shadow() -> Self {
        Self {
            flag: "-Wshadow",
            reason: &[
                "ignore (false-positive?) warning of GCC:",
                "declaration of 'MonitoringParameters' shadows a global declaration",
            ],
        }
    }

    fn open(&self) -> String {
        let mut lines: Vec<String> = self.reason.iter().map(|line| format!("// {line}")).collect();
        lines.push("#ifndef _MSC_VER".to_string());
        lines.push("#pragma GCC diagnostic push".to_string());
        lines.push(format!("#pragma GCC diagnostic ignored \"{}\"", self.flag));
        lines.push("#endif".to_string());
        lines.join("\n")
    }

    fn close(&self) -> String {
        "#ifndef _MSC_VER\n#pragma GCC diagnostic pop\n#endif".to_string()
    }
}

/// Fixed frame around the generated declarations of one header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeaderSkeleton {
    pub includes: Vec<String>,
    pub namespace: String,
    pub suppress: Option<DiagnosticSuppression>,
    pub preamble: Option<String>,
    /// Fence the body with `// clang-format off/on`.
    pub format_fence: bool,
}

impl HeaderSkeleton {
    pub fn new(namespace: impl Into<String>) -> Self {
        Self {
            includes: Vec::new(),
            namespace: namespace.into(),
            suppress: None,
            preamble: None,
            format_fence: false,
        }
    }

    pub fn include(mut self, include: impl Into<String>) -> Self {
        self.includes.push(include.into());
        self
    }

    pub fn suppress(mut self, suppression: DiagnosticSuppression) -> Self {
        self.suppress = Some(suppression);
        self
    }

    pub fn preamble(mut self, preamble: impl Into<String>) -> Self {
        self.preamble = Some(preamble.into());
        self
    }

    pub fn fenced(mut self) -> Self {
        self.format_fence = true;
        self
    }

    /// Join fragments with one blank line, normalize, and wrap.
    pub fn assemble<S: AsRef<str>>(&self, fragments: &[S]) -> String {
        let body = normalize_doc_comments(
            &fragments
                .iter()
                .map(|fragment| fragment.as_ref().trim_matches('\n'))
                .filter(|fragment| !fragment.is_empty())
                .collect::<Vec<_>>()
                .join("\n\n"),
        );

        let mut sections = vec![banner(), "#pragma once".to_string()];
        if !self.includes.is_empty() {
            sections.push(
                self.includes
                    .iter()
                    .map(|include| format!("#include {include}"))
                    .collect::<Vec<_>>()
                    .join("\n"),
            );
        }
        if let Some(suppress) = &self.suppress {
            sections.push(suppress.open());
        }
        sections.push(format!("namespace {} {{", self.namespace));
        if let Some(preamble) = &self.preamble {
            sections.push(preamble.clone());
        }
        if self.format_fence {
            sections.push("// clang-format off".to_string());
        }
        if !body.is_empty() {
            sections.push(body);
        }
        if self.format_fence {
            sections.push("// clang-format on".to_string());
        }
        sections.push(format!("}}  // namespace {}", self.namespace));
        if let Some(suppress) = &self.suppress {
            sections.push(suppress.close());
        }

        let mut content = sections.join("\n\n");
        content.push('\n');
        content
    }
}

/// Drop doc-comment lines that hold nothing but the `*` continuation marker.
pub fn normalize_doc_comments(text: &str) -> String {
    text.lines()
        .filter(|line| !BARE_DOC_CONTINUATION.is_match(line))
        .collect::<Vec<_>>()
        .join("\n")
}

/// External formatter invoked in place on a file, e.g. `clang-format -i`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormatterCommand {
    pub program: String,
    pub args: Vec<String>,
}

impl FormatterCommand {
    /// Parse a whitespace-separated command line. A bare program name gets
    /// `-i` (format in place).
    pub fn parse(command_line: &str) -> GenResult<Self> {
        let mut parts = command_line.split_whitespace().map(str::to_string);
        let program = parts
            .next()
            .ok_or_else(|| GenError::config("formatter command is empty"))?;
        let mut args: Vec<String> = parts.collect();
        if args.is_empty() {
            args.push("-i".to_string());
        }
        Ok(Self { program, args })
    }

    pub fn command_line(&self) -> String {
        std::iter::once(self.program.as_str())
            .chain(self.args.iter().map(String::as_str))
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// Format `path` in place. Any nonzero exit is fatal.
    pub fn run(&self, path: &Path) -> GenResult<()> {
        let failure = |reason: String| GenError::Formatter {
            command: self.command_line(),
            path: path.to_path_buf(),
            reason,
        };

        let output = Command::new(&self.program)
            .args(&self.args)
            .arg(path)
            .output()
            .map_err(|e| failure(format!("failed to spawn: {e}")))?;

        if output.status.success() {
            tracing::debug!(command = %self.command_line(), path = %path.display(), "formatted");
            Ok(())
        } else {
            let stderr = String::from_utf8_lossy(&output.stderr);
            Err(failure(format!("{} ({})", output.status, stderr.trim())))
        }
    }
}

impl Default for FormatterCommand {
    fn default() -> Self {
        Self {
            program: "clang-format".to_string(),
            args: vec!["-i".to_string()],
        }
    }
}

/// SHA-256 of `content`, lowercase hex.
pub fn compute_string_hash(content: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(content.as_bytes());
    format!("{:x}", hasher.finalize())
}

/// What one staged header will do to its target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeaderRecord {
    pub target: PathBuf,
    pub content: String,
    pub digest: String,
    /// Target exists with identical bytes.
    pub unchanged: bool,
    /// Previous content of the target, if any.
    pub previous: Option<String>,
}

impl HeaderRecord {
    /// Unified diff from the current target to the staged content.
    pub fn diff(&self) -> String {
        let old = self.previous.as_deref().unwrap_or_default();
        let target = self.target.display().to_string();
        TextDiff::from_lines(old, &self.content)
            .unified_diff()
            .context_radius(3)
            .header(&format!("a/{target}"), &format!("b/{target}"))
            .to_string()
    }
}

#[derive(Debug)]
struct StagedHeader {
    record: HeaderRecord,
    temp: NamedTempFile,
}

/// A target renamed over during `commit`, with the file it replaced.
struct Replaced {
    target: PathBuf,
    backup: Option<TempPath>,
}

/// All headers of one run; nothing reaches the targets before `commit`.
///
/// Headers are staged in the deepest existing directory above their target,
/// so the formatter resolves the same style files it would for the target.
/// Staging never creates directories. Dropping the transaction without
/// committing deletes every staged file and leaves the targets untouched.
#[derive(Debug)]
pub struct HeaderTransaction {
    formatter: Option<FormatterCommand>,
    staged: Vec<StagedHeader>,
    dry_run: bool,
}

impl HeaderTransaction {
    pub fn new(formatter: Option<FormatterCommand>) -> Self {
        Self {
            formatter,
            staged: Vec::new(),
            dry_run: false,
        }
    }

    /// A transaction that can only be discarded.
    pub fn dry_run(formatter: Option<FormatterCommand>) -> Self {
        Self {
            dry_run: true,
            ..Self::new(formatter)
        }
    }

    /// Write `content` to a temporary file near `target` and format it.
    pub fn stage(&mut self, target: &Path, content: &str) -> GenResult<()> {
        let dir = staging_dir(target);

        // Keep the extension so the formatter picks the right language.
        let suffix = target
            .extension()
            .map(|ext| format!(".{}", ext.to_string_lossy()))
            .unwrap_or_default();
        let mut temp = tempfile::Builder::new()
            .prefix(".headergen-")
            .suffix(&suffix)
            .tempfile_in(&dir)
            .map_err(|e| GenError::io(&dir, e))?;
        temp.write_all(content.as_bytes())
            .and_then(|()| temp.flush())
            .map_err(|e| GenError::io(temp.path(), e))?;

        if let Some(formatter) = &self.formatter {
            formatter.run(temp.path())?;
        }

        let content = fs::read_to_string(temp.path()).map_err(|e| GenError::io(temp.path(), e))?;
        let previous = match fs::read_to_string(target) {
            Ok(previous) => Some(previous),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => None,
            Err(e) => return Err(GenError::io(target, e)),
        };
        let unchanged = previous.as_deref() == Some(content.as_str());
        let digest = compute_string_hash(&content);

        tracing::debug!(path = %target.display(), digest = %digest, unchanged, "staged header");
        self.staged.push(StagedHeader {
            record: HeaderRecord {
                target: target.to_path_buf(),
                content,
                digest,
                unchanged,
                previous,
            },
            temp,
        });
        Ok(())
    }

    pub fn records(&self) -> impl Iterator<Item = &HeaderRecord> {
        self.staged.iter().map(|staged| &staged.record)
    }

    /// Staged records without touching any target; temporaries are removed.
    pub fn discard(self) -> Vec<HeaderRecord> {
        self.staged.into_iter().map(|staged| staged.record).collect()
    }

    /// Rename every changed staged file over its target.
    ///
    /// Replaced targets are kept aside until the last rename succeeds; on
    /// failure they are restored and directories created here are removed.
    pub fn commit(self) -> GenResult<Vec<HeaderRecord>> {
        if self.dry_run {
            return Err(GenError::config("a dry-run transaction cannot be committed"));
        }
        let mut created_dirs = Vec::new();
        let mut replaced = Vec::new();
        let mut committed = Vec::with_capacity(self.staged.len());
        for StagedHeader { record, temp } in self.staged {
            if !record.unchanged {
                if let Err(e) = replace_target(&record.target, temp, &mut created_dirs, &mut replaced) {
                    roll_back(replaced, &created_dirs);
                    return Err(e);
                }
                tracing::info!(path = %record.target.display(), "wrote header");
            }
            committed.push(record);
        }
        Ok(committed)
    }
}

/// Deepest existing directory containing `target`.
fn staging_dir(target: &Path) -> PathBuf {
    target
        .ancestors()
        .skip(1)
        .find(|dir| dir.as_os_str().is_empty() || dir.is_dir())
        .filter(|dir| !dir.as_os_str().is_empty())
        .map_or_else(|| PathBuf::from("."), Path::to_path_buf)
}

fn replace_target(
    target: &Path,
    temp: NamedTempFile,
    created_dirs: &mut Vec<PathBuf>,
    replaced: &mut Vec<Replaced>,
) -> GenResult<()> {
    if let Some(parent) = target.parent().filter(|parent| !parent.as_os_str().is_empty()) {
        let mut missing: Vec<PathBuf> = parent
            .ancestors()
            .take_while(|dir| !dir.as_os_str().is_empty() && !dir.exists())
            .map(Path::to_path_buf)
            .collect();
        missing.reverse();
        fs::create_dir_all(parent).map_err(|e| GenError::io(parent, e))?;
        created_dirs.extend(missing);
    }

    match_target_permissions(temp.path(), target)?;

    let backup = if target.exists() {
        let dir = staging_dir(target);
        let backup = tempfile::Builder::new()
            .prefix(".headergen-backup-")
            .tempfile_in(&dir)
            .map_err(|e| GenError::io(&dir, e))?
            .into_temp_path();
        fs::rename(target, &backup).map_err(|e| GenError::io(target, e))?;
        Some(backup)
    } else {
        None
    };
    replaced.push(Replaced {
        target: target.to_path_buf(),
        backup,
    });

    temp.persist(target)
        .map_err(|e| GenError::io(target, e.error))?;
    Ok(())
}

fn roll_back(replaced: Vec<Replaced>, created_dirs: &[PathBuf]) {
    for Replaced { target, backup } in replaced.into_iter().rev() {
        let restored = match backup {
            Some(backup) => backup.persist(&target).map_err(|e| e.error),
            None => match fs::remove_file(&target) {
                Err(e) if e.kind() != std::io::ErrorKind::NotFound => Err(e),
                _ => Ok(()),
            },
        };
        match restored {
            Ok(()) => tracing::warn!(path = %target.display(), "rolled back header"),
            Err(e) => tracing::error!(path = %target.display(), error = %e, "failed to roll back header"),
        }
    }
    // Only empty directories go; anything else was there before.
    for dir in created_dirs.iter().rev() {
        let _ = fs::remove_dir(dir);
    }
}

/// Temporary files are created owner-only; give the replacement the
/// target's mode, or 0644 for new files.
#[cfg(unix)]
fn match_target_permissions(temp: &Path, target: &Path) -> GenResult<()> {
    use std::os::unix::fs::PermissionsExt;

    let mode = fs::metadata(target)
        .map(|metadata| metadata.permissions().mode())
        .unwrap_or(0o644);
    fs::set_permissions(temp, fs::Permissions::from_mode(mode)).map_err(|e| GenError::io(temp, e))
}

#[cfg(not(unix))]
fn match_target_permissions(_temp: &Path, _target: &Path) -> GenResult<()> {
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_banner_shape() {
        let banner = banner();
        let lines: Vec<&str> = banner.lines().collect();
        assert_eq!(lines.len(), 3);
        assert!(lines.iter().all(|line| line.len() == BANNER_WIDTH));
        assert!(lines[0].starts_with("/* ---") && lines[0].ends_with("--- */"));
        assert_eq!(lines[1].trim_matches(|c| c == '/' || c == '*' || c == ' '), BANNER_TITLE);
        assert_eq!(lines[0], lines[2]);
    }

    #[test]
    fn test_normalize_strips_bare_continuation_lines() {
        let text = "/**\n * Summary.\n * \n *\n * @ingroup Read\n */";
        assert_eq!(normalize_doc_comments(text), "/**\n * Summary.\n * @ingroup Read\n */");
    }

    #[test]
    fn test_assemble_layout() {
        let skeleton = HeaderSkeleton::new("opcua").include("<cstdint>").fenced();
        let content = skeleton.assemble(&["int a;", "\nint b;\n"]);
        let expected = format!(
            "{}\n\n#pragma once\n\n#include <cstdint>\n\nnamespace opcua {{\n\n// clang-format off\n\nint a;\n\nint b;\n\n// clang-format on\n\n}}  // namespace opcua\n",
            banner()
        );
        assert_eq!(content, expected);
    }

    #[test]
    fn test_assemble_with_suppression() {
        let skeleton = HeaderSkeleton::new("opcua").suppress(DiagnosticSuppression::gcc_shadow());
        let content = skeleton.assemble(&["enum class A : uint32_t {\n};"]);
        assert!(content.contains("#pragma GCC diagnostic ignored \"-Wshadow\"\n#endif\n\nnamespace opcua {"));
        assert!(content.ends_with("}  // namespace opcua\n\n#ifndef _MSC_VER\n#pragma GCC diagnostic pop\n#endif\n"));
    }

    #[test]
    fn test_formatter_parse() {
        let bare = FormatterCommand::parse("clang-format").unwrap();
        assert_eq!(bare, FormatterCommand::default());

        let custom = FormatterCommand::parse("clang-format-17 -i --style=file").unwrap();
        assert_eq!(custom.program, "clang-format-17");
        assert_eq!(custom.args, vec!["-i", "--style=file"]);
        assert!(FormatterCommand::parse("   ").is_err());
    }

    #[test]
    fn test_uncommitted_transaction_leaves_target_alone() {
        let dir = TempDir::new().unwrap();
        let target = dir.path().join("out.hpp");
        fs::write(&target, "old\n").unwrap();

        {
            let mut transaction = HeaderTransaction::new(None);
            transaction.stage(&target, "new\n").unwrap();
            assert!(!transaction.records().next().unwrap().unchanged);
        }

        assert_eq!(fs::read_to_string(&target).unwrap(), "old\n");
        let leftovers = fs::read_dir(dir.path()).unwrap().count();
        assert_eq!(leftovers, 1);
    }

    #[test]
    fn test_commit_replaces_target() {
        let dir = TempDir::new().unwrap();
        let target = dir.path().join("nested/out.hpp");

        let mut transaction = HeaderTransaction::new(None);
        transaction.stage(&target, "new\n").unwrap();
        let committed = transaction.commit().unwrap();

        assert_eq!(committed.len(), 1);
        assert_eq!(committed[0].digest, compute_string_hash("new\n"));
        assert_eq!(fs::read_to_string(&target).unwrap(), "new\n");

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let mode = fs::metadata(&target).unwrap().permissions().mode();
            assert_eq!(mode & 0o777, 0o644);
        }
    }

    #[test]
    fn test_identical_content_is_unchanged() {
        let dir = TempDir::new().unwrap();
        let target = dir.path().join("out.hpp");
        fs::write(&target, "same\n").unwrap();

        let mut transaction = HeaderTransaction::new(None);
        transaction.stage(&target, "same\n").unwrap();
        let records = transaction.discard();
        assert!(records[0].unchanged);
        assert!(records[0].diff().lines().all(|line| !line.starts_with('+') || line.starts_with("+++")));
    }

    fn leftovers(dir: &Path) -> usize {
        fs::read_dir(dir)
            .unwrap()
            .filter(|entry| {
                entry.as_ref().unwrap().file_name().to_string_lossy().starts_with(".headergen-")
            })
            .count()
    }

    #[test]
    fn test_staging_dir_is_deepest_existing_ancestor() {
        let dir = TempDir::new().unwrap();
        fs::create_dir_all(dir.path().join("ua")).unwrap();

        assert_eq!(staging_dir(&dir.path().join("ua/nodeids.hpp")), dir.path().join("ua"));
        assert_eq!(staging_dir(&dir.path().join("services/deep/a.hpp")), dir.path());
        assert_eq!(staging_dir(Path::new("a.hpp")), PathBuf::from("."));
    }

    #[test]
    fn test_staging_creates_no_directories() {
        let dir = TempDir::new().unwrap();
        let target = dir.path().join("missing/out.hpp");

        let mut transaction = HeaderTransaction::new(None);
        transaction.stage(&target, "new\n").unwrap();
        assert!(!dir.path().join("missing").exists());
        assert_eq!(leftovers(dir.path()), 1);

        drop(transaction);
        assert_eq!(leftovers(dir.path()), 0);
    }

    #[test]
    fn test_dry_run_cannot_commit() {
        let dir = TempDir::new().unwrap();
        let target = dir.path().join("missing/out.hpp");

        let mut transaction = HeaderTransaction::dry_run(None);
        transaction.stage(&target, "new\n").unwrap();
        assert!(transaction.commit().is_err());
        assert!(!target.exists());
        assert!(!dir.path().join("missing").exists());
        assert_eq!(leftovers(dir.path()), 0);
    }

    #[test]
    fn test_failed_commit_restores_replaced_targets() {
        let dir = TempDir::new().unwrap();
        let first = dir.path().join("a/first.hpp");
        let second = dir.path().join("b/second.hpp");
        fs::create_dir_all(dir.path().join("a")).unwrap();
        fs::write(&first, "old first\n").unwrap();

        let mut transaction = HeaderTransaction::new(None);
        transaction.stage(&first, "new first\n").unwrap();
        transaction.stage(&second, "new second\n").unwrap();

        // A non-empty directory where the second header should go.
        fs::create_dir_all(second.join("blocker")).unwrap();

        assert!(transaction.commit().is_err());
        assert_eq!(fs::read_to_string(&first).unwrap(), "old first\n");
        assert!(second.is_dir());
        assert_eq!(leftovers(&dir.path().join("a")), 0);
        assert_eq!(leftovers(&dir.path().join("b")), 0);
    }

    #[test]
    fn test_failed_commit_removes_created_directories() {
        let dir = TempDir::new().unwrap();
        let first = dir.path().join("fresh/nested/first.hpp");
        let second = dir.path().join("second.hpp");

        let mut transaction = HeaderTransaction::new(None);
        transaction.stage(&first, "first\n").unwrap();
        transaction.stage(&second, "second\n").unwrap();
        fs::create_dir_all(second.join("blocker")).unwrap();

        assert!(transaction.commit().is_err());
        assert!(!dir.path().join("fresh").exists());
        assert_eq!(leftovers(dir.path()), 0);
    }

    #[test]
    fn test_diff_shows_changed_lines() {
        let record = HeaderRecord {
            target: PathBuf::from("ua/nodeids.hpp"),
            content: "a\nc\n".to_string(),
            digest: String::new(),
            unchanged: false,
            previous: Some("a\nb\n".to_string()),
        };
        let diff = record.diff();
        assert!(diff.contains("--- a/ua/nodeids.hpp"));
        assert!(diff.contains("-b\n"));
        assert!(diff.contains("+c\n"));
    }

    #[test]
    fn test_hash_is_hex_sha256() {
        assert_eq!(
            compute_string_hash(""),
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
    }
}
