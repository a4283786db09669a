//! Line-oriented schema files.
//!
//! A schema file lists one type name per line. Blank lines are ignored and
//! duplicates collapse to their first occurrence. A file may be tied to a
//! guard symbol, in which case everything derived from it is emitted inside
//! `#ifdef <GUARD>`.

use crate::codegen::descriptor::is_identifier;
use crate::error::{GenError, GenResult};
use indexmap::IndexSet;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Reference to a schema file plus its optional guard symbol.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchemaSource {
    pub file: PathBuf,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub guard: Option<String>,
}

impl SchemaSource {
    pub fn new(file: impl Into<PathBuf>) -> Self {
        Self {
            file: file.into(),
            guard: None,
        }
    }

    pub fn guarded(file: impl Into<PathBuf>, guard: impl Into<String>) -> Self {
        Self {
            file: file.into(),
            guard: Some(guard.into()),
        }
    }

    /// Resolve a relative file against `schema_dir`.
    pub fn resolve(&self, schema_dir: &Path) -> Self {
        let file = if self.file.is_absolute() {
            self.file.clone()
        } else {
            schema_dir.join(&self.file)
        };
        Self {
            file,
            guard: self.guard.clone(),
        }
    }

    pub fn validate(&self) -> GenResult<()> {
        match self.guard.as_deref() {
            Some(guard) if !is_identifier(guard) => Err(GenError::config(format!(
                "guard symbol {guard:?} for schema file {} is not a preprocessor identifier",
                self.file.display()
            ))),
            _ => Ok(()),
        }
    }
}

/// Identifiers loaded from one schema file, deduplicated in encounter order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchemaFile {
    pub path: PathBuf,
    pub guard: Option<String>,
    pub identifiers: Vec<String>,
}

impl SchemaFile {
    /// Build from file contents without touching the filesystem.
    pub fn parse(source: &SchemaSource, contents: &str) -> Self {
        let identifiers: IndexSet<&str> = contents
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .collect();

        Self {
            path: source.file.clone(),
            guard: source.guard.clone(),
            identifiers: identifiers.into_iter().map(str::to_string).collect(),
        }
    }

    pub fn is_guarded(&self) -> bool {
        self.guard.is_some()
    }
}

pub fn load_schema_file(source: &SchemaSource) -> GenResult<SchemaFile> {
    source.validate()?;
    let contents = fs::read_to_string(&source.file).map_err(|source_err| GenError::SchemaRead {
        path: source.file.clone(),
        source: source_err,
    })?;
    let file = SchemaFile::parse(source, &contents);
    tracing::debug!(
        path = %file.path.display(),
        guard = file.guard.as_deref().unwrap_or("-"),
        identifiers = file.identifiers.len(),
        "loaded schema file"
    );
    Ok(file)
}

/// Load every source in order. The first failure aborts.
pub fn load_schema_files(sources: &[SchemaSource]) -> GenResult<Vec<SchemaFile>> {
    sources.iter().map(load_schema_file).collect()
}
