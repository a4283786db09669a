//! Error types for header generation.
//!
//! Every stage of the generator fails fast with a [`GenError`]. Errors are never
//! retried or masked; they carry enough context (file, row, URL, command) for a
//! developer to fix the input and rerun the generator by hand.

use std::fmt;
use std::io;
use std::path::PathBuf;
use thiserror::Error;

pub type GenResult<T> = std::result::Result<T, GenError>;

/// Failure of one generator stage.
#[derive(Debug, Error)]
pub enum GenError {
    /// Invalid descriptor table, guard symbol, target selection or config file.
    #[error("configuration error: {0}")]
    Configuration(String),

    #[error("failed to read schema file {}: {source}", path.display())]
    SchemaRead {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to fetch {url}: {reason}")]
    Network { url: String, reason: String },

    /// A node id row that is not exactly `name,id,category`.
    #[error("malformed row {row} in node id table ({line:?}): {reason}")]
    MalformedRow {
        row: usize,
        line: String,
        reason: String,
    },

    #[error("failed to render template '{name}': {source}")]
    Template {
        name: String,
        #[source]
        source: tera::Error,
    },

    #[error("formatter `{command}` failed on {}: {reason}", path.display())]
    Formatter {
        command: String,
        path: PathBuf,
        reason: String,
    },

    #[error("I/O error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl GenError {
    pub fn config(message: impl Into<String>) -> Self {
        GenError::Configuration(message.into())
    }

    pub fn io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        GenError::Io {
            path: path.into(),
            source,
        }
    }

    /// Coarse classification used in logs and the generation report.
    pub fn kind(&self) -> ErrorKind {
        match self {
            GenError::Configuration(_) => ErrorKind::Configuration,
            GenError::SchemaRead { .. } => ErrorKind::SchemaRead,
            GenError::Network { .. } | GenError::MalformedRow { .. } => ErrorKind::Network,
            GenError::Template { .. } => ErrorKind::Template,
            GenError::Formatter { .. } => ErrorKind::Formatter,
            GenError::Io { .. } => ErrorKind::Io,
        }
    }
}

/// Error taxonomy of the generator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    Configuration,
    SchemaRead,
    Network,
    Template,
    Formatter,
    Io,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::Configuration => "configuration_error",
            ErrorKind::SchemaRead => "schema_read_error",
            ErrorKind::Network => "network_error",
            ErrorKind::Template => "template_error",
            ErrorKind::Formatter => "formatter_error",
            ErrorKind::Io => "io_error",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
