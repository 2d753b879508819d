//! Error taxonomy of the loading and derivation layer.
//!
//! Loading-stage failures ([`LoadErrorKind`]) abort a whole reload and are
//! reported together with the dataset that caused them.  [`DeriveError`] is a
//! wiring mistake at the call site (a chart bound to a missing dataset or to a
//! missing or non-numeric column) and is not worth retrying.

use std::path::PathBuf;

use thiserror::Error;

/// What went wrong while reading or coercing one dataset.
#[derive(Error, Debug)]
pub enum LoadErrorKind {
    /// The file is missing, unreadable, or did not arrive in time.
    #[error("cannot read {}: {reason}", path.display())]
    SourceNotFound { path: PathBuf, reason: String },

    /// Header/row field-count mismatch, bad quoting, invalid encoding.
    #[error("malformed table {}{}: {reason}", path.display(), line.map(|l| format!(" (line {l})")).unwrap_or_default())]
    MalformedTable {
        path: PathBuf,
        line: Option<u64>,
        reason: String,
    },

    /// A declared numeric cell did not parse.
    #[error("column '{column}', row {row}: cannot parse '{text}' as {expected}")]
    TypeCoercionError {
        column: String,
        row: usize,
        text: String,
        expected: crate::data::model::ColumnType,
    },

    /// Header columns disagree with the declared schema.
    #[error("schema mismatch (missing: [{}], unexpected: [{}])", missing.join(", "), unexpected.join(", "))]
    SchemaMismatch {
        missing: Vec<String>,
        unexpected: Vec<String>,
    },
}

/// A failed load, tagged with the dataset it happened in.  The cause is
/// reachable through [`std::error::Error::source`] and is not repeated in the
/// message.
#[derive(Error, Debug)]
#[error("failed to load dataset '{dataset}'")]
pub struct LoadError {
    pub dataset: String,
    #[source]
    pub kind: LoadErrorKind,
}

impl LoadError {
    pub fn new(dataset: impl Into<String>, kind: LoadErrorKind) -> Self {
        LoadError {
            dataset: dataset.into(),
            kind,
        }
    }
}

/// Misuse of a derivation function.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DeriveError {
    #[error("invalid key '{key}': {reason}")]
    InvalidKey { key: String, reason: String },

    /// A view asked for a dataset the snapshot does not hold.
    #[error("no dataset named '{0}' in the snapshot")]
    UnknownDataset(String),
}

impl DeriveError {
    pub(crate) fn absent(key: &str) -> Self {
        DeriveError::InvalidKey {
            key: key.to_string(),
            reason: "no such column".to_string(),
        }
    }

    pub(crate) fn not_numeric(key: &str) -> Self {
        DeriveError::InvalidKey {
            key: key.to_string(),
            reason: "column is not numeric".to_string(),
        }
    }
}

/// `snapshot()` was called before the first successful reload.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
#[error("no snapshot loaded yet")]
pub struct NotLoaded;

/// Bad configuration value or file.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("cannot read config file {}", path.display())]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("cannot parse config file {}", path.display())]
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },

    #[error("invalid value for {var}: '{value}'")]
    InvalidEnv { var: String, value: String },
}
