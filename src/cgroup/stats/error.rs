//! Defines structured error types for parsing cgroup statistics.
//!
//! [`StatParseError`] describes why the content of a single counter file was rejected. Parsers
//! never fall back to a default value: a counter that is not a base-10 unsigned integer is an
//! error, so a report can never silently contain a fabricated zero.
//!
//! # Example
//!
//! ```rust
//! use cgroup_stats::cgroup::stats::{parse_u64_value, StatParseError};
//!
//! let err = parse_u64_value(&mut "not-a-number\n".as_bytes()).unwrap_err();
//! assert!(matches!(err, StatParseError::InvalidValue { .. }));
//! ```

use std::num::ParseIntError;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum StatParseError {
    #[error("duplicate field '{field}' at line {line}")]
    DuplicateField { field: String, line: usize },

    #[error("invalid value for '{key}' at line {line}: '{value}': {source}")]
    InvalidKeyValue {
        key: String,
        value: String,
        line: usize,
        #[source]
        source: ParseIntError,
    },

    #[error("invalid value at line {line}: '{value}': {source}")]
    InvalidValue {
        value: String,
        line: usize,
        #[source]
        source: ParseIntError,
    },

    #[error("missing value for '{key}' at line {line}")]
    MissingValue { key: String, line: usize },

    #[error("sum of '{key}' overflows at line {line}")]
    Overflow { key: String, line: usize },

    #[error("unexpected trailing content at line {line}: '{content}'")]
    TrailingContent { content: String, line: usize },

    #[error("error during I/O: {0}")]
    Io(#[from] std::io::Error),
}

impl StatParseError {
    /// Line number (1-based) the error refers to, if any.
    pub fn line(&self) -> Option<usize> {
        match self {
            StatParseError::DuplicateField { line, .. }
            | StatParseError::InvalidKeyValue { line, .. }
            | StatParseError::InvalidValue { line, .. }
            | StatParseError::MissingValue { line, .. }
            | StatParseError::Overflow { line, .. }
            | StatParseError::TrailingContent { line, .. } => Some(*line),
            StatParseError::Io(_) => None,
        }
    }
}

/// Error that occurs while reading the counters of one subsystem.
#[derive(Debug, Error)]
pub enum Error {
    #[error("failed to read `{subsystem}` counters: {source}")]
    Open {
        subsystem: &'static str,
        #[source]
        source: crate::fsutil::FileOpenError,
    },
    #[error("failed to parse `{path}` for subsystem `{subsystem}`: {source}")]
    Parse {
        subsystem: &'static str,
        path: std::path::PathBuf,
        #[source]
        source: StatParseError,
    },
}

impl Error {
    /// Name of the subsystem whose counters could not be read.
    pub fn subsystem(&self) -> &'static str {
        match self {
            Error::Open { subsystem, .. } | Error::Parse { subsystem, .. } => *subsystem,
        }
    }
}
