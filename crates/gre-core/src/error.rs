//! Unified error types for the rating and contingency engines.
//!
//! This module provides a common error type [`GridError`] that can represent
//! errors from any part of the system. Domain-specific error types can be
//! converted to `GridError` for uniform handling at API boundaries.
//!
//! Invalid input identifiers are the only hard failures in the core; see
//! [`GridError::UnknownLines`], which carries the full valid-name set so a
//! caller can repair the request without a second round trip.

use thiserror::Error;

/// Unified error type for all engine operations.
#[derive(Error, Debug)]
pub enum GridError {
    /// I/O errors (file access, etc.)
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Parsing/deserialization errors
    #[error("Parse error: {0}")]
    Parse(String),

    /// Data validation errors (malformed weather ranges, bad hour index, ...)
    #[error("Validation error: {0}")]
    Validation(String),

    /// Outage request naming lines that do not exist in the topology.
    ///
    /// Rejected before any solve is attempted; no partial simulation runs.
    #[error("Unknown line name(s) {unknown:?}; valid lines are {valid:?}")]
    UnknownLines {
        unknown: Vec<String>,
        valid: Vec<String>,
    },

    /// Flow-solver errors (both solve modes failed outright)
    #[error("Solver error: {0}")]
    Solver(String),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Network structure errors
    #[error("Network error: {0}")]
    Network(String),

    /// Generic errors (for wrapping external errors)
    #[error("{0}")]
    Other(String),
}

/// Convenience type alias for Results using GridError.
pub type GridResult<T> = Result<T, GridError>;

// Conversion from anyhow::Error
impl From<anyhow::Error> for GridError {
    fn from(err: anyhow::Error) -> Self {
        GridError::Other(err.to_string())
    }
}

// Conversion from string-like types for convenience
impl From<String> for GridError {
    fn from(s: String) -> Self {
        GridError::Other(s)
    }
}

impl From<&str> for GridError {
    fn from(s: &str) -> Self {
        GridError::Other(s.to_string())
    }
}

// JSON parsing errors
impl From<serde_json::Error> for GridError {
    fn from(err: serde_json::Error) -> Self {
        GridError::Parse(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = GridError::Solver("both solve modes failed".into());
        assert!(err.to_string().contains("Solver error"));
        assert!(err.to_string().contains("both solve modes failed"));
    }

    #[test]
    fn test_unknown_lines_lists_valid_set() {
        let err = GridError::UnknownLines {
            unknown: vec!["L99".into()],
            valid: vec!["L1".into(), "L2".into()],
        };
        let message = err.to_string();
        assert!(message.contains("L99"));
        assert!(message.contains("L1"));
        assert!(message.contains("L2"));
    }

    #[test]
    fn test_io_error_conversion() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let grid_err: GridError = io_err.into();
        assert!(matches!(grid_err, GridError::Io(_)));
    }

    #[test]
    fn test_question_mark_operator() {
        fn inner() -> GridResult<()> {
            Err(GridError::Validation("test".into()))
        }

        fn outer() -> GridResult<()> {
            inner()?;
            Ok(())
        }

        assert!(outer().is_err());
    }
}
