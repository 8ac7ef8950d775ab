//! Custom error types for the application.
//!
//! This module defines the primary error type, `EetimeError`, for the whole crate.
//! Using the `thiserror` crate, it provides a centralized and consistent way to handle
//! the different kinds of failures that can occur, from programmer I/O to malformed
//! run logs.
//!
//! ## Error Hierarchy
//!
//! `EetimeError` consolidates various error sources:
//!
//! - **`Config`**: Wraps errors from `figment`, typically TOML parse failures or type
//!   mismatches in environment overrides.
//! - **`Configuration`**: Semantic errors in configuration or options that parse fine but
//!   are logically wrong (e.g. `passes > 1` without `write_init`).
//! - **`Io`**: Wraps standard `std::io::Error`, covering all file I/O issues.
//! - **`Programmer`**: The external programmer failed (nonzero exit, missing device).
//!   Fatal, never retried.
//! - **`Timeout`**: A sampling run exceeded its wall-clock budget. The partial log is kept
//!   with a trailing `timeout` record.
//! - **`UnknownRecord`** / **`MalformedLog`** / **`Snapshot`**: A run log the reader does
//!   not understand. An unknown record tag is never silently ignored.
//! - **`InterpolationFailed`**, **`NoCompleteRuns`**, **`UnknownSerial`**, **`UnknownBulb`**,
//!   **`EraserMismatch`**: Analysis conditions. Most are recovered locally with a warning;
//!   the per-trial table generator escalates them in strict mode.
//!
//! By using `#[from]`, `EetimeError` can be created from underlying error types,
//! simplifying error handling throughout the crate with the `?` operator.

use std::path::PathBuf;
use thiserror::Error;

/// Convenience alias for results using the crate error type.
pub type AppResult<T> = std::result::Result<T, EetimeError>;

/// Every failure the library reports.
#[derive(Error, Debug)]
pub enum EetimeError {
    /// Configuration could not be loaded or parsed
    #[error("Configuration error: {0}")]
    Config(#[from] figment::Error),

    /// Configuration or options that parse but are invalid
    #[error("Configuration validation error: {0}")]
    Configuration(String),

    /// File system failure
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The programmer or device failed
    #[error("Programmer error: {0}")]
    Programmer(String),

    #[error("Timed out after {iterations} iterations ({seconds:.1} sec)")]
    /// A sampling run exceeded its timeout
    Timeout {
        /// Tick at which the timeout was detected
        iterations: u64,
        /// Elapsed seconds at that tick
        seconds: f64,
    },

    /// A record tag the reader does not understand
    #[error("{}:{line}: unrecognized record type '{tag}'", .path.display())]
    UnknownRecord {
        /// Log file
        path: PathBuf,
        /// 1-based line number
        line: usize,
        /// The unrecognized `type` value
        tag: String,
    },

    /// A log that cannot be parsed or is structurally invalid
    #[error("Malformed log {}: {reason}", .path.display())]
    MalformedLog {
        /// Log file
        path: PathBuf,
        /// What was wrong, with the line number where known
        reason: String,
    },

    /// A snapshot that does not decode
    #[error("Snapshot decode error: {0}")]
    Snapshot(String),

    /// T50 could not be interpolated
    #[error("Interpolation failed: {0}")]
    InterpolationFailed(String),

    /// No log with a footer under the given path
    #[error("No complete runs found in {}", .0.display())]
    NoCompleteRuns(PathBuf),

    /// Serial number missing from the identity table
    #[error("Failed to find sn: {0}")]
    UnknownSerial(String),

    /// Bulb without a normalization scalar
    #[error("Failed to find bulb {0}")]
    UnknownBulb(String),

    /// Trial run on an eraser other than the reference one
    #[error("Eraser '{found}' is not the reference eraser '{expected}'")]
    EraserMismatch {
        /// Configured reference eraser
        expected: String,
        /// Eraser named in the log header
        found: String,
    },

    /// JSON serialization failure
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// CSV read or write failure
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
}

impl EetimeError {
    /// Whether a batch operation may log this error and move on to the next entry.
    ///
    /// Device, I/O and format errors are never recoverable: they indicate a broken
    /// environment or a log the reader does not understand.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            EetimeError::InterpolationFailed(_)
                | EetimeError::NoCompleteRuns(_)
                | EetimeError::UnknownSerial(_)
                | EetimeError::UnknownBulb(_)
                | EetimeError::EraserMismatch { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn timeout_message_names_iterations_and_seconds() {
        let err = EetimeError::Timeout {
            iterations: 7,
            seconds: 5.4,
        };
        assert_eq!(err.to_string(), "Timed out after 7 iterations (5.4 sec)");
    }

    #[test]
    fn unknown_record_message_names_file_and_line() {
        let err = EetimeError::UnknownRecord {
            path: PathBuf::from("run/iter_01.jl"),
            line: 3,
            tag: "bogus".into(),
        };
        assert_eq!(
            err.to_string(),
            "run/iter_01.jl:3: unrecognized record type 'bogus'"
        );
    }

    #[test]
    fn analysis_errors_are_recoverable() {
        assert!(EetimeError::UnknownSerial("ABC".into()).is_recoverable());
        assert!(EetimeError::NoCompleteRuns(PathBuf::from("d")).is_recoverable());
        assert!(!EetimeError::Programmer("exit 1".into()).is_recoverable());
        assert!(!EetimeError::Snapshot("bad hex".into()).is_recoverable());
    }
}
