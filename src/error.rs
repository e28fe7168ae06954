//! Unified error handling for the searchvol crate
//!
//! This module provides a unified error type that consolidates the
//! domain-specific errors into a single `Error` enum, while keeping the
//! domain errors available where callers need to match on them.
//!
//! # Architecture
//!
//! - [`ErrorCategory`] - Classification of errors for handling strategies
//! - [`Error`] - Unified error enum wrapping all domain-specific errors
//!
//! # Usage
//!
//! ```rust,ignore
//! use searchvol::error::{Error, ErrorCategory};
//!
//! fn handle_error(err: Error) {
//!     if err.category() == ErrorCategory::Config {
//!         eprintln!("Fix your configuration: {err}");
//!     }
//! }
//! ```

use std::io;
use thiserror::Error;

pub use crate::utils::error::{FetchError, JobError};

/// Classification of errors for handling strategies
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCategory {
    /// Network-related errors (HTTP, timeout, bad status)
    Network,
    /// Response decoding errors
    Parsing,
    /// Job lookup errors surfaced to clients
    Job,
    /// Configuration and validation errors
    Config,
    /// File and stream I/O errors
    Io,
}

impl ErrorCategory {
    /// Human readable description for the category
    pub fn description(&self) -> &'static str {
        match self {
            Self::Network => "network error",
            Self::Parsing => "parsing error",
            Self::Job => "job error",
            Self::Config => "configuration error",
            Self::Io => "I/O error",
        }
    }
}

/// Unified error type for the searchvol crate
#[derive(Error, Debug)]
pub enum Error {
    /// Keyword tool fetch errors
    #[error("Fetch error: {0}")]
    Fetch(#[from] FetchError),

    /// Job store errors
    #[error("Job error: {0}")]
    Job(#[from] JobError),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// HTTP client errors
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Configuration errors
    #[error("Config error: {0}")]
    Config(String),
}

impl Error {
    /// Create a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Check if this error is recoverable (a later attempt may succeed)
    pub fn is_recoverable(&self) -> bool {
        match self {
            Self::Fetch(e) => !matches!(e, FetchError::InvalidHeader(_)),
            Self::Http(_) => true,
            Self::Io(_) => true,
            Self::Job(_) => false,
            Self::Json(_) => false,
            Self::Config(_) => false,
        }
    }

    /// Get the error category for handling strategies
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::Fetch(FetchError::EmptyResult | FetchError::Malformed(_)) => {
                ErrorCategory::Parsing
            }
            Self::Fetch(_) | Self::Http(_) => ErrorCategory::Network,
            Self::Job(_) => ErrorCategory::Job,
            Self::Json(_) => ErrorCategory::Parsing,
            Self::Io(_) => ErrorCategory::Io,
            Self::Config(_) => ErrorCategory::Config,
        }
    }
}

/// Result type alias using the unified Error type
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_category() {
        let fetch_err = Error::Fetch(FetchError::Timeout);
        assert_eq!(fetch_err.category(), ErrorCategory::Network);

        let shape_err = Error::Fetch(FetchError::Malformed("no list".into()));
        assert_eq!(shape_err.category(), ErrorCategory::Parsing);

        let job_err = Error::Job(JobError::NotFound("abc".into()));
        assert_eq!(job_err.category(), ErrorCategory::Job);
    }

    #[test]
    fn test_is_recoverable() {
        assert!(Error::Fetch(FetchError::ServerError(503)).is_recoverable());
        assert!(!Error::Job(JobError::NotFound("abc".into())).is_recoverable());
        assert!(!Error::Job(JobError::NotCompleted("abc".into())).is_recoverable());
    }

    #[test]
    fn test_error_conversion() {
        let unified: Error = JobError::NotFound("x".into()).into();
        assert!(matches!(unified, Error::Job(JobError::NotFound(_))));
    }

    #[test]
    fn test_config_error() {
        let err = Error::config("SECRET_KEY is not set");
        assert_eq!(err.category(), ErrorCategory::Config);
        assert!(!err.is_recoverable());
        assert_eq!(err.to_string(), "Config error: SECRET_KEY is not set");
    }

    #[test]
    fn test_invalid_header_not_recoverable() {
        let err = Error::Fetch(FetchError::InvalidHeader("bad\nvalue".into()));
        assert!(!err.is_recoverable());
        assert_eq!(err.category(), ErrorCategory::Network);
        assert_eq!(ErrorCategory::Network.description(), "network error");
    }
}
