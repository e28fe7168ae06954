//! Error types for the lookup pipeline
//!
//! This module defines the domain-specific error types used by the
//! keyword tool client and the job store.

use thiserror::Error;

/// Errors that can occur while querying the keyword tool API
///
/// None of these ever reach a job's result set: the client absorbs them
/// into a zero-valued fallback and only keeps them for logging and metrics.
#[derive(Error, Debug)]
pub enum FetchError {
    /// HTTP request error
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// Non-success status code
    #[error("Server error: {0}")]
    ServerError(u16),

    /// Request timeout
    #[error("Request timeout")]
    Timeout,

    /// Response carried no keyword list, or an empty one
    #[error("Empty keyword list in response")]
    EmptyResult,

    /// Response body did not have the expected shape
    #[error("Malformed response: {0}")]
    Malformed(String),

    /// Header value could not be encoded
    #[error("Invalid header value: {0}")]
    InvalidHeader(String),
}

impl FetchError {
    /// Short label used for metrics and structured logs
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Http(_) => "http",
            Self::ServerError(_) => "status",
            Self::Timeout => "timeout",
            Self::EmptyResult => "empty",
            Self::Malformed(_) => "malformed",
            Self::InvalidHeader(_) => "invalid_header",
        }
    }
}

/// Errors returned by job lookups
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum JobError {
    /// No job was ever created with this id
    #[error("Job not found: {0}")]
    NotFound(String),

    /// The job exists but has not reached `completed` yet
    #[error("Job not completed yet: {0}")]
    NotCompleted(String),
}
