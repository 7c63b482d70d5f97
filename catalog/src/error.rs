//! Error kinds raised by the transport and recorded by catalogs and variables.

use common::search_const::REQUEST_TIMED_OUT_CODE;
use serde::Serialize;
use thiserror::Error;

/// Failure of a single request against the catalog endpoints.
#[derive(Error, Debug)]
pub enum ApiError {
    /// The caller's cancellation token fired before a response arrived.
    #[error("request cancelled")]
    Cancelled,

    #[error("HTTP {status}: {body}")]
    Status { status: u16, body: String },

    #[error("request timed out")]
    TimedOut,

    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("invalid response body: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("invalid endpoint URL: {0}")]
    InvalidUrl(String),
}

impl ApiError {
    pub fn status(&self) -> Option<u16> {
        match self {
            ApiError::Status { status, .. } => Some(*status),
            ApiError::Transport(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, ApiError::Cancelled)
    }

    pub fn is_timeout(&self) -> bool {
        match self {
            ApiError::TimedOut => true,
            ApiError::Transport(e) => e.is_timeout(),
            other => other.status() == Some(REQUEST_TIMED_OUT_CODE),
        }
    }
}

/// User-facing error stored on a catalog after a failed (not cancelled) search.
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SearchFailure {
    #[error("Searching took too long. Consider trying a smaller area of interest or a more specific search term.")]
    TimedOut,

    #[error("Error")]
    Failed { reason: String },
}

impl SearchFailure {
    /// Classifies a transport error. Cancellation is not a failure and yields `None`.
    pub fn from_api_error(error: &ApiError) -> Option<Self> {
        if error.is_cancelled() {
            return None;
        }
        if error.is_timeout() {
            return Some(SearchFailure::TimedOut);
        }
        Some(SearchFailure::Failed { reason: error.to_string() })
    }
}

/// Error recorded on a single variable of a detail fetch.
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum VariableError {
    #[error("No values returned from API")]
    NoValuesReturned,

    /// Status 0 means no HTTP response was received.
    #[error("Error {status} during fetch")]
    FetchFailed { status: u16 },

    #[error("Variable has no valid date range")]
    MissingDateRange,
}

impl VariableError {
    pub fn from_api_error(error: &ApiError) -> Self {
        VariableError::FetchFailed { status: error.status().unwrap_or(0) }
    }

    /// Whether this error should fail the aggregate detail fetch.
    pub fn fails_fetch(&self) -> bool {
        !matches!(self, VariableError::NoValuesReturned)
    }
}

/// Aggregate outcome of a failed detail fetch.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DetailFailure {
    #[error("failed to fetch series metadata: {reason}")]
    Metadata { reason: String },

    #[error("{} of the variable fetches failed", .failed.len())]
    Values { failed: Vec<String> },
}
