//! Error types for the risk engine

use thiserror::Error;

/// Risk engine error
#[derive(Debug, Error)]
pub enum Error {
    /// Payload, handle or gate error from the core crate
    #[error(transparent)]
    Core(#[from] payguard_core::Error),

    /// Remote estimator did not answer in time
    #[error("Risk estimation timed out after {millis}ms")]
    EstimationTimeout {
        /// Budget that was exceeded
        millis: u64,
    },

    /// Scoring service answered with a non-2xx status
    #[error("Scoring service error {status_code}: {message}")]
    RemoteStatus {
        /// HTTP status code
        status_code: u16,
        /// Response body
        message: String,
    },

    /// Scoring service answered with something we cannot use
    #[error("Malformed scoring response: {0}")]
    MalformedResponse(String),

    /// Transport failure
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Caller abandoned the assessment
    #[error("Assessment cancelled")]
    Cancelled,

    /// Analysis channel failure
    #[error("Analysis channel error: {0}")]
    Channel(String),

    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Short label for the fallback metric
    pub fn fallback_reason(&self) -> &'static str {
        match self {
            Error::EstimationTimeout { .. } => "timeout",
            Error::RemoteStatus { .. } => "status",
            Error::MalformedResponse(_) | Error::Json(_) => "malformed",
            Error::Http(e) if e.is_timeout() => "timeout",
            Error::Http(_) => "unreachable",
            _ => "other",
        }
    }
}

/// Result type
pub type Result<T> = std::result::Result<T, Error>;
