//! Error types for the core pipeline

use thiserror::Error;

/// Result type for core operations
pub type Result<T> = std::result::Result<T, Error>;

/// Core errors
#[derive(Error, Debug)]
pub enum Error {
    /// Scanned text matched none of the payload formats
    #[error("Could not detect a valid payment identifier: {0}")]
    InvalidPayload(String),

    /// Identifier is not a `localpart@bank` handle
    #[error("Invalid UPI handle: {0}")]
    InvalidHandle(String),

    /// Amount is not a non-negative decimal
    #[error("Invalid amount: {0}")]
    InvalidAmount(String),

    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Session storage error
    #[error("Session storage error: {0}")]
    Session(String),

    /// JSON error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
