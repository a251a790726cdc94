//! Error types for the orchestrator

use thiserror::Error;

/// Result type alias using our custom Error
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for the orchestrator
#[derive(Error, Debug)]
pub enum Error {
    // Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),

    // External data errors
    #[error("Oracle request failed: {0}")]
    Oracle(String),

    #[error("Oracle timeout after {0}ms")]
    OracleTimeout(u64),

    #[error("Risk service error: {0}")]
    RiskService(String),

    #[error("Malformed risk response: {0}")]
    RiskResponseMalformed(String),

    // Feed errors
    #[error("Feed connection failed: {0}")]
    FeedConnection(String),

    #[error("Feed disconnected")]
    FeedDisconnected,

    #[error("Feed decode error: {0}")]
    FeedDecode(String),

    // Execution channel errors
    #[error("Order transport error: {0}")]
    OrderTransport(String),

    #[error("Order send timeout after {0}ms")]
    OrderTimeout(u64),

    // Position store errors
    #[error("Position already open: {0}")]
    PositionOpen(String),

    #[error("Position not found: {0}")]
    PositionNotFound(String),

    // Serialization errors
    #[error("Serialization error: {0}")]
    Serialization(String),

    // I/O errors
    #[error("I/O error: {0}")]
    Io(String),

    // Generic errors
    #[error("Internal error: {0}")]
    Internal(String),

    #[error(transparent)]
    Anyhow(#[from] anyhow::Error),
}

impl Error {
    /// Check if this error is retryable (transient)
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Error::Oracle(_)
                | Error::OracleTimeout(_)
                | Error::FeedConnection(_)
                | Error::FeedDisconnected
                | Error::OrderTransport(_)
                | Error::OrderTimeout(_)
        )
    }

    /// Check if this error marks an invariant the store refused to break
    pub fn is_invariant_rejection(&self) -> bool {
        matches!(self, Error::PositionOpen(_))
    }
}

// Conversion from serde_json errors
impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Serialization(e.to_string())
    }
}

// Conversion from I/O errors
impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Self {
        Error::Io(e.to_string())
    }
}

// Conversion from reqwest errors
impl From<reqwest::Error> for Error {
    fn from(e: reqwest::Error) -> Self {
        Error::Oracle(e.to_string())
    }
}
