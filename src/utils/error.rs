//! Error handling for tuberename

use thiserror::Error;

/// Main error type for tuberename
#[derive(Debug, Error)]
pub enum RenameError {
    #[error("Network error: {0}")]
    NetworkError(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("Metadata source returned HTTP {0}")]
    HttpStatus(reqwest::StatusCode),

    #[error("Metadata unavailable: {0}")]
    MetadataUnavailable(String),

    #[error("Invalid configuration: {0}")]
    ConfigError(String),

    #[error("Verification failed: {0}")]
    VerificationFailed(String),
}
