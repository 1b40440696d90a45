// Central Error Type for the orchestrator

use thiserror::Error;

use crate::domain::ConfigurationError;

/// Application-level error type
#[derive(Error, Debug)]
pub enum MatrixError {
    #[error("Domain error: {0}")]
    Domain(#[from] crate::domain::DomainError),

    #[error("Configuration error: {0}")]
    Configuration(#[from] ConfigurationError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Result type alias using MatrixError
pub type Result<T> = std::result::Result<T, MatrixError>;
