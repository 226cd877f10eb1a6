use serde::Serialize;
use std::time::Duration;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, AdvisorError>;

#[derive(Error, Debug)]
pub enum AdvisorError {
    #[error("Embedding backend error: {0}")]
    EmbeddingBackend(String),

    #[error("Cannot build an index from an empty corpus")]
    EmptyCorpus,

    #[error("Failed to load index: {0}")]
    IndexLoad(String),

    #[error("Invalid query: {0}")]
    InvalidQuery(String),

    #[error("Generation backend error: {0}")]
    GenerationBackend(String),

    #[error("Generation backend did not answer within {0:?}")]
    GenerationTimeout(Duration),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("I/O error: {0}")]
    Io(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

/// Failure payload handed to callers: the error message and nothing else.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

impl From<&AdvisorError> for ErrorResponse {
    fn from(err: &AdvisorError) -> Self {
        Self {
            error: err.to_string(),
        }
    }
}

impl From<serde_json::Error> for AdvisorError {
    fn from(err: serde_json::Error) -> Self {
        AdvisorError::Serialization(err.to_string())
    }
}

impl From<std::io::Error> for AdvisorError {
    fn from(err: std::io::Error) -> Self {
        AdvisorError::Io(err.to_string())
    }
}

impl From<csv::Error> for AdvisorError {
    fn from(err: csv::Error) -> Self {
        AdvisorError::InvalidInput(err.to_string())
    }
}

impl From<config::ConfigError> for AdvisorError {
    fn from(err: config::ConfigError) -> Self {
        AdvisorError::Configuration(err.to_string())
    }
}

impl From<anyhow::Error> for AdvisorError {
    fn from(err: anyhow::Error) -> Self {
        AdvisorError::Internal(err.to_string())
    }
}
