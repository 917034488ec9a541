//! Error types for swarmview

use thiserror::Error;

/// Result type for swarmview operations
pub type Result<T> = std::result::Result<T, SwarmViewError>;

/// swarmview error types
#[derive(Error, Debug)]
pub enum SwarmViewError {
    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Malformed payload: {0}")]
    MalformedPayload(String),

    #[error("Invalid payload: {0}")]
    InvalidPayload(String),

    #[error("Dropped task {task_id}: {reason}")]
    DanglingTask { task_id: String, reason: String },

    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("YAML error: {0}")]
    Yaml(String),
}

impl From<serde_yaml::Error> for SwarmViewError {
    fn from(err: serde_yaml::Error) -> Self {
        SwarmViewError::Yaml(err.to_string())
    }
}

impl From<url::ParseError> for SwarmViewError {
    fn from(err: url::ParseError) -> Self {
        SwarmViewError::InvalidUrl(err.to_string())
    }
}
