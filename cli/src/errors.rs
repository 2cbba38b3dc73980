//! Error types for the NoOps CLI

use std::path::PathBuf;

use thiserror::Error;

/// Main error type for the NoOps CLI
#[derive(Error, Debug)]
pub enum CliError {
    #[error("Stack file not found: {}", .0.display())]
    StackFileNotFound(PathBuf),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("HTTP error: {0}")]
    HttpError(#[from] reqwest::Error),

    #[error("API error: {status}: {body}")]
    ApiError { status: u16, body: String },

    #[error("Upload error: {0}")]
    UploadError(String),

    #[error("Registry error: {0}")]
    RegistryError(String),

    #[error("Decode error: {0}")]
    DecodeError(String),

    #[error("Timed out after {0:?} waiting for the deployment to finish")]
    Timeout(std::time::Duration),

    #[error("Cancelled while waiting for the deployment")]
    Cancelled,

    #[error("Deployment failed: {0}")]
    DeploymentFailed(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<anyhow::Error> for CliError {
    fn from(err: anyhow::Error) -> Self {
        CliError::Internal(err.to_string())
    }
}
