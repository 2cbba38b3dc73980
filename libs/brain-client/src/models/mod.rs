//! API models

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Create deployment request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateDeploymentRequest {
    pub environment_name: String,
}

/// Create deployment response
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateDeploymentResponse {
    pub deployment_id: String,
    pub upload_url: String,
    pub session_token: String,
}

/// Upload completion notification, used for both stack files and docker images
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NotifyUploadCompleteRequest {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl NotifyUploadCompleteRequest {
    pub fn succeeded() -> Self {
        Self {
            success: true,
            error: None,
        }
    }

    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            success: false,
            error: Some(error.into()),
        }
    }
}

/// Poll request body
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CliPollRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub command_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exec_token: Option<String>,
}

/// Poll response body
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CliPollResponse {
    #[serde(default)]
    pub commands: Vec<PollerQueueEntry>,
}

/// A single command queued for the CLI by the brain
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PollerQueueEntry {
    pub id: String,
    pub seq_order: i64,
    pub cmd_type: PollerQueueEntryCmdType,
    #[serde(default)]
    pub command: String,
}

/// Command type
///
/// Types this client does not know about decode to `Other` so a newer brain
/// never breaks an older CLI.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum PollerQueueEntryCmdType {
    PushDockerImage,
    UploadStaticFile,
    DeploymentFinished,
    Other(String),
}

impl PollerQueueEntryCmdType {
    pub fn as_str(&self) -> &str {
        match self {
            Self::PushDockerImage => "PUSH_DOCKER_IMAGE",
            Self::UploadStaticFile => "UPLOAD_STATIC_FILE",
            Self::DeploymentFinished => "DEPLOYMENT_FINISHED",
            Self::Other(other) => other,
        }
    }
}

impl From<String> for PollerQueueEntryCmdType {
    fn from(value: String) -> Self {
        match value.as_str() {
            "PUSH_DOCKER_IMAGE" => Self::PushDockerImage,
            "UPLOAD_STATIC_FILE" => Self::UploadStaticFile,
            "DEPLOYMENT_FINISHED" => Self::DeploymentFinished,
            _ => Self::Other(value),
        }
    }
}

impl From<PollerQueueEntryCmdType> for String {
    fn from(value: PollerQueueEntryCmdType) -> Self {
        match value {
            PollerQueueEntryCmdType::Other(other) => other,
            known => known.as_str().to_string(),
        }
    }
}

impl fmt::Display for PollerQueueEntryCmdType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Short-lived registry credentials for a single docker push
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DockerLoginResponse {
    pub url: String,
    pub user_name: String,
    pub password: String,
}

impl fmt::Debug for DockerLoginResponse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DockerLoginResponse")
            .field("url", &self.url)
            .field("user_name", &self.user_name)
            .field("password", &"[REDACTED]")
            .finish()
    }
}

/// Active deployment summary
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActiveDeployment {
    pub deployment_id: String,
    pub environment_name: String,
    pub status: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
}

/// Error response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    #[serde(default)]
    pub message: String,
}
