//! Command models

use serde::{Deserialize, Serialize};

use crate::errors::CliError;

pub use brain_client::{PollerQueueEntry as Command, PollerQueueEntryCmdType as CommandType};

/// Payload of a `PUSH_DOCKER_IMAGE` command
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ArtifactPushRequest {
    /// Artifact the registry credentials are issued for
    pub artifact_id: String,

    /// Local image name
    #[serde(rename = "img")]
    pub image: String,

    /// Local image tag
    pub tag: String,
}

impl ArtifactPushRequest {
    /// Decode the payload of a push command
    pub fn decode(payload: &str) -> Result<Self, CliError> {
        serde_json::from_str(payload)
            .map_err(|e| CliError::DecodeError(format!("push docker image command: {}", e)))
    }

    /// Local image reference, `image:tag`
    pub fn image_reference(&self) -> String {
        if self.tag.is_empty() {
            self.image.clone()
        } else {
            format!("{}:{}", self.image, self.tag)
        }
    }
}

/// Payload of a `DEPLOYMENT_FINISHED` command
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeploymentFinished {
    /// Final deployment status as reported by the brain
    #[serde(default)]
    pub status: Option<String>,

    /// Failure reason, if any
    #[serde(default)]
    pub error: Option<String>,
}

const FAILED_STATUSES: [&str; 4] = ["FAILED", "FAILURE", "ERROR", "ROLLED_BACK"];

impl DeploymentFinished {
    /// Decode the payload of a finished command
    ///
    /// Anything that is not a JSON object counts as a plain "finished".
    pub fn decode(payload: &str) -> Self {
        serde_json::from_str(payload).unwrap_or_default()
    }

    /// Whether the final state is a failure
    pub fn is_failure(&self) -> bool {
        self.status
            .as_deref()
            .map(|status| {
                FAILED_STATUSES
                    .iter()
                    .any(|failed| failed.eq_ignore_ascii_case(status))
            })
            .unwrap_or(false)
    }

    /// Human readable failure reason
    pub fn failure_reason(&self) -> String {
        match (&self.status, &self.error) {
            (_, Some(error)) => error.clone(),
            (Some(status), None) => format!("deployment finished with status {}", status),
            (None, None) => "deployment finished unsuccessfully".to_string(),
        }
    }
}
