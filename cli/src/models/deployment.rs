//! Deployment models

use brain_client::CreateDeploymentResponse;
use secrecy::SecretString;
use serde::{Deserialize, Serialize};

/// Where a deployment created by this process stands
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeploymentPhase {
    /// Created on the brain, stack file not uploaded yet
    Created,

    /// Stack file uploaded and the brain notified
    StackFileUploaded,
}

/// A live deployment handle, valid for the lifetime of one `deploy` run
#[derive(Debug)]
pub struct Deployment {
    /// Deployment ID
    pub id: String,

    /// Target environment name
    pub environment: String,

    /// Pre-signed stack file destination
    pub upload_url: String,

    /// Session token scoping poll requests to this deployment
    pub session_token: SecretString,

    /// Lifecycle phase
    pub phase: DeploymentPhase,
}

impl Deployment {
    /// Build a handle from the brain's create response
    pub fn created(environment: &str, response: CreateDeploymentResponse) -> Self {
        Self {
            id: response.deployment_id,
            environment: environment.to_string(),
            upload_url: response.upload_url,
            session_token: SecretString::from(response.session_token),
            phase: DeploymentPhase::Created,
        }
    }

    /// Mark the stack file as uploaded
    pub fn uploaded(self) -> Self {
        Self {
            phase: DeploymentPhase::StackFileUploaded,
            ..self
        }
    }
}
