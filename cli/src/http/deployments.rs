//! Deployment API client

use async_trait::async_trait;
use brain_client::{
    ActiveDeployment, CliPollRequest, CliPollResponse, CreateDeploymentRequest,
    CreateDeploymentResponse, DockerLoginResponse, NotifyUploadCompleteRequest, PollerQueueEntry,
};
use http::{Method, StatusCode};
use serde::Deserialize;
use tracing::debug;

use crate::errors::CliError;
use crate::http::client::{ensure_success, HttpClient};

/// Outcome of a poll request
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PollResponse {
    /// Commands queued since the cursor, possibly none
    Commands(Vec<PollerQueueEntry>),

    /// The brain answered 409: the deployment already reached a terminal state
    Conflict,
}

/// The brain's deployment API, as used by `deploy` and `watch`
#[async_trait]
pub trait Orchestrator: Send + Sync {
    /// Create a deployment for an environment
    async fn create_deployment(
        &self,
        environment_name: &str,
    ) -> Result<CreateDeploymentResponse, CliError>;

    /// Report the outcome of the stack file upload
    async fn notify_stack_file_upload_completed(
        &self,
        deployment_id: &str,
        body: NotifyUploadCompleteRequest,
    ) -> Result<(), CliError>;

    /// Report the outcome of a docker image push
    async fn notify_docker_upload_completed(
        &self,
        deployment_id: &str,
        body: NotifyUploadCompleteRequest,
    ) -> Result<(), CliError>;

    /// Ask for commands queued after `body.command_id`
    async fn poll_for_commands(
        &self,
        deployment_id: &str,
        body: CliPollRequest,
    ) -> Result<PollResponse, CliError>;

    /// Exchange an artifact id for short-lived registry credentials
    async fn get_registry_credentials(
        &self,
        deployment_id: &str,
        artifact_id: &str,
    ) -> Result<DockerLoginResponse, CliError>;

    /// List deployments that have not finished yet
    async fn list_active_deployments(&self) -> Result<Vec<ActiveDeployment>, CliError>;
}

/// List of deployments response
#[derive(Debug, Clone, Deserialize)]
pub struct DeploymentListResponse {
    pub deployments: Vec<ActiveDeployment>,
}

#[async_trait]
impl Orchestrator for HttpClient {
    async fn create_deployment(
        &self,
        environment_name: &str,
    ) -> Result<CreateDeploymentResponse, CliError> {
        let body = CreateDeploymentRequest {
            environment_name: environment_name.to_string(),
        };
        self.post("/api/cli/deployment", &body).await
    }

    async fn notify_stack_file_upload_completed(
        &self,
        deployment_id: &str,
        body: NotifyUploadCompleteRequest,
    ) -> Result<(), CliError> {
        let path = format!("/api/cli/deployment/{}/stack-file/complete", deployment_id);
        self.post_no_content(&path, &body).await
    }

    async fn notify_docker_upload_completed(
        &self,
        deployment_id: &str,
        body: NotifyUploadCompleteRequest,
    ) -> Result<(), CliError> {
        let path = format!("/api/cli/deployment/{}/docker/complete", deployment_id);
        self.post_no_content(&path, &body).await
    }

    async fn poll_for_commands(
        &self,
        deployment_id: &str,
        body: CliPollRequest,
    ) -> Result<PollResponse, CliError> {
        let path = format!("/api/cli/deployment/{}/poll", deployment_id);
        let response = self.post_raw(&path, &body).await?;

        if response.status() == StatusCode::CONFLICT {
            debug!("Poll for {} answered with 409", deployment_id);
            return Ok(PollResponse::Conflict);
        }

        let response = ensure_success(Method::POST, response).await?;
        let text = response.text().await?;
        if text.trim().is_empty() {
            return Ok(PollResponse::Commands(Vec::new()));
        }

        let body: CliPollResponse = serde_json::from_str(&text)
            .map_err(|e| CliError::DecodeError(format!("poll response: {}", e)))?;
        Ok(PollResponse::Commands(body.commands))
    }

    async fn get_registry_credentials(
        &self,
        deployment_id: &str,
        artifact_id: &str,
    ) -> Result<DockerLoginResponse, CliError> {
        let path = format!(
            "/api/cli/deployment/{}/artifact/{}/docker-login",
            deployment_id, artifact_id
        );
        self.get(&path).await
    }

    async fn list_active_deployments(&self) -> Result<Vec<ActiveDeployment>, CliError> {
        let response: DeploymentListResponse = self.get("/api/cli/deployments").await?;
        Ok(response.deployments)
    }
}
