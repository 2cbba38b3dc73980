//! Command dispatch

use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::deploy::docker::ContainerRegistry;
use crate::deploy::pusher::{push_docker_image, report_failure};
use crate::errors::CliError;
use crate::http::deployments::Orchestrator;
use crate::models::command::{ArtifactPushRequest, Command, CommandType, DeploymentFinished};
use crate::utils::RetryOptions;

/// What the poll loop should do after a command
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Dispatched {
    /// Keep polling
    Continue,

    /// The deployment reached its end
    Finished(DeploymentFinished),
}

/// Routes polled commands to their handlers
pub struct Dispatcher {
    orchestrator: Arc<dyn Orchestrator>,
    registry: Arc<dyn ContainerRegistry>,
    retry_options: RetryOptions,
    deployment_id: String,
}

impl Dispatcher {
    /// Create a dispatcher for one deployment
    pub fn new(
        orchestrator: Arc<dyn Orchestrator>,
        registry: Arc<dyn ContainerRegistry>,
        retry_options: RetryOptions,
        deployment_id: impl Into<String>,
    ) -> Self {
        Self {
            orchestrator,
            registry,
            retry_options,
            deployment_id: deployment_id.into(),
        }
    }

    /// Handle a single command
    pub async fn dispatch(&self, command: &Command) -> Result<Dispatched, CliError> {
        debug!(
            "Dispatching command {} ({}) for {}",
            command.id, command.cmd_type, self.deployment_id
        );

        match &command.cmd_type {
            CommandType::PushDockerImage => {
                let request = match ArtifactPushRequest::decode(&command.command) {
                    Ok(request) => request,
                    Err(e) => {
                        report_failure(self.orchestrator.as_ref(), &self.deployment_id, &e).await;
                        return Err(e);
                    }
                };

                push_docker_image(
                    self.orchestrator.as_ref(),
                    self.registry.as_ref(),
                    &self.retry_options,
                    &self.deployment_id,
                    &request,
                )
                .await?;
                Ok(Dispatched::Continue)
            }
            CommandType::UploadStaticFile => {
                info!(
                    "Command {} asks for a static file upload, which is not supported yet; skipping",
                    command.id
                );
                Ok(Dispatched::Continue)
            }
            CommandType::DeploymentFinished => Ok(Dispatched::Finished(
                DeploymentFinished::decode(&command.command),
            )),
            CommandType::Other(cmd_type) => {
                warn!(
                    "Ignoring command {} of unknown type {}",
                    command.id, cmd_type
                );
                Ok(Dispatched::Continue)
            }
        }
    }
}
