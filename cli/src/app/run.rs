//! `deploy`, `watch` and `deployments` entry points

use std::path::Path;
use std::sync::Arc;

use brain_client::ActiveDeployment;
use colored::Colorize;
use futures::future::BoxFuture;
use tracing::info;

use crate::app::options::AppOptions;
use crate::deploy::dispatcher::Dispatcher;
use crate::deploy::docker::ContainerRegistry;
use crate::deploy::initiator::create_and_upload;
use crate::deploy::upload::Uploader;
use crate::errors::CliError;
use crate::http::deployments::Orchestrator;
use crate::workers::poller::{self, WaitOutcome};

/// Future that resolves when the user asks to stop
pub type ShutdownSignal = BoxFuture<'static, ()>;

/// The CLI's collaborators, wired once per invocation
pub struct App {
    orchestrator: Arc<dyn Orchestrator>,
    registry: Arc<dyn ContainerRegistry>,
    uploader: Arc<dyn Uploader>,
    options: AppOptions,
}

impl App {
    pub fn new(
        orchestrator: Arc<dyn Orchestrator>,
        registry: Arc<dyn ContainerRegistry>,
        uploader: Arc<dyn Uploader>,
        options: AppOptions,
    ) -> Self {
        Self {
            orchestrator,
            registry,
            uploader,
            options,
        }
    }

    /// Get the options
    pub fn options(&self) -> &AppOptions {
        &self.options
    }

    /// Create a deployment, upload the stack file and wait for it to finish
    pub async fn deploy(
        &self,
        environment: &str,
        stack_file: &Path,
        mut shutdown_signal: ShutdownSignal,
    ) -> Result<WaitOutcome, CliError> {
        info!(
            "Deploying {} to environment {}",
            stack_file.display(),
            environment
        );

        let deployment = tokio::select! {
            biased;
            _ = &mut shutdown_signal => return Err(CliError::Cancelled),
            deployment = create_and_upload(
                self.orchestrator.as_ref(),
                self.uploader.as_ref(),
                &self.options.retry,
                environment,
                stack_file,
            ) => deployment?,
        };

        println!("\nNow watching deployment: {}", deployment.id);
        self.wait(&deployment.id, Some(&deployment.session_token), shutdown_signal)
            .await
    }

    /// Follow an existing deployment until it finishes
    pub async fn watch(
        &self,
        deployment_id: &str,
        shutdown_signal: ShutdownSignal,
    ) -> Result<WaitOutcome, CliError> {
        println!("\nNow watching deployment: {}", deployment_id);
        self.wait(deployment_id, None, shutdown_signal).await
    }

    /// List deployments that are still running
    pub async fn list_deployments(&self) -> Result<Vec<ActiveDeployment>, CliError> {
        self.orchestrator.list_active_deployments().await
    }

    async fn wait(
        &self,
        deployment_id: &str,
        exec_token: Option<&secrecy::SecretString>,
        shutdown_signal: ShutdownSignal,
    ) -> Result<WaitOutcome, CliError> {
        let dispatcher = Dispatcher::new(
            self.orchestrator.clone(),
            self.registry.clone(),
            self.options.retry.clone(),
            deployment_id,
        );

        poller::wait(
            &self.options.poller,
            self.orchestrator.as_ref(),
            &dispatcher,
            deployment_id,
            exec_token,
            tokio::time::sleep,
            shutdown_signal,
        )
        .await
    }
}

/// Render active deployments as an aligned table
pub fn render_deployments(deployments: &[ActiveDeployment]) -> String {
    if deployments.is_empty() {
        return "No active deployments.".to_string();
    }

    let headers = ["Deployment Id", "Environment", "Status", "Created"];
    let rows: Vec<[String; 4]> = deployments
        .iter()
        .map(|d| {
            [
                d.deployment_id.clone(),
                d.environment_name.clone(),
                d.status.clone(),
                d.created_at
                    .map(|t| t.format("%Y-%m-%d %H:%M:%S UTC").to_string())
                    .unwrap_or_else(|| "-".to_string()),
            ]
        })
        .collect();

    let mut widths = headers.map(str::len);
    for row in &rows {
        for (width, cell) in widths.iter_mut().zip(row.iter()) {
            *width = (*width).max(cell.len());
        }
    }

    let mut lines = Vec::with_capacity(rows.len() + 1);
    let header = headers
        .iter()
        .zip(widths.iter())
        .map(|(h, w)| format!("{:<w$}", h, w = *w))
        .collect::<Vec<_>>()
        .join("  ");
    lines.push(header.bold().to_string());

    for row in rows {
        let line = row
            .iter()
            .zip(widths.iter())
            .map(|(cell, w)| format!("{:<w$}", cell, w = *w))
            .collect::<Vec<_>>()
            .join("  ");
        lines.push(line);
    }

    lines.join("\n")
}
