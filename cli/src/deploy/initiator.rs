//! Deployment creation and stack file upload

use std::path::Path;

use brain_client::NotifyUploadCompleteRequest;
use tracing::warn;

use crate::deploy::upload::{upload_with_retry, Uploader};
use crate::errors::CliError;
use crate::filesys::file::File;
use crate::http::deployments::Orchestrator;
use crate::models::deployment::Deployment;
use crate::utils::RetryOptions;

/// Create a deployment for `environment`, upload `stack_file` and tell the brain.
///
/// A missing or unreadable stack file fails before any request is made. Once
/// the deployment exists the brain receives exactly one upload notification,
/// successful or not.
pub async fn create_and_upload<O, U>(
    orchestrator: &O,
    uploader: &U,
    retry_options: &RetryOptions,
    environment: &str,
    stack_file: &Path,
) -> Result<Deployment, CliError>
where
    O: Orchestrator + ?Sized,
    U: Uploader + ?Sized,
{
    let file = File::new(stack_file);
    if !file.is_file().await {
        return Err(CliError::StackFileNotFound(stack_file.to_path_buf()));
    }
    file.ensure_readable().await?;

    let response = orchestrator.create_deployment(environment).await?;
    let deployment = Deployment::created(environment, response);
    println!("Deployment {} created for {}.", deployment.id, deployment.environment);

    let uploaded = upload_with_retry(
        uploader,
        retry_options,
        stack_file,
        &deployment.upload_url,
        |attempt, e| {
            warn!(
                "Unable to upload stack file (attempt {}). Retrying request after error: {}",
                attempt, e
            );
        },
    )
    .await;

    if let Err(e) = uploaded {
        let body = NotifyUploadCompleteRequest::failed(e.to_string());
        if let Err(notify_err) = orchestrator
            .notify_stack_file_upload_completed(&deployment.id, body)
            .await
        {
            warn!(
                "Unable to notify the brain of the failed stack file upload for {}: {}",
                deployment.id, notify_err
            );
        }
        return Err(e);
    }

    println!("Stack file uploaded.");

    orchestrator
        .notify_stack_file_upload_completed(&deployment.id, NotifyUploadCompleteRequest::succeeded())
        .await?;

    println!("Brain notified of stack file upload.");

    Ok(deployment.uploaded())
}
