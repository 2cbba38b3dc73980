//! Docker image push on behalf of the brain

use brain_client::NotifyUploadCompleteRequest;
use secrecy::SecretString;
use tracing::{info, warn};

use crate::deploy::docker::{registry_host, ContainerRegistry};
use crate::errors::CliError;
use crate::http::deployments::Orchestrator;
use crate::models::command::ArtifactPushRequest;
use crate::utils::{retry, RetryOptions};

/// Push the image named by `request` to the registry the brain hands out.
///
/// The brain is told about the outcome exactly once, whether or not the push
/// succeeded, and the push error (if any) is returned afterwards.
pub async fn push_docker_image<O, R>(
    orchestrator: &O,
    registry: &R,
    retry_options: &RetryOptions,
    deployment_id: &str,
    request: &ArtifactPushRequest,
) -> Result<(), CliError>
where
    O: Orchestrator + ?Sized,
    R: ContainerRegistry + ?Sized,
{
    println!("\nStarting process to push your docker image...");

    match push_impl(orchestrator, registry, retry_options, deployment_id, request).await {
        Ok(target) => {
            println!("\nSuccessfully pushed {}", target);
            orchestrator
                .notify_docker_upload_completed(
                    deployment_id,
                    NotifyUploadCompleteRequest::succeeded(),
                )
                .await?;
            println!("Brain notified that the docker image has been uploaded.");
            Ok(())
        }
        Err(e) => {
            report_failure(orchestrator, deployment_id, &e).await;
            Err(e)
        }
    }
}

/// Tell the brain a push failed; a failing notification is logged, not returned
pub(crate) async fn report_failure<O>(orchestrator: &O, deployment_id: &str, err: &CliError)
where
    O: Orchestrator + ?Sized,
{
    let body = NotifyUploadCompleteRequest::failed(err.to_string());
    if let Err(notify_err) = orchestrator
        .notify_docker_upload_completed(deployment_id, body)
        .await
    {
        warn!(
            "Unable to notify the brain of the failed docker upload for {}: {}",
            deployment_id, notify_err
        );
    }
}

async fn push_impl<O, R>(
    orchestrator: &O,
    registry: &R,
    retry_options: &RetryOptions,
    deployment_id: &str,
    request: &ArtifactPushRequest,
) -> Result<String, CliError>
where
    O: Orchestrator + ?Sized,
    R: ContainerRegistry + ?Sized,
{
    info!("Getting registry credentials for artifact {}", request.artifact_id);
    let credentials = orchestrator
        .get_registry_credentials(deployment_id, &request.artifact_id)
        .await?;

    let source = request.image_reference();
    let target = credentials.url;
    let username = credentials.user_name;
    let password = SecretString::from(credentials.password);

    println!("Tagging image [{}] with [{}]", source, target);
    registry.tag(&source, &target).await?;

    let host = registry_host(&target);
    let target_ref = target.as_str();
    let username_ref = username.as_str();
    let password_ref = &password;

    retry(
        retry_options,
        move |_| async move {
            registry.login(host, username_ref, password_ref).await?;
            registry.push(target_ref).await
        },
        |attempt, e| {
            warn!(
                "Unable to push docker image (attempt {}). Retrying request after error: {}",
                attempt, e
            );
        },
    )
    .await?;

    Ok(target)
}
