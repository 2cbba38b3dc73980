//! Stack file upload to a pre-signed URL

use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::{header, Client, StatusCode};
use tracing::debug;

use crate::errors::CliError;
use crate::filesys::file::File;
use crate::utils::{retry, RetryOptions};

/// Uploads a local file to a destination URL
#[async_trait]
pub trait Uploader: Send + Sync {
    /// Upload `path` to `destination_url` in a single attempt
    async fn upload(&self, path: &Path, destination_url: &str) -> Result<(), CliError>;
}

/// [`Uploader`] issuing a plain HTTP PUT, as expected by pre-signed object storage URLs
pub struct HttpUploader {
    client: Client,
}

impl HttpUploader {
    pub fn new() -> Result<Self, CliError> {
        let client = Client::builder().timeout(Duration::from_secs(300)).build()?;
        Ok(Self { client })
    }
}

#[async_trait]
impl Uploader for HttpUploader {
    async fn upload(&self, path: &Path, destination_url: &str) -> Result<(), CliError> {
        let contents = File::new(path).read_bytes().await?;
        debug!("PUT {} ({} bytes)", destination_url, contents.len());

        let response = self
            .client
            .put(destination_url)
            .header(header::CONTENT_TYPE, "text/yaml")
            .header(header::CONTENT_LENGTH, contents.len())
            .body(contents)
            .send()
            .await?;

        // pre-signed PUTs answer exactly 200, anything else is a failed attempt
        if response.status() != StatusCode::OK {
            return Err(CliError::UploadError(format!(
                "Unable to upload stack file, status code: {}",
                response.status()
            )));
        }
        Ok(())
    }
}

/// Upload with bounded, sequential retries
///
/// `on_retry` observes each failed attempt that will be retried.
pub async fn upload_with_retry<U, F>(
    uploader: &U,
    options: &RetryOptions,
    path: &Path,
    destination_url: &str,
    on_retry: F,
) -> Result<(), CliError>
where
    U: Uploader + ?Sized,
    F: FnMut(u32, &CliError),
{
    retry(
        options,
        |_| uploader.upload(path, destination_url),
        on_retry,
    )
    .await
}
