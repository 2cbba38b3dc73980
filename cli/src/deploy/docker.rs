//! Docker registry operations

use std::process::Stdio;

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::{debug, info};

use crate::errors::CliError;

/// Image operations needed to push an artifact to a registry
#[async_trait]
pub trait ContainerRegistry: Send + Sync {
    /// Tag the local image `source` as `target`
    async fn tag(&self, source: &str, target: &str) -> Result<(), CliError>;

    /// Authenticate against `registry`
    async fn login(
        &self,
        registry: &str,
        username: &str,
        password: &SecretString,
    ) -> Result<(), CliError>;

    /// Push `reference` to its registry
    async fn push(&self, reference: &str) -> Result<(), CliError>;
}

/// Registry host of an image reference, `host[:port]` before the first `/`
pub fn registry_host(reference: &str) -> &str {
    let without_scheme = reference
        .strip_prefix("https://")
        .or_else(|| reference.strip_prefix("http://"))
        .unwrap_or(reference);
    without_scheme.split('/').next().unwrap_or(without_scheme)
}

/// [`ContainerRegistry`] backed by the local `docker` binary
#[derive(Debug, Clone)]
pub struct DockerCli {
    binary: String,
}

impl DockerCli {
    pub fn new() -> Self {
        Self {
            binary: "docker".to_string(),
        }
    }

    /// Use a different docker-compatible binary, e.g. `podman`
    pub fn with_binary(binary: impl Into<String>) -> Self {
        Self {
            binary: binary.into(),
        }
    }

    async fn run(&self, args: &[&str]) -> Result<(), CliError> {
        debug!("Running {} {}", self.binary, args.join(" "));
        let output = Command::new(&self.binary)
            .args(args)
            .stdin(Stdio::null())
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|e| {
                CliError::RegistryError(format!("Failed to run {} {}: {}", self.binary, args[0], e))
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(CliError::RegistryError(format!(
                "{} {} failed: {}",
                self.binary,
                args[0],
                stderr.trim()
            )));
        }
        Ok(())
    }
}

impl Default for DockerCli {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ContainerRegistry for DockerCli {
    async fn tag(&self, source: &str, target: &str) -> Result<(), CliError> {
        info!("Tagging image {} as {}", source, target);
        self.run(&["tag", source, target]).await
    }

    async fn login(
        &self,
        registry: &str,
        username: &str,
        password: &SecretString,
    ) -> Result<(), CliError> {
        debug!("Authenticating with registry {}", registry);

        let mut child = Command::new(&self.binary)
            .args(["login", registry, "-u", username, "--password-stdin"])
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| CliError::RegistryError(format!("Failed to run docker login: {}", e)))?;

        if let Some(mut stdin) = child.stdin.take() {
            stdin
                .write_all(password.expose_secret().as_bytes())
                .await?;
        }

        let output = child.wait_with_output().await?;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(CliError::RegistryError(format!(
                "docker login to {} failed: {}",
                registry,
                stderr.trim()
            )));
        }

        debug!("Successfully authenticated with {}", registry);
        Ok(())
    }

    async fn push(&self, reference: &str) -> Result<(), CliError> {
        info!("Pushing image {}", reference);
        self.run(&["push", reference]).await
    }
}
