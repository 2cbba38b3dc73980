//! Utility functions

use std::future::Future;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Version information for the CLI
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VersionInfo {
    pub version: String,
    pub git_hash: String,
    pub build_time: String,
}

/// Get version information
pub fn version_info() -> VersionInfo {
    VersionInfo {
        version: env!("CARGO_PKG_VERSION").to_string(),
        git_hash: option_env!("GIT_HASH").unwrap_or("unknown").to_string(),
        build_time: option_env!("BUILD_TIME").unwrap_or("unknown").to_string(),
    }
}

/// Bounded retry policy
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryOptions {
    /// Total number of attempts, including the first one
    pub max_attempts: u32,

    /// Fixed pause between attempts
    pub delay: Duration,
}

impl Default for RetryOptions {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            delay: Duration::ZERO,
        }
    }
}

/// Run `operation` until it succeeds or `options.max_attempts` is reached.
///
/// Attempts run strictly one after another. `on_attempt_failed` is called with
/// the attempt number and its error before every retry, never after the final
/// attempt, and cannot influence what happens next. The error of the last
/// attempt is returned on exhaustion.
pub async fn retry<T, E, Op, Fut, OnErr>(
    options: &RetryOptions,
    mut operation: Op,
    mut on_attempt_failed: OnErr,
) -> Result<T, E>
where
    Op: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<T, E>>,
    OnErr: FnMut(u32, &E),
{
    let max_attempts = options.max_attempts.max(1);
    let mut attempt = 1;

    loop {
        match operation(attempt).await {
            Ok(value) => return Ok(value),
            Err(e) if attempt >= max_attempts => return Err(e),
            Err(e) => {
                on_attempt_failed(attempt, &e);
                if !options.delay.is_zero() {
                    tokio::time::sleep(options.delay).await;
                }
                attempt += 1;
            }
        }
    }
}
