//! Application configuration options

use std::time::Duration;

use crate::storage::settings::Settings;
use crate::utils::RetryOptions;
use crate::workers::poller;

/// Main application options
#[derive(Debug, Clone)]
pub struct AppOptions {
    /// Brain API base URL
    pub brain_base_url: String,

    /// Poller options
    pub poller: poller::Options,

    /// Retry policy for stack file uploads and image pushes
    pub retry: RetryOptions,
}

impl Default for AppOptions {
    fn default() -> Self {
        Self::from_settings(&Settings::default())
    }
}

impl AppOptions {
    /// Build options from loaded settings
    pub fn from_settings(settings: &Settings) -> Self {
        Self {
            brain_base_url: settings.brain.base_url.clone(),
            poller: poller::Options {
                interval: Duration::from_secs(settings.poller.interval_secs),
                expiry: Duration::from_secs(settings.poller.expiry_secs),
                wait_before_first_poll: settings.poller.wait_before_first_poll,
                exec_token: settings.poller.exec_token,
            },
            retry: RetryOptions {
                max_attempts: settings.retry.max_attempts,
                delay: Duration::from_millis(settings.retry.delay_ms),
            },
        }
    }

    /// Override the poll interval and budget, e.g. from command-line flags
    pub fn with_poll_overrides(mut self, interval_secs: Option<u64>, expiry_secs: Option<u64>) -> Self {
        if let Some(interval) = interval_secs.filter(|secs| *secs > 0) {
            self.poller.interval = Duration::from_secs(interval);
        }
        if let Some(expiry) = expiry_secs.filter(|secs| *secs > 0) {
            self.poller.expiry = Duration::from_secs(expiry);
        }
        self
    }
}
