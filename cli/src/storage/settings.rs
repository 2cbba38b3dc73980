//! Settings file management

use serde::{Deserialize, Serialize};
use tracing::debug;
use url::Url;

use crate::errors::CliError;
use crate::filesys::file::File;
use crate::logs::LogLevel;

/// Environment variable overriding `brain.base_url`
pub const BRAIN_URL_ENV_VAR: &str = "NOOPS_BRAIN_URL";

/// Environment variable carrying the bearer token for the brain API
pub const TOKEN_ENV_VAR: &str = "NOOPS_TOKEN";

/// CLI settings
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Settings {
    /// Log level
    #[serde(default)]
    pub log_level: LogLevel,

    /// Emit logs as JSON
    #[serde(default)]
    pub log_json: bool,

    /// Brain (orchestrator) configuration
    #[serde(default)]
    pub brain: BrainSettings,

    /// Command poller configuration
    #[serde(default)]
    pub poller: PollerSettings,

    /// Upload and push retry configuration
    #[serde(default)]
    pub retry: RetrySettings,
}

impl Settings {
    /// Load settings from `file`, falling back to defaults when it does not exist
    pub async fn load(file: &File) -> Result<Self, CliError> {
        if !file.exists().await {
            debug!("No settings file at {}, using defaults", file.path().display());
            return Ok(Self::default());
        }

        let settings: Settings = file.read_json().await.map_err(|e| {
            CliError::ConfigError(format!("{}: {}", file.path().display(), e))
        })?;
        settings.validate()?;
        Ok(settings)
    }

    /// Apply environment overrides using `lookup` to read variables
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<(), CliError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(url) = lookup(BRAIN_URL_ENV_VAR).filter(|v| !v.is_empty()) {
            self.brain.base_url = url;
        }
        self.validate()
    }

    /// Validate the settings
    pub fn validate(&self) -> Result<(), CliError> {
        Url::parse(&self.brain.base_url).map_err(|e| {
            CliError::ConfigError(format!("invalid brain url '{}': {}", self.brain.base_url, e))
        })?;

        if self.poller.interval_secs == 0 {
            return Err(CliError::ConfigError(
                "poller.interval_secs must be greater than zero".to_string(),
            ));
        }
        if self.poller.expiry_secs < self.poller.interval_secs {
            return Err(CliError::ConfigError(
                "poller.expiry_secs must not be shorter than poller.interval_secs".to_string(),
            ));
        }
        if self.retry.max_attempts == 0 {
            return Err(CliError::ConfigError(
                "retry.max_attempts must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

fn default_true() -> bool {
    true
}

/// Brain API settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BrainSettings {
    /// Base URL for the brain API
    #[serde(default = "default_brain_url")]
    pub base_url: String,
}

fn default_brain_url() -> String {
    "https://brain.getnoops.com".to_string()
}

impl Default for BrainSettings {
    fn default() -> Self {
        Self {
            base_url: default_brain_url(),
        }
    }
}

/// When the exec token is attached to poll requests
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecTokenPolicy {
    /// Send the token with every poll request
    #[default]
    EveryPoll,

    /// Send the token with the first poll request only
    FirstPollOnly,
}

/// Poller settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PollerSettings {
    /// Interval between poll requests, in seconds
    #[serde(default = "default_interval_secs")]
    pub interval_secs: u64,

    /// Total time budget for one wait, in seconds
    #[serde(default = "default_expiry_secs")]
    pub expiry_secs: u64,

    /// Sleep for one interval before the very first poll
    #[serde(default = "default_true")]
    pub wait_before_first_poll: bool,

    /// Exec token resend policy
    #[serde(default)]
    pub exec_token: ExecTokenPolicy,
}

fn default_interval_secs() -> u64 {
    10
}

fn default_expiry_secs() -> u64 {
    60 * 60
}

impl Default for PollerSettings {
    fn default() -> Self {
        Self {
            interval_secs: default_interval_secs(),
            expiry_secs: default_expiry_secs(),
            wait_before_first_poll: true,
            exec_token: ExecTokenPolicy::default(),
        }
    }
}

/// Retry settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetrySettings {
    /// Attempts per upload or push, including the first
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Pause between attempts, in milliseconds
    #[serde(default)]
    pub delay_ms: u64,
}

fn default_max_attempts() -> u32 {
    3
}

impl Default for RetrySettings {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            delay_ms: 0,
        }
    }
}
