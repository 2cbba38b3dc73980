//! Storage layout configuration

use std::path::PathBuf;

use crate::filesys::file::File;

/// Environment variable overriding the base directory
pub const HOME_ENV_VAR: &str = "NOOPS_HOME";

/// Storage layout for the CLI
#[derive(Debug, Clone)]
pub struct StorageLayout {
    /// Base directory for all storage
    pub base_dir: PathBuf,
}

impl StorageLayout {
    /// Create a new storage layout
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: base_dir.into(),
        }
    }

    /// Get the settings file path
    pub fn settings_file(&self) -> File {
        File::new(self.base_dir.join("settings.json"))
    }
}

impl Default for StorageLayout {
    fn default() -> Self {
        if let Some(dir) = std::env::var_os(HOME_ENV_VAR) {
            return Self::new(dir);
        }

        let base_dir = std::env::var_os("HOME")
            .or_else(|| std::env::var_os("USERPROFILE"))
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".noops");

        Self::new(base_dir)
    }
}
