//! Configuration System
//!
//! Layered configuration: built-in defaults, then `roki.toml` (or an explicit
//! file), then `ROKI_` environment variables. Backends are selected through
//! the tagged [`FilesystemConfig`], so an unknown backend name fails here
//! rather than at first use.

use crate::fs::backend::FilesystemConfig;
use crate::fs::local::LocalConfig;
use crate::logging::LoggingConfig;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

mod facade;
mod merge;
mod sources;

pub use facade::ConfigLoader;
pub use merge::merge_policy::{DEFAULT_DESTINATION_ROOT, DEFAULT_SOURCE_ROOT, DEFAULT_THEME_DIR};
pub use sources::environment::{ENV_PREFIX, ENV_SEPARATOR};
pub use sources::workspace_file::CONFIG_FILE_NAME;

/// Root configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RokiConfig {
    /// Filesystem holding the wiki pages
    pub source: FilesystemConfig,

    /// Filesystem receiving the generated site
    pub destination: FilesystemConfig,

    /// Directory the theme is loaded from
    #[serde(default = "default_theme_dir")]
    pub theme_dir: PathBuf,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

fn default_theme_dir() -> PathBuf {
    PathBuf::from(DEFAULT_THEME_DIR)
}

impl Default for RokiConfig {
    fn default() -> Self {
        Self {
            source: FilesystemConfig::Local(LocalConfig {
                root: PathBuf::from(DEFAULT_SOURCE_ROOT),
            }),
            destination: FilesystemConfig::Local(LocalConfig {
                root: PathBuf::from(DEFAULT_DESTINATION_ROOT),
            }),
            theme_dir: default_theme_dir(),
            logging: LoggingConfig::default(),
        }
    }
}

impl RokiConfig {
    /// Validate the entire configuration
    pub fn validate(&self) -> Result<(), String> {
        let mut errors = Vec::new();
        if let Err(e) = self.source.validate() {
            errors.push(format!("source: {}", e));
        }
        if let Err(e) = self.destination.validate() {
            errors.push(format!("destination: {}", e));
        }
        if self.theme_dir.as_os_str().is_empty() {
            errors.push("theme_dir cannot be empty".to_string());
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors.join("; "))
        }
    }
}
