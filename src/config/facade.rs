//! Config loader facade: builds the layered configuration and deserializes
//! it into [`RokiConfig`].

use super::merge::merge_policy;
use super::sources::{environment, workspace_file};
use super::RokiConfig;
use crate::error::RokiError;
use std::path::Path;
use tracing::debug;

/// Loads [`RokiConfig`] from defaults, a file and the environment
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load using `roki.toml` from `workspace_root` when present
    pub fn load(workspace_root: &Path) -> Result<RokiConfig, RokiError> {
        let builder = merge_policy::builder_with_defaults()?;
        let builder = workspace_file::add_to_builder(builder, workspace_root)?;
        let builder = environment::add_to_builder(builder);
        Self::finish(builder.build()?)
    }

    /// Load from an explicit file, which must exist
    pub fn load_from_file(config_path: &Path) -> Result<RokiConfig, RokiError> {
        let builder = merge_policy::builder_with_defaults()?;
        let builder = workspace_file::add_explicit(builder, config_path)?;
        let builder = environment::add_to_builder(builder);
        Self::finish(builder.build()?)
    }

    /// Built-in defaults only
    pub fn default() -> RokiConfig {
        RokiConfig::default()
    }

    fn finish(config: config::Config) -> Result<RokiConfig, RokiError> {
        let config: RokiConfig = config.try_deserialize()?;
        config.validate().map_err(RokiError::Config)?;
        debug!(
            source = config.source.backend_name(),
            destination = config.destination.backend_name(),
            "Loaded configuration"
        );
        Ok(config)
    }
}
