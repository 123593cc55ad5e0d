//! Workspace config file source: roki.toml in the working directory, or an
//! explicit file given on the command line.

use config::builder::DefaultState;
use config::ConfigBuilder;
use config::ConfigError;
use config::File;
use std::path::Path;
use tracing::debug;

/// File name looked up in the workspace root
pub const CONFIG_FILE_NAME: &str = "roki.toml";

/// Add the workspace config file to the builder if it exists.
pub fn add_to_builder(
    builder: ConfigBuilder<DefaultState>,
    workspace_root: &Path,
) -> Result<ConfigBuilder<DefaultState>, ConfigError> {
    let config_path = workspace_root.join(CONFIG_FILE_NAME);
    if !config_path.exists() {
        debug!(config_path = %config_path.display(), "No workspace configuration file");
        return Ok(builder);
    }
    Ok(builder.add_source(File::from(config_path).required(false)))
}

/// Add an explicit config file; it must exist.
pub fn add_explicit(
    builder: ConfigBuilder<DefaultState>,
    config_path: &Path,
) -> Result<ConfigBuilder<DefaultState>, ConfigError> {
    if !config_path.exists() {
        return Err(ConfigError::NotFound(config_path.display().to_string()));
    }
    Ok(builder.add_source(File::from(config_path.to_path_buf()).required(true)))
}
