//! Merge rules: defaults, override order, conflict handling.
//!
//! Later sources override earlier ones key by key: built-in defaults, then
//! the configuration file, then the environment.

use config::Config;
use config::ConfigBuilder;
use config::ConfigError;

/// Default source root when no file says otherwise
pub const DEFAULT_SOURCE_ROOT: &str = "wiki";

/// Default destination root for the generated site
pub const DEFAULT_DESTINATION_ROOT: &str = "_site";

/// Default theme directory
pub const DEFAULT_THEME_DIR: &str = "theme";

/// Create a Config builder with merge policy defaults applied.
pub fn builder_with_defaults() -> Result<ConfigBuilder<config::builder::DefaultState>, ConfigError>
{
    Config::builder()
        .set_default("source.backend", "local")?
        .set_default("source.config.root", DEFAULT_SOURCE_ROOT)?
        .set_default("destination.backend", "local")?
        .set_default("destination.config.root", DEFAULT_DESTINATION_ROOT)?
        .set_default("theme_dir", DEFAULT_THEME_DIR)
}
