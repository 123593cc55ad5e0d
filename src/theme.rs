//! Themes
//!
//! A theme is a set of named templates, named partials and an opaque
//! preference value handed through to the printer.

use crate::error::RokiError;
use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tracing::{debug, instrument};

/// File extension of template sources
const TEMPLATE_EXT: &str = "html";

/// Optional preference document inside a theme directory
pub const PREFERENCE_FILE: &str = "preference.json";

/// Loaded theme
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Theme {
    pub templates: HashMap<String, String>,
    pub partials: HashMap<String, String>,
    pub preference: Value,
}

impl Theme {
    pub fn template(&self, name: &str) -> Option<&str> {
        self.templates.get(name).map(String::as_str)
    }
}

/// Produces a theme
#[async_trait]
pub trait ThemeLoader: Send + Sync {
    async fn load(&self) -> Result<Theme, RokiError>;
}

/// Loads a theme from one directory
///
/// Every `*.html` file becomes a template named by its stem; stems starting
/// with `_` are partials and keep the prefix in their name.
pub struct DirectoryThemeLoader {
    dir: PathBuf,
}

impl DirectoryThemeLoader {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

#[async_trait]
impl ThemeLoader for DirectoryThemeLoader {
    #[instrument(skip(self), fields(dir = %self.dir.display()))]
    async fn load(&self) -> Result<Theme, RokiError> {
        let theme_err = |e: std::io::Error| {
            RokiError::Theme(format!("failed to read {}: {}", self.dir.display(), e))
        };

        let mut theme = Theme::default();
        let mut entries = tokio::fs::read_dir(&self.dir).await.map_err(theme_err)?;
        while let Some(entry) = entries.next_entry().await.map_err(theme_err)? {
            let path = entry.path();
            if !entry.file_type().await.map_err(theme_err)?.is_file() {
                continue;
            }
            if path.extension().and_then(|e| e.to_str()) != Some(TEMPLATE_EXT) {
                continue;
            }
            let Some(stem) = path.file_stem().and_then(|s| s.to_str()) else {
                continue;
            };
            let source = tokio::fs::read_to_string(&path).await.map_err(theme_err)?;
            if stem.starts_with('_') {
                theme.partials.insert(stem.to_string(), source);
            } else {
                theme.templates.insert(stem.to_string(), source);
            }
        }

        let preference_path = self.dir.join(PREFERENCE_FILE);
        match tokio::fs::read_to_string(&preference_path).await {
            Ok(raw) => {
                theme.preference = serde_json::from_str(&raw).map_err(|e| {
                    RokiError::Theme(format!("invalid {}: {}", preference_path.display(), e))
                })?;
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => return Err(theme_err(e)),
        }

        debug!(
            templates = theme.templates.len(),
            partials = theme.partials.len(),
            "Loaded theme"
        );
        Ok(theme)
    }
}
