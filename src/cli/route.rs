//! CLI route: single route table and run context. Dispatches to the
//! orchestrator and formats the result.

use crate::cli::output::{format_pages_json, format_pages_text};
use crate::cli::parse::{Commands, SyncArgs};
use crate::config::{ConfigLoader, RokiConfig};
use crate::error::{FsError, RokiError};
use crate::fs::backend::FilesystemConfig;
use crate::fs::local::LocalConfig;
use crate::fs::{Backend, Filesystem, SyncOptions};
use crate::render::PlainTextRenderer;
use crate::roki::Roki;
use crate::theme::{DirectoryThemeLoader, ThemeLoader};
use std::path::{Path, PathBuf};
use std::time::Instant;
use tokio::io::AsyncReadExt;
use tracing::info;

/// Runtime context for CLI execution: workspace root and loaded config.
pub struct RunContext {
    workspace_root: PathBuf,
    config: RokiConfig,
}

impl RunContext {
    /// Create run context from workspace root and optional config path. Uses ConfigLoader only.
    pub fn new(workspace_root: PathBuf, config_path: Option<PathBuf>) -> Result<Self, RokiError> {
        let config = if let Some(ref cfg_path) = config_path {
            ConfigLoader::load_from_file(cfg_path)?
        } else {
            ConfigLoader::load(&workspace_root)?
        };
        Ok(Self::with_config(workspace_root, config))
    }

    pub fn with_config(workspace_root: PathBuf, config: RokiConfig) -> Self {
        Self {
            workspace_root,
            config,
        }
    }

    pub fn config(&self) -> &RokiConfig {
        &self.config
    }

    fn resolve_path(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.workspace_root.join(path)
        }
    }

    /// Local roots are taken relative to the workspace root
    fn resolve_backend(&self, config: &FilesystemConfig) -> FilesystemConfig {
        match config {
            FilesystemConfig::Local(local) => FilesystemConfig::Local(LocalConfig {
                root: self.resolve_path(&local.root),
            }),
            other => other.clone(),
        }
    }

    async fn open(&self) -> Result<Roki<Backend, Backend>, RokiError> {
        let source = Backend::open(&self.resolve_backend(&self.config.source)).await?;
        let destination = Backend::open(&self.resolve_backend(&self.config.destination)).await?;
        Ok(Roki::new(source, destination))
    }

    /// Execute one command; returns the text to print
    pub async fn execute(&self, command: &Commands) -> Result<String, RokiError> {
        let started = Instant::now();
        let roki = self.open().await?;

        let output = match command {
            Commands::Revision { page, file, sync } => {
                let content = match file {
                    Some(path) => tokio::fs::read_to_string(self.resolve_path(path))
                        .await
                        .map_err(FsError::from)?,
                    None => {
                        let mut buffer = String::new();
                        tokio::io::stdin()
                            .read_to_string(&mut buffer)
                            .await
                            .map_err(FsError::from)?;
                        buffer
                    }
                };
                let revision = roki.new_revision(page, &content).await?;
                commit(roki.source(), sync, format!("Update {}", page)).await?;
                revision.id
            }
            Commands::Attach { page, file, sync } => {
                let content = tokio::fs::read(self.resolve_path(file))
                    .await
                    .map_err(FsError::from)?;
                let original_name = file
                    .file_name()
                    .map(|name| name.to_string_lossy().into_owned())
                    .unwrap_or_default();
                let filename = roki.new_attachment(page, &original_name, content).await?;
                commit(roki.source(), sync, format!("Attach {} to {}", filename, page)).await?;
                filename
            }
            Commands::DeletePage { page, sync } => {
                roki.delete_page(page).await?;
                commit(roki.source(), sync, format!("Delete {}", page)).await?;
                format!("Deleted page {}", page)
            }
            Commands::DeleteRevision { page, id, sync } => {
                roki.delete_revision(page, id).await?;
                commit(roki.source(), sync, format!("Delete revision {} of {}", id, page)).await?;
                format!("Deleted revision {}", id)
            }
            Commands::DeleteAttachment {
                page,
                filename,
                sync,
            } => {
                roki.delete_attachment(page, filename).await?;
                commit(
                    roki.source(),
                    sync,
                    format!("Delete attachment {} of {}", filename, page),
                )
                .await?;
                format!("Deleted attachment {}", filename)
            }
            Commands::Pages { format } => {
                let pages = roki.get_pages().await?;
                match format.as_str() {
                    "json" => format_pages_json(&pages)?,
                    "text" => format_pages_text(&pages),
                    other => {
                        return Err(RokiError::Config(format!(
                            "Invalid format: {} (must be 'text' or 'json')",
                            other
                        )))
                    }
                }
            }
            Commands::Generate { sync } => {
                let theme = DirectoryThemeLoader::new(self.resolve_path(&self.config.theme_dir))
                    .load()
                    .await?;
                let count = roki.generate(&PlainTextRenderer, &theme).await?;
                commit(roki.destination(), sync, "Generate site".to_string()).await?;
                format!("Generated {} artifacts", count)
            }
        };

        info!(
            command = command.name(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Command finished"
        );
        Ok(output)
    }
}

async fn commit<F: Filesystem>(fs: &F, sync: &SyncArgs, default_message: String) -> Result<(), RokiError> {
    let message = sync.message.clone().unwrap_or(default_message);
    fs.sync(&SyncOptions::new(message).bare(sync.bare)).await?;
    Ok(())
}
