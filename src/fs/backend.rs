//! Backend selection
//!
//! A closed set of storage backends behind the one filesystem capability.
//! The variant is fixed when configuration is deserialized, so an unknown
//! backend name never reaches a call site.

use crate::error::FsError;
use crate::fs::local::{LocalConfig, LocalFilesystem};
use crate::fs::{Entry, Filesystem, SyncOptions, WriteOp};
use crate::remote::{GithubConfig, RemoteObjectFilesystem};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::info;

/// Filesystem backend configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "backend", content = "config", rename_all = "lowercase")]
pub enum FilesystemConfig {
    Local(LocalConfig),
    Github(GithubConfig),
}

impl FilesystemConfig {
    pub fn backend_name(&self) -> &'static str {
        match self {
            FilesystemConfig::Local(_) => "local",
            FilesystemConfig::Github(_) => "github",
        }
    }

    pub fn validate(&self) -> Result<(), String> {
        match self {
            FilesystemConfig::Local(config) => {
                if config.root.as_os_str().is_empty() {
                    return Err("local root cannot be empty".to_string());
                }
                Ok(())
            }
            FilesystemConfig::Github(config) => config.validate(),
        }
    }
}

/// An opened storage backend
pub enum Backend {
    Local(LocalFilesystem),
    Remote(RemoteObjectFilesystem),
}

impl Backend {
    /// Open the backend described by `config`
    pub async fn open(config: &FilesystemConfig) -> Result<Self, FsError> {
        config.validate().map_err(FsError::Configuration)?;
        let backend = match config {
            FilesystemConfig::Local(local) => Backend::Local(LocalFilesystem::new(local)?),
            FilesystemConfig::Github(github) => {
                Backend::Remote(RemoteObjectFilesystem::open_github(github).await?)
            }
        };
        info!(backend = config.backend_name(), "Opened filesystem backend");
        Ok(backend)
    }

    fn inner(&self) -> &dyn Filesystem {
        match self {
            Backend::Local(fs) => fs,
            Backend::Remote(fs) => fs,
        }
    }
}

#[async_trait]
impl Filesystem for Backend {
    async fn list(&self, path: &str) -> Result<Vec<Entry>, FsError> {
        self.inner().list(path).await
    }

    async fn read_file(&self, path: &str) -> Result<Vec<u8>, FsError> {
        self.inner().read_file(path).await
    }

    async fn write(&self, path: &str, op: WriteOp) -> Result<(), FsError> {
        self.inner().write(path, op).await
    }

    async fn sync(&self, options: &SyncOptions) -> Result<(), FsError> {
        self.inner().sync(options).await
    }
}
