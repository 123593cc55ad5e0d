//! Disk-backed filesystem rooted at a local directory

use crate::error::FsError;
use crate::fs::{path, Entry, Filesystem, WriteOp};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{debug, trace};

/// Local filesystem configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LocalConfig {
    /// Directory all logical paths are resolved against
    pub root: PathBuf,
}

/// Filesystem that writes straight through to disk
#[derive(Debug, Clone)]
pub struct LocalFilesystem {
    root: PathBuf,
}

impl LocalFilesystem {
    /// Open a local filesystem, creating the root directory when missing
    pub fn new(config: &LocalConfig) -> Result<Self, FsError> {
        std::fs::create_dir_all(&config.root)?;
        let root = dunce::canonicalize(&config.root).map_err(|e| {
            FsError::Configuration(format!(
                "Failed to canonicalize root {}: {}",
                config.root.display(),
                e
            ))
        })?;
        debug!(root = %root.display(), "Opened local filesystem");
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Resolve a logical path to a location under the root
    ///
    /// `..` segments are clamped at the root, so a logical path never leaves it.
    fn resolve(&self, logical: &str) -> PathBuf {
        let normalized = path::normalize(logical);
        let mut resolved = self.root.clone();
        for segment in path::segments(&normalized) {
            resolved.push(segment);
        }
        resolved
    }

    /// Remove a file standing where a parent directory of `logical` must go
    async fn clear_file_ancestor(&self, logical: &str) -> Result<(), FsError> {
        let normalized = path::normalize(logical);
        let segments: Vec<&str> = path::segments(&normalized).collect();
        let mut current = self.root.clone();
        for segment in &segments[..segments.len().saturating_sub(1)] {
            current.push(segment);
            match fs::metadata(&current).await {
                Ok(metadata) if metadata.is_dir() => {}
                Ok(_) => {
                    debug!(path = %current.display(), "Replacing file with directory");
                    fs::remove_file(&current).await?;
                    return Ok(());
                }
                Err(e) if e.kind() == ErrorKind::NotFound => return Ok(()),
                Err(e) => return Err(FsError::Io(e)),
            }
        }
        Ok(())
    }

    /// Empty the root directory, keeping the root itself
    async fn clear_root(&self) -> Result<(), FsError> {
        let mut reader = fs::read_dir(&self.root).await?;
        while let Some(item) = reader.next_entry().await? {
            if item.file_type().await?.is_dir() {
                fs::remove_dir_all(item.path()).await?;
            } else {
                fs::remove_file(item.path()).await?;
            }
        }
        trace!("Cleared local root");
        Ok(())
    }
}

fn map_io(err: std::io::Error, logical: &str) -> FsError {
    match err.kind() {
        ErrorKind::NotFound => FsError::NotFound(logical.to_string()),
        // A file sits where a directory segment was expected.
        ErrorKind::NotADirectory => FsError::not_a_directory(logical),
        _ => FsError::Io(err),
    }
}

#[async_trait]
impl Filesystem for LocalFilesystem {
    async fn list(&self, dir: &str) -> Result<Vec<Entry>, FsError> {
        let target = self.resolve(dir);
        let metadata = fs::metadata(&target).await.map_err(|e| map_io(e, dir))?;
        if !metadata.is_dir() {
            return Err(FsError::not_a_directory(dir));
        }

        let mut entries = Vec::new();
        let mut reader = fs::read_dir(&target).await.map_err(|e| map_io(e, dir))?;
        while let Some(item) = reader.next_entry().await? {
            let file_type = item.file_type().await?;
            entries.push(Entry {
                name: item.file_name().to_string_lossy().into_owned(),
                directory: file_type.is_dir(),
            });
        }

        entries.sort_by(|a, b| a.name.cmp(&b.name));
        trace!(path = dir, count = entries.len(), "Listed local directory");
        Ok(entries)
    }

    async fn read_file(&self, file: &str) -> Result<Vec<u8>, FsError> {
        let target = self.resolve(file);
        let metadata = fs::metadata(&target).await.map_err(|e| map_io(e, file))?;
        if metadata.is_dir() {
            return Err(FsError::not_a_file(file));
        }
        fs::read(&target).await.map_err(|e| map_io(e, file))
    }

    async fn write(&self, file: &str, op: WriteOp) -> Result<(), FsError> {
        let target = self.resolve(file);
        match op {
            WriteOp::Put(content) => {
                if target == self.root {
                    return Err(FsError::InvalidPath(format!(
                        "cannot write content to the root: {:?}",
                        file
                    )));
                }
                // The later write wins over whatever is in the way.
                self.clear_file_ancestor(file).await?;
                if let Some(parent) = target.parent() {
                    fs::create_dir_all(parent).await?;
                }
                if let Ok(metadata) = fs::symlink_metadata(&target).await {
                    if metadata.is_dir() {
                        fs::remove_dir_all(&target).await?;
                    }
                }
                fs::write(&target, content).await?;
                trace!(path = file, "Wrote local file");
            }
            WriteOp::Delete if target == self.root => self.clear_root().await?,
            WriteOp::Delete => {
                let removed = match fs::symlink_metadata(&target).await {
                    Ok(metadata) if metadata.is_dir() => fs::remove_dir_all(&target).await,
                    Ok(_) => fs::remove_file(&target).await,
                    Err(e) => Err(e),
                };
                match removed {
                    Ok(()) => trace!(path = file, "Removed local path"),
                    // Nothing exists there, or a file stands in for a parent.
                    Err(e)
                        if matches!(e.kind(), ErrorKind::NotFound | ErrorKind::NotADirectory) => {}
                    Err(e) => return Err(FsError::Io(e)),
                }
            }
        }
        Ok(())
    }
}
