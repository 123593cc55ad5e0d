//! Filesystem Contract
//!
//! The capability every storage backend implements and every consumer
//! programs against: list a directory, read a file, write or delete a path,
//! and optionally commit buffered writes.

pub mod backend;
pub mod local;
pub mod path;

pub use backend::Backend;
pub use local::LocalFilesystem;

use crate::error::FsError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// One listing result
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Entry {
    pub name: String,
    pub directory: bool,
}

impl Entry {
    pub fn file(name: impl Into<String>) -> Self {
        Entry {
            name: name.into(),
            directory: false,
        }
    }

    pub fn directory(name: impl Into<String>) -> Self {
        Entry {
            name: name.into(),
            directory: true,
        }
    }
}

/// A write against a path: store bytes, or remove whatever lives there.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WriteOp {
    Put(Vec<u8>),
    Delete,
}

/// Options for committing buffered writes
#[derive(Debug, Clone)]
pub struct SyncOptions {
    /// Commit message
    pub message: String,
    /// Write a parentless commit over an empty base tree
    pub bare: bool,
}

impl SyncOptions {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            bare: false,
        }
    }

    pub fn bare(mut self, bare: bool) -> Self {
        self.bare = bare;
        self
    }
}

/// Filesystem capability
#[async_trait]
pub trait Filesystem: Send + Sync {
    /// List the immediate children of a directory
    async fn list(&self, path: &str) -> Result<Vec<Entry>, FsError>;

    /// Read a file's bytes; `NotFound` when absent
    async fn read_file(&self, path: &str) -> Result<Vec<u8>, FsError>;

    /// Apply a write to a path
    async fn write(&self, path: &str, op: WriteOp) -> Result<(), FsError>;

    /// Commit buffered writes. Backends that write through do nothing.
    async fn sync(&self, _options: &SyncOptions) -> Result<(), FsError> {
        Ok(())
    }

    async fn write_file(&self, path: &str, content: Vec<u8>) -> Result<(), FsError> {
        self.write(path, WriteOp::Put(content)).await
    }

    async fn remove(&self, path: &str) -> Result<(), FsError> {
        self.write(path, WriteOp::Delete).await
    }
}
