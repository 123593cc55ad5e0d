//! Object Store Wire Contract
//!
//! The git-data plumbing operations the remote filesystem speaks. Every
//! object is immutable and addressed by its hash; only refs move.

use crate::error::FsError;
use crate::types::{ObjectId, EMPTY_TREE_ID};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// File mode given to blobs created by this crate
pub const BLOB_MODE: &str = "100644";

/// File mode git assigns to sub-tree entries
pub const TREE_MODE: &str = "040000";

/// File mode of a submodule link
pub const COMMIT_MODE: &str = "160000";

/// Kind of a tree entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryKind {
    Blob,
    Tree,
    /// Submodule link to a commit in another repository
    Commit,
}

impl EntryKind {
    /// Mode for a newly created entry of this kind
    pub fn mode(self) -> &'static str {
        match self {
            EntryKind::Blob => BLOB_MODE,
            EntryKind::Tree => TREE_MODE,
            EntryKind::Commit => COMMIT_MODE,
        }
    }

    pub fn describe(self) -> &'static str {
        match self {
            EntryKind::Blob => "file",
            EntryKind::Tree => "directory",
            EntryKind::Commit => "submodule",
        }
    }

    /// Parse the `type` field of a git tree entry
    pub fn from_git_type(kind: &str) -> Option<Self> {
        match kind {
            "blob" => Some(EntryKind::Blob),
            "tree" => Some(EntryKind::Tree),
            "commit" => Some(EntryKind::Commit),
            _ => None,
        }
    }

    pub fn git_type(self) -> &'static str {
        match self {
            EntryKind::Blob => "blob",
            EntryKind::Tree => "tree",
            EntryKind::Commit => "commit",
        }
    }

    /// Whether entries of this kind surface through the filesystem
    pub fn is_visible(self) -> bool {
        !matches!(self, EntryKind::Commit)
    }
}

/// One child of a tree object
///
/// `mode` is carried verbatim from the store, so executables and symlinks
/// keep their mode when a sibling changes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TreeEntry {
    pub name: String,
    pub kind: EntryKind,
    pub mode: String,
    pub id: ObjectId,
}

impl TreeEntry {
    /// Entry with the default mode of its kind
    pub fn new(name: impl Into<String>, kind: EntryKind, id: ObjectId) -> Self {
        Self {
            name: name.into(),
            kind,
            mode: kind.mode().to_string(),
            id,
        }
    }

    pub fn with_mode(mut self, mode: impl Into<String>) -> Self {
        self.mode = mode.into();
        self
    }
}

/// A tree as returned by the store: one directory level
#[derive(Debug, Clone)]
pub struct RawTree {
    pub id: ObjectId,
    pub entries: Vec<TreeEntry>,
    /// Set when the store paginated the listing
    pub truncated: bool,
}

/// A commit as returned by the store
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Commit {
    pub id: ObjectId,
    pub tree: ObjectId,
    pub parents: Vec<ObjectId>,
    pub message: String,
}

/// A blob payload in the store's transfer encoding
#[derive(Debug, Clone)]
pub struct EncodedBlob {
    pub content: String,
    pub encoding: String,
}

/// Remote object store operations
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Resolve a ref to its commit; `None` when the ref does not exist
    async fn read_ref(&self, name: &str) -> Result<Option<ObjectId>, FsError>;

    async fn read_commit(&self, id: &ObjectId) -> Result<Commit, FsError>;

    /// Read one tree level (non-recursive)
    async fn read_tree(&self, id: &ObjectId) -> Result<RawTree, FsError>;

    async fn read_blob(&self, id: &ObjectId) -> Result<EncodedBlob, FsError>;

    async fn create_blob(&self, content: &[u8]) -> Result<ObjectId, FsError>;

    /// Create a tree from a complete entry list
    async fn create_tree(&self, entries: &[TreeEntry]) -> Result<ObjectId, FsError>;

    async fn create_commit(
        &self,
        message: &str,
        tree: &ObjectId,
        parents: &[ObjectId],
    ) -> Result<ObjectId, FsError>;

    /// Point an existing ref at a commit; without `force` only fast-forwards succeed
    async fn update_ref(&self, name: &str, commit: &ObjectId, force: bool) -> Result<(), FsError>;

    async fn create_ref(&self, name: &str, commit: &ObjectId) -> Result<(), FsError>;

    /// Name of the store, for logging
    fn store_name(&self) -> &str;

    /// Id of the tree with no entries
    fn empty_tree(&self) -> ObjectId {
        ObjectId::from(EMPTY_TREE_ID)
    }
}
