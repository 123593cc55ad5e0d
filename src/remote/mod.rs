//! Remote Object Filesystem
//!
//! Filesystem over a content-addressed object store. Reads resolve paths by
//! walking tree objects from the current head, caching every tree and blob by
//! hash. Writes are buffered and materialized by `sync` as one new commit.

pub mod builder;
pub mod cache;
pub mod github;
pub mod memory;
pub mod store;

pub use github::{GithubConfig, GithubObjectStore};
pub use memory::{MemoryObjectStore, StoreOp};
pub use store::{Commit, EncodedBlob, EntryKind, ObjectStore, RawTree, TreeEntry};

use crate::error::FsError;
use crate::fs::{path, Entry, Filesystem, SyncOptions, WriteOp};
use crate::remote::builder::{Edit, TreeWriter};
use crate::remote::cache::SingleFlight;
use crate::types::ObjectId;
use async_trait::async_trait;
use base64::Engine;
use parking_lot::{Mutex, RwLock};
use std::future::Future;
use std::sync::Arc;
use tokio::sync::Semaphore;
use tracing::{debug, info, instrument, trace, warn};

const BOOTSTRAP_MESSAGE: &str = "Initialize wiki";

/// One directory level, immutable once fetched
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TreeNode {
    pub id: ObjectId,
    pub entries: Vec<TreeEntry>,
}

impl TreeNode {
    /// Visible child named `name`; submodule links are not reachable
    pub fn find(&self, name: &str) -> Option<&TreeEntry> {
        self.entries
            .iter()
            .find(|e| e.name == name && e.kind.is_visible())
    }
}

/// The commit and tree the filesystem currently reads from
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RefState {
    pub commit: ObjectId,
    pub tree: ObjectId,
}

/// A buffered write waiting for `sync`
#[derive(Debug, Clone)]
pub struct PendingWrite {
    pub path: String,
    pub op: WriteOp,
}

/// Resource limits for one remote filesystem instance
#[derive(Debug, Clone, Default)]
pub struct RemoteOptions {
    /// Maximum number of trees (and, separately, blobs) kept in memory
    pub cache_capacity: Option<usize>,
    /// Maximum number of concurrent requests to the store
    pub max_in_flight: Option<usize>,
}

/// Filesystem over a remote content-addressed object store
pub struct RemoteObjectFilesystem {
    store: Arc<dyn ObjectStore>,
    ref_name: String,
    head: RwLock<RefState>,
    trees: SingleFlight<TreeNode>,
    blobs: SingleFlight<Vec<u8>>,
    pending: Mutex<Vec<PendingWrite>>,
    transaction: tokio::sync::Mutex<()>,
    permits: Option<Semaphore>,
}

fn unreachable_store(store: &dyn ObjectStore, err: FsError) -> FsError {
    match err {
        FsError::Configuration(_) => err,
        other => FsError::Configuration(format!(
            "{} object store is unreachable or misconfigured: {}",
            store.store_name(),
            other
        )),
    }
}

/// Decode a blob payload from its transfer encoding
pub fn decode_blob(blob: &EncodedBlob) -> Result<Vec<u8>, FsError> {
    match blob.encoding.as_str() {
        "base64" => {
            let compact: String = blob
                .content
                .chars()
                .filter(|c| !c.is_ascii_whitespace())
                .collect();
            base64::engine::general_purpose::STANDARD
                .decode(compact)
                .map_err(|e| FsError::Remote(format!("Invalid base64 blob content: {}", e)))
        }
        "utf-8" | "utf8" => Ok(blob.content.as_bytes().to_vec()),
        other => Err(FsError::UnsupportedEncoding(other.to_string())),
    }
}

impl RemoteObjectFilesystem {
    /// Resolve `ref_name` to its head, creating an empty root commit if the ref is missing
    #[instrument(skip(store, options), fields(backend = store.store_name()))]
    pub async fn init(
        store: Arc<dyn ObjectStore>,
        ref_name: &str,
        options: RemoteOptions,
    ) -> Result<Self, FsError> {
        let trees = SingleFlight::new(options.cache_capacity);

        let resolved = store
            .read_ref(ref_name)
            .await
            .map_err(|e| unreachable_store(store.as_ref(), e))?;

        let head = match resolved {
            Some(commit) => {
                let found = store
                    .read_commit(&commit)
                    .await
                    .map_err(|e| unreachable_store(store.as_ref(), e))?;
                debug!(commit = %commit, tree = %found.tree, "Resolved ref");
                RefState {
                    commit,
                    tree: found.tree,
                }
            }
            None => {
                info!(reference = ref_name, "Ref not found, bootstrapping empty history");
                let tree = store.empty_tree();
                let commit = store
                    .create_commit(BOOTSTRAP_MESSAGE, &tree, &[])
                    .await
                    .map_err(|e| unreachable_store(store.as_ref(), e))?;
                store
                    .create_ref(ref_name, &commit)
                    .await
                    .map_err(|e| unreachable_store(store.as_ref(), e))?;
                trees.insert(
                    &tree,
                    TreeNode {
                        id: tree.clone(),
                        entries: Vec::new(),
                    },
                );
                RefState { commit, tree }
            }
        };

        Ok(Self {
            store,
            ref_name: ref_name.to_string(),
            head: RwLock::new(head),
            trees,
            blobs: SingleFlight::new(options.cache_capacity),
            pending: Mutex::new(Vec::new()),
            transaction: tokio::sync::Mutex::new(()),
            permits: options.max_in_flight.map(|n| Semaphore::new(n.max(1))),
        })
    }

    /// Open the filesystem over a GitHub repository
    pub async fn open_github(config: &GithubConfig) -> Result<Self, FsError> {
        let store = Arc::new(GithubObjectStore::new(config)?);
        let options = RemoteOptions {
            cache_capacity: config.cache_capacity,
            max_in_flight: config.max_in_flight,
        };
        Self::init(store, &config.reference, options).await
    }

    pub fn head(&self) -> RefState {
        self.head.read().clone()
    }

    pub fn ref_name(&self) -> &str {
        &self.ref_name
    }

    pub fn pending_writes(&self) -> Vec<PendingWrite> {
        self.pending.lock().clone()
    }

    pub(crate) fn empty_tree(&self) -> ObjectId {
        let id = self.store.empty_tree();
        self.trees.insert(
            &id,
            TreeNode {
                id: id.clone(),
                entries: Vec::new(),
            },
        );
        id
    }

    /// Run a store request under the in-flight limit
    async fn limited<T, Fut>(&self, request: Fut) -> Result<T, FsError>
    where
        Fut: Future<Output = Result<T, FsError>>,
    {
        let _permit = match &self.permits {
            Some(permits) => Some(
                permits
                    .acquire()
                    .await
                    .map_err(|e| FsError::Remote(format!("request limiter closed: {}", e)))?,
            ),
            None => None,
        };
        request.await
    }

    /// Fetch a tree by hash, cache first
    pub(crate) async fn tree(&self, id: &ObjectId) -> Result<Arc<TreeNode>, FsError> {
        self.trees
            .get_or_fetch(id, || async {
                let raw = self.limited(self.store.read_tree(id)).await?;
                if raw.truncated {
                    return Err(FsError::TruncatedListing(id.to_string()));
                }
                trace!(tree = %id, entries = raw.entries.len(), "Cached tree");
                Ok(TreeNode {
                    id: id.clone(),
                    entries: raw.entries,
                })
            })
            .await
    }

    /// Fetch a blob by hash, cache first
    async fn blob(&self, id: &ObjectId) -> Result<Arc<Vec<u8>>, FsError> {
        self.blobs
            .get_or_fetch(id, || async {
                let encoded = self.limited(self.store.read_blob(id)).await?;
                decode_blob(&encoded)
            })
            .await
    }

    pub(crate) async fn create_blob(&self, content: &[u8]) -> Result<ObjectId, FsError> {
        let id = self.limited(self.store.create_blob(content)).await?;
        self.blobs.insert(&id, content.to_vec());
        Ok(id)
    }

    pub(crate) async fn create_tree(&self, entries: Vec<TreeEntry>) -> Result<ObjectId, FsError> {
        let id = self.limited(self.store.create_tree(&entries)).await?;
        self.trees.insert(
            &id,
            TreeNode {
                id: id.clone(),
                entries,
            },
        );
        Ok(id)
    }

    /// Walk from the current root tree down to the directory at `dir`
    async fn resolve_dir(&self, dir: &str) -> Result<Arc<TreeNode>, FsError> {
        let root = self.head.read().tree.clone();
        let mut node = self.tree(&root).await?;
        let mut walked = String::new();

        for segment in path::segments(dir) {
            walked = path::join(&walked, segment);
            let entry = node
                .find(segment)
                .cloned()
                .ok_or_else(|| FsError::NotFound(walked.clone()))?;
            if entry.kind != EntryKind::Tree {
                return Err(FsError::not_a_directory(walked));
            }
            node = self.tree(&entry.id).await?;
        }

        Ok(node)
    }
}

#[async_trait]
impl Filesystem for RemoteObjectFilesystem {
    async fn list(&self, dir: &str) -> Result<Vec<Entry>, FsError> {
        let normalized = path::normalize(dir);
        let node = self.resolve_dir(&normalized).await?;
        Ok(node
            .entries
            .iter()
            .filter(|e| e.kind.is_visible())
            .map(|e| Entry {
                name: e.name.clone(),
                directory: e.kind == EntryKind::Tree,
            })
            .collect())
    }

    async fn read_file(&self, file: &str) -> Result<Vec<u8>, FsError> {
        let normalized = path::normalize(file);
        let (parent, name) =
            path::split_parent(&normalized).ok_or_else(|| FsError::not_a_file("/"))?;

        let dir = self.resolve_dir(parent).await?;
        let entry = dir
            .find(name)
            .cloned()
            .ok_or_else(|| FsError::NotFound(normalized.clone()))?;
        if entry.kind != EntryKind::Blob {
            return Err(FsError::not_a_file(normalized));
        }

        let content = self.blob(&entry.id).await?;
        Ok(content.as_ref().clone())
    }

    async fn write(&self, file: &str, op: WriteOp) -> Result<(), FsError> {
        let normalized = path::normalize(file);
        if normalized.is_empty() && matches!(op, WriteOp::Put(_)) {
            return Err(FsError::InvalidPath(format!(
                "cannot write content to the root: {:?}",
                file
            )));
        }

        trace!(path = %normalized, delete = matches!(op, WriteOp::Delete), "Queued write");
        self.pending.lock().push(PendingWrite {
            path: normalized,
            op,
        });
        Ok(())
    }

    #[instrument(skip(self, options), fields(reference = %self.ref_name, bare = options.bare))]
    async fn sync(&self, options: &SyncOptions) -> Result<(), FsError> {
        let _transaction = self.transaction.lock().await;

        let snapshot = self.pending.lock().clone();
        if snapshot.is_empty() {
            debug!("Nothing to sync");
            return Ok(());
        }

        let head = self.head();
        let mut edits = Edit::root();
        for write in &snapshot {
            let segments: Vec<&str> = path::segments(&write.path).collect();
            edits.apply(&segments, &write.op);
        }

        let base = if options.bare {
            None
        } else {
            Some(head.tree.clone())
        };
        let parents = if options.bare {
            Vec::new()
        } else {
            vec![head.commit.clone()]
        };

        let result = async {
            let tree = TreeWriter::new(self).write_root(base, &edits).await?;
            let commit = self
                .limited(self.store.create_commit(&options.message, &tree, &parents))
                .await?;
            self.limited(self.store.update_ref(&self.ref_name, &commit, options.bare))
                .await?;
            Ok::<_, FsError>(RefState { commit, tree })
        }
        .await;

        match result {
            Ok(new_head) => {
                info!(
                    commit = %new_head.commit,
                    tree = %new_head.tree,
                    writes = snapshot.len(),
                    "Synced pending writes"
                );
                *self.head.write() = new_head;
                self.pending.lock().drain(..snapshot.len());
                Ok(())
            }
            Err(e) => {
                warn!(error = %e, writes = snapshot.len(), "Sync failed, pending writes kept");
                Err(e)
            }
        }
    }
}
