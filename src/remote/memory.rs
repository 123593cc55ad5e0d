//! In-process object store
//!
//! Content-addressed store with the same observable semantics as the remote
//! git-data API: immutable objects, fast-forward-only ref updates unless
//! forced, and trees that may only reference objects the store already holds.
//! Request counters, latency, failure injection and listing knobs make it the
//! backing store for tests.

use crate::error::FsError;
use crate::remote::store::{Commit, EncodedBlob, EntryKind, ObjectStore, RawTree, TreeEntry};
use crate::types::{ObjectId, EMPTY_TREE_ID};
use async_trait::async_trait;
use base64::Engine;
use parking_lot::Mutex;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::time::Duration;

/// Store operation, used for counting requests and injecting failures
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StoreOp {
    ReadRef,
    ReadCommit,
    ReadTree,
    ReadBlob,
    CreateBlob,
    CreateTree,
    CreateCommit,
    UpdateRef,
    CreateRef,
}

#[derive(Default)]
struct MemoryState {
    refs: HashMap<String, ObjectId>,
    commits: HashMap<ObjectId, Commit>,
    trees: HashMap<ObjectId, Vec<TreeEntry>>,
    blobs: HashMap<ObjectId, Vec<u8>>,
    requests: HashMap<StoreOp, usize>,
    failures: HashSet<StoreOp>,
    truncate_listings: bool,
    blob_encoding: Option<String>,
    forced_updates: usize,
}

/// Object store held entirely in memory
pub struct MemoryObjectStore {
    state: Mutex<MemoryState>,
    latency: Option<Duration>,
}

impl Default for MemoryObjectStore {
    fn default() -> Self {
        Self::new()
    }
}

fn hash_object(kind: &str, payload: &[u8]) -> ObjectId {
    let mut hasher = blake3::Hasher::new();
    hasher.update(kind.as_bytes());
    hasher.update(&(payload.len() as u64).to_be_bytes());
    hasher.update(payload);
    ObjectId::new(hex::encode(hasher.finalize().as_bytes()))
}

fn normalize_ref(name: &str) -> String {
    name.trim_start_matches("refs/").to_string()
}

impl MemoryObjectStore {
    pub fn new() -> Self {
        let mut state = MemoryState::default();
        state
            .trees
            .insert(ObjectId::from(EMPTY_TREE_ID), Vec::new());
        Self {
            state: Mutex::new(state),
            latency: None,
        }
    }

    /// Delay every request, so concurrent requests overlap
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    /// Make every subsequent call of `op` fail until cleared
    pub fn fail_on(&self, op: StoreOp) {
        self.state.lock().failures.insert(op);
    }

    pub fn clear_failures(&self) {
        self.state.lock().failures.clear();
    }

    /// Report every tree listing as truncated
    pub fn set_truncate_listings(&self, truncate: bool) {
        self.state.lock().truncate_listings = truncate;
    }

    /// Report blobs with this encoding label; the payload is sent raw unless the label is `base64`
    pub fn set_blob_encoding(&self, encoding: &str) {
        self.state.lock().blob_encoding = Some(encoding.to_string());
    }

    /// Number of requests made for an operation
    pub fn request_count(&self, op: StoreOp) -> usize {
        self.state.lock().requests.get(&op).copied().unwrap_or(0)
    }

    /// Number of ref updates that were forced
    pub fn forced_update_count(&self) -> usize {
        self.state.lock().forced_updates
    }

    pub fn ref_target(&self, name: &str) -> Option<ObjectId> {
        self.state.lock().refs.get(&normalize_ref(name)).cloned()
    }

    pub fn commit(&self, id: &ObjectId) -> Option<Commit> {
        self.state.lock().commits.get(id).cloned()
    }

    /// Entries of a stored tree, without counting a request
    pub fn tree_entries(&self, id: &ObjectId) -> Option<Vec<TreeEntry>> {
        self.state.lock().trees.get(id).cloned()
    }

    /// Every file path reachable from a tree, sorted
    pub fn file_paths(&self, tree: &ObjectId) -> Vec<String> {
        let state = self.state.lock();
        let mut paths = Vec::new();
        let mut pending = vec![(String::new(), tree.clone())];
        while let Some((prefix, id)) = pending.pop() {
            let Some(entries) = state.trees.get(&id) else {
                continue;
            };
            for entry in entries {
                let path = if prefix.is_empty() {
                    entry.name.clone()
                } else {
                    format!("{}/{}", prefix, entry.name)
                };
                match entry.kind {
                    EntryKind::Blob => paths.push(path),
                    EntryKind::Tree => pending.push((path, entry.id.clone())),
                    EntryKind::Commit => {}
                }
            }
        }
        paths.sort();
        paths
    }

    async fn begin(&self, op: StoreOp) -> Result<(), FsError> {
        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }
        let mut state = self.state.lock();
        *state.requests.entry(op).or_insert(0) += 1;
        if state.failures.contains(&op) {
            return Err(FsError::Remote(format!("injected failure for {:?}", op)));
        }
        Ok(())
    }
}

#[async_trait]
impl ObjectStore for MemoryObjectStore {
    async fn read_ref(&self, name: &str) -> Result<Option<ObjectId>, FsError> {
        self.begin(StoreOp::ReadRef).await?;
        Ok(self.ref_target(name))
    }

    async fn read_commit(&self, id: &ObjectId) -> Result<Commit, FsError> {
        self.begin(StoreOp::ReadCommit).await?;
        self.commit(id)
            .ok_or_else(|| FsError::NotFound(format!("commit {}", id)))
    }

    async fn read_tree(&self, id: &ObjectId) -> Result<RawTree, FsError> {
        self.begin(StoreOp::ReadTree).await?;
        let state = self.state.lock();
        let entries = state
            .trees
            .get(id)
            .cloned()
            .ok_or_else(|| FsError::NotFound(format!("tree {}", id)))?;
        Ok(RawTree {
            id: id.clone(),
            entries,
            truncated: state.truncate_listings,
        })
    }

    async fn read_blob(&self, id: &ObjectId) -> Result<EncodedBlob, FsError> {
        self.begin(StoreOp::ReadBlob).await?;
        let state = self.state.lock();
        let content = state
            .blobs
            .get(id)
            .ok_or_else(|| FsError::NotFound(format!("blob {}", id)))?;
        let encoding = state
            .blob_encoding
            .clone()
            .unwrap_or_else(|| "base64".to_string());
        let content = if encoding == "base64" {
            base64::engine::general_purpose::STANDARD.encode(content)
        } else {
            String::from_utf8_lossy(content).into_owned()
        };
        Ok(EncodedBlob { content, encoding })
    }

    async fn create_blob(&self, content: &[u8]) -> Result<ObjectId, FsError> {
        self.begin(StoreOp::CreateBlob).await?;
        let id = hash_object("blob", content);
        self.state
            .lock()
            .blobs
            .entry(id.clone())
            .or_insert_with(|| content.to_vec());
        Ok(id)
    }

    async fn create_tree(&self, entries: &[TreeEntry]) -> Result<ObjectId, FsError> {
        self.begin(StoreOp::CreateTree).await?;
        if entries.is_empty() {
            return Ok(ObjectId::from(EMPTY_TREE_ID));
        }

        let mut state = self.state.lock();
        let mut sorted: BTreeMap<&str, &TreeEntry> = BTreeMap::new();
        for entry in entries {
            let known = match entry.kind {
                EntryKind::Blob => state.blobs.contains_key(&entry.id),
                EntryKind::Tree => state.trees.contains_key(&entry.id),
                // Submodule commits live in another repository.
                EntryKind::Commit => true,
            };
            if !known {
                return Err(FsError::Remote(format!(
                    "tree entry {} references unknown object {}",
                    entry.name, entry.id
                )));
            }
            if sorted.insert(entry.name.as_str(), entry).is_some() {
                return Err(FsError::Remote(format!("duplicate tree entry {}", entry.name)));
            }
        }

        let mut payload = String::new();
        for entry in sorted.values() {
            payload.push_str(&format!("{} {} {}\n", entry.mode, entry.name, entry.id));
        }
        let id = hash_object("tree", payload.as_bytes());
        let stored: Vec<TreeEntry> = sorted.into_values().cloned().collect();
        state.trees.entry(id.clone()).or_insert(stored);
        Ok(id)
    }

    async fn create_commit(
        &self,
        message: &str,
        tree: &ObjectId,
        parents: &[ObjectId],
    ) -> Result<ObjectId, FsError> {
        self.begin(StoreOp::CreateCommit).await?;
        let mut state = self.state.lock();
        if !state.trees.contains_key(tree) {
            return Err(FsError::Remote(format!("commit references unknown tree {}", tree)));
        }

        let mut payload = format!("tree {}\n", tree);
        for parent in parents {
            payload.push_str(&format!("parent {}\n", parent));
        }
        payload.push_str(&format!("seq {}\n\n{}", state.commits.len(), message));
        let id = hash_object("commit", payload.as_bytes());

        state.commits.insert(
            id.clone(),
            Commit {
                id: id.clone(),
                tree: tree.clone(),
                parents: parents.to_vec(),
                message: message.to_string(),
            },
        );
        Ok(id)
    }

    async fn update_ref(&self, name: &str, commit: &ObjectId, force: bool) -> Result<(), FsError> {
        self.begin(StoreOp::UpdateRef).await?;
        let mut state = self.state.lock();
        let key = normalize_ref(name);
        let current = state
            .refs
            .get(&key)
            .cloned()
            .ok_or_else(|| FsError::NotFound(format!("ref {}", name)))?;
        let target = state
            .commits
            .get(commit)
            .cloned()
            .ok_or_else(|| FsError::Remote(format!("unknown commit {}", commit)))?;

        if force {
            state.forced_updates += 1;
        } else if !target.parents.contains(&current) && current != *commit {
            return Err(FsError::Remote(format!(
                "update of {} to {} is not a fast forward",
                name, commit
            )));
        }

        state.refs.insert(key, commit.clone());
        Ok(())
    }

    async fn create_ref(&self, name: &str, commit: &ObjectId) -> Result<(), FsError> {
        self.begin(StoreOp::CreateRef).await?;
        let mut state = self.state.lock();
        let key = normalize_ref(name);
        if state.refs.contains_key(&key) {
            return Err(FsError::Remote(format!("ref {} already exists", name)));
        }
        if !state.commits.contains_key(commit) {
            return Err(FsError::Remote(format!("unknown commit {}", commit)));
        }
        state.refs.insert(key, commit.clone());
        Ok(())
    }

    fn store_name(&self) -> &str {
        "memory"
    }
}
