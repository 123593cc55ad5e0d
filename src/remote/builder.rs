//! Tree builder for sync transactions
//!
//! Pending writes are folded into an edit trie first, so later writes to a
//! path override earlier ones. The trie is then written bottom-up: only
//! directories on an edited path produce new tree objects, every other
//! subtree is carried over by hash.

use crate::error::FsError;
use crate::fs::WriteOp;
use crate::remote::store::{EntryKind, TreeEntry};
use crate::remote::{RemoteObjectFilesystem, TreeNode};
use crate::types::ObjectId;
use futures::future::{try_join_all, BoxFuture};
use futures::FutureExt;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::trace;

/// Accumulated edits for one path
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Edit {
    Put(Vec<u8>),
    Delete,
    /// Edits below this directory. `reset` drops the base contents first.
    Dir {
        reset: bool,
        children: BTreeMap<String, Edit>,
    },
}

impl Edit {
    pub(crate) fn root() -> Self {
        Edit::Dir {
            reset: false,
            children: BTreeMap::new(),
        }
    }

    /// Record a write at `segments` below this node
    pub(crate) fn apply(&mut self, segments: &[&str], op: &WriteOp) {
        let Some((first, rest)) = segments.split_first() else {
            *self = match op {
                WriteOp::Put(content) => Edit::Put(content.clone()),
                WriteOp::Delete => Edit::Delete,
            };
            return;
        };

        if !matches!(self, Edit::Dir { .. }) {
            if matches!(op, WriteOp::Delete) {
                // Nothing can exist below a file or a deleted path.
                return;
            }
            // A file or a deletion here is replaced by a fresh directory.
            *self = Edit::Dir {
                reset: true,
                children: BTreeMap::new(),
            };
        }

        if let Edit::Dir { children, .. } = self {
            children
                .entry((*first).to_string())
                .or_insert_with(Edit::root)
                .apply(rest, op);
        }
    }
}

/// Writes an edit trie as tree objects through a remote filesystem
pub(crate) struct TreeWriter<'a> {
    fs: &'a RemoteObjectFilesystem,
}

impl<'a> TreeWriter<'a> {
    pub(crate) fn new(fs: &'a RemoteObjectFilesystem) -> Self {
        Self { fs }
    }

    /// Write the root directory; `base` is the tree the edits apply on top of
    pub(crate) async fn write_root(
        &self,
        base: Option<ObjectId>,
        edits: &Edit,
    ) -> Result<ObjectId, FsError> {
        let written = match edits {
            Edit::Dir { reset, children } => {
                let base_node = match (*reset, base) {
                    (false, Some(id)) => Some(self.fs.tree(&id).await?),
                    _ => None,
                };
                self.write_dir(base_node, children).await?
            }
            // The root itself was deleted.
            _ => None,
        };

        Ok(match written {
            Some(id) => id,
            None => self.fs.empty_tree(),
        })
    }

    /// Write one directory level; `None` when the directory ends up empty
    fn write_dir<'b>(
        &'b self,
        base: Option<Arc<TreeNode>>,
        children: &'b BTreeMap<String, Edit>,
    ) -> BoxFuture<'b, Result<Option<ObjectId>, FsError>> {
        async move {
            let mut entries: BTreeMap<String, TreeEntry> = base
                .as_ref()
                .map(|node| {
                    node.entries
                        .iter()
                        .map(|e| (e.name.clone(), e.clone()))
                        .collect()
                })
                .unwrap_or_default();

            let jobs = children.iter().map(|(name, edit)| {
                let base_entry = entries.get(name).cloned();
                async move {
                    let written = match edit {
                        Edit::Put(content) => {
                            let id = self.fs.create_blob(content).await?;
                            let entry = TreeEntry::new(name.clone(), EntryKind::Blob, id);
                            // Overwriting a file keeps its mode.
                            Some(match &base_entry {
                                Some(base) if base.kind == EntryKind::Blob => {
                                    entry.with_mode(base.mode.clone())
                                }
                                _ => entry,
                            })
                        }
                        Edit::Delete => None,
                        Edit::Dir { reset, children } => {
                            let child_base = match &base_entry {
                                Some(entry) if !*reset && entry.kind == EntryKind::Tree => {
                                    Some(self.fs.tree(&entry.id).await?)
                                }
                                _ => None,
                            };
                            match (self.write_dir(child_base, children).await?, base_entry) {
                                (Some(id), _) => {
                                    Some(TreeEntry::new(name.clone(), EntryKind::Tree, id))
                                }
                                // Deletions below a file or submodule leave it alone.
                                (None, Some(entry)) if !*reset && entry.kind != EntryKind::Tree => {
                                    Some(entry)
                                }
                                (None, _) => None,
                            }
                        }
                    };
                    Ok::<_, FsError>((name, written))
                }
            });

            for (name, written) in try_join_all(jobs).await? {
                match written {
                    Some(entry) => {
                        entries.insert(name.clone(), entry);
                    }
                    None => {
                        entries.remove(name);
                    }
                }
            }

            if entries.is_empty() {
                return Ok(None);
            }

            if let Some(node) = &base {
                let unchanged = node.entries.len() == entries.len()
                    && node
                        .entries
                        .iter()
                        .all(|e| entries.get(&e.name) == Some(e));
                if unchanged {
                    trace!(tree = %node.id, "Reusing unchanged tree");
                    return Ok(Some(node.id.clone()));
                }
            }

            let entries: Vec<TreeEntry> = entries.into_values().collect();
            self.fs.create_tree(entries).await.map(Some)
        }
        .boxed()
    }
}
