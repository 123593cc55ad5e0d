//! Integration tests for the remote object filesystem: buffered writes,
//! commits, caching and failure handling.

use super::test_utils::{local, memory_store, remote, remote_with, REF};
use futures::future::try_join_all;
use roki::error::FsError;
use roki::fs::{Entry, Filesystem, SyncOptions};
use roki::page::PathTranslator;
use roki::remote::{
    EntryKind, MemoryObjectStore, ObjectStore, RemoteOptions, StoreOp, TreeEntry,
};
use roki::types::ObjectId;
use roki::Roki;
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;

#[tokio::test]
async fn test_write_sync_then_fresh_instance_reads_bytes() {
    let store = memory_store();
    let fs = remote(&store).await;
    let bytes = vec![0u8, 159, 146, 150, 255, b'\n'];

    fs.write_file("docs/binary.bin", bytes.clone()).await.unwrap();
    fs.sync(&SyncOptions::new("add binary")).await.unwrap();

    let fresh = remote(&store).await;
    assert_eq!(fresh.read_file("docs/binary.bin").await.unwrap(), bytes);
    assert_eq!(fresh.head(), fs.head());
}

#[tokio::test]
async fn test_delete_then_sync_is_not_found() {
    let store = memory_store();
    let fs = remote(&store).await;
    fs.write_file("a/keep.txt", b"keep".to_vec()).await.unwrap();
    fs.write_file("a/drop.txt", b"drop".to_vec()).await.unwrap();
    fs.sync(&SyncOptions::new("add")).await.unwrap();

    fs.remove("a/drop.txt").await.unwrap();
    fs.sync(&SyncOptions::new("remove")).await.unwrap();

    assert!(matches!(
        fs.read_file("a/drop.txt").await,
        Err(FsError::NotFound(_))
    ));
    let fresh = remote(&store).await;
    assert!(fresh.read_file("a/drop.txt").await.unwrap_err().is_not_found());
    assert_eq!(fresh.read_file("a/keep.txt").await.unwrap(), b"keep");
}

#[tokio::test]
async fn test_deleting_last_file_removes_directory() {
    let store = memory_store();
    let fs = remote(&store).await;
    fs.write_file("only/file.txt", b"x".to_vec()).await.unwrap();
    fs.sync(&SyncOptions::new("add")).await.unwrap();

    fs.remove("only/file.txt").await.unwrap();
    fs.sync(&SyncOptions::new("remove")).await.unwrap();

    assert!(fs.list("/").await.unwrap().is_empty());
    assert_eq!(fs.head().tree, store.empty_tree());
}

#[tokio::test]
async fn test_bare_sync_has_no_parents_and_forces_update() {
    let store = memory_store();
    let fs = remote(&store).await;
    fs.write_file("a.txt", b"old".to_vec()).await.unwrap();
    fs.sync(&SyncOptions::new("first")).await.unwrap();

    fs.write_file("b.txt", b"new".to_vec()).await.unwrap();
    fs.sync(&SyncOptions::new("rewrite").bare(true)).await.unwrap();

    let head = fs.head();
    let commit = store.commit(&head.commit).unwrap();
    assert!(commit.parents.is_empty());
    assert_eq!(commit.message, "rewrite");
    assert_eq!(store.forced_update_count(), 1);
    // a bare commit starts from an empty tree
    assert_eq!(store.file_paths(&head.tree), vec!["b.txt".to_string()]);
}

#[tokio::test]
async fn test_non_bare_sync_extends_history() {
    let store = memory_store();
    let fs = remote(&store).await;
    let before = fs.head();

    fs.write_file("a.txt", b"a".to_vec()).await.unwrap();
    fs.sync(&SyncOptions::new("extend")).await.unwrap();

    let commit = store.commit(&fs.head().commit).unwrap();
    assert_eq!(commit.parents, vec![before.commit]);
    assert_eq!(store.forced_update_count(), 0);
    assert_eq!(store.ref_target(REF), Some(fs.head().commit));
}

#[tokio::test]
async fn test_new_revision_bare_sync_end_to_end() {
    let store = memory_store();
    let temp_dir = TempDir::new().unwrap();
    let roki = Roki::new(remote(&store).await, local(&temp_dir, "site"));

    let revision = roki.new_revision("a/b", "# Hello, world!").await.unwrap();
    roki.source()
        .sync(&SyncOptions::new("init").bare(true))
        .await
        .unwrap();

    let head = roki.source().head();
    let expected_path = format!("a/b/_revision/{}.md", revision.id);
    assert_eq!(store.file_paths(&head.tree), vec![expected_path.clone()]);

    let fresh = remote(&store).await;
    let stored = String::from_utf8(fresh.read_file(&expected_path).await.unwrap()).unwrap();
    assert_eq!(
        stored,
        format!(
            "---\nid: {}\ntimestamp: {}\n---\n# Hello, world!",
            revision.id,
            revision.timestamp_iso()
        )
    );
    assert_eq!(revision.id, roki::page::revision_id(&revision.timestamp));
}

#[tokio::test]
async fn test_later_write_to_same_path_wins() {
    let store = memory_store();
    let fs = remote(&store).await;

    fs.write_file("x/y.txt", b"first".to_vec()).await.unwrap();
    fs.remove("x").await.unwrap();
    fs.write_file("x/z.txt", b"second".to_vec()).await.unwrap();
    fs.sync(&SyncOptions::new("batch")).await.unwrap();

    assert_eq!(store.file_paths(&fs.head().tree), vec!["x/z.txt".to_string()]);
}

#[tokio::test]
async fn test_delete_below_synced_file_keeps_it() {
    let store = memory_store();
    let fs = remote(&store).await;
    fs.write_file("notes", b"n".to_vec()).await.unwrap();
    fs.sync(&SyncOptions::new("add")).await.unwrap();

    fs.remove("notes/inner").await.unwrap();
    fs.sync(&SyncOptions::new("noop delete")).await.unwrap();

    assert_eq!(fs.read_file("notes").await.unwrap(), b"n");
}

/// Commit a root holding an executable, a symlink and a submodule link
async fn seed_special_entries(store: &Arc<MemoryObjectStore>) {
    let head = remote(store).await.head();
    let script = store.create_blob(b"#!/bin/sh\necho hi\n").await.unwrap();
    let link = store.create_blob(b"script.sh").await.unwrap();
    let tree = store
        .create_tree(&[
            TreeEntry::new("script.sh", EntryKind::Blob, script).with_mode("100755"),
            TreeEntry::new("link", EntryKind::Blob, link).with_mode("120000"),
            TreeEntry::new(
                "vendor",
                EntryKind::Commit,
                ObjectId::new("8f1d2c3b4a5968778695a4b3c2d1e0f9a8b7c6d5"),
            ),
        ])
        .await
        .unwrap();
    let commit = store
        .create_commit("seed", &tree, &[head.commit])
        .await
        .unwrap();
    store.update_ref(REF, &commit, false).await.unwrap();
}

#[tokio::test]
async fn test_sync_keeps_sibling_modes_and_submodules() {
    let store = memory_store();
    seed_special_entries(&store).await;
    let fs = remote(&store).await;

    // submodule links are not part of the filesystem view
    assert_eq!(
        fs.list("/").await.unwrap(),
        vec![Entry::file("link"), Entry::file("script.sh")]
    );
    assert!(matches!(fs.read_file("vendor").await, Err(FsError::NotFound(_))));

    fs.write_file("notes.txt", b"new".to_vec()).await.unwrap();
    fs.write_file("script.sh", b"#!/bin/sh\necho bye\n".to_vec())
        .await
        .unwrap();
    fs.remove("vendor/inner").await.unwrap();
    fs.sync(&SyncOptions::new("touch root")).await.unwrap();

    let entries = store.tree_entries(&fs.head().tree).unwrap();
    let mode_of = |name: &str| {
        entries
            .iter()
            .find(|e| e.name == name)
            .map(|e| (e.kind, e.mode.clone()))
    };
    assert_eq!(mode_of("notes.txt"), Some((EntryKind::Blob, "100644".to_string())));
    assert_eq!(mode_of("script.sh"), Some((EntryKind::Blob, "100755".to_string())));
    assert_eq!(mode_of("link"), Some((EntryKind::Blob, "120000".to_string())));
    assert_eq!(mode_of("vendor"), Some((EntryKind::Commit, "160000".to_string())));
    assert_eq!(fs.read_file("script.sh").await.unwrap(), b"#!/bin/sh\necho bye\n");
}

#[tokio::test]
async fn test_sync_failure_keeps_state_and_retry_succeeds() {
    let store = memory_store();
    let fs = remote(&store).await;
    let head = fs.head();

    fs.write_file("p.txt", b"p".to_vec()).await.unwrap();
    store.fail_on(StoreOp::UpdateRef);

    let result = fs.sync(&SyncOptions::new("attempt")).await;
    assert!(matches!(result, Err(FsError::Remote(_))));
    assert_eq!(fs.head(), head);
    assert_eq!(fs.pending_writes().len(), 1);
    assert_eq!(store.ref_target(REF), Some(head.commit.clone()));

    store.clear_failures();
    fs.sync(&SyncOptions::new("retry")).await.unwrap();

    assert!(fs.pending_writes().is_empty());
    assert_ne!(fs.head(), head);
    assert_eq!(fs.read_file("p.txt").await.unwrap(), b"p");
}

#[tokio::test]
async fn test_concurrent_ref_move_rejects_non_forced_sync() {
    let store = memory_store();
    let first = remote(&store).await;
    let second = remote(&store).await;

    first.write_file("a.txt", b"a".to_vec()).await.unwrap();
    first.sync(&SyncOptions::new("first")).await.unwrap();

    second.write_file("b.txt", b"b".to_vec()).await.unwrap();
    let result = second.sync(&SyncOptions::new("stale")).await;

    assert!(matches!(result, Err(FsError::Remote(_))));
    assert_eq!(second.pending_writes().len(), 1);
}

#[tokio::test]
async fn test_writes_during_sync_are_kept() {
    let store = Arc::new(MemoryObjectStore::new().with_latency(Duration::from_millis(20)));
    let fs = remote(&store).await;

    fs.write_file("early.txt", b"early".to_vec()).await.unwrap();
    let options = SyncOptions::new("early");
    let (synced, queued) = tokio::join!(fs.sync(&options), async {
        tokio::time::sleep(Duration::from_millis(5)).await;
        fs.write_file("late.txt", b"late".to_vec()).await
    });
    synced.unwrap();
    queued.unwrap();

    let pending = fs.pending_writes();
    assert_eq!(pending.len(), 1);
    assert_eq!(pending[0].path, "late.txt");
    assert_eq!(store.file_paths(&fs.head().tree), vec!["early.txt".to_string()]);
}

#[tokio::test]
async fn test_truncated_listing_is_fatal() {
    let store = memory_store();
    let fs = remote(&store).await;
    fs.write_file("a/b.txt", b"x".to_vec()).await.unwrap();
    fs.sync(&SyncOptions::new("add")).await.unwrap();

    store.set_truncate_listings(true);
    let fresh = remote(&store).await;

    assert!(matches!(
        fresh.list("/").await,
        Err(FsError::TruncatedListing(_))
    ));
    assert!(matches!(
        fresh.read_file("a/b.txt").await,
        Err(FsError::TruncatedListing(_))
    ));
}

#[tokio::test]
async fn test_blob_encodings() {
    let store = memory_store();
    let fs = remote(&store).await;
    fs.write_file("note.txt", b"plain text".to_vec()).await.unwrap();
    fs.sync(&SyncOptions::new("add")).await.unwrap();

    store.set_blob_encoding("utf-8");
    let fresh = remote(&store).await;
    assert_eq!(fresh.read_file("note.txt").await.unwrap(), b"plain text");

    store.set_blob_encoding("latin1");
    let fresh = remote(&store).await;
    assert!(matches!(
        fresh.read_file("note.txt").await,
        Err(FsError::UnsupportedEncoding(_))
    ));
}

#[tokio::test]
async fn test_type_mismatches() {
    let store = memory_store();
    let fs = remote(&store).await;
    fs.write_file("dir/file.txt", b"x".to_vec()).await.unwrap();
    fs.sync(&SyncOptions::new("add")).await.unwrap();

    assert!(matches!(
        fs.list("dir/file.txt").await,
        Err(FsError::UnexpectedType { .. })
    ));
    assert!(matches!(
        fs.read_file("dir").await,
        Err(FsError::UnexpectedType { .. })
    ));
    assert!(matches!(fs.list("missing").await, Err(FsError::NotFound(_))));
}

#[tokio::test]
async fn test_concurrent_reads_share_fetches() {
    let store = Arc::new(MemoryObjectStore::new().with_latency(Duration::from_millis(10)));
    let writer = remote(&store).await;
    for (name, content) in [("a", "same"), ("b", "same"), ("c", "other"), ("d", "third")] {
        writer
            .write_file(&format!("shared/{}.txt", name), content.as_bytes().to_vec())
            .await
            .unwrap();
    }
    writer.sync(&SyncOptions::new("add")).await.unwrap();

    let reader = remote(&store).await;
    let trees_before = store.request_count(StoreOp::ReadTree);
    let blobs_before = store.request_count(StoreOp::ReadBlob);

    let paths: Vec<String> = ["a", "b", "c", "d", "a", "c"]
        .iter()
        .map(|name| format!("shared/{}.txt", name))
        .collect();
    let contents = try_join_all(paths.iter().map(|p| reader.read_file(p)))
        .await
        .unwrap();

    assert_eq!(contents[0], b"same");
    assert_eq!(contents[3], b"third");
    // root and `shared`, each fetched once
    assert_eq!(store.request_count(StoreOp::ReadTree) - trees_before, 2);
    // three distinct blobs
    assert_eq!(store.request_count(StoreOp::ReadBlob) - blobs_before, 3);
}

#[tokio::test]
async fn test_unchanged_subtrees_are_reused() {
    let store = memory_store();
    let fs = remote(&store).await;
    fs.write_file("a/x.txt", b"x".to_vec()).await.unwrap();
    fs.write_file("b/y.txt", b"y".to_vec()).await.unwrap();
    fs.sync(&SyncOptions::new("first")).await.unwrap();

    let first_root = store.read_tree(&fs.head().tree).await.unwrap();
    let trees_created = store.request_count(StoreOp::CreateTree);

    fs.write_file("a/z.txt", b"z".to_vec()).await.unwrap();
    fs.sync(&SyncOptions::new("second")).await.unwrap();

    let second_root = store.read_tree(&fs.head().tree).await.unwrap();
    let subtree = |tree: &roki::remote::RawTree, name: &str| {
        tree.entries
            .iter()
            .find(|e| e.name == name)
            .map(|e| e.id.clone())
            .unwrap()
    };
    assert_eq!(subtree(&first_root, "b"), subtree(&second_root, "b"));
    assert_ne!(subtree(&first_root, "a"), subtree(&second_root, "a"));
    // only `a` and the root are rebuilt
    assert_eq!(store.request_count(StoreOp::CreateTree) - trees_created, 2);
}

#[tokio::test]
async fn test_in_flight_limit_and_bounded_cache_still_read_correctly() {
    let store = Arc::new(MemoryObjectStore::new().with_latency(Duration::from_millis(2)));
    let writer = remote(&store).await;
    for i in 0..8 {
        writer
            .write_file(
                &PathTranslator::revision_file(&format!("p{}", i), "k1"),
                format!("content {}", i).into_bytes(),
            )
            .await
            .unwrap();
    }
    writer.sync(&SyncOptions::new("add")).await.unwrap();

    let reader = remote_with(
        &store,
        RemoteOptions {
            cache_capacity: Some(2),
            max_in_flight: Some(1),
        },
    )
    .await;
    let reads = (0..8).map(|i| {
        let reader = &reader;
        async move {
            reader
                .read_file(&PathTranslator::revision_file(&format!("p{}", i), "k1"))
                .await
        }
    });
    let contents = try_join_all(reads).await.unwrap();
    for (i, content) in contents.iter().enumerate() {
        assert_eq!(content, format!("content {}", i).as_bytes());
    }
}
