//! Integration tests for the local filesystem backend

use super::test_utils::{local, memory_store, remote};
use roki::error::FsError;
use roki::fs::{Entry, Filesystem, SyncOptions};
use tempfile::TempDir;

#[tokio::test]
async fn test_write_list_read() {
    let temp_dir = TempDir::new().unwrap();
    let fs = local(&temp_dir, "root");

    fs.write_file("b/file.txt", b"hello".to_vec()).await.unwrap();
    fs.write_file("a.txt", Vec::new()).await.unwrap();

    assert_eq!(
        fs.list("/").await.unwrap(),
        vec![Entry::file("a.txt"), Entry::directory("b")]
    );
    assert_eq!(fs.read_file("/b//file.txt").await.unwrap(), b"hello");
    // zero-length content is a file, not a deletion
    assert_eq!(fs.read_file("a.txt").await.unwrap(), Vec::<u8>::new());
}

#[tokio::test]
async fn test_errors_by_kind() {
    let temp_dir = TempDir::new().unwrap();
    let fs = local(&temp_dir, "root");
    fs.write_file("dir/file.txt", b"x".to_vec()).await.unwrap();

    assert!(matches!(fs.read_file("nope").await, Err(FsError::NotFound(_))));
    assert!(matches!(fs.list("nope").await, Err(FsError::NotFound(_))));
    assert!(matches!(
        fs.read_file("dir").await,
        Err(FsError::UnexpectedType { .. })
    ));
    assert!(matches!(
        fs.list("dir/file.txt").await,
        Err(FsError::UnexpectedType { .. })
    ));
}

#[tokio::test]
async fn test_delete_file_and_directory() {
    let temp_dir = TempDir::new().unwrap();
    let fs = local(&temp_dir, "root");
    fs.write_file("p/_revision/a.md", b"a".to_vec()).await.unwrap();
    fs.write_file("p/_revision/b.md", b"b".to_vec()).await.unwrap();
    fs.write_file("p/other.txt", b"o".to_vec()).await.unwrap();

    fs.remove("p/other.txt").await.unwrap();
    fs.remove("p/_revision").await.unwrap();
    // deleting something absent is not an error
    fs.remove("p/missing").await.unwrap();

    assert!(fs.list("p").await.unwrap().is_empty());
}

#[tokio::test]
async fn test_paths_cannot_escape_root() {
    let temp_dir = TempDir::new().unwrap();
    let fs = local(&temp_dir, "root");

    fs.write_file("../../outside.txt", b"x".to_vec()).await.unwrap();

    assert!(!temp_dir.path().join("outside.txt").exists());
    assert!(temp_dir.path().join("root").join("outside.txt").exists());
}

#[tokio::test]
async fn test_sync_is_a_noop() {
    let temp_dir = TempDir::new().unwrap();
    let fs = local(&temp_dir, "root");
    fs.write_file("x", b"x".to_vec()).await.unwrap();

    fs.sync(&SyncOptions::new("ignored").bare(true)).await.unwrap();

    assert_eq!(fs.read_file("x").await.unwrap(), b"x");
}

/// Apply the same writes to both backends and sync them
async fn write_both(local_fs: &dyn Filesystem, remote_fs: &dyn Filesystem, paths: &[(&str, &[u8])]) {
    for (path, content) in paths {
        local_fs.write_file(path, content.to_vec()).await.unwrap();
        remote_fs.write_file(path, content.to_vec()).await.unwrap();
    }
    let options = SyncOptions::new("write");
    local_fs.sync(&options).await.unwrap();
    remote_fs.sync(&options).await.unwrap();
}

#[tokio::test]
async fn test_path_through_file_matches_remote() {
    let temp_dir = TempDir::new().unwrap();
    let local_fs = local(&temp_dir, "root");
    let store = memory_store();
    let remote_fs = remote(&store).await;
    write_both(&local_fs, &remote_fs, &[("d/f", b"x")]).await;

    for fs in [&local_fs as &dyn Filesystem, &remote_fs] {
        assert!(matches!(
            fs.list("d/f/x").await,
            Err(FsError::UnexpectedType { .. })
        ));
        assert!(matches!(
            fs.read_file("d/f/x").await,
            Err(FsError::UnexpectedType { .. })
        ));
    }
}

#[tokio::test]
async fn test_root_delete_matches_remote() {
    let temp_dir = TempDir::new().unwrap();
    let local_fs = local(&temp_dir, "root");
    let store = memory_store();
    let remote_fs = remote(&store).await;
    write_both(&local_fs, &remote_fs, &[("a/b.txt", b"b"), ("c.txt", b"c")]).await;

    for fs in [&local_fs as &dyn Filesystem, &remote_fs] {
        fs.remove("/").await.unwrap();
        fs.sync(&SyncOptions::new("clear")).await.unwrap();
        assert!(fs.list("/").await.unwrap().is_empty());
    }

    // the emptied root still accepts writes
    write_both(&local_fs, &remote_fs, &[("again.txt", b"again")]).await;
    assert_eq!(
        local_fs.list("/").await.unwrap(),
        remote_fs.list("/").await.unwrap()
    );
}

#[tokio::test]
async fn test_later_write_replaces_file_or_directory_on_both_backends() {
    let temp_dir = TempDir::new().unwrap();
    let local_fs = local(&temp_dir, "root");
    let store = memory_store();
    let remote_fs = remote(&store).await;

    write_both(&local_fs, &remote_fs, &[("a", b"file")]).await;
    write_both(&local_fs, &remote_fs, &[("a/b", b"nested")]).await;
    for fs in [&local_fs as &dyn Filesystem, &remote_fs] {
        assert_eq!(fs.list("a").await.unwrap(), vec![Entry::file("b")]);
        assert_eq!(fs.read_file("a/b").await.unwrap(), b"nested");
    }

    write_both(&local_fs, &remote_fs, &[("a", b"file again")]).await;
    for fs in [&local_fs as &dyn Filesystem, &remote_fs] {
        assert_eq!(fs.read_file("a").await.unwrap(), b"file again");
    }
}
