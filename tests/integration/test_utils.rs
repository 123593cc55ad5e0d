//! Shared test utilities for integration tests
//!
//! Remote filesystems are backed by `MemoryObjectStore`; local ones by
//! temporary directories.

use roki::fs::local::{LocalConfig, LocalFilesystem};
use roki::remote::{MemoryObjectStore, RemoteObjectFilesystem, RemoteOptions};
use std::sync::{Arc, Mutex};
use tempfile::TempDir;

pub const REF: &str = "heads/master";

/// Serializes tests that touch `ROKI_*` environment variables
pub static ENV_MUTEX: Mutex<()> = Mutex::new(());

pub fn memory_store() -> Arc<MemoryObjectStore> {
    Arc::new(MemoryObjectStore::new())
}

/// Open a remote filesystem over `store` with default options
pub async fn remote(store: &Arc<MemoryObjectStore>) -> RemoteObjectFilesystem {
    remote_with(store, RemoteOptions::default()).await
}

pub async fn remote_with(
    store: &Arc<MemoryObjectStore>,
    options: RemoteOptions,
) -> RemoteObjectFilesystem {
    RemoteObjectFilesystem::init(store.clone(), REF, options)
        .await
        .unwrap()
}

pub fn local(temp_dir: &TempDir, name: &str) -> LocalFilesystem {
    LocalFilesystem::new(&LocalConfig {
        root: temp_dir.path().join(name),
    })
    .unwrap()
}

/// Theme with every template the site printer needs
pub fn write_theme(dir: &std::path::Path) {
    std::fs::create_dir_all(dir).unwrap();
    for (name, source) in [
        ("pageList", "{% for p in pages %}<a href=\"{{ p.url }}\">{{ p.path }}</a>{% endfor %}"),
        ("page", "{% include \"_header\" %}{{ revision.html }}"),
        ("revisionList", "{% for r in revisions %}{{ r.id }} {% endfor %}"),
        ("revision", "{{ revision.timestamp }}{{ revision.html }}"),
        ("_header", "<h1>{{ preference.title }}</h1>"),
    ] {
        std::fs::write(dir.join(format!("{}.html", name)), source).unwrap();
    }
    std::fs::write(dir.join("preference.json"), r#"{"title": "Wiki"}"#).unwrap();
}
