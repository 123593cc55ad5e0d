//! Integration tests for site generation

use super::test_utils::{local, memory_store, remote, write_theme};
use async_trait::async_trait;
use roki::error::RokiError;
use roki::fs::{Filesystem, SyncOptions};
use roki::page::Page;
use roki::printer::{Artifact, Printer};
use roki::render::{PlainTextRenderer, Renderer};
use roki::theme::{DirectoryThemeLoader, Theme, ThemeLoader};
use roki::Roki;
use std::sync::{Arc, Mutex};
use tempfile::TempDir;

#[tokio::test]
async fn test_generate_writes_every_artifact() {
    let temp_dir = TempDir::new().unwrap();
    let roki = Roki::new(local(&temp_dir, "wiki"), local(&temp_dir, "site"));

    roki.new_revision("/", "Welcome").await.unwrap();
    roki.new_revision("guide", "first").await.unwrap();
    tokio::time::sleep(std::time::Duration::from_millis(5)).await;
    let latest = roki.new_revision("guide", "second <draft>").await.unwrap();
    let stored = roki
        .new_attachment("guide", "diagram.svg", b"<svg/>".to_vec())
        .await
        .unwrap();

    let theme_dir = temp_dir.path().join("theme");
    write_theme(&theme_dir);
    let theme = DirectoryThemeLoader::new(&theme_dir).load().await.unwrap();

    let count = roki.generate(&PlainTextRenderer, &theme).await.unwrap();

    // page list + 2 pages + 2 revision lists + 3 revisions + 1 attachment
    assert_eq!(count, 1 + 2 + 2 + 3 + 1);

    let site = roki.destination();
    let read = |path: String| async move {
        String::from_utf8(site.read_file(&path).await.unwrap()).unwrap()
    };
    let page_list = read("_pages/index.html".to_string()).await;
    assert!(page_list.contains("<a href=\"/guide/\">guide</a>"));
    assert_eq!(
        read("guide/index.html".to_string()).await,
        "<h1>Wiki</h1><p>second &lt;draft&gt;</p>"
    );
    assert_eq!(read("index.html".to_string()).await, "<h1>Wiki</h1><p>Welcome</p>");
    assert!(read("guide/_revisions/index.html".to_string())
        .await
        .starts_with(&latest.id));
    assert_eq!(
        read(format!("guide/_revisions/{}/index.html", latest.id)).await,
        format!("{}<p>second &lt;draft&gt;</p>", latest.timestamp_iso())
    );
    assert_eq!(
        site.read_file(&format!("guide/_attachments/{}", stored))
            .await
            .unwrap(),
        b"<svg/>"
    );
}

#[tokio::test]
async fn test_generate_into_remote_destination() {
    let temp_dir = TempDir::new().unwrap();
    let store = memory_store();
    let roki = Roki::new(local(&temp_dir, "wiki"), remote(&store).await);
    roki.new_revision("a", "text").await.unwrap();

    let theme_dir = temp_dir.path().join("theme");
    write_theme(&theme_dir);
    let theme = DirectoryThemeLoader::new(&theme_dir).load().await.unwrap();

    let count = roki.generate(&PlainTextRenderer, &theme).await.unwrap();
    roki.destination()
        .sync(&SyncOptions::new("Generate site").bare(true))
        .await
        .unwrap();

    let head = roki.destination().head();
    assert_eq!(store.file_paths(&head.tree).len(), count);
}

/// Records what it was given and returns fixed artifacts
struct RecordingPrinter {
    seen: Arc<Mutex<Vec<String>>>,
}

#[async_trait]
impl Printer for RecordingPrinter {
    async fn print(
        &self,
        pages: &[Page],
        renderer: &dyn Renderer,
        _theme: &Theme,
    ) -> Result<Vec<Artifact>, RokiError> {
        let mut seen = self.seen.lock().unwrap();
        for page in pages {
            seen.push(page.path.clone());
        }
        Ok(vec![Artifact::new("out.html", renderer.render("x")?)])
    }
}

#[tokio::test]
async fn test_generate_uses_custom_printer() {
    let temp_dir = TempDir::new().unwrap();
    let seen = Arc::new(Mutex::new(Vec::new()));
    let roki = Roki::with_printer(
        local(&temp_dir, "wiki"),
        local(&temp_dir, "site"),
        Box::new(RecordingPrinter { seen: seen.clone() }),
    );
    roki.new_revision("only", "text").await.unwrap();

    let count = roki
        .generate(&PlainTextRenderer, &Theme::default())
        .await
        .unwrap();

    assert_eq!(count, 1);
    assert_eq!(*seen.lock().unwrap(), vec!["only".to_string()]);
    assert_eq!(
        roki.destination().read_file("out.html").await.unwrap(),
        b"<p>x</p>"
    );
}

#[tokio::test]
async fn test_generate_fails_on_incomplete_theme() {
    let temp_dir = TempDir::new().unwrap();
    let roki = Roki::new(local(&temp_dir, "wiki"), local(&temp_dir, "site"));
    roki.new_revision("p", "text").await.unwrap();

    let result = roki.generate(&PlainTextRenderer, &Theme::default()).await;
    assert!(matches!(result, Err(RokiError::Theme(_))));
}
