//! Content parser: rebuilds pages by walking a filesystem
//!
//! Each directory level lists its entries, then recurses into every
//! non-structural sub-directory while reading its own revisions and
//! attachments concurrently. A directory becomes a page only if it owns at
//! least one revision; its sub-pages are reported either way.

use crate::error::{FsError, RokiError};
use crate::fs::{path, Entry, Filesystem};
use crate::page::path::{is_reserved, PathTranslator, REVISION_EXT};
use crate::page::{Attachment, Page, Revision};
use futures::future::{try_join3, try_join_all, BoxFuture};
use futures::FutureExt;
use tracing::{debug, instrument, warn};

/// Walks a filesystem and reconstructs its pages
pub struct ContentParser<'a, F: Filesystem + ?Sized> {
    fs: &'a F,
}

impl<'a, F: Filesystem + ?Sized> ContentParser<'a, F> {
    pub fn new(fs: &'a F) -> Self {
        Self { fs }
    }

    /// Every page at or below `root`
    ///
    /// Revisions and attachments come back in storage order; sorting them is
    /// left to presentation.
    #[instrument(skip(self))]
    pub async fn get_pages(&self, root: &str) -> Result<Vec<Page>, RokiError> {
        let pages = self.walk(PathTranslator::page_dir(root)).await?;
        debug!(pages = pages.len(), "Parsed pages");
        Ok(pages)
    }

    fn walk(&self, dir: String) -> BoxFuture<'_, Result<Vec<Page>, RokiError>> {
        async move {
            let entries = self.fs.list(&dir).await?;

            let mut children = Vec::new();
            for entry in entries {
                if !entry.directory {
                    warn!(path = %dir, entry = %entry.name, "Skipping stray file among pages");
                    continue;
                }
                if is_reserved(&entry.name) {
                    continue;
                }
                children.push(path::join(&dir, &entry.name));
            }

            let (nested, revisions, attachments) = try_join3(
                try_join_all(children.into_iter().map(|child| self.walk(child))),
                self.revisions(&dir),
                self.attachments(&dir),
            )
            .await?;

            let mut pages = Vec::new();
            if !revisions.is_empty() {
                pages.push(Page {
                    path: dir,
                    revisions,
                    attachments,
                });
            }
            pages.extend(nested.into_iter().flatten());
            Ok(pages)
        }
        .boxed()
    }

    /// List a structural directory; a missing one is simply empty
    async fn list_structural(&self, dir: &str) -> Result<Vec<Entry>, RokiError> {
        match self.fs.list(dir).await {
            Ok(entries) => Ok(entries),
            Err(FsError::NotFound(_)) => Ok(Vec::new()),
            Err(FsError::UnexpectedType { .. }) => {
                warn!(path = %dir, "Structural directory is a file, ignoring it");
                Ok(Vec::new())
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn revisions(&self, page: &str) -> Result<Vec<Revision>, RokiError> {
        let dir = PathTranslator::revision_dir(page);
        let entries = self.list_structural(&dir).await?;

        let files: Vec<String> = entries
            .into_iter()
            .filter(|entry| {
                if entry.directory {
                    warn!(path = %dir, entry = %entry.name, "Skipping directory among revisions");
                    return false;
                }
                if !entry.name.ends_with(REVISION_EXT) {
                    warn!(path = %dir, entry = %entry.name, "Skipping non-revision file");
                    return false;
                }
                true
            })
            .map(|entry| path::join(&dir, &entry.name))
            .collect();

        try_join_all(files.into_iter().map(|file| async move {
            let raw = self.fs.read_file(&file).await?;
            Revision::parse(&file, &raw)
        }))
        .await
    }

    async fn attachments(&self, page: &str) -> Result<Vec<Attachment>, RokiError> {
        let dir = PathTranslator::attachment_dir(page);
        let entries = self.list_structural(&dir).await?;

        let files: Vec<String> = entries
            .into_iter()
            .filter(|entry| {
                if entry.directory {
                    warn!(path = %dir, entry = %entry.name, "Skipping directory among attachments");
                }
                !entry.directory
            })
            .map(|entry| entry.name)
            .collect();

        try_join_all(files.into_iter().map(|name| {
            let file = path::join(&dir, &name);
            async move {
                let content = self.fs.read_file(&file).await?;
                Ok::<_, RokiError>(Attachment::new(name, content))
            }
        }))
        .await
    }
}
