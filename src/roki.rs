//! Wiki orchestrator
//!
//! Ties a source filesystem holding pages to a destination filesystem
//! receiving the generated site.

use crate::error::RokiError;
use crate::fs::Filesystem;
use crate::page::{attachment_filename, ContentParser, Page, PathTranslator, Revision};
use crate::printer::{Printer, SitePrinter};
use crate::render::Renderer;
use crate::theme::Theme;
use chrono::Utc;
use futures::future::{try_join, try_join_all};
use tracing::{info, instrument};

/// Page operations and site generation
pub struct Roki<S: Filesystem, D: Filesystem> {
    source: S,
    destination: D,
    printer: Box<dyn Printer>,
}

impl<S: Filesystem, D: Filesystem> Roki<S, D> {
    /// Orchestrator printing through [`SitePrinter`]
    pub fn new(source: S, destination: D) -> Self {
        Self::with_printer(source, destination, Box::new(SitePrinter))
    }

    pub fn with_printer(source: S, destination: D, printer: Box<dyn Printer>) -> Self {
        Self {
            source,
            destination,
            printer,
        }
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    pub fn destination(&self) -> &D {
        &self.destination
    }

    /// Store a new revision of `page` stamped with the current instant
    #[instrument(skip(self, content))]
    pub async fn new_revision(&self, page: &str, content: &str) -> Result<Revision, RokiError> {
        let revision = Revision::new(Utc::now(), content);
        let markdown = revision.to_markdown()?;
        self.source
            .write_file(
                &PathTranslator::revision_file(page, &revision.id),
                markdown.into_bytes(),
            )
            .await?;
        info!(id = %revision.id, "Created revision");
        Ok(revision)
    }

    /// Store an attachment; returns the stored filename
    ///
    /// Identical content under different original names lands on the same
    /// file.
    #[instrument(skip(self, content), fields(bytes = content.len()))]
    pub async fn new_attachment(
        &self,
        page: &str,
        original_name: &str,
        content: Vec<u8>,
    ) -> Result<String, RokiError> {
        let filename = attachment_filename(original_name, &content);
        self.source
            .write_file(&PathTranslator::attachment_file(page, &filename, ""), content)
            .await?;
        info!(%filename, "Stored attachment");
        Ok(filename)
    }

    /// Remove a page's revisions and attachments
    ///
    /// Sub-pages are left alone.
    #[instrument(skip(self))]
    pub async fn delete_page(&self, page: &str) -> Result<(), RokiError> {
        try_join(
            self.source.remove(&PathTranslator::revision_dir(page)),
            self.source.remove(&PathTranslator::attachment_dir(page)),
        )
        .await?;
        Ok(())
    }

    #[instrument(skip(self))]
    pub async fn delete_revision(&self, page: &str, id: &str) -> Result<(), RokiError> {
        self.source
            .remove(&PathTranslator::revision_file(page, id))
            .await?;
        Ok(())
    }

    /// Remove one stored attachment by its stored filename
    #[instrument(skip(self))]
    pub async fn delete_attachment(&self, page: &str, filename: &str) -> Result<(), RokiError> {
        self.source
            .remove(&PathTranslator::attachment_file(page, filename, ""))
            .await?;
        Ok(())
    }

    pub async fn get_pages(&self) -> Result<Vec<Page>, RokiError> {
        ContentParser::new(&self.source).get_pages("/").await
    }

    /// Generate the site into the destination filesystem
    ///
    /// Returns the number of artifacts written. The destination is not
    /// synced.
    #[instrument(skip_all)]
    pub async fn generate(&self, renderer: &dyn Renderer, theme: &Theme) -> Result<usize, RokiError> {
        let pages = self.get_pages().await?;
        let artifacts = self.printer.print(&pages, renderer, theme).await?;
        let count = artifacts.len();

        try_join_all(
            artifacts.into_iter().map(|artifact| async move {
                self.destination
                    .write_file(&artifact.path, artifact.content)
                    .await
            }),
        )
        .await?;

        info!(pages = pages.len(), artifacts = count, "Generated site");
        Ok(count)
    }
}
