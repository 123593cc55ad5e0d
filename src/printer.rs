//! Site printer
//!
//! Turns parsed pages into static artifacts:
//!
//! ```text
//! _pages/index.html                       page list
//! {page}/index.html                       latest revision
//! {page}/_revisions/index.html            revision list, newest first
//! {page}/_revisions/{id}/index.html       one revision
//! {page}/_attachments/{filename}          raw attachment bytes
//! ```

use crate::error::RokiError;
use crate::fs::path;
use crate::page::{Page, Revision};
use crate::render::Renderer;
use crate::theme::Theme;
use async_trait::async_trait;
use serde::Serialize;
use tera::{Context, Tera};
use tracing::{debug, instrument};

pub const PAGE_LIST_TEMPLATE: &str = "pageList";
pub const PAGE_TEMPLATE: &str = "page";
pub const REVISION_LIST_TEMPLATE: &str = "revisionList";
pub const REVISION_TEMPLATE: &str = "revision";

const PAGE_LIST_DIR: &str = "_pages";
const REVISIONS_DIR: &str = "_revisions";
const ATTACHMENTS_DIR: &str = "_attachments";
const INDEX_FILE: &str = "index.html";

/// One generated output file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Artifact {
    pub path: String,
    pub content: Vec<u8>,
}

impl Artifact {
    pub fn new(path: impl Into<String>, content: impl Into<Vec<u8>>) -> Self {
        Self {
            path: path.into(),
            content: content.into(),
        }
    }
}

/// Produces the artifacts of a site
#[async_trait]
pub trait Printer: Send + Sync {
    async fn print(
        &self,
        pages: &[Page],
        renderer: &dyn Renderer,
        theme: &Theme,
    ) -> Result<Vec<Artifact>, RokiError>;
}

#[derive(Debug, Serialize)]
struct PageView {
    path: String,
    url: String,
    revision_count: usize,
    updated: Option<String>,
    attachments: Vec<AttachmentView>,
}

#[derive(Debug, Serialize)]
struct AttachmentView {
    filename: String,
    url: String,
}

#[derive(Debug, Serialize)]
struct RevisionView {
    id: String,
    timestamp: String,
    url: String,
    html: String,
}

fn page_url(page: &str) -> String {
    if page.is_empty() {
        "/".to_string()
    } else {
        format!("/{}/", page)
    }
}

/// Revisions ordered newest first
fn newest_first(revisions: &[Revision]) -> Vec<&Revision> {
    let mut ordered: Vec<&Revision> = revisions.iter().collect();
    ordered.sort_by(|a, b| {
        b.timestamp
            .cmp(&a.timestamp)
            .then_with(|| b.id.cmp(&a.id))
    });
    ordered
}

/// Printer built on `tera` templates supplied by the theme
///
/// Theme partials are registered under their own names, so a template can
/// pull one in with `{% include "_header" %}`.
#[derive(Debug, Default, Clone, Copy)]
pub struct SitePrinter;

impl SitePrinter {
    fn engine(theme: &Theme) -> Result<Tera, RokiError> {
        for name in [
            PAGE_LIST_TEMPLATE,
            PAGE_TEMPLATE,
            REVISION_LIST_TEMPLATE,
            REVISION_TEMPLATE,
        ] {
            if theme.template(name).is_none() {
                return Err(RokiError::Theme(format!("missing template '{}'", name)));
            }
        }

        let mut tera = Tera::default();
        tera.add_raw_templates(
            theme
                .partials
                .iter()
                .chain(theme.templates.iter())
                .map(|(name, source)| (name.as_str(), source.as_str())),
        )?;
        Ok(tera)
    }

    fn page_view(page: &Page) -> PageView {
        let base = page_url(&page.path);
        PageView {
            path: page.path.clone(),
            url: base.clone(),
            revision_count: page.revisions.len(),
            updated: newest_first(&page.revisions)
                .first()
                .map(|revision| revision.timestamp_iso()),
            attachments: page
                .attachments
                .iter()
                .map(|attachment| AttachmentView {
                    filename: attachment.filename.clone(),
                    url: format!("{}{}/{}", base, ATTACHMENTS_DIR, attachment.filename),
                })
                .collect(),
        }
    }

    fn revision_view(
        page: &Page,
        revision: &Revision,
        renderer: &dyn Renderer,
    ) -> Result<RevisionView, RokiError> {
        Ok(RevisionView {
            id: revision.id.clone(),
            timestamp: revision.timestamp_iso(),
            url: format!("{}{}/{}/", page_url(&page.path), REVISIONS_DIR, revision.id),
            html: renderer.render(&revision.content)?,
        })
    }
}

#[async_trait]
impl Printer for SitePrinter {
    #[instrument(skip_all, fields(pages = pages.len()))]
    async fn print(
        &self,
        pages: &[Page],
        renderer: &dyn Renderer,
        theme: &Theme,
    ) -> Result<Vec<Artifact>, RokiError> {
        let tera = Self::engine(theme)?;
        let summaries: Vec<PageView> = pages.iter().map(Self::page_view).collect();

        let mut base = Context::new();
        base.insert("preference", &theme.preference);

        let mut artifacts = Vec::new();

        let mut context = base.clone();
        context.insert("pages", &summaries);
        artifacts.push(Artifact::new(
            path::join(PAGE_LIST_DIR, INDEX_FILE),
            tera.render(PAGE_LIST_TEMPLATE, &context)?,
        ));

        for (page, view) in pages.iter().zip(&summaries) {
            let revisions = newest_first(&page.revisions)
                .into_iter()
                .map(|revision| Self::revision_view(page, revision, renderer))
                .collect::<Result<Vec<_>, _>>()?;

            let mut context = base.clone();
            context.insert("page", view);
            context.insert("revision", &revisions.first());
            artifacts.push(Artifact::new(
                path::join(&page.path, INDEX_FILE),
                tera.render(PAGE_TEMPLATE, &context)?,
            ));

            let revisions_dir = path::join(&page.path, REVISIONS_DIR);
            let mut context = base.clone();
            context.insert("page", view);
            context.insert("revisions", &revisions);
            artifacts.push(Artifact::new(
                path::join(&revisions_dir, INDEX_FILE),
                tera.render(REVISION_LIST_TEMPLATE, &context)?,
            ));

            for revision in &revisions {
                let mut context = base.clone();
                context.insert("page", view);
                context.insert("revision", revision);
                artifacts.push(Artifact::new(
                    path::join(&path::join(&revisions_dir, &revision.id), INDEX_FILE),
                    tera.render(REVISION_TEMPLATE, &context)?,
                ));
            }

            let attachments_dir = path::join(&page.path, ATTACHMENTS_DIR);
            for attachment in &page.attachments {
                artifacts.push(Artifact::new(
                    path::join(&attachments_dir, &attachment.filename),
                    attachment.content.clone(),
                ));
            }
        }

        debug!(artifacts = artifacts.len(), "Printed site");
        Ok(artifacts)
    }
}
