//! Physical layout of pages, revisions and attachments
//!
//! ```text
//! {page}/_revision/{id}.md
//! {page}/_attachment/{hash}{ext}
//! ```

use crate::fs::path;

/// Directory holding a page's revisions
pub const REVISION_DIR: &str = "_revision";

/// Directory holding a page's attachments
pub const ATTACHMENT_DIR: &str = "_attachment";

/// Extension of revision files
pub const REVISION_EXT: &str = ".md";

/// Whether a directory name is structural rather than a sub-page
pub fn is_reserved(name: &str) -> bool {
    name == REVISION_DIR || name == ATTACHMENT_DIR
}

/// Maps logical page names to storage paths
pub struct PathTranslator;

impl PathTranslator {
    pub fn page_dir(page: &str) -> String {
        path::normalize(page)
    }

    pub fn revision_dir(page: &str) -> String {
        path::join(&Self::page_dir(page), REVISION_DIR)
    }

    pub fn attachment_dir(page: &str) -> String {
        path::join(&Self::page_dir(page), ATTACHMENT_DIR)
    }

    pub fn revision_file(page: &str, id: &str) -> String {
        path::join(&Self::revision_dir(page), &format!("{}{}", id, REVISION_EXT))
    }

    /// Attachment location: `id` plus the extension of `original_name`
    pub fn attachment_file(page: &str, id: &str, original_name: &str) -> String {
        path::join(
            &Self::attachment_dir(page),
            &format!("{}{}", id, path::extension(original_name)),
        )
    }
}
