//! CLI output: error mapping and page listings.

use crate::error::RokiError;
use crate::page::Page;
use serde_json::json;

/// Map domain errors to a string for CLI output.
pub fn map_error(e: &RokiError) -> String {
    match e {
        RokiError::Filesystem(inner) => format!("Storage error: {}", inner),
        other => other.to_string(),
    }
}

fn display_path(page: &Page) -> &str {
    if page.path.is_empty() {
        "/"
    } else {
        &page.path
    }
}

pub fn format_pages_text(pages: &[Page]) -> String {
    if pages.is_empty() {
        return "No pages".to_string();
    }
    let mut sorted: Vec<&Page> = pages.iter().collect();
    sorted.sort_by(|a, b| a.path.cmp(&b.path));
    sorted
        .iter()
        .map(|page| {
            format!(
                "{}  ({} revisions, {} attachments)",
                display_path(page),
                page.revisions.len(),
                page.attachments.len()
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

pub fn format_pages_json(pages: &[Page]) -> Result<String, RokiError> {
    let mut sorted: Vec<&Page> = pages.iter().collect();
    sorted.sort_by(|a, b| a.path.cmp(&b.path));
    let value = json!(sorted
        .iter()
        .map(|page| json!({
            "path": display_path(page),
            "revisions": page.revisions.iter().map(|r| json!({
                "id": r.id,
                "timestamp": r.timestamp_iso(),
            })).collect::<Vec<_>>(),
            "attachments": page.attachments.iter().map(|a| &a.filename).collect::<Vec<_>>(),
        }))
        .collect::<Vec<_>>());
    serde_json::to_string_pretty(&value)
        .map_err(|e| RokiError::Render(format!("Failed to encode page list: {}", e)))
}
