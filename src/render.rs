//! Markdown rendering seam

use crate::error::RokiError;

/// Converts revision markdown into HTML
pub trait Renderer: Send + Sync {
    fn render(&self, markdown: &str) -> Result<String, RokiError>;
}

/// Minimal renderer: escapes the text and wraps each blank-line separated
/// block in a paragraph.
#[derive(Debug, Default, Clone, Copy)]
pub struct PlainTextRenderer;

impl Renderer for PlainTextRenderer {
    fn render(&self, markdown: &str) -> Result<String, RokiError> {
        let text = markdown.replace("\r\n", "\n");
        let paragraphs: Vec<String> = text
            .split("\n\n")
            .map(str::trim)
            .filter(|block| !block.is_empty())
            .map(|block| format!("<p>{}</p>", tera::escape_html(block)))
            .collect();
        Ok(paragraphs.join("\n"))
    }
}
