//! Page content model
//!
//! A page is a directory owning an append-only set of revisions and a set of
//! content-addressed attachments. Revisions are stored as markdown with a YAML
//! front matter block:
//!
//! ```text
//! ---
//! id: <base-36 creation instant>
//! timestamp: <ISO-8601 instant>
//! ---
//! <markdown content>
//! ```

pub mod parser;
pub mod path;

pub use parser::ContentParser;
pub use path::PathTranslator;

use crate::error::RokiError;
use crate::fs;
use crate::types::content_hash;
use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

const FRONT_MATTER_FENCE: &str = "---";

/// A page and everything it owns
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Page {
    /// Normalized page path; the root page is `""`
    pub path: String,
    pub revisions: Vec<Revision>,
    pub attachments: Vec<Attachment>,
}

/// One version of a page's text
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Revision {
    pub id: String,
    pub timestamp: DateTime<Utc>,
    pub content: String,
}

/// A file attached to a page
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attachment {
    /// Content hash plus the original extension
    pub filename: String,
    pub content: Vec<u8>,
}

#[derive(Debug, Serialize, Deserialize)]
struct FrontMatter {
    id: String,
    #[serde(with = "iso_millis")]
    timestamp: DateTime<Utc>,
}

mod iso_millis {
    use chrono::{DateTime, SecondsFormat, Utc};
    use serde::{de::Error, Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(ts: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&ts.to_rfc3339_opts(SecondsFormat::Millis, true))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<DateTime<Utc>, D::Error> {
        let raw = String::deserialize(deserializer)?;
        DateTime::parse_from_rfc3339(&raw)
            .map(|ts| ts.with_timezone(&Utc))
            .map_err(D::Error::custom)
    }
}

/// Encode a non-negative integer in base 36 (`0-9a-z`)
pub fn to_base36(mut value: u64) -> String {
    const DIGITS: &[u8; 36] = b"0123456789abcdefghijklmnopqrstuvwxyz";
    if value == 0 {
        return "0".to_string();
    }
    let mut out = Vec::new();
    while value > 0 {
        out.push(DIGITS[(value % 36) as usize]);
        value /= 36;
    }
    out.reverse();
    String::from_utf8_lossy(&out).into_owned()
}

/// Revision id for an instant: its millisecond epoch time in base 36
pub fn revision_id(timestamp: &DateTime<Utc>) -> String {
    to_base36(timestamp.timestamp_millis().max(0) as u64)
}

/// Stored filename for attachment bytes: content hash plus the original extension
pub fn attachment_filename(original_name: &str, content: &[u8]) -> String {
    format!("{}{}", content_hash(content), fs::path::extension(original_name))
}

impl Revision {
    /// New revision stamped with `timestamp`; the content is trimmed
    pub fn new(timestamp: DateTime<Utc>, content: &str) -> Self {
        // Storage precision is milliseconds.
        let millis = timestamp.timestamp_millis();
        let timestamp = DateTime::<Utc>::from_timestamp_millis(millis).unwrap_or(timestamp);
        Self {
            id: revision_id(&timestamp),
            timestamp,
            content: content.trim().to_string(),
        }
    }

    /// ISO-8601 form of the timestamp as written to the front matter
    pub fn timestamp_iso(&self) -> String {
        self.timestamp.to_rfc3339_opts(SecondsFormat::Millis, true)
    }

    /// Serialize as front matter plus content
    pub fn to_markdown(&self) -> Result<String, RokiError> {
        let meta = FrontMatter {
            id: self.id.clone(),
            timestamp: self.timestamp,
        };
        let yaml = serde_yaml::to_string(&meta).map_err(|e| RokiError::InvalidRevision {
            path: self.id.clone(),
            reason: format!("failed to serialize front matter: {}", e),
        })?;
        Ok([
            FRONT_MATTER_FENCE,
            yaml.trim(),
            FRONT_MATTER_FENCE,
            self.content.as_str(),
        ]
        .join("\n"))
    }

    /// Parse a stored revision file
    ///
    /// Malformed front matter is an error; `path` is only used for reporting.
    pub fn parse(path: &str, raw: &[u8]) -> Result<Self, RokiError> {
        let invalid = |reason: String| RokiError::InvalidRevision {
            path: path.to_string(),
            reason,
        };

        let text = std::str::from_utf8(raw)
            .map_err(|e| invalid(format!("not valid UTF-8: {}", e)))?
            .replace("\r\n", "\n");
        let rest = text
            .strip_prefix("---\n")
            .ok_or_else(|| invalid("missing front matter".to_string()))?;

        let (yaml, content) = match rest.find("\n---\n") {
            Some(idx) => (&rest[..idx], &rest[idx + 5..]),
            None => match rest.strip_suffix("\n---") {
                Some(yaml) => (yaml, ""),
                None => return Err(invalid("unterminated front matter".to_string())),
            },
        };

        let meta: FrontMatter = serde_yaml::from_str(yaml)
            .map_err(|e| invalid(format!("malformed front matter: {}", e)))?;

        Ok(Self {
            id: meta.id,
            timestamp: meta.timestamp,
            content: content.to_string(),
        })
    }
}

impl Attachment {
    pub fn new(filename: impl Into<String>, content: Vec<u8>) -> Self {
        Self {
            filename: filename.into(),
            content,
        }
    }
}
