//! Logical path normalization utilities
//!
//! Logical paths are `/`-separated and rooted at the filesystem root. The
//! normalized form has no leading or trailing separator; the root is `""`.

use unicode_normalization::UnicodeNormalization;

/// Normalize a logical path string
///
/// This function:
/// 1. Normalizes Unicode to NFC
/// 2. Collapses repeated, leading and trailing separators
/// 3. Resolves `.` and `..` segments (`..` never climbs above the root)
pub fn normalize(path: &str) -> String {
    let normalized: String = path.nfc().collect();

    let mut stack: Vec<&str> = Vec::new();
    for segment in normalized.split(['/', '\\']) {
        match segment {
            "" | "." => {}
            ".." => {
                stack.pop();
            }
            other => stack.push(other),
        }
    }

    stack.join("/")
}

/// Split a normalized path into its segments
pub fn segments(path: &str) -> impl Iterator<Item = &str> {
    path.split('/').filter(|s| !s.is_empty() && *s != ".")
}

/// Join two logical paths
pub fn join(base: &str, name: &str) -> String {
    let base = base.trim_matches('/');
    let name = name.trim_matches('/');
    match (base.is_empty(), name.is_empty()) {
        (true, _) => name.to_string(),
        (false, true) => base.to_string(),
        (false, false) => format!("{}/{}", base, name),
    }
}

/// Split a path into its parent directory and final component
///
/// Returns `None` for the root.
pub fn split_parent(path: &str) -> Option<(&str, &str)> {
    let trimmed = path.trim_matches('/');
    if trimmed.is_empty() {
        return None;
    }
    match trimmed.rfind('/') {
        Some(idx) => Some((&trimmed[..idx], &trimmed[idx + 1..])),
        None => Some(("", trimmed)),
    }
}

/// Extension of the final component, including the leading dot
///
/// Names that only start with a dot (`.profile`) have no extension.
pub fn extension(name: &str) -> &str {
    let base = name.rsplit('/').next().unwrap_or(name);
    match base.rfind('.') {
        Some(0) | None => "",
        Some(idx) => &base[idx..],
    }
}
