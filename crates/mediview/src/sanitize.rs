//! Helpers for sanitizing data before it enters tracing span attributes.
//!
//! Uploaded filenames routinely contain patient names, so spans and log
//! lines carry a short hash of the name instead.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::path::Path;

/// Returns a short deterministic hash of a string for correlation without
/// exposing the value.
pub fn hash_str(value: &str) -> String {
    let mut hasher = DefaultHasher::new();
    value.hash(&mut hasher);
    format!("{:016x}", hasher.finish())
}

/// Replaces a filename with the first 8 hex digits of its hash, keeping a
/// plain extension.
///
/// - `홍길동_진단서.pdf` → `1f3a9c0b.pdf`
/// - `scan` → `7d21e004`
/// - `` → `<none>`
pub fn redact_filename(filename: &str) -> String {
    let trimmed = filename.trim();
    if trimmed.is_empty() {
        return "<none>".to_string();
    }

    let hash = &hash_str(trimmed)[..8];
    let extension = Path::new(trimmed)
        .extension()
        .and_then(|e| e.to_str())
        .filter(|e| e.len() <= 5 && e.chars().all(|c| c.is_ascii_alphanumeric()));

    match extension {
        Some(ext) => format!("{}.{}", hash, ext.to_ascii_lowercase()),
        None => hash.to_string(),
    }
}
