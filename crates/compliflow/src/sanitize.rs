//! Helpers for sanitizing data before it enters tracing span attributes.
//!
//! Uploaded documents routinely carry personal data. Nothing that could
//! identify a person or expose a storage layout should reach the logs.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::path::Path;

/// Returns only the filename component of a path (no directory).
pub fn redact_path(path: &Path) -> String {
    path.file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("<unknown>")
        .to_string()
}

/// Returns a short deterministic hash of a path for correlation without
/// exposing the actual path.
pub fn hash_path(path: &Path) -> String {
    let mut hasher = DefaultHasher::new();
    path.hash(&mut hasher);
    format!("{:016x}", hasher.finish())
}

/// Masks a detected sensitive value, keeping the last four characters of
/// values long enough that four characters cannot identify them.
///
/// - `123-45-6789` → `*******6789`
/// - `a@b.io` → `******`
pub fn mask_value(value: &str) -> String {
    const VISIBLE: usize = 4;
    let count = value.chars().count();
    if count <= VISIBLE * 2 {
        return "*".repeat(count);
    }
    let tail: String = value.chars().skip(count - VISIBLE).collect();
    format!("{}{}", "*".repeat(count - VISIBLE), tail)
}
