// src/watch/path_utils.rs

//! Utility functions for comparing watch paths.

use std::path::{Path, PathBuf};

use crate::types::PathCasing;

/// Key used to group requests by path.
///
/// Built from the path's components, so `/a`, `/a/` and `/a/./` share a key.
/// On case-insensitive platforms `/Foo` and `/foo` map to the same key.
pub fn path_key(path: &Path, casing: PathCasing) -> String {
    let normalized: PathBuf = path.components().collect();
    let s = normalized.to_string_lossy();
    match casing {
        PathCasing::Sensitive => s.into_owned(),
        PathCasing::Insensitive => s.to_lowercase(),
    }
}

/// Path equality honouring the platform's case rule.
///
/// Agrees with [`path_key`]: two paths are equal exactly when their keys are.
pub fn paths_equal(a: &Path, b: &Path, casing: PathCasing) -> bool {
    path_key(a, casing) == path_key(b, casing)
}

/// Convert `path` into a string relative to `root`, with forward slashes.
///
/// Returns `None` if `path` does not live under `root`.
pub fn relative_str(root: &Path, path: &Path) -> Option<String> {
    path.strip_prefix(root)
        .ok()
        .map(|rel| rel.to_string_lossy().replace('\\', "/"))
}
