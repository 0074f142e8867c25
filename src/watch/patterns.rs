// src/watch/patterns.rs

use std::collections::BTreeSet;
use std::fmt;
use std::path::Path;

use globset::{Glob, GlobSet, GlobSetBuilder};

use crate::errors::{FlatwatchError, Result};
use crate::types::WatchRequest;
use crate::watch::path_utils::relative_str;

/// Order-independent equality of two glob pattern lists.
///
/// Duplicated entries do not matter: `["a", "a"]` equals `["a"]`.
pub fn patterns_equal(a: &[String], b: &[String]) -> bool {
    let a: BTreeSet<&str> = a.iter().map(String::as_str).collect();
    let b: BTreeSet<&str> = b.iter().map(String::as_str).collect();
    a == b
}

/// Whether two requests carry the same include and exclude sets.
pub fn filters_equal(a: &WatchRequest, b: &WatchRequest) -> bool {
    patterns_equal(&a.excludes, &b.excludes) && patterns_equal(&a.includes, &b.includes)
}

/// Compiled include/exclude globs for a single watch request.
#[derive(Clone)]
pub struct GlobFilter {
    include_set: Option<GlobSet>,
    exclude_set: Option<GlobSet>,
}

impl fmt::Debug for GlobFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GlobFilter")
            .field("includes", &self.include_set.as_ref().map(GlobSet::len))
            .field("excludes", &self.exclude_set.as_ref().map(GlobSet::len))
            .finish()
    }
}

impl GlobFilter {
    pub fn from_request(request: &WatchRequest) -> Result<Self> {
        Ok(Self {
            include_set: optional_globset(&request.includes)?,
            exclude_set: optional_globset(&request.excludes)?,
        })
    }

    /// Returns true if a change to `path` should be reported for a watch on
    /// `root`.
    ///
    /// Patterns are tried against the path relative to `root` and against
    /// the absolute path, so both `*.rs` and `/abs/**/*.rs` work.
    pub fn matches(&self, root: &Path, path: &Path) -> bool {
        let rel = relative_str(root, path);
        let abs = path.to_string_lossy().replace('\\', "/");
        let hit = |set: &GlobSet| {
            set.is_match(abs.as_str()) || rel.as_deref().is_some_and(|r| set.is_match(r))
        };

        if let Some(include) = &self.include_set {
            if !hit(include) {
                return false;
            }
        }
        if let Some(exclude) = &self.exclude_set {
            if hit(exclude) {
                return false;
            }
        }
        true
    }
}

/// Check that every pattern compiles.
pub fn validate_patterns(patterns: &[String]) -> Result<()> {
    build_globset(patterns).map(|_| ())
}

fn optional_globset(patterns: &[String]) -> Result<Option<GlobSet>> {
    if patterns.is_empty() {
        Ok(None)
    } else {
        build_globset(patterns).map(Some)
    }
}

/// Build a GlobSet from simple string patterns.
fn build_globset(patterns: &[String]) -> Result<GlobSet> {
    let mut builder = GlobSetBuilder::new();
    for pat in patterns {
        let glob = Glob::new(pat).map_err(|source| FlatwatchError::InvalidGlob {
            pattern: pat.clone(),
            source,
        })?;
        builder.add(glob);
    }
    builder.build().map_err(|source| FlatwatchError::InvalidGlob {
        pattern: patterns.join(","),
        source,
    })
}
