// src/types.rs

//! Plain data types shared between the coordinator, the watch primitives and
//! the configuration layer.

use std::fmt;
use std::path::PathBuf;

use serde::Deserialize;

/// Opaque token distinguishing logical subscribers of the same path.
pub type CorrelationId = u64;

/// A caller's intent to be notified of changes directly inside `path`.
///
/// `includes` being empty means "everything". Requests are treated as
/// immutable values once handed to the coordinator.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct WatchRequest {
    pub path: PathBuf,

    #[serde(default)]
    pub excludes: Vec<String>,

    #[serde(default)]
    pub includes: Vec<String>,

    #[serde(default)]
    pub correlation_id: Option<CorrelationId>,
}

impl WatchRequest {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            excludes: Vec::new(),
            includes: Vec::new(),
            correlation_id: None,
        }
    }
}

impl fmt::Display for WatchRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (excludes: ", self.path.display())?;
        if self.excludes.is_empty() {
            f.write_str("<none>")?;
        } else {
            write!(f, "{}", self.excludes.join(","))?;
        }
        f.write_str(", includes: ")?;
        if self.includes.is_empty() {
            f.write_str("<all>")?;
        } else {
            write!(f, "{:?}", self.includes)?;
        }
        match self.correlation_id {
            Some(id) => write!(f, ", correlationId: {id})"),
            None => f.write_str(", correlationId: <none>)"),
        }
    }
}

/// A deduplicated request that stands for one underlying OS watch.
///
/// `request` is the representative (host) request; `additional_requests`
/// holds the other subscribers that share its path and filters. Every
/// correlation id occurs at most once across the host and its additional
/// requests.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MergedWatchRequest {
    pub request: WatchRequest,
    pub additional_requests: Vec<WatchRequest>,
}

impl MergedWatchRequest {
    pub fn new(request: WatchRequest) -> Self {
        Self {
            request,
            additional_requests: Vec::new(),
        }
    }

    /// The host request followed by every additional request.
    pub fn subscribers(&self) -> impl Iterator<Item = &WatchRequest> {
        std::iter::once(&self.request).chain(self.additional_requests.iter())
    }

    /// Whether some subscriber of this group already uses `correlation_id`.
    pub fn has_correlation_id(&self, correlation_id: Option<CorrelationId>) -> bool {
        self.subscribers()
            .any(|r| r.correlation_id == correlation_id)
    }

    /// Fold `other` into this group.
    ///
    /// Requests whose correlation id is already present are collapsed rather
    /// than appended.
    pub fn absorb(&mut self, other: WatchRequest) {
        if !self.has_correlation_id(other.correlation_id) {
            self.additional_requests.push(other);
        }
    }
}

impl fmt::Display for MergedWatchRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.request)?;
        if !self.additional_requests.is_empty() {
            write!(f, " +{} merged", self.additional_requests.len())?;
        }
        Ok(())
    }
}

/// How paths are compared when grouping requests and looking up watchers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PathCasing {
    Sensitive,
    Insensitive,
}

impl PathCasing {
    /// Linux file systems are case sensitive; everything else is treated as
    /// case insensitive.
    pub fn platform() -> Self {
        if cfg!(target_os = "linux") {
            PathCasing::Sensitive
        } else {
            PathCasing::Insensitive
        }
    }

    pub fn from_case_sensitive(case_sensitive: bool) -> Self {
        if case_sensitive {
            PathCasing::Sensitive
        } else {
            PathCasing::Insensitive
        }
    }
}

impl Default for PathCasing {
    fn default() -> Self {
        PathCasing::platform()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChangeType {
    Added,
    Updated,
    Deleted,
}

/// A single file system change reported by a watcher.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileChange {
    pub path: PathBuf,
    pub kind: ChangeType,
    pub correlation_id: Option<CorrelationId>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogType {
    Trace,
    Warn,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogMessage {
    pub kind: LogType,
    pub message: String,
}

impl LogMessage {
    pub fn trace(message: impl Into<String>) -> Self {
        Self {
            kind: LogType::Trace,
            message: message.into(),
        }
    }

    pub fn warn(message: impl Into<String>) -> Self {
        Self {
            kind: LogType::Warn,
            message: message.into(),
        }
    }
}
