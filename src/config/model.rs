// src/config/model.rs

use std::time::Duration;

use serde::Deserialize;

use crate::types::{PathCasing, WatchRequest};

/// Configuration as read from a TOML file, before validation.
///
/// ```toml
/// [watcher]
/// verbose = false
/// batch_delay_ms = 75
///
/// [[watch]]
/// path = "/home/me/project"
/// excludes = ["*.tmp"]
/// correlation_id = 1
/// ```
///
/// All sections are optional.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawConfigFile {
    /// Coordinator settings from `[watcher]`.
    #[serde(default)]
    pub watcher: WatcherSection,

    /// One entry per `[[watch]]` table.
    #[serde(default)]
    pub watch: Vec<WatchRequest>,
}

/// `[watcher]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct WatcherSection {
    /// Initial verbose logging flag.
    #[serde(default)]
    pub verbose: bool,

    /// Override path case sensitivity. If `None`, the platform rule is used
    /// (sensitive on Linux only).
    #[serde(default)]
    pub case_sensitive: Option<bool>,

    /// How long a watcher collects raw events before reporting a batch.
    #[serde(default = "default_batch_delay_ms")]
    pub batch_delay_ms: u64,
}

fn default_batch_delay_ms() -> u64 {
    75
}

impl Default for WatcherSection {
    fn default() -> Self {
        Self {
            verbose: false,
            case_sensitive: None,
            batch_delay_ms: default_batch_delay_ms(),
        }
    }
}

/// Validated configuration.
///
/// Built via `ConfigFile::try_from(RawConfigFile)`.
#[derive(Debug, Clone)]
pub struct ConfigFile {
    watcher: WatcherSection,
    watch: Vec<WatchRequest>,
}

impl ConfigFile {
    pub(crate) fn new_unchecked(watcher: WatcherSection, watch: Vec<WatchRequest>) -> Self {
        Self { watcher, watch }
    }

    pub fn watcher(&self) -> &WatcherSection {
        &self.watcher
    }

    pub fn requests(&self) -> &[WatchRequest] {
        &self.watch
    }

    pub fn path_casing(&self) -> PathCasing {
        self.watcher
            .case_sensitive
            .map(PathCasing::from_case_sensitive)
            .unwrap_or_default()
    }

    pub fn batch_delay(&self) -> Duration {
        Duration::from_millis(self.watcher.batch_delay_ms)
    }
}
