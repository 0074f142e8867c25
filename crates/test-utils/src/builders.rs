#![allow(dead_code)]

use std::path::PathBuf;

use flatwatch::config::{ConfigFile, RawConfigFile, WatcherSection};
use flatwatch::types::{CorrelationId, WatchRequest};

/// Builder for `WatchRequest` to simplify test setup.
pub struct WatchRequestBuilder {
    request: WatchRequest,
}

impl WatchRequestBuilder {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            request: WatchRequest::new(path),
        }
    }

    pub fn exclude(mut self, pattern: &str) -> Self {
        self.request.excludes.push(pattern.to_string());
        self
    }

    pub fn include(mut self, pattern: &str) -> Self {
        self.request.includes.push(pattern.to_string());
        self
    }

    pub fn correlation_id(mut self, id: CorrelationId) -> Self {
        self.request.correlation_id = Some(id);
        self
    }

    pub fn build(self) -> WatchRequest {
        self.request
    }
}

/// Shorthand for a request on `path` without filters.
pub fn request(path: &str) -> WatchRequest {
    WatchRequestBuilder::new(path).build()
}

/// Shorthand for a request on `path` without filters, with a correlation id.
pub fn correlated(path: &str, id: CorrelationId) -> WatchRequest {
    WatchRequestBuilder::new(path).correlation_id(id).build()
}

/// Builder for `ConfigFile`.
pub struct ConfigFileBuilder {
    config: RawConfigFile,
}

impl ConfigFileBuilder {
    pub fn new() -> Self {
        Self {
            config: RawConfigFile {
                watcher: WatcherSection::default(),
                watch: Vec::new(),
            },
        }
    }

    pub fn with_request(mut self, request: WatchRequest) -> Self {
        self.config.watch.push(request);
        self
    }

    pub fn verbose(mut self, val: bool) -> Self {
        self.config.watcher.verbose = val;
        self
    }

    pub fn case_sensitive(mut self, val: bool) -> Self {
        self.config.watcher.case_sensitive = Some(val);
        self
    }

    pub fn build(self) -> ConfigFile {
        ConfigFile::try_from(self.config).expect("Failed to build valid config from builder")
    }
}

impl Default for ConfigFileBuilder {
    fn default() -> Self {
        Self::new()
    }
}
