// src/watch/mod.rs

//! File watching and change detection.
//!
//! This module is responsible for:
//! - Merging equivalent watch requests (same path, same filters).
//! - Keeping exactly one watch primitive per merged request alive.
//! - Funnelling change, failure and log events from every primitive into one
//!   stream.
//!
//! It does **not** watch recursively; each request covers the direct
//! children of its path.

use std::future::Future;
use std::pin::Pin;

use crate::errors::Result;
use crate::types::WatchRequest;

pub mod coordinator;
pub mod merge;
pub mod path_utils;
pub mod patterns;
pub mod primitive;
pub mod registry;
pub mod sink;

pub use coordinator::NonRecursiveWatcher;
pub use merge::merge_requests;
pub use primitive::{
    NotifyPrimitive, NotifyPrimitiveFactory, PrimitiveFactory, WatchPrimitive,
    DEFAULT_BATCH_DELAY,
};
pub use registry::{WatcherInstance, WatcherRegistry};
pub use sink::{EventSink, InstanceId, WatcherEvent};

/// Common contract of watcher variants.
///
/// Events are not part of the trait: each variant hands out its event
/// receiver on construction.
pub trait FileWatcher: Send + Sync {
    /// Replace the set of watched requests.
    fn watch(
        &self,
        requests: Vec<WatchRequest>,
    ) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>>;

    /// Stop all watching.
    fn stop(&self) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>>;

    fn set_verbose_logging(&self, enabled: bool) -> Pin<Box<dyn Future<Output = ()> + Send + '_>>;
}
