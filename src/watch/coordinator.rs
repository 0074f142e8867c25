// src/watch/coordinator.rs

//! Non-recursive watch coordinator.
//!
//! Keeps one watch primitive per distinct (path, includes, excludes) and
//! reconciles the live set against every new request list.

use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::sync::mpsc;
use tracing::debug;

use crate::errors::Result;
use crate::types::{MergedWatchRequest, PathCasing, WatchRequest};
use crate::watch::FileWatcher;
use crate::watch::merge::merge_requests;
use crate::watch::primitive::PrimitiveFactory;
use crate::watch::registry::{WatcherInstance, WatcherRegistry};
use crate::watch::sink::{EventLogger, EventSink, FailureHook, InstanceId, WatcherEvent};

/// Coordinates non-recursive watchers for a changing set of requests.
///
/// All events from all primitives arrive on the receiver returned by
/// [`NonRecursiveWatcher::new`].
pub struct NonRecursiveWatcher {
    factory: Arc<dyn PrimitiveFactory>,
    registry: Arc<Mutex<WatcherRegistry>>,
    /// Serializes `reconcile`, `stop` and `set_verbose_logging`.
    processing: tokio::sync::Mutex<()>,
    verbose: Arc<AtomicBool>,
    next_id: AtomicU64,
    casing: PathCasing,
    events_tx: mpsc::UnboundedSender<WatcherEvent>,
    logger: EventLogger,
}

impl fmt::Debug for NonRecursiveWatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NonRecursiveWatcher")
            .field("casing", &self.casing)
            .field("watchers", &self.watcher_count())
            .field("verbose", &self.verbose.load(Ordering::SeqCst))
            .finish_non_exhaustive()
    }
}

impl NonRecursiveWatcher {
    pub fn new(
        factory: impl PrimitiveFactory + 'static,
        casing: PathCasing,
    ) -> (Self, mpsc::UnboundedReceiver<WatcherEvent>) {
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let verbose = Arc::new(AtomicBool::new(false));
        let logger = EventLogger::new(events_tx.clone(), Arc::clone(&verbose));

        let watcher = Self {
            factory: Arc::new(factory),
            registry: Arc::new(Mutex::new(WatcherRegistry::new(casing))),
            processing: tokio::sync::Mutex::new(()),
            verbose,
            next_id: AtomicU64::new(1),
            casing,
            events_tx,
            logger,
        };
        (watcher, events_rx)
    }

    /// Number of live watchers.
    pub fn watcher_count(&self) -> usize {
        self.lock_registry().len()
    }

    /// Merged requests of all live watchers.
    pub fn active_requests(&self) -> Vec<MergedWatchRequest> {
        self.lock_registry()
            .iter()
            .map(|w| w.request().clone())
            .collect()
    }

    pub fn is_verbose(&self) -> bool {
        self.verbose.load(Ordering::SeqCst)
    }

    /// Bring the live watchers in line with `requests`.
    ///
    /// Watchers still matching a merged request are kept, the rest are
    /// stopped, and missing ones are started. All stops happen before any
    /// start. Calling this twice with the same set is a no-op the second
    /// time.
    pub async fn reconcile(&self, requests: Vec<WatchRequest>) -> Result<()> {
        let _processing = self.processing.lock().await;

        let merged = merge_requests(requests, self.casing);

        let (to_start, to_stop) = {
            let mut registry = self.lock_registry();
            let mut keep: Vec<InstanceId> = Vec::new();
            let mut to_start: Vec<MergedWatchRequest> = Vec::new();

            for request in merged {
                match registry.find_mut(&request.request) {
                    Some(watcher) => {
                        keep.push(watcher.id());
                        watcher.refresh(request);
                    }
                    None => to_start.push(request),
                }
            }

            (to_start, registry.retain_ids(&keep))
        };

        if !to_start.is_empty() {
            self.logger.trace(
                &format!("Request to start watching: {}", join_requests(to_start.iter())),
                None,
            );
        }
        if !to_stop.is_empty() {
            self.logger.trace(
                &format!(
                    "Request to stop watching: {}",
                    join_requests(to_stop.iter().map(WatcherInstance::request))
                ),
                None,
            );
        }

        debug!(start = to_start.len(), stop = to_stop.len(), "reconciling watchers");

        for watcher in to_stop {
            self.stop_watching(watcher);
        }

        for request in to_start {
            self.start_watching(request);
        }

        Ok(())
    }

    /// Stop and dispose every watcher, leaving the registry empty.
    pub async fn stop(&self) -> Result<()> {
        let _processing = self.processing.lock().await;

        let watchers = self.lock_registry().drain();
        for watcher in watchers {
            self.stop_watching(watcher);
        }
        Ok(())
    }

    /// Update the verbose flag and push it to every live primitive.
    pub async fn set_verbose_logging(&self, enabled: bool) {
        let _processing = self.processing.lock().await;

        self.verbose.store(enabled, Ordering::SeqCst);
        for watcher in self.lock_registry().iter_mut() {
            watcher.set_verbose_logging(enabled);
        }
    }

    fn start_watching(&self, request: MergedWatchRequest) {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        let sink = EventSink::new(id, &request, self.events_tx.clone(), self.failure_hook());

        // Built outside the registry lock: a primitive may fail right away and
        // its failure hook takes that lock.
        let primitive = self
            .factory
            .start(&request, sink.clone(), self.verbose.load(Ordering::SeqCst));
        let instance = WatcherInstance::new(id, request, primitive, sink);

        let mut registry = self.lock_registry();
        if instance.sink().is_failed() {
            drop(registry);
            self.logger
                .warn("failed to start watching", Some(&instance.request().request));
            instance.dispose();
            return;
        }
        registry.insert(instance);
    }

    fn stop_watching(&self, watcher: WatcherInstance) {
        self.logger
            .trace("stopping file watcher", Some(&watcher.request().request));
        watcher.dispose();
    }

    /// Removes a failed instance from the registry and disposes it.
    fn failure_hook(&self) -> FailureHook {
        let registry = Arc::downgrade(&self.registry);
        let logger = self.logger.clone();

        Arc::new(move |id| {
            let Some(registry) = registry.upgrade() else {
                return;
            };
            let removed = registry
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .remove(id);
            if let Some(watcher) = removed {
                logger.trace(
                    "removing failed file watcher",
                    Some(&watcher.request().request),
                );
                watcher.dispose();
            }
        })
    }

    fn lock_registry(&self) -> MutexGuard<'_, WatcherRegistry> {
        self.registry.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl FileWatcher for NonRecursiveWatcher {
    fn watch(
        &self,
        requests: Vec<WatchRequest>,
    ) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>> {
        Box::pin(self.reconcile(requests))
    }

    fn stop(&self) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>> {
        Box::pin(NonRecursiveWatcher::stop(self))
    }

    fn set_verbose_logging(&self, enabled: bool) -> Pin<Box<dyn Future<Output = ()> + Send + '_>> {
        Box::pin(NonRecursiveWatcher::set_verbose_logging(self, enabled))
    }
}

fn join_requests<'a>(requests: impl Iterator<Item = &'a MergedWatchRequest>) -> String {
    requests
        .map(|r| r.request.to_string())
        .collect::<Vec<_>>()
        .join(",")
}
