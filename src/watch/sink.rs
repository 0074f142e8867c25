// src/watch/sink.rs

//! Event fan-in from watch primitives into the coordinator's single stream.
//!
//! Every primitive receives its own [`EventSink`]. The sink tags change
//! batches with the correlation ids of the subscribers it serves, turns a
//! failure into one `WatchFailed` per subscriber, and drops everything once
//! it has been closed by the coordinator.

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError, RwLock};

use tokio::sync::mpsc;
use tracing::debug;

use crate::types::{FileChange, LogMessage, MergedWatchRequest, WatchRequest};

/// Identifier of a live watcher instance inside the registry.
pub type InstanceId = u64;

/// Called once when a primitive reports failure, with the failed instance id.
pub type FailureHook = Arc<dyn Fn(InstanceId) + Send + Sync>;

const LOG_PREFIX: &str = "[File Watcher (notify)]";

/// Events delivered to whoever owns the coordinator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WatcherEvent {
    /// A batch of changes from one watcher.
    Changed(Vec<FileChange>),
    /// The watch serving this request failed and was torn down.
    WatchFailed(WatchRequest),
    /// A trace or warn message.
    Log(LogMessage),
}

/// Format a log line, optionally naming the request it concerns.
pub fn to_message(message: &str, request: Option<&WatchRequest>) -> String {
    match request {
        Some(request) => format!("{LOG_PREFIX} {message} ({request})"),
        None => format!("{LOG_PREFIX} {message}"),
    }
}

/// Callback surface handed to a watch primitive.
#[derive(Clone)]
pub struct EventSink {
    inner: Arc<SinkInner>,
}

struct SinkInner {
    instance_id: InstanceId,
    subscribers: Mutex<Vec<WatchRequest>>,
    /// `None` once closed. Senders hold the read side for the whole send,
    /// so `close` returns only after in-flight sends have finished.
    tx: RwLock<Option<mpsc::UnboundedSender<WatcherEvent>>>,
    failed: AtomicBool,
    on_failure: FailureHook,
}

impl fmt::Debug for EventSink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventSink")
            .field("instance_id", &self.inner.instance_id)
            .field("closed", &self.is_closed())
            .field("failed", &self.is_failed())
            .finish_non_exhaustive()
    }
}

impl EventSink {
    pub fn new(
        instance_id: InstanceId,
        request: &MergedWatchRequest,
        tx: mpsc::UnboundedSender<WatcherEvent>,
        on_failure: FailureHook,
    ) -> Self {
        Self {
            inner: Arc::new(SinkInner {
                instance_id,
                subscribers: Mutex::new(request.subscribers().cloned().collect()),
                tx: RwLock::new(Some(tx)),
                failed: AtomicBool::new(false),
                on_failure,
            }),
        }
    }

    pub fn instance_id(&self) -> InstanceId {
        self.inner.instance_id
    }

    pub fn is_closed(&self) -> bool {
        self.inner
            .tx
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .is_none()
    }

    pub fn is_failed(&self) -> bool {
        self.inner.failed.load(Ordering::SeqCst)
    }

    /// Forward a batch of changes.
    ///
    /// The batch is repeated once per distinct correlation id of the group,
    /// host first, so each subscriber can pick out its own copy.
    pub fn changed(&self, changes: Vec<FileChange>) {
        if changes.is_empty() || self.is_closed() {
            return;
        }

        let mut ids = Vec::new();
        for subscriber in self.subscribers().iter() {
            if !ids.contains(&subscriber.correlation_id) {
                ids.push(subscriber.correlation_id);
            }
        }

        let batch: Vec<FileChange> = ids
            .iter()
            .flat_map(|id| {
                changes.iter().map(move |change| FileChange {
                    correlation_id: *id,
                    ..change.clone()
                })
            })
            .collect();

        self.send(WatcherEvent::Changed(batch));
    }

    /// Report that the primitive is dead.
    ///
    /// Emits `WatchFailed` for every subscriber, closes the sink and lets the
    /// coordinator remove the instance. Only the first call has any effect.
    pub fn failed(&self) {
        if self.is_closed() || self.inner.failed.swap(true, Ordering::SeqCst) {
            return;
        }

        let subscribers = self.subscribers().clone();
        for request in subscribers {
            self.send(WatcherEvent::WatchFailed(request));
        }
        self.close();

        debug!(instance = self.inner.instance_id, "watch primitive reported failure");
        (self.inner.on_failure)(self.inner.instance_id);
    }

    pub fn log(&self, message: LogMessage) {
        if self.is_closed() {
            return;
        }
        self.send(WatcherEvent::Log(message));
    }

    /// Stop forwarding anything from this sink.
    ///
    /// Blocks until sends already in progress on other threads are done;
    /// nothing reaches the receiver after this returns.
    pub(crate) fn close(&self) {
        self.inner
            .tx
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
    }

    pub(crate) fn set_subscribers(&self, request: &MergedWatchRequest) {
        *self.subscribers() = request.subscribers().cloned().collect();
    }

    fn subscribers(&self) -> std::sync::MutexGuard<'_, Vec<WatchRequest>> {
        self.inner
            .subscribers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    fn send(&self, event: WatcherEvent) {
        let tx = self.inner.tx.read().unwrap_or_else(PoisonError::into_inner);
        if let Some(tx) = tx.as_ref() {
            deliver(tx, event);
        }
    }
}

/// Coordinator-side logger writing into the event stream.
///
/// Trace lines are only emitted while verbose logging is on.
#[derive(Clone)]
pub(crate) struct EventLogger {
    tx: mpsc::UnboundedSender<WatcherEvent>,
    verbose: Arc<AtomicBool>,
}

impl EventLogger {
    pub(crate) fn new(tx: mpsc::UnboundedSender<WatcherEvent>, verbose: Arc<AtomicBool>) -> Self {
        Self { tx, verbose }
    }

    pub(crate) fn trace(&self, message: &str, request: Option<&WatchRequest>) {
        if self.verbose.load(Ordering::SeqCst) {
            deliver(
                &self.tx,
                WatcherEvent::Log(LogMessage::trace(to_message(message, request))),
            );
        }
    }

    pub(crate) fn warn(&self, message: &str, request: Option<&WatchRequest>) {
        deliver(
            &self.tx,
            WatcherEvent::Log(LogMessage::warn(to_message(message, request))),
        );
    }
}

fn deliver(tx: &mpsc::UnboundedSender<WatcherEvent>, event: WatcherEvent) {
    // The receiver going away just means nobody listens any more.
    if tx.send(event).is_err() {
        debug!("watcher event receiver dropped");
    }
}
