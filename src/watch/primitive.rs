// src/watch/primitive.rs

//! The per-path watch primitive and its `notify`-backed implementation.
//!
//! The coordinator only decides *what* to watch. A [`PrimitiveFactory`]
//! turns one merged request into a running [`WatchPrimitive`] that reports
//! back through its [`EventSink`].

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use notify::event::{ModifyKind, RenameMode};
use notify::{Config, Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{Instant, sleep_until};
use tracing::{debug, info};

use crate::errors::Result;
use crate::types::{ChangeType, FileChange, LogMessage, MergedWatchRequest, WatchRequest};
use crate::watch::patterns::GlobFilter;
use crate::watch::sink::{EventSink, to_message};

/// Delay used to coalesce raw events into one change batch.
pub const DEFAULT_BATCH_DELAY: Duration = Duration::from_millis(75);

/// A running watch on a single path.
///
/// Implementations must tolerate repeated `dispose` calls and must not call
/// back into their sink from inside `dispose` or `set_verbose_logging`.
pub trait WatchPrimitive: Send {
    fn set_verbose_logging(&mut self, enabled: bool);
    fn dispose(&mut self);
}

/// Starts watch primitives for merged requests.
///
/// Starting never fails synchronously: problems are reported through
/// [`EventSink::failed`], possibly before `start` returns.
pub trait PrimitiveFactory: Send + Sync {
    fn start(
        &self,
        request: &MergedWatchRequest,
        sink: EventSink,
        verbose: bool,
    ) -> Box<dyn WatchPrimitive>;
}

/// Factory for [`NotifyPrimitive`]s.
#[derive(Debug, Clone)]
pub struct NotifyPrimitiveFactory {
    batch_delay: Duration,
}

impl NotifyPrimitiveFactory {
    pub fn new(batch_delay: Duration) -> Self {
        Self { batch_delay }
    }
}

impl Default for NotifyPrimitiveFactory {
    fn default() -> Self {
        Self::new(DEFAULT_BATCH_DELAY)
    }
}

impl PrimitiveFactory for NotifyPrimitiveFactory {
    fn start(
        &self,
        request: &MergedWatchRequest,
        sink: EventSink,
        verbose: bool,
    ) -> Box<dyn WatchPrimitive> {
        Box::new(NotifyPrimitive::start(
            request.request.clone(),
            sink,
            verbose,
            self.batch_delay,
        ))
    }
}

/// Non-recursive watch on one path using the platform's recommended
/// `notify` backend.
///
/// Must be started from inside a Tokio runtime: change batching runs in a
/// spawned task.
pub struct NotifyPrimitive {
    path: PathBuf,
    watcher: Option<RecommendedWatcher>,
    batcher: Option<JoinHandle<()>>,
    verbose: Arc<AtomicBool>,
}

impl fmt::Debug for NotifyPrimitive {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NotifyPrimitive")
            .field("path", &self.path)
            .field("active", &self.watcher.is_some())
            .finish_non_exhaustive()
    }
}

impl NotifyPrimitive {
    pub fn start(
        request: WatchRequest,
        sink: EventSink,
        verbose: bool,
        batch_delay: Duration,
    ) -> Self {
        let mut primitive = Self {
            path: request.path.clone(),
            watcher: None,
            batcher: None,
            verbose: Arc::new(AtomicBool::new(verbose)),
        };

        let filter = match GlobFilter::from_request(&request) {
            Ok(filter) => filter,
            Err(err) => {
                sink.log(LogMessage::warn(to_message(
                    &format!("invalid filter: {err}"),
                    Some(&request),
                )));
                sink.failed();
                return primitive;
            }
        };

        // Channel from the blocking notify callback into the async world.
        let (raw_tx, raw_rx) = mpsc::unbounded_channel::<notify::Result<Event>>();

        let watcher = match watch_path(&request.path, raw_tx) {
            Ok(watcher) => watcher,
            Err(err) => {
                sink.log(LogMessage::warn(to_message(
                    &format!("failed to watch: {err}"),
                    Some(&request),
                )));
                sink.failed();
                return primitive;
            }
        };

        info!(path = %request.path.display(), "file watcher started");

        let batcher = Batcher {
            request,
            filter,
            sink,
            verbose: Arc::clone(&primitive.verbose),
            batch_delay,
        };
        primitive.batcher = Some(tokio::spawn(batcher.run(raw_rx)));
        primitive.watcher = Some(watcher);
        primitive
    }
}

impl WatchPrimitive for NotifyPrimitive {
    fn set_verbose_logging(&mut self, enabled: bool) {
        self.verbose.store(enabled, Ordering::SeqCst);
    }

    fn dispose(&mut self) {
        if let Some(watcher) = self.watcher.take() {
            drop(watcher);
            debug!(path = %self.path.display(), "file watcher disposed");
        }
        if let Some(batcher) = self.batcher.take() {
            batcher.abort();
        }
    }
}

impl Drop for NotifyPrimitive {
    fn drop(&mut self) {
        self.dispose();
    }
}

/// Open a non-recursive notify watch on `path` that forwards raw events
/// into `raw_tx`.
fn watch_path(
    path: &Path,
    raw_tx: mpsc::UnboundedSender<notify::Result<Event>>,
) -> Result<RecommendedWatcher> {
    let mut watcher = RecommendedWatcher::new(
        move |res: notify::Result<Event>| {
            // Closed once the batcher is gone; nothing left to deliver to.
            let _ = raw_tx.send(res);
        },
        Config::default(),
    )?;
    watcher.watch(path, RecursiveMode::NonRecursive)?;
    Ok(watcher)
}

/// Turns raw notify events into filtered, batched `FileChange`s.
struct Batcher {
    request: WatchRequest,
    filter: GlobFilter,
    sink: EventSink,
    verbose: Arc<AtomicBool>,
    batch_delay: Duration,
}

impl Batcher {
    async fn run(self, mut raw_rx: mpsc::UnboundedReceiver<notify::Result<Event>>) {
        let mut pending: Vec<FileChange> = Vec::new();
        let mut deadline: Option<Instant> = None;

        loop {
            tokio::select! {
                raw = raw_rx.recv() => {
                    let Some(raw) = raw else { break };
                    match raw {
                        Ok(event) => {
                            if self.handle_event(event, &mut pending) {
                                self.flush(&mut pending);
                                self.sink.log(LogMessage::warn(to_message(
                                    "watched path got deleted",
                                    Some(&self.request),
                                )));
                                self.sink.failed();
                                return;
                            }
                        }
                        Err(err) => {
                            self.sink.log(LogMessage::warn(to_message(
                                &format!("error from watcher: {err}"),
                                Some(&self.request),
                            )));
                        }
                    }
                    if !pending.is_empty() && deadline.is_none() {
                        deadline = Some(Instant::now() + self.batch_delay);
                    }
                }
                _ = sleep_until(deadline.unwrap_or_else(Instant::now)), if deadline.is_some() => {
                    self.flush(&mut pending);
                    deadline = None;
                }
            }
        }

        self.flush(&mut pending);
        debug!(path = %self.request.path.display(), "batcher finished");
    }

    /// Queue the changes of one raw event. Returns true if the watched path
    /// itself was deleted.
    fn handle_event(&self, event: Event, pending: &mut Vec<FileChange>) -> bool {
        if self.verbose.load(Ordering::SeqCst) {
            self.trace(&format!("[raw] {:?} {:?}", event.kind, event.paths));
        }

        let mut root_deleted = false;
        for (path, kind) in classify(&event) {
            if kind == ChangeType::Deleted && path == self.request.path {
                root_deleted = true;
                pending.push(self.change(path, kind));
                continue;
            }

            if self.filter.matches(&self.request.path, &path) {
                pending.push(self.change(path, kind));
            } else if self.verbose.load(Ordering::SeqCst) {
                self.trace(&format!("ignored (filtered) {}", path.display()));
            }
        }
        root_deleted
    }

    fn change(&self, path: PathBuf, kind: ChangeType) -> FileChange {
        FileChange {
            path,
            kind,
            correlation_id: self.request.correlation_id,
        }
    }

    fn flush(&self, pending: &mut Vec<FileChange>) {
        if pending.is_empty() {
            return;
        }
        self.sink.changed(std::mem::take(pending));
    }

    fn trace(&self, message: &str) {
        self.sink
            .log(LogMessage::trace(to_message(message, Some(&self.request))));
    }
}

/// Map a notify event onto added/updated/deleted changes.
fn classify(event: &Event) -> Vec<(PathBuf, ChangeType)> {
    let with_kind = |kind: ChangeType| {
        event
            .paths
            .iter()
            .map(|p| (p.clone(), kind))
            .collect::<Vec<_>>()
    };

    match event.kind {
        EventKind::Create(_) => with_kind(ChangeType::Added),
        EventKind::Remove(_) => with_kind(ChangeType::Deleted),
        EventKind::Modify(ModifyKind::Name(RenameMode::From)) => with_kind(ChangeType::Deleted),
        EventKind::Modify(ModifyKind::Name(RenameMode::To)) => with_kind(ChangeType::Added),
        EventKind::Modify(ModifyKind::Name(RenameMode::Both)) => {
            let mut changes = Vec::new();
            if let Some(from) = event.paths.first() {
                changes.push((from.clone(), ChangeType::Deleted));
            }
            if let Some(to) = event.paths.get(1) {
                changes.push((to.clone(), ChangeType::Added));
            }
            changes
        }
        EventKind::Modify(ModifyKind::Name(_)) => event
            .paths
            .iter()
            .map(|p| (p.clone(), existence_kind(p)))
            .collect(),
        EventKind::Modify(_) => with_kind(ChangeType::Updated),
        EventKind::Access(_) | EventKind::Any | EventKind::Other => Vec::new(),
    }
}

fn existence_kind(path: &Path) -> ChangeType {
    if path.exists() {
        ChangeType::Added
    } else {
        ChangeType::Deleted
    }
}
