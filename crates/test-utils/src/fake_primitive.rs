use std::collections::HashSet;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use flatwatch::types::{ChangeType, FileChange, LogMessage, MergedWatchRequest};
use flatwatch::watch::{EventSink, PrimitiveFactory, WatchPrimitive};

/// What happened to fake primitives, in order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JournalEntry {
    Started(PathBuf),
    Disposed(PathBuf),
}

/// A primitive factory that never touches the file system.
///
/// - records every started primitive and every dispose call
/// - lets tests push changes, failures and log lines through a primitive's
///   sink via [`FakeHandle`]
/// - can be told to fail certain paths immediately on start
#[derive(Clone, Default)]
pub struct FakePrimitiveFactory {
    state: Arc<Mutex<FakeState>>,
}

#[derive(Default)]
struct FakeState {
    started: Vec<FakeHandle>,
    journal: Vec<JournalEntry>,
    fail_on_start: HashSet<PathBuf>,
}

impl FakePrimitiveFactory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Primitives started for `path` report failure before `start` returns.
    pub fn fail_on_start(&self, path: impl Into<PathBuf>) {
        self.state.lock().unwrap().fail_on_start.insert(path.into());
    }

    pub fn clear_fail_on_start(&self) {
        self.state.lock().unwrap().fail_on_start.clear();
    }

    /// Every primitive ever started, in start order.
    pub fn started(&self) -> Vec<FakeHandle> {
        self.state.lock().unwrap().started.clone()
    }

    pub fn start_count(&self) -> usize {
        self.state.lock().unwrap().started.len()
    }

    /// Primitives that have not been disposed yet.
    pub fn live(&self) -> Vec<FakeHandle> {
        self.started()
            .into_iter()
            .filter(|h| !h.is_disposed())
            .collect()
    }

    /// The live primitive watching `path`, if exactly one exists.
    pub fn live_for(&self, path: impl AsRef<Path>) -> Option<FakeHandle> {
        let mut matching: Vec<FakeHandle> = self
            .live()
            .into_iter()
            .filter(|h| h.path() == path.as_ref())
            .collect();
        if matching.len() == 1 { matching.pop() } else { None }
    }

    pub fn journal(&self) -> Vec<JournalEntry> {
        self.state.lock().unwrap().journal.clone()
    }

    pub fn clear_journal(&self) {
        self.state.lock().unwrap().journal.clear();
    }
}

impl PrimitiveFactory for FakePrimitiveFactory {
    fn start(
        &self,
        request: &MergedWatchRequest,
        sink: EventSink,
        verbose: bool,
    ) -> Box<dyn WatchPrimitive> {
        let handle = FakeHandle {
            record: Arc::new(FakeRecord {
                request: request.clone(),
                sink: sink.clone(),
                dispose_count: AtomicUsize::new(0),
                verbose: AtomicBool::new(verbose),
                verbose_calls: AtomicUsize::new(0),
            }),
        };

        let fail = {
            let mut state = self.state.lock().unwrap();
            state.started.push(handle.clone());
            state
                .journal
                .push(JournalEntry::Started(request.request.path.clone()));
            state.fail_on_start.contains(&request.request.path)
        };

        if fail {
            sink.failed();
        }

        Box::new(FakePrimitive {
            handle,
            state: Arc::clone(&self.state),
        })
    }
}

struct FakeRecord {
    request: MergedWatchRequest,
    sink: EventSink,
    dispose_count: AtomicUsize,
    verbose: AtomicBool,
    verbose_calls: AtomicUsize,
}

/// Test-side view of one started fake primitive.
#[derive(Clone)]
pub struct FakeHandle {
    record: Arc<FakeRecord>,
}

impl fmt::Debug for FakeHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FakeHandle")
            .field("path", &self.path())
            .field("disposed", &self.dispose_count())
            .finish()
    }
}

impl FakeHandle {
    pub fn request(&self) -> &MergedWatchRequest {
        &self.record.request
    }

    pub fn path(&self) -> &Path {
        &self.record.request.request.path
    }

    pub fn dispose_count(&self) -> usize {
        self.record.dispose_count.load(Ordering::SeqCst)
    }

    pub fn is_disposed(&self) -> bool {
        self.dispose_count() > 0
    }

    /// Verbose flag as last seen by the primitive.
    pub fn verbose(&self) -> bool {
        self.record.verbose.load(Ordering::SeqCst)
    }

    /// How often `set_verbose_logging` was called on the primitive.
    pub fn verbose_calls(&self) -> usize {
        self.record.verbose_calls.load(Ordering::SeqCst)
    }

    pub fn emit(&self, changes: Vec<FileChange>) {
        self.record.sink.changed(changes);
    }

    pub fn emit_change(&self, path: impl Into<PathBuf>, kind: ChangeType) {
        self.emit(vec![FileChange {
            path: path.into(),
            kind,
            correlation_id: self.record.request.request.correlation_id,
        }]);
    }

    pub fn fail(&self) {
        self.record.sink.failed();
    }

    pub fn log(&self, message: LogMessage) {
        self.record.sink.log(message);
    }
}

struct FakePrimitive {
    handle: FakeHandle,
    state: Arc<Mutex<FakeState>>,
}

impl WatchPrimitive for FakePrimitive {
    fn set_verbose_logging(&mut self, enabled: bool) {
        self.handle.record.verbose.store(enabled, Ordering::SeqCst);
        self.handle
            .record
            .verbose_calls
            .fetch_add(1, Ordering::SeqCst);
    }

    fn dispose(&mut self) {
        self.handle
            .record
            .dispose_count
            .fetch_add(1, Ordering::SeqCst);
        self.state
            .lock()
            .unwrap()
            .journal
            .push(JournalEntry::Disposed(self.handle.path().to_path_buf()));
    }
}
