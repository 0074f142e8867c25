#![allow(dead_code)]

pub use flatwatch_test_utils::builders;
pub use flatwatch_test_utils::fake_primitive;
pub use flatwatch_test_utils::{init_tracing, with_timeout};

use flatwatch::types::{LogType, PathCasing};
use flatwatch::watch::{NonRecursiveWatcher, WatcherEvent};
use tokio::sync::mpsc;

use crate::common::fake_primitive::FakePrimitiveFactory;

pub type EventRx = mpsc::UnboundedReceiver<WatcherEvent>;

/// A coordinator over fake primitives.
pub fn fake_coordinator(casing: PathCasing) -> (FakePrimitiveFactory, NonRecursiveWatcher, EventRx) {
    let factory = FakePrimitiveFactory::new();
    let (watcher, rx) = NonRecursiveWatcher::new(factory.clone(), casing);
    (factory, watcher, rx)
}

/// Everything currently queued on the receiver.
pub fn drain(rx: &mut EventRx) -> Vec<WatcherEvent> {
    let mut events = Vec::new();
    while let Ok(event) = rx.try_recv() {
        events.push(event);
    }
    events
}

/// Messages of all log events of the given kind.
pub fn log_messages(events: &[WatcherEvent], kind: LogType) -> Vec<String> {
    events
        .iter()
        .filter_map(|e| match e {
            WatcherEvent::Log(msg) if msg.kind == kind => Some(msg.message.clone()),
            _ => None,
        })
        .collect()
}
