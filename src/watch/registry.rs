// src/watch/registry.rs

//! The set of live watcher instances.

use std::fmt;

use crate::types::{MergedWatchRequest, PathCasing, WatchRequest};
use crate::watch::path_utils::paths_equal;
use crate::watch::patterns::filters_equal;
use crate::watch::primitive::WatchPrimitive;
use crate::watch::sink::{EventSink, InstanceId};

/// A merged request paired with the primitive serving it.
///
/// The primitive is disposed exactly once, by [`WatcherInstance::dispose`],
/// which consumes the instance.
pub struct WatcherInstance {
    id: InstanceId,
    request: MergedWatchRequest,
    primitive: Box<dyn WatchPrimitive>,
    sink: EventSink,
}

impl fmt::Debug for WatcherInstance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WatcherInstance")
            .field("id", &self.id)
            .field("request", &self.request)
            .finish_non_exhaustive()
    }
}

impl WatcherInstance {
    pub fn new(
        id: InstanceId,
        request: MergedWatchRequest,
        primitive: Box<dyn WatchPrimitive>,
        sink: EventSink,
    ) -> Self {
        Self {
            id,
            request,
            primitive,
            sink,
        }
    }

    pub fn id(&self) -> InstanceId {
        self.id
    }

    pub fn request(&self) -> &MergedWatchRequest {
        &self.request
    }

    pub fn sink(&self) -> &EventSink {
        &self.sink
    }

    pub fn set_verbose_logging(&mut self, enabled: bool) {
        self.primitive.set_verbose_logging(enabled);
    }

    /// Replace the subscriber list of a kept watcher.
    pub(crate) fn refresh(&mut self, request: MergedWatchRequest) {
        self.sink.set_subscribers(&request);
        self.request = request;
    }

    pub fn dispose(mut self) {
        self.sink.close();
        self.primitive.dispose();
    }
}

/// Live watchers, at most one per (path, includes, excludes).
#[derive(Debug)]
pub struct WatcherRegistry {
    casing: PathCasing,
    watchers: Vec<WatcherInstance>,
}

impl WatcherRegistry {
    pub fn new(casing: PathCasing) -> Self {
        Self {
            casing,
            watchers: Vec::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.watchers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.watchers.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &WatcherInstance> {
        self.watchers.iter()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut WatcherInstance> {
        self.watchers.iter_mut()
    }

    /// Find the watcher whose request has an equal path (platform case rule)
    /// and equal include and exclude sets.
    pub fn find(&self, request: &WatchRequest) -> Option<&WatcherInstance> {
        self.watchers
            .iter()
            .find(|w| equivalent(self.casing, &w.request.request, request))
    }

    pub fn find_mut(&mut self, request: &WatchRequest) -> Option<&mut WatcherInstance> {
        let casing = self.casing;
        self.watchers
            .iter_mut()
            .find(|w| equivalent(casing, &w.request.request, request))
    }

    pub fn insert(&mut self, instance: WatcherInstance) {
        debug_assert!(
            self.find(&instance.request.request).is_none(),
            "two watchers registered for {}",
            instance.request.request
        );
        self.watchers.push(instance);
    }

    /// Remove an instance by id.
    ///
    /// The sink is closed before returning so the primitive cannot deliver
    /// anything further, even before it is disposed.
    pub fn remove(&mut self, id: InstanceId) -> Option<WatcherInstance> {
        let pos = self.watchers.iter().position(|w| w.id == id)?;
        let instance = self.watchers.remove(pos);
        instance.sink.close();
        Some(instance)
    }

    /// Remove every instance not listed in `keep`.
    pub fn retain_ids(&mut self, keep: &[InstanceId]) -> Vec<WatcherInstance> {
        let (kept, removed): (Vec<_>, Vec<_>) = std::mem::take(&mut self.watchers)
            .into_iter()
            .partition(|w| keep.contains(&w.id));
        self.watchers = kept;
        for instance in &removed {
            instance.sink.close();
        }
        removed
    }

    /// Remove everything.
    pub fn drain(&mut self) -> Vec<WatcherInstance> {
        let removed = std::mem::take(&mut self.watchers);
        for instance in &removed {
            instance.sink.close();
        }
        removed
    }
}

fn equivalent(casing: PathCasing, a: &WatchRequest, b: &WatchRequest) -> bool {
    paths_equal(&a.path, &b.path, casing) && filters_equal(a, b)
}
