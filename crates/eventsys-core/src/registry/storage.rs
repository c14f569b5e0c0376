//! Copy-on-write listener storage

use std::{
    collections::HashMap,
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc,
    },
};

use arc_swap::ArcSwap;
use parking_lot::Mutex;
use tracing::{debug, info, warn};

use super::{ListenerRegistry, Registration, UnregisterTarget};
use crate::{
    channel::ChannelSet,
    error::{EngineError, Result},
    event::EventType,
    listener::{EventListener, ListenerId, OwnerId, RegisteredListener},
    sorter::PrioritySorter,
};

/// Immutable view of every bucket
#[derive(Debug, Default, Clone)]
struct Snapshot {
    buckets: HashMap<EventType, Vec<Arc<RegisteredListener>>>,
}

impl Snapshot {
    fn find_duplicate(&self, owner: &OwnerId, listener: &Arc<dyn EventListener>) -> Option<&Arc<RegisteredListener>> {
        let bucket = self.buckets.get(&listener.spec().event_type)?;
        bucket
            .iter()
            .find(|entry| entry.owner() == owner && same_instance(entry.listener(), listener))
    }
}

fn same_instance(a: &Arc<dyn EventListener>, b: &Arc<dyn EventListener>) -> bool {
    std::ptr::eq(Arc::as_ptr(a) as *const (), Arc::as_ptr(b) as *const ())
}

/// In-memory listener registry
///
/// Readers load the current snapshot without locking. Writers are serialized, copy the
/// snapshot, apply their change and publish the copy, so `resolve` only ever sees whole
/// updates.
pub struct InMemoryListenerRegistry {
    snapshot: ArcSwap<Snapshot>,
    writer: Mutex<()>,
    sequence: AtomicU64,
}

impl InMemoryListenerRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self {
            snapshot: ArcSwap::from_pointee(Snapshot::default()),
            writer: Mutex::new(()),
            sequence: AtomicU64::new(0),
        }
    }

    /// Number of registered listeners
    pub fn len(&self) -> usize {
        self.snapshot.load().buckets.values().map(Vec::len).sum()
    }

    /// Whether no listener is registered
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for InMemoryListenerRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl ListenerRegistry for InMemoryListenerRegistry {
    fn register(&self, owner: OwnerId, listener: Arc<dyn EventListener>) -> Result<Registration> {
        let channels = listener.spec().channel_set();
        if channels.is_exclude() {
            return Err(EngineError::InvalidListener(format!(
                "Listener '{}' cannot listen on exclude channel expression '{}'",
                listener.name(),
                listener.channel()
            )));
        }

        let _guard = self.writer.lock();
        let current = self.snapshot.load_full();

        if let Some(existing) = current.find_duplicate(&owner, &listener) {
            debug!(
                listener = %existing.name(),
                owner = %owner,
                "Listener already registered, returning existing registration"
            );
            return Ok(Registration::of(existing));
        }

        let sequence = self.sequence.fetch_add(1, Ordering::SeqCst);
        let entry = Arc::new(RegisteredListener::new(ListenerId::new(), owner, sequence, listener));
        let registration = Registration::of(&entry);

        let mut next = Snapshot::clone(&current);
        let bucket = next.buckets.entry(entry.event_type().clone()).or_default();
        PrioritySorter::insert(bucket, entry.clone());
        self.snapshot.store(Arc::new(next));

        info!(
            listener = %entry.name(),
            listener_id = %entry.id(),
            owner = %entry.owner(),
            event_type = %entry.event_type(),
            priority = %entry.priority(),
            "Registered listener"
        );

        Ok(registration)
    }

    fn unregister(&self, target: UnregisterTarget) -> usize {
        let _guard = self.writer.lock();
        let current = self.snapshot.load_full();

        let matches = |entry: &Arc<RegisteredListener>| match &target {
            UnregisterTarget::Owner(owner) => entry.owner() == owner,
            UnregisterTarget::Listener(id) => entry.id() == *id,
        };

        let mut removed = 0;
        let mut next = Snapshot::default();
        for (event_type, bucket) in &current.buckets {
            let kept: Vec<_> = bucket.iter().filter(|entry| !matches(*entry)).cloned().collect();
            removed += bucket.len() - kept.len();
            if !kept.is_empty() {
                next.buckets.insert(event_type.clone(), kept);
            }
        }

        if removed == 0 {
            warn!(unregister = ?target, "Nothing to unregister");
            return 0;
        }

        self.snapshot.store(Arc::new(next));
        info!(unregister = ?target, removed, "Unregistered listeners");
        removed
    }

    fn resolve(&self, event_type: &EventType, channel: &ChannelSet) -> Vec<Arc<RegisteredListener>> {
        let snapshot = self.snapshot.load();

        let mut resolved: Vec<Arc<RegisteredListener>> = event_type
            .ancestors()
            .iter()
            .filter_map(|ancestor| snapshot.buckets.get(ancestor))
            .flatten()
            .filter(|entry| entry.channels().listens_to(channel))
            .cloned()
            .collect();

        PrioritySorter::sort(&mut resolved);

        debug!(
            event_type = %event_type,
            channel = ?channel,
            listener_count = resolved.len(),
            "Resolved listeners"
        );

        resolved
    }

    fn listeners(&self) -> Vec<Arc<RegisteredListener>> {
        let snapshot = self.snapshot.load();
        let mut all: Vec<_> = snapshot.buckets.values().flatten().cloned().collect();
        all.sort_by_key(|entry| entry.sequence());
        all
    }
}
