//! Listener registry
//!
//! Stores listeners per event type and resolves the ordered, applicable subset for a
//! concrete event type and channel.
//!
//! # Examples
//!
//! ```ignore
//! use eventsys_core::{InMemoryListenerRegistry, ListenerRegistry};
//!
//! let registry = InMemoryListenerRegistry::new();
//! let registration = registry.register(OwnerId::from("audit-plugin"), listener)?;
//!
//! // Listeners for UserEvent also receive every subtype of UserEvent
//! let resolved = registry.resolve(&register_event_type, &ChannelSet::All);
//!
//! // Drop everything the plugin registered
//! registry.unregister(OwnerId::from("audit-plugin").into());
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod storage;

use std::sync::Arc;

pub use storage::InMemoryListenerRegistry;

use crate::{
    channel::ChannelSet,
    error::Result,
    event::EventType,
    listener::{EventListener, ListenerId, OwnerId, RegisteredListener},
};

/// What to remove on unregistration
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UnregisterTarget {
    /// Every listener registered by an owner
    Owner(OwnerId),
    /// A single listener
    Listener(ListenerId),
}

impl From<OwnerId> for UnregisterTarget {
    fn from(owner: OwnerId) -> Self {
        UnregisterTarget::Owner(owner)
    }
}

impl From<ListenerId> for UnregisterTarget {
    fn from(id: ListenerId) -> Self {
        UnregisterTarget::Listener(id)
    }
}

/// Receipt of a successful registration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Registration {
    /// Listener id
    pub id: ListenerId,

    /// Registering owner
    pub owner: OwnerId,

    /// Declared event type
    pub event_type: EventType,

    /// Declared channels
    pub channels: ChannelSet,
}

impl Registration {
    pub(crate) fn of(entry: &RegisteredListener) -> Self {
        Self {
            id: entry.id(),
            owner: entry.owner().clone(),
            event_type: entry.event_type().clone(),
            channels: entry.channels().clone(),
        }
    }
}

/// Listener storage and resolution
///
/// # Thread Safety
///
/// Implementations must be `Send + Sync` and must let `resolve` run concurrently with
/// registration without observing a partially applied update.
pub trait ListenerRegistry: Send + Sync {
    /// Register a listener for `owner`
    ///
    /// Registering the same listener instance for the same owner again returns the
    /// existing registration.
    ///
    /// # Errors
    ///
    /// Returns an error if the listener declares an exclude channel expression.
    fn register(&self, owner: OwnerId, listener: Arc<dyn EventListener>) -> Result<Registration>;

    /// Remove listeners, returning how many were removed
    fn unregister(&self, target: UnregisterTarget) -> usize;

    /// Listeners applicable to an event of `event_type` on `channel`, in execution order
    ///
    /// A listener applies when its declared type is `event_type` or an ancestor of it and
    /// its channels intersect `channel`.
    fn resolve(&self, event_type: &EventType, channel: &ChannelSet) -> Vec<Arc<RegisteredListener>>;

    /// Every registered listener, in registration order
    fn listeners(&self) -> Vec<Arc<RegisteredListener>>;
}
