//! Event capabilities consumed by the dispatch engine
//!
//! The engine never builds events. An external materializer produces a value that
//! implements [`Event`]; the engine only reads it through [`PropertyView`] and, for
//! cancellable events, toggles it through [`Cancellable`].
//!
//! [`PropertyEvent`] is a ready-made materialized event backed by an ordered list of
//! declared properties.

pub mod property;
pub mod types;

use std::fmt;

use serde_json::Value;

pub use property::{Property, PropertyEvent, PropertyEventBuilder};
pub use types::{EventType, ValueType, ROOT_EVENT_TYPE};

/// Read-only, typed attribute lookup over an event
pub trait PropertyView {
    /// Property named `name` whose declared type is exactly `value_type`
    fn get_by_name_and_type(&self, name: &str, value_type: ValueType) -> Option<Value>;

    /// Property named `name` whose declared type is assignable to `value_type`
    fn get_by_assignability(&self, value_type: ValueType, name: &str) -> Option<Value>;

    /// Every property in declaration order
    fn enumerate(&self) -> Vec<(String, Value)>;
}

/// Mutable "suppressed" flag of a cancellable event
///
/// Takes `&self`: events are shared between the dispatcher and listeners, so
/// implementations use interior mutability (typically an `AtomicBool`). Under
/// asynchronous dispatch concurrent listeners may race on this flag.
pub trait Cancellable: Send + Sync {
    /// Whether the event is currently cancelled
    fn is_cancelled(&self) -> bool;

    /// Set the cancelled state
    fn set_cancelled(&self, cancelled: bool);
}

/// A materialized event
pub trait Event: PropertyView + fmt::Debug + Send + Sync {
    /// Concrete runtime type of this event
    fn event_type(&self) -> EventType;

    /// Cancellation capability, if the event has one
    fn as_cancellable(&self) -> Option<&dyn Cancellable> {
        None
    }

    /// Whether the event is cancellable and currently cancelled
    fn is_cancelled(&self) -> bool {
        self.as_cancellable().map(|c| c.is_cancelled()).unwrap_or(false)
    }
}
