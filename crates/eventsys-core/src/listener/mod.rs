//! Event listeners
//!
//! Every handler implements [`EventListener`]. Two variants ship with the crate:
//!
//! - [`MethodListener`]: a method function bound to its owning instance, with a spec
//!   derived from the method's declaration
//! - [`FnListener`]: a closure with an explicit spec
//!
//! The registry wraps each listener in a [`RegisteredListener`] that records who
//! registered it and in which order.

pub mod functional;
pub mod method;
pub mod spec;

use std::{fmt, sync::Arc};

use serde_json::Value;
use uuid::Uuid;

pub use functional::FnListener;
pub use method::MethodListener;
pub use spec::{
    Argument, FilterDeclaration, ListenerAttributes, ListenerDeclaration, ListenerSpec,
    ParamType, ParameterSpec,
};

use crate::{
    binder::ArgumentList,
    channel::ChannelSet,
    dispatcher::Origin,
    event::{Event, EventType},
    sorter::Priority,
};

/// Everything a listener sees when it is invoked
pub struct Invocation<'a> {
    /// The dispatched event
    pub event: &'a dyn Event,

    /// Who dispatched it
    pub origin: &'a Origin,

    /// Channel of the dispatch
    pub channel: &'a str,

    /// Bound arguments, one per declared parameter
    pub args: &'a ArgumentList,

    /// The listener's own spec
    pub spec: &'a ListenerSpec,
}

impl<'a> Invocation<'a> {
    /// Argument bound for the parameter called `name`
    pub fn arg(&self, name: &str) -> Option<&Argument> {
        self.spec
            .parameter_index(name)
            .and_then(|index| self.args.get(index))
    }

    /// Value bound for the parameter called `name`, if one was present
    pub fn value(&self, name: &str) -> Option<&Value> {
        self.arg(name).and_then(Argument::value)
    }
}

/// A handler registered for an event type
pub trait EventListener: Send + Sync {
    /// Name used in logs and results
    fn name(&self) -> &str;

    /// Binding contract
    fn spec(&self) -> &ListenerSpec;

    /// Handle one event
    ///
    /// Errors (and panics) are captured by the dispatcher as exception failures for this
    /// listener only.
    fn on_event(&self, invocation: &Invocation<'_>) -> anyhow::Result<Value>;

    /// Execution rank
    fn priority(&self) -> Priority {
        self.spec().priority
    }

    /// Channel expression
    fn channel(&self) -> &str {
        &self.spec().channel
    }

    /// Skip while the event is cancelled
    fn ignore_cancelled(&self) -> bool {
        self.spec().ignore_cancelled
    }

    /// Participates in cancellation
    fn cancel_affected(&self) -> bool {
        self.spec().cancel_affected
    }
}

/// Unique listener identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(Uuid);

impl ListenerId {
    /// Fresh random id
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ListenerId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ListenerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Identifier of whoever registered a listener (a plugin, a module, ...)
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct OwnerId(Arc<str>);

impl OwnerId {
    /// Owner name
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for OwnerId {
    fn from(value: &str) -> Self {
        Self(Arc::from(value))
    }
}

impl From<String> for OwnerId {
    fn from(value: String) -> Self {
        Self(Arc::from(value))
    }
}

impl fmt::Display for OwnerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A listener as stored by the registry
pub struct RegisteredListener {
    id: ListenerId,
    owner: OwnerId,
    sequence: u64,
    channels: ChannelSet,
    listener: Arc<dyn EventListener>,
}

impl RegisteredListener {
    /// Wrap a listener; `sequence` is its registration order
    pub fn new(id: ListenerId, owner: OwnerId, sequence: u64, listener: Arc<dyn EventListener>) -> Self {
        let channels = listener.spec().channel_set();
        Self {
            id,
            owner,
            sequence,
            channels,
            listener,
        }
    }

    /// Listener id
    pub fn id(&self) -> ListenerId {
        self.id
    }

    /// Registering owner
    pub fn owner(&self) -> &OwnerId {
        &self.owner
    }

    /// Registration order
    pub fn sequence(&self) -> u64 {
        self.sequence
    }

    /// Declared event type
    pub fn event_type(&self) -> &EventType {
        &self.listener.spec().event_type
    }

    /// Execution rank
    pub fn priority(&self) -> Priority {
        self.listener.priority()
    }

    /// Listener name
    pub fn name(&self) -> &str {
        self.listener.name()
    }

    /// Parsed channel expression
    pub fn channels(&self) -> &ChannelSet {
        &self.channels
    }

    /// The wrapped listener
    pub fn listener(&self) -> &Arc<dyn EventListener> {
        &self.listener
    }
}

impl fmt::Debug for RegisteredListener {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RegisteredListener")
            .field("id", &self.id)
            .field("name", &self.name())
            .field("owner", &self.owner)
            .field("event_type", self.event_type())
            .field("priority", &self.priority())
            .field("sequence", &self.sequence)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::event::{PropertyEvent, ValueType};

    #[test]
    fn test_invocation_lookup_by_parameter_name() {
        let spec = ListenerSpec::for_properties(EventType::new("PaymentEvent"))
            .with_parameter(ParameterSpec::value("amount", ValueType::Integer))
            .with_parameter(ParameterSpec::value("note", ValueType::String).wrapped());
        let args = ArgumentList::from(vec![Argument::Value(json!(10)), Argument::Absent]);
        let event = PropertyEvent::builder(EventType::new("PaymentEvent"))
            .build()
            .unwrap();
        let origin = Origin::new("test");

        let invocation = Invocation {
            event: &event,
            origin: &origin,
            channel: "@all",
            args: &args,
            spec: &spec,
        };

        assert_eq!(invocation.value("amount"), Some(&json!(10)));
        assert_eq!(invocation.arg("note"), Some(&Argument::Absent));
        assert_eq!(invocation.value("note"), None);
        assert_eq!(invocation.arg("missing"), None);
    }

    #[test]
    fn test_registered_listener_parses_channel_once() {
        let spec = ListenerSpec::for_event(EventType::new("UserEvent")).with_channel("user,admin");
        let listener = FnListener::new("on_user", spec, |_| Ok(Value::Null));
        let entry = RegisteredListener::new(ListenerId::new(), OwnerId::from("plugin"), 0, Arc::new(listener));

        assert!(entry.channels().contains("admin"));
        assert_eq!(entry.owner().as_str(), "plugin");
        assert_eq!(entry.name(), "on_user");
    }

    #[test]
    fn test_listener_ids_are_unique() {
        assert_ne!(ListenerId::new(), ListenerId::new());
    }
}
