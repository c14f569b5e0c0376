//! Listener binding contracts
//!
//! A [`ListenerSpec`] says which events a listener receives (event type, channel), when it
//! runs (priority, cancellation flags) and what it needs from the event (parameters).
//! Specs are built directly with the builder methods or derived from a
//! [`ListenerDeclaration`], the structured form of a declared listener function.

use serde_json::Value;

use crate::{
    channel::{self, ChannelSet},
    error::{EngineError, Result},
    event::{EventType, ValueType},
    sorter::Priority,
};

/// Declared type of a listener parameter
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParamType {
    /// The dispatched event itself
    Event(EventType),
    /// A property value of the given type
    Value(ValueType),
    /// A property-of-T declaration; binds like `Value(T)`
    Property(ValueType),
}

impl ParamType {
    /// Type used to look the parameter up on the event, `None` for event slots
    pub fn lookup_type(&self) -> Option<ValueType> {
        match self {
            ParamType::Event(_) => None,
            ParamType::Value(value_type) | ParamType::Property(value_type) => Some(*value_type),
        }
    }
}

/// One declared listener parameter
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParameterSpec {
    /// Property name to look up
    pub name: String,

    /// Declared type
    pub declared_type: ParamType,

    /// Missing property binds to an absent/null marker instead of failing
    pub optional: bool,

    /// Match properties whose declared type is assignable to this one, not only equal
    pub lookup_by_assignability: bool,

    /// Parameter is declared through an optional wrapper (`Option<T>`)
    pub wrapped: bool,
}

impl ParameterSpec {
    fn with_type(name: impl Into<String>, declared_type: ParamType) -> Self {
        Self {
            name: name.into(),
            declared_type,
            optional: false,
            lookup_by_assignability: false,
            wrapped: false,
        }
    }

    /// Event slot
    pub fn event(name: impl Into<String>, event_type: EventType) -> Self {
        Self::with_type(name, ParamType::Event(event_type))
    }

    /// Property value of `value_type`
    pub fn value(name: impl Into<String>, value_type: ValueType) -> Self {
        Self::with_type(name, ParamType::Value(value_type))
    }

    /// Property-of-`value_type`
    pub fn property(name: impl Into<String>, value_type: ValueType) -> Self {
        Self::with_type(name, ParamType::Property(value_type))
    }

    /// Mark optional
    pub fn optional(mut self) -> Self {
        self.optional = true;
        self
    }

    /// Declare through an optional wrapper; wrapped parameters are always optional
    pub fn wrapped(mut self) -> Self {
        self.wrapped = true;
        self.optional = true;
        self
    }

    /// Look up by assignability
    pub fn by_assignability(mut self) -> Self {
        self.lookup_by_assignability = true;
        self
    }
}

/// Immutable descriptor of a listener's binding contract
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListenerSpec {
    /// Event type the listener is declared for; subtypes are delivered too
    pub event_type: EventType,

    /// Parameters in declaration order
    pub parameters: Vec<ParameterSpec>,

    /// Whether the first parameter receives the event
    pub first_is_event: bool,

    /// Execution rank
    pub priority: Priority,

    /// Channel expression
    pub channel: String,

    /// Skip this listener while the event is cancelled
    pub ignore_cancelled: bool,

    /// The listener participates in cancellation (may flip the flag)
    pub cancel_affected: bool,
}

impl ListenerSpec {
    /// A listener taking only the event
    pub fn for_event(event_type: EventType) -> Self {
        Self {
            parameters: vec![ParameterSpec::event("event", event_type.clone())],
            event_type,
            first_is_event: true,
            priority: Priority::Normal,
            channel: channel::ALL.to_string(),
            ignore_cancelled: false,
            cancel_affected: false,
        }
    }

    /// A listener that takes properties only (add them with [`with_parameter`](Self::with_parameter))
    pub fn for_properties(event_type: EventType) -> Self {
        Self {
            parameters: Vec::new(),
            first_is_event: false,
            ..Self::for_event(event_type)
        }
    }

    /// Append a parameter
    pub fn with_parameter(mut self, parameter: ParameterSpec) -> Self {
        self.parameters.push(parameter);
        self
    }

    /// Set the priority
    pub fn with_priority(mut self, priority: Priority) -> Self {
        self.priority = priority;
        self
    }

    /// Set the channel expression
    pub fn with_channel(mut self, channel: impl Into<String>) -> Self {
        self.channel = channel.into();
        self
    }

    /// Set `ignore_cancelled`
    pub fn ignoring_cancelled(mut self, ignore: bool) -> Self {
        self.ignore_cancelled = ignore;
        self
    }

    /// Set `cancel_affected`
    pub fn affected_by_cancel(mut self, affected: bool) -> Self {
        self.cancel_affected = affected;
        self
    }

    /// Parsed channel expression
    pub fn channel_set(&self) -> ChannelSet {
        ChannelSet::parse(&self.channel)
    }

    /// Index of the parameter called `name`
    pub fn parameter_index(&self, name: &str) -> Option<usize> {
        self.parameters.iter().position(|p| p.name == name)
    }

    /// Derive a spec from a listener declaration
    ///
    /// - Without a filter, or with `use_event_arg`, the first parameter receives the event
    ///   and must declare an event type, which becomes the listener's event type.
    /// - Otherwise a filter naming exactly one event type sets it; any other filter falls
    ///   back to the root event type.
    ///
    /// # Errors
    ///
    /// Returns an error if the first parameter must be the event but is missing or is not
    /// declared as an event type.
    pub fn from_declaration(declaration: &ListenerDeclaration) -> Result<Self> {
        let first_is_event = declaration
            .filter
            .as_ref()
            .map(|f| f.use_event_arg)
            .unwrap_or(true);

        let event_type = if first_is_event {
            match declaration.parameters.first().map(|p| &p.declared_type) {
                Some(ParamType::Event(event_type)) => event_type.clone(),
                Some(other) => {
                    return Err(EngineError::InvalidListener(format!(
                        "First parameter of '{}' must be the event, found {:?}",
                        declaration.name, other
                    )))
                }
                None => {
                    return Err(EngineError::InvalidListener(format!(
                        "Listener '{}' declares no parameters",
                        declaration.name
                    )))
                }
            }
        } else {
            match declaration.filter.as_ref().map(|f| f.event_types.as_slice()) {
                Some([single]) => single.clone(),
                _ => EventType::root(),
            }
        };

        Ok(Self {
            event_type,
            parameters: declaration.parameters.clone(),
            first_is_event,
            priority: declaration.attributes.priority,
            channel: declaration.attributes.channel.clone(),
            ignore_cancelled: declaration.attributes.ignore_cancelled,
            cancel_affected: declaration.cancel_affected,
        })
    }
}

/// Listener attributes (priority, channel, cancellation)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListenerAttributes {
    /// Skip while cancelled
    pub ignore_cancelled: bool,

    /// Execution rank
    pub priority: Priority,

    /// Channel expression
    pub channel: String,
}

impl Default for ListenerAttributes {
    fn default() -> Self {
        Self {
            ignore_cancelled: false,
            priority: Priority::Normal,
            channel: channel::ALL.to_string(),
        }
    }
}

/// Event-type filter on a declared listener
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilterDeclaration {
    /// Event types the listener is limited to
    pub event_types: Vec<EventType>,

    /// Whether the first parameter still receives the event
    pub use_event_arg: bool,
}

/// Structured form of a declared listener function
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListenerDeclaration {
    /// Function name, used in diagnostics
    pub name: String,

    /// Listener attributes
    pub attributes: ListenerAttributes,

    /// Optional event-type filter
    pub filter: Option<FilterDeclaration>,

    /// Cancel-affected marker
    pub cancel_affected: bool,

    /// Declared parameters
    pub parameters: Vec<ParameterSpec>,
}

impl ListenerDeclaration {
    /// A declaration with default attributes and no parameters
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            attributes: ListenerAttributes::default(),
            filter: None,
            cancel_affected: false,
            parameters: Vec::new(),
        }
    }
}

/// Positional argument produced by binding
#[derive(Debug, Clone, PartialEq)]
pub enum Argument {
    /// The dispatched event
    Event,
    /// A raw property value
    Value(Value),
    /// A property value inside an optional wrapper
    Present(Value),
    /// Optional wrapper with no value
    Absent,
    /// Optional parameter without wrapper and no value
    Null,
}

impl Argument {
    /// Carried value, if any
    pub fn value(&self) -> Option<&Value> {
        match self {
            Argument::Value(value) | Argument::Present(value) => Some(value),
            _ => None,
        }
    }
}
