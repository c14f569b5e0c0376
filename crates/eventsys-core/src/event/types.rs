//! Event and value type descriptors
//!
//! [`EventType`] is a named node in a single-rooted type hierarchy. Listeners registered
//! for a type receive every event whose type descends from it.
//!
//! [`ValueType`] is the declared type of an event property or listener parameter. Values
//! themselves are `serde_json::Value`s.

use std::{
    fmt,
    hash::{Hash, Hasher},
    sync::Arc,
};

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Name of the root event type
pub const ROOT_EVENT_TYPE: &str = "Event";

static ROOT: Lazy<EventType> = Lazy::new(|| {
    EventType(Arc::new(EventTypeInner {
        name: ROOT_EVENT_TYPE.to_string(),
        parents: Vec::new(),
    }))
});

/// Runtime event type descriptor
///
/// Equality and hashing go by name, so two descriptors built independently with the same
/// name are the same type.
///
/// # Examples
///
/// ```ignore
/// let user_event = EventType::new("UserEvent");
/// let register = EventType::with_parents("UserRegisterEvent", [user_event.clone()]);
///
/// assert!(user_event.is_assignable_from(&register));
/// assert!(EventType::root().is_assignable_from(&register));
/// assert!(!register.is_assignable_from(&user_event));
/// ```
#[derive(Clone)]
pub struct EventType(Arc<EventTypeInner>);

struct EventTypeInner {
    name: String,
    parents: Vec<EventType>,
}

impl EventType {
    /// The root type every event descends from
    pub fn root() -> EventType {
        ROOT.clone()
    }

    /// A type whose only parent is the root type
    pub fn new(name: impl Into<String>) -> Self {
        Self::with_parents(name, [Self::root()])
    }

    /// A type with explicit parents
    ///
    /// An empty parent list attaches the type directly to the root.
    pub fn with_parents(name: impl Into<String>, parents: impl IntoIterator<Item = EventType>) -> Self {
        let name = name.into();
        if name == ROOT_EVENT_TYPE {
            return Self::root();
        }

        let mut parents: Vec<EventType> = parents.into_iter().collect();
        if parents.is_empty() {
            parents.push(Self::root());
        }

        EventType(Arc::new(EventTypeInner { name, parents }))
    }

    /// Type name
    pub fn name(&self) -> &str {
        &self.0.name
    }

    /// Direct supertypes
    pub fn parents(&self) -> &[EventType] {
        &self.0.parents
    }

    /// Whether this is the root type
    pub fn is_root(&self) -> bool {
        self.0.name == ROOT_EVENT_TYPE
    }

    /// This type followed by all of its ancestors, breadth first, without duplicates
    pub fn ancestors(&self) -> Vec<EventType> {
        let mut seen: Vec<EventType> = vec![self.clone()];
        let mut cursor = 0;

        while cursor < seen.len() {
            let parents = seen[cursor].parents().to_vec();
            for parent in parents {
                if !seen.contains(&parent) {
                    seen.push(parent);
                }
            }
            cursor += 1;
        }

        seen
    }

    /// Whether a listener declared for `self` accepts an event of type `other`
    ///
    /// True when `other` is `self` or one of its descendants.
    pub fn is_assignable_from(&self, other: &EventType) -> bool {
        self.is_root() || other.ancestors().iter().any(|t| t == self)
    }
}

impl PartialEq for EventType {
    fn eq(&self, other: &Self) -> bool {
        self.0.name == other.0.name
    }
}

impl Eq for EventType {}

impl Hash for EventType {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.0.name.hash(state);
    }
}

impl fmt::Debug for EventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("EventType").field(&self.0.name).finish()
    }
}

impl fmt::Display for EventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0.name)
    }
}

/// Declared type of a property or parameter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ValueType {
    /// Accepts every value
    Any,
    /// JSON null
    Null,
    /// Boolean
    Bool,
    /// Any number (integer or float)
    Number,
    /// Integral number
    Integer,
    /// Floating point number
    Float,
    /// String
    String,
    /// Array
    Array,
    /// Object
    Object,
}

impl ValueType {
    /// Concrete type of a value
    pub fn of(value: &Value) -> ValueType {
        match value {
            Value::Null => ValueType::Null,
            Value::Bool(_) => ValueType::Bool,
            Value::Number(n) if n.is_i64() || n.is_u64() => ValueType::Integer,
            Value::Number(_) => ValueType::Float,
            Value::String(_) => ValueType::String,
            Value::Array(_) => ValueType::Array,
            Value::Object(_) => ValueType::Object,
        }
    }

    /// Whether a slot of this type can hold a value declared as `other`
    pub fn is_assignable_from(self, other: ValueType) -> bool {
        match self {
            ValueType::Any => true,
            ValueType::Number => matches!(
                other,
                ValueType::Number | ValueType::Integer | ValueType::Float
            ),
            _ => self == other,
        }
    }

    /// Whether `value` fits a slot of this type
    pub fn accepts(self, value: &Value) -> bool {
        self.is_assignable_from(Self::of(value))
    }

    /// Lowercase name
    pub fn as_str(self) -> &'static str {
        match self {
            ValueType::Any => "any",
            ValueType::Null => "null",
            ValueType::Bool => "bool",
            ValueType::Number => "number",
            ValueType::Integer => "integer",
            ValueType::Float => "float",
            ValueType::String => "string",
            ValueType::Array => "array",
            ValueType::Object => "object",
        }
    }
}

impl fmt::Display for ValueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
