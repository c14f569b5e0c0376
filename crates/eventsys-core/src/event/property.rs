//! Property-backed event implementation

use std::sync::atomic::{AtomicBool, Ordering};

use serde_json::Value;

use super::{Cancellable, Event, EventType, PropertyView, ValueType};
use crate::error::{EngineError, Result};

/// A named, typed event attribute
#[derive(Debug, Clone, PartialEq)]
pub struct Property {
    /// Property name
    pub name: String,

    /// Declared type (may be wider than the value's concrete type)
    pub value_type: ValueType,

    /// Current value
    pub value: Value,
}

/// Event materialized from an ordered list of properties
///
/// # Examples
///
/// ```ignore
/// let event = PropertyEvent::builder(EventType::new("PaymentEvent"))
///     .property("amount", json!(25))
///     .typed_property("note", ValueType::Any, json!("coffee"))
///     .cancellable(false)
///     .build()?;
///
/// assert_eq!(event.get_by_name_and_type("amount", ValueType::Integer), Some(json!(25)));
/// ```
#[derive(Debug)]
pub struct PropertyEvent {
    event_type: EventType,
    properties: Vec<Property>,
    cancelled: Option<AtomicBool>,
}

impl PropertyEvent {
    /// Start building an event of `event_type`
    pub fn builder(event_type: EventType) -> PropertyEventBuilder {
        PropertyEventBuilder {
            event_type,
            properties: Vec::new(),
            cancelled: None,
        }
    }

    /// Build a non-cancellable event from the fields of a JSON object
    ///
    /// Each field becomes a property whose declared type is the value's concrete type.
    ///
    /// # Errors
    ///
    /// Returns an error if `data` is not an object.
    pub fn from_json(event_type: EventType, data: &Value) -> Result<Self> {
        let object = data.as_object().ok_or_else(|| {
            EngineError::InvalidProperty(format!(
                "Event data must be a JSON object, got {}",
                ValueType::of(data)
            ))
        })?;

        object
            .iter()
            .fold(Self::builder(event_type), |builder, (name, value)| {
                builder.property(name.clone(), value.clone())
            })
            .build()
    }

    /// Declared properties in order
    pub fn properties(&self) -> &[Property] {
        &self.properties
    }

    fn find(&self, name: &str) -> Option<&Property> {
        self.properties.iter().find(|p| p.name == name)
    }
}

impl PropertyView for PropertyEvent {
    fn get_by_name_and_type(&self, name: &str, value_type: ValueType) -> Option<Value> {
        self.find(name)
            .filter(|p| p.value_type == value_type)
            .map(|p| p.value.clone())
    }

    fn get_by_assignability(&self, value_type: ValueType, name: &str) -> Option<Value> {
        self.find(name)
            .filter(|p| value_type.is_assignable_from(p.value_type))
            .map(|p| p.value.clone())
    }

    fn enumerate(&self) -> Vec<(String, Value)> {
        self.properties
            .iter()
            .map(|p| (p.name.clone(), p.value.clone()))
            .collect()
    }
}

impl Cancellable for PropertyEvent {
    fn is_cancelled(&self) -> bool {
        self.cancelled
            .as_ref()
            .map(|flag| flag.load(Ordering::SeqCst))
            .unwrap_or(false)
    }

    fn set_cancelled(&self, cancelled: bool) {
        if let Some(flag) = &self.cancelled {
            flag.store(cancelled, Ordering::SeqCst);
        }
    }
}

impl Event for PropertyEvent {
    fn event_type(&self) -> EventType {
        self.event_type.clone()
    }

    fn as_cancellable(&self) -> Option<&dyn Cancellable> {
        if self.cancelled.is_some() {
            Some(self)
        } else {
            None
        }
    }
}

/// Builder for [`PropertyEvent`]
#[derive(Debug)]
pub struct PropertyEventBuilder {
    event_type: EventType,
    properties: Vec<Property>,
    cancelled: Option<bool>,
}

impl PropertyEventBuilder {
    /// Add a property typed by its value
    pub fn property(self, name: impl Into<String>, value: Value) -> Self {
        let value_type = ValueType::of(&value);
        self.typed_property(name, value_type, value)
    }

    /// Add a property with an explicit declared type
    pub fn typed_property(mut self, name: impl Into<String>, value_type: ValueType, value: Value) -> Self {
        self.properties.push(Property {
            name: name.into(),
            value_type,
            value,
        });
        self
    }

    /// Give the event a cancellation flag with an initial state
    pub fn cancellable(mut self, cancelled: bool) -> Self {
        self.cancelled = Some(cancelled);
        self
    }

    /// Finish the event
    ///
    /// # Errors
    ///
    /// Returns an error if a property name repeats or a value does not fit its declared type.
    pub fn build(self) -> Result<PropertyEvent> {
        for (i, property) in self.properties.iter().enumerate() {
            if self.properties[..i].iter().any(|p| p.name == property.name) {
                return Err(EngineError::InvalidProperty(format!(
                    "Duplicate property '{}' on {}",
                    property.name, self.event_type
                )));
            }

            if !property.value_type.accepts(&property.value) {
                return Err(EngineError::InvalidProperty(format!(
                    "Property '{}' declared as {} holds a {} value",
                    property.name,
                    property.value_type,
                    ValueType::of(&property.value)
                )));
            }
        }

        Ok(PropertyEvent {
            event_type: self.event_type,
            properties: self.properties,
            cancelled: self.cancelled.map(AtomicBool::new),
        })
    }
}
