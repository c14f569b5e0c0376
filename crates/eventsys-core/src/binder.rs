//! Parameter binding
//!
//! Resolves a listener's declared parameters against an event's [`PropertyView`] into
//! positional arguments. Binding only reads the event and the spec, so it is safe to run
//! concurrently for distinct (spec, event) pairs.

use std::slice;

use crate::{
    error::ListenError,
    event::Event,
    listener::{Argument, ListenerSpec, ParamType, ParameterSpec},
};

/// Positional arguments for one invocation, one per declared parameter
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ArgumentList(Vec<Argument>);

impl ArgumentList {
    /// Argument at `index`
    pub fn get(&self, index: usize) -> Option<&Argument> {
        self.0.get(index)
    }

    /// Number of arguments
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether there are no arguments
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Iterate in parameter order
    pub fn iter(&self) -> slice::Iter<'_, Argument> {
        self.0.iter()
    }

    /// Take the arguments
    pub fn into_inner(self) -> Vec<Argument> {
        self.0
    }
}

impl From<Vec<Argument>> for ArgumentList {
    fn from(arguments: Vec<Argument>) -> Self {
        Self(arguments)
    }
}

impl<'a> IntoIterator for &'a ArgumentList {
    type Item = &'a Argument;
    type IntoIter = slice::Iter<'a, Argument>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

/// Binds listener specs to events
#[derive(Debug, Clone, Copy, Default)]
pub struct ParameterBinder;

impl ParameterBinder {
    /// Bind `spec` against `event`
    ///
    /// 1. First-is-event with a single parameter binds just the event.
    /// 2. Otherwise every declared parameter is looked up by name and type. Missing
    ///    optional parameters bind to [`Argument::Absent`] (wrapped) or
    ///    [`Argument::Null`]; a missing required one fails with
    ///    [`ListenError::PropertyNotFound`].
    /// 3. No parameters and not first-is-event fails with
    ///    [`ListenError::MissingEventType`].
    /// 4. Anything else fails with [`ListenError::CouldNotDispatch`].
    pub fn bind(spec: &ListenerSpec, event: &dyn Event) -> Result<ArgumentList, ListenError> {
        let parameters = &spec.parameters;

        if spec.first_is_event && parameters.len() == 1 {
            return Ok(ArgumentList(vec![Argument::Event]));
        }

        if parameters.is_empty() {
            return Err(if spec.first_is_event {
                ListenError::CouldNotDispatch
            } else {
                ListenError::MissingEventType
            });
        }

        let mut arguments = Vec::with_capacity(parameters.len());
        let mut remaining = parameters.iter();

        if spec.first_is_event {
            remaining.next();
            arguments.push(Argument::Event);
        }

        for parameter in remaining {
            arguments.push(Self::bind_parameter(parameter, event)?);
        }

        Ok(ArgumentList(arguments))
    }

    fn bind_parameter(parameter: &ParameterSpec, event: &dyn Event) -> Result<Argument, ListenError> {
        let value_type = match &parameter.declared_type {
            // Only the leading slot can receive the event
            ParamType::Event(_) => return Err(ListenError::CouldNotDispatch),
            declared => declared.lookup_type().ok_or(ListenError::CouldNotDispatch)?,
        };

        let found = if parameter.lookup_by_assignability {
            event.get_by_assignability(value_type, &parameter.name)
        } else {
            event.get_by_name_and_type(&parameter.name, value_type)
        };

        match found {
            Some(value) if parameter.wrapped => Ok(Argument::Present(value)),
            Some(value) => Ok(Argument::Value(value)),
            None if parameter.optional && parameter.wrapped => Ok(Argument::Absent),
            None if parameter.optional => Ok(Argument::Null),
            None => Err(ListenError::PropertyNotFound {
                name: parameter.name.clone(),
                value_type,
            }),
        }
    }
}
