//! Closure listeners

use std::fmt;

use serde_json::Value;

use super::{EventListener, Invocation, ListenerSpec};

type Handler = dyn Fn(&Invocation<'_>) -> anyhow::Result<Value> + Send + Sync;

/// Listener backed by a closure and an explicit spec
pub struct FnListener {
    name: String,
    spec: ListenerSpec,
    handler: Box<Handler>,
}

impl FnListener {
    /// Wrap `handler`
    pub fn new<F>(name: impl Into<String>, spec: ListenerSpec, handler: F) -> Self
    where
        F: Fn(&Invocation<'_>) -> anyhow::Result<Value> + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            spec,
            handler: Box::new(handler),
        }
    }
}

impl EventListener for FnListener {
    fn name(&self) -> &str {
        &self.name
    }

    fn spec(&self) -> &ListenerSpec {
        &self.spec
    }

    fn on_event(&self, invocation: &Invocation<'_>) -> anyhow::Result<Value> {
        (self.handler)(invocation)
    }
}

impl fmt::Debug for FnListener {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FnListener")
            .field("name", &self.name)
            .field("spec", &self.spec)
            .finish()
    }
}
