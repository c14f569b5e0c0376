//! Method listeners: a function bound to the instance that owns it

use std::{fmt, sync::Arc};

use serde_json::Value;

use super::{EventListener, Invocation, ListenerDeclaration, ListenerSpec};
use crate::error::Result;

/// Signature of a listener method on `O`
pub type ListenerMethod<O> = fn(&O, &Invocation<'_>) -> anyhow::Result<Value>;

/// Listener backed by a method of an owning instance
///
/// # Examples
///
/// ```ignore
/// struct AuditPlugin { log: Mutex<Vec<String>> }
///
/// impl AuditPlugin {
///     fn on_register(&self, invocation: &Invocation<'_>) -> anyhow::Result<Value> {
///         self.log.lock().push(invocation.event.event_type().to_string());
///         Ok(Value::Null)
///     }
/// }
///
/// let listener = MethodListener::from_declaration(
///     plugin.clone(),
///     &declaration,
///     AuditPlugin::on_register,
/// )?;
/// ```
pub struct MethodListener<O> {
    instance: Arc<O>,
    method: ListenerMethod<O>,
    spec: ListenerSpec,
    name: String,
}

impl<O> MethodListener<O>
where
    O: Send + Sync + 'static,
{
    /// Bind `method` to `instance` with an explicit spec
    pub fn new(name: impl Into<String>, instance: Arc<O>, spec: ListenerSpec, method: ListenerMethod<O>) -> Self {
        Self {
            instance,
            method,
            spec,
            name: name.into(),
        }
    }

    /// Bind `method` to `instance`, deriving the spec from its declaration
    ///
    /// # Errors
    ///
    /// Returns an error if the declaration does not produce a valid spec.
    pub fn from_declaration(
        instance: Arc<O>,
        declaration: &ListenerDeclaration,
        method: ListenerMethod<O>,
    ) -> Result<Self> {
        let spec = ListenerSpec::from_declaration(declaration)?;
        Ok(Self::new(declaration.name.clone(), instance, spec, method))
    }

    /// The owning instance
    pub fn instance(&self) -> &Arc<O> {
        &self.instance
    }
}

impl<O> EventListener for MethodListener<O>
where
    O: Send + Sync + 'static,
{
    fn name(&self) -> &str {
        &self.name
    }

    fn spec(&self) -> &ListenerSpec {
        &self.spec
    }

    fn on_event(&self, invocation: &Invocation<'_>) -> anyhow::Result<Value> {
        (self.method)(&self.instance, invocation)
    }
}

impl<O> fmt::Debug for MethodListener<O> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MethodListener")
            .field("name", &self.name)
            .field("owner_type", &std::any::type_name::<O>())
            .field("spec", &self.spec)
            .finish()
    }
}
