//! Dispatch engine: resolve, order, cancellation gate, bind, invoke, collect

use std::{
    any::Any,
    panic::{self, AssertUnwindSafe},
    sync::Arc,
};

use serde_json::Value;
use tracing::{debug, error, info};

use super::{EventDispatcher, Origin};
use crate::{
    binder::ParameterBinder,
    channel::{self, ChannelSet},
    config::EngineConfig,
    error::{ListenError, Result},
    event::Event,
    listener::{EventListener, FnListener, Invocation, ListenerSpec, OwnerId, RegisteredListener},
    pool::{self, WorkerPool},
    registry::{ListenerRegistry, Registration, UnregisterTarget},
    result::{DispatchResult, ListenExecutionResult, ListenResult, PendingResult},
};

/// Per-dispatch data shared by every listener invocation
struct DispatchContext {
    event: Arc<dyn Event>,
    origin: Origin,
    channel: String,
}

impl DispatchContext {
    fn record(&self, listener: Arc<RegisteredListener>, result: ListenResult) -> ListenExecutionResult {
        ListenExecutionResult {
            listener,
            event: self.event.clone(),
            event_type: self.event.event_type(),
            origin: self.origin.clone(),
            channel: self.channel.clone(),
            result,
        }
    }

    /// Gate, bind and invoke one listener
    fn run(&self, entry: &RegisteredListener) -> ListenResult {
        let listener = entry.listener();

        if listener.ignore_cancelled() && self.event.is_cancelled() {
            debug!(
                listener = %entry.name(),
                event_type = %self.event.event_type(),
                "Event cancelled, skipping listener"
            );
            return ListenResult::failed(ListenError::EventCancelled);
        }

        let spec = listener.spec();
        let args = match ParameterBinder::bind(spec, self.event.as_ref()) {
            Ok(args) => args,
            Err(e) => {
                debug!(
                    listener = %entry.name(),
                    error = %e,
                    "Could not bind listener parameters"
                );
                return ListenResult::failed(e);
            }
        };

        let invocation = Invocation {
            event: self.event.as_ref(),
            origin: &self.origin,
            channel: &self.channel,
            args: &args,
            spec,
        };

        let cancelled_before = self.event.is_cancelled();
        let outcome = panic::catch_unwind(AssertUnwindSafe(|| listener.on_event(&invocation)));

        if listener.cancel_affected() {
            let cancelled_after = self.event.is_cancelled();
            if cancelled_before != cancelled_after {
                debug!(
                    listener = %entry.name(),
                    cancelled = cancelled_after,
                    "Listener changed event cancellation"
                );
            }
        }

        match outcome {
            Ok(Ok(value)) => ListenResult::value(value),
            Ok(Err(e)) => {
                error!(
                    listener = %entry.name(),
                    listener_id = %entry.id(),
                    error = %e,
                    "Listener failed"
                );
                ListenResult::failed(ListenError::exception(e))
            }
            Err(payload) => {
                let message = panic_message(payload.as_ref());
                error!(
                    listener = %entry.name(),
                    listener_id = %entry.id(),
                    panic = %message,
                    "Listener panicked"
                );
                ListenResult::failed(ListenError::exception(anyhow::anyhow!(
                    "Listener '{}' panicked: {}",
                    entry.name(),
                    message
                )))
            }
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "non-string panic payload".to_string()
    }
}

/// Dispatch engine
///
/// Resolves listeners through its registry and runs them either on the calling thread
/// ([`dispatch_in`](EventDispatcher::dispatch_in)) or on its worker pool
/// ([`dispatch_async_in`](EventDispatcher::dispatch_async_in)). A failing or panicking
/// listener only affects its own result.
///
/// Cancellation: under synchronous dispatch the flag is read right before each listener,
/// so a listener sees every change made by the listeners before it. Under asynchronous
/// dispatch each task reads the flag when it starts, and concurrent tasks race on it.
#[derive(Clone)]
pub struct DispatchEngine {
    registry: Arc<dyn ListenerRegistry>,
    pool: Arc<dyn WorkerPool>,
    default_channel: String,
}

impl DispatchEngine {
    /// Create an engine dispatching on the wildcard channel by default
    ///
    /// # Arguments
    ///
    /// * `registry` - Listener registry to resolve from
    /// * `pool` - Worker pool for asynchronous dispatch
    pub fn new(registry: Arc<dyn ListenerRegistry>, pool: Arc<dyn WorkerPool>) -> Self {
        Self {
            registry,
            pool,
            default_channel: channel::ALL.to_string(),
        }
    }

    /// Create an engine on the process-wide pool, configured by `config`
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid or the pool cannot be built.
    pub fn from_config(registry: Arc<dyn ListenerRegistry>, config: &EngineConfig) -> Result<Self> {
        config.validate()?;
        let pool = pool::shared_pool(&config.pool)?;
        Ok(Self::new(registry, pool).with_default_channel(config.default_channel.clone()))
    }

    /// Set the channel used when a dispatch names none
    pub fn with_default_channel(mut self, channel: impl Into<String>) -> Self {
        self.default_channel = channel.into();
        self
    }

    /// The registry
    pub fn registry(&self) -> &Arc<dyn ListenerRegistry> {
        &self.registry
    }

    /// The worker pool
    pub fn pool(&self) -> &Arc<dyn WorkerPool> {
        &self.pool
    }

    /// Register a listener
    ///
    /// # Errors
    ///
    /// Returns an error if the registry rejects the listener.
    pub fn register(&self, owner: impl Into<OwnerId>, listener: Arc<dyn EventListener>) -> Result<Registration> {
        self.registry.register(owner.into(), listener)
    }

    /// Register a closure with an explicit spec
    ///
    /// # Errors
    ///
    /// Returns an error if the registry rejects the listener.
    pub fn register_fn<F>(
        &self,
        owner: impl Into<OwnerId>,
        name: impl Into<String>,
        spec: ListenerSpec,
        handler: F,
    ) -> Result<Registration>
    where
        F: Fn(&Invocation<'_>) -> anyhow::Result<Value> + Send + Sync + 'static,
    {
        self.register(owner, Arc::new(FnListener::new(name, spec, handler)))
    }

    /// Unregister an owner's listeners or a single listener
    pub fn unregister(&self, target: impl Into<UnregisterTarget>) -> usize {
        self.registry.unregister(target.into())
    }

    fn resolve(&self, event: &dyn Event, channel: &str) -> Vec<Arc<RegisteredListener>> {
        self.registry
            .resolve(&event.event_type(), &ChannelSet::parse(channel))
    }
}

impl EventDispatcher for DispatchEngine {
    fn default_channel(&self) -> &str {
        &self.default_channel
    }

    fn dispatch_in(&self, event: Arc<dyn Event>, origin: &Origin, channel: &str) -> Vec<ListenExecutionResult> {
        let listeners = self.resolve(event.as_ref(), channel);

        debug!(
            event_type = %event.event_type(),
            origin = %origin,
            channel = %channel,
            listener_count = listeners.len(),
            "Dispatching event"
        );

        if listeners.is_empty() {
            return Vec::new();
        }

        let context = DispatchContext {
            event,
            origin: origin.clone(),
            channel: channel.to_string(),
        };

        let results: Vec<ListenExecutionResult> = listeners
            .into_iter()
            .map(|entry| {
                let result = context.run(&entry);
                context.record(entry, result)
            })
            .collect();

        let failed = results.iter().filter(|r| !r.result.is_success()).count();
        info!(
            event_type = %context.event.event_type(),
            listener_count = results.len(),
            failed,
            "Dispatched event"
        );

        results
    }

    fn dispatch_async_in(&self, event: Arc<dyn Event>, origin: &Origin, channel: &str) -> DispatchResult {
        let listeners = self.resolve(event.as_ref(), channel);

        debug!(
            event_type = %event.event_type(),
            origin = %origin,
            channel = %channel,
            listener_count = listeners.len(),
            "Dispatching event asynchronously"
        );

        let context = Arc::new(DispatchContext {
            event,
            origin: origin.clone(),
            channel: channel.to_string(),
        });

        let pending: Vec<PendingResult> = listeners
            .into_iter()
            .map(|entry| {
                let handle = PendingResult::new();
                let task_handle = handle.clone();
                let context = context.clone();

                self.pool.execute(Box::new(move || {
                    let result = context.run(&entry);
                    task_handle.complete(context.record(entry, result));
                }));

                handle
            })
            .collect();

        DispatchResult::new(pending)
    }
}
