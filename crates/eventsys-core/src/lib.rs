//! EventSys dispatch engine
//!
//! Typed, prioritized delivery of events to registered listeners.
//!
//! # Overview
//!
//! Plugins and modules register listeners for event types. When an event is dispatched
//! the engine finds every listener declared for the event's type or one of its ancestors,
//! orders them by priority (ties keep registration order), binds each listener's declared
//! parameters against the event's properties and invokes it. Every listener gets its own
//! outcome; one listener failing never stops the others.
//!
//! # Architecture
//!
//! 1. **Events** (`event`): the [`Event`], [`PropertyView`] and [`Cancellable`] contracts
//!    consumed from whoever materializes events, plus [`PropertyEvent`]
//! 2. **Listeners** (`listener`): [`EventListener`], [`ListenerSpec`], method and closure
//!    listeners
//! 3. **Registry** (`registry`): copy-on-write storage resolving listeners per event type
//!    and channel
//! 4. **Binder** (`binder`): resolves declared parameters into arguments
//! 5. **Dispatcher** (`dispatcher`): synchronous and pooled asynchronous dispatch
//! 6. **Results** (`result`): per-listener outcomes and pending async results
//! 7. **Configuration** (`config`): YAML engine configuration
//!
//! # Quick Start
//!
//! ```ignore
//! use std::sync::Arc;
//! use eventsys_core::*;
//!
//! let engine = DispatchEngine::new(
//!     Arc::new(InMemoryListenerRegistry::new()),
//!     shared_pool(&PoolConfig::default())?,
//! );
//!
//! let user_event = EventType::new("UserEvent");
//! let register_event = EventType::with_parents("UserRegisterEvent", [user_event.clone()]);
//!
//! engine.register_fn(
//!     "welcome-plugin",
//!     "send_welcome",
//!     ListenerSpec::for_event(user_event)
//!         .with_parameter(ParameterSpec::value("email", ValueType::String))
//!         .with_priority(Priority::High),
//!     |invocation| {
//!         let email = invocation.value("email").cloned().unwrap_or_default();
//!         Ok(serde_json::json!({ "sent_to": email }))
//!     },
//! )?;
//!
//! let event = PropertyEvent::builder(register_event)
//!     .property("email", serde_json::json!("ada@example.com"))
//!     .build()?;
//!
//! for outcome in engine.dispatch(Arc::new(event), &Origin::new("signup")) {
//!     println!("{}: {:?}", outcome.listener.name(), outcome.result);
//! }
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
//!
//! # Error Handling
//!
//! Engine operations (registration, configuration, pool construction) return
//! [`Result`]. Listener failures are data: each [`ListenExecutionResult`] carries a
//! [`ListenResult`] that is either a value or a [`ListenError`].

pub mod binder;
pub mod channel;
pub mod config;
pub mod dispatcher;
pub mod error;
pub mod event;
pub mod listener;
pub mod pool;
pub mod registry;
pub mod result;
pub mod sorter;

pub use binder::{ArgumentList, ParameterBinder};
pub use channel::ChannelSet;
pub use config::{ConfigLoader, EngineConfig, PoolConfig};
pub use dispatcher::{DispatchEngine, EventDispatcher, Origin};
pub use error::{EngineError, ListenError, Result};
pub use event::{
    Cancellable, Event, EventType, Property, PropertyEvent, PropertyEventBuilder, PropertyView,
    ValueType,
};
pub use listener::{
    Argument, EventListener, FilterDeclaration, FnListener, Invocation, ListenerAttributes,
    ListenerDeclaration, ListenerId, ListenerSpec, MethodListener, OwnerId, ParamType,
    ParameterSpec, RegisteredListener,
};
pub use pool::{shared_pool, InlineWorkerPool, ThreadWorkerPool, WorkerPool};
pub use registry::{InMemoryListenerRegistry, ListenerRegistry, Registration, UnregisterTarget};
pub use result::{DispatchResult, ListenExecutionResult, ListenResult, PendingResult};
pub use sorter::{Priority, PrioritySorter};
