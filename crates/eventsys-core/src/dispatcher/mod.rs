//! Event dispatch
//!
//! The [`EventDispatcher`] trait is the caller-facing surface; [`DispatchEngine`] is the
//! implementation backed by a [`ListenerRegistry`](crate::registry::ListenerRegistry) and a
//! [`WorkerPool`](crate::pool::WorkerPool).
//!
//! # Examples
//!
//! ```ignore
//! let engine = DispatchEngine::new(registry, shared_pool(&config.pool)?);
//! let origin = Origin::new("user-service");
//!
//! // Runs every listener on this thread, in priority order
//! let outcomes = engine.dispatch(event.clone(), &origin);
//!
//! // Runs listeners on the worker pool
//! let pending = engine.dispatch_async_in(event, &origin, "user");
//! let outcomes = pending.await_all().await;
//! ```

pub mod engine;

use std::{fmt, sync::Arc};

pub use engine::DispatchEngine;

use crate::{
    event::Event,
    result::{DispatchResult, ListenExecutionResult},
};

/// Opaque token naming who dispatched an event
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Origin(Arc<str>);

impl Origin {
    /// Origin called `name`
    pub fn new(name: impl AsRef<str>) -> Self {
        Self(Arc::from(name.as_ref()))
    }

    /// Origin name
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for Origin {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl fmt::Display for Origin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Trait for dispatching events to listeners
///
/// Neither mode returns an error: every listener failure is reported as data in that
/// listener's [`ListenExecutionResult`].
pub trait EventDispatcher: Send + Sync {
    /// Channel used by [`dispatch`](Self::dispatch) and [`dispatch_async`](Self::dispatch_async)
    fn default_channel(&self) -> &str;

    /// Run every applicable listener on the calling thread, in priority order
    ///
    /// `channel` is a channel expression; see [`ChannelSet`](crate::channel::ChannelSet).
    fn dispatch_in(&self, event: Arc<dyn Event>, origin: &Origin, channel: &str) -> Vec<ListenExecutionResult>;

    /// Submit every applicable listener to the worker pool and return without waiting
    fn dispatch_async_in(&self, event: Arc<dyn Event>, origin: &Origin, channel: &str) -> DispatchResult;

    /// [`dispatch_in`](Self::dispatch_in) on the default channel
    fn dispatch(&self, event: Arc<dyn Event>, origin: &Origin) -> Vec<ListenExecutionResult> {
        self.dispatch_in(event, origin, self.default_channel())
    }

    /// [`dispatch_async_in`](Self::dispatch_async_in) on the default channel
    fn dispatch_async(&self, event: Arc<dyn Event>, origin: &Origin) -> DispatchResult {
        self.dispatch_async_in(event, origin, self.default_channel())
    }
}
