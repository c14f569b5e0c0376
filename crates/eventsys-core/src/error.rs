//! Error types for the dispatch engine
//!
//! Two families of errors live here:
//!
//! 1. [`EngineError`]: failures of engine operations themselves (listener registration,
//!    configuration loading, worker pool construction, event construction). These are
//!    returned through the crate-wide [`Result`] alias.
//!
//! 2. [`ListenError`]: the closed taxonomy of per-listener failures. A `ListenError` is
//!    never returned from `dispatch`; it is carried as data inside
//!    [`ListenResult::Failed`](crate::result::ListenResult::Failed) so one listener's
//!    failure stays local to that listener (listener isolation).
//!
//! # Examples
//!
//! Inspecting per-listener outcomes:
//!
//! ```ignore
//! for outcome in engine.dispatch(event, &origin) {
//!     match outcome.result {
//!         ListenResult::Value(value) => println!("{} -> {}", outcome.listener.name(), value),
//!         ListenResult::Failed(ListenError::PropertyNotFound { name, value_type }) => {
//!             eprintln!("missing property {}: {}", name, value_type)
//!         }
//!         ListenResult::Failed(e) => eprintln!("listener failed: {}", e),
//!     }
//! }
//! ```

use std::sync::Arc;

use thiserror::Error;

use crate::event::ValueType;

/// Errors that can occur in engine operations
#[derive(Debug, Error)]
pub enum EngineError {
    /// Listener rejected at registration or declaration time
    ///
    /// Common causes:
    /// - Exclude channel expression (`"!name"`) on a listener
    /// - First-is-event declaration whose first parameter is not an event type
    #[error("Invalid listener: {0}")]
    InvalidListener(String),

    /// Invalid engine configuration
    ///
    /// A configuration value that parsed but cannot be interpreted, such as a bad override.
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),

    /// Configuration validation error
    ///
    /// The configuration parsed but holds values the engine cannot run with
    /// (zero worker threads, zero parallelism multiplier, ...).
    #[error("Configuration validation error: {0}")]
    ValidationError(String),

    /// A property value does not match its declared type
    #[error("Invalid property: {0}")]
    InvalidProperty(String),

    /// The worker pool could not be built
    #[error("Worker pool error: {0}")]
    PoolError(String),

    /// Serialization error
    ///
    /// Wraps `serde_yaml::Error` for YAML parsing failures.
    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_yaml::Error),

    /// IO error
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

/// Result type for engine operations
pub type Result<T> = std::result::Result<T, EngineError>;

/// Per-listener failure kinds
///
/// `Clone` so a [`ListenExecutionResult`](crate::result::ListenExecutionResult) can be
/// handed to several subscribers.
#[derive(Debug, Clone, Error)]
pub enum ListenError {
    /// The listener body returned an error or panicked
    #[error("Exception in listener: {0}")]
    Exception(Arc<anyhow::Error>),

    /// A required (non-optional) parameter could not be resolved against the event
    #[error("Property not found: '{name}' of type {value_type}")]
    PropertyNotFound {
        /// Parameter name
        name: String,
        /// Type the parameter was looked up with
        value_type: ValueType,
    },

    /// The listener declares no event parameter and is not first-is-event
    #[error("Listener declares no event type")]
    MissingEventType,

    /// Generic structural mismatch between the listener and the event
    #[error("Could not dispatch event to listener")]
    CouldNotDispatch,

    /// The listener was skipped because the event was cancelled
    #[error("Event cancelled, listener not invoked")]
    EventCancelled,
}

impl ListenError {
    /// Wrap an error raised by a listener body
    pub fn exception(error: anyhow::Error) -> Self {
        ListenError::Exception(Arc::new(error))
    }

    /// Whether this failure means the listener body never ran
    pub fn is_skip(&self) -> bool {
        !matches!(self, ListenError::Exception(_))
    }
}
