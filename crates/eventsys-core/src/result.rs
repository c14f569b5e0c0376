//! Dispatch outcomes
//!
//! Synchronous dispatch returns [`ListenExecutionResult`]s directly. Asynchronous dispatch
//! returns a [`DispatchResult`]: one [`PendingResult`] per resolved listener, fixed at
//! dispatch time, each completed exactly once by its worker task.

use std::{
    fmt,
    panic::{self, AssertUnwindSafe},
    sync::Arc,
};

use parking_lot::Mutex;
use serde_json::Value;
use tokio::sync::watch;
use tracing::{error, warn};

use crate::{
    dispatcher::Origin,
    error::ListenError,
    event::{Event, EventType},
    listener::RegisteredListener,
};

/// Outcome of one listener invocation
#[derive(Debug, Clone)]
pub enum ListenResult {
    /// The listener ran and returned a value
    Value(Value),
    /// The listener failed or was skipped
    Failed(ListenError),
}

impl ListenResult {
    /// Success without a payload
    pub fn success() -> Self {
        ListenResult::Value(Value::Null)
    }

    /// Success with a payload
    pub fn value(value: Value) -> Self {
        ListenResult::Value(value)
    }

    /// Failure
    pub fn failed(error: ListenError) -> Self {
        ListenResult::Failed(error)
    }

    /// Whether the listener returned normally
    pub fn is_success(&self) -> bool {
        matches!(self, ListenResult::Value(_))
    }

    /// Returned value, if any
    pub fn as_value(&self) -> Option<&Value> {
        match self {
            ListenResult::Value(value) => Some(value),
            ListenResult::Failed(_) => None,
        }
    }

    /// Failure, if any
    pub fn error(&self) -> Option<&ListenError> {
        match self {
            ListenResult::Value(_) => None,
            ListenResult::Failed(error) => Some(error),
        }
    }
}

impl From<Result<Value, ListenError>> for ListenResult {
    fn from(result: Result<Value, ListenError>) -> Self {
        match result {
            Ok(value) => ListenResult::Value(value),
            Err(error) => ListenResult::Failed(error),
        }
    }
}

/// Record of one listener's part in a dispatch
#[derive(Clone)]
pub struct ListenExecutionResult {
    /// The listener
    pub listener: Arc<RegisteredListener>,

    /// The dispatched event
    pub event: Arc<dyn Event>,

    /// Event type the listeners were resolved for
    pub event_type: EventType,

    /// Dispatch origin
    pub origin: Origin,

    /// Dispatch channel
    pub channel: String,

    /// Outcome
    pub result: ListenResult,
}

impl fmt::Debug for ListenExecutionResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ListenExecutionResult")
            .field("listener", &self.listener.name())
            .field("event_type", &self.event_type)
            .field("origin", &self.origin)
            .field("channel", &self.channel)
            .field("result", &self.result)
            .finish()
    }
}

type Subscriber = Box<dyn FnOnce(&ListenExecutionResult) + Send>;

/// Run one subscriber; a panic is logged and stays with that subscriber
fn notify(subscriber: Subscriber, result: &ListenExecutionResult) {
    if panic::catch_unwind(AssertUnwindSafe(|| subscriber(result))).is_err() {
        error!(
            listener = %result.listener.name(),
            "Result subscriber panicked"
        );
    }
}

struct PendingState {
    outcome: Option<ListenExecutionResult>,
    subscribers: Vec<Subscriber>,
}

struct PendingInner {
    state: Mutex<PendingState>,
    done: watch::Sender<bool>,
}

/// Handle to one listener's eventual outcome
///
/// Cloning yields another handle to the same outcome.
#[derive(Clone)]
pub struct PendingResult {
    inner: Arc<PendingInner>,
}

impl PendingResult {
    /// Unresolved handle
    pub fn new() -> Self {
        let (done, _) = watch::channel(false);
        Self {
            inner: Arc::new(PendingInner {
                state: Mutex::new(PendingState {
                    outcome: None,
                    subscribers: Vec::new(),
                }),
                done,
            }),
        }
    }

    /// Already resolved handle
    pub fn completed(result: ListenExecutionResult) -> Self {
        let pending = Self::new();
        pending.complete(result);
        pending
    }

    /// Resolve the handle and notify subscribers
    ///
    /// A handle resolves once; later calls are ignored. Waiters are released before
    /// subscribers run, and a panicking subscriber does not stop the others.
    pub fn complete(&self, result: ListenExecutionResult) {
        let subscribers = {
            let mut state = self.inner.state.lock();
            if state.outcome.is_some() {
                warn!(
                    listener = %result.listener.name(),
                    "Ignoring second completion of pending result"
                );
                return;
            }
            state.outcome = Some(result.clone());
            std::mem::take(&mut state.subscribers)
        };

        self.inner.done.send_replace(true);

        for subscriber in subscribers {
            notify(subscriber, &result);
        }
    }

    /// Run `callback` once with the outcome, immediately if already resolved
    pub fn subscribe<F>(&self, callback: F)
    where
        F: FnOnce(&ListenExecutionResult) + Send + 'static,
    {
        let mut state = self.inner.state.lock();
        if let Some(result) = state.outcome.clone() {
            drop(state);
            notify(Box::new(callback), &result);
            return;
        }
        state.subscribers.push(Box::new(callback));
    }

    /// Whether the outcome is available
    pub fn is_done(&self) -> bool {
        self.inner.state.lock().outcome.is_some()
    }

    /// Outcome, if available
    pub fn try_get(&self) -> Option<ListenExecutionResult> {
        self.inner.state.lock().outcome.clone()
    }

    /// Wait for the outcome
    pub async fn wait(&self) -> ListenExecutionResult {
        let mut done = self.inner.done.subscribe();
        loop {
            if let Some(result) = self.try_get() {
                return result;
            }
            // The sender lives in `inner`, so this only returns on a state change
            let _ = done.changed().await;
        }
    }
}

impl Default for PendingResult {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for PendingResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PendingResult")
            .field("done", &self.is_done())
            .finish()
    }
}

/// Pending outcomes of an asynchronous dispatch, in resolution order
#[derive(Debug, Clone, Default)]
pub struct DispatchResult {
    pending: Vec<PendingResult>,
}

impl DispatchResult {
    /// Wrap pending handles
    pub fn new(pending: Vec<PendingResult>) -> Self {
        Self { pending }
    }

    /// Concatenate several results, keeping their order
    pub fn combine(results: impl IntoIterator<Item = DispatchResult>) -> Self {
        Self {
            pending: results.into_iter().flat_map(|r| r.pending).collect(),
        }
    }

    /// Number of listeners
    pub fn len(&self) -> usize {
        self.pending.len()
    }

    /// Whether no listener was resolved
    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    /// Pending handles
    pub fn pending(&self) -> &[PendingResult] {
        &self.pending
    }

    /// Whether every listener has completed
    pub fn is_done(&self) -> bool {
        self.pending.iter().all(PendingResult::is_done)
    }

    /// Attach `callback` to every handle; it runs once per listener
    pub fn subscribe_all<F>(&self, callback: F)
    where
        F: Fn(&ListenExecutionResult) + Send + Sync + 'static,
    {
        let callback = Arc::new(callback);
        for pending in &self.pending {
            let callback = callback.clone();
            pending.subscribe(move |result| callback(result));
        }
    }

    /// Wait for every listener; results come back in resolution order
    pub async fn await_all(&self) -> Vec<ListenExecutionResult> {
        futures::future::join_all(self.pending.iter().map(|p| p.wait())).await
    }

    /// Blocking form of [`await_all`](Self::await_all)
    ///
    /// Must not be called from inside an async runtime worker.
    pub fn wait_all(&self) -> Vec<ListenExecutionResult> {
        futures::executor::block_on(self.await_all())
    }
}
