//! Worker pools for asynchronous dispatch
//!
//! The engine receives its pool as an `Arc<dyn WorkerPool>`. Production code shares one
//! process-wide [`ThreadWorkerPool`] through [`shared_pool`]; tests can inject an
//! [`InlineWorkerPool`] or a pool of their own.

use std::{num::NonZeroUsize, sync::Arc, thread};

use once_cell::sync::OnceCell;
use tracing::{debug, error};

use crate::{
    config::PoolConfig,
    error::{EngineError, Result},
};

/// Unit of work submitted to a pool
pub type Task = Box<dyn FnOnce() + Send + 'static>;

/// Executes submitted tasks
pub trait WorkerPool: Send + Sync {
    /// Submit a task; must not wait for it to run
    fn execute(&self, task: Task);

    /// Number of worker threads (0 for pools without threads)
    fn size(&self) -> usize;
}

/// Fixed-size rayon thread pool
pub struct ThreadWorkerPool {
    pool: rayon::ThreadPool,
}

impl ThreadWorkerPool {
    /// Build a pool sized by `config`
    ///
    /// # Errors
    ///
    /// Returns an error if the OS refuses to spawn the worker threads.
    pub fn new(config: &PoolConfig) -> Result<Self> {
        let threads = config.resolved_threads(available_parallelism());
        let prefix = config.thread_name_prefix.clone();

        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(threads)
            .thread_name(move |index| format!("{}-{}", prefix, index))
            .panic_handler(|_| error!("Worker task panicked outside listener isolation"))
            .build()
            .map_err(|e| EngineError::PoolError(e.to_string()))?;

        debug!(threads, "Built dispatch worker pool");
        Ok(Self { pool })
    }
}

impl WorkerPool for ThreadWorkerPool {
    fn execute(&self, task: Task) {
        self.pool.spawn(task);
    }

    fn size(&self) -> usize {
        self.pool.current_num_threads()
    }
}

/// Runs every task on the submitting thread
///
/// Asynchronous dispatch through this pool has completed by the time it returns.
#[derive(Debug, Clone, Copy, Default)]
pub struct InlineWorkerPool;

impl WorkerPool for InlineWorkerPool {
    fn execute(&self, task: Task) {
        task();
    }

    fn size(&self) -> usize {
        0
    }
}

static SHARED_POOL: OnceCell<Arc<ThreadWorkerPool>> = OnceCell::new();

/// Process-wide pool, built from `config` on first use
///
/// Later calls return the existing pool and ignore `config`.
///
/// # Errors
///
/// Returns an error if the pool has to be built and building fails.
pub fn shared_pool(config: &PoolConfig) -> Result<Arc<dyn WorkerPool>> {
    let pool: Arc<dyn WorkerPool> = SHARED_POOL
        .get_or_try_init(|| ThreadWorkerPool::new(config).map(Arc::new))?
        .clone();
    Ok(pool)
}

/// Hardware threads, falling back to 1
pub fn available_parallelism() -> usize {
    thread::available_parallelism()
        .map(NonZeroUsize::get)
        .unwrap_or(1)
}
