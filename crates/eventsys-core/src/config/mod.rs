//! Engine configuration
//!
//! Configuration is optional: every field has a default, and a missing configuration file
//! yields [`EngineConfig::default`]. Files are YAML:
//!
//! ```yaml
//! pool:
//!   threads: 8
//!   parallelism_multiplier: 2
//!   thread_name_prefix: eventsys-worker
//! default_channel: "@all"
//! ```

pub mod loader;

use serde::{Deserialize, Serialize};

pub use loader::{ConfigLoader, WORKER_THREADS_ENV};

use crate::{
    channel::{self, ChannelSet},
    error::{EngineError, Result},
};

/// Worker pool sizing
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PoolConfig {
    /// Fixed thread count; when unset the pool is sized from hardware parallelism
    pub threads: Option<usize>,

    /// Threads per hardware thread when `threads` is unset
    pub parallelism_multiplier: usize,

    /// Worker thread name prefix
    pub thread_name_prefix: String,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            threads: None,
            parallelism_multiplier: 2,
            thread_name_prefix: "eventsys-worker".to_string(),
        }
    }
}

impl PoolConfig {
    /// Thread count for a machine with `available` hardware threads
    pub fn resolved_threads(&self, available: usize) -> usize {
        self.threads
            .unwrap_or_else(|| available.saturating_mul(self.parallelism_multiplier))
            .max(1)
    }
}

/// Engine configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Worker pool used by asynchronous dispatch
    pub pool: PoolConfig,

    /// Channel used by dispatches that name none
    pub default_channel: String,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            pool: PoolConfig::default(),
            default_channel: channel::ALL.to_string(),
        }
    }
}

impl EngineConfig {
    /// Check that the engine can run with this configuration
    ///
    /// # Errors
    ///
    /// Returns a validation error for a zero thread count, a zero parallelism multiplier,
    /// an empty thread name prefix or an exclude expression as default channel.
    pub fn validate(&self) -> Result<()> {
        if self.pool.threads == Some(0) {
            return Err(EngineError::ValidationError(
                "pool.threads must be greater than zero".to_string(),
            ));
        }

        if self.pool.parallelism_multiplier == 0 {
            return Err(EngineError::ValidationError(
                "pool.parallelism_multiplier must be greater than zero".to_string(),
            ));
        }

        if self.pool.thread_name_prefix.trim().is_empty() {
            return Err(EngineError::ValidationError(
                "pool.thread_name_prefix cannot be empty".to_string(),
            ));
        }

        if self.default_channel.trim().is_empty() {
            return Err(EngineError::ValidationError(
                "default_channel cannot be empty".to_string(),
            ));
        }

        if ChannelSet::parse(&self.default_channel).is_exclude() {
            return Err(EngineError::ValidationError(format!(
                "default_channel cannot be an exclude expression: {}",
                self.default_channel
            )));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = EngineConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.default_channel, "@all");
        assert_eq!(config.pool.parallelism_multiplier, 2);
    }

    #[test]
    fn test_resolved_threads() {
        let pool = PoolConfig::default();
        assert_eq!(pool.resolved_threads(4), 8);

        let fixed = PoolConfig {
            threads: Some(3),
            ..PoolConfig::default()
        };
        assert_eq!(fixed.resolved_threads(64), 3);
    }

    #[test]
    fn test_validation_rejects_bad_values() {
        let mut config = EngineConfig::default();
        config.pool.threads = Some(0);
        assert!(matches!(config.validate(), Err(EngineError::ValidationError(_))));

        let mut config = EngineConfig::default();
        config.pool.parallelism_multiplier = 0;
        assert!(config.validate().is_err());

        let mut config = EngineConfig::default();
        config.default_channel = "!user".to_string();
        assert!(config.validate().is_err());
    }
}
