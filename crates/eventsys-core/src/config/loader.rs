//! Configuration loader
//!
//! Reads [`EngineConfig`] from a YAML file, applies environment overrides and validates
//! the result.

use std::{env, fs, path::Path};

use tracing::{debug, warn};

use super::EngineConfig;
use crate::error::{EngineError, Result};

/// Environment variable overriding `pool.threads`
pub const WORKER_THREADS_ENV: &str = "EVENTSYS_WORKER_THREADS";

/// Configuration loader
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load, override from the environment, and validate
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, is not valid YAML, an override is
    /// malformed, or the final configuration fails validation.
    pub fn load(path: &Path) -> Result<EngineConfig> {
        let config = Self::load_from_path(path)?;
        let config = Self::apply_overrides(config, |key| env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    /// Load a configuration file
    ///
    /// A missing file is not an error and yields the default configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read or parsed.
    pub fn load_from_path(path: &Path) -> Result<EngineConfig> {
        if !path.exists() {
            debug!(path = %path.display(), "No engine configuration file, using defaults");
            return Ok(EngineConfig::default());
        }

        let content = fs::read_to_string(path)?;
        Self::parse_yaml(&content)
    }

    /// Parse YAML configuration content
    ///
    /// Empty content yields the default configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the content is not valid YAML or has fields of the wrong shape.
    pub fn parse_yaml(content: &str) -> Result<EngineConfig> {
        if content.trim().is_empty() {
            return Ok(EngineConfig::default());
        }

        Ok(serde_yaml::from_str(content)?)
    }

    /// Apply overrides read through `lookup`
    ///
    /// # Errors
    ///
    /// Returns an error if an override value cannot be parsed.
    pub fn apply_overrides<F>(mut config: EngineConfig, lookup: F) -> Result<EngineConfig>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(raw) = lookup(WORKER_THREADS_ENV) {
            let threads = raw.trim().parse::<usize>().map_err(|e| {
                EngineError::InvalidConfiguration(format!(
                    "{} must be a thread count, got '{}': {}",
                    WORKER_THREADS_ENV, raw, e
                ))
            })?;

            if config.pool.threads.is_some() {
                warn!(threads, "Worker thread count from environment overrides configuration file");
            }
            config.pool.threads = Some(threads);
        }

        Ok(config)
    }
}
