//! # Server Core Configuration
//!
//! Timing and logging settings for the orchestration layer. Every field has a
//! default, so an empty configuration is valid.
//!
//! ## Layering
//!
//! 1. Serde defaults
//! 2. Optional TOML file (explicit path, else `A2A_CORE_CONFIG_PATH`)
//! 3. Environment variables prefixed `A2A_CORE`, nested with `__`
//!    (e.g. `A2A_CORE__ORCHESTRATION__AGENT_COMPLETION_TIMEOUT_MS=10000`)
//!
//! ## Usage
//!
//! ```rust,no_run
//! use a2a_core::config::ConfigLoader;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let config = ConfigLoader::new().load()?;
//! let timeout = config.orchestration.agent_completion_timeout();
//! # Ok(())
//! # }
//! ```

pub mod error;
pub mod loader;

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::constants::defaults;

pub use error::{ConfigResult, ConfigurationError};
pub use loader::ConfigLoader;

/// Root configuration
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CoreConfig {
    pub orchestration: OrchestrationConfig,
    pub queue: QueueConfig,
    pub logging: LoggingConfig,
}

impl CoreConfig {
    /// Reject values the orchestrator cannot operate with
    pub fn validate(&self) -> ConfigResult<()> {
        self.orchestration.validate()?;
        self.queue.validate()?;
        Ok(())
    }
}

/// Bounds on the blocking send waits
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OrchestrationConfig {
    /// How long a blocking send waits for the unit of work to finish
    pub agent_completion_timeout_ms: u64,
    /// How long a blocking send then waits for the background drain
    pub consumption_completion_timeout_ms: u64,
    /// Delivery mode for requests that do not specify `blocking`
    pub default_blocking: bool,
}

impl OrchestrationConfig {
    pub fn agent_completion_timeout(&self) -> Duration {
        Duration::from_millis(self.agent_completion_timeout_ms)
    }

    pub fn consumption_completion_timeout(&self) -> Duration {
        Duration::from_millis(self.consumption_completion_timeout_ms)
    }

    fn validate(&self) -> ConfigResult<()> {
        if self.agent_completion_timeout_ms == 0 {
            return Err(ConfigurationError::invalid_value(
                "orchestration.agent_completion_timeout_ms",
                "0",
                "must be greater than zero",
            ));
        }
        if self.consumption_completion_timeout_ms == 0 {
            return Err(ConfigurationError::invalid_value(
                "orchestration.consumption_completion_timeout_ms",
                "0",
                "must be greater than zero",
            ));
        }
        Ok(())
    }
}

impl Default for OrchestrationConfig {
    fn default() -> Self {
        Self {
            agent_completion_timeout_ms: defaults::AGENT_COMPLETION_TIMEOUT_MS,
            consumption_completion_timeout_ms: defaults::CONSUMPTION_COMPLETION_TIMEOUT_MS,
            default_blocking: true,
        }
    }
}

/// Event queue consumption settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct QueueConfig {
    /// Slice a consumer waits on an empty queue before re-checking producer state
    pub poll_interval_ms: u64,
}

impl QueueConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    fn validate(&self) -> ConfigResult<()> {
        if self.poll_interval_ms == 0 {
            return Err(ConfigurationError::invalid_value(
                "queue.poll_interval_ms",
                "0",
                "must be greater than zero",
            ));
        }
        Ok(())
    }
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: defaults::QUEUE_POLL_INTERVAL_MS,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Filter directive used when `RUST_LOG` is unset (e.g. `info`, `a2a_core=debug`)
    pub level: Option<String>,
    /// Emit JSON lines instead of human-readable output
    pub json: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = CoreConfig::default();
        assert_eq!(
            config.orchestration.agent_completion_timeout(),
            Duration::from_secs(30)
        );
        assert_eq!(
            config.orchestration.consumption_completion_timeout(),
            Duration::from_secs(5)
        );
        assert!(config.orchestration.default_blocking);
        assert_eq!(config.queue.poll_interval(), Duration::from_millis(500));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_zero_timeout_is_invalid() {
        let mut config = CoreConfig::default();
        config.orchestration.consumption_completion_timeout_ms = 0;

        let err = config.validate().unwrap_err();
        assert!(matches!(
            err,
            ConfigurationError::InvalidValue { ref field, .. }
                if field == "orchestration.consumption_completion_timeout_ms"
        ));
    }

    #[test]
    fn test_partial_document_keeps_defaults() {
        let config: CoreConfig =
            serde_json::from_str(r#"{"queue": {"poll_interval_ms": 50}}"#).unwrap();
        assert_eq!(config.queue.poll_interval_ms, 50);
        assert_eq!(config.orchestration, OrchestrationConfig::default());
    }
}
