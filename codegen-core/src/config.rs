// codegen-core/src/config.rs

//! Coordinator configuration.
//!
//! This is the coordinator's own ambient configuration (poll
//! intervals, relay retry policy, setup script name), loaded from a
//! TOML file with environment variable overrides. It is distinct from
//! the per-session configuration, which arrives through the
//! initialization message.

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::str::FromStr;

use crate::error::{CoordinatorError, Result};

/// Top-level coordinator configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CoordinatorConfig {
    pub dispatch: DispatchConfig,
    pub relay: RelayConfig,
    pub cache: CacheConfig,
}

// Dispatch loop tuning.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DispatchConfig {
    // Idle poll interval (milliseconds) while awaiting queue files.
    pub poll_interval_ms: u64,
    // Poll interval (milliseconds) while waiting for a saturated pool
    // to reclaim a slot.
    pub reap_interval_ms: u64,
    // One-time per-host setup script run at session bootstrap.
    pub setup_script: String,
}

/// Result relay tuning.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RelayConfig {
    /// Maximum number of relay copy retries.
    pub max_retries: u32,
    /// Initial delay (milliseconds) between retries.
    pub retry_delay_ms: u64,
    /// Maximum delay (milliseconds) between retries.
    pub max_retry_delay_ms: u64,
}

/// Point replay cache tuning.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Whether previously generated points short-circuit dispatch.
    pub enabled: bool,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: 1000,
            reap_interval_ms: 100,
            setup_script: "setup_code_gen_hosts.sh".to_string(),
        }
    }
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            retry_delay_ms: 500,
            max_retry_delay_ms: 10_000,
        }
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self { enabled: true }
    }
}

impl FromStr for CoordinatorConfig {
    type Err = CoordinatorError;

    /// Parse configuration from a TOML string.
    fn from_str(s: &str) -> Result<Self> {
        toml::from_str(s)
            .map_err(|e| CoordinatorError::config_with_source("failed to parse TOML config", e))
    }
}

impl CoordinatorConfig {
    // Load configuration from a TOML file.
    //
    // # Errors
    //
    // Returns an error if the file cannot be read or parsed.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .map_err(|e| CoordinatorError::io_with_source(path, "failed to read config file", e))?;
        let config: Self = content.parse()?;
        config.validate()?;
        Ok(config)
    }

    // Apply environment variable overrides.
    //
    // Variables are prefixed with `CGC_`:
    // - `CGC_POLL_INTERVAL_MS` overrides `dispatch.poll_interval_ms`
    // - `CGC_REAP_INTERVAL_MS` overrides `dispatch.reap_interval_ms`
    // - `CGC_SETUP_SCRIPT` overrides `dispatch.setup_script`
    // - `CGC_RELAY_MAX_RETRIES` overrides `relay.max_retries`
    // - `CGC_RELAY_RETRY_DELAY_MS` overrides `relay.retry_delay_ms`
    // - `CGC_RELAY_MAX_RETRY_DELAY_MS` overrides `relay.max_retry_delay_ms`
    // - `CGC_CACHE_ENABLED` overrides `cache.enabled`
    #[must_use]
    pub fn with_env_overrides(mut self) -> Self {
        if let Ok(val) = std::env::var("CGC_POLL_INTERVAL_MS") {
            if let Ok(v) = val.parse() {
                self.dispatch.poll_interval_ms = v;
            }
        }
        if let Ok(val) = std::env::var("CGC_REAP_INTERVAL_MS") {
            if let Ok(v) = val.parse() {
                self.dispatch.reap_interval_ms = v;
            }
        }
        if let Ok(val) = std::env::var("CGC_SETUP_SCRIPT") {
            self.dispatch.setup_script = val;
        }
        if let Ok(val) = std::env::var("CGC_RELAY_MAX_RETRIES") {
            if let Ok(v) = val.parse() {
                self.relay.max_retries = v;
            }
        }
        if let Ok(val) = std::env::var("CGC_RELAY_RETRY_DELAY_MS") {
            if let Ok(v) = val.parse() {
                self.relay.retry_delay_ms = v;
            }
        }
        if let Ok(val) = std::env::var("CGC_RELAY_MAX_RETRY_DELAY_MS") {
            if let Ok(v) = val.parse() {
                self.relay.max_retry_delay_ms = v;
            }
        }
        if let Ok(val) = std::env::var("CGC_CACHE_ENABLED") {
            if let Ok(v) = val.parse() {
                self.cache.enabled = v;
            }
        }
        self
    }

    /// Validate configuration values.
    pub fn validate(&self) -> Result<()> {
        if self.dispatch.poll_interval_ms == 0 {
            return Err(CoordinatorError::config(
                "dispatch.poll_interval_ms must be greater than 0",
            ));
        }
        if self.dispatch.reap_interval_ms == 0 {
            return Err(CoordinatorError::config(
                "dispatch.reap_interval_ms must be greater than 0",
            ));
        }
        if self.dispatch.setup_script.is_empty() {
            return Err(CoordinatorError::config(
                "dispatch.setup_script must not be empty",
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = CoordinatorConfig::default();
        assert_eq!(config.dispatch.poll_interval_ms, 1000);
        assert_eq!(config.dispatch.reap_interval_ms, 100);
        assert_eq!(config.dispatch.setup_script, "setup_code_gen_hosts.sh");
        assert_eq!(config.relay.max_retries, 3);
        assert!(config.cache.enabled);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_parse_toml() {
        let toml = r#"
            [dispatch]
            poll_interval_ms = 250

            [relay]
            max_retries = 7

            [cache]
            enabled = false
        "#;
        let config: CoordinatorConfig = toml.parse().unwrap();
        assert_eq!(config.dispatch.poll_interval_ms, 250);
        // Unset fields keep their defaults.
        assert_eq!(config.dispatch.reap_interval_ms, 100);
        assert_eq!(config.relay.max_retries, 7);
        assert!(!config.cache.enabled);
    }

    #[test]
    fn test_parse_invalid_toml() {
        let err = "[dispatch".parse::<CoordinatorConfig>().unwrap_err();
        assert!(matches!(err, CoordinatorError::Config { .. }));
    }

    #[test]
    fn test_validate_rejects_zero_intervals() {
        let mut config = CoordinatorConfig::default();
        config.dispatch.poll_interval_ms = 0;
        assert!(config.validate().is_err());

        let mut config = CoordinatorConfig::default();
        config.dispatch.reap_interval_ms = 0;
        assert!(config.validate().is_err());

        let mut config = CoordinatorConfig::default();
        config.dispatch.setup_script = String::new();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_env_overrides() {
        // Env mutation is process-global; keep every override in one
        // test to avoid cross-test interference.
        std::env::set_var("CGC_POLL_INTERVAL_MS", "50");
        std::env::set_var("CGC_RELAY_MAX_RETRIES", "1");
        std::env::set_var("CGC_CACHE_ENABLED", "false");

        let config = CoordinatorConfig::default().with_env_overrides();
        assert_eq!(config.dispatch.poll_interval_ms, 50);
        assert_eq!(config.relay.max_retries, 1);
        assert!(!config.cache.enabled);

        std::env::remove_var("CGC_POLL_INTERVAL_MS");
        std::env::remove_var("CGC_RELAY_MAX_RETRIES");
        std::env::remove_var("CGC_CACHE_ENABLED");
    }
}
