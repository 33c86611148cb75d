//! Configuration management for the ArcDB coordinator.
//!
//! Supports YAML configuration files, environment variable overrides,
//! reasonable defaults, and validation.

use config::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Root configuration structure for the coordinator.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
pub struct CoordinatorConfig {
    #[serde(default)]
    pub rebalancer: RebalancerConfig,

    #[serde(default)]
    pub health: HealthConfig,

    #[serde(default)]
    pub shard: ShardCallConfig,

    #[serde(default)]
    pub server: ServerConfig,
}

impl CoordinatorConfig {
    /// Load configuration from multiple sources with precedence:
    /// 1. Environment variables (highest priority)
    /// 2. Config file specified by ARCDB_CONFIG env var
    /// 3. ./config/arcdb.yaml
    /// 4. /etc/arcdb/arcdb.yaml
    /// 5. Hardcoded defaults (lowest priority)
    pub fn load() -> Result<Self, ConfigError> {
        let mut builder = Config::builder();

        builder = Self::set_defaults(builder)?;

        if let Ok(config_path) = std::env::var("ARCDB_CONFIG") {
            builder = builder.add_source(File::with_name(&config_path).required(false));
        }

        builder = builder
            .add_source(File::with_name("./config/arcdb").required(false))
            .add_source(File::with_name("/etc/arcdb/arcdb").required(false));

        // Example: ARCDB_REBALANCER__BATCH_SIZE=1000
        builder = builder.add_source(
            Environment::with_prefix("ARCDB")
                .separator("__")
                .try_parsing(true),
        );

        let config: CoordinatorConfig = builder.build()?.try_deserialize()?;
        config.validate()?;

        Ok(config)
    }

    fn set_defaults(
        builder: config::ConfigBuilder<config::builder::DefaultState>,
    ) -> Result<config::ConfigBuilder<config::builder::DefaultState>, ConfigError> {
        builder
            .set_default("rebalancer.batch_size", 500)?
            .set_default("health.interval_secs", 5)?
            .set_default("health.ttl_secs", 30)?
            .set_default("health.probe_timeout_secs", 2)?
            .set_default("shard.call_timeout_secs", 5)?
            .set_default("shard.batch_timeout_secs", 30)?
            .set_default("server.listen_addr", "0.0.0.0:7450")
    }

    /// Validate configuration values.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.rebalancer.batch_size == 0 {
            return Err(ConfigError::Message(
                "rebalancer.batch_size must be > 0".to_string(),
            ));
        }

        if self.health.interval_secs == 0 {
            return Err(ConfigError::Message(
                "health.interval_secs must be > 0".to_string(),
            ));
        }

        // A TTL shorter than the probe interval would mark every shard
        // unavailable between ticks.
        if self.health.ttl_secs < self.health.interval_secs {
            return Err(ConfigError::Message(
                "health.ttl_secs must be >= health.interval_secs".to_string(),
            ));
        }

        if self.shard.call_timeout_secs == 0 || self.shard.batch_timeout_secs == 0 {
            return Err(ConfigError::Message(
                "shard timeouts must be > 0".to_string(),
            ));
        }

        Ok(())
    }
}

/// Rebalancer tuning.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RebalancerConfig {
    /// Number of vectors scanned and moved per batch.
    pub batch_size: usize,
}

impl Default for RebalancerConfig {
    fn default() -> Self {
        Self { batch_size: 500 }
    }
}

/// Health monitor tuning.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct HealthConfig {
    /// Seconds between probe rounds.
    pub interval_secs: u64,

    /// Seconds a probe result stays fresh; older records count as
    /// unavailable.
    pub ttl_secs: u64,

    /// Per-probe HTTP timeout in seconds.
    pub probe_timeout_secs: u64,
}

impl Default for HealthConfig {
    fn default() -> Self {
        Self {
            interval_secs: 5,
            ttl_secs: 30,
            probe_timeout_secs: 2,
        }
    }
}

impl HealthConfig {
    /// Probe interval as a `Duration`.
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }

    /// Freshness TTL as a `Duration`.
    pub fn ttl(&self) -> Duration {
        Duration::from_secs(self.ttl_secs)
    }

    /// Probe timeout as a `Duration`.
    pub fn probe_timeout(&self) -> Duration {
        Duration::from_secs(self.probe_timeout_secs)
    }
}

/// Timeouts for coordinator → shard calls.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ShardCallConfig {
    /// Per-shard read/write timeout in seconds.
    pub call_timeout_secs: u64,

    /// Per-shard batch operation timeout in seconds.
    pub batch_timeout_secs: u64,
}

impl Default for ShardCallConfig {
    fn default() -> Self {
        Self {
            call_timeout_secs: 5,
            batch_timeout_secs: 30,
        }
    }
}

impl ShardCallConfig {
    /// Read/write timeout as a `Duration`.
    pub fn call_timeout(&self) -> Duration {
        Duration::from_secs(self.call_timeout_secs)
    }

    /// Batch operation timeout as a `Duration`.
    pub fn batch_timeout(&self) -> Duration {
        Duration::from_secs(self.batch_timeout_secs)
    }
}

/// Coordinator HTTP server settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    /// Listen address for the coordinator API.
    pub listen_addr: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen_addr: "0.0.0.0:7450".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_configuration() {
        let config = CoordinatorConfig::default();

        assert_eq!(config.rebalancer.batch_size, 500);
        assert_eq!(config.health.interval_secs, 5);
        assert_eq!(config.health.ttl_secs, 30);
        assert_eq!(config.health.probe_timeout_secs, 2);
        assert_eq!(config.shard.call_timeout_secs, 5);
        assert_eq!(config.shard.batch_timeout_secs, 30);
        assert_eq!(config.server.listen_addr, "0.0.0.0:7450");
    }

    #[test]
    fn test_duration_helpers() {
        let config = CoordinatorConfig::default();
        assert_eq!(config.health.interval(), Duration::from_secs(5));
        assert_eq!(config.health.ttl(), Duration::from_secs(30));
        assert_eq!(config.shard.batch_timeout(), Duration::from_secs(30));
    }

    #[test]
    fn test_validation_errors() {
        let mut config = CoordinatorConfig::default();

        config.rebalancer.batch_size = 0;
        assert!(config.validate().is_err());

        config.rebalancer.batch_size = 500;
        assert!(config.validate().is_ok());

        config.health.ttl_secs = 1;
        assert!(config.validate().is_err());
    }
}
