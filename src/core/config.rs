//! Configuration management for the relay.
//!
//! This module provides configuration handling with:
//! - YAML file support
//! - Environment variable overrides
//! - CLI argument overrides
//! - Validation and defaults

use crate::core::{RelayError, Result};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Complete configuration for the relay
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// OpenTSDB endpoint configuration
    pub endpoints: EndpointsConfig,
    /// Embedded-tag delimiter configuration
    pub tags: TagConfig,
    /// Metric namespace configuration
    pub namespace: NamespaceConfig,
    /// Wire-format configuration
    pub wire: WireConfig,
    /// Delivery behavior configuration
    pub delivery: DeliveryConfig,
    /// Debug mode
    #[serde(skip)]
    pub debug: bool,
}

/// Endpoint pool configuration.
///
/// Either `host`/`port` (single-endpoint mode) or `hosts` (failover pool)
/// is set; configuring both is rejected by validation.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EndpointsConfig {
    /// Hostname for single-endpoint mode
    pub host: Option<String>,
    /// Port for single-endpoint mode
    pub port: Option<u16>,
    /// Endpoint list for multi-endpoint failover mode
    pub hosts: Vec<HostPort>,
    /// Cooldown before a dead endpoint is retried
    #[serde(with = "humantime_serde")]
    pub dead_host_retry: Duration,
}

/// One `host:port` pair in the failover pool
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HostPort {
    /// Hostname or IP address
    pub host: String,
    /// TCP port
    pub port: u16,
}

/// Delimiters for tags embedded in dotted metric names
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TagConfig {
    /// Tag-segment delimiter root (joined to the name as `.<prefix>`)
    pub prefix: String,
    /// Tag-value delimiter root (splits a segment as `.<value_prefix>`)
    pub value_prefix: String,
}

/// Dotted-prefix namespace configuration per metric kind
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NamespaceConfig {
    /// Segment prepended to every metric path (empty string omits it)
    pub global_prefix: String,
    /// Counter namespace segment
    pub prefix_counter: String,
    /// Timer namespace segment
    pub prefix_timer: String,
    /// Gauge namespace segment
    pub prefix_gauge: String,
    /// Set namespace segment
    pub prefix_set: String,
    /// Use the backward-compatible hardcoded namespace layout
    pub legacy: bool,
}

/// Wire-format knobs
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WireConfig {
    /// Line terminator appended to every wire line
    pub post_suffix: String,
    /// Extra path segment appended to counter and set paths when non-empty
    pub counter_suffix: String,
}

/// Delivery behavior
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DeliveryConfig {
    /// Bound on connect plus write for one delivery attempt
    #[serde(with = "humantime_serde")]
    pub connect_timeout: Duration,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            endpoints: EndpointsConfig::default(),
            tags: TagConfig::default(),
            namespace: NamespaceConfig::default(),
            wire: WireConfig::default(),
            delivery: DeliveryConfig::default(),
            debug: false,
        }
    }
}

impl Default for EndpointsConfig {
    fn default() -> Self {
        EndpointsConfig {
            host: None,
            port: None,
            hosts: Vec::new(),
            dead_host_retry: Duration::from_secs(15),
        }
    }
}

impl Default for TagConfig {
    fn default() -> Self {
        TagConfig {
            prefix: "_t_".to_string(),
            value_prefix: "_tv_".to_string(),
        }
    }
}

impl Default for NamespaceConfig {
    fn default() -> Self {
        NamespaceConfig {
            global_prefix: "stats".to_string(),
            prefix_counter: "counters".to_string(),
            prefix_timer: "timers".to_string(),
            prefix_gauge: "gauges".to_string(),
            prefix_set: "sets".to_string(),
            legacy: true,
        }
    }
}

impl Default for WireConfig {
    fn default() -> Self {
        WireConfig {
            post_suffix: "\n".to_string(),
            counter_suffix: String::new(),
        }
    }
}

impl Default for DeliveryConfig {
    fn default() -> Self {
        DeliveryConfig {
            connect_timeout: Duration::from_secs(10),
        }
    }
}

impl Config {
    /// Create new config with defaults
    pub fn new() -> Result<Self> {
        let config = Config::default();
        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        let single = self.endpoints.host.is_some() || self.endpoints.port.is_some();

        if single && !self.endpoints.hosts.is_empty() {
            return Err(RelayError::config(
                "endpoints.host/port and endpoints.hosts are mutually exclusive",
            ));
        }

        if single {
            if self.endpoints.host.is_none() {
                return Err(RelayError::config("endpoints.port set without endpoints.host"));
            }
            if self.endpoints.port.is_none() {
                return Err(RelayError::config("endpoints.host set without endpoints.port"));
            }
        } else if self.endpoints.hosts.is_empty() {
            return Err(RelayError::config("no OpenTSDB endpoints configured"));
        }

        for hp in self.resolved_endpoints() {
            if hp.host.is_empty() {
                return Err(RelayError::config("endpoint with empty host"));
            }
            if hp.port == 0 {
                return Err(RelayError::config(format!("endpoint {} with port 0", hp.host)));
            }
        }

        if self.tags.prefix.is_empty() || self.tags.value_prefix.is_empty() {
            return Err(RelayError::config("tag delimiters must be non-empty"));
        }

        if self.endpoints.dead_host_retry.as_secs() == 0 {
            return Err(RelayError::config("dead_host_retry must be at least one second"));
        }

        Ok(())
    }

    /// The endpoint pool, regardless of which mode configured it.
    /// Single-endpoint mode yields a pool of one.
    pub fn resolved_endpoints(&self) -> Vec<HostPort> {
        match (&self.endpoints.host, self.endpoints.port) {
            (Some(host), Some(port)) => vec![HostPort {
                host: host.clone(),
                port,
            }],
            _ => self.endpoints.hosts.clone(),
        }
    }

    /// True when the config is in single-endpoint mode
    pub fn is_single_endpoint(&self) -> bool {
        self.endpoints.host.is_some()
    }
}

/// Configuration builder for programmatic construction
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    /// Create a new builder with defaults
    pub fn new() -> Self {
        ConfigBuilder {
            config: Config::default(),
        }
    }

    /// Load configuration from YAML string
    pub fn from_yaml(mut self, yaml: &str) -> Result<Self> {
        self.config = serde_yaml::from_str(yaml)
            .map_err(|e| RelayError::config(format!("Failed to parse YAML config: {}", e)))?;
        Ok(self)
    }

    /// Set a single endpoint
    pub fn endpoint<S: Into<String>>(mut self, host: S, port: u16) -> Self {
        self.config.endpoints.host = Some(host.into());
        self.config.endpoints.port = Some(port);
        self.config.endpoints.hosts.clear();
        self
    }

    /// Set the failover endpoint pool
    pub fn endpoints(mut self, hosts: Vec<HostPort>) -> Self {
        self.config.endpoints.hosts = hosts;
        self.config.endpoints.host = None;
        self.config.endpoints.port = None;
        self
    }

    /// Set the dead-host retry cooldown
    pub fn dead_host_retry(mut self, cooldown: Duration) -> Self {
        self.config.endpoints.dead_host_retry = cooldown;
        self
    }

    /// Select legacy or structured namespace mode
    pub fn legacy_namespace(mut self, legacy: bool) -> Self {
        self.config.namespace.legacy = legacy;
        self
    }

    /// Set the global namespace prefix
    pub fn global_prefix<S: Into<String>>(mut self, prefix: S) -> Self {
        self.config.namespace.global_prefix = prefix.into();
        self
    }

    /// Set the counter/set path suffix segment
    pub fn counter_suffix<S: Into<String>>(mut self, suffix: S) -> Self {
        self.config.wire.counter_suffix = suffix.into();
        self
    }

    /// Set the connect timeout for delivery attempts
    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.config.delivery.connect_timeout = timeout;
        self
    }

    /// Set debug mode
    pub fn debug(mut self, debug: bool) -> Self {
        self.config.debug = debug;
        self
    }

    /// Build and validate the configuration
    pub fn build(self) -> Result<Config> {
        self.config.validate()?;
        Ok(self.config)
    }
}

impl Default for ConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}
