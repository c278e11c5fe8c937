//! Dotted-prefix namespaces for each metric kind.
//!
//! Built once from configuration at startup and reused for every flush.

use crate::core::config::NamespaceConfig;

/// The five prefix paths the serializer joins metric names onto.
#[derive(Debug, Clone)]
pub struct Namespaces {
    /// Prefix shared by the relay's own meta metrics
    pub global: Vec<String>,
    /// Counter path prefix
    pub counter: Vec<String>,
    /// Timer path prefix
    pub timer: Vec<String>,
    /// Gauge path prefix
    pub gauge: Vec<String>,
    /// Set path prefix
    pub set: Vec<String>,
}

impl Namespaces {
    /// Compute the namespaces from configuration.
    ///
    /// Legacy mode hardcodes the wire layout older consumers expect and
    /// ignores the configured prefixes. Structured mode starts each
    /// namespace empty and appends the global prefix to all five, then each
    /// kind's own prefix to its own; an empty prefix is an explicit opt-out
    /// of that segment.
    pub fn from_config(config: &NamespaceConfig) -> Self {
        if config.legacy {
            return Namespaces {
                global: vec!["stats".to_string()],
                counter: vec!["stats".to_string()],
                timer: vec!["stats".to_string(), "timers".to_string()],
                gauge: vec!["stats".to_string(), "gauges".to_string()],
                set: vec!["stats".to_string(), "sets".to_string()],
            };
        }

        let mut global = Vec::new();
        let mut counter = Vec::new();
        let mut timer = Vec::new();
        let mut gauge = Vec::new();
        let mut set = Vec::new();

        if !config.global_prefix.is_empty() {
            global.push(config.global_prefix.clone());
            counter.push(config.global_prefix.clone());
            timer.push(config.global_prefix.clone());
            gauge.push(config.global_prefix.clone());
            set.push(config.global_prefix.clone());
        }
        if !config.prefix_counter.is_empty() {
            counter.push(config.prefix_counter.clone());
        }
        if !config.prefix_timer.is_empty() {
            timer.push(config.prefix_timer.clone());
        }
        if !config.prefix_gauge.is_empty() {
            gauge.push(config.prefix_gauge.clone());
        }
        if !config.prefix_set.is_empty() {
            set.push(config.prefix_set.clone());
        }

        Namespaces {
            global,
            counter,
            timer,
            gauge,
            set,
        }
    }

    /// Join a namespace and a bare metric name into a dotted path.
    pub fn path(namespace: &[String], bare_name: &str) -> String {
        let mut segments: Vec<&str> = namespace.iter().map(String::as_str).collect();
        if !bare_name.is_empty() {
            segments.push(bare_name);
        }
        segments.join(".")
    }
}
