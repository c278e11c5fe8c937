//! The OpenTSDB backend: flush handling, delivery state and status.
//!
//! Ties the serializer, host selector and delivery client together behind
//! the two operations the host process invokes: flush and status.

#![warn(missing_docs)]

pub mod client;
pub mod pool;

pub use client::DeliveryClient;
pub use pool::{Endpoint, HostSelector};

use crate::core::{Config, MetricSnapshot, Result};
use crate::protocol::LineSerializer;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::task::JoinHandle;

/// Delivery outcome timestamps, updated after every attempt.
///
/// Delivery tasks run on a multi-threaded runtime, so both fields are
/// atomics rather than plain state behind a single-threaded loop.
#[derive(Debug)]
pub struct DeliveryStats {
    last_flush: AtomicU64,
    last_exception: AtomicU64,
}

impl DeliveryStats {
    /// Initialize both timestamps to the startup time.
    pub fn new(startup_ts: u64) -> Self {
        DeliveryStats {
            last_flush: AtomicU64::new(startup_ts),
            last_exception: AtomicU64::new(startup_ts),
        }
    }

    /// Record a successful delivery.
    pub fn record_flush(&self, ts: u64) {
        self.last_flush.store(ts, Ordering::Relaxed);
    }

    /// Record a failed delivery attempt.
    pub fn record_exception(&self, ts: u64) {
        self.last_exception.store(ts, Ordering::Relaxed);
    }

    /// Unix seconds of the last successful delivery
    pub fn last_flush(&self) -> u64 {
        self.last_flush.load(Ordering::Relaxed)
    }

    /// Unix seconds of the last failed attempt
    pub fn last_exception(&self) -> u64 {
        self.last_exception.load(Ordering::Relaxed)
    }

    /// Both timestamps at once
    pub fn snapshot(&self) -> (u64, u64) {
        (self.last_flush(), self.last_exception())
    }
}

/// One entry reported through the status interface.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusEntry {
    /// Reporting backend name
    pub source: &'static str,
    /// Stat name
    pub name: &'static str,
    /// Stat value (unix seconds)
    pub value: u64,
}

/// The backend the host process drives with flush and status events.
#[derive(Debug)]
pub struct OpenTsdbBackend {
    serializer: Arc<LineSerializer>,
    client: DeliveryClient,
    stats: Arc<DeliveryStats>,
}

impl OpenTsdbBackend {
    /// Build the backend from validated configuration.
    ///
    /// Construction is side-effect-only: namespaces and codec are computed
    /// once here and reused for every flush.
    pub fn new(config: &Config, startup_ts: u64) -> Result<Self> {
        config.validate()?;

        let stats = Arc::new(DeliveryStats::new(startup_ts));
        let selector = Arc::new(HostSelector::new(
            config.resolved_endpoints(),
            config.endpoints.dead_host_retry,
        ));
        let serializer = Arc::new(LineSerializer::new(config));
        let client = DeliveryClient::new(
            Arc::clone(&selector),
            Arc::clone(&stats),
            Arc::clone(&serializer),
            config.delivery.connect_timeout,
        );

        tracing::info!(
            endpoints = selector.len(),
            legacy = config.namespace.legacy,
            "OpenTSDB backend initialized"
        );

        Ok(OpenTsdbBackend {
            serializer,
            client,
            stats,
        })
    }

    /// Handle one flush event: serialize the snapshot and hand the batch to
    /// the delivery client. Never blocks on the network and never fails the
    /// caller; delivery problems surface in `DeliveryStats` and the logs.
    ///
    /// Returns the delivery task handle for callers that want to await
    /// completion (tests); `None` when no endpoint was selectable.
    pub fn on_flush(&self, ts: u64, snapshot: &MetricSnapshot) -> Option<JoinHandle<()>> {
        let batch = self.serializer.serialize(ts, snapshot);
        tracing::debug!(ts, num_stats = batch.num_stats, "flush serialized");
        self.client.deliver(batch.data)
    }

    /// Invoke `f` once per delivery stat.
    pub fn each_status<F: FnMut(StatusEntry)>(&self, mut f: F) {
        f(StatusEntry {
            source: "opentsdb",
            name: "last_flush",
            value: self.stats.last_flush(),
        });
        f(StatusEntry {
            source: "opentsdb",
            name: "last_exception",
            value: self.stats.last_exception(),
        });
    }

    /// The status entries as a vector.
    pub fn status(&self) -> Vec<StatusEntry> {
        let mut entries = Vec::with_capacity(2);
        self.each_status(|e| entries.push(e));
        entries
    }

    /// Shared delivery stats, for supervisors that watch channel health.
    pub fn stats(&self) -> &Arc<DeliveryStats> {
        &self.stats
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{Config, ConfigBuilder};

    #[test]
    fn test_stats_initialized_to_startup() {
        let stats = DeliveryStats::new(1000);
        assert_eq!(stats.snapshot(), (1000, 1000));
    }

    #[test]
    fn test_stats_record_independently() {
        let stats = DeliveryStats::new(1000);
        stats.record_flush(1500);
        assert_eq!(stats.snapshot(), (1500, 1000));
        stats.record_exception(1600);
        assert_eq!(stats.snapshot(), (1500, 1600));
    }

    #[test]
    fn test_status_entries() {
        let config = ConfigBuilder::new().endpoint("localhost", 4242).build().unwrap();
        let backend = OpenTsdbBackend::new(&config, 1234).unwrap();

        let entries = backend.status();
        assert_eq!(entries.len(), 2);
        assert!(entries.iter().all(|e| e.source == "opentsdb"));
        assert!(entries.iter().any(|e| e.name == "last_flush" && e.value == 1234));
        assert!(entries.iter().any(|e| e.name == "last_exception" && e.value == 1234));
    }

    #[test]
    fn test_backend_rejects_invalid_config() {
        let config = Config::default();
        assert!(OpenTsdbBackend::new(&config, 0).is_err());
    }
}
