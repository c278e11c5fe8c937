//! Per-flush metric snapshot consumed from the aggregation host.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// One flush interval's worth of pre-aggregated metrics.
///
/// Keys are raw metric names that may carry embedded tag segments.
/// Every field defaults to empty so a partial document deserializes
/// cleanly; a kind with missing data simply contributes zero wire lines.
///
/// Ordered maps keep serialization deterministic for identical inputs.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct MetricSnapshot {
    /// Counter totals for the interval
    pub counters: BTreeMap<String, f64>,
    /// Point-in-time gauge values
    pub gauges: BTreeMap<String, f64>,
    /// Raw timer samples. Accepted but never serialized; only the
    /// pre-computed `timer_data` stats reach the wire.
    pub timers: BTreeMap<String, Vec<f64>>,
    /// Pre-computed percentile/summary statistics per timer
    pub timer_data: BTreeMap<String, BTreeMap<String, f64>>,
    /// Distinct-value sets
    pub sets: BTreeMap<String, BTreeSet<String>>,
    /// The aggregation engine's own internal counters
    pub statsd_metrics: BTreeMap<String, f64>,
}

impl MetricSnapshot {
    /// Total number of metrics in the snapshot, one per key per kind.
    /// Timer stats count once per timer, not per sub-statistic.
    pub fn metric_count(&self) -> usize {
        self.counters.len() + self.timer_data.len() + self.gauges.len() + self.sets.len()
    }

    /// True when no kind has any entries
    pub fn is_empty(&self) -> bool {
        self.metric_count() == 0 && self.statsd_metrics.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_document_deserializes() {
        let snapshot: MetricSnapshot =
            serde_json::from_str(r#"{"counters": {"app.requests": 5}}"#).unwrap();
        assert_eq!(snapshot.counters.get("app.requests"), Some(&5.0));
        assert!(snapshot.gauges.is_empty());
        assert!(snapshot.timer_data.is_empty());
        assert!(snapshot.sets.is_empty());
        assert_eq!(snapshot.metric_count(), 1);
    }

    #[test]
    fn test_metric_count_ignores_raw_timers() {
        let mut snapshot = MetricSnapshot::default();
        snapshot.timers.insert("db.query".to_string(), vec![1.0, 2.0]);
        assert_eq!(snapshot.metric_count(), 0);

        snapshot
            .timer_data
            .insert("db.query".to_string(), BTreeMap::new());
        assert_eq!(snapshot.metric_count(), 1);
    }

    #[test]
    fn test_empty_snapshot() {
        assert!(MetricSnapshot::default().is_empty());
    }
}
