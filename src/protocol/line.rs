//! Serialization of a flush snapshot into OpenTSDB `put` lines.
//!
//! One line per counter, gauge, timer sub-statistic and set, followed by the
//! relay's own meta lines. The serializer is pure; delivery is the client's
//! problem.

use crate::core::config::Config;
use crate::core::MetricSnapshot;
use crate::protocol::namespace::Namespaces;
use crate::protocol::tags::TagCodec;
use std::time::Instant;

/// A serialized flush, ready for delivery.
#[derive(Debug, Clone)]
pub struct WireBatch {
    /// The concatenated `put` lines
    pub data: String,
    /// Number of metrics serialized: one per counter, timer, gauge and set
    /// key. Counts metrics, not lines.
    pub num_stats: usize,
}

/// Converts snapshots to wire batches using the configured namespaces,
/// tag delimiters and line suffix.
#[derive(Debug, Clone)]
pub struct LineSerializer {
    codec: TagCodec,
    namespaces: Namespaces,
    legacy: bool,
    /// Every line ends with a space and then the configured terminator
    line_suffix: String,
    counter_suffix: String,
}

impl LineSerializer {
    /// Build a serializer from the full relay configuration.
    pub fn new(config: &Config) -> Self {
        LineSerializer {
            codec: TagCodec::new(&config.tags),
            namespaces: Namespaces::from_config(&config.namespace),
            legacy: config.namespace.legacy,
            line_suffix: format!(" {}", config.wire.post_suffix),
            counter_suffix: config.wire.counter_suffix.clone(),
        }
    }

    /// Serialize one flush snapshot at the given unix-second timestamp.
    pub fn serialize(&self, ts: u64, snapshot: &MetricSnapshot) -> WireBatch {
        let start = Instant::now();
        let mut out = String::new();
        let mut num_stats = 0usize;

        for (key, value) in &snapshot.counters {
            let tags = self.codec.decode(key);
            let bare = self.codec.strip(key);

            let path = if self.legacy {
                // Legacy consumers expect counters under a fixed prefix.
                format!("stats_counts.{}", bare)
            } else {
                self.suffixed_path(&self.namespaces.counter, bare)
            };
            self.push_metric_line(&mut out, &path, ts, *value, &tags);
            num_stats += 1;
        }

        for (key, stats) in &snapshot.timer_data {
            let tags = self.codec.decode(key);
            let bare = self.codec.strip(key);
            let path = Namespaces::path(&self.namespaces.timer, bare);

            for (stat_name, value) in stats {
                let stat_path = format!("{}.{}", path, stat_name);
                self.push_metric_line(&mut out, &stat_path, ts, *value, &tags);
            }
            // A timer with no stats emits nothing but still counts.
            num_stats += 1;
        }

        for (key, value) in &snapshot.gauges {
            let tags = self.codec.decode(key);
            let bare = self.codec.strip(key);
            let path = Namespaces::path(&self.namespaces.gauge, bare);
            self.push_metric_line(&mut out, &path, ts, *value, &tags);
            num_stats += 1;
        }

        for (key, members) in &snapshot.sets {
            let tags = self.codec.decode(key);
            let bare = self.codec.strip(key);
            let path = if self.legacy {
                Namespaces::path(&self.namespaces.set, bare)
            } else {
                self.suffixed_path(&self.namespaces.set, bare)
            };
            self.push_metric_line(
                &mut out,
                &format!("{}.count", path),
                ts,
                members.len() as f64,
                &tags,
            );
            num_stats += 1;
        }

        self.push_meta_lines(&mut out, ts, num_stats, snapshot, start);

        tracing::debug!(num_stats, bytes = out.len(), "serialized flush batch");
        WireBatch {
            data: out,
            num_stats,
        }
    }

    /// The two in-band channel-health lines appended before each send,
    /// reporting the previous delivery outcome timestamps.
    pub fn health_trailer(&self, now: u64, last_flush: u64, last_exception: u64) -> String {
        let meta = self.meta_namespace();
        let mut out = String::new();
        self.push_meta_line(
            &mut out,
            &format!("{}.opentsdbStats.last_exception", meta),
            now,
            last_exception as f64,
        );
        self.push_meta_line(
            &mut out,
            &format!("{}.opentsdbStats.last_flush", meta),
            now,
            last_flush as f64,
        );
        out
    }

    /// Namespace path for counters or sets with the configured extra
    /// segment appended. Structured mode only; legacy paths are hardcoded.
    fn suffixed_path(&self, namespace: &[String], bare: &str) -> String {
        let path = Namespaces::path(namespace, bare);
        if self.counter_suffix.is_empty() {
            path
        } else {
            format!("{}.{}", path, self.counter_suffix)
        }
    }

    fn meta_namespace(&self) -> String {
        Namespaces::path(&self.namespaces.global, "statsd")
    }

    fn push_metric_line(&self, out: &mut String, path: &str, ts: u64, value: f64, tags: &[String]) {
        out.push_str(&format!(
            "put {} {} {} {}{}",
            path,
            ts,
            value,
            tags.join(" "),
            self.line_suffix
        ));
    }

    fn push_meta_line(&self, out: &mut String, path: &str, ts: u64, value: f64) {
        out.push_str(&format!("put {} {} {}{}", path, ts, value, self.line_suffix));
    }

    fn push_meta_lines(
        &self,
        out: &mut String,
        ts: u64,
        num_stats: usize,
        snapshot: &MetricSnapshot,
        start: Instant,
    ) {
        let elapsed_ms = start.elapsed().as_millis() as f64;
        if self.legacy {
            self.push_meta_line(out, "statsd.numStats", ts, num_stats as f64);
            self.push_meta_line(out, "stats.statsd.opentsdbStats.calculationtime", ts, elapsed_ms);
            for (key, value) in &snapshot.statsd_metrics {
                self.push_meta_line(out, &format!("stats.statsd.{}", key), ts, *value);
            }
        } else {
            let meta = self.meta_namespace();
            self.push_meta_line(out, &format!("{}.numStats", meta), ts, num_stats as f64);
            self.push_meta_line(
                out,
                &format!("{}.opentsdbStats.calculationtime", meta),
                ts,
                elapsed_ms,
            );
            for (key, value) in &snapshot.statsd_metrics {
                self.push_meta_line(out, &format!("{}.{}", meta, key), ts, *value);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::ConfigBuilder;
    use pretty_assertions::assert_eq;
    use std::collections::BTreeMap;

    fn serializer(legacy: bool) -> LineSerializer {
        let config = ConfigBuilder::new()
            .endpoint("localhost", 4242)
            .legacy_namespace(legacy)
            .build()
            .unwrap();
        LineSerializer::new(&config)
    }

    fn snapshot_with_counter(name: &str, value: f64) -> MetricSnapshot {
        let mut snapshot = MetricSnapshot::default();
        snapshot.counters.insert(name.to_string(), value);
        snapshot
    }

    fn lines(batch: &WireBatch) -> Vec<&str> {
        batch.data.lines().collect()
    }

    #[test]
    fn test_legacy_counter_line() {
        let batch = serializer(true).serialize(1000, &snapshot_with_counter("app.requests", 5.0));
        assert!(
            batch.data.starts_with("put stats_counts.app.requests 1000 5"),
            "unexpected batch: {}",
            batch.data
        );
        assert_eq!(batch.num_stats, 1);
    }

    #[test]
    fn test_structured_counter_line() {
        let batch = serializer(false).serialize(1000, &snapshot_with_counter("app.requests", 5.0));
        assert!(batch.data.starts_with("put stats.counters.app.requests 1000 5"));
    }

    #[test]
    fn test_counter_suffix_honored() {
        let config = ConfigBuilder::new()
            .endpoint("localhost", 4242)
            .legacy_namespace(false)
            .counter_suffix("count")
            .build()
            .unwrap();
        let batch = LineSerializer::new(&config)
            .serialize(1000, &snapshot_with_counter("app.requests", 5.0));
        assert!(batch.data.starts_with("put stats.counters.app.requests.count 1000 5"));
    }

    #[test]
    fn test_tags_reach_the_wire() {
        let batch = serializer(true).serialize(
            1000,
            &snapshot_with_counter("app.requests._t_region._tv_us-east", 5.0),
        );
        assert!(lines(&batch)[0].starts_with("put stats_counts.app.requests 1000 5 region=us-east"));
    }

    #[test]
    fn test_timer_stats_lines() {
        let mut snapshot = MetricSnapshot::default();
        let mut stats = BTreeMap::new();
        stats.insert("mean_90".to_string(), 12.5);
        stats.insert("upper_90".to_string(), 30.0);
        snapshot.timer_data.insert("db.query".to_string(), stats);

        let batch = serializer(true).serialize(1000, &snapshot);
        let lines = lines(&batch);
        assert!(lines.iter().any(|l| l.starts_with("put stats.timers.db.query.mean_90 1000 12.5")));
        assert!(lines.iter().any(|l| l.starts_with("put stats.timers.db.query.upper_90 1000 30")));
        // One metric despite two lines.
        assert_eq!(batch.num_stats, 1);
    }

    #[test]
    fn test_timer_with_empty_stats() {
        let mut snapshot = MetricSnapshot::default();
        snapshot
            .timer_data
            .insert("db.query".to_string(), BTreeMap::new());

        let batch = serializer(true).serialize(1000, &snapshot);
        assert!(!batch.data.contains("db.query"));
        assert_eq!(batch.num_stats, 1);
    }

    #[test]
    fn test_gauge_line() {
        let mut snapshot = MetricSnapshot::default();
        snapshot.gauges.insert("heap.used".to_string(), 42.25);
        let batch = serializer(true).serialize(1000, &snapshot);
        assert!(batch.data.starts_with("put stats.gauges.heap.used 1000 42.25"));
    }

    #[test]
    fn test_set_cardinality() {
        let mut snapshot = MetricSnapshot::default();
        let members = ["1", "2", "2", "3"].iter().map(|s| s.to_string()).collect();
        snapshot.sets.insert("users.unique".to_string(), members);

        let batch = serializer(true).serialize(1000, &snapshot);
        assert!(batch.data.starts_with("put stats.sets.users.unique.count 1000 3"));
        assert_eq!(batch.num_stats, 1);
    }

    #[test]
    fn test_num_stats_counts_metrics() {
        let mut snapshot = MetricSnapshot::default();
        snapshot.counters.insert("c1".to_string(), 1.0);
        snapshot.counters.insert("c2".to_string(), 2.0);
        snapshot.gauges.insert("g1".to_string(), 3.0);
        snapshot
            .timer_data
            .insert("t1".to_string(), BTreeMap::from([("mean".to_string(), 4.0)]));
        snapshot.sets.insert("s1".to_string(), ["a".to_string()].into());
        // Raw timer samples never count.
        snapshot.timers.insert("t1".to_string(), vec![1.0, 2.0]);

        let batch = serializer(true).serialize(1000, &snapshot);
        assert_eq!(batch.num_stats, 5);
        assert!(batch.data.contains("put statsd.numStats 1000 5"));
    }

    #[test]
    fn test_raw_timers_not_serialized() {
        let mut snapshot = MetricSnapshot::default();
        snapshot.timers.insert("db.query".to_string(), vec![1.0, 2.0, 3.0]);
        let batch = serializer(true).serialize(1000, &snapshot);
        assert!(!batch.data.contains("db.query"));
        assert_eq!(batch.num_stats, 0);
    }

    #[test]
    fn test_meta_lines_legacy() {
        let mut snapshot = MetricSnapshot::default();
        snapshot.statsd_metrics.insert("processing_time".to_string(), 7.0);
        let batch = serializer(true).serialize(1000, &snapshot);
        assert!(batch.data.contains("put statsd.numStats 1000 0"));
        assert!(batch.data.contains("put stats.statsd.opentsdbStats.calculationtime 1000"));
        assert!(batch.data.contains("put stats.statsd.processing_time 1000 7"));
    }

    #[test]
    fn test_meta_lines_structured() {
        let mut snapshot = MetricSnapshot::default();
        snapshot.statsd_metrics.insert("processing_time".to_string(), 7.0);
        let batch = serializer(false).serialize(1000, &snapshot);
        assert!(batch.data.contains("put stats.statsd.numStats 1000 0"));
        assert!(batch.data.contains("put stats.statsd.opentsdbStats.calculationtime 1000"));
        assert!(batch.data.contains("put stats.statsd.processing_time 1000 7"));
    }

    #[test]
    fn test_health_trailer() {
        let trailer = serializer(true).health_trailer(2000, 1500, 1200);
        let lines: Vec<&str> = trailer.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].starts_with("put stats.statsd.opentsdbStats.last_exception 2000 1200"));
        assert!(lines[1].starts_with("put stats.statsd.opentsdbStats.last_flush 2000 1500"));
    }

    #[test]
    fn test_every_line_terminated() {
        let mut snapshot = snapshot_with_counter("a", 1.0);
        snapshot.gauges.insert("g".to_string(), 2.0);
        let batch = serializer(true).serialize(1000, &snapshot);
        assert!(batch.data.ends_with('\n'));
        for line in batch.data.split_terminator('\n') {
            assert!(line.starts_with("put "), "bad line: {:?}", line);
        }
    }

    #[test]
    fn test_deterministic_output() {
        let mut snapshot = MetricSnapshot::default();
        snapshot.counters.insert("b".to_string(), 2.0);
        snapshot.counters.insert("a".to_string(), 1.0);
        let s = serializer(true);
        // calculationtime can differ between runs; compare the rest.
        let strip_calc = |batch: WireBatch| {
            batch
                .data
                .lines()
                .filter(|l| !l.contains("calculationtime"))
                .collect::<Vec<_>>()
                .join("\n")
        };
        assert_eq!(
            strip_calc(s.serialize(1000, &snapshot)),
            strip_calc(s.serialize(1000, &snapshot))
        );
    }
}
