//! Codec for tag annotations embedded in dotted metric names.
//!
//! A statsd client that wants OpenTSDB tags encodes them into the metric
//! name itself, e.g. `app.requests._t_region._tv_us-east`. The codec pulls
//! those segments back out as `name=value` pairs and recovers the bare
//! metric name.

use crate::core::config::TagConfig;

/// Splits embedded tag segments out of metric names.
#[derive(Debug, Clone)]
pub struct TagCodec {
    /// Full tag-segment delimiter, `.` + configured prefix
    segment_delim: String,
    /// Full tag-value delimiter, `.` + configured value prefix
    value_delim: String,
}

impl TagCodec {
    /// Build a codec from the configured delimiter roots.
    pub fn new(config: &TagConfig) -> Self {
        TagCodec {
            segment_delim: format!(".{}", config.prefix),
            value_delim: format!(".{}", config.value_prefix),
        }
    }

    /// Extract `"name=value"` tag strings from a metric name, in
    /// encounter order.
    ///
    /// Each tag segment is split on the value delimiter; when that fails,
    /// the original `tagname.tagvalue` form is tried. A segment that
    /// matches neither is skipped. Malformed tags are never fatal.
    pub fn decode(&self, metric_name: &str) -> Vec<String> {
        let mut segments = metric_name.split(self.segment_delim.as_str());
        // First segment is the bare metric name.
        segments.next();

        let mut tags = Vec::new();
        for raw in segments {
            let parts: Vec<&str> = raw.split(self.value_delim.as_str()).collect();
            let (name, value) = if parts.len() >= 2 {
                (parts[0], parts[1])
            } else {
                // Original format: tagname.tagvalue, accepted only as an
                // exact two-way split.
                let dotted: Vec<&str> = raw.split('.').collect();
                if dotted.len() != 2 {
                    tracing::debug!(segment = raw, metric = metric_name, "skipping malformed tag");
                    continue;
                }
                (dotted[0], dotted[1])
            };
            tags.push(format!("{}={}", name, value));
        }
        tags
    }

    /// The bare metric name with every tag segment removed.
    /// Names without a tag delimiter pass through unchanged.
    pub fn strip<'a>(&self, metric_name: &'a str) -> &'a str {
        metric_name
            .split(self.segment_delim.as_str())
            .next()
            .unwrap_or("")
    }
}
