//! Core domain types for the relay.
//!
//! Configuration, error taxonomy and the per-flush snapshot that the
//! aggregation host hands to the wire-translation engine.

#![warn(missing_docs)]

pub mod config;
pub mod error;
pub mod snapshot;

// Re-export commonly used types
pub use config::{Config, ConfigBuilder, HostPort};
pub use error::{RelayError, Result};
pub use snapshot::MetricSnapshot;

/// Current wall-clock time as unix seconds.
pub fn unix_now() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}
