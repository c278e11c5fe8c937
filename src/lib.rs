//! opentsdb-relay - statsd flush snapshots to OpenTSDB's line protocol.
//!
//! The relay accepts periodic, pre-aggregated metric snapshots (counters,
//! timers, gauges, sets) from a statistics-aggregation process and delivers
//! them to OpenTSDB's `put` ingestion protocol over TCP.
//!
//! # Features
//!
//! - **Embedded tags**: `name=value` annotations encoded in dotted metric
//!   names are decoded and re-emitted as wire-protocol tags
//! - **Namespacing**: configurable per-kind path prefixes, with a
//!   legacy-compatible hardcoded layout for older consumers
//! - **Host failover**: a pool of candidate endpoints with dead-host
//!   backoff and cooldown-based retry
//! - **Fire-and-forget delivery**: one transient connection per flush,
//!   best-effort, isolated from the aggregation engine's loop
//!
//! # Architecture
//!
//! - `protocol`: tag codec, namespace builder and line serializer
//! - `relay`: host selector, delivery client and backend glue
//! - `core`: configuration, errors and the flush snapshot type
//! - `cli`: command-line interface and the stdin snapshot adapter
//!
//! # Example
//!
//! ```no_run
//! use opentsdb_relay::application::Application;
//! use opentsdb_relay::core::{ConfigBuilder, MetricSnapshot};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = ConfigBuilder::new().endpoint("tsdb.example.com", 4242).build()?;
//!     let (app, handle) = Application::new(config)?;
//!     tokio::spawn(app.run());
//!
//!     let snapshot = MetricSnapshot::default();
//!     handle.flush(1700000000, snapshot).await?;
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]

pub mod application;
pub mod cli;
pub mod core;
pub mod protocol;
pub mod relay;

// Re-export core types for convenience
pub use crate::core::{Config, Result};
