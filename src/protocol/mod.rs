//! Metric-name-to-wire-protocol translation.
//!
//! The pieces that turn a flush snapshot into OpenTSDB `put` lines:
//! extracting embedded tags, building namespaced paths and serializing
//! every metric kind.

#![warn(missing_docs)]

pub mod line;
pub mod namespace;
pub mod tags;

pub use line::{LineSerializer, WireBatch};
pub use namespace::Namespaces;
pub use tags::TagCodec;
