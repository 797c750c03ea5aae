//! `zonekeeper-observability` — process logging/tracing setup.

pub mod tracing;

pub use tracing::init;
