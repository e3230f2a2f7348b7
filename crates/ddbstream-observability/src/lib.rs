//! # ddbstream-observability
//!
//! Logging setup for binaries that embed `ddbstream-core`.
//!
//! The core only emits `tracing` events; it never installs a subscriber.
//! Call [`init_tracing`] once at startup to get text or JSON logs with
//! per-component level overrides.

pub mod tracing_setup;

pub use tracing_setup::{init_tracing, LogConfig, LogTarget};
