//! Observability infrastructure.
//!
//! Structured logging setup. Metric counters are emitted by the domain
//! crate through the `metrics` facade; installing an exporter is left to
//! the embedding application.

mod logging;

pub use logging::{init_logging, json_subscriber, LogFormat, LoggingConfig};
