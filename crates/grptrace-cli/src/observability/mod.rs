//! Observability infrastructure for grptrace.
//!
//! Structured logging only. Logs go to stderr so stdout carries nothing but
//! the trace output.

mod logging;

pub use logging::{create_json_layer, init_logging, parse_log_level, LoggingConfig};
