//! grptrace-cli: Command-line front end for the membership trace resolver
//!
//! This crate wires the resolver to a configured directory backend:
//! - Configuration loading (YAML file + environment)
//! - Structured logging setup
//! - Text and JSON rendering of traces, member listings and subject lookups
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────┐
//! │                grptrace-cli                  │
//! ├─────────────────────────────────────────────┤
//! │  config.rs      - AppConfig loading         │
//! │  backend.rs     - Directory selection       │
//! │  observability/ - Logging to stderr         │
//! │  render.rs      - Text tree / JSON output   │
//! │  main.rs        - `grptrace` binary         │
//! └─────────────────────────────────────────────┘
//! ```

pub mod backend;
pub mod config;
pub mod observability;
pub mod render;

pub use backend::{build_directory, build_tracer, Directory};
pub use config::{AppConfig, ConfigLoadError};
pub use render::{render_json, MemberReport, SubjectReport, TextReport};
