//! Take-a-number server.
//!
//! Wires the `PostgreSQL` ticket store, the lifecycle service and the HTTP
//! router together, and runs the periodic cleanup next to the server.
//!
//! - [`config`]: environment configuration
//! - [`telemetry`]: tracing subscriber and Prometheus recorder
//! - [`cleanup`]: periodic age-based purge
//! - [`app`]: startup, serving and graceful shutdown

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod app;
pub mod cleanup;
pub mod config;
pub mod telemetry;

pub use app::Application;
pub use config::Config;
