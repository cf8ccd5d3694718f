//! Dashboard Configuration Module
//!
//! TOML configuration for the telemetry feed, the report pipeline and the
//! HTTP server.
//!
//! ## Loading Order
//!
//! 1. `RIVERWATCH_CONFIG` environment variable (path to TOML file)
//! 2. `riverwatch.toml` in the current working directory
//! 3. Built-in defaults
//!
//! The loaded config is passed by value into `Dashboard::new`; there is no
//! process-wide instance.

mod dashboard_config;
pub mod defaults;
pub mod validation;

pub use dashboard_config::*;
