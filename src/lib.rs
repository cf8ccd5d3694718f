//! Riverwatch: river telemetry and report generation
//!
//! Backend for the Río Claro monitoring dashboard.
//!
//! ## Architecture
//!
//! - **Telemetry**: rolling 24 h dual-station buffer refreshed every tick,
//!   with time-window projections
//! - **Metrics**: flow, level, discharge and velocity derived from raw
//!   readings, plus sparkline series
//! - **Reports**: asynchronous multi-stage job pipeline producing document,
//!   spreadsheet and tabular artifacts
//! - **API**: JSON endpoints over the [`Dashboard`] facade

pub mod api;
pub mod config;
pub mod dashboard;
pub mod metrics;
pub mod reports;
pub mod telemetry;
pub mod types;

// Re-export the composition root and its configuration
pub use config::DashboardConfig;
pub use dashboard::Dashboard;

// Re-export commonly used types
pub use metrics::MetricKind;
pub use reports::{ReportEngine, ReportError};
pub use telemetry::{TelemetryFeed, TimeWindow};
pub use types::{
    JobStatus, LoadState, MetricSnapshot, Reading, ReportConfig, ReportFormat, ReportJob,
};
