//! Shared data structures for the river telemetry pipeline
//!
//! - Telemetry: `Reading`, derived `MetricValue`/`MetricSnapshot`, sparklines
//! - Reports: `ReportConfig`, `ReportJob` lifecycle, `AnalysisResult`

mod reports;
mod telemetry;

pub use reports::*;
pub use telemetry::*;
