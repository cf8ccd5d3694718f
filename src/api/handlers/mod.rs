//! API route handlers
//!
//! - Telemetry buffer, windows, derived metrics and temperature
//! - Report job submission, tracking and download

mod reports;
mod telemetry;

pub use reports::*;
pub use telemetry::*;

use std::sync::Arc;
use std::time::Instant;

use crate::dashboard::Dashboard;

// ============================================================================
// API State
// ============================================================================

/// Shared state for API handlers
#[derive(Clone)]
pub struct ApiState {
    pub dashboard: Arc<Dashboard>,
    /// Process start, for uptime reporting
    pub started_at: Instant,
}

impl ApiState {
    pub fn new(dashboard: Arc<Dashboard>) -> Self {
        Self {
            dashboard,
            started_at: Instant::now(),
        }
    }
}
