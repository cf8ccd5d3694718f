//! Telemetry pipeline: rolling dual-station buffer, its refresh loop and
//! time-window projections.
//!
//! Data flow:
//! ```text
//! ReadingSource ──► TelemetryFeed (single writer) ──► TelemetryBuffer
//!                         ▲                                 │
//!                    TickerHandle                     window::project
//! ```

pub mod buffer;
pub mod clock;
pub mod feed;
pub mod source;
pub mod window;

pub use buffer::TelemetryBuffer;
pub use clock::{Clock, ManualClock, SystemClock, TokioClock};
pub use feed::{TelemetryFeed, TelemetryStatus, TickerHandle};
pub use source::{ReadingSource, ScriptedSource, SyntheticSource};
pub use window::{latest, project, TimeWindow};

use chrono::{DateTime, Utc};

/// Errors raised by the telemetry pipeline.
#[derive(Debug, thiserror::Error)]
pub enum TelemetryError {
    /// The initial history could not be produced
    #[error("history load failed: {0}")]
    HistoryLoad(String),

    /// An append would break the ascending timestamp order
    #[error("out-of-order reading at {rejected} (newest buffered {newest})")]
    OutOfOrder {
        newest: DateTime<Utc>,
        rejected: DateTime<Utc>,
    },

    /// A live reading could not be produced
    #[error("reading source error: {0}")]
    Source(String),
}
