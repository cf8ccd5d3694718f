//! System-wide default constants.
//!
//! Grouped by subsystem. Every value here can be overridden from
//! `riverwatch.toml` except where noted.

// ============================================================================
// Telemetry
// ============================================================================

/// Rolling horizon kept in the buffer (minutes). 1440 = 24 hours.
pub const HORIZON_MINUTES: u32 = 1_440;

/// Live tick cadence (milliseconds).
pub const TICK_INTERVAL_MS: u64 = 3_000;

/// Simulated latency of the initial history load (milliseconds).
pub const INITIAL_LOAD_DELAY_MS: u64 = 1_000;

/// Trailing readings used for sparklines and the temperature series.
pub const SPARKLINE_POINTS: usize = 20;

// ============================================================================
// Synthetic source
// ============================================================================

/// Baseline raw value at station 1.
pub const STATION1_BASELINE: f64 = 100.0;

/// Baseline raw value at station 2.
pub const STATION2_BASELINE: f64 = 105.0;

/// Amplitude of the slow oscillation on both stations.
pub const OSCILLATION_AMPLITUDE: f64 = 15.0;

/// Half-width of the uniform noise added to every raw reading.
pub const READING_NOISE: f64 = 5.0;

/// Water temperature baseline (°C).
pub const TEMPERATURE_BASELINE_C: f64 = 12.5;

/// Water temperature oscillation amplitude (°C).
pub const TEMPERATURE_AMPLITUDE_C: f64 = 2.0;

/// Half-width of the temperature noise (°C).
pub const TEMPERATURE_NOISE_C: f64 = 0.25;

// ============================================================================
// Reports
// ============================================================================

pub const DATA_COLLECTION_MS: u64 = 1_000;
pub const ANALYSIS_PROCESSING_MS: u64 = 1_500;
pub const AI_SYNTHESIS_MS: u64 = 2_000;
pub const ARTIFACT_ASSEMBLY_MS: u64 = 1_000;

/// Hard deadline for a single report job (seconds).
pub const JOB_TIMEOUT_SECS: u64 = 120;

/// Longest accepted report period (days).
pub const MAX_RANGE_DAYS: i64 = 366;

/// Upper bound accepted for `reports.max_range_days` (about a century).
pub const MAX_RANGE_DAYS_LIMIT: i64 = 36_600;

/// Capacity of the job event broadcast channel. Not configurable.
pub const JOB_EVENT_CHANNEL_CAPACITY: usize = 256;

/// Probability that a selected variable raises an analysis alert.
pub const ALERT_PROBABILITY: f64 = 0.3;

/// Lower bound of trend confidence.
pub const MIN_TREND_CONFIDENCE: f64 = 0.7;

// ============================================================================
// Server
// ============================================================================

pub const SERVER_ADDR: &str = "0.0.0.0:8080";

/// Monitoring site shown in report headers.
pub const LOCATION_NAME: &str = "Río Claro - Pucón";
