//! Telemetry reading and derived metric types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One synchronized sample pair from the two river stations.
///
/// `Reading::default()` is the all-zero sentinel (Unix epoch, 0.0 / 0.0)
/// returned when no data is available yet.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Reading {
    pub timestamp: DateTime<Utc>,
    /// Raw value at Estación 1
    pub station1: f64,
    /// Raw value at Estación 2
    pub station2: f64,
}

impl Reading {
    pub fn new(timestamp: DateTime<Utc>, station1: f64, station2: f64) -> Self {
        Self {
            timestamp,
            station1,
            station2,
        }
    }
}

/// A metric's scaled value at both stations.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct MetricValue {
    pub station1: f64,
    pub station2: f64,
}

/// All four metrics derived from the same reading.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct MetricSnapshot {
    pub flow: MetricValue,
    pub level: MetricValue,
    pub discharge: MetricValue,
    pub velocity: MetricValue,
}

/// A single point of a sparkline series.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SparklinePoint {
    pub value: f64,
    pub time: DateTime<Utc>,
}

/// Per-station sparkline series for one metric.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ChartData {
    pub station1: Vec<SparklinePoint>,
    pub station2: Vec<SparklinePoint>,
}

/// Load state of the telemetry buffer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum LoadState {
    /// Historical seed data has not arrived yet
    Loading,
    /// Buffer holds a full horizon and accepts ticks
    Ready,
    /// Initial load failed; the buffer stays empty and ticks are skipped
    Failed { reason: String },
}

impl LoadState {
    pub fn is_ready(&self) -> bool {
        matches!(self, LoadState::Ready)
    }
}

impl std::fmt::Display for LoadState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LoadState::Loading => write!(f, "loading"),
            LoadState::Ready => write!(f, "ready"),
            LoadState::Failed { reason } => write!(f, "failed: {}", reason),
        }
    }
}
