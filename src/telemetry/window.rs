//! Trailing time-window projections over the buffer.

use crate::types::Reading;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Selectable trailing windows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TimeWindow {
    #[serde(rename = "30m")]
    ThirtyMinutes,
    #[serde(rename = "1h")]
    OneHour,
    #[serde(rename = "6h")]
    SixHours,
    #[serde(rename = "24h")]
    TwentyFourHours,
}

impl TimeWindow {
    pub const ALL: [TimeWindow; 4] = [
        TimeWindow::ThirtyMinutes,
        TimeWindow::OneHour,
        TimeWindow::SixHours,
        TimeWindow::TwentyFourHours,
    ];

    pub fn minutes(self) -> i64 {
        match self {
            TimeWindow::ThirtyMinutes => 30,
            TimeWindow::OneHour => 60,
            TimeWindow::SixHours => 360,
            TimeWindow::TwentyFourHours => 1_440,
        }
    }

    pub fn duration(self) -> Duration {
        Duration::minutes(self.minutes())
    }

    pub fn tag(self) -> &'static str {
        match self {
            TimeWindow::ThirtyMinutes => "30m",
            TimeWindow::OneHour => "1h",
            TimeWindow::SixHours => "6h",
            TimeWindow::TwentyFourHours => "24h",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            TimeWindow::ThirtyMinutes => "30 minutos",
            TimeWindow::OneHour => "1 hora",
            TimeWindow::SixHours => "6 horas",
            TimeWindow::TwentyFourHours => "24 horas",
        }
    }
}

impl std::fmt::Display for TimeWindow {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.tag())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown time window '{0}' (expected 30m, 1h, 6h or 24h)")]
pub struct ParseWindowError(pub String);

impl FromStr for TimeWindow {
    type Err = ParseWindowError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        TimeWindow::ALL
            .into_iter()
            .find(|w| w.tag().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| ParseWindowError(s.to_string()))
    }
}

/// Readings with `timestamp > now - window`, in buffer order.
///
/// `readings` must be ascending, which the buffer guarantees, so the window
/// is always a suffix.
pub fn project(readings: &[Reading], window: TimeWindow, now: DateTime<Utc>) -> Vec<Reading> {
    let cutoff = now - window.duration();
    let start = readings.partition_point(|r| r.timestamp <= cutoff);
    readings[start..].to_vec()
}

/// Newest reading, or the zero sentinel when there is none.
pub fn latest(readings: &[Reading]) -> Reading {
    readings.last().copied().unwrap_or_default()
}
