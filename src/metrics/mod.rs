//! Metric derivation table.
//!
//! Every displayed metric is a fixed per-station scaling of the raw
//! dual-station reading. Nothing is rounded here; formatting belongs to the
//! presentation layer.

mod sparkline;

pub use sparkline::{derive_sparkline, derive_temperature, render_blocks, temperature_at};

use crate::types::{MetricSnapshot, MetricValue, Reading};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Per-station scale factor.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Scale {
    Multiply(f64),
    Divide(f64),
}

impl Scale {
    pub fn apply(self, raw: f64) -> f64 {
        match self {
            Scale::Multiply(k) => raw * k,
            Scale::Divide(k) => raw / k,
        }
    }
}

/// The four metrics derived from raw readings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MetricKind {
    Flow,
    Level,
    Discharge,
    Velocity,
}

impl MetricKind {
    pub const ALL: [MetricKind; 4] = [
        MetricKind::Flow,
        MetricKind::Level,
        MetricKind::Discharge,
        MetricKind::Velocity,
    ];

    pub fn id(self) -> &'static str {
        match self {
            MetricKind::Flow => "flow",
            MetricKind::Level => "level",
            MetricKind::Discharge => "discharge",
            MetricKind::Velocity => "velocity",
        }
    }

    pub fn unit(self) -> &'static str {
        match self {
            MetricKind::Flow => "m³/s",
            MetricKind::Level => "m",
            MetricKind::Discharge => "L/s",
            MetricKind::Velocity => "m/s",
        }
    }

    pub fn display_name(self) -> &'static str {
        match self {
            MetricKind::Flow => "Flujo",
            MetricKind::Level => "Nivel",
            MetricKind::Discharge => "Caudal",
            MetricKind::Velocity => "Velocidad",
        }
    }

    pub fn description(self) -> &'static str {
        match self {
            MetricKind::Flow => "Volumen de agua que pasa por la sección del río",
            MetricKind::Level => "Altura de la superficie del agua",
            MetricKind::Discharge => "Caudal instantáneo medido en la estación",
            MetricKind::Velocity => "Velocidad media de la corriente",
        }
    }

    /// `(station1, station2)` factors.
    pub fn scales(self) -> (Scale, Scale) {
        match self {
            MetricKind::Flow => (Scale::Multiply(1.2), Scale::Multiply(1.1)),
            MetricKind::Level => (Scale::Divide(50.0), Scale::Divide(48.0)),
            MetricKind::Discharge => (Scale::Multiply(15.0), Scale::Multiply(14.0)),
            MetricKind::Velocity => (Scale::Divide(60.0), Scale::Divide(58.0)),
        }
    }
}

impl std::fmt::Display for MetricKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.id())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown metric '{0}'")]
pub struct ParseMetricError(pub String);

impl FromStr for MetricKind {
    type Err = ParseMetricError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "flow" | "flujo" => Ok(MetricKind::Flow),
            "level" | "nivel" => Ok(MetricKind::Level),
            "discharge" | "caudal" => Ok(MetricKind::Discharge),
            "velocity" | "velocidad" => Ok(MetricKind::Velocity),
            _ => Err(ParseMetricError(s.to_string())),
        }
    }
}

/// Scale one reading into `metric`.
pub fn derive_metric(metric: MetricKind, reading: &Reading) -> MetricValue {
    let (s1, s2) = metric.scales();
    MetricValue {
        station1: s1.apply(reading.station1),
        station2: s2.apply(reading.station2),
    }
}

/// All four metrics from the same reading.
pub fn derive_all_metrics(reading: &Reading) -> MetricSnapshot {
    MetricSnapshot {
        flow: derive_metric(MetricKind::Flow, reading),
        level: derive_metric(MetricKind::Level, reading),
        discharge: derive_metric(MetricKind::Discharge, reading),
        velocity: derive_metric(MetricKind::Velocity, reading),
    }
}
