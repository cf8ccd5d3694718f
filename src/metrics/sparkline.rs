//! Sparkline series and the estimated water temperature.

use super::{derive_metric, MetricKind};
use crate::config::defaults;
use crate::types::{ChartData, Reading, SparklinePoint};
use chrono::{DateTime, Utc};
use rand::Rng;

fn trailing(readings: &[Reading], n: usize) -> &[Reading] {
    &readings[readings.len().saturating_sub(n)..]
}

/// The last `n` readings scaled into `metric`, chronological.
pub fn derive_sparkline(readings: &[Reading], metric: MetricKind, n: usize) -> ChartData {
    let tail = trailing(readings, n);
    let mut chart = ChartData {
        station1: Vec::with_capacity(tail.len()),
        station2: Vec::with_capacity(tail.len()),
    };
    for reading in tail {
        let value = derive_metric(metric, reading);
        chart.station1.push(SparklinePoint {
            value: value.station1,
            time: reading.timestamp,
        });
        chart.station2.push(SparklinePoint {
            value: value.station2,
            time: reading.timestamp,
        });
    }
    chart
}

/// Temperature estimate at `time`: slow oscillation around 12.5 °C plus noise.
pub fn temperature_at(time: DateTime<Utc>, rng: &mut impl Rng) -> f64 {
    let t = time.timestamp_millis() as f64;
    defaults::TEMPERATURE_BASELINE_C
        + (t / 1_000_000.0).sin() * defaults::TEMPERATURE_AMPLITUDE_C
        + rng.gen_range(-defaults::TEMPERATURE_NOISE_C..defaults::TEMPERATURE_NOISE_C)
}

/// One temperature point per trailing reading.
pub fn derive_temperature(
    readings: &[Reading],
    n: usize,
    rng: &mut impl Rng,
) -> Vec<SparklinePoint> {
    trailing(readings, n)
        .iter()
        .map(|r| SparklinePoint {
            value: temperature_at(r.timestamp, rng),
            time: r.timestamp,
        })
        .collect()
}

const BLOCKS: [char; 8] = ['▁', '▂', '▃', '▄', '▅', '▆', '▇', '█'];

/// Render values as a unicode block sparkline. A flat series renders at
/// mid height.
pub fn render_blocks(values: &[f64]) -> String {
    let (min, max) = values
        .iter()
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &v| {
            (lo.min(v), hi.max(v))
        });
    let span = max - min;
    values
        .iter()
        .map(|&v| {
            if span <= f64::EPSILON {
                BLOCKS[BLOCKS.len() / 2]
            } else {
                let idx = ((v - min) / span * (BLOCKS.len() - 1) as f64).round() as usize;
                BLOCKS[idx.min(BLOCKS.len() - 1)]
            }
        })
        .collect()
}
