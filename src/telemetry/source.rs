//! Reading source abstraction for the telemetry buffer.
//!
//! Two implementations: the synthetic random walk used by the live
//! dashboard, and a deterministic ramp for tests and offline runs.

use super::TelemetryError;
use crate::config::defaults;
use crate::types::Reading;
use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Where readings come from.
///
/// The feed holds the source behind an async mutex, so implementations
/// never see two calls at once.
#[async_trait]
pub trait ReadingSource: Send + 'static {
    /// Produce one reading per minute for the `horizon_minutes` minutes up to
    /// and including `now`, oldest first (`horizon_minutes + 1` readings).
    async fn load_history(
        &mut self,
        now: DateTime<Utc>,
        horizon_minutes: u32,
    ) -> Result<Vec<Reading>, TelemetryError>;

    /// Produce the live reading for `now`.
    async fn next_reading(&mut self, now: DateTime<Utc>) -> Result<Reading, TelemetryError>;

    /// Human-readable name for logging.
    fn source_name(&self) -> &str;
}

// ============================================================================
// Synthetic Source
// ============================================================================

/// Slow sinusoidal oscillation around a per-station baseline plus uniform
/// noise.
pub struct SyntheticSource {
    rng: StdRng,
}

impl SyntheticSource {
    pub fn new() -> Self {
        Self {
            rng: StdRng::from_entropy(),
        }
    }

    /// Reproducible sequence for a given seed.
    pub fn seeded(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }

    pub fn from_seed(seed: Option<u64>) -> Self {
        seed.map_or_else(Self::new, Self::seeded)
    }

    fn noise(&mut self) -> f64 {
        self.rng
            .gen_range(-defaults::READING_NOISE..defaults::READING_NOISE)
    }

    /// Point `i` minutes before the load time.
    fn historical_point(&mut self, timestamp: DateTime<Utc>, i: u32) -> Reading {
        let i = f64::from(i);
        let s1 = defaults::STATION1_BASELINE
            + (i / 100.0).sin() * defaults::OSCILLATION_AMPLITUDE
            + self.noise();
        let s2 = defaults::STATION2_BASELINE
            + (i / 80.0).cos() * defaults::OSCILLATION_AMPLITUDE
            + self.noise();
        Reading::new(timestamp, s1, s2)
    }
}

impl Default for SyntheticSource {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ReadingSource for SyntheticSource {
    async fn load_history(
        &mut self,
        now: DateTime<Utc>,
        horizon_minutes: u32,
    ) -> Result<Vec<Reading>, TelemetryError> {
        Ok((0..=horizon_minutes)
            .rev()
            .map(|i| self.historical_point(now - Duration::minutes(i64::from(i)), i))
            .collect())
    }

    async fn next_reading(&mut self, now: DateTime<Utc>) -> Result<Reading, TelemetryError> {
        let t = now.timestamp_millis() as f64;
        let s1 = defaults::STATION1_BASELINE
            + (t / 100_000.0).sin() * defaults::OSCILLATION_AMPLITUDE
            + self.noise();
        let s2 = defaults::STATION2_BASELINE
            + (t / 80_000.0).cos() * defaults::OSCILLATION_AMPLITUDE
            + self.noise();
        Ok(Reading::new(now, s1, s2))
    }

    fn source_name(&self) -> &str {
        "synthetic"
    }
}

// ============================================================================
// Scripted Source
// ============================================================================

/// Deterministic linear ramp: the k-th reading produced (history first, then
/// live) has `station1 = 100 + k` and `station2 = 105 + k`.
pub struct ScriptedSource {
    produced: u64,
    history_failure: Option<String>,
    tick_failure: Option<String>,
}

impl ScriptedSource {
    pub fn new() -> Self {
        Self {
            produced: 0,
            history_failure: None,
            tick_failure: None,
        }
    }

    /// Make `load_history` fail with `reason`.
    pub fn failing_history(reason: impl Into<String>) -> Self {
        Self {
            history_failure: Some(reason.into()),
            ..Self::new()
        }
    }

    /// Make every `next_reading` fail with `reason`.
    pub fn failing_ticks(reason: impl Into<String>) -> Self {
        Self {
            tick_failure: Some(reason.into()),
            ..Self::new()
        }
    }

    fn ramp(&mut self, timestamp: DateTime<Utc>) -> Reading {
        let k = self.produced as f64;
        self.produced += 1;
        Reading::new(
            timestamp,
            defaults::STATION1_BASELINE + k,
            defaults::STATION2_BASELINE + k,
        )
    }
}

impl Default for ScriptedSource {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ReadingSource for ScriptedSource {
    async fn load_history(
        &mut self,
        now: DateTime<Utc>,
        horizon_minutes: u32,
    ) -> Result<Vec<Reading>, TelemetryError> {
        if let Some(reason) = &self.history_failure {
            return Err(TelemetryError::HistoryLoad(reason.clone()));
        }
        Ok((0..=horizon_minutes)
            .rev()
            .map(|i| self.ramp(now - Duration::minutes(i64::from(i))))
            .collect())
    }

    async fn next_reading(&mut self, now: DateTime<Utc>) -> Result<Reading, TelemetryError> {
        if let Some(reason) = &self.tick_failure {
            return Err(TelemetryError::Source(reason.clone()));
        }
        Ok(self.ramp(now))
    }

    fn source_name(&self) -> &str {
        "scripted"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 1, 8, 0, 0).unwrap()
    }

    #[tokio::test]
    async fn test_synthetic_history_covers_horizon() {
        let mut source = SyntheticSource::seeded(1);
        let history = source.load_history(now(), 1440).await.unwrap();
        assert_eq!(history.len(), 1441);
        assert_eq!(history[0].timestamp, now() - Duration::minutes(1440));
        assert_eq!(history[1440].timestamp, now());
        assert!(history.windows(2).all(|w| w[0].timestamp < w[1].timestamp));
    }

    #[tokio::test]
    async fn test_synthetic_values_stay_in_envelope() {
        let mut source = SyntheticSource::seeded(7);
        let history = source.load_history(now(), 1440).await.unwrap();
        for r in &history {
            assert!((80.0..=120.0).contains(&r.station1), "s1 = {}", r.station1);
            assert!((85.0..=125.0).contains(&r.station2), "s2 = {}", r.station2);
        }
        let live = source.next_reading(now()).await.unwrap();
        assert!((80.0..=120.0).contains(&live.station1));
        assert_eq!(live.timestamp, now());
    }

    #[tokio::test]
    async fn test_synthetic_seed_is_reproducible() {
        let a = SyntheticSource::seeded(42).load_history(now(), 10).await.unwrap();
        let b = SyntheticSource::seeded(42).load_history(now(), 10).await.unwrap();
        assert_eq!(a, b);
    }

    #[tokio::test]
    async fn test_scripted_ramp_continues_into_live_readings() {
        let mut source = ScriptedSource::new();
        let history = source.load_history(now(), 2).await.unwrap();
        assert_eq!(
            history.iter().map(|r| r.station1).collect::<Vec<_>>(),
            vec![100.0, 101.0, 102.0]
        );
        let live = source.next_reading(now() + Duration::seconds(3)).await.unwrap();
        assert_eq!(live.station1, 103.0);
        assert_eq!(live.station2, 108.0);
    }

    #[tokio::test]
    async fn test_scripted_failures() {
        let mut source = ScriptedSource::failing_history("sensor offline");
        let err = source.load_history(now(), 5).await.unwrap_err();
        assert!(matches!(err, TelemetryError::HistoryLoad(ref r) if r == "sensor offline"));

        let mut source = ScriptedSource::failing_ticks("link down");
        assert!(matches!(
            source.next_reading(now()).await,
            Err(TelemetryError::Source(_))
        ));
    }
}
