//! Telemetry feed: the single writer of the rolling buffer.
//!
//! The feed loads the initial horizon once, then appends one live reading per
//! tick. Readers take cheap snapshots through the read lock; append and
//! eviction happen under one write guard, so a snapshot is always a
//! consistent prefix-ordered sequence.

use super::{Clock, ReadingSource, TelemetryBuffer, TelemetryError, TimeWindow};
use crate::config::TelemetryConfig;
use crate::types::{LoadState, Reading};
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

struct FeedState {
    buffer: TelemetryBuffer,
    load_state: LoadState,
    ticks_applied: u64,
}

/// Status summary exposed to the API.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TelemetryStatus {
    pub load_state: LoadState,
    pub len: usize,
    pub capacity: usize,
    pub ticks_applied: u64,
    pub source: String,
}

pub struct TelemetryFeed {
    state: RwLock<FeedState>,
    source: Mutex<Box<dyn ReadingSource>>,
    source_name: String,
    clock: Arc<dyn Clock>,
    config: TelemetryConfig,
}

impl TelemetryFeed {
    pub fn new(
        config: TelemetryConfig,
        source: Box<dyn ReadingSource>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            state: RwLock::new(FeedState {
                buffer: TelemetryBuffer::new(config.capacity()),
                load_state: LoadState::Loading,
                ticks_applied: 0,
            }),
            source_name: source.source_name().to_string(),
            source: Mutex::new(source),
            clock,
            config,
        }
    }

    /// Wait the configured load delay, then fill the buffer with a full
    /// horizon of history.
    ///
    /// On failure the buffer stays empty and the state becomes `Failed`;
    /// there is no retry.
    pub async fn initialize(&self) -> Result<(), TelemetryError> {
        tokio::time::sleep(self.config.initial_load_delay()).await;

        let mut source = self.source.lock().await;
        let now = self.clock.now();
        let loaded = source
            .load_history(now, self.config.horizon_minutes)
            .await
            .and_then(|history| {
                let mut buffer = TelemetryBuffer::new(self.config.capacity());
                buffer.replace(history)?;
                Ok(buffer)
            });

        let mut state = self.state.write().await;
        match loaded {
            Ok(buffer) => {
                info!(
                    source = %self.source_name,
                    readings = buffer.len(),
                    capacity = buffer.capacity(),
                    "Telemetry history loaded"
                );
                state.buffer = buffer;
                state.load_state = LoadState::Ready;
                Ok(())
            }
            Err(e) => {
                warn!(source = %self.source_name, error = %e, "Telemetry history load failed");
                state.buffer.clear();
                state.load_state = LoadState::Failed {
                    reason: e.to_string(),
                };
                Err(e)
            }
        }
    }

    /// Append one live reading.
    ///
    /// Returns `None` without touching the buffer unless the feed is
    /// `Ready`. Ticks are serialized on the source lock, so a slow tick
    /// delays the next one instead of racing it.
    pub async fn tick(&self) -> Option<Reading> {
        if !self.state.read().await.load_state.is_ready() {
            debug!("Tick skipped: telemetry not ready");
            return None;
        }

        let mut source = self.source.lock().await;
        let now = self.clock.now();
        let reading = match source.next_reading(now).await {
            Ok(r) => r,
            Err(e) => {
                warn!(source = %self.source_name, error = %e, "Tick skipped: source error");
                return None;
            }
        };

        let mut state = self.state.write().await;
        match state.buffer.push(reading) {
            Ok(_) => {
                state.ticks_applied += 1;
                Some(reading)
            }
            Err(e) => {
                warn!(error = %e, "Tick rejected");
                None
            }
        }
    }

    /// Spawn the cadence loop. The first tick fires one period after start;
    /// missed ticks are skipped, not queued.
    pub fn start(self: &Arc<Self>, cancel: CancellationToken) -> TickerHandle {
        let token = cancel.child_token();
        let loop_token = token.clone();
        let feed = Arc::clone(self);
        let period = self.config.tick_interval();

        let task = tokio::spawn(async move {
            let mut interval = tokio::time::interval_at(Instant::now() + period, period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
            info!(interval_ms = period.as_millis() as u64, "Telemetry ticker started");

            loop {
                tokio::select! {
                    biased;
                    _ = loop_token.cancelled() => {
                        info!("Telemetry ticker stopped");
                        break;
                    }
                    _ = interval.tick() => {
                        feed.tick().await;
                    }
                }
            }
        });

        TickerHandle {
            cancel: token,
            task: Some(task),
        }
    }

    pub async fn snapshot(&self) -> Vec<Reading> {
        self.state.read().await.buffer.snapshot()
    }

    pub async fn load_state(&self) -> LoadState {
        self.state.read().await.load_state.clone()
    }

    pub async fn latest(&self) -> Reading {
        self.state
            .read()
            .await
            .buffer
            .latest()
            .unwrap_or_default()
    }

    /// Readings inside `window`, measured back from the clock's now.
    pub async fn project(&self, window: TimeWindow) -> Vec<Reading> {
        let now = self.clock.now();
        let state = self.state.read().await;
        let readings = state.buffer.snapshot();
        super::project(&readings, window, now)
    }

    pub async fn status(&self) -> TelemetryStatus {
        let state = self.state.read().await;
        TelemetryStatus {
            load_state: state.load_state.clone(),
            len: state.buffer.len(),
            capacity: state.buffer.capacity(),
            ticks_applied: state.ticks_applied,
            source: self.source_name.clone(),
        }
    }

    pub fn config(&self) -> &TelemetryConfig {
        &self.config
    }

    pub fn clock(&self) -> &Arc<dyn Clock> {
        &self.clock
    }
}

/// Exclusive owner of the ticker task.
///
/// Dropping the handle cancels the loop; `stop` also waits for it to exit.
pub struct TickerHandle {
    cancel: CancellationToken,
    task: Option<JoinHandle<()>>,
}

impl TickerHandle {
    /// Cancel the loop and wait until it has exited. No tick fires afterwards.
    pub async fn stop(mut self) {
        self.cancel.cancel();
        if let Some(task) = self.task.take() {
            if let Err(e) = task.await {
                warn!(error = %e, "Telemetry ticker task ended abnormally");
            }
        }
    }

    pub fn is_running(&self) -> bool {
        self.task.as_ref().is_some_and(|t| !t.is_finished())
    }
}

impl Drop for TickerHandle {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}
