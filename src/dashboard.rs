//! Composition root: one telemetry feed plus one report engine.
//!
//! `Dashboard` is what the HTTP layer and the binary talk to. Instances are
//! fully independent, so tests can run several side by side.

use crate::config::DashboardConfig;
use crate::metrics::{self, MetricKind};
use crate::reports::{ReportDownload, ReportEngine, ReportError};
use crate::telemetry::{
    Clock, ReadingSource, SyntheticSource, SystemClock, TelemetryFeed, TelemetryStatus,
    TickerHandle, TimeWindow,
};
use crate::types::{
    default_report_variables, ChartData, JobEvent, LoadState, MetricSnapshot, Reading,
    ReportConfig, ReportJob, ReportVariable, SparklinePoint,
};
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::sync::{Arc, Mutex};
use tokio::sync::broadcast;
use tokio_util::sync::CancellationToken;
use tracing::info;

pub struct Dashboard {
    feed: Arc<TelemetryFeed>,
    reports: ReportEngine,
    config: DashboardConfig,
    cancel: CancellationToken,
    ticker: Mutex<Option<TickerHandle>>,
    temperature_rng: Mutex<StdRng>,
}

impl Dashboard {
    /// Synthetic source on the system clock.
    pub fn new(config: DashboardConfig) -> Self {
        let source = SyntheticSource::from_seed(config.telemetry.seed);
        Self::with_parts(config, Box::new(source), Arc::new(SystemClock))
    }

    pub fn with_parts(
        config: DashboardConfig,
        source: Box<dyn ReadingSource>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let cancel = CancellationToken::new();
        let feed = Arc::new(TelemetryFeed::new(
            config.telemetry.clone(),
            source,
            Arc::clone(&clock),
        ));

        let mut engine = ReportEngine::builder(config.reports.clone())
            .site_name(config.site.name.clone())
            .clock(clock)
            .cancel_token(cancel.child_token());
        if let Some(seed) = config.telemetry.seed {
            engine = engine.seed(seed);
        }

        let temperature_rng = match config.telemetry.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };

        Self {
            feed,
            reports: engine.build(),
            config,
            cancel,
            ticker: Mutex::new(None),
            temperature_rng: Mutex::new(temperature_rng),
        }
    }

    /// Load history in the background and start the ticker.
    ///
    /// Ticks that fire before the history arrives are skipped. Calling
    /// `start` twice is a no-op.
    pub fn start(&self) {
        let mut ticker = self.ticker.lock().unwrap_or_else(|e| e.into_inner());
        if ticker.is_some() {
            return;
        }

        let feed = Arc::clone(&self.feed);
        let cancel = self.cancel.clone();
        tokio::spawn(async move {
            tokio::select! {
                _ = cancel.cancelled() => {}
                // Failure is recorded in the load state and logged by the feed
                _ = feed.initialize() => {}
            }
        });

        *ticker = Some(self.feed.start(self.cancel.clone()));
        info!(
            site = %self.config.site.name,
            horizon_minutes = self.config.telemetry.horizon_minutes,
            "Dashboard started"
        );
    }

    /// Stop the ticker (no tick fires afterwards) and cancel running jobs.
    pub async fn shutdown(&self) {
        let handle = self
            .ticker
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .take();
        if let Some(handle) = handle {
            handle.stop().await;
        }
        self.reports.shutdown();
        self.cancel.cancel();
        info!("Dashboard stopped");
    }

    // ========================================================================
    // Telemetry
    // ========================================================================

    pub async fn buffer(&self) -> Vec<Reading> {
        self.feed.snapshot().await
    }

    pub async fn load_state(&self) -> LoadState {
        self.feed.load_state().await
    }

    pub async fn is_loading(&self) -> bool {
        self.load_state().await == LoadState::Loading
    }

    pub async fn telemetry_status(&self) -> TelemetryStatus {
        self.feed.status().await
    }

    pub async fn project(&self, window: TimeWindow) -> Vec<Reading> {
        self.feed.project(window).await
    }

    pub async fn latest(&self) -> Reading {
        self.feed.latest().await
    }

    pub async fn derive_all_metrics(&self) -> MetricSnapshot {
        metrics::derive_all_metrics(&self.latest().await)
    }

    pub async fn derive_sparkline(&self, metric: MetricKind) -> ChartData {
        let readings = self.buffer().await;
        metrics::derive_sparkline(&readings, metric, self.config.telemetry.sparkline_points)
    }

    pub async fn derive_temperature(&self) -> Vec<SparklinePoint> {
        let readings = self.buffer().await;
        let mut rng = self
            .temperature_rng
            .lock()
            .unwrap_or_else(|e| e.into_inner());
        metrics::derive_temperature(&readings, self.config.telemetry.sparkline_points, &mut *rng)
    }

    // ========================================================================
    // Reports
    // ========================================================================

    pub fn report_variables(&self) -> Vec<ReportVariable> {
        default_report_variables()
    }

    pub async fn submit_report(&self, config: ReportConfig) -> Result<String, ReportError> {
        self.reports.submit(config).await
    }

    pub async fn list_jobs(&self) -> Vec<ReportJob> {
        self.reports.list_jobs().await
    }

    pub async fn get_job(&self, id: &str) -> Option<ReportJob> {
        self.reports.get_job(id).await
    }

    pub async fn download_report(&self, id: &str) -> Option<ReportDownload> {
        self.reports.download_report(id).await
    }

    pub async fn delete_report(&self, id: &str) -> bool {
        self.reports.delete_report(id).await
    }

    pub async fn clear_completed(&self) -> usize {
        self.reports.clear_completed().await
    }

    pub async fn cancel_report(&self, id: &str) -> Result<ReportJob, ReportError> {
        self.reports.cancel(id).await
    }

    pub async fn is_generating(&self) -> bool {
        self.reports.is_generating().await
    }

    pub async fn wait_for_report(&self, id: &str) -> Option<ReportJob> {
        self.reports.wait_for(id).await
    }

    pub fn subscribe_jobs(&self) -> broadcast::Receiver<JobEvent> {
        self.reports.subscribe()
    }

    pub fn reports(&self) -> &ReportEngine {
        &self.reports
    }

    pub fn feed(&self) -> &Arc<TelemetryFeed> {
        &self.feed
    }

    pub fn config(&self) -> &DashboardConfig {
        &self.config
    }
}
