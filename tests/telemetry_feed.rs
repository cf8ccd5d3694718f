//! Telemetry Feed Integration Tests
//!
//! Runs the feed and its ticker on paused tokio time with a clock derived
//! from the tokio instant, so a full 24 h buffer plus live ticks can be
//! exercised without waiting.

use chrono::{DateTime, TimeZone, Utc};
use riverwatch::config::{DashboardConfig, TelemetryConfig};
use riverwatch::telemetry::{ScriptedSource, SyntheticSource, TelemetryFeed, TimeWindow, TokioClock};
use riverwatch::types::LoadState;
use riverwatch::Dashboard;
use std::sync::Arc;
use std::time::Duration;

fn anchor() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap()
}

fn feed(config: TelemetryConfig) -> Arc<TelemetryFeed> {
    Arc::new(TelemetryFeed::new(
        config,
        Box::new(SyntheticSource::seeded(11)),
        Arc::new(TokioClock::starting_at(anchor())),
    ))
}

fn spawn_initialize(feed: &Arc<TelemetryFeed>) {
    let feed = Arc::clone(feed);
    tokio::spawn(async move {
        let _ = feed.initialize().await;
    });
}

#[tokio::test(start_paused = true)]
async fn buffer_stays_at_capacity_while_ticking() {
    let feed = feed(TelemetryConfig::default());
    spawn_initialize(&feed);
    let ticker = feed.start(tokio_util::sync::CancellationToken::new());

    // 1 s load delay, then ten 3 s ticks
    tokio::time::sleep(Duration::from_millis(1_000 + 10 * 3_000 + 500)).await;

    let status = feed.status().await;
    assert_eq!(status.load_state, LoadState::Ready);
    assert_eq!(status.capacity, 1_441);
    assert_eq!(status.len, 1_441);
    assert_eq!(status.ticks_applied, 10);

    let readings = feed.snapshot().await;
    assert!(readings.windows(2).all(|w| w[0].timestamp < w[1].timestamp));
    let live = &readings[readings.len() - 10..];
    for pair in live.windows(2) {
        assert_eq!(pair[1].timestamp - pair[0].timestamp, chrono::Duration::seconds(3));
    }
    assert_eq!(
        live[9].timestamp,
        anchor() + chrono::Duration::seconds(30),
        "last tick fires 30 s after start"
    );

    ticker.stop().await;
}

#[tokio::test(start_paused = true)]
async fn stopped_ticker_appends_nothing() {
    let feed = feed(TelemetryConfig::default());
    spawn_initialize(&feed);
    let ticker = feed.start(tokio_util::sync::CancellationToken::new());
    assert!(ticker.is_running());

    tokio::time::sleep(Duration::from_millis(7_500)).await;
    ticker.stop().await;
    let before = feed.snapshot().await;
    let ticks = feed.status().await.ticks_applied;
    assert_eq!(ticks, 2);

    tokio::time::sleep(Duration::from_secs(60)).await;
    assert_eq!(feed.snapshot().await, before);
    assert_eq!(feed.status().await.ticks_applied, ticks);
}

#[tokio::test(start_paused = true)]
async fn cancelling_the_parent_token_stops_ticks() {
    let feed = feed(TelemetryConfig::default());
    spawn_initialize(&feed);
    let parent = tokio_util::sync::CancellationToken::new();
    let _ticker = feed.start(parent.clone());

    tokio::time::sleep(Duration::from_millis(4_000)).await;
    parent.cancel();
    let ticks = feed.status().await.ticks_applied;

    tokio::time::sleep(Duration::from_secs(30)).await;
    assert_eq!(feed.status().await.ticks_applied, ticks);
}

#[tokio::test(start_paused = true)]
async fn ticks_before_history_arrives_are_skipped() {
    let config = TelemetryConfig {
        initial_load_delay_ms: 10_000,
        ..TelemetryConfig::default()
    };
    let feed = feed(config);
    spawn_initialize(&feed);
    let _ticker = feed.start(tokio_util::sync::CancellationToken::new());

    // Ticks at 3, 6 and 9 s find nothing to append to
    tokio::time::sleep(Duration::from_millis(9_500)).await;
    assert_eq!(feed.load_state().await, LoadState::Loading);
    assert!(feed.snapshot().await.is_empty());
    assert_eq!(feed.status().await.ticks_applied, 0);

    // History at 10 s, first live tick at 12 s
    tokio::time::sleep(Duration::from_millis(3_000)).await;
    let status = feed.status().await;
    assert_eq!(status.load_state, LoadState::Ready);
    assert_eq!(status.len, status.capacity);
    assert_eq!(status.ticks_applied, 1);
}

#[tokio::test(start_paused = true)]
async fn failing_source_keeps_dashboard_empty_but_responsive() {
    let config = DashboardConfig::default();
    let dashboard = Dashboard::with_parts(
        config,
        Box::new(ScriptedSource::failing_history("sensor gateway offline")),
        Arc::new(TokioClock::starting_at(anchor())),
    );
    dashboard.start();

    tokio::time::sleep(Duration::from_secs(10)).await;
    assert!(matches!(
        dashboard.load_state().await,
        LoadState::Failed { ref reason } if reason.contains("sensor gateway offline")
    ));
    assert!(!dashboard.is_loading().await);
    assert!(dashboard.buffer().await.is_empty());
    assert!(dashboard.project(TimeWindow::TwentyFourHours).await.is_empty());
    assert_eq!(dashboard.latest().await.station1, 0.0);

    dashboard.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn dashboard_windows_nest_inside_the_full_buffer() {
    let dashboard = Dashboard::with_parts(
        DashboardConfig::default(),
        Box::new(ScriptedSource::new()),
        Arc::new(TokioClock::starting_at(anchor())),
    );
    assert!(dashboard.is_loading().await);
    dashboard.start();

    tokio::time::sleep(Duration::from_millis(1_000 + 3 * 3_000 + 500)).await;
    assert!(!dashboard.is_loading().await);

    let all = dashboard.buffer().await;
    let now = anchor() + chrono::Duration::milliseconds(10_500);
    let mut previous = 0;
    for window in TimeWindow::ALL {
        let projected = dashboard.project(window).await;
        assert!(projected.len() >= previous, "{window:?} shrank");
        previous = projected.len();

        // Projection is a suffix of the buffer
        assert_eq!(projected[..], all[all.len() - projected.len()..]);
        assert!(projected
            .iter()
            .all(|r| r.timestamp > now - window.duration()));
    }
    // Three ticks evicted the three oldest minutes, so 24 h covers everything
    assert_eq!(dashboard.project(TimeWindow::TwentyFourHours).await.len(), all.len());

    // The newest reading drives the metric snapshot
    let latest = dashboard.latest().await;
    assert_eq!(latest, *all.last().unwrap());
    let metrics = dashboard.derive_all_metrics().await;
    assert_eq!(metrics.flow.station1, latest.station1 * 1.2);

    dashboard.shutdown().await;
}
