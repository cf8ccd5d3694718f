//! Riverwatch - Río Claro river monitoring backend
//!
//! Keeps a rolling 24 h window of dual-station telemetry, serves derived
//! metrics over HTTP and generates reports on request.
//!
//! # Usage
//!
//! ```bash
//! # Run the feed and the HTTP API
//! cargo run --release
//!
//! # Deterministic synthetic data on another port
//! cargo run --release -- --seed 42 --addr 127.0.0.1:9000
//!
//! # Generate one report offline
//! cargo run --release -- report --format tabular \
//!     --from 2024-01-01 --to 2024-01-07 --variables flow,level --ai --out ./out
//! ```
//!
//! # Environment Variables
//!
//! - `RIVERWATCH_CONFIG`: Path to the TOML config (default: `./riverwatch.toml`)
//! - `RIVERWATCH_SERVER_ADDR`: HTTP bind address (overrides the config file)
//! - `RIVERWATCH_CORS_ORIGINS`: Comma-separated origins allowed by CORS
//! - `RUST_LOG`: Logging level (default: info)

use anyhow::{Context, Result};
use axum::Router;
use chrono::{DateTime, NaiveDate, Utc};
use clap::Parser;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast::error::RecvError;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use riverwatch::api::{create_app, ApiState};
use riverwatch::config::{DashboardConfig, ReportsConfig};
use riverwatch::types::{
    default_report_variables, DateRange, JobStatus, ReportConfig, ReportFormat, ReportVariable,
};
use riverwatch::Dashboard;

/// How long spawned tasks get to wind down after the shutdown signal.
const SHUTDOWN_GRACE: Duration = Duration::from_secs(5);

// ============================================================================
// CLI Arguments
// ============================================================================

#[derive(Parser, Debug)]
#[command(name = "riverwatch")]
#[command(about = "Río Claro river telemetry and report generation")]
#[command(version)]
struct CliArgs {
    /// Path to a TOML config file (skips the normal search order)
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Override the server address (default: config file, then "0.0.0.0:8080")
    #[arg(short, long, env = "RIVERWATCH_SERVER_ADDR", value_name = "HOST:PORT")]
    addr: Option<String>,

    /// Seed the synthetic source and mock report data for reproducible runs
    #[arg(long)]
    seed: Option<u64>,

    /// Emit logs as JSON lines
    #[arg(long)]
    log_json: bool,

    #[command(subcommand)]
    command: Option<SubCommand>,
}

#[derive(clap::Subcommand, Debug)]
enum SubCommand {
    /// Run the telemetry feed and the HTTP API until Ctrl+C (default)
    Serve,

    /// Generate a single report and write it to disk
    Report {
        /// Output format: document, spreadsheet or tabular (pdf/excel/csv accepted)
        #[arg(long, default_value = "tabular")]
        format: String,
        /// First day of the period (YYYY-MM-DD)
        #[arg(long)]
        from: String,
        /// Last day of the period (YYYY-MM-DD)
        #[arg(long)]
        to: String,
        /// Comma-separated variable ids (flow, level, discharge, velocity, temperature)
        #[arg(long, value_delimiter = ',', default_value = "flow,level")]
        variables: Vec<String>,
        /// Include the synthesized analysis
        #[arg(long)]
        ai: bool,
        /// Include sparkline charts (document format)
        #[arg(long)]
        charts: bool,
        /// Include per-column statistics
        #[arg(long)]
        analysis: bool,
        /// Output directory
        #[arg(long, default_value = ".")]
        out: PathBuf,
    },
}

// ============================================================================
// Task Supervision
// ============================================================================

#[derive(Debug, Clone, Copy)]
enum TaskName {
    HttpServer,
    Telemetry,
    JobMonitor,
}

impl std::fmt::Display for TaskName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TaskName::HttpServer => write!(f, "HttpServer"),
            TaskName::Telemetry => write!(f, "Telemetry"),
            TaskName::JobMonitor => write!(f, "JobMonitor"),
        }
    }
}

fn spawn_http_server(
    task_set: &mut JoinSet<Result<TaskName>>,
    listener: tokio::net::TcpListener,
    app: Router,
    cancel_token: CancellationToken,
) {
    task_set.spawn(async move {
        info!("[HttpServer] Task starting");

        let result = axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                cancel_token.cancelled().await;
                info!("[HttpServer] Received shutdown signal");
            })
            .await;

        match result {
            Ok(()) => {
                info!("[HttpServer] Graceful shutdown complete");
                Ok(TaskName::HttpServer)
            }
            Err(e) => {
                error!("[HttpServer] Server error: {}", e);
                Err(anyhow::anyhow!("HTTP server error: {}", e))
            }
        }
    });
}

/// Owns the dashboard lifecycle: history load, ticker, and shutdown.
fn spawn_telemetry(
    task_set: &mut JoinSet<Result<TaskName>>,
    dashboard: Arc<Dashboard>,
    cancel_token: CancellationToken,
) {
    task_set.spawn(async move {
        info!("[Telemetry] Task starting");
        dashboard.start();

        cancel_token.cancelled().await;
        dashboard.shutdown().await;
        info!("[Telemetry] Ticker stopped, running jobs cancelled");
        Ok(TaskName::Telemetry)
    });
}

/// Logs report job transitions from the engine's event stream.
fn spawn_job_monitor(
    task_set: &mut JoinSet<Result<TaskName>>,
    dashboard: Arc<Dashboard>,
    cancel_token: CancellationToken,
) {
    let mut events = dashboard.subscribe_jobs();
    task_set.spawn(async move {
        info!("[JobMonitor] Task starting");
        loop {
            tokio::select! {
                _ = cancel_token.cancelled() => break,
                event = events.recv() => match event {
                    Ok(event) if event.status.is_terminal() => {
                        info!(
                            job_id = %event.job_id,
                            status = %event.status,
                            "[JobMonitor] Report job finished"
                        );
                    }
                    Ok(event) => {
                        debug!(
                            job_id = %event.job_id,
                            progress = event.progress,
                            stage = ?event.stage,
                            "[JobMonitor] Report job progress"
                        );
                    }
                    Err(RecvError::Lagged(skipped)) => {
                        warn!(skipped, "[JobMonitor] Event stream lagged");
                    }
                    Err(RecvError::Closed) => break,
                },
            }
        }
        Ok(TaskName::JobMonitor)
    });
}

async fn run_supervisor(
    task_set: &mut JoinSet<Result<TaskName>>,
    cancel_token: CancellationToken,
) -> Result<()> {
    info!("🔒 Supervisor: All tasks spawned, monitoring...");

    loop {
        tokio::select! {
            _ = cancel_token.cancelled() => {
                info!("🛑 Supervisor: Shutdown signal received");
                break;
            }
            result = task_set.join_next() => {
                match result {
                    Some(Ok(Ok(task_name))) => {
                        info!("🔒 Supervisor: Task {} completed normally", task_name);
                    }
                    Some(Ok(Err(e))) => {
                        error!("🔒 Supervisor: Task failed with error: {}", e);
                        cancel_token.cancel();
                        return Err(e);
                    }
                    Some(Err(e)) => {
                        error!("🔒 Supervisor: Task panicked: {}", e);
                        cancel_token.cancel();
                        return Err(anyhow::anyhow!("Task panicked: {}", e));
                    }
                    None => {
                        info!("🔒 Supervisor: All tasks completed");
                        break;
                    }
                }
            }
        }
    }

    // Let the remaining tasks observe the token and finish
    let drain = async {
        while let Some(result) = task_set.join_next().await {
            if let Ok(Ok(task_name)) = result {
                info!("🔒 Supervisor: Task {} stopped", task_name);
            }
        }
    };
    if tokio::time::timeout(SHUTDOWN_GRACE, drain).await.is_err() {
        warn!("🔒 Supervisor: Tasks still running after {:?}, aborting", SHUTDOWN_GRACE);
        task_set.abort_all();
    }

    Ok(())
}

// ============================================================================
// Commands
// ============================================================================

async fn run_server(
    config: DashboardConfig,
    server_addr: String,
    cancel_token: CancellationToken,
) -> Result<()> {
    info!("🚀 Starting telemetry feed and HTTP API");
    info!(
        "   Horizon: {} min | Tick: {} ms | Sparkline: {} points",
        config.telemetry.horizon_minutes,
        config.telemetry.tick_interval_ms,
        config.telemetry.sparkline_points
    );
    info!("");

    let dashboard = Arc::new(Dashboard::new(config));
    let app = create_app(ApiState::new(Arc::clone(&dashboard)));

    let listener = tokio::net::TcpListener::bind(&server_addr)
        .await
        .with_context(|| format!("Failed to bind HTTP server to {}", server_addr))?;
    info!("🌐 Dashboard API listening on http://{}/api/v1", server_addr);

    info!("🔒 Supervisor: Initializing task monitoring");
    let mut task_set: JoinSet<Result<TaskName>> = JoinSet::new();

    spawn_http_server(&mut task_set, listener, app, cancel_token.clone());
    spawn_telemetry(&mut task_set, Arc::clone(&dashboard), cancel_token.clone());
    spawn_job_monitor(&mut task_set, dashboard, cancel_token.clone());

    run_supervisor(&mut task_set, cancel_token).await
}

struct ReportRequest {
    format: String,
    from: String,
    to: String,
    variables: Vec<String>,
    ai: bool,
    charts: bool,
    analysis: bool,
    out: PathBuf,
}

async fn run_report(mut config: DashboardConfig, request: ReportRequest) -> Result<()> {
    // Offline runs skip the simulated stage latency
    config.reports = ReportsConfig {
        job_timeout_secs: config.reports.job_timeout_secs,
        max_range_days: config.reports.max_range_days,
        ..ReportsConfig::immediate()
    };

    let report_config = ReportConfig {
        variables: select_variables(&request.variables)?,
        format: ReportFormat::from(request.format.as_str()),
        date_range: DateRange {
            start: parse_day(&request.from).context("Invalid --from date")?,
            end: parse_day(&request.to).context("Invalid --to date")?,
        },
        include_charts: request.charts,
        include_analysis: request.analysis,
        ai_analysis: request.ai,
    };

    let dashboard = Dashboard::new(config);
    let id = dashboard
        .submit_report(report_config)
        .await
        .context("Report request rejected")?;
    info!(job_id = %id, "📝 Report job submitted");

    let job = dashboard
        .wait_for_report(&id)
        .await
        .with_context(|| format!("Report job {} disappeared", id))?;
    if job.status == JobStatus::Error {
        let reason = job.error.unwrap_or_else(|| "unknown error".to_string());
        return Err(anyhow::anyhow!("Report generation failed: {}", reason));
    }

    let download = dashboard
        .download_report(&id)
        .await
        .with_context(|| format!("No artifact stored for job {}", id))?;

    std::fs::create_dir_all(&request.out)
        .with_context(|| format!("Failed to create {}", request.out.display()))?;
    let path = request.out.join(&download.filename);
    std::fs::write(&path, &download.bytes[..])
        .with_context(|| format!("Failed to write {}", path.display()))?;

    info!(
        path = %path.display(),
        bytes = download.bytes.len(),
        content_type = download.content_type,
        "✓ Report written"
    );
    Ok(())
}

/// Mark the requested ids as selected in the default catalog.
fn select_variables(ids: &[String]) -> Result<Vec<ReportVariable>> {
    let mut catalog = default_report_variables();
    for variable in catalog.iter_mut() {
        variable.selected = false;
    }
    for id in ids.iter().map(|id| id.trim()).filter(|id| !id.is_empty()) {
        let variable = catalog
            .iter_mut()
            .find(|v| v.id.eq_ignore_ascii_case(id))
            .ok_or_else(|| anyhow::anyhow!("Unknown report variable '{}'", id))?;
        variable.selected = true;
    }
    Ok(catalog)
}

/// `YYYY-MM-DD` at midnight UTC.
fn parse_day(value: &str) -> Result<DateTime<Utc>> {
    let date = NaiveDate::parse_from_str(value.trim(), "%Y-%m-%d")
        .with_context(|| format!("expected YYYY-MM-DD, got '{}'", value))?;
    Ok(date.and_time(chrono::NaiveTime::MIN).and_utc())
}

fn load_config(path: Option<&Path>) -> Result<DashboardConfig> {
    match path {
        Some(path) => DashboardConfig::load_from_file(path)
            .with_context(|| format!("Failed to load config from {}", path.display())),
        None => Ok(DashboardConfig::load()),
    }
}

fn init_tracing(json: bool) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    if json {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .with_target(false)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(false)
            .init();
    }
}

// ============================================================================
// Main
// ============================================================================

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let args = CliArgs::parse();
    init_tracing(args.log_json);

    let mut config = load_config(args.config.as_deref())?;
    if let Some(seed) = args.seed {
        config.telemetry.seed = Some(seed);
    }

    if let Some(SubCommand::Report {
        format,
        from,
        to,
        variables,
        ai,
        charts,
        analysis,
        out,
    }) = args.command
    {
        let request = ReportRequest {
            format,
            from,
            to,
            variables,
            ai,
            charts,
            analysis,
            out,
        };
        return run_report(config, request).await;
    }

    let server_addr = args.addr.unwrap_or_else(|| config.server.addr.clone());

    info!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    info!("  Riverwatch - River Telemetry & Reports");
    info!("  Site: {}", config.site.name);
    info!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    info!("");
    match config.telemetry.seed {
        Some(seed) => info!("🧪 Source: synthetic (seed {})", seed),
        None => info!("🧪 Source: synthetic"),
    }

    // Graceful shutdown via Ctrl+C
    let cancel_token = CancellationToken::new();
    let shutdown_token = cancel_token.clone();
    tokio::spawn(async move {
        tokio::signal::ctrl_c().await.ok();
        info!("🛑 Received Ctrl+C, initiating shutdown...");
        shutdown_token.cancel();
    });

    run_server(config, server_addr, cancel_token).await?;

    info!("");
    info!("✓ Riverwatch shutdown complete");
    Ok(())
}
