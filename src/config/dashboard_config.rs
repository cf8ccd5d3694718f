//! Dashboard Configuration - telemetry cadence, report pipeline timing, server
//!
//! Every field has a default matching the values the dashboard shipped with,
//! so an empty or missing `riverwatch.toml` behaves exactly like before.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{info, warn};

use super::defaults;
use crate::types::ReportStage;

/// Environment variable pointing at a config file.
pub const CONFIG_ENV_VAR: &str = "RIVERWATCH_CONFIG";

/// Config file looked up in the working directory.
pub const LOCAL_CONFIG_FILE: &str = "riverwatch.toml";

// ============================================================================
// Top-Level Config
// ============================================================================

/// Root configuration.
///
/// Load with `DashboardConfig::load()` which searches:
/// 1. `$RIVERWATCH_CONFIG`
/// 2. `./riverwatch.toml`
/// 3. Built-in defaults
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DashboardConfig {
    /// Monitoring site identification
    #[serde(default)]
    pub site: SiteConfig,

    /// Live buffer cadence and horizon
    #[serde(default)]
    pub telemetry: TelemetryConfig,

    /// Report job pipeline timing and limits
    #[serde(default)]
    pub reports: ReportsConfig,

    /// HTTP server configuration
    #[serde(default)]
    pub server: ServerConfig,
}

impl DashboardConfig {
    /// Load configuration using the standard search order.
    ///
    /// A file that fails to parse or validate is logged and skipped.
    pub fn load() -> Self {
        if let Ok(path) = std::env::var(CONFIG_ENV_VAR) {
            let p = PathBuf::from(&path);
            if p.exists() {
                match Self::load_from_file(&p) {
                    Ok(config) => {
                        info!(path = %p.display(), site = %config.site.name, "Loaded config from {}", CONFIG_ENV_VAR);
                        return config;
                    }
                    Err(e) => {
                        warn!(path = %p.display(), error = %e, "Failed to load config from {}, falling back", CONFIG_ENV_VAR);
                    }
                }
            } else {
                warn!(path = %path, "{} points to non-existent file, falling back", CONFIG_ENV_VAR);
            }
        }

        let local = PathBuf::from(LOCAL_CONFIG_FILE);
        if local.exists() {
            match Self::load_from_file(&local) {
                Ok(config) => {
                    info!(site = %config.site.name, "Loaded config from ./{}", LOCAL_CONFIG_FILE);
                    return config;
                }
                Err(e) => {
                    warn!(error = %e, "Failed to load ./{}, using defaults", LOCAL_CONFIG_FILE);
                }
            }
        }

        info!("No {} found, using built-in defaults", LOCAL_CONFIG_FILE);
        Self::default()
    }

    /// Load from a specific TOML file path.
    pub fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::Io(path.to_path_buf(), e))?;
        Self::from_toml_str(&contents).map_err(|e| match e {
            ConfigError::Parse(_, inner) => ConfigError::Parse(path.to_path_buf(), inner),
            other => other,
        })
    }

    /// Parse and validate a TOML document. Unknown keys only produce warnings.
    pub fn from_toml_str(contents: &str) -> Result<Self, ConfigError> {
        for w in super::validation::validate_unknown_keys(contents) {
            warn!("{}", w);
        }

        let config: Self = toml::from_str(contents)
            .map_err(|e| ConfigError::Parse(PathBuf::from("<inline>"), e))?;
        config.validate()?;
        Ok(config)
    }

    /// Serialize the current config to a TOML string.
    pub fn to_toml(&self) -> Result<String, ConfigError> {
        toml::to_string_pretty(self).map_err(ConfigError::Serialize)
    }

    /// Validate internal consistency, collecting every problem at once.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let mut errors: Vec<String> = Vec::new();

        let t = &self.telemetry;
        if t.horizon_minutes == 0 {
            errors.push("telemetry.horizon_minutes must be > 0".to_string());
        }
        if t.tick_interval_ms == 0 {
            errors.push("telemetry.tick_interval_ms must be > 0".to_string());
        }
        if t.sparkline_points == 0 {
            errors.push("telemetry.sparkline_points must be > 0".to_string());
        }

        let r = &self.reports;
        if r.job_timeout_secs == 0 {
            errors.push("reports.job_timeout_secs must be > 0".to_string());
        }
        if !(1..=defaults::MAX_RANGE_DAYS_LIMIT).contains(&r.max_range_days) {
            errors.push(format!(
                "reports.max_range_days = {} must be in 1..={}",
                r.max_range_days,
                defaults::MAX_RANGE_DAYS_LIMIT
            ));
        }
        let pipeline_ms = r
            .data_collection_ms
            .saturating_add(r.analysis_processing_ms)
            .saturating_add(r.ai_synthesis_ms)
            .saturating_add(r.artifact_assembly_ms);
        if pipeline_ms >= r.job_timeout_secs.saturating_mul(1_000) {
            errors.push(format!(
                "reports stage delays ({pipeline_ms} ms total) must fit inside job_timeout_secs ({} s)",
                r.job_timeout_secs
            ));
        }

        if self.server.addr.trim().is_empty() {
            errors.push("server.addr must not be empty".to_string());
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(ConfigError::Validation(errors))
        }
    }
}

// ============================================================================
// Error Type
// ============================================================================

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Config I/O error ({}): {1}", .0.display())]
    Io(PathBuf, std::io::Error),

    #[error("Config parse error ({}): {1}", .0.display())]
    Parse(PathBuf, toml::de::Error),

    #[error("Config serialization error: {0}")]
    Serialize(toml::ser::Error),

    #[error("Config validation failed: {}", .0.join("; "))]
    Validation(Vec<String>),
}

// ============================================================================
// Site
// ============================================================================

/// Identification metadata, printed in report headers and logs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SiteConfig {
    #[serde(default = "default_site_name")]
    pub name: String,
}

fn default_site_name() -> String {
    defaults::LOCATION_NAME.to_string()
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            name: default_site_name(),
        }
    }
}

// ============================================================================
// Telemetry
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TelemetryConfig {
    /// Minutes of history kept; buffer capacity is this plus one
    #[serde(default = "default_horizon_minutes")]
    pub horizon_minutes: u32,

    #[serde(default = "default_tick_interval_ms")]
    pub tick_interval_ms: u64,

    #[serde(default = "default_initial_load_delay_ms")]
    pub initial_load_delay_ms: u64,

    #[serde(default = "default_sparkline_points")]
    pub sparkline_points: usize,

    /// Seed for the synthetic source. Random when unset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub seed: Option<u64>,
}

fn default_horizon_minutes() -> u32 {
    defaults::HORIZON_MINUTES
}
fn default_tick_interval_ms() -> u64 {
    defaults::TICK_INTERVAL_MS
}
fn default_initial_load_delay_ms() -> u64 {
    defaults::INITIAL_LOAD_DELAY_MS
}
fn default_sparkline_points() -> usize {
    defaults::SPARKLINE_POINTS
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            horizon_minutes: default_horizon_minutes(),
            tick_interval_ms: default_tick_interval_ms(),
            initial_load_delay_ms: default_initial_load_delay_ms(),
            sparkline_points: default_sparkline_points(),
            seed: None,
        }
    }
}

impl TelemetryConfig {
    /// Buffer capacity: one reading per minute of horizon, both ends inclusive.
    pub fn capacity(&self) -> usize {
        self.horizon_minutes as usize + 1
    }

    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms)
    }

    pub fn initial_load_delay(&self) -> Duration {
        Duration::from_millis(self.initial_load_delay_ms)
    }
}

// ============================================================================
// Reports
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportsConfig {
    #[serde(default = "default_data_collection_ms")]
    pub data_collection_ms: u64,

    #[serde(default = "default_analysis_processing_ms")]
    pub analysis_processing_ms: u64,

    #[serde(default = "default_ai_synthesis_ms")]
    pub ai_synthesis_ms: u64,

    #[serde(default = "default_artifact_assembly_ms")]
    pub artifact_assembly_ms: u64,

    /// Jobs still running after this long are forced to `error`
    #[serde(default = "default_job_timeout_secs")]
    pub job_timeout_secs: u64,

    #[serde(default = "default_max_range_days")]
    pub max_range_days: i64,
}

fn default_data_collection_ms() -> u64 {
    defaults::DATA_COLLECTION_MS
}
fn default_analysis_processing_ms() -> u64 {
    defaults::ANALYSIS_PROCESSING_MS
}
fn default_ai_synthesis_ms() -> u64 {
    defaults::AI_SYNTHESIS_MS
}
fn default_artifact_assembly_ms() -> u64 {
    defaults::ARTIFACT_ASSEMBLY_MS
}
fn default_job_timeout_secs() -> u64 {
    defaults::JOB_TIMEOUT_SECS
}
fn default_max_range_days() -> i64 {
    defaults::MAX_RANGE_DAYS
}

impl Default for ReportsConfig {
    fn default() -> Self {
        Self {
            data_collection_ms: default_data_collection_ms(),
            analysis_processing_ms: default_analysis_processing_ms(),
            ai_synthesis_ms: default_ai_synthesis_ms(),
            artifact_assembly_ms: default_artifact_assembly_ms(),
            job_timeout_secs: default_job_timeout_secs(),
            max_range_days: default_max_range_days(),
        }
    }
}

impl ReportsConfig {
    /// Simulated latency awaited after a stage's progress is published.
    pub fn stage_delay(&self, stage: ReportStage) -> Duration {
        let ms = match stage {
            ReportStage::DataCollection => self.data_collection_ms,
            ReportStage::AnalysisProcessing => self.analysis_processing_ms,
            ReportStage::AiSynthesis => self.ai_synthesis_ms,
            ReportStage::ArtifactAssembly => self.artifact_assembly_ms,
            ReportStage::Writing => 0,
        };
        Duration::from_millis(ms)
    }

    pub fn job_timeout(&self) -> Duration {
        Duration::from_secs(self.job_timeout_secs)
    }

    /// Zero-latency pipeline, handy for tests and the offline `report` command.
    pub fn immediate() -> Self {
        Self {
            data_collection_ms: 0,
            analysis_processing_ms: 0,
            ai_synthesis_ms: 0,
            artifact_assembly_ms: 0,
            ..Self::default()
        }
    }
}

// ============================================================================
// Server
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServerConfig {
    /// HTTP server bind address.
    ///
    /// Can be overridden by `RIVERWATCH_SERVER_ADDR` or `--addr`.
    #[serde(default = "default_server_addr")]
    pub addr: String,
}

fn default_server_addr() -> String {
    defaults::SERVER_ADDR.to_string()
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            addr: default_server_addr(),
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_default_config_validates() {
        let config = DashboardConfig::default();
        assert!(config.validate().is_ok(), "Default config must always validate");
    }

    #[test]
    fn test_empty_toml_produces_defaults() {
        let config: DashboardConfig = toml::from_str("").expect("empty TOML should parse");
        assert_eq!(config.telemetry.horizon_minutes, 1_440);
        assert_eq!(config.telemetry.tick_interval_ms, 3_000);
        assert_eq!(config.telemetry.capacity(), 1_441);
        assert_eq!(config.reports.ai_synthesis_ms, 2_000);
        assert_eq!(config.site.name, "Río Claro - Pucón");
    }

    #[test]
    fn test_partial_toml_override() {
        let toml_str = r#"
[telemetry]
horizon_minutes = 60
seed = 7

[reports]
job_timeout_secs = 30
"#;
        let config = DashboardConfig::from_toml_str(toml_str).expect("partial TOML should parse");
        assert_eq!(config.telemetry.horizon_minutes, 60);
        assert_eq!(config.telemetry.capacity(), 61);
        assert_eq!(config.telemetry.seed, Some(7));
        assert_eq!(config.reports.job_timeout_secs, 30);
        // Non-overridden values retain defaults
        assert_eq!(config.telemetry.tick_interval_ms, 3_000);
        assert_eq!(config.reports.data_collection_ms, 1_000);
    }

    #[test]
    fn test_validation_collects_all_errors() {
        let mut config = DashboardConfig::default();
        config.telemetry.tick_interval_ms = 0;
        config.telemetry.sparkline_points = 0;
        config.reports.max_range_days = -1;
        match config.validate() {
            Err(ConfigError::Validation(errors)) => {
                assert_eq!(errors.len(), 3, "{errors:?}");
                assert!(errors.iter().any(|e| e.contains("tick_interval_ms")));
            }
            other => panic!("expected validation error, got {other:?}"),
        }
    }

    #[test]
    fn test_stage_delays_must_fit_timeout() {
        let mut config = DashboardConfig::default();
        config.reports.job_timeout_secs = 2;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_roundtrip_toml() {
        let original = DashboardConfig::default();
        let toml_str = original.to_toml().expect("serialization should work");
        let roundtripped: DashboardConfig =
            toml::from_str(&toml_str).expect("deserialization should work");
        assert_eq!(original, roundtripped);
    }

    #[test]
    fn test_load_from_file_reports_path_on_parse_error() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[telemetry]\nhorizon_minutes = \"lots\"").unwrap();
        let err = DashboardConfig::load_from_file(file.path()).unwrap_err();
        assert!(matches!(err, ConfigError::Parse(ref p, _) if p == file.path()));
    }

    #[test]
    fn test_stage_delay_lookup() {
        let reports = ReportsConfig::default();
        assert_eq!(
            reports.stage_delay(ReportStage::AiSynthesis),
            Duration::from_millis(2_000)
        );
        assert_eq!(reports.stage_delay(ReportStage::Writing), Duration::ZERO);
        assert_eq!(
            ReportsConfig::immediate().stage_delay(ReportStage::DataCollection),
            Duration::ZERO
        );
    }

    #[test]
    fn test_max_range_days_has_an_upper_bound() {
        let mut config = DashboardConfig::default();
        config.reports.max_range_days = 200_000_000_000;
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("max_range_days"), "{err}");

        config.reports.max_range_days = defaults::MAX_RANGE_DAYS_LIMIT;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_huge_stage_delays_saturate_instead_of_wrapping() {
        let mut config = DashboardConfig::default();
        config.reports.data_collection_ms = u64::MAX;
        config.reports.analysis_processing_ms = u64::MAX;
        config.reports.ai_synthesis_ms = 2;
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("job_timeout_secs"), "{err}");
    }
}
