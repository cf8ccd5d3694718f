//! Report configuration, job and analysis types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ============================================================================
// Report Configuration
// ============================================================================

/// A selectable variable to include in a generated report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportVariable {
    /// Stable identifier, also used for column names (`flow_Estacion1`)
    pub id: String,
    /// Display name used in document text
    pub name: String,
    pub unit: String,
    #[serde(default)]
    pub selected: bool,
    #[serde(default)]
    pub icon: String,
}

impl ReportVariable {
    fn catalog_entry(id: &str, name: &str, unit: &str, selected: bool, icon: &str) -> Self {
        Self {
            id: id.to_string(),
            name: name.to_string(),
            unit: unit.to_string(),
            selected,
            icon: icon.to_string(),
        }
    }
}

/// The variable catalog offered to the report panel.
///
/// Flow and level start selected.
pub fn default_report_variables() -> Vec<ReportVariable> {
    vec![
        ReportVariable::catalog_entry("flow", "Flujo", "m³/s", true, "🌊"),
        ReportVariable::catalog_entry("level", "Nivel", "m", true, "📊"),
        ReportVariable::catalog_entry("discharge", "Caudal", "L/s", false, "💧"),
        ReportVariable::catalog_entry("velocity", "Velocidad", "m/s", false, "💨"),
        ReportVariable::catalog_entry("temperature", "Temperatura", "°C", false, "🌡️"),
    ]
}

/// Output format of a report artifact.
///
/// Parses the current tags (`document`, `spreadsheet`, `tabular`) and the
/// legacy ones (`pdf`, `excel`, `csv`). Anything else is kept verbatim in
/// [`ReportFormat::Other`] and rejected later by writer dispatch.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ReportFormat {
    Document,
    Spreadsheet,
    Tabular,
    Other(String),
}

impl ReportFormat {
    pub fn tag(&self) -> &str {
        match self {
            ReportFormat::Document => "document",
            ReportFormat::Spreadsheet => "spreadsheet",
            ReportFormat::Tabular => "tabular",
            ReportFormat::Other(tag) => tag,
        }
    }
}

impl From<String> for ReportFormat {
    fn from(tag: String) -> Self {
        match tag.trim().to_ascii_lowercase().as_str() {
            "document" | "pdf" => ReportFormat::Document,
            "spreadsheet" | "excel" | "xlsx" => ReportFormat::Spreadsheet,
            "tabular" | "csv" => ReportFormat::Tabular,
            _ => ReportFormat::Other(tag),
        }
    }
}

impl From<&str> for ReportFormat {
    fn from(tag: &str) -> Self {
        ReportFormat::from(tag.to_string())
    }
}

impl From<ReportFormat> for String {
    fn from(format: ReportFormat) -> Self {
        format.tag().to_string()
    }
}

impl std::fmt::Display for ReportFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.tag())
    }
}

/// Inclusive period covered by a report.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DateRange {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

/// Snapshot of the user's report request, cloned into the job at submission.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportConfig {
    pub variables: Vec<ReportVariable>,
    pub format: ReportFormat,
    pub date_range: DateRange,
    #[serde(default)]
    pub include_charts: bool,
    #[serde(default)]
    pub include_analysis: bool,
    #[serde(default)]
    pub ai_analysis: bool,
}

impl ReportConfig {
    pub fn selected_variables(&self) -> impl Iterator<Item = &ReportVariable> {
        self.variables.iter().filter(|v| v.selected)
    }

    pub fn has_selection(&self) -> bool {
        self.variables.iter().any(|v| v.selected)
    }
}

// ============================================================================
// Report Jobs
// ============================================================================

/// Lifecycle status of a report job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    Pending,
    Generating,
    Completed,
    Error,
}

impl JobStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, JobStatus::Completed | JobStatus::Error)
    }
}

impl std::fmt::Display for JobStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            JobStatus::Pending => write!(f, "pending"),
            JobStatus::Generating => write!(f, "generating"),
            JobStatus::Completed => write!(f, "completed"),
            JobStatus::Error => write!(f, "error"),
        }
    }
}

/// Named pipeline stages, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReportStage {
    DataCollection,
    AnalysisProcessing,
    AiSynthesis,
    ArtifactAssembly,
    Writing,
}

impl ReportStage {
    /// Progress reached when the stage starts.
    pub fn progress(self) -> u8 {
        match self {
            ReportStage::DataCollection => 20,
            ReportStage::AnalysisProcessing => 40,
            ReportStage::AiSynthesis => 60,
            ReportStage::ArtifactAssembly => 80,
            ReportStage::Writing => 100,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            ReportStage::DataCollection => "Recopilando datos",
            ReportStage::AnalysisProcessing => "Procesando análisis",
            ReportStage::AiSynthesis => "Generando análisis IA",
            ReportStage::ArtifactAssembly => "Generando archivo",
            ReportStage::Writing => "Escribiendo reporte",
        }
    }
}

/// A report generation job as seen by callers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportJob {
    pub id: String,
    pub config: ReportConfig,
    pub status: JobStatus,
    /// 0-100, non-decreasing until terminal
    pub progress: u8,
    pub stage: Option<ReportStage>,
    pub created_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
    pub download_url: Option<String>,
    pub error: Option<String>,
}

impl ReportJob {
    pub fn new(id: String, config: ReportConfig, created_at: DateTime<Utc>) -> Self {
        Self {
            id,
            config,
            status: JobStatus::Pending,
            progress: 0,
            stage: None,
            created_at,
            completed_at: None,
            download_url: None,
            error: None,
        }
    }
}

/// Emitted on every job transition.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct JobEvent {
    pub job_id: String,
    pub status: JobStatus,
    pub progress: u8,
    pub stage: Option<ReportStage>,
}

// ============================================================================
// Analysis
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TrendDirection {
    Increasing,
    Decreasing,
    Stable,
}

impl std::fmt::Display for TrendDirection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TrendDirection::Increasing => write!(f, "increasing"),
            TrendDirection::Decreasing => write!(f, "decreasing"),
            TrendDirection::Stable => write!(f, "stable"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrendInsight {
    pub variable: String,
    pub trend: TrendDirection,
    /// In [0.7, 1.0)
    pub confidence: f64,
    pub description: String,
}

impl TrendInsight {
    /// Confidence as a whole percentage, as printed in artifacts.
    pub fn confidence_percent(&self) -> String {
        format!("{:.0}%", self.confidence * 100.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AlertKind {
    Warning,
    Critical,
    Info,
}

impl std::fmt::Display for AlertKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AlertKind::Warning => write!(f, "warning"),
            AlertKind::Critical => write!(f, "critical"),
            AlertKind::Info => write!(f, "info"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisAlert {
    #[serde(rename = "type")]
    pub kind: AlertKind,
    pub message: String,
    pub variable: String,
}

/// Structured summary embedded into report artifacts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisResult {
    pub summary: String,
    pub trends: Vec<TrendInsight>,
    pub recommendations: Vec<String>,
    pub alerts: Vec<AnalysisAlert>,
}
