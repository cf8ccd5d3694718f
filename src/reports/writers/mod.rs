//! Format writers and the registry the engine dispatches through.
//!
//! Adding a format means registering another `ReportWriter`; the engine's
//! control flow does not change.

mod document;
mod spreadsheet;
mod tabular;

pub use document::DocumentWriter;
pub use spreadsheet::SpreadsheetWriter;
pub use tabular::TabularWriter;

use super::dataset::{ColumnStats, ReportDataset};
use super::ReportError;
use crate::types::{AnalysisResult, ReportConfig, ReportFormat};
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::Arc;

/// Everything a writer may embed into an artifact.
#[derive(Debug, Clone, Copy)]
pub struct WriteContext<'a> {
    pub config: &'a ReportConfig,
    pub dataset: &'a ReportDataset,
    pub stats: &'a [ColumnStats],
    /// Present only when AI analysis was requested
    pub analysis: Option<&'a AnalysisResult>,
    pub site_name: &'a str,
    pub generated_at: DateTime<Utc>,
}

impl WriteContext<'_> {
    pub fn period(&self) -> String {
        format!(
            "{} - {}",
            self.config.date_range.start.format("%d-%m-%Y"),
            self.config.date_range.end.format("%d-%m-%Y")
        )
    }
}

/// Turns a dataset (plus optional analysis) into artifact bytes.
pub trait ReportWriter: Send + Sync {
    fn content_type(&self) -> &'static str;

    /// File extension without the dot.
    fn extension(&self) -> &'static str;

    fn write(&self, ctx: &WriteContext<'_>) -> anyhow::Result<Vec<u8>>;
}

/// Format tag to writer.
#[derive(Clone, Default)]
pub struct WriterRegistry {
    writers: HashMap<ReportFormat, Arc<dyn ReportWriter>>,
}

impl WriterRegistry {
    /// A registry with no writers.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Document, spreadsheet and tabular writers.
    pub fn with_defaults() -> Self {
        let mut registry = Self::empty();
        registry.register(ReportFormat::Document, Arc::new(DocumentWriter));
        registry.register(ReportFormat::Spreadsheet, Arc::new(SpreadsheetWriter));
        registry.register(ReportFormat::Tabular, Arc::new(TabularWriter));
        registry
    }

    pub fn register(&mut self, format: ReportFormat, writer: Arc<dyn ReportWriter>) {
        self.writers.insert(format, writer);
    }

    pub fn get(&self, format: &ReportFormat) -> Result<Arc<dyn ReportWriter>, ReportError> {
        self.writers
            .get(format)
            .cloned()
            .ok_or_else(|| ReportError::UnsupportedFormat(format.tag().to_string()))
    }

    pub fn formats(&self) -> Vec<ReportFormat> {
        let mut formats: Vec<_> = self.writers.keys().cloned().collect();
        formats.sort_by(|a, b| a.tag().cmp(b.tag()));
        formats
    }
}

impl std::fmt::Debug for WriterRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WriterRegistry")
            .field("formats", &self.formats())
            .finish()
    }
}

#[cfg(test)]
pub(crate) mod fixtures {
    use super::*;
    use crate::reports::analysis::RECOMMENDATIONS;
    use crate::reports::dataset::DatasetRow;
    use crate::types::{
        default_report_variables, AlertKind, AnalysisAlert, DateRange, TrendDirection,
        TrendInsight,
    };
    use chrono::TimeZone;

    pub fn config(format: ReportFormat) -> ReportConfig {
        ReportConfig {
            variables: default_report_variables(),
            format,
            date_range: DateRange {
                start: Utc.with_ymd_and_hms(2024, 4, 1, 0, 0, 0).unwrap(),
                end: Utc.with_ymd_and_hms(2024, 4, 3, 0, 0, 0).unwrap(),
            },
            include_charts: false,
            include_analysis: false,
            ai_analysis: false,
        }
    }

    pub fn dataset() -> ReportDataset {
        let columns = [
            "fecha",
            "hora",
            "flow_Estacion1",
            "flow_Estacion2",
            "level_Estacion1",
            "level_Estacion2",
        ];
        let rows = (1..=3)
            .map(|day| DatasetRow {
                fecha: format!("0{day}-04-2024"),
                hora: "00:00:00".to_string(),
                values: vec![100.0 + day as f64, 105.5, 2.25, 2.4],
            })
            .collect();
        ReportDataset {
            columns: columns.iter().map(|c| c.to_string()).collect(),
            rows,
        }
    }

    pub fn analysis() -> AnalysisResult {
        AnalysisResult {
            summary: "Resumen de prueba".to_string(),
            trends: vec![TrendInsight {
                variable: "Flujo".to_string(),
                trend: TrendDirection::Increasing,
                confidence: 0.834,
                description: "Tendencia de prueba".to_string(),
            }],
            recommendations: RECOMMENDATIONS.iter().map(|r| r.to_string()).collect(),
            alerts: vec![AnalysisAlert {
                kind: AlertKind::Critical,
                message: "Valores anómalos en Flujo".to_string(),
                variable: "Flujo".to_string(),
            }],
        }
    }

    pub fn generated_at() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 4, 4, 15, 20, 0).unwrap()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_registry_dispatch() {
        let registry = WriterRegistry::with_defaults();
        assert_eq!(registry.get(&ReportFormat::Tabular).unwrap().extension(), "csv");
        assert_eq!(registry.get(&ReportFormat::Spreadsheet).unwrap().extension(), "xlsx");
        assert_eq!(registry.get(&ReportFormat::Document).unwrap().extension(), "txt");
        assert_eq!(registry.formats().len(), 3);
    }

    #[test]
    fn test_unknown_format_is_unsupported() {
        let registry = WriterRegistry::with_defaults();
        let err = registry
            .get(&ReportFormat::from("odt"))
            .err()
            .expect("odt has no writer");
        assert_eq!(err.to_string(), "Formato no soportado: odt");
    }
}
