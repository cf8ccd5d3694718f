//! Delimited-text (CSV) report with an optional plain-text appendix.

use super::{ReportWriter, WriteContext};
use anyhow::Context;
use std::fmt::Write as _;

#[derive(Debug, Clone, Copy, Default)]
pub struct TabularWriter;

impl TabularWriter {
    fn rows(ctx: &WriteContext<'_>) -> anyhow::Result<Vec<u8>> {
        let mut writer = csv::WriterBuilder::new()
            .terminator(csv::Terminator::CRLF)
            .from_writer(Vec::new());
        writer
            .write_record(&ctx.dataset.columns)
            .context("writing CSV header")?;
        for row in &ctx.dataset.rows {
            writer.write_record(row.record()).context("writing CSV row")?;
        }
        writer
            .into_inner()
            .map_err(|e| anyhow::anyhow!("flushing CSV: {}", e.error()))
    }

    /// Appendix lines are written verbatim, unquoted.
    fn appendix(ctx: &WriteContext<'_>) -> Result<String, std::fmt::Error> {
        let mut out = String::new();

        if let Some(analysis) = ctx.analysis {
            out.push_str("\n\n--- ANÁLISIS INTELIGENTE ---\n");
            write!(out, "Resumen,{}\n\n", analysis.summary)?;

            out.push_str("TENDENCIAS\n");
            out.push_str("Variable,Tendencia,Confianza,Descripción\n");
            for trend in &analysis.trends {
                writeln!(
                    out,
                    "{},{},{},{}",
                    trend.variable,
                    trend.trend,
                    trend.confidence_percent(),
                    trend.description
                )?;
            }

            out.push_str("\nALERTAS\n");
            out.push_str("Tipo,Variable,Mensaje\n");
            for alert in &analysis.alerts {
                writeln!(out, "{},{},{}", alert.kind, alert.variable, alert.message)?;
            }

            out.push_str("\nRECOMENDACIONES\n");
            for rec in &analysis.recommendations {
                writeln!(out, "{rec}")?;
            }
        }

        if ctx.config.include_analysis && !ctx.stats.is_empty() {
            out.push_str("\n--- ESTADÍSTICAS ---\n");
            out.push_str("Columna,Mínimo,Máximo,Promedio\n");
            for s in ctx.stats {
                writeln!(out, "{},{:.2},{:.2},{:.2}", s.column, s.min, s.max, s.mean)?;
            }
        }

        Ok(out)
    }
}

impl ReportWriter for TabularWriter {
    fn content_type(&self) -> &'static str {
        "text/csv; charset=utf-8"
    }

    fn extension(&self) -> &'static str {
        "csv"
    }

    fn write(&self, ctx: &WriteContext<'_>) -> anyhow::Result<Vec<u8>> {
        let mut bytes = Self::rows(ctx)?;
        // The table ends with a record terminator; the appendix starts on its own
        if bytes.ends_with(b"\r\n") {
            bytes.truncate(bytes.len() - 2);
        }
        bytes.extend_from_slice(Self::appendix(ctx)?.as_bytes());
        Ok(bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::super::fixtures;
    use super::*;
    use crate::types::ReportFormat;

    fn write(include_analysis: bool, with_ai: bool) -> String {
        let mut config = fixtures::config(ReportFormat::Tabular);
        config.include_analysis = include_analysis;
        let dataset = fixtures::dataset();
        let stats = dataset.column_stats();
        let analysis = fixtures::analysis();
        let ctx = WriteContext {
            config: &config,
            dataset: &dataset,
            stats: &stats,
            analysis: with_ai.then_some(&analysis),
            site_name: "Río Claro - Pucón",
            generated_at: fixtures::generated_at(),
        };
        String::from_utf8(TabularWriter.write(&ctx).unwrap()).unwrap()
    }

    #[test]
    fn test_rows_only() {
        let text = write(false, false);
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(
            lines[0],
            "fecha,hora,flow_Estacion1,flow_Estacion2,level_Estacion1,level_Estacion2"
        );
        assert_eq!(lines[1], "01-04-2024,00:00:00,101.00,105.50,2.25,2.40");
        assert_eq!(lines.len(), 4);
        assert!(text.contains("\r\n"));
        assert!(!text.ends_with("\r\n"));
    }

    #[test]
    fn test_analysis_appendix_layout() {
        let text = write(false, true);
        assert!(text.contains("2.40\n\n--- ANÁLISIS INTELIGENTE ---\nResumen,Resumen de prueba\n\nTENDENCIAS\n"));
        assert!(text.contains("Variable,Tendencia,Confianza,Descripción\nFlujo,increasing,83%,Tendencia de prueba\n"));
        assert!(text.contains("\nALERTAS\nTipo,Variable,Mensaje\ncritical,Flujo,Valores anómalos en Flujo\n"));
        assert!(text.contains("\nRECOMENDACIONES\nConsiderar aumentar"));
        assert!(!text.contains("ESTADÍSTICAS"));
    }

    #[test]
    fn test_statistics_block() {
        let text = write(true, false);
        assert!(text.contains("--- ESTADÍSTICAS ---\nColumna,Mínimo,Máximo,Promedio\n"));
        assert!(text.contains("flow_Estacion1,101.00,103.00,102.00\n"));
    }
}
