//! Plain-text document report.

use super::{ReportWriter, WriteContext};
use crate::metrics::render_blocks;
use std::fmt::Write as _;
use tabled::builder::Builder;
use tabled::settings::Style;

#[derive(Debug, Clone, Copy, Default)]
pub struct DocumentWriter;

impl DocumentWriter {
    fn render(&self, ctx: &WriteContext<'_>) -> Result<String, std::fmt::Error> {
        let mut out = String::new();

        writeln!(out, "Reporte de Monitoreo Hídrico")?;
        writeln!(out, "{}", ctx.site_name)?;
        writeln!(out, "Período: {}", ctx.period())?;
        writeln!(out, "Generado: {}", ctx.generated_at.format("%d-%m-%Y %H:%M:%S"))?;
        writeln!(out)?;

        writeln!(out, "Variables Monitoreadas:")?;
        for variable in ctx.config.selected_variables() {
            writeln!(out, "  • {} ({})", variable.name, variable.unit)?;
        }
        writeln!(out)?;

        if let Some(analysis) = ctx.analysis {
            writeln!(out, "Análisis Inteligente:")?;
            writeln!(out, "{}", analysis.summary)?;
            writeln!(out)?;

            if !analysis.trends.is_empty() {
                writeln!(out, "Tendencias Detectadas:")?;
                for trend in &analysis.trends {
                    writeln!(
                        out,
                        "  {}: {} ({} confianza)",
                        trend.variable,
                        trend.trend,
                        trend.confidence_percent()
                    )?;
                }
                writeln!(out)?;
            }

            if !analysis.alerts.is_empty() {
                writeln!(out, "Alertas:")?;
                for alert in &analysis.alerts {
                    writeln!(out, "  [{}] {}", alert.kind, alert.message)?;
                }
                writeln!(out)?;
            }
        }

        if ctx.config.include_analysis && !ctx.stats.is_empty() {
            writeln!(out, "Estadísticas:")?;
            for s in ctx.stats {
                writeln!(
                    out,
                    "  {}: mín {:.2}, máx {:.2}, promedio {:.2}",
                    s.column, s.min, s.max, s.mean
                )?;
            }
            writeln!(out)?;
        }

        if ctx.config.include_charts {
            writeln!(out, "Gráficos:")?;
            for (idx, column) in ctx.dataset.value_columns().iter().enumerate() {
                let values = ctx.dataset.column_values(idx);
                writeln!(out, "  {column:<24} {}", render_blocks(&values))?;
            }
            writeln!(out)?;
        }

        let mut builder = Builder::default();
        builder.push_record(ctx.dataset.columns.iter().cloned());
        for row in &ctx.dataset.rows {
            builder.push_record(row.record());
        }
        let mut table = builder.build();
        table.with(Style::psql());
        writeln!(out, "{table}")?;

        Ok(out)
    }
}

impl ReportWriter for DocumentWriter {
    fn content_type(&self) -> &'static str {
        "text/plain; charset=utf-8"
    }

    fn extension(&self) -> &'static str {
        "txt"
    }

    fn write(&self, ctx: &WriteContext<'_>) -> anyhow::Result<Vec<u8>> {
        Ok(self.render(ctx)?.into_bytes())
    }
}
