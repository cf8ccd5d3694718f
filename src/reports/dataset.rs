//! Mock report rows shared by every writer, plus per-column statistics.

use crate::types::ReportConfig;
use anyhow::anyhow;
use chrono::Duration;
use rand::Rng;
use serde::Serialize;
use statrs::statistics::Statistics;

/// Station factor applied to the baseline for Estación 2.
const STATION2_FACTOR: f64 = 1.05;

/// One day of generated values.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DatasetRow {
    /// `dd-mm-yyyy`
    pub fecha: String,
    /// `HH:MM:SS`
    pub hora: String,
    /// One value per value column, rounded to two decimals
    pub values: Vec<f64>,
}

impl DatasetRow {
    /// All cells as text, in column order.
    pub fn record(&self) -> Vec<String> {
        let mut cells = Vec::with_capacity(self.values.len() + 2);
        cells.push(self.fecha.clone());
        cells.push(self.hora.clone());
        cells.extend(self.values.iter().map(|v| format!("{v:.2}")));
        cells
    }
}

/// Min/max/mean of one value column.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ColumnStats {
    pub column: String,
    pub min: f64,
    pub max: f64,
    pub mean: f64,
}

/// Tabular data every artifact is built from.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReportDataset {
    /// `fecha`, `hora`, then `<id>_Estacion1`, `<id>_Estacion2` per
    /// selected variable in catalog order
    pub columns: Vec<String>,
    pub rows: Vec<DatasetRow>,
}

/// Baseline and noise amplitude for a variable on day `i`.
fn baseline(variable_id: &str, i: f64) -> (f64, f64) {
    match variable_id {
        "flow" | "flujo" => (100.0 + (i / 10.0).sin() * 15.0, 20.0),
        "level" | "nivel" => (2.5 + (i / 8.0).cos() * 0.5, 0.2),
        "discharge" | "caudal" => (1500.0 + (i / 12.0).sin() * 200.0, 100.0),
        "velocity" | "velocidad" => (1.8 + (i / 6.0).cos() * 0.3, 0.1),
        "temperature" | "temperatura" => (12.5 + (i / 15.0).sin() * 3.0, 1.0),
        _ => (100.0, 20.0),
    }
}

fn round2(v: f64) -> f64 {
    (v * 100.0).round() / 100.0
}

impl ReportDataset {
    /// One row per day from `date_range.start` through the end, inclusive
    /// (`ceil(days) + 1` rows). Fails if a row date falls outside the
    /// representable calendar.
    pub fn build(config: &ReportConfig, rng: &mut impl Rng) -> anyhow::Result<Self> {
        let selected: Vec<&str> = config.selected_variables().map(|v| v.id.as_str()).collect();

        let mut columns = vec!["fecha".to_string(), "hora".to_string()];
        for id in &selected {
            columns.push(format!("{id}_Estacion1"));
            columns.push(format!("{id}_Estacion2"));
        }

        let start = config.date_range.start;
        let span_ms = (config.date_range.end - start).num_milliseconds().max(0);
        let day_ms = Duration::days(1).num_milliseconds();
        let days = (span_ms + day_ms - 1) / day_ms;

        let rows = (0..=days)
            .map(|day| {
                let date = Duration::try_days(day)
                    .and_then(|offset| start.checked_add_signed(offset))
                    .ok_or_else(|| anyhow!("fecha fuera de rango: {start} + {day} días"))?;
                let i = day as f64;
                let mut values = Vec::with_capacity(selected.len() * 2);
                for id in &selected {
                    let (base, variation) = baseline(id, i);
                    let half = variation / 2.0;
                    values.push(round2(base + rng.gen_range(-half..half)));
                    values.push(round2(base * STATION2_FACTOR + rng.gen_range(-half..half)));
                }
                Ok(DatasetRow {
                    fecha: date.format("%d-%m-%Y").to_string(),
                    hora: date.format("%H:%M:%S").to_string(),
                    values,
                })
            })
            .collect::<anyhow::Result<Vec<_>>>()?;

        Ok(Self { columns, rows })
    }

    /// Column names of the numeric cells.
    pub fn value_columns(&self) -> &[String] {
        &self.columns[2.min(self.columns.len())..]
    }

    /// Every value of value column `idx`, in row order.
    pub fn column_values(&self, idx: usize) -> Vec<f64> {
        self.rows
            .iter()
            .filter_map(|r| r.values.get(idx).copied())
            .collect()
    }

    pub fn column_stats(&self) -> Vec<ColumnStats> {
        self.value_columns()
            .iter()
            .enumerate()
            .map(|(idx, column)| {
                let values = self.column_values(idx);
                ColumnStats {
                    column: column.clone(),
                    min: Statistics::min(values.iter()),
                    max: Statistics::max(values.iter()),
                    mean: Statistics::mean(values.iter()),
                }
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{default_report_variables, DateRange, ReportFormat};
    use chrono::{TimeZone, Utc};
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn config(days: i64) -> ReportConfig {
        let start = Utc.with_ymd_and_hms(2024, 5, 1, 9, 30, 0).unwrap();
        ReportConfig {
            variables: default_report_variables(),
            format: ReportFormat::Tabular,
            date_range: DateRange {
                start,
                end: start + Duration::days(days),
            },
            include_charts: false,
            include_analysis: false,
            ai_analysis: false,
        }
    }

    #[test]
    fn test_columns_follow_selected_variables() {
        let dataset = ReportDataset::build(&config(3), &mut StdRng::seed_from_u64(1)).unwrap();
        assert_eq!(
            dataset.columns,
            vec![
                "fecha",
                "hora",
                "flow_Estacion1",
                "flow_Estacion2",
                "level_Estacion1",
                "level_Estacion2"
            ]
        );
        assert_eq!(dataset.value_columns().len(), 4);
    }

    #[test]
    fn test_one_row_per_day_inclusive() {
        let dataset = ReportDataset::build(&config(6), &mut StdRng::seed_from_u64(1)).unwrap();
        assert_eq!(dataset.rows.len(), 7);
        assert_eq!(dataset.rows[0].fecha, "01-05-2024");
        assert_eq!(dataset.rows[0].hora, "09:30:00");
        assert_eq!(dataset.rows[6].fecha, "07-05-2024");
    }

    #[test]
    fn test_partial_day_rounds_up() {
        let mut cfg = config(0);
        cfg.date_range.end = cfg.date_range.start + Duration::hours(30);
        let dataset = ReportDataset::build(&cfg, &mut StdRng::seed_from_u64(1)).unwrap();
        assert_eq!(dataset.rows.len(), 3);
    }

    #[test]
    fn test_values_stay_within_noise_band() {
        let dataset = ReportDataset::build(&config(30), &mut StdRng::seed_from_u64(9)).unwrap();
        for row in &dataset.rows {
            // flow station 1: 100 ± 15 ± 10
            assert!((75.0..=125.0).contains(&row.values[0]));
            // level station 1: 2.5 ± 0.5 ± 0.1
            assert!((1.9..=3.1).contains(&row.values[2]));
            assert_eq!(row.record().len(), 6);
        }
    }

    #[test]
    fn test_rows_past_the_calendar_end_are_an_error() {
        let mut cfg = config(0);
        cfg.date_range.end = chrono::DateTime::<Utc>::MAX_UTC;
        cfg.date_range.start = cfg.date_range.end - Duration::hours(12);

        let err = ReportDataset::build(&cfg, &mut StdRng::seed_from_u64(1)).unwrap_err();
        assert!(err.to_string().contains("fuera de rango"), "{err}");
    }

    #[test]
    fn test_column_stats() {
        let dataset = ReportDataset {
            columns: vec!["fecha".into(), "hora".into(), "flow_Estacion1".into()],
            rows: [1.0, 2.0, 6.0]
                .iter()
                .map(|&v| DatasetRow {
                    fecha: "01-01-2024".into(),
                    hora: "00:00:00".into(),
                    values: vec![v],
                })
                .collect(),
        };
        let stats = dataset.column_stats();
        assert_eq!(stats.len(), 1);
        assert_eq!(stats[0].min, 1.0);
        assert_eq!(stats[0].max, 6.0);
        assert!((stats[0].mean - 3.0).abs() < 1e-12);
    }
}
