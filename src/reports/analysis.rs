//! Analysis synthesizer: trend labels, confidences, alerts and the fixed
//! recommendation list embedded into report artifacts.

use crate::config::defaults;
use crate::types::{
    AlertKind, AnalysisAlert, AnalysisResult, ReportConfig, TrendDirection, TrendInsight,
};
use rand::Rng;

pub const RECOMMENDATIONS: [&str; 4] = [
    "Considerar aumentar la frecuencia de monitoreo durante períodos de alta variabilidad.",
    "Implementar alertas automáticas para valores que excedan los umbrales establecidos.",
    "Realizar calibración de sensores basada en los patrones detectados.",
    "Evaluar la correlación entre variables para optimizar el sistema de monitoreo.",
];

/// Two successive coin flips: increasing 1/2, decreasing 1/4, stable 1/4.
fn draw_trend(rng: &mut impl Rng) -> TrendDirection {
    if rng.gen::<f64>() > 0.5 {
        TrendDirection::Increasing
    } else if rng.gen::<f64>() > 0.5 {
        TrendDirection::Decreasing
    } else {
        TrendDirection::Stable
    }
}

/// Build the analysis for the selected variables of `config`.
pub fn synthesize(config: &ReportConfig, rng: &mut impl Rng) -> AnalysisResult {
    let selected: Vec<_> = config.selected_variables().collect();

    let trends = selected
        .iter()
        .map(|variable| TrendInsight {
            variable: variable.name.clone(),
            trend: draw_trend(rng),
            confidence: rng.gen_range(defaults::MIN_TREND_CONFIDENCE..1.0),
            description: format!(
                "Análisis de tendencia para {} basado en datos históricos y patrones estacionales.",
                variable.name
            ),
        })
        .collect();

    let mut alerts = Vec::new();
    for variable in &selected {
        if !rng.gen_bool(defaults::ALERT_PROBABILITY) {
            continue;
        }
        let kind = if rng.gen_bool(0.5) {
            AlertKind::Warning
        } else {
            AlertKind::Critical
        };
        alerts.push(AnalysisAlert {
            kind,
            message: format!(
                "Se detectaron valores anómalos en {} durante el período seleccionado.",
                variable.name
            ),
            variable: variable.name.clone(),
        });
    }

    let summary = format!(
        "Análisis inteligente de {} variables durante el período {} - {}. Se procesaron datos de 2 estaciones de monitoreo con algoritmos de machine learning para detectar patrones y anomalías.",
        selected.len(),
        config.date_range.start.format("%d-%m-%Y"),
        config.date_range.end.format("%d-%m-%Y"),
    );

    AnalysisResult {
        summary,
        trends,
        recommendations: RECOMMENDATIONS.iter().map(|r| r.to_string()).collect(),
        alerts,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{default_report_variables, DateRange, ReportFormat};
    use chrono::{TimeZone, Utc};
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn config() -> ReportConfig {
        let mut variables = default_report_variables();
        variables[2].selected = true;
        ReportConfig {
            variables,
            format: ReportFormat::Document,
            date_range: DateRange {
                start: Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
                end: Utc.with_ymd_and_hms(2024, 1, 31, 0, 0, 0).unwrap(),
            },
            include_charts: false,
            include_analysis: true,
            ai_analysis: true,
        }
    }

    #[test]
    fn test_one_trend_per_selected_variable() {
        let result = synthesize(&config(), &mut StdRng::seed_from_u64(11));
        let names: Vec<_> = result.trends.iter().map(|t| t.variable.as_str()).collect();
        assert_eq!(names, vec!["Flujo", "Nivel", "Caudal"]);
        for trend in &result.trends {
            assert!((0.7..1.0).contains(&trend.confidence));
            assert!(trend.description.contains(&trend.variable));
        }
    }

    #[test]
    fn test_alerts_only_for_selected_variables() {
        for seed in 0..50 {
            let result = synthesize(&config(), &mut StdRng::seed_from_u64(seed));
            assert!(result.alerts.len() <= 3);
            for alert in &result.alerts {
                assert!(["Flujo", "Nivel", "Caudal"].contains(&alert.variable.as_str()));
                assert_ne!(alert.kind, AlertKind::Info);
            }
        }
    }

    #[test]
    fn test_summary_and_recommendations() {
        let result = synthesize(&config(), &mut StdRng::seed_from_u64(5));
        assert!(result.summary.starts_with("Análisis inteligente de 3 variables"));
        assert!(result.summary.contains("01-01-2024 - 31-01-2024"));
        assert_eq!(result.recommendations.len(), 4);
        assert_eq!(result.recommendations[0], RECOMMENDATIONS[0]);
    }

    #[test]
    fn test_trend_draw_covers_every_label() {
        let mut rng = StdRng::seed_from_u64(2);
        let mut seen = std::collections::HashSet::new();
        for _ in 0..200 {
            seen.insert(draw_trend(&mut rng));
        }
        assert_eq!(seen.len(), 3);
    }
}
