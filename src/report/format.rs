//! Formatted terminal output.
//!
//! We keep formatting code in one place so:
//! - the fitting code stays free of presentation concerns
//! - output changes are localized (important for snapshot tests)

use crate::domain::{BootstrapBand, ConvergenceClass, FittingResult, OptimizerKind, TimeSeriesData};
use crate::fit::FitSelection;
use crate::report::{outcome_label, rank_by_aic};

/// Full run summary: dataset, ranked model table, recommendation.
pub fn format_run_summary(
    data: &TimeSeriesData,
    selection: &FitSelection,
    optimizer: OptimizerKind,
    band: Option<&BootstrapBand>,
) -> String {
    let mut out = String::new();

    out.push_str("=== defect - growth curve fit ===\n");
    out.push_str(&format!("Project: {}\n", data.project_name));
    let last = data.cumulative_found().last().copied().unwrap_or(0.0);
    let span = match (data.date_for_day(1), data.date_for_day(data.len() as u32)) {
        (Some(first), Some(end)) => format!(" ({first} .. {end})"),
        _ => String::new(),
    };
    out.push_str(&format!(
        "Observed: {} days{span} | defects found={last:.0}\n",
        data.len()
    ));
    out.push_str(&format!("Optimizer: {}\n", optimizer.display_name()));

    out.push_str("\nModel diagnostics:\n");
    out.push_str(&format_model_table(selection));
    for (kind, reason) in &selection.failed {
        out.push_str(&format!("  (failed {}) {reason}\n", kind.display_name()));
    }

    let best = &selection.best;
    out.push_str("\nRecommended model:\n");
    out.push_str(&format!("- {} [{}]\n", best.display_name, best.category.display_name()));
    out.push_str(&format!("- params: {}\n", fmt_params(best)));
    out.push_str(&format!(
        "- R2={:.4} AIC={:.3} BIC={:.3} RMSE={:.3}\n",
        best.quality.r_squared, best.quality.aic, best.quality.bic, best.quality.rmse
    ));
    out.push_str(&format!(
        "- estimated total defects: {:.1} ({:.1} remaining)\n",
        best.estimated_total,
        (best.estimated_total - last).max(0.0)
    ));
    for p in &best.predictions {
        out.push_str(&format!("- {:.0}% found: {}\n", p.threshold * 100.0, outcome_label(p)));
    }
    if let Some(d) = &best.optimization.diagnostics {
        out.push_str(&format!(
            "- convergence: {} (|grad|={:.2e}, {} bound(s) active)\n",
            class_label(d.class),
            d.gradient_norm,
            d.at_lower.iter().chain(&d.at_upper).filter(|b| **b).count()
        ));
    }

    if let Some(band) = band {
        out.push('\n');
        out.push_str(&format_band_summary(band));
    }

    out
}

/// One row per attempted model, best AIC first. `*` marks the recommendation.
pub fn format_model_table(selection: &FitSelection) -> String {
    let mut out = String::new();
    let thresholds: Vec<f64> = selection.best.predictions.iter().map(|p| p.threshold).collect();

    let mut header = format!(
        "  {:<20} {:<14} {:>8} {:>10} {:>9}",
        "model", "category", "R2", "AIC", "total"
    );
    for t in &thresholds {
        header.push_str(&format!(" {:>18}", format!("{:.0}%", t * 100.0)));
    }
    header.push_str(&format!(" {:<12}", "convergence"));
    out.push_str(header.trim_end());
    out.push('\n');

    for fit in rank_by_aic(selection) {
        let chosen = if fit.model == selection.best.model { "*" } else { " " };
        let mut row = format!(
            "{chosen} {:<20} {:<14} ",
            truncate(&fit.display_name, 20),
            truncate(fit.category.display_name(), 14),
        );
        if fit.success {
            row.push_str(&format!(
                "{:>8.4} {:>10.3} {:>9.1}",
                fit.quality.r_squared, fit.quality.aic, fit.estimated_total
            ));
            for t in &thresholds {
                let label = fit
                    .predictions
                    .iter()
                    .find(|p| p.threshold == *t)
                    .map(outcome_label)
                    .unwrap_or_default();
                row.push_str(&format!(" {:>18}", truncate(&label, 18)));
            }
            let class = fit
                .optimization
                .diagnostics
                .as_ref()
                .map(|d| class_label(d.class))
                .unwrap_or("-");
            row.push_str(&format!(" {class:<12}"));
        } else {
            row.push_str(&format!("{:>8} {:>10} {:>9}", "-", "-", "-"));
            row.push_str(" failed");
        }
        out.push_str(row.trim_end());
        out.push('\n');
    }

    out
}

pub fn format_band_summary(band: &BootstrapBand) -> String {
    let [lo, hi] = band.percentiles;
    let mut out = format!(
        "Bootstrap band ({} runs, {} fell back to the fitted curve): p{lo}..p{hi}\n",
        band.iterations, band.fallback_runs
    );
    if let (Some(l), Some(m), Some(u)) = (band.lower.last(), band.median.last(), band.upper.last()) {
        out.push_str(&format!("- last day: {l:.1} <= {m:.1} <= {u:.1}\n"));
    }
    out
}

fn class_label(class: ConvergenceClass) -> &'static str {
    match class {
        ConvergenceClass::Good => "good",
        ConvergenceClass::Acceptable => "acceptable",
        ConvergenceClass::Questionable => "questionable",
        ConvergenceClass::Poor => "poor",
    }
}

fn fmt_params(fit: &FittingResult) -> String {
    let parts: Vec<String> = fit
        .param_names
        .iter()
        .zip(&fit.params)
        .map(|(n, v)| format!("{n}={v:.6}"))
        .collect();
    format!("[{}]", parts.join(", "))
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        return s.to_string();
    }
    let mut out: String = s.chars().take(max.saturating_sub(1)).collect();
    out.push('.');
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{EngineConfig, ModelSet};
    use crate::fit::fit_and_select;

    fn selection() -> (TimeSeriesData, FitSelection) {
        let data = TimeSeriesData::from_cumulative(
            "alpha",
            &[8.0, 20.0, 35.0, 45.0, 52.0, 58.0, 62.0, 64.0, 65.0, 65.0],
        )
        .unwrap();
        let mut config = EngineConfig::default();
        config.optimizer.seed = Some(5);
        let selection = fit_and_select(&data, &ModelSet::basic(), OptimizerKind::NelderMead, &config).unwrap();
        (data, selection)
    }

    #[test]
    fn table_lists_every_model_with_best_marked() {
        let (_, selection) = selection();
        let table = format_model_table(&selection);
        let lines: Vec<&str> = table.lines().collect();
        assert_eq!(lines.len(), 1 + selection.fits.len());
        assert!(lines[0].contains("90%") && lines[0].contains("99%"));
        assert!(lines[1].starts_with("* "));
        assert!(lines[1].contains(&truncate(&selection.best.display_name, 20)));
        assert_eq!(lines.iter().filter(|l| l.starts_with("* ")).count(), 1);
    }

    #[test]
    fn summary_mentions_recommendation_and_band() {
        let (data, selection) = selection();
        let band = BootstrapBand {
            model: selection.best.model,
            percentiles: [2.5, 97.5],
            lower: vec![60.0],
            median: vec![65.0],
            upper: vec![70.0],
            iterations: 10,
            fallback_runs: 1,
        };
        let txt = format_run_summary(&data, &selection, OptimizerKind::NelderMead, Some(&band));
        assert!(txt.contains("Project: alpha"));
        assert!(txt.contains("Observed: 10 days"));
        assert!(txt.contains("Recommended model:"));
        assert!(txt.contains("estimated total defects"));
        assert!(txt.contains("Bootstrap band (10 runs, 1 fell back"));
        assert!(txt.contains("60.0 <= 65.0 <= 70.0"));
    }

    #[test]
    fn truncate_marks_cut() {
        assert_eq!(truncate("abc", 5), "abc");
        assert_eq!(truncate("abcdefgh", 5), "abcd.");
    }
}
