//! Result exports.
//!
//! - JSON: the whole [`FitSelection`] plus the optional bootstrap band, for
//!   downstream scripts
//! - CSV: one row per observed day (observed vs. fitted vs. band), meant to be
//!   easy to consume in spreadsheets

use std::fs::File;
use std::io::Write;
use std::path::Path;

use serde::Serialize;

use crate::domain::{BootstrapBand, TimeSeriesData};
use crate::error::AppError;
use crate::fit::FitSelection;

#[derive(Serialize)]
struct ExportDocument<'a> {
    project_name: &'a str,
    days: usize,
    selection: &'a FitSelection,
    band: Option<&'a BootstrapBand>,
}

pub fn write_selection_json(
    path: &Path,
    data: &TimeSeriesData,
    selection: &FitSelection,
    band: Option<&BootstrapBand>,
) -> Result<(), AppError> {
    let file = File::create(path)
        .map_err(|e| AppError::new(5, format!("Failed to create export JSON '{}': {e}", path.display())))?;
    to_json_writer(file, data, selection, band)
}

fn to_json_writer<W: Write>(
    writer: W,
    data: &TimeSeriesData,
    selection: &FitSelection,
    band: Option<&BootstrapBand>,
) -> Result<(), AppError> {
    let doc = ExportDocument {
        project_name: &data.project_name,
        days: data.len(),
        selection,
        band,
    };
    serde_json::to_writer_pretty(writer, &doc)
        .map_err(|e| AppError::new(5, format!("Failed to write export JSON: {e}")))
}

/// Per-day CSV of the recommended fit. Band columns are empty without a band.
pub fn write_fit_csv(
    path: &Path,
    data: &TimeSeriesData,
    selection: &FitSelection,
    band: Option<&BootstrapBand>,
) -> Result<(), AppError> {
    let file = File::create(path)
        .map_err(|e| AppError::new(5, format!("Failed to create export CSV '{}': {e}", path.display())))?;
    to_csv_writer(file, data, selection, band)
}

fn to_csv_writer<W: Write>(
    writer: W,
    data: &TimeSeriesData,
    selection: &FitSelection,
    band: Option<&BootstrapBand>,
) -> Result<(), AppError> {
    let io_err = |e: csv::Error| AppError::new(5, format!("Failed to write export CSV: {e}"));
    let mut w = csv::Writer::from_writer(writer);
    w.write_record([
        "day", "date", "observed", "predicted", "residual", "model", "lower", "median", "upper",
    ])
    .map_err(io_err)?;

    let best = &selection.best;
    let band = band.filter(|b| b.model == best.model);
    let observed = data.cumulative_found();
    for (i, y) in observed.iter().enumerate() {
        let day = i + 1;
        let fitted = best.predicted.get(i).copied();
        let cell = |v: Option<f64>| v.map(|v| format!("{v:.4}")).unwrap_or_default();
        let (lower, median, upper) = match band {
            Some(b) => (b.lower.get(i).copied(), b.median.get(i).copied(), b.upper.get(i).copied()),
            None => (None, None, None),
        };
        w.write_record([
            day.to_string(),
            data.date_for_day(day as u32).map(|d| d.to_string()).unwrap_or_default(),
            format!("{y:.4}"),
            cell(fitted),
            cell(fitted.map(|f| y - f)),
            best.display_name.clone(),
            cell(lower),
            cell(median),
            cell(upper),
        ])
        .map_err(io_err)?;
    }
    w.flush()
        .map_err(|e| AppError::new(5, format!("Failed to flush export CSV: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use crate::domain::{EngineConfig, ModelSet, OptimizerKind};
    use crate::fit::fit_and_select;

    fn fitted() -> (TimeSeriesData, FitSelection) {
        let data = TimeSeriesData::from_cumulative("exp", &[5.0, 12.0, 20.0, 26.0, 30.0, 32.0])
            .unwrap()
            .with_start_date(NaiveDate::from_ymd_opt(2025, 5, 1).unwrap());
        let selection = fit_and_select(
            &data,
            &ModelSet::basic(),
            OptimizerKind::NelderMead,
            &EngineConfig::default(),
        )
        .unwrap();
        (data, selection)
    }

    #[test]
    fn csv_has_one_row_per_day() {
        let (data, selection) = fitted();
        let band = BootstrapBand {
            model: selection.best.model,
            percentiles: [5.0, 95.0],
            lower: vec![1.0; 6],
            median: vec![2.0; 6],
            upper: vec![3.0; 6],
            iterations: 4,
            fallback_runs: 0,
        };
        let mut buf = Vec::new();
        to_csv_writer(&mut buf, &data, &selection, Some(&band)).unwrap();
        let text = String::from_utf8(buf).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 7);
        assert!(lines[0].starts_with("day,date,observed,predicted"));
        assert!(lines[1].starts_with("1,2025-05-01,5.0000,"));
        assert!(lines[6].ends_with(",1.0000,2.0000,3.0000"));
    }

    #[test]
    fn band_for_another_model_is_left_out() {
        let (data, selection) = fitted();
        let other = crate::domain::ModelKind::ALL
            .into_iter()
            .find(|m| *m != selection.best.model)
            .unwrap();
        let band = BootstrapBand {
            model: other,
            percentiles: [5.0, 95.0],
            lower: vec![1.0; 6],
            median: vec![2.0; 6],
            upper: vec![3.0; 6],
            iterations: 4,
            fallback_runs: 0,
        };
        let mut buf = Vec::new();
        to_csv_writer(&mut buf, &data, &selection, Some(&band)).unwrap();
        let text = String::from_utf8(buf).unwrap();
        assert!(text.lines().nth(1).unwrap().ends_with(",,,"));
    }

    #[test]
    fn json_round_trips_the_selection() {
        let (data, selection) = fitted();
        let mut buf = Vec::new();
        to_json_writer(&mut buf, &data, &selection, None).unwrap();
        let value: serde_json::Value = serde_json::from_slice(&buf).unwrap();
        assert_eq!(value["project_name"], "exp");
        assert_eq!(value["days"], 6);
        assert_eq!(
            value["selection"]["best"]["model"],
            serde_json::to_value(selection.best.model).unwrap()
        );
        assert_eq!(value["selection"]["fits"].as_array().unwrap().len(), selection.fits.len());
        assert!(value["band"].is_null());
    }
}
