//! CSV/JSON ingest and validation.
//!
//! This module turns a daily test log into a validated [`TimeSeriesData`].
//!
//! CSV schema (header required, case-insensitive, any column order):
//!
//! | column           | required | meaning                         |
//! |------------------|----------|---------------------------------|
//! | `defects_found`  | yes      | defects discovered that day     |
//! | `date`           | no       | calendar date of the record     |
//! | `planned_effort` | no       | planned test effort             |
//! | `actual_effort`  | no       | executed test effort            |
//! | `defects_fixed`  | no       | defects closed that day         |
//!
//! Empty optional cells mean "not recorded" and load as `0`. Unlike a point
//! cloud, a time series cannot skip a bad row without shifting every later
//! day, so any malformed row is an error (exit code 2) naming its line.
//!
//! JSON input is the serialized `TimeSeriesData` itself.

use std::collections::HashMap;
use std::fs::File;
use std::io::Read;
use std::path::Path;

use chrono::NaiveDate;
use csv::StringRecord;
use tracing::info;

use crate::domain::{DailyRecord, TimeSeriesData};
use crate::error::AppError;

/// Load a series, choosing the parser from the file extension (`.json` or CSV).
///
/// `project_name` overrides the name stored in (or derived from) the file.
pub fn load_series(path: &Path, project_name: Option<&str>) -> Result<TimeSeriesData, AppError> {
    let file = File::open(path)
        .map_err(|e| AppError::new(5, format!("Failed to open input '{}': {e}", path.display())))?;
    let is_json = path
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("json"));

    let mut data = if is_json {
        read_json(file)?
    } else {
        let stem = path
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("project");
        read_csv(file, stem)?
    };
    if let Some(name) = project_name {
        data.project_name = name.to_string();
    }

    info!(
        path = %path.display(),
        project = %data.project_name,
        days = data.len(),
        "series loaded"
    );
    Ok(data)
}

pub fn read_json<R: Read>(reader: R) -> Result<TimeSeriesData, AppError> {
    let data: TimeSeriesData = serde_json::from_reader(reader)
        .map_err(|e| AppError::new(2, format!("Failed to parse series JSON: {e}")))?;
    data.validate()?;
    check_dates(&data.records)?;
    Ok(data)
}

pub fn read_csv<R: Read>(reader: R, project_name: &str) -> Result<TimeSeriesData, AppError> {
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(reader);

    let headers = reader
        .headers()
        .map_err(|e| AppError::new(2, format!("Failed to read CSV headers: {e}")))?
        .clone();
    let header_map = build_header_map(&headers);
    if !header_map.contains_key("defects_found") {
        return Err(AppError::new(2, "Missing required column: `defects_found`"));
    }

    let mut records = Vec::new();
    for (idx, result) in reader.records().enumerate() {
        // +2: records() starts after the header and lines are 1-based.
        let line = idx + 2;
        let record = result.map_err(|e| AppError::new(2, format!("CSV parse error on line {line}: {e}")))?;
        if record.iter().all(|cell| cell.trim().is_empty()) {
            continue;
        }
        let row = parse_row(&record, &header_map)
            .map_err(|e| AppError::new(2, format!("Line {line}: {e}")))?;
        records.push(row);
    }

    if records.is_empty() {
        return Err(AppError::new(2, "CSV contains no data rows."));
    }
    check_dates(&records)?;

    let start_date = records.first().and_then(|r| r.date);
    let mut data = TimeSeriesData::new(project_name, records)?;
    data.start_date = start_date;
    Ok(data)
}

fn build_header_map(headers: &StringRecord) -> HashMap<String, usize> {
    headers
        .iter()
        .enumerate()
        .map(|(idx, name)| (normalize_header_name(name), idx))
        .collect()
}

fn normalize_header_name(name: &str) -> String {
    // Spreadsheet exports sometimes prefix the first header with a UTF-8 BOM.
    name.trim().trim_start_matches('\u{feff}').to_ascii_lowercase()
}

fn parse_row(record: &StringRecord, header_map: &HashMap<String, usize>) -> Result<DailyRecord, String> {
    let defects_found = get_optional(record, header_map, "defects_found")
        .ok_or_else(|| "Missing `defects_found` value.".to_string())
        .and_then(|s| parse_count(s, "defects_found"))?;
    let date = get_optional(record, header_map, "date").map(parse_date).transpose()?;

    let optional = |name: &str| -> Result<f64, String> {
        get_optional(record, header_map, name).map_or(Ok(0.0), |s| parse_count(s, name))
    };

    Ok(DailyRecord {
        date,
        planned_effort: optional("planned_effort")?,
        actual_effort: optional("actual_effort")?,
        defects_found,
        defects_fixed: optional("defects_fixed")?,
    })
}

/// Dates, when present, must be strictly increasing.
fn check_dates(records: &[DailyRecord]) -> Result<(), AppError> {
    let mut prev: Option<NaiveDate> = None;
    for (i, r) in records.iter().enumerate() {
        if let Some(d) = r.date {
            if prev.is_some_and(|p| d <= p) {
                return Err(AppError::new(
                    2,
                    format!("Day {} has date {d}, which does not follow the previous record.", i + 1),
                ));
            }
            prev = Some(d);
        }
    }
    Ok(())
}

fn get_optional<'a>(record: &'a StringRecord, header_map: &HashMap<String, usize>, name: &str) -> Option<&'a str> {
    let idx = header_map.get(name)?;
    record.get(*idx).map(str::trim).filter(|s| !s.is_empty())
}

fn parse_count(s: &str, column: &str) -> Result<f64, String> {
    match s.parse::<f64>() {
        Ok(v) if v.is_finite() && v >= 0.0 => Ok(v),
        _ => Err(format!("Invalid `{column}` value '{s}'; expected a non-negative number.")),
    }
}

fn parse_date(s: &str) -> Result<NaiveDate, String> {
    // ISO dates are preferred; a few common spreadsheet formats are accepted too.
    const FMTS: [&str; 4] = ["%Y-%m-%d", "%d/%m/%Y", "%d-%m-%Y", "%Y/%m/%d"];
    for fmt in FMTS {
        if let Ok(d) = NaiveDate::parse_from_str(s, fmt) {
            return Ok(d);
        }
    }
    Err(format!(
        "Invalid date '{s}'. Expected one of: YYYY-MM-DD, DD/MM/YYYY, DD-MM-YYYY, YYYY/MM/DD."
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn csv_with_all_columns() {
        let csv = "\u{feff}Date,planned_effort,actual_effort,defects_found,defects_fixed\n\
                   2025-01-06,8,7.5,4,1\n\
                   07/01/2025,8,8,6,3\n\
                   2025-01-08,8,,2,\n";
        let data = read_csv(csv.as_bytes(), "p").unwrap();
        assert_eq!(data.len(), 3);
        assert_eq!(data.cumulative_found(), vec![4.0, 10.0, 12.0]);
        assert_eq!(data.records[2].actual_effort, 0.0);
        assert_eq!(data.start_date, NaiveDate::from_ymd_opt(2025, 1, 6));
        assert_eq!(data.date_for_day(3), NaiveDate::from_ymd_opt(2025, 1, 8));
    }

    #[test]
    fn counts_only_csv_and_blank_lines() {
        let csv = "defects_found\n3\n\n5\n";
        let data = read_csv(csv.as_bytes(), "p").unwrap();
        assert_eq!(data.len(), 2);
        assert_eq!(data.start_date, None);
    }

    #[test]
    fn malformed_rows_name_their_line() {
        let err = read_csv("defects_found\n3\n-1\n".as_bytes(), "p").unwrap_err();
        assert_eq!(err.exit_code(), 2);
        assert!(err.message().starts_with("Line 3:"), "{}", err.message());

        let err = read_csv("date,defects_found\n2025-01-02,1\n2025-01-01,1\n".as_bytes(), "p").unwrap_err();
        assert!(err.message().contains("Day 2"));

        assert!(read_csv("defects\n1\n".as_bytes(), "p").is_err());
        assert!(read_csv("defects_found\n".as_bytes(), "p").is_err());
    }

    #[test]
    fn json_series() {
        let json = r#"{
            "project_name": "web",
            "start_date": "2025-02-01",
            "total_test_cases": 400,
            "records": [
                {"defects_found": 2, "actual_effort": 6},
                {"defects_found": 5}
            ]
        }"#;
        let data = read_json(json.as_bytes()).unwrap();
        assert_eq!(data.project_name, "web");
        assert_eq!(data.total_test_cases, Some(400));
        assert_eq!(data.cumulative_found(), vec![2.0, 7.0]);
        assert_eq!(data.date_for_day(2), NaiveDate::from_ymd_opt(2025, 2, 2));

        assert_eq!(read_json(r#"{"project_name": "x", "records": []}"#.as_bytes()).unwrap_err().exit_code(), 2);
    }

    #[test]
    fn missing_file_is_io_error() {
        let err = load_series(Path::new("/definitely/not/here.csv"), None).unwrap_err();
        assert_eq!(err.exit_code(), 5);
    }
}
