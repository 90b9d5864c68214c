//! CSV and GeoJSON ingestion.
//!
//! Each loader resolves its columns through the candidate lists in
//! [`crate::columns`], skips rows that fail to parse (counting them), and
//! fails outright only when the file or a required column is missing.

use std::fs;
use std::path::Path;

use chrono::{NaiveDate, NaiveDateTime};
use csv::StringRecord;
use serde::Serialize;
use tracing::{info, warn};

use crate::aggregate::MonthlyRow;
use crate::columns::{
    DATE_COLUMN_CANDIDATES, DEPARTMENT_COLUMN_CANDIDATES, DEPARTMENT_FORECAST_CANDIDATES,
    FORECAST_COLUMN_CANDIDATES, first_other, position_of, resolve_candidate,
};
use crate::error::{DataError, Result};
use crate::reconcile::MetricRow;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SeriesPoint {
    pub date: NaiveDate,
    pub value: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ForecastPoint {
    pub date: NaiveDate,
    pub forecast: f64,
    pub lower_95: Option<f64>,
    pub upper_95: Option<f64>,
}

/// Parsed rows plus the row accounting printed after a load.
#[derive(Debug, Clone)]
pub struct Loaded<T> {
    pub rows: Vec<T>,
    pub total_rows: usize,
    pub skipped: usize,
}

/// Accepts plain dates, timestamps and year-month strings.
pub fn parse_date(raw: &str) -> Result<NaiveDate> {
    let s = raw.trim();
    for fmt in ["%Y-%m-%d", "%Y/%m/%d", "%d/%m/%Y"] {
        if let Ok(d) = NaiveDate::parse_from_str(s, fmt) {
            return Ok(d);
        }
    }
    for fmt in ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S"] {
        if let Ok(dt) = NaiveDateTime::parse_from_str(s, fmt) {
            return Ok(dt.date());
        }
    }
    NaiveDate::parse_from_str(&format!("{s}-01"), "%Y-%m-%d")
        .map_err(|_| DataError::BadDate(raw.to_string()))
}

fn parse_value(raw: Option<&str>) -> Option<f64> {
    let s = raw?.trim();
    if s.is_empty() {
        return None;
    }
    s.parse::<f64>().ok()
}

fn file_label(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

/// Read a whole input file, distinguishing a missing file from other I/O
/// failures.
pub fn read_file(path: &Path) -> Result<Vec<u8>> {
    if !path.exists() {
        return Err(DataError::MissingFile(path.to_path_buf()));
    }
    fs::read(path).map_err(|source| DataError::Io {
        path: path.to_path_buf(),
        source,
    })
}

pub fn parse_feature_collection(bytes: &[u8]) -> Result<serde_json::Value> {
    Ok(serde_json::from_slice(bytes)?)
}

pub fn load_feature_collection(path: &Path) -> Result<serde_json::Value> {
    parse_feature_collection(&read_file(path)?)
}

fn open(path: &Path) -> Result<(csv::Reader<fs::File>, StringRecord)> {
    if !path.exists() {
        return Err(DataError::MissingFile(path.to_path_buf()));
    }
    let mut rdr = csv::Reader::from_path(path)?;
    let headers = rdr.headers()?.clone();
    Ok((rdr, headers))
}

fn require<'a>(
    headers: &'a StringRecord,
    candidates: &[&str],
    what: &'static str,
    path: &Path,
) -> Result<&'a str> {
    resolve_candidate(headers.iter(), candidates).ok_or_else(|| DataError::MissingColumn {
        what,
        file: file_label(path),
    })
}

/// National monthly history: a date column plus the first other column as
/// the value.
pub fn load_national_series(path: &Path) -> Result<Loaded<SeriesPoint>> {
    let (mut rdr, headers) = open(path)?;
    let date_col = require(&headers, DATE_COLUMN_CANDIDATES, "date", path)?;
    let value_col = first_other(headers.iter(), DATE_COLUMN_CANDIDATES).ok_or_else(|| {
        DataError::MissingColumn {
            what: "value",
            file: file_label(path),
        }
    })?;
    let date_idx = position_of(&headers, date_col);
    let value_idx = position_of(&headers, value_col);

    let mut rows = Vec::new();
    let mut total_rows = 0;
    let mut skipped = 0;
    for result in rdr.records() {
        total_rows += 1;
        let record = match result {
            Ok(r) => r,
            Err(e) => {
                warn!(row = total_rows, error = %e, "CSV parse error");
                skipped += 1;
                continue;
            }
        };
        let date = date_idx.and_then(|i| record.get(i)).map(parse_date);
        let value = parse_value(value_idx.and_then(|i| record.get(i)));
        match (date, value) {
            (Some(Ok(date)), Some(value)) => rows.push(SeriesPoint { date, value }),
            _ => {
                warn!(row = total_rows, file = %file_label(path), "skipping unparseable row");
                skipped += 1;
            }
        }
    }
    rows.sort_by_key(|p| p.date);
    info!(file = %file_label(path), rows = rows.len(), skipped, "national series loaded");
    Ok(Loaded {
        rows,
        total_rows,
        skipped,
    })
}

/// National forecast with optional 95% interval columns. Uses `forecast`
/// when present, else the first column whose cells are all numeric.
pub fn load_national_forecast(path: &Path) -> Result<Loaded<ForecastPoint>> {
    let (mut rdr, headers) = open(path)?;
    let date_col = require(&headers, DATE_COLUMN_CANDIDATES, "date", path)?;
    let date_idx = position_of(&headers, date_col);

    let mut records = Vec::new();
    let mut skipped = 0;
    for (n, result) in rdr.records().enumerate() {
        match result {
            Ok(r) => records.push(r),
            Err(e) => {
                warn!(row = n + 1, error = %e, "CSV parse error");
                skipped += 1;
            }
        }
    }
    let total_rows = records.len() + skipped;

    let forecast_idx = match resolve_candidate(headers.iter(), FORECAST_COLUMN_CANDIDATES) {
        Some(col) => position_of(&headers, col),
        None => headers.iter().enumerate().position(|(i, h)| {
            Some(i) != date_idx
                && !DATE_COLUMN_CANDIDATES.iter().any(|d| h.eq_ignore_ascii_case(d))
                && !records.is_empty()
                && records
                    .iter()
                    .all(|r| r.get(i).is_some_and(|c| c.trim().is_empty() || c.trim().parse::<f64>().is_ok()))
        }),
    }
    .ok_or_else(|| DataError::MissingColumn {
        what: "numeric forecast",
        file: file_label(path),
    })?;
    let lower_idx = position_of(&headers, "lower_95");
    let upper_idx = position_of(&headers, "upper_95");

    let mut rows = Vec::new();
    for (n, record) in records.iter().enumerate() {
        let date = date_idx.and_then(|i| record.get(i)).map(parse_date);
        let forecast = parse_value(record.get(forecast_idx));
        match (date, forecast) {
            (Some(Ok(date)), Some(forecast)) => rows.push(ForecastPoint {
                date,
                forecast,
                lower_95: parse_value(lower_idx.and_then(|i| record.get(i))),
                upper_95: parse_value(upper_idx.and_then(|i| record.get(i))),
            }),
            _ => {
                warn!(row = n + 1, file = %file_label(path), "skipping unparseable row");
                skipped += 1;
            }
        }
    }
    rows.sort_by_key(|p| p.date);
    info!(file = %file_label(path), rows = rows.len(), skipped, "national forecast loaded");
    Ok(Loaded {
        rows,
        total_rows,
        skipped,
    })
}

/// Per-department forecast table (department name + predicted value).
pub fn load_department_forecast(path: &Path) -> Result<Loaded<MetricRow>> {
    let (mut rdr, headers) = open(path)?;
    let dept_idx = position_of(
        &headers,
        require(&headers, DEPARTMENT_COLUMN_CANDIDATES, "department", path)?,
    );
    let value_idx = position_of(
        &headers,
        require(&headers, DEPARTMENT_FORECAST_CANDIDATES, "department forecast", path)?,
    );

    let mut rows = Vec::new();
    let mut total_rows = 0;
    let mut skipped = 0;
    for result in rdr.records() {
        total_rows += 1;
        let Ok(record) = result else {
            skipped += 1;
            continue;
        };
        let name = dept_idx
            .and_then(|i| record.get(i))
            .map(str::trim)
            .filter(|s| !s.is_empty());
        match (name, parse_value(value_idx.and_then(|i| record.get(i)))) {
            (Some(name), Some(value)) => rows.push(MetricRow::new(name, value)),
            _ => {
                warn!(row = total_rows, file = %file_label(path), "skipping unparseable row");
                skipped += 1;
            }
        }
    }
    info!(file = %file_label(path), rows = rows.len(), skipped, "department forecast loaded");
    Ok(Loaded {
        rows,
        total_rows,
        skipped,
    })
}

/// Long-format monthly series by department: date, department and the
/// first remaining column as the value.
pub fn load_department_monthly(path: &Path) -> Result<Loaded<MonthlyRow>> {
    let (mut rdr, headers) = open(path)?;
    let date_col = require(&headers, DATE_COLUMN_CANDIDATES, "date", path)?;
    let dept_col = require(&headers, DEPARTMENT_COLUMN_CANDIDATES, "department", path)?;
    let value_col = headers
        .iter()
        .find(|h| *h != date_col && *h != dept_col)
        .ok_or_else(|| DataError::MissingColumn {
            what: "value",
            file: file_label(path),
        })?;
    let date_idx = position_of(&headers, date_col);
    let dept_idx = position_of(&headers, dept_col);
    let value_idx = position_of(&headers, value_col);

    let mut rows = Vec::new();
    let mut total_rows = 0;
    let mut skipped = 0;
    for result in rdr.records() {
        total_rows += 1;
        let Ok(record) = result else {
            skipped += 1;
            continue;
        };
        let date = date_idx.and_then(|i| record.get(i)).map(parse_date);
        let department = dept_idx
            .and_then(|i| record.get(i))
            .map(str::trim)
            .filter(|s| !s.is_empty());
        let value = parse_value(value_idx.and_then(|i| record.get(i)));
        match (date, department, value) {
            (Some(Ok(date)), Some(department), Some(value)) => rows.push(MonthlyRow {
                date,
                department: department.to_string(),
                value,
            }),
            _ => {
                warn!(row = total_rows, file = %file_label(path), "skipping unparseable row");
                skipped += 1;
            }
        }
    }
    info!(file = %file_label(path), rows = rows.len(), skipped, "department monthly series loaded");
    Ok(Loaded {
        rows,
        total_rows,
        skipped,
    })
}
