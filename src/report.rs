//! Terminal previews and file exports handed to the rendering layer.

use std::collections::{BTreeMap, HashMap};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use chrono::NaiveDate;
use serde::Serialize;
use serde_json::Value;
use tabled::settings::Style;
use tabled::{Table, Tabled};

use crate::error::{DataError, Result};
use crate::geo::{CANONICAL_KEY_PROPERTY, GeoRegistry};
use crate::loader::{ForecastPoint, SeriesPoint};
use crate::reconcile::{JoinedMapRow, MetricRow, Reconciliation};
use crate::util::{format_number, format_optional};

/// One date of the combined national history/forecast chart.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NationalRow {
    pub date: NaiveDate,
    pub hist: Option<f64>,
    pub forecast: Option<f64>,
    pub lower_95: Option<f64>,
    pub upper_95: Option<f64>,
}

/// Outer-join history and forecast on date, sorted ascending.
pub fn combine_national(series: &[SeriesPoint], forecast: &[ForecastPoint]) -> Vec<NationalRow> {
    let mut by_date: BTreeMap<NaiveDate, NationalRow> = BTreeMap::new();
    let blank = |date| NationalRow {
        date,
        hist: None,
        forecast: None,
        lower_95: None,
        upper_95: None,
    };
    for p in series {
        by_date.entry(p.date).or_insert_with(|| blank(p.date)).hist = Some(p.value);
    }
    for p in forecast {
        let row = by_date.entry(p.date).or_insert_with(|| blank(p.date));
        row.forecast = Some(p.forecast);
        row.lower_95 = p.lower_95;
        row.upper_95 = p.upper_95;
    }
    by_date.into_values().collect()
}

/// Highest `n` departments by value, descending.
pub fn top_departments(rows: &[MetricRow], n: usize) -> Vec<&MetricRow> {
    let mut sorted: Vec<&MetricRow> = rows.iter().collect();
    sorted.sort_by(|a, b| b.value.total_cmp(&a.value));
    sorted.truncate(n);
    sorted
}

/// Joined rows ordered for display: value descending, then key.
pub fn map_rows(rec: &Reconciliation) -> Vec<&JoinedMapRow> {
    let mut rows: Vec<&JoinedMapRow> = rec.joined.iter().collect();
    rows.sort_by(|a, b| {
        b.value
            .total_cmp(&a.value)
            .then_with(|| a.canonical_key.cmp(&b.canonical_key))
    });
    rows
}

#[derive(Tabled)]
struct NationalPreview {
    #[tabled(rename = "Date")]
    date: String,
    #[tabled(rename = "Historical")]
    hist: String,
    #[tabled(rename = "Forecast")]
    forecast: String,
    #[tabled(rename = "Lower95")]
    lower: String,
    #[tabled(rename = "Upper95")]
    upper: String,
}

#[derive(Tabled)]
struct DepartmentPreview {
    #[tabled(rename = "Rank")]
    rank: usize,
    #[tabled(rename = "Department")]
    department: String,
    #[tabled(rename = "Predicted")]
    value: String,
}

#[derive(Tabled)]
struct MapPreview {
    #[tabled(rename = "Department")]
    label: String,
    #[tabled(rename = "Key")]
    key: String,
    #[tabled(rename = "Value")]
    value: String,
    #[tabled(rename = "Filled")]
    filled: String,
}

pub fn render_national(rows: &[NationalRow]) -> String {
    let preview: Vec<NationalPreview> = rows
        .iter()
        .map(|r| NationalPreview {
            date: r.date.format("%Y-%m").to_string(),
            hist: format_optional(r.hist, 0),
            forecast: format_optional(r.forecast, 2),
            lower: format_optional(r.lower_95, 2),
            upper: format_optional(r.upper_95, 2),
        })
        .collect();
    Table::new(preview).with(Style::markdown()).to_string()
}

pub fn render_top(rows: &[&MetricRow]) -> String {
    let preview: Vec<DepartmentPreview> = rows
        .iter()
        .enumerate()
        .map(|(i, r)| DepartmentPreview {
            rank: i + 1,
            department: r.display_name.clone(),
            value: format_number(r.value, 2),
        })
        .collect();
    Table::new(preview).with(Style::markdown()).to_string()
}

/// Joined table followed by the unmatched-name diagnostic, if any.
pub fn render_map(rec: &Reconciliation) -> String {
    let preview: Vec<MapPreview> = map_rows(rec)
        .into_iter()
        .map(|r| MapPreview {
            label: r.display_label.clone(),
            key: r.canonical_key.to_string(),
            value: format_number(r.value, 2),
            filled: if r.is_filled { "yes".into() } else { String::new() },
        })
        .collect();
    let mut out = Table::new(preview).with(Style::markdown()).to_string();
    out.push_str(&format!(
        "\n\n{} departments, {} zero-filled, total {}",
        rec.joined.len(),
        rec.filled_count(),
        format_number(rec.total(), 2)
    ));
    if !rec.unmatched.is_empty() {
        let names: Vec<&str> = rec.unmatched.iter().map(String::as_str).collect();
        out.push_str(&format!(
            "\nWarning: {} names not found on the map: {}",
            names.len(),
            names.join(", ")
        ));
    }
    out
}

/// Joined table as CSV, in registry order.
pub fn write_joined_csv(path: &Path, rows: &[JoinedMapRow]) -> Result<()> {
    let mut wtr = csv::Writer::from_path(path)?;
    wtr.write_record(["Departamento", "Key", "Value", "Filled"])?;
    for r in rows {
        wtr.write_record([
            r.display_label.as_str(),
            r.canonical_key.as_str(),
            format!("{:.2}", r.value).as_str(),
            if r.is_filled { "true" } else { "false" },
        ])?;
    }
    wtr.flush().map_err(|source| DataError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(())
}

/// Combined national table, one row per date; missing values stay blank.
pub fn write_national_csv(path: &Path, rows: &[NationalRow]) -> Result<()> {
    let mut wtr = csv::Writer::from_path(path)?;
    for row in rows {
        wtr.serialize(row)?;
    }
    wtr.flush().map_err(|source| DataError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(())
}

/// Feature collection with `value` and `is_filled` stamped next to the
/// canonical key of each feature, ready for a choropleth renderer.
pub fn choropleth_collection(registry: &GeoRegistry, rec: &Reconciliation) -> Value {
    let by_key: HashMap<&str, &JoinedMapRow> = rec
        .joined
        .iter()
        .map(|r| (r.canonical_key.as_str(), r))
        .collect();

    let mut collection = registry.feature_collection().clone();
    if let Some(features) = collection.get_mut("features").and_then(Value::as_array_mut) {
        for feature in features {
            let Some(props) = feature.get_mut("properties").and_then(Value::as_object_mut) else {
                continue;
            };
            let Some(row) = props
                .get(CANONICAL_KEY_PROPERTY)
                .and_then(Value::as_str)
                .and_then(|k| by_key.get(k).copied())
            else {
                continue;
            };
            props.insert("value".into(), Value::from(row.value));
            props.insert("is_filled".into(), Value::Bool(row.is_filled));
        }
    }
    collection
}

pub fn write_choropleth_geojson(path: &Path, registry: &GeoRegistry, rec: &Reconciliation) -> Result<()> {
    write_json(path, &choropleth_collection(registry, rec))
}

/// Headline numbers of one map layer.
#[derive(Debug, Clone, Serialize)]
pub struct MapSummary {
    pub layer: String,
    pub as_of: Option<NaiveDate>,
    pub departments: usize,
    pub matched: usize,
    pub zero_filled: usize,
    pub total: f64,
    pub unmatched: Vec<String>,
    pub duplicates: Vec<String>,
}

impl MapSummary {
    pub fn new(layer: impl Into<String>, as_of: Option<NaiveDate>, rec: &Reconciliation) -> Self {
        let zero_filled = rec.filled_count();
        Self {
            layer: layer.into(),
            as_of,
            departments: rec.joined.len(),
            matched: rec.joined.len() - zero_filled,
            zero_filled,
            total: rec.total(),
            unmatched: rec.unmatched.iter().cloned().collect(),
            duplicates: rec.duplicates.iter().cloned().collect(),
        }
    }
}

pub fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    let file = File::create(path).map_err(|source| DataError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let mut writer = BufWriter::new(file);
    serde_json::to_writer_pretty(&mut writer, value)?;
    writer.flush().map_err(|source| DataError::Io {
        path: path.to_path_buf(),
        source,
    })
}
