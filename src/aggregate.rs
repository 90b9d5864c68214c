//! Trailing-window totals over a monthly department series.

use std::collections::BTreeMap;

use chrono::{Datelike, Months, NaiveDate};
use serde::Serialize;

use crate::normalize::{CanonicalName, normalize};
use crate::reconcile::MetricRow;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MonthlyRow {
    pub date: NaiveDate,
    pub department: String,
    pub value: f64,
}

/// Inclusive bounds of a trailing window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Window {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

/// Window of `months` months ending at the latest date in `rows`, starting
/// on the first day of its first month. `None` for empty input or a
/// zero-length window.
pub fn trailing_window(rows: &[MonthlyRow], months: u32) -> Option<Window> {
    if months == 0 {
        return None;
    }
    let end = rows.iter().map(|r| r.date).max()?;
    let month_start = end.with_day(1)?;
    let start = month_start.checked_sub_months(Months::new(months - 1))?;
    Some(Window { start, end })
}

/// Sum each department's values inside the trailing window. Departments
/// are grouped by canonical key; the first spelling seen becomes the
/// display name. Values are summed as given, negatives included.
pub fn aggregate_window(rows: &[MonthlyRow], window_months: u32) -> Vec<MetricRow> {
    let Some(window) = trailing_window(rows, window_months) else {
        return Vec::new();
    };

    let mut groups: BTreeMap<CanonicalName, (String, f64)> = BTreeMap::new();
    for row in rows
        .iter()
        .filter(|r| r.date >= window.start && r.date <= window.end)
    {
        let (_, total) = groups
            .entry(normalize(&row.department))
            .or_insert_with(|| (row.department.clone(), 0.0));
        *total += row.value;
    }

    groups
        .into_iter()
        .map(|(canonical_key, (display_name, value))| MetricRow {
            display_name,
            canonical_key,
            value,
        })
        .collect()
}
