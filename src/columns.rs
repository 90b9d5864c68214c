//! Ordered candidate resolution for column names and feature property keys.
//!
//! Producer pipelines disagree on naming ("fecha" vs "date", "NOMBRE_DPT"
//! vs "name"). Each lookup is a fixed candidate list where the first
//! candidate present wins.

pub const DATE_COLUMN_CANDIDATES: &[&str] = &["date", "fecha", "index", "unnamed: 0"];

pub const DEPARTMENT_COLUMN_CANDIDATES: &[&str] = &["Departamento", "depto"];

pub const DEPARTMENT_FORECAST_CANDIDATES: &[&str] = &["Pred_Q1", "pred_Q1_2024"];

pub const FORECAST_COLUMN_CANDIDATES: &[&str] = &["forecast"];

pub const GEO_NAME_PROPERTY_CANDIDATES: &[&str] = &[
    "NOMBRE_DPT",
    "DPTO_CNMBR",
    "NOMBRE_DEP",
    "DEPARTAMEN",
    "name",
    "NAME_1",
];

/// Return the entry of `available` matching the earliest candidate,
/// compared case-insensitively. Candidate order decides, not input order.
pub fn resolve_candidate<'a, I>(available: I, candidates: &[&str]) -> Option<&'a str>
where
    I: IntoIterator<Item = &'a str>,
{
    let available: Vec<&str> = available.into_iter().collect();
    candidates.iter().find_map(|cand| {
        available
            .iter()
            .find(|a| a.trim().eq_ignore_ascii_case(cand))
            .copied()
    })
}

/// First entry of `available` not listed in `excluded` (case-insensitive).
pub fn first_other<'a, I>(available: I, excluded: &[&str]) -> Option<&'a str>
where
    I: IntoIterator<Item = &'a str>,
{
    available
        .into_iter()
        .find(|a| !excluded.iter().any(|e| a.trim().eq_ignore_ascii_case(e)))
}

/// Position of a resolved header inside a CSV header row.
pub fn position_of(headers: &csv::StringRecord, name: &str) -> Option<usize> {
    headers.iter().position(|h| h == name)
}
