//! Join per-department metrics onto the registry.
//!
//! Output always has one row per registry entry. Registry entries with no
//! metric are zero-filled and flagged; metric names with no registry entry
//! are collected as unmatched instead of being dropped silently.

use std::collections::{BTreeSet, HashMap};
use std::fmt;
use std::str::FromStr;

use serde::Serialize;
use tracing::warn;

use crate::geo::GeoRegistry;
use crate::normalize::{CanonicalName, normalize};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MetricRow {
    pub display_name: String,
    pub canonical_key: CanonicalName,
    pub value: f64,
}

impl MetricRow {
    pub fn new(display_name: impl Into<String>, value: f64) -> Self {
        let display_name = display_name.into();
        let canonical_key = normalize(&display_name);
        Self {
            display_name,
            canonical_key,
            value,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct JoinedMapRow {
    pub canonical_key: CanonicalName,
    pub display_label: String,
    pub value: f64,
    /// True when no metric matched and `value` was defaulted to zero.
    pub is_filled: bool,
}

/// What to do when one input carries several rows for the same department.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CollisionPolicy {
    #[default]
    LastWriteWins,
    Sum,
}

impl fmt::Display for CollisionPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CollisionPolicy::LastWriteWins => f.write_str("last"),
            CollisionPolicy::Sum => f.write_str("sum"),
        }
    }
}

impl FromStr for CollisionPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "last" | "last-write-wins" | "overwrite" => Ok(CollisionPolicy::LastWriteWins),
            "sum" => Ok(CollisionPolicy::Sum),
            other => Err(format!("unknown collision policy {other:?} (expected last or sum)")),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct Reconciliation {
    pub joined: Vec<JoinedMapRow>,
    /// Canonical keys present in the metrics but absent from the registry.
    pub unmatched: BTreeSet<String>,
    /// Canonical keys that appeared more than once in the metrics.
    pub duplicates: BTreeSet<String>,
}

impl Reconciliation {
    pub fn filled_count(&self) -> usize {
        self.joined.iter().filter(|r| r.is_filled).count()
    }

    pub fn total(&self) -> f64 {
        self.joined.iter().map(|r| r.value).sum()
    }
}

pub fn reconcile(
    registry: &GeoRegistry,
    metrics: &[MetricRow],
    policy: CollisionPolicy,
) -> Reconciliation {
    let mut values: HashMap<CanonicalName, f64> = HashMap::new();
    let mut duplicates = BTreeSet::new();
    let mut unmatched = BTreeSet::new();

    for row in metrics {
        // Keyed on the display name so a stale `canonical_key` cannot misroute a row.
        let key = normalize(&row.display_name);
        if !registry.contains(key.as_str()) {
            unmatched.insert(key.to_string());
        }
        match values.get_mut(&key) {
            Some(existing) => {
                duplicates.insert(key.to_string());
                match policy {
                    CollisionPolicy::LastWriteWins => *existing = row.value,
                    CollisionPolicy::Sum => *existing += row.value,
                }
            }
            None => {
                values.insert(key, row.value);
            }
        }
    }

    let joined = registry
        .entries()
        .iter()
        .map(|entry| match values.get(entry.canonical_key.as_str()) {
            Some(&value) => JoinedMapRow {
                canonical_key: entry.canonical_key.clone(),
                display_label: entry.display_label.clone(),
                value,
                is_filled: false,
            },
            None => JoinedMapRow {
                canonical_key: entry.canonical_key.clone(),
                display_label: entry.display_label.clone(),
                value: 0.0,
                is_filled: true,
            },
        })
        .collect();

    if !unmatched.is_empty() {
        warn!(count = unmatched.len(), names = ?unmatched, "department names not found in registry");
    }
    if !duplicates.is_empty() {
        warn!(policy = %policy, names = ?duplicates, "duplicate department rows");
    }

    Reconciliation {
        joined,
        unmatched,
        duplicates,
    }
}
