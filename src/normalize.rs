//! Department name normalization.
//!
//! Every source spells departments its own way ("Bogotá", "BOGOTA D.C.",
//! "N. de Santander"). [`normalize`] folds all of them onto one
//! [`CanonicalName`] that the registry and the reconciler join on.

use std::borrow::Borrow;
use std::collections::HashMap;
use std::fmt;

use once_cell::sync::Lazy;
use serde::Serialize;
use unicode_normalization::UnicodeNormalization;
use unicode_normalization::char::is_combining_mark;

/// Uppercase, accent-free, alias-resolved department key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct CanonicalName(String);

impl CanonicalName {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl fmt::Display for CanonicalName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl Borrow<str> for CanonicalName {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl AsRef<str> for CanonicalName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

// Keys are already in cleaned form; targets must never appear as keys.
static ALIASES: Lazy<HashMap<&'static str, &'static str>> = Lazy::new(|| {
    HashMap::from([
        ("BOGOTA", "BOGOTA DC"),
        ("BOGOTA D C", "BOGOTA DC"),
        ("BOGOTA DISTRITO CAPITAL", "BOGOTA DC"),
        ("SANTAFE DE BOGOTA D C", "BOGOTA DC"),
        ("SANTAFE DE BOGOTA DC", "BOGOTA DC"),
        ("SANTA FE DE BOGOTA D C", "BOGOTA DC"),
        ("VALLE", "VALLE DEL CAUCA"),
        ("SAN ANDRES", "SAN ANDRES Y PROVIDENCIA"),
        ("SAN ANDRES PROVIDENCIA Y SANTA CATALINA", "SAN ANDRES Y PROVIDENCIA"),
        ("ARCHIPIELAGO DE SAN ANDRES", "SAN ANDRES Y PROVIDENCIA"),
        (
            "ARCHIPIELAGO DE SAN ANDRES PROVIDENCIA Y SANTA CATALINA",
            "SAN ANDRES Y PROVIDENCIA",
        ),
        ("N DE SANTANDER", "NORTE DE SANTANDER"),
        ("NORTE SANTANDER", "NORTE DE SANTANDER"),
        ("N SANTANDER", "NORTE DE SANTANDER"),
        ("GUAJIRA", "LA GUAJIRA"),
    ])
});

/// Normalize a free-text department name. Total over all inputs; the empty
/// string maps to the empty key.
pub fn normalize(raw: &str) -> CanonicalName {
    // Uppercase before decomposing: some uppercase mappings introduce
    // combining marks of their own.
    let stripped: String = raw
        .to_uppercase()
        .nfd()
        .filter(|c| !is_combining_mark(*c))
        .map(|c| if c == '.' || c == ',' { ' ' } else { c })
        .collect();

    let collapsed = stripped.split_whitespace().collect::<Vec<_>>().join(" ");

    match ALIASES.get(collapsed.as_str()) {
        Some(alias) => CanonicalName((*alias).to_string()),
        None => CanonicalName(collapsed),
    }
}
