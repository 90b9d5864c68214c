//! Department registry built from a GeoJSON feature collection.
//!
//! The registry is the authoritative list of join targets: one entry per
//! distinct canonical department key, in the order features appear.

use std::collections::HashMap;

use serde_json::{Map, Value};
use tracing::{debug, warn};

use crate::columns::{GEO_NAME_PROPERTY_CANDIDATES, resolve_candidate};
use crate::error::{DataError, Result};
use crate::normalize::{CanonicalName, normalize};

/// Property stamped onto every feature so renderers can join on the
/// canonical key without normalizing again.
pub const CANONICAL_KEY_PROPERTY: &str = "DPTO_KEY";

#[derive(Debug, Clone)]
pub struct GeoRegistryEntry {
    pub canonical_key: CanonicalName,
    pub display_label: String,
    /// Index of the owning feature inside [`GeoRegistry::feature_collection`].
    pub feature_index: usize,
}

#[derive(Debug, Clone)]
pub struct GeoRegistry {
    entries: Vec<GeoRegistryEntry>,
    index: HashMap<CanonicalName, usize>,
    collection: Value,
}

impl GeoRegistry {
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, key: &str) -> Option<&GeoRegistryEntry> {
        self.index.get(key).map(|&i| &self.entries[i])
    }

    pub fn contains(&self, key: &str) -> bool {
        self.index.contains_key(key)
    }

    pub fn entries(&self) -> &[GeoRegistryEntry] {
        &self.entries
    }

    /// The source collection with [`CANONICAL_KEY_PROPERTY`] stamped on
    /// every named feature.
    pub fn feature_collection(&self) -> &Value {
        &self.collection
    }

    /// Geometry of the feature backing `entry`, if the feature carries one.
    pub fn geometry(&self, entry: &GeoRegistryEntry) -> Option<&Value> {
        self.collection
            .get("features")?
            .get(entry.feature_index)?
            .get("geometry")
    }
}

/// Pick the display name of one feature: known name keys first, then the
/// first string-valued property. Returns the key used and its value.
pub fn feature_display_name(properties: &Map<String, Value>) -> Option<(String, String)> {
    let named = resolve_candidate(
        properties
            .iter()
            .filter(|(_, v)| v.is_string())
            .map(|(k, _)| k.as_str()),
        GEO_NAME_PROPERTY_CANDIDATES,
    );
    let key = match named {
        Some(k) => k,
        None => properties.iter().find(|(_, v)| v.is_string())?.0.as_str(),
    };
    let value = properties.get(key)?.as_str()?.trim().to_string();
    Some((key.to_string(), value))
}

/// Build the registry from a parsed feature collection. Fails only on
/// structural problems: no `features` array, no features at all, or a
/// first feature without properties.
pub fn build_registry(mut collection: Value) -> Result<(GeoRegistry, String)> {
    let features = collection
        .get_mut("features")
        .and_then(Value::as_array_mut)
        .ok_or_else(|| DataError::MalformedFeatureCollection("missing features array".into()))?;

    if features.is_empty() {
        return Err(DataError::EmptyFeatureCollection);
    }
    if !features[0].get("properties").is_some_and(Value::is_object) {
        return Err(DataError::MalformedFeatureCollection(
            "first feature has no properties".into(),
        ));
    }

    let mut entries = Vec::new();
    let mut index = HashMap::new();
    let mut key_used: Option<String> = None;

    for (i, feature) in features.iter_mut().enumerate() {
        let Some(properties) = feature.get_mut("properties").and_then(Value::as_object_mut) else {
            warn!(feature = i, "feature without properties skipped");
            continue;
        };
        let Some((prop_key, display)) = feature_display_name(properties) else {
            warn!(feature = i, "feature without a string property skipped");
            continue;
        };
        key_used.get_or_insert_with(|| prop_key.clone());

        let canonical = normalize(&display);
        if canonical.is_empty() {
            warn!(feature = i, "feature with blank name skipped");
            continue;
        }
        properties.insert(
            CANONICAL_KEY_PROPERTY.to_string(),
            Value::String(canonical.as_str().to_string()),
        );

        if index.contains_key(&canonical) {
            debug!(key = %canonical, feature = i, "duplicate feature name, keeping first");
            continue;
        }
        index.insert(canonical.clone(), entries.len());
        entries.push(GeoRegistryEntry {
            canonical_key: canonical,
            display_label: display,
            feature_index: i,
        });
    }

    let key_used = key_used.ok_or_else(|| {
        DataError::MalformedFeatureCollection("no feature has a string-valued property".into())
    })?;
    debug!(entries = entries.len(), key = %key_used, "registry built");

    Ok((
        GeoRegistry {
            entries,
            index,
            collection,
        },
        key_used,
    ))
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use serde_json::json;

    pub(crate) fn collection(names: &[&str]) -> Value {
        let features: Vec<Value> = names
            .iter()
            .map(|n| {
                json!({
                    "type": "Feature",
                    "properties": { "DPTO_CCDGO": "00", "NOMBRE_DPT": n },
                    "geometry": { "type": "Point", "coordinates": [0.0, 0.0] }
                })
            })
            .collect();
        json!({ "type": "FeatureCollection", "features": features })
    }

    #[test]
    fn registry_uses_preferred_key_and_stamps_features() {
        let (registry, key) = build_registry(collection(&["ANTIOQUIA", "CHOCÓ"])).unwrap();
        assert_eq!(key, "NOMBRE_DPT");
        assert_eq!(registry.len(), 2);
        assert_eq!(registry.get("CHOCO").unwrap().display_label, "CHOCÓ");

        let stamped = &registry.feature_collection()["features"][1]["properties"];
        assert_eq!(stamped[CANONICAL_KEY_PROPERTY], "CHOCO");
        assert!(registry.geometry(registry.get("ANTIOQUIA").unwrap()).is_some());
    }

    #[test]
    fn duplicates_keep_first_occurrence() {
        let (registry, _) =
            build_registry(collection(&["Bogotá", "BOGOTA D.C.", "Meta"])).unwrap();
        assert_eq!(registry.len(), 2);
        let bogota = registry.get("BOGOTA DC").unwrap();
        assert_eq!(bogota.display_label, "Bogotá");
        assert_eq!(bogota.feature_index, 0);
    }

    #[test]
    fn falls_back_to_first_string_property() {
        let fc = json!({
            "features": [
                { "properties": { "area": 12.5, "dept_label": "Vaupés" } }
            ]
        });
        let (registry, key) = build_registry(fc).unwrap();
        assert_eq!(key, "dept_label");
        assert!(registry.contains("VAUPES"));
    }

    #[test]
    fn code_property_does_not_shadow_name() {
        let fc = json!({ "features": [ { "properties": { "DPTO": "05", "name": "Antioquia" } } ] });
        let (registry, key) = build_registry(fc).unwrap();
        assert_eq!(key, "name");
        assert!(registry.contains("ANTIOQUIA"));
        assert!(!registry.contains("05"));
    }

    #[test]
    fn unnamed_later_features_are_skipped() {
        let fc = json!({
            "features": [
                { "properties": { "NOMBRE_DPT": "Huila" } },
                { "geometry": null },
                { "properties": { "area": 3.5 } },
                { "properties": { "NOMBRE_DPT": "  " } },
                { "properties": { "NOMBRE_DPT": "Tolima" } }
            ]
        });
        let (registry, _) = build_registry(fc).unwrap();
        let keys: Vec<&str> = registry.entries().iter().map(|e| e.canonical_key.as_str()).collect();
        assert_eq!(keys, vec!["HUILA", "TOLIMA"]);
        assert_eq!(registry.get("TOLIMA").unwrap().feature_index, 4);
    }

    #[test]
    fn structural_errors_are_fatal() {
        assert!(matches!(
            build_registry(json!({ "type": "FeatureCollection" })),
            Err(DataError::MalformedFeatureCollection(_))
        ));
        assert!(matches!(
            build_registry(json!({ "features": [] })),
            Err(DataError::EmptyFeatureCollection)
        ));
        assert!(matches!(
            build_registry(json!({ "features": [ { "geometry": null } ] })),
            Err(DataError::MalformedFeatureCollection(_))
        ));
    }
}
