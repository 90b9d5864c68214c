//! Registry cache owned by the application context.
//!
//! Entries are keyed by path and validated against a SHA-256 of the file
//! content, so an edited reference file is rebuilt on the next lookup.
//! `invalidate` drops everything when the caller asks for a refresh.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use sha2::{Digest, Sha256};
use tracing::{debug, info};

use crate::error::Result;
use crate::geo::{GeoRegistry, build_registry};
use crate::loader;

struct Cached {
    digest: String,
    registry: Arc<GeoRegistry>,
    key_used: String,
}

#[derive(Default)]
pub struct RegistryCache {
    entries: HashMap<PathBuf, Cached>,
    builds: usize,
}

impl RegistryCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry for the GeoJSON at `path`, rebuilt only when the file
    /// content changed since the last call.
    pub fn get_or_build(&mut self, path: &Path) -> Result<Arc<GeoRegistry>> {
        let bytes = loader::read_file(path)?;
        let digest = hex::encode(Sha256::digest(&bytes));

        if let Some(cached) = self.entries.get(path) {
            if cached.digest == digest {
                debug!(path = %path.display(), "registry cache hit");
                return Ok(Arc::clone(&cached.registry));
            }
        }

        let (registry, key_used) = build_registry(loader::parse_feature_collection(&bytes)?)?;
        let registry = Arc::new(registry);
        self.builds += 1;
        info!(
            path = %path.display(),
            departments = registry.len(),
            key = %key_used,
            "registry built"
        );
        self.entries.insert(
            path.to_path_buf(),
            Cached {
                digest,
                registry: Arc::clone(&registry),
                key_used,
            },
        );
        Ok(registry)
    }

    /// Property key the cached registry for `path` took names from.
    pub fn key_used(&self, path: &Path) -> Option<&str> {
        self.entries.get(path).map(|c| c.key_used.as_str())
    }

    pub fn invalidate(&mut self) {
        self.entries.clear();
    }

    pub fn invalidate_path(&mut self, path: &Path) -> bool {
        self.entries.remove(path).is_some()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Number of registry builds performed so far.
    pub fn builds(&self) -> usize {
        self.builds
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::DataError;
    use crate::geo::tests::collection;
    use std::fs;

    fn write(path: &Path, names: &[&str]) {
        fs::write(path, collection(names).to_string()).unwrap();
    }

    #[test]
    fn reuses_registry_until_content_changes() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("deptos.geojson");
        write(&path, &["Meta", "Cauca"]);

        let mut cache = RegistryCache::new();
        let first = cache.get_or_build(&path).unwrap();
        let second = cache.get_or_build(&path).unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(cache.builds(), 1);
        assert_eq!(cache.key_used(&path), Some("NOMBRE_DPT"));

        write(&path, &["Meta", "Cauca", "Huila"]);
        let third = cache.get_or_build(&path).unwrap();
        assert_eq!(third.len(), 3);
        assert_eq!(cache.builds(), 2);
    }

    #[test]
    fn invalidate_forces_rebuild() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("deptos.geojson");
        write(&path, &["Meta"]);

        let mut cache = RegistryCache::new();
        cache.get_or_build(&path).unwrap();
        cache.invalidate();
        assert!(cache.is_empty());
        cache.get_or_build(&path).unwrap();
        assert_eq!(cache.builds(), 2);
        assert!(cache.invalidate_path(&path));
        assert!(!cache.invalidate_path(&path));
    }

    #[test]
    fn missing_file_is_reported() {
        let mut cache = RegistryCache::new();
        let err = cache.get_or_build(Path::new("/nonexistent/deptos.geojson"));
        assert!(matches!(err, Err(DataError::MissingFile(_))));
    }
}
