//! Per-`(file, layer)` spatial-index cache.
//!
//! Lazily populated on first cross-check request; the Orchestrator evicts an
//! entry explicitly when it advances to the next file, process-scoped and
//! write-once per key.

use std::collections::HashMap;

use rstar::RTree;

use crate::spatial_index::{build_index, EnvelopeLeaf, IndexedFeature};

struct CachedIndex {
    features: Vec<IndexedFeature>,
    tree: RTree<EnvelopeLeaf>,
}

/// Keyed by `(file_path, layer_id)`. A plain `HashMap` behind `&mut self` is
/// enough here: cross-check passes within one `validate()` call happen
/// sequentially relative to cache access (only the candidate-pair
/// evaluation inside C5 is parallelised, over an already-built, read-only
/// index), so no interior mutability is required.
#[derive(Default)]
pub struct SpatialIndexCache {
    entries: HashMap<(String, String), CachedIndex>,
}

impl SpatialIndexCache {
    pub fn new() -> Self {
        SpatialIndexCache::default()
    }

    /// Returns the cached index for `(file_path, layer_id)`, building it
    /// from `features` on first access. Subsequent calls with the same key
    /// ignore `features` and return the cached build.
    ///
    /// Crate-internal: the Orchestrator is the only caller. Exposing this
    /// publicly would leak `IndexedFeature`/`EnvelopeLeaf`, which are
    /// implementation detail of the C5 pass, not part of the cache's public
    /// lifecycle contract (`new`/`invalidate`/`invalidate_file`).
    pub(crate) fn get_or_build(
        &mut self,
        file_path: &str,
        layer_id: &str,
        features: impl FnOnce() -> Vec<IndexedFeature>,
    ) -> (&[IndexedFeature], &RTree<EnvelopeLeaf>) {
        let key = (file_path.to_string(), layer_id.to_string());
        let entry = self.entries.entry(key).or_insert_with(|| {
            let features = features();
            let tree = build_index(&features);
            CachedIndex { features, tree }
        });
        (&entry.features, &entry.tree)
    }

    /// Evict the cache entry for `(file_path, layer_id)`. The Orchestrator
    /// calls this on every file transition.
    pub fn invalidate(&mut self, file_path: &str, layer_id: &str) {
        self.entries
            .remove(&(file_path.to_string(), layer_id.to_string()));
    }

    pub fn invalidate_file(&mut self, file_path: &str) {
        self.entries.retain(|(f, _), _| f != file_path);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::Envelope;
    use geo_types::{polygon, Geometry};

    fn sample() -> Vec<IndexedFeature> {
        vec![IndexedFeature {
            fid: 1,
            envelope: Envelope {
                min_x: 0.0,
                min_y: 0.0,
                max_x: 1.0,
                max_y: 1.0,
            },
            geometry: Geometry::Polygon(polygon![
                (x: 0.0, y: 0.0), (x: 1.0, y: 0.0), (x: 1.0, y: 1.0), (x: 0.0, y: 1.0),
            ]),
        }]
    }

    #[test]
    fn second_access_does_not_rebuild() {
        let mut cache = SpatialIndexCache::new();
        let mut build_calls = 0;
        {
            let (features, _) = cache.get_or_build("a.gpkg", "roads", || {
                build_calls += 1;
                sample()
            });
            assert_eq!(features.len(), 1);
        }
        {
            let (features, _) = cache.get_or_build("a.gpkg", "roads", || {
                build_calls += 1;
                sample()
            });
            assert_eq!(features.len(), 1);
        }
        assert_eq!(build_calls, 1);
    }

    #[test]
    fn invalidate_forces_rebuild() {
        let mut cache = SpatialIndexCache::new();
        cache.get_or_build("a.gpkg", "roads", sample);
        cache.invalidate("a.gpkg", "roads");
        let mut rebuilt = false;
        cache.get_or_build("a.gpkg", "roads", || {
            rebuilt = true;
            sample()
        });
        assert!(rebuilt);
    }
}
