//! Engine Orchestrator (C9): the one public entry point, `validate`.
//!
//! Sequences dataset open, layer resolution, the C7 sweep, the C5/C6 passes,
//! and sink finalization. Mirrors the shape of `gdal::Dataset::open` plus a
//! driver method: a single fallible call that owns every native resource for
//! its duration and releases all of them before returning, success or not.

use crate::backend::{Dataset, FeatureFilter, GeometryBackend, RichValidator};
use crate::cache::SpatialIndexCache;
use crate::cancel::CancelToken;
use crate::criteria::{CheckConfig, GeometryCriteria};
use crate::error_record::{codes, Severity, ValidationError};
use crate::errors::EngineError;
use crate::network::{self, NetworkDefectKind};
use crate::scanner::{self, ScanOutcome};
use crate::sink::ErrorSink;
use crate::spatial_index::{self, IndexedFeature};

/// What `validate` hands back. `errors` is empty in streaming mode; the
/// caller consumes the on-disk batch file instead.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidationResult {
    pub is_valid: bool,
    pub errors: Vec<ValidationError>,
    pub error_count: u64,
    pub warning_count: u64,
    pub skipped_count: u64,
    pub message: String,
    /// Set when the run was stopped early via `cancel`, distinct from a
    /// validation failure.
    pub cancelled: bool,
}

impl ValidationResult {
    fn empty_with_warning(message: impl Into<String>) -> Self {
        ValidationResult {
            is_valid: true,
            errors: Vec::new(),
            error_count: 0,
            warning_count: 1,
            skipped_count: 0,
            message: message.into(),
            cancelled: false,
        }
    }
}

fn duplicate_error(hit: &spatial_index::DuplicateHit, table_id: &str, table_name: &str) -> ValidationError {
    ValidationError::at_point(
        codes::DUPLICATE,
        format!("duplicates feature {}", hit.kept_fid),
        table_id,
        table_name,
        hit.duplicate_fid.to_string(),
        Severity::Error,
        hit.location.0,
        hit.location.1,
    )
}

fn overlap_error(hit: &spatial_index::OverlapHit, table_id: &str, table_name: &str) -> ValidationError {
    ValidationError::at_point(
        codes::OVERLAP,
        format!("overlaps feature {}", hit.fid_a),
        table_id,
        table_name,
        hit.fid_b.to_string(),
        Severity::Error,
        hit.location.0,
        hit.location.1,
    )
}

fn network_error(defect: &network::NetworkDefect, table_id: &str, table_name: &str) -> ValidationError {
    let code = match defect.kind {
        NetworkDefectKind::Undershoot => codes::UNDERSHOOT,
        NetworkDefectKind::Overshoot => codes::OVERSHOOT,
    };
    let label = match defect.kind {
        NetworkDefectKind::Undershoot => "undershoot",
        NetworkDefectKind::Overshoot => "overshoot",
    };
    ValidationError::at_gap(
        code,
        format!("endpoint {label} detected"),
        table_id,
        table_name,
        defect.fid.to_string(),
        Severity::Error,
        defect.p,
        defect.q,
    )
}

/// Read up to 10 features to sanity-check the attribute filter actually
/// narrowed the cursor, then reset it for the real sweep. Any mismatch is
/// logged, never returned as an error.
fn probe_filter(layer: &mut dyn crate::backend::Layer, table_id: &str, post_filter_count: Option<u64>) {
    let mut probed = 0;
    while probed < 10 && layer.next_feature().is_some() {
        probed += 1;
    }
    layer.reset();
    if probed == 0 {
        if let Some(n) = post_filter_count {
            if n > 0 {
                log::warn!(
                    "table '{table_id}': filter probe read 0 features but feature_count reports {n}"
                );
            }
        }
    }
}

/// Validate one layer of one dataset. `streaming_path`, if given, switches
/// the sink to batched-to-disk mode instead of buffered-in-memory.
#[allow(clippy::too_many_arguments)]
pub fn validate<B: GeometryBackend>(
    backend: &B,
    cache: &mut SpatialIndexCache,
    file_path: &str,
    layer_id: &str,
    table_name: &str,
    criteria: &GeometryCriteria,
    checks: &CheckConfig,
    filter: &dyn FeatureFilter,
    rich: &dyn RichValidator,
    cancel: &CancelToken,
    streaming_path: Option<&str>,
) -> Result<ValidationResult, EngineError> {
    let result = run(
        backend,
        cache,
        file_path,
        layer_id,
        table_name,
        criteria,
        checks,
        filter,
        rich,
        cancel,
        streaming_path,
    );
    cache.invalidate_file(file_path);
    result
}

#[allow(clippy::too_many_arguments)]
fn run<B: GeometryBackend>(
    backend: &B,
    cache: &mut SpatialIndexCache,
    file_path: &str,
    layer_id: &str,
    table_name: &str,
    criteria: &GeometryCriteria,
    checks: &CheckConfig,
    filter: &dyn FeatureFilter,
    rich: &dyn RichValidator,
    cancel: &CancelToken,
    streaming_path: Option<&str>,
) -> Result<ValidationResult, EngineError> {
    let mut dataset = backend.open(file_path).map_err(|source| EngineError::OpenDataset {
        path: file_path.to_string(),
        source,
    })?;

    let mut layer = match dataset.layer(layer_id) {
        Some(l) => l,
        None => {
            return Ok(ValidationResult::empty_with_warning(format!(
                "layer '{layer_id}' not found in '{file_path}'"
            )));
        }
    };

    let before_count = layer.feature_count(false);
    let filter_outcome = filter.apply(layer.as_mut(), "pre-scan", layer_id);
    let after_count = layer.feature_count(false);
    let skipped_from_filter = match (before_count, after_count) {
        (Some(b), Some(a)) if b >= a => b - a,
        _ => filter_outcome.excluded_count,
    };

    probe_filter(layer.as_mut(), layer_id, after_count);

    let sink = match streaming_path {
        Some(path) => ErrorSink::streaming(path)?,
        None => ErrorSink::buffered(),
    };

    let ScanOutcome {
        processed_count: _,
        skipped_count: sweep_skipped,
        cancelled,
        indexed_features,
        line_entries,
    } = scanner::scan(
        layer.as_mut(),
        layer_id,
        table_name,
        criteria,
        checks,
        filter,
        rich,
        &sink,
        cancel,
    );

    if !cancelled {
        if checks.needs_cross_check_pass() && !indexed_features.is_empty() {
            run_cross_checks(file_path, layer_id, table_name, criteria, checks, cache, indexed_features, &sink, cancel);
        }

        if checks.needs_network_pass() && line_entries.len() >= 2 {
            run_network_check(layer_id, table_name, criteria, &line_entries, &sink, cancel);
        }
    }

    let outcome = sink.finalize();
    let skipped_count = skipped_from_filter + sweep_skipped;

    Ok(ValidationResult {
        is_valid: outcome.error_count == 0,
        errors: outcome.errors,
        error_count: outcome.error_count,
        warning_count: outcome.warning_count,
        skipped_count,
        message: if cancelled {
            "validation run cancelled".to_string()
        } else {
            String::new()
        },
        cancelled,
    })
}

#[allow(clippy::too_many_arguments)]
fn run_cross_checks(
    file_path: &str,
    layer_id: &str,
    table_name: &str,
    criteria: &GeometryCriteria,
    checks: &CheckConfig,
    cache: &mut SpatialIndexCache,
    indexed_features: Vec<IndexedFeature>,
    sink: &ErrorSink,
    cancel: &CancelToken,
) {
    let (features, index) = cache.get_or_build(file_path, layer_id, move || indexed_features);

    if checks.duplicate {
        let mut dups = spatial_index::find_duplicates(features, index, cancel);
        dups.sort_by_key(|h| (h.kept_fid.min(h.duplicate_fid), h.kept_fid.max(h.duplicate_fid)));
        for hit in &dups {
            sink.push(duplicate_error(hit, layer_id, table_name));
        }
    }

    if checks.overlap {
        let mut overlaps = spatial_index::find_overlaps(features, index, criteria.overlap_tolerance, cancel);
        overlaps.sort_by_key(|h| (h.fid_a, h.fid_b));
        for hit in &overlaps {
            sink.push(overlap_error(hit, layer_id, table_name));
        }
    }
}

fn run_network_check(
    layer_id: &str,
    table_name: &str,
    criteria: &GeometryCriteria,
    line_entries: &[network::LineEntry],
    sink: &ErrorSink,
    cancel: &CancelToken,
) {
    let defects = network::check_network(line_entries, criteria.network_search_distance, cancel);
    for defect in &defects {
        sink.push(network_error(defect, layer_id, table_name));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::memory::{MemoryDataset, MemoryFeature, MemoryLayer};
    use crate::backend::memory::MemoryBackend;
    use crate::backend::NoFilter;
    use crate::validity::BasicRichValidator;
    use geo_types::{line_string, polygon, Geometry};

    fn backend_with_short_line() -> MemoryBackend {
        let mut backend = MemoryBackend::new();
        let dataset = MemoryDataset::new().with_layer(
            "roads",
            MemoryLayer::new(
                "LineString",
                vec![MemoryFeature {
                    fid: 1,
                    geometry: Geometry::LineString(line_string![(x: 0.0, y: 0.0), (x: 0.0, y: 0.4)]),
                }],
            ),
        );
        backend.register("roads.gpkg", dataset);
        backend
    }

    #[test]
    fn missing_layer_is_a_successful_empty_result_with_warning() {
        let backend = backend_with_short_line();
        let mut cache = SpatialIndexCache::new();
        let result = validate(
            &backend,
            &mut cache,
            "roads.gpkg",
            "does-not-exist",
            "roads",
            &GeometryCriteria::default(),
            &CheckConfig::default(),
            &NoFilter,
            &BasicRichValidator,
            &CancelToken::new(),
            None,
        )
        .expect("validate should not error on a missing layer");
        assert!(result.is_valid);
        assert_eq!(result.warning_count, 1);
        assert_eq!(result.error_count, 0);
    }

    #[test]
    fn short_line_surfaces_as_an_error_and_marks_invalid() {
        let backend = backend_with_short_line();
        let mut cache = SpatialIndexCache::new();
        let mut checks = CheckConfig::default();
        checks.short_object = true;
        let criteria = GeometryCriteria {
            min_line_length: 1.0,
            ..GeometryCriteria::default()
        };
        let result = validate(
            &backend,
            &mut cache,
            "roads.gpkg",
            "roads",
            "roads",
            &criteria,
            &checks,
            &NoFilter,
            &BasicRichValidator,
            &CancelToken::new(),
            None,
        )
        .expect("validate should succeed");
        assert!(!result.is_valid);
        assert_eq!(result.error_count, 1);
        assert_eq!(result.errors[0].error_code, codes::SHORT_LINE);
    }

    #[test]
    fn duplicate_polygons_are_reported_via_the_cross_check_pass() {
        let mut backend = MemoryBackend::new();
        let sq = || polygon![(x: 0.0, y: 0.0), (x: 10.0, y: 0.0), (x: 10.0, y: 10.0), (x: 0.0, y: 10.0)];
        let dataset = MemoryDataset::new().with_layer(
            "parcels",
            MemoryLayer::new(
                "Polygon",
                vec![
                    MemoryFeature {
                        fid: 1,
                        geometry: Geometry::Polygon(sq()),
                    },
                    MemoryFeature {
                        fid: 2,
                        geometry: Geometry::Polygon(sq()),
                    },
                ],
            ),
        );
        backend.register("parcels.gpkg", dataset);

        let mut cache = SpatialIndexCache::new();
        let mut checks = CheckConfig::default();
        checks.duplicate = true;
        let result = validate(
            &backend,
            &mut cache,
            "parcels.gpkg",
            "parcels",
            "parcels",
            &GeometryCriteria::default(),
            &checks,
            &NoFilter,
            &BasicRichValidator,
            &CancelToken::new(),
            None,
        )
        .expect("validate should succeed");
        assert_eq!(result.error_count, 1);
        assert_eq!(result.errors[0].error_code, codes::DUPLICATE);
        assert_eq!(result.errors[0].feature_id, "2");
    }

    #[test]
    fn cancelling_before_the_sweep_produces_a_cancelled_result() {
        let backend = backend_with_short_line();
        let mut cache = SpatialIndexCache::new();
        let cancel = CancelToken::new();
        cancel.cancel();
        let result = validate(
            &backend,
            &mut cache,
            "roads.gpkg",
            "roads",
            "roads",
            &GeometryCriteria::default(),
            &CheckConfig::default(),
            &NoFilter,
            &BasicRichValidator,
            &cancel,
            None,
        )
        .expect("validate should succeed");
        assert!(result.cancelled);
    }
}
