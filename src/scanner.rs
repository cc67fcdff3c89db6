//! Single-Pass Scanner (C7): one cursor sweep invoking C1–C4 per feature,
//! plus the per-feature collection C5/C6 need for their own passes.
//!
//! Geometry is cloned/linearized only when at least one per-feature
//! shape-quality or cardinality check needs it
//! (`CheckConfig::needs_working_geometry`); cross-check/network collection
//! reuses the same clone when both happen to be needed.

use std::collections::HashSet;

use geo_types::Geometry as GeoGeometry;

use crate::backend::{Feature, FeatureFilter, GeometryValue, Layer, RichValidator};
use crate::cancel::CancelToken;
use crate::criteria::{CheckConfig, GeometryCriteria};
use crate::error_record::{codes, Severity, ValidationError};
use crate::min_vertex;
use crate::network::LineEntry;
use crate::predicates::{first_vertex, is_line, is_polygon, line_length, surface_area};
use crate::shape_quality::{detect_spike, is_sliver, spike_message};
use crate::sink::ErrorSink;
use crate::spatial_index::{self, IndexedFeature};
use crate::validity::{check_validity, DefectKind, ValidityDefect};

pub struct ScanOutcome {
    pub processed_count: u64,
    pub skipped_count: u64,
    pub cancelled: bool,
    pub indexed_features: Vec<IndexedFeature>,
    pub line_entries: Vec<LineEntry>,
}

fn validity_error(defect: &ValidityDefect, table_id: &str, table_name: &str, feature_id: &str) -> ValidationError {
    let kind = match defect.kind {
        DefectKind::Invalid => "invalid",
        DefectKind::NonSimple => "non-simple",
    };
    let mut error = ValidationError::at_point(
        codes::INVALID,
        format!("geometry is {kind}: {}", defect.message),
        table_id,
        table_name,
        feature_id,
        Severity::Error,
        defect.location.0,
        defect.location.1,
    );
    if let Some(error_type) = defect.error_type {
        error = error.with_metadata("iso19107_error_type", format!("{error_type:?}"));
    }
    error
}

fn collect_line_entries(out: &mut Vec<LineEntry>, fid: i64, g: &GeoGeometry<f64>) {
    match g {
        GeoGeometry::LineString(ls) => out.push(LineEntry {
            fid,
            line: ls.clone(),
        }),
        GeoGeometry::MultiLineString(mls) => {
            for ls in &mls.0 {
                out.push(LineEntry {
                    fid,
                    line: ls.clone(),
                });
            }
        }
        _ => {}
    }
}

fn location_or(working: &GeoGeometry<f64>, fallback: (f64, f64)) -> (f64, f64) {
    first_vertex(working).unwrap_or(fallback)
}

/// Run every enabled per-feature check against `working` and push any
/// findings into `sink`.
#[allow(clippy::too_many_arguments)]
fn run_working_geometry_checks(
    working: &GeoGeometry<f64>,
    criteria: &GeometryCriteria,
    checks: &CheckConfig,
    table_id: &str,
    table_name: &str,
    feature_id: &str,
    fallback: (f64, f64),
    sink: &ErrorSink,
) {
    if checks.self_overlap {
        if let Some(loc) = spatial_index::self_overlap(working, criteria.overlap_tolerance, fallback) {
            sink.push(ValidationError::at_point(
                codes::SELF_OVERLAP,
                "feature's own parts overlap one another",
                table_id,
                table_name,
                feature_id,
                Severity::Error,
                loc.0,
                loc.1,
            ));
        }
    }

    if checks.polygon_in_polygon {
        if let Some(loc) = spatial_index::self_contains(working) {
            sink.push(ValidationError::at_point(
                codes::POLYGON_IN_POLYGON,
                "one part of this feature is fully contained in another",
                table_id,
                table_name,
                feature_id,
                Severity::Error,
                loc.0,
                loc.1,
            ));
        }
    }

    if checks.short_object && is_line(working) {
        let len = line_length(working);
        if len < criteria.min_line_length {
            let loc = location_or(working, fallback);
            sink.push(ValidationError::at_point(
                codes::SHORT_LINE,
                format!("line length {len:.3} is below minimum {:.3}", criteria.min_line_length),
                table_id,
                table_name,
                feature_id,
                Severity::Error,
                loc.0,
                loc.1,
            ));
        }
    }

    if checks.small_area && is_polygon(working) {
        let area = surface_area(working);
        if area < criteria.min_polygon_area {
            let loc = location_or(working, fallback);
            sink.push(ValidationError::at_point(
                codes::SMALL_AREA,
                format!("polygon area {area:.3} is below minimum {:.3}", criteria.min_polygon_area),
                table_id,
                table_name,
                feature_id,
                Severity::Error,
                loc.0,
                loc.1,
            ));
        }
    }

    if checks.min_points {
        let result = min_vertex::evaluate(working, criteria.ring_closure_tolerance);
        if !result.ok {
            let loc = location_or(working, fallback);
            sink.push(ValidationError::at_point(
                codes::INSUFFICIENT_VERTICES,
                result.detail,
                table_id,
                table_name,
                feature_id,
                Severity::Error,
                loc.0,
                loc.1,
            ));
        }
    }

    if checks.sliver
        && is_sliver(
            working,
            criteria.sliver_area,
            criteria.sliver_shape_index,
            criteria.sliver_elongation,
        )
    {
        let loc = location_or(working, fallback);
        sink.push(ValidationError::at_point(
            codes::SLIVER,
            "polygon is a sliver (small, non-compact, elongated)",
            table_id,
            table_name,
            feature_id,
            Severity::Error,
            loc.0,
            loc.1,
        ));
    }

    if checks.spikes {
        if let Some(hit) = detect_spike(working, criteria.spike_angle_threshold_degrees) {
            sink.push(ValidationError::at_point(
                codes::SPIKE,
                spike_message(&hit),
                table_id,
                table_name,
                feature_id,
                Severity::Error,
                hit.x,
                hit.y,
            ));
        }
    }
}

/// Drive one cursor sweep of `layer`.
#[allow(clippy::too_many_arguments)]
pub fn scan(
    layer: &mut dyn Layer,
    table_id: &str,
    table_name: &str,
    criteria: &GeometryCriteria,
    checks: &CheckConfig,
    filter: &dyn FeatureFilter,
    rich: &dyn RichValidator,
    sink: &ErrorSink,
    cancel: &CancelToken,
) -> ScanOutcome {
    let expected = layer.feature_count(false);
    let max_iterations = match expected {
        Some(n) if n > 0 => Some(std::cmp::max(10_000, 2 * n)),
        _ => {
            log::debug!(
                "table '{table_id}': backend reported no feature count, disabling the iteration cap"
            );
            None
        }
    };

    let needs_geom = checks.needs_working_geometry();
    let needs_cross = checks.needs_cross_check_pass();
    let needs_network = checks.needs_network_pass();
    let is_line_layer = layer.geometry_type_name().to_lowercase().contains("line");

    let mut processed_fids: HashSet<i64> = HashSet::new();
    let mut processed_count: u64 = 0;
    let mut skipped_count: u64 = 0;
    let mut iterations: u64 = 0;
    let mut cancelled = false;
    let mut indexed_features = Vec::new();
    let mut line_entries = Vec::new();

    loop {
        if let Some(cap) = max_iterations {
            if iterations >= cap {
                log::warn!("table '{table_id}': hit safety iteration cap ({cap}), stopping sweep");
                break;
            }
        }
        if cancel.is_cancelled() {
            cancelled = true;
            break;
        }

        let feature = match layer.next_feature() {
            Some(f) => f,
            None => break,
        };
        iterations += 1;
        let fid = feature.fid();
        let feature_id = fid.to_string();

        if !processed_fids.insert(fid) {
            log::warn!("table '{table_id}': duplicate fid {fid} seen mid-sweep, skipping");
            skipped_count += 1;
            continue;
        }

        let (skip, reason) = filter.should_skip(&*feature, table_id);
        if skip {
            log::debug!("table '{table_id}': skipping fid {fid}: {reason}");
            skipped_count += 1;
            continue;
        }

        let geom = feature.geometry();
        if geom.is_empty() {
            skipped_count += 1;
            continue;
        }

        if checks.self_intersection {
            if let Some(defect) = check_validity(geom, rich) {
                sink.push(validity_error(&defect, table_id, table_name, &feature_id));
            }
        }

        let working = if needs_geom || needs_cross || (needs_network && is_line_layer) {
            Some(geom.to_geo())
        } else {
            None
        };

        if needs_cross {
            if let (Some(env), Some(w)) = (geom.envelope(), working.as_ref()) {
                indexed_features.push(IndexedFeature {
                    fid,
                    envelope: env,
                    geometry: w.clone(),
                });
            }
        }

        if needs_network && is_line_layer {
            if let Some(w) = working.as_ref() {
                collect_line_entries(&mut line_entries, fid, w);
            }
        }

        if needs_geom {
            if let Some(w) = working.as_ref() {
                let fallback = geom.envelope().map(|e| e.center()).unwrap_or((0.0, 0.0));
                run_working_geometry_checks(w, criteria, checks, table_id, table_name, &feature_id, fallback, sink);
            }
        }

        processed_count += 1;
        if processed_count % 100 == 0 {
            log::info!("table '{table_id}': scanned {processed_count} features");
        }
    }

    ScanOutcome {
        processed_count,
        skipped_count,
        cancelled,
        indexed_features,
        line_entries,
    }
}
