//! End-to-end scenarios driven through [`geovalidate::validate`] against the
//! in-memory backend, one per documented check category.

use geo_types::{line_string, polygon, Geometry};
use geovalidate::backend::memory::{MemoryDataset, MemoryFeature, MemoryLayer};
use geovalidate::backend::memory::MemoryBackend;
use geovalidate::backend::NoFilter;
use geovalidate::cache::SpatialIndexCache;
use geovalidate::validity::BasicRichValidator;
use geovalidate::{codes, validate, CancelToken, CheckConfig, GeometryCriteria};

fn single_feature_backend(path: &str, layer_id: &str, geometry_type: &str, geometry: Geometry<f64>) -> MemoryBackend {
    let mut backend = MemoryBackend::new();
    let dataset = MemoryDataset::new().with_layer(
        layer_id,
        MemoryLayer::new(geometry_type, vec![MemoryFeature { fid: 1, geometry }]),
    );
    backend.register(path, dataset);
    backend
}

fn run(
    backend: &MemoryBackend,
    path: &str,
    layer_id: &str,
    criteria: &GeometryCriteria,
    checks: &CheckConfig,
) -> geovalidate::ValidationResult {
    let mut cache = SpatialIndexCache::new();
    validate(
        backend,
        &mut cache,
        path,
        layer_id,
        layer_id,
        criteria,
        checks,
        &NoFilter,
        &BasicRichValidator,
        &CancelToken::new(),
        None,
    )
    .expect("validate should not fail outright")
}

#[test]
fn scenario_short_line() {
    let backend = single_feature_backend(
        "roads.gpkg",
        "roads",
        "LineString",
        Geometry::LineString(line_string![(x: 0.0, y: 0.0), (x: 0.0, y: 0.4)]),
    );
    let mut checks = CheckConfig::default();
    checks.short_object = true;
    let criteria = GeometryCriteria {
        min_line_length: 1.0,
        ..GeometryCriteria::default()
    };
    let result = run(&backend, "roads.gpkg", "roads", &criteria, &checks);
    assert_eq!(result.error_count, 1);
    assert_eq!(result.errors[0].error_code, codes::SHORT_LINE);
    assert_eq!((result.errors[0].x, result.errors[0].y), (0.0, 0.0));
}

#[test]
fn scenario_self_intersecting_bowtie() {
    let backend = single_feature_backend(
        "parcels.gpkg",
        "parcels",
        "Polygon",
        Geometry::Polygon(polygon![
            (x: 0.0, y: 0.0), (x: 10.0, y: 10.0), (x: 10.0, y: 0.0), (x: 0.0, y: 10.0), (x: 0.0, y: 0.0),
        ]),
    );
    let mut checks = CheckConfig::default();
    checks.self_intersection = true;
    let result = run(&backend, "parcels.gpkg", "parcels", &GeometryCriteria::default(), &checks);
    assert_eq!(result.error_count, 1);
    assert_eq!(result.errors[0].error_code, codes::INVALID);
    assert!(result.errors[0].metadata.contains_key("iso19107_error_type"));
}

#[test]
fn scenario_sliver_rectangle() {
    let backend = single_feature_backend(
        "parcels.gpkg",
        "parcels",
        "Polygon",
        Geometry::Polygon(polygon![
            (x: 0.0, y: 0.0), (x: 100.0, y: 0.0), (x: 100.0, y: 0.05), (x: 0.0, y: 0.05),
        ]),
    );
    let mut checks = CheckConfig::default();
    checks.sliver = true;
    let criteria = GeometryCriteria {
        sliver_area: 10.0,
        sliver_shape_index: 0.1,
        sliver_elongation: 50.0,
        ..GeometryCriteria::default()
    };
    let result = run(&backend, "parcels.gpkg", "parcels", &criteria, &checks);
    assert_eq!(result.error_count, 1);
    assert_eq!(result.errors[0].error_code, codes::SLIVER);
}

#[test]
fn scenario_spike_on_closed_ring() {
    let backend = single_feature_backend(
        "parcels.gpkg",
        "parcels",
        "Polygon",
        Geometry::Polygon(polygon![
            (x: 0.0, y: 0.0), (x: 10.0, y: 0.0), (x: 10.0, y: 10.0), (x: 5.0, y: 10.01), (x: 0.0, y: 10.0), (x: 0.0, y: 0.0),
        ]),
    );
    let mut checks = CheckConfig::default();
    checks.spikes = true;
    let criteria = GeometryCriteria {
        spike_angle_threshold_degrees: 10.0,
        ..GeometryCriteria::default()
    };
    let result = run(&backend, "parcels.gpkg", "parcels", &criteria, &checks);
    assert_eq!(result.error_count, 1);
    assert_eq!(result.errors[0].error_code, codes::SPIKE);
}

#[test]
fn scenario_undershoot() {
    let mut backend = MemoryBackend::new();
    let dataset = MemoryDataset::new().with_layer(
        "roads",
        MemoryLayer::new(
            "LineString",
            vec![
                MemoryFeature {
                    fid: 1,
                    geometry: Geometry::LineString(line_string![(x: 0.0, y: 0.0), (x: 10.0, y: 0.0)]),
                },
                MemoryFeature {
                    fid: 2,
                    geometry: Geometry::LineString(line_string![(x: 10.5, y: -5.0), (x: 10.5, y: 5.0)]),
                },
            ],
        ),
    );
    backend.register("roads.gpkg", dataset);
    let mut checks = CheckConfig::default();
    checks.undershoot = true;
    let criteria = GeometryCriteria {
        network_search_distance: 1.0,
        ..GeometryCriteria::default()
    };
    let result = run(&backend, "roads.gpkg", "roads", &criteria, &checks);
    let hit = result
        .errors
        .iter()
        .find(|e| e.feature_id == "1")
        .expect("fid 1 should have a network defect");
    assert_eq!(hit.error_code, codes::UNDERSHOOT);
    assert_eq!(hit.geometry_wkt, "LINESTRING (10 0, 10.5 0)");
}

#[test]
fn scenario_overshoot() {
    let mut backend = MemoryBackend::new();
    let dataset = MemoryDataset::new().with_layer(
        "roads",
        MemoryLayer::new(
            "LineString",
            vec![
                MemoryFeature {
                    fid: 1,
                    geometry: Geometry::LineString(line_string![(x: 0.0, y: 0.0), (x: 10.0, y: 0.0)]),
                },
                MemoryFeature {
                    fid: 2,
                    geometry: Geometry::LineString(line_string![(x: 9.5, y: 0.0), (x: 9.5, y: 5.0)]),
                },
            ],
        ),
    );
    backend.register("roads.gpkg", dataset);
    let mut checks = CheckConfig::default();
    checks.overshoot = true;
    let criteria = GeometryCriteria {
        network_search_distance: 1.0,
        ..GeometryCriteria::default()
    };
    let result = run(&backend, "roads.gpkg", "roads", &criteria, &checks);
    let hit = result
        .errors
        .iter()
        .find(|e| e.feature_id == "1")
        .expect("fid 1 should have a network defect");
    assert_eq!(hit.error_code, codes::OVERSHOOT);
}

#[test]
fn scenario_duplicate_vs_overlap() {
    let mut backend = MemoryBackend::new();
    let sq = || polygon![(x: 0.0, y: 0.0), (x: 10.0, y: 0.0), (x: 10.0, y: 10.0), (x: 0.0, y: 10.0)];
    let shifted = || {
        polygon![
            (x: 0.1, y: 0.0), (x: 10.1, y: 0.0), (x: 10.1, y: 10.0), (x: 0.1, y: 10.0),
        ]
    };
    let dataset = MemoryDataset::new().with_layer(
        "parcels",
        MemoryLayer::new(
            "Polygon",
            vec![
                MemoryFeature { fid: 1, geometry: Geometry::Polygon(sq()) },
                MemoryFeature { fid: 2, geometry: Geometry::Polygon(sq()) },
            ],
        ),
    );
    backend.register("dupes.gpkg", dataset);
    let mut checks = CheckConfig::default();
    checks.duplicate = true;
    checks.overlap = true;
    let result = run(&backend, "dupes.gpkg", "parcels", &GeometryCriteria::default(), &checks);
    assert_eq!(result.error_count, 1);
    assert_eq!(result.errors[0].error_code, codes::DUPLICATE);

    let mut backend = MemoryBackend::new();
    let dataset = MemoryDataset::new().with_layer(
        "parcels",
        MemoryLayer::new(
            "Polygon",
            vec![
                MemoryFeature { fid: 1, geometry: Geometry::Polygon(sq()) },
                MemoryFeature { fid: 2, geometry: Geometry::Polygon(shifted()) },
            ],
        ),
    );
    backend.register("overlap.gpkg", dataset);
    let criteria = GeometryCriteria {
        overlap_tolerance: 0.01,
        ..GeometryCriteria::default()
    };
    let result = run(&backend, "overlap.gpkg", "parcels", &criteria, &checks);
    assert_eq!(result.error_count, 1);
    assert_eq!(result.errors[0].error_code, codes::OVERLAP);
}

#[test]
fn scanner_visits_each_fid_once_and_accounts_for_every_feature() {
    let mut backend = MemoryBackend::new();
    let dataset = MemoryDataset::new().with_layer(
        "roads",
        MemoryLayer::new(
            "LineString",
            (1..=5)
                .map(|fid| MemoryFeature {
                    fid,
                    geometry: Geometry::LineString(line_string![(x: 0.0, y: 0.0), (x: 10.0, y: 0.0)]),
                })
                .collect(),
        ),
    );
    backend.register("roads.gpkg", dataset);
    let result = run(
        &backend,
        "roads.gpkg",
        "roads",
        &GeometryCriteria::default(),
        &CheckConfig::default(),
    );
    assert_eq!(result.error_count, 0);
    assert_eq!(result.skipped_count, 0);
}

#[test]
fn missing_layer_is_reported_as_a_warning_not_an_error() {
    let backend = single_feature_backend(
        "roads.gpkg",
        "roads",
        "LineString",
        Geometry::LineString(line_string![(x: 0.0, y: 0.0), (x: 10.0, y: 0.0)]),
    );
    let result = run(
        &backend,
        "roads.gpkg",
        "nonexistent",
        &GeometryCriteria::default(),
        &CheckConfig::default(),
    );
    assert!(result.is_valid);
    assert_eq!(result.warning_count, 1);
    assert_eq!(result.error_count, 0);
}
