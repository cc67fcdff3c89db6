//! Spatial-Index Cross-Checks (C5): duplicate and overlap detection over a
//! whole layer via an R-tree, both O(n log n + k) where k is candidate pairs.
//!
//! Candidate-pair evaluation is embarrassingly parallel (read-only, no
//! shared mutable state) and is dispatched with `rayon`.

use std::sync::atomic::{AtomicUsize, Ordering};

use geo::{Area, BooleanOps, Relate};
use geo_types::Geometry;
use rayon::prelude::*;
use rstar::{RTree, RTreeObject, AABB};

use crate::backend::Envelope;
use crate::cancel::{CancelToken, CANDIDATE_CHECK_INTERVAL};
use crate::predicates::is_polygon;

/// One feature's envelope and owned, linearized/flattened geometry, as
/// collected by a single cursor sweep before the index is built.
#[derive(Debug, Clone)]
pub struct IndexedFeature {
    pub fid: i64,
    pub envelope: Envelope,
    pub geometry: Geometry<f64>,
}

/// The R-tree payload: just the fid and envelope. The owned geometry stays
/// in the `IndexedFeature` slice; looking it up by fid keeps the tree small
/// and avoids cloning geometry into the tree itself.
pub(crate) struct EnvelopeLeaf {
    fid: i64,
    aabb: AABB<[f64; 2]>,
}

impl RTreeObject for EnvelopeLeaf {
    type Envelope = AABB<[f64; 2]>;

    fn envelope(&self) -> Self::Envelope {
        self.aabb
    }
}

fn to_aabb(e: &Envelope) -> AABB<[f64; 2]> {
    AABB::from_corners([e.min_x, e.min_y], [e.max_x, e.max_y])
}

/// Build the per-`(file, layer)` spatial index over `features`.
pub(crate) fn build_index(features: &[IndexedFeature]) -> RTree<EnvelopeLeaf> {
    let leaves: Vec<EnvelopeLeaf> = features
        .iter()
        .map(|f| EnvelopeLeaf {
            fid: f.fid,
            aabb: to_aabb(&f.envelope),
        })
        .collect();
    RTree::bulk_load(leaves)
}

/// Every unordered pair `(fid_a, fid_b)` with `fid_a < fid_b` whose envelopes
/// intersect, found via the index rather than an O(n^2) scan.
fn candidate_pairs(features: &[IndexedFeature], index: &RTree<EnvelopeLeaf>) -> Vec<(usize, usize)> {
    let by_fid: std::collections::HashMap<i64, usize> =
        features.iter().enumerate().map(|(i, f)| (f.fid, i)).collect();
    let mut pairs = Vec::new();
    for (i, feature) in features.iter().enumerate() {
        let aabb = to_aabb(&feature.envelope);
        for leaf in index.locate_in_envelope_intersecting(&aabb) {
            if leaf.fid <= feature.fid {
                continue;
            }
            if let Some(&j) = by_fid.get(&leaf.fid) {
                pairs.push((i, j));
            }
        }
    }
    pairs
}

/// `a` and `b` are equal as topological sets: each contains the other.
fn topologically_equal(a: &Geometry<f64>, b: &Geometry<f64>) -> bool {
    let im = a.relate(b);
    im.is_contains() && im.is_within()
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DuplicateHit {
    pub kept_fid: i64,
    pub duplicate_fid: i64,
    pub location: (f64, f64),
}

/// Report a duplicate once per pair, attributed to the fid encountered later
/// in fid order. Cancellation is polled every `CANDIDATE_CHECK_INTERVAL`
/// candidates.
pub fn find_duplicates(features: &[IndexedFeature], index: &RTree<EnvelopeLeaf>, cancel: &CancelToken) -> Vec<DuplicateHit> {
    let pairs = candidate_pairs(features, index);
    let checked = AtomicUsize::new(0);
    pairs
        .par_iter()
        .filter_map(|&(i, j)| {
            let n = checked.fetch_add(1, Ordering::Relaxed);
            if n % CANDIDATE_CHECK_INTERVAL == 0 && cancel.is_cancelled() {
                return None;
            }
            let a = &features[i];
            let b = &features[j];
            if topologically_equal(&a.geometry, &b.geometry) {
                Some(DuplicateHit {
                    kept_fid: a.fid,
                    duplicate_fid: b.fid,
                    location: b.envelope.center(),
                })
            } else {
                None
            }
        })
        .collect()
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OverlapHit {
    pub fid_a: i64,
    pub fid_b: i64,
    pub location: (f64, f64),
}

/// A pair overlaps when the intersection area exceeds `overlap_tolerance`
/// and neither geometry contains the other. Only meaningful for polygonal
/// geometry; non-polygonal pairs are skipped. Cancellation is polled every
/// `CANDIDATE_CHECK_INTERVAL` candidates.
pub fn find_overlaps(
    features: &[IndexedFeature],
    index: &RTree<EnvelopeLeaf>,
    overlap_tolerance: f64,
    cancel: &CancelToken,
) -> Vec<OverlapHit> {
    let pairs = candidate_pairs(features, index);
    let checked = AtomicUsize::new(0);
    pairs
        .par_iter()
        .filter_map(|&(i, j)| {
            let n = checked.fetch_add(1, Ordering::Relaxed);
            if n % CANDIDATE_CHECK_INTERVAL == 0 && cancel.is_cancelled() {
                return None;
            }
            let a = &features[i];
            let b = &features[j];
            if !is_polygon(&a.geometry) || !is_polygon(&b.geometry) {
                return None;
            }
            let (pa, pb) = match (&a.geometry, &b.geometry) {
                (Geometry::Polygon(pa), Geometry::Polygon(pb)) => {
                    (geo_types::MultiPolygon(vec![pa.clone()]), geo_types::MultiPolygon(vec![pb.clone()]))
                }
                (Geometry::MultiPolygon(pa), Geometry::Polygon(pb)) => {
                    (pa.clone(), geo_types::MultiPolygon(vec![pb.clone()]))
                }
                (Geometry::Polygon(pa), Geometry::MultiPolygon(pb)) => {
                    (geo_types::MultiPolygon(vec![pa.clone()]), pb.clone())
                }
                (Geometry::MultiPolygon(pa), Geometry::MultiPolygon(pb)) => (pa.clone(), pb.clone()),
                _ => return None,
            };
            let im = a.geometry.relate(&b.geometry);
            if im.is_contains() || im.is_within() {
                return None;
            }
            let intersection = pa.intersection(&pb);
            let area = intersection.unsigned_area();
            if area <= overlap_tolerance {
                return None;
            }
            let location = intersection
                .0
                .first()
                .map(|p| p.exterior().0.first().map(|c| (c.x, c.y)).unwrap_or(a.envelope.center()))
                .unwrap_or_else(|| a.envelope.center());
            Some(OverlapHit {
                fid_a: a.fid,
                fid_b: b.fid,
                location,
            })
        })
        .collect()
}

/// Checks a single `MultiPolygon` feature's own parts against each other,
/// reusing the same intersection/containment machinery as the cross-feature
/// passes above: the within-feature analogue of C5's pairwise overlap/
/// containment test, since a `Polygon` (single part) can never self-overlap
/// or contain itself.
fn multipolygon_parts(g: &Geometry<f64>) -> Option<&[geo_types::Polygon<f64>]> {
    match g {
        Geometry::MultiPolygon(mp) if mp.0.len() >= 2 => Some(&mp.0),
        _ => None,
    }
}

/// First pair of parts whose intersection area exceeds `overlap_tolerance`
/// and where neither contains the other; `(x, y)` is the intersection's
/// first vertex (fallback: the feature's envelope center).
pub fn self_overlap(g: &Geometry<f64>, overlap_tolerance: f64, fallback: (f64, f64)) -> Option<(f64, f64)> {
    let parts = multipolygon_parts(g)?;
    for i in 0..parts.len() {
        for j in (i + 1)..parts.len() {
            let a = &parts[i];
            let b = &parts[j];
            let im = a.relate(b);
            if im.is_contains() || im.is_within() {
                continue;
            }
            let intersection = geo_types::MultiPolygon(vec![a.clone()]).intersection(&geo_types::MultiPolygon(vec![b.clone()]));
            if intersection.unsigned_area() > overlap_tolerance {
                let loc = intersection
                    .0
                    .first()
                    .and_then(|p| p.exterior().0.first())
                    .map(|c| (c.x, c.y))
                    .unwrap_or(fallback);
                return Some(loc);
            }
        }
    }
    None
}

/// First pair of parts where one fully contains the other; `(x, y)` is the
/// contained part's first vertex.
pub fn self_contains(g: &Geometry<f64>) -> Option<(f64, f64)> {
    let parts = multipolygon_parts(g)?;
    for i in 0..parts.len() {
        for j in 0..parts.len() {
            if i == j {
                continue;
            }
            let a = &parts[i];
            let b = &parts[j];
            if a.relate(b).is_contains() && !a.relate(b).is_within() {
                return b.exterior().0.first().map(|c| (c.x, c.y));
            }
        }
    }
    None
}
