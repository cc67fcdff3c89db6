//! Minimum-Vertex Evaluator (C3): per-type cardinality rules.
//!
//! Counts are measured on the already linearized, 2D-flattened geometry the
//! Scanner hands every analyzer. The first failing sub-component
//! short-circuits with a structured detail string.

use geo_types::Geometry;

use crate::predicates::{ring_is_closed, unique_point_count};

#[derive(Debug, Clone, PartialEq)]
pub struct MinVertexResult {
    pub ok: bool,
    pub observed: usize,
    pub required: usize,
    pub detail: String,
}

impl MinVertexResult {
    fn pass(observed: usize, required: usize) -> Self {
        MinVertexResult {
            ok: true,
            observed,
            required,
            detail: String::new(),
        }
    }

    fn fail(observed: usize, required: usize, detail: impl Into<String>) -> Self {
        MinVertexResult {
            ok: false,
            observed,
            required,
            detail: detail.into(),
        }
    }
}

/// Check a single polygon ring-by-ring: each ring must be closed within
/// tolerance and have at least 3 unique points. Rings are numbered from 0
/// (exterior) so a failure message can point at a specific hole.
fn evaluate_polygon_rings(
    exterior: &geo_types::LineString<f64>,
    interiors: &[geo_types::LineString<f64>],
    ring_closure_tolerance: f64,
) -> Result<usize, MinVertexResult> {
    let mut total_unique = 0usize;
    let mut rings = std::iter::once(exterior).chain(interiors.iter());
    for (idx, ring) in (0..).zip(&mut rings) {
        if !ring_is_closed(ring, ring_closure_tolerance) {
            return Err(MinVertexResult::fail(
                ring.0.len(),
                3,
                format!("링 {idx}가 폐합되지 않았습니다"),
            ));
        }
        let unique = unique_point_count(ring, ring_closure_tolerance);
        if unique < 3 {
            return Err(MinVertexResult::fail(
                unique,
                3,
                format!("링 {idx}의 고유 정점이 {unique}개로 3개 미만입니다"),
            ));
        }
        total_unique += unique;
    }
    Ok(total_unique)
}

/// Evaluate the minimum-vertex rule for `g`.
pub fn evaluate(g: &Geometry<f64>, ring_closure_tolerance: f64) -> MinVertexResult {
    match g {
        Geometry::Point(_) => MinVertexResult::pass(1, 1),
        Geometry::MultiPoint(mp) => {
            let n = mp.0.len();
            if n >= 1 {
                MinVertexResult::pass(n, 1)
            } else {
                MinVertexResult::fail(n, 1, "포인트가 하나도 없습니다")
            }
        }
        Geometry::LineString(ls) => {
            let n = ls.0.len();
            if n >= 2 {
                MinVertexResult::pass(n, 2)
            } else {
                MinVertexResult::fail(n, 2, "선의 정점이 2개 미만입니다")
            }
        }
        Geometry::MultiLineString(mls) => {
            let mut total = 0usize;
            for (idx, part) in mls.0.iter().enumerate() {
                let n = part.0.len();
                if n < 2 {
                    return MinVertexResult::fail(
                        n,
                        2,
                        format!("라인 {idx}의 정점이 2개 미만입니다"),
                    );
                }
                total += n;
            }
            if total >= 2 {
                MinVertexResult::pass(total, 2)
            } else {
                MinVertexResult::fail(total, 2, "멀티라인의 전체 정점이 2개 미만입니다")
            }
        }
        Geometry::Polygon(p) => {
            match evaluate_polygon_rings(p.exterior(), p.interiors(), ring_closure_tolerance) {
                Ok(total_unique) => MinVertexResult::pass(total_unique, 3),
                Err(failure) => failure,
            }
        }
        Geometry::MultiPolygon(mp) => {
            if mp.0.is_empty() {
                return MinVertexResult::fail(0, 1, "폴리곤이 하나도 없습니다");
            }
            let mut total_unique = 0usize;
            for (poly_idx, poly) in mp.0.iter().enumerate() {
                match evaluate_polygon_rings(
                    poly.exterior(),
                    poly.interiors(),
                    ring_closure_tolerance,
                ) {
                    Ok(unique) => total_unique += unique,
                    Err(failure) => {
                        return MinVertexResult::fail(
                            failure.observed,
                            failure.required,
                            format!("폴리곤 {poly_idx}: {}", failure.detail),
                        );
                    }
                }
            }
            if total_unique >= 3 {
                MinVertexResult::pass(total_unique, 3)
            } else {
                MinVertexResult::fail(total_unique, 3, "멀티폴리곤의 고유 정점이 3개 미만입니다")
            }
        }
        _ => MinVertexResult::pass(0, 0),
    }
}
