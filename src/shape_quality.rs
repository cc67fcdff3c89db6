//! Shape-Quality Analyzers (C2): the sliver predicate and the spike
//! detector.

use geo_types::{Coord, Geometry, LineString, Polygon};

use crate::predicates::{angle, surface_area};

/// `shape_index = 4π·area / perimeter²`; `elongation` is its reciprocal.
/// Exposed for callers that want to report the raw numbers alongside a
/// sliver finding.
pub fn shape_index(area: f64, perimeter: f64) -> f64 {
    if perimeter == 0.0 {
        return 0.0;
    }
    4.0 * std::f64::consts::PI * area / (perimeter * perimeter)
}

pub fn elongation(area: f64, perimeter: f64) -> f64 {
    if area == 0.0 {
        return f64::INFINITY;
    }
    (perimeter * perimeter) / (4.0 * std::f64::consts::PI * area)
}

fn ring_perimeter(ring: &LineString<f64>) -> f64 {
    ring.coords()
        .zip(ring.coords().skip(1))
        .map(|(a, b)| ((a.x - b.x).powi(2) + (a.y - b.y).powi(2)).sqrt())
        .sum()
}

fn polygon_perimeter(poly: &Polygon<f64>) -> f64 {
    ring_perimeter(poly.exterior()) + poly.interiors().iter().map(ring_perimeter).sum::<f64>()
}

/// Total perimeter of a (multi)polygon geometry; `0` for anything else.
fn total_perimeter(g: &Geometry<f64>) -> f64 {
    match g {
        Geometry::Polygon(p) => polygon_perimeter(p),
        Geometry::MultiPolygon(mp) => mp.0.iter().map(polygon_perimeter).sum(),
        _ => 0.0,
    }
}

/// Sliver predicate: conjunctively small, non-compact, and elongated. Any
/// failure to compute (non-polygonal, zero area, zero perimeter) is
/// swallowed as `false`.
pub fn is_sliver(
    g: &Geometry<f64>,
    sliver_area: f64,
    sliver_shape_index: f64,
    sliver_elongation: f64,
) -> bool {
    use crate::predicates::is_polygon;
    if !is_polygon(g) {
        return false;
    }
    let area = surface_area(g);
    let perimeter = total_perimeter(g);
    if area <= 0.0 || perimeter <= 0.0 {
        log::debug!("is_sliver: zero area or perimeter, treating as non-sliver");
        return false;
    }
    let si = shape_index(area, perimeter);
    let el = elongation(area, perimeter);
    area < sliver_area && si < sliver_shape_index && el > sliver_elongation
}

/// A spike finding: the sharpest vertex in the ring/part that violated the
/// angle threshold.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SpikeHit {
    pub vertex_index: usize,
    pub angle_degrees: f64,
    pub x: f64,
    pub y: f64,
}

/// Scan one coordinate sequence for a spike, with wrap-around indexing if
/// the sequence is a closed ring.
fn scan_sequence(coords: &[Coord<f64>], threshold_degrees: f64) -> Option<SpikeHit> {
    if coords.len() < 3 {
        return None;
    }
    let closed = {
        let first = coords[0];
        let last = coords[coords.len() - 1];
        ((first.x - last.x).powi(2) + (first.y - last.y).powi(2)).sqrt() < 1e-9
    };

    let mut best: Option<SpikeHit> = None;
    let mut consider = |index: usize, prev: Coord<f64>, cur: Coord<f64>, next: Coord<f64>| {
        let a = angle((prev.x, prev.y), (cur.x, cur.y), (next.x, next.y));
        if a < threshold_degrees {
            let sharper = match best {
                Some(b) => a < b.angle_degrees,
                None => true,
            };
            if sharper {
                best = Some(SpikeHit {
                    vertex_index: index,
                    angle_degrees: a,
                    x: cur.x,
                    y: cur.y,
                });
            }
        }
    };

    if closed {
        let effective = &coords[..coords.len() - 1];
        let count = effective.len();
        if count < 3 {
            return None;
        }
        for i in 0..count {
            let prev = effective[(i + count - 1) % count];
            let cur = effective[i];
            let next = effective[(i + 1) % count];
            consider(i, prev, cur, next);
        }
    } else {
        let count = coords.len();
        for i in 1..count - 1 {
            consider(i, coords[i - 1], coords[i], coords[i + 1]);
        }
    }
    best
}

/// Build the fixed-format Korean message this finding is reported with.
pub fn spike_message(hit: &SpikeHit) -> String {
    format!(
        "스파이크 검출: 정점 {}번 각도 {:.1}도",
        hit.vertex_index, hit.angle_degrees
    )
}

/// Detect a spike anywhere in `g`, short-circuiting on the first ring/part
/// that contains one.
///
/// Covers every linear ring (polygon exterior + holes, each polygon of a
/// `MultiPolygon`) and every linear part (`LineString`, each part of a
/// `MultiLineString`).
pub fn detect_spike(g: &Geometry<f64>, threshold_degrees: f64) -> Option<SpikeHit> {
    match g {
        Geometry::LineString(ls) => scan_sequence(&ls.0, threshold_degrees),
        Geometry::MultiLineString(mls) => mls
            .0
            .iter()
            .find_map(|ls| scan_sequence(&ls.0, threshold_degrees)),
        Geometry::Polygon(p) => polygon_spike(p, threshold_degrees),
        Geometry::MultiPolygon(mp) => mp
            .0
            .iter()
            .find_map(|p| polygon_spike(p, threshold_degrees)),
        _ => None,
    }
}

fn polygon_spike(p: &Polygon<f64>, threshold_degrees: f64) -> Option<SpikeHit> {
    scan_sequence(&p.exterior().0, threshold_degrees).or_else(|| {
        p.interiors()
            .iter()
            .find_map(|ring| scan_sequence(&ring.0, threshold_degrees))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo_types::polygon;

    #[test]
    fn sliver_rejects_non_polygonal() {
        assert!(!is_sliver(
            &Geometry::LineString(geo_types::line_string![(x: 0., y: 0.), (x: 1., y: 0.)]),
            100.0,
            0.5,
            2.0
        ));
    }

    #[test]
    fn thin_rectangle_is_a_sliver() {
        // 100 x 0.05 rectangle: area 5, perimeter ~200.1.
        let rect = polygon![
            (x: 0.0, y: 0.0),
            (x: 100.0, y: 0.0),
            (x: 100.0, y: 0.05),
            (x: 0.0, y: 0.05),
        ];
        let g = Geometry::Polygon(rect);
        assert!(is_sliver(&g, 10.0, 0.1, 50.0));
    }

    #[test]
    fn compact_square_is_not_a_sliver() {
        let sq = polygon![(x: 0.0, y: 0.0), (x: 10.0, y: 0.0), (x: 10.0, y: 10.0), (x: 0.0, y: 10.0)];
        let g = Geometry::Polygon(sq);
        assert!(!is_sliver(&g, 1000.0, 0.1, 50.0));
    }

    #[test]
    fn spike_detected_at_expected_vertex() {
        let ring = geo_types::line_string![
            (x: 0.0, y: 0.0),
            (x: 10.0, y: 0.0),
            (x: 10.0, y: 10.0),
            (x: 5.0, y: 10.01),
            (x: 0.0, y: 10.0),
            (x: 0.0, y: 0.0),
        ];
        let g = Geometry::Polygon(Polygon::new(ring, vec![]));
        let hit = detect_spike(&g, 10.0).expect("expected a spike");
        assert_eq!(hit.vertex_index, 3);
        assert!(hit.angle_degrees < 1.0);
    }

    #[test]
    fn no_spike_below_threshold_on_convex_square() {
        let sq = polygon![(x: 0.0, y: 0.0), (x: 10.0, y: 0.0), (x: 10.0, y: 10.0), (x: 0.0, y: 10.0)];
        assert!(detect_spike(&Geometry::Polygon(sq), 10.0).is_none());
    }
}
