//! Geometry Predicates (C1): pure functions over [`geo_types::Geometry`].
//!
//! Most of these are bespoke; where the `geo` crate already ships an
//! equivalent (polygon area), it is reused instead of hand-rolled here.

use geo::Area;
use geo_types::{Coord, Geometry, LineString};

/// True for `LineString` and `MultiLineString`.
pub fn is_line(g: &Geometry<f64>) -> bool {
    matches!(g, Geometry::LineString(_) | Geometry::MultiLineString(_))
}

/// True for `Polygon` and `MultiPolygon`.
pub fn is_polygon(g: &Geometry<f64>) -> bool {
    matches!(g, Geometry::Polygon(_) | Geometry::MultiPolygon(_))
}

/// `area(g)` for polygonal geometry, `0` otherwise or on any failure.
/// Non-polygonal or empty geometry always yields `0`.
pub fn surface_area(g: &Geometry<f64>) -> f64 {
    match g {
        Geometry::Polygon(p) => p.unsigned_area(),
        Geometry::MultiPolygon(mp) => mp.unsigned_area(),
        _ => 0.0,
    }
}

/// `length(g)` for linear geometry, `0` otherwise. Used by the short-object
/// check (`min_line_length`).
pub fn line_length(g: &Geometry<f64>) -> f64 {
    fn ring_length(ls: &LineString<f64>) -> f64 {
        ls.coords()
            .zip(ls.coords().skip(1))
            .map(|(a, b)| ((a.x - b.x).powi(2) + (a.y - b.y).powi(2)).sqrt())
            .sum()
    }
    match g {
        Geometry::LineString(ls) => ring_length(ls),
        Geometry::MultiLineString(mls) => mls.0.iter().map(ring_length).sum(),
        _ => 0.0,
    }
}

/// True iff the ring's first and last coordinate are within `tol` of one
/// another (Euclidean, squared comparison to avoid a sqrt).
pub fn ring_is_closed(ring: &LineString<f64>, tol: f64) -> bool {
    let coords = ring.0.as_slice();
    match (coords.first(), coords.last()) {
        (Some(first), Some(last)) if coords.len() >= 2 => {
            sq_dist(*first, *last) <= tol * tol
        }
        _ => false,
    }
}

/// Number of distinct points in `ring` after quantizing each coordinate to
/// the grid `(round(x / tol), round(y / tol))`.
///
/// Robust to floating noise and collapses a closed ring's duplicated
/// closing vertex to one point.
pub fn unique_point_count(ring: &LineString<f64>, tol: f64) -> usize {
    use std::collections::HashSet;
    let tol = if tol <= 0.0 { 1e-9 } else { tol };
    let mut seen: HashSet<(i64, i64)> = HashSet::new();
    for c in ring.coords() {
        let key = ((c.x / tol).round() as i64, (c.y / tol).round() as i64);
        seen.insert(key);
    }
    seen.len()
}

/// Interior angle at `b`, in degrees, for the path `a -> b -> c`.
///
/// Returns 180 degrees (a straight, non-spiky angle) if either edge has
/// zero length, since there's no meaningful angle to report.
///
/// `angle(a, b, c) == angle(c, b, a)` by construction (the dot-product
/// formula is symmetric in its two vectors).
pub fn angle(a: (f64, f64), b: (f64, f64), c: (f64, f64)) -> f64 {
    let ab = (a.0 - b.0, a.1 - b.1);
    let cb = (c.0 - b.0, c.1 - b.1);
    let mag_ab = (ab.0 * ab.0 + ab.1 * ab.1).sqrt();
    let mag_cb = (cb.0 * cb.0 + cb.1 * cb.1).sqrt();
    if mag_ab == 0.0 || mag_cb == 0.0 {
        return 180.0;
    }
    let dot = ab.0 * cb.0 + ab.1 * cb.1;
    let cos_theta = (dot / (mag_ab * mag_cb)).clamp(-1.0, 1.0);
    cos_theta.acos().to_degrees()
}

/// Shortest distance from `p` to the segment `a-b`, via projection with
/// endpoint clamping.
pub fn distance_point_to_segment(p: (f64, f64), a: (f64, f64), b: (f64, f64)) -> f64 {
    let (closest, _) = closest_point_on_segment(p, a, b);
    ((p.0 - closest.0).powi(2) + (p.1 - closest.1).powi(2)).sqrt()
}

/// The point on segment `a-b` closest to `p`, and the parametric `t` along
/// `a-b` (clamped to `[0, 1]`) at which it occurs.
pub fn closest_point_on_segment(
    p: (f64, f64),
    a: (f64, f64),
    b: (f64, f64),
) -> ((f64, f64), f64) {
    let ab = (b.0 - a.0, b.1 - a.1);
    let len_sq = ab.0 * ab.0 + ab.1 * ab.1;
    if len_sq == 0.0 {
        return (a, 0.0);
    }
    let ap = (p.0 - a.0, p.1 - a.1);
    let t = ((ap.0 * ab.0 + ap.1 * ab.1) / len_sq).clamp(0.0, 1.0);
    ((a.0 + ab.0 * t, a.1 + ab.1 * t), t)
}

/// Deterministic first coordinate for a geometry: drills into the outermost
/// first ring/part for polygonal and multi-part types.
pub fn first_vertex(g: &Geometry<f64>) -> Option<(f64, f64)> {
    match g {
        Geometry::Point(p) => Some((p.x(), p.y())),
        Geometry::MultiPoint(mp) => mp.0.first().map(|p| (p.x(), p.y())),
        Geometry::LineString(ls) => ls.0.first().map(coord_tuple),
        Geometry::MultiLineString(mls) => {
            mls.0.first().and_then(|ls| ls.0.first()).map(coord_tuple)
        }
        Geometry::Polygon(poly) => poly.exterior().0.first().map(coord_tuple),
        Geometry::MultiPolygon(mp) => mp
            .0
            .first()
            .and_then(|poly| poly.exterior().0.first())
            .map(coord_tuple),
        _ => None,
    }
}

fn coord_tuple(c: &Coord<f64>) -> (f64, f64) {
    (c.x, c.y)
}

fn sq_dist(a: Coord<f64>, b: Coord<f64>) -> f64 {
    let dx = a.x - b.x;
    let dy = a.y - b.y;
    dx * dx + dy * dy
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo_types::{line_string, polygon, Point};

    #[test]
    fn line_length_sums_segment_lengths() {
        let ls: LineString<f64> = line_string![(x: 0., y: 0.), (x: 3., y: 4.), (x: 3., y: 0.)];
        assert_eq!(line_length(&Geometry::LineString(ls)), 9.0);
    }

    #[test]
    fn surface_area_zero_for_non_polygonal() {
        assert_eq!(surface_area(&Geometry::Point(Point::new(1.0, 2.0))), 0.0);
        let ls: LineString<f64> = line_string![(x: 0., y: 0.), (x: 1., y: 1.)];
        assert_eq!(surface_area(&Geometry::LineString(ls)), 0.0);
    }

    #[test]
    fn surface_area_matches_shoelace_for_square() {
        let sq = polygon![(x: 0., y: 0.), (x: 10., y: 0.), (x: 10., y: 10.), (x: 0., y: 10.)];
        assert_eq!(surface_area(&Geometry::Polygon(sq)), 100.0);
    }

    #[test]
    fn ring_closure_respects_tolerance() {
        let closed: LineString<f64> =
            line_string![(x: 0., y: 0.), (x: 1., y: 0.), (x: 1., y: 1.), (x: 0., y: 0.)];
        assert!(ring_is_closed(&closed, 1e-9));

        let open: LineString<f64> = line_string![(x: 0., y: 0.), (x: 1., y: 0.), (x: 1.0001, y: 0.0001)];
        assert!(!ring_is_closed(&open, 1e-9));
        assert!(ring_is_closed(&open, 1e-2));
    }

    #[test]
    fn unique_point_count_collapses_closing_vertex() {
        let ring: LineString<f64> =
            line_string![(x: 0., y: 0.), (x: 10., y: 0.), (x: 10., y: 10.), (x: 0., y: 0.)];
        assert_eq!(unique_point_count(&ring, 1e-7), 3);
    }

    #[test]
    fn unique_point_count_is_order_invariant_under_tolerance() {
        let ring: LineString<f64> = line_string![
            (x: 0., y: 0.),
            (x: 0.0000001, y: 0.0000001),
            (x: 10., y: 0.),
        ];
        assert_eq!(unique_point_count(&ring, 1e-3), 2);
    }

    #[test]
    fn angle_is_symmetric_and_bounded() {
        let a = (0.0, 1.0);
        let b = (0.0, 0.0);
        let c = (1.0, 0.0);
        let forward = angle(a, b, c);
        let backward = angle(c, b, a);
        assert!((forward - backward).abs() < 1e-9);
        assert!((0.0..=180.0).contains(&forward));
        assert!((forward - 90.0).abs() < 1e-9);
    }

    #[test]
    fn angle_degenerate_edge_returns_straight() {
        assert_eq!(angle((1.0, 1.0), (1.0, 1.0), (2.0, 2.0)), 180.0);
    }

    #[test]
    fn distance_point_to_segment_clamps_to_endpoints() {
        let d = distance_point_to_segment((-5.0, 1.0), (0.0, 0.0), (10.0, 0.0));
        assert!((d - ((-5.0f64).powi(2) + 1.0).sqrt()).abs() < 1e-9);
    }

    #[test]
    fn first_vertex_drills_into_outermost_ring() {
        let sq = polygon![(x: 1., y: 2.), (x: 10., y: 0.), (x: 10., y: 10.)];
        assert_eq!(first_vertex(&Geometry::Polygon(sq)), Some((1.0, 2.0)));
    }
}
