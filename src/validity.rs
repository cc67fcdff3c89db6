//! Validity Adapter (C4): bridges the fast native `is_valid`/`is_simple`
//! check to a richer, location-carrying validator.
//!
//! Also ships [`BasicRichValidator`], a reference [`RichValidator`]
//! implementation used by this crate's own test suite and
//! [`crate::backend::memory::MemoryBackend`]. Production callers are
//! expected to plug in whatever their geometry library offers instead,
//! since the richer operator is treated as an external capability.

use std::panic::{self, AssertUnwindSafe};
use std::str::FromStr;

use geo_types::{Geometry, LineString};

use crate::backend::{GeometryValue, Iso19107ErrorType, RichValidator, RichValidityReport};
use crate::predicates::first_vertex;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DefectKind {
    Invalid,
    NonSimple,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ValidityDefect {
    pub kind: DefectKind,
    pub error_type: Option<Iso19107ErrorType>,
    pub message: String,
    pub location: (f64, f64),
}

fn fallback_location(geom: &dyn GeometryValue, kind: DefectKind) -> (f64, f64) {
    match kind {
        DefectKind::Invalid => geom.envelope().map(|e| e.center()).unwrap_or((0.0, 0.0)),
        DefectKind::NonSimple => {
            let owned = panic::catch_unwind(AssertUnwindSafe(|| geom.to_geo())).ok();
            owned
                .as_ref()
                .and_then(first_vertex)
                .unwrap_or((0.0, 0.0))
        }
    }
}

/// Run the fast native checks first; only on a defect do we pay for WKT
/// export and the richer operator. Any panic from backend code or the rich
/// validator is treated as "invalid", conservatively.
pub fn check_validity(
    geom: &dyn GeometryValue,
    rich: &dyn RichValidator,
) -> Option<ValidityDefect> {
    let is_valid = panic::catch_unwind(AssertUnwindSafe(|| geom.is_valid())).unwrap_or(false);
    let is_simple = panic::catch_unwind(AssertUnwindSafe(|| geom.is_simple())).unwrap_or(false);

    if is_valid && is_simple {
        return None;
    }
    let kind = if !is_valid {
        DefectKind::Invalid
    } else {
        DefectKind::NonSimple
    };

    let wkt_text = panic::catch_unwind(AssertUnwindSafe(|| geom.export_wkt())).ok();
    let report = wkt_text
        .as_deref()
        .and_then(|w| panic::catch_unwind(AssertUnwindSafe(|| rich.analyze(w))).ok());

    Some(match report {
        Some(r) => ValidityDefect {
            kind,
            error_type: Some(r.error_type),
            message: r.message,
            location: r.location.unwrap_or_else(|| fallback_location(geom, kind)),
        },
        None => ValidityDefect {
            kind,
            error_type: None,
            message: "geometry failed the native validity/simplicity check".to_string(),
            location: fallback_location(geom, kind),
        },
    })
}

/// A self-contained, dependency-free richer validator that finds ring
/// self-intersections. Good enough to give `MemoryBackend`-based tests a
/// real error type and location; production backends are expected to bring
/// their own (e.g. a real ISO 19107 engine).
#[derive(Debug, Clone, Copy, Default)]
pub struct BasicRichValidator;

impl RichValidator for BasicRichValidator {
    fn analyze(&self, wkt_text: &str) -> RichValidityReport {
        let parsed = wkt::Wkt::<f64>::from_str(wkt_text)
            .ok()
            .and_then(|w| Geometry::<f64>::try_from(w).ok());

        let Some(geometry) = parsed else {
            return RichValidityReport {
                error_type: Iso19107ErrorType::Other,
                message: "could not parse WKT for detailed analysis".to_string(),
                location: None,
            };
        };

        for ring in rings_of(&geometry) {
            if let Some(point) = self_intersection_point(ring) {
                return RichValidityReport {
                    error_type: Iso19107ErrorType::RingSelfIntersection,
                    message: "ring is self-intersecting".to_string(),
                    location: Some(point),
                };
            }
        }

        RichValidityReport {
            error_type: Iso19107ErrorType::Other,
            message: "geometry is invalid or non-simple for an undetermined reason".to_string(),
            location: None,
        }
    }
}

/// True if any ring/part of `g` self-intersects. Shared with
/// [`crate::backend::memory`], which uses it to give the in-memory test
/// backend a real `is_valid`/`is_simple` rather than always returning `true`.
pub(crate) fn has_self_intersection(g: &Geometry<f64>) -> bool {
    rings_of(g).into_iter().any(|ring| self_intersection_point(ring).is_some())
}

fn rings_of(g: &Geometry<f64>) -> Vec<&LineString<f64>> {
    match g {
        Geometry::Polygon(p) => {
            let mut rings = vec![p.exterior()];
            rings.extend(p.interiors().iter());
            rings
        }
        Geometry::MultiPolygon(mp) => mp
            .0
            .iter()
            .flat_map(|p| {
                let mut rings = vec![p.exterior()];
                rings.extend(p.interiors().iter());
                rings
            })
            .collect(),
        Geometry::LineString(ls) => vec![ls],
        Geometry::MultiLineString(mls) => mls.0.iter().collect(),
        _ => Vec::new(),
    }
}

/// Find a point where two non-adjacent segments of `ring` properly cross.
fn self_intersection_point(ring: &LineString<f64>) -> Option<(f64, f64)> {
    let coords = &ring.0;
    let n = coords.len();
    if n < 4 {
        return None;
    }
    for i in 0..n - 1 {
        let a1 = (coords[i].x, coords[i].y);
        let a2 = (coords[i + 1].x, coords[i + 1].y);
        for j in (i + 1)..n - 1 {
            // Skip segments adjacent to `i` (they legitimately share an
            // endpoint) and the wrap-around pair (first/last segment of a
            // closed ring).
            if j == i || j == i + 1 {
                continue;
            }
            if i == 0 && j == n - 2 {
                continue;
            }
            let b1 = (coords[j].x, coords[j].y);
            let b2 = (coords[j + 1].x, coords[j + 1].y);
            if let Some(point) = segment_intersection(a1, a2, b1, b2) {
                return Some(point);
            }
        }
    }
    None
}

fn orientation(a: (f64, f64), b: (f64, f64), c: (f64, f64)) -> f64 {
    (b.0 - a.0) * (c.1 - a.1) - (b.1 - a.1) * (c.0 - a.0)
}

fn on_segment(a: (f64, f64), b: (f64, f64), p: (f64, f64)) -> bool {
    p.0 >= a.0.min(b.0) - 1e-9
        && p.0 <= a.0.max(b.0) + 1e-9
        && p.1 >= a.1.min(b.1) - 1e-9
        && p.1 <= a.1.max(b.1) + 1e-9
}

/// Proper-crossing segment intersection test, returning the crossing point.
fn segment_intersection(
    p1: (f64, f64),
    p2: (f64, f64),
    p3: (f64, f64),
    p4: (f64, f64),
) -> Option<(f64, f64)> {
    let d1 = orientation(p3, p4, p1);
    let d2 = orientation(p3, p4, p2);
    let d3 = orientation(p1, p2, p3);
    let d4 = orientation(p1, p2, p4);

    let straddle = |x: f64, y: f64| (x > 0.0 && y < 0.0) || (x < 0.0 && y > 0.0);

    if straddle(d1, d2) && straddle(d3, d4) {
        let denom = (p2.0 - p1.0) * (p4.1 - p3.1) - (p2.1 - p1.1) * (p4.0 - p3.0);
        if denom.abs() < f64::EPSILON {
            return None;
        }
        let t = ((p3.0 - p1.0) * (p4.1 - p3.1) - (p3.1 - p1.1) * (p4.0 - p3.0)) / denom;
        return Some((p1.0 + t * (p2.0 - p1.0), p1.1 + t * (p2.1 - p1.1)));
    }
    // Collinear touching cases are not treated as a proper self-intersection here.
    if d1 == 0.0 && on_segment(p3, p4, p1) {
        return Some(p1);
    }
    if d2 == 0.0 && on_segment(p3, p4, p2) {
        return Some(p2);
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bowtie_ring_self_intersects() {
        let ring = geo_types::line_string![
            (x: 0.0, y: 0.0),
            (x: 10.0, y: 10.0),
            (x: 10.0, y: 0.0),
            (x: 0.0, y: 10.0),
            (x: 0.0, y: 0.0),
        ];
        assert!(self_intersection_point(&ring).is_some());
    }

    #[test]
    fn simple_square_ring_has_no_self_intersection() {
        let ring = geo_types::line_string![
            (x: 0.0, y: 0.0),
            (x: 10.0, y: 0.0),
            (x: 10.0, y: 10.0),
            (x: 0.0, y: 10.0),
            (x: 0.0, y: 0.0),
        ];
        assert!(self_intersection_point(&ring).is_none());
    }

    #[test]
    fn basic_rich_validator_classifies_bowtie() {
        let report = BasicRichValidator.analyze(
            "POLYGON ((0 0, 10 10, 10 0, 0 10, 0 0))",
        );
        assert_eq!(report.error_type, Iso19107ErrorType::RingSelfIntersection);
        assert!(report.location.is_some());
    }
}
