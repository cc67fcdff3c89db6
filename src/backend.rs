//! Required external capabilities.
//!
//! This crate never talks to a file format directly. The way `gdal`'s
//! `vector` module wraps the OGR C API behind `Dataset`/`Layer`/`Feature`/
//! `Geometry`, this module defines the same four roles as Rust traits, so
//! any concrete I/O library (GDAL via the real `gdal` crate, a test
//! fixture, a future non-GDAL backend) can plug in.
//!
//! A pure in-memory implementation used by this crate's own test suite
//! lives in [`crate::backend::memory`].

pub mod memory;

use geo_types::Geometry as GeoGeometry;

/// Flattened WKB type tag. Curve and 3D variants are not modeled (the
/// backend is responsible for linearizing and flattening before this crate
/// ever sees a geometry).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WkbType {
    Point,
    MultiPoint,
    LineString,
    MultiLineString,
    Polygon,
    MultiPolygon,
}

impl WkbType {
    pub fn is_line(self) -> bool {
        matches!(self, WkbType::LineString | WkbType::MultiLineString)
    }

    pub fn is_polygon(self) -> bool {
        matches!(self, WkbType::Polygon | WkbType::MultiPolygon)
    }
}

/// Axis-aligned bounding box in the layer's planar CRS.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Envelope {
    pub min_x: f64,
    pub min_y: f64,
    pub max_x: f64,
    pub max_y: f64,
}

impl Envelope {
    pub fn center(&self) -> (f64, f64) {
        ((self.min_x + self.max_x) / 2.0, (self.min_y + self.max_y) / 2.0)
    }

    pub fn intersects(&self, other: &Envelope) -> bool {
        self.min_x <= other.max_x
            && self.max_x >= other.min_x
            && self.min_y <= other.max_y
            && self.max_y >= other.min_y
    }

    pub fn from_points<I: IntoIterator<Item = (f64, f64)>>(points: I) -> Option<Envelope> {
        let mut iter = points.into_iter();
        let (x0, y0) = iter.next()?;
        let mut env = Envelope {
            min_x: x0,
            min_y: y0,
            max_x: x0,
            max_y: y0,
        };
        for (x, y) in iter {
            env.min_x = env.min_x.min(x);
            env.min_y = env.min_y.min(y);
            env.max_x = env.max_x.max(x);
            env.max_y = env.max_y.max(y);
        }
        Some(env)
    }
}

/// A single geometry value, borrowed from a [`Feature`] or owned after
/// cloning off the cursor.
///
/// `is_valid`/`is_simple` are the fast native path the Validity Adapter (C4)
/// tries first. `to_geo` is the bridge every other analyzer in this crate
/// goes through, and it must already be linearized (curves to straight
/// segments) and flattened to 2D; Z validation is out of scope.
pub trait GeometryValue {
    fn is_empty(&self) -> bool;
    fn wkb_type(&self) -> WkbType;
    fn is_valid(&self) -> bool;
    fn is_simple(&self) -> bool;
    fn export_wkt(&self) -> String;
    fn envelope(&self) -> Option<Envelope>;
    /// Linearized, 2D-flattened conversion to the geometry representation
    /// every analyzer in this crate operates on.
    fn to_geo(&self) -> GeoGeometry<f64>;
}

/// A feature read off a layer cursor. Borrowed: the engine must never
/// attempt to outlive the layer sweep that produced it.
pub trait Feature {
    fn fid(&self) -> i64;
    fn geometry(&self) -> &dyn GeometryValue;
}

/// A single layer within a dataset, modeling GDAL's `OGRLayer` cursor.
///
/// `next_feature` advances an internal, non-reentrant cursor; `reset`
/// rewinds it to the start. Implementations must release any per-feature
/// native handle before the next call, the same discipline
/// `gdal::vector::FeatureIterator` applies around `OGR_F_Destroy`.
pub trait Layer {
    /// Number of features, or `None` if the backend cannot report one
    /// without a full scan it declines to perform.
    fn feature_count(&self, force_scan: bool) -> Option<u64>;
    fn reset(&mut self);
    fn next_feature(&mut self) -> Option<Box<dyn Feature + '_>>;
    fn set_attribute_filter(&mut self, expr: Option<&str>);
    fn set_ignored_fields(&mut self, fields: &[&str]);
    /// Declared geometry type name, e.g. `"LineString"` or
    /// `"MultiLineString"`. C6 (network checker) gates on this containing
    /// `"Line"`.
    fn geometry_type_name(&self) -> &str;
}

/// A dataset: the file or connection a [`Layer`] is resolved from.
pub trait Dataset {
    fn layer<'a>(&'a mut self, layer_id: &str) -> Option<Box<dyn Layer + 'a>>;
}

/// Opens datasets. The one entry point a concrete I/O library must supply.
pub trait GeometryBackend {
    type Dataset: Dataset;

    fn open(
        &self,
        path: &str,
    ) -> std::result::Result<Self::Dataset, Box<dyn std::error::Error + Send + Sync>>;
}

/// ISO 19107-aligned defect classification returned by the richer validator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Iso19107ErrorType {
    RingSelfIntersection,
    NestedShells,
    DisconnectedInterior,
    HoleOutsideShell,
    NestedHoles,
    TooFewPoints,
    RepeatedPoint,
    Other,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RichValidityReport {
    pub error_type: Iso19107ErrorType,
    pub message: String,
    pub location: Option<(f64, f64)>,
}

/// The richer, slower validity operator the Validity Adapter falls back to
/// once the native fast path (`GeometryValue::is_valid`/`is_simple`) reports
/// a defect. It only needs to run on already-invalid/non-simple geometry, so
/// it is allowed to be much more expensive per call.
pub trait RichValidator {
    fn analyze(&self, wkt: &str) -> RichValidityReport;
}

/// Outcome of a pre-scan attribute filter application.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FilterOutcome {
    pub applied: bool,
    pub excluded_count: u64,
}

/// The pluggable, pre-scan attribute-based row filter. The engine consumes
/// this; it never re-implements filtering logic.
pub trait FeatureFilter {
    /// Apply the filter to the layer before the scan begins (e.g. by
    /// calling [`Layer::set_attribute_filter`]).
    fn apply(&self, layer: &mut dyn Layer, phase_name: &str, table_id: &str) -> FilterOutcome;

    /// Belt-and-braces per-feature check performed inside the scan, in case
    /// the attribute filter didn't fully exclude a row.
    fn should_skip(&self, feature: &dyn Feature, table_id: &str) -> (bool, String);
}

/// A [`FeatureFilter`] that never excludes anything. Useful as a default for
/// callers that don't need pre-scan filtering.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoFilter;

impl FeatureFilter for NoFilter {
    fn apply(&self, _layer: &mut dyn Layer, _phase_name: &str, _table_id: &str) -> FilterOutcome {
        FilterOutcome {
            applied: false,
            excluded_count: 0,
        }
    }

    fn should_skip(&self, _feature: &dyn Feature, _table_id: &str) -> (bool, String) {
        (false, String::new())
    }
}
