//! A pure in-memory [`GeometryBackend`], used only by this crate's own test
//! suite: the role `gdal`'s in-process `MEM` driver and fixture datasets
//! play in `gdal`'s `vector/tests.rs`. Never intended for production use.

use std::collections::HashMap;

use geo_types::Geometry as GeoGeometry;

use crate::backend::{Dataset, Envelope, Feature, GeometryBackend, GeometryValue, Layer, WkbType};
use crate::validity::has_self_intersection;

/// One feature: an fid plus an owned geometry. Construct a layer's worth
/// with [`MemoryLayer::new`] and a dataset with [`MemoryDataset::new`].
#[derive(Debug, Clone)]
pub struct MemoryFeature {
    pub fid: i64,
    pub geometry: GeoGeometry<f64>,
}

/// Wraps an owned `geo_types::Geometry<f64>` to satisfy [`GeometryValue`].
#[derive(Debug, Clone)]
pub struct MemoryGeometry(pub GeoGeometry<f64>);

impl GeometryValue for MemoryGeometry {
    fn is_empty(&self) -> bool {
        match &self.0 {
            GeoGeometry::Point(_) => false,
            GeoGeometry::MultiPoint(mp) => mp.0.is_empty(),
            GeoGeometry::LineString(ls) => ls.0.is_empty(),
            GeoGeometry::MultiLineString(mls) => mls.0.iter().all(|ls| ls.0.is_empty()),
            GeoGeometry::Polygon(p) => p.exterior().0.is_empty(),
            GeoGeometry::MultiPolygon(mp) => mp.0.iter().all(|p| p.exterior().0.is_empty()),
            _ => true,
        }
    }

    fn wkb_type(&self) -> WkbType {
        match &self.0 {
            GeoGeometry::Point(_) => WkbType::Point,
            GeoGeometry::MultiPoint(_) => WkbType::MultiPoint,
            GeoGeometry::LineString(_) => WkbType::LineString,
            GeoGeometry::MultiLineString(_) => WkbType::MultiLineString,
            GeoGeometry::Polygon(_) => WkbType::Polygon,
            GeoGeometry::MultiPolygon(_) => WkbType::MultiPolygon,
            other => panic!("unsupported geometry variant in MemoryBackend: {other:?}"),
        }
    }

    /// Closed exterior ring and no self-intersection. Good enough for this
    /// crate's own tests; a production backend brings a real validity
    /// operator (e.g. GDAL's `OGR_G_IsValid`).
    fn is_valid(&self) -> bool {
        use crate::predicates::ring_is_closed;
        match &self.0 {
            GeoGeometry::Polygon(p) => {
                ring_is_closed(p.exterior(), 1e-7)
                    && p.interiors().iter().all(|r| ring_is_closed(r, 1e-7))
                    && !has_self_intersection(&self.0)
            }
            GeoGeometry::MultiPolygon(mp) => mp.0.iter().all(|p| {
                ring_is_closed(p.exterior(), 1e-7)
                    && p.interiors().iter().all(|r| ring_is_closed(r, 1e-7))
            }) && !has_self_intersection(&self.0),
            _ => !has_self_intersection(&self.0),
        }
    }

    fn is_simple(&self) -> bool {
        !has_self_intersection(&self.0)
    }

    fn export_wkt(&self) -> String {
        use wkt::ToWkt;
        self.0.to_wkt().to_string()
    }

    fn envelope(&self) -> Option<Envelope> {
        let points = coords_of(&self.0);
        Envelope::from_points(points)
    }

    fn to_geo(&self) -> GeoGeometry<f64> {
        self.0.clone()
    }
}

fn coords_of(g: &GeoGeometry<f64>) -> Vec<(f64, f64)> {
    match g {
        GeoGeometry::Point(p) => vec![(p.x(), p.y())],
        GeoGeometry::MultiPoint(mp) => mp.0.iter().map(|p| (p.x(), p.y())).collect(),
        GeoGeometry::LineString(ls) => ls.coords().map(|c| (c.x, c.y)).collect(),
        GeoGeometry::MultiLineString(mls) => mls
            .0
            .iter()
            .flat_map(|ls| ls.coords().map(|c| (c.x, c.y)))
            .collect(),
        GeoGeometry::Polygon(p) => std::iter::once(p.exterior())
            .chain(p.interiors().iter())
            .flat_map(|r| r.coords().map(|c| (c.x, c.y)))
            .collect(),
        GeoGeometry::MultiPolygon(mp) => mp
            .0
            .iter()
            .flat_map(|p| {
                std::iter::once(p.exterior())
                    .chain(p.interiors().iter())
                    .flat_map(|r| r.coords().map(|c| (c.x, c.y)))
                    .collect::<Vec<_>>()
            })
            .collect(),
        _ => Vec::new(),
    }
}

/// Adapts a borrowed fid plus its stored [`MemoryGeometry`] into the
/// [`Feature`] trait object the cursor hands out. `MemoryFeature` itself is
/// just the construction-time input to [`MemoryLayer::new`].
struct CursorFeature<'a> {
    fid: i64,
    geometry: &'a MemoryGeometry,
}

impl<'a> Feature for CursorFeature<'a> {
    fn fid(&self) -> i64 {
        self.fid
    }

    fn geometry(&self) -> &dyn GeometryValue {
        self.geometry
    }
}

/// An in-memory layer: a named geometry type plus an ordered feature list.
/// `reset`/`next_feature` model a forward-only, restartable cursor exactly
/// like an OGR layer's default read order.
#[derive(Clone)]
pub struct MemoryLayer {
    geometry_type_name: String,
    features: Vec<(i64, MemoryGeometry)>,
    cursor: usize,
    attribute_filter: Option<String>,
    excluded_fids: std::collections::HashSet<i64>,
}

impl MemoryLayer {
    pub fn new(geometry_type_name: impl Into<String>, features: Vec<MemoryFeature>) -> Self {
        MemoryLayer {
            geometry_type_name: geometry_type_name.into(),
            features: features
                .into_iter()
                .map(|f| (f.fid, MemoryGeometry(f.geometry)))
                .collect(),
            cursor: 0,
            attribute_filter: None,
            excluded_fids: std::collections::HashSet::new(),
        }
    }

    /// Test-only hook: excludes the given fids from iteration as if an
    /// attribute filter had removed them, without needing real attributes.
    pub fn exclude_fids(&mut self, fids: impl IntoIterator<Item = i64>) {
        self.excluded_fids.extend(fids);
    }
}

impl Layer for MemoryLayer {
    fn feature_count(&self, _force_scan: bool) -> Option<u64> {
        Some(
            self.features
                .iter()
                .filter(|(fid, _)| !self.excluded_fids.contains(fid))
                .count() as u64,
        )
    }

    fn reset(&mut self) {
        self.cursor = 0;
    }

    fn next_feature(&mut self) -> Option<Box<dyn Feature + '_>> {
        while self.cursor < self.features.len() {
            let (fid, geometry) = &self.features[self.cursor];
            self.cursor += 1;
            if self.excluded_fids.contains(fid) {
                continue;
            }
            return Some(Box::new(CursorFeature {
                fid: *fid,
                geometry,
            }));
        }
        None
    }

    fn set_attribute_filter(&mut self, expr: Option<&str>) {
        self.attribute_filter = expr.map(str::to_string);
    }

    fn set_ignored_fields(&mut self, _fields: &[&str]) {}

    fn geometry_type_name(&self) -> &str {
        &self.geometry_type_name
    }
}

/// An in-memory dataset: a fixed set of named layers.
#[derive(Default, Clone)]
pub struct MemoryDataset {
    layers: HashMap<String, MemoryLayer>,
}

impl MemoryDataset {
    pub fn new() -> Self {
        MemoryDataset::default()
    }

    pub fn with_layer(mut self, id: impl Into<String>, layer: MemoryLayer) -> Self {
        self.layers.insert(id.into(), layer);
        self
    }
}

impl Dataset for MemoryDataset {
    fn layer<'a>(&'a mut self, layer_id: &str) -> Option<Box<dyn Layer + 'a>> {
        self.layers
            .get_mut(layer_id)
            .map(|l| Box::new(LayerRefMut(l)) as Box<dyn Layer + 'a>)
    }
}

/// Thin `Layer` forwarder over a `&mut MemoryLayer`, needed because
/// `Dataset::layer` must return a trait object borrowing from `self`.
struct LayerRefMut<'a>(&'a mut MemoryLayer);

impl<'a> Layer for LayerRefMut<'a> {
    fn feature_count(&self, force_scan: bool) -> Option<u64> {
        self.0.feature_count(force_scan)
    }

    fn reset(&mut self) {
        self.0.reset()
    }

    fn next_feature(&mut self) -> Option<Box<dyn Feature + '_>> {
        self.0.next_feature()
    }

    fn set_attribute_filter(&mut self, expr: Option<&str>) {
        self.0.set_attribute_filter(expr)
    }

    fn set_ignored_fields(&mut self, fields: &[&str]) {
        self.0.set_ignored_fields(fields)
    }

    fn geometry_type_name(&self) -> &str {
        self.0.geometry_type_name()
    }
}

/// Opens pre-built [`MemoryDataset`]s by path, where "path" is just an
/// opaque lookup key into a small registry supplied at construction time.
///
/// `open` clones the registered dataset out, the same "hand the caller their
/// own independent connection" contract a real file-backed `open` gives.
/// Cloning is cheap here since a `MemoryDataset` is just owned `geo_types`
/// values, never an FFI handle.
#[derive(Default)]
pub struct MemoryBackend {
    datasets: HashMap<String, MemoryDataset>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        MemoryBackend::default()
    }

    pub fn register(&mut self, path: impl Into<String>, dataset: MemoryDataset) {
        self.datasets.insert(path.into(), dataset);
    }
}

impl GeometryBackend for MemoryBackend {
    type Dataset = MemoryDataset;

    fn open(
        &self,
        path: &str,
    ) -> std::result::Result<Self::Dataset, Box<dyn std::error::Error + Send + Sync>> {
        self.datasets
            .get(path)
            .cloned()
            .ok_or_else(|| format!("no such in-memory dataset: '{path}'").into())
    }
}
