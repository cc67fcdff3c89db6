//! The engine's normal output record, and the stable error-code contract.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// Stable error codes, part of the external contract. These must never
/// change once published, since a downstream report renderer keys off them.
pub mod codes {
    pub const DUPLICATE: &str = "LOG_TOP_GEO_001";
    pub const OVERLAP: &str = "LOG_TOP_GEO_002";
    pub const INVALID: &str = "LOG_TOP_GEO_003";
    pub const SLIVER: &str = "LOG_TOP_GEO_004";
    pub const SHORT_LINE: &str = "LOG_TOP_GEO_005";
    pub const SMALL_AREA: &str = "LOG_TOP_GEO_006";
    pub const SELF_OVERLAP: &str = "LOG_TOP_GEO_007";
    pub const INSUFFICIENT_VERTICES: &str = "LOG_TOP_GEO_008";
    pub const SPIKE: &str = "LOG_TOP_GEO_009";
    pub const POLYGON_IN_POLYGON: &str = "LOG_TOP_GEO_010";
    pub const UNDERSHOOT: &str = "LOG_TOP_GEO_011";
    pub const OVERSHOOT: &str = "LOG_TOP_GEO_012";
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Severity {
    Error,
    Warning,
    Info,
}

/// One validation finding, pinpointed to a feature and a coordinate.
///
/// `(x, y)` lies on or near the reported defect; `geometry_wkt` is a `POINT`
/// WKT for local defects and a 2-vertex `LINESTRING` WKT for gap defects
/// (undershoot/overshoot).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationError {
    pub error_code: String,
    pub message: String,
    pub table_id: String,
    pub table_name: String,
    pub feature_id: String,
    pub severity: Severity,
    pub x: f64,
    pub y: f64,
    pub geometry_wkt: String,
    pub metadata: HashMap<String, String>,
}

impl ValidationError {
    /// Build a point-located error: `geometry_wkt` is `POINT (x y)`.
    pub fn at_point(
        error_code: impl Into<String>,
        message: impl Into<String>,
        table_id: impl Into<String>,
        table_name: impl Into<String>,
        feature_id: impl Into<String>,
        severity: Severity,
        x: f64,
        y: f64,
    ) -> Self {
        ValidationError {
            error_code: error_code.into(),
            message: message.into(),
            table_id: table_id.into(),
            table_name: table_name.into(),
            feature_id: feature_id.into(),
            severity,
            x,
            y,
            geometry_wkt: format!("POINT ({x} {y})"),
            metadata: HashMap::new(),
        }
    }

    /// Build a gap-located error: `geometry_wkt` is the 2-vertex
    /// `LINESTRING (x1 y1, x2 y2)` between the defect point and the nearest
    /// feature it relates to. `(x, y)` is set to the first point, `p`.
    pub fn at_gap(
        error_code: impl Into<String>,
        message: impl Into<String>,
        table_id: impl Into<String>,
        table_name: impl Into<String>,
        feature_id: impl Into<String>,
        severity: Severity,
        p: (f64, f64),
        q: (f64, f64),
    ) -> Self {
        ValidationError {
            error_code: error_code.into(),
            message: message.into(),
            table_id: table_id.into(),
            table_name: table_name.into(),
            feature_id: feature_id.into(),
            severity,
            x: p.0,
            y: p.1,
            geometry_wkt: format!("LINESTRING ({} {}, {} {})", p.0, p.1, q.0, q.1),
            metadata: HashMap::new(),
        }
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }
}
