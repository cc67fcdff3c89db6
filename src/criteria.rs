//! Caller-supplied thresholds and check selection.
//!
//! [`GeometryCriteria`] and [`CheckConfig`] are plain data: the engine never
//! infers which checks to run or invents a threshold the caller didn't ask
//! for. Both derive `serde` (de)serialization so a host application can load
//! them from whatever configuration source it likes without this crate
//! caring, the same separation `gdal::DatasetOptions` draws between "what
//! GDAL needs to know" and "how the caller obtained it".

use serde::{Deserialize, Serialize};

/// Numeric thresholds driving the shape-quality and network checks.
///
/// All fields are positive reals except the two ratios, which are
/// dimensionless. Defaults are reasonable starting points for planar data in
/// projected (metre-like) units; callers working in degrees or other units
/// must override them.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GeometryCriteria {
    pub ring_closure_tolerance: f64,
    pub min_line_length: f64,
    pub min_polygon_area: f64,
    pub overlap_tolerance: f64,
    pub sliver_area: f64,
    /// Must be < 1.0; see [`GeometryCriteria::sliver_shape_index`] docs on
    /// `crate::shape_quality::is_sliver`.
    pub sliver_shape_index: f64,
    /// Must be > 1.0, the reciprocal sense of `sliver_shape_index`.
    pub sliver_elongation: f64,
    pub spike_angle_threshold_degrees: f64,
    pub network_search_distance: f64,
}

impl Default for GeometryCriteria {
    fn default() -> Self {
        GeometryCriteria {
            ring_closure_tolerance: 1e-7,
            min_line_length: 0.0,
            min_polygon_area: 0.0,
            overlap_tolerance: 0.0,
            sliver_area: 0.0,
            sliver_shape_index: 0.1,
            sliver_elongation: 10.0,
            spike_angle_threshold_degrees: 5.0,
            network_search_distance: 0.0,
        }
    }
}

/// Per-invocation toggles for each of the ten check categories.
///
/// The engine never enables a check the caller didn't ask for; there is
/// intentionally no "all true" default used implicitly anywhere in the
/// engine. [`CheckConfig::all_enabled`] exists only as an explicit, opt-in
/// convenience for callers (and this crate's own tests).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CheckConfig {
    pub duplicate: bool,
    pub overlap: bool,
    pub self_intersection: bool,
    pub self_overlap: bool,
    pub polygon_in_polygon: bool,
    pub short_object: bool,
    pub small_area: bool,
    pub min_points: bool,
    pub sliver: bool,
    pub spikes: bool,
    pub undershoot: bool,
    pub overshoot: bool,
}

impl CheckConfig {
    /// Every check enabled. Convenience for tests and simple callers; not
    /// used as an implicit default anywhere in the engine itself.
    pub fn all_enabled() -> Self {
        CheckConfig {
            duplicate: true,
            overlap: true,
            self_intersection: true,
            self_overlap: true,
            polygon_in_polygon: true,
            short_object: true,
            small_area: true,
            min_points: true,
            sliver: true,
            spikes: true,
            undershoot: true,
            overshoot: true,
        }
    }

    /// True if any check that requires a cloned/linearized working geometry
    /// is enabled. Used by the Scanner to skip that clone/linearize pair
    /// entirely for features where only cross-feature checks (C5/C6, which
    /// run as separate passes) are requested.
    ///
    /// `self_intersection` is deliberately not in this list: the Validity
    /// Adapter (C4) runs against the borrowed native geometry directly
    /// (`is_valid`/`is_simple`/`export_wkt`), never the cloned working copy.
    pub fn needs_working_geometry(&self) -> bool {
        self.self_overlap
            || self.polygon_in_polygon
            || self.short_object
            || self.small_area
            || self.min_points
            || self.sliver
            || self.spikes
    }

    /// True if the network pass (C6) should run at all.
    pub fn needs_network_pass(&self) -> bool {
        self.undershoot || self.overshoot
    }

    /// True if the spatial-index cross-check pass (C5) should run at all.
    pub fn needs_cross_check_pass(&self) -> bool {
        self.duplicate || self.overlap
    }

    /// Parse the "Y"/"N" string convention used when `CheckConfig` values
    /// arrive from external configuration.
    pub fn parse_yn(value: &str) -> Option<bool> {
        match value {
            "Y" | "y" => Some(true),
            "N" | "n" => Some(false),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_criteria_keeps_sliver_ratios_on_the_right_side() {
        let c = GeometryCriteria::default();
        assert!(c.sliver_shape_index < 1.0);
        assert!(c.sliver_elongation > 1.0);
    }

    #[test]
    fn check_config_default_is_all_off() {
        let c = CheckConfig::default();
        assert!(!c.duplicate && !c.sliver && !c.overshoot);
    }

    #[test]
    fn needs_working_geometry_is_false_when_only_network_checks_enabled() {
        let mut c = CheckConfig::default();
        c.undershoot = true;
        assert!(!c.needs_working_geometry());
        assert!(c.needs_network_pass());
    }

    #[test]
    fn parse_yn_rejects_unknown_tokens() {
        assert_eq!(CheckConfig::parse_yn("Y"), Some(true));
        assert_eq!(CheckConfig::parse_yn("N"), Some(false));
        assert_eq!(CheckConfig::parse_yn("maybe"), None);
    }
}
