//! `geovalidate`: a geometric integrity validation engine for vector GIS
//! feature layers.
//!
//! Wraps a caller-supplied [`backend::GeometryBackend`] (GDAL, a custom
//! reader, or the in-memory [`backend::memory`] fixture this crate tests
//! against) and runs a fixed battery of topology, shape-quality,
//! cardinality, and network-connectivity checks over one layer at a time via
//! [`engine::validate`].
//!
//! Checks are opt-in per call through [`criteria::CheckConfig`]; thresholds
//! through [`criteria::GeometryCriteria`]. Findings are [`error_record::ValidationError`]
//! records, either collected in memory or streamed to an NDJSON file via
//! [`sink::ErrorSink`].

pub mod backend;
pub mod cache;
pub mod cancel;
pub mod criteria;
pub mod engine;
pub mod error_record;
pub mod errors;
pub mod min_vertex;
pub mod network;
pub mod predicates;
pub mod scanner;
pub mod shape_quality;
pub mod sink;
mod spatial_index;
pub mod validity;

pub use backend::{Dataset, Feature, FeatureFilter, GeometryBackend, GeometryValue, Layer, NoFilter, RichValidator};
pub use cancel::CancelToken;
pub use criteria::{CheckConfig, GeometryCriteria};
pub use engine::{validate, ValidationResult};
pub use error_record::{codes, Severity, ValidationError};
pub use errors::{EngineError, Result};
