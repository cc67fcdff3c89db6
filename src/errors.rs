//! Error types for the validation engine.
//!
//! Mirrors the shape of `gdal::errors`: a single `thiserror` enum covering
//! every way the *engine itself* can fail to run, as distinct from a
//! [`crate::ValidationError`], which is the engine's normal *output* and
//! never an `Err`.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, EngineError>;

/// Failures that abort a validation run before it can produce a result.
///
/// Per the error-handling design, only two things belong here: the dataset
/// could not be opened, or the sink could not be set up. A missing layer is
/// *not* an error; it is reported as a successful, empty
/// [`crate::ValidationResult`] carrying a warning, the same way
/// `gdal::Dataset::layer` failures are handled one level up by callers that
/// choose to treat "no such layer" as non-fatal.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("failed to open dataset at '{path}': {source}")]
    OpenDataset {
        path: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    #[error("failed to open streaming error sink at '{path}': {source}")]
    OpenSink {
        path: String,
        #[source]
        source: std::io::Error,
    },
}
