//! Error types for digitcam
//!
//! One variant family per failure category of the pipeline: missing
//! resources, invalid configuration, unavailable capture devices and faults
//! raised by the SVM numerics. Lower layers return these unchanged; only the
//! training and realtime workflows decide how to report them.

use std::path::PathBuf;

use thiserror::Error;

/// digitcam error type
#[derive(Error, Debug)]
pub enum DigitError {
    /// Dataset or image file absent or unreadable
    #[error("resource missing: {path}: {reason}")]
    ResourceMissing { path: PathBuf, reason: String },

    /// Dataset file present but not in the expected binary layout
    #[error("malformed dataset file {path}: {reason}")]
    DatasetFormat { path: PathBuf, reason: String },

    /// Model artifact does not exist
    #[error("model file not found: {0}")]
    ModelNotFound(PathBuf),

    /// Model artifact exists but cannot be parsed
    #[error("model file {path} is corrupt: {reason}")]
    ModelCorrupt { path: PathBuf, reason: String },

    /// Contradictory or unsupported hyperparameters, detected when training
    #[error("invalid configuration: {0}")]
    ConfigurationInvalid(String),

    /// Feature vector length differs from the descriptor length in use
    #[error("descriptor length mismatch: expected {expected}, got {actual}")]
    DescriptorLength { expected: usize, actual: usize },

    /// Feature rows and labels disagree in count
    #[error("label count mismatch: {rows} feature rows, {labels} labels")]
    LabelMismatch { rows: usize, labels: usize },

    /// Predict/test/save called before the model was trained or loaded
    #[error("model is not trained")]
    Untrained,

    /// Camera could not be opened or a frame could not be acquired
    #[error("capture device unavailable: {0}")]
    DeviceUnavailable(String),

    /// Solver failure (e.g. no convergence within the iteration limit)
    #[error("numerics fault: {0}")]
    NumericsFault(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Image(#[from] image::ImageError),
}

/// Result alias for digitcam operations
pub type Result<T> = std::result::Result<T, DigitError>;
