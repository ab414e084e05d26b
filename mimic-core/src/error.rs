//! Errors in the library.
use std::path::PathBuf;
use thiserror::Error;

/// Errors in the library.
///
/// All of them indicate a programming or configuration defect, so callers are
/// expected to stop rather than retry.
#[derive(Error, Debug)]
pub enum MimicError {
    /// A batch was requested from a buffer that cannot provide it.
    #[error("Insufficient data: requested {requested} samples from a buffer of size {size}")]
    InsufficientData {
        /// Requested batch size.
        requested: usize,
        /// Number of valid transitions in the buffer.
        size: usize,
    },

    /// More expert trajectories were requested than the log contains.
    #[error("Insufficient trajectories: requested {requested}, but the log has {available}")]
    InsufficientTrajectories {
        /// Requested number of trajectories.
        requested: usize,
        /// Number of trajectory segments in the log.
        available: usize,
    },

    /// The model file to be loaded does not exist.
    #[error("Model file not found: {0:?}")]
    ModelFileNotFound(PathBuf),

    /// There is nothing registered to be saved.
    #[error("The set of models to be saved is empty")]
    EmptyModelSet,

    /// A required configuration value is missing or invalid.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// A vector does not have the length of its slot.
    #[error("Dimension mismatch of {name}: expected {expected}, got {actual}")]
    DimensionMismatch {
        /// Name of the vector.
        name: &'static str,
        /// Expected length.
        expected: usize,
        /// Actual length.
        actual: usize,
    },

    /// A transition log has missing keys or arrays of unequal length.
    #[error("Malformed transition log: {0}")]
    MalformedTransitionLog(String),

    /// Record key error.
    #[error("Record key error: {0}")]
    RecordKey(String),

    /// Record value type error.
    #[error("Record value type error: {0}")]
    RecordValueType(String),
}
