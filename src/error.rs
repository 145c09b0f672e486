//! Error types for adjusted-transform operations.
//!
//! Configuration errors are raised when an algorithm is built; data errors
//! are raised by `process`. Data gaps are never errors.

use std::path::PathBuf;

use thiserror::Error;

/// Main error type for the adjusted transform and its collaborators.
#[derive(Error, Debug)]
pub enum AdjustedError {
    /// Neither an explicit matrix nor a statefile was configured.
    #[error("Missing matrix: configure either a matrix or a statefile")]
    MissingMatrix,

    /// Both an explicit matrix and a statefile were configured.
    #[error("Ambiguous matrix source: configure a matrix or a statefile, not both")]
    AmbiguousMatrixSource,

    /// Statefile content is missing a key or holds a non-numeric value.
    #[error("Malformed statefile: key {key}: {reason}")]
    MalformedStatefile { key: String, reason: String },

    /// Statefile could not be read or written.
    #[error("Statefile I/O error on {}: {source}", path.display())]
    StatefileIo {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Channel names in the configuration are unusable.
    #[error("Invalid channel mapping: {0}")]
    InvalidChannelMapping(String),

    /// A required input channel is not present in the time-series.
    #[error("Missing channel: {channel}")]
    MissingChannel { channel: String },

    /// Channels of one time-series are not index-aligned.
    #[error("Channel shape mismatch: channel {channel} has {actual} samples, expected {expected}")]
    ChannelShapeMismatch {
        channel: String,
        expected: usize,
        actual: usize,
    },

    /// The matrix has no inverse.
    #[error("Singular matrix: determinant is {determinant}")]
    SingularMatrix { determinant: f64 },

    /// Start of a requested range lies after its end.
    #[error("Invalid time range: {0}")]
    InvalidTimeRange(String),

    /// A time-series factory failed to fetch or persist data.
    #[error("Factory error: {0}")]
    Factory(String),
}

/// Result type alias for adjusted-transform operations.
pub type Result<T> = std::result::Result<T, AdjustedError>;

impl AdjustedError {
    /// Create a malformed statefile error.
    #[must_use]
    pub fn malformed_statefile(key: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::MalformedStatefile {
            key: key.into(),
            reason: reason.into(),
        }
    }

    /// Create a statefile I/O error.
    #[must_use]
    pub fn statefile_io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::StatefileIo {
            path: path.into(),
            source,
        }
    }

    /// Create an invalid channel mapping error.
    #[must_use]
    pub fn invalid_channel_mapping(msg: impl Into<String>) -> Self {
        Self::InvalidChannelMapping(msg.into())
    }

    /// Create a missing channel error.
    #[must_use]
    pub fn missing_channel(channel: impl Into<String>) -> Self {
        Self::MissingChannel {
            channel: channel.into(),
        }
    }

    /// Create a channel shape mismatch error.
    #[must_use]
    pub fn channel_shape_mismatch(channel: impl Into<String>, expected: usize, actual: usize) -> Self {
        Self::ChannelShapeMismatch {
            channel: channel.into(),
            expected,
            actual,
        }
    }

    /// Create an invalid time range error.
    #[must_use]
    pub fn invalid_time_range(msg: impl Into<String>) -> Self {
        Self::InvalidTimeRange(msg.into())
    }

    /// Create a factory error.
    #[must_use]
    pub fn factory(msg: impl Into<String>) -> Self {
        Self::Factory(msg.into())
    }
}
