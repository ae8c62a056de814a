//! Error types for imgreg-core
//!
//! Provides a unified error type for buffer construction, coordinate
//! access and the native serialization format.

use thiserror::Error;

/// imgreg-core error type
#[derive(Error, Debug)]
pub enum Error {
    /// Shape has no axes, too many axes, or a zero extent
    #[error("invalid shape {extents:?}: {reason}")]
    InvalidShape {
        extents: Vec<usize>,
        reason: &'static str,
    },

    /// Zero samples per coordinate
    #[error("invalid component count: {0}")]
    InvalidComponents(usize),

    /// Index out of bounds
    #[error("index out of bounds: {index} >= {len}")]
    IndexOutOfBounds { index: usize, len: usize },

    /// Coordinate has the wrong number of axes
    #[error("coordinate has {actual} axes, buffer has {expected}")]
    AxisCountMismatch { expected: usize, actual: usize },

    /// Sample data does not match shape and component count
    #[error("data length {actual} doesn't match {shape} x {components} = {expected}")]
    DataLength {
        shape: String,
        components: usize,
        expected: usize,
        actual: usize,
    },

    /// Invalid parameter value
    #[error("invalid parameter: {0}")]
    InvalidParameter(String),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Native buffer decode error
    #[error("decode error: {0}")]
    DecodeError(String),
}

/// Result type alias for imgreg-core operations
pub type Result<T> = std::result::Result<T, Error>;
