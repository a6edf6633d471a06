//! Error types for grid math.

use grid_common::UnitError;
use projection::ProjectionError;
use thiserror::Error;

use crate::source::SourceError;

/// Errors that can occur while computing over grids.
///
/// Missing data is never an error: NaN samples flow through arithmetic and
/// reductions as values.
#[derive(Error, Debug)]
pub enum GridMathError {
    /// The grid's outer nesting cannot be classified.
    #[error("malformed grid: {0}")]
    MalformedGrid(String),

    /// Two operands cannot be reconciled by resampling or slicing.
    #[error("incompatible domains: {0}")]
    IncompatibleDomain(String),

    /// A required coordinate axis is absent.
    #[error("missing coordinate: {0}")]
    MissingCoordinate(String),

    /// A caller-supplied parameter is outside its defined domain.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// Units that cannot be converted into each other.
    #[error("incompatible units: {0}")]
    IncompatibleUnits(#[from] UnitError),

    /// Coordinate transform failure.
    #[error("projection error: {0}")]
    Projection(#[from] ProjectionError),

    /// Failure reported by a grid source.
    #[error("source error: {0}")]
    Source(#[from] SourceError),
}

impl GridMathError {
    /// Create a MalformedGrid error.
    pub fn malformed(msg: impl Into<String>) -> Self {
        Self::MalformedGrid(msg.into())
    }

    /// Create an IncompatibleDomain error.
    pub fn incompatible_domain(msg: impl Into<String>) -> Self {
        Self::IncompatibleDomain(msg.into())
    }

    /// Create a MissingCoordinate error.
    pub fn missing_coordinate(msg: impl Into<String>) -> Self {
        Self::MissingCoordinate(msg.into())
    }

    /// Create an InvalidArgument error.
    pub fn invalid_argument(msg: impl Into<String>) -> Self {
        Self::InvalidArgument(msg.into())
    }
}

/// Result type for grid math operations.
pub type Result<T> = std::result::Result<T, GridMathError>;
