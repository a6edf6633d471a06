//! Error types for the unit and quantity layer.

use thiserror::Error;

/// Result type alias using UnitError.
pub type UnitResult<T> = Result<T, UnitError>;

/// Errors raised by unit parsing and conversion.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum UnitError {
    #[error("Cannot convert from '{from}' to '{to}'")]
    Incompatible { from: String, to: String },

    #[error("Unknown unit: {0}")]
    Unknown(String),

    #[error("Unit '{0}' has an offset and cannot be combined with other units")]
    OffsetUnit(String),

    #[error("Unit '{0}' has no square root with integer exponents")]
    FractionalPower(String),
}

impl UnitError {
    /// Create an Incompatible error from two unit symbols.
    pub fn incompatible(from: impl Into<String>, to: impl Into<String>) -> Self {
        Self::Incompatible {
            from: from.into(),
            to: to.into(),
        }
    }
}
