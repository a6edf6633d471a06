//! Error types for projection operations.

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ProjectionError {
    #[error("point ({x}, {y}) is outside the projection domain")]
    OutOfDomain { x: f64, y: f64 },

    #[error("invalid projection parameters: {0}")]
    InvalidParameters(String),
}

impl ProjectionError {
    pub fn out_of_domain(x: f64, y: f64) -> Self {
        Self::OutOfDomain { x, y }
    }
}
