//! The horizontal coordinate-system contract consumed by the grid operators.

use std::fmt::Debug;

use nalgebra::{Rotation2, Vector2};

use crate::error::ProjectionError;

/// Offset (degrees of latitude) used when estimating the local north direction.
const NORTH_PROBE_DEG: f64 = 1e-3;

/// A map projection between projected `(x, y)` meters and geographic degrees.
pub trait MapProjection: Debug + Send + Sync {
    /// Short identifier, used in logs and domain comparisons.
    fn name(&self) -> &str;

    /// Projected coordinates to `(lat, lon)` in degrees.
    fn to_latlon(&self, x: f64, y: f64) -> Result<(f64, f64), ProjectionError>;

    /// Geographic `(lat, lon)` in degrees to projected coordinates.
    fn from_latlon(&self, lat: f64, lon: f64) -> Result<(f64, f64), ProjectionError>;

    /// Angle in radians, measured clockwise from the grid's +y axis to true north.
    ///
    /// The default estimates it numerically by projecting a point slightly
    /// north of `(x, y)`.
    fn north_angle(&self, x: f64, y: f64) -> Result<f64, ProjectionError> {
        let (lat, lon) = self.to_latlon(x, y)?;
        let probe_lat = (lat + NORTH_PROBE_DEG).min(90.0);
        let (nx, ny) = self.from_latlon(probe_lat, lon)?;
        let (dx, dy) = (nx - x, ny - y);
        if dx == 0.0 && dy == 0.0 {
            return Err(ProjectionError::out_of_domain(x, y));
        }
        Ok(dx.atan2(dy))
    }

    /// Rotate a grid-relative vector at `(x, y)` into earth-relative `(u, v)`.
    fn grid_to_earth(&self, x: f64, y: f64, u: f64, v: f64) -> Result<(f64, f64), ProjectionError> {
        let rotated = Rotation2::new(self.north_angle(x, y)?) * Vector2::new(u, v);
        Ok((rotated.x, rotated.y))
    }
}
