//! Coordinate reference system transformations.
//!
//! Horizontal map projections map projected `(x, y)` coordinates in meters to
//! geographic latitude/longitude and back, and report the local rotation
//! between grid north and true north so grid-relative winds can be turned
//! into earth-relative ones. Vertical transforms map pressure to height.
//!
//! Projections are implemented directly; nalgebra supplies the rotations.

pub mod error;
pub mod lambert;
pub mod transform;
pub mod vertical;

pub use error::ProjectionError;
pub use lambert::LambertConformal;
pub use transform::MapProjection;
pub use vertical::{ScaleHeightAtmosphere, StandardAtmosphere, VerticalTransform};

/// Mean earth radius used by the projections (meters).
pub const EARTH_RADIUS: f64 = 6371229.0;
