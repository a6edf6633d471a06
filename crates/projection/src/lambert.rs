//! Lambert Conformal Conic projection.
//!
//! This projection is commonly used for weather data including HRRR and NAM.
//! It maps a cone tangent or secant to the Earth's surface onto a flat plane.
//!
//! The projection parameters include:
//! - Origin latitude (lat0): latitude where projected y is zero
//! - Central meridian (lon0, LoV in GRIB2): longitude where projected x is zero
//! - Standard parallel(s): Latin1 and Latin2 (can be equal for tangent cone)
//!
//! Projected coordinates are meters from the origin, x east and y north along
//! the central meridian.

use std::f64::consts::PI;

use crate::error::ProjectionError;
use crate::transform::MapProjection;
use crate::EARTH_RADIUS;

/// Lambert Conformal Conic projection parameters.
#[derive(Debug, Clone)]
pub struct LambertConformal {
    /// Central meridian (LoV) in radians
    pub lon0: f64,
    /// Origin latitude in radians
    pub lat0: f64,
    /// First standard parallel in radians
    pub latin1: f64,
    /// Second standard parallel in radians
    pub latin2: f64,
    /// Earth radius (meters)
    pub earth_radius: f64,
    /// Cone constant (n)
    n: f64,
    /// F constant
    f: f64,
    /// Rho at the origin latitude
    rho0: f64,
}

impl LambertConformal {
    /// Create a new Lambert Conformal projection.
    ///
    /// # Arguments
    /// * `lat0_deg` - Origin latitude (degrees)
    /// * `lov_deg` - Central meridian / orientation of the grid (degrees)
    /// * `latin1_deg` - First standard parallel (degrees)
    /// * `latin2_deg` - Second standard parallel (degrees)
    pub fn new(
        lat0_deg: f64,
        lov_deg: f64,
        latin1_deg: f64,
        latin2_deg: f64,
    ) -> Result<Self, ProjectionError> {
        let to_rad = PI / 180.0;

        let lat0 = lat0_deg * to_rad;
        let lon0 = lov_deg * to_rad;
        let latin1 = latin1_deg * to_rad;
        let latin2 = latin2_deg * to_rad;

        if latin1.abs() < 1e-10 && latin2.abs() < 1e-10 {
            return Err(ProjectionError::InvalidParameters(
                "standard parallels on the equator define a cylinder, not a cone".to_string(),
            ));
        }

        Ok(Self::from_radians(lat0, lon0, latin1, latin2))
    }

    fn from_radians(lat0: f64, lon0: f64, latin1: f64, latin2: f64) -> Self {
        let earth_radius = EARTH_RADIUS;

        // Compute cone constant n
        let n = if (latin1 - latin2).abs() < 1e-10 {
            // Tangent cone (single standard parallel)
            latin1.sin()
        } else {
            // Secant cone (two standard parallels)
            let ln_ratio = (latin1.cos() / latin2.cos()).ln();
            let tan_ratio =
                ((PI / 4.0 + latin2 / 2.0).tan() / (PI / 4.0 + latin1 / 2.0).tan()).ln();
            ln_ratio / tan_ratio
        };

        // Compute F constant
        let f = (latin1.cos() * (PI / 4.0 + latin1 / 2.0).tan().powf(n)) / n;

        let rho0 = earth_radius * f / (PI / 4.0 + lat0 / 2.0).tan().powf(n);

        Self {
            lon0,
            lat0,
            latin1,
            latin2,
            earth_radius,
            n,
            f,
            rho0,
        }
    }

    /// HRRR projection: LoV 262.5°E (-97.5°), both standard parallels 38.5°N.
    pub fn hrrr() -> Self {
        let lat = 38.5_f64.to_radians();
        Self::from_radians(lat, (-97.5_f64).to_radians(), lat, lat)
    }

    /// Cone constant.
    pub fn cone_constant(&self) -> f64 {
        self.n
    }

    /// Longitude difference from the central meridian, normalised to [-π, π].
    fn delta_lon(&self, lon: f64) -> f64 {
        let mut dlon = lon - self.lon0;
        while dlon > PI {
            dlon -= 2.0 * PI;
        }
        while dlon < -PI {
            dlon += 2.0 * PI;
        }
        dlon
    }
}

impl MapProjection for LambertConformal {
    fn name(&self) -> &str {
        "lambert_conformal_conic"
    }

    fn from_latlon(&self, lat_deg: f64, lon_deg: f64) -> Result<(f64, f64), ProjectionError> {
        let lat = lat_deg.to_radians();
        let lon = lon_deg.to_radians();

        // The opposite pole maps to infinity
        if (lat + self.n.signum() * PI / 2.0).abs() < 1e-12 {
            return Err(ProjectionError::out_of_domain(lon_deg, lat_deg));
        }

        let rho = self.earth_radius * self.f / (PI / 4.0 + lat / 2.0).tan().powf(self.n);
        let theta = self.n * self.delta_lon(lon);

        let x = rho * theta.sin();
        let y = self.rho0 - rho * theta.cos();
        Ok((x, y))
    }

    fn to_latlon(&self, x: f64, y: f64) -> Result<(f64, f64), ProjectionError> {
        let dy = self.rho0 - y;
        let mut rho = (x * x + dy * dy).sqrt();
        let theta = if self.n < 0.0 {
            rho = -rho;
            (-x).atan2(-dy)
        } else {
            x.atan2(dy)
        };

        if rho == 0.0 {
            // The apex of the cone is the pole
            return Ok((90.0 * self.n.signum(), self.lon0.to_degrees()));
        }

        let lat = 2.0 * ((self.earth_radius * self.f / rho).powf(1.0 / self.n)).atan() - PI / 2.0;
        let lon = self.lon0 + theta / self.n;

        if !lat.is_finite() || !lon.is_finite() {
            return Err(ProjectionError::out_of_domain(x, y));
        }

        let mut lon_deg = lon.to_degrees();
        if lon_deg > 180.0 {
            lon_deg -= 360.0;
        } else if lon_deg < -180.0 {
            lon_deg += 360.0;
        }
        Ok((lat.to_degrees(), lon_deg))
    }

    /// Meridians converge toward the apex, so grid north turns by `-n * dlon`.
    fn north_angle(&self, x: f64, y: f64) -> Result<f64, ProjectionError> {
        let (_, lon) = self.to_latlon(x, y)?;
        Ok(-self.n * self.delta_lon(lon.to_radians()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_origin_maps_to_zero() {
        let proj = LambertConformal::hrrr();
        let (x, y) = proj.from_latlon(38.5, -97.5).unwrap();
        assert!(x.abs() < 1e-6, "x should be ~0, got {}", x);
        assert!(y.abs() < 1e-6, "y should be ~0, got {}", y);
    }

    #[test]
    fn test_hrrr_roundtrip() {
        let proj = LambertConformal::hrrr();

        for &(lat, lon) in &[(21.138123, -122.719528), (47.8, -70.1), (30.0, -100.0)] {
            let (x, y) = proj.from_latlon(lat, lon).unwrap();
            let (lat2, lon2) = proj.to_latlon(x, y).unwrap();
            assert!((lat - lat2).abs() < 1e-7, "lat roundtrip failed: {} vs {}", lat, lat2);
            assert!((lon - lon2).abs() < 1e-7, "lon roundtrip failed: {} vs {}", lon, lon2);
        }
    }

    #[test]
    fn test_conus_center() {
        let proj = LambertConformal::hrrr();

        // Kansas City, MO sits just east of the central meridian
        let (x, y) = proj.from_latlon(39.0, -94.5).unwrap();
        assert!(x > 200_000.0 && x < 300_000.0, "x = {}", x);
        assert!(y > 0.0 && y < 100_000.0, "y = {}", y);
    }

    #[test]
    fn test_north_angle_matches_numeric_estimate() {
        let proj = LambertConformal::hrrr();
        let (x, y) = proj.from_latlon(45.0, -120.0).unwrap();

        let analytic = proj.north_angle(x, y).unwrap();

        let (px, py) = proj.from_latlon(45.001, -120.0).unwrap();
        let numeric = (px - x).atan2(py - y);

        assert!(
            (analytic - numeric).abs() < 1e-4,
            "analytic {} vs numeric {}",
            analytic,
            numeric
        );
        // west of the central meridian grid north leans east of true north
        assert!(analytic > 0.0);
    }

    #[test]
    fn test_equatorial_parallels_rejected() {
        assert!(LambertConformal::new(0.0, 0.0, 0.0, 0.0).is_err());
    }
}
