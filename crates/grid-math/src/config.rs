//! Configuration for grid math operators.

use serde::{Deserialize, Serialize};

use crate::types::InterpolationMethod;

/// Tunables shared by [`GridMath`](crate::GridMath) and
/// [`DerivedGridFactory`](crate::DerivedGridFactory).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GridMathConfig {
    /// Resampling mode used when a caller asks for weighted averaging.
    /// Unweighted resampling is always nearest neighbour.
    pub interpolation: InterpolationMethod,

    /// Evaluate time steps and ensemble members on the rayon pool.
    pub parallel: bool,

    /// Coriolis magnitudes below this (s-1) are replaced by NaN.
    pub coriolis_floor: f64,

    /// Latitude (degrees) beyond which the cos(lat) metric factor of
    /// longitudinal derivatives is held constant.
    pub max_derivative_latitude: f64,

    /// Relative tolerance under which ensemble values are merged when
    /// building the empirical CDF for probabilities.
    pub probability_tolerance: f64,

    /// Running averages return NaN when any window value is missing
    /// instead of renormalising the remaining weights.
    pub propagate_missing: bool,

    /// Relative humidity whose values all lie in `[0, rh_fraction_threshold]`
    /// is taken to be a fraction and scaled to percent.
    pub rh_fraction_threshold: f64,
}

impl Default for GridMathConfig {
    fn default() -> Self {
        Self {
            interpolation: InterpolationMethod::Bilinear,
            parallel: true,
            coriolis_floor: 1.25e-5,
            max_derivative_latitude: 89.0,
            probability_tolerance: 1e-4,
            propagate_missing: false,
            rh_fraction_threshold: 1.1,
        }
    }
}

impl GridMathConfig {
    /// Load configuration from environment variables.
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(val) = std::env::var("GRID_MATH_INTERPOLATION") {
            config.interpolation = InterpolationMethod::from_str(&val);
        }

        if let Ok(val) = std::env::var("GRID_MATH_PARALLEL") {
            config.parallel = val.to_lowercase() == "true" || val == "1";
        }

        if let Ok(val) = std::env::var("GRID_MATH_CORIOLIS_FLOOR") {
            if let Ok(floor) = val.parse() {
                config.coriolis_floor = floor;
            }
        }

        if let Ok(val) = std::env::var("GRID_MATH_MAX_DERIVATIVE_LATITUDE") {
            if let Ok(lat) = val.parse() {
                config.max_derivative_latitude = lat;
            }
        }

        if let Ok(val) = std::env::var("GRID_MATH_PROBABILITY_TOLERANCE") {
            if let Ok(tol) = val.parse() {
                config.probability_tolerance = tol;
            }
        }

        if let Ok(val) = std::env::var("GRID_MATH_PROPAGATE_MISSING") {
            config.propagate_missing = val.to_lowercase() == "true" || val == "1";
        }

        if let Ok(val) = std::env::var("GRID_MATH_RH_FRACTION_THRESHOLD") {
            if let Ok(threshold) = val.parse() {
                config.rh_fraction_threshold = threshold;
            }
        }

        config
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), String> {
        if !(self.coriolis_floor >= 0.0) {
            return Err("coriolis_floor must be >= 0".to_string());
        }

        if !(self.max_derivative_latitude > 0.0 && self.max_derivative_latitude < 90.0) {
            return Err("max_derivative_latitude must be in (0, 90)".to_string());
        }

        if !(self.probability_tolerance >= 0.0) {
            return Err("probability_tolerance must be >= 0".to_string());
        }

        if !(self.rh_fraction_threshold > 0.0) {
            return Err("rh_fraction_threshold must be > 0".to_string());
        }

        Ok(())
    }

    /// Smallest allowed cos(latitude) in metric factors.
    pub fn min_cos_latitude(&self) -> f64 {
        self.max_derivative_latitude.to_radians().cos()
    }

    /// Resampling mode for a binary operation.
    pub fn resample_method(&self, weighted: bool) -> InterpolationMethod {
        if weighted {
            self.interpolation
        } else {
            InterpolationMethod::Nearest
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = GridMathConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.interpolation, InterpolationMethod::Bilinear);
        assert!((config.min_cos_latitude() - 89f64.to_radians().cos()).abs() < 1e-15);
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let mut config = GridMathConfig::default();
        config.max_derivative_latitude = 90.0;
        assert!(config.validate().is_err());

        let mut config = GridMathConfig::default();
        config.coriolis_floor = f64::NAN;
        assert!(config.validate().is_err());

        let mut config = GridMathConfig::default();
        config.rh_fraction_threshold = 0.0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_resample_method() {
        let config = GridMathConfig {
            interpolation: InterpolationMethod::Cubic,
            ..Default::default()
        };
        assert_eq!(config.resample_method(false), InterpolationMethod::Nearest);
        assert_eq!(config.resample_method(true), InterpolationMethod::Cubic);
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let config: GridMathConfig =
            serde_json::from_str(r#"{"parallel": false, "coriolis_floor": 1e-6}"#).unwrap();
        assert!(!config.parallel);
        assert_eq!(config.coriolis_floor, 1e-6);
        assert_eq!(config.max_derivative_latitude, 89.0);
    }
}
