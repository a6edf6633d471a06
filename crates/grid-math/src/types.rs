//! Small shared enums and statistics types.

use serde::{Deserialize, Serialize};

/// Interpolation method for spatial and temporal resampling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InterpolationMethod {
    /// Nearest neighbor (preserves exact values).
    Nearest,
    /// Bilinear interpolation (the weighted-average mode).
    #[default]
    Bilinear,
    /// Bicubic interpolation (smoothest, more compute).
    Cubic,
}

impl InterpolationMethod {
    /// Parse from string (case-insensitive).
    pub fn from_str(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "nearest" => Self::Nearest,
            "cubic" | "bicubic" => Self::Cubic,
            _ => Self::Bilinear,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Nearest => "nearest",
            Self::Bilinear => "bilinear",
            Self::Cubic => "cubic",
        }
    }
}

impl std::fmt::Display for InterpolationMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Elementwise reduction across the time axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TimeFunction {
    Average,
    Sum,
    Min,
    Max,
    /// Population standard deviation.
    StdDev,
}

impl TimeFunction {
    /// Parse from string (case-insensitive). Unknown names give `None`.
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "average" | "mean" => Some(Self::Average),
            "sum" => Some(Self::Sum),
            "min" | "minimum" => Some(Self::Min),
            "max" | "maximum" => Some(Self::Max),
            "stdev" | "stddev" | "std" => Some(Self::StdDev),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Average => "average",
            Self::Sum => "sum",
            Self::Min => "min",
            Self::Max => "max",
            Self::StdDev => "stdev",
        }
    }
}

impl std::fmt::Display for TimeFunction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Elementwise reduction across ensemble members.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MemberFunction {
    Average,
    Sum,
    Min,
    Max,
    StdDev,
    /// Inclusive linear-interpolation percentile, `0 < p <= 100`.
    Percentile(f64),
    /// Most frequent value, earliest member wins ties.
    Mode,
    /// Fraction of the ensemble distribution below a threshold.
    UnivariateProbability { threshold: f64 },
}

impl MemberFunction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Average => "average",
            Self::Sum => "sum",
            Self::Min => "min",
            Self::Max => "max",
            Self::StdDev => "stdev",
            Self::Percentile(_) => "percentile",
            Self::Mode => "mode",
            Self::UnivariateProbability { .. } => "probability",
        }
    }
}

impl From<TimeFunction> for MemberFunction {
    fn from(f: TimeFunction) -> Self {
        match f {
            TimeFunction::Average => Self::Average,
            TimeFunction::Sum => Self::Sum,
            TimeFunction::Min => Self::Min,
            TimeFunction::Max => Self::Max,
            TimeFunction::StdDev => Self::StdDev,
        }
    }
}

impl std::fmt::Display for MemberFunction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Percentile(p) => write!(f, "percentile({})", p),
            Self::UnivariateProbability { threshold } => write!(f, "probability(<{})", threshold),
            other => write!(f, "{}", other.as_str()),
        }
    }
}

/// How a running-average window is filled past the ends of the series.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EndpointPolicy {
    /// Wrap around to the opposite end.
    Cyclic,
    /// Output NaN where the window does not fit.
    #[default]
    Missing,
    /// Mirror interior values about the end point.
    Symmetric,
}

impl EndpointPolicy {
    /// Parse from string (case-insensitive). Unknown names give `None`.
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "cyclic" | "wrap" => Some(Self::Cyclic),
            "missing" => Some(Self::Missing),
            "symmetric" | "mirror" => Some(Self::Symmetric),
            _ => None,
        }
    }

    /// Map a possibly out-of-range window index onto the series `0..n`.
    pub fn resolve(&self, index: isize, n: usize) -> Option<usize> {
        let n = n as isize;
        if n == 0 {
            return None;
        }
        if (0..n).contains(&index) {
            return Some(index as usize);
        }
        match self {
            Self::Cyclic => Some(index.rem_euclid(n) as usize),
            Self::Missing => None,
            Self::Symmetric => {
                if n == 1 {
                    return Some(0);
                }
                // reflect about the end points without repeating them
                let period = 2 * (n - 1);
                let mut idx = index.rem_euclid(period);
                if idx >= n {
                    idx = period - idx;
                }
                Some(idx as usize)
            }
        }
    }
}

/// Axis selector for partial derivatives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DerivativeAxis {
    /// First horizontal domain axis (columns).
    X,
    /// Second horizontal domain axis (rows).
    Y,
    /// Vertical axis.
    Z,
    /// Geographic east, whichever domain axis carries longitude.
    Longitude,
    /// Geographic north, whichever domain axis carries latitude.
    Latitude,
}

impl DerivativeAxis {
    /// Domain axis by index: 0 = x, 1 = y, 2 = z.
    pub fn from_index(index: usize) -> Option<Self> {
        match index {
            0 => Some(Self::X),
            1 => Some(Self::Y),
            2 => Some(Self::Z),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::X => "x",
            Self::Y => "y",
            Self::Z => "z",
            Self::Longitude => "lon",
            Self::Latitude => "lat",
        }
    }
}

/// Statistics about a per-call cache.
#[derive(Debug, Clone, Default)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub entries: usize,
}

impl CacheStats {
    /// Calculate the cache hit rate (0.0 - 1.0).
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_interpolation_method_from_str() {
        assert_eq!(
            InterpolationMethod::from_str("nearest"),
            InterpolationMethod::Nearest
        );
        assert_eq!(
            InterpolationMethod::from_str("BILINEAR"),
            InterpolationMethod::Bilinear
        );
        assert_eq!(
            InterpolationMethod::from_str("bicubic"),
            InterpolationMethod::Cubic
        );
        assert_eq!(
            InterpolationMethod::from_str("invalid"),
            InterpolationMethod::Bilinear
        );
    }

    #[test]
    fn test_time_function_from_str() {
        assert_eq!(TimeFunction::from_str("Mean"), Some(TimeFunction::Average));
        assert_eq!(TimeFunction::from_str("stdev"), Some(TimeFunction::StdDev));
        assert_eq!(TimeFunction::from_str("median"), None);
    }

    #[test]
    fn test_endpoint_resolve_cyclic() {
        let p = EndpointPolicy::Cyclic;
        assert_eq!(p.resolve(-1, 5), Some(4));
        assert_eq!(p.resolve(5, 5), Some(0));
        assert_eq!(p.resolve(2, 5), Some(2));
    }

    #[test]
    fn test_endpoint_resolve_missing() {
        let p = EndpointPolicy::Missing;
        assert_eq!(p.resolve(-1, 5), None);
        assert_eq!(p.resolve(5, 5), None);
        assert_eq!(p.resolve(0, 5), Some(0));
    }

    #[test]
    fn test_endpoint_resolve_symmetric() {
        let p = EndpointPolicy::Symmetric;
        assert_eq!(p.resolve(-1, 5), Some(1));
        assert_eq!(p.resolve(-2, 5), Some(2));
        assert_eq!(p.resolve(5, 5), Some(3));
        assert_eq!(p.resolve(6, 5), Some(2));
        assert_eq!(p.resolve(-3, 1), Some(0));
    }

    #[test]
    fn test_cache_stats_hit_rate() {
        let mut stats = CacheStats::default();
        assert!((stats.hit_rate() - 0.0).abs() < f64::EPSILON);

        stats.hits = 80;
        stats.misses = 20;
        assert!((stats.hit_rate() - 0.8).abs() < f64::EPSILON);
    }
}
