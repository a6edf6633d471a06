//! Spatial domains: horizontal axes, optional vertical axis and the
//! coordinate reference that ties them to the earth.

use std::sync::Arc;

use grid_common::Unit;
use projection::MapProjection;
use serde::{Deserialize, Serialize};

use crate::error::{GridMathError, Result};
use crate::search::{find_bracket, Direction};

/// A strictly monotonic coordinate axis, increasing or decreasing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Axis {
    values: Vec<f64>,
}

impl Axis {
    pub fn new(values: Vec<f64>) -> Result<Self> {
        if values.is_empty() {
            return Err(GridMathError::malformed("axis has no values"));
        }
        if values.iter().any(|v| !v.is_finite()) {
            return Err(GridMathError::malformed("axis values must be finite"));
        }
        if values.len() > 1 {
            let increasing = values[1] > values[0];
            let monotonic = values.windows(2).all(|w| {
                if increasing {
                    w[1] > w[0]
                } else {
                    w[1] < w[0]
                }
            });
            if !monotonic {
                return Err(GridMathError::malformed(
                    "axis values must be strictly monotonic",
                ));
            }
        }
        Ok(Self { values })
    }

    /// Evenly spaced axis `first, first + step, ...`.
    pub fn linear(first: f64, step: f64, count: usize) -> Result<Self> {
        if count > 1 && step == 0.0 {
            return Err(GridMathError::invalid_argument("axis step must be non-zero"));
        }
        Self::new((0..count).map(|i| first + step * i as f64).collect())
    }

    pub fn values(&self) -> &[f64] {
        &self.values
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn first(&self) -> f64 {
        self.values[0]
    }

    pub fn last(&self) -> f64 {
        self.values[self.values.len() - 1]
    }

    pub fn direction(&self) -> Direction {
        if self.last() < self.first() {
            Direction::Decreasing
        } else {
            Direction::Increasing
        }
    }

    pub fn min(&self) -> f64 {
        self.first().min(self.last())
    }

    pub fn max(&self) -> f64 {
        self.first().max(self.last())
    }

    /// Position of `value` in index space, e.g. 2.5 halfway between the
    /// third and fourth values. `None` outside the axis.
    pub fn fractional_index(&self, value: f64) -> Option<f64> {
        if self.values.len() == 1 {
            let tolerance = 1e-9 * self.values[0].abs().max(1.0);
            return ((value - self.values[0]).abs() <= tolerance).then_some(0.0);
        }
        find_bracket(&self.values, value).map(|b| b.lower as f64 + b.fraction)
    }

    /// Index of the value closest to `value`, `None` outside the axis.
    pub fn nearest_index(&self, value: f64) -> Option<usize> {
        self.fractional_index(value).map(|f| f.round() as usize)
    }

    /// Index of an exactly matching value (relative tolerance 1e-9).
    pub fn index_of(&self, value: f64) -> Option<usize> {
        let tolerance = 1e-9 * value.abs().max(1.0);
        self.values
            .iter()
            .position(|v| (v - value).abs() <= tolerance)
    }
}

/// Vertical coordinate values and their unit (pressure, height, or a
/// model coordinate).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VerticalAxis {
    axis: Axis,
    unit: Unit,
}

impl VerticalAxis {
    pub fn new(values: Vec<f64>, unit: Unit) -> Result<Self> {
        Ok(Self {
            axis: Axis::new(values)?,
            unit,
        })
    }

    /// Single-level axis for a slice.
    pub fn single(value: f64, unit: Unit) -> Result<Self> {
        Self::new(vec![value], unit)
    }

    pub fn axis(&self) -> &Axis {
        &self.axis
    }

    pub fn values(&self) -> &[f64] {
        self.axis.values()
    }

    pub fn unit(&self) -> &Unit {
        &self.unit
    }

    pub fn len(&self) -> usize {
        self.axis.len()
    }

    pub fn is_empty(&self) -> bool {
        self.axis.is_empty()
    }

    pub fn is_pressure(&self) -> bool {
        self.unit.is_pressure()
    }

    pub fn is_height(&self) -> bool {
        self.unit.is_length()
    }

    /// Level values converted into `unit`.
    pub fn values_in(&self, unit: &Unit) -> Result<Vec<f64>> {
        let conversion = self.unit.conversion(unit)?;
        Ok(self.values().iter().map(|&v| conversion.apply(v)).collect())
    }
}

/// Order of the horizontal axes of a geographic domain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AxisOrder {
    /// x = longitude, y = latitude.
    LonLat,
    /// x = latitude, y = longitude.
    LatLon,
}

impl AxisOrder {
    pub fn swapped(&self) -> Self {
        match self {
            Self::LonLat => Self::LatLon,
            Self::LatLon => Self::LonLat,
        }
    }
}

/// How horizontal axis values map to the earth.
#[derive(Debug, Clone)]
pub enum HorizontalCoordinates {
    /// Axes are longitude and latitude in degrees.
    Geographic { order: AxisOrder },
    /// Axes are projected x/y in a length unit.
    Projected {
        projection: Arc<dyn MapProjection>,
        unit: Unit,
    },
}

impl PartialEq for HorizontalCoordinates {
    /// Projections compare by identity.
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Geographic { order: a }, Self::Geographic { order: b }) => a == b,
            (
                Self::Projected {
                    projection: pa,
                    unit: ua,
                },
                Self::Projected {
                    projection: pb,
                    unit: ub,
                },
            ) => Arc::ptr_eq(pa, pb) && ua == ub,
            _ => false,
        }
    }
}

impl HorizontalCoordinates {
    pub fn is_geographic(&self) -> bool {
        matches!(self, Self::Geographic { .. })
    }

    pub fn order(&self) -> Option<AxisOrder> {
        match self {
            Self::Geographic { order } => Some(*order),
            Self::Projected { .. } => None,
        }
    }

    /// Whether both references describe the same coordinate system, ignoring
    /// the axis order of geographic ones.
    pub fn same_reference(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Geographic { .. }, Self::Geographic { .. }) => true,
            _ => self == other,
        }
    }
}

/// Horizontal (x, y) axes, an optional vertical axis and a coordinate
/// reference.
///
/// Samples are laid out x fastest, then y, then z:
/// `index = (k * ny + j) * nx + i`.
#[derive(Debug, Clone, PartialEq)]
pub struct SpatialDomain {
    x: Axis,
    y: Axis,
    z: Option<VerticalAxis>,
    coordinates: HorizontalCoordinates,
}

impl SpatialDomain {
    /// Geographic domain with x = longitude, y = latitude.
    pub fn geographic(lon: Axis, lat: Axis) -> Result<Self> {
        validate_latitudes(&lat)?;
        Ok(Self {
            x: lon,
            y: lat,
            z: None,
            coordinates: HorizontalCoordinates::Geographic {
                order: AxisOrder::LonLat,
            },
        })
    }

    /// Geographic domain with x = latitude, y = longitude.
    pub fn geographic_lat_lon(lat: Axis, lon: Axis) -> Result<Self> {
        validate_latitudes(&lat)?;
        Ok(Self {
            x: lat,
            y: lon,
            z: None,
            coordinates: HorizontalCoordinates::Geographic {
                order: AxisOrder::LatLon,
            },
        })
    }

    /// Projected domain with axes in `unit` (a length unit).
    pub fn projected(
        x: Axis,
        y: Axis,
        projection: Arc<dyn MapProjection>,
        unit: Unit,
    ) -> Result<Self> {
        if !unit.is_length() {
            return Err(GridMathError::invalid_argument(format!(
                "projected axes need a length unit, got {}",
                unit
            )));
        }
        Ok(Self {
            x,
            y,
            z: None,
            coordinates: HorizontalCoordinates::Projected { projection, unit },
        })
    }

    pub fn with_levels(mut self, z: VerticalAxis) -> Self {
        self.z = Some(z);
        self
    }

    pub fn without_levels(mut self) -> Self {
        self.z = None;
        self
    }

    pub fn x(&self) -> &Axis {
        &self.x
    }

    pub fn y(&self) -> &Axis {
        &self.y
    }

    pub fn z(&self) -> Option<&VerticalAxis> {
        self.z.as_ref()
    }

    pub fn coordinates(&self) -> &HorizontalCoordinates {
        &self.coordinates
    }

    pub fn nx(&self) -> usize {
        self.x.len()
    }

    pub fn ny(&self) -> usize {
        self.y.len()
    }

    /// Number of levels, 1 for 2D domains.
    pub fn nz(&self) -> usize {
        self.z.as_ref().map_or(1, |z| z.len())
    }

    pub fn horizontal_len(&self) -> usize {
        self.nx() * self.ny()
    }

    pub fn len(&self) -> usize {
        self.horizontal_len() * self.nz()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    #[inline]
    pub fn index(&self, i: usize, j: usize, k: usize) -> usize {
        (k * self.ny() + j) * self.nx() + i
    }

    /// Carries a vertical coordinate.
    pub fn is_3d(&self) -> bool {
        self.z.is_some()
    }

    /// 3D with more than one level.
    pub fn is_volume(&self) -> bool {
        self.z.as_ref().is_some_and(|z| z.len() > 1)
    }

    /// 3D with exactly one level.
    pub fn is_slice(&self) -> bool {
        self.z.as_ref().is_some_and(|z| z.len() == 1)
    }

    pub fn is_geographic(&self) -> bool {
        self.coordinates.is_geographic()
    }

    /// Horizontal axes and coordinate reference are equal.
    pub fn same_horizontal(&self, other: &SpatialDomain) -> bool {
        self.x == other.x && self.y == other.y && self.coordinates == other.coordinates
    }

    /// Unit of the horizontal axis values.
    pub fn horizontal_unit(&self) -> Unit {
        match &self.coordinates {
            HorizontalCoordinates::Geographic { .. } => Unit::degree(),
            HorizontalCoordinates::Projected { unit, .. } => unit.clone(),
        }
    }

    /// Geographic (lat, lon) in degrees of horizontal point (i, j).
    pub fn latlon(&self, i: usize, j: usize) -> Result<(f64, f64)> {
        let (x, y) = (self.x.values()[i], self.y.values()[j]);
        match &self.coordinates {
            HorizontalCoordinates::Geographic { order } => Ok(match order {
                AxisOrder::LonLat => (y, x),
                AxisOrder::LatLon => (x, y),
            }),
            HorizontalCoordinates::Projected { projection, unit } => {
                let to_m = unit.conversion(&Unit::meter())?;
                Ok(projection.to_latlon(to_m.apply(x), to_m.apply(y))?)
            }
        }
    }

    /// Map a geographic point into this domain's horizontal coordinates.
    pub fn to_domain_coordinates(&self, lat: f64, lon: f64) -> Result<(f64, f64)> {
        match &self.coordinates {
            HorizontalCoordinates::Geographic { order } => {
                let lon = self.normalize_longitude(lon);
                Ok(match order {
                    AxisOrder::LonLat => (lon, lat),
                    AxisOrder::LatLon => (lat, lon),
                })
            }
            HorizontalCoordinates::Projected { projection, unit } => {
                let from_m = Unit::meter().conversion(unit)?;
                let (x, y) = projection.from_latlon(lat, lon)?;
                Ok((from_m.apply(x), from_m.apply(y)))
            }
        }
    }

    /// Shift a longitude into the 0..360 or -180..180 convention of the
    /// domain's longitude axis.
    pub fn normalize_longitude(&self, lon: f64) -> f64 {
        let axis = match self.coordinates.order() {
            Some(AxisOrder::LonLat) => &self.x,
            Some(AxisOrder::LatLon) => &self.y,
            None => return lon,
        };
        let (min, max) = (axis.min(), axis.max());
        let mut lon = lon;
        if lon < min && lon + 360.0 <= max + 1e-9 {
            lon += 360.0;
        } else if lon > max && lon - 360.0 >= min - 1e-9 {
            lon -= 360.0;
        }
        lon
    }

    /// Geographic domain with the horizontal axes swapped.
    pub fn transposed(&self) -> Result<Self> {
        match &self.coordinates {
            HorizontalCoordinates::Geographic { order } => Ok(Self {
                x: self.y.clone(),
                y: self.x.clone(),
                z: self.z.clone(),
                coordinates: HorizontalCoordinates::Geographic {
                    order: order.swapped(),
                },
            }),
            HorizontalCoordinates::Projected { projection, .. } => {
                Err(GridMathError::incompatible_domain(format!(
                    "cannot transpose a {} projected domain",
                    projection.name()
                )))
            }
        }
    }
}

fn validate_latitudes(lat: &Axis) -> Result<()> {
    if lat.min() < -90.0 - 1e-9 || lat.max() > 90.0 + 1e-9 {
        return Err(GridMathError::malformed(format!(
            "latitudes outside [-90, 90]: {}..{}",
            lat.min(),
            lat.max()
        )));
    }
    Ok(())
}
