//! Finite-difference partial derivatives.
//!
//! Centered differences in the interior and one-sided differences at the
//! edges, using the actual axis coordinates so uneven spacing is handled.
//! Horizontal derivatives are always per meter: projected axes are converted
//! to meters and geographic degrees are scaled by the local distance per
//! degree.

use std::f64::consts::PI;

use grid_common::{QuantityTag, Unit};
use projection::EARTH_RADIUS;

use super::GridMath;
use crate::cache::CallCache;
use crate::classify::classify;
use crate::error::{GridMathError, Result};
use crate::grid::{AxisOrder, Field, Grid, HorizontalCoordinates, RangeType, SpatialDomain};
use crate::types::DerivativeAxis;

/// Meters per degree of latitude on the projection sphere.
pub(crate) const METERS_PER_DEGREE: f64 = EARTH_RADIUS * PI / 180.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Along {
    X,
    Y,
    Z,
}

/// How samples along the differentiated axis are turned into a physical
/// derivative.
enum Metric {
    /// Coordinates already in the output unit.
    Plain,
    /// Geographic latitude degrees.
    Latitude,
    /// Geographic longitude degrees, shrinking with cos(latitude).
    Longitude { latitudes: std::sync::Arc<[f64]> },
}

impl GridMath {
    /// Partial derivative of every component along `axis`.
    pub fn partial(&self, grid: &Grid, axis: DerivativeAxis) -> Result<Grid> {
        classify(grid)?;
        let cache = CallCache::new();
        let min_cos = self.config().min_cos_latitude();
        tracing::debug!(axis = axis.as_str(), "partial derivative");
        let out = grid.map_fields(self.config().parallel, |f| {
            partial_field(f, axis, &cache, min_cos)
        })?;
        let stats = cache.stats();
        tracing::trace!(hits = stats.hits, misses = stats.misses, "partial derivative cache");
        Ok(out)
    }

    /// Partial derivative along a domain axis index (0 = x, 1 = y, 2 = z).
    pub fn partial_index(&self, grid: &Grid, index: usize) -> Result<Grid> {
        let axis = DerivativeAxis::from_index(index).ok_or_else(|| {
            GridMathError::invalid_argument(format!("no domain axis with index {}", index))
        })?;
        self.partial(grid, axis)
    }
}

/// Derivative of one leaf along `axis`.
pub(crate) fn partial_field(
    field: &Field,
    axis: DerivativeAxis,
    cache: &CallCache,
    min_cos: f64,
) -> Result<Field> {
    let domain = field.domain();
    let along = resolve(domain, axis)?;

    let (coords, axis_unit, metric) = match along {
        Along::Z => {
            let z = domain
                .z()
                .filter(|z| z.len() > 1)
                .ok_or_else(|| {
                    GridMathError::missing_coordinate("vertical derivative needs at least two levels")
                })?;
            (z.values().to_vec(), z.unit().clone(), Metric::Plain)
        }
        Along::X | Along::Y => {
            let values = if along == Along::X {
                domain.x().values()
            } else {
                domain.y().values()
            };
            if values.len() < 2 {
                return Err(GridMathError::invalid_argument(format!(
                    "cannot differentiate along a single-point {} axis",
                    axis.as_str()
                )));
            }
            match domain.coordinates() {
                HorizontalCoordinates::Projected { unit, .. } => {
                    let to_m = unit.conversion(&Unit::meter())?;
                    let coords = values.iter().map(|&v| to_m.apply(v)).collect();
                    (coords, Unit::meter(), Metric::Plain)
                }
                HorizontalCoordinates::Geographic { order } => {
                    let is_lon = matches!(
                        (order, along),
                        (AxisOrder::LonLat, Along::X) | (AxisOrder::LatLon, Along::Y)
                    );
                    let metric = if is_lon {
                        Metric::Longitude {
                            latitudes: cache.latitudes(field.domain_arc())?,
                        }
                    } else {
                        Metric::Latitude
                    };
                    (values.to_vec(), Unit::meter(), metric)
                }
            }
        }
    };

    let (nx, ny, nz) = (domain.nx(), domain.ny(), domain.nz());
    let plane = nx * ny;
    let (n, stride) = match along {
        Along::X => (nx, 1),
        Along::Y => (ny, nx),
        Along::Z => (nz, plane),
    };

    let scale = |h: usize| -> f64 {
        match &metric {
            Metric::Plain => 1.0,
            Metric::Latitude => 1.0 / METERS_PER_DEGREE,
            Metric::Longitude { latitudes } => {
                1.0 / (METERS_PER_DEGREE * latitudes[h].to_radians().cos().max(min_cos))
            }
        }
    };

    let mut tags = Vec::with_capacity(field.component_count());
    let mut samples = Vec::with_capacity(field.component_count());
    for (c, tag) in field.range().components().iter().enumerate() {
        let data = field.component(c);
        let mut out = vec![f32::NAN; data.len()];
        for k in 0..nz {
            for j in 0..ny {
                for i in 0..nx {
                    let p = domain.index(i, j, k);
                    let pos = match along {
                        Along::X => i,
                        Along::Y => j,
                        Along::Z => k,
                    };
                    let (lo, hi) = if pos == 0 {
                        (0, 1)
                    } else if pos == n - 1 {
                        (n - 2, n - 1)
                    } else {
                        (pos - 1, pos + 1)
                    };
                    let upper = f64::from(data[p + (hi - pos) * stride]);
                    let lower = f64::from(data[p - (pos - lo) * stride]);
                    let d = (upper - lower) / (coords[hi] - coords[lo]);
                    out[p] = (d * scale(j * nx + i)) as f32;
                }
            }
        }
        tags.push(QuantityTag::new(
            format!("d{}/d{}", tag.name(), axis.as_str()),
            tag.unit().divide(&axis_unit),
        ));
        samples.push(out);
    }

    tracing::trace!(axis = axis.as_str(), points = domain.len(), "differentiated field");
    Field::from_shared(
        field.domain_arc().clone(),
        RangeType::new(tags)?,
        samples.into_iter().map(Into::into).collect(),
    )
}

fn resolve(domain: &SpatialDomain, axis: DerivativeAxis) -> Result<Along> {
    match axis {
        DerivativeAxis::X => Ok(Along::X),
        DerivativeAxis::Y => Ok(Along::Y),
        DerivativeAxis::Z => Ok(Along::Z),
        DerivativeAxis::Longitude | DerivativeAxis::Latitude => {
            let order = domain.coordinates().order().ok_or_else(|| {
                GridMathError::missing_coordinate(format!(
                    "{} derivative needs a geographic domain",
                    axis.as_str()
                ))
            })?;
            let lon_is_x = order == AxisOrder::LonLat;
            let wants_lon = axis == DerivativeAxis::Longitude;
            Ok(if lon_is_x == wants_lon { Along::X } else { Along::Y })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::GridMathConfig;
    use crate::grid::{Axis, VerticalAxis};
    use projection::LambertConformal;
    use std::sync::Arc;

    fn math() -> GridMath {
        GridMath::new(GridMathConfig {
            parallel: false,
            ..Default::default()
        })
    }

    fn projected() -> Arc<SpatialDomain> {
        Arc::new(
            SpatialDomain::projected(
                Axis::new(vec![0.0, 1.0, 3.0, 4.0]).unwrap(),
                Axis::linear(0.0, 2.0, 3).unwrap(),
                Arc::new(LambertConformal::hrrr()),
                Unit::kilometer(),
            )
            .unwrap(),
        )
    }

    #[test]
    fn test_projected_derivative_per_meter() {
        let d = projected();
        let xs = d.x().values().to_vec();
        let f = Field::from_fn(d, QuantityTag::new("T", Unit::kelvin()), |i, j, _| {
            (3.0 * xs[i] + j as f64) as f32
        })
        .unwrap();
        let out = math().partial(&f.into(), DerivativeAxis::X).unwrap();
        let field = out.first_field();
        assert_eq!(field.tag().name(), "dT/dx");
        assert_eq!(field.unit().dimension(), grid_common::Dimension::new(-1, 0, 0, 1, 0));
        // 3 K per km, uneven spacing included
        for v in field.values() {
            assert!((v - 0.003).abs() < 1e-7, "got {}", v);
        }
    }

    #[test]
    fn test_longitude_derivative_scaled_by_latitude() {
        let d = Arc::new(
            SpatialDomain::geographic(
                Axis::linear(10.0, 1.0, 3).unwrap(),
                Axis::new(vec![0.0, 60.0, 90.0]).unwrap(),
            )
            .unwrap(),
        );
        let f = Field::from_fn(d, QuantityTag::new("T", Unit::kelvin()), |i, _, _| i as f32).unwrap();
        let config = GridMathConfig::default();
        let out = partial_field(&f, DerivativeAxis::Longitude, &CallCache::new(), config.min_cos_latitude())
            .unwrap();

        let equator = out.value(0, 1, 0, 0) as f64;
        let sixty = out.value(0, 1, 1, 0) as f64;
        let pole = out.value(0, 1, 2, 0) as f64;
        assert!((equator - 1.0 / METERS_PER_DEGREE).abs() < 1e-10);
        assert!((sixty / equator - 2.0).abs() < 1e-4);
        // clamped at cos(89 deg)
        let clamped = 1.0 / (METERS_PER_DEGREE * 89f64.to_radians().cos());
        assert!((pole - clamped).abs() / clamped < 1e-5);
    }

    #[test]
    fn test_latitude_derivative_on_lat_lon_order() {
        let d = Arc::new(
            SpatialDomain::geographic_lat_lon(
                Axis::linear(30.0, 1.0, 3).unwrap(),
                Axis::linear(0.0, 1.0, 2).unwrap(),
            )
            .unwrap(),
        );
        let f = Field::from_fn(d, QuantityTag::new("z", Unit::meter()), |i, _, _| 100.0 * i as f32)
            .unwrap();
        let out = math().partial(&f.into(), DerivativeAxis::Latitude).unwrap();
        let expected = 100.0 / METERS_PER_DEGREE;
        for v in out.first_field().values() {
            assert!(((*v as f64) - expected).abs() < 1e-9);
        }
        assert!(out.first_field().unit().is_dimensionless());
    }

    #[test]
    fn test_vertical_derivative() {
        let d = Arc::new(
            SpatialDomain::geographic(
                Axis::linear(0.0, 1.0, 2).unwrap(),
                Axis::linear(0.0, 1.0, 2).unwrap(),
            )
            .unwrap()
            .with_levels(VerticalAxis::new(vec![1000.0, 850.0, 700.0], Unit::hectopascal()).unwrap()),
        );
        let f = Field::from_fn(d, QuantityTag::new("theta", Unit::kelvin()), |_, _, k| {
            300.0 + 10.0 * k as f32
        })
        .unwrap();
        let out = math().partial_index(&f.into(), 2).unwrap();
        for v in out.first_field().values() {
            assert!((v + 10.0 / 150.0).abs() < 1e-6);
        }
        assert_eq!(out.first_field().unit().dimension(), Unit::kelvin().divide(&Unit::pascal()).dimension());
    }

    #[test]
    fn test_missing_axes() {
        let flat = Arc::new(
            SpatialDomain::geographic(
                Axis::linear(0.0, 1.0, 2).unwrap(),
                Axis::new(vec![5.0]).unwrap(),
            )
            .unwrap(),
        );
        let f: Grid = Field::from_fn(flat, QuantityTag::new("T", Unit::kelvin()), |_, _, _| 1.0)
            .unwrap()
            .into();
        assert!(matches!(
            math().partial(&f, DerivativeAxis::Z),
            Err(GridMathError::MissingCoordinate(_))
        ));
        assert!(matches!(
            math().partial(&f, DerivativeAxis::Y),
            Err(GridMathError::InvalidArgument(_))
        ));
        assert!(matches!(
            math().partial_index(&f, 3),
            Err(GridMathError::InvalidArgument(_))
        ));

        let p: Grid = Field::from_fn(projected(), QuantityTag::new("T", Unit::kelvin()), |_, _, _| 1.0)
            .unwrap()
            .into();
        assert!(matches!(
            math().partial(&p, DerivativeAxis::Longitude),
            Err(GridMathError::MissingCoordinate(_))
        ));
    }
}
