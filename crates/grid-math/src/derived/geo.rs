//! Latitude, longitude and Coriolis grids.

use grid_common::{QuantityTag, Unit};

use super::{DerivedGridFactory, EARTH_ROTATION_RATE};
use crate::cache::CallCache;
use crate::classify::classify;
use crate::error::Result;
use crate::grid::{Field, Grid};

impl DerivedGridFactory {
    /// Geographic latitude (degrees) at every point of every leaf.
    pub fn create_latitude_grid(&self, grid: &Grid) -> Result<Grid> {
        classify(grid)?;
        let cache = CallCache::new();
        grid.map_fields(self.config().parallel, |f| latitude_field(f, &cache))
    }

    /// Geographic longitude (degrees) at every point of every leaf.
    pub fn create_longitude_grid(&self, grid: &Grid) -> Result<Grid> {
        classify(grid)?;
        let cache = CallCache::new();
        grid.map_fields(self.config().parallel, |f| {
            let lons = cache.longitudes(f.domain_arc())?;
            horizontal_field(f, QuantityTag::new("longitude", Unit::degree()), |h| lons[h])
        })
    }

    /// Coriolis parameter `2 * omega * sin(lat)` (s-1).
    ///
    /// Magnitudes below the configured floor are NaN so later divisions do
    /// not blow up near the equator.
    pub fn create_coriolis_grid(&self, grid: &Grid) -> Result<Grid> {
        classify(grid)?;
        let cache = CallCache::new();
        let floor = self.config().coriolis_floor;
        grid.map_fields(self.config().parallel, |f| coriolis_field(f, &cache, floor))
    }
}

pub(crate) fn latitude_field(field: &Field, cache: &CallCache) -> Result<Field> {
    let lats = cache.latitudes(field.domain_arc())?;
    horizontal_field(field, QuantityTag::new("latitude", Unit::degree()), |h| lats[h])
}

pub(crate) fn coriolis_field(field: &Field, cache: &CallCache, floor: f64) -> Result<Field> {
    let lats = cache.latitudes(field.domain_arc())?;
    horizontal_field(field, QuantityTag::new("coriolis", Unit::per_second()), |h| {
        let f = 2.0 * EARTH_ROTATION_RATE * lats[h].to_radians().sin();
        if f.abs() < floor {
            f64::NAN
        } else {
            f
        }
    })
}

/// A scalar field on `field`'s domain whose value depends only on the
/// horizontal point (x fastest), repeated on every level.
fn horizontal_field<F>(field: &Field, tag: QuantityTag, value: F) -> Result<Field>
where
    F: Fn(usize) -> f64,
{
    let plane = field.domain().horizontal_len();
    let nz = field.domain().nz();
    let mut values = Vec::with_capacity(plane * nz);
    for _ in 0..nz {
        values.extend((0..plane).map(|h| value(h) as f32));
    }
    Field::scalar(field.domain_arc().clone(), tag, values)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::GridMathConfig;
    use crate::grid::{Axis, SpatialDomain, VerticalAxis};
    use projection::LambertConformal;
    use std::sync::Arc;

    fn factory() -> DerivedGridFactory {
        DerivedGridFactory::with_config(GridMathConfig {
            parallel: false,
            ..Default::default()
        })
    }

    #[test]
    fn test_latitude_and_coriolis() {
        let d = Arc::new(
            SpatialDomain::geographic(
                Axis::linear(0.0, 10.0, 2).unwrap(),
                Axis::new(vec![0.0, 30.0, 90.0]).unwrap(),
            )
            .unwrap()
            .with_levels(VerticalAxis::new(vec![1000.0, 500.0], Unit::hectopascal()).unwrap()),
        );
        let g: Grid = Field::from_fn(d, QuantityTag::new("T", Unit::kelvin()), |_, _, _| 0.0)
            .unwrap()
            .into();

        let lat = factory().create_latitude_grid(&g).unwrap();
        let lat = lat.first_field();
        assert_eq!(lat.value(0, 1, 1, 1), 30.0);
        assert_eq!(lat.unit(), &Unit::degree());

        let lon = factory().create_longitude_grid(&g).unwrap();
        assert_eq!(lon.first_field().value(0, 1, 2, 0), 10.0);

        let f = factory().create_coriolis_grid(&g).unwrap();
        let f = f.first_field();
        assert!(f.value(0, 0, 0, 0).is_nan());
        assert!((f.value(0, 0, 1, 0) as f64 - EARTH_ROTATION_RATE).abs() < 1e-10);
        assert!((f.value(0, 0, 2, 1) as f64 - 2.0 * EARTH_ROTATION_RATE).abs() < 1e-10);
    }

    #[test]
    fn test_latitude_on_projected_domain() {
        let proj = Arc::new(LambertConformal::hrrr());
        let (x, y) = projection::MapProjection::from_latlon(proj.as_ref(), 38.5, -97.5).unwrap();
        let d = Arc::new(
            SpatialDomain::projected(
                Axis::linear(x, 3000.0, 2).unwrap(),
                Axis::linear(y, 3000.0, 2).unwrap(),
                proj,
                Unit::meter(),
            )
            .unwrap(),
        );
        let g: Grid = Field::from_fn(d, QuantityTag::new("T", Unit::kelvin()), |_, _, _| 0.0)
            .unwrap()
            .into();
        let lat = factory().create_latitude_grid(&g).unwrap();
        assert!((lat.first_field().value(0, 0, 0, 0) - 38.5).abs() < 1e-4);
        assert!(lat.first_field().value(0, 0, 1, 0) > 38.5);
    }
}
