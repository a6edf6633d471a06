//! Wind vectors: assembly, rotation to true north, speed and direction.

use grid_common::{QuantityTag, Unit};

use super::DerivedGridFactory;
use crate::cache::CallCache;
use crate::classify::classify;
use crate::error::{GridMathError, Result};
use crate::grid::{Field, Grid, RangeType, VectorKind};

impl DerivedGridFactory {
    /// Combine u and v component grids into one vector grid.
    ///
    /// The range is tagged as a vector when every component is a velocity:
    /// earth-relative on geographic domains, grid-relative on projected ones.
    pub fn create_flow_vectors(&self, u: &Grid, v: &Grid) -> Result<Grid> {
        let combined = self.combine_grids(&[u, v])?;
        tag_vectors(&combined, self.config().parallel)
    }

    /// Combine u, v and w into a 3D vector grid.
    pub fn create_3d_flow_vectors(&self, u: &Grid, v: &Grid, w: &Grid) -> Result<Grid> {
        let combined = self.combine_grids(&[u, v, w])?;
        tag_vectors(&combined, self.config().parallel)
    }

    /// Like [`create_flow_vectors`](Self::create_flow_vectors), rotated to
    /// earth-relative (north-referenced) orientation.
    pub fn create_true_flow_vectors(&self, u: &Grid, v: &Grid) -> Result<Grid> {
        let flow = self.create_flow_vectors(u, v)?;
        self.create_true_flow_vector(&flow)
    }

    /// Rotate a grid-relative vector grid to earth-relative orientation.
    ///
    /// Each leaf is rotated with its own domain's north angles; leaves that
    /// are already earth-relative pass through.
    pub fn create_true_flow_vector(&self, flow: &Grid) -> Result<Grid> {
        classify(flow)?;
        let cache = CallCache::new();
        let out = flow.map_fields(self.config().parallel, |f| rotate_to_earth(f, &cache))?;
        let stats = cache.stats();
        tracing::debug!(
            hits = stats.hits,
            misses = stats.misses,
            "rotated flow vectors to true north"
        );
        Ok(out)
    }

    /// Wind speed `sqrt(u^2 + v^2)` in the u component's unit.
    pub fn create_vector_magnitude(&self, flow: &Grid) -> Result<Grid> {
        classify(flow)?;
        self.math.map(flow, |f| {
            let (u, v, unit) = horizontal_components(f)?;
            let speed = u.iter().zip(&v).map(|(a, b)| a.hypot(*b) as f32).collect();
            Field::scalar(f.domain_arc().clone(), QuantityTag::new("speed", unit), speed)
        })
    }

    /// Meteorological direction the wind blows from (degrees, 0 = north,
    /// 90 = east), after rotation to true north.
    pub fn create_vector_direction(&self, flow: &Grid) -> Result<Grid> {
        let earth = self.create_true_flow_vector(flow)?;
        self.math.map(&earth, |f| {
            let (u, v, _) = horizontal_components(f)?;
            let direction = u
                .iter()
                .zip(&v)
                .map(|(&u, &v)| (270.0 - v.atan2(u).to_degrees()).rem_euclid(360.0) as f32)
                .collect();
            Field::scalar(
                f.domain_arc().clone(),
                QuantityTag::new("direction", Unit::degree()),
                direction,
            )
        })
    }

    /// One component of a multi-component grid.
    pub fn get_component(&self, grid: &Grid, index: usize) -> Result<Grid> {
        self.math.map(grid, |f| f.select_component(index))
    }

    /// The u (first) and v (second) components of a vector grid.
    pub fn get_flow_components(&self, flow: &Grid) -> Result<(Grid, Grid)> {
        Ok((self.get_component(flow, 0)?, self.get_component(flow, 1)?))
    }
}

fn tag_vectors(grid: &Grid, parallel: bool) -> Result<Grid> {
    grid.map_fields(parallel, |f| {
        let range = f.range();
        if !range.components().iter().all(|t| t.unit().is_velocity()) {
            tracing::debug!(range = %range, "flow components are not all velocities");
            return Ok(f.clone());
        }
        let kind = if f.domain().is_geographic() {
            VectorKind::EarthRelative
        } else {
            VectorKind::GridRelative
        };
        f.with_range(RangeType::vector(range.components().to_vec(), kind)?)
    })
}

fn horizontal_components(f: &Field) -> Result<(Vec<f64>, Vec<f64>, Unit)> {
    if f.component_count() < 2 {
        return Err(GridMathError::invalid_argument(format!(
            "flow needs at least two components, got {}",
            f.range()
        )));
    }
    let unit = f.range().components()[0].unit().clone();
    Ok((f.component_in(0, &unit)?, f.component_in(1, &unit)?, unit))
}

fn rotate_to_earth(f: &Field, cache: &CallCache) -> Result<Field> {
    match f.range().vector_kind() {
        Some(VectorKind::GridRelative) => {}
        Some(VectorKind::EarthRelative) => return Ok(f.clone()),
        None => {
            return Err(GridMathError::invalid_argument(format!(
                "{} is not a vector range",
                f.range()
            )))
        }
    }

    let angles = cache.north_angles(f.domain_arc())?;
    let (u, v, _) = horizontal_components(f)?;
    let plane = f.domain().horizontal_len();

    let mut ue = Vec::with_capacity(u.len());
    let mut ve = Vec::with_capacity(v.len());
    for (p, (&gu, &gv)) in u.iter().zip(&v).enumerate() {
        let (sin, cos) = angles[p % plane].sin_cos();
        ue.push((gu * cos - gv * sin) as f32);
        ve.push((gu * sin + gv * cos) as f32);
    }

    let unit = f.range().components()[0].unit().clone();
    let mut samples = vec![ue, ve];
    for extra in 2..f.component_count() {
        samples.push(f.component(extra).to_vec());
    }
    let mut tags = f.range().components().to_vec();
    tags[1] = tags[1].with_unit(unit);
    Field::new(
        f.domain_arc().clone(),
        RangeType::vector(tags, VectorKind::EarthRelative)?,
        samples,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::GridMathConfig;
    use crate::grid::{Axis, SpatialDomain};
    use projection::{LambertConformal, MapProjection};
    use std::sync::Arc;

    fn factory() -> DerivedGridFactory {
        DerivedGridFactory::with_config(GridMathConfig {
            parallel: false,
            ..Default::default()
        })
    }

    fn geographic() -> Arc<SpatialDomain> {
        Arc::new(
            SpatialDomain::geographic(
                Axis::linear(0.0, 1.0, 2).unwrap(),
                Axis::linear(0.0, 1.0, 2).unwrap(),
            )
            .unwrap(),
        )
    }

    fn scalar(domain: &Arc<SpatialDomain>, name: &str, unit: Unit, value: f32) -> Grid {
        Field::scalar(domain.clone(), QuantityTag::new(name, unit), vec![value; domain.len()])
            .unwrap()
            .into()
    }

    #[test]
    fn test_flow_vectors_tagging() {
        let d = geographic();
        let u = scalar(&d, "u", Unit::meters_per_second(), 3.0);
        let v = scalar(&d, "v", Unit::knot(), 4.0);
        let flow = factory().create_flow_vectors(&u, &v).unwrap();
        assert_eq!(flow.range().vector_kind(), Some(VectorKind::EarthRelative));

        let t = scalar(&d, "T", Unit::kelvin(), 4.0);
        let tuple = factory().create_flow_vectors(&u, &t).unwrap();
        assert!(!tuple.range().is_vector());
    }

    #[test]
    fn test_speed_and_direction() {
        let d = geographic();
        let u = scalar(&d, "u", Unit::meters_per_second(), 0.0);
        let v = scalar(&d, "v", Unit::meters_per_second(), -5.0);
        let flow = factory().create_flow_vectors(&u, &v).unwrap();
        let speed = factory().create_vector_magnitude(&flow).unwrap();
        assert_eq!(speed.first_field().values()[0], 5.0);
        // wind blowing toward the south comes from the north
        let dir = factory().create_vector_direction(&flow).unwrap();
        assert!(dir.first_field().values()[0].abs() < 1e-4);

        let westerly = factory()
            .create_flow_vectors(
                &scalar(&d, "u", Unit::meters_per_second(), 5.0),
                &scalar(&d, "v", Unit::meters_per_second(), 0.0),
            )
            .unwrap();
        let dir = factory().create_vector_direction(&westerly).unwrap();
        assert!((dir.first_field().values()[0] - 270.0).abs() < 1e-4);
    }

    #[test]
    fn test_true_flow_rotation_on_lambert() {
        let proj = Arc::new(LambertConformal::hrrr());
        let (x, y) = proj.from_latlon(45.0, -120.0).unwrap();
        let d = Arc::new(
            SpatialDomain::projected(
                Axis::linear(x, 3000.0, 2).unwrap(),
                Axis::linear(y, 3000.0, 2).unwrap(),
                proj.clone(),
                Unit::meter(),
            )
            .unwrap(),
        );
        let u = scalar(&d, "u", Unit::meters_per_second(), 10.0);
        let v = scalar(&d, "v", Unit::meters_per_second(), 0.0);
        let flow = factory().create_flow_vectors(&u, &v).unwrap();
        assert_eq!(flow.range().vector_kind(), Some(VectorKind::GridRelative));

        let earth = factory().create_true_flow_vector(&flow).unwrap();
        let f = earth.first_field();
        assert_eq!(f.range().vector_kind(), Some(VectorKind::EarthRelative));
        let (eu, ev) = proj.grid_to_earth(x, y, 10.0, 0.0).unwrap();
        assert!((f.component(0)[0] as f64 - eu).abs() < 1e-4);
        assert!((f.component(1)[0] as f64 - ev).abs() < 1e-4);
        // speed is preserved
        let speed = (f.component(0)[0].powi(2) + f.component(1)[0].powi(2)).sqrt();
        assert!((speed - 10.0).abs() < 1e-4);
    }

    #[test]
    fn test_rotation_needs_vectors() {
        let d = geographic();
        let t = scalar(&d, "T", Unit::kelvin(), 1.0);
        assert!(matches!(
            factory().create_true_flow_vector(&t),
            Err(GridMathError::InvalidArgument(_))
        ));
    }
}
