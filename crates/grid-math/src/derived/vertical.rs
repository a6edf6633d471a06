//! Pressure and height conversions.

use grid_common::{QuantityTag, Unit};
use projection::VerticalTransform;

use super::{pointwise1, DerivedGridFactory};
use crate::algebra::partial_field;
use crate::cache::CallCache;
use crate::classify::classify;
use crate::error::{GridMathError, Result};
use crate::grid::{Field, Grid, SpatialDomain};
use crate::types::DerivativeAxis;

impl DerivedGridFactory {
    /// Heights (m) of the pressures in `pressure`.
    pub fn convert_pressure_to_height(&self, pressure: &Grid) -> Result<Grid> {
        classify(pressure)?;
        let transform = self.vertical.as_ref();
        self.math.map(pressure, |f| {
            pointwise1(f, &Unit::hectopascal(), QuantityTag::new("height", Unit::meter()), |p| {
                transform.pressure_to_height(p)
            })
        })
    }

    /// Pressures (hPa) of the heights in `height`.
    pub fn convert_height_to_pressure(&self, height: &Grid) -> Result<Grid> {
        classify(height)?;
        let transform = self.vertical.as_ref();
        self.math.map(height, |f| {
            pointwise1(f, &Unit::meter(), QuantityTag::new("pressure", Unit::hectopascal()), |z| {
                transform.height_to_pressure(z)
            })
        })
    }

    /// Pressure (hPa) of every point, from each leaf's vertical axis.
    pub fn create_pressure_grid_from_domain(&self, grid: &Grid) -> Result<Grid> {
        classify(grid)?;
        let transform = self.vertical.as_ref();
        self.math.map(grid, |f| {
            let levels = level_pressures(f.domain(), transform)?;
            level_field(f, QuantityTag::new("pressure", Unit::hectopascal()), &levels)
        })
    }

    /// Height (m) of every point, from each leaf's vertical axis.
    pub fn create_height_grid_from_domain(&self, grid: &Grid) -> Result<Grid> {
        classify(grid)?;
        let transform = self.vertical.as_ref();
        self.math.map(grid, |f| {
            let levels = level_heights(f.domain(), transform)?;
            level_field(f, QuantityTag::new("height", Unit::meter()), &levels)
        })
    }

    /// Vertical velocity `w = omega * dz/dp` (m s-1) from pressure velocity.
    ///
    /// `dz/dp` is the vertical derivative of `heights` (geopotential height,
    /// say) when given, otherwise of the heights implied by omega's own
    /// pressure levels.
    pub fn convert_pressure_velocity_to_height_velocity(
        &self,
        omega: &Grid,
        heights: Option<&Grid>,
    ) -> Result<Grid> {
        let heights = match heights {
            Some(h) => h.clone(),
            None => self.create_height_grid_from_domain(omega)?,
        };
        let cache = CallCache::new();
        let min_cos = self.config().min_cos_latitude();
        tracing::debug!("converting pressure velocity to height velocity");

        self.math.zip_aligned(omega, &heights, |w, z| {
            if !w.domain().z().is_some_and(|z| z.is_pressure()) {
                return Err(GridMathError::missing_coordinate(
                    "omega needs a pressure vertical axis",
                ));
            }
            let z = z.convert_units(&Unit::meter())?;
            let dzdp = partial_field(&z, DerivativeAxis::Z, &cache, min_cos)?;
            let per_pa = Unit::meter().divide(&Unit::pascal());
            let dzdp = dzdp.component_in(0, &per_pa)?;
            let omega_pa = w.component_in(0, &Unit::pascals_per_second())?;
            Field::scalar(
                w.domain_arc().clone(),
                QuantityTag::new("w", Unit::meters_per_second()),
                omega_pa
                    .iter()
                    .zip(&dzdp)
                    .map(|(o, d)| (o * d) as f32)
                    .collect(),
            )
        })
    }
}

/// Pressure (hPa) of each level of `domain`.
pub(crate) fn level_pressures(
    domain: &SpatialDomain,
    transform: &dyn VerticalTransform,
) -> Result<Vec<f64>> {
    let z = domain
        .z()
        .ok_or_else(|| GridMathError::missing_coordinate("grid has no vertical axis"))?;
    if z.is_pressure() {
        z.values_in(&Unit::hectopascal())
    } else if z.is_height() {
        Ok(z
            .values_in(&Unit::meter())?
            .into_iter()
            .map(|h| transform.height_to_pressure(h))
            .collect())
    } else {
        Err(GridMathError::missing_coordinate(format!(
            "vertical axis in {} is not convertible to pressure",
            z.unit()
        )))
    }
}

/// Height (m) of each level of `domain`.
pub(crate) fn level_heights(
    domain: &SpatialDomain,
    transform: &dyn VerticalTransform,
) -> Result<Vec<f64>> {
    let z = domain
        .z()
        .ok_or_else(|| GridMathError::missing_coordinate("grid has no vertical axis"))?;
    if z.is_height() {
        z.values_in(&Unit::meter())
    } else if z.is_pressure() {
        Ok(z
            .values_in(&Unit::hectopascal())?
            .into_iter()
            .map(|p| transform.pressure_to_height(p))
            .collect())
    } else {
        Err(GridMathError::missing_coordinate(format!(
            "vertical axis in {} is not convertible to height",
            z.unit()
        )))
    }
}

/// Per-point pressure (hPa) of a leaf, from its vertical axis.
pub(crate) fn point_pressures(field: &Field, transform: &dyn VerticalTransform) -> Result<Vec<f64>> {
    let levels = level_pressures(field.domain(), transform)?;
    let plane = field.domain().horizontal_len();
    Ok(levels
        .iter()
        .flat_map(|&p| std::iter::repeat(p).take(plane))
        .collect())
}

fn level_field(field: &Field, tag: QuantityTag, levels: &[f64]) -> Result<Field> {
    let plane = field.domain().horizontal_len();
    let values = levels
        .iter()
        .flat_map(|&v| std::iter::repeat(v as f32).take(plane))
        .collect();
    Field::scalar(field.domain_arc().clone(), tag, values)
}
