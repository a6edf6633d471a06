//! Interpolation onto surfaces of constant potential temperature.

use std::sync::Arc;

use grid_common::{QuantityTag, Unit};
use projection::VerticalTransform;

use super::vertical::level_heights;
use super::DerivedGridFactory;
use crate::error::{GridMathError, Result};
use crate::grid::{Field, Grid, RangeType, SpatialDomain};
use crate::search::{find_bracket, Bracket};

impl DerivedGridFactory {
    /// `field` interpolated onto the surface where `theta` equals `target`.
    ///
    /// Each horizontal column is searched independently; the theta profile
    /// may increase or decrease with level. Columns whose profile does not
    /// reach `target` give NaN. The result lives on theta's horizontal
    /// domain without a vertical axis.
    pub fn extract_grid_over_theta_surface(
        &self,
        theta: &Grid,
        field: &Grid,
        target: f64,
    ) -> Result<Grid> {
        check_target(target)?;
        tracing::debug!(target, "extracting grid over theta surface");
        self.math.zip_aligned(theta, field, |th, f| {
            let surface = ThetaSurface::locate(th, target)?;
            surface.interpolate_field(f)
        })
    }

    /// Height (m) of the surface where `theta` equals `target`.
    pub fn extract_height_over_theta_surface(&self, theta: &Grid, target: f64) -> Result<Grid> {
        check_target(target)?;
        tracing::debug!(target, "extracting height of theta surface");
        let transform = self.vertical.as_ref();
        self.math.map(theta, |th| {
            let surface = ThetaSurface::locate(th, target)?;
            surface.height_field(transform)
        })
    }

    /// `field` and the surface height interpolated onto a theta surface,
    /// as one range with `height` appended as the last component.
    pub fn extract_grid_over_theta_topo_surface(
        &self,
        theta: &Grid,
        field: &Grid,
        target: f64,
    ) -> Result<Grid> {
        check_target(target)?;
        tracing::debug!(target, "extracting grid and height over theta surface");
        let transform = self.vertical.as_ref();
        self.math.zip_aligned(theta, field, |th, f| {
            let surface = ThetaSurface::locate(th, target)?;
            let values = surface.interpolate_field(f)?;
            let height = surface.height_field(transform)?;

            let mut tags = values.range().components().to_vec();
            tags.push(height.tag().clone());
            let mut samples = values.samples().to_vec();
            samples.extend(height.samples().iter().cloned());
            Field::from_shared(values.domain_arc().clone(), RangeType::new(tags)?, samples)
        })
    }
}

fn check_target(target: f64) -> Result<()> {
    if target.is_finite() {
        Ok(())
    } else {
        Err(GridMathError::invalid_argument(format!(
            "theta surface value {} is not finite",
            target
        )))
    }
}

/// Per-column brackets of one target value in a theta volume.
struct ThetaSurface<'a> {
    theta: &'a Field,
    domain: Arc<SpatialDomain>,
    brackets: Vec<Option<Bracket>>,
}

impl<'a> ThetaSurface<'a> {
    fn locate(theta: &'a Field, target: f64) -> Result<Self> {
        let d = theta.domain();
        if d.nz() < 2 {
            return Err(GridMathError::missing_coordinate(
                "theta surface extraction needs a volume with at least two levels",
            ));
        }
        let values = theta.component_in(0, &Unit::kelvin())?;
        let (nx, ny, nz) = (d.nx(), d.ny(), d.nz());
        let plane = nx * ny;

        let mut profile = vec![0.0; nz];
        let brackets: Vec<Option<Bracket>> = (0..plane)
            .map(|p| {
                for (k, slot) in profile.iter_mut().enumerate() {
                    *slot = values[k * plane + p];
                }
                find_bracket(&profile, target)
            })
            .collect();

        let found = brackets.iter().filter(|b| b.is_some()).count();
        tracing::trace!(columns = plane, found, "located theta surface");

        Ok(Self {
            theta,
            domain: Arc::new(d.clone().without_levels()),
            brackets,
        })
    }

    /// Evaluate a volume laid out like the theta field on the surface.
    fn interpolate(&self, volume: &[f64]) -> Vec<f32> {
        let plane = self.brackets.len();
        self.brackets
            .iter()
            .enumerate()
            .map(|(p, bracket)| match bracket {
                Some(b) if b.is_exact() => volume[b.lower * plane + p] as f32,
                Some(b) => {
                    let lower = volume[b.lower * plane + p];
                    let upper = volume[b.upper * plane + p];
                    (lower + b.fraction * (upper - lower)) as f32
                }
                None => f32::NAN,
            })
            .collect()
    }

    fn interpolate_field(&self, field: &Field) -> Result<Field> {
        if field.domain().nz() != self.theta.domain().nz() {
            return Err(GridMathError::incompatible_domain(
                "field levels do not match the theta volume",
            ));
        }
        let samples = (0..field.component_count())
            .map(|c| {
                let tag = &field.range().components()[c];
                let values = field.component_in(c, tag.unit())?;
                Ok(self.interpolate(&values))
            })
            .collect::<Result<Vec<_>>>()?;
        Field::new(self.domain.clone(), field.range().clone(), samples)
    }

    fn height_field(&self, transform: &dyn VerticalTransform) -> Result<Field> {
        let levels = level_heights(self.theta.domain(), transform)?;
        let plane = self.brackets.len();
        let volume: Vec<f64> = levels
            .iter()
            .flat_map(|&h| std::iter::repeat(h).take(plane))
            .collect();
        Field::scalar(
            self.domain.clone(),
            QuantityTag::new("height", Unit::meter()),
            self.interpolate(&volume),
        )
    }
}
