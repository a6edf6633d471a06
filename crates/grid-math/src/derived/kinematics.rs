//! Vorticity, divergence, advection and gradients.

use grid_common::{QuantityTag, Unit};

use super::geo::coriolis_field;
use super::DerivedGridFactory;
use crate::algebra::partial_field;
use crate::cache::CallCache;
use crate::error::Result;
use crate::grid::{Field, Grid, RangeType};
use crate::types::DerivativeAxis;

/// Differentiation context shared by the leaves of one call.
pub(crate) struct Kinematics<'a> {
    pub cache: &'a CallCache,
    pub min_cos: f64,
}

impl Kinematics<'_> {
    fn d(&self, f: &Field, axis: DerivativeAxis) -> Result<Vec<f64>> {
        let d = partial_field(f, axis, self.cache, self.min_cos)?;
        Ok(d.component(0).iter().map(|&v| f64::from(v)).collect())
    }

    /// Eastward and northward partial derivatives of the first component,
    /// converted to per-meter values of `unit`. Geographic domains are
    /// differentiated along longitude and latitude whatever their storage
    /// order; projected domains along their grid axes.
    fn gradient(&self, f: &Field, unit: &Unit) -> Result<(Vec<f64>, Vec<f64>)> {
        let scalar = f.select_component(0)?.convert_units(unit)?;
        let (east, north) = match scalar.domain().coordinates().order() {
            Some(_) => (DerivativeAxis::Longitude, DerivativeAxis::Latitude),
            None => (DerivativeAxis::X, DerivativeAxis::Y),
        };
        Ok((self.d(&scalar, east)?, self.d(&scalar, north)?))
    }

    /// `dv/dx - du/dy` (s-1) of a two-component flow leaf.
    pub fn vorticity(&self, flow: &Field) -> Result<Field> {
        let (u, v) = split(flow)?;
        let (_, dudy) = self.gradient(&u, &Unit::meters_per_second())?;
        let (dvdx, _) = self.gradient(&v, &Unit::meters_per_second())?;
        let values = dvdx.iter().zip(&dudy).map(|(a, b)| a - b);
        scalar_from(flow, "relative_vorticity", Unit::per_second(), values)
    }

    /// `du/dx + dv/dy` (s-1).
    pub fn divergence(&self, flow: &Field) -> Result<Field> {
        let (u, v) = split(flow)?;
        let (dudx, _) = self.gradient(&u, &Unit::meters_per_second())?;
        let (_, dvdy) = self.gradient(&v, &Unit::meters_per_second())?;
        let values = dudx.iter().zip(&dvdy).map(|(a, b)| a + b);
        scalar_from(flow, "divergence", Unit::per_second(), values)
    }

    /// `-(u dp/dx + v dp/dy)` in p's unit per second.
    pub fn advection(&self, p: &Field, flow: &Field) -> Result<Field> {
        let unit = p.unit().clone();
        let (dpdx, dpdy) = self.gradient(p, &unit)?;
        let (u, v) = split(flow)?;
        let u = u.component_in(0, &Unit::meters_per_second())?;
        let v = v.component_in(0, &Unit::meters_per_second())?;
        let values = (0..u.len()).map(|i| -(u[i] * dpdx[i] + v[i] * dpdy[i]));
        scalar_from(
            p,
            &format!("advection({})", p.tag().name()),
            unit.divide(&Unit::second()),
            values,
        )
    }
}

fn split(flow: &Field) -> Result<(Field, Field)> {
    Ok((flow.select_component(0)?, flow.select_component(1)?))
}

fn scalar_from<I>(like: &Field, name: &str, unit: Unit, values: I) -> Result<Field>
where
    I: Iterator<Item = f64>,
{
    Field::scalar(
        like.domain_arc().clone(),
        QuantityTag::new(name, unit),
        values.map(|v| v as f32).collect(),
    )
}

impl DerivedGridFactory {
    fn kinematic_grid<F>(&self, u: &Grid, v: &Grid, f: F) -> Result<Grid>
    where
        F: Fn(&Kinematics<'_>, &Field) -> Result<Field> + Sync,
    {
        let flow = self.combine_grids(&[u, v])?;
        let cache = CallCache::new();
        let k = Kinematics {
            cache: &cache,
            min_cos: self.config().min_cos_latitude(),
        };
        self.math.map(&flow, |leaf| f(&k, leaf))
    }

    /// Relative vorticity `dv/dx - du/dy` (s-1).
    pub fn create_relative_vorticity(&self, u: &Grid, v: &Grid) -> Result<Grid> {
        tracing::debug!("relative vorticity");
        self.kinematic_grid(u, v, |k, flow| k.vorticity(flow))
    }

    /// Relative vorticity plus the Coriolis parameter. Points where the
    /// Coriolis parameter is below the configured floor are NaN.
    pub fn create_absolute_vorticity(&self, u: &Grid, v: &Grid) -> Result<Grid> {
        tracing::debug!("absolute vorticity");
        let floor = self.config().coriolis_floor;
        self.kinematic_grid(u, v, |k, flow| absolute_vorticity(k, flow, floor))
    }

    /// Horizontal divergence `du/dx + dv/dy` (s-1).
    pub fn create_horizontal_divergence(&self, u: &Grid, v: &Grid) -> Result<Grid> {
        tracing::debug!("horizontal divergence");
        self.kinematic_grid(u, v, |k, flow| k.divergence(flow))
    }

    /// Horizontal advection of `p`: `-(u dp/dx + v dp/dy)`.
    pub fn create_horizontal_advection(&self, p: &Grid, u: &Grid, v: &Grid) -> Result<Grid> {
        tracing::debug!("horizontal advection");
        let flow = self.combine_grids(&[u, v])?;
        let cache = CallCache::new();
        let k = Kinematics {
            cache: &cache,
            min_cos: self.config().min_cos_latitude(),
        };
        self.math.zip_aligned(p, &flow, |p, flow| k.advection(p, flow))
    }

    /// Horizontal flux divergence of `p`: `p * div(V) - advection(p)`.
    pub fn create_horizontal_flux_divergence(&self, p: &Grid, u: &Grid, v: &Grid) -> Result<Grid> {
        tracing::debug!("horizontal flux divergence");
        let flow = self.combine_grids(&[u, v])?;
        let cache = CallCache::new();
        let k = Kinematics {
            cache: &cache,
            min_cos: self.config().min_cos_latitude(),
        };
        self.math.zip_aligned(p, &flow, |p, flow| {
            let unit = p.unit().clone();
            let values = p.component_in(0, &unit)?;
            let div = k.divergence(flow)?;
            let adv = k.advection(p, flow)?;
            let div = div.values();
            let adv = adv.values();
            scalar_from(
                p,
                &format!("flux_divergence({})", p.tag().name()),
                unit.divide(&Unit::second()),
                (0..values.len()).map(|i| values[i] * f64::from(div[i]) - f64::from(adv[i])),
            )
        })
    }

    /// Horizontal gradient `(dp/dx, dp/dy)` of a scalar grid, per meter.
    pub fn create_horizontal_gradient(&self, p: &Grid) -> Result<Grid> {
        let cache = CallCache::new();
        let k = Kinematics {
            cache: &cache,
            min_cos: self.config().min_cos_latitude(),
        };
        self.math.map(p, |leaf| {
            let unit = leaf.unit().clone();
            let (dx, dy) = k.gradient(leaf, &unit)?;
            let per_m = unit.divide(&Unit::meter());
            let name = leaf.tag().name();
            Field::new(
                leaf.domain_arc().clone(),
                RangeType::new(vec![
                    QuantityTag::new(format!("d{}/dx", name), per_m.clone()),
                    QuantityTag::new(format!("d{}/dy", name), per_m),
                ])?,
                vec![
                    dx.into_iter().map(|v| v as f32).collect(),
                    dy.into_iter().map(|v| v as f32).collect(),
                ],
            )
        })
    }
}

pub(crate) fn absolute_vorticity(k: &Kinematics<'_>, flow: &Field, floor: f64) -> Result<Field> {
    let relative = k.vorticity(flow)?;
    let coriolis = coriolis_field(flow, k.cache, floor)?;
    scalar_from(
        flow,
        "absolute_vorticity",
        Unit::per_second(),
        relative
            .values()
            .iter()
            .zip(coriolis.values())
            .map(|(&r, &f)| f64::from(r) + f64::from(f)),
    )
}
