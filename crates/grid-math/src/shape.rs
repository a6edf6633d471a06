//! Shape and domain utilities: slice demotion, relabeling, transposition
//! and level extraction.

use std::sync::Arc;

use grid_common::Unit;

use crate::classify::classify;
use crate::error::{GridMathError, Result};
use crate::grid::{Field, Grid, RangeType, SpatialDomain, VerticalAxis};
use crate::resample::lerp;
use crate::types::InterpolationMethod;

/// Demote a single-level 3D field to the equivalent 2D field.
///
/// 2D fields are returned as they are. Volumes are rejected.
pub fn make_2d_from_slice(field: &Field, copy: bool) -> Result<Field> {
    let domain = field.domain();
    if !domain.is_3d() {
        return Ok(if copy { field.deep_copy() } else { field.clone() });
    }
    if domain.is_volume() {
        return Err(GridMathError::incompatible_domain(format!(
            "cannot demote a volume of {} levels to 2D",
            domain.nz()
        )));
    }
    let flat = Arc::new(domain.clone().without_levels());
    let demoted = field.with_domain(flat)?;
    Ok(if copy { demoted.deep_copy() } else { demoted })
}

/// [`make_2d_from_slice`] for every leaf.
pub fn make_2d_grid_from_slice(grid: &Grid, copy: bool) -> Result<Grid> {
    classify(grid)?;
    let mut cache: Vec<(Arc<SpatialDomain>, Arc<SpatialDomain>)> = Vec::new();
    map_fields_serial(grid, &mut |field| {
        if !field.domain().is_slice() {
            return make_2d_from_slice(field, copy);
        }
        // keep a shared domain shared after demotion
        let flat = match cache.iter().find(|(from, _)| Arc::ptr_eq(from, field.domain_arc())) {
            Some((_, to)) => to.clone(),
            None => {
                let to = Arc::new(field.domain().clone().without_levels());
                cache.push((field.domain_arc().clone(), to.clone()));
                to
            }
        };
        let demoted = field.with_domain(flat)?;
        Ok(if copy { demoted.deep_copy() } else { demoted })
    })
}

fn map_fields_serial(grid: &Grid, f: &mut dyn FnMut(&Field) -> Result<Field>) -> Result<Grid> {
    Ok(match grid {
        Grid::Field(field) => Grid::Field(f(field)?),
        Grid::Sequence(s) => {
            let samples = s
                .samples()
                .iter()
                .map(|g| map_fields_serial(g, f))
                .collect::<Result<Vec<_>>>()?;
            Grid::Sequence(crate::grid::Sequence::new(s.axis().clone(), samples)?)
        }
        Grid::Ensemble(e) => {
            let samples = e
                .samples()
                .iter()
                .map(|g| map_fields_serial(g, f))
                .collect::<Result<Vec<_>>>()?;
            Grid::Ensemble(crate::grid::Ensemble::new(e.members().to_vec(), samples)?)
        }
    })
}

/// Relabel the range of every leaf without touching the samples.
///
/// The new range must have as many components as the old one.
pub fn set_param_type(grid: &Grid, range: &RangeType, copy: bool) -> Result<Grid> {
    classify(grid)?;
    let current = grid.range().len();
    if range.len() != current {
        return Err(GridMathError::invalid_argument(format!(
            "cannot relabel a {}-component range as {}",
            current, range
        )));
    }
    grid.map_fields(false, |field| {
        let relabeled = field.with_range(range.clone())?;
        Ok(if copy { relabeled.deep_copy() } else { relabeled })
    })
}

/// Swap the horizontal axes of a geographic field, reordering samples.
pub fn transpose_field(field: &Field) -> Result<Field> {
    let domain = field.domain();
    let transposed = Arc::new(domain.transposed()?);
    let (nx, ny, nz) = (domain.nx(), domain.ny(), domain.nz());

    let samples = field
        .samples()
        .iter()
        .map(|data| {
            let mut out = Vec::with_capacity(data.len());
            for k in 0..nz {
                // new x is old y
                for i in 0..nx {
                    for j in 0..ny {
                        out.push(data[domain.index(i, j, k)]);
                    }
                }
            }
            out
        })
        .collect();

    Field::new(transposed, field.range().clone(), samples)
}

/// [`transpose_field`] for every leaf.
pub fn transpose_grid(grid: &Grid, parallel: bool) -> Result<Grid> {
    classify(grid)?;
    grid.map_fields(parallel, transpose_field)
}

/// Extract the level `level` (in `unit`) from a volume as a single-level
/// slice, interpolating between bracketing levels.
pub fn slice_at_level(
    field: &Field,
    level: f64,
    unit: &Unit,
    method: InterpolationMethod,
) -> Result<Field> {
    let domain = field.domain();
    let z = domain
        .z()
        .ok_or_else(|| GridMathError::missing_coordinate("field has no vertical axis"))?;
    let value = unit.convert(level, z.unit()).map_err(|_| {
        GridMathError::incompatible_domain(format!(
            "level unit {} does not match vertical unit {}",
            unit,
            z.unit()
        ))
    })?;

    let slice_domain = Arc::new(
        domain
            .clone()
            .without_levels()
            .with_levels(VerticalAxis::single(value, z.unit().clone())?),
    );
    let plane = domain.horizontal_len();

    let samples = match z.axis().fractional_index(value) {
        None => vec![vec![f32::NAN; plane]; field.component_count()],
        Some(fk) => {
            let (k0, w) = match method {
                InterpolationMethod::Nearest => (fk.round() as usize, 0.0),
                _ => (fk.floor() as usize, fk - fk.floor()),
            };
            let k1 = (k0 + 1).min(domain.nz() - 1);
            field
                .samples()
                .iter()
                .map(|data| {
                    (0..plane)
                        .map(|h| lerp(data[k0 * plane + h], data[k1 * plane + h], w))
                        .collect()
                })
                .collect()
        }
    };

    Field::new(slice_domain, field.range().clone(), samples)
}

/// [`slice_at_level`] for every leaf.
pub fn slice_grid_at_level(
    grid: &Grid,
    level: f64,
    unit: &Unit,
    method: InterpolationMethod,
    parallel: bool,
) -> Result<Grid> {
    classify(grid)?;
    grid.map_fields(parallel, |f| slice_at_level(f, level, unit, method))
}

/// Keep only level `k` of a 3D field, as a slice.
pub fn select_level(field: &Field, k: usize) -> Result<Field> {
    let domain = field.domain();
    let z = domain
        .z()
        .ok_or_else(|| GridMathError::missing_coordinate("field has no vertical axis"))?;
    if k >= z.len() {
        return Err(GridMathError::invalid_argument(format!(
            "level index {} of {} levels",
            k,
            z.len()
        )));
    }
    let slice_domain = Arc::new(
        domain
            .clone()
            .without_levels()
            .with_levels(VerticalAxis::single(z.values()[k], z.unit().clone())?),
    );
    let plane = domain.horizontal_len();
    let samples = field
        .samples()
        .iter()
        .map(|data| data[k * plane..(k + 1) * plane].to_vec())
        .collect();
    Field::new(slice_domain, field.range().clone(), samples)
}

/// Bring two binary-operation operands to a combinable pair of shapes.
///
/// A slice paired with anything but a slice on the same level is demoted
/// to 2D; a geographic operand whose axis order differs from the other is
/// transposed.
pub(crate) fn reconcile(a: &Field, b: &Field) -> Result<(Field, Field)> {
    let (da, db) = (a.domain(), b.domain());
    let mut a = a.clone();
    let mut b = b.clone();

    let same_slice = da.is_slice() && db.is_slice() && da.z() == db.z();
    if !same_slice {
        if da.is_slice() {
            tracing::debug!("demoting slice operand A to 2D");
            a = make_2d_from_slice(&a, false)?;
        }
        if db.is_slice() {
            tracing::debug!("demoting slice operand B to 2D");
            b = make_2d_from_slice(&b, false)?;
        }
    }

    let order_a = a.domain().coordinates().order();
    let order_b = b.domain().coordinates().order();
    if let (Some(oa), Some(ob)) = (order_a, order_b) {
        if oa != ob {
            tracing::debug!(from = ?ob, to = ?oa, "transposing operand B");
            b = transpose_field(&b)?;
        }
    }

    Ok((a, b))
}
