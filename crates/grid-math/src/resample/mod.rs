//! Re-evaluating fields on other spatial domains.
//!
//! Every target point is located in the source's fractional index space,
//! horizontally and (for volumes) vertically, and the source samples are
//! interpolated there. Points the source does not cover become NaN.

pub mod interpolation;

use std::sync::Arc;

use projection::ProjectionError;

use crate::error::{GridMathError, Result};
use crate::grid::{Field, Grid, HorizontalCoordinates, SpatialDomain};
use crate::types::InterpolationMethod;

pub use interpolation::{
    bilinear_interpolate, cubic_interpolate, interpolate, lerp, nearest_interpolate,
};

/// Where each target horizontal point falls in the source's index space.
enum HorizontalMap {
    /// Same horizontal axes.
    Identity,
    Points(Vec<Option<(f64, f64)>>),
}

/// Where each target level falls in the source's level index space.
enum VerticalMap {
    /// Source has a single plane used for every target level.
    Broadcast,
    Levels(Vec<Option<f64>>),
}

/// Resample one field onto `target`.
pub fn resample_field(
    field: &Field,
    target: &Arc<SpatialDomain>,
    method: InterpolationMethod,
) -> Result<Field> {
    let source = field.domain();
    if Arc::ptr_eq(field.domain_arc(), target) {
        return Ok(field.clone());
    }
    if source == target.as_ref() {
        return field.with_domain(target.clone());
    }

    let horizontal = horizontal_map(source, target)?;
    let vertical = vertical_map(source, target)?;

    tracing::trace!(
        source_points = source.len(),
        target_points = target.len(),
        method = %method,
        "resampling field"
    );

    let samples = field
        .samples()
        .iter()
        .map(|data| evaluate(data, source, target, &horizontal, &vertical, method))
        .collect();

    Field::new(target.clone(), field.range().clone(), samples)
}

/// Resample every leaf of a grid onto `target`.
pub fn resample_grid(
    grid: &Grid,
    target: &Arc<SpatialDomain>,
    method: InterpolationMethod,
    parallel: bool,
) -> Result<Grid> {
    grid.map_fields(parallel, |field| resample_field(field, target, method))
}

fn horizontal_map(source: &SpatialDomain, target: &SpatialDomain) -> Result<HorizontalMap> {
    if source.same_horizontal(target) {
        return Ok(HorizontalMap::Identity);
    }

    let (nx, ny) = (target.nx(), target.ny());
    let mut points = Vec::with_capacity(nx * ny);

    match (source.coordinates(), target.coordinates()) {
        (
            HorizontalCoordinates::Projected {
                projection: ps,
                unit: us,
            },
            HorizontalCoordinates::Projected {
                projection: pt,
                unit: ut,
            },
        ) if Arc::ptr_eq(ps, pt) => {
            let conversion = ut.conversion(us)?;
            for j in 0..ny {
                let y = conversion.apply(target.y().values()[j]);
                let fy = source.y().fractional_index(y);
                for i in 0..nx {
                    let x = conversion.apply(target.x().values()[i]);
                    points.push(fy.and_then(|fy| source.x().fractional_index(x).map(|fx| (fx, fy))));
                }
            }
        }
        _ => {
            for j in 0..ny {
                for i in 0..nx {
                    let point = match target.latlon(i, j) {
                        Ok((lat, lon)) => locate(source, lat, lon)?,
                        Err(GridMathError::Projection(ProjectionError::OutOfDomain { .. })) => None,
                        Err(e) => return Err(e),
                    };
                    points.push(point);
                }
            }
        }
    }

    Ok(HorizontalMap::Points(points))
}

fn locate(source: &SpatialDomain, lat: f64, lon: f64) -> Result<Option<(f64, f64)>> {
    let (x, y) = match source.to_domain_coordinates(lat, lon) {
        Ok(xy) => xy,
        Err(GridMathError::Projection(ProjectionError::OutOfDomain { .. })) => return Ok(None),
        Err(e) => return Err(e),
    };
    Ok(source
        .x()
        .fractional_index(x)
        .zip(source.y().fractional_index(y)))
}

fn vertical_map(source: &SpatialDomain, target: &SpatialDomain) -> Result<VerticalMap> {
    let sz = match source.z() {
        Some(z) if z.len() > 1 => z,
        _ => return Ok(VerticalMap::Broadcast),
    };
    let tz = target.z().ok_or_else(|| {
        GridMathError::incompatible_domain("cannot evaluate a volume on a 2D domain")
    })?;

    if sz == tz {
        return Ok(VerticalMap::Levels(
            (0..tz.len()).map(|k| Some(k as f64)).collect(),
        ));
    }

    let conversion = tz.unit().conversion(sz.unit()).map_err(|_| {
        GridMathError::incompatible_domain(format!(
            "vertical units {} and {} are not convertible",
            tz.unit(),
            sz.unit()
        ))
    })?;

    Ok(VerticalMap::Levels(
        tz.values()
            .iter()
            .map(|&v| sz.axis().fractional_index(conversion.apply(v)))
            .collect(),
    ))
}

fn evaluate(
    data: &[f32],
    source: &SpatialDomain,
    target: &SpatialDomain,
    horizontal: &HorizontalMap,
    vertical: &VerticalMap,
    method: InterpolationMethod,
) -> Vec<f32> {
    let (snx, sny) = (source.nx(), source.ny());
    let plane_len = snx * sny;
    let plane = |k: usize| &data[k * plane_len..(k + 1) * plane_len];

    let sample_plane = |k: usize, h: usize| -> f32 {
        match horizontal {
            HorizontalMap::Identity => plane(k)[h],
            HorizontalMap::Points(points) => match points[h] {
                Some((fx, fy)) => interpolate(plane(k), snx, sny, fx, fy, method),
                None => f32::NAN,
            },
        }
    };

    let target_planes = target.nz();
    let horizontal_len = target.horizontal_len();
    let mut out = Vec::with_capacity(target.len());

    for tk in 0..target_planes {
        match vertical {
            VerticalMap::Broadcast => {
                for h in 0..horizontal_len {
                    out.push(sample_plane(0, h));
                }
            }
            VerticalMap::Levels(levels) => match levels[tk] {
                None => out.extend(std::iter::repeat(f32::NAN).take(horizontal_len)),
                Some(fk) => {
                    let (k0, w) = match method {
                        InterpolationMethod::Nearest => (fk.round() as usize, 0.0),
                        _ => (fk.floor() as usize, fk - fk.floor()),
                    };
                    let k1 = (k0 + 1).min(source.nz() - 1);
                    for h in 0..horizontal_len {
                        let lower = sample_plane(k0, h);
                        let value = if w == 0.0 {
                            lower
                        } else {
                            lerp(lower, sample_plane(k1, h), w)
                        };
                        out.push(value);
                    }
                }
            },
        }
    }

    out
}
