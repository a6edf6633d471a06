//! The grid algebra engine.
//!
//! [`GridMath`] applies elementwise and differential operators to grids of
//! any legal nesting. Binary operators pair leaves with
//! [`zip_fields`](crate::structure::zip_fields); every leaf pair is then
//! reconciled (slice demotion, transposition, spatial resampling of B onto
//! A) before the samples are combined.

mod derivative;
mod members;
mod temporal;

use std::sync::Arc;

use grid_common::{QuantityTag, Unit};
use serde::{Deserialize, Serialize};

use crate::classify::classify;
use crate::config::GridMathConfig;
use crate::error::{GridMathError, Result};
use crate::grid::{Field, Grid, RangeType, SpatialDomain};
use crate::resample::resample_field;
use crate::shape::reconcile;
use crate::structure::{align_column, zip_fields, ZipOptions};
use crate::types::InterpolationMethod;

pub(crate) use derivative::partial_field;

/// Elementwise binary operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BinaryOp {
    Add,
    Subtract,
    Multiply,
    Divide,
    Atan2,
}

impl BinaryOp {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Add => "add",
            Self::Subtract => "subtract",
            Self::Multiply => "multiply",
            Self::Divide => "divide",
            Self::Atan2 => "atan2",
        }
    }
}

impl std::fmt::Display for BinaryOp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Elementwise and differential operators over grids.
#[derive(Debug, Clone, Default)]
pub struct GridMath {
    config: GridMathConfig,
}

impl GridMath {
    pub fn new(config: GridMathConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &GridMathConfig {
        &self.config
    }

    pub(crate) fn zip_options(&self, weighted: bool) -> ZipOptions {
        ZipOptions {
            parallel: self.config.parallel,
            blend_times: weighted,
            method: self.config.interpolation,
        }
    }

    /// Apply a binary operator. When the operands' spatial domains differ B
    /// is resampled onto A's, by nearest neighbour or, with
    /// `use_weighted_average`, by the configured interpolation.
    pub fn binary(&self, a: &Grid, b: &Grid, op: BinaryOp, use_weighted_average: bool) -> Result<Grid> {
        classify(a)?;
        classify(b)?;
        let method = self.config.resample_method(use_weighted_average);
        tracing::debug!(op = %op, method = %method, "binary grid operation");
        zip_fields(a, b, self.zip_options(use_weighted_average), |fa, fb| {
            combine_fields(fa, fb, op, method)
        })
    }

    pub fn add(&self, a: &Grid, b: &Grid, use_weighted_average: bool) -> Result<Grid> {
        self.binary(a, b, BinaryOp::Add, use_weighted_average)
    }

    pub fn subtract(&self, a: &Grid, b: &Grid, use_weighted_average: bool) -> Result<Grid> {
        self.binary(a, b, BinaryOp::Subtract, use_weighted_average)
    }

    pub fn multiply(&self, a: &Grid, b: &Grid, use_weighted_average: bool) -> Result<Grid> {
        self.binary(a, b, BinaryOp::Multiply, use_weighted_average)
    }

    pub fn divide(&self, a: &Grid, b: &Grid, use_weighted_average: bool) -> Result<Grid> {
        self.binary(a, b, BinaryOp::Divide, use_weighted_average)
    }

    /// `atan2(a, b)` in radians.
    pub fn atan2(&self, a: &Grid, b: &Grid, use_weighted_average: bool) -> Result<Grid> {
        self.binary(a, b, BinaryOp::Atan2, use_weighted_average)
    }

    /// Pair the leaves of two grids, bring each pair onto a common domain
    /// with the configured interpolation, and combine them with `f`.
    pub(crate) fn zip_aligned<F>(&self, a: &Grid, b: &Grid, f: F) -> Result<Grid>
    where
        F: Fn(&Field, &Field) -> Result<Field> + Sync,
    {
        classify(a)?;
        classify(b)?;
        let method = self.config.interpolation;
        zip_fields(a, b, self.zip_options(true), |fa, fb| {
            let (fa, fb) = align_pair(fa, fb, method)?;
            f(&fa, &fb)
        })
    }

    /// Apply a leaf operator to every leaf after classifying the grid.
    pub fn map<F>(&self, grid: &Grid, f: F) -> Result<Grid>
    where
        F: Fn(&Field) -> Result<Field> + Sync,
    {
        classify(grid)?;
        grid.map_fields(self.config.parallel, f)
    }

    /// Add a constant expressed in the grid's own units.
    pub fn add_constant(&self, grid: &Grid, value: f64) -> Result<Grid> {
        self.map(grid, |f| {
            Ok(f.map_values(|v| (f64::from(v) + value) as f32))
        })
    }

    /// Multiply by a dimensionless factor.
    pub fn multiply_constant(&self, grid: &Grid, factor: f64) -> Result<Grid> {
        self.map(grid, |f| {
            Ok(f.map_values(|v| (f64::from(v) * factor) as f32))
        })
    }

    pub fn negate(&self, grid: &Grid) -> Result<Grid> {
        self.map(grid, |f| Ok(f.map_values(|v| -v)))
    }

    pub fn abs(&self, grid: &Grid) -> Result<Grid> {
        self.map(grid, |f| Ok(f.map_values(f32::abs)))
    }

    /// Square root; the unit must have a square root (m2 -> m).
    pub fn sqrt(&self, grid: &Grid) -> Result<Grid> {
        self.map(grid, |f| {
            let tags = f
                .range()
                .components()
                .iter()
                .map(|t| Ok(QuantityTag::new(format!("sqrt({})", t.name()), t.unit().sqrt()?)))
                .collect::<Result<Vec<_>>>()?;
            f.map_values(f32::sqrt).with_range(RangeType::new(tags)?)
        })
    }

    /// Convert every component into `unit`.
    pub fn convert_units(&self, grid: &Grid, unit: &Unit) -> Result<Grid> {
        self.map(grid, |f| f.convert_units(unit))
    }
}

/// Bring two leaves onto one spatial domain.
///
/// The pair is reconciled first (slice demotion, transposition); B is then
/// resampled onto A's domain, except that a 2D A paired with a volume B is
/// itself broadcast over B's levels.
pub(crate) fn align_pair(a: &Field, b: &Field, method: InterpolationMethod) -> Result<(Field, Field)> {
    let (a, b) = reconcile(a, b)?;

    let target: Arc<SpatialDomain> = match (a.domain().z(), b.domain().z()) {
        (None, Some(z)) if z.len() > 1 => {
            tracing::debug!(levels = z.len(), "broadcasting 2D operand A over B's levels");
            Arc::new(a.domain().clone().with_levels(z.clone()))
        }
        _ => a.domain_arc().clone(),
    };
    let a = if Arc::ptr_eq(a.domain_arc(), &target) {
        a
    } else {
        resample_field(&a, &target, method)?
    };
    let b = if Arc::ptr_eq(b.domain_arc(), &target) {
        b
    } else if b.domain() == target.as_ref() {
        b.with_domain(target.clone())?
    } else {
        tracing::debug!(method = %method, "resampling operand B onto operand A's domain");
        resample_field(&b, &target, method)?
    };
    Ok((a, b))
}

/// Combine two leaves elementwise after aligning their domains.
pub(crate) fn combine_fields(
    a: &Field,
    b: &Field,
    op: BinaryOp,
    method: InterpolationMethod,
) -> Result<Field> {
    let (a, b) = align_pair(a, b, method)?;
    let target = a.domain_arc().clone();

    let (na, nb) = (a.component_count(), b.component_count());
    let n = if na == nb || nb == 1 {
        na
    } else if na == 1 {
        nb
    } else {
        return Err(GridMathError::incompatible_domain(format!(
            "cannot combine {}-component and {}-component ranges",
            na, nb
        )));
    };

    let mut tags = Vec::with_capacity(n);
    let mut samples = Vec::with_capacity(n);
    for c in 0..n {
        let ca = if na == 1 { 0 } else { c };
        let cb = if nb == 1 { 0 } else { c };
        let ta = &a.range().components()[ca];
        let tb = &b.range().components()[cb];
        let (tag, values) = apply_op(op, ta, a.component(ca), tb, b.component(cb))?;
        tags.push(tag);
        samples.push(values);
    }

    let kind = if na == n {
        a.range().vector_kind()
    } else {
        b.range().vector_kind()
    };
    let range = match kind {
        Some(kind) if tags.iter().all(|t| t.unit().is_velocity()) => {
            RangeType::vector(tags, kind)?
        }
        _ => RangeType::new(tags)?,
    };

    Field::new(target, range, samples)
}

fn apply_op(
    op: BinaryOp,
    ta: &QuantityTag,
    sa: &[f32],
    tb: &QuantityTag,
    sb: &[f32],
) -> Result<(QuantityTag, Vec<f32>)> {
    let pairs = sa.iter().zip(sb).map(|(&x, &y)| (f64::from(x), f64::from(y)));
    match op {
        BinaryOp::Add | BinaryOp::Subtract => {
            let conversion = tb.unit().conversion(ta.unit())?;
            let sign = if op == BinaryOp::Add { 1.0 } else { -1.0 };
            let values = pairs
                .map(|(x, y)| (x + sign * conversion.apply(y)) as f32)
                .collect();
            Ok((ta.clone(), values))
        }
        BinaryOp::Multiply | BinaryOp::Divide => {
            // offset units (degC) enter products in absolute form
            let (ua, conv_a) = absolute(ta.unit())?;
            let (ub, conv_b) = absolute(tb.unit())?;
            let (unit, name) = if op == BinaryOp::Multiply {
                (ua.multiply(&ub), format!("{}*{}", ta.name(), tb.name()))
            } else {
                (ua.divide(&ub), format!("{}/{}", ta.name(), tb.name()))
            };
            let values = pairs
                .map(|(x, y)| {
                    let (x, y) = (conv_a.apply(x), conv_b.apply(y));
                    (if op == BinaryOp::Multiply { x * y } else { x / y }) as f32
                })
                .collect();
            Ok((QuantityTag::new(name, unit), values))
        }
        BinaryOp::Atan2 => {
            let conversion = tb.unit().conversion(ta.unit())?;
            let values = pairs
                .map(|(x, y)| x.atan2(conversion.apply(y)) as f32)
                .collect();
            Ok((
                QuantityTag::new(format!("atan2({},{})", ta.name(), tb.name()), Unit::radian()),
                values,
            ))
        }
    }
}

fn absolute(unit: &Unit) -> Result<(Unit, grid_common::Conversion)> {
    if unit.has_offset() {
        let base = unit.si_base();
        let conversion = unit.conversion(&base)?;
        Ok((base, conversion))
    } else {
        Ok((unit.clone(), grid_common::Conversion::IDENTITY))
    }
}

/// Reduce a set of leaves pointwise with `f`, on the first leaf's domain.
pub(crate) fn reduce_fields<F>(fields: &[Field], method: InterpolationMethod, f: F) -> Result<Field>
where
    F: Fn(&[f32]) -> Result<f32>,
{
    let aligned = align_column(fields, method)?;
    let first = aligned
        .first()
        .ok_or_else(|| GridMathError::invalid_argument("nothing to reduce"))?;
    let points = first.domain().len();
    let mut buffer = vec![0.0f32; aligned.len()];

    let mut samples = Vec::with_capacity(first.component_count());
    for c in 0..first.component_count() {
        let mut out = Vec::with_capacity(points);
        for p in 0..points {
            for (slot, field) in buffer.iter_mut().zip(&aligned) {
                *slot = field.component(c)[p];
            }
            out.push(f(&buffer)?);
        }
        samples.push(out);
    }
    first.with_samples(samples)
}
