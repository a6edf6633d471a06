//! Structural combinators.
//!
//! Operators are written once against leaf fields; the functions here take
//! care of the outer nesting. [`zip_fields`] pairs the leaves of two grids
//! (broadcasting, time resampling and member pairing as needed) and
//! [`time_columns`] regroups a sequence into per-member time series for the
//! temporal operators.

use rayon::prelude::*;

use crate::error::{GridMathError, Result};
use crate::grid::{Ensemble, Field, Grid, OuterAxis, Sequence};
use crate::resample::{lerp, resample_field};
use crate::search::find_bracket;
use crate::types::InterpolationMethod;

type ZipFn<'a> = dyn Fn(&Field, &Field) -> Result<Field> + Sync + 'a;

/// How [`zip_fields`] evaluates B where its sequence axis differs from A's.
#[derive(Debug, Clone, Copy)]
pub struct ZipOptions {
    /// Run samples on the rayon pool.
    pub parallel: bool,
    /// Blend the two bracketing B samples instead of taking the nearest.
    pub blend_times: bool,
    /// Spatial method used when blended samples sit on different domains.
    pub method: InterpolationMethod,
}

impl Default for ZipOptions {
    fn default() -> Self {
        Self {
            parallel: false,
            blend_times: false,
            method: InterpolationMethod::Bilinear,
        }
    }
}

/// Evaluate `f` for `0..n`, on the rayon pool when `parallel` is set.
pub(crate) fn map_indices<T, F>(n: usize, parallel: bool, f: F) -> Result<Vec<T>>
where
    T: Send,
    F: Fn(usize) -> Result<T> + Sync + Send,
{
    if parallel && n > 1 {
        (0..n).into_par_iter().map(f).collect()
    } else {
        (0..n).map(f).collect()
    }
}

/// Pair the leaves of `a` and `b` and combine them with `f`.
///
/// - a sequence paired with a non-sequence broadcasts the latter over
///   every step
/// - two sequences on different axes evaluate B on A's axis
/// - ensembles pair members by position and need equal member counts; a
///   non-ensemble operand is broadcast over the members
///
/// The result follows A's axes, except where only B carries one.
pub fn zip_fields<F>(a: &Grid, b: &Grid, options: ZipOptions, f: F) -> Result<Grid>
where
    F: Fn(&Field, &Field) -> Result<Field> + Sync,
{
    zip_dyn(a, b, options, &f)
}

fn zip_dyn(a: &Grid, b: &Grid, options: ZipOptions, f: &ZipFn<'_>) -> Result<Grid> {
    let parallel = options.parallel;
    match (a, b) {
        (Grid::Field(fa), Grid::Field(fb)) => Ok(Grid::Field(f(fa, fb)?)),

        (Grid::Sequence(sa), Grid::Sequence(sb)) => {
            let aligned = resample_sequence(sb, sa.axis(), options)?;
            let samples = map_indices(sa.len(), parallel, |i| {
                zip_dyn(&sa.samples()[i], &aligned[i], options, f)
            })?;
            Ok(Grid::Sequence(Sequence::new(sa.axis().clone(), samples)?))
        }
        (Grid::Sequence(sa), _) => {
            let samples = map_indices(sa.len(), parallel, |i| {
                zip_dyn(&sa.samples()[i], b, options, f)
            })?;
            Ok(Grid::Sequence(Sequence::new(sa.axis().clone(), samples)?))
        }
        (_, Grid::Sequence(sb)) => {
            tracing::debug!(steps = sb.len(), "broadcasting operand A over B's sequence");
            let samples = map_indices(sb.len(), parallel, |i| {
                zip_dyn(a, &sb.samples()[i], options, f)
            })?;
            Ok(Grid::Sequence(Sequence::new(sb.axis().clone(), samples)?))
        }

        (Grid::Ensemble(ea), Grid::Ensemble(eb)) => {
            if ea.len() != eb.len() {
                return Err(GridMathError::incompatible_domain(format!(
                    "ensembles of {} and {} members cannot be paired",
                    ea.len(),
                    eb.len()
                )));
            }
            let samples = map_indices(ea.len(), parallel, |m| {
                zip_dyn(&ea.samples()[m], &eb.samples()[m], options, f)
            })?;
            Ok(Grid::Ensemble(Ensemble::new(ea.members().to_vec(), samples)?))
        }
        (Grid::Ensemble(ea), Grid::Field(_)) => {
            let samples = map_indices(ea.len(), parallel, |m| {
                zip_dyn(&ea.samples()[m], b, options, f)
            })?;
            Ok(Grid::Ensemble(Ensemble::new(ea.members().to_vec(), samples)?))
        }
        (Grid::Field(_), Grid::Ensemble(eb)) => {
            let samples = map_indices(eb.len(), parallel, |m| {
                zip_dyn(a, &eb.samples()[m], options, f)
            })?;
            Ok(Grid::Ensemble(Ensemble::new(eb.members().to_vec(), samples)?))
        }
    }
}

/// Evaluate the samples of `seq` at every coordinate of `target`.
///
/// Coordinates outside the sequence give all-NaN samples.
fn resample_sequence(seq: &Sequence, target: &OuterAxis, options: ZipOptions) -> Result<Vec<Grid>> {
    if seq.axis() == target {
        return Ok(seq.samples().to_vec());
    }
    if !seq.axis().same_kind(target) {
        return Err(GridMathError::incompatible_domain(
            "cannot resample an index sequence onto a time axis",
        ));
    }

    tracing::debug!(
        from = seq.len(),
        to = target.len(),
        blend = options.blend_times,
        "resampling operand B onto operand A's sequence axis"
    );

    let source = seq.axis().coordinates();
    let samples = seq.samples();

    target
        .coordinates()
        .iter()
        .map(|&t| match find_bracket(&source, t) {
            None => nan_like(&samples[0]),
            Some(b) if b.is_exact() => Ok(samples[b.lower].clone()),
            Some(b) if options.blend_times => blend(
                &samples[b.lower],
                &samples[b.upper],
                b.fraction,
                options.method,
            ),
            Some(b) => Ok(if b.fraction <= 0.5 {
                samples[b.lower].clone()
            } else {
                samples[b.upper].clone()
            }),
        })
        .collect()
}

/// Same structure with every sample NaN.
pub(crate) fn nan_like(grid: &Grid) -> Result<Grid> {
    grid.map_fields(false, |f| Ok(f.filled(f32::NAN)))
}

fn blend(a: &Grid, b: &Grid, weight: f64, method: InterpolationMethod) -> Result<Grid> {
    zip_fields(a, b, ZipOptions::default(), |fa, fb| {
        blend_fields(fa, fb, weight, method)
    })
}

/// `a + weight * (b - a)` on A's domain.
pub(crate) fn blend_fields(
    a: &Field,
    b: &Field,
    weight: f64,
    method: InterpolationMethod,
) -> Result<Field> {
    let b = if a.domain() == b.domain() {
        b.clone()
    } else {
        resample_field(b, a.domain_arc(), method)?
    };
    let samples = a
        .samples()
        .iter()
        .zip(b.samples())
        .map(|(sa, sb)| sa.iter().zip(sb.iter()).map(|(&x, &y)| lerp(x, y, weight)).collect())
        .collect();
    a.with_samples(samples)
}

/// A sequence regrouped into one time series per ensemble member.
#[derive(Debug, Clone)]
pub struct TimeColumns {
    pub axis: OuterAxis,
    /// Member ids, `None` for a sequence of plain fields.
    pub members: Option<Vec<i32>>,
    /// `columns[member][step]`.
    pub columns: Vec<Vec<Field>>,
}

impl TimeColumns {
    pub fn steps(&self) -> usize {
        self.axis.len()
    }

    /// Put columns (all of the original length) back into the original
    /// nesting, on `axis`.
    pub fn rebuild(&self, axis: OuterAxis, columns: Vec<Vec<Field>>) -> Result<Grid> {
        let steps = axis.len();
        if columns.iter().any(|c| c.len() != steps) {
            return Err(GridMathError::malformed("time column length does not match axis"));
        }
        let samples = match &self.members {
            None => {
                let column = columns
                    .into_iter()
                    .next()
                    .ok_or_else(|| GridMathError::malformed("no time column"))?;
                column.into_iter().map(Grid::Field).collect()
            }
            Some(members) => {
                let mut per_step: Vec<Vec<Grid>> = (0..steps).map(|_| Vec::new()).collect();
                for column in columns {
                    for (t, field) in column.into_iter().enumerate() {
                        per_step[t].push(Grid::Field(field));
                    }
                }
                per_step
                    .into_iter()
                    .map(|fields| Grid::ensemble(members.clone(), fields))
                    .collect::<Result<Vec<_>>>()?
            }
        };
        Ok(Grid::Sequence(Sequence::new(axis, samples)?))
    }

    /// One field per member, without a sequence axis.
    pub fn collapse(&self, fields: Vec<Field>) -> Result<Grid> {
        match &self.members {
            None => fields
                .into_iter()
                .next()
                .map(Grid::Field)
                .ok_or_else(|| GridMathError::malformed("no time column")),
            Some(members) => {
                Grid::ensemble(members.clone(), fields.into_iter().map(Grid::Field).collect())
            }
        }
    }
}

/// Regroup a sequence (of fields or of ensembles) into time columns.
pub fn time_columns(grid: &Grid) -> Result<TimeColumns> {
    let seq = grid.as_sequence().ok_or_else(|| {
        GridMathError::invalid_argument("operator needs a grid with a sequence axis")
    })?;

    match &seq.samples()[0] {
        Grid::Field(_) => {
            let column = seq
                .samples()
                .iter()
                .map(|g| {
                    g.as_field()
                        .cloned()
                        .ok_or_else(|| GridMathError::malformed("sequence mixes sample kinds"))
                })
                .collect::<Result<Vec<_>>>()?;
            Ok(TimeColumns {
                axis: seq.axis().clone(),
                members: None,
                columns: vec![column],
            })
        }
        Grid::Ensemble(first) => {
            let members = first.members().to_vec();
            let mut columns: Vec<Vec<Field>> = members.iter().map(|_| Vec::new()).collect();
            for sample in seq.samples() {
                let ens = sample
                    .as_ensemble()
                    .ok_or_else(|| GridMathError::malformed("sequence mixes sample kinds"))?;
                if ens.members() != members.as_slice() {
                    return Err(GridMathError::malformed(
                        "ensemble members change along the sequence",
                    ));
                }
                for (m, member) in ens.samples().iter().enumerate() {
                    let field = member
                        .as_field()
                        .ok_or_else(|| GridMathError::malformed("ensemble member is not a field"))?;
                    columns[m].push(field.clone());
                }
            }
            Ok(TimeColumns {
                axis: seq.axis().clone(),
                members: Some(members),
                columns,
            })
        }
        Grid::Sequence(_) => Err(GridMathError::malformed("sequence of sequences")),
    }
}

/// Resample every field of a column onto the first field's domain.
pub(crate) fn align_column(fields: &[Field], method: InterpolationMethod) -> Result<Vec<Field>> {
    let Some(first) = fields.first() else {
        return Ok(Vec::new());
    };
    let target = first.domain_arc();
    fields
        .iter()
        .map(|f| {
            if std::sync::Arc::ptr_eq(f.domain_arc(), target) || f.domain() == first.domain() {
                Ok(f.clone())
            } else {
                tracing::debug!("aligning a sample on a different spatial domain");
                resample_field(f, target, method)
            }
        })
        .collect()
}
