//! Operators along the sequence axis.

use super::{combine_fields, reduce_fields, BinaryOp, GridMath};
use crate::classify::classify;
use crate::error::{GridMathError, Result};
use crate::grid::{Field, Grid};
use crate::stats;
use crate::structure::{align_column, map_indices, time_columns};
use crate::types::{EndpointPolicy, TimeFunction};

impl GridMath {
    /// Reduce every grid point across the sequence axis.
    ///
    /// With `make_times` the reduced field is put back into a one-step
    /// sequence at the first coordinate, so callers expecting a sequence keep
    /// getting one.
    pub fn apply_function_over_time(
        &self,
        grid: &Grid,
        function: TimeFunction,
        make_times: bool,
    ) -> Result<Grid> {
        classify(grid)?;
        let columns = time_columns(grid)?;
        tracing::debug!(
            function = %function,
            steps = columns.steps(),
            members = columns.columns.len(),
            "reducing over time"
        );

        let method = self.config().interpolation;
        let reduced = map_indices(columns.columns.len(), self.config().parallel, |m| {
            reduce_fields(&columns.columns[m], method, |values| {
                Ok(stats::reduce(values, function))
            })
        })?;

        if make_times {
            let axis = columns.axis.subset(&[0]);
            columns.rebuild(axis, reduced.into_iter().map(|f| vec![f]).collect())
        } else {
            columns.collapse(reduced)
        }
    }

    /// Weighted sliding window along the sequence axis, centered on each
    /// step (`weights.len() / 2` steps before it).
    ///
    /// Missing window values are dropped and the remaining weights
    /// renormalized, unless `propagate_missing` is configured.
    pub fn time_weighted_running_average(
        &self,
        grid: &Grid,
        weights: &[f64],
        policy: EndpointPolicy,
    ) -> Result<Grid> {
        if weights.is_empty() || weights.iter().any(|w| !w.is_finite()) {
            return Err(GridMathError::invalid_argument(
                "running average weights must be finite and non-empty",
            ));
        }
        if weights.iter().sum::<f64>() == 0.0 {
            return Err(GridMathError::invalid_argument(
                "running average weights sum to zero",
            ));
        }
        classify(grid)?;
        let columns = time_columns(grid)?;
        let steps = columns.steps();
        let half = (weights.len() / 2) as isize;
        let propagate = self.config().propagate_missing;
        let method = self.config().interpolation;

        tracing::debug!(
            window = weights.len(),
            policy = ?policy,
            steps,
            "time running average"
        );

        let smoothed = map_indices(columns.columns.len(), self.config().parallel, |m| {
            let column = align_column(&columns.columns[m], method)?;
            (0..steps)
                .map(|t| {
                    let window: Option<Vec<(usize, f64)>> = weights
                        .iter()
                        .enumerate()
                        .map(|(j, &w)| {
                            policy
                                .resolve(t as isize + j as isize - half, steps)
                                .map(|idx| (idx, w))
                        })
                        .collect();
                    match window {
                        Some(window) => weighted_window(&column, t, &window, propagate),
                        None => Ok(column[t].filled(f32::NAN)),
                    }
                })
                .collect::<Result<Vec<_>>>()
        })?;

        columns.rebuild(columns.axis.clone(), smoothed)
    }

    /// Uniform running average over `window` steps.
    pub fn time_running_average(
        &self,
        grid: &Grid,
        window: usize,
        policy: EndpointPolicy,
    ) -> Result<Grid> {
        if window == 0 {
            return Err(GridMathError::invalid_argument("running average window is empty"));
        }
        self.time_weighted_running_average(grid, &vec![1.0; window], policy)
    }

    /// `D(t) - D(t + offset)`; with `offset == 0` every step is differenced
    /// against the first one. Steps whose partner falls outside the sequence
    /// are NaN.
    pub fn time_step_difference(&self, grid: &Grid, offset: isize) -> Result<Grid> {
        self.time_step_op(grid, offset, BinaryOp::Subtract)
    }

    /// `D(t) + D(t + offset)`, with the same offset rules as
    /// [`time_step_difference`](Self::time_step_difference).
    pub fn time_step_sum(&self, grid: &Grid, offset: isize) -> Result<Grid> {
        self.time_step_op(grid, offset, BinaryOp::Add)
    }

    fn time_step_op(&self, grid: &Grid, offset: isize, op: BinaryOp) -> Result<Grid> {
        classify(grid)?;
        let columns = time_columns(grid)?;
        let steps = columns.steps();
        let method = self.config().interpolation;
        tracing::debug!(offset, op = %op, steps, "time step operation");

        let out = map_indices(columns.columns.len(), self.config().parallel, |m| {
            let column = &columns.columns[m];
            (0..steps)
                .map(|t| {
                    let partner = if offset == 0 {
                        Some(0)
                    } else {
                        EndpointPolicy::Missing.resolve(t as isize + offset, steps)
                    };
                    match partner {
                        Some(p) => combine_fields(&column[t], &column[p], op, method),
                        None => {
                            combine_fields(&column[t], &column[t].filled(f32::NAN), op, method)
                        }
                    }
                })
                .collect::<Result<Vec<_>>>()
        })?;

        columns.rebuild(columns.axis.clone(), out)
    }
}

fn weighted_window(
    column: &[Field],
    t: usize,
    window: &[(usize, f64)],
    propagate: bool,
) -> Result<Field> {
    let target = &column[t];
    let points = target.domain().len();
    let mut samples = Vec::with_capacity(target.component_count());
    for c in 0..target.component_count() {
        let mut out = Vec::with_capacity(points);
        for p in 0..points {
            let mut sum = 0.0;
            let mut weight = 0.0;
            let mut missing = false;
            for &(idx, w) in window {
                let v = column[idx].component(c)[p];
                if v.is_nan() {
                    missing = true;
                } else {
                    sum += w * f64::from(v);
                    weight += w;
                }
            }
            out.push(if (missing && propagate) || weight == 0.0 {
                f32::NAN
            } else {
                (sum / weight) as f32
            });
        }
        samples.push(out);
    }
    target.with_samples(samples)
}
