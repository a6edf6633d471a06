//! Statistics across ensemble members.

use grid_common::{QuantityTag, Unit};

use super::{reduce_fields, GridMath};
use crate::classify::classify;
use crate::error::{GridMathError, Result};
use crate::grid::{Field, Grid, RangeType, Sequence};
use crate::stats;
use crate::structure::map_indices;
use crate::types::MemberFunction;

impl GridMath {
    /// Reduce every grid point across the ensemble members, per time step
    /// when the ensemble sits inside a sequence.
    ///
    /// Percentile arguments are checked before any data is touched.
    /// Probabilities come out dimensionless in `[0, 1]`.
    pub fn apply_function_over_members(&self, grid: &Grid, function: MemberFunction) -> Result<Grid> {
        if let MemberFunction::Percentile(p) = function {
            stats::validate_percentile(p)?;
        }
        if let MemberFunction::UnivariateProbability { threshold } = function {
            if !threshold.is_finite() {
                return Err(GridMathError::invalid_argument(format!(
                    "probability threshold must be finite, got {}",
                    threshold
                )));
            }
        }
        let classification = classify(grid)?;
        if !classification.has_ensemble {
            return Err(GridMathError::invalid_argument(
                "member statistics need a grid with an ensemble axis",
            ));
        }
        tracing::debug!(function = %function, "reducing over ensemble members");
        self.reduce_members(grid, function)
    }

    fn reduce_members(&self, grid: &Grid, function: MemberFunction) -> Result<Grid> {
        match grid {
            Grid::Sequence(seq) => {
                let samples = map_indices(seq.len(), self.config().parallel, |t| {
                    self.reduce_members(&seq.samples()[t], function)
                })?;
                Ok(Grid::Sequence(Sequence::new(seq.axis().clone(), samples)?))
            }
            Grid::Ensemble(ens) => {
                let fields = ens
                    .samples()
                    .iter()
                    .map(|g| {
                        g.as_field()
                            .cloned()
                            .ok_or_else(|| GridMathError::malformed("ensemble member is not a field"))
                    })
                    .collect::<Result<Vec<_>>>()?;
                let tolerance = self.config().probability_tolerance;
                let reduced = reduce_fields(&fields, self.config().interpolation, |values| {
                    stats::evaluate(values, function, tolerance)
                })?;
                Ok(Grid::Field(relabel(reduced, function)?))
            }
            Grid::Field(_) => Err(GridMathError::malformed("ensemble expected")),
        }
    }
}

fn relabel(field: Field, function: MemberFunction) -> Result<Field> {
    match function {
        MemberFunction::UnivariateProbability { .. } => {
            let tags = field
                .range()
                .components()
                .iter()
                .map(|t| QuantityTag::new(format!("probability({})", t.name()), Unit::dimensionless()))
                .collect();
            field.with_range(RangeType::new(tags)?)
        }
        _ => Ok(field),
    }
}
