//! Tuple combination and masking.

use super::DerivedGridFactory;
use crate::algebra::align_pair;
use crate::classify::classify;
use crate::error::{GridMathError, Result};
use crate::grid::{Field, Grid, RangeType};
use crate::structure::zip_fields;
use crate::types::InterpolationMethod;

impl DerivedGridFactory {
    /// Merge the ranges of 2 or 3 grids into one tuple-valued grid.
    ///
    /// Trailing operands are brought onto the first one's sequence axis and
    /// spatial domain; ensembles are paired member by member.
    pub fn combine_grids(&self, grids: &[&Grid]) -> Result<Grid> {
        if !(2..=3).contains(&grids.len()) {
            return Err(GridMathError::invalid_argument(format!(
                "combine_grids takes 2 or 3 grids, got {}",
                grids.len()
            )));
        }
        tracing::debug!(operands = grids.len(), "combining grid ranges");
        let mut combined = grids[0].clone();
        for grid in &grids[1..] {
            combined = self.math.zip_aligned(&combined, grid, merge_ranges)?;
        }
        Ok(combined)
    }

    /// Set every component of `grid` to NaN where `mask` equals `sentinel`
    /// (in the mask's own units) or is itself NaN.
    ///
    /// The mask is resampled onto the grid by nearest neighbour.
    pub fn mask(&self, grid: &Grid, mask: &Grid, sentinel: f64) -> Result<Grid> {
        classify(grid)?;
        classify(mask)?;
        zip_fields(grid, mask, self.math.zip_options(false), |field, mask| {
            let (field, mask) = align_pair(field, mask, InterpolationMethod::Nearest)?;
            mask_field(&field, &mask, sentinel)
        })
    }
}

/// Concatenate the components of two leaves on the same domain.
fn merge_ranges(a: &Field, b: &Field) -> Result<Field> {
    let tags = a
        .range()
        .components()
        .iter()
        .chain(b.range().components())
        .cloned()
        .collect();
    let samples = a.samples().iter().chain(b.samples()).cloned().collect();
    Field::from_shared(a.domain_arc().clone(), RangeType::new(tags)?, samples)
}

fn mask_field(field: &Field, mask: &Field, sentinel: f64) -> Result<Field> {
    let keep: Vec<bool> = mask
        .component(0)
        .iter()
        .map(|&m| !(m.is_nan() || f64::from(m) == sentinel))
        .collect();
    let masked = keep.iter().filter(|k| !**k).count();
    tracing::trace!(masked, points = keep.len(), "applying mask");
    let samples = field
        .samples()
        .iter()
        .map(|data| {
            data.iter()
                .zip(&keep)
                .map(|(&v, &k)| if k { v } else { f32::NAN })
                .collect()
        })
        .collect();
    field.with_samples(samples)
}
