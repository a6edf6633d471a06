//! The grid data model.
//!
//! A [`Grid`] is a leaf [`Field`] optionally nested under a sequence axis
//! (time or an ordered index) and/or an ensemble member axis. The legal
//! nestings are:
//!
//! ```text
//! Field
//! Sequence[Field]
//! Ensemble[Field]
//! Sequence[Ensemble[Field]]
//! ```
//!
//! Constructors only check local consistency (lengths, ordering); the
//! nesting itself is checked by [`classify`](crate::classify::classify),
//! which every operator runs first.

pub mod domain;
pub mod field;

use chrono::{DateTime, Utc};
use grid_common::epoch_seconds;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

pub use domain::{Axis, AxisOrder, HorizontalCoordinates, SpatialDomain, VerticalAxis};
pub use field::{Field, RangeType, VectorKind};

use crate::error::{GridMathError, Result};

/// Coordinates of a sequence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum OuterAxis {
    /// Valid times.
    Time(Vec<DateTime<Utc>>),
    /// An arbitrary ordered index, e.g. day of year.
    Index(Vec<f64>),
}

impl OuterAxis {
    pub fn len(&self) -> usize {
        match self {
            Self::Time(t) => t.len(),
            Self::Index(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn is_time(&self) -> bool {
        matches!(self, Self::Time(_))
    }

    pub fn times(&self) -> Option<&[DateTime<Utc>]> {
        match self {
            Self::Time(t) => Some(t),
            Self::Index(_) => None,
        }
    }

    /// Numeric coordinates: epoch seconds for time axes.
    pub fn coordinates(&self) -> Vec<f64> {
        match self {
            Self::Time(t) => t.iter().map(epoch_seconds).collect(),
            Self::Index(v) => v.clone(),
        }
    }

    /// Axis holding only the coordinates at `indices`.
    pub fn subset(&self, indices: &[usize]) -> Self {
        match self {
            Self::Time(t) => Self::Time(indices.iter().map(|&i| t[i]).collect()),
            Self::Index(v) => Self::Index(indices.iter().map(|&i| v[i]).collect()),
        }
    }

    /// Same kind of coordinate.
    pub fn same_kind(&self, other: &OuterAxis) -> bool {
        self.is_time() == other.is_time()
    }

    fn validate(&self) -> Result<()> {
        if self.is_empty() {
            return Err(GridMathError::malformed("sequence axis is empty"));
        }
        let increasing = match self {
            Self::Time(t) => t.windows(2).all(|w| w[1] > w[0]),
            Self::Index(v) => {
                v.iter().all(|x| x.is_finite()) && v.windows(2).all(|w| w[1] > w[0])
            }
        };
        if !increasing {
            return Err(GridMathError::malformed(
                "sequence axis must be strictly increasing",
            ));
        }
        Ok(())
    }
}

/// Samples ordered along an [`OuterAxis`].
#[derive(Debug, Clone)]
pub struct Sequence {
    axis: OuterAxis,
    samples: Vec<Grid>,
}

impl Sequence {
    pub fn new(axis: OuterAxis, samples: Vec<Grid>) -> Result<Self> {
        axis.validate()?;
        if axis.len() != samples.len() {
            return Err(GridMathError::malformed(format!(
                "sequence axis has {} values for {} samples",
                axis.len(),
                samples.len()
            )));
        }
        Ok(Self { axis, samples })
    }

    pub fn axis(&self) -> &OuterAxis {
        &self.axis
    }

    pub fn samples(&self) -> &[Grid] {
        &self.samples
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn into_parts(self) -> (OuterAxis, Vec<Grid>) {
        (self.axis, self.samples)
    }
}

/// Alternate realizations of the same grid.
#[derive(Debug, Clone)]
pub struct Ensemble {
    members: Vec<i32>,
    samples: Vec<Grid>,
}

impl Ensemble {
    pub fn new(members: Vec<i32>, samples: Vec<Grid>) -> Result<Self> {
        if members.is_empty() {
            return Err(GridMathError::malformed("ensemble has no members"));
        }
        if members.len() != samples.len() {
            return Err(GridMathError::malformed(format!(
                "{} member ids for {} samples",
                members.len(),
                samples.len()
            )));
        }
        let mut sorted = members.clone();
        sorted.sort_unstable();
        if sorted.windows(2).any(|w| w[0] == w[1]) {
            return Err(GridMathError::malformed("duplicate ensemble member id"));
        }
        Ok(Self { members, samples })
    }

    /// Members numbered `0..n`.
    pub fn from_samples(samples: Vec<Grid>) -> Result<Self> {
        let members = (0..samples.len() as i32).collect();
        Self::new(members, samples)
    }

    pub fn members(&self) -> &[i32] {
        &self.members
    }

    pub fn samples(&self) -> &[Grid] {
        &self.samples
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn into_parts(self) -> (Vec<i32>, Vec<Grid>) {
        (self.members, self.samples)
    }
}

/// A grid value.
#[derive(Debug, Clone)]
pub enum Grid {
    Field(Field),
    Sequence(Sequence),
    Ensemble(Ensemble),
}

impl From<Field> for Grid {
    fn from(field: Field) -> Self {
        Grid::Field(field)
    }
}

impl Grid {
    /// A time sequence of samples.
    pub fn time_sequence(times: Vec<DateTime<Utc>>, samples: Vec<Grid>) -> Result<Self> {
        Ok(Grid::Sequence(Sequence::new(OuterAxis::Time(times), samples)?))
    }

    /// A sequence over an arbitrary ordered index.
    pub fn index_sequence(index: Vec<f64>, samples: Vec<Grid>) -> Result<Self> {
        Ok(Grid::Sequence(Sequence::new(OuterAxis::Index(index), samples)?))
    }

    pub fn ensemble(members: Vec<i32>, samples: Vec<Grid>) -> Result<Self> {
        Ok(Grid::Ensemble(Ensemble::new(members, samples)?))
    }

    pub fn as_field(&self) -> Option<&Field> {
        match self {
            Grid::Field(f) => Some(f),
            _ => None,
        }
    }

    pub fn as_sequence(&self) -> Option<&Sequence> {
        match self {
            Grid::Sequence(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_ensemble(&self) -> Option<&Ensemble> {
        match self {
            Grid::Ensemble(e) => Some(e),
            _ => None,
        }
    }

    /// The first leaf in nesting order.
    pub fn first_field(&self) -> &Field {
        match self {
            Grid::Field(f) => f,
            Grid::Sequence(s) => s.samples[0].first_field(),
            Grid::Ensemble(e) => e.samples[0].first_field(),
        }
    }

    /// Range type of the leaves.
    pub fn range(&self) -> &RangeType {
        self.first_field().range()
    }

    /// All leaves in nesting order.
    pub fn fields(&self) -> Vec<&Field> {
        let mut out = Vec::new();
        self.collect_fields(&mut out);
        out
    }

    fn collect_fields<'a>(&'a self, out: &mut Vec<&'a Field>) {
        match self {
            Grid::Field(f) => out.push(f),
            Grid::Sequence(s) => s.samples.iter().for_each(|g| g.collect_fields(out)),
            Grid::Ensemble(e) => e.samples.iter().for_each(|g| g.collect_fields(out)),
        }
    }

    /// Apply a leaf operator under any nesting, keeping axes and member ids.
    pub fn map_fields<F>(&self, parallel: bool, f: F) -> Result<Grid>
    where
        F: Fn(&Field) -> Result<Field> + Sync,
    {
        self.map_fields_dyn(parallel, &f)
    }

    fn map_fields_dyn(
        &self,
        parallel: bool,
        f: &(dyn Fn(&Field) -> Result<Field> + Sync),
    ) -> Result<Grid> {
        match self {
            Grid::Field(field) => Ok(Grid::Field(f(field)?)),
            Grid::Sequence(s) => {
                let samples = map_samples(&s.samples, parallel, |g| g.map_fields_dyn(parallel, f))?;
                Ok(Grid::Sequence(Sequence {
                    axis: s.axis.clone(),
                    samples,
                }))
            }
            Grid::Ensemble(e) => {
                let samples = map_samples(&e.samples, parallel, |g| g.map_fields_dyn(parallel, f))?;
                Ok(Grid::Ensemble(Ensemble {
                    members: e.members.clone(),
                    samples,
                }))
            }
        }
    }
}

/// Evaluate `f` for every sample, on the rayon pool when `parallel` is set.
pub(crate) fn map_samples<T, F>(samples: &[Grid], parallel: bool, f: F) -> Result<Vec<T>>
where
    T: Send,
    F: Fn(&Grid) -> Result<T> + Sync + Send,
{
    if parallel && samples.len() > 1 {
        samples.par_iter().map(f).collect()
    } else {
        samples.iter().map(f).collect()
    }
}
