//! The boundary to grid readers.
//!
//! The operators never touch files or the network. Whatever backs the data
//! (model output archives, remote services, test fixtures) sits behind
//! [`GridSource`] and hands back fully formed [`Grid`] values.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use grid_common::TimeRange;
use thiserror::Error;

use crate::classify::classify;
use crate::error::{GridMathError, Result};
use crate::grid::{Field, Grid, Sequence, VerticalAxis};

/// Errors reported by a grid source.
#[derive(Error, Debug)]
pub enum SourceError {
    #[error("parameter not found: {0}")]
    NotFound(String),

    #[error("read failed: {0}")]
    Read(String),

    /// The selection matches nothing in the stored grid.
    #[error("empty selection: {0}")]
    Selection(String),
}

/// Result type for grid sources.
pub type SourceResult<T> = std::result::Result<T, SourceError>;

/// Which sequence steps to read.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum TimeSelection {
    #[default]
    All,
    /// Steps inside a closed range.
    Range(TimeRange),
    /// Exactly these times.
    Times(Vec<DateTime<Utc>>),
    /// The last step only.
    Latest,
}

/// Which vertical levels to read, in the stored grid's vertical unit.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum LevelSelection {
    #[default]
    All,
    /// One level, returned as a single-level slice.
    Level(f64),
    /// A subset of levels, kept in stored order.
    Levels(Vec<f64>),
}

/// Trait for anything that can produce grids by parameter name.
///
/// Implementations may block. Timeouts and retries are theirs to handle;
/// the operators treat a read as an opaque call.
pub trait GridSource: Send + Sync {
    /// Read a grid.
    ///
    /// # Arguments
    /// * `parameter` - Parameter identifier, e.g. "temperature"
    /// * `times` - Sequence steps to keep
    /// * `levels` - Vertical levels to keep
    ///
    /// # Returns
    /// * A grid in one of the legal nestings
    fn read_grid(
        &self,
        parameter: &str,
        times: &TimeSelection,
        levels: &LevelSelection,
    ) -> SourceResult<Grid>;

    /// Parameters this source can serve.
    fn parameters(&self) -> Vec<String>;
}

/// Grids held in memory, with selections applied on read.
#[derive(Debug, Clone, Default)]
pub struct MemorySource {
    grids: HashMap<String, Grid>,
}

impl MemorySource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a grid under `parameter`, replacing any previous one.
    pub fn insert(&mut self, parameter: impl Into<String>, grid: Grid) -> SourceResult<()> {
        classify(&grid).map_err(|e| SourceError::Read(e.to_string()))?;
        self.grids.insert(parameter.into(), grid);
        Ok(())
    }

    pub fn with_grid(mut self, parameter: impl Into<String>, grid: Grid) -> SourceResult<Self> {
        self.insert(parameter, grid)?;
        Ok(self)
    }

    pub fn len(&self) -> usize {
        self.grids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.grids.is_empty()
    }
}

impl GridSource for MemorySource {
    fn read_grid(
        &self,
        parameter: &str,
        times: &TimeSelection,
        levels: &LevelSelection,
    ) -> SourceResult<Grid> {
        let grid = self
            .grids
            .get(parameter)
            .ok_or_else(|| SourceError::NotFound(parameter.to_string()))?;
        tracing::debug!(parameter, times = ?times, levels = ?levels, "reading grid from memory");

        let selected = select_times(grid, times)?;
        select_levels(&selected, levels)
    }

    fn parameters(&self) -> Vec<String> {
        let mut names: Vec<String> = self.grids.keys().cloned().collect();
        names.sort();
        names
    }
}

fn select_times(grid: &Grid, selection: &TimeSelection) -> SourceResult<Grid> {
    if *selection == TimeSelection::All {
        return Ok(grid.clone());
    }
    let seq = grid
        .as_sequence()
        .ok_or_else(|| SourceError::Selection("grid has no sequence axis".to_string()))?;
    let times = seq
        .axis()
        .times()
        .ok_or_else(|| SourceError::Selection("grid is not a time sequence".to_string()))?;

    let indices: Vec<usize> = match selection {
        TimeSelection::All => (0..times.len()).collect(),
        TimeSelection::Range(range) => (0..times.len()).filter(|&i| range.contains(&times[i])).collect(),
        TimeSelection::Times(wanted) => (0..times.len()).filter(|&i| wanted.contains(&times[i])).collect(),
        TimeSelection::Latest => vec![times.len() - 1],
    };
    if indices.is_empty() {
        return Err(SourceError::Selection("no time step matches".to_string()));
    }

    let samples = indices.iter().map(|&i| seq.samples()[i].clone()).collect();
    Sequence::new(seq.axis().subset(&indices), samples)
        .map(Grid::Sequence)
        .map_err(|e| SourceError::Read(e.to_string()))
}

fn select_levels(grid: &Grid, selection: &LevelSelection) -> SourceResult<Grid> {
    let wanted: Vec<f64> = match selection {
        LevelSelection::All => return Ok(grid.clone()),
        LevelSelection::Level(v) => vec![*v],
        LevelSelection::Levels(values) => values.clone(),
    };

    grid.map_fields(false, |field| subset_field(field, &wanted))
        .map_err(|e| match e {
            GridMathError::Source(inner) => inner,
            other => SourceError::Selection(other.to_string()),
        })
}

fn subset_field(field: &Field, wanted: &[f64]) -> Result<Field> {
    let domain = field.domain();
    let z = domain
        .z()
        .ok_or_else(|| SourceError::Selection("grid has no vertical axis".to_string()))?;
    let mut indices: Vec<usize> = wanted.iter().filter_map(|&v| z.axis().index_of(v)).collect();
    indices.sort_unstable();
    indices.dedup();
    if indices.is_empty() {
        return Err(SourceError::Selection("no level matches".to_string()).into());
    }

    let values: Vec<f64> = indices.iter().map(|&k| z.values()[k]).collect();
    let subset = Arc::new(
        domain
            .clone()
            .with_levels(VerticalAxis::new(values, z.unit().clone())?),
    );
    let plane = domain.horizontal_len();
    let samples = field
        .samples()
        .iter()
        .map(|data| {
            indices
                .iter()
                .flat_map(|&k| data[k * plane..(k + 1) * plane].iter().copied())
                .collect()
        })
        .collect();
    Field::new(subset, field.range().clone(), samples)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::{Axis, SpatialDomain};
    use chrono::TimeZone;
    use grid_common::{QuantityTag, Unit};

    fn volume_sequence() -> Grid {
        let d = Arc::new(
            SpatialDomain::geographic(
                Axis::linear(0.0, 1.0, 2).unwrap(),
                Axis::linear(0.0, 1.0, 2).unwrap(),
            )
            .unwrap()
            .with_levels(VerticalAxis::new(vec![1000.0, 850.0, 500.0], Unit::hectopascal()).unwrap()),
        );
        let times: Vec<_> = (0..3)
            .map(|h| Utc.with_ymd_and_hms(2024, 5, 1, 6 * h, 0, 0).unwrap())
            .collect();
        let steps = (0..3)
            .map(|t| {
                Field::from_fn(d.clone(), QuantityTag::new("T", Unit::kelvin()), |_, _, k| {
                    (100 * t + k) as f32
                })
                .unwrap()
                .into()
            })
            .collect();
        Grid::time_sequence(times, steps).unwrap()
    }

    fn source() -> MemorySource {
        MemorySource::new()
            .with_grid("temperature", volume_sequence())
            .unwrap()
    }

    #[test]
    fn test_read_all() {
        let grid = source()
            .read_grid("temperature", &TimeSelection::All, &LevelSelection::All)
            .unwrap();
        assert_eq!(grid.as_sequence().unwrap().len(), 3);
        assert_eq!(source().parameters(), vec!["temperature".to_string()]);
    }

    #[test]
    fn test_unknown_parameter() {
        assert!(matches!(
            source().read_grid("wind", &TimeSelection::All, &LevelSelection::All),
            Err(SourceError::NotFound(_))
        ));
    }

    #[test]
    fn test_time_selection() {
        let start = Utc.with_ymd_and_hms(2024, 5, 1, 5, 0, 0).unwrap();
        let end = Utc.with_ymd_and_hms(2024, 5, 1, 13, 0, 0).unwrap();
        let grid = source()
            .read_grid(
                "temperature",
                &TimeSelection::Range(TimeRange::new(start, end)),
                &LevelSelection::All,
            )
            .unwrap();
        let seq = grid.as_sequence().unwrap();
        assert_eq!(seq.len(), 2);
        assert_eq!(seq.samples()[0].first_field().values()[0], 100.0);

        let latest = source()
            .read_grid("temperature", &TimeSelection::Latest, &LevelSelection::All)
            .unwrap();
        assert_eq!(latest.first_field().values()[0], 200.0);

        let none = source().read_grid(
            "temperature",
            &TimeSelection::Times(vec![Utc.with_ymd_and_hms(2020, 1, 1, 0, 0, 0).unwrap()]),
            &LevelSelection::All,
        );
        assert!(matches!(none, Err(SourceError::Selection(_))));
    }

    #[test]
    fn test_level_selection() {
        let grid = source()
            .read_grid("temperature", &TimeSelection::All, &LevelSelection::Level(500.0))
            .unwrap();
        let field = grid.first_field();
        assert!(field.domain().is_slice());
        assert!(field.values().iter().all(|&v| v == 2.0));

        let grid = source()
            .read_grid(
                "temperature",
                &TimeSelection::All,
                &LevelSelection::Levels(vec![500.0, 1000.0]),
            )
            .unwrap();
        assert_eq!(grid.first_field().domain().z().unwrap().values(), &[1000.0, 500.0]);

        assert!(matches!(
            source().read_grid("temperature", &TimeSelection::All, &LevelSelection::Level(10.0)),
            Err(SourceError::Selection(_))
        ));
    }
}
