//! Structural classification of grids.
//!
//! Operators dispatch on the outer nesting (time, ensemble) and on the
//! spatial manifold (2D, 3D slice, 3D volume). Classification is pure and
//! never fails for the four legal nestings.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::error::{GridMathError, Result};
use crate::grid::{Field, Grid};

/// Outer nesting of a grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GridShape {
    SingleLevel,
    TimeSequence,
    Ensemble,
    TimeSequenceOfEnsembles,
}

impl GridShape {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::SingleLevel => "single-level",
            Self::TimeSequence => "time-sequence",
            Self::Ensemble => "ensemble",
            Self::TimeSequenceOfEnsembles => "time-sequence-of-ensembles",
        }
    }
}

impl std::fmt::Display for GridShape {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Everything an operator needs to know about a grid's structure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Classification {
    pub shape: GridShape,
    /// Outer sequence whose axis is time (index sequences answer false).
    pub is_time_sequence: bool,
    pub has_ensemble: bool,
    pub is_3d: bool,
    pub is_volume: bool,
    /// Every leaf shares one spatial domain.
    pub is_constant_spatial_domain: bool,
}

impl Classification {
    /// Outer sequence of either kind.
    pub fn is_sequence(&self) -> bool {
        matches!(
            self.shape,
            GridShape::TimeSequence | GridShape::TimeSequenceOfEnsembles
        )
    }

    /// 3D with a single level.
    pub fn is_slice(&self) -> bool {
        self.is_3d && !self.is_volume
    }
}

/// Classify a grid, rejecting illegal nestings and inconsistent leaves.
pub fn classify(grid: &Grid) -> Result<Classification> {
    let (shape, is_time_sequence, has_ensemble) = match grid {
        Grid::Field(_) => (GridShape::SingleLevel, false, false),
        Grid::Ensemble(e) => {
            if let Some(bad) = e.samples().iter().find(|g| !matches!(g, Grid::Field(_))) {
                return Err(GridMathError::malformed(format!(
                    "ensemble member holds a {}",
                    kind_name(bad)
                )));
            }
            (GridShape::Ensemble, false, true)
        }
        Grid::Sequence(s) => {
            let samples = s.samples();
            let first_is_ensemble = matches!(samples[0], Grid::Ensemble(_));
            for sample in samples {
                match sample {
                    Grid::Field(_) if !first_is_ensemble => {}
                    Grid::Ensemble(e) if first_is_ensemble => {
                        if let Some(bad) = e.samples().iter().find(|g| !matches!(g, Grid::Field(_)))
                        {
                            return Err(GridMathError::malformed(format!(
                                "ensemble member holds a {}",
                                kind_name(bad)
                            )));
                        }
                    }
                    other => {
                        return Err(GridMathError::malformed(format!(
                            "sequence mixes samples: {} after {}",
                            kind_name(other),
                            kind_name(&samples[0])
                        )));
                    }
                }
            }
            if first_is_ensemble {
                (
                    GridShape::TimeSequenceOfEnsembles,
                    s.axis().is_time(),
                    true,
                )
            } else {
                (GridShape::TimeSequence, s.axis().is_time(), false)
            }
        }
    };

    let fields = grid.fields();
    let first = fields[0];
    check_leaves(first, &fields)?;

    let is_constant_spatial_domain = fields.iter().all(|f| {
        Arc::ptr_eq(f.domain_arc(), first.domain_arc()) || f.domain() == first.domain()
    });

    Ok(Classification {
        shape,
        is_time_sequence,
        has_ensemble,
        is_3d: first.domain().is_3d(),
        is_volume: first.domain().is_volume(),
        is_constant_spatial_domain,
    })
}

fn check_leaves(first: &Field, fields: &[&Field]) -> Result<()> {
    for field in fields.iter().skip(1) {
        if !field.range().same_parameters(first.range()) {
            return Err(GridMathError::malformed(format!(
                "samples carry different parameters: {} vs {}",
                first.range(),
                field.range()
            )));
        }
        if field.domain().is_3d() != first.domain().is_3d() {
            return Err(GridMathError::malformed(
                "samples mix 2D and 3D spatial domains",
            ));
        }
    }
    Ok(())
}

fn kind_name(grid: &Grid) -> &'static str {
    match grid {
        Grid::Field(_) => "field",
        Grid::Sequence(_) => "sequence",
        Grid::Ensemble(_) => "ensemble",
    }
}

/// Outer sequence with a time axis.
pub fn is_time_sequence(grid: &Grid) -> bool {
    match grid {
        Grid::Sequence(s) => s.axis().is_time(),
        _ => false,
    }
}

/// Leaves sit under an ensemble axis.
pub fn has_ensemble(grid: &Grid) -> bool {
    match grid {
        Grid::Ensemble(_) => true,
        Grid::Sequence(s) => matches!(s.samples()[0], Grid::Ensemble(_)),
        Grid::Field(_) => false,
    }
}

pub fn is_3d(grid: &Grid) -> bool {
    grid.first_field().domain().is_3d()
}

pub fn is_volume(grid: &Grid) -> bool {
    grid.first_field().domain().is_volume()
}

pub fn is_slice(grid: &Grid) -> bool {
    grid.first_field().domain().is_slice()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::{Axis, Sequence, OuterAxis, SpatialDomain, VerticalAxis};
    use chrono::{TimeZone, Utc};
    use grid_common::{QuantityTag, Unit};

    fn domain(levels: Option<Vec<f64>>) -> Arc<SpatialDomain> {
        let mut d = SpatialDomain::geographic(
            Axis::linear(0.0, 1.0, 2).unwrap(),
            Axis::linear(0.0, 1.0, 2).unwrap(),
        )
        .unwrap();
        if let Some(levels) = levels {
            d = d.with_levels(VerticalAxis::new(levels, Unit::hectopascal()).unwrap());
        }
        Arc::new(d)
    }

    fn field_on(domain: &Arc<SpatialDomain>, name: &str) -> Grid {
        Field::scalar(
            domain.clone(),
            QuantityTag::new(name, Unit::kelvin()),
            vec![0.0; domain.len()],
        )
        .unwrap()
        .into()
    }

    fn times(n: u32) -> Vec<chrono::DateTime<Utc>> {
        (0..n)
            .map(|h| Utc.with_ymd_and_hms(2024, 6, 1, h, 0, 0).unwrap())
            .collect()
    }

    #[test]
    fn test_classify_single_volume() {
        let d = domain(Some(vec![1000.0, 850.0]));
        let c = classify(&field_on(&d, "T")).unwrap();
        assert_eq!(c.shape, GridShape::SingleLevel);
        assert!(c.is_3d && c.is_volume && !c.is_slice());
        assert!(!c.is_time_sequence && !c.has_ensemble);
    }

    #[test]
    fn test_classify_time_sequence_of_ensembles() {
        let d = domain(Some(vec![500.0]));
        let ens = Grid::ensemble(vec![0, 1], vec![field_on(&d, "T"), field_on(&d, "T")]).unwrap();
        let grid = Grid::time_sequence(times(2), vec![ens.clone(), ens]).unwrap();
        let c = classify(&grid).unwrap();
        assert_eq!(c.shape, GridShape::TimeSequenceOfEnsembles);
        assert!(c.is_time_sequence && c.has_ensemble);
        assert!(c.is_slice());
        assert!(c.is_constant_spatial_domain);
    }

    #[test]
    fn test_index_sequence_is_not_time() {
        let d = domain(None);
        let grid = Grid::index_sequence(vec![1.0, 2.0], vec![field_on(&d, "T"), field_on(&d, "T")])
            .unwrap();
        let c = classify(&grid).unwrap();
        assert_eq!(c.shape, GridShape::TimeSequence);
        assert!(!c.is_time_sequence);
        assert!(c.is_sequence());
    }

    #[test]
    fn test_non_constant_domain_detected() {
        let a = domain(None);
        let b = Arc::new(
            SpatialDomain::geographic(
                Axis::linear(0.0, 2.0, 2).unwrap(),
                Axis::linear(0.0, 1.0, 2).unwrap(),
            )
            .unwrap(),
        );
        let grid = Grid::time_sequence(times(2), vec![field_on(&a, "T"), field_on(&b, "T")]).unwrap();
        assert!(!classify(&grid).unwrap().is_constant_spatial_domain);
    }

    #[test]
    fn test_malformed_nestings() {
        let d = domain(None);
        let inner = Grid::time_sequence(times(1), vec![field_on(&d, "T")]).unwrap();
        let nested = Grid::Sequence(Sequence::new(OuterAxis::Index(vec![0.0]), vec![inner.clone()]).unwrap());
        assert!(matches!(classify(&nested), Err(GridMathError::MalformedGrid(_))));

        let ens_of_seq = Grid::ensemble(vec![0], vec![inner]).unwrap();
        assert!(matches!(classify(&ens_of_seq), Err(GridMathError::MalformedGrid(_))));

        let ens = Grid::ensemble(vec![0], vec![field_on(&d, "T")]).unwrap();
        let mixed = Grid::time_sequence(times(2), vec![ens, field_on(&d, "T")]).unwrap();
        assert!(matches!(classify(&mixed), Err(GridMathError::MalformedGrid(_))));
    }

    #[test]
    fn test_mismatched_parameters_are_malformed() {
        let d = domain(None);
        let grid = Grid::time_sequence(times(2), vec![field_on(&d, "T"), field_on(&d, "Td")]).unwrap();
        assert!(matches!(classify(&grid), Err(GridMathError::MalformedGrid(_))));
    }
}
