//! Physically meaningful composite operators.
//!
//! [`DerivedGridFactory`] builds winds, vorticity, thermodynamic quantities,
//! vertical conversions, isentropic surfaces and climatologies out of the
//! [`GridMath`] primitives. Every operator accepts any legal nesting and
//! returns the same nesting with its result relabelled in physical units.

mod climatology;
mod combine;
mod flow;
mod geo;
mod isentropic;
mod kinematics;
mod thermo;
mod vertical;

use std::sync::Arc;

use grid_common::{QuantityTag, Unit};
use projection::{StandardAtmosphere, VerticalTransform};

use crate::algebra::GridMath;
use crate::config::GridMathConfig;
use crate::error::Result;
use crate::grid::{Field, Grid};

pub use thermo::{saturation_vapor_pressure, GAS_CONSTANT_RATIO, KAPPA};

/// Earth's angular velocity (rad s-1).
pub const EARTH_ROTATION_RATE: f64 = 7.2921e-5;

/// Composite operators over grids.
#[derive(Debug, Clone)]
pub struct DerivedGridFactory {
    math: GridMath,
    vertical: Arc<dyn VerticalTransform>,
}

impl Default for DerivedGridFactory {
    fn default() -> Self {
        Self::new(GridMath::default(), Arc::new(StandardAtmosphere::new()))
    }
}

impl DerivedGridFactory {
    /// Create a factory converting pressure and height with `vertical`.
    pub fn new(math: GridMath, vertical: Arc<dyn VerticalTransform>) -> Self {
        Self { math, vertical }
    }

    /// Factory on the standard atmosphere.
    pub fn with_config(config: GridMathConfig) -> Self {
        Self::new(GridMath::new(config), Arc::new(StandardAtmosphere::new()))
    }

    pub fn math(&self) -> &GridMath {
        &self.math
    }

    pub fn vertical_transform(&self) -> &dyn VerticalTransform {
        self.vertical.as_ref()
    }

    fn config(&self) -> &GridMathConfig {
        self.math.config()
    }
}

/// Evaluate `f` at every point of the first component of `a`, read in `unit`.
pub(crate) fn pointwise1<F>(a: &Field, unit: &Unit, tag: QuantityTag, f: F) -> Result<Field>
where
    F: Fn(f64) -> f64,
{
    let values = a.component_in(0, unit)?;
    Field::scalar(
        a.domain_arc().clone(),
        tag,
        values.into_iter().map(|v| f(v) as f32).collect(),
    )
}

/// Evaluate `f` pointwise over the first components of two leaves on the
/// same domain, each read in its given unit.
pub(crate) fn pointwise2<F>(
    a: &Field,
    unit_a: &Unit,
    b: &Field,
    unit_b: &Unit,
    tag: QuantityTag,
    f: F,
) -> Result<Field>
where
    F: Fn(f64, f64) -> f64,
{
    let va = a.component_in(0, unit_a)?;
    let vb = b.component_in(0, unit_b)?;
    Field::scalar(
        a.domain_arc().clone(),
        tag,
        va.into_iter().zip(vb).map(|(x, y)| f(x, y) as f32).collect(),
    )
}

/// Smallest and largest non-NaN sample over every leaf.
pub(crate) fn grid_value_range(grid: &Grid) -> Option<(f32, f32)> {
    grid.fields()
        .into_iter()
        .filter_map(|f| f.value_range())
        .reduce(|(lo, hi), (l, h)| (lo.min(l), hi.max(h)))
}
