//! Derived-quantity computation over meteorological grids.
//!
//! A [`Grid`] is a leaf [`Field`] (samples over a 2D or 3D spatial domain,
//! with one or more unit-tagged range components), optionally nested under a
//! time or index sequence and under an ensemble. Everything in this crate
//! accepts any legal nesting and returns the same nesting.
//!
//! - **Classification**: [`classify`] reports shape and nesting once, so
//!   operators can dispatch without re-inspecting the structure.
//! - **Algebra**: [`GridMath`] applies unit-aware binary operators,
//!   derivatives and reductions over time or ensemble members.
//! - **Derived quantities**: [`DerivedGridFactory`] builds winds, vorticity,
//!   thermodynamic quantities, vertical conversions, theta surfaces and
//!   climatologies on top of [`GridMath`].
//! - **Shape utilities**: resampling, slice demotion, level selection,
//!   relabelling and transposition.
//! - **Sources**: the [`GridSource`] boundary that supplies raw grids.
//!
//! # Architecture
//!
//! ```text
//! GridSource::read_grid(parameter, times, levels)
//!      │
//!      ▼
//! DerivedGridFactory::create_*(grids)
//!      │
//!      ├─► classify (shape, nesting)
//!      │
//!      ├─► zip_fields / time_columns (outer nesting)
//!      │         │
//!      │         └─► align_pair: slice demotion, transpose, resample B onto A
//!      │
//!      └─► leaf arithmetic in f64, stored as f32, relabelled with units
//!               │
//!               ▼
//!          Grid in the caller's nesting
//! ```
//!
//! # Example
//!
//! ```ignore
//! use grid_math::{DerivedGridFactory, GridMathConfig, MemorySource, GridSource};
//!
//! let factory = DerivedGridFactory::with_config(GridMathConfig::from_env());
//! let u = source.read_grid("u", &TimeSelection::All, &LevelSelection::Level(500.0))?;
//! let v = source.read_grid("v", &TimeSelection::All, &LevelSelection::Level(500.0))?;
//!
//! let vorticity = factory.create_relative_vorticity(&u, &v)?;
//! ```

pub mod algebra;
pub mod cache;
pub mod classify;
pub mod config;
pub mod derived;
pub mod error;
pub mod grid;
pub mod resample;
pub mod search;
pub mod shape;
pub mod source;
pub mod stats;
pub mod structure;
pub mod types;

// Re-export commonly used types at crate root
pub use algebra::{BinaryOp, GridMath};
pub use cache::CallCache;
pub use classify::{
    classify, has_ensemble, is_3d, is_slice, is_time_sequence, is_volume, Classification,
    GridShape,
};
pub use config::GridMathConfig;
pub use derived::{
    saturation_vapor_pressure, DerivedGridFactory, EARTH_ROTATION_RATE, GAS_CONSTANT_RATIO, KAPPA,
};
pub use error::{GridMathError, Result};
pub use grid::{
    Axis, AxisOrder, Ensemble, Field, Grid, HorizontalCoordinates, OuterAxis, RangeType, Sequence,
    SpatialDomain, VectorKind, VerticalAxis,
};
pub use resample::{resample_field, resample_grid};
pub use search::{find_bracket, linear_interpolate_height, Bracket, Direction};
pub use shape::{
    make_2d_from_slice, make_2d_grid_from_slice, select_level, set_param_type, slice_at_level,
    slice_grid_at_level, transpose_field, transpose_grid,
};
pub use source::{GridSource, LevelSelection, MemorySource, SourceError, TimeSelection};
pub use stats::{evaluate_mode, evaluate_percentile, univariate_probability};
pub use structure::{time_columns, zip_fields, TimeColumns, ZipOptions};
pub use types::{
    CacheStats, DerivativeAxis, EndpointPolicy, InterpolationMethod, MemberFunction, TimeFunction,
};

pub use grid_common::{QuantityTag, Unit};
