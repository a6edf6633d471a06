//! Grid builders shared by the integration tests.

#![allow(dead_code)]

use std::sync::Arc;

use chrono::{DateTime, Utc};
use grid_math::{Axis, Field, Grid, QuantityTag, SpatialDomain, Unit, VerticalAxis};
use projection::LambertConformal;
use test_utils::fixtures::grid::GridSpec;

/// Install a test subscriber once; later calls are no-ops.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

pub fn geographic(spec: GridSpec) -> Arc<SpatialDomain> {
    Arc::new(
        SpatialDomain::geographic(
            Axis::new(spec.x_values()).unwrap(),
            Axis::new(spec.y_values()).unwrap(),
        )
        .unwrap(),
    )
}

/// Same points as [`geographic`], stored latitude-first.
pub fn geographic_lat_lon(spec: GridSpec) -> Arc<SpatialDomain> {
    Arc::new(
        SpatialDomain::geographic_lat_lon(
            Axis::new(spec.y_values()).unwrap(),
            Axis::new(spec.x_values()).unwrap(),
        )
        .unwrap(),
    )
}

/// Projected domain with axes in meters.
pub fn projected(spec: GridSpec) -> Arc<SpatialDomain> {
    Arc::new(
        SpatialDomain::projected(
            Axis::new(spec.x_values()).unwrap(),
            Axis::new(spec.y_values()).unwrap(),
            Arc::new(LambertConformal::hrrr()),
            Unit::meter(),
        )
        .unwrap(),
    )
}

pub fn with_pressure_levels(domain: &SpatialDomain, levels: &[f64]) -> Arc<SpatialDomain> {
    Arc::new(
        domain
            .clone()
            .with_levels(VerticalAxis::new(levels.to_vec(), Unit::hectopascal()).unwrap()),
    )
}

pub fn scalar(domain: &Arc<SpatialDomain>, name: &str, unit: Unit, values: Vec<f32>) -> Field {
    Field::scalar(domain.clone(), QuantityTag::new(name, unit), values).unwrap()
}

pub fn constant(domain: &Arc<SpatialDomain>, name: &str, unit: Unit, value: f32) -> Field {
    scalar(domain, name, unit, vec![value; domain.len()])
}

/// Time sequence with one leaf per time.
pub fn series(times: Vec<DateTime<Utc>>, fields: Vec<Field>) -> Grid {
    Grid::time_sequence(times, fields.into_iter().map(Grid::from).collect()).unwrap()
}

/// First sample of every leaf, in nesting order.
pub fn first_values(grid: &Grid) -> Vec<f32> {
    grid.fields().iter().map(|f| f.values()[0]).collect()
}
