//! Structural properties of the algebra engine across nestings.

mod common;

use common::*;
use grid_math::{
    classify, EndpointPolicy, GridMath, GridMathConfig, GridMathError, GridShape, MemberFunction,
    TimeFunction, Unit,
};
use grid_math::{Grid, OuterAxis};
use test_utils::fixtures::{grid::MIDLATITUDE_PATCH, levels, time};
use test_utils::{assert_approx_eq, assert_samples_approx_eq, create_member_values};

fn math() -> GridMath {
    GridMath::new(GridMathConfig {
        parallel: false,
        ..Default::default()
    })
}

/// Time sequence (2 steps) of 3-member ensembles of pressure volumes.
fn nested_volume() -> Grid {
    let d = with_pressure_levels(&geographic(MIDLATITUDE_PATCH), &levels::SHORT_COLUMN_HPA);
    let steps = (0..2)
        .map(|t| {
            let members = create_member_values(3, 280.0 + t as f32, 1.0)
                .into_iter()
                .map(|v| Grid::from(constant(&d, "T", Unit::kelvin(), v)))
                .collect();
            Grid::ensemble(vec![0, 1, 2], members).unwrap()
        })
        .collect();
    Grid::time_sequence(time::hourly_times(2, 6), steps).unwrap()
}

// ============================================================================
// Shape preservation
// ============================================================================

#[test]
fn test_binary_op_preserves_nesting() {
    init_tracing();
    let grid = nested_volume();
    let before = classify(&grid).unwrap();
    assert_eq!(before.shape, GridShape::TimeSequenceOfEnsembles);

    let sum = math().add(&grid, &grid, false).unwrap();
    let after = classify(&sum).unwrap();
    assert_eq!(before, after);
    assert_eq!(
        sum.as_sequence().unwrap().axis(),
        grid.as_sequence().unwrap().axis()
    );
    let first_step = &sum.as_sequence().unwrap().samples()[0];
    assert_eq!(first_step.as_ensemble().unwrap().members(), &[0, 1, 2]);
    assert_eq!(first_values(&sum), vec![560.0, 562.0, 564.0, 562.0, 564.0, 566.0]);
}

#[test]
fn test_unary_ops_preserve_nesting() {
    let grid = nested_volume();
    let m = math();
    for result in [
        m.negate(&grid).unwrap(),
        m.add_constant(&grid, 1.0).unwrap(),
        m.convert_units(&grid, &Unit::celsius()).unwrap(),
    ] {
        assert_eq!(classify(&result).unwrap(), classify(&grid).unwrap());
    }
}

// ============================================================================
// Broadcasting
// ============================================================================

#[test]
fn test_single_field_broadcast_over_sequence() {
    let d = geographic(MIDLATITUDE_PATCH);
    let seq = series(
        time::hourly_times(3, 1),
        vec![
            constant(&d, "T", Unit::kelvin(), 270.0),
            constant(&d, "T", Unit::kelvin(), 271.0),
            constant(&d, "T", Unit::kelvin(), 272.0),
        ],
    );
    let offset: Grid = constant(&d, "dT", Unit::kelvin(), 10.0).into();

    let left = math().subtract(&seq, &offset, false).unwrap();
    let right = math().subtract(&offset, &seq, false).unwrap();
    assert_eq!(first_values(&left), vec![260.0, 261.0, 262.0]);
    assert_eq!(first_values(&right), vec![-260.0, -261.0, -262.0]);
    assert!(right.as_sequence().is_some());
}

#[test]
fn test_surface_field_broadcast_over_volume() {
    let surface = geographic(MIDLATITUDE_PATCH);
    let volume = with_pressure_levels(&surface, &levels::SHORT_COLUMN_HPA);
    let a: Grid = constant(&surface, "a", Unit::meter(), 2.0).into();
    let b: Grid = constant(&volume, "b", Unit::meter(), 3.0).into();

    let product = math().multiply(&a, &b, false).unwrap();
    let f = product.first_field();
    assert_eq!(f.domain().nz(), 3);
    assert!(f.values().iter().all(|&v| v == 6.0));
}

#[test]
fn test_unit_aware_addition() {
    let d = geographic(MIDLATITUDE_PATCH);
    let kelvin: Grid = constant(&d, "T", Unit::kelvin(), 273.15).into();
    let celsius: Grid = constant(&d, "dT", Unit::celsius(), 10.0).into();
    let sum = math().add(&kelvin, &celsius, false).unwrap();
    assert_eq!(sum.first_field().unit(), &Unit::kelvin());
    assert_approx_eq!(sum.first_field().values()[0], 556.3, 1e-3);

    let metres: Grid = constant(&d, "z", Unit::meter(), 1.0).into();
    let err = math().add(&kelvin, &metres, false).unwrap_err();
    assert!(matches!(err, GridMathError::IncompatibleUnits(_)));
}

#[test]
fn test_mismatched_member_counts_rejected() {
    let d = geographic(MIDLATITUDE_PATCH);
    let two = Grid::ensemble(
        vec![0, 1],
        vec![
            constant(&d, "x", Unit::dimensionless(), 1.0).into(),
            constant(&d, "x", Unit::dimensionless(), 2.0).into(),
        ],
    )
    .unwrap();
    let three = Grid::ensemble(
        vec![0, 1, 2],
        (0..3)
            .map(|_| constant(&d, "x", Unit::dimensionless(), 1.0).into())
            .collect(),
    )
    .unwrap();
    let err = math().add(&two, &three, false).unwrap_err();
    assert!(matches!(err, GridMathError::IncompatibleDomain(_)));
}

// ============================================================================
// Temporal operators
// ============================================================================

fn ramp() -> Grid {
    let d = geographic(MIDLATITUDE_PATCH);
    series(
        time::hourly_times(5, 1),
        (1..=5)
            .map(|v| constant(&d, "x", Unit::dimensionless(), v as f32))
            .collect(),
    )
}

#[test]
fn test_running_average_endpoint_policies() {
    let m = math();

    let missing = m.time_running_average(&ramp(), 3, EndpointPolicy::Missing).unwrap();
    assert_samples_approx_eq!(
        &first_values(&missing),
        &[f32::NAN, 2.0, 3.0, 4.0, f32::NAN],
        1e-5
    );

    let cyclic = m.time_running_average(&ramp(), 3, EndpointPolicy::Cyclic).unwrap();
    assert_samples_approx_eq!(
        &first_values(&cyclic),
        &[8.0 / 3.0, 2.0, 3.0, 4.0, 10.0 / 3.0],
        1e-5
    );

    let symmetric = m.time_running_average(&ramp(), 3, EndpointPolicy::Symmetric).unwrap();
    assert_samples_approx_eq!(
        &first_values(&symmetric),
        &[5.0 / 3.0, 2.0, 3.0, 4.0, 13.0 / 3.0],
        1e-5
    );
}

#[test]
fn test_reduction_over_time_keeps_first_time() {
    let grid = ramp();
    let reduced = math()
        .apply_function_over_time(&grid, TimeFunction::Average, true)
        .unwrap();
    let seq = reduced.as_sequence().unwrap();
    assert_eq!(seq.len(), 1);
    assert_eq!(
        seq.axis(),
        &OuterAxis::Time(vec![time::hourly_times(1, 1)[0]])
    );
    assert_eq!(first_values(&reduced), vec![3.0]);

    let collapsed = math()
        .apply_function_over_time(&grid, TimeFunction::Max, false)
        .unwrap();
    assert!(collapsed.as_field().is_some());
    assert_eq!(first_values(&collapsed), vec![5.0]);
}

#[test]
fn test_time_step_difference_out_of_range_is_nan() {
    let diff = math().time_step_difference(&ramp(), 1).unwrap();
    let values = first_values(&diff);
    assert_eq!(&values[..4], &[-1.0, -1.0, -1.0, -1.0]);
    assert!(values[4].is_nan());
}

// ============================================================================
// Ensemble statistics
// ============================================================================

fn members(values: &[f32]) -> Grid {
    let d = geographic(MIDLATITUDE_PATCH);
    Grid::ensemble(
        (0..values.len() as i32).collect(),
        values
            .iter()
            .map(|&v| constant(&d, "x", Unit::meter(), v).into())
            .collect(),
    )
    .unwrap()
}

#[test]
fn test_percentile_boundaries() {
    let grid = members(&[4.0, 1.0, 3.0, 2.0, 5.0]);
    let m = math();

    let top = m
        .apply_function_over_members(&grid, MemberFunction::Percentile(100.0))
        .unwrap();
    assert_eq!(first_values(&top), vec![5.0]);

    let median = m
        .apply_function_over_members(&grid, MemberFunction::Percentile(50.0))
        .unwrap();
    assert_eq!(first_values(&median), vec![3.0]);

    let low = m
        .apply_function_over_members(&grid, MemberFunction::Percentile(1e-6))
        .unwrap();
    assert_approx_eq!(first_values(&low)[0], 1.0, 1e-5);

    for bad in [0.0, -5.0, 100.5, f64::NAN] {
        let err = m
            .apply_function_over_members(&grid, MemberFunction::Percentile(bad))
            .unwrap_err();
        assert!(matches!(err, GridMathError::InvalidArgument(_)), "p = {}", bad);
    }
}

#[test]
fn test_mode_degenerate_cases() {
    let m = math();

    let distinct = m
        .apply_function_over_members(&members(&[7.0, 3.0, 5.0]), MemberFunction::Mode)
        .unwrap();
    assert_eq!(first_values(&distinct), vec![7.0]);

    let repeated = m
        .apply_function_over_members(&members(&[7.0, 3.0, 3.0]), MemberFunction::Mode)
        .unwrap();
    assert_eq!(first_values(&repeated), vec![3.0]);

    let missing = m
        .apply_function_over_members(&members(&[f32::NAN, f32::NAN]), MemberFunction::Mode)
        .unwrap();
    assert!(first_values(&missing)[0].is_nan());
}

#[test]
fn test_member_functions_need_an_ensemble() {
    let d = geographic(MIDLATITUDE_PATCH);
    let single: Grid = constant(&d, "x", Unit::meter(), 1.0).into();
    let err = math()
        .apply_function_over_members(&single, MemberFunction::Average)
        .unwrap_err();
    assert!(matches!(err, GridMathError::InvalidArgument(_)));
}
