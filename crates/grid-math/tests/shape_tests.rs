//! Shape utilities, masking and combination on nested grids.

mod common;

use common::*;
use grid_math::{
    classify, make_2d_grid_from_slice, set_param_type, slice_grid_at_level, DerivedGridFactory,
    Grid, GridMathError, InterpolationMethod, QuantityTag, RangeType, Unit,
};
use test_utils::fixtures::{grid::MIDLATITUDE_PATCH, levels, time};
use test_utils::{assert_approx_eq, create_grid_with_nans, create_test_grid, create_volume};

fn temperature_volume() -> Grid {
    let surface = geographic(MIDLATITUDE_PATCH);
    let d = with_pressure_levels(&surface, &levels::SHORT_COLUMN_HPA);
    scalar(
        &d,
        "T",
        Unit::kelvin(),
        create_volume(d.nx(), d.ny(), d.nz(), |_, _, k| 290.0 - 10.0 * k as f32),
    )
    .into()
}

#[test]
fn test_slice_then_demote_to_2d() {
    init_tracing();
    let volume = temperature_volume();
    let slice = slice_grid_at_level(
        &volume,
        775.0,
        &Unit::hectopascal(),
        InterpolationMethod::Bilinear,
        false,
    )
    .unwrap();
    let c = classify(&slice).unwrap();
    assert!(c.is_3d && !c.is_volume);
    assert_approx_eq!(slice.first_field().values()[0], 275.0, 1e-4);

    let flat = make_2d_grid_from_slice(&slice, false).unwrap();
    let c = classify(&flat).unwrap();
    assert!(!c.is_3d);
    assert_eq!(flat.first_field().values(), slice.first_field().values());
}

#[test]
fn test_slice_level_in_other_units() {
    let volume = temperature_volume();
    let slice = slice_grid_at_level(
        &volume,
        85_000.0,
        &Unit::pascal(),
        InterpolationMethod::Nearest,
        false,
    )
    .unwrap();
    assert_eq!(slice.first_field().values()[0], 280.0);

    let err = slice_grid_at_level(&volume, 1.0, &Unit::meter(), InterpolationMethod::Nearest, false)
        .unwrap_err();
    assert!(matches!(err, GridMathError::IncompatibleDomain(_)));
}

#[test]
fn test_set_param_type_keeps_samples() {
    let volume = temperature_volume();
    let renamed = set_param_type(
        &volume,
        &RangeType::scalar(QuantityTag::new("air_temperature", Unit::kelvin())),
        false,
    )
    .unwrap();
    assert_eq!(renamed.range().components()[0].name(), "air_temperature");
    assert_eq!(renamed.first_field().values(), volume.first_field().values());
}

#[test]
fn test_mask_with_nan_and_sentinel() {
    let d = geographic(MIDLATITUDE_PATCH);
    let (nx, ny) = (d.nx(), d.ny());
    let data = series(
        time::hourly_times(2, 1),
        vec![
            scalar(&d, "x", Unit::meter(), create_test_grid(nx, ny)),
            scalar(&d, "x", Unit::meter(), create_test_grid(nx, ny)),
        ],
    );
    let mut mask_values = create_grid_with_nans(nx, ny, &[(0, 0)]);
    mask_values[1] = -999.0;
    let mask: Grid = scalar(&d, "land", Unit::dimensionless(), mask_values).into();

    let masked = DerivedGridFactory::default().mask(&data, &mask, -999.0).unwrap();
    assert_eq!(masked.as_sequence().unwrap().len(), 2);
    for field in masked.fields() {
        assert!(field.values()[0].is_nan());
        assert!(field.values()[1].is_nan());
        assert_eq!(field.values()[2], 2000.0);
    }
}

#[test]
fn test_combine_three_grids() {
    let d = geographic(MIDLATITUDE_PATCH);
    let u: Grid = constant(&d, "u", Unit::meters_per_second(), 1.0).into();
    let v: Grid = constant(&d, "v", Unit::meters_per_second(), 2.0).into();
    let t: Grid = constant(&d, "T", Unit::kelvin(), 280.0).into();

    let combined = DerivedGridFactory::default()
        .combine_grids(&[&u, &v, &t])
        .unwrap();
    let field = combined.first_field();
    assert_eq!(field.component_count(), 3);
    assert_eq!(field.component(2)[0], 280.0);
    assert!(!combined.range().is_vector());

    let err = DerivedGridFactory::default().combine_grids(&[&u]).unwrap_err();
    assert!(matches!(err, GridMathError::InvalidArgument(_)));
}
