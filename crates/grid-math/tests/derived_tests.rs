//! Physical properties of the derived operators.

mod common;

use std::sync::Arc;

use common::*;
use grid_math::{
    DerivedGridFactory, GridMathConfig, GridMathError, GridSource, LevelSelection, MemorySource,
    TimeSelection, Unit, KAPPA,
};
use grid_math::{Grid, SpatialDomain};
use projection::{StandardAtmosphere, VerticalTransform};
use test_utils::fixtures::{
    grid::{MIDLATITUDE_PATCH, UNIT_PROJECTED},
    levels, time,
};
use test_utils::{
    assert_approx_eq, create_divergent_flow, create_isentropic_temperatures,
    create_rotational_flow, create_theta_volume, create_volume,
};

fn factory() -> DerivedGridFactory {
    DerivedGridFactory::with_config(GridMathConfig {
        parallel: false,
        ..Default::default()
    })
}

fn wind_pair(d: &Arc<SpatialDomain>, (u, v): (Vec<f32>, Vec<f32>)) -> (Grid, Grid) {
    (
        scalar(d, "u", Unit::meters_per_second(), u).into(),
        scalar(d, "v", Unit::meters_per_second(), v).into(),
    )
}

// ============================================================================
// Kinematics
// ============================================================================

#[test]
fn test_solid_body_rotation_vorticity() {
    init_tracing();
    let d = projected(UNIT_PROJECTED);
    let (u, v) = wind_pair(&d, create_rotational_flow(5, 5, 1.0, 1.0));
    let f = factory();

    let vorticity = f.create_relative_vorticity(&u, &v).unwrap();
    let field = vorticity.first_field();
    assert_eq!(field.unit(), &Unit::per_second());
    for &value in field.values() {
        assert_approx_eq!(value, 2.0, 1e-5);
    }

    let divergence = f.create_horizontal_divergence(&u, &v).unwrap();
    for &value in divergence.first_field().values() {
        assert_approx_eq!(value, 0.0, 1e-5);
    }
}

#[test]
fn test_kinematics_independent_of_storage_order() {
    // v grows eastward by 1 m/s per degree of longitude, u is calm
    let lon_lat = geographic(MIDLATITUDE_PATCH);
    let lat_lon = geographic_lat_lon(MIDLATITUDE_PATCH);
    let lons = MIDLATITUDE_PATCH.x_values();
    let f = factory();

    let (nx, ny) = (lon_lat.nx(), lon_lat.ny());
    let v_lon_lat: Vec<f32> = (0..nx * ny).map(|p| lons[p % nx] as f32).collect();
    let (u, v) = wind_pair(&lon_lat, (vec![0.0; nx * ny], v_lon_lat));
    let expected_vorticity = f.create_relative_vorticity(&u, &v).unwrap();
    let expected_divergence = f.create_horizontal_divergence(&u, &v).unwrap();

    // latitude runs along the first axis, longitude along the second
    let (nx, ny) = (lat_lon.nx(), lat_lon.ny());
    let v_lat_lon: Vec<f32> = (0..nx * ny).map(|p| lons[p / nx] as f32).collect();
    let (u, v) = wind_pair(&lat_lon, (vec![0.0; nx * ny], v_lat_lon));
    let vorticity = f.create_relative_vorticity(&u, &v).unwrap();
    let divergence = f.create_horizontal_divergence(&u, &v).unwrap();

    // centre point is index 12 in both layouts
    let expected = expected_vorticity.first_field().values()[12];
    assert!(expected > 1e-5 && expected < 1.5e-5, "vorticity {}", expected);
    assert_approx_eq!(vorticity.first_field().values()[12], expected, 1e-9);
    assert_approx_eq!(expected_divergence.first_field().values()[12], 0.0, 1e-12);
    for &value in divergence.first_field().values() {
        assert_approx_eq!(value, 0.0, 1e-12);
    }

    let t: Grid = scalar(&lat_lon, "T", Unit::kelvin(), latitude_ramp(&lat_lon)).into();
    let gradient = f.create_horizontal_gradient(&t).unwrap();
    let field = gradient.first_field();
    // T varies only with latitude, so the eastward component vanishes
    assert_approx_eq!(field.component(0)[12], 0.0, 1e-12);
    assert!(field.component(1)[12] > 0.0);
}

/// Temperature rising 1 K per degree of latitude on a latitude-first domain.
fn latitude_ramp(d: &Arc<SpatialDomain>) -> Vec<f32> {
    let lats = d.x().values();
    (0..d.len()).map(|p| lats[p % d.nx()] as f32).collect()
}

#[test]
fn test_radial_outflow_divergence() {
    let d = projected(UNIT_PROJECTED);
    let (u, v) = wind_pair(&d, create_divergent_flow(5, 5, 1.0, 1.0));
    let f = factory();

    let divergence = f.create_horizontal_divergence(&u, &v).unwrap();
    for &value in divergence.first_field().values() {
        assert_approx_eq!(value, 2.0, 1e-5);
    }
    let vorticity = f.create_relative_vorticity(&u, &v).unwrap();
    for &value in vorticity.first_field().values() {
        assert_approx_eq!(value, 0.0, 1e-5);
    }
}

#[test]
fn test_vorticity_over_time_sequence() {
    let d = projected(UNIT_PROJECTED);
    let times = time::hourly_times(2, 3);
    let (u0, v0) = create_rotational_flow(5, 5, 1.0, 1.0);
    let doubled = |values: &[f32]| values.iter().map(|x| 2.0 * x).collect::<Vec<f32>>();

    let u = series(
        times.clone(),
        vec![
            scalar(&d, "u", Unit::meters_per_second(), u0.clone()),
            scalar(&d, "u", Unit::meters_per_second(), doubled(&u0)),
        ],
    );
    let v = series(
        times,
        vec![
            scalar(&d, "v", Unit::meters_per_second(), v0.clone()),
            scalar(&d, "v", Unit::meters_per_second(), doubled(&v0)),
        ],
    );

    let vorticity = factory().create_relative_vorticity(&u, &v).unwrap();
    assert_eq!(vorticity.as_sequence().unwrap().len(), 2);
    let centers: Vec<f32> = vorticity.fields().iter().map(|f| f.values()[12]).collect();
    assert_approx_eq!(centers[0], 2.0, 1e-5);
    assert_approx_eq!(centers[1], 4.0, 1e-5);
}

#[test]
fn test_wind_speed_and_direction() {
    let d = projected(UNIT_PROJECTED);
    let (u, v) = wind_pair(&d, (vec![-3.0; 25], vec![-4.0; 25]));
    let f = factory();
    let flow = f.create_flow_vectors(&u, &v).unwrap();
    assert!(flow.range().is_vector());

    let speed = f.create_vector_magnitude(&flow).unwrap();
    assert_approx_eq!(speed.first_field().values()[0], 5.0, 1e-5);

    // blowing toward the south-west means coming from the north-east
    let direction = f.create_vector_direction(&flow).unwrap();
    let degrees = direction.first_field().values()[0];
    assert!(degrees > 0.0 && degrees < 90.0, "direction {}", degrees);
}

// ============================================================================
// Vertical conversions
// ============================================================================

#[test]
fn test_pressure_height_round_trip() {
    let d = geographic(MIDLATITUDE_PATCH);
    let pressures: Vec<f32> = (0..d.len()).map(|n| 1000.0 - 35.0 * n as f32).collect();
    let p: Grid = scalar(&d, "p", Unit::hectopascal(), pressures.clone()).into();
    let f = factory();

    let z = f.convert_pressure_to_height(&p).unwrap();
    assert_eq!(z.first_field().unit(), &Unit::meter());
    let back = f.convert_height_to_pressure(&z).unwrap();
    for (original, restored) in pressures.iter().zip(back.first_field().values()) {
        assert_approx_eq!(*restored, *original, 1e-2);
    }
}

#[test]
fn test_rising_air_has_positive_w() {
    let surface = projected(UNIT_PROJECTED);
    let d = with_pressure_levels(&surface, &levels::SHORT_COLUMN_HPA);
    let omega: Grid = constant(&d, "omega", Unit::pascals_per_second(), -1.0).into();

    let w = factory()
        .convert_pressure_velocity_to_height_velocity(&omega, None)
        .unwrap();
    let field = w.first_field();
    assert_eq!(field.unit(), &Unit::meters_per_second());
    for &value in field.values() {
        assert!(value > 0.05 && value < 0.2, "w = {}", value);
    }
}

// ============================================================================
// Thermodynamics and theta surfaces
// ============================================================================

#[test]
fn test_isentropic_column_has_constant_theta() {
    let surface = geographic(MIDLATITUDE_PATCH);
    let d = with_pressure_levels(&surface, &levels::MANDATORY_HPA);
    let temperatures = create_isentropic_temperatures(&levels::MANDATORY_HPA, 300.0);
    let t: Grid = scalar(
        &d,
        "T",
        Unit::kelvin(),
        create_volume(d.nx(), d.ny(), d.nz(), |_, _, k| temperatures[k] as f32),
    )
    .into();

    let theta = factory().create_potential_temperature_from_levels(&t).unwrap();
    for &value in theta.first_field().values() {
        assert_approx_eq!(value, 300.0, 1e-3);
    }
    assert!((KAPPA - 0.286).abs() < 1e-12);
}

#[test]
fn test_theta_surface_boundaries() {
    let surface = geographic(MIDLATITUDE_PATCH);
    let d = with_pressure_levels(&surface, &levels::SHORT_COLUMN_HPA);
    let (nx, ny) = (d.nx(), d.ny());
    let theta: Grid = scalar(&d, "theta", Unit::kelvin(), create_theta_volume(nx, ny, 3, 290.0, 5.0)).into();
    let f = factory();

    // top of the profile is still inside the column
    let top = f.extract_height_over_theta_surface(&theta, 300.0).unwrap();
    let expected = StandardAtmosphere::new().pressure_to_height(700.0);
    assert_approx_eq!(top.first_field().values()[0], expected, 0.5);

    // bottom likewise
    let bottom = f.extract_height_over_theta_surface(&theta, 290.0).unwrap();
    let expected = StandardAtmosphere::new().pressure_to_height(1000.0);
    assert_approx_eq!(bottom.first_field().values()[0], expected, 0.5);

    // just outside gives NaN everywhere, not an error
    let above = f.extract_height_over_theta_surface(&theta, 300.01).unwrap();
    assert!(above.first_field().values().iter().all(|v| v.is_nan()));
    let below = f.extract_height_over_theta_surface(&theta, 289.99).unwrap();
    assert!(below.first_field().values().iter().all(|v| v.is_nan()));
}

#[test]
fn test_ipv_needs_vertical_coordinate() {
    let d = geographic(MIDLATITUDE_PATCH);
    let t: Grid = constant(&d, "T", Unit::kelvin(), 250.0).into();
    let u: Grid = constant(&d, "u", Unit::meters_per_second(), 0.0).into();
    let err = factory().create_ipv(&t, &u, &u).unwrap_err();
    assert!(matches!(err, GridMathError::MissingCoordinate(_)));
}

// ============================================================================
// Source boundary
// ============================================================================

#[test]
fn test_source_level_selection_feeds_factory() {
    let surface = geographic(MIDLATITUDE_PATCH);
    let d = with_pressure_levels(&surface, &levels::SHORT_COLUMN_HPA);
    let t: Grid = constant(&d, "T", Unit::kelvin(), 280.0).into();
    let source = MemorySource::new().with_grid("temperature", t).unwrap();

    let slice = source
        .read_grid("temperature", &TimeSelection::All, &LevelSelection::Level(850.0))
        .unwrap();
    assert_eq!(slice.first_field().domain().nz(), 1);

    let theta = factory().create_potential_temperature_from_levels(&slice).unwrap();
    let expected = 280.0 * (1000.0f64 / 850.0).powf(KAPPA);
    assert_approx_eq!(theta.first_field().values()[0], expected, 1e-3);

    let missing = source.read_grid("humidity", &TimeSelection::All, &LevelSelection::All);
    assert!(missing.is_err());
}
