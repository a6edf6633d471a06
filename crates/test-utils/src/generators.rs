//! Test data generators for creating synthetic weather-like data.
//!
//! Every generator returns a flat buffer with x varying fastest, then y,
//! then z, which is the sample layout of a grid field. The patterns are
//! analytic so expected derivatives and interpolations can be written down
//! exactly.

/// Creates a test grid with predictable values.
///
/// Each cell value is calculated as: `i * 1000 + j`
///
/// This makes it easy to verify that data is being read, resampled or
/// transposed correctly by checking that `grid[j * nx + i] == i * 1000 + j`.
///
/// # Example
///
/// ```
/// use test_utils::create_test_grid;
///
/// let grid = create_test_grid(10, 5);
/// assert_eq!(grid.len(), 50);
/// assert_eq!(grid[0], 0.0);
/// assert_eq!(grid[1], 1000.0);
/// assert_eq!(grid[10], 1.0);
/// ```
pub fn create_test_grid(nx: usize, ny: usize) -> Vec<f32> {
    let mut data = Vec::with_capacity(nx * ny);
    for j in 0..ny {
        for i in 0..nx {
            data.push((i * 1000 + j) as f32);
        }
    }
    data
}

/// Creates a volume from a closure over `(i, j, k)`.
pub fn create_volume<F>(nx: usize, ny: usize, nz: usize, f: F) -> Vec<f32>
where
    F: Fn(usize, usize, usize) -> f32,
{
    let mut data = Vec::with_capacity(nx * ny * nz);
    for k in 0..nz {
        for j in 0..ny {
            for i in 0..nx {
                data.push(f(i, j, k));
            }
        }
    }
    data
}

/// Creates a test grid with temperature-like values in Kelvin.
///
/// The values range from approximately 250K to 310K, warming toward
/// larger `i` and `j`.
pub fn create_temperature_grid(nx: usize, ny: usize) -> Vec<f32> {
    let mut data = Vec::with_capacity(nx * ny);
    for j in 0..ny {
        for i in 0..nx {
            let x_factor = i as f32 / nx.max(1) as f32;
            let y_factor = j as f32 / ny.max(1) as f32;
            data.push(250.0 + x_factor * 30.0 + y_factor * 30.0);
        }
    }
    data
}

/// Solid-body rotation about the grid center: `u = -y`, `v = x`.
///
/// `x` and `y` are the coordinates `(i - cx) * dx` and `(j - cy) * dy` in
/// the grid's length unit, so the relative vorticity is exactly 2 per that
/// unit's inverse second and the divergence is zero.
///
/// # Returns
///
/// `(u, v)` buffers in m/s.
pub fn create_rotational_flow(nx: usize, ny: usize, dx: f64, dy: f64) -> (Vec<f32>, Vec<f32>) {
    let (cx, cy) = center(nx, ny);
    let mut u = Vec::with_capacity(nx * ny);
    let mut v = Vec::with_capacity(nx * ny);
    for j in 0..ny {
        for i in 0..nx {
            let x = (i as f64 - cx) * dx;
            let y = (j as f64 - cy) * dy;
            u.push(-y as f32);
            v.push(x as f32);
        }
    }
    (u, v)
}

/// Pure radial outflow: `u = x`, `v = y`.
///
/// Divergence is exactly 2 and relative vorticity zero.
pub fn create_divergent_flow(nx: usize, ny: usize, dx: f64, dy: f64) -> (Vec<f32>, Vec<f32>) {
    let (cx, cy) = center(nx, ny);
    let mut u = Vec::with_capacity(nx * ny);
    let mut v = Vec::with_capacity(nx * ny);
    for j in 0..ny {
        for i in 0..nx {
            u.push(((i as f64 - cx) * dx) as f32);
            v.push(((j as f64 - cy) * dy) as f32);
        }
    }
    (u, v)
}

fn center(nx: usize, ny: usize) -> (f64, f64) {
    (
        (nx.saturating_sub(1)) as f64 / 2.0,
        (ny.saturating_sub(1)) as f64 / 2.0,
    )
}

/// Potential temperature profile growing linearly with level index.
///
/// # Arguments
///
/// * `nx`, `ny` - Horizontal size; every column holds the same profile
/// * `nz` - Number of levels
/// * `surface` - Theta (K) of level 0
/// * `step` - Increase (K) per level; negative for a decreasing profile
pub fn create_theta_volume(nx: usize, ny: usize, nz: usize, surface: f32, step: f32) -> Vec<f32> {
    create_volume(nx, ny, nz, |_, _, k| surface + step * k as f32)
}

/// Temperatures (K) consistent with a constant potential temperature.
///
/// `T = theta * (p / 1000)^0.286` at each pressure level (hPa).
pub fn create_isentropic_temperatures(levels_hpa: &[f64], theta: f64) -> Vec<f64> {
    levels_hpa
        .iter()
        .map(|p| theta * (p / 1000.0).powf(0.286))
        .collect()
}

/// Creates a grid with relative humidity values in percent.
///
/// Values sweep from 10% to 100% along x. With `as_fraction` the same
/// pattern is returned on a 0..1 scale.
pub fn create_relative_humidity_grid(nx: usize, ny: usize, as_fraction: bool) -> Vec<f32> {
    let divisor = if as_fraction { 100.0 } else { 1.0 };
    let mut data = Vec::with_capacity(nx * ny);
    for _j in 0..ny {
        for i in 0..nx {
            let t = i as f32 / nx.saturating_sub(1).max(1) as f32;
            data.push((10.0 + 90.0 * t) / divisor);
        }
    }
    data
}

/// Creates a grid filled with a constant value.
pub fn create_constant_grid(nx: usize, ny: usize, value: f32) -> Vec<f32> {
    vec![value; nx * ny]
}

/// Creates a grid with NaN values at specified positions.
///
/// # Arguments
///
/// * `nx` - Number of columns
/// * `ny` - Number of rows
/// * `nan_positions` - List of `(i, j)` positions that should be NaN
///
/// # Returns
///
/// A `Vec<f32>` with NaN at specified positions, zeros elsewhere.
pub fn create_grid_with_nans(nx: usize, ny: usize, nan_positions: &[(usize, usize)]) -> Vec<f32> {
    let mut data = vec![0.0f32; nx * ny];
    for &(i, j) in nan_positions {
        if i < nx && j < ny {
            data[j * nx + i] = f32::NAN;
        }
    }
    data
}

/// Ensemble member samples `base + m * spread` for `m in 0..members`.
pub fn create_member_values(members: usize, base: f32, spread: f32) -> Vec<f32> {
    (0..members).map(|m| base + m as f32 * spread).collect()
}
