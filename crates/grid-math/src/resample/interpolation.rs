//! Interpolation kernels over one horizontal plane.
//!
//! A plane is `width * height` samples, x fastest. Positions are fractional
//! indices; positions outside the plane give NaN.

use crate::types::InterpolationMethod;

#[inline]
fn outside(width: usize, height: usize, x: f64, y: f64) -> bool {
    !(x >= 0.0 && y >= 0.0 && x <= (width - 1) as f64 && y <= (height - 1) as f64)
}

/// Nearest neighbor interpolation.
///
/// Returns the value of the nearest grid point.
pub fn nearest_interpolate(data: &[f32], width: usize, height: usize, x: f64, y: f64) -> f32 {
    if width == 0 || height == 0 || outside(width, height, x, y) {
        return f32::NAN;
    }
    let col = (x.round() as usize).min(width - 1);
    let row = (y.round() as usize).min(height - 1);
    data[row * width + col]
}

/// Bilinear interpolation.
///
/// Smoothly interpolates between the four nearest grid points.
pub fn bilinear_interpolate(data: &[f32], width: usize, height: usize, x: f64, y: f64) -> f32 {
    if width == 0 || height == 0 || outside(width, height, x, y) {
        return f32::NAN;
    }
    let x0 = x.floor() as usize;
    let y0 = y.floor() as usize;
    let x1 = (x0 + 1).min(width - 1);
    let y1 = (y0 + 1).min(height - 1);

    let xf = x - x0 as f64;
    let yf = y - y0 as f64;

    let v00 = data[y0 * width + x0];
    let v10 = data[y0 * width + x1];
    let v01 = data[y1 * width + x0];
    let v11 = data[y1 * width + x1];

    // Exactly on a grid point the neighbours do not matter
    if xf == 0.0 && yf == 0.0 {
        return v00;
    }

    // Handle NaN values - if any corner is NaN, return NaN
    if v00.is_nan() || v10.is_nan() || v01.is_nan() || v11.is_nan() {
        return f32::NAN;
    }

    let (v00, v10, v01, v11) = (
        f64::from(v00),
        f64::from(v10),
        f64::from(v01),
        f64::from(v11),
    );
    let top = v00 * (1.0 - xf) + v10 * xf;
    let bottom = v01 * (1.0 - xf) + v11 * xf;
    (top * (1.0 - yf) + bottom * yf) as f32
}

/// Bicubic interpolation.
///
/// Uses 16 surrounding points for smoother interpolation, falling back to
/// bilinear when any of them is NaN.
pub fn cubic_interpolate(data: &[f32], width: usize, height: usize, x: f64, y: f64) -> f32 {
    if width == 0 || height == 0 || outside(width, height, x, y) {
        return f32::NAN;
    }
    let xi = x.floor() as i64;
    let yi = y.floor() as i64;

    let xf = x - xi as f64;
    let yf = y - yi as f64;

    let mut values = [[0.0f64; 4]; 4];

    for j in 0..4 {
        for i in 0..4 {
            let px = (xi + i - 1).clamp(0, width as i64 - 1) as usize;
            let py = (yi + j - 1).clamp(0, height as i64 - 1) as usize;
            let v = data[py * width + px];

            if v.is_nan() {
                return bilinear_interpolate(data, width, height, x, y);
            }
            values[j as usize][i as usize] = f64::from(v);
        }
    }

    let mut row_values = [0.0f64; 4];
    for (j, row) in values.iter().enumerate() {
        row_values[j] = cubic_1d(row[0], row[1], row[2], row[3], xf);
    }

    cubic_1d(row_values[0], row_values[1], row_values[2], row_values[3], yf) as f32
}

/// 1D cubic interpolation using Catmull-Rom spline.
fn cubic_1d(p0: f64, p1: f64, p2: f64, p3: f64, t: f64) -> f64 {
    let t2 = t * t;
    let t3 = t2 * t;

    let a = -0.5 * p0 + 1.5 * p1 - 1.5 * p2 + 0.5 * p3;
    let b = p0 - 2.5 * p1 + 2.0 * p2 - 0.5 * p3;
    let c = -0.5 * p0 + 0.5 * p2;
    let d = p1;

    a * t3 + b * t2 + c * t + d
}

/// Sample a plane with the given method.
#[inline]
pub fn interpolate(
    data: &[f32],
    width: usize,
    height: usize,
    x: f64,
    y: f64,
    method: InterpolationMethod,
) -> f32 {
    match method {
        InterpolationMethod::Nearest => nearest_interpolate(data, width, height, x, y),
        InterpolationMethod::Bilinear => bilinear_interpolate(data, width, height, x, y),
        InterpolationMethod::Cubic => cubic_interpolate(data, width, height, x, y),
    }
}

/// Linear blend `a + w * (b - a)`; `w == 0` returns `a` even if `b` is NaN.
#[inline]
pub fn lerp(a: f32, b: f32, w: f64) -> f32 {
    if w == 0.0 {
        a
    } else if w == 1.0 {
        b
    } else {
        (f64::from(a) + w * (f64::from(b) - f64::from(a))) as f32
    }
}
