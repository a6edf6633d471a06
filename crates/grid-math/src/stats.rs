//! Elementwise statistics over a set of samples (time steps or members).
//!
//! All functions skip NaN inputs; a set with no valid value gives NaN.

use crate::error::{GridMathError, Result};
use crate::types::{MemberFunction, TimeFunction};

fn valid(values: &[f32]) -> impl Iterator<Item = f64> + '_ {
    values.iter().filter(|v| !v.is_nan()).map(|&v| f64::from(v))
}

/// Average, sum, min, max or population standard deviation.
pub fn reduce(values: &[f32], function: TimeFunction) -> f32 {
    let mut count = 0usize;
    let mut sum = 0.0f64;
    let mut min = f64::INFINITY;
    let mut max = f64::NEG_INFINITY;
    for v in valid(values) {
        count += 1;
        sum += v;
        min = min.min(v);
        max = max.max(v);
    }
    if count == 0 {
        return f32::NAN;
    }
    let n = count as f64;
    let result = match function {
        TimeFunction::Average => sum / n,
        TimeFunction::Sum => sum,
        TimeFunction::Min => min,
        TimeFunction::Max => max,
        TimeFunction::StdDev => {
            let mean = sum / n;
            let variance = valid(values).map(|v| (v - mean).powi(2)).sum::<f64>() / n;
            variance.sqrt()
        }
    };
    result as f32
}

/// Check a percentile argument: `0 < p <= 100`.
pub fn validate_percentile(percentile: f64) -> Result<()> {
    if percentile > 0.0 && percentile <= 100.0 {
        Ok(())
    } else {
        Err(GridMathError::invalid_argument(format!(
            "percentile must be in (0, 100], got {}",
            percentile
        )))
    }
}

/// Inclusive linear-interpolation percentile.
///
/// The rank of `p` among `n` sorted values is `p / 100 * (n - 1)`, so
/// `p = 100` is the maximum and small `p` approach the minimum.
pub fn evaluate_percentile(values: &[f32], percentile: f64) -> Result<f32> {
    validate_percentile(percentile)?;
    let mut sorted: Vec<f64> = valid(values).collect();
    if sorted.is_empty() {
        return Ok(f32::NAN);
    }
    sorted.sort_by(f64::total_cmp);
    let n = sorted.len();
    if n == 1 {
        return Ok(sorted[0] as f32);
    }
    let rank = percentile / 100.0 * (n - 1) as f64;
    let lo = rank.floor() as usize;
    let hi = rank.ceil().min((n - 1) as f64) as usize;
    let value = sorted[lo] + (rank - lo as f64) * (sorted[hi] - sorted[lo]);
    Ok(value as f32)
}

/// Most frequent value under exact equality; the earliest value wins ties.
pub fn evaluate_mode(values: &[f32]) -> f32 {
    let mut counts: Vec<(f32, usize)> = Vec::new();
    for &v in values.iter().filter(|v| !v.is_nan()) {
        match counts.iter_mut().find(|(seen, _)| *seen == v) {
            Some((_, count)) => *count += 1,
            None => counts.push((v, 1)),
        }
    }
    let mut best: Option<(f32, usize)> = None;
    for &(v, count) in &counts {
        if best.map_or(true, |(_, c)| count > c) {
            best = Some((v, count));
        }
    }
    best.map_or(f32::NAN, |(v, _)| v)
}

/// P(value < threshold) from a weighted empirical CDF.
///
/// Values within `tolerance` (relative) of each other are merged into one
/// node at their mean, weighted by how many values it absorbed. The CDF at
/// a node is `(weight below + weight / 2) / n` and is linear between nodes;
/// below the smallest node it is 0 and above the largest 1.
pub fn univariate_probability(values: &[f32], threshold: f64, tolerance: f64) -> f32 {
    let mut sorted: Vec<f64> = valid(values).collect();
    if sorted.is_empty() || threshold.is_nan() {
        return f32::NAN;
    }
    sorted.sort_by(f64::total_cmp);

    // (node value, weight)
    let mut nodes: Vec<(f64, f64)> = Vec::new();
    let mut group_sum = sorted[0];
    let mut group_count = 1usize;
    let mut group_start = sorted[0];
    for &v in &sorted[1..] {
        let scale = group_start.abs().max(v.abs()).max(f64::MIN_POSITIVE);
        if (v - group_start).abs() <= tolerance * scale {
            group_sum += v;
            group_count += 1;
        } else {
            nodes.push((group_sum / group_count as f64, group_count as f64));
            group_sum = v;
            group_count = 1;
            group_start = v;
        }
    }
    nodes.push((group_sum / group_count as f64, group_count as f64));

    let total = sorted.len() as f64;
    let mut cumulative = 0.0;
    let cdf: Vec<(f64, f64)> = nodes
        .iter()
        .map(|&(value, weight)| {
            let p = (cumulative + weight / 2.0) / total;
            cumulative += weight;
            (value, p)
        })
        .collect();

    let (first_value, first_p) = cdf[0];
    let (last_value, last_p) = cdf[cdf.len() - 1];
    if threshold < first_value {
        return 0.0;
    }
    if threshold > last_value {
        return 1.0;
    }
    if threshold == first_value {
        return first_p as f32;
    }
    if threshold == last_value {
        return last_p as f32;
    }
    for pair in cdf.windows(2) {
        let (v0, p0) = pair[0];
        let (v1, p1) = pair[1];
        if threshold >= v0 && threshold <= v1 {
            let w = (threshold - v0) / (v1 - v0);
            return (p0 + w * (p1 - p0)) as f32;
        }
    }
    f32::NAN
}

/// Evaluate an ensemble statistic. Percentile arguments are checked here
/// too, but operators validate them before touching any data.
pub fn evaluate(values: &[f32], function: MemberFunction, tolerance: f64) -> Result<f32> {
    Ok(match function {
        MemberFunction::Average => reduce(values, TimeFunction::Average),
        MemberFunction::Sum => reduce(values, TimeFunction::Sum),
        MemberFunction::Min => reduce(values, TimeFunction::Min),
        MemberFunction::Max => reduce(values, TimeFunction::Max),
        MemberFunction::StdDev => reduce(values, TimeFunction::StdDev),
        MemberFunction::Percentile(p) => evaluate_percentile(values, p)?,
        MemberFunction::Mode => evaluate_mode(values),
        MemberFunction::UnivariateProbability { threshold } => {
            univariate_probability(values, threshold, tolerance)
        }
    })
}
