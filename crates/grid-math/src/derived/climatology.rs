//! Day-of-year climatologies and anomalies.

use std::collections::BTreeMap;

use grid_common::{QuantityTag, Unit};

use super::DerivedGridFactory;
use crate::algebra::{align_pair, combine_fields, reduce_fields, BinaryOp};
use crate::cache::CallCache;
use crate::classify::classify;
use crate::error::{GridMathError, Result};
use crate::grid::{Field, Grid, OuterAxis, RangeType};
use crate::stats;
use crate::structure::{map_indices, time_columns, TimeColumns};
use crate::types::{InterpolationMethod, TimeFunction};

const LEAP_DAY: u32 = 366;

impl DerivedGridFactory {
    /// Average same-day-of-year samples across years.
    ///
    /// The result is a sequence over an index axis holding the days of year
    /// (1..=366) present in the input, in increasing order. Missing values
    /// are skipped; a day with no valid sample at a point gives NaN there.
    pub fn create_daily_climatology(&self, grid: &Grid) -> Result<Grid> {
        classify(grid)?;
        let columns = time_columns(grid)?;
        let cache = CallCache::new();
        let days = cache.day_of_year_table(&columns.axis)?;

        let mut buckets: BTreeMap<u32, Vec<usize>> = BTreeMap::new();
        for (t, &day) in days.iter().enumerate() {
            buckets.entry(day).or_default().push(t);
        }
        tracing::debug!(
            steps = columns.steps(),
            days = buckets.len(),
            "building daily climatology"
        );

        let method = self.config().interpolation;
        let averaged = map_indices(columns.columns.len(), self.config().parallel, |m| {
            let column = &columns.columns[m];
            buckets
                .values()
                .map(|steps| {
                    let samples: Vec<Field> = steps.iter().map(|&t| column[t].clone()).collect();
                    reduce_fields(&samples, method, |values| {
                        Ok(stats::reduce(values, TimeFunction::Average))
                    })
                })
                .collect::<Result<Vec<_>>>()
        })?;

        let axis = OuterAxis::Index(buckets.keys().map(|&d| f64::from(d)).collect());
        columns.rebuild(axis, averaged)
    }

    /// Departure of `grid` from a daily climatology.
    ///
    /// Each time step is matched with the climatology entry for its day of
    /// year and either differenced (`data - normal`) or, with
    /// `percent_of_normal`, expressed as `100 * data / normal`. A Feb 29 step
    /// against a climatology without day 366 uses the average of days 365
    /// and 1; other days missing from the climatology give NaN.
    pub fn calculate_daily_anomaly(
        &self,
        grid: &Grid,
        climatology: &Grid,
        percent_of_normal: bool,
    ) -> Result<Grid> {
        classify(grid)?;
        classify(climatology)?;
        let data = time_columns(grid)?;
        let normals = time_columns(climatology)?;
        if let (Some(a), Some(b)) = (&data.members, &normals.members) {
            if a.len() != b.len() {
                return Err(GridMathError::incompatible_domain(format!(
                    "ensembles of {} and {} members cannot be paired",
                    a.len(),
                    b.len()
                )));
            }
        }

        let cache = CallCache::new();
        let days = cache.day_of_year_table(&data.axis)?;
        let lookup = climatology_days(&normals, &cache)?;
        let method = self.config().interpolation;

        if days.contains(&LEAP_DAY) && !lookup.contains_key(&LEAP_DAY) {
            tracing::warn!("climatology has no day 366, using the mean of days 365 and 1");
        }
        tracing::debug!(
            steps = data.steps(),
            percent_of_normal,
            "computing daily anomaly"
        );

        let anomalies = map_indices(data.columns.len(), self.config().parallel, |m| {
            let normal_column = if normals.columns.len() == 1 {
                &normals.columns[0]
            } else {
                &normals.columns[m]
            };
            let leap_proxy = match (lookup.get(&365), lookup.get(&1)) {
                (Some(&last), Some(&first)) if !lookup.contains_key(&LEAP_DAY) => Some(
                    reduce_fields(
                        &[normal_column[last].clone(), normal_column[first].clone()],
                        method,
                        |values| Ok(stats::reduce(values, TimeFunction::Average)),
                    )?,
                ),
                _ => None,
            };

            data.columns[m]
                .iter()
                .zip(days.iter())
                .map(|(field, &day)| {
                    let normal = match lookup.get(&day) {
                        Some(&idx) => normal_column[idx].clone(),
                        None => match (&leap_proxy, day) {
                            (Some(proxy), LEAP_DAY) => proxy.clone(),
                            _ => {
                                tracing::warn!(day, "no climatology for day of year");
                                return Ok(field.filled(f32::NAN));
                            }
                        },
                    };
                    if percent_of_normal {
                        percent_of(field, &normal, method)
                    } else {
                        combine_fields(field, &normal, BinaryOp::Subtract, method)
                    }
                })
                .collect::<Result<Vec<_>>>()
        })?;

        data.rebuild(data.axis.clone(), anomalies)
    }
}

/// Day of year -> position in the climatology's columns.
fn climatology_days(normals: &TimeColumns, cache: &CallCache) -> Result<BTreeMap<u32, usize>> {
    let days: Vec<u32> = match &normals.axis {
        OuterAxis::Time(_) => cache.day_of_year_table(&normals.axis)?.to_vec(),
        OuterAxis::Index(values) => values
            .iter()
            .map(|&d| {
                if d.fract() == 0.0 && (1.0..=366.0).contains(&d) {
                    Ok(d as u32)
                } else {
                    Err(GridMathError::invalid_argument(format!(
                        "climatology index {} is not a day of year",
                        d
                    )))
                }
            })
            .collect::<Result<_>>()?,
    };
    Ok(days.into_iter().enumerate().map(|(i, d)| (d, i)).collect())
}

/// `100 * a / b`, with B read in A's units.
fn percent_of(a: &Field, b: &Field, method: InterpolationMethod) -> Result<Field> {
    let (a, b) = align_pair(a, b, method)?;
    let (na, nb) = (a.component_count(), b.component_count());
    if nb != 1 && nb != na {
        return Err(GridMathError::incompatible_domain(format!(
            "cannot compare {}-component data with a {}-component climatology",
            na, nb
        )));
    }

    let mut tags = Vec::with_capacity(na);
    let mut samples = Vec::with_capacity(na);
    for c in 0..na {
        let tag = &a.range().components()[c];
        let values = a.component_in(c, tag.unit())?;
        let normals = b.component_in(if nb == 1 { 0 } else { c }, tag.unit())?;
        samples.push(
            values
                .iter()
                .zip(&normals)
                .map(|(x, n)| (100.0 * x / n) as f32)
                .collect(),
        );
        tags.push(QuantityTag::new(
            format!("percent_of_normal({})", tag.name()),
            Unit::percent(),
        ));
    }
    Field::new(a.domain_arc().clone(), RangeType::new(tags)?, samples)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::GridMathConfig;
    use crate::grid::{Axis, SpatialDomain};
    use chrono::{DateTime, TimeZone, Utc};
    use std::sync::Arc;

    fn factory() -> DerivedGridFactory {
        DerivedGridFactory::with_config(GridMathConfig {
            parallel: false,
            ..Default::default()
        })
    }

    fn domain() -> Arc<SpatialDomain> {
        Arc::new(
            SpatialDomain::geographic(
                Axis::linear(0.0, 1.0, 2).unwrap(),
                Axis::linear(0.0, 1.0, 1).unwrap(),
            )
            .unwrap(),
        )
    }

    fn field(d: &Arc<SpatialDomain>, value: f32) -> Grid {
        Field::scalar(
            d.clone(),
            QuantityTag::new("T", Unit::kelvin()),
            vec![value; 2],
        )
        .unwrap()
        .into()
    }

    fn day(y: i32, m: u32, d: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, 12, 0, 0).unwrap()
    }

    fn series(times: Vec<DateTime<Utc>>, values: &[f32]) -> Grid {
        let d = domain();
        Grid::time_sequence(times, values.iter().map(|&v| field(&d, v)).collect()).unwrap()
    }

    fn index_series(days: &[f64], values: &[f32]) -> Grid {
        let d = domain();
        Grid::index_sequence(days.to_vec(), values.iter().map(|&v| field(&d, v)).collect())
            .unwrap()
    }

    fn first_values(grid: &Grid) -> Vec<f32> {
        grid.fields().iter().map(|f| f.values()[0]).collect()
    }

    #[test]
    fn test_daily_climatology_averages_same_day() {
        let times = vec![
            day(2021, 1, 1),
            day(2021, 1, 2),
            day(2022, 1, 1),
            day(2022, 1, 2),
            day(2023, 1, 1),
        ];
        let grid = series(times, &[270.0, 280.0, 272.0, 282.0, 274.0]);
        let clim = factory().create_daily_climatology(&grid).unwrap();

        let seq = clim.as_sequence().unwrap();
        assert_eq!(seq.axis(), &OuterAxis::Index(vec![1.0, 2.0]));
        assert_eq!(first_values(&clim), vec![272.0, 281.0]);
    }

    #[test]
    fn test_daily_climatology_skips_missing() {
        let times = vec![day(2021, 3, 1), day(2022, 3, 1)];
        let grid = series(times, &[f32::NAN, 290.0]);
        let clim = factory().create_daily_climatology(&grid).unwrap();
        assert_eq!(first_values(&clim), vec![290.0]);
    }

    #[test]
    fn test_climatology_needs_time_axis() {
        let grid = index_series(&[1.0, 2.0], &[1.0, 2.0]);
        let err = factory().create_daily_climatology(&grid).unwrap_err();
        assert!(matches!(err, GridMathError::InvalidArgument(_)));
    }

    #[test]
    fn test_anomaly_difference_and_percent() {
        let clim = index_series(&[1.0, 2.0], &[270.0, 280.0]);
        let data = series(vec![day(2024, 1, 1), day(2024, 1, 2)], &[275.0, 280.0]);

        let anomaly = factory().calculate_daily_anomaly(&data, &clim, false).unwrap();
        assert_eq!(first_values(&anomaly), vec![5.0, 0.0]);
        assert!(anomaly.as_sequence().unwrap().axis().is_time());

        let percent = factory().calculate_daily_anomaly(&data, &clim, true).unwrap();
        let values = first_values(&percent);
        assert!((values[0] - 101.851_85).abs() < 1e-3);
        assert!((values[1] - 100.0).abs() < 1e-4);
        assert_eq!(percent.first_field().unit(), &Unit::percent());
    }

    #[test]
    fn test_leap_day_uses_proxy() {
        let days: Vec<f64> = (1..=365).map(f64::from).collect();
        let values: Vec<f32> = (1..=365)
            .map(|d| match d {
                1 => 260.0,
                365 => 270.0,
                _ => 280.0,
            })
            .collect();
        let clim = index_series(&days, &values);
        // Dec 31 2024 is day 366
        let data = series(vec![day(2024, 12, 30), day(2024, 12, 31)], &[270.0, 265.0]);

        let anomaly = factory().calculate_daily_anomaly(&data, &clim, false).unwrap();
        let values = first_values(&anomaly);
        assert_eq!(values[0], 0.0);
        assert_eq!(values[1], 0.0);
    }

    #[test]
    fn test_missing_day_gives_nan() {
        let clim = index_series(&[1.0], &[270.0]);
        let data = series(vec![day(2023, 1, 1), day(2023, 1, 2)], &[271.0, 272.0]);
        let anomaly = factory().calculate_daily_anomaly(&data, &clim, false).unwrap();
        let values = first_values(&anomaly);
        assert_eq!(values[0], 1.0);
        assert!(values[1].is_nan());
    }
}
