//! Memoization scoped to one top-level operator call.
//!
//! Latitude grids, north-rotation angles and day-of-year tables are costly
//! to rebuild for every leaf of a long sequence on a constant domain. A
//! [`CallCache`] is created by an operator, shared by its leaf computations
//! and dropped when the call returns; nothing survives across calls.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use grid_common::day_of_year;

use crate::error::{GridMathError, Result};
use crate::grid::{HorizontalCoordinates, OuterAxis, SpatialDomain};
use crate::types::CacheStats;

/// Per-point horizontal quantities derivable from a domain.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GeometryKind {
    Latitude,
    Longitude,
    /// Clockwise angle from grid +y to true north (radians).
    NorthAngle,
}

type GeometryEntry = (Arc<SpatialDomain>, GeometryKind, Arc<[f64]>);

/// Call-scoped memo table.
#[derive(Default)]
pub struct CallCache {
    geometry: Mutex<Vec<GeometryEntry>>,
    day_tables: Mutex<Vec<(OuterAxis, Arc<[u32]>)>>,
    hits: AtomicU64,
    misses: AtomicU64,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    // a panic in another leaf cannot leave an entry half-written
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

impl CallCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Horizontal latitudes (degrees), x fastest.
    pub fn latitudes(&self, domain: &Arc<SpatialDomain>) -> Result<Arc<[f64]>> {
        self.geometry(domain, GeometryKind::Latitude)
    }

    /// Horizontal longitudes (degrees), x fastest.
    pub fn longitudes(&self, domain: &Arc<SpatialDomain>) -> Result<Arc<[f64]>> {
        self.geometry(domain, GeometryKind::Longitude)
    }

    /// Grid-north rotation angles (radians), x fastest. Zero for geographic
    /// domains.
    pub fn north_angles(&self, domain: &Arc<SpatialDomain>) -> Result<Arc<[f64]>> {
        self.geometry(domain, GeometryKind::NorthAngle)
    }

    fn geometry(&self, domain: &Arc<SpatialDomain>, kind: GeometryKind) -> Result<Arc<[f64]>> {
        {
            let entries = lock(&self.geometry);
            if let Some((_, _, values)) = entries.iter().find(|(d, k, _)| {
                *k == kind && (Arc::ptr_eq(d, domain) || d.same_horizontal(domain))
            }) {
                self.hits.fetch_add(1, Ordering::Relaxed);
                return Ok(values.clone());
            }
        }

        self.misses.fetch_add(1, Ordering::Relaxed);
        let values: Arc<[f64]> = compute_geometry(domain, kind)?.into();
        tracing::trace!(kind = ?kind, points = values.len(), "computed domain geometry");

        lock(&self.geometry).push((domain.clone(), kind, values.clone()));
        Ok(values)
    }

    /// Day of year (1..=366) of every time of a time axis.
    pub fn day_of_year_table(&self, axis: &OuterAxis) -> Result<Arc<[u32]>> {
        let times = axis.times().ok_or_else(|| {
            GridMathError::invalid_argument("day-of-year lookup needs a time axis")
        })?;

        {
            let tables = lock(&self.day_tables);
            if let Some((_, table)) = tables.iter().find(|(a, _)| a == axis) {
                self.hits.fetch_add(1, Ordering::Relaxed);
                return Ok(table.clone());
            }
        }

        self.misses.fetch_add(1, Ordering::Relaxed);
        let table: Arc<[u32]> = times.iter().map(day_of_year).collect::<Vec<_>>().into();
        lock(&self.day_tables).push((axis.clone(), table.clone()));
        Ok(table)
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            entries: lock(&self.geometry).len() + lock(&self.day_tables).len(),
        }
    }
}

fn compute_geometry(domain: &SpatialDomain, kind: GeometryKind) -> Result<Vec<f64>> {
    let (nx, ny) = (domain.nx(), domain.ny());
    let mut out = Vec::with_capacity(nx * ny);

    if kind == GeometryKind::NorthAngle {
        if let HorizontalCoordinates::Projected { projection, unit } = domain.coordinates() {
            let to_m = unit.conversion(&grid_common::Unit::meter())?;
            for j in 0..ny {
                let y = to_m.apply(domain.y().values()[j]);
                for i in 0..nx {
                    let x = to_m.apply(domain.x().values()[i]);
                    out.push(projection.north_angle(x, y).unwrap_or(f64::NAN));
                }
            }
        } else {
            out.resize(nx * ny, 0.0);
        }
        return Ok(out);
    }

    for j in 0..ny {
        for i in 0..nx {
            let value = match domain.latlon(i, j) {
                Ok((lat, lon)) => match kind {
                    GeometryKind::Latitude => lat,
                    _ => lon,
                },
                Err(GridMathError::Projection(_)) => f64::NAN,
                Err(e) => return Err(e),
            };
            out.push(value);
        }
    }
    Ok(out)
}
