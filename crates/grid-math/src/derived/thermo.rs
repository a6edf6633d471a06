//! Thermodynamic quantities: humidity, dewpoint, potential temperatures and
//! isentropic potential vorticity.

use grid_common::{QuantityTag, Unit};
use projection::vertical::G0;

use super::kinematics::{absolute_vorticity, Kinematics};
use super::vertical::point_pressures;
use super::{grid_value_range, pointwise2, DerivedGridFactory};
use crate::algebra::partial_field;
use crate::cache::CallCache;
use crate::error::{GridMathError, Result};
use crate::grid::{Field, Grid};
use crate::types::DerivativeAxis;

/// Poisson exponent R/cp used for potential temperature.
pub const KAPPA: f64 = 0.286;
/// Ratio of the gas constants of dry air and water vapour.
pub const GAS_CONSTANT_RATIO: f64 = 0.622;
/// Latent heat of vaporization (J kg-1).
const LATENT_HEAT: f64 = 2.501e6;
/// Specific heat of dry air at constant pressure (J kg-1 K-1).
const CP_DRY: f64 = 1004.0;
const REFERENCE_PRESSURE: f64 = 1000.0;

const MAGNUS_A: f64 = 6.112;
const MAGNUS_B: f64 = 17.67;
const MAGNUS_C: f64 = 243.5;

/// Saturation vapour pressure (hPa) over water at `t_celsius` (Magnus form).
pub fn saturation_vapor_pressure(t_celsius: f64) -> f64 {
    MAGNUS_A * (MAGNUS_B * t_celsius / (t_celsius + MAGNUS_C)).exp()
}

/// Temperature (degC) at which `e_hpa` is the saturation vapour pressure.
fn dewpoint_celsius(e_hpa: f64) -> f64 {
    if !(e_hpa > 0.0) {
        return f64::NAN;
    }
    let ln = (e_hpa / MAGNUS_A).ln();
    MAGNUS_C * ln / (MAGNUS_B - ln)
}

/// Saturation mixing ratio (kg/kg).
fn saturation_mixing_ratio(t_celsius: f64, p_hpa: f64) -> f64 {
    let es = saturation_vapor_pressure(t_celsius);
    GAS_CONSTANT_RATIO * es / (p_hpa - es)
}

fn potential_temperature(t_kelvin: f64, p_hpa: f64) -> f64 {
    t_kelvin * (REFERENCE_PRESSURE / p_hpa).powf(KAPPA)
}

impl DerivedGridFactory {
    /// Relative humidity in percent.
    ///
    /// Grids whose values all lie within `[0, rh_fraction_threshold]` after
    /// conversion to percent are taken to be fractions and scaled by 100.
    pub fn normalize_relative_humidity(&self, rh: &Grid) -> Result<Grid> {
        let percent = self.math.convert_units(rh, &Unit::percent())?;
        let threshold = self.config().rh_fraction_threshold as f32;
        match grid_value_range(&percent) {
            Some((lo, hi)) if lo >= 0.0 && hi <= threshold => {
                tracing::warn!(
                    min = lo,
                    max = hi,
                    "relative humidity looks like a fraction, scaling by 100"
                );
                self.math.multiply_constant(&percent, 100.0)
            }
            _ => Ok(percent),
        }
    }

    /// Dewpoint (K) from temperature and relative humidity.
    pub fn create_dewpoint(&self, temperature: &Grid, rh: &Grid) -> Result<Grid> {
        let rh = self.normalize_relative_humidity(rh)?;
        tracing::debug!("dewpoint");
        self.math.zip_aligned(temperature, &rh, |t, rh| {
            pointwise2(
                t,
                &Unit::celsius(),
                rh,
                &Unit::percent(),
                QuantityTag::new("dewpoint", Unit::kelvin()),
                |tc, r| dewpoint_celsius(r / 100.0 * saturation_vapor_pressure(tc)) + 273.15,
            )
        })
    }

    /// Mixing ratio (g/kg) from temperature and relative humidity, at the
    /// pressures of the temperature grid's levels.
    pub fn create_mixing_ratio(&self, temperature: &Grid, rh: &Grid) -> Result<Grid> {
        let rh = self.normalize_relative_humidity(rh)?;
        let transform = self.vertical.as_ref();
        tracing::debug!("mixing ratio");
        self.math.zip_aligned(temperature, &rh, |t, rh| {
            let p = point_pressures(t, transform)?;
            let tc = t.component_in(0, &Unit::celsius())?;
            let r = rh.component_in(0, &Unit::percent())?;
            let values = (0..p.len())
                .map(|i| (r[i] / 100.0 * saturation_mixing_ratio(tc[i], p[i]) * 1000.0) as f32)
                .collect();
            Field::scalar(
                t.domain_arc().clone(),
                QuantityTag::new("mixing_ratio", Unit::grams_per_kilogram()),
                values,
            )
        })
    }

    /// Relative humidity (%) from temperature and mixing ratio.
    pub fn create_relative_humidity(&self, temperature: &Grid, mixing_ratio: &Grid) -> Result<Grid> {
        self.relative_humidity(temperature, mixing_ratio, |w| w)
    }

    /// Relative humidity (%) from temperature and specific humidity.
    pub fn create_relative_humidity_from_specific_humidity(
        &self,
        temperature: &Grid,
        specific_humidity: &Grid,
    ) -> Result<Grid> {
        self.relative_humidity(temperature, specific_humidity, |q| q / (1.0 - q))
    }

    fn relative_humidity<F>(&self, temperature: &Grid, moisture: &Grid, to_mixing_ratio: F) -> Result<Grid>
    where
        F: Fn(f64) -> f64 + Sync,
    {
        let transform = self.vertical.as_ref();
        tracing::debug!("relative humidity");
        self.math.zip_aligned(temperature, moisture, |t, m| {
            let p = point_pressures(t, transform)?;
            let tc = t.component_in(0, &Unit::celsius())?;
            let w = m.component_in(0, &Unit::dimensionless())?;
            let values = (0..p.len())
                .map(|i| (100.0 * to_mixing_ratio(w[i]) / saturation_mixing_ratio(tc[i], p[i])) as f32)
                .collect();
            Field::scalar(
                t.domain_arc().clone(),
                QuantityTag::new("relative_humidity", Unit::percent()),
                values,
            )
        })
    }

    /// Potential temperature `T (1000 / p)^0.286` (K).
    pub fn create_potential_temperature(&self, temperature: &Grid, pressure: &Grid) -> Result<Grid> {
        tracing::debug!("potential temperature");
        self.math.zip_aligned(temperature, pressure, |t, p| {
            pointwise2(
                t,
                &Unit::kelvin(),
                p,
                &Unit::hectopascal(),
                QuantityTag::new("theta", Unit::kelvin()),
                potential_temperature,
            )
        })
    }

    /// Potential temperature at the pressures of the grid's own levels.
    pub fn create_potential_temperature_from_levels(&self, temperature: &Grid) -> Result<Grid> {
        let transform = self.vertical.as_ref();
        self.math.map(temperature, |t| theta_from_levels(t, transform))
    }

    /// Equivalent potential temperature `theta * exp(L w / (cp T))` (K),
    /// with the mixing ratio from relative humidity at the grid's levels.
    pub fn create_equivalent_potential_temperature(&self, temperature: &Grid, rh: &Grid) -> Result<Grid> {
        let rh = self.normalize_relative_humidity(rh)?;
        let transform = self.vertical.as_ref();
        tracing::debug!("equivalent potential temperature");
        self.math.zip_aligned(temperature, &rh, |t, rh| {
            let p = point_pressures(t, transform)?;
            let tk = t.component_in(0, &Unit::kelvin())?;
            let r = rh.component_in(0, &Unit::percent())?;
            let values = (0..p.len())
                .map(|i| {
                    let w = r[i] / 100.0 * saturation_mixing_ratio(tk[i] - 273.15, p[i]);
                    let theta = potential_temperature(tk[i], p[i]);
                    (theta * (LATENT_HEAT * w / (CP_DRY * tk[i])).exp()) as f32
                })
                .collect();
            Field::scalar(
                t.domain_arc().clone(),
                QuantityTag::new("theta_e", Unit::kelvin()),
                values,
            )
        })
    }

    /// Isentropic potential vorticity `-g (dtheta/dp) (zeta + f)` in PVU.
    ///
    /// Temperature must sit on pressure levels.
    pub fn create_ipv(&self, temperature: &Grid, u: &Grid, v: &Grid) -> Result<Grid> {
        let flow = self.combine_grids(&[u, v])?;
        let transform = self.vertical.as_ref();
        let cache = CallCache::new();
        let k = Kinematics {
            cache: &cache,
            min_cos: self.config().min_cos_latitude(),
        };
        let floor = self.config().coriolis_floor;
        tracing::debug!("isentropic potential vorticity");

        self.math.zip_aligned(temperature, &flow, |t, flow| {
            if !t.domain().z().is_some_and(|z| z.is_pressure() && z.len() > 1) {
                return Err(GridMathError::missing_coordinate(
                    "potential vorticity needs temperature on two or more pressure levels",
                ));
            }
            let theta = theta_from_levels(t, transform)?;
            let dtheta = partial_field(&theta, DerivativeAxis::Z, k.cache, k.min_cos)?;
            let dtheta = dtheta.component_in(0, &Unit::kelvin().divide(&Unit::pascal()))?;
            let eta = absolute_vorticity(&k, flow, floor)?;
            let pvu = Unit::pvu();
            let to_pvu = Unit::pvu().si_base().conversion(&pvu)?;
            let values = dtheta
                .iter()
                .zip(eta.values())
                .map(|(&d, &a)| to_pvu.apply(-G0 * d * f64::from(a)) as f32)
                .collect();
            Field::scalar(t.domain_arc().clone(), QuantityTag::new("ipv", pvu), values)
        })
    }
}

fn theta_from_levels(t: &Field, transform: &dyn projection::VerticalTransform) -> Result<Field> {
    let p = point_pressures(t, transform)?;
    let tk = t.component_in(0, &Unit::kelvin())?;
    Field::scalar(
        t.domain_arc().clone(),
        QuantityTag::new("theta", Unit::kelvin()),
        tk.iter()
            .zip(&p)
            .map(|(&t, &p)| potential_temperature(t, p) as f32)
            .collect(),
    )
}
