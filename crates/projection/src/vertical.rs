//! Vertical coordinate transforms between pressure and height.
//!
//! Pressures are in hPa, heights in meters above mean sea level. Both
//! directions are exact inverses of each other for every transform, so a
//! pressure -> height -> pressure round trip only loses floating-point noise.

/// Standard gravity (m s-2).
pub const G0: f64 = 9.80665;
/// Specific gas constant of dry air (J kg-1 K-1).
pub const R_DRY: f64 = 287.053;

/// Maps pressure levels to heights and back.
pub trait VerticalTransform: std::fmt::Debug + Send + Sync {
    fn name(&self) -> &str;

    /// Height (m) for a pressure (hPa). Non-positive or non-finite input gives NaN.
    fn pressure_to_height(&self, pressure_hpa: f64) -> f64;

    /// Pressure (hPa) for a height (m). Non-finite input gives NaN.
    fn height_to_pressure(&self, height_m: f64) -> f64;
}

/// One layer of the piecewise-linear temperature profile.
#[derive(Debug, Clone, Copy)]
struct AtmosphereLayer {
    base_height: f64,
    base_temperature: f64,
    base_pressure: f64,
    lapse_rate: f64,
}

/// U.S. Standard Atmosphere 1976 up to 71 km.
///
/// The last layer is extrapolated above 71 km and the first one below sea
/// level.
#[derive(Debug, Clone)]
pub struct StandardAtmosphere {
    layers: Vec<AtmosphereLayer>,
}

impl Default for StandardAtmosphere {
    fn default() -> Self {
        Self::new()
    }
}

impl StandardAtmosphere {
    /// Sea-level pressure (hPa).
    pub const SURFACE_PRESSURE: f64 = 1013.25;
    /// Sea-level temperature (K).
    pub const SURFACE_TEMPERATURE: f64 = 288.15;

    pub fn new() -> Self {
        // (base height m, lapse rate K/m)
        const PROFILE: [(f64, f64); 7] = [
            (0.0, -0.0065),
            (11_000.0, 0.0),
            (20_000.0, 0.001),
            (32_000.0, 0.0028),
            (47_000.0, 0.0),
            (51_000.0, -0.0028),
            (71_000.0, -0.002),
        ];

        let mut layers = Vec::with_capacity(PROFILE.len());
        let mut temperature = Self::SURFACE_TEMPERATURE;
        let mut pressure = Self::SURFACE_PRESSURE;

        for (i, &(base_height, lapse_rate)) in PROFILE.iter().enumerate() {
            if i > 0 {
                let below: AtmosphereLayer = layers[i - 1];
                temperature = below.base_temperature
                    + below.lapse_rate * (base_height - below.base_height);
                pressure = layer_pressure(&below, base_height);
            }
            layers.push(AtmosphereLayer {
                base_height,
                base_temperature: temperature,
                base_pressure: pressure,
                lapse_rate,
            });
        }

        Self { layers }
    }

    fn layer_for_height(&self, height: f64) -> &AtmosphereLayer {
        self.layers
            .iter()
            .rev()
            .find(|layer| height >= layer.base_height)
            .unwrap_or(&self.layers[0])
    }

    fn layer_for_pressure(&self, pressure: f64) -> &AtmosphereLayer {
        self.layers
            .iter()
            .rev()
            .find(|layer| pressure <= layer.base_pressure)
            .unwrap_or(&self.layers[0])
    }

    /// Temperature (K) of the standard profile at a height.
    pub fn temperature_at(&self, height_m: f64) -> f64 {
        let layer = self.layer_for_height(height_m);
        layer.base_temperature + layer.lapse_rate * (height_m - layer.base_height)
    }
}

fn layer_pressure(layer: &AtmosphereLayer, height: f64) -> f64 {
    let dz = height - layer.base_height;
    if layer.lapse_rate == 0.0 {
        layer.base_pressure * (-G0 * dz / (R_DRY * layer.base_temperature)).exp()
    } else {
        let ratio = layer.base_temperature / (layer.base_temperature + layer.lapse_rate * dz);
        layer.base_pressure * ratio.powf(G0 / (R_DRY * layer.lapse_rate))
    }
}

fn layer_height(layer: &AtmosphereLayer, pressure: f64) -> f64 {
    let ratio = pressure / layer.base_pressure;
    if layer.lapse_rate == 0.0 {
        layer.base_height - R_DRY * layer.base_temperature / G0 * ratio.ln()
    } else {
        layer.base_height
            + layer.base_temperature / layer.lapse_rate
                * (ratio.powf(-R_DRY * layer.lapse_rate / G0) - 1.0)
    }
}

impl VerticalTransform for StandardAtmosphere {
    fn name(&self) -> &str {
        "standard_atmosphere"
    }

    fn pressure_to_height(&self, pressure_hpa: f64) -> f64 {
        if !pressure_hpa.is_finite() || pressure_hpa <= 0.0 {
            return f64::NAN;
        }
        layer_height(self.layer_for_pressure(pressure_hpa), pressure_hpa)
    }

    fn height_to_pressure(&self, height_m: f64) -> f64 {
        if !height_m.is_finite() {
            return f64::NAN;
        }
        layer_pressure(self.layer_for_height(height_m), height_m)
    }
}

/// Isothermal atmosphere with a constant scale height: `p = p0 * exp(-z / H)`.
#[derive(Debug, Clone)]
pub struct ScaleHeightAtmosphere {
    pub surface_pressure: f64,
    pub scale_height: f64,
}

impl Default for ScaleHeightAtmosphere {
    /// Scale height of a 288.15 K isothermal atmosphere, about 8.4 km.
    fn default() -> Self {
        Self {
            surface_pressure: StandardAtmosphere::SURFACE_PRESSURE,
            scale_height: R_DRY * StandardAtmosphere::SURFACE_TEMPERATURE / G0,
        }
    }
}

impl ScaleHeightAtmosphere {
    pub fn new(surface_pressure: f64, scale_height: f64) -> Self {
        Self {
            surface_pressure,
            scale_height,
        }
    }
}

impl VerticalTransform for ScaleHeightAtmosphere {
    fn name(&self) -> &str {
        "scale_height_atmosphere"
    }

    fn pressure_to_height(&self, pressure_hpa: f64) -> f64 {
        if !pressure_hpa.is_finite() || pressure_hpa <= 0.0 {
            return f64::NAN;
        }
        -self.scale_height * (pressure_hpa / self.surface_pressure).ln()
    }

    fn height_to_pressure(&self, height_m: f64) -> f64 {
        self.surface_pressure * (-height_m / self.scale_height).exp()
    }
}
