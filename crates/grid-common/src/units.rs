//! Physical units and named quantity tags.
//!
//! A [`Unit`] is a dimension vector over length, mass, time, temperature and
//! angle plus an affine mapping to SI (`si = value * scale + offset`). That is
//! enough to answer every question the grid operators ask of a unit:
//!
//! - can two units be converted (`can_convert`)
//! - convert a value between them (`convert`, `conversion`)
//! - what unit does a product or quotient carry (`multiply`, `divide`)
//!
//! A [`QuantityTag`] pairs a unit with the name of the physical quantity it
//! measures ("T", "RH", "relative_vorticity", ...).

use std::fmt;
use std::ops::{Div, Mul};

use serde::{Deserialize, Serialize};

use crate::error::{UnitError, UnitResult};

/// Exponents of the base dimensions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Dimension {
    pub length: i8,
    pub mass: i8,
    pub time: i8,
    pub temperature: i8,
    pub angle: i8,
}

impl Dimension {
    pub const NONE: Dimension = Dimension::new(0, 0, 0, 0, 0);
    pub const LENGTH: Dimension = Dimension::new(1, 0, 0, 0, 0);
    pub const MASS: Dimension = Dimension::new(0, 1, 0, 0, 0);
    pub const TIME: Dimension = Dimension::new(0, 0, 1, 0, 0);
    pub const TEMPERATURE: Dimension = Dimension::new(0, 0, 0, 1, 0);
    pub const ANGLE: Dimension = Dimension::new(0, 0, 0, 0, 1);
    pub const VELOCITY: Dimension = Dimension::new(1, 0, -1, 0, 0);
    pub const PRESSURE: Dimension = Dimension::new(-1, 1, -2, 0, 0);
    pub const FREQUENCY: Dimension = Dimension::new(0, 0, -1, 0, 0);

    pub const fn new(length: i8, mass: i8, time: i8, temperature: i8, angle: i8) -> Self {
        Self {
            length,
            mass,
            time,
            temperature,
            angle,
        }
    }

    pub fn powi(self, n: i8) -> Self {
        Self::new(
            self.length * n,
            self.mass * n,
            self.time * n,
            self.temperature * n,
            self.angle * n,
        )
    }

    pub fn is_none(&self) -> bool {
        *self == Self::NONE
    }

    /// SI spelling of the dimension, e.g. `m2 kg-1 s-1 K`.
    pub fn si_symbol(&self) -> String {
        let parts: Vec<String> = [
            ("m", self.length),
            ("kg", self.mass),
            ("s", self.time),
            ("K", self.temperature),
            ("rad", self.angle),
        ]
        .iter()
        .filter(|(_, exp)| *exp != 0)
        .map(|(sym, exp)| {
            if *exp == 1 {
                sym.to_string()
            } else {
                format!("{}{}", sym, exp)
            }
        })
        .collect();

        if parts.is_empty() {
            "1".to_string()
        } else {
            parts.join(" ")
        }
    }
}

impl Mul for Dimension {
    type Output = Dimension;

    fn mul(self, rhs: Dimension) -> Dimension {
        Dimension::new(
            self.length + rhs.length,
            self.mass + rhs.mass,
            self.time + rhs.time,
            self.temperature + rhs.temperature,
            self.angle + rhs.angle,
        )
    }
}

impl Div for Dimension {
    type Output = Dimension;

    fn div(self, rhs: Dimension) -> Dimension {
        self * rhs.powi(-1)
    }
}

/// Affine conversion between two compatible units: `to = from * factor + offset`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Conversion {
    pub factor: f64,
    pub offset: f64,
}

impl Conversion {
    pub const IDENTITY: Conversion = Conversion {
        factor: 1.0,
        offset: 0.0,
    };

    #[inline]
    pub fn apply(&self, value: f64) -> f64 {
        value * self.factor + self.offset
    }

    pub fn is_identity(&self) -> bool {
        self.factor == 1.0 && self.offset == 0.0
    }
}

/// A physical unit.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Unit {
    symbol: String,
    dimension: Dimension,
    scale: f64,
    offset: f64,
}

impl PartialEq for Unit {
    /// Two units are equal when they describe the same SI mapping,
    /// regardless of how the symbol is spelled.
    fn eq(&self, other: &Self) -> bool {
        self.dimension == other.dimension
            && (self.scale - other.scale).abs() <= 1e-12 * self.scale.abs().max(other.scale.abs())
            && (self.offset - other.offset).abs() <= 1e-9
    }
}

impl fmt::Display for Unit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.symbol)
    }
}

impl Unit {
    pub fn new(symbol: impl Into<String>, dimension: Dimension, scale: f64, offset: f64) -> Self {
        Self {
            symbol: symbol.into(),
            dimension,
            scale,
            offset,
        }
    }

    fn si(symbol: &str, dimension: Dimension) -> Self {
        Self::new(symbol, dimension, 1.0, 0.0)
    }

    pub fn dimensionless() -> Self {
        Self::si("1", Dimension::NONE)
    }

    pub fn percent() -> Self {
        Self::new("%", Dimension::NONE, 0.01, 0.0)
    }

    pub fn meter() -> Self {
        Self::si("m", Dimension::LENGTH)
    }

    pub fn kilometer() -> Self {
        Self::new("km", Dimension::LENGTH, 1000.0, 0.0)
    }

    pub fn second() -> Self {
        Self::si("s", Dimension::TIME)
    }

    pub fn kilogram() -> Self {
        Self::si("kg", Dimension::MASS)
    }

    pub fn kelvin() -> Self {
        Self::si("K", Dimension::TEMPERATURE)
    }

    pub fn celsius() -> Self {
        Self::new("degC", Dimension::TEMPERATURE, 1.0, 273.15)
    }

    pub fn pascal() -> Self {
        Self::si("Pa", Dimension::PRESSURE)
    }

    pub fn hectopascal() -> Self {
        Self::new("hPa", Dimension::PRESSURE, 100.0, 0.0)
    }

    pub fn radian() -> Self {
        Self::si("rad", Dimension::ANGLE)
    }

    pub fn degree() -> Self {
        Self::new("degree", Dimension::ANGLE, std::f64::consts::PI / 180.0, 0.0)
    }

    pub fn meters_per_second() -> Self {
        Self::si("m/s", Dimension::VELOCITY)
    }

    pub fn knot() -> Self {
        Self::new("kt", Dimension::VELOCITY, 1852.0 / 3600.0, 0.0)
    }

    pub fn per_second() -> Self {
        Self::si("s-1", Dimension::FREQUENCY)
    }

    pub fn pascals_per_second() -> Self {
        Self::si("Pa/s", Dimension::PRESSURE / Dimension::TIME)
    }

    pub fn grams_per_kilogram() -> Self {
        Self::new("g/kg", Dimension::NONE, 1e-3, 0.0)
    }

    /// Potential vorticity unit, 1e-6 K m2 kg-1 s-1.
    pub fn pvu() -> Self {
        Self::new("PVU", Dimension::new(2, -1, -1, 1, 0), 1e-6, 0.0)
    }

    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    pub fn dimension(&self) -> Dimension {
        self.dimension
    }

    /// Return the same unit with a different display symbol.
    pub fn with_symbol(mut self, symbol: impl Into<String>) -> Self {
        self.symbol = symbol.into();
        self
    }

    pub fn can_convert(&self, other: &Unit) -> bool {
        self.dimension == other.dimension
    }

    /// Conversion coefficients from `self` into `to`.
    pub fn conversion(&self, to: &Unit) -> UnitResult<Conversion> {
        if !self.can_convert(to) {
            return Err(UnitError::incompatible(&self.symbol, &to.symbol));
        }
        Ok(Conversion {
            factor: self.scale / to.scale,
            offset: (self.offset - to.offset) / to.scale,
        })
    }

    /// Convert a single value from `self` into `to`.
    pub fn convert(&self, value: f64, to: &Unit) -> UnitResult<f64> {
        Ok(self.conversion(to)?.apply(value))
    }

    /// Product unit. Offsets are dropped (degC behaves as K inside products).
    pub fn multiply(&self, other: &Unit) -> Unit {
        if other.is_unity() {
            return self.absolute();
        }
        if self.is_unity() {
            return other.absolute();
        }
        Unit::new(
            format!("{} {}", self.symbol, other.symbol),
            self.dimension * other.dimension,
            self.scale * other.scale,
            0.0,
        )
    }

    /// Quotient unit. Offsets are dropped.
    pub fn divide(&self, other: &Unit) -> Unit {
        if other.is_unity() {
            return self.absolute();
        }
        let denominator = if other.symbol.contains(' ') || other.symbol.contains('/') {
            format!("({})", other.symbol)
        } else {
            other.symbol.clone()
        };
        Unit::new(
            format!("{}/{}", self.symbol, denominator),
            self.dimension / other.dimension,
            self.scale / other.scale,
            0.0,
        )
    }

    pub fn powi(&self, n: i8) -> Unit {
        match n {
            0 => Unit::dimensionless(),
            1 => self.absolute(),
            _ => Unit::new(
                format!("{}^{}", self.symbol, n),
                self.dimension.powi(n),
                self.scale.powi(i32::from(n)),
                0.0,
            ),
        }
    }

    /// Square root unit; every dimension exponent must be even.
    pub fn sqrt(&self) -> UnitResult<Unit> {
        let d = self.dimension;
        let exponents = [d.length, d.mass, d.time, d.temperature, d.angle];
        if exponents.iter().any(|e| e % 2 != 0) {
            return Err(UnitError::FractionalPower(self.symbol.clone()));
        }
        if self.is_unity() {
            return Ok(self.clone());
        }
        Ok(Unit::new(
            format!("({})^0.5", self.symbol),
            Dimension::new(d.length / 2, d.mass / 2, d.time / 2, d.temperature / 2, d.angle / 2),
            self.scale.sqrt(),
            0.0,
        ))
    }

    fn absolute(&self) -> Unit {
        if self.offset == 0.0 {
            self.clone()
        } else {
            Unit::new(self.symbol.clone(), self.dimension, self.scale, 0.0)
        }
    }

    pub fn has_offset(&self) -> bool {
        self.offset != 0.0
    }

    /// The coherent SI unit of the same dimension (scale 1, no offset).
    pub fn si_base(&self) -> Unit {
        Unit::new(self.dimension.si_symbol(), self.dimension, 1.0, 0.0)
    }

    fn is_unity(&self) -> bool {
        self.dimension.is_none() && self.scale == 1.0 && self.offset == 0.0
    }

    pub fn is_dimensionless(&self) -> bool {
        self.dimension.is_none()
    }

    pub fn is_pressure(&self) -> bool {
        self.dimension == Dimension::PRESSURE
    }

    pub fn is_length(&self) -> bool {
        self.dimension == Dimension::LENGTH
    }

    pub fn is_velocity(&self) -> bool {
        self.dimension == Dimension::VELOCITY
    }

    pub fn is_temperature(&self) -> bool {
        self.dimension == Dimension::TEMPERATURE
    }

    pub fn is_angle(&self) -> bool {
        self.dimension == Dimension::ANGLE
    }

    /// Parse a unit string.
    ///
    /// Accepts single symbols (`K`, `hPa`, `degrees_north`, `kt`, ...) and
    /// products/quotients written as `m s-1`, `m/s`, `K m2 kg-1 s-1`,
    /// `kg^-1` or `g/kg`.
    pub fn parse(s: &str) -> UnitResult<Unit> {
        let trimmed = s.trim();
        if let Some(unit) = Self::named(trimmed) {
            return Ok(unit);
        }

        let (numerator, denominator) = match trimmed.split_once('/') {
            Some((n, d)) => (n, Some(d)),
            None => (trimmed, None),
        };

        let mut unit = Self::parse_product(numerator, trimmed)?;
        if let Some(d) = denominator {
            let d = d.trim().trim_start_matches('(').trim_end_matches(')');
            unit = unit.divide(&Self::parse_product(d, trimmed)?);
        }
        Ok(unit.with_symbol(trimmed))
    }

    fn parse_product(s: &str, whole: &str) -> UnitResult<Unit> {
        let mut unit = Unit::dimensionless();
        for token in s
            .split(|c: char| c.is_whitespace() || c == '*' || c == '\u{b7}')
            .filter(|t| !t.is_empty())
        {
            let (base, exponent) = split_exponent(token)
                .ok_or_else(|| UnitError::Unknown(whole.to_string()))?;
            let base_unit =
                Self::named(base).ok_or_else(|| UnitError::Unknown(whole.to_string()))?;
            if base_unit.offset != 0.0 {
                return Err(UnitError::OffsetUnit(base.to_string()));
            }
            unit = unit.multiply(&base_unit.powi(exponent));
        }
        Ok(unit)
    }

    fn named(symbol: &str) -> Option<Unit> {
        let unit = match symbol {
            "" | "1" | "dimensionless" | "none" | "fraction" => Unit::dimensionless(),
            "%" | "percent" => Unit::percent(),
            "m" | "meter" | "meters" | "metre" | "metres" | "gpm" => Unit::meter(),
            "km" => Unit::kilometer(),
            "dam" => Unit::new("dam", Dimension::LENGTH, 10.0, 0.0),
            "cm" => Unit::new("cm", Dimension::LENGTH, 0.01, 0.0),
            "mm" => Unit::new("mm", Dimension::LENGTH, 0.001, 0.0),
            "ft" | "feet" => Unit::new("ft", Dimension::LENGTH, 0.3048, 0.0),
            "g" => Unit::new("g", Dimension::MASS, 1e-3, 0.0),
            "kg" => Unit::kilogram(),
            "s" | "sec" | "second" | "seconds" => Unit::second(),
            "min" => Unit::new("min", Dimension::TIME, 60.0, 0.0),
            "h" | "hr" | "hour" | "hours" => Unit::new("h", Dimension::TIME, 3600.0, 0.0),
            "d" | "day" | "days" => Unit::new("d", Dimension::TIME, 86400.0, 0.0),
            "K" | "kelvin" | "degK" => Unit::kelvin(),
            "degC" | "celsius" | "Celsius" | "C" | "deg_C" | "degrees_C" => Unit::celsius(),
            "degF" | "fahrenheit" | "F" => Unit::new(
                "degF",
                Dimension::TEMPERATURE,
                5.0 / 9.0,
                273.15 - 32.0 * 5.0 / 9.0,
            ),
            "Pa" | "pascal" => Unit::pascal(),
            "hPa" | "mb" | "mbar" | "millibar" | "millibars" => Unit::hectopascal(),
            "kPa" => Unit::new("kPa", Dimension::PRESSURE, 1000.0, 0.0),
            "bar" => Unit::new("bar", Dimension::PRESSURE, 1e5, 0.0),
            "rad" | "radian" | "radians" => Unit::radian(),
            "deg" | "degree" | "degrees" | "degrees_north" | "degrees_east" | "degree_north"
            | "degree_east" | "degrees_N" | "degrees_E" | "degN" | "degE" => Unit::degree(),
            "kt" | "kts" | "knot" | "knots" => Unit::knot(),
            "m/s" | "mps" | "m s-1" => Unit::meters_per_second(),
            "s-1" | "1/s" | "/s" => Unit::per_second(),
            "Pa/s" | "Pa s-1" => Unit::pascals_per_second(),
            "g/kg" | "g kg-1" => Unit::grams_per_kilogram(),
            "kg/kg" | "kg kg-1" => Unit::dimensionless().with_symbol("kg/kg"),
            "PVU" | "pvu" => Unit::pvu(),
            _ => return None,
        };
        Some(unit.with_symbol(if symbol.is_empty() { "1" } else { symbol }))
    }
}

/// Split `m2`, `s-1`, `kg^-1`, `m**2` into base symbol and exponent.
fn split_exponent(token: &str) -> Option<(&str, i8)> {
    let token = token.trim();
    let split_at = token
        .char_indices()
        .skip(1)
        .find(|(_, c)| c.is_ascii_digit() || *c == '-' || *c == '+' || *c == '^' || *c == '*')
        .map(|(i, _)| i);

    match split_at {
        None => Some((token, 1)),
        Some(i) => {
            let (base, rest) = token.split_at(i);
            let rest = rest.trim_start_matches("**").trim_start_matches('^');
            let exponent = rest.parse::<i8>().ok()?;
            Some((base, exponent))
        }
    }
}

/// A named physical quantity with its unit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuantityTag {
    name: String,
    unit: Unit,
}

impl QuantityTag {
    pub fn new(name: impl Into<String>, unit: Unit) -> Self {
        Self {
            name: name.into(),
            unit,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn unit(&self) -> &Unit {
        &self.unit
    }

    pub fn renamed(&self, name: impl Into<String>) -> Self {
        Self::new(name, self.unit.clone())
    }

    pub fn with_unit(&self, unit: Unit) -> Self {
        Self::new(self.name.clone(), unit)
    }
}

impl fmt::Display for QuantityTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}[{}]", self.name, self.unit)
    }
}
