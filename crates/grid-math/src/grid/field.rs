//! Leaf fields: one spatial domain, one or more range components.

use std::sync::Arc;

use grid_common::{QuantityTag, Unit};
use serde::{Deserialize, Serialize};

use super::domain::SpatialDomain;
use crate::error::{GridMathError, Result};

/// Orientation of a vector-valued range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum VectorKind {
    /// Components point east and north.
    EarthRelative,
    /// Components follow the grid's x and y axes.
    GridRelative,
}

/// Ordered range components, optionally tagged as a vector.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RangeType {
    components: Vec<QuantityTag>,
    vector: Option<VectorKind>,
}

impl RangeType {
    pub fn scalar(tag: QuantityTag) -> Self {
        Self {
            components: vec![tag],
            vector: None,
        }
    }

    pub fn new(components: Vec<QuantityTag>) -> Result<Self> {
        if components.is_empty() {
            return Err(GridMathError::invalid_argument(
                "a range needs at least one component",
            ));
        }
        Ok(Self {
            components,
            vector: None,
        })
    }

    /// A vector range of two or three velocity-convertible components.
    pub fn vector(components: Vec<QuantityTag>, kind: VectorKind) -> Result<Self> {
        if !(2..=3).contains(&components.len()) {
            return Err(GridMathError::invalid_argument(format!(
                "a vector range has 2 or 3 components, got {}",
                components.len()
            )));
        }
        if let Some(bad) = components.iter().find(|c| !c.unit().is_velocity()) {
            return Err(GridMathError::invalid_argument(format!(
                "vector component {} is not a velocity",
                bad
            )));
        }
        Ok(Self {
            components,
            vector: Some(kind),
        })
    }

    pub fn components(&self) -> &[QuantityTag] {
        &self.components
    }

    pub fn component(&self, index: usize) -> Option<&QuantityTag> {
        self.components.get(index)
    }

    pub fn len(&self) -> usize {
        self.components.len()
    }

    pub fn is_empty(&self) -> bool {
        self.components.is_empty()
    }

    pub fn vector_kind(&self) -> Option<VectorKind> {
        self.vector
    }

    pub fn is_vector(&self) -> bool {
        self.vector.is_some()
    }

    /// Same components, different (or no) vector tag.
    pub fn with_vector(mut self, kind: Option<VectorKind>) -> Self {
        self.vector = kind;
        self
    }

    /// Component names and count match, units may differ.
    pub fn same_parameters(&self, other: &RangeType) -> bool {
        self.components.len() == other.components.len()
            && self
                .components
                .iter()
                .zip(&other.components)
                .all(|(a, b)| a.name() == b.name() && a.unit().can_convert(b.unit()))
    }
}

impl std::fmt::Display for RangeType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let names: Vec<String> = self.components.iter().map(|c| c.to_string()).collect();
        if self.components.len() == 1 {
            write!(f, "{}", names[0])
        } else {
            write!(f, "({})", names.join(", "))
        }
    }
}

/// A leaf grid: samples of every range component over one spatial domain.
///
/// Sample buffers are shared (`Arc<[f32]>`); operators always build new
/// buffers for results.
#[derive(Debug, Clone)]
pub struct Field {
    domain: Arc<SpatialDomain>,
    range: RangeType,
    samples: Vec<Arc<[f32]>>,
}

impl Field {
    pub fn new(domain: Arc<SpatialDomain>, range: RangeType, samples: Vec<Vec<f32>>) -> Result<Self> {
        Self::from_shared(
            domain,
            range,
            samples.into_iter().map(Arc::from).collect(),
        )
    }

    pub fn from_shared(
        domain: Arc<SpatialDomain>,
        range: RangeType,
        samples: Vec<Arc<[f32]>>,
    ) -> Result<Self> {
        if samples.len() != range.len() {
            return Err(GridMathError::malformed(format!(
                "{} sample buffers for {} range components",
                samples.len(),
                range.len()
            )));
        }
        let expected = domain.len();
        if let Some(bad) = samples.iter().find(|s| s.len() != expected) {
            return Err(GridMathError::malformed(format!(
                "sample buffer of length {} on a domain of {} points",
                bad.len(),
                expected
            )));
        }
        Ok(Self {
            domain,
            range,
            samples,
        })
    }

    /// Single-component field.
    pub fn scalar(domain: Arc<SpatialDomain>, tag: QuantityTag, values: Vec<f32>) -> Result<Self> {
        Self::new(domain, RangeType::scalar(tag), vec![values])
    }

    /// Single-component field evaluated at every `(i, j, k)`.
    pub fn from_fn<F>(domain: Arc<SpatialDomain>, tag: QuantityTag, f: F) -> Result<Self>
    where
        F: Fn(usize, usize, usize) -> f32,
    {
        let (nx, ny, nz) = (domain.nx(), domain.ny(), domain.nz());
        let mut values = Vec::with_capacity(domain.len());
        for k in 0..nz {
            for j in 0..ny {
                for i in 0..nx {
                    values.push(f(i, j, k));
                }
            }
        }
        Self::scalar(domain, tag, values)
    }

    pub fn domain(&self) -> &SpatialDomain {
        &self.domain
    }

    pub fn domain_arc(&self) -> &Arc<SpatialDomain> {
        &self.domain
    }

    pub fn range(&self) -> &RangeType {
        &self.range
    }

    /// First component's tag.
    pub fn tag(&self) -> &QuantityTag {
        &self.range.components[0]
    }

    pub fn unit(&self) -> &Unit {
        self.tag().unit()
    }

    pub fn component_count(&self) -> usize {
        self.samples.len()
    }

    pub fn samples(&self) -> &[Arc<[f32]>] {
        &self.samples
    }

    pub fn component(&self, index: usize) -> &[f32] {
        &self.samples[index]
    }

    /// First component's samples.
    pub fn values(&self) -> &[f32] {
        &self.samples[0]
    }

    pub fn value(&self, component: usize, i: usize, j: usize, k: usize) -> f32 {
        self.samples[component][self.domain.index(i, j, k)]
    }

    /// Same samples under a new range type.
    pub fn with_range(&self, range: RangeType) -> Result<Self> {
        Self::from_shared(self.domain.clone(), range, self.samples.clone())
    }

    /// Same samples on an equivalent domain.
    pub fn with_domain(&self, domain: Arc<SpatialDomain>) -> Result<Self> {
        Self::from_shared(domain, self.range.clone(), self.samples.clone())
    }

    /// New field with the same domain and range and fresh sample buffers.
    pub fn with_samples(&self, samples: Vec<Vec<f32>>) -> Result<Self> {
        Self::new(self.domain.clone(), self.range.clone(), samples)
    }

    /// Copy of the field that shares no sample buffer with `self`.
    pub fn deep_copy(&self) -> Self {
        Self {
            domain: self.domain.clone(),
            range: self.range.clone(),
            samples: self
                .samples
                .iter()
                .map(|s| Arc::from(s.to_vec()))
                .collect(),
        }
    }

    /// Same shape with every sample set to `value`.
    pub fn filled(&self, value: f32) -> Self {
        let buffer: Arc<[f32]> = Arc::from(vec![value; self.domain.len()]);
        Self {
            domain: self.domain.clone(),
            range: self.range.clone(),
            samples: vec![buffer; self.samples.len()],
        }
    }

    /// Apply `f` to every sample of every component.
    pub fn map_values<F>(&self, f: F) -> Self
    where
        F: Fn(f32) -> f32,
    {
        Self {
            domain: self.domain.clone(),
            range: self.range.clone(),
            samples: self
                .samples
                .iter()
                .map(|s| s.iter().map(|&v| f(v)).collect::<Vec<f32>>().into())
                .collect(),
        }
    }

    /// One component as a scalar field.
    pub fn select_component(&self, index: usize) -> Result<Self> {
        let tag = self.range.component(index).ok_or_else(|| {
            GridMathError::invalid_argument(format!(
                "component {} of a {}-component range",
                index,
                self.range.len()
            ))
        })?;
        Self::from_shared(
            self.domain.clone(),
            RangeType::scalar(tag.clone()),
            vec![self.samples[index].clone()],
        )
    }

    /// Component samples converted into `unit`.
    pub fn component_in(&self, index: usize, unit: &Unit) -> Result<Vec<f64>> {
        let conversion = self.range.components[index].unit().conversion(unit)?;
        Ok(self.samples[index]
            .iter()
            .map(|&v| conversion.apply(f64::from(v)))
            .collect())
    }

    /// Convert every component into `unit`, keeping names.
    pub fn convert_units(&self, unit: &Unit) -> Result<Self> {
        let mut samples = Vec::with_capacity(self.samples.len());
        let mut tags = Vec::with_capacity(self.samples.len());
        for (index, tag) in self.range.components.iter().enumerate() {
            let conversion = tag.unit().conversion(unit)?;
            if conversion.is_identity() {
                samples.push(self.samples[index].clone());
            } else {
                samples.push(
                    self.samples[index]
                        .iter()
                        .map(|&v| conversion.apply(f64::from(v)) as f32)
                        .collect::<Vec<f32>>()
                        .into(),
                );
            }
            tags.push(tag.with_unit(unit.clone()));
        }
        let range = RangeType {
            components: tags,
            vector: self.range.vector,
        };
        Self::from_shared(self.domain.clone(), range, samples)
    }

    /// (min, max) over all components, ignoring NaN.
    pub fn value_range(&self) -> Option<(f32, f32)> {
        let mut result: Option<(f32, f32)> = None;
        for &v in self.samples.iter().flat_map(|s| s.iter()) {
            if v.is_nan() {
                continue;
            }
            result = Some(match result {
                Some((lo, hi)) => (lo.min(v), hi.max(v)),
                None => (v, v),
            });
        }
        result
    }
}
