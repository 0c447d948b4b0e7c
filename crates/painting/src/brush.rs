//! Brushes: per-property texture layers with optional alpha masks
//!
//! A brush is a `width` x `height` texture. Each surfel property it can paint
//! has its own layer of one or three components, read through
//! [`BrushSampler`], plus an optional one-component alpha mask (alpha 1 when
//! absent). Samples are taken either at a single texel or as a weighted
//! average over an EWA footprint.

use serde::{Deserialize, Serialize};
use surfels::AttributeSet;

use crate::error::PaintError;
use crate::sampler::{BrushSampler, GridChannel};

/// Surfel property a brush layer paints
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BrushProperty {
    /// Offset along the surfel normal
    Displacement,
    DiffuseColor,
    SpecularColor,
    AmbientCoefficient,
    DiffuseCoefficient,
    SpecularCoefficient,
    Shininess,
    /// Three selection channels, thresholded rather than blended
    Selection,
}

impl BrushProperty {
    pub const COUNT: usize = 8;

    pub const ALL: [BrushProperty; Self::COUNT] = [
        BrushProperty::Displacement,
        BrushProperty::DiffuseColor,
        BrushProperty::SpecularColor,
        BrushProperty::AmbientCoefficient,
        BrushProperty::DiffuseCoefficient,
        BrushProperty::SpecularCoefficient,
        BrushProperty::Shininess,
        BrushProperty::Selection,
    ];

    /// Number of components a layer of this property carries
    pub fn components(self) -> usize {
        match self {
            BrushProperty::DiffuseColor | BrushProperty::SpecularColor | BrushProperty::Selection => 3,
            _ => 1,
        }
    }

    /// Surfel attributes written when this property is painted
    pub fn attributes(self) -> AttributeSet {
        match self {
            BrushProperty::Displacement => AttributeSet::POSITION,
            BrushProperty::DiffuseColor => AttributeSet::DIFFUSE_COLOR,
            BrushProperty::SpecularColor => AttributeSet::SPECULAR_COLOR,
            BrushProperty::AmbientCoefficient => AttributeSet::AMBIENT_COEFFICIENT,
            BrushProperty::DiffuseCoefficient => AttributeSet::DIFFUSE_COEFFICIENT,
            BrushProperty::SpecularCoefficient => AttributeSet::SPECULAR_COEFFICIENT,
            BrushProperty::Shininess => AttributeSet::SHININESS,
            BrushProperty::Selection => AttributeSet::FLAGS,
        }
    }

    #[inline]
    pub(crate) fn index(self) -> usize {
        self as usize
    }
}

/// Component values and alpha of one layer at one location
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct LayerSample {
    /// Unused components stay zero
    pub value: [f32; 3],
    pub alpha: f32,
}

impl LayerSample {
    #[inline]
    pub fn scalar(&self) -> f32 {
        self.value[0]
    }

    fn add_weighted(&mut self, other: &LayerSample, weight: f32) {
        for (sum, value) in self.value.iter_mut().zip(other.value) {
            *sum += weight * value;
        }
        self.alpha += weight * other.alpha;
    }

    fn scaled(&self, factor: f32) -> LayerSample {
        LayerSample {
            value: self.value.map(|value| value * factor),
            alpha: self.alpha * factor,
        }
    }
}

/// One layer: its components and optional alpha mask
pub struct BrushLayer {
    components: Vec<Box<dyn BrushSampler + Send + Sync>>,
    alpha: Option<Box<dyn BrushSampler + Send + Sync>>,
}

impl BrushLayer {
    pub fn component_count(&self) -> usize {
        self.components.len()
    }

    pub fn has_alpha(&self) -> bool {
        self.alpha.is_some()
    }

    pub fn sample(&self, x: u32, y: u32) -> LayerSample {
        let mut sample = LayerSample {
            value: [0.0; 3],
            alpha: self.alpha.as_ref().map_or(1.0, |alpha| alpha.value(x, y)),
        };
        for (slot, component) in sample.value.iter_mut().zip(&self.components) {
            *slot = component.value(x, y);
        }
        sample
    }
}

impl std::fmt::Debug for BrushLayer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BrushLayer")
            .field("components", &self.components.len())
            .field("alpha", &self.alpha.is_some())
            .finish()
    }
}

/// Samples of every layer a brush carries
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct BrushSample {
    layers: [Option<LayerSample>; BrushProperty::COUNT],
}

impl BrushSample {
    pub fn get(&self, property: BrushProperty) -> Option<LayerSample> {
        self.layers[property.index()]
    }
}

/// Brush texture made of per-property layers of equal size
#[derive(Debug)]
pub struct Brush {
    width: u32,
    height: u32,
    layers: [Option<BrushLayer>; BrushProperty::COUNT],
}

impl Brush {
    pub fn new(width: u32, height: u32) -> Result<Self, PaintError> {
        if width == 0 || height == 0 {
            return Err(PaintError::InvalidBrush(format!(
                "brush size {}x{} is empty",
                width, height
            )));
        }
        Ok(Self {
            width,
            height,
            layers: Default::default(),
        })
    }

    #[inline]
    pub fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    /// Install a layer for `property`, replacing any previous one
    ///
    /// Every component and the alpha mask must match the brush size, and the
    /// component count must match [`BrushProperty::components`].
    pub fn set_layer(
        &mut self,
        property: BrushProperty,
        components: Vec<Box<dyn BrushSampler + Send + Sync>>,
        alpha: Option<Box<dyn BrushSampler + Send + Sync>>,
    ) -> Result<&mut Self, PaintError> {
        if components.len() != property.components() {
            return Err(PaintError::InvalidBrush(format!(
                "{:?} layer needs {} components, got {}",
                property,
                property.components(),
                components.len()
            )));
        }
        for sampler in components.iter().chain(alpha.iter()) {
            let actual = (sampler.width(), sampler.height());
            if actual != self.size() {
                return Err(PaintError::BrushSizeMismatch {
                    expected: self.size(),
                    actual,
                });
            }
        }
        self.layers[property.index()] = Some(BrushLayer { components, alpha });
        Ok(self)
    }

    /// Install a layer built from grid channels
    pub fn set_grid_layer(
        &mut self,
        property: BrushProperty,
        components: Vec<GridChannel>,
        alpha: Option<GridChannel>,
    ) -> Result<&mut Self, PaintError> {
        let components = components
            .into_iter()
            .map(|channel| Box::new(channel) as Box<dyn BrushSampler + Send + Sync>)
            .collect();
        let alpha = alpha.map(|channel| Box::new(channel) as Box<dyn BrushSampler + Send + Sync>);
        self.set_layer(property, components, alpha)
    }

    /// Install a layer holding the same `values` and `alpha` at every texel
    pub fn set_solid(
        &mut self,
        property: BrushProperty,
        values: &[f32],
        alpha: f32,
    ) -> Result<&mut Self, PaintError> {
        let (width, height) = self.size();
        let components = values
            .iter()
            .map(|&value| GridChannel::filled(width, height, value))
            .collect();
        let alpha = (alpha != 1.0).then(|| GridChannel::filled(width, height, alpha));
        self.set_grid_layer(property, components, alpha)
    }

    pub fn remove_layer(&mut self, property: BrushProperty) -> Option<BrushLayer> {
        self.layers[property.index()].take()
    }

    pub fn layer(&self, property: BrushProperty) -> Option<&BrushLayer> {
        self.layers[property.index()].as_ref()
    }

    pub fn has_layer(&self, property: BrushProperty) -> bool {
        self.layer(property).is_some()
    }

    /// Properties with a layer, in enumeration order
    pub fn properties(&self) -> impl Iterator<Item = BrushProperty> + '_ {
        BrushProperty::ALL
            .into_iter()
            .filter(|&property| self.has_layer(property))
    }

    /// Sample every layer at texel `(x, y)`
    pub fn sample_texel(&self, x: u32, y: u32) -> BrushSample {
        let mut sample = BrushSample::default();
        for (slot, layer) in sample.layers.iter_mut().zip(&self.layers) {
            *slot = layer.as_ref().map(|layer| layer.sample(x, y));
        }
        sample
    }

    /// Weighted average of every layer over `(x, y, weight)` texels
    ///
    /// Returns None when the weights sum to zero.
    pub fn sample_weighted(&self, texels: &[(u32, u32, f32)]) -> Option<BrushSample> {
        let total: f32 = texels.iter().map(|&(_, _, weight)| weight).sum();
        if total <= 0.0 {
            return None;
        }

        let mut sample = BrushSample::default();
        for (slot, layer) in sample.layers.iter_mut().zip(&self.layers) {
            let Some(layer) = layer else {
                continue;
            };
            let mut sum = LayerSample::default();
            for &(x, y, weight) in texels {
                sum.add_weighted(&layer.sample(x, y), weight);
            }
            *slot = Some(sum.scaled(1.0 / total));
        }
        Some(sample)
    }
}
