//! Brush to surfel transfer
//!
//! Two addressing modes:
//! - [`PaintTarget::Grid`]: surfels laid out on the brush's own texel grid,
//!   painted 1:1. Displacement re-derives normals and radii from the
//!   displaced grid and rejects the whole paint if the surface tears.
//! - [`PaintTarget::TextureCoordinates`]: arbitrary surfels addressed by their
//!   texture coordinate, sampled through an EWA footprint when a Jacobian is
//!   supplied and from the nearest texel otherwise.
//!
//! Every painted property blends as `alpha * brush + (1 - alpha) * old`.
//! Writing a property the store does not keep yet upgrades its schema.

mod grid;
mod texture;

use glam::{Mat2, Vec3};
use serde::{Deserialize, Serialize};
use stipple_config::PaintConfig;
use surfels::{
    AttributeSet, Color, Notify, SelectionChannel, SurfelId, SurfelMut, SurfelStore, tangent_axes_from_normal,
};
use tracing::debug;

use crate::brush::{Brush, BrushProperty, BrushSample, LayerSample};
use crate::error::PaintError;

/// Surfels arranged on a regular grid, row-major, `None` marking holes
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SurfelGrid {
    width: u32,
    height: u32,
    cells: Vec<Option<SurfelId>>,
}

impl SurfelGrid {
    /// Create a grid with every cell empty
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            cells: vec![None; (width as usize) * (height as usize)],
        }
    }

    /// Wrap row-major cells; None if the length is not `width * height`
    pub fn from_cells(width: u32, height: u32, cells: Vec<Option<SurfelId>>) -> Option<Self> {
        (cells.len() == (width as usize) * (height as usize)).then_some(Self {
            width,
            height,
            cells,
        })
    }

    #[inline]
    pub fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    pub fn get(&self, x: u32, y: u32) -> Option<SurfelId> {
        if x >= self.width || y >= self.height {
            return None;
        }
        self.cells[self.index(x, y)]
    }

    pub fn set(&mut self, x: u32, y: u32, id: Option<SurfelId>) {
        if x >= self.width || y >= self.height {
            return;
        }
        let index = self.index(x, y);
        self.cells[index] = id;
    }

    /// Occupied cells as `(x, y, id)` in row-major order
    pub fn occupied(&self) -> impl Iterator<Item = (u32, u32, SurfelId)> + '_ {
        self.cells.iter().enumerate().filter_map(|(index, cell)| {
            let id = (*cell)?;
            let width = self.width as usize;
            Some(((index % width) as u32, (index / width) as u32, id))
        })
    }

    #[inline]
    fn index(&self, x: u32, y: u32) -> usize {
        (y as usize) * (self.width as usize) + (x as usize)
    }
}

/// Surfel painted through its texture coordinate
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct UvTarget {
    pub surfel: SurfelId,
    /// Derivative of texture coordinates with respect to the surfel's local
    /// frame; enables EWA sampling when present
    pub jacobian: Option<Mat2>,
}

impl UvTarget {
    pub fn nearest(surfel: SurfelId) -> Self {
        Self {
            surfel,
            jacobian: None,
        }
    }

    pub fn filtered(surfel: SurfelId, jacobian: Mat2) -> Self {
        Self {
            surfel,
            jacobian: Some(jacobian),
        }
    }
}

/// Which surfels a paint call addresses
#[derive(Debug, Clone, Copy)]
pub enum PaintTarget<'a> {
    Grid(&'a SurfelGrid),
    TextureCoordinates(&'a [UvTarget]),
}

/// Outcome of a paint or select call
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct PaintSummary {
    /// Surfels written
    pub painted: usize,
    /// Targets skipped: stale ids or texture coordinates outside the brush
    pub skipped: usize,
}

/// Applies brushes to surfel stores
#[derive(Debug, Clone, Default)]
pub struct Painter {
    config: PaintConfig,
}

impl Painter {
    pub fn new(config: PaintConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &PaintConfig {
        &self.config
    }

    /// Paint every layer of `brush` except selection onto the targeted surfels
    ///
    /// On error the store is left unchanged.
    pub fn paint(
        &self,
        store: &mut SurfelStore,
        target: PaintTarget<'_>,
        brush: &Brush,
    ) -> Result<PaintSummary, PaintError> {
        let summary = match target {
            PaintTarget::Grid(grid) => self.paint_grid(store, grid, brush)?,
            PaintTarget::TextureCoordinates(targets) => self.paint_texture(store, targets, brush),
        };

        debug!(
            "Painter::paint: painted {} surfels, skipped {} ({:?})",
            summary.painted,
            summary.skipped,
            brush.properties().collect::<Vec<_>>()
        );
        if summary.painted > 0 {
            store.notify_collection_changed();
        }
        Ok(summary)
    }

    /// Threshold the brush's selection layer into the three selection flags
    ///
    /// A channel at or above the set threshold selects, at or below the clear
    /// threshold deselects; values in between leave the flag unchanged.
    pub fn select(
        &self,
        store: &mut SurfelStore,
        target: PaintTarget<'_>,
        brush: &Brush,
    ) -> Result<PaintSummary, PaintError> {
        if !brush.has_layer(BrushProperty::Selection) {
            return Err(PaintError::MissingChannel(BrushProperty::Selection));
        }

        let (samples, skipped) = match target {
            PaintTarget::Grid(grid) => (self.grid_samples(store, grid, brush)?, 0),
            PaintTarget::TextureCoordinates(targets) => self.texture_samples(store, targets, brush),
        };

        if !samples.is_empty() {
            prepare_schema(store, AttributeSet::FLAGS);
        }

        let mut painted = 0;
        for (id, sample) in samples {
            let Some(selection) = sample.get(BrushProperty::Selection) else {
                continue;
            };
            let Some(mut surfel) = store.get_mut(id) else {
                continue;
            };
            let mut flags = surfel.as_ref().flags();
            for (component, channel) in SelectionChannel::ALL.into_iter().enumerate() {
                let current = flags.contains(channel.flag());
                let value = selection.alpha * selection.value[component]
                    + (1.0 - selection.alpha) * if current { 1.0 } else { 0.0 };
                if value >= self.config.select_set_threshold {
                    flags.insert(channel.flag());
                } else if value <= self.config.select_clear_threshold {
                    flags.remove(channel.flag());
                }
            }
            surfel.set_flags(flags);
            painted += 1;
        }

        let summary = PaintSummary { painted, skipped };
        debug!(
            "Painter::select: updated {} surfels, skipped {}",
            summary.painted, summary.skipped
        );
        if painted > 0 {
            store.notify_collection_changed();
        }
        Ok(summary)
    }
}

/// `alpha * new + (1 - alpha) * old`
#[inline]
pub(crate) fn blend_scalar(old: f32, sample: &LayerSample) -> f32 {
    sample.alpha * sample.scalar() + (1.0 - sample.alpha) * old
}

/// Blend RGB, keeping the old alpha
pub(crate) fn blend_color(old: Color, sample: &LayerSample) -> Color {
    let new = Vec3::from_array(sample.value);
    let rgb = new * sample.alpha + old.to_rgb_f32() * (1.0 - sample.alpha);
    Color::from_rgb_f32(rgb, old.a)
}

/// Displacement offset along the normal
#[inline]
pub(crate) fn displacement_offset(sample: &LayerSample, config: &PaintConfig) -> f32 {
    sample.alpha * sample.scalar() * config.displacement_scale
}

/// Blend every appearance layer of `sample` into `surfel`
pub(crate) fn apply_appearance(surfel: &mut SurfelMut<'_>, sample: &BrushSample) {
    if let Some(layer) = sample.get(BrushProperty::DiffuseColor) {
        let old = surfel.as_ref().diffuse_color();
        surfel.set_diffuse_color(blend_color(old, &layer));
    }
    if let Some(layer) = sample.get(BrushProperty::SpecularColor) {
        let old = surfel.as_ref().specular_color();
        surfel.set_specular_color(blend_color(old, &layer));
    }
    if let Some(layer) = sample.get(BrushProperty::AmbientCoefficient) {
        let old = surfel.as_ref().ambient_coefficient();
        surfel.set_ambient_coefficient(blend_scalar(old, &layer));
    }
    if let Some(layer) = sample.get(BrushProperty::DiffuseCoefficient) {
        let old = surfel.as_ref().diffuse_coefficient();
        surfel.set_diffuse_coefficient(blend_scalar(old, &layer));
    }
    if let Some(layer) = sample.get(BrushProperty::SpecularCoefficient) {
        let old = surfel.as_ref().specular_coefficient();
        surfel.set_specular_coefficient(blend_scalar(old, &layer));
    }
    if let Some(layer) = sample.get(BrushProperty::Shininess) {
        let old = surfel.as_ref().shininess();
        surfel.set_shininess(blend_scalar(old, &layer));
    }
}

/// Write a new normal and radius through whichever geometry the schema stores
///
/// Stored tangent axes carry both; the store refreshes stored normal and
/// radius from them.
pub(crate) fn write_geometry(surfel: &mut SurfelMut<'_>, schema: AttributeSet, normal: Vec3, radius: f32) {
    if schema.contains(AttributeSet::TANGENT_AXES) {
        surfel.set_tangent_axes(tangent_axes_from_normal(normal, radius));
    } else {
        surfel.set_normal(normal).set_radius(radius);
    }
}

/// Attributes written by the appearance and displacement layers of `brush`
pub(crate) fn painted_attributes(brush: &Brush) -> AttributeSet {
    brush
        .properties()
        .filter(|&property| property != BrushProperty::Selection)
        .fold(AttributeSet::empty(), |set, property| set | property.attributes())
}

/// Store everything a paint is about to write in a single schema change
pub(crate) fn prepare_schema(store: &mut SurfelStore, written: AttributeSet) {
    if !store.schema().contains(written) {
        store.enable(written, Notify::Emit);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn selection_brush(values: [f32; 3]) -> Brush {
        let mut brush = Brush::new(1, 1).unwrap();
        brush
            .set_solid(BrushProperty::Selection, &values, 1.0)
            .unwrap();
        brush
    }

    fn single_surfel() -> (SurfelStore, SurfelGrid) {
        let mut store = SurfelStore::with_schema(AttributeSet::POSITION | AttributeSet::FLAGS);
        let id = store.add_surfel(Notify::Suppress);
        let grid = SurfelGrid::from_cells(1, 1, vec![Some(id)]).unwrap();
        (store, grid)
    }

    #[test]
    fn test_select_thresholds_with_hysteresis() {
        let (mut store, grid) = single_surfel();
        let painter = Painter::default();
        let id = grid.get(0, 0).unwrap();

        painter
            .select(&mut store, PaintTarget::Grid(&grid), &selection_brush([0.9, 0.5, 0.1]))
            .unwrap();
        let surfel = store.get(id).unwrap();
        assert!(surfel.is_selected(SelectionChannel::One));
        assert!(!surfel.is_selected(SelectionChannel::Two));
        assert!(!surfel.is_selected(SelectionChannel::Three));

        // Values between the thresholds keep the previous state
        painter
            .select(&mut store, PaintTarget::Grid(&grid), &selection_brush([0.5, 0.5, 0.5]))
            .unwrap();
        assert!(store.get(id).unwrap().is_selected(SelectionChannel::One));

        painter
            .select(&mut store, PaintTarget::Grid(&grid), &selection_brush([0.2, 0.7, 0.66]))
            .unwrap();
        let surfel = store.get(id).unwrap();
        assert!(!surfel.is_selected(SelectionChannel::One));
        assert!(surfel.is_selected(SelectionChannel::Two));
        assert!(surfel.is_selected(SelectionChannel::Three));
    }

    #[test]
    fn test_select_requires_selection_layer() {
        let (mut store, grid) = single_surfel();
        let mut brush = Brush::new(1, 1).unwrap();
        brush.set_solid(BrushProperty::Shininess, &[1.0], 1.0).unwrap();
        assert!(matches!(
            Painter::default().select(&mut store, PaintTarget::Grid(&grid), &brush),
            Err(PaintError::MissingChannel(BrushProperty::Selection))
        ));
    }

    #[test]
    fn test_blend_rules() {
        let half = LayerSample {
            value: [1.0, 0.0, 0.0],
            alpha: 0.5,
        };
        assert!((blend_scalar(0.0, &half) - 0.5).abs() < 1e-6);
        let color = blend_color(Color::new(0, 0, 0, 7), &half);
        assert_eq!(color, Color::new(128, 0, 0, 7));
    }

    #[test]
    fn test_grid_occupied_cells() {
        let mut store = SurfelStore::new();
        let a = store.add_surfel(Notify::Suppress);
        let b = store.add_surfel(Notify::Suppress);
        let mut grid = SurfelGrid::new(3, 2);
        grid.set(2, 0, Some(a));
        grid.set(1, 1, Some(b));
        grid.set(7, 7, Some(a));
        assert_eq!(grid.occupied().collect::<Vec<_>>(), vec![(2, 0, a), (1, 1, b)]);
        assert!(SurfelGrid::from_cells(2, 2, vec![None; 3]).is_none());
    }
}
