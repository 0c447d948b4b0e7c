//! Surfel to surfel resampling on a texel grid
//!
//! Every source surfel is splatted into a `width` x `height` grid over the
//! unit texture square through its EWA footprint. Each cell keeps weighted
//! sums of position, normal, radius and diffuse color. Finalizing turns every
//! cell whose weight reaches the coverage threshold into exactly one new
//! surfel; the remaining attributes are copied from the last source surfel
//! that touched the cell. Source surfels whose texture coordinate lies in the
//! unit square are then removed; surfels outside it are kept.

use glam::{Mat2, Vec2, Vec3};
use serde::{Deserialize, Serialize};
use stipple_config::ResampleConfig;
use surfels::{
    AssociatedSurfels, AttributeSet, Color, LocalFrame, Notify, StoreError, SurfelId, SurfelRecord,
    SurfelStore, tangent_axes_from_normal,
};
use tracing::debug;

use crate::ewa::{self, Footprint};

#[derive(Debug, Clone, Copy, Default)]
struct Cell {
    weight: f32,
    position: Vec3,
    normal: Vec3,
    radius: f32,
    color: Vec3,
    last: Option<SurfelId>,
}

/// Outcome of finalizing a resample
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ResampleSummary {
    /// Surfels materialized from covered cells
    pub created: usize,
    /// Source surfels removed from the resampled domain
    pub removed: usize,
    /// Touched cells below the coverage threshold
    pub discarded_cells: usize,
}

/// Per-texel weighted accumulation buffer for one resample
#[derive(Debug, Clone)]
pub struct ResampleAccumulator {
    width: u32,
    height: u32,
    config: ResampleConfig,
    cells: Vec<Cell>,
}

impl ResampleAccumulator {
    pub fn new(width: u32, height: u32, config: ResampleConfig) -> Self {
        Self {
            width,
            height,
            config,
            cells: vec![Cell::default(); (width as usize) * (height as usize)],
        }
    }

    #[inline]
    pub fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    /// Accumulated weight of cell `(x, y)`
    pub fn coverage(&self, x: u32, y: u32) -> Option<f32> {
        if x >= self.width || y >= self.height {
            return None;
        }
        Some(self.cells[self.index(x, y)].weight)
    }

    /// Drop every accumulated contribution
    pub fn reset(&mut self) {
        self.cells.fill(Cell::default());
    }

    /// Splat surfel `id` into the grid
    ///
    /// `jacobian` maps the surfel's local tangent frame to texture
    /// coordinates. Returns whether any cell was touched.
    pub fn rasterize_surfel(
        &mut self,
        store: &SurfelStore,
        id: SurfelId,
        jacobian: Mat2,
    ) -> Result<bool, StoreError> {
        let surfel = store.get(id).ok_or(StoreError::StaleHandle(id))?;
        let scale = Vec2::new(self.width as f32, self.height as f32);
        let normal = surfel.normal();
        let frame = LocalFrame::from_normal(normal);
        let footprint = Footprint {
            kernel: frame.kernel(surfel.tangent_axes()),
            jacobian: Mat2::from_diagonal(scale) * jacobian,
            center: surfel.texture_coordinate() * scale,
        };

        let position = surfel.position();
        let radius = surfel.radius();
        let color = surfel.diffuse_color().to_rgb_f32();
        let width = self.width as usize;
        let cells = &mut self.cells;

        let coverage = ewa::rasterize(&footprint, &self.config.ewa, self.width, self.height, |x, y, weight| {
            let cell = &mut cells[(y as usize) * width + (x as usize)];
            cell.weight += weight;
            cell.position += position * weight;
            cell.normal += normal * weight;
            cell.radius += radius * weight;
            cell.color += color * weight;
            cell.last = Some(id);
        });
        Ok(coverage.is_some_and(|coverage| coverage.pixels > 0))
    }

    /// Materialize covered cells into `target` and remove the resampled
    /// surfels from `source`
    ///
    /// `target` is extended to store every attribute `source` stores.
    pub fn finalize_into(self, source: &mut SurfelStore, target: &mut SurfelStore) -> ResampleSummary {
        let (records, discarded_cells) = self.materialize(source);

        target.enable(
            source.schema() | AttributeSet::POSITION | AttributeSet::TEXTURE_COORDINATE,
            Notify::Emit,
        );
        target.reserve(target.len() + records.len());
        for record in &records {
            target.add_surfel_from(record, Notify::Suppress);
        }
        target.notify_collection_changed();

        let removed = source.remove_surfels(&in_domain(source), Notify::Emit);
        self.summarize(records.len(), removed, discarded_cells)
    }

    /// Replace the resampled surfels of `store` with the materialized cells
    pub fn finalize_in_place(self, store: &mut SurfelStore) -> ResampleSummary {
        let (records, discarded_cells) = self.materialize(store);
        let originals = in_domain(store);

        store.enable(AttributeSet::POSITION | AttributeSet::TEXTURE_COORDINATE, Notify::Emit);
        store.reserve(store.len() + records.len());
        for record in &records {
            store.add_surfel_from(record, Notify::Suppress);
        }
        let removed = store.remove_surfels(&originals, Notify::Suppress);
        store.notify_collection_changed();

        self.summarize(records.len(), removed, discarded_cells)
    }

    /// One record per covered cell, in row-major cell order, plus the number
    /// of touched cells below the threshold
    fn materialize(&self, source: &SurfelStore) -> (Vec<SurfelRecord>, usize) {
        let mut records = Vec::new();
        let mut discarded = 0;

        for (index, cell) in self.cells.iter().enumerate() {
            if cell.weight <= 0.0 {
                continue;
            }
            if cell.weight < self.config.coverage_threshold {
                discarded += 1;
                continue;
            }

            let mut record = cell
                .last
                .and_then(|id| source.get(id))
                .map(|surfel| surfel.record())
                .unwrap_or_default();
            let inverse = 1.0 / cell.weight;
            let x = (index % self.width as usize) as f32;
            let y = (index / self.width as usize) as f32;

            record.position = cell.position * inverse;
            record.normal = (cell.normal * inverse).try_normalize().unwrap_or(record.normal);
            record.radius = cell.radius * inverse;
            record.tangent_axes = tangent_axes_from_normal(record.normal, record.radius);
            record.diffuse_color = Color::from_rgb_f32(cell.color * inverse, record.diffuse_color.a);
            record.texture_coordinate = Vec2::new(
                (x + 0.5) / self.width as f32,
                (y + 0.5) / self.height as f32,
            );
            record.associated = AssociatedSurfels::default();
            records.push(record);
        }
        (records, discarded)
    }

    fn summarize(&self, created: usize, removed: usize, discarded_cells: usize) -> ResampleSummary {
        let summary = ResampleSummary {
            created,
            removed,
            discarded_cells,
        };
        debug!(
            "ResampleAccumulator: {}x{} grid created {} surfels, removed {}, discarded {} cells",
            self.width, self.height, summary.created, summary.removed, summary.discarded_cells
        );
        summary
    }

    #[inline]
    fn index(&self, x: u32, y: u32) -> usize {
        (y as usize) * (self.width as usize) + (x as usize)
    }
}

/// Ids of surfels whose texture coordinate lies in the unit square
fn in_domain(store: &SurfelStore) -> Vec<SurfelId> {
    store
        .iter()
        .filter(|surfel| {
            let uv = surfel.texture_coordinate();
            (0.0..=1.0).contains(&uv.x) && (0.0..=1.0).contains(&uv.y)
        })
        .map(|surfel| surfel.id())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn schema() -> AttributeSet {
        AttributeSet::POSITION
            | AttributeSet::NORMAL
            | AttributeSet::RADIUS
            | AttributeSet::DIFFUSE_COLOR
            | AttributeSet::TEXTURE_COORDINATE
    }

    fn surfel(store: &mut SurfelStore, uv: Vec2, radius: f32, color: Color) -> SurfelId {
        let id = store.add_surfel(Notify::Suppress);
        store
            .get_mut(id)
            .unwrap()
            .set_position(uv.extend(0.0))
            .set_radius(radius)
            .set_diffuse_color(color)
            .set_texture_coordinate(uv);
        id
    }

    #[test]
    fn test_single_surfel_covers_its_cell() {
        // Centered on texel (4, 4) with a footprint narrower than a texel
        let uv = Vec2::splat(4.5 / 8.0);
        let mut source = SurfelStore::with_schema(schema());
        let id = surfel(&mut source, uv, 0.01, Color::rgb(10, 20, 30));
        let mut accumulator = ResampleAccumulator::new(8, 8, ResampleConfig::default());

        assert!(accumulator.rasterize_surfel(&source, id, Mat2::IDENTITY).unwrap());
        assert!(accumulator.coverage(3, 3).unwrap() > 0.0);
        assert_eq!(accumulator.coverage(8, 0), None);

        let mut target = SurfelStore::new();
        let summary = accumulator.finalize_into(&mut source, &mut target);

        assert_eq!(summary.created, 1);
        assert_eq!(summary.removed, 1);
        assert!(summary.discarded_cells > 0);
        assert!(source.is_empty());
        let created = target.at(0).unwrap();
        assert_eq!(created.diffuse_color(), Color::rgb(10, 20, 30));
        assert!((created.radius() - 0.01).abs() < 1e-6);
        assert!((created.position() - uv.extend(0.0)).length() < 1e-5);
        assert!((created.texture_coordinate() - uv).length() < 1e-6);
    }

    #[test]
    fn test_low_coverage_cells_are_discarded() {
        let mut source = SurfelStore::with_schema(schema());
        let id = surfel(&mut source, Vec2::splat(0.5), 0.05, Color::rgb(1, 2, 3));
        let config = ResampleConfig {
            coverage_threshold: 0.05,
            ..ResampleConfig::default()
        };
        let mut accumulator = ResampleAccumulator::new(16, 16, config);
        accumulator.rasterize_surfel(&source, id, Mat2::IDENTITY).unwrap();

        let mut target = SurfelStore::new();
        let summary = accumulator.finalize_into(&mut source, &mut target);

        // The footprint's tail cells fall below the threshold
        assert!(summary.discarded_cells > 0);
        assert!(summary.created > 0);
        assert_eq!(target.len(), summary.created);
    }

    #[test]
    fn test_out_of_domain_sources_are_kept() {
        let mut store = SurfelStore::with_schema(schema());
        let inside = surfel(&mut store, Vec2::splat(0.5), 0.2, Color::rgb(9, 9, 9));
        let outside = surfel(&mut store, Vec2::new(3.0, 0.5), 0.2, Color::rgb(9, 9, 9));
        let config = ResampleConfig {
            coverage_threshold: 0.05,
            ..ResampleConfig::default()
        };
        let mut accumulator = ResampleAccumulator::new(4, 4, config);
        accumulator.rasterize_surfel(&store, inside, Mat2::IDENTITY).unwrap();
        assert!(!accumulator.rasterize_surfel(&store, outside, Mat2::IDENTITY).unwrap());

        let summary = accumulator.finalize_in_place(&mut store);

        assert_eq!(summary.removed, 1);
        assert!(summary.created > 0);
        assert_eq!(store.len(), summary.created + 1);
        assert!(!store.contains(inside));
        let kept: Vec<_> = store
            .iter()
            .filter(|surfel| surfel.texture_coordinate().x > 1.0)
            .collect();
        assert_eq!(kept.len(), 1);
    }

    #[test]
    fn test_stale_surfel_is_an_error() {
        let mut store = SurfelStore::with_schema(schema());
        let id = surfel(&mut store, Vec2::splat(0.5), 0.2, Color::rgb(9, 9, 9));
        store.remove_surfel(id, Notify::Suppress).unwrap();
        let mut accumulator = ResampleAccumulator::new(4, 4, ResampleConfig::default());
        assert_eq!(
            accumulator.rasterize_surfel(&store, id, Mat2::IDENTITY),
            Err(StoreError::StaleHandle(id))
        );
    }
}
