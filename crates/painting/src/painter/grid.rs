//! Grid addressing: one brush texel per surfel

use glam::Vec3;
use surfels::{AttributeSet, SurfelId, SurfelStore};
use tracing::warn;

use super::{
    Painter, PaintSummary, SurfelGrid, apply_appearance, displacement_offset, painted_attributes, prepare_schema,
    write_geometry,
};
use crate::brush::{Brush, BrushProperty, BrushSample};
use crate::error::PaintError;

/// New geometry of one grid surfel after displacement
#[derive(Debug, Clone, Copy)]
struct DisplacedSurfel {
    id: SurfelId,
    position: Vec3,
    normal: Vec3,
    radius: f32,
}

impl Painter {
    /// Brush texel under every occupied grid cell
    ///
    /// Fails on a size mismatch or a stale id before anything is written.
    pub(super) fn grid_samples(
        &self,
        store: &SurfelStore,
        grid: &SurfelGrid,
        brush: &Brush,
    ) -> Result<Vec<(SurfelId, BrushSample)>, PaintError> {
        if grid.size() != brush.size() {
            return Err(PaintError::GridSizeMismatch {
                grid: grid.size(),
                brush: brush.size(),
            });
        }
        grid.occupied()
            .map(|(x, y, id)| -> Result<_, PaintError> {
                store.resolve(id)?;
                Ok((id, brush.sample_texel(x, y)))
            })
            .collect()
    }

    pub(super) fn paint_grid(
        &self,
        store: &mut SurfelStore,
        grid: &SurfelGrid,
        brush: &Brush,
    ) -> Result<PaintSummary, PaintError> {
        let samples = self.grid_samples(store, grid, brush)?;
        let displaced = if brush.has_layer(BrushProperty::Displacement) {
            self.displace(store, grid, brush)?
        } else {
            Vec::new()
        };

        if !samples.is_empty() {
            let mut written = painted_attributes(brush);
            if !displaced.is_empty() && !store.schema().contains(AttributeSet::TANGENT_AXES) {
                written |= AttributeSet::NORMAL | AttributeSet::RADIUS;
            }
            prepare_schema(store, written);
        }

        for (id, sample) in &samples {
            if let Some(mut surfel) = store.get_mut(*id) {
                apply_appearance(&mut surfel, sample);
            }
        }
        let schema = store.schema();
        for cell in &displaced {
            if let Some(mut surfel) = store.get_mut(cell.id) {
                surfel.set_position(cell.position);
                write_geometry(&mut surfel, schema, cell.normal, cell.radius);
            }
        }

        Ok(PaintSummary {
            painted: samples.len(),
            skipped: 0,
        })
    }

    /// Displace every grid surfel along its normal and re-derive normals and
    /// radii from finite differences of the displaced grid
    fn displace(
        &self,
        store: &SurfelStore,
        grid: &SurfelGrid,
        brush: &Brush,
    ) -> Result<Vec<DisplacedSurfel>, PaintError> {
        let Some(layer) = brush.layer(BrushProperty::Displacement) else {
            return Ok(Vec::new());
        };
        let (width, height) = grid.size();
        let cell_index = |x: u32, y: u32| (y as usize) * (width as usize) + (x as usize);

        let mut positions: Vec<Option<Vec3>> = vec![None; (width as usize) * (height as usize)];
        let mut previous = Vec::new();
        let mut radius_sum = 0.0;
        for (x, y, id) in grid.occupied() {
            let surfel = store.get(id).ok_or(surfels::StoreError::StaleHandle(id))?;
            let offset = displacement_offset(&layer.sample(x, y), &self.config);
            positions[cell_index(x, y)] = Some(surfel.position() + surfel.normal() * offset);
            radius_sum += surfel.radius();
            previous.push((x, y, id, surfel.normal(), surfel.radius()));
        }
        if previous.is_empty() {
            return Ok(Vec::new());
        }

        let expected = radius_sum / previous.len() as f32;
        let limit = self.config.max_radius_factor * expected;
        let at = |x: i64, y: i64| -> Option<Vec3> {
            if x < 0 || y < 0 || x >= width as i64 || y >= height as i64 {
                return None;
            }
            positions[cell_index(x as u32, y as u32)]
        };

        let mut displaced = Vec::with_capacity(previous.len());
        for (x, y, id, old_normal, old_radius) in previous {
            let (xi, yi) = (x as i64, y as i64);
            let Some(position) = at(xi, yi) else {
                continue;
            };
            let dx = difference(at(xi - 1, yi), position, at(xi + 1, yi));
            let dy = difference(at(xi, yi - 1), position, at(xi, yi + 1));

            let radius = match (dx, dy) {
                (None, None) => old_radius,
                _ => {
                    let spread = dx.map_or(0.0, Vec3::length).max(dy.map_or(0.0, Vec3::length));
                    std::f32::consts::FRAC_1_SQRT_2 * spread
                }
            };
            if radius > limit {
                warn!(
                    "Painter: grid cell ({}, {}) radius {:.4} exceeds {:.4}, paint rejected",
                    x, y, radius, limit
                );
                return Err(PaintError::RadiusBlowUp { radius, limit });
            }

            let normal = match (dx, dy) {
                (Some(dx), Some(dy)) => match dx.cross(dy).try_normalize() {
                    Some(normal) if normal.dot(old_normal) < 0.0 => -normal,
                    Some(normal) => normal,
                    None => old_normal,
                },
                _ => old_normal,
            };

            displaced.push(DisplacedSurfel {
                id,
                position,
                normal,
                radius,
            });
        }
        Ok(displaced)
    }
}

/// Central difference where both neighbors exist, one-sided otherwise
fn difference(previous: Option<Vec3>, here: Vec3, next: Option<Vec3>) -> Option<Vec3> {
    match (previous, next) {
        (Some(previous), Some(next)) => Some((next - previous) * 0.5),
        (None, Some(next)) => Some(next - here),
        (Some(previous), None) => Some(here - previous),
        (None, None) => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sampler::GridChannel;
    use crate::painter::PaintTarget;
    use surfels::{AttributeSet, Color, Notify};

    /// `size` x `size` flat grid with unit spacing in the xy plane
    fn flat_grid(size: u32, schema: AttributeSet) -> (SurfelStore, SurfelGrid) {
        let mut store = SurfelStore::with_schema(schema);
        let mut grid = SurfelGrid::new(size, size);
        for y in 0..size {
            for x in 0..size {
                let id = store.add_surfel(Notify::Suppress);
                store
                    .get_mut(id)
                    .unwrap()
                    .set_position(Vec3::new(x as f32, y as f32, 0.0))
                    .set_radius(std::f32::consts::FRAC_1_SQRT_2);
                grid.set(x, y, Some(id));
            }
        }
        (store, grid)
    }

    #[test]
    fn test_grid_size_must_match_brush() {
        let (mut store, grid) = flat_grid(3, AttributeSet::POSITION | AttributeSet::RADIUS);
        let mut brush = Brush::new(4, 4).unwrap();
        brush.set_solid(BrushProperty::Shininess, &[1.0], 1.0).unwrap();
        assert!(matches!(
            Painter::default().paint(&mut store, PaintTarget::Grid(&grid), &brush),
            Err(PaintError::GridSizeMismatch { .. })
        ));
    }

    #[test]
    fn test_alpha_blends_with_old_value() {
        let schema = AttributeSet::POSITION | AttributeSet::RADIUS | AttributeSet::DIFFUSE_COLOR;
        let (mut store, grid) = flat_grid(2, schema);
        for index in 0..store.len() {
            store.at_mut(index).unwrap().set_diffuse_color(Color::rgb(0, 0, 0));
        }
        let mut brush = Brush::new(2, 2).unwrap();
        brush
            .set_solid(BrushProperty::DiffuseColor, &[1.0, 1.0, 1.0], 0.25)
            .unwrap();

        let summary = Painter::default()
            .paint(&mut store, PaintTarget::Grid(&grid), &brush)
            .unwrap();

        assert_eq!(summary.painted, 4);
        for surfel in store.iter() {
            assert_eq!(surfel.diffuse_color(), Color::rgb(64, 64, 64));
        }
    }

    #[test]
    fn test_holes_are_left_alone() {
        let (mut store, mut grid) = flat_grid(2, AttributeSet::POSITION | AttributeSet::RADIUS);
        let hole = grid.get(1, 1).unwrap();
        grid.set(1, 1, None);
        let mut brush = Brush::new(2, 2).unwrap();
        brush.set_solid(BrushProperty::Shininess, &[0.9], 1.0).unwrap();

        let summary = Painter::default()
            .paint(&mut store, PaintTarget::Grid(&grid), &brush)
            .unwrap();

        assert_eq!(summary.painted, 3);
        assert_eq!(store.get(hole).unwrap().shininess(), surfels::DEFAULT_SHININESS);
        assert_eq!(store.get(grid.get(0, 0).unwrap()).unwrap().shininess(), 0.9);
    }

    #[test]
    fn test_displacement_tilts_normals() {
        let schema = AttributeSet::POSITION | AttributeSet::NORMAL | AttributeSet::RADIUS;
        let (mut store, grid) = flat_grid(4, schema);
        // Ramp along x: height = 0.5 * x
        let ramp: Vec<f32> = (0..16).map(|i| 0.5 * (i % 4) as f32).collect();
        let mut brush = Brush::new(4, 4).unwrap();
        brush
            .set_grid_layer(
                BrushProperty::Displacement,
                vec![GridChannel::from_values(4, 4, ramp).unwrap()],
                None,
            )
            .unwrap();

        Painter::default()
            .paint(&mut store, PaintTarget::Grid(&grid), &brush)
            .unwrap();

        let expected_normal = Vec3::new(-0.5, 0.0, 1.0).normalize();
        for (x, y, id) in grid.occupied() {
            let surfel = store.get(id).unwrap();
            assert!((surfel.position().z - 0.5 * x as f32).abs() < 1e-5);
            assert!((surfel.normal() - expected_normal).length() < 1e-4, "cell ({x}, {y})");
            let spacing = Vec3::new(1.0, 0.0, 0.5).length();
            assert!((surfel.radius() - std::f32::consts::FRAC_1_SQRT_2 * spacing).abs() < 1e-4);
        }
    }

    #[test]
    fn test_interior_hole_uses_one_sided_differences() {
        let schema = AttributeSet::POSITION | AttributeSet::NORMAL | AttributeSet::RADIUS;
        let (mut store, mut grid) = flat_grid(5, schema);
        let hole = grid.get(2, 2).unwrap();
        grid.set(2, 2, None);
        // Parabola along x so central and one-sided slopes differ: height = 0.25 * x^2
        let height = |x: u32| 0.25 * (x * x) as f32;
        let bowl: Vec<f32> = (0..25).map(|i| height(i % 5)).collect();
        let mut brush = Brush::new(5, 5).unwrap();
        brush
            .set_grid_layer(
                BrushProperty::Displacement,
                vec![GridChannel::from_values(5, 5, bowl).unwrap()],
                None,
            )
            .unwrap();

        Painter::default()
            .paint(&mut store, PaintTarget::Grid(&grid), &brush)
            .unwrap();

        assert_eq!(store.get(hole).unwrap().position(), Vec3::new(2.0, 2.0, 0.0));

        // Left of the hole: backward difference in x, central in y
        let left = store.get(grid.get(1, 2).unwrap()).unwrap();
        let dx = Vec3::new(1.0, 0.0, height(1) - height(0));
        assert!((left.normal() - dx.cross(Vec3::Y).normalize()).length() < 1e-4);
        assert!((left.radius() - std::f32::consts::FRAC_1_SQRT_2 * dx.length()).abs() < 1e-4);

        // Right of the hole: forward difference in x
        let right = store.get(grid.get(3, 2).unwrap()).unwrap();
        let dx = Vec3::new(1.0, 0.0, height(4) - height(3));
        assert!((right.normal() - dx.cross(Vec3::Y).normalize()).length() < 1e-4);
        assert!((right.radius() - std::f32::consts::FRAC_1_SQRT_2 * dx.length()).abs() < 1e-4);

        // Above the hole: x is central, y falls back to the row below
        let above = store.get(grid.get(2, 1).unwrap()).unwrap();
        let dx = Vec3::new(1.0, 0.0, (height(3) - height(1)) * 0.5);
        assert!((above.normal() - dx.cross(Vec3::Y).normalize()).length() < 1e-4);
    }

    #[test]
    fn test_displacement_with_stored_tangent_axes_refreshes_normal() {
        let (mut store, grid) = flat_grid(
            3,
            AttributeSet::POSITION | AttributeSet::NORMAL | AttributeSet::TANGENT_AXES,
        );
        // The fixture's radius writes add a radius column next to the axes
        let before = store.schema();
        let ramp: Vec<f32> = (0..9).map(|i| 0.5 * (i % 3) as f32).collect();
        let mut brush = Brush::new(3, 3).unwrap();
        brush
            .set_grid_layer(
                BrushProperty::Displacement,
                vec![GridChannel::from_values(3, 3, ramp).unwrap()],
                None,
            )
            .unwrap();

        Painter::default()
            .paint(&mut store, PaintTarget::Grid(&grid), &brush)
            .unwrap();

        let expected = Vec3::new(-0.5, 0.0, 1.0).normalize();
        assert_eq!(store.schema(), before);
        for surfel in store.iter() {
            assert!((surfel.normal() - expected).length() < 1e-4);
            let axes = surfel.tangent_axes();
            assert!((surfels::normal_from_tangent_axes(axes) - expected).length() < 1e-4);
        }
    }

    #[test]
    fn test_tearing_displacement_is_rejected_without_writes() {
        let schema = AttributeSet::POSITION | AttributeSet::NORMAL | AttributeSet::RADIUS;
        let (mut store, grid) = flat_grid(3, schema);
        let before: Vec<Vec3> = store.iter().map(|s| s.position()).collect();

        let mut spike = GridChannel::new(3, 3);
        spike.set(1, 1, 100.0);
        let mut brush = Brush::new(3, 3).unwrap();
        brush
            .set_grid_layer(BrushProperty::Displacement, vec![spike], None)
            .unwrap()
            .set_solid(BrushProperty::Shininess, &[0.1], 1.0)
            .unwrap();

        let result = Painter::default().paint(&mut store, PaintTarget::Grid(&grid), &brush);

        assert!(matches!(result, Err(PaintError::RadiusBlowUp { .. })));
        let after: Vec<Vec3> = store.iter().map(|s| s.position()).collect();
        assert_eq!(before, after);
        assert!(!store.schema().contains(AttributeSet::SHININESS));
    }

    #[test]
    fn test_stale_grid_id_fails_before_writes() {
        let (mut store, grid) = flat_grid(2, AttributeSet::POSITION | AttributeSet::RADIUS);
        let removed = grid.get(1, 1).unwrap();
        store.remove_surfel(removed, Notify::Suppress).unwrap();
        let mut brush = Brush::new(2, 2).unwrap();
        brush.set_solid(BrushProperty::Shininess, &[0.9], 1.0).unwrap();

        let result = Painter::default().paint(&mut store, PaintTarget::Grid(&grid), &brush);
        assert!(matches!(result, Err(PaintError::Store(_))));
        assert!(!store.schema().contains(AttributeSet::SHININESS));
    }
}
