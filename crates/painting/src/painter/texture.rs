//! Texture-coordinate addressing

use glam::{Mat2, Vec2};
use surfels::{LocalFrame, SurfelId, SurfelRef, SurfelStore};
use tracing::trace;

use super::{
    Painter, PaintSummary, UvTarget, apply_appearance, displacement_offset, painted_attributes, prepare_schema,
};
use crate::brush::{Brush, BrushProperty, BrushSample};
use crate::ewa::{self, Footprint};

impl Painter {
    /// Brush sample for every target whose surfel is live and inside the brush
    ///
    /// Returns the samples and the number of skipped targets.
    pub(super) fn texture_samples(
        &self,
        store: &SurfelStore,
        targets: &[UvTarget],
        brush: &Brush,
    ) -> (Vec<(SurfelId, BrushSample)>, usize) {
        let mut samples = Vec::with_capacity(targets.len());
        let mut skipped = 0;

        for target in targets {
            let Some(surfel) = store.get(target.surfel) else {
                trace!("Painter: stale target {:?} skipped", target.surfel);
                skipped += 1;
                continue;
            };
            let uv = surfel.texture_coordinate();
            if !(0.0..=1.0).contains(&uv.x) || !(0.0..=1.0).contains(&uv.y) {
                skipped += 1;
                continue;
            }

            let filtered = target
                .jacobian
                .and_then(|jacobian| self.filtered_sample(surfel, uv, jacobian, brush));
            let sample = filtered.unwrap_or_else(|| {
                let (x, y) = nearest_texel(uv, brush.size());
                brush.sample_texel(x, y)
            });
            samples.push((target.surfel, sample));
        }
        (samples, skipped)
    }

    /// Weighted average of the brush over the surfel's EWA footprint
    ///
    /// None when the footprint is rejected or touches no texel.
    fn filtered_sample(
        &self,
        surfel: SurfelRef<'_>,
        uv: Vec2,
        jacobian: Mat2,
        brush: &Brush,
    ) -> Option<BrushSample> {
        let (width, height) = brush.size();
        let scale = Vec2::new(width as f32, height as f32);
        let frame = LocalFrame::from_normal(surfel.normal());
        let footprint = Footprint {
            kernel: frame.kernel(surfel.tangent_axes()),
            jacobian: Mat2::from_diagonal(scale) * jacobian,
            center: uv * scale,
        };

        let mut texels = Vec::new();
        ewa::rasterize(&footprint, &self.config.ewa, width, height, |x, y, weight| {
            texels.push((x, y, weight))
        })?;
        brush.sample_weighted(&texels)
    }

    pub(super) fn paint_texture(
        &self,
        store: &mut SurfelStore,
        targets: &[UvTarget],
        brush: &Brush,
    ) -> PaintSummary {
        let (samples, skipped) = self.texture_samples(store, targets, brush);
        if !samples.is_empty() {
            prepare_schema(store, painted_attributes(brush));
        }

        for (id, sample) in &samples {
            let Some(mut surfel) = store.get_mut(*id) else {
                continue;
            };
            apply_appearance(&mut surfel, sample);
            if let Some(layer) = sample.get(BrushProperty::Displacement) {
                let current = surfel.as_ref();
                let position = current.position() + current.normal() * displacement_offset(&layer, &self.config);
                surfel.set_position(position);
            }
        }

        PaintSummary {
            painted: samples.len(),
            skipped,
        }
    }
}

/// Texel containing `uv`, clamped to the brush
fn nearest_texel(uv: Vec2, (width, height): (u32, u32)) -> (u32, u32) {
    let x = ((uv.x * width as f32) as u32).min(width - 1);
    let y = ((uv.y * height as f32) as u32).min(height - 1);
    (x, y)
}

#[cfg(test)]
mod tests {
    use glam::Vec3;
    use surfels::{AttributeSet, Color, Notify};

    use super::*;
    use crate::painter::PaintTarget;
    use crate::sampler::GridChannel;

    fn surfel_at(store: &mut SurfelStore, uv: Vec2, radius: f32) -> SurfelId {
        let id = store.add_surfel(Notify::Suppress);
        store
            .get_mut(id)
            .unwrap()
            .set_texture_coordinate(uv)
            .set_radius(radius);
        id
    }

    /// 8x8 brush whose left half is black and right half white
    fn split_brush() -> Brush {
        let values: Vec<f32> = (0..64).map(|i| if i % 8 < 4 { 0.0 } else { 1.0 }).collect();
        let channel = GridChannel::from_values(8, 8, values).unwrap();
        let mut brush = Brush::new(8, 8).unwrap();
        brush
            .set_grid_layer(
                BrushProperty::DiffuseColor,
                vec![channel.clone(), channel.clone(), channel],
                None,
            )
            .unwrap();
        brush
    }

    #[test]
    fn test_nearest_texel_lookup() {
        let mut store = SurfelStore::with_schema(AttributeSet::TEXTURE_COORDINATE | AttributeSet::RADIUS);
        let left = surfel_at(&mut store, Vec2::new(0.1, 0.5), 0.01);
        let right = surfel_at(&mut store, Vec2::new(1.0, 1.0), 0.01);
        let targets = [UvTarget::nearest(left), UvTarget::nearest(right)];

        let summary = Painter::default()
            .paint(&mut store, PaintTarget::TextureCoordinates(&targets), &split_brush())
            .unwrap();

        assert_eq!(summary.painted, 2);
        assert_eq!(store.get(left).unwrap().diffuse_color(), Color::rgb(0, 0, 0));
        assert_eq!(store.get(right).unwrap().diffuse_color(), Color::rgb(255, 255, 255));
    }

    #[test]
    fn test_filtered_sample_averages_across_edge() {
        let mut store = SurfelStore::with_schema(AttributeSet::TEXTURE_COORDINATE | AttributeSet::RADIUS);
        // Centered on the black/white edge with a footprint several texels wide
        let id = surfel_at(&mut store, Vec2::new(0.5, 0.5), 0.15);
        let targets = [UvTarget::filtered(id, Mat2::IDENTITY)];

        Painter::default()
            .paint(&mut store, PaintTarget::TextureCoordinates(&targets), &split_brush())
            .unwrap();

        let color = store.get(id).unwrap().diffuse_color();
        assert!((color.r as i32 - 128).abs() <= 2, "{color:?}");
    }

    #[test]
    fn test_tiny_footprint_falls_back_to_nearest() {
        let mut store = SurfelStore::with_schema(AttributeSet::TEXTURE_COORDINATE | AttributeSet::RADIUS);
        let id = surfel_at(&mut store, Vec2::new(0.8, 0.2), 1e-4);
        let config = stipple_config::PaintConfig {
            ewa: stipple_config::EwaConfig {
                lowpass_variance: 0.0,
                ..Default::default()
            },
            ..Default::default()
        };
        let targets = [UvTarget::filtered(id, Mat2::IDENTITY)];

        Painter::new(config)
            .paint(&mut store, PaintTarget::TextureCoordinates(&targets), &split_brush())
            .unwrap();

        assert_eq!(store.get(id).unwrap().diffuse_color(), Color::rgb(255, 255, 255));
    }

    #[test]
    fn test_out_of_domain_and_stale_targets_are_skipped() {
        let mut store = SurfelStore::with_schema(AttributeSet::TEXTURE_COORDINATE | AttributeSet::RADIUS);
        let outside = surfel_at(&mut store, Vec2::new(1.5, 0.5), 0.01);
        let stale = surfel_at(&mut store, Vec2::new(0.5, 0.5), 0.01);
        store.remove_surfel(stale, Notify::Suppress).unwrap();
        let targets = [UvTarget::nearest(outside), UvTarget::nearest(stale)];

        let summary = Painter::default()
            .paint(&mut store, PaintTarget::TextureCoordinates(&targets), &split_brush())
            .unwrap();

        assert_eq!(summary, PaintSummary { painted: 0, skipped: 2 });
        assert!(!store.schema().contains(AttributeSet::DIFFUSE_COLOR));
    }

    #[test]
    fn test_displacement_moves_along_normal() {
        let mut store = SurfelStore::with_schema(
            AttributeSet::POSITION | AttributeSet::NORMAL | AttributeSet::TEXTURE_COORDINATE,
        );
        let id = store.add_surfel(Notify::Suppress);
        store
            .get_mut(id)
            .unwrap()
            .set_normal(Vec3::X)
            .set_texture_coordinate(Vec2::splat(0.5));
        let mut brush = Brush::new(2, 2).unwrap();
        brush
            .set_solid(BrushProperty::Displacement, &[0.4], 0.5)
            .unwrap();

        Painter::default()
            .paint(&mut store, PaintTarget::TextureCoordinates(&[UvTarget::nearest(id)]), &brush)
            .unwrap();

        assert!((store.get(id).unwrap().position() - Vec3::new(0.2, 0.0, 0.0)).length() < 1e-6);
    }
}
