//! Elliptical weighted average splat rasterization
//!
//! A footprint is a local 2x2 kernel `K` (the surfel's axes in its tangent
//! frame) mapped into raster space by a Jacobian `J`. The resulting Gaussian
//! is regularized by a raster-space low-pass variance, truncated at a cutoff
//! radius and normalized so its weights sum to one over an unbounded raster.
//! Callers decide what the weights accumulate.

use std::f32::consts::PI;

use glam::{Mat2, Vec2};
use stipple_config::EwaConfig;
use tracing::trace;

const DEGENERATE_EPSILON: f32 = 1e-12;

/// Object-space footprint of one splat and its mapping into a raster
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Footprint {
    /// Columns are the splat axes in the local tangent frame
    pub kernel: Mat2,
    /// Local tangent frame to raster coordinates
    pub jacobian: Mat2,
    /// Splat center in raster coordinates (pixel `(x, y)` covers `[x, x + 1)`)
    pub center: Vec2,
}

impl Footprint {
    /// Circular footprint of `radius` in a frame mapped by `jacobian`
    pub fn circular(radius: f32, jacobian: Mat2, center: Vec2) -> Self {
        Self {
            kernel: Mat2::from_diagonal(Vec2::splat(radius)),
            jacobian,
            center,
        }
    }
}

/// Pixel rectangle visited for one splat and what it produced
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SplatCoverage {
    /// Bounding box (x, y, width, height) after clipping to the raster
    pub bounds: (u32, u32, u32, u32),
    /// Pixels inside the cutoff ellipse
    pub pixels: u32,
    /// Sum of the emitted weights
    pub total_weight: f32,
}

/// Why a splat contributed nothing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Rejection {
    Degenerate,
    IllConditioned,
    OutsideRaster,
}

/// Rasterize `footprint` into a `width` x `height` raster
///
/// `emit(x, y, weight)` is called once per pixel whose center lies inside the
/// cutoff ellipse, in row-major order. Returns `None` without emitting when
/// the splat has zero area, is too eccentric, or misses the raster entirely.
pub fn rasterize(
    footprint: &Footprint,
    config: &EwaConfig,
    width: u32,
    height: u32,
    mut emit: impl FnMut(u32, u32, f32),
) -> Option<SplatCoverage> {
    let splat = footprint.jacobian * footprint.kernel;
    let lowpass = config.lowpass_variance.max(0.0);
    let cutoff = config.cutoff_radius;

    if splat.determinant().abs() < DEGENERATE_EPSILON {
        return reject(footprint, Rejection::Degenerate);
    }

    let variance = splat * splat.transpose() + Mat2::from_diagonal(Vec2::splat(lowpass));
    if variance.determinant() < DEGENERATE_EPSILON {
        return reject(footprint, Rejection::Degenerate);
    }
    let conic = variance.inverse();
    let (a, b, c) = (conic.x_axis.x, conic.y_axis.x, conic.y_axis.y);

    // Eigenvalues of the symmetric conic
    let mean = 0.5 * (a + c);
    let spread = (0.25 * (a - c) * (a - c) + b * b).sqrt();
    let (major, minor) = (mean + spread, mean - spread);
    if minor <= 0.0 || major / minor > config.max_eccentricity {
        return reject(footprint, Rejection::IllConditioned);
    }

    // Density over the truncated disk: one full splat sums to 1
    let normalization = conic.determinant().sqrt() / (2.0 * PI * (1.0 - (-0.5 * cutoff * cutoff).exp()));

    // The splat's columns are the ellipse axes, so its rows give the x and y extents
    let extent = Vec2::new(
        splat.x_axis.x.abs() + splat.y_axis.x.abs(),
        splat.x_axis.y.abs() + splat.y_axis.y.abs(),
    ) + Vec2::splat(lowpass.sqrt());
    let half = extent * cutoff;

    let x_min = ((footprint.center.x - half.x).floor().max(0.0) as u32).min(width);
    let y_min = ((footprint.center.y - half.y).floor().max(0.0) as u32).min(height);
    let x_max = ((footprint.center.x + half.x).ceil().max(0.0) as u32).min(width);
    let y_max = ((footprint.center.y + half.y).ceil().max(0.0) as u32).min(height);
    if x_min >= x_max || y_min >= y_max {
        return reject(footprint, Rejection::OutsideRaster);
    }

    let limit = cutoff * cutoff;
    let ddq = 2.0 * a;
    let mut pixels = 0;
    let mut total_weight = 0.0;

    for y in y_min..y_max {
        let dy = y as f32 + 0.5 - footprint.center.y;
        let dx = x_min as f32 + 0.5 - footprint.center.x;
        let mut q = a * dx * dx + 2.0 * b * dx * dy + c * dy * dy;
        let mut dq = a * (2.0 * dx + 1.0) + 2.0 * b * dy;

        for x in x_min..x_max {
            if q < limit {
                let weight = normalization * (-0.5 * q).exp();
                emit(x, y, weight);
                pixels += 1;
                total_weight += weight;
            }
            q += dq;
            dq += ddq;
        }
    }

    Some(SplatCoverage {
        bounds: (x_min, y_min, x_max - x_min, y_max - y_min),
        pixels,
        total_weight,
    })
}

#[inline]
fn reject(footprint: &Footprint, reason: Rejection) -> Option<SplatCoverage> {
    trace!("ewa::rasterize: splat at {:?} rejected ({:?})", footprint.center, reason);
    None
}
