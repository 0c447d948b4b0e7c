//! Painting and resampling of surfel stores
//!
//! This crate moves values between brushes and surfels:
//! - [`ewa`] - Elliptical weighted average splat rasterization
//! - [`sampler`] - The [`BrushSampler`] channel trait and row-major [`GridChannel`]
//! - [`brush`] - Brushes with per-property layers and alpha masks
//! - [`painter`] - Grid and texture-coordinate painting, selection painting
//! - [`resample`] - Surfel to surfel resampling through a texel grid

pub mod brush;
pub mod error;
pub mod ewa;
pub mod painter;
pub mod resample;
pub mod sampler;

pub use brush::*;
pub use error::*;
pub use ewa::{Footprint, SplatCoverage};
pub use painter::*;
pub use resample::*;
pub use sampler::*;
