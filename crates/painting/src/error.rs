use surfels::StoreError;
use thiserror::Error;

use crate::brush::BrushProperty;

#[derive(Debug, Error)]
pub enum PaintError {
    #[error("Brush channel is {actual:?} but the brush is {expected:?}")]
    BrushSizeMismatch {
        expected: (u32, u32),
        actual: (u32, u32),
    },
    #[error("Surfel grid is {grid:?} but the brush is {brush:?}")]
    GridSizeMismatch { grid: (u32, u32), brush: (u32, u32) },
    #[error("Derived radius {radius} exceeds the limit {limit}; displacement tore the surface")]
    RadiusBlowUp { radius: f32, limit: f32 },
    #[error("Brush has no {0:?} layer")]
    MissingChannel(BrushProperty),
    #[error("Invalid brush: {0}")]
    InvalidBrush(String),
    #[error(transparent)]
    Store(#[from] StoreError),
}
