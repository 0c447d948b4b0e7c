//! Brush texture channels

use crate::error::PaintError;

/// Read-only scalar grid the painter samples brush values from
///
/// Callers keep `x < width()` and `y < height()`; the rasterizer clips every
/// footprint to those bounds before sampling.
pub trait BrushSampler {
    fn width(&self) -> u32;
    fn height(&self) -> u32;
    fn value(&self, x: u32, y: u32) -> f32;
}

/// One component of a brush layer, stored row-major
#[derive(Debug, Clone, PartialEq)]
pub struct GridChannel {
    width: u32,
    height: u32,
    values: Vec<f32>,
}

impl GridChannel {
    /// Create a channel filled with zeros
    pub fn new(width: u32, height: u32) -> Self {
        Self::filled(width, height, 0.0)
    }

    /// Create a channel holding `value` everywhere
    pub fn filled(width: u32, height: u32, value: f32) -> Self {
        let count = (width as usize) * (height as usize);
        Self {
            width,
            height,
            values: vec![value; count],
        }
    }

    /// Wrap row-major `values`; the length must be `width * height`
    pub fn from_values(width: u32, height: u32, values: Vec<f32>) -> Result<Self, PaintError> {
        let expected = (width as usize) * (height as usize);
        if values.len() != expected {
            return Err(PaintError::InvalidBrush(format!(
                "channel of {}x{} needs {} values, got {}",
                width,
                height,
                expected,
                values.len()
            )));
        }
        Ok(Self {
            width,
            height,
            values,
        })
    }

    #[inline]
    pub fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    /// Returns None if coordinates are out of bounds
    #[inline]
    pub fn get(&self, x: u32, y: u32) -> Option<f32> {
        if x >= self.width || y >= self.height {
            return None;
        }
        Some(self.values[self.index(x, y)])
    }

    /// Does nothing if coordinates are out of bounds
    #[inline]
    pub fn set(&mut self, x: u32, y: u32, value: f32) {
        if x >= self.width || y >= self.height {
            return;
        }
        let index = self.index(x, y);
        self.values[index] = value;
    }

    pub fn fill(&mut self, value: f32) {
        self.values.fill(value);
    }

    #[inline]
    pub fn values(&self) -> &[f32] {
        &self.values
    }

    #[inline]
    fn index(&self, x: u32, y: u32) -> usize {
        (y as usize) * (self.width as usize) + (x as usize)
    }
}

impl BrushSampler for GridChannel {
    fn width(&self) -> u32 {
        self.width
    }

    fn height(&self) -> u32 {
        self.height
    }

    #[inline]
    fn value(&self, x: u32, y: u32) -> f32 {
        self.values[self.index(x, y)]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_channel_is_row_major() {
        let channel = GridChannel::from_values(3, 2, vec![0.0, 1.0, 2.0, 3.0, 4.0, 5.0]).unwrap();
        assert_eq!(channel.value(2, 0), 2.0);
        assert_eq!(channel.value(0, 1), 3.0);
        assert_eq!(channel.get(3, 0), None);
    }

    #[test]
    fn test_from_values_checks_length() {
        assert!(matches!(
            GridChannel::from_values(2, 2, vec![0.0; 3]),
            Err(PaintError::InvalidBrush(_))
        ));
    }

    #[test]
    fn test_set_ignores_out_of_bounds() {
        let mut channel = GridChannel::new(2, 2);
        channel.set(1, 1, 0.5);
        channel.set(5, 5, 1.0);
        assert_eq!(channel.values(), &[0.0, 0.0, 0.0, 0.5]);
        channel.fill(0.25);
        assert_eq!(channel.get(0, 0), Some(0.25));
    }
}
