//! Decoded single-band raster grids.

use crate::error::LayerError;

/// A decoded single-band grid in row-major order.
///
/// Invariant: `data.len() == width * height` and both dimensions are
/// non-zero. The only way to build one is [`DecodedGrid::new`], which
/// enforces this.
#[derive(Debug, Clone, PartialEq)]
pub struct DecodedGrid {
    width: usize,
    height: usize,
    data: Vec<f32>,
}

impl DecodedGrid {
    pub fn new(width: usize, height: usize, data: Vec<f32>) -> Result<Self, LayerError> {
        if width == 0 || height == 0 || data.is_empty() {
            return Err(LayerError::empty(format!(
                "decoded band is empty ({}x{}, {} values)",
                width,
                height,
                data.len()
            )));
        }

        let expected = width
            .checked_mul(height)
            .ok_or_else(|| LayerError::empty(format!("grid {}x{} overflows", width, height)))?;

        if data.len() != expected {
            return Err(LayerError::empty(format!(
                "band length {} does not match {}x{} = {}",
                data.len(),
                width,
                height,
                expected
            )));
        }

        Ok(Self {
            width,
            height,
            data,
        })
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn data(&self) -> &[f32] {
        &self.data
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Value at (x, y), if inside the grid.
    pub fn get(&self, x: usize, y: usize) -> Option<f32> {
        if x >= self.width || y >= self.height {
            return None;
        }
        self.data.get(y * self.width + x).copied()
    }

    /// Iterate over rows as slices.
    pub fn rows(&self) -> std::slice::ChunksExact<'_, f32> {
        self.data.chunks_exact(self.width)
    }
}
