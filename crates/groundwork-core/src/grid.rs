//! Dense per-cell layer weights

use serde::{Deserialize, Serialize};

use crate::error::{GroundworkError, Result};

/// Dimensions of a weight grid: `height` rows, `width` columns, `layers` weights per cell
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct GridSize {
    pub width: usize,
    pub height: usize,
    pub layers: usize,
}

impl GridSize {
    pub const fn new(width: usize, height: usize, layers: usize) -> Self {
        Self {
            width,
            height,
            layers,
        }
    }

    /// Build a size from signed values, as they arrive from config files.
    /// Negative values and sizes too large to address are `InvalidDimension`.
    pub fn from_signed(width: i64, height: i64, layers: i64) -> Result<Self> {
        if width < 0 || height < 0 || layers < 0 {
            return Err(GroundworkError::InvalidDimension {
                width,
                height,
                layers,
            });
        }
        let unsigned = |v: i64| usize::try_from(v).unwrap_or(usize::MAX);
        Self::checked(unsigned(width), unsigned(height), unsigned(layers))
    }

    /// Like [`new`](Self::new), but fails when the weights of a
    /// `width * height * layers` grid could not be addressed in memory.
    pub fn checked(width: usize, height: usize, layers: usize) -> Result<Self> {
        let size = Self::new(width, height, layers);
        let max_len = isize::MAX as usize / std::mem::size_of::<f32>();
        match size.checked_len() {
            Some(len) if len <= max_len => Ok(size),
            _ => Err(size.invalid()),
        }
    }

    /// The `InvalidDimension` error describing this size
    pub fn invalid(&self) -> GroundworkError {
        let signed = |v: usize| i64::try_from(v).unwrap_or(i64::MAX);
        GroundworkError::InvalidDimension {
            width: signed(self.width),
            height: signed(self.height),
            layers: signed(self.layers),
        }
    }

    /// Number of cells (rows * columns)
    pub fn cell_count(&self) -> usize {
        self.width * self.height
    }

    /// Number of stored weights (cells * layers)
    pub fn len(&self) -> usize {
        self.cell_count() * self.layers
    }

    /// [`len`](Self::len), or `None` on overflow
    pub fn checked_len(&self) -> Option<usize> {
        self.width
            .checked_mul(self.height)?
            .checked_mul(self.layers)
    }

    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0 || self.layers == 0
    }
}

/// A dense weight array indexed by (row, column, layer).
///
/// Storage is row-major with the layer index varying fastest, so a
/// cell's weights are contiguous and a row is a contiguous slice of
/// `width * layers` values.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct WeightGrid {
    size: GridSize,
    weights: Vec<f32>,
}

impl WeightGrid {
    /// A grid with every weight set to zero
    pub fn zeroed(size: GridSize) -> Self {
        Self {
            size,
            weights: vec![0.0; size.len()],
        }
    }

    /// Wrap existing row-major data. Fails if the length does not match `size`.
    pub fn from_raw(size: GridSize, weights: Vec<f32>) -> Result<Self> {
        if weights.len() != size.len() {
            return Err(GroundworkError::ShapeMismatch {
                expected: size.len(),
                got: weights.len(),
            });
        }
        Ok(Self { size, weights })
    }

    pub fn size(&self) -> GridSize {
        self.size
    }

    pub fn width(&self) -> usize {
        self.size.width
    }

    pub fn height(&self) -> usize {
        self.size.height
    }

    pub fn layers(&self) -> usize {
        self.size.layers
    }

    pub fn is_empty(&self) -> bool {
        self.weights.is_empty()
    }

    /// Weight of `layer` at (`row`, `col`). Panics when out of bounds.
    pub fn get(&self, row: usize, col: usize, layer: usize) -> f32 {
        assert!(layer < self.size.layers, "layer {} out of range", layer);
        self.cell(row, col)[layer]
    }

    /// All layer weights of one cell
    pub fn cell(&self, row: usize, col: usize) -> &[f32] {
        assert!(
            row < self.size.height && col < self.size.width,
            "cell ({}, {}) out of range",
            row,
            col
        );
        let start = (row * self.size.width + col) * self.size.layers;
        &self.weights[start..start + self.size.layers]
    }

    /// Iterate rows; each item holds `width * layers` weights
    pub fn rows(&self) -> impl Iterator<Item = &[f32]> {
        let stride = (self.size.width * self.size.layers).max(1);
        self.weights.chunks(stride)
    }

    /// Iterate cells in row-major order
    pub fn cells(&self) -> impl Iterator<Item = &[f32]> {
        self.weights.chunks(self.size.layers.max(1))
    }

    pub fn as_slice(&self) -> &[f32] {
        &self.weights
    }

    pub fn as_mut_slice(&mut self) -> &mut [f32] {
        &mut self.weights
    }

    pub fn into_raw(self) -> Vec<f32> {
        self.weights
    }

    /// Largest deviation from the grid invariant over all cells: either
    /// `|sum - 1|` or the distance of a single weight outside [0, 1].
    pub fn max_normalization_error(&self) -> f32 {
        if self.size.layers == 0 {
            return 0.0;
        }
        self.cells()
            .map(|cell| {
                let sum: f32 = cell.iter().sum();
                let range_err = cell
                    .iter()
                    .map(|w| {
                        if w.is_nan() {
                            f32::INFINITY
                        } else {
                            (-w).max(w - 1.0).max(0.0)
                        }
                    })
                    .fold(0.0f32, f32::max);
                (sum - 1.0).abs().max(range_err)
            })
            .fold(0.0f32, f32::max)
    }

    /// True when every cell sums to 1 and every weight is in [0, 1], within `tolerance`
    pub fn is_normalized(&self, tolerance: f32) -> bool {
        self.max_normalization_error() <= tolerance
    }

    /// Mean weight of each layer across all cells
    pub fn layer_coverage(&self) -> Vec<f32> {
        let mut totals = vec![0.0f64; self.size.layers];
        for cell in self.cells().filter(|c| c.len() == self.size.layers) {
            for (total, w) in totals.iter_mut().zip(cell) {
                *total += *w as f64;
            }
        }
        let cells = self.size.cell_count().max(1) as f64;
        totals.into_iter().map(|t| (t / cells) as f32).collect()
    }
}
