//! Grayscale mask loading and sampling

use std::path::Path;

use groundwork_core::{GroundworkError, Result};
use image::DynamicImage;

use crate::sampler::GraySampler;

/// A grayscale mask with bilinear sampling
#[derive(Clone, Debug, PartialEq)]
pub struct GrayImage {
    /// Row-major intensities normalized to [0..1]
    values: Vec<f32>,
    /// Width in pixels
    pub width: u32,
    /// Height in pixels
    pub height: u32,
}

impl GrayImage {
    /// Load a mask from any image file the `image` crate can decode.
    /// Color images are reduced to luma; values are normalized to [0..1]
    /// regardless of bit depth.
    pub fn from_path(path: &Path) -> Result<Self> {
        let img = image::open(path).map_err(|e| {
            GroundworkError::MaskLoad(format!("failed to load mask '{}': {}", path.display(), e))
        })?;
        Self::from_dynamic(img)
    }

    /// Convert a decoded image into a mask
    pub fn from_dynamic(img: DynamicImage) -> Result<Self> {
        let gray = img.into_luma16();
        let width = gray.width();
        let height = gray.height();
        if width == 0 || height == 0 {
            return Err(GroundworkError::MaskLoad(format!(
                "mask has no pixels ({}x{})",
                width, height
            )));
        }

        let values: Vec<f32> = gray.pixels().map(|p| p.0[0] as f32 / 65535.0).collect();

        Ok(Self {
            values,
            width,
            height,
        })
    }

    /// Create a mask from raw float data
    pub fn from_raw(values: Vec<f32>, width: u32, height: u32) -> Result<Self> {
        let expected = width as usize * height as usize;
        if expected == 0 || values.len() != expected {
            return Err(GroundworkError::MaskLoad(format!(
                "raw mask {}x{} needs {} values, got {}",
                width,
                height,
                expected,
                values.len()
            )));
        }
        Ok(Self {
            values,
            width,
            height,
        })
    }

    /// Bilinear sample at normalized UV coordinates (0..1, 0..1).
    ///
    /// Pixel centers sit on a regular lattice spanning the full [0, 1]
    /// range, so (0, 0) and (1, 1) return the corner pixels exactly.
    pub fn sample(&self, u: f32, v: f32) -> f32 {
        let u = if u.is_nan() { 0.0 } else { u.clamp(0.0, 1.0) };
        let v = if v.is_nan() { 0.0 } else { v.clamp(0.0, 1.0) };

        let (x0, x1, tx) = Self::axis(u, self.width);
        let (y0, y1, ty) = Self::axis(v, self.height);

        let h00 = self.get(x0, y0);
        let h10 = self.get(x1, y0);
        let h01 = self.get(x0, y1);
        let h11 = self.get(x1, y1);

        let h0 = h00 * (1.0 - tx) + h10 * tx;
        let h1 = h01 * (1.0 - tx) + h11 * tx;

        h0 * (1.0 - ty) + h1 * ty
    }

    /// Neighbouring pixel indices and blend factor along one axis.
    /// Single-pixel axes always read pixel 0.
    fn axis(t: f32, extent: u32) -> (u32, u32, f32) {
        if extent < 2 {
            return (0, 0, 0.0);
        }
        let f = t * (extent - 1) as f32;
        let i0 = (f as u32).min(extent - 2);
        (i0, i0 + 1, f - i0 as f32)
    }

    fn get(&self, x: u32, y: u32) -> f32 {
        self.values[(y * self.width + x) as usize]
    }
}

impl GraySampler for GrayImage {
    fn try_sample(&self, u: f32, v: f32) -> Result<f32> {
        Ok(self.sample(u, v))
    }
}
