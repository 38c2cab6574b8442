use image::{Rgb, RgbImage};
use ndarray::ArrayView2;
use num_traits::Zero;

use crate::errors::{ClothSegError, Result};

/// Fraction of the pixel area the foreground must cover before masking is
/// applied. Below this the prediction is treated as low-confidence and the
/// image passes through unchanged.
pub const DEFAULT_COVERAGE_THRESHOLD: f32 = 0.05;

/// Turns per-pixel class predictions into composites: background pixels
/// blacked out, foreground pixels kept at their original color.
#[derive(Debug, Clone, Copy)]
pub struct MaskReconstructor {
    coverage_threshold: f32,
}

impl Default for MaskReconstructor {
    fn default() -> Self {
        Self {
            coverage_threshold: DEFAULT_COVERAGE_THRESHOLD,
        }
    }
}

impl MaskReconstructor {
    pub fn new(coverage_threshold: f32) -> Result<Self> {
        if !(0.0..=1.0).contains(&coverage_threshold) {
            return Err(ClothSegError::Validation {
                field: "coverage_threshold".to_string(),
                reason: format!("must be within [0, 1], got {coverage_threshold}"),
            });
        }
        Ok(Self { coverage_threshold })
    }

    /// Composite `original` with the binarized `classes` prediction.
    ///
    /// Any class above zero counts as foreground. Masking applies when
    /// coverage >= the threshold; below it the original is returned
    /// unchanged rather than producing a near-empty composite.
    pub fn reconstruct(&self, original: &RgbImage, classes: ArrayView2<u8>) -> Result<RgbImage> {
        let (height, width) = classes.dim();
        if (width as u32, height as u32) != original.dimensions() {
            return Err(ClothSegError::ImageProcessing {
                path: "unknown".to_string(),
                operation: "mask reconstruction".to_string(),
                source: Box::new(std::io::Error::new(
                    std::io::ErrorKind::InvalidInput,
                    format!(
                        "image is {}x{} but prediction is {}x{}",
                        original.width(),
                        original.height(),
                        width,
                        height
                    ),
                )),
            });
        }

        let coverage = coverage(&classes);
        if coverage < self.coverage_threshold {
            tracing::debug!(
                coverage,
                threshold = self.coverage_threshold,
                "foreground coverage below threshold, skipping mask"
            );
            return Ok(original.clone());
        }

        // Broadcast the binary mask over all channels: foreground at full
        // intensity, background zero, then AND against the original pixels.
        Ok(RgbImage::from_fn(
            original.width(),
            original.height(),
            |x, y| {
                let bits = if classes[[y as usize, x as usize]] > 0 {
                    u8::MAX
                } else {
                    0
                };
                let Rgb([r, g, b]) = *original.get_pixel(x, y);
                Rgb([r & bits, g & bits, b & bits])
            },
        ))
    }
}

/// Fraction of pixels classified as foreground (any class above zero).
pub fn coverage<S>(classes: &ArrayView2<S>) -> f32
where
    S: Copy + PartialOrd + Zero,
{
    if classes.is_empty() {
        return 0.0;
    }
    let foreground = classes.iter().filter(|&&v| v > S::zero()).count();
    foreground as f32 / classes.len() as f32
}
