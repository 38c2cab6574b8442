use image::{imageops, imageops::FilterType, Rgb, RgbImage};

use crate::errors::{ClothSegError, Result};

/// Width of the working resolution the checkpoint was trained against.
pub const DEFAULT_TARGET_WIDTH: u32 = 768;
/// Height of the working resolution the checkpoint was trained against.
pub const DEFAULT_TARGET_HEIGHT: u32 = 500;

/// Converts between raw pixel buffers and in-memory RGB images, and
/// normalizes arbitrary input dimensions to a fixed working shape.
#[derive(Debug, Clone, Copy)]
pub struct ImageCodec {
    target_width: u32,
    target_height: u32,
}

impl Default for ImageCodec {
    fn default() -> Self {
        Self::new(DEFAULT_TARGET_WIDTH, DEFAULT_TARGET_HEIGHT)
    }
}

impl ImageCodec {
    pub const fn new(target_width: u32, target_height: u32) -> Self {
        Self {
            target_width,
            target_height,
        }
    }

    pub const fn target_dimensions(&self) -> (u32, u32) {
        (self.target_width, self.target_height)
    }

    /// Interpret `raw` as an interleaved RGB buffer of the given dimensions.
    pub fn decode(raw: Vec<u8>, width: u32, height: u32) -> Result<RgbImage> {
        let expected = width as usize * height as usize * 3;
        if raw.len() != expected {
            return Err(ClothSegError::Validation {
                field: "raw buffer".to_string(),
                reason: format!(
                    "length {} does not match {}x{}x3 = {}",
                    raw.len(),
                    width,
                    height,
                    expected
                ),
            });
        }
        RgbImage::from_raw(width, height, raw).ok_or_else(|| ClothSegError::Validation {
            field: "raw buffer".to_string(),
            reason: "buffer does not form an image of the requested dimensions".to_string(),
        })
    }

    /// The exact inverse of [`decode`](Self::decode).
    pub fn encode(image: RgbImage) -> Vec<u8> {
        image.into_raw()
    }

    /// Shrink `image` to fit inside the target bounding box, preserving
    /// aspect ratio. Images already inside the box are returned unchanged;
    /// this never upscales.
    pub fn fit_within(&self, image: &RgbImage) -> RgbImage {
        let (width, height) = image.dimensions();
        if width <= self.target_width && height <= self.target_height {
            return image.clone();
        }

        let scale = f64::min(
            f64::from(self.target_width) / f64::from(width),
            f64::from(self.target_height) / f64::from(height),
        );
        let new_width = ((f64::from(width) * scale).round() as u32).max(1);
        let new_height = ((f64::from(height) * scale).round() as u32).max(1);

        imageops::resize(image, new_width, new_height, FilterType::Lanczos3)
    }

    /// Fit `image` into the target box and center it on a black canvas of
    /// exactly the target dimensions, so every image in a batch stacks into
    /// one tensor.
    pub fn to_fixed_shape(&self, image: &RgbImage) -> RgbImage {
        let fitted = self.fit_within(image);
        let (width, height) = fitted.dimensions();
        if (width, height) == (self.target_width, self.target_height) {
            return fitted;
        }

        let mut canvas =
            RgbImage::from_pixel(self.target_width, self.target_height, Rgb([0, 0, 0]));
        let x = i64::from((self.target_width - width) / 2);
        let y = i64::from((self.target_height - height) / 2);
        imageops::overlay(&mut canvas, &fitted, x, y);
        canvas
    }
}
