use ndarray::{Array3, ArrayView4};
use parking_lot::Mutex;

use crate::errors::Result;
use crate::traits::Segmenter;

/// Segmenter stub that labels every pixel with a fixed class and records the
/// size of every batch it receives.
#[derive(Debug, Default)]
pub struct UniformSegmenter {
    class: u8,
    batch_sizes: Mutex<Vec<usize>>,
}

impl UniformSegmenter {
    pub fn new(class: u8) -> Self {
        Self {
            class,
            batch_sizes: Mutex::new(Vec::new()),
        }
    }

    /// Batch sizes seen so far, in call order.
    pub fn batch_sizes(&self) -> Vec<usize> {
        self.batch_sizes.lock().clone()
    }
}

impl Segmenter for UniformSegmenter {
    fn predict_batch(&self, batch: ArrayView4<f32>) -> Result<Array3<u8>> {
        let (n, _channels, height, width) = batch.dim();
        self.batch_sizes.lock().push(n);
        Ok(Array3::from_elem((n, height, width), self.class))
    }
}

/// Segmenter stub that marks the left half of every image as foreground.
#[derive(Debug, Default)]
pub struct SplitSegmenter;

impl Segmenter for SplitSegmenter {
    fn predict_batch(&self, batch: ArrayView4<f32>) -> Result<Array3<u8>> {
        let (n, _channels, height, width) = batch.dim();
        Ok(Array3::from_shape_fn((n, height, width), |(_, _, x)| {
            u8::from(x < width / 2)
        }))
    }
}
