use std::path::Path;

use image::RgbImage;
use ndarray::prelude::*;
use nshare::AsNdarray3;
use ort::value::TensorRef;
use ort::{
    execution_providers::{CUDAExecutionProvider, TensorRTExecutionProvider},
    session::{builder::SessionBuilder, Session},
};
use parking_lot::Mutex;

use crate::codec::{DEFAULT_TARGET_HEIGHT, DEFAULT_TARGET_WIDTH};
use crate::errors::{ClothSegError, Result};
use crate::traits::Segmenter;

/// Channel mean of the checkpoint's training-time normalization.
pub const NORM_MEAN: f32 = 0.5;
/// Channel standard deviation of the checkpoint's training-time normalization.
pub const NORM_STD: f32 = 0.5;

/// U2NET clothing segmentation network behind an ONNX Runtime session.
///
/// The graph maps a normalized RGB batch (input `img`) to four-channel class
/// logits (output `logits`): background plus three garment categories.
pub struct Model {
    session: Mutex<Session>,
}

impl Model {
    /// Load the checkpoint from `model_path`.
    ///
    /// A missing checkpoint is a hard error: running the untrained graph
    /// would silently produce garbage composites.
    pub fn new(model_path: &Path, device_id: i32) -> Result<Self> {
        if !model_path.is_file() {
            return Err(ClothSegError::Configuration {
                message: format!("no model checkpoint at {}", model_path.display()),
            });
        }

        tracing::info!(path = %model_path.display(), "loading segmentation checkpoint");

        let mut session = SessionBuilder::new()
            .map_err(|e| ClothSegError::Model {
                operation: "session builder initialization".to_string(),
                source: Box::new(e),
            })?
            .with_execution_providers([
                TensorRTExecutionProvider::default()
                    .with_device_id(device_id)
                    .build(),
                CUDAExecutionProvider::default()
                    .with_device_id(device_id)
                    .build(),
            ])
            .map_err(|e| ClothSegError::Model {
                operation: "execution provider registration".to_string(),
                source: Box::new(e),
            })?
            .with_memory_pattern(true)
            .map_err(|e| ClothSegError::Model {
                operation: "memory pattern configuration".to_string(),
                source: Box::new(e),
            })?
            .commit_from_file(model_path)
            .map_err(|e| ClothSegError::Model {
                operation: format!("checkpoint load: {}", model_path.display()),
                source: Box::new(e),
            })?;

        // warm-up run so provider initialization cost is paid before the
        // first real batch
        let data = Array4::<f32>::zeros((
            1,
            3,
            DEFAULT_TARGET_HEIGHT as usize,
            DEFAULT_TARGET_WIDTH as usize,
        ));
        session
            .run(ort::inputs!["img" => TensorRef::from_array_view(&data).map_err(|e| ClothSegError::Model {
                operation: "warm-up tensor creation".to_string(),
                source: Box::new(e),
            })?])
            .map_err(|e| ClothSegError::Model {
                operation: "warm-up run".to_string(),
                source: Box::new(e),
            })?;

        tracing::debug!("checkpoint loaded and warmed up");

        Ok(Self {
            session: Mutex::new(session),
        })
    }
}

impl Segmenter for Model {
    fn predict_batch(&self, batch: ArrayView4<f32>) -> Result<Array3<u8>> {
        let mut binding = self.session.lock();
        let outputs = binding.run(
            ort::inputs!["img" => TensorRef::from_array_view(&batch.as_standard_layout())?],
        )?;
        let logits = outputs["logits"]
            .try_extract_array::<f32>()?
            .into_dimensionality::<Ix4>()?;
        Ok(argmax_classes(logits.view()))
    }
}

/// Convert an RGB image to a normalized CHW tensor.
pub fn to_tensor(image: &RgbImage) -> Array3<f32> {
    image
        .as_ndarray3()
        .map(|&v| (f32::from(v) / 255.0 - NORM_MEAN) / NORM_STD)
}

/// Reduce per-channel logits to a per-pixel class index.
///
/// Softmax is monotonic per pixel, so the argmax over raw logits equals the
/// argmax over class probabilities.
pub fn argmax_classes(logits: ArrayView4<f32>) -> Array3<u8> {
    let (batch, _channels, height, width) = logits.dim();
    Array3::from_shape_fn((batch, height, width), |(i, y, x)| {
        let mut best = 0u8;
        let mut best_value = f32::NEG_INFINITY;
        for (channel, &value) in logits.slice(s![i, .., y, x]).iter().enumerate() {
            if value > best_value {
                best_value = value;
                best = channel as u8;
            }
        }
        best
    })
}
