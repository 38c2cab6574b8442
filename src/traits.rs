use ndarray::{Array3, ArrayView4};

use crate::errors::Result;

/// Capability interface over the segmentation network.
///
/// One call per batch: a stack of normalized NCHW tensors goes in, a per-pixel
/// class prediction (batch x height x width, class index per pixel, zero being
/// background) comes out. Keeping the network behind this seam lets the
/// pipeline run against the ONNX session, a stub, or a mock interchangeably.
pub trait Segmenter: Send + Sync {
    fn predict_batch(&self, batch: ArrayView4<f32>) -> Result<Array3<u8>>;
}
