use image::RgbImage;
use ndarray::prelude::*;

use crate::batch::split_batches;
use crate::codec::{ImageCodec, DEFAULT_TARGET_HEIGHT, DEFAULT_TARGET_WIDTH};
use crate::errors::{ClothSegError, Result};
use crate::mask::{MaskReconstructor, DEFAULT_COVERAGE_THRESHOLD};
use crate::model::to_tensor;
use crate::traits::Segmenter;

/// Default inference batch size. A throughput/memory trade-off, never a
/// correctness knob.
pub const DEFAULT_BATCH_SIZE: usize = 32;

/// One unit of work: an identifier and its image. Stages replace the image,
/// they never mutate it in place.
#[derive(Debug, Clone)]
pub struct Document {
    pub id: String,
    pub image: RgbImage,
}

impl Document {
    pub fn new(id: impl Into<String>, image: RgbImage) -> Self {
        Self {
            id: id.into(),
            image,
        }
    }
}

#[derive(Debug, Clone)]
pub struct PipelineOptions {
    pub batch_size: usize,
    pub target_width: u32,
    pub target_height: u32,
    pub coverage_threshold: f32,
}

impl Default for PipelineOptions {
    fn default() -> Self {
        Self {
            batch_size: DEFAULT_BATCH_SIZE,
            target_width: DEFAULT_TARGET_WIDTH,
            target_height: DEFAULT_TARGET_HEIGHT,
            coverage_threshold: DEFAULT_COVERAGE_THRESHOLD,
        }
    }
}

/// Drives reshape, tensor conversion, batched inference and mask
/// reconstruction over an ordered document collection.
///
/// Batches run sequentially; each segmenter invocation is one blocking call
/// covering the whole batch. Output order equals input order regardless of
/// batch boundaries.
pub struct SegmentationPipeline<S: Segmenter> {
    segmenter: S,
    codec: ImageCodec,
    reconstructor: MaskReconstructor,
    batch_size: usize,
}

impl<S: Segmenter> SegmentationPipeline<S> {
    pub fn new(segmenter: S, options: PipelineOptions) -> Result<Self> {
        if options.batch_size == 0 {
            return Err(ClothSegError::Validation {
                field: "batch_size".to_string(),
                reason: "must be greater than zero".to_string(),
            });
        }
        Ok(Self {
            segmenter,
            codec: ImageCodec::new(options.target_width, options.target_height),
            reconstructor: MaskReconstructor::new(options.coverage_threshold)?,
            batch_size: options.batch_size,
        })
    }

    pub const fn codec(&self) -> &ImageCodec {
        &self.codec
    }

    pub const fn segmenter(&self) -> &S {
        &self.segmenter
    }

    /// Segment every document, returning a new collection of equal length in
    /// the same order.
    pub fn run(&self, documents: &[Document]) -> Result<Vec<Document>> {
        self.run_with(documents, |_| {})
    }

    /// Like [`run`](Self::run), invoking `on_progress` with the cumulative
    /// number of completed documents after each batch.
    pub fn run_with(
        &self,
        documents: &[Document],
        mut on_progress: impl FnMut(usize),
    ) -> Result<Vec<Document>> {
        let mut output = Vec::with_capacity(documents.len());
        for batch in split_batches(documents, self.batch_size)? {
            output.extend(self.process_batch(batch)?);
            on_progress(output.len());
        }
        Ok(output)
    }

    fn process_batch(&self, batch: &[Document]) -> Result<Vec<Document>> {
        let reshaped: Vec<RgbImage> = batch
            .iter()
            .map(|doc| self.codec.to_fixed_shape(&doc.image))
            .collect();

        let (width, height) = self.codec.target_dimensions();
        let mut stacked =
            Array4::<f32>::zeros((batch.len(), 3, height as usize, width as usize));
        for (i, image) in reshaped.iter().enumerate() {
            stacked
                .slice_mut(s![i, .., .., ..])
                .assign(&to_tensor(image));
        }

        let classes = self.segmenter.predict_batch(stacked.view())?;
        if classes.dim().0 != batch.len() {
            return Err(ClothSegError::Model {
                operation: "batch prediction".to_string(),
                source: Box::new(std::io::Error::new(
                    std::io::ErrorKind::InvalidData,
                    format!(
                        "segmenter returned {} predictions for a batch of {}",
                        classes.dim().0,
                        batch.len()
                    ),
                )),
            });
        }

        batch
            .iter()
            .zip(reshaped.iter())
            .enumerate()
            .map(|(i, (doc, image))| {
                let composite = self
                    .reconstructor
                    .reconstruct(image, classes.index_axis(Axis(0), i))?;
                Ok(Document::new(doc.id.clone(), composite))
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mocks::UniformSegmenter;
    use image::Rgb;

    fn small_options() -> PipelineOptions {
        PipelineOptions {
            batch_size: 2,
            target_width: 8,
            target_height: 6,
            coverage_threshold: DEFAULT_COVERAGE_THRESHOLD,
        }
    }

    #[test]
    fn zero_batch_size_is_rejected_at_construction() {
        let options = PipelineOptions {
            batch_size: 0,
            ..small_options()
        };
        let err = SegmentationPipeline::new(UniformSegmenter::new(0), options).unwrap_err();
        assert!(matches!(err, ClothSegError::Validation { .. }));
    }

    #[test]
    fn empty_collection_produces_empty_output() -> Result<()> {
        let pipeline = SegmentationPipeline::new(UniformSegmenter::new(0), small_options())?;
        let output = pipeline.run(&[])?;
        assert!(output.is_empty());
        Ok(())
    }

    #[test]
    fn all_background_batch_passes_images_through() -> Result<()> {
        // images already at the target shape, so reshape is the identity and
        // the low-coverage skip must hand back pixel-identical data
        let documents: Vec<Document> = (0..3)
            .map(|i| {
                Document::new(
                    format!("img-{i}"),
                    RgbImage::from_pixel(8, 6, Rgb([i as u8 + 1, 50, 90])),
                )
            })
            .collect();

        let pipeline = SegmentationPipeline::new(UniformSegmenter::new(0), small_options())?;
        let output = pipeline.run(&documents)?;

        assert_eq!(output.len(), 3);
        for (input, result) in documents.iter().zip(&output) {
            assert_eq!(result.id, input.id);
            assert_eq!(result.image, input.image);
        }
        Ok(())
    }

    #[test]
    fn progress_callback_reports_cumulative_counts() -> Result<()> {
        let documents: Vec<Document> = (0..5)
            .map(|i| Document::new(format!("doc-{i}"), RgbImage::new(8, 6)))
            .collect();

        let pipeline = SegmentationPipeline::new(UniformSegmenter::new(0), small_options())?;
        let mut ticks = Vec::new();
        pipeline.run_with(&documents, |done| ticks.push(done))?;

        assert_eq!(ticks, vec![2, 4, 5]);
        Ok(())
    }
}
