pub mod batch;
pub mod codec;
pub mod config;
pub mod errors;
pub mod mask;
pub mod model;
pub mod pipeline;
pub mod traits;

pub mod mocks;

use std::fs;
use std::path::{Path, PathBuf};

use image::ImageFormat;
use indicatif::{ProgressBar, ProgressStyle};
use rayon::prelude::*;
use walkdir::WalkDir;

pub use codec::ImageCodec;
pub use config::Config;
pub use errors::{ClothSegError, Result};
pub use mask::MaskReconstructor;
pub use model::Model;
pub use pipeline::{Document, PipelineOptions, SegmentationPipeline};
pub use traits::Segmenter;

/// Filesystem harness around [`SegmentationPipeline`]: walks an input
/// directory tree, decodes every image, runs the pipeline batch-by-batch and
/// persists each result under the output directory keyed by its relative
/// path.
pub struct DatasetRunner<S: Segmenter> {
    pipeline: SegmentationPipeline<S>,
    config: Config,
}

impl<S: Segmenter> DatasetRunner<S> {
    pub fn new(segmenter: S, config: Config) -> Result<Self> {
        let options = PipelineOptions {
            batch_size: config.batch_size,
            coverage_threshold: config.coverage_threshold,
            ..PipelineOptions::default()
        };
        Ok(Self {
            pipeline: SegmentationPipeline::new(segmenter, options)?,
            config,
        })
    }

    pub fn process_directory(&self) -> Result<()> {
        let input_dir = &self.config.input_dir;
        if !input_dir.is_dir() {
            return Err(ClothSegError::FileSystem {
                path: input_dir.clone(),
                operation: "input directory lookup".to_string(),
                source: std::io::Error::new(
                    std::io::ErrorKind::NotFound,
                    "input directory does not exist",
                ),
            });
        }

        tracing::info!(path = %input_dir.display(), "reading input data");
        let image_files = collect_image_files(input_dir);
        tracing::debug!(count = image_files.len(), "found input images");

        // decode everything up front so unreadable inputs fail the run
        // before any output is produced
        let documents = self.load_documents(&image_files)?;

        tracing::info!(path = %self.config.output_dir.display(), "configuring output");
        let output_dir = &self.config.output_dir;
        if output_dir.exists() {
            return Err(ClothSegError::OutputCollision {
                path: output_dir.clone(),
            });
        }
        fs::create_dir_all(output_dir).map_err(|e| ClothSegError::FileSystem {
            path: output_dir.clone(),
            operation: "output directory creation".to_string(),
            source: e,
        })?;

        tracing::info!("running segmentation");
        let progress_bar = ProgressBar::new(documents.len() as u64);
        progress_bar.set_style(
            ProgressStyle::default_bar()
                .template(
                    "{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({eta})",
                )
                .unwrap()
                .progress_chars("#>-"),
        );

        let results = self
            .pipeline
            .run_with(&documents, |done| progress_bar.set_position(done as u64))?;
        progress_bar.finish();

        tracing::info!("writing results");
        self.save_documents(&results)?;

        Ok(())
    }

    fn load_documents(&self, image_files: &[PathBuf]) -> Result<Vec<Document>> {
        image_files
            .par_iter()
            .map(|path| {
                let image = image::open(path)
                    .map_err(|e| ClothSegError::ImageProcessing {
                        path: path.display().to_string(),
                        operation: "image load".to_string(),
                        source: Box::new(e),
                    })?
                    .into_rgb8();
                Ok(Document::new(self.relative_id(path)?, image))
            })
            .collect()
    }

    fn save_documents(&self, documents: &[Document]) -> Result<()> {
        let format = ImageFormat::from_extension(&self.config.format).ok_or_else(|| {
            ClothSegError::Configuration {
                message: format!("unsupported output format: {}", self.config.format),
            }
        })?;

        documents.par_iter().try_for_each(|doc| {
            let output_file = self
                .config
                .output_dir
                .join(&doc.id)
                .with_extension(&self.config.format);

            if let Some(parent) = output_file.parent() {
                fs::create_dir_all(parent).map_err(|e| ClothSegError::FileSystem {
                    path: parent.to_path_buf(),
                    operation: "output subdirectory creation".to_string(),
                    source: e,
                })?;
            }

            doc.image
                .save_with_format(&output_file, format)
                .map_err(|e| ClothSegError::ImageProcessing {
                    path: output_file.display().to_string(),
                    operation: "image save".to_string(),
                    source: Box::new(e),
                })
        })
    }

    /// Document identifier: the path relative to the input root.
    fn relative_id(&self, input_file: &Path) -> Result<String> {
        input_file
            .strip_prefix(&self.config.input_dir)
            .map(|p| p.to_string_lossy().into_owned())
            .map_err(|_| ClothSegError::FileSystem {
                path: input_file.to_path_buf(),
                operation: "relative path resolution".to_string(),
                source: std::io::Error::new(
                    std::io::ErrorKind::InvalidInput,
                    "input file is outside the input directory",
                ),
            })
    }
}

impl DatasetRunner<Model> {
    /// Construct a runner backed by the ONNX checkpoint named in `config`.
    pub fn with_onnx_model(config: Config) -> Result<Self> {
        let model = Model::new(&config.model_path, config.device_id)?;
        Self::new(model, config)
    }
}

fn collect_image_files(input_dir: &Path) -> Vec<PathBuf> {
    WalkDir::new(input_dir)
        .into_iter()
        .filter_map(std::result::Result::ok)
        .filter(|entry| entry.file_type().is_file())
        .filter(|entry| ImageFormat::from_path(entry.path()).is_ok())
        .map(walkdir::DirEntry::into_path)
        .collect()
}
