use std::path::PathBuf;
use thiserror::Error;

/// Error taxonomy for the segmentation batch runner.
///
/// Every variant carries the context of its failure domain so callers never
/// have to parse message strings. Fatal configuration problems (bad model
/// path, missing input directory, pre-existing output directory) surface
/// before any image is processed.
#[derive(Error, Debug)]
pub enum ClothSegError {
    #[error("Configuration error: {message}")]
    Configuration { message: String },

    #[error("Output destination already exists: {path:?}")]
    OutputCollision { path: PathBuf },

    #[error("Filesystem error: {operation} failed for {path:?}")]
    FileSystem {
        path: PathBuf,
        operation: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Image processing error: {operation} failed (file: {path})")]
    ImageProcessing {
        path: String,
        operation: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    #[error("Model error: {operation} failed")]
    Model {
        operation: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    #[error("Validation error: {field} {reason}")]
    Validation { field: String, reason: String },
}

pub type Result<T> = std::result::Result<T, ClothSegError>;

impl From<std::io::Error> for ClothSegError {
    fn from(err: std::io::Error) -> Self {
        Self::FileSystem {
            path: PathBuf::from("unknown"),
            operation: "unknown".to_string(),
            source: err,
        }
    }
}

impl From<image::ImageError> for ClothSegError {
    fn from(err: image::ImageError) -> Self {
        Self::ImageProcessing {
            path: "unknown".to_string(),
            operation: "image processing".to_string(),
            source: Box::new(err),
        }
    }
}

impl From<ort::Error> for ClothSegError {
    fn from(err: ort::Error) -> Self {
        Self::Model {
            operation: "ort operation".to_string(),
            source: Box::new(err),
        }
    }
}

/// Shape errors occur during tensor stacking and extraction, which are part
/// of model inference, so they land in the model category.
impl From<ndarray::ShapeError> for ClothSegError {
    fn from(err: ndarray::ShapeError) -> Self {
        Self::Model {
            operation: "tensor shape conversion".to_string(),
            source: Box::new(err),
        }
    }
}

impl From<anyhow::Error> for ClothSegError {
    fn from(err: anyhow::Error) -> Self {
        Self::Configuration {
            message: err.to_string(),
        }
    }
}
