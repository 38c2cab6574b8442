use clap::Parser;
use image::ImageFormat;
use std::path::PathBuf;

use crate::mask::DEFAULT_COVERAGE_THRESHOLD;

#[derive(Parser, Clone, Debug)]
#[command(version, about, long_about = None)]
pub struct Config {
    /// Path to the pre-trained U2NET checkpoint (ONNX)
    #[arg(short, long)]
    pub model_path: PathBuf,

    /// Root directory of the input images
    #[arg(short, long, default_value = "input")]
    pub input_dir: PathBuf,

    /// Destination directory, must not exist yet
    #[arg(short, long, default_value = "output")]
    pub output_dir: PathBuf,

    /// Inference batch size
    #[arg(short, long, default_value_t = 4)]
    pub batch_size: usize,

    /// Output image format
    #[arg(short, long, default_value = "png", value_parser = check_format)]
    pub format: String,

    /// Device id passed to the GPU execution providers
    #[arg(short, long, default_value_t = 0)]
    pub device_id: i32,

    /// Minimum fraction of foreground pixels required to apply a mask
    #[arg(long, default_value_t = DEFAULT_COVERAGE_THRESHOLD)]
    pub coverage_threshold: f32,

    /// Enable debug logging
    #[arg(long)]
    pub debug: bool,
}

fn check_format(s: &str) -> Result<String, String> {
    let supported: Vec<_> = ImageFormat::all()
        .filter(|f| f.writing_enabled())
        .flat_map(|f| f.extensions_str())
        .map(|s| format!("`{}`", s))
        .collect();
    let supported_message = format!("Supported formats: {}", supported.join(", "));

    let format = ImageFormat::from_extension(s)
        .ok_or(format!("{} is not supported. {}", s, supported_message))?;
    if !format.writing_enabled() {
        return Err(format!("{} is not supported. {}", s, supported_message));
    }

    Ok(s.to_string())
}
