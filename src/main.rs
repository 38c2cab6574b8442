use anyhow::Result;
use clap::Parser;
use tracing::info;

use cloth_seg_rs::{Config, DatasetRunner};

fn main() -> Result<()> {
    let config = Config::parse();

    let log_level = if config.debug {
        tracing::Level::DEBUG
    } else {
        tracing::Level::INFO
    };
    tracing_subscriber::fmt()
        .with_max_level(log_level)
        .with_target(false)
        .init();

    info!("loading the segmentation model");
    let runner = DatasetRunner::with_onnx_model(config)?;

    runner.process_directory()?;

    info!("all images processed");
    Ok(())
}
