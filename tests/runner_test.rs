use std::fs;
use std::path::PathBuf;

use image::{Rgb, RgbImage};
use tempfile::TempDir;

use cloth_seg_rs::mocks::UniformSegmenter;
use cloth_seg_rs::{ClothSegError, Config, DatasetRunner};

fn test_config(input_dir: PathBuf, output_dir: PathBuf) -> Config {
    Config {
        model_path: "unused.onnx".into(),
        input_dir,
        output_dir,
        batch_size: 2,
        format: "png".to_string(),
        device_id: 0,
        coverage_threshold: 0.05,
        debug: false,
    }
}

fn write_image(path: &PathBuf) {
    let image = RgbImage::from_pixel(20, 16, Rgb([180, 40, 40]));
    image.save(path).unwrap();
}

#[test]
fn processes_a_directory_tree_into_the_output_tree() -> Result<(), Box<dyn std::error::Error>> {
    let temp_dir = TempDir::new()?;
    let input_dir = temp_dir.path().join("input");
    let output_dir = temp_dir.path().join("output");
    fs::create_dir_all(input_dir.join("dresses"))?;

    write_image(&input_dir.join("shirt.png"));
    write_image(&input_dir.join("dresses").join("gown.png"));

    let runner = DatasetRunner::new(
        UniformSegmenter::new(1),
        test_config(input_dir, output_dir.clone()),
    )?;
    runner.process_directory()?;

    assert!(output_dir.join("shirt.png").is_file());
    assert!(output_dir.join("dresses").join("gown.png").is_file());

    // results live at the working resolution of the pipeline
    let result = image::open(output_dir.join("shirt.png"))?.into_rgb8();
    assert_eq!(result.dimensions(), (768, 500));
    Ok(())
}

#[test]
fn converts_results_to_the_configured_format() -> Result<(), Box<dyn std::error::Error>> {
    let temp_dir = TempDir::new()?;
    let input_dir = temp_dir.path().join("input");
    let output_dir = temp_dir.path().join("output");
    fs::create_dir_all(&input_dir)?;

    write_image(&input_dir.join("jacket.jpg"));

    let runner = DatasetRunner::new(
        UniformSegmenter::new(1),
        test_config(input_dir, output_dir.clone()),
    )?;
    runner.process_directory()?;

    assert!(output_dir.join("jacket.png").is_file());
    assert!(!output_dir.join("jacket.jpg").exists());
    Ok(())
}

#[test]
fn existing_output_directory_fails_fast() -> Result<(), Box<dyn std::error::Error>> {
    let temp_dir = TempDir::new()?;
    let input_dir = temp_dir.path().join("input");
    let output_dir = temp_dir.path().join("output");
    fs::create_dir_all(&input_dir)?;
    fs::create_dir_all(&output_dir)?;

    write_image(&input_dir.join("shirt.png"));

    let runner = DatasetRunner::new(
        UniformSegmenter::new(1),
        test_config(input_dir, output_dir.clone()),
    )?;
    let err = runner.process_directory().unwrap_err();

    assert!(matches!(err, ClothSegError::OutputCollision { .. }));
    // nothing was written into the pre-existing directory
    assert_eq!(fs::read_dir(&output_dir)?.count(), 0);
    Ok(())
}

#[test]
fn missing_input_directory_fails_fast() -> Result<(), Box<dyn std::error::Error>> {
    let temp_dir = TempDir::new()?;
    let runner = DatasetRunner::new(
        UniformSegmenter::new(1),
        test_config(
            temp_dir.path().join("does-not-exist"),
            temp_dir.path().join("output"),
        ),
    )?;

    let err = runner.process_directory().unwrap_err();
    assert!(matches!(err, ClothSegError::FileSystem { .. }));
    assert!(!temp_dir.path().join("output").exists());
    Ok(())
}

#[test]
fn empty_input_directory_produces_an_empty_output_directory(
) -> Result<(), Box<dyn std::error::Error>> {
    let temp_dir = TempDir::new()?;
    let input_dir = temp_dir.path().join("input");
    let output_dir = temp_dir.path().join("output");
    fs::create_dir_all(&input_dir)?;

    let runner = DatasetRunner::new(
        UniformSegmenter::new(1),
        test_config(input_dir, output_dir.clone()),
    )?;
    runner.process_directory()?;

    assert!(output_dir.is_dir());
    assert_eq!(fs::read_dir(&output_dir)?.count(), 0);
    Ok(())
}
