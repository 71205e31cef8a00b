//! Integration tests for HOG feature extraction.
//!
//! Tests cover:
//! - Descriptor length of the default configuration
//! - Resizing of inputs that are not 28x28
//! - Rejection of empty images and invalid configurations
//! - Batch extraction order and FeatureMatrix row checks

mod common;

use digitcam::{HogConfig, HogExtractor};
use image::GrayImage;

use common::*;

#[test]
fn test_default_descriptor_length() -> anyhow::Result<()> {
    let extractor = HogExtractor::default();
    assert_eq!(extractor.descriptor_len(), 1296);
    assert_eq!(HogConfig::default().descriptor_len(), 1296);

    let features = extractor.extract(&ring_digit(0))?;
    assert_eq!(features.len(), 1296);
    assert!(features.iter().all(|v| v.is_finite()));

    Ok(())
}

#[test]
fn test_non_window_sizes_are_resized() -> anyhow::Result<()> {
    let extractor = HogExtractor::default();

    // 1. A wide candidate crop
    let wide = image::imageops::resize(&bar_digit(0), 56, 40, image::imageops::FilterType::Nearest);
    assert_eq!(extractor.extract(&wide)?.len(), 1296);

    // 2. A crop smaller than the window
    let small = image::imageops::resize(&ring_digit(0), 12, 12, image::imageops::FilterType::Nearest);
    assert_eq!(extractor.extract(&small)?.len(), 1296);

    Ok(())
}

#[test]
fn test_blank_image_gives_finite_features() -> anyhow::Result<()> {
    let features = HogExtractor::default().extract(&GrayImage::new(28, 28))?;
    assert_eq!(features.len(), 1296);
    assert!(features.iter().all(|v| v.is_finite()));
    Ok(())
}

#[test]
fn test_empty_image_is_rejected() {
    let result = HogExtractor::default().extract(&GrayImage::new(0, 0));
    assert!(matches!(result, Err(DigitError::ConfigurationInvalid(_))));
}

#[test]
fn test_invalid_configuration_is_rejected() {
    // 28 px do not split into 5 px cells
    let result = HogExtractor::new(HogConfig::default().with_cell_side(5));
    assert!(matches!(result, Err(DigitError::ConfigurationInvalid(_))));

    let result = HogExtractor::new(HogConfig::default().with_orientations(0));
    assert!(matches!(result, Err(DigitError::ConfigurationInvalid(_))));
}

#[test]
fn test_custom_configuration_length() -> anyhow::Result<()> {
    // 32 px window, 8 px cells: 4 cells, 3 blocks per side
    let config = HogConfig::default().with_window(32).with_cell_side(8);
    let extractor = HogExtractor::new(config)?;
    assert_eq!(extractor.descriptor_len(), 3 * 3 * 2 * 2 * 9);
    assert_eq!(extractor.extract(&ring_digit(0))?.len(), extractor.descriptor_len());
    Ok(())
}

#[test]
fn test_batch_preserves_input_order() -> anyhow::Result<()> {
    let extractor = HogExtractor::default();
    let images = vec![ring_digit(0), bar_digit(0), stripes(0)];

    let matrix = extractor.extract_batch(&images)?;
    assert_eq!(matrix.rows(), 3);
    assert_eq!(matrix.cols(), 1296);
    for (i, image) in images.iter().enumerate() {
        assert_eq!(matrix.row(i), Some(extractor.extract(image)?.as_slice()));
    }

    Ok(())
}

#[test]
fn test_feature_matrix_rejects_wrong_row_length() -> anyhow::Result<()> {
    let mut matrix = FeatureMatrix::with_cols(3);
    matrix.push_row(&[1.0, 2.0, 3.0])?;

    let result = matrix.push_row(&[1.0, 2.0]);
    assert!(matches!(
        result,
        Err(DigitError::DescriptorLength { expected: 3, actual: 2 })
    ));
    assert_eq!(matrix.rows(), 1);

    // First row fixes the width of an unsized matrix
    let matrix = FeatureMatrix::from_rows(&[vec![1.0, 2.0], vec![3.0, 4.0]])?;
    assert_eq!(matrix.cols(), 2);
    assert_eq!(matrix.iter_rows().count(), 2);
    assert!(FeatureMatrix::from_rows(&[vec![1.0, 2.0], vec![3.0]]).is_err());

    Ok(())
}
