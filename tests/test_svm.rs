//! Integration tests for the SVM classifier.
//!
//! Tests cover:
//! - Binary and one-vs-one multi-class training and prediction
//! - Lazy validation of hyperparameters at train time
//! - Untrained and wrong-length usage errors
//! - Save/load of the model artifact, including failure paths
//! - Grid search with cross-validation

mod common;

use std::fs;

use digitcam::classifier::percent_error;
use digitcam::svm::ParamGrid;
use digitcam::{KernelType, ModelKind, TermCriteria};

use common::*;

#[test]
fn test_linear_binary_classification() -> anyhow::Result<()> {
    let (features, labels) = two_clusters(0, 1);
    let mut svm = Svm::with_params(SvmParams::digit_detector());

    svm.train(&features, &labels)?;
    assert!(svm.is_trained());

    assert_eq!(svm.predict(&[0.1, 0.1])?, 0);
    assert_eq!(svm.predict(&[9.8, 10.3])?, 1);
    assert_eq!(svm.test(&features, &labels)?, 0.0);
    let swapped: Vec<Label> = labels.iter().map(|l| 1 - l).collect();
    assert_eq!(svm.test(&features, &swapped)?, 100.0);
    assert_eq!(svm.decision_values(&[0.0, 0.0])?.len(), 1);

    Ok(())
}

#[test]
fn test_multiclass_voting() -> anyhow::Result<()> {
    let (features, labels) = three_clusters();
    let mut svm = Svm::new();
    svm.set_kernel(KernelType::Rbf);
    svm.set_gamma(0.1);
    svm.set_c(10.0);

    svm.train(&features, &labels)?;

    assert_eq!(svm.model().map(|m| m.classes().to_vec()), Some(vec![3, 5, 8]));
    assert_eq!(svm.predict(&[0.2, 0.1])?, 3);
    assert_eq!(svm.predict(&[10.1, -0.2])?, 5);
    assert_eq!(svm.predict(&[0.3, 9.7])?, 8);
    // One decision value per class pair
    assert_eq!(svm.decision_values(&[1.0, 1.0])?.len(), 3);

    Ok(())
}

#[test]
fn test_polynomial_classifier_preset_trains() -> anyhow::Result<()> {
    let (features, labels) = two_clusters(2, 7);
    let mut svm = Svm::with_params(ModelKind::DigitClassifier.params());
    svm.set_c(10.0);

    svm.train(&features, &labels)?;
    assert_eq!(svm.test(&features, &labels)?, 0.0);

    Ok(())
}

#[test]
fn test_setters_never_fail_but_training_validates() {
    let (features, labels) = two_clusters(0, 1);

    // 1. C must be positive
    let mut svm = Svm::new();
    svm.set_c(0.0);
    assert!(matches!(svm.train(&features, &labels), Err(DigitError::ConfigurationInvalid(_))));

    // 2. Non-linear kernels need gamma > 0
    let mut svm = Svm::new();
    svm.set_kernel(KernelType::Rbf);
    svm.set_gamma(-1.0);
    assert!(matches!(svm.train(&features, &labels), Err(DigitError::ConfigurationInvalid(_))));

    // 3. Polynomial degree must be a positive integer
    let mut svm = Svm::new();
    svm.set_kernel(KernelType::Poly);
    svm.set_degree(0.0);
    assert!(matches!(svm.train(&features, &labels), Err(DigitError::ConfigurationInvalid(_))));

    // 4. ...and small enough to be used as an integer exponent
    let mut svm = Svm::new();
    svm.set_kernel(KernelType::Poly);
    svm.set_gamma(0.1);
    svm.set_degree(i32::MAX as f64 + 1.0);
    assert!(matches!(svm.train(&features, &labels), Err(DigitError::ConfigurationInvalid(_))));

    // 5. Linear kernel ignores gamma
    let mut svm = Svm::new();
    svm.set_kernel(KernelType::Linear);
    svm.set_gamma(-1.0);
    assert!(svm.train(&features, &labels).is_ok());
}

#[test]
fn test_training_data_is_checked() {
    let (features, labels) = two_clusters(0, 1);
    let mut svm = Svm::with_params(SvmParams::digit_detector());

    // Row/label count mismatch
    let result = svm.train(&features, &labels[..3]);
    assert!(matches!(result, Err(DigitError::LabelMismatch { .. })));

    // A single class
    let result = svm.train(&features, &vec![4; labels.len()]);
    assert!(matches!(result, Err(DigitError::ConfigurationInvalid(_))));

    // No rows at all
    let result = svm.train(&FeatureMatrix::new(), &[]);
    assert!(matches!(result, Err(DigitError::ConfigurationInvalid(_))));

    assert!(!svm.is_trained());
}

#[test]
fn test_iteration_limit_is_a_numerics_fault() {
    let (features, labels) = two_clusters(0, 1);
    let mut svm = Svm::new();
    svm.set_kernel(KernelType::Linear);
    svm.set_term_criteria(TermCriteria { max_iter: 1, epsilon: 1e-12 });

    assert!(matches!(svm.train(&features, &labels), Err(DigitError::NumericsFault(_))));
}

#[test]
fn test_untrained_and_wrong_length_usage() -> anyhow::Result<()> {
    let (features, labels) = two_clusters(0, 1);
    let mut svm = Svm::with_params(SvmParams::digit_detector());

    assert!(matches!(svm.predict(&[0.0, 0.0]), Err(DigitError::Untrained)));
    assert!(matches!(svm.test(&features, &labels), Err(DigitError::Untrained)));

    svm.train(&features, &labels)?;
    assert!(matches!(
        svm.predict(&[0.0, 0.0, 0.0]),
        Err(DigitError::DescriptorLength { expected: 2, actual: 3 })
    ));

    Ok(())
}

#[test]
fn test_percent_error() {
    assert_eq!(percent_error(0, 0), 0.0);
    assert_eq!(percent_error(1, 4), 25.0);
    assert_eq!(percent_error(3, 3), 100.0);
}

#[test]
fn test_save_and_load_round_trip() -> anyhow::Result<()> {
    let dir = tempfile::TempDir::new()?;
    let path = dir.path().join("model.svm");
    let (features, labels) = three_clusters();

    let mut svm = Svm::new();
    svm.set_gamma(0.1);
    svm.set_c(10.0);
    svm.train(&features, &labels)?;
    svm.save(&path)?;

    let loaded = Svm::from_file(&path)?;
    assert_eq!(loaded.params(), svm.params());
    assert_eq!(loaded.model(), svm.model());
    for row in features.iter_rows() {
        assert_eq!(loaded.predict(row)?, svm.predict(row)?);
    }

    Ok(())
}

#[test]
fn test_save_untrained_fails() -> anyhow::Result<()> {
    let dir = tempfile::TempDir::new()?;
    let path = dir.path().join("model.svm");

    assert!(matches!(Svm::new().save(&path), Err(DigitError::Untrained)));
    assert!(!path.exists());

    Ok(())
}

#[test]
fn test_load_failures_leave_state_untouched() -> anyhow::Result<()> {
    let dir = tempfile::TempDir::new()?;
    let (features, labels) = two_clusters(0, 1);
    let mut svm = Svm::with_params(SvmParams::digit_detector());
    svm.train(&features, &labels)?;
    let before = svm.model().cloned();

    // 1. Missing file
    let missing = dir.path().join("missing.svm");
    assert!(matches!(svm.load(&missing), Err(DigitError::ModelNotFound(_))));

    // 2. Garbage file
    let corrupt = dir.path().join("corrupt.svm");
    fs::write(&corrupt, b"not a model")?;
    assert!(matches!(svm.load(&corrupt), Err(DigitError::ModelCorrupt { .. })));

    // 3. Model unchanged after both failures
    assert_eq!(svm.model().cloned(), before);
    assert_eq!(svm.params(), &SvmParams::digit_detector());
    assert_eq!(svm.predict(&[10.0, 10.0])?, 1);

    Ok(())
}

#[test]
fn test_save_replaces_existing_model() -> anyhow::Result<()> {
    let dir = tempfile::TempDir::new()?;
    let path = dir.path().join("model.svm");

    let (features, labels) = two_clusters(0, 1);
    let mut first = Svm::with_params(SvmParams::digit_detector());
    first.train(&features, &labels)?;
    first.save(&path)?;

    let (features, labels) = two_clusters(4, 9);
    let mut second = Svm::with_params(SvmParams::digit_detector());
    second.train(&features, &labels)?;
    second.save(&path)?;

    let loaded = Svm::from_file(&path)?;
    assert_eq!(loaded.model().map(|m| m.classes().to_vec()), Some(vec![4, 9]));

    Ok(())
}

#[test]
fn test_train_auto_picks_from_grid() -> anyhow::Result<()> {
    let (features, labels) = two_clusters(0, 1);
    let mut svm = Svm::new();
    svm.set_kernel(KernelType::Rbf);

    let report = svm.train_auto(
        &features,
        &labels,
        5,
        ParamGrid::new(1.0, 10.0, 3.0),
        ParamGrid::fixed(0.05),
    )?;

    assert!([1.0, 3.0, 9.0].contains(&report.c));
    assert_eq!(report.gamma, 0.05);
    assert_eq!(report.cv_error, 0.0);
    assert_eq!(svm.params().c, report.c);
    assert!(svm.is_trained());

    Ok(())
}

#[test]
fn test_train_auto_rejects_bad_grids() {
    let (features, labels) = two_clusters(0, 1);
    let mut svm = Svm::new();

    let result = svm.train_auto(&features, &labels, 5, ParamGrid::new(0.0, 1.0, 2.0), ParamGrid::default_gamma());
    assert!(matches!(result, Err(DigitError::ConfigurationInvalid(_))));

    let result = svm.train_auto(&features, &labels, 1, ParamGrid::default_c(), ParamGrid::default_gamma());
    assert!(matches!(result, Err(DigitError::ConfigurationInvalid(_))));
}

#[test]
fn test_param_grid_values() -> anyhow::Result<()> {
    assert_eq!(ParamGrid::fixed(2.5).values()?, vec![2.5]);
    assert_eq!(ParamGrid::new(1.0, 10.0, 2.0).values()?, vec![1.0, 2.0, 4.0, 8.0]);
    assert_eq!(ParamGrid::default_c().values()?.first(), Some(&10.0));
    Ok(())
}
