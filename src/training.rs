//! Offline training of the digit classifier and the digit detector

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tracing::{info, warn};

use crate::dataset::{negatives, Dataset};
use crate::dataset::mnist::DEFAULT_BINARIZE_THRESHOLD;
use crate::features::FeatureExtractor;
use crate::hog_svm::{HogSvm, ModelKind};
use crate::svm::ParamGrid;

/// Input and output locations of a training run.
///
/// Defaults are relative to the working directory.
#[derive(Debug, Clone, PartialEq)]
pub struct TrainerConfig {
    pub train_images: PathBuf,
    pub train_labels: PathBuf,
    pub test_images: PathBuf,
    pub test_labels: PathBuf,
    pub negatives_train_dir: PathBuf,
    pub negatives_test_dir: PathBuf,
    pub negatives_train_count: usize,
    pub negatives_test_count: usize,
    pub binarize_threshold: u8,
    pub classifier_output: PathBuf,
    pub detector_output: PathBuf,
    /// Cross-validated grid search over C and gamma for the classifier,
    /// with this many folds
    pub auto_tune_folds: Option<usize>,
}

impl Default for TrainerConfig {
    fn default() -> Self {
        Self {
            train_images: PathBuf::from("./data/MNIST/train-images.idx3-ubyte"),
            train_labels: PathBuf::from("./data/MNIST/train-labels.idx1-ubyte"),
            test_images: PathBuf::from("./data/MNIST/t10k-images.idx3-ubyte"),
            test_labels: PathBuf::from("./data/MNIST/t10k-labels.idx1-ubyte"),
            negatives_train_dir: PathBuf::from("./data/NotDigits/train"),
            negatives_test_dir: PathBuf::from("./data/NotDigits/test"),
            negatives_train_count: 30_000,
            negatives_test_count: 10_000,
            binarize_threshold: DEFAULT_BINARIZE_THRESHOLD,
            classifier_output: PathBuf::from(ModelKind::DigitClassifier.default_file_name()),
            detector_output: PathBuf::from(ModelKind::DigitDetector.default_file_name()),
            auto_tune_folds: None,
        }
    }
}

impl TrainerConfig {
    /// MNIST files under `dir` with their standard names
    pub fn with_mnist_dir<P: AsRef<Path>>(mut self, dir: P) -> Self {
        let dir = dir.as_ref();
        self.train_images = dir.join("train-images.idx3-ubyte");
        self.train_labels = dir.join("train-labels.idx1-ubyte");
        self.test_images = dir.join("t10k-images.idx3-ubyte");
        self.test_labels = dir.join("t10k-labels.idx1-ubyte");
        self
    }

    /// Negative examples under `dir/train` and `dir/test`
    pub fn with_negatives_dir<P: AsRef<Path>>(mut self, dir: P) -> Self {
        let dir = dir.as_ref();
        self.negatives_train_dir = dir.join("train");
        self.negatives_test_dir = dir.join("test");
        self
    }

    pub fn with_negative_counts(mut self, train: usize, test: usize) -> Self {
        self.negatives_train_count = train;
        self.negatives_test_count = test;
        self
    }

    /// Both model files under `dir` with their default names
    pub fn with_output_dir<P: AsRef<Path>>(mut self, dir: P) -> Self {
        let dir = dir.as_ref();
        self.classifier_output = dir.join(ModelKind::DigitClassifier.default_file_name());
        self.detector_output = dir.join(ModelKind::DigitDetector.default_file_name());
        self
    }

    pub fn with_auto_tune(mut self, folds: usize) -> Self {
        self.auto_tune_folds = Some(folds);
        self
    }
}

/// Percent test error of each stage that ran
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct TrainingReport {
    pub classifier_error: f32,
    pub detector_error: f32,
}

pub struct Trainer {
    config: TrainerConfig,
}

impl Trainer {
    pub fn new(config: TrainerConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &TrainerConfig {
        &self.config
    }

    /// Load the MNIST splits, then train, test and save the classifier and
    /// the detector in that order. The first failure ends the run; a model
    /// saved by an earlier stage stays on disk.
    pub fn run(&self) -> Result<TrainingReport> {
        let (train, test) = self.load_mnist()?;

        let classifier_error = self
            .train_classifier(&train, &test)
            .context("Classification stage failed")?;

        let detector_error = self
            .train_detector(train, test)
            .context("Detector stage failed")?;

        Ok(TrainingReport { classifier_error, detector_error })
    }

    fn load_mnist(&self) -> Result<(Dataset, Dataset)> {
        let cfg = &self.config;
        info!("Loading MNIST data");
        let train = Dataset::from_mnist(&cfg.train_images, &cfg.train_labels, cfg.binarize_threshold)
            .context("Failed to load training data")?;
        let test = Dataset::from_mnist(&cfg.test_images, &cfg.test_labels, cfg.binarize_threshold)
            .context("Failed to load test data")?;
        info!("Loaded {} training and {} test images", train.len(), test.len());
        Ok((train, test))
    }

    fn train_classifier(&self, train: &Dataset, test: &Dataset) -> Result<f32> {
        let kind = ModelKind::DigitClassifier;
        let mut model = HogSvm::for_kind(kind);

        info!("Training {} SVM on {} images (this may take several minutes)", kind.name(), train.len());
        match self.config.auto_tune_folds {
            Some(folds) => {
                let features = model.extractor().extract_batch(&train.images)?;
                model.classifier_mut().train_auto(
                    &features,
                    &train.labels,
                    folds,
                    ParamGrid::default_c(),
                    ParamGrid::default_gamma(),
                )?;
            }
            None => model.train_images(&train.images, &train.labels)?,
        }

        self.test_and_save(kind, &model, test, &self.config.classifier_output)
    }

    fn train_detector(&self, train: Dataset, test: Dataset) -> Result<f32> {
        let cfg = &self.config;
        let kind = ModelKind::DigitDetector;

        let train_negatives = negatives::load_dir(
            &cfg.negatives_train_dir,
            cfg.negatives_train_count,
            cfg.binarize_threshold,
        )
        .context("Failed to load non-digit training images")?;
        let test_negatives = negatives::load_dir(
            &cfg.negatives_test_dir,
            cfg.negatives_test_count,
            cfg.binarize_threshold,
        )
        .context("Failed to load non-digit test images")?;

        let train = train.into_detector_set(train_negatives);
        let test = test.into_detector_set(test_negatives);

        let mut model = HogSvm::for_kind(kind);
        info!("Training {} SVM on {} images (this may take several minutes)", kind.name(), train.len());
        model.train_images(&train.images, &train.labels)?;

        self.test_and_save(kind, &model, &test, &cfg.detector_output)
    }

    fn test_and_save(&self, kind: ModelKind, model: &HogSvm, test: &Dataset, output: &Path) -> Result<f32> {
        info!("Testing {} SVM on {} images", kind.name(), test.len());
        let percent_error = if test.is_empty() {
            warn!("No {} test images, reporting 0% error", kind.name());
            0.0
        } else {
            model.test_images(&test.images, &test.labels)?
        };
        info!("{} SVM percent error: {:.2}%", kind.name(), percent_error);

        model
            .save(output)
            .with_context(|| format!("Failed to save {} model to {:?}", kind.name(), output))?;
        info!("Saved {} model to {:?}", kind.name(), output);
        Ok(percent_error)
    }
}
