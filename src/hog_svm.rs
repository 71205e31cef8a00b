//! Image-level models: a feature extractor feeding a classifier
//!
//! The digit classifier and the digit detector share this shape and differ
//! only in SVM parameters and in the labels they are trained on.

use std::path::Path;

use image::GrayImage;
use tracing::info;

use crate::classifier::Classifier;
use crate::error::{DigitError, Result};
use crate::features::{FeatureExtractor, HogExtractor};
use crate::models::Label;
use crate::svm::{Svm, SvmParams};

/// Predicts a label for a whole image
pub trait ImagePredictor {
    fn predict_image(&self, image: &GrayImage) -> Result<Label>;
}

/// Which of the two image models to build
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModelKind {
    /// Digit value 0-9
    DigitClassifier,
    /// 1 = digit, 0 = not a digit
    DigitDetector,
}

impl ModelKind {
    pub fn params(&self) -> SvmParams {
        match self {
            ModelKind::DigitClassifier => SvmParams::digit_classifier(),
            ModelKind::DigitDetector => SvmParams::digit_detector(),
        }
    }

    pub fn default_file_name(&self) -> &'static str {
        match self {
            ModelKind::DigitClassifier => "digit_classifier.svm",
            ModelKind::DigitDetector => "digit_detector.svm",
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            ModelKind::DigitClassifier => "classification",
            ModelKind::DigitDetector => "detector",
        }
    }
}

/// A feature extractor and the classifier trained on its output
#[derive(Debug, Clone)]
pub struct HogSvm<E = HogExtractor, C = Svm> {
    extractor: E,
    classifier: C,
}

impl HogSvm {
    /// Untrained model with the preset parameters for `kind`
    pub fn for_kind(kind: ModelKind) -> Self {
        Self::new(HogExtractor::default(), Svm::with_params(kind.params()))
    }

    pub fn digit_classifier() -> Self {
        Self::for_kind(ModelKind::DigitClassifier)
    }

    pub fn digit_detector() -> Self {
        Self::for_kind(ModelKind::DigitDetector)
    }

    /// Default HOG extractor with a model loaded from `path`
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let extractor = HogExtractor::default();
        let svm = Svm::from_file(path)?;
        if let Some(model) = svm.model() {
            if model.descriptor_len() != extractor.descriptor_len() {
                return Err(DigitError::DescriptorLength {
                    expected: extractor.descriptor_len(),
                    actual: model.descriptor_len(),
                });
            }
        }
        Ok(Self::new(extractor, svm))
    }

    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        self.classifier.save(path)
    }
}

impl<E: FeatureExtractor, C: Classifier> HogSvm<E, C> {
    pub fn new(extractor: E, classifier: C) -> Self {
        Self { extractor, classifier }
    }

    pub fn extractor(&self) -> &E {
        &self.extractor
    }

    pub fn classifier(&self) -> &C {
        &self.classifier
    }

    pub fn classifier_mut(&mut self) -> &mut C {
        &mut self.classifier
    }

    pub fn is_trained(&self) -> bool {
        self.classifier.is_trained()
    }

    /// Extract features from every image and train on them
    pub fn train_images(&mut self, images: &[GrayImage], labels: &[Label]) -> Result<()> {
        if images.len() != labels.len() {
            return Err(DigitError::LabelMismatch {
                rows: images.len(),
                labels: labels.len(),
            });
        }
        let features = self.extractor.extract_batch(images)?;
        info!(
            "Extracted {} feature vectors of length {}",
            features.rows(),
            features.cols()
        );
        self.classifier.train(&features, labels)
    }

    /// Percent error over `images`
    pub fn test_images(&self, images: &[GrayImage], labels: &[Label]) -> Result<f32> {
        if images.len() != labels.len() {
            return Err(DigitError::LabelMismatch {
                rows: images.len(),
                labels: labels.len(),
            });
        }
        if !self.classifier.is_trained() {
            return Err(DigitError::Untrained);
        }
        let features = self.extractor.extract_batch(images)?;
        self.classifier.test(&features, labels)
    }
}

impl<E: FeatureExtractor, C: Classifier> ImagePredictor for HogSvm<E, C> {
    fn predict_image(&self, image: &GrayImage) -> Result<Label> {
        let features = self.extractor.extract(image)?;
        self.classifier.predict(&features)
    }
}
