pub mod mnist;
pub mod negatives;

use std::path::Path;

use image::GrayImage;

use crate::error::{DigitError, Result};
use crate::models::Label;

/// Label of every image in a detector set that shows a digit
pub const DIGIT_LABEL: Label = 1;
/// Label of the negative examples in a detector set
pub const NOT_DIGIT_LABEL: Label = 0;

/// Images paired one-to-one with labels
#[derive(Debug, Clone, Default)]
pub struct Dataset {
    pub images: Vec<GrayImage>,
    pub labels: Vec<Label>,
}

impl Dataset {
    pub fn new(images: Vec<GrayImage>, labels: Vec<Label>) -> Result<Self> {
        if images.len() != labels.len() {
            return Err(DigitError::LabelMismatch {
                rows: images.len(),
                labels: labels.len(),
            });
        }
        Ok(Self { images, labels })
    }

    /// Image and label files of one MNIST split
    pub fn from_mnist<P: AsRef<Path>, Q: AsRef<Path>>(images: P, labels: Q, threshold: u8) -> Result<Self> {
        let images = mnist::read_images(images, threshold)?;
        let labels = mnist::read_labels(labels)?;
        Self::new(images, labels)
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    pub fn push(&mut self, image: GrayImage, label: Label) {
        self.images.push(image);
        self.labels.push(label);
    }

    pub fn extend<I: IntoIterator<Item = GrayImage>>(&mut self, images: I, label: Label) {
        for image in images {
            self.push(image, label);
        }
    }

    /// Digit/not-digit set: every existing image relabelled as a digit,
    /// followed by `negatives` labelled as not a digit
    pub fn into_detector_set(mut self, negatives: Vec<GrayImage>) -> Self {
        self.labels.fill(DIGIT_LABEL);
        self.extend(negatives, NOT_DIGIT_LABEL);
        self
    }
}
