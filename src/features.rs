//! HOG feature extraction
//!
//! Every image is resized to a fixed square window and described with a
//! Histogram of Oriented Gradients. The window, cell, block and bin
//! parameters fix the descriptor length, so all vectors produced by one
//! extractor have the same length and can be stacked into a
//! [`FeatureMatrix`].

use image::imageops::{self, FilterType};
use image::GrayImage;
use imageproc::hog::{hog, HogOptions};

use crate::error::{DigitError, Result};

/// HOG parameters. Sizes are in pixels except `block_side` and
/// `block_stride`, which count cells.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HogConfig {
    pub window: u32,
    pub cell_side: usize,
    pub block_side: usize,
    pub block_stride: usize,
    pub orientations: usize,
    pub signed: bool,
}

impl Default for HogConfig {
    /// 28x28 window (the MNIST canvas), 4x4 cells, 2x2-cell blocks moved one
    /// cell (4 px) at a time, 9 unsigned orientation bins.
    fn default() -> Self {
        Self {
            window: 28,
            cell_side: 4,
            block_side: 2,
            block_stride: 1,
            orientations: 9,
            signed: false,
        }
    }
}

impl HogConfig {
    pub fn with_window(mut self, window: u32) -> Self {
        self.window = window;
        self
    }

    pub fn with_cell_side(mut self, cell_side: usize) -> Self {
        self.cell_side = cell_side;
        self
    }

    pub fn with_orientations(mut self, orientations: usize) -> Self {
        self.orientations = orientations;
        self
    }

    fn options(&self) -> HogOptions {
        HogOptions::new(
            self.orientations,
            self.signed,
            self.cell_side,
            self.block_side,
            self.block_stride,
        )
    }

    /// Check that blocks tile the window exactly
    pub fn validate(&self) -> Result<()> {
        let invalid = |msg: String| Err(DigitError::ConfigurationInvalid(msg));
        if self.window == 0 || self.cell_side == 0 || self.block_side == 0 || self.block_stride == 0 {
            return invalid(format!("HOG sizes must be non-zero: {:?}", self));
        }
        if self.orientations == 0 {
            return invalid("HOG needs at least one orientation bin".to_string());
        }
        let window = self.window as usize;
        if window % self.cell_side != 0 {
            return invalid(format!(
                "window {} is not a multiple of cell side {}",
                window, self.cell_side
            ));
        }
        let cells = window / self.cell_side;
        if self.block_side > cells || (cells - self.block_side) % self.block_stride != 0 {
            return invalid(format!(
                "{}-cell blocks with stride {} do not tile {} cells",
                self.block_side, self.block_stride, cells
            ));
        }
        Ok(())
    }

    /// Descriptor length for a valid configuration (1296 for the default)
    pub fn descriptor_len(&self) -> usize {
        let cells = self.window as usize / self.cell_side.max(1);
        let blocks = (cells.saturating_sub(self.block_side)) / self.block_stride.max(1) + 1;
        blocks * blocks * self.block_side * self.block_side * self.orientations
    }
}

/// Converts a grayscale image into a fixed-length feature vector
pub trait FeatureExtractor {
    /// Length of every vector this extractor produces
    fn descriptor_len(&self) -> usize;

    fn extract(&self, image: &GrayImage) -> Result<Vec<f32>>;

    /// Row `i` of the result holds the features of `images[i]`
    fn extract_batch(&self, images: &[GrayImage]) -> Result<FeatureMatrix> {
        let mut features = FeatureMatrix::with_cols(self.descriptor_len());
        for image in images {
            features.push_row(&self.extract(image)?)?;
        }
        Ok(features)
    }
}

/// HOG descriptor over a resized window
#[derive(Debug, Clone)]
pub struct HogExtractor {
    config: HogConfig,
    descriptor_len: usize,
}

impl HogExtractor {
    pub fn new(config: HogConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            descriptor_len: config.descriptor_len(),
            config,
        })
    }

    pub fn config(&self) -> &HogConfig {
        &self.config
    }
}

impl Default for HogExtractor {
    fn default() -> Self {
        let config = HogConfig::default();
        Self {
            descriptor_len: config.descriptor_len(),
            config,
        }
    }
}

impl FeatureExtractor for HogExtractor {
    fn descriptor_len(&self) -> usize {
        self.descriptor_len
    }

    fn extract(&self, image: &GrayImage) -> Result<Vec<f32>> {
        let (width, height) = image.dimensions();
        if width == 0 || height == 0 {
            return Err(DigitError::ConfigurationInvalid(format!(
                "cannot extract features from a {}x{} image",
                width, height
            )));
        }

        let window = self.config.window;
        let resized;
        let input = if (width, height) == (window, window) {
            image
        } else {
            resized = imageops::resize(image, window, window, FilterType::Triangle);
            &resized
        };
        let mut descriptor =
            hog(input, self.config.options()).map_err(DigitError::ConfigurationInvalid)?;
        // Blocks without any gradient have nothing to normalize
        for value in descriptor.iter_mut().filter(|v| !v.is_finite()) {
            *value = 0.0;
        }

        if descriptor.len() != self.descriptor_len {
            return Err(DigitError::DescriptorLength {
                expected: self.descriptor_len,
                actual: descriptor.len(),
            });
        }
        Ok(descriptor)
    }
}

/// Row-major stack of feature vectors; every row has `cols` entries.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FeatureMatrix {
    cols: usize,
    data: Vec<f32>,
}

impl FeatureMatrix {
    /// Empty matrix whose row length is fixed by the first pushed row
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_cols(cols: usize) -> Self {
        Self { cols, data: Vec::new() }
    }

    pub fn from_rows<R: AsRef<[f32]>>(rows: &[R]) -> Result<Self> {
        let mut matrix = Self::new();
        for row in rows {
            matrix.push_row(row.as_ref())?;
        }
        Ok(matrix)
    }

    pub fn push_row(&mut self, row: &[f32]) -> Result<()> {
        if self.data.is_empty() && self.cols == 0 {
            self.cols = row.len();
        }
        if row.len() != self.cols || row.is_empty() {
            return Err(DigitError::DescriptorLength {
                expected: self.cols,
                actual: row.len(),
            });
        }
        self.data.extend_from_slice(row);
        Ok(())
    }

    pub fn rows(&self) -> usize {
        if self.cols == 0 { 0 } else { self.data.len() / self.cols }
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn row(&self, index: usize) -> Option<&[f32]> {
        let start = index.checked_mul(self.cols)?;
        self.data.get(start..start + self.cols).filter(|row| !row.is_empty())
    }

    pub fn iter_rows(&self) -> impl Iterator<Item = &[f32]> {
        self.data.chunks_exact(self.cols.max(1))
    }

    /// New matrix holding the listed rows, in the listed order
    pub fn select_rows(&self, indices: &[usize]) -> Self {
        let mut data = Vec::with_capacity(indices.len() * self.cols);
        for &index in indices {
            if let Some(row) = self.row(index) {
                data.extend_from_slice(row);
            }
        }
        Self { cols: self.cols, data }
    }
}
