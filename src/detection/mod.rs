pub mod contours;
pub mod preprocessing;

use image::imageops::{self, crop_imm};
use image::{DynamicImage, GrayImage};
use tracing::debug;

use crate::error::Result;
use crate::models::{BoundingRegion, Candidate};

/// Frame segmentation parameters
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SegmenterConfig {
    /// Box blur kernel side
    pub blur_size: u32,
    /// Intensity at or below which a pixel counts as ink
    pub threshold: u8,
    /// Fraction of frame width and height covered by the centered ROI
    pub roi_fraction: f32,
    /// Border added around each crop, as a fraction of its own size.
    /// MNIST centers a 20 px digit on a 28 px canvas: 4 / 20 = 0.2.
    pub padding_fraction: f32,
    /// Close one-pixel gaps in strokes before tracing contours
    pub close_gaps: bool,
}

impl Default for SegmenterConfig {
    fn default() -> Self {
        Self {
            blur_size: 5,
            threshold: 110,
            roi_fraction: 0.75,
            padding_fraction: 0.2,
            close_gaps: true,
        }
    }
}

impl SegmenterConfig {
    pub fn with_threshold(mut self, threshold: u8) -> Self {
        self.threshold = threshold;
        self
    }

    pub fn with_roi_fraction(mut self, roi_fraction: f32) -> Self {
        self.roi_fraction = roi_fraction;
        self
    }

    pub fn with_padding_fraction(mut self, padding_fraction: f32) -> Self {
        self.padding_fraction = padding_fraction;
        self
    }

    pub fn with_blur_size(mut self, blur_size: u32) -> Self {
        self.blur_size = blur_size;
        self
    }

    pub fn with_close_gaps(mut self, close_gaps: bool) -> Self {
        self.close_gaps = close_gaps;
        self
    }
}

/// Output of one segmentation pass
#[derive(Debug, Clone)]
pub struct Segmentation {
    /// Binarized frame after edge cleanup and closing
    pub binary: GrayImage,
    pub roi: BoundingRegion,
    /// One per external contour inside the ROI, in discovery order
    pub candidates: Vec<Candidate>,
}

/// Cuts candidate digit regions out of a camera frame.
///
/// Holds no state between frames.
#[derive(Debug, Clone, Default)]
pub struct FrameSegmenter {
    config: SegmenterConfig,
}

impl FrameSegmenter {
    pub fn new(config: SegmenterConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &SegmenterConfig {
        &self.config
    }

    /// Centered ROI covering `roi_fraction` of each frame dimension
    pub fn region_of_interest(&self, width: u32, height: u32) -> BoundingRegion {
        let fraction = self.config.roi_fraction.clamp(0.0, 1.0);
        BoundingRegion::new(
            (width as f32 * (1.0 - fraction) / 2.0) as i32,
            (height as f32 * (1.0 - fraction) / 2.0) as i32,
            (width as f32 * fraction) as u32,
            (height as f32 * fraction) as u32,
        )
    }

    pub fn segment(&self, frame: &DynamicImage) -> Result<Segmentation> {
        let gray = preprocessing::to_grayscale(frame);
        let blurred = preprocessing::apply_box_blur(&gray, self.config.blur_size);
        let mut binary = preprocessing::binarize_inverted(&blurred, self.config.threshold);

        let (width, height) = binary.dimensions();
        let roi = self.region_of_interest(width, height);
        if roi.is_empty() {
            debug!("Frame {}x{} leaves an empty region of interest", width, height);
            return Ok(Segmentation { binary, roi, candidates: Vec::new() });
        }

        // Erase foreground touching the ROI corners, clamped into the frame
        let clamp = |x: i32, y: i32| {
            (
                (x.max(0) as u32).min(width - 1),
                (y.max(0) as u32).min(height - 1),
            )
        };
        let seeds = [
            clamp(roi.x, roi.y),
            clamp(roi.x, roi.bottom()),
            clamp(roi.right(), roi.bottom()),
            clamp(roi.right(), roi.y),
        ];
        preprocessing::clear_connected(&mut binary, &seeds);

        if self.config.close_gaps {
            binary = preprocessing::close_gaps(&binary);
        }

        let roi_image = crop_imm(&binary, roi.x as u32, roi.y as u32, roi.width, roi.height).to_image();
        let contours = contours::find_external_contours(&roi_image);
        debug!("Found {} external contours in {:?}", contours.len(), roi);

        let candidates = contours
            .iter()
            .map(|contour| {
                let region = contour.bounding_region(roi.x, roi.y);
                self.cut_candidate(&binary, region)
            })
            .collect();

        Ok(Segmentation { binary, roi, candidates })
    }

    /// Crop `region` out of the binarized frame and surround it with a zero
    /// border of `padding_fraction` of its width (left/right) and height
    /// (top/bottom).
    fn cut_candidate(&self, binary: &GrayImage, region: BoundingRegion) -> Candidate {
        let fraction = self.config.padding_fraction.max(0.0);
        let pad_x = (region.width as f32 * fraction) as u32;
        let pad_y = (region.height as f32 * fraction) as u32;
        let padded_region = region.expand(pad_x, pad_y);

        let crop = crop_imm(
            binary,
            region.x.max(0) as u32,
            region.y.max(0) as u32,
            region.width,
            region.height,
        )
        .to_image();
        let mut image = GrayImage::new(padded_region.width, padded_region.height);
        imageops::replace(&mut image, &crop, pad_x as i64, pad_y as i64);

        Candidate { region, padded_region, image }
    }
}
