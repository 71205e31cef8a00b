//! Per-frame digit detection and the overlay drawn for it

use image::{DynamicImage, Rgb, RgbImage};
use imageproc::drawing::{draw_hollow_rect_mut, draw_line_segment_mut};
use tracing::debug;

use crate::detection::FrameSegmenter;
use crate::error::Result;
use crate::hog_svm::ImagePredictor;
use crate::models::{BoundingRegion, Detection, FrameAnnotation};

const ROI_COLOR: Rgb<u8> = Rgb([255, 0, 0]);

/// Box colours, cycled per detection
const PALETTE: [Rgb<u8>; 6] = [
    Rgb([0, 255, 0]),
    Rgb([0, 128, 255]),
    Rgb([255, 200, 0]),
    Rgb([255, 0, 255]),
    Rgb([0, 255, 255]),
    Rgb([255, 128, 0]),
];

const GLYPH_WIDTH: i32 = 8;
const GLYPH_HEIGHT: i32 = 14;
const GLYPH_ADVANCE: i32 = GLYPH_WIDTH + 4;

/// Seven-segment masks for 0-9, bit 0 = top segment through bit 6 = middle
const DIGIT_SEGMENTS: [u8; 10] = [0x3F, 0x06, 0x5B, 0x4F, 0x66, 0x6D, 0x7D, 0x07, 0x7F, 0x6F];
const MINUS_SEGMENTS: u8 = 0x40;

/// Runs the segmenter on a frame and keeps the candidates the detector
/// accepts, labelled by the classifier.
pub struct RealtimeAnnotator<D, C> {
    segmenter: FrameSegmenter,
    detector: D,
    classifier: C,
}

impl<D: ImagePredictor, C: ImagePredictor> RealtimeAnnotator<D, C> {
    pub fn new(segmenter: FrameSegmenter, detector: D, classifier: C) -> Self {
        Self { segmenter, detector, classifier }
    }

    pub fn segmenter(&self) -> &FrameSegmenter {
        &self.segmenter
    }

    pub fn annotate(&self, frame: &DynamicImage) -> Result<FrameAnnotation> {
        let segmentation = self.segmenter.segment(frame)?;
        let candidates = segmentation.candidates.len();

        let mut detections = Vec::new();
        for candidate in &segmentation.candidates {
            if self.detector.predict_image(&candidate.image)? <= 0 {
                continue;
            }
            let digit = self.classifier.predict_image(&candidate.image)?;
            debug!("Digit {} at {:?}", digit, candidate.region);
            detections.push(Detection { region: candidate.region, digit });
        }

        Ok(FrameAnnotation {
            roi: segmentation.roi,
            binary: segmentation.binary,
            candidates,
            detections,
        })
    }
}

/// Draw the ROI, a box per detection and its digit onto `canvas`
pub fn render(annotation: &FrameAnnotation, canvas: &mut RgbImage) {
    if let Some(rect) = annotation.roi.to_rect() {
        draw_hollow_rect_mut(canvas, rect, ROI_COLOR);
    }

    for (index, detection) in annotation.detections.iter().enumerate() {
        let color = PALETTE[index % PALETTE.len()];
        draw_box(canvas, detection.region, color);

        let x = detection.region.x;
        let y = (detection.region.y - GLYPH_HEIGHT - 4).max(0);
        draw_label(canvas, x, y, detection.digit, color);
    }
}

/// Two-pixel outline, the second pass one pixel inside the first
fn draw_box(canvas: &mut RgbImage, region: BoundingRegion, color: Rgb<u8>) {
    if let Some(rect) = region.to_rect() {
        draw_hollow_rect_mut(canvas, rect, color);
    }
    if region.width > 2 && region.height > 2 {
        let inner = BoundingRegion::new(region.x + 1, region.y + 1, region.width - 2, region.height - 2);
        if let Some(rect) = inner.to_rect() {
            draw_hollow_rect_mut(canvas, rect, color);
        }
    }
}

fn draw_label(canvas: &mut RgbImage, x: i32, y: i32, label: i32, color: Rgb<u8>) {
    let mut origin = x;
    for ch in label.to_string().chars() {
        let mask = match ch {
            '-' => MINUS_SEGMENTS,
            _ => match ch.to_digit(10) {
                Some(d) => DIGIT_SEGMENTS[d as usize],
                None => continue,
            },
        };
        draw_glyph(canvas, origin, y, mask, color);
        origin += GLYPH_ADVANCE;
    }
}

fn draw_glyph(canvas: &mut RgbImage, x: i32, y: i32, mask: u8, color: Rgb<u8>) {
    let (w, h, mid) = (GLYPH_WIDTH, GLYPH_HEIGHT, GLYPH_HEIGHT / 2);
    // a b c d e f g
    let segments = [
        ((0, 0), (w, 0)),
        ((w, 0), (w, mid)),
        ((w, mid), (w, h)),
        ((0, h), (w, h)),
        ((0, mid), (0, h)),
        ((0, 0), (0, mid)),
        ((0, mid), (w, mid)),
    ];

    for (bit, ((x0, y0), (x1, y1))) in segments.into_iter().enumerate() {
        if mask & (1 << bit) == 0 {
            continue;
        }
        let horizontal = y0 == y1;
        for offset in 0..2 {
            let (dx, dy) = if horizontal { (0, offset) } else { (offset, 0) };
            draw_line_segment_mut(
                canvas,
                ((x + x0 + dx) as f32, (y + y0 + dy) as f32),
                ((x + x1 + dx) as f32, (y + y1 + dy) as f32),
                color,
            );
        }
    }
}
