use image::GrayImage;
use imageproc::rect::Rect;
use serde::{Deserialize, Serialize};

/// Integer class identifier: a digit value 0-9 for the classifier,
/// 1 (digit) / 0 (not a digit) for the detector.
pub type Label = i32;

/// Axis-aligned rectangle in frame coordinates.
///
/// The origin is signed because a padded region may extend past the
/// top-left corner of the frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BoundingRegion {
    pub x: i32,
    pub y: i32,
    pub width: u32,
    pub height: u32,
}

impl BoundingRegion {
    pub fn new(x: i32, y: i32, width: u32, height: u32) -> Self {
        Self { x, y, width, height }
    }

    /// Exclusive right edge
    pub fn right(&self) -> i32 {
        self.x + self.width as i32
    }

    /// Exclusive bottom edge
    pub fn bottom(&self) -> i32 {
        self.y + self.height as i32
    }

    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    /// Grow by `dx` on the left and right and by `dy` on the top and bottom
    pub fn expand(&self, dx: u32, dy: u32) -> Self {
        Self {
            x: self.x - dx as i32,
            y: self.y - dy as i32,
            width: self.width + 2 * dx,
            height: self.height + 2 * dy,
        }
    }

    /// Convert for the imageproc drawing functions; `None` for empty regions
    pub fn to_rect(&self) -> Option<Rect> {
        if self.is_empty() {
            return None;
        }
        Some(Rect::at(self.x, self.y).of_size(self.width, self.height))
    }
}

/// Outer border of one foreground component, in the coordinates of the
/// image it was traced in.
#[derive(Debug, Clone)]
pub struct Contour {
    pub min_x: u32,
    pub min_y: u32,
    pub max_x: u32,
    pub max_y: u32,
}

impl Contour {
    pub fn width(&self) -> u32 {
        self.max_x - self.min_x + 1
    }

    pub fn height(&self) -> u32 {
        self.max_y - self.min_y + 1
    }

    /// Bounding rectangle shifted by the origin of the traced image
    pub fn bounding_region(&self, offset_x: i32, offset_y: i32) -> BoundingRegion {
        BoundingRegion::new(
            self.min_x as i32 + offset_x,
            self.min_y as i32 + offset_y,
            self.width(),
            self.height(),
        )
    }
}

/// A candidate digit cut out of a binarized frame
#[derive(Debug, Clone)]
pub struct Candidate {
    /// Contour bounding rectangle in frame coordinates
    pub region: BoundingRegion,
    /// `region` grown by the padding applied to `image`
    pub padded_region: BoundingRegion,
    /// Binarized crop of `region` with a zero border
    pub image: GrayImage,
}

/// A candidate the detector accepted, with the classifier's digit
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Detection {
    pub region: BoundingRegion,
    pub digit: Label,
}

/// Per-frame output of the annotator. Nothing here outlives the frame.
#[derive(Debug, Clone)]
pub struct FrameAnnotation {
    pub roi: BoundingRegion,
    /// Binarized frame after edge cleanup and gap closing
    pub binary: GrayImage,
    /// Number of candidate regions the segmenter produced
    pub candidates: usize,
    pub detections: Vec<Detection>,
}
