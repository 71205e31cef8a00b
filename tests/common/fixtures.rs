#![allow(dead_code)]

use std::cell::Cell;
use std::fs;
use std::path::Path;

use digitcam::{DigitError, FeatureMatrix, ImagePredictor, Label};
use image::{GrayImage, Luma, Rgb, RgbImage};
use imageproc::drawing::{draw_filled_rect_mut, draw_hollow_circle_mut};
use imageproc::rect::Rect;

pub const BLACK: Rgb<u8> = Rgb([0, 0, 0]);
pub const WHITE: Rgb<u8> = Rgb([255, 255, 255]);

/// Uniformly white RGB frame, like blank paper under the camera
pub fn white_frame(width: u32, height: u32) -> RgbImage {
    RgbImage::from_pixel(width, height, WHITE)
}

/// Fill a `size` x `size` black square with its top-left corner at (x, y)
pub fn draw_square(frame: &mut RgbImage, x: i32, y: i32, size: u32) {
    draw_filled_rect_mut(frame, Rect::at(x, y).of_size(size, size), BLACK);
}

/// 200x200 white frame with one 40x40 black square at (80, 80)
pub fn square_frame() -> RgbImage {
    let mut frame = white_frame(200, 200);
    draw_square(&mut frame, 80, 80, 40);
    frame
}

/// 28x28 "zero": a white ring on black, shifted horizontally by `shift`
pub fn ring_digit(shift: i32) -> GrayImage {
    let mut image = GrayImage::new(28, 28);
    for radius in 7..=9 {
        draw_hollow_circle_mut(&mut image, (14 + shift, 14), radius, Luma([255]));
    }
    image
}

/// 28x28 "one": a vertical white bar on black, shifted horizontally by `shift`
pub fn bar_digit(shift: i32) -> GrayImage {
    let mut image = GrayImage::new(28, 28);
    draw_filled_rect_mut(&mut image, Rect::at(12 + shift, 5).of_size(4, 18), Luma([255]));
    image
}

/// 28x28 horizontal stripes across the whole canvas, offset vertically
pub fn stripes(offset: u32) -> GrayImage {
    GrayImage::from_fn(28, 28, |_, y| {
        if (y + offset) % 6 < 3 { Luma([255]) } else { Luma([0]) }
    })
}

/// Rings labelled 0 and bars labelled 1, interleaved
pub fn ring_and_bar_set(per_class: usize) -> (Vec<GrayImage>, Vec<Label>) {
    let mut images = Vec::new();
    let mut labels = Vec::new();
    for i in 0..per_class {
        let shift = i as i32 % 5 - 2;
        images.push(ring_digit(shift));
        labels.push(0);
        images.push(bar_digit(shift));
        labels.push(1);
    }
    (images, labels)
}

pub fn write_mnist_images(path: &Path, images: &[GrayImage]) {
    let (width, height) = images.first().map(|i| i.dimensions()).unwrap_or((28, 28));
    let mut bytes = Vec::new();
    for word in [2051u32, images.len() as u32, height, width] {
        bytes.extend_from_slice(&word.to_be_bytes());
    }
    for image in images {
        bytes.extend_from_slice(image.as_raw());
    }
    fs::write(path, bytes).expect("Failed to write MNIST image file");
}

pub fn write_mnist_labels(path: &Path, labels: &[Label]) {
    let mut bytes = Vec::new();
    for word in [2049u32, labels.len() as u32] {
        bytes.extend_from_slice(&word.to_be_bytes());
    }
    bytes.extend(labels.iter().map(|&l| l as u8));
    fs::write(path, bytes).expect("Failed to write MNIST label file");
}

/// Write both MNIST splits under `dir` with the standard file names
pub fn write_mnist_dir(
    dir: &Path,
    train: &(Vec<GrayImage>, Vec<Label>),
    test: &(Vec<GrayImage>, Vec<Label>),
) {
    fs::create_dir_all(dir).expect("Failed to create MNIST directory");
    write_mnist_images(&dir.join("train-images.idx3-ubyte"), &train.0);
    write_mnist_labels(&dir.join("train-labels.idx1-ubyte"), &train.1);
    write_mnist_images(&dir.join("t10k-images.idx3-ubyte"), &test.0);
    write_mnist_labels(&dir.join("t10k-labels.idx1-ubyte"), &test.1);
}

/// Save `images` as `image0.bmp`, `image1.bmp`, ... in `dir`
pub fn write_negatives(dir: &Path, images: &[GrayImage]) {
    fs::create_dir_all(dir).expect("Failed to create negatives directory");
    for (i, image) in images.iter().enumerate() {
        image
            .save(dir.join(format!("image{}.bmp", i)))
            .expect("Failed to save negative example");
    }
}

/// Two well separated 2-D clusters labelled `a` (around the origin) and
/// `b` (around (10, 10))
pub fn two_clusters(a: Label, b: Label) -> (FeatureMatrix, Vec<Label>) {
    let offsets = [(0.0, 0.0), (0.5, 0.2), (-0.3, 0.4), (0.2, -0.5), (-0.4, -0.1)];
    let mut rows = Vec::new();
    let mut labels = Vec::new();
    for &(dx, dy) in &offsets {
        rows.push(vec![dx, dy]);
        labels.push(a);
        rows.push(vec![10.0 + dx, 10.0 + dy]);
        labels.push(b);
    }
    let features = FeatureMatrix::from_rows(&rows).expect("Failed to build feature matrix");
    (features, labels)
}

/// Three clusters: 3 near (0, 0), 5 near (10, 0), 8 near (0, 10)
pub fn three_clusters() -> (FeatureMatrix, Vec<Label>) {
    let offsets = [(0.0, 0.0), (0.5, 0.2), (-0.3, 0.4), (0.2, -0.5)];
    let centers = [(3, 0.0, 0.0), (5, 10.0, 0.0), (8, 0.0, 10.0)];
    let mut rows = Vec::new();
    let mut labels = Vec::new();
    for &(dx, dy) in &offsets {
        for &(label, cx, cy) in &centers {
            rows.push(vec![cx + dx, cy + dy]);
            labels.push(label);
        }
    }
    let features = FeatureMatrix::from_rows(&rows).expect("Failed to build feature matrix");
    (features, labels)
}

/// Predicts the same label for every image and counts its calls
pub struct FixedPredictor {
    pub label: Label,
    pub calls: Cell<usize>,
}

impl FixedPredictor {
    pub fn new(label: Label) -> Self {
        Self { label, calls: Cell::new(0) }
    }
}

impl ImagePredictor for FixedPredictor {
    fn predict_image(&self, _image: &GrayImage) -> digitcam::Result<Label> {
        self.calls.set(self.calls.get() + 1);
        Ok(self.label)
    }
}

/// Predicts 1 for images at least `min_width` wide, 0 otherwise
pub struct WidthPredictor {
    pub min_width: u32,
}

impl ImagePredictor for WidthPredictor {
    fn predict_image(&self, image: &GrayImage) -> digitcam::Result<Label> {
        Ok(if image.width() >= self.min_width { 1 } else { 0 })
    }
}

/// Fails every prediction
pub struct FailingPredictor;

impl ImagePredictor for FailingPredictor {
    fn predict_image(&self, _image: &GrayImage) -> digitcam::Result<Label> {
        Err(DigitError::NumericsFault("prediction failed".to_string()))
    }
}
