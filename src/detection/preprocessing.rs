use std::collections::HashSet;

use image::{DynamicImage, GrayImage, Luma};
use imageproc::contrast::{threshold, ThresholdType};
use imageproc::distance_transform::Norm;
use imageproc::filter::box_filter;
use imageproc::morphology::close;
use imageproc::region_labelling::{connected_components, Connectivity};

/// Convert image to grayscale
pub fn to_grayscale(img: &DynamicImage) -> GrayImage {
    img.to_luma8()
}

/// Normalized box blur with a `size` x `size` kernel
pub fn apply_box_blur(img: &GrayImage, size: u32) -> GrayImage {
    let radius = size / 2;
    if radius == 0 {
        return img.clone();
    }
    box_filter(img, radius, radius)
}

/// Inverted binary threshold: pixels at or below `cutoff` become 255,
/// brighter pixels 0. Dark ink on paper turns into white foreground.
pub fn binarize_inverted(img: &GrayImage, cutoff: u8) -> GrayImage {
    threshold(img, cutoff, ThresholdType::BinaryInverted)
}

/// Plain binary threshold: pixels above `cutoff` become 255, the rest 0
pub fn binarize(img: &GrayImage, cutoff: u8) -> GrayImage {
    threshold(img, cutoff, ThresholdType::Binary)
}

/// Flood fill each seed's 4-connected foreground region with background.
/// Seeds outside the image or on background pixels are ignored.
pub fn clear_connected(img: &mut GrayImage, seeds: &[(u32, u32)]) {
    let labeled = connected_components(&*img, Connectivity::Four, Luma([0u8]));

    let doomed: HashSet<u32> = seeds
        .iter()
        .filter(|&&(x, y)| x < img.width() && y < img.height())
        .map(|&(x, y)| labeled.get_pixel(x, y)[0])
        .filter(|&label| label != 0)
        .collect();
    if doomed.is_empty() {
        return;
    }

    for (pixel, label) in img.pixels_mut().zip(labeled.pixels()) {
        if doomed.contains(&label[0]) {
            *pixel = Luma([0]);
        }
    }
}

/// Morphological closing with the 3x3 cross, joining strokes broken by a
/// pixel-wide gap
pub fn close_gaps(img: &GrayImage) -> GrayImage {
    close(img, Norm::L1, 1)
}
