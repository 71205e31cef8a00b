//! Integration tests for frame segmentation.
//!
//! Tests cover:
//! - Region of interest geometry
//! - Candidate regions and padded crops for dark shapes on white paper
//! - Removal of foreground touching the ROI corners
//! - Outer contours only (holes ignored)
//! - Degenerate frames

mod common;

use image::DynamicImage;

use common::*;

fn segment(frame: image::RgbImage) -> digitcam::Result<digitcam::Segmentation> {
    FrameSegmenter::default().segment(&DynamicImage::ImageRgb8(frame))
}

fn near(a: i64, b: i64) -> bool {
    (a - b).abs() <= 1
}

#[test]
fn test_region_of_interest() {
    let segmenter = FrameSegmenter::default();
    assert_eq!(segmenter.region_of_interest(640, 480), BoundingRegion::new(80, 60, 480, 360));
    assert_eq!(segmenter.region_of_interest(200, 200), BoundingRegion::new(25, 25, 150, 150));

    let full = FrameSegmenter::new(SegmenterConfig::default().with_roi_fraction(1.0));
    assert_eq!(full.region_of_interest(64, 32), BoundingRegion::new(0, 0, 64, 32));
}

#[test]
fn test_single_square_candidate() -> anyhow::Result<()> {
    let segmentation = segment(square_frame())?;

    // 1. One candidate at the square
    assert_eq!(segmentation.roi, BoundingRegion::new(25, 25, 150, 150));
    assert_eq!(segmentation.candidates.len(), 1);
    let candidate = &segmentation.candidates[0];
    let region = candidate.region;
    assert!(near(region.x as i64, 80) && near(region.y as i64, 80));
    assert!(near(region.width as i64, 40) && near(region.height as i64, 40));

    // 2. Padding of 20% of the region size on each side
    let pad_x = region.width * 2 / 10;
    let pad_y = region.height * 2 / 10;
    assert_eq!(candidate.padded_region, region.expand(pad_x, pad_y));
    assert_eq!(
        candidate.image.dimensions(),
        (region.width + 2 * pad_x, region.height + 2 * pad_y)
    );

    // 3. Zero border, foreground in the middle
    let (w, h) = candidate.image.dimensions();
    assert_eq!(candidate.image.get_pixel(0, 0)[0], 0);
    assert_eq!(candidate.image.get_pixel(w - 1, h - 1)[0], 0);
    assert_eq!(candidate.image.get_pixel(w / 2, h / 2)[0], 255);

    // 4. The binarized frame is white ink on black
    assert_eq!(segmentation.binary.get_pixel(100, 100)[0], 255);
    assert_eq!(segmentation.binary.get_pixel(10, 10)[0], 0);

    Ok(())
}

#[test]
fn test_exact_region_for_square() -> anyhow::Result<()> {
    let segmentation = segment(square_frame())?;
    assert_eq!(segmentation.candidates.len(), 1);
    assert_eq!(segmentation.candidates[0].region, BoundingRegion::new(80, 80, 40, 40));
    assert_eq!(segmentation.candidates[0].image.dimensions(), (56, 56));
    Ok(())
}

#[test]
fn test_two_squares_give_two_candidates() -> anyhow::Result<()> {
    let mut frame = white_frame(200, 200);
    draw_square(&mut frame, 40, 60, 30);
    draw_square(&mut frame, 120, 100, 30);

    let segmentation = segment(frame)?;
    assert_eq!(segmentation.candidates.len(), 2);

    // Discovery order is not meaningful
    let mut origins: Vec<(i32, i32)> = segmentation
        .candidates
        .iter()
        .map(|c| (c.region.x, c.region.y))
        .collect();
    origins.sort();
    assert!(near(origins[0].0 as i64, 40) && near(origins[0].1 as i64, 60));
    assert!(near(origins[1].0 as i64, 120) && near(origins[1].1 as i64, 100));

    Ok(())
}

#[test]
fn test_corner_noise_is_erased() -> anyhow::Result<()> {
    // 1. Dark blocks over all four ROI corners
    let mut frame = white_frame(200, 200);
    for (x, y) in [(0, 0), (160, 0), (0, 160), (160, 160)] {
        draw_square(&mut frame, x, y, 40);
    }
    let segmentation = segment(frame.clone())?;
    assert!(segmentation.candidates.is_empty());
    assert_eq!(segmentation.binary.get_pixel(30, 30)[0], 0);

    // 2. A digit in the middle still comes through
    draw_square(&mut frame, 80, 80, 40);
    let segmentation = segment(frame)?;
    assert_eq!(segmentation.candidates.len(), 1);
    assert!(near(segmentation.candidates[0].region.x as i64, 80));

    Ok(())
}

#[test]
fn test_hole_is_not_a_candidate() -> anyhow::Result<()> {
    // 50x50 dark outline, 10 px thick, around a white hole
    let mut frame = white_frame(200, 200);
    draw_square(&mut frame, 75, 75, 50);
    imageproc::drawing::draw_filled_rect_mut(
        &mut frame,
        imageproc::rect::Rect::at(85, 85).of_size(30, 30),
        WHITE,
    );

    let segmentation = segment(frame)?;
    assert_eq!(segmentation.candidates.len(), 1);
    assert!(near(segmentation.candidates[0].region.width as i64, 50));

    Ok(())
}

#[test]
fn test_shapes_outside_roi_are_ignored() -> anyhow::Result<()> {
    // Left of the ROI, clear of the corner seeds
    let mut frame = white_frame(200, 200);
    draw_square(&mut frame, 2, 90, 15);

    let segmentation = segment(frame)?;
    assert!(segmentation.candidates.is_empty());
    Ok(())
}

#[test]
fn test_blank_and_degenerate_frames() -> anyhow::Result<()> {
    // 1. Blank paper
    let segmentation = segment(white_frame(120, 90))?;
    assert!(segmentation.candidates.is_empty());
    assert!(segmentation.binary.pixels().all(|p| p[0] == 0));

    // 2. A frame too small for any ROI
    let segmentation = segment(white_frame(1, 1))?;
    assert!(segmentation.roi.is_empty());
    assert!(segmentation.candidates.is_empty());

    Ok(())
}

#[test]
fn test_custom_padding() -> anyhow::Result<()> {
    let segmenter = FrameSegmenter::new(SegmenterConfig::default().with_padding_fraction(0.0));
    let segmentation = segmenter.segment(&DynamicImage::ImageRgb8(square_frame()))?;

    let candidate = &segmentation.candidates[0];
    assert_eq!(candidate.padded_region, candidate.region);
    assert_eq!(candidate.image.dimensions(), (candidate.region.width, candidate.region.height));
    Ok(())
}
