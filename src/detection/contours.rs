use image::GrayImage;
use imageproc::contours::{find_contours, BorderType};

use crate::models::Contour;

/// Trace the outer borders of foreground components in a binary image.
///
/// Only outermost borders are kept: holes, and components nested inside
/// holes, are ignored.
pub fn find_external_contours(binary: &GrayImage) -> Vec<Contour> {
    find_contours::<i32>(binary)
        .into_iter()
        .filter(|contour| matches!(contour.border_type, BorderType::Outer) && contour.parent.is_none())
        .filter_map(|contour| {
            let first = contour.points.first()?;
            let mut bounds = (first.x, first.y, first.x, first.y);
            for point in &contour.points {
                bounds.0 = bounds.0.min(point.x);
                bounds.1 = bounds.1.min(point.y);
                bounds.2 = bounds.2.max(point.x);
                bounds.3 = bounds.3.max(point.y);
            }
            let (min_x, min_y, max_x, max_y) = bounds;
            Some(Contour {
                min_x: min_x.max(0) as u32,
                min_y: min_y.max(0) as u32,
                max_x: max_x.max(0) as u32,
                max_y: max_y.max(0) as u32,
            })
        })
        .collect()
}
