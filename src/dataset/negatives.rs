//! Non-digit example images, stored as `image{i}.bmp` in a directory

use std::path::Path;

use image::GrayImage;
use tracing::debug;

use crate::detection::preprocessing::binarize;
use crate::error::{DigitError, Result};

pub fn file_name(index: usize) -> String {
    format!("image{}.bmp", index)
}

/// Load `image0.bmp` .. `image{count-1}.bmp` from `dir` as grayscale,
/// binarized the same way as the MNIST digits
pub fn load_dir<P: AsRef<Path>>(dir: P, count: usize, threshold: u8) -> Result<Vec<GrayImage>> {
    let dir = dir.as_ref();
    let mut images = Vec::with_capacity(count);

    for index in 0..count {
        let path = dir.join(file_name(index));
        if !path.is_file() {
            return Err(DigitError::ResourceMissing {
                path,
                reason: "negative example not found".to_string(),
            });
        }
        let image = image::open(&path).map_err(|e| DigitError::DatasetFormat {
            path: path.clone(),
            reason: e.to_string(),
        })?;
        images.push(binarize(&image.to_luma8(), threshold));
    }

    debug!("Loaded {} negative examples from {:?}", images.len(), dir);
    Ok(images)
}
