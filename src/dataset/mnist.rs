//! IDX files of the MNIST corpus
//!
//! Images: magic 2051, count, rows, columns (big-endian u32), then one
//! row-major 8-bit payload per item. Labels: magic 2049, count, then one
//! byte per item.

use std::fs;
use std::path::Path;

use image::GrayImage;
use tracing::debug;

use crate::detection::preprocessing::binarize;
use crate::error::{DigitError, Result};
use crate::models::Label;

pub const IMAGE_MAGIC: u32 = 2051;
pub const LABEL_MAGIC: u32 = 2049;

/// Intensity above which an MNIST pixel is set to 255
pub const DEFAULT_BINARIZE_THRESHOLD: u8 = 90;

struct Header<'a> {
    fields: Vec<u32>,
    payload: &'a [u8],
}

fn read_file(path: &Path) -> Result<Vec<u8>> {
    fs::read(path).map_err(|e| DigitError::ResourceMissing {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })
}

fn parse_header<'a>(path: &Path, bytes: &'a [u8], magic: u32, fields: usize) -> Result<Header<'a>> {
    let header_len = 4 * (fields + 1);
    if bytes.len() < header_len {
        return Err(DigitError::DatasetFormat {
            path: path.to_path_buf(),
            reason: format!("file is {} bytes, header needs {}", bytes.len(), header_len),
        });
    }

    let mut words = bytes[..header_len]
        .chunks_exact(4)
        .map(|chunk| u32::from_be_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]));
    let found = words.next().unwrap_or_default();
    if found != magic {
        return Err(DigitError::DatasetFormat {
            path: path.to_path_buf(),
            reason: format!("magic number {} (expected {})", found, magic),
        });
    }

    Ok(Header { fields: words.collect(), payload: &bytes[header_len..] })
}

/// Read every image in an IDX image file and binarize it at `threshold`
pub fn read_images<P: AsRef<Path>>(path: P, threshold: u8) -> Result<Vec<GrayImage>> {
    let path = path.as_ref();
    let bytes = read_file(path)?;
    let header = parse_header(path, &bytes, IMAGE_MAGIC, 3)?;
    let (count, rows, cols) = (header.fields[0] as usize, header.fields[1], header.fields[2]);

    let image_size = rows as usize * cols as usize;
    let needed = count * image_size;
    if header.payload.len() < needed {
        return Err(DigitError::DatasetFormat {
            path: path.to_path_buf(),
            reason: format!(
                "{} images of {}x{} need {} payload bytes, found {}",
                count,
                cols,
                rows,
                needed,
                header.payload.len()
            ),
        });
    }

    let mut images = Vec::with_capacity(count);
    for index in 0..count {
        let start = index * image_size;
        let pixels = header.payload[start..start + image_size].to_vec();
        let image = GrayImage::from_raw(cols, rows, pixels).ok_or_else(|| DigitError::DatasetFormat {
            path: path.to_path_buf(),
            reason: format!("image {} does not fit {}x{}", index, cols, rows),
        })?;
        images.push(binarize(&image, threshold));
    }

    debug!("Read {} images of {}x{} from {:?}", images.len(), cols, rows, path);
    Ok(images)
}

/// Read every label in an IDX label file
pub fn read_labels<P: AsRef<Path>>(path: P) -> Result<Vec<Label>> {
    let path = path.as_ref();
    let bytes = read_file(path)?;
    let header = parse_header(path, &bytes, LABEL_MAGIC, 1)?;
    let count = header.fields[0] as usize;

    if header.payload.len() < count {
        return Err(DigitError::DatasetFormat {
            path: path.to_path_buf(),
            reason: format!("{} labels declared, found {}", count, header.payload.len()),
        });
    }

    debug!("Read {} labels from {:?}", count, path);
    Ok(header.payload[..count].iter().map(|&b| Label::from(b)).collect())
}
