//! OpenCV capture device and HighGUI windows

use std::time::Duration;

use image::{GrayImage, RgbImage};
use opencv::core::Mat;
use opencv::prelude::*;
use opencv::{highgui, imgproc, videoio};
use tracing::{info, warn};

use super::{FrameDisplay, FrameSource};
use crate::error::{DigitError, Result};

const DISPLAY_WINDOW: &str = "Display";
const PROCESSED_WINDOW: &str = "Test";

fn device_error(e: opencv::Error) -> DigitError {
    DigitError::DeviceUnavailable(e.to_string())
}

pub struct OpenCvCamera {
    capture: videoio::VideoCapture,
    width: i32,
    height: i32,
}

impl OpenCvCamera {
    pub fn open(index: i32) -> Result<Self> {
        let capture = videoio::VideoCapture::new(index, videoio::CAP_ANY).map_err(device_error)?;
        if !capture.is_opened().map_err(device_error)? {
            return Err(DigitError::DeviceUnavailable(format!(
                "could not open video capture device {}",
                index
            )));
        }

        let width = capture.get(videoio::CAP_PROP_FRAME_WIDTH).map_err(device_error)? as i32;
        let height = capture.get(videoio::CAP_PROP_FRAME_HEIGHT).map_err(device_error)? as i32;
        info!("Frame resolution: {}x{}", width, height);

        Ok(Self { capture, width, height })
    }

    pub fn frame_size(&self) -> (i32, i32) {
        (self.width, self.height)
    }
}

impl FrameSource for OpenCvCamera {
    fn next_frame(&mut self) -> Result<Option<RgbImage>> {
        let mut frame = Mat::default();
        let grabbed = self.capture.read(&mut frame).map_err(device_error)?;
        if !grabbed || frame.empty() {
            return Err(DigitError::DeviceUnavailable("empty frame from capture device".to_string()));
        }

        let mut rgb = Mat::default();
        imgproc::cvt_color_def(&frame, &mut rgb, imgproc::COLOR_BGR2RGB).map_err(device_error)?;
        let (cols, rows) = (rgb.cols() as u32, rgb.rows() as u32);
        let bytes = rgb.data_bytes().map_err(device_error)?.to_vec();

        RgbImage::from_raw(cols, rows, bytes)
            .map(Some)
            .ok_or_else(|| DigitError::DeviceUnavailable(format!("frame buffer does not fit {}x{}", cols, rows)))
    }
}

/// Two HighGUI windows: the annotated feed and the binarized frame
pub struct HighGuiDisplay;

impl HighGuiDisplay {
    /// Place the windows side by side, the second one `frame_width` to the right
    pub fn new(frame_width: i32) -> Result<Self> {
        highgui::named_window(DISPLAY_WINDOW, highgui::WINDOW_AUTOSIZE).map_err(device_error)?;
        highgui::move_window(DISPLAY_WINDOW, 0, 0).map_err(device_error)?;
        highgui::named_window(PROCESSED_WINDOW, highgui::WINDOW_AUTOSIZE).map_err(device_error)?;
        highgui::move_window(PROCESSED_WINDOW, frame_width, 0).map_err(device_error)?;
        Ok(Self)
    }
}

fn to_mat(bytes: &[u8], channels: i32, rows: u32) -> opencv::Result<Mat> {
    let flat = Mat::from_slice(bytes)?;
    flat.reshape(channels, rows as i32)?.try_clone()
}

impl FrameDisplay for HighGuiDisplay {
    fn show(&mut self, annotated: &RgbImage, processed: &GrayImage) -> Result<()> {
        let rgb = to_mat(annotated.as_raw(), 3, annotated.height()).map_err(device_error)?;
        let mut bgr = Mat::default();
        imgproc::cvt_color_def(&rgb, &mut bgr, imgproc::COLOR_RGB2BGR).map_err(device_error)?;
        highgui::imshow(DISPLAY_WINDOW, &bgr).map_err(device_error)?;

        let gray = to_mat(processed.as_raw(), 1, processed.height()).map_err(device_error)?;
        highgui::imshow(PROCESSED_WINDOW, &gray).map_err(device_error)?;
        Ok(())
    }

    fn poll_key(&mut self, wait: Duration) -> Result<Option<char>> {
        let delay = wait.as_millis().clamp(1, i32::MAX as u128) as i32;
        let key = highgui::wait_key(delay).map_err(device_error)?;
        if key < 0 {
            return Ok(None);
        }
        Ok(Some(char::from((key & 0xFF) as u8)))
    }
}

impl Drop for HighGuiDisplay {
    fn drop(&mut self) {
        if let Err(e) = highgui::destroy_all_windows() {
            warn!("Failed to close windows: {}", e);
        }
    }
}
