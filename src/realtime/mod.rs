//! Frame loop tying a frame source, the annotator and a display together

#[cfg(feature = "camera")]
pub mod camera;

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use image::{DynamicImage, GrayImage, RgbImage};
use tracing::{debug, error, info};

use crate::annotate::{render, RealtimeAnnotator};
use crate::error::{DigitError, Result};
use crate::hog_svm::{ImagePredictor, ModelKind};

/// Keys that end a session
pub const QUIT_KEYS: [char; 2] = ['q', 'Q'];

const FRAME_EXTENSIONS: [&str; 4] = ["png", "jpg", "jpeg", "bmp"];

/// Yields frames until the stream ends
pub trait FrameSource {
    /// `Ok(None)` at end of stream
    fn next_frame(&mut self) -> Result<Option<RgbImage>>;
}

impl<T: FrameSource + ?Sized> FrameSource for Box<T> {
    fn next_frame(&mut self) -> Result<Option<RgbImage>> {
        (**self).next_frame()
    }
}

/// Shows the annotated frame next to the binarized one and reports keys
pub trait FrameDisplay {
    fn show(&mut self, annotated: &RgbImage, processed: &GrayImage) -> Result<()>;

    /// Wait up to `wait` for a key press
    fn poll_key(&mut self, wait: Duration) -> Result<Option<char>>;
}

impl<T: FrameDisplay + ?Sized> FrameDisplay for Box<T> {
    fn show(&mut self, annotated: &RgbImage, processed: &GrayImage) -> Result<()> {
        (**self).show(annotated, processed)
    }

    fn poll_key(&mut self, wait: Duration) -> Result<Option<char>> {
        (**self).poll_key(wait)
    }
}

/// Settings of the realtime program
#[derive(Debug, Clone, PartialEq)]
pub struct RealtimeConfig {
    pub classifier_model: PathBuf,
    pub detector_model: PathBuf,
    pub device_index: i32,
    pub key_poll: Duration,
}

impl Default for RealtimeConfig {
    fn default() -> Self {
        Self {
            classifier_model: PathBuf::from(ModelKind::DigitClassifier.default_file_name()),
            detector_model: PathBuf::from(ModelKind::DigitDetector.default_file_name()),
            device_index: 0,
            key_poll: Duration::from_millis(50),
        }
    }
}

/// Why a session stopped
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionOutcome {
    Quit,
    EndOfStream,
    CaptureFailed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionSummary {
    pub outcome: SessionOutcome,
    pub frames: usize,
}

pub struct RealtimeSession<S, W, D, C> {
    annotator: RealtimeAnnotator<D, C>,
    source: S,
    display: W,
    key_poll: Duration,
}

impl<S, W, D, C> RealtimeSession<S, W, D, C>
where
    S: FrameSource,
    W: FrameDisplay,
    D: ImagePredictor,
    C: ImagePredictor,
{
    pub fn new(annotator: RealtimeAnnotator<D, C>, source: S, display: W) -> Self {
        Self {
            annotator,
            source,
            display,
            key_poll: Duration::from_millis(50),
        }
    }

    pub fn with_key_poll(mut self, key_poll: Duration) -> Self {
        self.key_poll = key_poll;
        self
    }

    /// Process frames until a quit key, the end of the stream or a failed
    /// capture. Errors while annotating or displaying a frame end the
    /// session with that error.
    pub fn run(&mut self) -> Result<SessionSummary> {
        let mut frames = 0;

        let outcome = loop {
            let frame = match self.source.next_frame() {
                Ok(Some(frame)) => frame,
                Ok(None) => {
                    info!("End of frame stream");
                    break SessionOutcome::EndOfStream;
                }
                Err(e) => {
                    error!("Failed to capture frame: {}", e);
                    break SessionOutcome::CaptureFailed;
                }
            };

            let frame = DynamicImage::ImageRgb8(frame);
            let annotation = self.annotator.annotate(&frame)?;
            debug!(
                "Frame {}: {} candidates, {} digits",
                frames,
                annotation.candidates,
                annotation.detections.len()
            );

            let mut canvas = frame.into_rgb8();
            render(&annotation, &mut canvas);
            self.display.show(&canvas, &annotation.binary)?;
            frames += 1;

            if let Some(key) = self.display.poll_key(self.key_poll)? {
                if QUIT_KEYS.contains(&key) {
                    info!("Exiting");
                    break SessionOutcome::Quit;
                }
            }
        };

        info!("Processed {} frames", frames);
        Ok(SessionSummary { outcome, frames })
    }

    pub fn into_parts(self) -> (RealtimeAnnotator<D, C>, S, W) {
        (self.annotator, self.source, self.display)
    }
}

/// Replays the images of a directory in file-name order
pub struct ImageDirSource {
    paths: Vec<PathBuf>,
    next: usize,
}

impl ImageDirSource {
    pub fn open<P: AsRef<Path>>(dir: P) -> Result<Self> {
        let dir = dir.as_ref();
        let entries = fs::read_dir(dir).map_err(|e| DigitError::ResourceMissing {
            path: dir.to_path_buf(),
            reason: e.to_string(),
        })?;

        let mut paths = Vec::new();
        for entry in entries {
            let path = entry?.path();
            let is_frame = path
                .extension()
                .and_then(|ext| ext.to_str())
                .is_some_and(|ext| FRAME_EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str()));
            if path.is_file() && is_frame {
                paths.push(path);
            }
        }
        paths.sort();

        info!("Replaying {} frames from {:?}", paths.len(), dir);
        Ok(Self { paths, next: 0 })
    }

    pub fn len(&self) -> usize {
        self.paths.len()
    }

    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }
}

impl FrameSource for ImageDirSource {
    fn next_frame(&mut self) -> Result<Option<RgbImage>> {
        let Some(path) = self.paths.get(self.next) else {
            return Ok(None);
        };
        self.next += 1;
        Ok(Some(image::open(path)?.to_rgb8()))
    }
}

/// Writes `annotated_NNNNN.png` and `processed_NNNNN.png` per frame into a
/// directory. Never reports a key.
pub struct DirectoryDisplay {
    dir: PathBuf,
    index: usize,
}

impl DirectoryDisplay {
    pub fn new<P: AsRef<Path>>(dir: P) -> Result<Self> {
        let dir = dir.as_ref().to_path_buf();
        fs::create_dir_all(&dir)?;
        Ok(Self { dir, index: 0 })
    }

    pub fn frames_written(&self) -> usize {
        self.index
    }
}

impl FrameDisplay for DirectoryDisplay {
    fn show(&mut self, annotated: &RgbImage, processed: &GrayImage) -> Result<()> {
        annotated.save(self.dir.join(format!("annotated_{:05}.png", self.index)))?;
        processed.save(self.dir.join(format!("processed_{:05}.png", self.index)))?;
        self.index += 1;
        Ok(())
    }

    fn poll_key(&mut self, _wait: Duration) -> Result<Option<char>> {
        Ok(None)
    }
}
