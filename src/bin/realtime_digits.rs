use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{error, info};

use digitcam::logging;
use digitcam::{
    DirectoryDisplay, FrameDisplay, FrameSegmenter, FrameSource, HogSvm, ImageDirSource,
    RealtimeAnnotator, RealtimeConfig, RealtimeSession, SegmenterConfig,
};

#[derive(Parser)]
#[command(name = "realtime-digits")]
#[command(about = "Detect and classify handwritten digits in a camera feed")]
struct Cli {
    /// Digit classifier model file
    #[arg(long, value_name = "FILE", default_value = "digit_classifier.svm")]
    classifier: PathBuf,

    /// Digit detector model file
    #[arg(long, value_name = "FILE", default_value = "digit_detector.svm")]
    detector: PathBuf,

    /// Capture device index
    #[arg(long, default_value_t = 0)]
    device: i32,

    /// Replay the images of this directory instead of opening the camera
    #[arg(long, value_name = "DIR")]
    frames: Option<PathBuf>,

    /// Write annotated and processed frames to this directory instead of
    /// showing windows
    #[arg(long, value_name = "DIR")]
    output: Option<PathBuf>,

    /// Key poll wait per frame, in milliseconds
    #[arg(long, default_value_t = 50)]
    key_wait_ms: u64,

    /// Enable debug logging
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> ExitCode {
    let args = Cli::parse();
    logging::init(args.verbose);

    match run(&args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{:#}", e);
            ExitCode::FAILURE
        }
    }
}

fn run(args: &Cli) -> Result<()> {
    let config = RealtimeConfig {
        classifier_model: args.classifier.clone(),
        detector_model: args.detector.clone(),
        device_index: args.device,
        key_poll: Duration::from_millis(args.key_wait_ms),
    };

    let classifier = HogSvm::from_file(&config.classifier_model)
        .with_context(|| format!("Failed to load classifier model file {:?}", config.classifier_model))?;
    let detector = HogSvm::from_file(&config.detector_model)
        .with_context(|| format!("Failed to load detector model file {:?}", config.detector_model))?;

    let (source, frame_width) = open_source(args, &config)?;
    let display = open_display(args, frame_width)?;

    let annotator = RealtimeAnnotator::new(FrameSegmenter::new(SegmenterConfig::default()), detector, classifier);
    let mut session = RealtimeSession::new(annotator, source, display).with_key_poll(config.key_poll);
    let summary = session.run()?;

    info!("Session ended ({:?}) after {} frames", summary.outcome, summary.frames);
    Ok(())
}

fn open_source(args: &Cli, config: &RealtimeConfig) -> Result<(Box<dyn FrameSource>, i32)> {
    if let Some(dir) = &args.frames {
        let source = ImageDirSource::open(dir).with_context(|| format!("Failed to open frame directory {:?}", dir))?;
        return Ok((Box::new(source), 0));
    }
    open_camera(config.device_index)
}

#[cfg(feature = "camera")]
fn open_camera(index: i32) -> Result<(Box<dyn FrameSource>, i32)> {
    let camera = digitcam::realtime::camera::OpenCvCamera::open(index)
        .with_context(|| format!("Could not open video capture device {}", index))?;
    let (width, _) = camera.frame_size();
    Ok((Box::new(camera), width))
}

#[cfg(not(feature = "camera"))]
fn open_camera(index: i32) -> Result<(Box<dyn FrameSource>, i32)> {
    Err(digitcam::DigitError::DeviceUnavailable(format!(
        "capture device {} requested but camera support is not compiled in; use --frames",
        index
    ))
    .into())
}

fn open_display(args: &Cli, frame_width: i32) -> Result<Box<dyn FrameDisplay>> {
    if let Some(dir) = &args.output {
        let display = DirectoryDisplay::new(dir).with_context(|| format!("Failed to create output directory {:?}", dir))?;
        return Ok(Box::new(display));
    }
    open_windows(frame_width)
}

#[cfg(feature = "camera")]
fn open_windows(frame_width: i32) -> Result<Box<dyn FrameDisplay>> {
    let display = digitcam::realtime::camera::HighGuiDisplay::new(frame_width).context("Failed to open display windows")?;
    Ok(Box::new(display))
}

#[cfg(not(feature = "camera"))]
fn open_windows(_frame_width: i32) -> Result<Box<dyn FrameDisplay>> {
    anyhow::bail!("No display available without camera support; pass --output DIR")
}
