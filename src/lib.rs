pub mod annotate;
pub mod classifier;
pub mod dataset;
pub mod detection;
pub mod error;
pub mod features;
pub mod hog_svm;
pub mod logging;
pub mod models;
pub mod realtime;
pub mod svm;
pub mod training;

pub use annotate::{render, RealtimeAnnotator};
pub use classifier::{percent_error, Classifier};
pub use dataset::Dataset;
pub use detection::{FrameSegmenter, SegmenterConfig, Segmentation};
pub use error::{DigitError, Result};
pub use features::{FeatureExtractor, FeatureMatrix, HogConfig, HogExtractor};
pub use hog_svm::{HogSvm, ImagePredictor, ModelKind};
pub use models::{BoundingRegion, Candidate, Contour, Detection, FrameAnnotation, Label};
pub use realtime::{
    DirectoryDisplay, FrameDisplay, FrameSource, ImageDirSource, RealtimeConfig, RealtimeSession,
    SessionOutcome, SessionSummary,
};
pub use svm::{KernelType, Svm, SvmParams, SvmType, TermCriteria};
pub use training::{Trainer, TrainerConfig, TrainingReport};
