mod fixtures;
pub use fixtures::*;

// Re-export commonly used types from digitcam for tests
pub use digitcam::{
    BoundingRegion, Classifier, DigitError, FeatureExtractor, FeatureMatrix, FrameSegmenter,
    HogSvm, ImagePredictor, Label, SegmenterConfig, Svm, SvmParams,
};
