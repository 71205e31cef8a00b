use crate::error::{DigitError, Result};
use crate::features::FeatureMatrix;
use crate::models::Label;

/// Train/test/predict contract of a decision model over feature vectors.
///
/// Implementations own their trained state exclusively and are not meant to
/// be trained and queried from several threads at once.
pub trait Classifier {
    /// Fit the model to `features` (one sample per row) and `labels`.
    /// Replaces any previously trained state on success.
    fn train(&mut self, features: &FeatureMatrix, labels: &[Label]) -> Result<()>;

    fn predict(&self, features: &[f32]) -> Result<Label>;

    fn is_trained(&self) -> bool;

    /// Percentage of rows whose prediction differs from the label
    fn test(&self, features: &FeatureMatrix, labels: &[Label]) -> Result<f32> {
        if features.rows() != labels.len() {
            return Err(DigitError::LabelMismatch {
                rows: features.rows(),
                labels: labels.len(),
            });
        }
        if !self.is_trained() {
            return Err(DigitError::Untrained);
        }

        let mut errors = 0;
        for (row, &label) in features.iter_rows().zip(labels) {
            if self.predict(row)? != label {
                errors += 1;
            }
        }
        Ok(percent_error(errors, labels.len()))
    }
}

/// `100 * errors / total`, or 0 for an empty set
pub fn percent_error(errors: usize, total: usize) -> f32 {
    if total == 0 {
        return 0.0;
    }
    100.0 * errors as f32 / total as f32
}
