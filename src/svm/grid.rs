//! Hyperparameter search by k-fold cross-validation

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::{fit, KernelType, Svm};
use crate::classifier::{percent_error, Classifier};
use crate::error::{DigitError, Result};
use crate::features::FeatureMatrix;
use crate::models::Label;

/// Logarithmic grid: `min, min*log_step, min*log_step^2, ...` while below `max`.
/// A grid with `log_step <= 1` or `max <= min` holds only `min`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ParamGrid {
    pub min: f64,
    pub max: f64,
    pub log_step: f64,
}

impl ParamGrid {
    pub fn new(min: f64, max: f64, log_step: f64) -> Self {
        Self { min, max, log_step }
    }

    /// Single-value grid
    pub fn fixed(value: f64) -> Self {
        Self::new(value, value, 1.0)
    }

    pub fn default_c() -> Self {
        Self::new(10.0, 20.0, 1.1)
    }

    pub fn default_gamma() -> Self {
        Self::new(0.5, 2.0, 1.1)
    }

    pub fn values(&self) -> Result<Vec<f64>> {
        if !(self.min > 0.0 && self.min.is_finite()) {
            return Err(DigitError::ConfigurationInvalid(format!(
                "parameter grid must start above zero: {:?}",
                self
            )));
        }
        if self.log_step <= 1.0 || self.max <= self.min {
            return Ok(vec![self.min]);
        }
        let mut values = Vec::new();
        let mut value = self.min;
        while value < self.max {
            values.push(value);
            value *= self.log_step;
        }
        Ok(values)
    }
}

/// Parameters chosen by [`Svm::train_auto`]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AutoTrainReport {
    pub c: f64,
    pub gamma: f64,
    /// Cross-validation percent error of the chosen parameters
    pub cv_error: f32,
}

impl Svm {
    /// Search `c_grid` x `gamma_grid` for the lowest k-fold cross-validation
    /// error, keep those parameters and train on the full set.
    ///
    /// Fold membership is `row % k_fold`. On equal error the first
    /// combination visited wins. The gamma grid is skipped for the linear
    /// kernel.
    pub fn train_auto(
        &mut self,
        features: &FeatureMatrix,
        labels: &[Label],
        k_fold: usize,
        c_grid: ParamGrid,
        gamma_grid: ParamGrid,
    ) -> Result<AutoTrainReport> {
        if features.rows() != labels.len() {
            return Err(DigitError::LabelMismatch {
                rows: features.rows(),
                labels: labels.len(),
            });
        }
        if k_fold < 2 || k_fold > labels.len() {
            return Err(DigitError::ConfigurationInvalid(format!(
                "{}-fold cross-validation over {} samples",
                k_fold,
                labels.len()
            )));
        }

        let c_values = c_grid.values()?;
        let gamma_values = if self.params.kernel == KernelType::Linear {
            vec![self.params.gamma]
        } else {
            gamma_grid.values()?
        };

        let mut best: Option<AutoTrainReport> = None;
        for &c in &c_values {
            for &gamma in &gamma_values {
                let params = self.params.with_c(c).with_gamma(gamma);
                let cv_error = cross_validate(&params, features, labels, k_fold)?;
                debug!("C={:.4} gamma={:.4}: {:.2}% cross-validation error", c, gamma, cv_error);
                if best.is_none_or(|b| cv_error < b.cv_error) {
                    best = Some(AutoTrainReport { c, gamma, cv_error });
                }
            }
        }

        let best = best.ok_or_else(|| {
            DigitError::ConfigurationInvalid("empty parameter grid".to_string())
        })?;
        info!(
            "Auto-training selected C={:.4} gamma={:.4} ({:.2}% cross-validation error)",
            best.c, best.gamma, best.cv_error
        );

        self.params.c = best.c;
        self.params.gamma = best.gamma;
        self.train(features, labels)?;
        Ok(best)
    }
}

fn cross_validate(
    params: &super::SvmParams,
    features: &FeatureMatrix,
    labels: &[Label],
    k_fold: usize,
) -> Result<f32> {
    let mut errors = 0;
    for fold in 0..k_fold {
        let (held_out, kept): (Vec<usize>, Vec<usize>) =
            (0..labels.len()).partition(|row| row % k_fold == fold);

        let train_labels: Vec<Label> = kept.iter().map(|&row| labels[row]).collect();
        let model = fit(params, &features.select_rows(&kept), &train_labels)?;

        for &row in &held_out {
            if let Some(sample) = features.row(row) {
                if model.predict(sample) != labels[row] {
                    errors += 1;
                }
            }
        }
    }
    Ok(percent_error(errors, labels.len()))
}
