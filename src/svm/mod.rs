//! Kernel support vector machine
//!
//! The numerics behind [`Classifier`]: C-SVC trained with SMO, multi-class
//! by one-vs-one voting, persisted as a compressed model artifact.
//!
//! Hyperparameter setters never fail. Contradictory or unsupported settings
//! are reported by [`Svm::train`] as [`DigitError::ConfigurationInvalid`].

mod grid;
mod kernel;
mod persist;
mod solver;

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::classifier::Classifier;
use crate::error::{DigitError, Result};
use crate::features::FeatureMatrix;
use crate::models::Label;

pub use grid::{AutoTrainReport, ParamGrid};
pub use kernel::Kernel;

/// SVM formulation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SvmType {
    /// C-support vector classification (binary or one-vs-one multi-class)
    CSvc,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum KernelType {
    Linear,
    Poly,
    Rbf,
    Sigmoid,
}

/// When the solver stops: KKT gap below `epsilon`. Reaching `max_iter`
/// first is a convergence failure.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TermCriteria {
    pub max_iter: usize,
    pub epsilon: f64,
}

impl Default for TermCriteria {
    fn default() -> Self {
        Self {
            max_iter: 10_000_000,
            epsilon: 1e-3,
        }
    }
}

/// Hyperparameters; `gamma`, `degree` and `coef0` only matter for the
/// kernels that use them.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SvmParams {
    pub svm_type: SvmType,
    pub kernel: KernelType,
    pub gamma: f64,
    pub degree: f64,
    pub coef0: f64,
    pub c: f64,
    pub term_criteria: TermCriteria,
}

impl Default for SvmParams {
    fn default() -> Self {
        Self {
            svm_type: SvmType::CSvc,
            kernel: KernelType::Rbf,
            gamma: 1.0,
            degree: 0.0,
            coef0: 0.0,
            c: 1.0,
            term_criteria: TermCriteria::default(),
        }
    }
}

impl SvmParams {
    /// Multi-class digit value model: polynomial kernel, gamma 0.1, degree 2, C 0.1
    pub fn digit_classifier() -> Self {
        Self {
            kernel: KernelType::Poly,
            gamma: 0.1,
            degree: 2.0,
            c: 0.1,
            ..Self::default()
        }
    }

    /// Binary digit/not-digit model: linear kernel, C 0.1
    pub fn digit_detector() -> Self {
        Self {
            kernel: KernelType::Linear,
            c: 0.1,
            ..Self::default()
        }
    }

    pub fn with_kernel(mut self, kernel: KernelType) -> Self {
        self.kernel = kernel;
        self
    }

    pub fn with_c(mut self, c: f64) -> Self {
        self.c = c;
        self
    }

    pub fn with_gamma(mut self, gamma: f64) -> Self {
        self.gamma = gamma;
        self
    }

    pub fn with_degree(mut self, degree: f64) -> Self {
        self.degree = degree;
        self
    }

    pub fn with_term_criteria(mut self, term_criteria: TermCriteria) -> Self {
        self.term_criteria = term_criteria;
        self
    }

    fn validate_solver(&self) -> Result<()> {
        match self.svm_type {
            SvmType::CSvc => {}
        }
        if !(self.c > 0.0 && self.c.is_finite()) {
            return Err(DigitError::ConfigurationInvalid(format!(
                "C must be positive, got {}",
                self.c
            )));
        }
        let criteria = &self.term_criteria;
        if criteria.max_iter == 0 || !(criteria.epsilon > 0.0) {
            return Err(DigitError::ConfigurationInvalid(format!(
                "invalid termination criteria {:?}",
                criteria
            )));
        }
        Ok(())
    }
}

/// One pairwise decision function: positive value votes for `positive`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub(crate) struct DecisionFunction {
    pub positive: usize,
    pub negative: usize,
    /// Indices into the model's support vector pool
    pub support: Vec<usize>,
    /// alpha * y for each support vector
    pub coefficients: Vec<f64>,
    pub rho: f64,
}

impl DecisionFunction {
    fn value(&self, kernel_values: &[f64]) -> f64 {
        self.support
            .iter()
            .zip(&self.coefficients)
            .map(|(&sv, coef)| coef * kernel_values[sv])
            .sum::<f64>()
            - self.rho
    }
}

/// Trained parameter state
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainedModel {
    pub(crate) kernel: Kernel,
    /// Sorted, distinct training labels
    pub(crate) classes: Vec<Label>,
    pub(crate) descriptor_len: usize,
    pub(crate) support_vectors: Vec<Vec<f32>>,
    /// One per class pair (a, b), a < b, in row-major order
    pub(crate) decision_functions: Vec<DecisionFunction>,
}

impl TrainedModel {
    pub fn kernel(&self) -> &Kernel {
        &self.kernel
    }

    pub fn classes(&self) -> &[Label] {
        &self.classes
    }

    pub fn descriptor_len(&self) -> usize {
        self.descriptor_len
    }

    pub fn support_vector_count(&self) -> usize {
        self.support_vectors.len()
    }

    /// Structural consistency check for deserialized models
    pub(crate) fn validate(&self) -> std::result::Result<(), String> {
        let k = self.classes.len();
        if k < 2 {
            return Err(format!("{} classes, need at least 2", k));
        }
        if self.classes.windows(2).any(|w| w[0] >= w[1]) {
            return Err("class list is not sorted and distinct".to_string());
        }
        if self.decision_functions.len() != k * (k - 1) / 2 {
            return Err(format!(
                "{} decision functions for {} classes",
                self.decision_functions.len(),
                k
            ));
        }
        if let Some(sv) = self.support_vectors.iter().find(|sv| sv.len() != self.descriptor_len) {
            return Err(format!(
                "support vector of length {} in a {}-dimensional model",
                sv.len(),
                self.descriptor_len
            ));
        }
        for df in &self.decision_functions {
            if df.positive >= k || df.negative >= k || df.positive == df.negative {
                return Err(format!("bad class pair ({}, {})", df.positive, df.negative));
            }
            if df.support.len() != df.coefficients.len() {
                return Err("support/coefficient length mismatch".to_string());
            }
            if df.support.iter().any(|&sv| sv >= self.support_vectors.len()) {
                return Err("support vector index out of range".to_string());
            }
        }
        Ok(())
    }

    fn decision_values(&self, features: &[f32]) -> Vec<f64> {
        let kernel_values: Vec<f64> = self
            .support_vectors
            .iter()
            .map(|sv| self.kernel.eval(sv, features))
            .collect();
        self.decision_functions
            .iter()
            .map(|df| df.value(&kernel_values))
            .collect()
    }

    fn predict(&self, features: &[f32]) -> Label {
        let mut votes = vec![0usize; self.classes.len()];
        for (df, value) in self.decision_functions.iter().zip(self.decision_values(features)) {
            if value > 0.0 {
                votes[df.positive] += 1;
            } else {
                votes[df.negative] += 1;
            }
        }

        // Ties go to the smaller label
        let mut best = 0;
        for (class, &count) in votes.iter().enumerate() {
            if count > votes[best] {
                best = class;
            }
        }
        self.classes[best]
    }
}

/// C-SVC model with its configuration
#[derive(Debug, Clone, Default)]
pub struct Svm {
    params: SvmParams,
    model: Option<TrainedModel>,
}

impl Svm {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_params(params: SvmParams) -> Self {
        Self { params, model: None }
    }

    pub fn params(&self) -> &SvmParams {
        &self.params
    }

    pub fn set_params(&mut self, params: SvmParams) {
        self.params = params;
    }

    pub fn set_type(&mut self, svm_type: SvmType) {
        self.params.svm_type = svm_type;
    }

    pub fn set_kernel(&mut self, kernel: KernelType) {
        self.params.kernel = kernel;
    }

    pub fn set_gamma(&mut self, gamma: f64) {
        self.params.gamma = gamma;
    }

    pub fn set_degree(&mut self, degree: f64) {
        self.params.degree = degree;
    }

    pub fn set_coef0(&mut self, coef0: f64) {
        self.params.coef0 = coef0;
    }

    pub fn set_c(&mut self, c: f64) {
        self.params.c = c;
    }

    pub fn set_term_criteria(&mut self, term_criteria: TermCriteria) {
        self.params.term_criteria = term_criteria;
    }

    pub fn model(&self) -> Option<&TrainedModel> {
        self.model.as_ref()
    }

    /// Raw pairwise decision values, one per class pair
    pub fn decision_values(&self, features: &[f32]) -> Result<Vec<f64>> {
        let model = self.checked_model(features)?;
        Ok(model.decision_values(features))
    }

    fn checked_model(&self, features: &[f32]) -> Result<&TrainedModel> {
        let model = self.model.as_ref().ok_or(DigitError::Untrained)?;
        if features.len() != model.descriptor_len {
            return Err(DigitError::DescriptorLength {
                expected: model.descriptor_len,
                actual: features.len(),
            });
        }
        Ok(model)
    }
}

impl Classifier for Svm {
    fn train(&mut self, features: &FeatureMatrix, labels: &[Label]) -> Result<()> {
        let model = fit(&self.params, features, labels)?;
        debug!(
            "SVM trained: {} classes, {} support vectors",
            model.classes.len(),
            model.support_vectors.len()
        );
        self.model = Some(model);
        Ok(())
    }

    fn predict(&self, features: &[f32]) -> Result<Label> {
        let model = self.checked_model(features)?;
        Ok(model.predict(features))
    }

    fn is_trained(&self) -> bool {
        self.model.is_some()
    }
}

/// Train one-vs-one C-SVC decision functions for every class pair
pub(crate) fn fit(params: &SvmParams, features: &FeatureMatrix, labels: &[Label]) -> Result<TrainedModel> {
    if features.rows() != labels.len() {
        return Err(DigitError::LabelMismatch {
            rows: features.rows(),
            labels: labels.len(),
        });
    }
    if features.is_empty() {
        return Err(DigitError::ConfigurationInvalid(
            "no training samples".to_string(),
        ));
    }
    if features.iter_rows().flatten().any(|v| !v.is_finite()) {
        return Err(DigitError::ConfigurationInvalid(
            "training features contain non-finite values".to_string(),
        ));
    }
    let kernel = Kernel::from_params(params)?;
    params.validate_solver()?;

    let mut classes = labels.to_vec();
    classes.sort_unstable();
    classes.dedup();
    if classes.len() < 2 {
        return Err(DigitError::ConfigurationInvalid(format!(
            "C-SVC needs at least two classes, got {:?}",
            classes
        )));
    }

    let members: Vec<Vec<usize>> = classes
        .iter()
        .map(|&class| {
            labels
                .iter()
                .enumerate()
                .filter(|&(_, &label)| label == class)
                .map(|(index, _)| index)
                .collect()
        })
        .collect();

    let mut pool_slots: HashMap<usize, usize> = HashMap::new();
    let mut pool_rows: Vec<usize> = Vec::new();
    let mut decision_functions = Vec::new();

    for a in 0..classes.len() {
        for b in a + 1..classes.len() {
            let indices: Vec<usize> = members[a].iter().chain(&members[b]).copied().collect();
            let samples: Vec<&[f32]> = indices.iter().filter_map(|&i| features.row(i)).collect();
            let y: Vec<f64> = indices
                .iter()
                .map(|&i| if labels[i] == classes[a] { 1.0 } else { -1.0 })
                .collect();

            let solution = solver::solve(&samples, &y, &kernel, params.c, &params.term_criteria)?;

            let mut support = Vec::new();
            let mut coefficients = Vec::new();
            for (position, &alpha) in solution.alpha.iter().enumerate() {
                if alpha <= 0.0 {
                    continue;
                }
                let row = indices[position];
                let slot = *pool_slots.entry(row).or_insert_with(|| {
                    pool_rows.push(row);
                    pool_rows.len() - 1
                });
                support.push(slot);
                coefficients.push(alpha * y[position]);
            }

            debug!(
                "pair {} vs {}: {} samples, {} support vectors, {} iterations",
                classes[a],
                classes[b],
                samples.len(),
                support.len(),
                solution.iterations
            );

            decision_functions.push(DecisionFunction {
                positive: a,
                negative: b,
                support,
                coefficients,
                rho: solution.rho,
            });
        }
    }

    let support_vectors = pool_rows
        .iter()
        .filter_map(|&row| features.row(row).map(<[f32]>::to_vec))
        .collect();

    Ok(TrainedModel {
        kernel,
        classes,
        descriptor_len: features.cols(),
        support_vectors,
        decision_functions,
    })
}
