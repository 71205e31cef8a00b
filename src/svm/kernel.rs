use serde::{Deserialize, Serialize};

use super::{KernelType, SvmParams};
use crate::error::{DigitError, Result};

/// Kernel function with validated parameters.
///
/// Built from [`SvmParams`] when training starts and stored with the trained
/// model, so later changes to the parameters do not affect predictions.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Kernel {
    Linear,
    Poly { gamma: f64, degree: u32, coef0: f64 },
    Rbf { gamma: f64 },
    Sigmoid { gamma: f64, coef0: f64 },
}

impl Kernel {
    pub fn from_params(params: &SvmParams) -> Result<Self> {
        let gamma = || {
            if params.gamma > 0.0 && params.gamma.is_finite() {
                Ok(params.gamma)
            } else {
                Err(DigitError::ConfigurationInvalid(format!(
                    "{:?} kernel needs gamma > 0, got {}",
                    params.kernel, params.gamma
                )))
            }
        };

        match params.kernel {
            KernelType::Linear => Ok(Kernel::Linear),
            KernelType::Poly => {
                let degree = params.degree;
                if !(degree >= 1.0 && degree.fract() == 0.0 && degree <= i32::MAX as f64) {
                    return Err(DigitError::ConfigurationInvalid(format!(
                        "polynomial kernel needs a positive integer degree, got {}",
                        degree
                    )));
                }
                Ok(Kernel::Poly {
                    gamma: gamma()?,
                    degree: degree as u32,
                    coef0: params.coef0,
                })
            }
            KernelType::Rbf => Ok(Kernel::Rbf { gamma: gamma()? }),
            KernelType::Sigmoid => Ok(Kernel::Sigmoid {
                gamma: gamma()?,
                coef0: params.coef0,
            }),
        }
    }

    pub fn eval(&self, a: &[f32], b: &[f32]) -> f64 {
        match *self {
            Kernel::Linear => dot(a, b),
            Kernel::Poly { gamma, degree, coef0 } => {
                (gamma * dot(a, b) + coef0).powi(i32::try_from(degree).unwrap_or(i32::MAX))
            }
            Kernel::Rbf { gamma } => (-gamma * squared_distance(a, b)).exp(),
            Kernel::Sigmoid { gamma, coef0 } => (gamma * dot(a, b) + coef0).tanh(),
        }
    }
}

fn dot(a: &[f32], b: &[f32]) -> f64 {
    a.iter().zip(b).map(|(&x, &y)| x as f64 * y as f64).sum()
}

fn squared_distance(a: &[f32], b: &[f32]) -> f64 {
    a.iter()
        .zip(b)
        .map(|(&x, &y)| {
            let d = x as f64 - y as f64;
            d * d
        })
        .sum()
}
