//! Kernel functions for SVM

pub mod linear;
pub mod polynomial;
pub mod rbf;
pub mod sigmoid;
pub mod traits;

pub use self::linear::*;
pub use self::polynomial::*;
pub use self::rbf::*;
pub use self::sigmoid::*;
pub use self::traits::*;

use crate::core::{DiagnosisError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Kernel family, without parameters
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum KernelType {
    Linear,
    Poly,
    Rbf,
    Sigmoid,
}

impl KernelType {
    /// Every kernel family, in the order experiments report them
    pub const ALL: [KernelType; 4] = [
        KernelType::Linear,
        KernelType::Poly,
        KernelType::Rbf,
        KernelType::Sigmoid,
    ];
}

impl fmt::Display for KernelType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            KernelType::Linear => "linear",
            KernelType::Poly => "poly",
            KernelType::Rbf => "rbf",
            KernelType::Sigmoid => "sigmoid",
        };
        f.write_str(name)
    }
}

/// Fully parameterised kernel, stored alongside a trained model
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum KernelKind {
    Linear,
    Rbf { gamma: f64 },
    Poly { degree: u32, gamma: f64, coef0: f64 },
    Sigmoid { gamma: f64, coef0: f64 },
}

impl KernelKind {
    /// Default parameters for a kernel family over `n_features` inputs
    pub fn auto(kernel_type: KernelType, n_features: usize) -> Self {
        let gamma = 1.0 / n_features.max(1) as f64;
        match kernel_type {
            KernelType::Linear => KernelKind::Linear,
            KernelType::Rbf => KernelKind::Rbf { gamma },
            KernelType::Poly => KernelKind::Poly {
                degree: 3,
                gamma,
                coef0: 0.0,
            },
            KernelType::Sigmoid => KernelKind::Sigmoid { gamma, coef0: 0.0 },
        }
    }

    /// Reject parameters the concrete kernels would panic on
    pub fn validate(&self) -> Result<()> {
        let (degree, gamma) = match *self {
            KernelKind::Linear => return Ok(()),
            KernelKind::Rbf { gamma } | KernelKind::Sigmoid { gamma, .. } => (1, gamma),
            KernelKind::Poly { degree, gamma, .. } => (degree, gamma),
        };
        if degree == 0 || !(gamma > 0.0) {
            return Err(DiagnosisError::InvalidParameter(format!(
                "invalid kernel parameters: {self:?}"
            )));
        }
        Ok(())
    }

    pub fn kernel_type(&self) -> KernelType {
        match self {
            KernelKind::Linear => KernelType::Linear,
            KernelKind::Rbf { .. } => KernelType::Rbf,
            KernelKind::Poly { .. } => KernelType::Poly,
            KernelKind::Sigmoid { .. } => KernelType::Sigmoid,
        }
    }
}

impl Default for KernelKind {
    fn default() -> Self {
        KernelKind::Linear
    }
}

impl Kernel for KernelKind {
    fn compute(&self, x: &[f64], y: &[f64]) -> f64 {
        match *self {
            KernelKind::Linear => LinearKernel.compute(x, y),
            KernelKind::Rbf { gamma } => RBFKernel::new(gamma).compute(x, y),
            KernelKind::Poly {
                degree,
                gamma,
                coef0,
            } => PolynomialKernel::new(degree, gamma, coef0).compute(x, y),
            KernelKind::Sigmoid { gamma, coef0 } => SigmoidKernel::new(gamma, coef0).compute(x, y),
        }
    }
}
