//! Sequential Minimal Optimization (SMO) solver
//!
//! Solves the C-SVM dual by repeatedly optimizing pairs of Lagrange
//! multipliers. Errors E_i = f(x_i) - y_i include the running bias, so the
//! KKT check and the termination test see the true decision function.

use crate::cache::KernelCache;
use crate::core::{DiagnosisError, OptimizationResult, OptimizerConfig, Result, Sample};
use crate::kernel::Kernel;
use log::{debug, warn};
use std::sync::Arc;

/// Multipliers below this are treated as exactly zero
const ALPHA_ZERO: f64 = 1e-12;

/// SMO solver for the binary C-SVM dual problem
pub struct SMOSolver<K: Kernel> {
    kernel: Arc<K>,
    config: OptimizerConfig,
}

/// Mutable optimization state for one `solve` call
struct SolverState {
    alpha: Vec<f64>,
    errors: Vec<f64>,
    bias: f64,
    cache: KernelCache,
}

impl<K: Kernel> SMOSolver<K> {
    /// Create a new SMO solver with the given kernel and configuration
    pub fn new(kernel: Arc<K>, config: OptimizerConfig) -> Self {
        Self { kernel, config }
    }

    pub fn config(&self) -> &OptimizerConfig {
        &self.config
    }

    /// Solve the SVM optimization problem
    ///
    /// Samples must carry labels of +1 or -1, share one dimensionality and
    /// contain both classes. The result is deterministic for a given input
    /// order.
    pub fn solve(&self, samples: &[Sample]) -> Result<OptimizationResult> {
        self.validate(samples)?;

        let n = samples.len();
        let mut state = SolverState {
            alpha: vec![0.0; n],
            // f(x) = 0 while every alpha is zero, so E_i = -y_i
            errors: samples.iter().map(|s| -s.label).collect(),
            bias: 0.0,
            cache: KernelCache::with_memory_limit(self.config.cache_size, n),
        };

        let mut iterations = 0;
        let mut num_changed = 0;
        let mut examine_all = true;

        while (num_changed > 0 || examine_all) && iterations < self.config.max_iterations {
            num_changed = 0;

            for i in 0..n {
                if !examine_all && !self.is_free(state.alpha[i]) {
                    continue;
                }
                if self.examine_example(i, samples, &mut state) {
                    num_changed += 1;
                }
            }

            if examine_all {
                examine_all = false;
            } else if num_changed == 0 {
                examine_all = true;
            }

            iterations += 1;
        }

        if iterations >= self.config.max_iterations && (num_changed > 0 || examine_all) {
            warn!(
                "SMO stopped after {} passes without meeting tolerance {}",
                iterations, self.config.epsilon
            );
        }

        let bias = self.calculate_bias(&state);

        let support_vectors: Vec<usize> = state
            .alpha
            .iter()
            .enumerate()
            .filter(|(_, &a)| a > ALPHA_ZERO)
            .map(|(i, _)| i)
            .collect();

        let objective_value = self.calculate_objective(&support_vectors, samples, &mut state);

        let stats = state.cache.stats();
        debug!(
            "SMO finished: {} passes, {} support vectors, objective {:.6}, cache hit rate {:.2}",
            iterations,
            support_vectors.len(),
            objective_value,
            state.cache.hit_rate()
        );
        debug!("Kernel cache: {} of {} rows", stats.size, stats.capacity);

        Ok(OptimizationResult {
            alpha: state.alpha,
            b: bias,
            support_vectors,
            iterations,
            objective_value,
        })
    }

    fn validate(&self, samples: &[Sample]) -> Result<()> {
        if samples.is_empty() {
            return Err(DiagnosisError::EmptyDataset);
        }
        if !(self.config.c > 0.0) {
            return Err(DiagnosisError::InvalidParameter(format!(
                "C must be positive, got: {}",
                self.config.c
            )));
        }

        let dim = samples[0].features.len();
        let mut positives = 0;
        for sample in samples {
            if sample.label != 1.0 && sample.label != -1.0 {
                return Err(DiagnosisError::InvalidLabel(sample.label));
            }
            if sample.features.len() != dim {
                return Err(DiagnosisError::DimensionMismatch {
                    expected: dim,
                    actual: sample.features.len(),
                });
            }
            if sample.label > 0.0 {
                positives += 1;
            }
        }

        if positives == 0 || positives == samples.len() {
            return Err(DiagnosisError::InvalidDataset(
                "training data must contain both classes".to_string(),
            ));
        }
        Ok(())
    }

    fn is_free(&self, alpha: f64) -> bool {
        alpha > ALPHA_ZERO && alpha < self.config.c - ALPHA_ZERO
    }

    /// Kernel row K(i, ·) over all training samples
    fn kernel_row(&self, cache: &mut KernelCache, samples: &[Sample], i: usize) -> Arc<[f64]> {
        cache.row_or_insert_with(i, || {
            samples
                .iter()
                .map(|s| self.kernel.compute(&samples[i].features, &s.features))
                .collect()
        })
    }

    /// Try to make progress on multiplier `i`
    fn examine_example(&self, i: usize, samples: &[Sample], state: &mut SolverState) -> bool {
        let r_i = state.errors[i] * samples[i].label;
        let alpha_i = state.alpha[i];
        let tol = self.config.epsilon;

        let violates_kkt =
            (r_i < -tol && alpha_i < self.config.c) || (r_i > tol && alpha_i > 0.0);
        if !violates_kkt {
            return false;
        }

        let n = samples.len();

        // Second choice heuristic: maximize |E_i - E_j|
        if let Some(j) = self.select_second_variable(i, state) {
            if self.take_step(i, j, samples, state) {
                return true;
            }
        }

        // Fall back to every free multiplier, then to all of them
        for offset in 1..n {
            let j = (i + offset) % n;
            if self.is_free(state.alpha[j]) && self.take_step(i, j, samples, state) {
                return true;
            }
        }
        for offset in 1..n {
            let j = (i + offset) % n;
            if self.take_step(i, j, samples, state) {
                return true;
            }
        }

        false
    }

    /// Pick the partner with the largest error gap, preferring free multipliers
    fn select_second_variable(&self, i: usize, state: &SolverState) -> Option<usize> {
        let e_i = state.errors[i];
        let pick = |free_only: bool| {
            let mut best_j = None;
            let mut max_diff = 0.0;
            for (j, &e_j) in state.errors.iter().enumerate() {
                if j == i || (free_only && !self.is_free(state.alpha[j])) {
                    continue;
                }
                let diff = (e_i - e_j).abs();
                if diff > max_diff {
                    max_diff = diff;
                    best_j = Some(j);
                }
            }
            best_j
        };

        pick(true).or_else(|| pick(false))
    }

    /// Jointly optimize multipliers `i` and `j`
    fn take_step(&self, i: usize, j: usize, samples: &[Sample], state: &mut SolverState) -> bool {
        if i == j {
            return false;
        }

        let c = self.config.c;
        let y_i = samples[i].label;
        let y_j = samples[j].label;
        let alpha_i_old = state.alpha[i];
        let alpha_j_old = state.alpha[j];
        let e_i = state.errors[i];
        let e_j = state.errors[j];
        let s = y_i * y_j;

        let (low, high) = if y_i != y_j {
            let diff = alpha_j_old - alpha_i_old;
            (diff.max(0.0), c.min(c + diff))
        } else {
            let sum = alpha_i_old + alpha_j_old;
            ((sum - c).max(0.0), c.min(sum))
        };

        if low >= high {
            return false;
        }

        let row_i = self.kernel_row(&mut state.cache, samples, i);
        let row_j = self.kernel_row(&mut state.cache, samples, j);
        let k_ii = row_i[i];
        let k_ij = row_i[j];
        let k_jj = row_j[j];

        let eta = k_ii + k_jj - 2.0 * k_ij;
        if eta <= 0.0 {
            // Non positive curvature along the constraint line
            return false;
        }

        let alpha_j_new = (alpha_j_old + y_j * (e_i - e_j) / eta).clamp(low, high);

        let eps = self.config.epsilon;
        if (alpha_j_new - alpha_j_old).abs() < eps * (alpha_j_new + alpha_j_old + eps) {
            return false;
        }

        let alpha_i_new = (alpha_i_old + s * (alpha_j_old - alpha_j_new)).clamp(0.0, c);

        let delta_i = alpha_i_new - alpha_i_old;
        let delta_j = alpha_j_new - alpha_j_old;

        let b1 = state.bias - e_i - y_i * delta_i * k_ii - y_j * delta_j * k_ij;
        let b2 = state.bias - e_j - y_i * delta_i * k_ij - y_j * delta_j * k_jj;
        let bias_new = if self.is_free(alpha_i_new) {
            b1
        } else if self.is_free(alpha_j_new) {
            b2
        } else {
            (b1 + b2) / 2.0
        };
        let delta_b = bias_new - state.bias;

        state.alpha[i] = alpha_i_new;
        state.alpha[j] = alpha_j_new;
        state.bias = bias_new;

        for (k, error) in state.errors.iter_mut().enumerate() {
            *error += y_i * delta_i * row_i[k] + y_j * delta_j * row_j[k] + delta_b;
        }

        true
    }

    /// Average the bias implied by every free support vector
    fn calculate_bias(&self, state: &SolverState) -> f64 {
        let mut sum = 0.0;
        let mut count = 0;

        for (i, &alpha) in state.alpha.iter().enumerate() {
            if self.is_free(alpha) {
                // y_i - Σ α_j y_j K(j, i) = b - E_i on the margin
                sum += state.bias - state.errors[i];
                count += 1;
            }
        }

        if count > 0 {
            sum / count as f64
        } else {
            state.bias
        }
    }

    /// Dual objective: Σ α_i - ½ Σ_i Σ_j α_i α_j y_i y_j K(x_i, x_j)
    fn calculate_objective(
        &self,
        support_vectors: &[usize],
        samples: &[Sample],
        state: &mut SolverState,
    ) -> f64 {
        let mut obj: f64 = support_vectors.iter().map(|&i| state.alpha[i]).sum();

        for &i in support_vectors {
            let row = self.kernel_row(&mut state.cache, samples, i);
            for &j in support_vectors {
                obj -= 0.5
                    * state.alpha[i]
                    * state.alpha[j]
                    * samples[i].label
                    * samples[j].label
                    * row[j];
            }
        }

        obj
    }
}
