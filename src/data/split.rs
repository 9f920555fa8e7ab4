//! Seeded, stratified train/test split

use crate::core::{DiagnosisError, Result};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;

/// Row indices assigned to each side of a split, in ascending order
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SplitPlan {
    pub train: Vec<usize>,
    pub test: Vec<usize>,
}

/// Split row indices so each class keeps its proportion in both halves
///
/// Classes are shuffled independently with one `StdRng` seeded from `seed`.
/// A class with at least two rows always contributes one row to each side.
pub fn stratified_split(labels: &[u8], test_ratio: f64, seed: u64) -> Result<SplitPlan> {
    if labels.is_empty() {
        return Err(DiagnosisError::EmptyDataset);
    }
    if !(test_ratio > 0.0 && test_ratio < 1.0) {
        return Err(DiagnosisError::InvalidParameter(format!(
            "test ratio must be between 0 and 1, got {test_ratio}"
        )));
    }

    let mut rng = StdRng::seed_from_u64(seed);
    let mut train = Vec::with_capacity(labels.len());
    let mut test = Vec::new();

    for class in [0u8, 1u8] {
        let mut members: Vec<usize> = labels
            .iter()
            .enumerate()
            .filter(|&(_, &l)| l == class)
            .map(|(i, _)| i)
            .collect();
        if members.is_empty() {
            continue;
        }
        members.shuffle(&mut rng);

        let n = members.len();
        let mut n_test = (n as f64 * test_ratio).round() as usize;
        if n >= 2 {
            n_test = n_test.clamp(1, n - 1);
        } else {
            n_test = 0;
        }

        test.extend_from_slice(&members[..n_test]);
        train.extend_from_slice(&members[n_test..]);
    }

    train.sort_unstable();
    test.sort_unstable();
    Ok(SplitPlan { train, test })
}
