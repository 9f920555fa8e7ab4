//! Per-feature standardization: (x - mean) / std

use crate::core::{DiagnosisError, Result};
use serde::{Deserialize, Serialize};

/// Below this a feature is treated as constant
const MIN_STD: f64 = 1e-12;

/// Fitted mean and standard deviation for every feature column
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScalerParams {
    pub means: Vec<f64>,
    pub stds: Vec<f64>,
}

impl ScalerParams {
    /// Compute per-column statistics from dense rows
    ///
    /// Uses the population standard deviation. A constant column gets a
    /// std of 1.0, so it is only centred. Non-finite input is rejected.
    pub fn fit(rows: &[Vec<f64>]) -> Result<Self> {
        let first = rows.first().ok_or(DiagnosisError::EmptyDataset)?;
        let dim = first.len();
        if let Some(row) = rows.iter().find(|r| r.len() != dim) {
            return Err(DiagnosisError::DimensionMismatch {
                expected: dim,
                actual: row.len(),
            });
        }

        let n = rows.len() as f64;
        let mut means = vec![0.0; dim];
        for row in rows {
            for (m, &x) in means.iter_mut().zip(row) {
                *m += x;
            }
        }
        for m in &mut means {
            *m /= n;
        }

        let mut stds = vec![0.0; dim];
        for row in rows {
            for ((s, &x), &m) in stds.iter_mut().zip(row).zip(&means) {
                *s += (x - m).powi(2);
            }
        }
        for s in &mut stds {
            *s = (*s / n).sqrt();
            if *s < MIN_STD {
                *s = 1.0;
            }
        }

        let params = Self { means, stds };
        params.validate()?;
        Ok(params)
    }

    pub fn n_features(&self) -> usize {
        self.means.len()
    }

    /// Scale one feature vector
    pub fn transform(&self, features: &[f64]) -> Result<Vec<f64>> {
        if features.len() != self.means.len() {
            return Err(DiagnosisError::DimensionMismatch {
                expected: self.means.len(),
                actual: features.len(),
            });
        }
        Ok(features
            .iter()
            .zip(self.means.iter().zip(&self.stds))
            .map(|(&x, (&mean, &std))| (x - mean) / std)
            .collect())
    }

    /// Scale many feature vectors, identically to calling `transform` on each
    pub fn transform_batch(&self, rows: &[Vec<f64>]) -> Result<Vec<Vec<f64>>> {
        rows.iter().map(|r| self.transform(r)).collect()
    }

    /// Check a deserialized scaler for internal consistency
    pub fn validate(&self) -> Result<()> {
        if self.means.len() != self.stds.len() {
            return Err(DiagnosisError::DimensionMismatch {
                expected: self.means.len(),
                actual: self.stds.len(),
            });
        }
        if self.means.iter().any(|m| !m.is_finite())
            || self.stds.iter().any(|s| !s.is_finite() || *s <= 0.0)
        {
            return Err(DiagnosisError::InvalidParameter(
                "scaler statistics must be finite with positive deviations".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_fit_population_std() {
        let rows = vec![vec![1.0, 10.0], vec![3.0, 10.0]];
        let params = ScalerParams::fit(&rows).unwrap();

        assert_eq!(params.means, vec![2.0, 10.0]);
        // population std of [1, 3] is 1; constant column falls back to 1
        assert_eq!(params.stds, vec![1.0, 1.0]);
    }

    #[test]
    fn test_transform_standardizes_columns() {
        let rows = vec![
            vec![2.0, -1.0, 100.0],
            vec![4.0, 0.0, 300.0],
            vec![6.0, 1.0, 200.0],
            vec![8.0, 4.0, 400.0],
        ];
        let params = ScalerParams::fit(&rows).unwrap();
        let scaled = params.transform_batch(&rows).unwrap();

        for col in 0..3 {
            let values: Vec<f64> = scaled.iter().map(|r| r[col]).collect();
            let mean = values.iter().sum::<f64>() / values.len() as f64;
            let var = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / values.len() as f64;
            assert_relative_eq!(mean, 0.0, epsilon = 1e-12);
            assert_relative_eq!(var, 1.0, epsilon = 1e-12);
        }
    }

    #[test]
    fn test_zero_variance_feature_is_centred() {
        let rows = vec![vec![5.0, 1.0], vec![5.0, 2.0]];
        let params = ScalerParams::fit(&rows).unwrap();
        assert_eq!(params.transform(&[7.0, 1.5]).unwrap(), vec![2.0, 0.0]);
    }

    #[test]
    fn test_transform_is_pure() {
        let params = ScalerParams {
            means: vec![1.0, 2.0],
            stds: vec![0.5, 4.0],
        };
        let x = [3.0, -2.0];
        let first = params.transform(&x).unwrap();
        let second = params.transform(&x).unwrap();
        assert_eq!(first, second);
        assert_eq!(first, vec![4.0, -1.0]);
        assert_eq!(params.transform_batch(&[x.to_vec()]).unwrap()[0], first);
    }

    #[test]
    fn test_dimension_checks() {
        assert!(matches!(
            ScalerParams::fit(&[]),
            Err(DiagnosisError::EmptyDataset)
        ));
        assert!(ScalerParams::fit(&[vec![1.0], vec![1.0, 2.0]]).is_err());

        let params = ScalerParams::fit(&[vec![1.0, 2.0]]).unwrap();
        assert!(matches!(
            params.transform(&[1.0]),
            Err(DiagnosisError::DimensionMismatch {
                expected: 2,
                actual: 1
            })
        ));
    }

    #[test]
    fn test_fit_rejects_non_finite_rows() {
        let rows = vec![vec![1.0, 2.0], vec![f64::NAN, 3.0], vec![2.0, 4.0]];
        assert!(matches!(
            ScalerParams::fit(&rows),
            Err(DiagnosisError::InvalidParameter(_))
        ));

        let rows = vec![vec![1.0], vec![f64::INFINITY]];
        assert!(ScalerParams::fit(&rows).is_err());
    }

    #[test]
    fn test_validate() {
        let mut params = ScalerParams::fit(&[vec![1.0], vec![2.0]]).unwrap();
        assert!(params.validate().is_ok());
        params.stds[0] = 0.0;
        assert!(params.validate().is_err());
    }
}
