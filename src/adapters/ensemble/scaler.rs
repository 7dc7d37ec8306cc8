//! Per-column standardization (zero mean, unit variance).

use serde::{Deserialize, Serialize};

use crate::domain::EncodingError;

/// Column means and scales learned from the training split.
///
/// Uses the population standard deviation. Constant columns get a scale of
/// one so they pass through centered instead of dividing by zero.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StandardScaler {
    mean: Vec<f64>,
    scale: Vec<f64>,
}

impl StandardScaler {
    /// Learn column statistics from `rows`.
    #[must_use]
    pub fn fit(rows: &[Vec<f64>]) -> Self {
        let n_features = rows.first().map_or(0, Vec::len);
        if rows.is_empty() {
            return Self {
                mean: Vec::new(),
                scale: Vec::new(),
            };
        }
        let n = rows.len() as f64;

        let mean: Vec<f64> = (0..n_features)
            .map(|j| rows.iter().map(|r| r[j]).sum::<f64>() / n)
            .collect();

        let scale = (0..n_features)
            .map(|j| {
                let var = rows.iter().map(|r| (r[j] - mean[j]).powi(2)).sum::<f64>() / n;
                let std = var.sqrt();
                if std > f64::EPSILON {
                    std
                } else {
                    1.0
                }
            })
            .collect();

        Self { mean, scale }
    }

    #[must_use]
    pub fn n_features(&self) -> usize {
        self.mean.len()
    }

    /// Standardize one row.
    ///
    /// # Errors
    /// Returns `LengthMismatch` when the row width differs from the fitted
    /// width.
    pub fn transform(&self, row: &[f64]) -> Result<Vec<f64>, EncodingError> {
        if row.len() != self.mean.len() {
            return Err(EncodingError::LengthMismatch {
                expected: self.mean.len(),
                actual: row.len(),
            });
        }
        Ok(row
            .iter()
            .zip(self.mean.iter().zip(&self.scale))
            .map(|(v, (m, s))| (v - m) / s)
            .collect())
    }

    /// Standardize many rows.
    ///
    /// # Errors
    /// See [`StandardScaler::transform`].
    pub fn transform_all(&self, rows: &[Vec<f64>]) -> Result<Vec<Vec<f64>>, EncodingError> {
        rows.iter().map(|r| self.transform(r)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn test_standardizes_columns() {
        let rows = vec![vec![1.0, 5.0], vec![3.0, 5.0]];
        let scaler = StandardScaler::fit(&rows);

        let a = scaler.transform(&rows[0]).expect("Should transform");
        let b = scaler.transform(&rows[1]).expect("Should transform");
        assert_abs_diff_eq!(a[0], -1.0);
        assert_abs_diff_eq!(b[0], 1.0);
        // Constant column: centered, scale one
        assert_abs_diff_eq!(a[1], 0.0);
        assert_abs_diff_eq!(b[1], 0.0);
    }

    #[test]
    fn test_rejects_wrong_width() {
        let scaler = StandardScaler::fit(&[vec![1.0, 2.0, 3.0]]);
        let err = scaler.transform(&[1.0]).expect_err("Must fail");
        assert_eq!(
            err,
            EncodingError::LengthMismatch {
                expected: 3,
                actual: 1
            }
        );
    }
}
