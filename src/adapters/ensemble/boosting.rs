//! Gradient boosting for squared error.
//!
//! Starts from the target mean and fits each stage to the current
//! residuals on a row subsample drawn without replacement.

use rand::seq::index;
use rand::SeedableRng;
use rand_chacha::ChaCha20Rng;
use serde::{Deserialize, Serialize};

use super::tree::{RegressionTree, TreeParams};

/// Boosting hyperparameters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoostingParams {
    pub n_stages: usize,
    pub learning_rate: f64,
    pub max_depth: usize,
    pub min_samples_split: usize,
    pub min_samples_leaf: usize,
    /// Fraction of rows drawn for each stage
    pub subsample: f64,
    pub seed: u64,
}

impl Default for BoostingParams {
    fn default() -> Self {
        Self {
            n_stages: 200,
            learning_rate: 0.1,
            max_depth: 5,
            min_samples_split: 5,
            min_samples_leaf: 2,
            subsample: 0.8,
            seed: 42,
        }
    }
}

/// A fitted boosting model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GradientBoosting {
    init: f64,
    learning_rate: f64,
    stages: Vec<RegressionTree>,
}

impl GradientBoosting {
    /// Fit on all rows of `x`. Stages are inherently sequential.
    #[must_use]
    pub fn fit(x: &[Vec<f64>], y: &[f64], params: &BoostingParams) -> Self {
        let n = y.len();
        let init = if n == 0 {
            0.0
        } else {
            y.iter().sum::<f64>() / n as f64
        };

        let tree_params = TreeParams {
            max_depth: params.max_depth,
            min_samples_split: params.min_samples_split,
            min_samples_leaf: params.min_samples_leaf,
            max_features: None,
        };
        let sample_size = ((n as f64 * params.subsample).round() as usize).min(n).max(1);

        let mut rng = ChaCha20Rng::seed_from_u64(params.seed);
        let mut current = vec![init; n];
        let mut residuals = vec![0.0; n];
        let mut stages = Vec::with_capacity(params.n_stages);

        for _ in 0..params.n_stages {
            if n == 0 {
                break;
            }
            for ((r, target), pred) in residuals.iter_mut().zip(y).zip(&current) {
                *r = target - pred;
            }

            let rows = if sample_size < n {
                let mut picked = index::sample(&mut rng, n, sample_size).into_vec();
                picked.sort_unstable();
                picked
            } else {
                (0..n).collect()
            };

            let tree = RegressionTree::fit(x, &residuals, &rows, tree_params, &mut rng);
            for (pred, row) in current.iter_mut().zip(x) {
                *pred += params.learning_rate * tree.predict(row);
            }
            stages.push(tree);
        }

        tracing::debug!(
            "Fitted boosting: {} stages, learning rate {}",
            stages.len(),
            params.learning_rate
        );

        Self {
            init,
            learning_rate: params.learning_rate,
            stages,
        }
    }

    #[must_use]
    pub fn predict(&self, row: &[f64]) -> f64 {
        self.init
            + self
                .stages
                .iter()
                .map(|t| self.learning_rate * t.predict(row))
                .sum::<f64>()
    }

    #[must_use]
    pub fn n_stages(&self) -> usize {
        self.stages.len()
    }

    /// Input width of the fitted stages, `None` before any stage exists.
    #[must_use]
    pub fn n_features(&self) -> Option<usize> {
        self.stages.first().map(RegressionTree::n_features)
    }
}
