//! Bagging forest of regression trees.
//!
//! Trees are fitted in parallel. Each tree owns a ChaCha20 stream derived
//! from `(seed, tree index)`, so the fitted forest is the same whatever the
//! thread scheduling.

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha20Rng;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use super::tree::{RegressionTree, TreeParams};

/// Forest hyperparameters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ForestParams {
    pub n_trees: usize,
    pub max_depth: usize,
    pub min_samples_split: usize,
    pub min_samples_leaf: usize,
    pub bootstrap: bool,
    pub seed: u64,
}

impl Default for ForestParams {
    fn default() -> Self {
        Self {
            n_trees: 300,
            max_depth: 10,
            min_samples_split: 5,
            min_samples_leaf: 2,
            bootstrap: true,
            seed: 42,
        }
    }
}

/// Number of features tried per split: `floor(sqrt(n))`, at least one.
#[must_use]
pub fn sqrt_features(n_features: usize) -> usize {
    ((n_features as f64).sqrt().floor() as usize).max(1)
}

/// A fitted bagging forest.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RandomForest {
    trees: Vec<RegressionTree>,
    n_features: usize,
}

impl RandomForest {
    /// Fit on all rows of `x`.
    #[must_use]
    pub fn fit(x: &[Vec<f64>], y: &[f64], params: &ForestParams) -> Self {
        let n_samples = x.len();
        let n_features = x.first().map_or(0, Vec::len);
        let tree_params = TreeParams {
            max_depth: params.max_depth,
            min_samples_split: params.min_samples_split,
            min_samples_leaf: params.min_samples_leaf,
            max_features: Some(sqrt_features(n_features)),
        };

        let trees = (0..params.n_trees)
            .into_par_iter()
            .map(|i| {
                let mut rng = ChaCha20Rng::seed_from_u64(params.seed);
                rng.set_stream(i as u64);

                let indices: Vec<usize> = if params.bootstrap {
                    (0..n_samples).map(|_| rng.gen_range(0..n_samples)).collect()
                } else {
                    (0..n_samples).collect()
                };
                RegressionTree::fit(x, y, &indices, tree_params, &mut rng)
            })
            .collect();

        tracing::debug!(
            "Fitted forest: {} trees on {} samples x {} features",
            params.n_trees,
            n_samples,
            n_features
        );

        Self { trees, n_features }
    }

    /// Mean of the tree predictions.
    #[must_use]
    pub fn predict(&self, row: &[f64]) -> f64 {
        if self.trees.is_empty() {
            return 0.0;
        }
        self.trees.iter().map(|t| t.predict(row)).sum::<f64>() / self.trees.len() as f64
    }

    #[must_use]
    pub fn n_trees(&self) -> usize {
        self.trees.len()
    }

    #[must_use]
    pub fn n_features(&self) -> usize {
        self.n_features
    }

    /// Mean of the per-tree normalized importances, renormalized to sum to one.
    #[must_use]
    pub fn feature_importances(&self) -> Vec<f64> {
        let mut totals = vec![0.0; self.n_features];
        let mut contributing = 0usize;
        for tree in &self.trees {
            let importances = tree.feature_importances();
            if importances.iter().sum::<f64>() > 0.0 {
                contributing += 1;
                for (total, value) in totals.iter_mut().zip(importances) {
                    *total += value;
                }
            }
        }
        if contributing == 0 {
            return totals;
        }

        let sum: f64 = totals.iter().sum();
        totals.iter().map(|v| v / sum).collect()
    }
}
