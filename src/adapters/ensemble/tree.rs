//! CART regression tree (squared-error criterion).
//!
//! Nodes live in a flat arena; traversal goes left when
//! `value <= threshold`.

use rand::seq::index;
use rand::Rng;
use serde::{Deserialize, Serialize};

/// Growth limits for a single tree.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TreeParams {
    pub max_depth: usize,
    pub min_samples_split: usize,
    pub min_samples_leaf: usize,
    /// Features considered per split; `None` means all of them
    pub max_features: Option<usize>,
}

impl Default for TreeParams {
    fn default() -> Self {
        Self {
            max_depth: 10,
            min_samples_split: 2,
            min_samples_leaf: 1,
            max_features: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Node {
    Leaf {
        value: f64,
    },
    Split {
        feature: usize,
        threshold: f64,
        left: usize,
        right: usize,
    },
}

/// A fitted regression tree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegressionTree {
    nodes: Vec<Node>,
    n_features: usize,
    /// Total squared-error reduction per feature
    importances: Vec<f64>,
}

struct BestSplit {
    feature: usize,
    threshold: f64,
    gain: f64,
}

struct Builder<'a, R: Rng> {
    x: &'a [Vec<f64>],
    y: &'a [f64],
    params: TreeParams,
    rng: &'a mut R,
    nodes: Vec<Node>,
    importances: Vec<f64>,
}

/// Minimum relative reduction in squared error for a split to count.
const MIN_GAIN: f64 = 1e-12;

impl<R: Rng> Builder<'_, R> {
    fn build(&mut self, indices: &mut [usize], depth: usize) -> usize {
        let n = indices.len();
        let sum: f64 = indices.iter().map(|&i| self.y[i]).sum();
        let mean = sum / n as f64;

        let splittable = depth < self.params.max_depth
            && n >= self.params.min_samples_split
            && n >= 2 * self.params.min_samples_leaf;

        let best = if splittable {
            self.best_split(indices, sum)
        } else {
            None
        };

        let Some(best) = best else {
            self.nodes.push(Node::Leaf { value: mean });
            return self.nodes.len() - 1;
        };

        self.importances[best.feature] += best.gain;

        let x = self.x;
        indices.sort_by(|&a, &b| x[a][best.feature].total_cmp(&x[b][best.feature]));
        let split_at = indices.partition_point(|&i| x[i][best.feature] <= best.threshold);

        let id = self.nodes.len();
        self.nodes.push(Node::Leaf { value: mean });

        let (left_idx, right_idx) = indices.split_at_mut(split_at);
        let left = self.build(left_idx, depth + 1);
        let right = self.build(right_idx, depth + 1);

        self.nodes[id] = Node::Split {
            feature: best.feature,
            threshold: best.threshold,
            left,
            right,
        };
        id
    }

    /// Feature visiting order for one split search, with the number of
    /// non-constant features to examine.
    fn candidate_features(&mut self) -> (Vec<usize>, usize) {
        let n_features = self.importances.len();
        match self.params.max_features {
            Some(k) if k < n_features => {
                let order = index::sample(&mut *self.rng, n_features, n_features).into_vec();
                (order, k.max(1))
            }
            _ => ((0..n_features).collect(), n_features),
        }
    }

    /// Constant features inside the node do not count towards the
    /// `max_features` budget, so a node only becomes a leaf when no
    /// sampled informative feature yields a valid split.
    fn best_split(&mut self, indices: &[usize], total: f64) -> Option<BestSplit> {
        let n = indices.len();
        let min_leaf = self.params.min_samples_leaf.max(1);
        let parent_score = total * total / n as f64;
        let min_gain = MIN_GAIN * parent_score.abs().max(1.0);

        let mut best: Option<BestSplit> = None;
        let mut order: Vec<usize> = indices.to_vec();
        let (features, budget) = self.candidate_features();
        let mut visited = 0;

        for feature in features {
            if visited == budget {
                break;
            }
            let x = self.x;
            order.sort_by(|&a, &b| x[a][feature].total_cmp(&x[b][feature]));
            if x[order[0]][feature] >= x[order[n - 1]][feature] {
                continue;
            }
            visited += 1;

            let mut left_sum = 0.0;
            for pos in 0..n - 1 {
                left_sum += self.y[order[pos]];
                let left_n = pos + 1;
                let right_n = n - left_n;
                if left_n < min_leaf || right_n < min_leaf {
                    continue;
                }

                let here = x[order[pos]][feature];
                let next = x[order[pos + 1]][feature];
                if here >= next {
                    continue;
                }

                let right_sum = total - left_sum;
                let score =
                    left_sum * left_sum / left_n as f64 + right_sum * right_sum / right_n as f64;
                let gain = score - parent_score;

                if gain > min_gain && best.as_ref().map_or(true, |b| gain > b.gain) {
                    best = Some(BestSplit {
                        feature,
                        threshold: here + (next - here) / 2.0,
                        gain,
                    });
                }
            }
        }

        best
    }
}

impl RegressionTree {
    /// Fit a tree on the rows of `x` selected by `indices`.
    ///
    /// Indices may repeat (bootstrap samples). `indices` must be non-empty.
    pub fn fit<R: Rng>(
        x: &[Vec<f64>],
        y: &[f64],
        indices: &[usize],
        params: TreeParams,
        rng: &mut R,
    ) -> Self {
        let n_features = x.first().map_or(0, Vec::len);
        let mut builder = Builder {
            x,
            y,
            params,
            rng,
            nodes: Vec::new(),
            importances: vec![0.0; n_features],
        };

        let mut working = indices.to_vec();
        if working.is_empty() {
            builder.nodes.push(Node::Leaf { value: 0.0 });
        } else {
            builder.build(&mut working, 0);
        }

        Self {
            nodes: builder.nodes,
            n_features,
            importances: builder.importances,
        }
    }

    /// Predict one row.
    #[must_use]
    pub fn predict(&self, row: &[f64]) -> f64 {
        let mut id = 0;
        loop {
            match &self.nodes[id] {
                Node::Leaf { value } => return *value,
                Node::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => {
                    id = if row[*feature] <= *threshold { *left } else { *right };
                }
            }
        }
    }

    #[must_use]
    pub fn n_features(&self) -> usize {
        self.n_features
    }

    #[must_use]
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Importances normalized to sum to one (all zero for a single leaf).
    #[must_use]
    pub fn feature_importances(&self) -> Vec<f64> {
        let total: f64 = self.importances.iter().sum();
        if total <= 0.0 {
            return vec![0.0; self.n_features];
        }
        self.importances.iter().map(|v| v / total).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha20Rng;

    fn step_data() -> (Vec<Vec<f64>>, Vec<f64>) {
        let x: Vec<Vec<f64>> = (0..20).map(|i| vec![f64::from(i), 7.0]).collect();
        let y: Vec<f64> = (0..20).map(|i| if i < 10 { 10.0 } else { 50.0 }).collect();
        (x, y)
    }

    #[test]
    fn test_learns_step_function() {
        let (x, y) = step_data();
        let indices: Vec<usize> = (0..x.len()).collect();
        let mut rng = ChaCha20Rng::seed_from_u64(1);
        let tree = RegressionTree::fit(&x, &y, &indices, TreeParams::default(), &mut rng);

        assert_eq!(tree.predict(&[3.0, 7.0]), 10.0);
        assert_eq!(tree.predict(&[15.0, 7.0]), 50.0);
        // Exactly one split on feature 0 is enough
        assert_eq!(tree.node_count(), 3);

        let importances = tree.feature_importances();
        assert_eq!(importances, vec![1.0, 0.0]);
    }

    #[test]
    fn test_respects_depth_and_leaf_limits() {
        let x: Vec<Vec<f64>> = (0..32).map(|i| vec![f64::from(i)]).collect();
        let y: Vec<f64> = (0..32).map(f64::from).collect();
        let indices: Vec<usize> = (0..x.len()).collect();
        let mut rng = ChaCha20Rng::seed_from_u64(1);

        let stump = RegressionTree::fit(
            &x,
            &y,
            &indices,
            TreeParams {
                max_depth: 1,
                ..TreeParams::default()
            },
            &mut rng,
        );
        assert_eq!(stump.node_count(), 3);

        let coarse = RegressionTree::fit(
            &x,
            &y,
            &indices,
            TreeParams {
                max_depth: 20,
                min_samples_split: 2,
                min_samples_leaf: 8,
                max_features: None,
            },
            &mut rng,
        );
        // 32 rows with at least 8 per leaf leave room for 4 leaves at most
        assert!(coarse.node_count() <= 7);
    }

    #[test]
    fn test_constant_target_is_single_leaf() {
        let x: Vec<Vec<f64>> = (0..10).map(|i| vec![f64::from(i)]).collect();
        let y = vec![42.0; 10];
        let indices: Vec<usize> = (0..10).collect();
        let mut rng = ChaCha20Rng::seed_from_u64(1);
        let tree = RegressionTree::fit(&x, &y, &indices, TreeParams::default(), &mut rng);

        assert_eq!(tree.node_count(), 1);
        assert_eq!(tree.predict(&[100.0]), 42.0);
        assert_eq!(tree.feature_importances(), vec![0.0]);
    }

    #[test]
    fn test_duplicate_indices_are_supported() {
        let (x, y) = step_data();
        let indices = vec![0, 0, 1, 1, 12, 12, 13, 13];
        let mut rng = ChaCha20Rng::seed_from_u64(1);
        let tree = RegressionTree::fit(&x, &y, &indices, TreeParams::default(), &mut rng);

        assert_eq!(tree.predict(&[0.0, 7.0]), 10.0);
        assert_eq!(tree.predict(&[19.0, 7.0]), 50.0);
    }
}
