//! Weighted Gini Decision Tree

use crate::N_CLASSES;
use rand::seq::SliceRandom;
use rand_chacha::ChaCha8Rng;

/// Growth limits for a single tree
#[derive(Debug, Clone, Copy)]
pub struct TreeParams {
    /// Maximum depth (unbounded if None)
    pub max_depth: Option<usize>,
    /// Minimum samples required to split a node
    pub min_samples_split: usize,
    /// Minimum samples in each leaf
    pub min_samples_leaf: usize,
    /// Features drawn per split
    pub max_features: usize,
}

#[derive(Debug, Clone)]
enum Node {
    Leaf {
        probs: [f64; N_CLASSES],
    },
    Split {
        feature: usize,
        threshold: f64,
        left: Box<Node>,
        right: Box<Node>,
    },
}

struct Split {
    feature: usize,
    threshold: f64,
    gain: f64,
}

/// Gini impurity of weighted class totals
fn gini(counts: &[f64; N_CLASSES]) -> f64 {
    let total: f64 = counts.iter().sum();
    if total <= 0.0 {
        return 0.0;
    }
    1.0 - counts.iter().map(|c| (c / total).powi(2)).sum::<f64>()
}

fn normalized(counts: &[f64; N_CLASSES]) -> [f64; N_CLASSES] {
    let total: f64 = counts.iter().sum();
    let mut probs = [0.0; N_CLASSES];
    if total > 0.0 {
        for (p, c) in probs.iter_mut().zip(counts) {
            *p = c / total;
        }
    }
    probs
}

/// Classification tree grown on weighted samples
#[derive(Debug, Clone)]
pub struct DecisionTree {
    root: Node,
}

/// Borrowed training inputs shared by every node
struct Grower<'a> {
    features: &'a [Vec<f64>],
    labels: &'a [usize],
    weights: &'a [f64],
    params: &'a TreeParams,
    n_features: usize,
}

impl DecisionTree {
    /// Grow a tree on the samples at `indices` (repeats allowed, as produced
    /// by bootstrap sampling). `weights` holds one weight per sample.
    pub fn fit(
        features: &[Vec<f64>],
        labels: &[usize],
        weights: &[f64],
        indices: &[usize],
        params: &TreeParams,
        rng: &mut ChaCha8Rng,
    ) -> Self {
        let grower = Grower {
            features,
            labels,
            weights,
            params,
            n_features: features.first().map_or(0, Vec::len),
        };
        let mut indices = indices.to_vec();
        Self {
            root: grower.build(&mut indices, 0, rng),
        }
    }

    /// Class probabilities of the leaf `row` falls into
    pub fn predict_proba(&self, row: &[f64]) -> [f64; N_CLASSES] {
        let mut node = &self.root;
        loop {
            match node {
                Node::Leaf { probs } => return *probs,
                Node::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => {
                    node = if row[*feature] <= *threshold { left } else { right };
                }
            }
        }
    }

    /// Depth of the deepest leaf (a single leaf has depth 1)
    #[cfg(test)]
    pub fn depth(&self) -> usize {
        fn depth(node: &Node) -> usize {
            match node {
                Node::Leaf { .. } => 1,
                Node::Split { left, right, .. } => 1 + depth(left).max(depth(right)),
            }
        }
        depth(&self.root)
    }
}

impl Grower<'_> {
    fn class_totals(&self, indices: &[usize]) -> [f64; N_CLASSES] {
        let mut totals = [0.0; N_CLASSES];
        for &i in indices {
            totals[self.labels[i]] += self.weights[i];
        }
        totals
    }

    fn build(&self, indices: &mut [usize], depth: usize, rng: &mut ChaCha8Rng) -> Node {
        let totals = self.class_totals(indices);
        let impurity = gini(&totals);

        let depth_reached = self.params.max_depth.map_or(false, |d| depth >= d);
        if depth_reached || indices.len() < self.params.min_samples_split || impurity <= 1e-12 {
            return Node::Leaf {
                probs: normalized(&totals),
            };
        }

        let Some(split) = self.best_split(indices, &totals, impurity, rng) else {
            return Node::Leaf {
                probs: normalized(&totals),
            };
        };

        let (mut left, mut right): (Vec<usize>, Vec<usize>) = indices
            .iter()
            .partition(|&&i| self.features[i][split.feature] <= split.threshold);

        Node::Split {
            feature: split.feature,
            threshold: split.threshold,
            left: Box::new(self.build(&mut left, depth + 1, rng)),
            right: Box::new(self.build(&mut right, depth + 1, rng)),
        }
    }

    /// Sweep sorted values of each drawn feature, keeping the split with the
    /// largest weighted impurity decrease.
    fn best_split(
        &self,
        indices: &mut [usize],
        totals: &[f64; N_CLASSES],
        impurity: f64,
        rng: &mut ChaCha8Rng,
    ) -> Option<Split> {
        let mut candidates: Vec<usize> = (0..self.n_features).collect();
        candidates.shuffle(rng);
        candidates.truncate(self.params.max_features.max(1));

        let n = indices.len();
        if n < 2 {
            return None;
        }
        let min_leaf = self.params.min_samples_leaf;
        let total_weight: f64 = totals.iter().sum();
        let mut best: Option<Split> = None;

        for feature in candidates {
            indices.sort_by(|&a, &b| self.features[a][feature].total_cmp(&self.features[b][feature]));

            let mut left = [0.0; N_CLASSES];
            for k in 0..n - 1 {
                let i = indices[k];
                left[self.labels[i]] += self.weights[i];

                let value = self.features[i][feature];
                let next = self.features[indices[k + 1]][feature];
                if value == next || k + 1 < min_leaf || n - k - 1 < min_leaf {
                    continue;
                }

                let mut right = [0.0; N_CLASSES];
                for c in 0..N_CLASSES {
                    right[c] = totals[c] - left[c];
                }
                let w_left: f64 = left.iter().sum();
                let w_right = total_weight - w_left;
                let child = (w_left * gini(&left) + w_right * gini(&right)) / total_weight;
                let gain = impurity - child;

                if gain > best.as_ref().map_or(1e-12, |b| b.gain) {
                    best = Some(Split {
                        feature,
                        threshold: value + (next - value) / 2.0,
                        gain,
                    });
                }
            }
        }

        best
    }
}
