//! CART decision tree grown on a bootstrap sample

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};

use super::SplitCriterion;

/// Impurity below which a node counts as pure.
const PURE_EPSILON: f64 = 1e-12;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
enum Node {
    Leaf {
        proba: Vec<f64>,
    },
    Split {
        feature: usize,
        threshold: f64,
        left: usize,
        right: usize,
    },
}

/// Growth parameters shared by every tree of a forest.
#[derive(Debug, Clone, Copy)]
pub(crate) struct TreeParams {
    pub criterion: SplitCriterion,
    pub max_features: usize,
    pub n_features: usize,
    pub n_classes: usize,
}

#[derive(Debug, Clone, Copy)]
struct SplitCandidate {
    feature: usize,
    threshold: f64,
    child_impurity: f64,
}

/// Fully grown classification tree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecisionTree {
    nodes: Vec<Node>,
    importances: Vec<f64>,
}

impl DecisionTree {
    /// Grow a tree over the rows listed in `sample` (duplicates allowed).
    #[allow(clippy::cast_precision_loss)]
    pub(crate) fn fit(
        features: &[Vec<f64>],
        labels: &[usize],
        sample: Vec<usize>,
        params: &TreeParams,
        rng: &mut StdRng,
    ) -> Self {
        let mut nodes = vec![Node::Leaf { proba: Vec::new() }];
        let mut importances = vec![0.0; params.n_features];
        let mut pending = vec![(0_usize, sample)];

        while let Some((id, rows)) = pending.pop() {
            let counts = class_counts(labels, &rows, params.n_classes);
            let n = rows.len() as f64;
            let impurity = params.criterion.impurity(&counts, n);

            let split = if rows.len() < 2 || impurity <= PURE_EPSILON {
                None
            } else {
                best_split(features, labels, &rows, &counts, params, rng)
            };

            let Some(split) = split else {
                nodes[id] = Node::Leaf {
                    proba: counts.iter().map(|c| c / n).collect(),
                };
                continue;
            };

            importances[split.feature] += n.mul_add(impurity, -split.child_impurity);

            let (left_rows, right_rows): (Vec<usize>, Vec<usize>) = rows
                .iter()
                .partition(|&&row| features[row][split.feature] <= split.threshold);

            let left = nodes.len();
            let right = left + 1;
            nodes.push(Node::Leaf { proba: Vec::new() });
            nodes.push(Node::Leaf { proba: Vec::new() });
            nodes[id] = Node::Split {
                feature: split.feature,
                threshold: split.threshold,
                left,
                right,
            };
            pending.push((left, left_rows));
            pending.push((right, right_rows));
        }

        Self { nodes, importances }
    }

    /// Single-leaf tree with fixed class probabilities.
    #[cfg(test)]
    pub(crate) fn leaf(proba: Vec<f64>, n_features: usize) -> Self {
        Self {
            nodes: vec![Node::Leaf { proba }],
            importances: vec![0.0; n_features],
        }
    }

    /// Class probabilities of the leaf `row` falls into.
    pub(crate) fn predict_proba(&self, row: &[f64]) -> &[f64] {
        let mut id = 0;
        loop {
            match &self.nodes[id] {
                Node::Leaf { proba } => return proba,
                Node::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => {
                    id = if row[*feature] <= *threshold {
                        *left
                    } else {
                        *right
                    };
                }
            }
        }
    }

    /// Number of nodes (splits and leaves).
    #[must_use]
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Impurity-decrease importances normalized to sum to 1 (all zero for a
    /// single-leaf tree).
    #[must_use]
    pub fn feature_importances(&self) -> Vec<f64> {
        let total: f64 = self.importances.iter().sum();
        if total > 0.0 {
            self.importances.iter().map(|v| v / total).collect()
        } else {
            vec![0.0; self.importances.len()]
        }
    }
}

#[allow(clippy::cast_precision_loss)]
fn class_counts(labels: &[usize], rows: &[usize], n_classes: usize) -> Vec<f64> {
    let mut counts = vec![0.0; n_classes];
    for &row in rows {
        counts[labels[row]] += 1.0;
    }
    counts
}

/// Best threshold over randomly ordered features.
///
/// At least `max_features` features are inspected; the search continues past
/// that budget until one valid partition is found.
#[allow(clippy::cast_precision_loss)]
fn best_split(
    features: &[Vec<f64>],
    labels: &[usize],
    rows: &[usize],
    counts: &[f64],
    params: &TreeParams,
    rng: &mut StdRng,
) -> Option<SplitCandidate> {
    let mut order: Vec<usize> = (0..params.n_features).collect();
    order.shuffle(rng);

    let n = rows.len() as f64;
    let mut best: Option<SplitCandidate> = None;
    let mut sorted: Vec<(f64, usize)> = Vec::with_capacity(rows.len());

    for (visited, &feature) in order.iter().enumerate() {
        if visited >= params.max_features && best.is_some() {
            break;
        }

        sorted.clear();
        sorted.extend(rows.iter().map(|&row| (features[row][feature], labels[row])));
        sorted.sort_by(|a, b| a.0.total_cmp(&b.0));

        let (lowest, highest) = (sorted[0].0, sorted[sorted.len() - 1].0);
        if lowest >= highest {
            continue;
        }

        let mut left = vec![0.0; params.n_classes];
        let mut right = counts.to_vec();
        for pos in 0..sorted.len() - 1 {
            let (value, class) = sorted[pos];
            left[class] += 1.0;
            right[class] -= 1.0;

            let next = sorted[pos + 1].0;
            if next <= value {
                continue;
            }

            let n_left = (pos + 1) as f64;
            let n_right = n - n_left;
            let child_impurity = n_left.mul_add(
                params.criterion.impurity(&left, n_left),
                n_right * params.criterion.impurity(&right, n_right),
            );

            if best.map_or(true, |b| child_impurity < b.child_impurity) {
                let mut threshold = value / 2.0 + next / 2.0;
                if threshold >= next || !threshold.is_finite() {
                    threshold = value;
                }
                best = Some(SplitCandidate {
                    feature,
                    threshold,
                    child_impurity,
                });
            }
        }
    }

    best
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;

    fn params(n_features: usize, max_features: usize) -> TreeParams {
        TreeParams {
            criterion: SplitCriterion::Gini,
            max_features,
            n_features,
            n_classes: 2,
        }
    }

    #[test]
    fn test_pure_node_is_leaf() {
        let x = vec![vec![1.0], vec![2.0]];
        let y = vec![1, 1];
        let mut rng = StdRng::seed_from_u64(0);
        let tree = DecisionTree::fit(&x, &y, vec![0, 1], &params(1, 1), &mut rng);
        assert_eq!(tree.node_count(), 1);
        assert_eq!(tree.predict_proba(&[5.0]), &[0.0, 1.0]);
        assert_eq!(tree.feature_importances(), vec![0.0]);
    }

    #[test]
    fn test_single_threshold_split() {
        let x = vec![vec![1.0], vec![2.0], vec![3.0], vec![4.0]];
        let y = vec![0, 0, 1, 1];
        let mut rng = StdRng::seed_from_u64(0);
        let tree = DecisionTree::fit(&x, &y, vec![0, 1, 2, 3], &params(1, 1), &mut rng);

        assert_eq!(tree.node_count(), 3);
        assert_eq!(tree.predict_proba(&[2.4]), &[1.0, 0.0]);
        assert_eq!(tree.predict_proba(&[2.6]), &[0.0, 1.0]);
        assert_eq!(tree.feature_importances(), vec![1.0]);
    }

    #[test]
    fn test_importance_goes_to_informative_feature() {
        // feature 0 is noise-free, feature 1 is constant
        let x = vec![
            vec![0.0, 7.0],
            vec![0.1, 7.0],
            vec![0.9, 7.0],
            vec![1.0, 7.0],
        ];
        let y = vec![0, 0, 1, 1];
        let mut rng = StdRng::seed_from_u64(3);
        let tree = DecisionTree::fit(&x, &y, vec![0, 1, 2, 3], &params(2, 1), &mut rng);
        assert_eq!(tree.feature_importances(), vec![1.0, 0.0]);
    }

    #[test]
    fn test_constant_features_give_leaf() {
        let x = vec![vec![1.0], vec![1.0]];
        let y = vec![0, 1];
        let mut rng = StdRng::seed_from_u64(0);
        let tree = DecisionTree::fit(&x, &y, vec![0, 1], &params(1, 1), &mut rng);
        assert_eq!(tree.node_count(), 1);
        assert_eq!(tree.predict_proba(&[1.0]), &[0.5, 0.5]);
    }

    #[test]
    fn test_entropy_impurity() {
        let entropy = SplitCriterion::Entropy.impurity(&[2.0, 2.0], 4.0);
        assert!((entropy - 1.0).abs() < 1e-12);
        let gini = SplitCriterion::Gini.impurity(&[2.0, 2.0], 4.0);
        assert!((gini - 0.5).abs() < 1e-12);
    }
}
