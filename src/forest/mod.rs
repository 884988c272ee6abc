//! Random forest classifier
//!
//! Bagged CART trees with per-split feature sampling. Trees are grown on a
//! dedicated rayon pool; each tree's seed is drawn up front from the forest
//! seed, so the fitted forest does not depend on worker scheduling.
//!
//! Prediction averages leaf class probabilities over all trees (soft voting).
//!
//! ```rust
//! use vital_forest::forest::{ForestParams, RandomForest, SplitCriterion};
//!
//! let x = vec![vec![0.0], vec![0.2], vec![0.8], vec![1.0]];
//! let y = vec![0, 0, 1, 1];
//! let params = ForestParams {
//!     tree_count: 25,
//!     feature_fraction: 1.0,
//!     criterion: SplitCriterion::Gini,
//!     worker_count: 2,
//!     seed: 7,
//! };
//! let forest = RandomForest::fit(&x, &y, &params)?;
//! assert_eq!(forest.predict(&[0.95])?, 1);
//! # Ok::<(), vital_forest::Error>(())
//! ```

mod tree;

pub use tree::DecisionTree;

use std::fmt;
use std::str::FromStr;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::{Error, Result};
use tree::TreeParams;

/// Impurity measure used to rank candidate splits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SplitCriterion {
    /// Gini impurity
    Gini,
    /// Shannon entropy (information gain)
    #[default]
    Entropy,
}

impl SplitCriterion {
    /// Impurity of a node with the given class counts summing to `total`.
    #[must_use]
    pub fn impurity(self, counts: &[f64], total: f64) -> f64 {
        if total <= 0.0 {
            return 0.0;
        }
        match self {
            Self::Gini => 1.0 - counts.iter().map(|c| (c / total).powi(2)).sum::<f64>(),
            Self::Entropy => -counts
                .iter()
                .filter(|&&c| c > 0.0)
                .map(|c| {
                    let p = c / total;
                    p * p.log2()
                })
                .sum::<f64>(),
        }
    }
}

impl fmt::Display for SplitCriterion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Gini => f.write_str("gini"),
            Self::Entropy => f.write_str("entropy"),
        }
    }
}

impl FromStr for SplitCriterion {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "gini" => Ok(Self::Gini),
            "entropy" => Ok(Self::Entropy),
            other => Err(Error::InvalidInput(format!("unknown split criterion: {other}"))),
        }
    }
}

/// Forest hyperparameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForestParams {
    /// Number of trees
    pub tree_count: usize,
    /// Fraction of features considered at each split, in (0, 1]
    pub feature_fraction: f64,
    /// Split-quality criterion
    pub criterion: SplitCriterion,
    /// Threads used to grow trees
    pub worker_count: usize,
    /// Seed for bootstrap sampling and feature sampling
    pub seed: u64,
}

impl ForestParams {
    fn validate(&self) -> Result<()> {
        if self.tree_count == 0 {
            return Err(Error::InvalidInput("tree_count must be greater than 0".to_string()));
        }
        if !(self.feature_fraction > 0.0 && self.feature_fraction <= 1.0) {
            return Err(Error::InvalidInput(format!(
                "feature_fraction must be in (0, 1], got {}",
                self.feature_fraction
            )));
        }
        if self.worker_count == 0 {
            return Err(Error::InvalidInput("worker_count must be greater than 0".to_string()));
        }
        Ok(())
    }

    /// Features inspected per split: `max(1, floor(fraction * n_features))`.
    #[must_use]
    #[allow(
        clippy::cast_possible_truncation,
        clippy::cast_sign_loss,
        clippy::cast_precision_loss
    )]
    pub fn max_features(&self, n_features: usize) -> usize {
        ((self.feature_fraction * n_features as f64).floor() as usize).max(1)
    }
}

/// Trained random forest.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RandomForest {
    params: ForestParams,
    trees: Vec<DecisionTree>,
    n_features: usize,
    n_classes: usize,
    importances: Vec<f64>,
}

impl RandomForest {
    /// Fit a forest on row-major `features` and class `labels` (`0..n_classes`).
    ///
    /// # Errors
    ///
    /// Returns [`Error::TrainingFailed`] for empty input, fewer than two
    /// classes, ragged rows or a thread pool that cannot start, and
    /// [`Error::InvalidInput`] for out-of-range hyperparameters.
    pub fn fit(features: &[Vec<f64>], labels: &[usize], params: &ForestParams) -> Result<Self> {
        params.validate()?;

        if features.is_empty() {
            return Err(Error::TrainingFailed("no training samples".to_string()));
        }
        if features.len() != labels.len() {
            return Err(Error::TrainingFailed(format!(
                "{} samples but {} labels",
                features.len(),
                labels.len()
            )));
        }
        let n_features = features[0].len();
        if n_features == 0 {
            return Err(Error::TrainingFailed("samples have no features".to_string()));
        }
        if let Some(row) = features.iter().position(|r| r.len() != n_features) {
            return Err(Error::TrainingFailed(format!(
                "sample {row} has {} features, expected {n_features}",
                features[row].len()
            )));
        }

        let n_classes = labels.iter().max().map_or(0, |&max| max + 1);
        let mut seen = vec![false; n_classes];
        for &label in labels {
            seen[label] = true;
        }
        if seen.iter().filter(|&&s| s).count() < 2 {
            return Err(Error::TrainingFailed(
                "training labels contain a single class".to_string(),
            ));
        }

        let tree_params = TreeParams {
            criterion: params.criterion,
            max_features: params.max_features(n_features),
            n_features,
            n_classes,
        };

        let mut seeder = StdRng::seed_from_u64(params.seed);
        let seeds: Vec<u64> = (0..params.tree_count).map(|_| seeder.gen()).collect();

        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(params.worker_count)
            .build()
            .map_err(|e| Error::TrainingFailed(format!("failed to start worker pool: {e}")))?;

        let n = features.len();
        let trees: Vec<DecisionTree> = pool.install(|| {
            seeds
                .par_iter()
                .map(|&seed| {
                    let mut rng = StdRng::seed_from_u64(seed);
                    let bootstrap: Vec<usize> = (0..n).map(|_| rng.gen_range(0..n)).collect();
                    DecisionTree::fit(features, labels, bootstrap, &tree_params, &mut rng)
                })
                .collect()
        });

        let importances = aggregate_importances(&trees, n_features);

        tracing::debug!(
            trees = trees.len(),
            n_features,
            n_classes,
            max_features = tree_params.max_features,
            "fitted random forest"
        );

        Ok(Self {
            params: params.clone(),
            trees,
            n_features,
            n_classes,
            importances,
        })
    }

    /// Hyperparameters the forest was fitted with.
    #[must_use]
    pub const fn params(&self) -> &ForestParams {
        &self.params
    }

    /// Fitted trees.
    #[must_use]
    pub fn trees(&self) -> &[DecisionTree] {
        &self.trees
    }

    /// Number of input features.
    #[must_use]
    pub const fn n_features(&self) -> usize {
        self.n_features
    }

    /// Number of classes.
    #[must_use]
    pub const fn n_classes(&self) -> usize {
        self.n_classes
    }

    /// Mean impurity-decrease importance per feature, summing to 1 (or all
    /// zero if no tree split).
    #[must_use]
    pub fn feature_importances(&self) -> &[f64] {
        &self.importances
    }

    /// Averaged class probabilities for one sample.
    ///
    /// # Errors
    ///
    /// Returns [`Error::SchemaMismatch`] if `row` has the wrong width.
    #[allow(clippy::cast_precision_loss)]
    pub fn predict_proba(&self, row: &[f64]) -> Result<Vec<f64>> {
        self.check_width(row)?;
        let mut proba = vec![0.0; self.n_classes];
        for tree in &self.trees {
            for (acc, p) in proba.iter_mut().zip(tree.predict_proba(row)) {
                *acc += p;
            }
        }
        let count = self.trees.len() as f64;
        proba.iter_mut().for_each(|p| *p /= count);
        Ok(proba)
    }

    /// Most probable class for one sample (lowest class wins ties).
    ///
    /// # Errors
    ///
    /// Returns [`Error::SchemaMismatch`] if `row` has the wrong width.
    pub fn predict(&self, row: &[f64]) -> Result<usize> {
        let proba = self.predict_proba(row)?;
        let mut best = 0;
        for (class, &p) in proba.iter().enumerate() {
            if p > proba[best] {
                best = class;
            }
        }
        Ok(best)
    }

    /// Predict every row in parallel.
    ///
    /// # Errors
    ///
    /// Returns [`Error::SchemaMismatch`] if any row has the wrong width.
    pub fn predict_batch(&self, rows: &[Vec<f64>]) -> Result<Vec<usize>> {
        rows.par_iter().map(|row| self.predict(row)).collect()
    }

    /// Fraction of rows whose prediction equals the label.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidInput`] for empty or mismatched input and
    /// [`Error::SchemaMismatch`] for rows of the wrong width.
    #[allow(clippy::cast_precision_loss)]
    pub fn score(&self, rows: &[Vec<f64>], labels: &[usize]) -> Result<f64> {
        if rows.is_empty() || rows.len() != labels.len() {
            return Err(Error::InvalidInput(format!(
                "cannot score {} rows against {} labels",
                rows.len(),
                labels.len()
            )));
        }
        let predictions = self.predict_batch(rows)?;
        let correct = predictions
            .iter()
            .zip(labels)
            .filter(|(p, l)| p == l)
            .count();
        Ok(correct as f64 / rows.len() as f64)
    }

    fn check_width(&self, row: &[f64]) -> Result<()> {
        if row.len() == self.n_features {
            Ok(())
        } else {
            Err(Error::SchemaMismatch {
                expected: self.n_features,
                actual: row.len(),
            })
        }
    }
}

/// Mean of per-tree normalized importances over trees that split at least
/// once, renormalized to sum to 1.
#[allow(clippy::cast_precision_loss)]
fn aggregate_importances(trees: &[DecisionTree], n_features: usize) -> Vec<f64> {
    let mut sum = vec![0.0; n_features];
    let mut contributing = 0_usize;
    for tree in trees.iter().filter(|t| t.node_count() > 1) {
        for (acc, v) in sum.iter_mut().zip(tree.feature_importances()) {
            *acc += v;
        }
        contributing += 1;
    }
    if contributing == 0 {
        return sum;
    }

    let mean: Vec<f64> = sum.iter().map(|v| v / contributing as f64).collect();
    let total: f64 = mean.iter().sum();
    if total > 0.0 {
        mean.iter().map(|v| v / total).collect()
    } else {
        mean
    }
}
