//! Ensemble training and evaluation

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use rustc_hash::FxHashSet;
use serde::{Deserialize, Serialize};

use crate::artifact::ModelArtifact;
use crate::config::TrainConfig;
use crate::forest::RandomForest;
use crate::registry::{ModelRegistry, RegistryEntry, RegistryLog};
use crate::table::LabeledDataset;
use crate::{Error, Result};

/// Random partition of sample positions into train and test sets.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrainTestSplit {
    train: Vec<usize>,
    test: Vec<usize>,
}

impl TrainTestSplit {
    /// Shuffle `0..n` and hold out `ceil(n * test_fraction)` positions.
    ///
    /// Unseeded splits draw from OS entropy.
    ///
    /// # Errors
    ///
    /// Returns [`Error::TrainingFailed`] if either side would be empty.
    pub fn new(n: usize, test_fraction: f64, seed: Option<u64>) -> Result<Self> {
        #[allow(clippy::cast_precision_loss, clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let n_test = (n as f64 * test_fraction).ceil() as usize;
        if n_test == 0 || n_test >= n {
            return Err(Error::TrainingFailed(format!(
                "cannot split {n} samples with test fraction {test_fraction}: \
                 {n_test} test, {} train",
                n.saturating_sub(n_test)
            )));
        }

        let mut rng = seed.map_or_else(StdRng::from_entropy, StdRng::seed_from_u64);
        let mut order: Vec<usize> = (0..n).collect();
        order.shuffle(&mut rng);
        let train = order.split_off(n_test);

        Ok(Self { train, test: order })
    }

    /// Training positions.
    #[must_use]
    pub fn train(&self) -> &[usize] {
        &self.train
    }

    /// Held-out positions.
    #[must_use]
    pub fn test(&self) -> &[usize] {
        &self.test
    }
}

/// Outcome of training or re-scoring a model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainingReport {
    /// Model name
    pub model_name: String,
    /// Samples in the training split
    pub train_samples: usize,
    /// Samples in the test split
    pub test_samples: usize,
    /// Accuracy on the training split
    pub train_accuracy: f64,
    /// Accuracy on the test split
    pub test_accuracy: f64,
}

/// Result of [`train_and_register`].
#[derive(Debug, Clone)]
pub struct TrainingOutcome {
    /// The trained model
    pub artifact: ModelArtifact,
    /// Split accuracies
    pub report: TrainingReport,
    /// Registry entry, `None` if a model with the same name was already saved
    pub registered: Option<RegistryEntry>,
}

struct Rows {
    features: Vec<Vec<f64>>,
    labels: Vec<usize>,
}

impl Rows {
    fn of(dataset: &LabeledDataset) -> Self {
        Self {
            features: dataset.features(),
            labels: dataset.labels(),
        }
    }

    fn select(&self, positions: &[usize]) -> Self {
        Self {
            features: positions.iter().map(|&i| self.features[i].clone()).collect(),
            labels: positions.iter().map(|&i| self.labels[i]).collect(),
        }
    }
}

/// Split `dataset`, fit a forest on the training part and score both parts.
///
/// # Errors
///
/// - [`Error::InvalidInput`] if `config` is out of range.
/// - [`Error::TrainingFailed`] if the dataset is empty, has a single class,
///   or is too small to split.
pub fn train(
    dataset: &LabeledDataset,
    config: &TrainConfig,
) -> Result<(ModelArtifact, TrainingReport)> {
    config.validate()?;
    if dataset.is_empty() {
        return Err(Error::TrainingFailed("dataset is empty".to_string()));
    }

    let rows = Rows::of(dataset);
    let classes: FxHashSet<usize> = rows.labels.iter().copied().collect();
    if classes.len() < 2 {
        return Err(Error::TrainingFailed(format!(
            "need at least two classes, found {}",
            classes.len()
        )));
    }

    let split = TrainTestSplit::new(dataset.num_samples(), config.test_fraction, config.split_seed)?;
    let train_rows = rows.select(split.train());
    let test_rows = rows.select(split.test());

    tracing::info!(
        train = split.train().len(),
        test = split.test().len(),
        trees = config.tree_count,
        workers = config.worker_count,
        "training random forest"
    );
    let forest = RandomForest::fit(
        &train_rows.features,
        &train_rows.labels,
        &config.forest_params(),
    )?;
    let artifact = ModelArtifact::new(forest, config.clone(), dataset.feature_names());

    let report = score(&artifact, &train_rows, &test_rows)?;
    tracing::info!(
        model = %report.model_name,
        train_accuracy = report.train_accuracy,
        test_accuracy = report.test_accuracy,
        "training finished"
    );
    Ok((artifact, report))
}

/// Train, then save the artifact in `registry` under its model name.
///
/// A name collision is logged and leaves `registered` empty; the freshly
/// trained model is still returned.
///
/// # Errors
///
/// Any error from [`train`], or a registry failure other than
/// [`Error::AlreadyExists`].
pub fn train_and_register<L: RegistryLog>(
    dataset: &LabeledDataset,
    config: &TrainConfig,
    registry: &mut ModelRegistry<L>,
) -> Result<TrainingOutcome> {
    let (artifact, report) = train(dataset, config)?;
    let registered = match registry.save_artifact(&artifact) {
        Ok(entry) => Some(entry),
        Err(Error::AlreadyExists(path)) => {
            tracing::warn!(%path, "model not registered");
            None
        }
        Err(e) => return Err(e),
    };

    Ok(TrainingOutcome {
        artifact,
        report,
        registered,
    })
}

/// Score an existing model on both sides of `split`.
///
/// # Errors
///
/// - [`Error::SchemaMismatch`] if the dataset's feature count differs from
///   the model's.
/// - [`Error::InvalidInput`] if the dataset's features are not the model's
///   features in training order.
pub fn evaluate(
    artifact: &ModelArtifact,
    dataset: &LabeledDataset,
    split: &TrainTestSplit,
) -> Result<TrainingReport> {
    let expected = artifact.forest().n_features();
    if dataset.num_features() != expected {
        return Err(Error::SchemaMismatch {
            expected,
            actual: dataset.num_features(),
        });
    }
    let names = dataset.feature_names();
    if let Some((position, (trained, given))) = artifact
        .metadata()
        .feature_names()
        .iter()
        .zip(&names)
        .enumerate()
        .find(|(_, (trained, given))| trained != given)
    {
        return Err(Error::InvalidInput(format!(
            "feature {position} is {given:?}, model {} was trained with {trained:?}",
            artifact.name()
        )));
    }

    let rows = Rows::of(dataset);
    score(artifact, &rows.select(split.train()), &rows.select(split.test()))
}

fn score(artifact: &ModelArtifact, train: &Rows, test: &Rows) -> Result<TrainingReport> {
    let forest = artifact.forest();
    Ok(TrainingReport {
        model_name: artifact.name().to_string(),
        train_samples: train.labels.len(),
        test_samples: test.labels.len(),
        train_accuracy: forest.score(&train.features, &train.labels)?,
        test_accuracy: forest.score(&test.features, &test.labels)?,
    })
}
