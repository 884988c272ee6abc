//! Configuration
//!
//! [`TrainConfig`] is the explicit training configuration handed to the
//! trainer. [`PipelineConfig`] is the full run configuration, read from TOML:
//!
//! ```toml
//! [data]
//! clinical = "dataset/20160128-BRCA-Clinical.txt"
//! clinical_layout = "raw"
//! expression = "dataset_proc/20160128-BRCA-RNAseqGene-processed.txt"
//! expression_layout = "processed"
//! processed_dir = "dataset_proc"
//!
//! [registry]
//! root = "models/models_random_forest"
//!
//! [train]
//! tree_count = 500
//! feature_fraction = 0.25
//! split_criterion = "entropy"
//!
//! [report]
//! top_k = 50
//! ```

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::forest::{ForestParams, SplitCriterion};
use crate::importance::DEFAULT_TOP_K;
use crate::table::Layout;
use crate::{Error, Result};

/// Environment variable naming the configuration file.
pub const CONFIG_ENV_VAR: &str = "VITAL_FOREST_CONFIG";

/// Configuration file used when neither an argument nor the env var is set.
pub const DEFAULT_CONFIG_FILE: &str = "vital-forest.toml";

const DEFAULT_TREE_COUNT: usize = 500;
const DEFAULT_FEATURE_FRACTION: f64 = 0.25;
const DEFAULT_TEST_FRACTION: f64 = 0.25;
const WORKERS_PER_CPU: usize = 3;

/// Default parallelism: three workers per available CPU.
#[must_use]
pub fn default_worker_count() -> usize {
    std::thread::available_parallelism().map_or(1, std::num::NonZeroUsize::get) * WORKERS_PER_CPU
}

/// Training configuration.
///
/// The model name (and so the registry directory) is derived from
/// `tree_count`, `feature_fraction`, `split_criterion` and `worker_count`
/// only; seeds and the split ratio do not participate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrainConfig {
    /// Number of trees in the forest
    pub tree_count: usize,
    /// Per-split feature sampling fraction, in (0, 1]
    pub feature_fraction: f64,
    /// Impurity measure
    pub split_criterion: SplitCriterion,
    /// Tree-building threads
    pub worker_count: usize,
    /// Held-out fraction of the labeled samples, in (0, 1)
    pub test_fraction: f64,
    /// Seed for the train/test split; `None` draws from OS entropy
    pub split_seed: Option<u64>,
    /// Seed for bootstrap and feature sampling inside the forest
    pub forest_seed: u64,
}

impl Default for TrainConfig {
    fn default() -> Self {
        Self {
            tree_count: DEFAULT_TREE_COUNT,
            feature_fraction: DEFAULT_FEATURE_FRACTION,
            split_criterion: SplitCriterion::Entropy,
            worker_count: default_worker_count(),
            test_fraction: DEFAULT_TEST_FRACTION,
            split_seed: None,
            forest_seed: 0,
        }
    }
}

impl TrainConfig {
    /// Create a builder starting from the defaults.
    #[must_use]
    pub fn builder() -> TrainConfigBuilder {
        TrainConfigBuilder::default()
    }

    /// Registry name derived from the configuration.
    ///
    /// ```rust
    /// use vital_forest::config::TrainConfig;
    ///
    /// let config = TrainConfig::builder().worker_count(24).build();
    /// assert_eq!(
    ///     config.model_name(),
    ///     "n_estimators=500,max_features=0.25,criterion=entropy,n_jobs=24"
    /// );
    /// ```
    #[must_use]
    pub fn model_name(&self) -> String {
        format!(
            "n_estimators={},max_features={},criterion={},n_jobs={}",
            self.tree_count, self.feature_fraction, self.split_criterion, self.worker_count
        )
    }

    /// Forest hyperparameters.
    #[must_use]
    pub fn forest_params(&self) -> ForestParams {
        ForestParams {
            tree_count: self.tree_count,
            feature_fraction: self.feature_fraction,
            criterion: self.split_criterion,
            worker_count: self.worker_count,
            seed: self.forest_seed,
        }
    }

    /// Check ranges.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidInput`] naming the first out-of-range field.
    pub fn validate(&self) -> Result<()> {
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
        if !(self.test_fraction > 0.0 && self.test_fraction < 1.0) {
            return Err(Error::InvalidInput(format!(
                "test_fraction must be in (0, 1), got {}",
                self.test_fraction
            )));
        }
        Ok(())
    }
}

/// Builder for `TrainConfig`.
#[derive(Debug, Default)]
pub struct TrainConfigBuilder {
    config: TrainConfig,
}

impl TrainConfigBuilder {
    /// Set the number of trees.
    #[must_use]
    pub const fn tree_count(mut self, tree_count: usize) -> Self {
        self.config.tree_count = tree_count;
        self
    }

    /// Set the per-split feature sampling fraction.
    #[must_use]
    pub const fn feature_fraction(mut self, fraction: f64) -> Self {
        self.config.feature_fraction = fraction;
        self
    }

    /// Set the split criterion.
    #[must_use]
    pub const fn split_criterion(mut self, criterion: SplitCriterion) -> Self {
        self.config.split_criterion = criterion;
        self
    }

    /// Set the number of tree-building threads.
    #[must_use]
    pub const fn worker_count(mut self, workers: usize) -> Self {
        self.config.worker_count = workers;
        self
    }

    /// Set the held-out fraction.
    #[must_use]
    pub const fn test_fraction(mut self, fraction: f64) -> Self {
        self.config.test_fraction = fraction;
        self
    }

    /// Fix the train/test split seed.
    #[must_use]
    pub const fn split_seed(mut self, seed: u64) -> Self {
        self.config.split_seed = Some(seed);
        self
    }

    /// Set the forest seed.
    #[must_use]
    pub const fn forest_seed(mut self, seed: u64) -> Self {
        self.config.forest_seed = seed;
        self
    }

    /// Build the `TrainConfig`.
    #[must_use]
    pub fn build(self) -> TrainConfig {
        self.config
    }
}

/// Input tables and processed-output location.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DataConfig {
    /// Clinical TSV file
    pub clinical: PathBuf,
    /// Orientation of the clinical file
    #[serde(default = "default_clinical_layout")]
    pub clinical_layout: Layout,
    /// Expression TSV file
    pub expression: PathBuf,
    /// Orientation of the expression file
    #[serde(default)]
    pub expression_layout: Layout,
    /// Directory for the filtered clinical and labeled tables; not written when unset
    #[serde(default)]
    pub processed_dir: Option<PathBuf>,
}

const fn default_clinical_layout() -> Layout {
    Layout::Raw
}

/// Model registry location.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistryConfig {
    /// Directory holding one subdirectory per model and the index file
    #[serde(default = "default_registry_root")]
    pub root: PathBuf,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            root: default_registry_root(),
        }
    }
}

fn default_registry_root() -> PathBuf {
    PathBuf::from("models/models_random_forest")
}

/// Feature ranking output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportConfig {
    /// Number of features to report
    #[serde(default = "default_top_k")]
    pub top_k: usize,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            top_k: default_top_k(),
        }
    }
}

const fn default_top_k() -> usize {
    DEFAULT_TOP_K
}

/// Full pipeline configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Input tables
    pub data: DataConfig,
    /// Registry location
    #[serde(default)]
    pub registry: RegistryConfig,
    /// Training configuration
    #[serde(default)]
    pub train: TrainConfig,
    /// Feature ranking
    #[serde(default)]
    pub report: ReportConfig,
}

impl PipelineConfig {
    /// Parse a TOML document.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ParseError`] for invalid TOML or missing required
    /// fields, and [`Error::InvalidInput`] for out-of-range training values.
    pub fn from_toml_str(text: &str) -> Result<Self> {
        let config: Self =
            toml::from_str(text).map_err(|e| Error::ParseError(format!("config: {e}")))?;
        config.train.validate()?;
        Ok(config)
    }

    /// Read a TOML file.
    ///
    /// # Errors
    ///
    /// Returns error if the file cannot be read or parsed.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|e| {
            Error::Io(std::io::Error::new(
                e.kind(),
                format!("{}: {e}", path.display()),
            ))
        })?;
        Self::from_toml_str(&text)
    }

    /// Resolve the configuration path: explicit argument, then
    /// [`CONFIG_ENV_VAR`], then [`DEFAULT_CONFIG_FILE`].
    #[must_use]
    pub fn resolve_path(explicit: Option<PathBuf>) -> PathBuf {
        explicit
            .or_else(|| std::env::var_os(CONFIG_ENV_VAR).map(PathBuf::from))
            .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_FILE))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_train_defaults() {
        let config = TrainConfig::default();
        assert_eq!(config.tree_count, 500);
        assert!((config.feature_fraction - 0.25).abs() < f64::EPSILON);
        assert_eq!(config.split_criterion, SplitCriterion::Entropy);
        assert_eq!(config.worker_count % 3, 0);
        assert!(config.split_seed.is_none());
        assert_eq!(config.forest_seed, 0);
    }

    #[test]
    fn test_model_name_ignores_seeds() {
        let a = TrainConfig::builder().worker_count(6).split_seed(1).build();
        let b = TrainConfig::builder().worker_count(6).split_seed(2).build();
        assert_eq!(a.model_name(), b.model_name());
        assert_eq!(
            a.model_name(),
            "n_estimators=500,max_features=0.25,criterion=entropy,n_jobs=6"
        );
    }

    #[test]
    fn test_validate_ranges() {
        assert!(TrainConfig::builder().tree_count(0).build().validate().is_err());
        assert!(TrainConfig::builder().feature_fraction(1.5).build().validate().is_err());
        assert!(TrainConfig::builder().test_fraction(1.0).build().validate().is_err());
        assert!(TrainConfig::default().validate().is_ok());
    }

    #[test]
    fn test_pipeline_config_minimal() {
        let config = PipelineConfig::from_toml_str(
            r#"
            [data]
            clinical = "c.txt"
            expression = "e.txt"
            "#,
        )
        .unwrap();
        assert_eq!(config.data.clinical_layout, Layout::Raw);
        assert_eq!(config.data.expression_layout, Layout::Processed);
        assert_eq!(config.registry.root, PathBuf::from("models/models_random_forest"));
        assert_eq!(config.report.top_k, 50);
        assert_eq!(config.train.tree_count, 500);
    }

    #[test]
    fn test_pipeline_config_overrides() {
        let config = PipelineConfig::from_toml_str(
            r#"
            [data]
            clinical = "c.txt"
            clinical_layout = "processed"
            expression = "e.txt"
            expression_layout = "raw"
            processed_dir = "out"

            [train]
            tree_count = 10
            split_criterion = "gini"
            split_seed = 9

            [report]
            top_k = 5
            "#,
        )
        .unwrap();
        assert_eq!(config.data.processed_dir, Some(PathBuf::from("out")));
        assert_eq!(config.train.tree_count, 10);
        assert_eq!(config.train.split_criterion, SplitCriterion::Gini);
        assert_eq!(config.train.split_seed, Some(9));
        assert!((config.train.feature_fraction - 0.25).abs() < f64::EPSILON);
        assert_eq!(config.report.top_k, 5);
    }

    #[test]
    fn test_pipeline_config_missing_data() {
        let err = PipelineConfig::from_toml_str("[train]\ntree_count = 3\n").unwrap_err();
        assert!(matches!(err, Error::ParseError(_)));
    }

    #[test]
    fn test_pipeline_config_rejects_bad_train_values() {
        let err = PipelineConfig::from_toml_str(
            "[data]\nclinical = \"c\"\nexpression = \"e\"\n[train]\ntree_count = 0\n",
        )
        .unwrap_err();
        assert!(matches!(err, Error::InvalidInput(_)));
    }
}
