//! End-to-end run: load, align, train or load, score, rank
//!
//! ```text
//! clinical.tsv ─┐
//!               ├─ align ─> labeled ─ split ─┬─ train ─> register ─┐
//! expr.tsv ─────┘                            └─ load #N ───────────┴─> score ─> top-K
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::align::{align, Alignment};
use crate::config::PipelineConfig;
use crate::importance::{top_features, RankedFeature};
use crate::registry::{ModelRegistry, Ordinal, RegistryEntry};
use crate::table::{ClinicalSummary, ClinicalTable, ExpressionTable};
use crate::training::{evaluate, train_and_register, TrainTestSplit, TrainingReport};
use crate::Result;

/// Filtered clinical table written to the processed directory.
pub const PROCESSED_CLINICAL_FILE: &str = "clinical-processed.txt";
/// Labeled expression table written to the processed directory.
pub const PROCESSED_LABELED_FILE: &str = "expression-labeled.txt";

/// Where the model for a run comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RunMode {
    /// Train a new model and register it.
    Train,
    /// Reuse the registered model at this ordinal.
    Load(Ordinal),
}

/// Everything a run produced.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineReport {
    /// Overview of the aligned clinical records
    pub clinical: ClinicalSummary,
    /// Labeled samples after alignment
    pub samples: usize,
    /// Features per sample
    pub features: usize,
    /// Split sizes and accuracies
    pub training: TrainingReport,
    /// Most important features, best first
    pub top_features: Vec<RankedFeature>,
    /// Registry entry of a newly saved model
    pub registered: Option<RegistryEntry>,
    /// Ordinal of a loaded model
    pub loaded: Option<Ordinal>,
}

/// Configured pipeline.
#[derive(Debug, Clone)]
pub struct Pipeline {
    config: PipelineConfig,
}

impl Pipeline {
    /// Create a pipeline.
    #[must_use]
    pub const fn new(config: PipelineConfig) -> Self {
        Self { config }
    }

    /// Pipeline configuration.
    #[must_use]
    pub const fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Load both input tables and align them.
    ///
    /// # Errors
    ///
    /// Returns error if a table cannot be read or an identifier is malformed.
    pub fn prepare(&self) -> Result<Alignment> {
        let data = &self.config.data;
        let clinical = ClinicalTable::load_tsv(&data.clinical, data.clinical_layout)?;
        let expression = ExpressionTable::load_tsv(&data.expression, data.expression_layout)?;
        tracing::info!(
            patients = clinical.len(),
            samples = expression.num_samples(),
            genes = expression.num_genes(),
            "loaded input tables"
        );

        let alignment = align(&clinical, &expression)?;
        if let Some(dir) = &data.processed_dir {
            write_processed(dir, &alignment)?;
        }
        Ok(alignment)
    }

    /// Execute one run.
    ///
    /// # Errors
    ///
    /// Propagates table, alignment, training and registry errors.
    pub fn run(&self, mode: RunMode) -> Result<PipelineReport> {
        let alignment = self.prepare()?;
        let dataset = &alignment.labeled;
        let mut registry = ModelRegistry::open(&self.config.registry.root);

        let (artifact, training, registered, loaded) = match mode {
            RunMode::Train => {
                let outcome = train_and_register(dataset, &self.config.train, &mut registry)?;
                (outcome.artifact, outcome.report, outcome.registered, None)
            }
            RunMode::Load(ordinal) => {
                let artifact = registry.load(ordinal)?;
                let split = TrainTestSplit::new(
                    dataset.num_samples(),
                    self.config.train.test_fraction,
                    self.config.train.split_seed,
                )?;
                let report = evaluate(&artifact, dataset, &split)?;
                (artifact, report, None, Some(ordinal))
            }
        };

        let ranked = top_features(
            &artifact,
            artifact.metadata().feature_names(),
            self.config.report.top_k,
        )?;
        for feature in &ranked {
            tracing::debug!(%feature, "ranked feature");
        }

        Ok(PipelineReport {
            clinical: alignment.clinical.summary(),
            samples: dataset.num_samples(),
            features: dataset.num_features(),
            training,
            top_features: ranked,
            registered,
            loaded,
        })
    }
}

fn write_processed(dir: &Path, alignment: &Alignment) -> Result<()> {
    std::fs::create_dir_all(dir)?;
    alignment.clinical.write_tsv(dir.join(PROCESSED_CLINICAL_FILE))?;
    alignment.labeled.write_tsv(dir.join(PROCESSED_LABELED_FILE))?;
    tracing::info!(dir = %dir.display(), "wrote processed tables");
    Ok(())
}
