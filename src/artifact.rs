//! Model artifact - trained forest plus provenance

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::config::TrainConfig;
use crate::forest::RandomForest;

/// Provenance of a trained model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArtifactMetadata {
    name: String,
    created_at: DateTime<Utc>,
    config: TrainConfig,
    feature_names: Vec<String>,
}

impl ArtifactMetadata {
    /// Model name (also its registry directory name).
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Creation timestamp.
    #[must_use]
    pub const fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Configuration the model was trained with.
    #[must_use]
    pub const fn config(&self) -> &TrainConfig {
        &self.config
    }

    /// Feature names in training column order.
    #[must_use]
    pub fn feature_names(&self) -> &[String] {
        &self.feature_names
    }
}

/// Trained classifier with its metadata.
///
/// Owned by the [`crate::registry::ModelRegistry`] once saved.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelArtifact {
    metadata: ArtifactMetadata,
    forest: RandomForest,
}

impl ModelArtifact {
    /// Wrap a fitted forest; the name comes from [`TrainConfig::model_name`]
    /// and the timestamp is now.
    #[must_use]
    pub fn new(forest: RandomForest, config: TrainConfig, feature_names: Vec<String>) -> Self {
        Self {
            metadata: ArtifactMetadata {
                name: config.model_name(),
                created_at: Utc::now(),
                config,
                feature_names,
            },
            forest,
        }
    }

    /// Artifact metadata.
    #[must_use]
    pub const fn metadata(&self) -> &ArtifactMetadata {
        &self.metadata
    }

    /// Model name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.metadata.name
    }

    /// The fitted forest.
    #[must_use]
    pub const fn forest(&self) -> &RandomForest {
        &self.forest
    }

    /// Human-readable provenance line stored next to the model file.
    #[must_use]
    pub fn provenance_note(&self) -> String {
        format!(
            "This {} model is trained on {}",
            self.metadata.name,
            self.metadata.created_at.format("%Y-%m-%d %H:%M:%S%.6f UTC")
        )
    }
}
