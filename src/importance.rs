//! Feature importance ranking

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::artifact::ModelArtifact;
use crate::topk::select_top_k;
use crate::{Error, Result};

/// Number of features reported when the caller does not choose.
pub const DEFAULT_TOP_K: usize = 50;

/// One row of a feature ranking.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankedFeature {
    /// 1-based rank
    pub rank: usize,
    /// Column index in the training data
    pub index: usize,
    /// Feature (gene) name
    pub name: String,
    /// Importance score
    pub importance: f64,
}

impl fmt::Display for RankedFeature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}. feature {} {} ({:.6})",
            self.rank, self.index, self.name, self.importance
        )
    }
}

/// The `k` most important features of a trained model.
///
/// # Errors
///
/// Returns [`Error::SchemaMismatch`] if `feature_names` does not have one
/// entry per model feature, and [`Error::InvalidInput`] if `k` is zero.
pub fn top_features<S: AsRef<str>>(
    artifact: &ModelArtifact,
    feature_names: &[S],
    k: usize,
) -> Result<Vec<RankedFeature>> {
    rank_importances(artifact.forest().feature_importances(), feature_names, k)
}

/// Rank raw importance scores, highest first, ties by feature index.
///
/// # Errors
///
/// See [`top_features`].
///
/// # Examples
///
/// ```rust
/// use vital_forest::importance::rank_importances;
///
/// let ranked = rank_importances(&[0.5, 0.9, 0.3], &["a", "b", "c"], 2)?;
/// assert_eq!(ranked[0].name, "b");
/// assert_eq!(ranked[1].to_string(), "2. feature 0 a (0.500000)");
/// # Ok::<(), vital_forest::Error>(())
/// ```
pub fn rank_importances<S: AsRef<str>>(
    importances: &[f64],
    feature_names: &[S],
    k: usize,
) -> Result<Vec<RankedFeature>> {
    if feature_names.len() != importances.len() {
        return Err(Error::SchemaMismatch {
            expected: importances.len(),
            actual: feature_names.len(),
        });
    }
    if k == 0 {
        return Err(Error::InvalidInput("k must be greater than 0".to_string()));
    }

    Ok(select_top_k(importances, k)
        .into_iter()
        .enumerate()
        .map(|(position, index)| RankedFeature {
            rank: position + 1,
            index,
            name: feature_names[index].as_ref().to_string(),
            importance: importances[index],
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_highest_first() {
        let names = ["g0", "g1", "g2"];
        let ranked = rank_importances(&[0.5, 0.9, 0.3], &names, 2).unwrap();
        let rows: Vec<(usize, &str, f64)> = ranked
            .iter()
            .map(|r| (r.rank, r.name.as_str(), r.importance))
            .collect();
        assert_eq!(rows, vec![(1, "g1", 0.9), (2, "g0", 0.5)]);
    }

    #[test]
    fn test_k_beyond_feature_count() {
        let ranked = rank_importances(&[0.1, 0.2], &["a", "b"], 50).unwrap();
        assert_eq!(ranked.len(), 2);
    }

    #[test]
    fn test_name_count_mismatch() {
        let err = rank_importances(&[0.1, 0.2], &["a"], 1).unwrap_err();
        assert!(matches!(
            err,
            Error::SchemaMismatch {
                expected: 2,
                actual: 1
            }
        ));
    }

    #[test]
    fn test_zero_k() {
        let err = rank_importances(&[0.1], &["a"], 0).unwrap_err();
        assert!(matches!(err, Error::InvalidInput(_)));
    }

    #[test]
    fn test_display() {
        let feature = RankedFeature {
            rank: 1,
            index: 17,
            name: "TP53|7157".to_string(),
            importance: 0.012_345_67,
        };
        assert_eq!(feature.to_string(), "1. feature 17 TP53|7157 (0.012346)");
    }
}
