//! Patient identifier normalization
//!
//! Sample barcodes encode the owning patient in their first 12 characters
//! (`TCGA-3C-AAAU-01A-11R-A41B-07` belongs to `tcga-3c-aaau`). Clinical files
//! carry the lowercase patient form, expression files the uppercase sample form.
//! Both are reduced to the same key by truncating first and case-folding second.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// Length of the patient-level prefix shared by all samples of one patient.
pub const PATIENT_ID_LEN: usize = 12;

/// Canonicalize a raw sample or patient identifier.
///
/// Takes the first [`PATIENT_ID_LEN`] characters, then lowercases them.
///
/// # Errors
///
/// Returns [`Error::MalformedIdentifier`] if `raw_id` has fewer than
/// [`PATIENT_ID_LEN`] characters.
///
/// # Examples
///
/// ```rust
/// use vital_forest::identifier::normalize;
///
/// assert_eq!(normalize("TCGA-3C-AAAU-01A-11R-A41B-07")?, "tcga-3c-aaau");
/// assert!(normalize("TCGA-3C").is_err());
/// # Ok::<(), vital_forest::Error>(())
/// ```
pub fn normalize(raw_id: &str) -> Result<String> {
    let prefix: String = raw_id.chars().take(PATIENT_ID_LEN).collect();
    if prefix.chars().count() < PATIENT_ID_LEN {
        return Err(Error::MalformedIdentifier {
            id: raw_id.to_string(),
            expected: PATIENT_ID_LEN,
        });
    }
    Ok(prefix.to_lowercase())
}

/// Canonical patient identifier.
///
/// Constructed once when a table is loaded so joins compare already-normalized
/// keys. Parsing is idempotent on canonical input.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct PatientId(String);

impl PatientId {
    /// Parse a raw sample or patient identifier into its canonical form.
    ///
    /// # Errors
    ///
    /// Returns [`Error::MalformedIdentifier`] for identifiers shorter than
    /// [`PATIENT_ID_LEN`] characters.
    pub fn parse(raw: &str) -> Result<Self> {
        normalize(raw).map(Self)
    }

    /// Canonical string form.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PatientId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for PatientId {
    type Error = Error;

    fn try_from(value: String) -> Result<Self> {
        Self::parse(&value)
    }
}

impl From<PatientId> for String {
    fn from(id: PatientId) -> Self {
        id.0
    }
}
