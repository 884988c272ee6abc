//! Clinical / expression alignment and labeling
//!
//! Two filtering passes reconcile the tables:
//!
//! ```text
//! expression ids ──normalize──> E
//! clinical ∩ E                 = filtered clinical set (C')
//! expression ∩ ids(C')         = labeled samples
//! ```
//!
//! After both passes every labeled sample has exactly one clinical record and
//! every retained clinical record labels at least one sample.

use arrow::array::BooleanArray;
use rustc_hash::FxHashSet;

use crate::identifier::PatientId;
use crate::table::{ClinicalTable, ExpressionTable, LabeledDataset};
use crate::Result;

/// Result of [`align`].
#[derive(Debug, Clone)]
pub struct Alignment {
    /// Clinical records with at least one matching expression profile, in
    /// input order.
    pub clinical: ClinicalTable,
    /// Matching expression profiles with their `label`, in input order.
    pub labeled: LabeledDataset,
}

/// Reconcile a clinical table and an expression table into a labeled dataset.
///
/// Rows without a counterpart on the other side are dropped on both sides.
/// Output order follows the expression table.
///
/// # Errors
///
/// Returns [`crate::Error::MalformedIdentifier`] if any sample identifier is
/// shorter than the patient prefix. Inputs are never modified.
///
/// # Examples
///
/// ```rust
/// use vital_forest::align::align;
/// use vital_forest::table::{ClinicalTable, ExpressionTable, Layout};
///
/// let clinical = ClinicalTable::from_reader(
///     "patient\tvital_status\ntcga-aa-0001\t1\ntcga-aa-0009\t0\n".as_bytes(),
///     Layout::Processed,
/// )?;
/// let expression = ExpressionTable::from_reader(
///     "sample\tTP53\nTCGA-AA-0001-01A\t2.5\nTCGA-AA-0002-01A\t1.5\n".as_bytes(),
///     Layout::Processed,
/// )?;
///
/// let alignment = align(&clinical, &expression)?;
/// assert_eq!(alignment.clinical.len(), 1);
/// assert_eq!(alignment.labeled.labels(), vec![1]);
/// # Ok::<(), vital_forest::Error>(())
/// ```
pub fn align(clinical: &ClinicalTable, expression: &ExpressionTable) -> Result<Alignment> {
    let sample_patients = expression
        .samples()
        .iter()
        .map(|sample| PatientId::parse(sample.unwrap_or_default()))
        .collect::<Result<Vec<PatientId>>>()?;

    // Pass 1: clinical records that have at least one sample
    let expressed: FxHashSet<&PatientId> = sample_patients.iter().collect();
    let filtered = clinical.filtered(|record| expressed.contains(record.patient_id()));

    // Pass 2: samples whose patient survived pass 1
    let mut mask = Vec::with_capacity(sample_patients.len());
    let mut labels = Vec::with_capacity(sample_patients.len());
    for patient in &sample_patients {
        match filtered.get(patient) {
            Some(record) => {
                mask.push(true);
                labels.push(record.vital_status());
            }
            None => mask.push(false),
        }
    }

    let matched = expression.filter(&BooleanArray::from(mask))?;
    let labeled = LabeledDataset::from_expression(&matched, &labels)?;

    tracing::info!(
        clinical_in = clinical.len(),
        clinical_kept = filtered.len(),
        samples_in = expression.num_samples(),
        samples_kept = labeled.num_samples(),
        "aligned clinical and expression tables"
    );

    Ok(Alignment {
        clinical: filtered,
        labeled,
    })
}
