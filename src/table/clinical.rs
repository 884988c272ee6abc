//! Clinical attribute table

use std::fmt;
use std::io::{Read, Write};
use std::path::Path;
use std::str::FromStr;

use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

use super::{open, Grid, Layout};
use crate::identifier::PatientId;
use crate::{Error, Result};

/// Column holding the classification target.
pub const VITAL_STATUS_COLUMN: &str = "vital_status";

/// Column holding patient age in years.
pub const YEARS_TO_BIRTH_COLUMN: &str = "years_to_birth";

const GENDER_COLUMN: &str = "gender";

/// Binary clinical outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum VitalStatus {
    /// `"0"` in the clinical file.
    Living,
    /// `"1"` in the clinical file.
    Deceased,
}

impl VitalStatus {
    /// Class label used for training (0 = living, 1 = deceased).
    #[must_use]
    pub const fn label(self) -> usize {
        match self {
            Self::Living => 0,
            Self::Deceased => 1,
        }
    }
}

impl FromStr for VitalStatus {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim() {
            "0" => Ok(Self::Living),
            "1" => Ok(Self::Deceased),
            other => Err(Error::ParseError(format!(
                "invalid {VITAL_STATUS_COLUMN} value {other:?}, expected \"0\" or \"1\""
            ))),
        }
    }
}

impl fmt::Display for VitalStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.label())
    }
}

/// One patient's clinical attributes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClinicalRecord {
    patient_id: PatientId,
    vital_status: VitalStatus,
    years_to_birth: Option<u32>,
    values: Vec<String>,
}

impl ClinicalRecord {
    /// Create a record from its parsed key fields and raw attribute values.
    #[must_use]
    pub fn new(
        patient_id: PatientId,
        vital_status: VitalStatus,
        years_to_birth: Option<u32>,
        values: Vec<String>,
    ) -> Self {
        Self {
            patient_id,
            vital_status,
            years_to_birth,
            values,
        }
    }

    /// Canonical patient identifier.
    #[must_use]
    pub const fn patient_id(&self) -> &PatientId {
        &self.patient_id
    }

    /// Vital status (the training label).
    #[must_use]
    pub const fn vital_status(&self) -> VitalStatus {
        self.vital_status
    }

    /// Age in years, if recorded.
    #[must_use]
    pub const fn years_to_birth(&self) -> Option<u32> {
        self.years_to_birth
    }

    /// Raw attribute values, aligned with [`ClinicalTable::columns`].
    #[must_use]
    pub fn values(&self) -> &[String] {
        &self.values
    }
}

/// Patient-level dataset overview.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClinicalSummary {
    /// Number of attribute columns
    pub features: usize,
    /// Number of patients
    pub patients: usize,
    /// Patients with vital status 0
    pub living: usize,
    /// Patients with vital status 1
    pub deceased: usize,
    /// Median age over patients with a recorded age
    pub age_median: Option<f64>,
    /// Youngest recorded age
    pub age_min: Option<u32>,
    /// Oldest recorded age
    pub age_max: Option<u32>,
    /// Patients whose gender is `male`
    pub male: usize,
    /// Patients whose gender is `female`
    pub female: usize,
}

/// Clinical table: one record per patient.
#[derive(Debug, Clone)]
pub struct ClinicalTable {
    index_name: String,
    columns: Vec<String>,
    records: Vec<ClinicalRecord>,
    by_patient: FxHashMap<PatientId, usize>,
}

impl ClinicalTable {
    /// Build a table from records.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidInput`] if two records share a patient, or a
    /// record's value count differs from the column count.
    pub fn new(
        index_name: impl Into<String>,
        columns: Vec<String>,
        records: Vec<ClinicalRecord>,
    ) -> Result<Self> {
        let mut by_patient = FxHashMap::default();
        for (row, record) in records.iter().enumerate() {
            if record.values.len() != columns.len() {
                return Err(Error::InvalidInput(format!(
                    "patient {} has {} values, expected {}",
                    record.patient_id,
                    record.values.len(),
                    columns.len()
                )));
            }
            if by_patient.insert(record.patient_id.clone(), row).is_some() {
                return Err(Error::InvalidInput(format!(
                    "duplicate clinical record for patient {}",
                    record.patient_id
                )));
            }
        }

        Ok(Self {
            index_name: index_name.into(),
            columns,
            records,
            by_patient,
        })
    }

    /// Load a clinical TSV file.
    ///
    /// # Errors
    ///
    /// Returns error if the file cannot be read, lacks a `vital_status`
    /// column, or holds malformed identifiers or values.
    pub fn load_tsv<P: AsRef<Path>>(path: P, layout: Layout) -> Result<Self> {
        Self::from_reader(open(path.as_ref())?, layout)
    }

    /// Parse a clinical table from any TSV reader.
    ///
    /// # Errors
    ///
    /// See [`ClinicalTable::load_tsv`].
    pub fn from_reader<R: Read>(reader: R, layout: Layout) -> Result<Self> {
        let (header, rows) = Grid::from_reader(reader)?
            .oriented(layout)
            .into_header_and_records();

        let mut header = header.into_iter();
        let index_name = header.next().unwrap_or_default();
        let columns: Vec<String> = header.collect();

        let vital_idx = columns
            .iter()
            .position(|c| c == VITAL_STATUS_COLUMN)
            .ok_or_else(|| {
                Error::ParseError(format!("clinical table has no {VITAL_STATUS_COLUMN} column"))
            })?;
        let age_idx = columns.iter().position(|c| c == YEARS_TO_BIRTH_COLUMN);

        let records = rows
            .into_iter()
            .map(|row| {
                let mut cells = row.into_iter();
                let patient_id = PatientId::parse(&cells.next().unwrap_or_default())?;
                let values: Vec<String> = cells.collect();
                let vital_status = values[vital_idx].parse::<VitalStatus>().map_err(|e| {
                    Error::ParseError(format!("patient {patient_id}: {e}"))
                })?;
                let years_to_birth = age_idx.and_then(|idx| parse_age(&values[idx]));
                Ok(ClinicalRecord::new(
                    patient_id,
                    vital_status,
                    years_to_birth,
                    values,
                ))
            })
            .collect::<Result<Vec<_>>>()?;

        Self::new(index_name, columns, records)
    }

    /// Name of the identifier column.
    #[must_use]
    pub fn index_name(&self) -> &str {
        &self.index_name
    }

    /// Attribute column names.
    #[must_use]
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// Records in table order.
    #[must_use]
    pub fn records(&self) -> &[ClinicalRecord] {
        &self.records
    }

    /// Number of patients.
    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// True if the table has no patients.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Look up a patient's record.
    #[must_use]
    pub fn get(&self, patient_id: &PatientId) -> Option<&ClinicalRecord> {
        self.by_patient.get(patient_id).map(|&row| &self.records[row])
    }

    /// True if the patient has a record.
    #[must_use]
    pub fn contains(&self, patient_id: &PatientId) -> bool {
        self.by_patient.contains_key(patient_id)
    }

    /// Raw value of an attribute for one record.
    #[must_use]
    pub fn attribute<'a>(&self, record: &'a ClinicalRecord, column: &str) -> Option<&'a str> {
        self.columns
            .iter()
            .position(|c| c == column)
            .and_then(|idx| record.values.get(idx))
            .map(String::as_str)
    }

    /// Copy of the table keeping only records that satisfy `keep`, in order.
    #[must_use]
    pub fn filtered<F>(&self, mut keep: F) -> Self
    where
        F: FnMut(&ClinicalRecord) -> bool,
    {
        let records: Vec<ClinicalRecord> =
            self.records.iter().filter(|r| keep(r)).cloned().collect();
        let by_patient = records
            .iter()
            .enumerate()
            .map(|(row, r)| (r.patient_id.clone(), row))
            .collect();
        Self {
            index_name: self.index_name.clone(),
            columns: self.columns.clone(),
            records,
            by_patient,
        }
    }

    /// Counts and age statistics over the table.
    #[must_use]
    pub fn summary(&self) -> ClinicalSummary {
        let mut ages: Vec<u32> = self.records.iter().filter_map(|r| r.years_to_birth).collect();
        ages.sort_unstable();

        let living = self
            .records
            .iter()
            .filter(|r| r.vital_status == VitalStatus::Living)
            .count();

        let gender_count = |wanted: &str| {
            self.records
                .iter()
                .filter(|r| self.attribute(r, GENDER_COLUMN) == Some(wanted))
                .count()
        };

        ClinicalSummary {
            features: self.columns.len(),
            patients: self.records.len(),
            living,
            deceased: self.records.len() - living,
            age_median: median(&ages),
            age_min: ages.first().copied(),
            age_max: ages.last().copied(),
            male: gender_count("male"),
            female: gender_count("female"),
        }
    }

    /// Write the table in processed layout.
    ///
    /// # Errors
    ///
    /// Returns error if the file cannot be written.
    pub fn write_tsv<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        self.write_to(std::fs::File::create(path.as_ref())?)
    }

    /// Write the table in processed layout to any writer.
    ///
    /// # Errors
    ///
    /// Returns error on write failure.
    pub fn write_to<W: Write>(&self, writer: W) -> Result<()> {
        let mut tsv = csv::WriterBuilder::new()
            .delimiter(b'\t')
            .quote_style(csv::QuoteStyle::Never)
            .from_writer(writer);

        tsv.write_record(std::iter::once(&self.index_name).chain(&self.columns))?;
        for record in &self.records {
            tsv.write_record(
                std::iter::once(record.patient_id.as_str())
                    .chain(record.values.iter().map(String::as_str)),
            )?;
        }
        tsv.flush()?;
        Ok(())
    }
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn parse_age(cell: &str) -> Option<u32> {
    let cell = cell.trim();
    // Ages sometimes arrive as floats ("57.0") after a pandas round trip
    cell.parse::<u32>()
        .ok()
        .or_else(|| cell.parse::<f64>().ok().filter(|v| *v >= 0.0).map(|v| v as u32))
}

#[allow(clippy::cast_precision_loss)]
fn median(sorted: &[u32]) -> Option<f64> {
    let n = sorted.len();
    if n == 0 {
        return None;
    }
    if n % 2 == 1 {
        Some(f64::from(sorted[n / 2]))
    } else {
        Some((f64::from(sorted[n / 2 - 1]) + f64::from(sorted[n / 2])) / 2.0)
    }
}
