//! Tab-separated table loading and writing
//!
//! Two layouts exist for both input files:
//! - **Raw**: one attribute (or gene) per row, one patient (or sample) per
//!   column. Rows and columns are swapped on load.
//! - **Processed**: one patient (or sample) per row, as written by
//!   [`ClinicalTable::write_tsv`] and [`ExpressionTable::write_tsv`].
//!
//! The first cell of every record is its identifier.

mod clinical;
mod expression;
mod labeled;

pub use clinical::{
    ClinicalRecord, ClinicalSummary, ClinicalTable, VitalStatus, VITAL_STATUS_COLUMN,
    YEARS_TO_BIRTH_COLUMN,
};
pub use expression::{
    ExpressionTable, MEASUREMENT_TYPE_COLUMN, SAMPLE_COLUMN, SUBTYPE_OFFSET, SUBTYPE_STRIDE,
};
pub use labeled::{LabeledDataset, LABEL_COLUMN};

use std::fs::File;
use std::io::{Read, Write};
use std::path::Path;

use arrow::record_batch::RecordBatch;
use arrow::util::display::{ArrayFormatter, FormatOptions};
use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// On-disk orientation of a table file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Layout {
    /// Records as columns (as downloaded); transposed on load.
    Raw,
    /// Records as rows.
    #[default]
    Processed,
}

/// Rectangular grid of cells read from a TSV file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Grid {
    rows: Vec<Vec<String>>,
}

impl Grid {
    /// Read a TSV grid. Every row must have the same number of cells.
    pub(crate) fn from_reader<R: Read>(reader: R) -> Result<Self> {
        Self::from_reader_columns(reader, |_| true)
    }

    /// Read a TSV grid keeping only the columns for which `keep` holds.
    ///
    /// Row widths are checked against the full record, before selection.
    pub(crate) fn from_reader_columns<R: Read>(
        reader: R,
        keep: impl Fn(usize) -> bool,
    ) -> Result<Self> {
        let mut tsv = csv::ReaderBuilder::new()
            .delimiter(b'\t')
            .has_headers(false)
            .quoting(false)
            .flexible(true)
            .from_reader(reader);

        let mut width = None;
        let mut rows: Vec<Vec<String>> = Vec::new();
        for record in tsv.records() {
            let record = record?;
            let expected = *width.get_or_insert(record.len());
            if record.len() != expected {
                return Err(Error::ParseError(format!(
                    "row {} has {} cells, expected {expected}",
                    rows.len() + 1,
                    record.len(),
                )));
            }
            rows.push(
                record
                    .iter()
                    .enumerate()
                    .filter(|(column, _)| keep(*column))
                    .map(|(_, cell)| cell.to_string())
                    .collect(),
            );
        }

        if rows.is_empty() {
            return Err(Error::ParseError("table is empty".to_string()));
        }

        Ok(Self { rows })
    }

    /// Orient the grid so that records are rows.
    pub(crate) fn oriented(self, layout: Layout) -> Self {
        match layout {
            Layout::Processed => self,
            Layout::Raw => self.transposed(),
        }
    }

    fn transposed(self) -> Self {
        let width = self.rows.first().map_or(0, Vec::len);
        let mut columns: Vec<Vec<String>> = vec![Vec::with_capacity(self.rows.len()); width];
        for row in self.rows {
            for (column, cell) in columns.iter_mut().zip(row) {
                column.push(cell);
            }
        }
        Self { rows: columns }
    }

    /// Split into the header row and the record rows.
    pub(crate) fn into_header_and_records(mut self) -> (Vec<String>, Vec<Vec<String>>) {
        let records = self.rows.split_off(1);
        let header = self.rows.pop().unwrap_or_default();
        (header, records)
    }
}

/// Open a file for reading with the path in the error message.
pub(crate) fn open(path: &Path) -> Result<File> {
    File::open(path).map_err(|e| {
        Error::Io(std::io::Error::new(
            e.kind(),
            format!("{}: {e}", path.display()),
        ))
    })
}

/// Write a record batch as a processed-layout TSV (header row, one record per row).
pub(crate) fn write_batch_tsv<W: Write>(batch: &RecordBatch, writer: W) -> Result<()> {
    let mut tsv = csv::WriterBuilder::new()
        .delimiter(b'\t')
        .quote_style(csv::QuoteStyle::Never)
        .from_writer(writer);

    let schema = batch.schema();
    tsv.write_record(schema.fields().iter().map(|field| field.name().as_str()))?;

    let options = FormatOptions::default();
    let formatters = batch
        .columns()
        .iter()
        .map(|column| ArrayFormatter::try_new(column.as_ref(), &options))
        .collect::<std::result::Result<Vec<_>, _>>()?;

    for row in 0..batch.num_rows() {
        tsv.write_record(formatters.iter().map(|f| f.value(row).to_string()))?;
    }

    tsv.flush()?;
    Ok(())
}
