//! Gene-expression table backed by an Arrow record batch
//!
//! Schema: `sample: Utf8` followed by one `Float64` column per gene.

use std::io::{Read, Write};
use std::path::Path;
use std::sync::Arc;

use arrow::array::{Array, ArrayRef, BooleanArray, Float64Array, StringArray};
use arrow::compute::filter_record_batch;
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;

use super::labeled::LABEL_COLUMN;
use super::{open, write_batch_tsv, Grid, Layout};
use crate::{Error, Result};

/// Name of the sample identifier column.
pub const SAMPLE_COLUMN: &str = "sample";

/// Non-numeric column naming the measurement subtype of each raw record.
pub const MEASUREMENT_TYPE_COLUMN: &str = "gene";

/// Raw files repeat every sample once per measurement subtype.
pub const SUBTYPE_STRIDE: usize = 3;

/// Position of the consumed subtype (RPKM) inside each block.
pub const SUBTYPE_OFFSET: usize = 2;

/// Expression profiles, one row per sample.
#[derive(Debug, Clone)]
pub struct ExpressionTable {
    batch: RecordBatch,
}

impl ExpressionTable {
    /// Build a table from row-major measurements.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidInput`] if a row's length differs from the gene count.
    pub fn new(sample_ids: Vec<String>, gene_names: Vec<String>, rows: &[Vec<f64>]) -> Result<Self> {
        if sample_ids.len() != rows.len() {
            return Err(Error::InvalidInput(format!(
                "{} sample ids for {} rows",
                sample_ids.len(),
                rows.len()
            )));
        }
        if let Some((i, row)) = rows.iter().enumerate().find(|(_, r)| r.len() != gene_names.len()) {
            return Err(Error::InvalidInput(format!(
                "sample {} has {} values, expected {}",
                sample_ids[i],
                row.len(),
                gene_names.len()
            )));
        }

        let mut fields = Vec::with_capacity(gene_names.len() + 1);
        fields.push(Field::new(SAMPLE_COLUMN, DataType::Utf8, false));
        fields.extend(
            gene_names
                .iter()
                .map(|name| Field::new(name.as_str(), DataType::Float64, false)),
        );

        let mut columns: Vec<ArrayRef> = Vec::with_capacity(gene_names.len() + 1);
        columns.push(Arc::new(StringArray::from(sample_ids)));
        for gene in 0..gene_names.len() {
            let values: Float64Array = rows.iter().map(|row| Some(row[gene])).collect();
            columns.push(Arc::new(values));
        }

        let batch = RecordBatch::try_new(Arc::new(Schema::new(fields)), columns)?;
        Ok(Self { batch })
    }

    /// Wrap an existing record batch.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidInput`] unless the first column is a non-null
    /// `Utf8` sample column and every other column is `Float64`.
    pub fn from_batch(batch: RecordBatch) -> Result<Self> {
        validate_schema(&batch, 0)?;
        Ok(Self { batch })
    }

    /// Load an expression TSV file.
    ///
    /// # Errors
    ///
    /// Returns error if the file cannot be read or holds non-numeric measurements.
    pub fn load_tsv<P: AsRef<Path>>(path: P, layout: Layout) -> Result<Self> {
        Self::from_reader(open(path.as_ref())?, layout)
    }

    /// Parse an expression table from any TSV reader.
    ///
    /// In [`Layout::Raw`] only every [`SUBTYPE_STRIDE`]th sample column
    /// starting at [`SUBTYPE_OFFSET`] is read; the other subtypes are skipped
    /// while parsing. The [`MEASUREMENT_TYPE_COLUMN`] and the
    /// [`LABEL_COLUMN`] of a labeled output are dropped in both layouts, so
    /// only measurements become features.
    ///
    /// # Errors
    ///
    /// See [`ExpressionTable::load_tsv`].
    pub fn from_reader<R: Read>(reader: R, layout: Layout) -> Result<Self> {
        let grid = match layout {
            Layout::Processed => Grid::from_reader(reader)?,
            // Column 0 names the gene; sample columns follow in blocks
            Layout::Raw => Grid::from_reader_columns(reader, |column| {
                column == 0
                    || (column > SUBTYPE_OFFSET
                        && (column - 1 - SUBTYPE_OFFSET) % SUBTYPE_STRIDE == 0)
            })?,
        };
        let (header, rows) = grid.oriented(layout).into_header_and_records();

        let keep: Vec<usize> = header
            .iter()
            .enumerate()
            .skip(1)
            .filter(|(_, name)| !matches!(name.as_str(), MEASUREMENT_TYPE_COLUMN | LABEL_COLUMN))
            .map(|(i, _)| i)
            .collect();
        let gene_names: Vec<String> = keep.iter().map(|&i| header[i].clone()).collect();

        let mut sample_ids = Vec::with_capacity(rows.len());
        let mut values = Vec::with_capacity(rows.len());
        for row in &rows {
            let sample = row[0].clone();
            let measurements = keep
                .iter()
                .map(|&i| {
                    row[i].trim().parse::<f64>().map_err(|_| {
                        Error::ParseError(format!(
                            "sample {sample}, gene {}: not a number: {:?}",
                            header[i], row[i]
                        ))
                    })
                })
                .collect::<Result<Vec<f64>>>()?;
            sample_ids.push(sample);
            values.push(measurements);
        }

        tracing::debug!(
            samples = sample_ids.len(),
            genes = gene_names.len(),
            "loaded expression table"
        );
        Self::new(sample_ids, gene_names, &values)
    }

    /// Underlying record batch.
    #[must_use]
    pub const fn batch(&self) -> &RecordBatch {
        &self.batch
    }

    /// Number of samples.
    #[must_use]
    pub fn num_samples(&self) -> usize {
        self.batch.num_rows()
    }

    /// Number of genes.
    #[must_use]
    pub fn num_genes(&self) -> usize {
        self.batch.num_columns() - 1
    }

    /// Gene names in column order.
    #[must_use]
    pub fn gene_names(&self) -> Vec<String> {
        self.batch
            .schema()
            .fields()
            .iter()
            .skip(1)
            .map(|f| f.name().clone())
            .collect()
    }

    /// Sample identifier column.
    #[must_use]
    pub fn samples(&self) -> &StringArray {
        sample_column(&self.batch)
    }

    /// Measurements of one sample, in gene order.
    ///
    /// # Panics
    ///
    /// Panics if `row` is out of bounds.
    #[must_use]
    pub fn row(&self, row: usize) -> Vec<f64> {
        float_columns(&self.batch, 1..self.batch.num_columns())
            .map(|column| column.value(row))
            .collect()
    }

    /// Rows where `mask` is true, in order.
    ///
    /// # Errors
    ///
    /// Returns error if the mask length differs from the sample count.
    pub fn filter(&self, mask: &BooleanArray) -> Result<Self> {
        Ok(Self {
            batch: filter_record_batch(&self.batch, mask)?,
        })
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
        write_batch_tsv(&self.batch, writer)
    }
}

/// Check that `batch` is a sample column followed by `Float64` columns, with
/// `trailing` extra columns at the end left unchecked.
pub(super) fn validate_schema(batch: &RecordBatch, trailing: usize) -> Result<()> {
    let schema = batch.schema();
    let fields = schema.fields();
    if fields.is_empty() || fields.len() < trailing + 1 {
        return Err(Error::InvalidInput("expression batch has no sample column".to_string()));
    }
    if fields[0].data_type() != &DataType::Utf8 || batch.column(0).null_count() > 0 {
        return Err(Error::InvalidInput(format!(
            "first column must be non-null Utf8 sample ids, got {:?}",
            fields[0].data_type()
        )));
    }
    if let Some(field) = fields[1..fields.len() - trailing]
        .iter()
        .find(|f| f.data_type() != &DataType::Float64)
    {
        return Err(Error::InvalidInput(format!(
            "gene column {} must be Float64, got {:?}",
            field.name(),
            field.data_type()
        )));
    }
    Ok(())
}

/// Sample column of a validated batch.
pub(super) fn sample_column(batch: &RecordBatch) -> &StringArray {
    batch
        .column(0)
        .as_any()
        .downcast_ref::<StringArray>()
        .unwrap_or_else(|| unreachable!("sample column validated as Utf8"))
}

/// Gene columns of a validated batch.
pub(super) fn float_columns(
    batch: &RecordBatch,
    range: std::ops::Range<usize>,
) -> impl Iterator<Item = &Float64Array> {
    range.map(move |i| {
        batch
            .column(i)
            .as_any()
            .downcast_ref::<Float64Array>()
            .unwrap_or_else(|| unreachable!("gene column validated as Float64"))
    })
}
