//! Expression profiles labeled with the owning patient's vital status

use std::io::Write;
use std::path::Path;
use std::sync::Arc;

use arrow::array::{Array, ArrayRef, Int32Array, StringArray};
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;

use super::expression::{float_columns, sample_column};
use super::{write_batch_tsv, ExpressionTable, VitalStatus};
use crate::{Error, Result};

/// Name of the appended label column.
pub const LABEL_COLUMN: &str = "label";

/// Labeled training data: the expression schema plus a trailing `label: Int32`.
///
/// Only produced by [`crate::align::align`].
#[derive(Debug, Clone)]
pub struct LabeledDataset {
    batch: RecordBatch,
}

impl LabeledDataset {
    /// Append a label column to an expression table.
    pub(crate) fn from_expression(
        expression: &ExpressionTable,
        labels: &[VitalStatus],
    ) -> Result<Self> {
        if labels.len() != expression.num_samples() {
            return Err(Error::InvalidInput(format!(
                "{} labels for {} samples",
                labels.len(),
                expression.num_samples()
            )));
        }

        let source = expression.batch();
        let mut fields: Vec<Arc<Field>> = source.schema().fields().iter().cloned().collect();
        fields.push(Arc::new(Field::new(LABEL_COLUMN, DataType::Int32, false)));

        let label_values: Int32Array = labels
            .iter()
            .map(|status| Some(i32::from(*status == VitalStatus::Deceased)))
            .collect();
        let mut columns: Vec<ArrayRef> = source.columns().to_vec();
        columns.push(Arc::new(label_values));

        let batch = RecordBatch::try_new(Arc::new(Schema::new(fields)), columns)?;
        Ok(Self { batch })
    }

    /// Underlying record batch.
    #[must_use]
    pub const fn batch(&self) -> &RecordBatch {
        &self.batch
    }

    /// Number of labeled samples.
    #[must_use]
    pub fn num_samples(&self) -> usize {
        self.batch.num_rows()
    }

    /// True if no sample survived alignment.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.batch.num_rows() == 0
    }

    /// Number of gene features.
    #[must_use]
    pub fn num_features(&self) -> usize {
        self.batch.num_columns() - 2
    }

    /// Gene names in feature order.
    #[must_use]
    pub fn feature_names(&self) -> Vec<String> {
        let schema = self.batch.schema();
        let fields = schema.fields();
        fields[1..fields.len() - 1]
            .iter()
            .map(|f| f.name().clone())
            .collect()
    }

    /// Sample identifier column.
    #[must_use]
    pub fn samples(&self) -> &StringArray {
        sample_column(&self.batch)
    }

    /// Class labels (0 = living, 1 = deceased), in row order.
    #[must_use]
    pub fn labels(&self) -> Vec<usize> {
        self.label_column()
            .values()
            .iter()
            .map(|&v| usize::from(v == 1))
            .collect()
    }

    /// Row-major feature matrix.
    #[must_use]
    pub fn features(&self) -> Vec<Vec<f64>> {
        let mut rows = vec![Vec::with_capacity(self.num_features()); self.num_samples()];
        for column in float_columns(&self.batch, 1..self.batch.num_columns() - 1) {
            for (row, value) in rows.iter_mut().zip(column.values().iter()) {
                row.push(*value);
            }
        }
        rows
    }

    /// Drop the label column, giving back an expression table.
    ///
    /// # Errors
    ///
    /// Returns error if the projection fails.
    pub fn to_expression_table(&self) -> Result<ExpressionTable> {
        let indices: Vec<usize> = (0..self.batch.num_columns() - 1).collect();
        ExpressionTable::from_batch(self.batch.project(&indices)?)
    }

    /// Write the labeled table in processed layout.
    ///
    /// # Errors
    ///
    /// Returns error if the file cannot be written.
    pub fn write_tsv<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        self.write_to(std::fs::File::create(path.as_ref())?)
    }

    /// Write the labeled table in processed layout to any writer.
    ///
    /// # Errors
    ///
    /// Returns error on write failure.
    pub fn write_to<W: Write>(&self, writer: W) -> Result<()> {
        write_batch_tsv(&self.batch, writer)
    }

    fn label_column(&self) -> &Int32Array {
        self.batch
            .column(self.batch.num_columns() - 1)
            .as_any()
            .downcast_ref::<Int32Array>()
            .unwrap_or_else(|| unreachable!("label column is built as Int32"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dataset() -> LabeledDataset {
        let expression = ExpressionTable::new(
            vec!["s-0000000001".into(), "s-0000000002".into()],
            vec!["g1".into(), "g2".into()],
            &[vec![1.5, 2.5], vec![3.5, 4.5]],
        )
        .unwrap();
        LabeledDataset::from_expression(&expression, &[VitalStatus::Living, VitalStatus::Deceased])
            .unwrap()
    }

    #[test]
    fn test_accessors() {
        let data = dataset();
        assert_eq!(data.num_samples(), 2);
        assert_eq!(data.num_features(), 2);
        assert_eq!(data.feature_names(), vec!["g1", "g2"]);
        assert_eq!(data.labels(), vec![0, 1]);
        assert_eq!(data.features(), vec![vec![1.5, 2.5], vec![3.5, 4.5]]);
        assert_eq!(data.samples().value(1), "s-0000000002");
    }

    #[test]
    fn test_label_count_mismatch() {
        let expression =
            ExpressionTable::new(vec!["s".into()], vec!["g".into()], &[vec![1.0]]).unwrap();
        assert!(LabeledDataset::from_expression(&expression, &[]).is_err());
    }

    #[test]
    fn test_to_expression_table() {
        let back = dataset().to_expression_table().unwrap();
        assert_eq!(back.gene_names(), vec!["g1", "g2"]);
        assert_eq!(back.row(1), vec![3.5, 4.5]);
    }

    #[test]
    fn test_write_includes_label() {
        let mut out = Vec::new();
        dataset().write_to(&mut out).unwrap();
        let text = String::from_utf8(out).unwrap();
        assert_eq!(
            text,
            "sample\tg1\tg2\tlabel\ns-0000000001\t1.5\t2.5\t0\ns-0000000002\t3.5\t4.5\t1\n"
        );
    }
}
