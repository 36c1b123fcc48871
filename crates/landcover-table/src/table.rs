//! Immutable feature vectors and tables.

use std::collections::BTreeMap;
use std::sync::Arc;

use tracing::debug;

use crate::error::TableError;
use crate::label::ClassLabel;
use crate::schema::Schema;

/// One labeled pixel: a value for every schema attribute plus a class label.
///
/// Guaranteed to hold exactly `schema.len()` finite values.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureVector {
    schema: Arc<Schema>,
    values: Box<[f64]>,
    label: ClassLabel,
}

impl FeatureVector {
    /// Create a feature vector, validating it against `schema`.
    ///
    /// # Errors
    ///
    /// | Variant | Condition |
    /// |---|---|
    /// | [`TableError::SchemaMismatch`] | `values.len() != schema.len()` |
    /// | [`TableError::NonFiniteValue`] | any value is NaN or infinite |
    pub fn new(
        schema: Arc<Schema>,
        values: Vec<f64>,
        label: ClassLabel,
    ) -> Result<Self, TableError> {
        if values.len() != schema.len() {
            return Err(TableError::SchemaMismatch {
                expected: schema.len(),
                got: values.len(),
                row_index: 0,
            });
        }
        if let Some(i) = values.iter().position(|v| !v.is_finite()) {
            return Err(TableError::NonFiniteValue {
                attribute: schema.names()[i].clone(),
                value: values[i],
            });
        }
        Ok(Self {
            schema,
            values: values.into_boxed_slice(),
            label,
        })
    }

    /// Return the attribute values in schema order.
    #[must_use]
    pub fn values(&self) -> &[f64] {
        &self.values
    }

    /// Return the class label.
    #[must_use]
    pub fn label(&self) -> ClassLabel {
        self.label
    }

    /// Return the schema this vector was validated against.
    #[must_use]
    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    /// Return the value of the named attribute, if declared.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<f64> {
        self.schema.position(name).map(|i| self.values[i])
    }
}

/// An ordered sequence of [`FeatureVector`]s sharing one [`Schema`].
///
/// Rows with a missing (non-finite) predictor never enter a table: the
/// [`TableBuilder`] drops them at construction.
#[derive(Debug, Clone)]
pub struct FeatureTable {
    schema: Arc<Schema>,
    rows: Vec<FeatureVector>,
}

impl FeatureTable {
    /// Start building a table over `schema`.
    #[must_use]
    pub fn builder(schema: Schema) -> TableBuilder {
        TableBuilder::new(Arc::new(schema))
    }

    /// Create an empty table over `schema`.
    #[must_use]
    pub fn empty(schema: Arc<Schema>) -> Self {
        Self {
            schema,
            rows: Vec::new(),
        }
    }

    /// Assemble a table from already validated vectors.
    ///
    /// # Errors
    ///
    /// Returns [`TableError::ForeignSchema`] if any vector was built against
    /// a schema different from `schema`.
    pub fn from_vectors(
        schema: Arc<Schema>,
        rows: Vec<FeatureVector>,
    ) -> Result<Self, TableError> {
        for (row_index, row) in rows.iter().enumerate() {
            if *row.schema != *schema {
                return Err(TableError::ForeignSchema {
                    expected: schema.to_string(),
                    got: row.schema.to_string(),
                    row_index,
                });
            }
        }
        Ok(Self { schema, rows })
    }

    pub(crate) fn from_parts(schema: Arc<Schema>, rows: Vec<FeatureVector>) -> Self {
        Self { schema, rows }
    }

    /// Return the table schema.
    #[must_use]
    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    /// Return a shared handle to the table schema.
    #[must_use]
    pub fn shared_schema(&self) -> Arc<Schema> {
        Arc::clone(&self.schema)
    }

    /// Return the rows in order.
    #[must_use]
    pub fn rows(&self) -> &[FeatureVector] {
        &self.rows
    }

    /// Return the number of rows.
    #[must_use]
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Return `true` if the table has no rows.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Iterate over the rows.
    pub fn iter(&self) -> std::slice::Iter<'_, FeatureVector> {
        self.rows.iter()
    }

    /// Return the class label of every row, in row order.
    #[must_use]
    pub fn labels(&self) -> Vec<ClassLabel> {
        self.rows.iter().map(FeatureVector::label).collect()
    }

    /// Return the number of rows per class label.
    #[must_use]
    pub fn class_counts(&self) -> BTreeMap<ClassLabel, usize> {
        let mut counts = BTreeMap::new();
        for row in &self.rows {
            *counts.entry(row.label).or_insert(0) += 1;
        }
        counts
    }

    /// Return the distinct class labels in ascending order.
    #[must_use]
    pub fn distinct_labels(&self) -> Vec<ClassLabel> {
        self.class_counts().into_keys().collect()
    }
}

impl<'a> IntoIterator for &'a FeatureTable {
    type Item = &'a FeatureVector;
    type IntoIter = std::slice::Iter<'a, FeatureVector>;

    fn into_iter(self) -> Self::IntoIter {
        self.rows.iter()
    }
}

/// Incremental [`FeatureTable`] construction that drops incomplete rows.
#[derive(Debug)]
pub struct TableBuilder {
    schema: Arc<Schema>,
    rows: Vec<FeatureVector>,
    n_pushed: usize,
    n_dropped: usize,
}

impl TableBuilder {
    fn new(schema: Arc<Schema>) -> Self {
        Self {
            schema,
            rows: Vec::new(),
            n_pushed: 0,
            n_dropped: 0,
        }
    }

    /// Append a row. Returns `false` (and keeps nothing) when any value is
    /// missing, i.e. NaN or infinite.
    ///
    /// # Errors
    ///
    /// Returns [`TableError::SchemaMismatch`] when `values.len()` differs
    /// from the schema length.
    pub fn push(&mut self, values: Vec<f64>, label: ClassLabel) -> Result<bool, TableError> {
        let row_index = self.n_pushed;
        self.n_pushed += 1;
        if values.len() != self.schema.len() {
            return Err(TableError::SchemaMismatch {
                expected: self.schema.len(),
                got: values.len(),
                row_index,
            });
        }
        if values.iter().any(|v| !v.is_finite()) {
            self.n_dropped += 1;
            return Ok(false);
        }
        self.rows.push(FeatureVector {
            schema: Arc::clone(&self.schema),
            values: values.into_boxed_slice(),
            label,
        });
        Ok(true)
    }

    /// Append a row whose cells may be absent. `None` counts as missing.
    ///
    /// # Errors
    ///
    /// Returns [`TableError::SchemaMismatch`] when `values.len()` differs
    /// from the schema length.
    pub fn push_optional(
        &mut self,
        values: &[Option<f64>],
        label: ClassLabel,
    ) -> Result<bool, TableError> {
        let dense = values.iter().map(|v| v.unwrap_or(f64::NAN)).collect();
        self.push(dense, label)
    }

    /// Return how many rows have been dropped so far.
    #[must_use]
    pub fn n_dropped(&self) -> usize {
        self.n_dropped
    }

    /// Finish building.
    #[must_use]
    pub fn build(self) -> FeatureTable {
        debug!(
            n_rows = self.rows.len(),
            n_dropped = self.n_dropped,
            "feature table built"
        );
        FeatureTable {
            schema: self.schema,
            rows: self.rows,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn schema() -> Schema {
        Schema::new(["B4", "B8"]).unwrap()
    }

    #[test]
    fn builder_keeps_complete_rows() {
        let mut builder = FeatureTable::builder(schema());
        assert!(builder.push(vec![0.1, 0.4], ClassLabel::new(10)).unwrap());
        assert!(builder.push(vec![0.3, 0.2], ClassLabel::new(40)).unwrap());
        let table = builder.build();
        assert_eq!(table.len(), 2);
        assert_eq!(table.rows()[1].label(), ClassLabel::new(40));
        assert_eq!(table.rows()[0].get("B8"), Some(0.4));
    }

    #[test]
    fn builder_drops_missing_values() {
        let mut builder = FeatureTable::builder(schema());
        assert!(!builder.push(vec![f64::NAN, 0.4], ClassLabel::new(10)).unwrap());
        assert!(!builder.push_optional(&[Some(0.2), None], ClassLabel::new(10)).unwrap());
        assert!(builder.push_optional(&[Some(0.2), Some(0.5)], ClassLabel::new(10)).unwrap());
        assert_eq!(builder.n_dropped(), 2);
        assert_eq!(builder.build().len(), 1);
    }

    #[test]
    fn builder_rejects_wrong_width() {
        let mut builder = FeatureTable::builder(schema());
        builder.push(vec![0.1, 0.2], ClassLabel::new(10)).unwrap();
        let err = builder.push(vec![0.1], ClassLabel::new(10)).unwrap_err();
        assert!(matches!(
            err,
            TableError::SchemaMismatch { expected: 2, got: 1, row_index: 1 }
        ));
    }

    #[test]
    fn vector_rejects_non_finite() {
        let err = FeatureVector::new(Arc::new(schema()), vec![1.0, f64::INFINITY], ClassLabel::new(10))
            .unwrap_err();
        assert!(matches!(err, TableError::NonFiniteValue { attribute, .. } if attribute == "B8"));
    }

    #[test]
    fn from_vectors_rejects_foreign_schema() {
        let other = Arc::new(Schema::new(["B8", "B4"]).unwrap());
        let row = FeatureVector::new(Arc::clone(&other), vec![1.0, 2.0], ClassLabel::new(10)).unwrap();
        let err = FeatureTable::from_vectors(Arc::new(schema()), vec![row]).unwrap_err();
        assert!(matches!(err, TableError::ForeignSchema { row_index: 0, .. }));
    }

    #[test]
    fn class_counts_sorted_by_label() {
        let mut builder = FeatureTable::builder(schema());
        for code in [40, 10, 40, 80] {
            builder.push(vec![0.0, 0.0], ClassLabel::new(code)).unwrap();
        }
        let table = builder.build();
        let counts: Vec<(i32, usize)> = table
            .class_counts()
            .into_iter()
            .map(|(l, n)| (l.code(), n))
            .collect();
        assert_eq!(counts, vec![(10, 1), (40, 2), (80, 1)]);
        assert_eq!(
            table.distinct_labels(),
            vec![ClassLabel::new(10), ClassLabel::new(40), ClassLabel::new(80)]
        );
    }
}
