use std::borrow::Cow;

use landcover_table::{ClassLabel, FeatureTable, FeatureVector, Schema};

use crate::error::RfError;

/// Column-major training view of a feature table restricted to a predictor
/// list, with labels mapped to dense class indices.
#[derive(Debug)]
pub(crate) struct TrainingData {
    /// `columns[feature][row]`, features in `predictors` order.
    pub(crate) columns: Vec<Vec<f64>>,
    /// Dense class index per row, into `classes`.
    pub(crate) targets: Vec<usize>,
    /// Distinct labels, ascending.
    pub(crate) classes: Vec<ClassLabel>,
    pub(crate) predictors: Schema,
}

impl TrainingData {
    /// Gather `predictors` from `table`.
    ///
    /// # Errors
    ///
    /// | Variant | Condition |
    /// |---|---|
    /// | [`RfError::NoPredictors`] | `predictors` is empty |
    /// | [`RfError::Table`] | a predictor is duplicated or missing from the table |
    /// | [`RfError::EmptyTable`] | `table` has no rows |
    pub(crate) fn new(
        table: &FeatureTable,
        predictors: &[String],
        model: &'static str,
    ) -> Result<Self, RfError> {
        if predictors.is_empty() {
            return Err(RfError::NoPredictors);
        }
        let predictors = Schema::new(predictors.iter().cloned())?;
        let positions = predictors.projection_from(table.schema())?;
        if table.is_empty() {
            return Err(RfError::EmptyTable {
                model,
                n_predictors: predictors.len(),
            });
        }

        let columns = positions
            .iter()
            .map(|&pos| table.iter().map(|row| row.values()[pos]).collect())
            .collect();
        let classes = table.distinct_labels();
        let targets = table
            .iter()
            .map(|row| class_index(&classes, row.label()))
            .collect();

        Ok(Self {
            columns,
            targets,
            classes,
            predictors,
        })
    }

    pub(crate) fn n_rows(&self) -> usize {
        self.targets.len()
    }

    pub(crate) fn n_features(&self) -> usize {
        self.columns.len()
    }

    pub(crate) fn n_classes(&self) -> usize {
        self.classes.len()
    }

    /// Return row `i` in predictor order.
    pub(crate) fn row(&self, i: usize) -> Vec<f64> {
        self.columns.iter().map(|col| col[i]).collect()
    }
}

/// Maps rows of some source schema onto a model's predictor order.
#[derive(Debug, Clone)]
pub(crate) struct Projection {
    /// `None` when the source already matches the predictor order.
    positions: Option<Vec<usize>>,
}

impl Projection {
    /// # Errors
    ///
    /// Returns [`RfError::Table`] wrapping `UnknownAttribute` for the first
    /// predictor `source` lacks.
    pub(crate) fn new(predictors: &Schema, source: &Schema) -> Result<Self, RfError> {
        if predictors == source {
            return Ok(Self { positions: None });
        }
        Ok(Self {
            positions: Some(predictors.projection_from(source)?),
        })
    }

    pub(crate) fn apply<'a>(&self, values: &'a [f64]) -> Cow<'a, [f64]> {
        match &self.positions {
            None => Cow::Borrowed(values),
            Some(positions) => Cow::Owned(positions.iter().map(|&p| values[p]).collect()),
        }
    }
}

/// Values of `vector` in `predictors` order.
///
/// # Errors
///
/// Returns [`RfError::Table`] when `vector` lacks a predictor.
pub(crate) fn project<'a>(
    predictors: &Schema,
    vector: &'a FeatureVector,
) -> Result<Cow<'a, [f64]>, RfError> {
    Ok(Projection::new(predictors, vector.schema())?.apply(vector.values()))
}

/// Position of `label` in the ascending `classes` list.
fn class_index(classes: &[ClassLabel], label: ClassLabel) -> usize {
    // Every label in the table is in `classes` by construction.
    classes.binary_search(&label).unwrap_or_default()
}

/// Index of the largest count; ties go to the lowest index.
pub(crate) fn majority(counts: &[usize]) -> usize {
    let mut best = 0;
    for (i, &c) in counts.iter().enumerate() {
        if c > counts[best] {
            best = i;
        }
    }
    best
}
