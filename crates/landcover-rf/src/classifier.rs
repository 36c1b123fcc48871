//! A trained model of either kind behind one prediction interface.

use landcover_table::{ClassLabel, FeatureTable, FeatureVector, Schema};
use rayon::iter::{IntoParallelRefIterator, ParallelIterator};
use tracing::{debug, instrument};

use crate::confusion::ConfusionMatrix;
use crate::dataset::Projection;
use crate::error::RfError;
use crate::explain::ModelExplanation;
use crate::forest::RandomForest;
use crate::tree::DecisionTree;

/// A trained classifier: a single CART tree or a random forest.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub enum Classifier {
    /// A single decision tree.
    Tree(DecisionTree),
    /// A random forest.
    Forest(RandomForest),
}

impl Classifier {
    /// Short name of the model kind.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Classifier::Tree(_) => "decision_tree",
            Classifier::Forest(_) => "random_forest",
        }
    }

    /// Return the predictor schema the model reads.
    #[must_use]
    pub fn predictors(&self) -> &Schema {
        match self {
            Classifier::Tree(tree) => tree.predictors(),
            Classifier::Forest(forest) => forest.predictors(),
        }
    }

    /// Return the training classes, ascending.
    #[must_use]
    pub fn classes(&self) -> &[ClassLabel] {
        match self {
            Classifier::Tree(tree) => tree.classes(),
            Classifier::Forest(forest) => forest.classes(),
        }
    }

    /// Predict the class of `vector`. Extra attributes are ignored.
    ///
    /// # Errors
    ///
    /// Returns [`RfError::Table`] when `vector` lacks a predictor.
    pub fn predict(&self, vector: &FeatureVector) -> Result<ClassLabel, RfError> {
        match self {
            Classifier::Tree(tree) => tree.predict(vector),
            Classifier::Forest(forest) => forest.predict(vector),
        }
    }

    /// Predict from raw values given in predictor order.
    ///
    /// # Errors
    ///
    /// Returns [`RfError::PredictionFeatureMismatch`] on a width mismatch.
    pub fn predict_values(&self, values: &[f64]) -> Result<ClassLabel, RfError> {
        match self {
            Classifier::Tree(tree) => tree.predict_values(values),
            Classifier::Forest(forest) => forest.predict_values(values),
        }
    }

    pub(crate) fn route(&self, values: &[f64]) -> ClassLabel {
        match self {
            Classifier::Tree(tree) => tree.root().route(values),
            Classifier::Forest(forest) => forest.vote(values),
        }
    }

    /// Predict every row of `table`, in row order.
    ///
    /// The predictor lookup is resolved once against the table schema and
    /// rows are classified in parallel.
    ///
    /// # Errors
    ///
    /// Returns [`RfError::Table`] when the table lacks a predictor.
    #[instrument(skip_all, fields(kind = self.kind(), n_rows = table.len()))]
    pub fn predict_table(&self, table: &FeatureTable) -> Result<Vec<ClassLabel>, RfError> {
        let projection = Projection::new(self.predictors(), table.schema())?;
        let predicted: Vec<ClassLabel> = table
            .rows()
            .par_iter()
            .map(|row| self.route(&projection.apply(row.values())))
            .collect();
        debug!(n_predicted = predicted.len(), "table classified");
        Ok(predicted)
    }

    /// Classify `table` and cross-tabulate its labels against the predictions.
    ///
    /// # Errors
    ///
    /// | Variant | Condition |
    /// |---|---|
    /// | [`RfError::Table`] | the table lacks a predictor |
    /// | [`RfError::EmptyLabels`] | the table has no rows |
    pub fn evaluate(&self, table: &FeatureTable) -> Result<ConfusionMatrix, RfError> {
        let predicted = self.predict_table(table)?;
        ConfusionMatrix::from_labels(&table.labels(), &predicted)
    }

    /// Summarize the model structure and predictor importance.
    #[must_use]
    pub fn explain(&self) -> ModelExplanation {
        match self {
            Classifier::Tree(tree) => tree.explain(),
            Classifier::Forest(forest) => forest.explain(),
        }
    }
}

impl From<DecisionTree> for Classifier {
    fn from(tree: DecisionTree) -> Self {
        Classifier::Tree(tree)
    }
}

impl From<RandomForest> for Classifier {
    fn from(forest: RandomForest) -> Self {
        Classifier::Forest(forest)
    }
}
