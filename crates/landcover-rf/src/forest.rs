//! Random Forest training with parallel tree construction.

use landcover_table::{ClassLabel, FeatureTable, FeatureVector, Schema, derive_seed};
use rand::Rng;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use rayon::iter::{IntoParallelIterator, ParallelIterator};
use tracing::{debug, info, instrument};

use crate::config::{OobMode, RandomForestConfig};
use crate::dataset::{TrainingData, majority, project};
use crate::error::RfError;
use crate::importance::{RankedFeature, rank_features};
use crate::node::DecisionNode;
use crate::oob::compute_oob;
use crate::result::{RandomForestResult, TrainingMetadata};
use crate::tree::{GrowParams, grow, normalize};

/// A fitted Random Forest ensemble.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct RandomForest {
    pub(crate) trees: Vec<DecisionNode>,
    pub(crate) predictors: Schema,
    pub(crate) classes: Vec<ClassLabel>,
    /// Normalized MDI per predictor, in predictor order.
    pub(crate) importances: Vec<f64>,
    /// OOB error, when training ran with OOB enabled.
    pub(crate) oob_error: Option<f64>,
}

impl RandomForest {
    /// Predict the class of `vector` by majority vote, looking predictors
    /// up by name. Ties go to the lowest label.
    ///
    /// # Errors
    ///
    /// Returns [`RfError::Table`] when `vector` lacks a predictor.
    pub fn predict(&self, vector: &FeatureVector) -> Result<ClassLabel, RfError> {
        let values = project(&self.predictors, vector)?;
        Ok(self.vote(&values))
    }

    /// Predict from raw values given in predictor order.
    ///
    /// # Errors
    ///
    /// Returns [`RfError::PredictionFeatureMismatch`] when `values.len()`
    /// differs from the predictor count.
    pub fn predict_values(&self, values: &[f64]) -> Result<ClassLabel, RfError> {
        if values.len() != self.predictors.len() {
            return Err(RfError::PredictionFeatureMismatch {
                expected: self.predictors.len(),
                got: values.len(),
            });
        }
        Ok(self.vote(values))
    }

    /// Per-class vote counts for `values`, aligned with [`Self::classes`].
    ///
    /// # Errors
    ///
    /// Returns [`RfError::PredictionFeatureMismatch`] on a width mismatch.
    pub fn votes(&self, values: &[f64]) -> Result<Vec<usize>, RfError> {
        if values.len() != self.predictors.len() {
            return Err(RfError::PredictionFeatureMismatch {
                expected: self.predictors.len(),
                got: values.len(),
            });
        }
        Ok(self.tally(values))
    }

    pub(crate) fn vote(&self, values: &[f64]) -> ClassLabel {
        self.classes[majority(&self.tally(values))]
    }

    fn tally(&self, values: &[f64]) -> Vec<usize> {
        let mut counts = vec![0usize; self.classes.len()];
        for tree in &self.trees {
            let label = tree.route(values);
            if let Ok(idx) = self.classes.binary_search(&label) {
                counts[idx] += 1;
            }
        }
        counts
    }

    /// Return the number of trees.
    #[must_use]
    pub fn n_trees(&self) -> usize {
        self.trees.len()
    }

    /// Return the root nodes of every tree, in training order.
    #[must_use]
    pub fn trees(&self) -> &[DecisionNode] {
        &self.trees
    }

    /// Return the predictor schema.
    #[must_use]
    pub fn predictors(&self) -> &Schema {
        &self.predictors
    }

    /// Return the training classes, ascending.
    #[must_use]
    pub fn classes(&self) -> &[ClassLabel] {
        &self.classes
    }

    /// Normalized MDI importance per predictor, in predictor order.
    /// Sums to 1 unless no tree ever split.
    #[must_use]
    pub fn feature_importances(&self) -> &[f64] {
        &self.importances
    }

    /// Return the out-of-bag error estimate, if computed during training.
    #[must_use]
    pub fn oob_error(&self) -> Option<f64> {
        self.oob_error
    }

    /// Importances paired with predictor names, most important first.
    #[must_use]
    pub fn ranked_importances(&self) -> Vec<RankedFeature> {
        rank_features(self.predictors.names(), &self.importances)
    }
}

/// Draw `n` row indices with replacement and return them with the rows
/// never drawn.
fn bootstrap_sample(n: usize, rng: &mut impl Rng) -> (Vec<usize>, Vec<usize>) {
    let mut in_bag = vec![false; n];
    let mut bootstrap_indices = Vec::with_capacity(n);
    for _ in 0..n {
        let idx = rng.gen_range(0..n);
        bootstrap_indices.push(idx);
        in_bag[idx] = true;
    }
    let oob_indices: Vec<usize> = (0..n).filter(|&i| !in_bag[i]).collect();
    (bootstrap_indices, oob_indices)
}

/// Train the Random Forest ensemble.
#[instrument(skip_all, fields(n_trees = config.n_trees, n_samples = table.len()))]
pub(crate) fn train(
    config: &RandomForestConfig,
    table: &FeatureTable,
    predictors: &[String],
) -> Result<RandomForestResult, RfError> {
    let data = TrainingData::new(table, predictors, "random forest")?;
    let n_features = data.n_features();
    let max_features_resolved = config.max_features.resolve(n_features)?;
    let params = GrowParams::new(
        config.criterion,
        config.max_depth,
        config.min_samples_split,
        config.min_samples_leaf,
        Some(max_features_resolved),
        n_features,
    )?;

    info!(
        n_trees = config.n_trees,
        n_samples = data.n_rows(),
        n_features,
        n_classes = data.n_classes(),
        max_features = max_features_resolved,
        "training random forest"
    );

    let n_samples = data.n_rows();
    let tree_results: Vec<(DecisionNode, Vec<usize>)> = (0..config.n_trees)
        .into_par_iter()
        .map(|t| {
            let mut rng = ChaCha8Rng::seed_from_u64(derive_seed(config.seed, t as u64));
            let (bootstrap_indices, oob_indices) = bootstrap_sample(n_samples, &mut rng);
            let root = grow(&data, &params, bootstrap_indices, rng.r#gen());
            (root, oob_indices)
        })
        .collect();

    let mut trees = Vec::with_capacity(config.n_trees);
    let mut oob_indices_per_tree = Vec::with_capacity(config.n_trees);
    for (tree, oob) in tree_results {
        trees.push(tree);
        oob_indices_per_tree.push(oob);
    }

    let mut importances = vec![0.0f64; n_features];
    for tree in &trees {
        tree.accumulate_decrease(&mut importances);
    }
    normalize(&mut importances);

    debug!(n_trees_trained = trees.len(), "tree training complete");

    let oob_score = if config.oob_mode == OobMode::Enabled {
        Some(compute_oob(&trees, &data, &oob_indices_per_tree)?)
    } else {
        None
    };

    let metadata = TrainingMetadata {
        n_trees: config.n_trees,
        n_rows: n_samples,
        n_predictors: n_features,
        classes: data.classes.clone(),
        max_features: max_features_resolved,
        criterion: config.criterion,
        seed: config.seed,
        total_nodes: trees.iter().map(DecisionNode::n_nodes).sum(),
        max_tree_depth: trees.iter().map(DecisionNode::depth).max().unwrap_or(0),
    };

    let forest = RandomForest {
        trees,
        predictors: data.predictors,
        classes: data.classes,
        importances,
        oob_error: oob_score.as_ref().map(|s| s.error),
    };

    info!(
        oob_accuracy = oob_score.as_ref().map(|s| s.accuracy),
        "random forest training complete"
    );

    Ok(RandomForestResult::new(forest, oob_score, metadata))
}
