//! What [`RandomForestConfig::fit`](crate::RandomForestConfig::fit) hands back.

use landcover_table::ClassLabel;

use crate::forest::RandomForest;
use crate::importance::RankedFeature;
use crate::oob::OobScore;
use crate::split::SplitCriterion;

/// Settings and shape of one forest training run.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct TrainingMetadata {
    pub n_trees: usize,
    /// Training rows (before bootstrapping).
    pub n_rows: usize,
    pub n_predictors: usize,
    /// Classes seen in training, ascending.
    pub classes: Vec<ClassLabel>,
    /// Predictors drawn per node after resolving `MaxFeatures`.
    pub max_features: usize,
    pub criterion: SplitCriterion,
    pub seed: u64,
    /// Node count summed over all trees.
    pub total_nodes: usize,
    /// Deepest tree in the forest.
    pub max_tree_depth: usize,
}

/// The fitted forest plus the optional out-of-bag score and run metadata.
#[derive(Debug)]
pub struct RandomForestResult {
    forest: RandomForest,
    oob_score: Option<OobScore>,
    metadata: TrainingMetadata,
}

impl RandomForestResult {
    pub(crate) fn new(
        forest: RandomForest,
        oob_score: Option<OobScore>,
        metadata: TrainingMetadata,
    ) -> Self {
        Self {
            forest,
            oob_score,
            metadata,
        }
    }

    #[must_use]
    pub fn forest(&self) -> &RandomForest {
        &self.forest
    }

    #[must_use]
    pub fn into_forest(self) -> RandomForest {
        self.forest
    }

    /// Predictors by normalized impurity decrease, most important first.
    #[must_use]
    pub fn importances(&self) -> Vec<RankedFeature> {
        self.forest.ranked_importances()
    }

    /// `None` unless trained with `OobMode::Enabled`.
    #[must_use]
    pub fn oob_score(&self) -> Option<&OobScore> {
        self.oob_score.as_ref()
    }

    /// Shorthand for the out-of-bag error rate.
    #[must_use]
    pub fn oob_error(&self) -> Option<f64> {
        self.oob_score.as_ref().map(|s| s.error)
    }

    #[must_use]
    pub fn metadata(&self) -> &TrainingMetadata {
        &self.metadata
    }
}
