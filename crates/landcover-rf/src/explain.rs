//! Human-readable model summaries.

use std::collections::BTreeMap;

use landcover_table::ClassLabel;

use crate::forest::RandomForest;
use crate::importance::{RankedFeature, rank_features};
use crate::node::DecisionNode;
use crate::tree::DecisionTree;

/// Structure and importance summary of a trained classifier.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct ModelExplanation {
    /// `"decision_tree"` or `"random_forest"`.
    pub kind: &'static str,
    /// Number of trees (1 for a single tree).
    pub n_trees: usize,
    /// Total nodes over all trees.
    pub n_nodes: usize,
    /// Total leaves over all trees.
    pub n_leaves: usize,
    /// Deepest tree depth.
    pub max_depth: usize,
    /// Training classes, ascending.
    pub classes: Vec<ClassLabel>,
    /// Predictors ranked by normalized MDI importance.
    pub importance: Vec<RankedFeature>,
    /// Out-of-bag error, for forests trained with OOB enabled.
    pub out_of_bag_error: Option<f64>,
}

impl DecisionTree {
    /// Summarize the tree structure and predictor importance.
    #[must_use]
    pub fn explain(&self) -> ModelExplanation {
        ModelExplanation {
            kind: "decision_tree",
            n_trees: 1,
            n_nodes: self.n_nodes(),
            n_leaves: self.n_leaves(),
            max_depth: self.depth(),
            classes: self.classes().to_vec(),
            importance: rank_features(self.predictors().names(), &self.feature_importances()),
            out_of_bag_error: None,
        }
    }
}

impl RandomForest {
    /// Summarize the ensemble structure, predictor importance and OOB error.
    #[must_use]
    pub fn explain(&self) -> ModelExplanation {
        ModelExplanation {
            kind: "random_forest",
            n_trees: self.n_trees(),
            n_nodes: self.trees().iter().map(DecisionNode::n_nodes).sum(),
            n_leaves: self.trees().iter().map(DecisionNode::n_leaves).sum(),
            max_depth: self.trees().iter().map(DecisionNode::depth).max().unwrap_or(0),
            classes: self.classes().to_vec(),
            importance: self.ranked_importances(),
            out_of_bag_error: self.oob_error(),
        }
    }
}

impl ModelExplanation {
    /// Importance of `name`, if it is a predictor.
    #[must_use]
    pub fn importance_of(&self, name: &str) -> Option<f64> {
        self.importance
            .iter()
            .find(|f| f.name == name)
            .map(|f| f.importance)
    }

    /// Predictor name to importance.
    #[must_use]
    pub fn importance_map(&self) -> BTreeMap<String, f64> {
        self.importance
            .iter()
            .map(|f| (f.name.clone(), f.importance))
            .collect()
    }
}
