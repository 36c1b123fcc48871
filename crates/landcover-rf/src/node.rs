use std::fmt;

use landcover_table::ClassLabel;

/// Zero-based position of a predictor in a model's predictor schema.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash,
    serde::Serialize, serde::Deserialize,
)]
pub struct FeatureIndex(usize);

impl FeatureIndex {
    /// Create a new feature index from a zero-based predictor position.
    pub(crate) fn new(index: usize) -> Self {
        Self(index)
    }

    /// Return the zero-based predictor position.
    #[must_use]
    pub fn index(self) -> usize {
        self.0
    }
}

impl fmt::Display for FeatureIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Criterion-agnostic impurity value (Gini or Entropy).
#[derive(
    Debug, Clone, Copy, PartialEq, PartialOrd,
    serde::Serialize, serde::Deserialize,
)]
pub struct Impurity(f64);

impl Impurity {
    /// Create a new impurity value.
    pub(crate) fn new(value: f64) -> Self {
        Self(value)
    }

    /// Return the raw impurity value.
    #[must_use]
    pub fn value(self) -> f64 {
        self.0
    }
}

impl fmt::Display for Impurity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.6}", self.0)
    }
}

/// A node of a classification tree.
///
/// Children are owned by their parent through `Box`; there are no
/// back-references, so a tree is a strict hierarchy.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub enum DecisionNode {
    /// An interior split node.
    Split {
        /// Predictor tested at this node.
        feature: FeatureIndex,
        /// Rows with `value < threshold` go left, all others right.
        threshold: f64,
        /// Subtree for values below the threshold.
        left: Box<DecisionNode>,
        /// Subtree for values at or above the threshold.
        right: Box<DecisionNode>,
        /// Impurity at this node before splitting.
        impurity: Impurity,
        /// Number of training rows that reached this node.
        n_samples: usize,
        /// Count-weighted impurity decrease: `n·I − n_l·I_l − n_r·I_r`.
        impurity_decrease: f64,
    },
    /// A terminal leaf node.
    Leaf {
        /// Majority class of the training rows in this leaf.
        label: ClassLabel,
        /// Impurity at this leaf.
        impurity: Impurity,
        /// Number of training rows in this leaf.
        n_samples: usize,
    },
}

impl DecisionNode {
    /// Return the impurity at this node (before splitting for interior nodes).
    #[must_use]
    pub fn impurity(&self) -> Impurity {
        match self {
            DecisionNode::Split { impurity, .. } | DecisionNode::Leaf { impurity, .. } => *impurity,
        }
    }

    /// Return the number of training rows that reached this node.
    #[must_use]
    pub fn n_samples(&self) -> usize {
        match self {
            DecisionNode::Split { n_samples, .. } | DecisionNode::Leaf { n_samples, .. } => {
                *n_samples
            }
        }
    }

    /// Return `true` if this node is a leaf.
    #[must_use]
    pub fn is_leaf(&self) -> bool {
        matches!(self, DecisionNode::Leaf { .. })
    }

    /// Descend to a leaf for `values` (in predictor order) and return its label.
    ///
    /// Callers check that `values` covers every predictor; the public entry
    /// points do so and return [`RfError::PredictionFeatureMismatch`](crate::RfError::PredictionFeatureMismatch).
    #[must_use]
    pub(crate) fn route(&self, values: &[f64]) -> ClassLabel {
        let mut node = self;
        loop {
            match node {
                DecisionNode::Leaf { label, .. } => return *label,
                DecisionNode::Split {
                    feature,
                    threshold,
                    left,
                    right,
                    ..
                } => {
                    node = if values[feature.index()] < *threshold {
                        left
                    } else {
                        right
                    };
                }
            }
        }
    }

    /// Return the number of nodes in this subtree.
    #[must_use]
    pub fn n_nodes(&self) -> usize {
        match self {
            DecisionNode::Leaf { .. } => 1,
            DecisionNode::Split { left, right, .. } => 1 + left.n_nodes() + right.n_nodes(),
        }
    }

    /// Return the number of leaves in this subtree.
    #[must_use]
    pub fn n_leaves(&self) -> usize {
        match self {
            DecisionNode::Leaf { .. } => 1,
            DecisionNode::Split { left, right, .. } => left.n_leaves() + right.n_leaves(),
        }
    }

    /// Return the depth of this subtree. A lone leaf has depth 0.
    #[must_use]
    pub fn depth(&self) -> usize {
        match self {
            DecisionNode::Leaf { .. } => 0,
            DecisionNode::Split { left, right, .. } => 1 + left.depth().max(right.depth()),
        }
    }

    /// Add this subtree's impurity decreases into `totals`, by feature.
    pub(crate) fn accumulate_decrease(&self, totals: &mut [f64]) {
        if let DecisionNode::Split {
            feature,
            impurity_decrease,
            left,
            right,
            ..
        } = self
        {
            totals[feature.index()] += impurity_decrease;
            left.accumulate_decrease(totals);
            right.accumulate_decrease(totals);
        }
    }
}
