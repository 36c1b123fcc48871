use landcover_table::{ClassLabel, FeatureTable, FeatureVector, Schema, derive_seed};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use tracing::{debug, instrument};

use crate::{
    RfError,
    dataset::{TrainingData, majority, project},
    node::{DecisionNode, FeatureIndex},
    split::{SplitCriterion, find_best_split, select_features},
};

/// Nodes with at least this many samples grow their two children in parallel.
const PARALLEL_MIN_SAMPLES: usize = 1024;

/// Path key of a root node. Child keys are derived from the parent's.
const ROOT_KEY: u64 = 1;

/// Configuration for a single CART decision tree.
///
/// Construct via [`DecisionTreeConfig::new`], then chain `with_*` methods.
///
/// # Defaults
///
/// | Parameter           | Default               |
/// |---------------------|-----------------------|
/// | `criterion`         | `Gini`                |
/// | `max_depth`         | `None` (unlimited)    |
/// | `min_samples_split` | 2                     |
/// | `min_samples_leaf`  | 1                     |
/// | `max_features`      | `None` (all features) |
/// | `seed`              | 42                    |
#[derive(Debug, Clone)]
pub struct DecisionTreeConfig {
    pub(crate) criterion: SplitCriterion,
    pub(crate) max_depth: Option<usize>,
    pub(crate) min_samples_split: usize,
    pub(crate) min_samples_leaf: usize,
    pub(crate) max_features: Option<usize>,
    pub(crate) seed: u64,
}

impl DecisionTreeConfig {
    /// Create a new config with default values.
    #[must_use]
    pub fn new() -> Self {
        Self {
            criterion: SplitCriterion::Gini,
            max_depth: None,
            min_samples_split: 2,
            min_samples_leaf: 1,
            max_features: None,
            seed: 42,
        }
    }

    /// Set the split quality criterion.
    #[must_use]
    pub fn with_criterion(mut self, criterion: SplitCriterion) -> Self {
        self.criterion = criterion;
        self
    }

    /// Set the maximum tree depth.
    ///
    /// `None` grows until leaves are pure or no split helps. `Some(d)`
    /// allows at most `d` levels of splits below the root.
    #[must_use]
    pub fn with_max_depth(mut self, max_depth: Option<usize>) -> Self {
        self.max_depth = max_depth;
        self
    }

    /// Set the minimum number of samples required to attempt a split.
    #[must_use]
    pub fn with_min_samples_split(mut self, min_samples_split: usize) -> Self {
        self.min_samples_split = min_samples_split;
        self
    }

    /// Set the minimum number of samples required in each child of a split.
    #[must_use]
    pub fn with_min_samples_leaf(mut self, min_samples_leaf: usize) -> Self {
        self.min_samples_leaf = min_samples_leaf;
        self
    }

    /// Set the number of predictors drawn as split candidates at each node.
    ///
    /// `None` considers every predictor and makes the tree fully
    /// deterministic regardless of seed.
    #[must_use]
    pub fn with_max_features(mut self, max_features: Option<usize>) -> Self {
        self.max_features = max_features;
        self
    }

    /// Set the random seed for predictor subsampling.
    #[must_use]
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    // --- Getters ---

    /// Return the split criterion.
    #[must_use]
    pub fn criterion(&self) -> SplitCriterion {
        self.criterion
    }

    /// Return the maximum depth limit, if any.
    #[must_use]
    pub fn max_depth(&self) -> Option<usize> {
        self.max_depth
    }

    /// Return the minimum samples required to split a node.
    #[must_use]
    pub fn min_samples_split(&self) -> usize {
        self.min_samples_split
    }

    /// Return the minimum samples required in each leaf.
    #[must_use]
    pub fn min_samples_leaf(&self) -> usize {
        self.min_samples_leaf
    }

    /// Return the per-node predictor budget, if any.
    #[must_use]
    pub fn max_features(&self) -> Option<usize> {
        self.max_features
    }

    /// Return the random seed.
    #[must_use]
    pub fn seed(&self) -> u64 {
        self.seed
    }

    /// Train a decision tree on `predictors` of `table`, using each row's
    /// class label as the target.
    ///
    /// `predictors` fixes the predictor order of the model: equally good
    /// splits go to the predictor listed first there, whatever the table's
    /// schema order. Pass `table.schema().names()` to break ties by schema.
    ///
    /// # Errors
    ///
    /// | Variant | When |
    /// |---|---|
    /// | [`RfError::NoPredictors`] | `predictors` is empty |
    /// | [`RfError::Table`] | a predictor is missing from the table or duplicated |
    /// | [`RfError::EmptyTable`] | `table` has no rows |
    /// | [`RfError::InvalidMaxFeatures`] | `max_features` resolves outside [1, n_predictors] |
    /// | [`RfError::InvalidMaxDepth`] | `max_depth` is `Some(0)` |
    /// | [`RfError::InvalidMinSamplesSplit`] | `min_samples_split` < 2 |
    /// | [`RfError::InvalidMinSamplesLeaf`] | `min_samples_leaf` < 1 |
    #[instrument(skip_all, fields(n_samples = table.len(), n_predictors = predictors.len()))]
    pub fn fit(&self, table: &FeatureTable, predictors: &[String]) -> Result<DecisionTree, RfError> {
        let data = TrainingData::new(table, predictors, "decision tree")?;
        let params = GrowParams::new(
            self.criterion,
            self.max_depth,
            self.min_samples_split,
            self.min_samples_leaf,
            self.max_features,
            data.n_features(),
        )?;

        debug!(
            n_samples = data.n_rows(),
            n_classes = data.n_classes(),
            max_features = params.max_features,
            "fitting decision tree"
        );

        let sample_indices: Vec<usize> = (0..data.n_rows()).collect();
        let root = grow(&data, &params, sample_indices, self.seed);

        debug!(
            n_nodes = root.n_nodes(),
            depth = root.depth(),
            "decision tree built"
        );

        Ok(DecisionTree {
            root,
            predictors: data.predictors,
            classes: data.classes,
        })
    }
}

impl Default for DecisionTreeConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// Validated growth parameters shared by single trees and forest members.
#[derive(Debug, Clone)]
pub(crate) struct GrowParams {
    pub(crate) criterion: SplitCriterion,
    pub(crate) max_depth: Option<usize>,
    pub(crate) min_samples_split: usize,
    pub(crate) min_samples_leaf: usize,
    pub(crate) max_features: usize,
}

impl GrowParams {
    /// # Errors
    ///
    /// Returns the `Invalid*` variant for the first out-of-range parameter.
    pub(crate) fn new(
        criterion: SplitCriterion,
        max_depth: Option<usize>,
        min_samples_split: usize,
        min_samples_leaf: usize,
        max_features: Option<usize>,
        n_features: usize,
    ) -> Result<Self, RfError> {
        if max_depth == Some(0) {
            return Err(RfError::InvalidMaxDepth { max_depth: 0 });
        }
        if min_samples_split < 2 {
            return Err(RfError::InvalidMinSamplesSplit { min_samples_split });
        }
        if min_samples_leaf < 1 {
            return Err(RfError::InvalidMinSamplesLeaf { min_samples_leaf });
        }
        let max_features = max_features.unwrap_or(n_features);
        if max_features == 0 || max_features > n_features {
            return Err(RfError::InvalidMaxFeatures {
                max_features,
                n_features,
            });
        }
        Ok(Self {
            criterion,
            max_depth,
            min_samples_split,
            min_samples_leaf,
            max_features,
        })
    }
}

/// Grow a tree over `sample_indices` (repeats allowed).
///
/// Each node draws its candidate predictors from an RNG keyed by its path
/// from the root, so the result does not depend on the order in which
/// subtrees are built.
pub(crate) fn grow(
    data: &TrainingData,
    params: &GrowParams,
    sample_indices: Vec<usize>,
    seed: u64,
) -> DecisionNode {
    build_node(data, params, seed, sample_indices, 0, ROOT_KEY)
}

fn build_node(
    data: &TrainingData,
    params: &GrowParams,
    seed: u64,
    sample_indices: Vec<usize>,
    depth: usize,
    key: u64,
) -> DecisionNode {
    let n_samples = sample_indices.len();
    let mut counts = vec![0usize; data.n_classes()];
    for &si in &sample_indices {
        counts[data.targets[si]] += 1;
    }
    let impurity = params.criterion.impurity(&counts, n_samples);
    let leaf = || DecisionNode::Leaf {
        label: data.classes[majority(&counts)],
        impurity,
        n_samples,
    };

    let pure = counts.iter().filter(|&&c| c > 0).count() <= 1;
    let depth_reached = params.max_depth.is_some_and(|d| depth >= d);
    if pure || depth_reached || n_samples < params.min_samples_split {
        return leaf();
    }

    let (candidates, fallback) = if params.max_features < data.n_features() {
        let mut rng = ChaCha8Rng::seed_from_u64(derive_seed(seed, key));
        select_features(data.n_features(), params.max_features, &mut rng)
    } else {
        ((0..data.n_features()).collect(), Vec::new())
    };

    let search = |features: &[usize]| {
        find_best_split(
            &data.columns,
            &data.targets,
            &sample_indices,
            data.n_classes(),
            params.criterion,
            features,
            params.min_samples_leaf,
        )
    };
    // Undrawn predictors are tried one at a time only when no drawn one splits.
    let found = search(&candidates).or_else(|| {
        fallback
            .iter()
            .find_map(|&feature| search(std::slice::from_ref(&feature)))
    });
    let Some(split) = found else {
        return leaf();
    };
    drop(sample_indices);

    let (left_key, right_key) = (derive_seed(key, 0), derive_seed(key, 1));
    let grow_left = || build_node(data, params, seed, split.left_indices, depth + 1, left_key);
    let grow_right = || build_node(data, params, seed, split.right_indices, depth + 1, right_key);
    let (left, right) = if n_samples >= PARALLEL_MIN_SAMPLES {
        rayon::join(grow_left, grow_right)
    } else {
        (grow_left(), grow_right())
    };

    DecisionNode::Split {
        feature: split.feature,
        threshold: split.threshold,
        left: Box::new(left),
        right: Box::new(right),
        impurity,
        n_samples,
        impurity_decrease: split.impurity_decrease,
    }
}

/// A trained CART classification tree.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct DecisionTree {
    pub(crate) root: DecisionNode,
    pub(crate) predictors: Schema,
    pub(crate) classes: Vec<ClassLabel>,
}

impl DecisionTree {
    /// Predict the class of `vector`, looking predictors up by name.
    ///
    /// # Errors
    ///
    /// Returns [`RfError::Table`] when `vector` lacks a predictor.
    pub fn predict(&self, vector: &FeatureVector) -> Result<ClassLabel, RfError> {
        let values = project(&self.predictors, vector)?;
        Ok(self.root.route(&values))
    }

    /// Predict from raw values given in predictor order.
    ///
    /// # Errors
    ///
    /// Returns [`RfError::PredictionFeatureMismatch`] when
    /// `values.len()` differs from the predictor count.
    pub fn predict_values(&self, values: &[f64]) -> Result<ClassLabel, RfError> {
        if values.len() != self.predictors.len() {
            return Err(RfError::PredictionFeatureMismatch {
                expected: self.predictors.len(),
                got: values.len(),
            });
        }
        Ok(self.root.route(values))
    }

    /// Mean Decrease in Impurity per predictor, normalized to sum to 1.
    ///
    /// All zeros when the tree is a single leaf.
    #[must_use]
    pub fn feature_importances(&self) -> Vec<f64> {
        let mut totals = vec![0.0f64; self.predictors.len()];
        self.root.accumulate_decrease(&mut totals);
        normalize(&mut totals);
        totals
    }

    /// Return the root node.
    #[must_use]
    pub fn root(&self) -> &DecisionNode {
        &self.root
    }

    /// Return the predictor schema, in the order split features index.
    #[must_use]
    pub fn predictors(&self) -> &Schema {
        &self.predictors
    }

    /// Return the predictor name for `feature`.
    #[must_use]
    pub fn attribute(&self, feature: FeatureIndex) -> &str {
        &self.predictors.names()[feature.index()]
    }

    /// Return the training classes, ascending.
    #[must_use]
    pub fn classes(&self) -> &[ClassLabel] {
        &self.classes
    }

    /// Return the total number of nodes.
    #[must_use]
    pub fn n_nodes(&self) -> usize {
        self.root.n_nodes()
    }

    /// Return the number of leaves.
    #[must_use]
    pub fn n_leaves(&self) -> usize {
        self.root.n_leaves()
    }

    /// Return the maximum depth. A lone root leaf has depth 0.
    #[must_use]
    pub fn depth(&self) -> usize {
        self.root.depth()
    }
}

/// Scale `values` to sum to 1 unless they sum to 0.
pub(crate) fn normalize(values: &mut [f64]) {
    let sum: f64 = values.iter().sum();
    if sum > 0.0 {
        values.iter_mut().for_each(|v| *v /= sum);
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use landcover_table::{ClassLabel, FeatureTable, FeatureVector, Schema};

    use super::DecisionTreeConfig;
    use crate::{RfError, node::DecisionNode};

    fn names(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    fn table(attrs: &[&str], rows: Vec<(Vec<f64>, i32)>) -> FeatureTable {
        let mut builder = FeatureTable::builder(Schema::new(attrs.iter().copied()).unwrap());
        for (values, label) in rows {
            builder.push(values, ClassLabel::new(label)).unwrap();
        }
        builder.build()
    }

    #[test]
    fn empty_table_error() {
        let t = table(&["B4"], vec![]);
        let err = DecisionTreeConfig::new().fit(&t, &names(&["B4"])).unwrap_err();
        assert!(matches!(err, RfError::EmptyTable { .. }));
    }

    #[test]
    fn pure_table_single_leaf() {
        let t = table(&["B4"], vec![(vec![1.0], 10), (vec![2.0], 10), (vec![3.0], 10)]);
        let tree = DecisionTreeConfig::new().fit(&t, &names(&["B4"])).unwrap();
        assert_eq!(tree.n_nodes(), 1);
        assert_eq!(tree.depth(), 0);
        assert_eq!(tree.predict_values(&[100.0]).unwrap(), ClassLabel::new(10));
        assert!(tree.feature_importances().iter().all(|&v| v == 0.0));
    }

    #[test]
    fn separable_table_one_split_at_midpoint() {
        let t = table(
            &["B4"],
            vec![(vec![1.0], 10), (vec![2.0], 10), (vec![3.0], 10), (vec![7.0], 40), (vec![8.0], 40), (vec![9.0], 40)],
        );
        let tree = DecisionTreeConfig::new().fit(&t, &names(&["B4"])).unwrap();
        assert_eq!(tree.n_nodes(), 3);
        match tree.root() {
            DecisionNode::Split { threshold, feature, .. } => {
                assert!((threshold - 5.0).abs() < f64::EPSILON);
                assert_eq!(tree.attribute(*feature), "B4");
            }
            DecisionNode::Leaf { .. } => panic!("expected a split"),
        }
        assert_eq!(tree.predict_values(&[4.99]).unwrap(), ClassLabel::new(10));
        assert_eq!(tree.predict_values(&[5.0]).unwrap(), ClassLabel::new(40));
    }

    #[test]
    fn inseparable_rows_make_majority_leaf() {
        // Identical values with mixed labels: no split can help.
        let t = table(&["B4"], vec![(vec![1.0], 40), (vec![1.0], 10), (vec![1.0], 40)]);
        let tree = DecisionTreeConfig::new().fit(&t, &names(&["B4"])).unwrap();
        assert_eq!(tree.n_nodes(), 1);
        assert_eq!(tree.predict_values(&[1.0]).unwrap(), ClassLabel::new(40));
    }

    #[test]
    fn leaf_tie_goes_to_lowest_label() {
        let t = table(&["B4"], vec![(vec![1.0], 80), (vec![1.0], 20)]);
        let tree = DecisionTreeConfig::new().fit(&t, &names(&["B4"])).unwrap();
        assert_eq!(tree.predict_values(&[1.0]).unwrap(), ClassLabel::new(20));
    }

    #[test]
    fn max_depth_limits_tree() {
        let rows: Vec<(Vec<f64>, i32)> =
            (0..40).map(|i| (vec![i as f64], if (i / 5) % 2 == 0 { 10 } else { 40 })).collect();
        let t = table(&["B4"], rows);

        let tree = DecisionTreeConfig::new()
            .with_max_depth(Some(2))
            .fit(&t, &names(&["B4"]))
            .unwrap();
        assert!(tree.depth() <= 2);

        let full = DecisionTreeConfig::new().fit(&t, &names(&["B4"])).unwrap();
        assert!(full.depth() > 2);
    }

    #[test]
    fn min_samples_leaf_respected() {
        let t = table(&["B4"], vec![(vec![1.0], 10), (vec![2.0], 40), (vec![3.0], 40), (vec![4.0], 40)]);
        let tree = DecisionTreeConfig::new()
            .with_min_samples_leaf(2)
            .fit(&t, &names(&["B4"]))
            .unwrap();
        fn check(node: &DecisionNode) {
            if let DecisionNode::Split { left, right, .. } = node {
                assert!(left.n_samples() >= 2 && right.n_samples() >= 2);
                check(left);
                check(right);
            }
        }
        check(tree.root());
    }

    #[test]
    fn predict_by_name_ignores_column_order() {
        let t = table(
            &["B2", "B4"],
            vec![(vec![0.0, 1.0], 10), (vec![0.0, 2.0], 10), (vec![0.0, 8.0], 40), (vec![0.0, 9.0], 40)],
        );
        let tree = DecisionTreeConfig::new().fit(&t, &names(&["B4"])).unwrap();

        let schema = Arc::new(Schema::new(["B4", "B8"]).unwrap());
        let v = FeatureVector::new(schema, vec![8.5, -1.0], ClassLabel::new(0)).unwrap();
        assert_eq!(tree.predict(&v).unwrap(), ClassLabel::new(40));

        let missing = Arc::new(Schema::new(["B8"]).unwrap());
        let v = FeatureVector::new(missing, vec![8.5], ClassLabel::new(0)).unwrap();
        assert!(matches!(tree.predict(&v), Err(RfError::Table(_))));
    }

    #[test]
    fn prediction_width_mismatch() {
        let t = table(&["B4"], vec![(vec![1.0], 10), (vec![9.0], 40)]);
        let tree = DecisionTreeConfig::new().fit(&t, &names(&["B4"])).unwrap();
        assert!(matches!(
            tree.predict_values(&[1.0, 2.0]),
            Err(RfError::PredictionFeatureMismatch { expected: 1, got: 2 })
        ));
    }

    #[test]
    fn feature_importances_sum_to_one() {
        let t = table(
            &["B2", "B4"],
            vec![(vec![0.0, 1.0], 10), (vec![1.0, 2.0], 10), (vec![0.0, 8.0], 40), (vec![1.0, 9.0], 40)],
        );
        let tree = DecisionTreeConfig::new().fit(&t, &names(&["B2", "B4"])).unwrap();
        let imp = tree.feature_importances();
        assert!((imp.iter().sum::<f64>() - 1.0).abs() < 1e-10);
        assert!(imp[1] > imp[0]);
    }

    #[test]
    fn deterministic_with_same_seed() {
        let rows: Vec<(Vec<f64>, i32)> = (0..300)
            .map(|i| {
                let x = (i * 37 % 101) as f64;
                let y = (i * 53 % 97) as f64;
                let z = (i * 11 % 89) as f64;
                (vec![x, y, z], if x + y > 100.0 { 10 } else if z > 40.0 { 40 } else { 80 })
            })
            .collect();
        let t = table(&["a", "b", "c"], rows);
        let config = DecisionTreeConfig::new().with_max_features(Some(1)).with_seed(9);
        let predictors = names(&["a", "b", "c"]);
        assert_eq!(config.fit(&t, &predictors).unwrap(), config.fit(&t, &predictors).unwrap());
    }

    #[test]
    fn invalid_config_rejected() {
        let t = table(&["B4"], vec![(vec![1.0], 10), (vec![9.0], 40)]);
        let p = names(&["B4"]);
        assert!(matches!(
            DecisionTreeConfig::new().with_max_depth(Some(0)).fit(&t, &p),
            Err(RfError::InvalidMaxDepth { .. })
        ));
        assert!(matches!(
            DecisionTreeConfig::new().with_min_samples_split(1).fit(&t, &p),
            Err(RfError::InvalidMinSamplesSplit { .. })
        ));
        assert!(matches!(
            DecisionTreeConfig::new().with_min_samples_leaf(0).fit(&t, &p),
            Err(RfError::InvalidMinSamplesLeaf { .. })
        ));
        assert!(matches!(
            DecisionTreeConfig::new().with_max_features(Some(2)).fit(&t, &p),
            Err(RfError::InvalidMaxFeatures { max_features: 2, n_features: 1 })
        ));
    }

    #[test]
    fn equal_splits_follow_predictor_list_order() {
        let rows = vec![
            (vec![1.0, 1.0], 10),
            (vec![2.0, 2.0], 10),
            (vec![8.0, 8.0], 40),
            (vec![9.0, 9.0], 40),
        ];
        let t = table(&["B4", "B8"], rows);
        for order in [["B4", "B8"], ["B8", "B4"]] {
            let tree = DecisionTreeConfig::new().fit(&t, &names(&order)).unwrap();
            match tree.root() {
                DecisionNode::Split { feature, .. } => assert_eq!(tree.attribute(*feature), order[0]),
                DecisionNode::Leaf { .. } => panic!("expected a split"),
            }
        }
    }
}
