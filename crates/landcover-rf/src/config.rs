//! Configuration builder for Random Forest training.

use landcover_table::FeatureTable;

use crate::error::RfError;
use crate::result::RandomForestResult;
use crate::split::SplitCriterion;

/// Strategy for the number of predictors drawn as candidates at each split.
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
pub enum MaxFeatures {
    /// `floor(sqrt(p))`, at least 1.
    Sqrt,
    /// `floor(log2(p))`, at least 1.
    Log2,
    /// A fraction of all predictors, rounded up (must be in (0.0, 1.0]).
    Fraction(f64),
    /// A fixed count.
    Fixed(usize),
    /// All predictors (no subsampling).
    All,
}

impl MaxFeatures {
    /// Resolve to a concrete count for `n_features` predictors.
    ///
    /// # Errors
    ///
    /// Returns [`RfError::InvalidMaxFeatures`] when the result falls
    /// outside `[1, n_features]`.
    pub fn resolve(self, n_features: usize) -> Result<usize, RfError> {
        let p = n_features as f64;
        let resolved = match self {
            MaxFeatures::Sqrt => (p.sqrt().floor() as usize).max(1),
            MaxFeatures::Log2 => (p.log2().floor() as usize).max(1),
            MaxFeatures::Fraction(f) if f > 0.0 && f <= 1.0 => (p * f).ceil() as usize,
            MaxFeatures::Fraction(_) => 0,
            MaxFeatures::Fixed(n) => n,
            MaxFeatures::All => n_features,
        };
        if resolved == 0 || resolved > n_features {
            return Err(RfError::InvalidMaxFeatures {
                max_features: resolved,
                n_features,
            });
        }
        Ok(resolved)
    }
}

/// Whether to compute out-of-bag evaluation during training.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OobMode {
    /// Compute OOB accuracy, error and confusion matrix.
    Enabled,
    /// Skip OOB evaluation.
    Disabled,
}

/// Configuration for Random Forest training.
///
/// Construct via [`RandomForestConfig::new`], then chain `with_*` methods.
///
/// # Defaults
///
/// | Parameter           | Default    |
/// |---------------------|------------|
/// | `max_features`      | `Sqrt`     |
/// | `max_depth`         | `None`     |
/// | `min_samples_split` | 2          |
/// | `min_samples_leaf`  | 1          |
/// | `criterion`         | `Gini`     |
/// | `seed`              | 42         |
/// | `oob_mode`          | `Disabled` |
#[derive(Debug, Clone)]
pub struct RandomForestConfig {
    pub(crate) n_trees: usize,
    pub(crate) max_features: MaxFeatures,
    pub(crate) max_depth: Option<usize>,
    pub(crate) min_samples_split: usize,
    pub(crate) min_samples_leaf: usize,
    pub(crate) criterion: SplitCriterion,
    pub(crate) seed: u64,
    pub(crate) oob_mode: OobMode,
}

impl RandomForestConfig {
    /// Create a new config with the given number of trees.
    ///
    /// # Errors
    ///
    /// Returns [`RfError::InvalidTreeCount`] if `n_trees` is zero.
    pub fn new(n_trees: usize) -> Result<Self, RfError> {
        if n_trees == 0 {
            return Err(RfError::InvalidTreeCount { n_trees });
        }
        Ok(Self {
            n_trees,
            max_features: MaxFeatures::Sqrt,
            max_depth: None,
            min_samples_split: 2,
            min_samples_leaf: 1,
            criterion: SplitCriterion::Gini,
            seed: 42,
            oob_mode: OobMode::Disabled,
        })
    }

    // --- Setters ---

    /// Set the max features strategy.
    #[must_use]
    pub fn with_max_features(mut self, max_features: MaxFeatures) -> Self {
        self.max_features = max_features;
        self
    }

    /// Set the maximum depth of each tree.
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

    /// Set the minimum number of samples required in each leaf.
    #[must_use]
    pub fn with_min_samples_leaf(mut self, min_samples_leaf: usize) -> Self {
        self.min_samples_leaf = min_samples_leaf;
        self
    }

    /// Set the split quality criterion.
    #[must_use]
    pub fn with_criterion(mut self, criterion: SplitCriterion) -> Self {
        self.criterion = criterion;
        self
    }

    /// Set the random seed. Tree `t` draws from a stream derived from
    /// `(seed, t)`, so results do not depend on thread scheduling.
    #[must_use]
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Set the OOB evaluation mode.
    #[must_use]
    pub fn with_oob_mode(mut self, oob_mode: OobMode) -> Self {
        self.oob_mode = oob_mode;
        self
    }

    // --- Getters ---

    /// Return the number of trees.
    #[must_use]
    pub fn n_trees(&self) -> usize {
        self.n_trees
    }

    /// Return the max features strategy.
    #[must_use]
    pub fn max_features(&self) -> MaxFeatures {
        self.max_features
    }

    /// Return the maximum depth, if any.
    #[must_use]
    pub fn max_depth(&self) -> Option<usize> {
        self.max_depth
    }

    /// Return the minimum samples to split.
    #[must_use]
    pub fn min_samples_split(&self) -> usize {
        self.min_samples_split
    }

    /// Return the minimum samples per leaf.
    #[must_use]
    pub fn min_samples_leaf(&self) -> usize {
        self.min_samples_leaf
    }

    /// Return the split criterion.
    #[must_use]
    pub fn criterion(&self) -> SplitCriterion {
        self.criterion
    }

    /// Return the random seed.
    #[must_use]
    pub fn seed(&self) -> u64 {
        self.seed
    }

    /// Return the OOB evaluation mode.
    #[must_use]
    pub fn oob_mode(&self) -> OobMode {
        self.oob_mode
    }

    /// Train a Random Forest on `predictors` of `table`.
    ///
    /// As with [`DecisionTreeConfig::fit`](crate::DecisionTreeConfig::fit),
    /// split ties go to the predictor listed first in `predictors`.
    ///
    /// # Errors
    ///
    /// | Variant | When |
    /// |---|---|
    /// | [`RfError::NoPredictors`] | `predictors` is empty |
    /// | [`RfError::Table`] | a predictor is missing from the table or duplicated |
    /// | [`RfError::EmptyTable`] | `table` has no rows |
    /// | [`RfError::InvalidMaxFeatures`] | resolved max_features is outside [1, n_predictors] |
    /// | [`RfError::InvalidMaxDepth`] | `max_depth` is `Some(0)` |
    /// | [`RfError::InvalidMinSamplesSplit`] | `min_samples_split` < 2 |
    /// | [`RfError::InvalidMinSamplesLeaf`] | `min_samples_leaf` < 1 |
    /// | [`RfError::OobEvaluationFailed`] | OOB enabled but no row is out-of-bag for any tree |
    pub fn fit(
        &self,
        table: &FeatureTable,
        predictors: &[String],
    ) -> Result<RandomForestResult, RfError> {
        crate::forest::train(self, table, predictors)
    }
}

#[cfg(test)]
mod tests {
    use super::{MaxFeatures, OobMode, RandomForestConfig};
    use crate::RfError;

    #[test]
    fn sqrt_floors_with_minimum_one() {
        assert_eq!(MaxFeatures::Sqrt.resolve(1).unwrap(), 1);
        assert_eq!(MaxFeatures::Sqrt.resolve(3).unwrap(), 1);
        assert_eq!(MaxFeatures::Sqrt.resolve(4).unwrap(), 2);
        assert_eq!(MaxFeatures::Sqrt.resolve(12).unwrap(), 3);
    }

    #[test]
    fn other_strategies_resolve() {
        assert_eq!(MaxFeatures::Log2.resolve(8).unwrap(), 3);
        assert_eq!(MaxFeatures::Log2.resolve(1).unwrap(), 1);
        assert_eq!(MaxFeatures::Fraction(0.5).resolve(5).unwrap(), 3);
        assert_eq!(MaxFeatures::Fixed(2).resolve(5).unwrap(), 2);
        assert_eq!(MaxFeatures::All.resolve(5).unwrap(), 5);
    }

    #[test]
    fn out_of_range_rejected() {
        assert!(matches!(
            MaxFeatures::Fixed(6).resolve(5),
            Err(RfError::InvalidMaxFeatures { max_features: 6, n_features: 5 })
        ));
        assert!(MaxFeatures::Fixed(0).resolve(5).is_err());
        assert!(MaxFeatures::Fraction(0.0).resolve(5).is_err());
        assert!(MaxFeatures::Fraction(1.5).resolve(5).is_err());
    }

    #[test]
    fn zero_trees_rejected() {
        assert!(matches!(
            RandomForestConfig::new(0),
            Err(RfError::InvalidTreeCount { n_trees: 0 })
        ));
    }

    #[test]
    fn defaults_and_setters() {
        let config = RandomForestConfig::new(10).unwrap();
        assert_eq!(config.n_trees(), 10);
        assert_eq!(config.max_features(), MaxFeatures::Sqrt);
        assert_eq!(config.seed(), 42);
        assert_eq!(config.oob_mode(), OobMode::Disabled);

        let config = config
            .with_seed(7)
            .with_max_depth(Some(5))
            .with_min_samples_leaf(3)
            .with_oob_mode(OobMode::Enabled);
        assert_eq!(config.seed(), 7);
        assert_eq!(config.max_depth(), Some(5));
        assert_eq!(config.min_samples_leaf(), 3);
        assert_eq!(config.oob_mode(), OobMode::Enabled);
    }
}
