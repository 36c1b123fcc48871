//! Sample, split, train and assess in one run.

use std::collections::BTreeMap;

use landcover_table::{
    ClassLabel, FeatureTable, LabeledRaster, PredictorRaster, RandomSplit, Region,
    StratifiedSampler, derive_seed,
};
use tracing::{info, instrument, warn};

use crate::classifier::Classifier;
use crate::config::{OobMode, RandomForestConfig};
use crate::confusion::{ClassMetrics, ConfusionMatrix};
use crate::error::RfError;
use crate::importance::RankedFeature;
use crate::tree::DecisionTreeConfig;

// Per-stage stream keys, so the sampler's per-class streams and the forest's
// per-tree streams never share a seed.
const SAMPLE_STREAM: u64 = 0x5341_4d50_4c45;
const SPLIT_STREAM: u64 = 0x5350_4c49_54;
const FOREST_STREAM: u64 = 0x464f_5245_5354;

/// Accuracy assessment of one classifier on a test table.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct Evaluation {
    /// Overall accuracy.
    pub accuracy: f64,
    /// Cohen's kappa (`NaN` when undefined).
    pub kappa: f64,
    /// Per-class producer's and consumer's accuracy.
    pub class_metrics: Vec<ClassMetrics>,
    /// Reference (rows) against predicted (columns).
    pub confusion_matrix: ConfusionMatrix,
}

impl Evaluation {
    /// Derive every summary figure from `confusion_matrix`.
    #[must_use]
    pub fn from_matrix(confusion_matrix: ConfusionMatrix) -> Self {
        Self {
            accuracy: confusion_matrix.accuracy(),
            kappa: confusion_matrix.kappa(),
            class_metrics: confusion_matrix.class_metrics(),
            confusion_matrix,
        }
    }
}

/// Outcome of a [`ClassificationPipeline`] run.
#[derive(Debug, Clone, serde::Serialize)]
pub struct PipelineReport {
    /// Rows in the sampled table.
    pub n_samples: usize,
    /// Rows used for training.
    pub n_train: usize,
    /// Rows used for testing.
    pub n_test: usize,
    /// Class counts of the sampled table.
    pub class_counts: BTreeMap<ClassLabel, usize>,
    /// Single CART tree on the test partition.
    pub cart: Evaluation,
    /// Random forest on the test partition.
    pub forest: Evaluation,
    /// Forest predictor importance, most important first.
    pub importance: Vec<RankedFeature>,
    /// Forest out-of-bag error, when at least one row was out-of-bag.
    pub out_of_bag_error: Option<f64>,
    /// The trained CART tree.
    #[serde(skip)]
    pub cart_model: Classifier,
    /// The trained random forest.
    #[serde(skip)]
    pub forest_model: Classifier,
}

/// Stratified sampling, seeded split, CART and random forest training, and
/// assessment of both on the held-out rows.
///
/// Construct via [`ClassificationPipeline::new`], then chain `with_*` methods.
///
/// # Defaults
///
/// | Parameter          | Default   |
/// |--------------------|-----------|
/// | `train_fraction`   | 0.7       |
/// | `seed`             | 42        |
/// | `n_trees`          | 100       |
/// | `max_depth`        | `None`    |
/// | `min_samples_leaf` | 1         |
#[derive(Debug, Clone)]
pub struct ClassificationPipeline {
    class_counts: BTreeMap<ClassLabel, usize>,
    train_fraction: f64,
    seed: u64,
    n_trees: usize,
    max_depth: Option<usize>,
    min_samples_leaf: usize,
}

impl ClassificationPipeline {
    /// Create a pipeline that samples `class_counts` pixels per class.
    ///
    /// # Errors
    ///
    /// Returns [`RfError::Table`] if any requested count is zero.
    pub fn new(class_counts: BTreeMap<ClassLabel, usize>) -> Result<Self, RfError> {
        StratifiedSampler::new(class_counts.clone())?;
        Ok(Self {
            class_counts,
            train_fraction: 0.7,
            seed: 42,
            n_trees: 100,
            max_depth: None,
            min_samples_leaf: 1,
        })
    }

    /// Set the fraction of rows assigned to training.
    #[must_use]
    pub fn with_train_fraction(mut self, train_fraction: f64) -> Self {
        self.train_fraction = train_fraction;
        self
    }

    /// Set the base seed. Sampling, splitting and the forest each derive
    /// their own stream from it.
    #[must_use]
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Set the number of forest trees.
    #[must_use]
    pub fn with_n_trees(mut self, n_trees: usize) -> Self {
        self.n_trees = n_trees;
        self
    }

    /// Set the maximum depth for both models.
    #[must_use]
    pub fn with_max_depth(mut self, max_depth: Option<usize>) -> Self {
        self.max_depth = max_depth;
        self
    }

    /// Set the minimum leaf size for both models.
    #[must_use]
    pub fn with_min_samples_leaf(mut self, min_samples_leaf: usize) -> Self {
        self.min_samples_leaf = min_samples_leaf;
        self
    }

    /// Return the requested per-class sample counts.
    #[must_use]
    pub fn class_counts(&self) -> &BTreeMap<ClassLabel, usize> {
        &self.class_counts
    }

    /// Return the training fraction.
    #[must_use]
    pub fn train_fraction(&self) -> f64 {
        self.train_fraction
    }

    /// Return the seed.
    #[must_use]
    pub fn seed(&self) -> u64 {
        self.seed
    }

    /// Seed handed to one stage, derived from the pipeline seed.
    fn stage_seed(&self, stream: u64) -> u64 {
        derive_seed(self.seed, stream)
    }

    /// Return the number of forest trees.
    #[must_use]
    pub fn n_trees(&self) -> usize {
        self.n_trees
    }

    /// Sample `labels` and `predictors` inside `region`, then run
    /// [`Self::run_on_table`].
    ///
    /// # Errors
    ///
    /// Propagates sampling errors and every error of [`Self::run_on_table`].
    #[instrument(skip_all, fields(scale = scale, seed = self.seed))]
    pub fn run<L, P>(
        &self,
        labels: &L,
        predictors: &P,
        region: &Region,
        scale: f64,
    ) -> Result<PipelineReport, RfError>
    where
        L: LabeledRaster + ?Sized,
        P: PredictorRaster + ?Sized,
    {
        let sampler = StratifiedSampler::new(self.class_counts.clone())?
            .with_seed(self.stage_seed(SAMPLE_STREAM));
        let table = sampler.sample(labels, predictors, region, scale)?;
        self.run_on_table(&table)
    }

    /// Split `table`, train both models on every schema attribute and
    /// evaluate them on the test rows.
    ///
    /// # Errors
    ///
    /// | Variant | Condition |
    /// |---|---|
    /// | [`RfError::Table`] | the train fraction is NaN |
    /// | [`RfError::EmptyTable`] | the training partition is empty |
    /// | [`RfError::EmptyTestSet`] | the test partition is empty |
    /// | [`RfError::InvalidTreeCount`] | `n_trees` is zero |
    /// | [`RfError::InvalidMaxDepth`] | `max_depth` is `Some(0)` |
    /// | [`RfError::InvalidMinSamplesLeaf`] | `min_samples_leaf` is zero |
    #[instrument(skip_all, fields(n_rows = table.len(), train_fraction = self.train_fraction))]
    pub fn run_on_table(&self, table: &FeatureTable) -> Result<PipelineReport, RfError> {
        let predictors = table.schema().names().to_vec();
        let split = RandomSplit::new(self.train_fraction)?
            .with_seed(self.stage_seed(SPLIT_STREAM))
            .split(table);
        let (n_train, n_test) = (split.train.len(), split.test.len());
        if n_test == 0 {
            return Err(RfError::EmptyTestSet { n_train });
        }

        let cart_model: Classifier = DecisionTreeConfig::new()
            .with_max_depth(self.max_depth)
            .with_min_samples_leaf(self.min_samples_leaf)
            .fit(&split.train, &predictors)?
            .into();

        // A lone training row is in every bootstrap sample.
        let oob_mode = if n_train >= 2 { OobMode::Enabled } else { OobMode::Disabled };
        let forest_result = RandomForestConfig::new(self.n_trees)?
            .with_seed(self.stage_seed(FOREST_STREAM))
            .with_max_depth(self.max_depth)
            .with_min_samples_leaf(self.min_samples_leaf)
            .with_oob_mode(oob_mode)
            .fit(&split.train, &predictors)?;
        let importance = forest_result.importances();
        let out_of_bag_error = forest_result.oob_error();
        let forest_model = Classifier::from(forest_result.into_forest());

        let cart = Evaluation::from_matrix(cart_model.evaluate(&split.test)?);
        let forest = Evaluation::from_matrix(forest_model.evaluate(&split.test)?);

        if cart.kappa.is_nan() || forest.kappa.is_nan() {
            warn!("kappa is undefined for this test partition");
        }
        info!(
            n_train,
            n_test,
            cart_accuracy = cart.accuracy,
            forest_accuracy = forest.accuracy,
            forest_kappa = forest.kappa,
            "pipeline complete"
        );

        Ok(PipelineReport {
            n_samples: table.len(),
            n_train,
            n_test,
            class_counts: table.class_counts(),
            cart,
            forest,
            importance,
            out_of_bag_error,
            cart_model,
            forest_model,
        })
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use landcover_table::{
        BandStack, ClassLabel, FeatureTable, GridGeometry, LabelGrid, RandomSplit, Region, Schema,
        StratifiedSampler, derive_seed,
    };

    use super::{ClassificationPipeline, FOREST_STREAM, SAMPLE_STREAM, SPLIT_STREAM};
    use crate::{Classifier, OobMode, RandomForestConfig, RfError};

    fn counts(per_class: usize) -> BTreeMap<ClassLabel, usize> {
        [(ClassLabel::new(10), per_class), (ClassLabel::new(80), per_class)]
            .into_iter()
            .collect()
    }

    /// 20x20 grid: left half trees (10) with high NDVI, right half water (80).
    fn scene() -> (LabelGrid, BandStack, Region) {
        let geometry = GridGeometry::new(0.0, 200.0, 10.0, 20, 20).unwrap();
        let mut labels = Vec::new();
        let mut ndvi = Vec::new();
        let mut mndwi = Vec::new();
        for row in 0..20 {
            for col in 0..20 {
                let tree = col < 10;
                labels.push(Some(ClassLabel::new(if tree { 10 } else { 80 })));
                let wobble = ((row * 20 + col) % 7) as f64 * 0.01;
                ndvi.push(if tree { 0.7 + wobble } else { -0.2 + wobble });
                mndwi.push(if tree { -0.4 + wobble } else { 0.5 + wobble });
            }
        }
        let stack = BandStack::new(
            geometry,
            vec![("NDVI".to_string(), ndvi), ("MNDWI".to_string(), mndwi)],
        )
        .unwrap();
        let grid = LabelGrid::new(geometry, labels).unwrap();
        (grid, stack, Region::new(0.0, 0.0, 200.0, 200.0).unwrap())
    }

    #[test]
    fn separable_scene_is_classified_perfectly() {
        let (grid, stack, region) = scene();
        let report = ClassificationPipeline::new(counts(50))
            .unwrap()
            .with_n_trees(10)
            .run(&grid, &stack, &region, 10.0)
            .unwrap();

        assert_eq!(report.n_samples, 100);
        assert_eq!(report.n_train + report.n_test, 100);
        assert!((report.cart.accuracy - 1.0).abs() < f64::EPSILON);
        assert!((report.forest.accuracy - 1.0).abs() < f64::EPSILON);
        assert!((report.forest.kappa - 1.0).abs() < 1e-12);
        let total: f64 = report.importance.iter().map(|f| f.importance).sum();
        assert!((total - 1.0).abs() < 1e-10);
        assert!(report.out_of_bag_error.is_some());
    }

    #[test]
    fn same_seed_same_report() {
        let (grid, stack, region) = scene();
        let pipeline = ClassificationPipeline::new(counts(30)).unwrap().with_n_trees(8).with_seed(5);
        let a = pipeline.run(&grid, &stack, &region, 10.0).unwrap();
        let b = pipeline.run(&grid, &stack, &region, 10.0).unwrap();
        assert_eq!(a.n_train, b.n_train);
        assert_eq!(a.forest, b.forest);
        assert_eq!(a.forest_model, b.forest_model);
        assert_eq!(a.cart_model, b.cart_model);
    }

    #[test]
    fn full_train_fraction_has_no_test_rows() {
        let (grid, stack, region) = scene();
        let err = ClassificationPipeline::new(counts(10))
            .unwrap()
            .with_train_fraction(1.0)
            .with_n_trees(3)
            .run(&grid, &stack, &region, 10.0)
            .unwrap_err();
        assert!(matches!(err, RfError::EmptyTestSet { n_train: 20 }));
    }

    #[test]
    fn zero_train_fraction_has_no_training_rows() {
        let mut builder = FeatureTable::builder(Schema::new(["NDVI"]).unwrap());
        for i in 0..10 {
            builder.push(vec![i as f64], ClassLabel::new(10)).unwrap();
        }
        let err = ClassificationPipeline::new(counts(5))
            .unwrap()
            .with_train_fraction(0.0)
            .run_on_table(&builder.build())
            .unwrap_err();
        assert!(matches!(err, RfError::EmptyTable { .. }));
    }

    #[test]
    fn zero_class_count_rejected() {
        assert!(matches!(ClassificationPipeline::new(counts(0)), Err(RfError::Table(_))));
    }

    #[test]
    fn stages_draw_from_distinct_streams() {
        for seed in [0, 5, 42, u64::MAX] {
            let p = ClassificationPipeline::new(counts(1)).unwrap().with_seed(seed);
            let seeds = [
                p.stage_seed(SAMPLE_STREAM),
                p.stage_seed(SPLIT_STREAM),
                p.stage_seed(FOREST_STREAM),
            ];
            assert_ne!(seeds[0], seeds[1]);
            assert_ne!(seeds[0], seeds[2]);
            assert_ne!(seeds[1], seeds[2]);
            assert!(seeds.iter().all(|&s| s != seed));
        }
    }

    #[test]
    fn run_on_table_uses_stage_seeds() {
        let (grid, stack, region) = scene();
        let pipeline = ClassificationPipeline::new(counts(40))
            .unwrap()
            .with_n_trees(5)
            .with_seed(10);
        let report = pipeline.run(&grid, &stack, &region, 10.0).unwrap();

        let table = StratifiedSampler::new(counts(40))
            .unwrap()
            .with_seed(derive_seed(10, SAMPLE_STREAM))
            .sample(&grid, &stack, &region, 10.0)
            .unwrap();
        let split = RandomSplit::new(0.7)
            .unwrap()
            .with_seed(derive_seed(10, SPLIT_STREAM))
            .split(&table);
        assert_eq!(report.n_train, split.train.len());

        let names = table.schema().names().to_vec();
        let forest = RandomForestConfig::new(5)
            .unwrap()
            .with_seed(derive_seed(10, FOREST_STREAM))
            .with_oob_mode(OobMode::Enabled)
            .fit(&split.train, &names)
            .unwrap()
            .into_forest();
        assert_eq!(report.forest_model, Classifier::from(forest));
    }
}
