use std::path::PathBuf;

use landcover_table::TableError;

/// Errors from tree and forest training, prediction, evaluation and model I/O.
#[derive(Debug, thiserror::Error)]
pub enum RfError {
    /// Returned when n_trees is zero.
    #[error("n_trees must be at least 1, got {n_trees}")]
    InvalidTreeCount {
        /// The invalid n_trees value provided.
        n_trees: usize,
    },

    /// Returned when max_depth is zero.
    #[error("max_depth must be at least 1, got {max_depth}")]
    InvalidMaxDepth {
        /// The invalid max_depth value provided.
        max_depth: usize,
    },

    /// Returned when min_samples_split is less than 2.
    #[error("min_samples_split must be at least 2, got {min_samples_split}")]
    InvalidMinSamplesSplit {
        /// The invalid min_samples_split value provided.
        min_samples_split: usize,
    },

    /// Returned when min_samples_leaf is zero.
    #[error("min_samples_leaf must be at least 1, got {min_samples_leaf}")]
    InvalidMinSamplesLeaf {
        /// The invalid min_samples_leaf value provided.
        min_samples_leaf: usize,
    },

    /// Returned when max_features resolves to 0 or exceeds the predictor count.
    #[error("max_features resolved to {max_features}, but must be in [1, {n_features}]")]
    InvalidMaxFeatures {
        /// The resolved max_features value.
        max_features: usize,
        /// The number of predictors.
        n_features: usize,
    },

    /// Returned when a model is fit on a table with zero rows.
    #[error("cannot fit {model} on an empty training table (0 rows, {n_predictors} predictors)")]
    EmptyTable {
        /// Which model was being fit.
        model: &'static str,
        /// Number of predictors requested.
        n_predictors: usize,
    },

    /// Returned when a train/test split leaves no rows to evaluate on.
    #[error("the test partition is empty ({n_train} training rows); lower the train fraction")]
    EmptyTestSet {
        /// Number of rows that went to training.
        n_train: usize,
    },

    /// Returned when the predictor list is empty.
    #[error("at least one predictor attribute is required")]
    NoPredictors,

    /// Returned when a raw value slice has the wrong width at prediction time.
    #[error("prediction input has {got} values, model expects {expected}")]
    PredictionFeatureMismatch {
        /// The number of predictors the model was trained on.
        expected: usize,
        /// The number of values supplied.
        got: usize,
    },

    /// Returned when a confusion matrix is requested from zero label pairs.
    #[error("cannot build a confusion matrix from zero label pairs")]
    EmptyLabels,

    /// Returned when the reference and predicted sequences differ in length.
    #[error("reference has {reference} labels but predictions have {predicted}")]
    LabelLengthMismatch {
        /// Length of the reference sequence.
        reference: usize,
        /// Length of the predicted sequence.
        predicted: usize,
    },

    /// Returned when explicit confusion counts are malformed.
    #[error("invalid confusion matrix: {reason}")]
    InvalidConfusionMatrix {
        /// Human-readable description of the problem.
        reason: String,
    },

    /// Returned when OOB evaluation fails (no row is out-of-bag for any tree).
    #[error("OOB evaluation failed: {reason}")]
    OobEvaluationFailed {
        /// Human-readable description of why OOB evaluation failed.
        reason: String,
    },

    /// Returned when model serialization fails.
    #[error("failed to serialize model")]
    SerializeModel {
        /// The underlying bincode error.
        source: Box<bincode::ErrorKind>,
    },

    /// Returned when model deserialization fails.
    #[error("failed to deserialize model from {path}")]
    DeserializeModel {
        /// Path to the model file that could not be deserialized.
        path: PathBuf,
        /// The underlying bincode error.
        source: Box<bincode::ErrorKind>,
    },

    /// Returned when writing the model file fails.
    #[error("failed to write model to {path}")]
    WriteModel {
        /// Path to the file that could not be written.
        path: PathBuf,
        /// The underlying I/O error.
        source: std::io::Error,
    },

    /// Returned when reading the model file fails.
    #[error("failed to read model from {path}")]
    ReadModel {
        /// Path to the file that could not be read.
        path: PathBuf,
        /// The underlying I/O error.
        source: std::io::Error,
    },

    /// Returned when loading a model with an incompatible format version.
    #[error("incompatible model version in {path}: expected {expected}, found {found}")]
    IncompatibleModelVersion {
        /// The model format version this build expects.
        expected: u32,
        /// The model format version found in the file.
        found: u32,
        /// Path to the model file with the incompatible version.
        path: PathBuf,
    },

    /// Wraps a table, schema or sampling error.
    #[error(transparent)]
    Table(#[from] TableError),
}
