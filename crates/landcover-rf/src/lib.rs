//! Land-cover classification: train, evaluate, predict.
//!
//! CART decision trees and random forests over
//! [`FeatureTable`](landcover_table::FeatureTable)s, with Gini/Entropy split
//! criteria, parallel and reproducible training via rayon, Mean Decrease in
//! Impurity importance, out-of-bag evaluation, confusion-matrix accuracy
//! assessment (overall, producer's and consumer's accuracy, Cohen's kappa),
//! raster classification and model serialization.

mod classifier;
mod config;
mod confusion;
mod dataset;
mod error;
mod explain;
mod forest;
mod importance;
mod node;
mod oob;
mod pipeline;
mod raster;
mod result;
mod serialize;
mod split;
mod tree;

pub use classifier::Classifier;
pub use config::{MaxFeatures, OobMode, RandomForestConfig};
pub use confusion::{ClassMetrics, ConfusionMatrix};
pub use error::RfError;
pub use explain::ModelExplanation;
pub use forest::RandomForest;
pub use importance::RankedFeature;
pub use node::{DecisionNode, FeatureIndex, Impurity};
pub use oob::OobScore;
pub use pipeline::{ClassificationPipeline, Evaluation, PipelineReport};
pub use raster::{classify_raster, reference_agreement};
pub use result::{RandomForestResult, TrainingMetadata};
pub use split::SplitCriterion;
pub use tree::{DecisionTree, DecisionTreeConfig};
