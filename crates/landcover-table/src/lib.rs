//! Labeled feature tables for supervised land-cover classification.
//!
//! Pure data library with no file I/O. Provides the immutable
//! [`FeatureTable`] of per-pixel feature vectors, seeded train/test
//! splitting, in-memory label and predictor rasters, and class-balanced
//! stratified sampling of labeled pixels.

mod error;
mod label;
mod raster;
mod sampler;
mod schema;
mod seed;
mod split;
mod table;

pub use error::TableError;
pub use label::{ClassLabel, LandCoverClass};
pub use raster::{BandStack, GridGeometry, LabelGrid, LabeledPixel, LabeledRaster, PixelLocation, PredictorRaster, Region};
pub use sampler::{StratifiedSampler, balanced_counts, class_histogram, present_classes};
pub use schema::Schema;
pub use seed::derive_seed;
pub use split::{RandomSplit, SplitResult};
pub use table::{FeatureTable, FeatureVector, TableBuilder};
