//! Wall-to-wall classification of in-memory rasters.

use landcover_table::{
    BandStack, GridGeometry, LabelGrid, PredictorRaster, Region, StratifiedSampler, TableError,
    balanced_counts, class_histogram,
};
use rayon::iter::{IntoParallelIterator, ParallelIterator};
use tracing::{info, instrument};

use crate::classifier::Classifier;
use crate::confusion::ConfusionMatrix;
use crate::dataset::Projection;
use crate::error::RfError;

/// Classify every cell of `stack`.
///
/// Cells where any predictor band is missing (NaN) stay unlabeled. Bands
/// the classifier does not use are ignored.
///
/// # Errors
///
/// Returns [`RfError::Table`] when the stack lacks a predictor band.
#[instrument(skip_all, fields(kind = classifier.kind(), n_cells = stack.geometry().n_cells()))]
pub fn classify_raster(stack: &BandStack, classifier: &Classifier) -> Result<LabelGrid, RfError> {
    let projection = Projection::new(classifier.predictors(), stack.schema())?;
    let cells: Vec<_> = (0..stack.geometry().n_cells())
        .into_par_iter()
        .map(|idx| {
            let raw = stack.cell_values(idx)?;
            let values = projection.apply(&raw);
            values
                .iter()
                .all(|v| v.is_finite())
                .then(|| classifier.route(&values))
        })
        .collect();

    let n_labeled = cells.iter().filter(|c| c.is_some()).count();
    info!(n_labeled, "raster classified");
    Ok(LabelGrid::new(*stack.geometry(), cells)?)
}

/// Agreement between a reference map and a classified map.
///
/// Draws a stratified sample of about `n_points` reference pixels, split
/// evenly over the reference classes present in `region` (at least one per
/// class), and cross-tabulates reference against classified labels.
/// Sampled pixels the classified map leaves unlabeled are skipped.
///
/// # Errors
///
/// | Variant | Condition |
/// |---|---|
/// | [`RfError::Table`] | the grids differ in geometry, or `scale` is invalid |
/// | [`RfError::EmptyLabels`] | no sampled pixel is labeled in both maps |
#[instrument(skip_all, fields(n_points = n_points, scale = scale, seed = seed))]
pub fn reference_agreement(
    reference: &LabelGrid,
    classified: &LabelGrid,
    region: &Region,
    scale: f64,
    n_points: usize,
    seed: u64,
) -> Result<ConfusionMatrix, RfError> {
    check_same_geometry(reference.geometry(), classified.geometry())?;

    let classes: Vec<_> = class_histogram(reference, region, scale)?.into_keys().collect();
    if classes.is_empty() {
        return Err(RfError::EmptyLabels);
    }
    let per_class = (n_points / classes.len()).max(1);
    let sampler = StratifiedSampler::new(balanced_counts(&classes, per_class))?.with_seed(seed);
    let pixels = sampler.sample_pixels(reference, region, scale)?;

    let (truth, predicted): (Vec<_>, Vec<_>) = pixels
        .iter()
        .filter_map(|p| classified.get(p.location).map(|c| (p.label, c)))
        .unzip();
    ConfusionMatrix::from_labels(&truth, &predicted)
}

fn check_same_geometry(a: &GridGeometry, b: &GridGeometry) -> Result<(), TableError> {
    if a != b {
        return Err(TableError::GridGeometryMismatch {
            reason: format!(
                "reference is {}x{} at {}, classified is {}x{} at {}",
                a.width(),
                a.height(),
                a.pixel_size(),
                b.width(),
                b.height(),
                b.pixel_size()
            ),
        });
    }
    Ok(())
}
