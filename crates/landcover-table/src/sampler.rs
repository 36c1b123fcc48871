//! Class-balanced stratified sampling of labeled raster pixels.

use std::collections::BTreeMap;

use rand::SeedableRng;
use rand::seq::SliceRandom;
use rand_chacha::ChaCha8Rng;
use tracing::{debug, info, instrument};

use crate::error::TableError;
use crate::label::ClassLabel;
use crate::raster::{LabeledPixel, LabeledRaster, PredictorRaster, Region};
use crate::seed::derive_seed;
use crate::table::FeatureTable;

/// Draws up to a requested number of pixels per class, uniformly at random
/// among the pixels carrying that label.
///
/// Classes with fewer pixels than requested contribute all of them; classes
/// absent from the region contribute nothing. Neither is an error.
#[derive(Debug, Clone)]
pub struct StratifiedSampler {
    class_counts: BTreeMap<ClassLabel, usize>,
    seed: u64,
}

impl StratifiedSampler {
    /// Create a sampler from a per-class target count map.
    ///
    /// # Errors
    ///
    /// Returns [`TableError::InvalidSampleCount`] if any count is zero.
    pub fn new(class_counts: BTreeMap<ClassLabel, usize>) -> Result<Self, TableError> {
        if let Some((class, &count)) = class_counts.iter().find(|&(_, &n)| n == 0) {
            return Err(TableError::InvalidSampleCount {
                class: class.code(),
                count,
            });
        }
        Ok(Self {
            class_counts,
            seed: 42,
        })
    }

    /// Set the random seed.
    #[must_use]
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Return the per-class target counts.
    #[must_use]
    pub fn class_counts(&self) -> &BTreeMap<ClassLabel, usize> {
        &self.class_counts
    }

    /// Return the random seed.
    #[must_use]
    pub fn seed(&self) -> u64 {
        self.seed
    }

    /// Draw pixel locations, grouped by ascending class label.
    ///
    /// Each class uses its own RNG stream derived from the seed and the
    /// class code, so adding a class does not change the draws of another.
    ///
    /// # Errors
    ///
    /// Propagates [`TableError::InvalidScale`] from the raster.
    #[instrument(skip_all, fields(n_classes = self.class_counts.len(), scale = scale, seed = self.seed))]
    pub fn sample_pixels<R: LabeledRaster + ?Sized>(
        &self,
        raster: &R,
        region: &Region,
        scale: f64,
    ) -> Result<Vec<LabeledPixel>, TableError> {
        let mut by_class: BTreeMap<ClassLabel, Vec<LabeledPixel>> = BTreeMap::new();
        for pixel in raster.labeled_pixels(region, scale)? {
            if self.class_counts.contains_key(&pixel.label) {
                by_class.entry(pixel.label).or_default().push(pixel);
            }
        }

        let mut drawn = Vec::new();
        for (&class, &requested) in &self.class_counts {
            let Some(candidates) = by_class.get_mut(&class) else {
                debug!(%class, requested, available = 0, "class absent from region");
                continue;
            };
            let available = candidates.len();
            if available <= requested {
                if available < requested {
                    debug!(%class, requested, available, "class under-sampled");
                }
                drawn.extend_from_slice(candidates);
                continue;
            }
            let mut rng = ChaCha8Rng::seed_from_u64(derive_seed(self.seed, class.code() as u32 as u64));
            let (chosen, _) = candidates.partial_shuffle(&mut rng, requested);
            let mut chosen = chosen.to_vec();
            chosen.sort_by_key(|p| (p.location.row, p.location.col));
            drawn.extend(chosen);
        }

        info!(n_pixels = drawn.len(), "stratified sample drawn");
        Ok(drawn)
    }

    /// Draw pixels and extract their predictor values into a table.
    ///
    /// # Errors
    ///
    /// Propagates raster errors from sampling and extraction.
    pub fn sample<L, P>(
        &self,
        labels: &L,
        predictors: &P,
        region: &Region,
        scale: f64,
    ) -> Result<FeatureTable, TableError>
    where
        L: LabeledRaster + ?Sized,
        P: PredictorRaster + ?Sized,
    {
        let pixels = self.sample_pixels(labels, region, scale)?;
        predictors.extract(&pixels, scale)
    }
}

/// Count labeled pixels per class inside `region`.
///
/// # Errors
///
/// Propagates [`TableError::InvalidScale`] from the raster.
pub fn class_histogram<R: LabeledRaster + ?Sized>(
    raster: &R,
    region: &Region,
    scale: f64,
) -> Result<BTreeMap<ClassLabel, usize>, TableError> {
    let mut hist = BTreeMap::new();
    for pixel in raster.labeled_pixels(region, scale)? {
        *hist.entry(pixel.label).or_insert(0) += 1;
    }
    Ok(hist)
}

/// Return the target classes that actually occur in `region`, ascending.
///
/// # Errors
///
/// Propagates [`TableError::InvalidScale`] from the raster.
pub fn present_classes<R: LabeledRaster + ?Sized>(
    raster: &R,
    region: &Region,
    scale: f64,
    targets: &[ClassLabel],
) -> Result<Vec<ClassLabel>, TableError> {
    let hist = class_histogram(raster, region, scale)?;
    Ok(hist.into_keys().filter(|c| targets.contains(c)).collect())
}

/// Build a target map requesting `per_class` pixels for every class.
#[must_use]
pub fn balanced_counts(classes: &[ClassLabel], per_class: usize) -> BTreeMap<ClassLabel, usize> {
    classes.iter().map(|&c| (c, per_class)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::raster::{BandStack, GridGeometry, LabelGrid};

    /// 20x10 grid: columns 0-9 are class 10, 10-17 class 40, 18-19 class 80.
    fn make_grid() -> (LabelGrid, BandStack, Region) {
        let geometry = GridGeometry::new(0.0, 100.0, 10.0, 20, 10).unwrap();
        let mut cells = Vec::new();
        let mut band = Vec::new();
        for _row in 0..10 {
            for col in 0..20 {
                let code = match col {
                    0..=9 => 10,
                    10..=17 => 40,
                    _ => 80,
                };
                cells.push(Some(ClassLabel::new(code)));
                band.push(col as f64);
            }
        }
        let labels = LabelGrid::new(geometry, cells).unwrap();
        let stack = BandStack::new(geometry, vec![("x".to_string(), band)]).unwrap();
        let region = Region::new(0.0, 0.0, 200.0, 100.0).unwrap();
        (labels, stack, region)
    }

    fn counts(pixels: &[LabeledPixel]) -> BTreeMap<i32, usize> {
        let mut out = BTreeMap::new();
        for p in pixels {
            *out.entry(p.label.code()).or_insert(0) += 1;
        }
        out
    }

    #[test]
    fn exact_counts_when_enough_pixels() {
        let (labels, _, region) = make_grid();
        let targets = balanced_counts(&[ClassLabel::new(10), ClassLabel::new(40)], 25);
        let pixels = StratifiedSampler::new(targets)
            .unwrap()
            .sample_pixels(&labels, &region, 10.0)
            .unwrap();
        assert_eq!(counts(&pixels), BTreeMap::from([(10, 25), (40, 25)]));
    }

    #[test]
    fn under_supplied_class_returns_all() {
        let (labels, _, region) = make_grid();
        let targets = balanced_counts(&[ClassLabel::new(80)], 500);
        let pixels = StratifiedSampler::new(targets)
            .unwrap()
            .sample_pixels(&labels, &region, 10.0)
            .unwrap();
        assert_eq!(pixels.len(), 20);
    }

    #[test]
    fn absent_class_contributes_nothing() {
        let (labels, _, region) = make_grid();
        let targets = balanced_counts(&[ClassLabel::new(50), ClassLabel::new(10)], 5);
        let pixels = StratifiedSampler::new(targets)
            .unwrap()
            .sample_pixels(&labels, &region, 10.0)
            .unwrap();
        assert_eq!(counts(&pixels), BTreeMap::from([(10, 5)]));
    }

    #[test]
    fn draws_reproducible_for_seed() {
        let (labels, _, region) = make_grid();
        let targets = balanced_counts(&[ClassLabel::new(10), ClassLabel::new(40)], 10);
        let sampler = StratifiedSampler::new(targets).unwrap().with_seed(7);
        let a = sampler.sample_pixels(&labels, &region, 10.0).unwrap();
        let b = sampler.sample_pixels(&labels, &region, 10.0).unwrap();
        assert_eq!(a, b);

        let c = sampler.clone().with_seed(8).sample_pixels(&labels, &region, 10.0).unwrap();
        assert_ne!(a, c);
    }

    #[test]
    fn drawn_pixels_are_distinct() {
        let (labels, _, region) = make_grid();
        let targets = balanced_counts(&[ClassLabel::new(10)], 60);
        let pixels = StratifiedSampler::new(targets)
            .unwrap()
            .sample_pixels(&labels, &region, 10.0)
            .unwrap();
        let mut locations: Vec<_> = pixels.iter().map(|p| p.location).collect();
        locations.sort();
        locations.dedup();
        assert_eq!(locations.len(), 60);
    }

    #[test]
    fn zero_count_rejected() {
        let targets = BTreeMap::from([(ClassLabel::new(10), 0)]);
        assert!(matches!(
            StratifiedSampler::new(targets),
            Err(TableError::InvalidSampleCount { class: 10, count: 0 })
        ));
    }

    #[test]
    fn sample_extracts_features() {
        let (labels, stack, region) = make_grid();
        let targets = balanced_counts(&[ClassLabel::new(10), ClassLabel::new(40)], 8);
        let table = StratifiedSampler::new(targets)
            .unwrap()
            .sample(&labels, &stack, &region, 10.0)
            .unwrap();
        assert_eq!(table.len(), 16);
        for row in &table {
            let x = row.values()[0];
            match row.label().code() {
                10 => assert!(x < 10.0),
                40 => assert!((10.0..18.0).contains(&x)),
                other => panic!("unexpected class {other}"),
            }
        }
    }

    #[test]
    fn histogram_and_presence() {
        let (labels, _, region) = make_grid();
        let hist = class_histogram(&labels, &region, 10.0).unwrap();
        assert_eq!(hist[&ClassLabel::new(10)], 100);
        assert_eq!(hist[&ClassLabel::new(40)], 80);
        assert_eq!(hist[&ClassLabel::new(80)], 20);

        let targets = [ClassLabel::new(80), ClassLabel::new(20), ClassLabel::new(10)];
        let present = present_classes(&labels, &region, 10.0, &targets).unwrap();
        assert_eq!(present, vec![ClassLabel::new(10), ClassLabel::new(80)]);
    }
}
