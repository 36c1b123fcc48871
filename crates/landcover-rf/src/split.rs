use rand::Rng;

use crate::node::{FeatureIndex, Impurity};

/// A split must lower count-weighted impurity by more than this, per sample.
const MIN_DECREASE_PER_SAMPLE: f64 = 1e-12;

/// Criterion for measuring the quality of a split.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum SplitCriterion {
    /// Gini impurity: 1 - Σ(p_i²)
    #[default]
    Gini,
    /// Information entropy: -Σ(p_i · ln(p_i))
    Entropy,
}

impl SplitCriterion {
    /// Compute the impurity of a node from its class counts.
    ///
    /// Returns `0.0` when `n_samples` is zero.
    #[must_use]
    pub fn impurity(&self, class_counts: &[usize], n_samples: usize) -> Impurity {
        if n_samples == 0 {
            return Impurity::new(0.0);
        }
        let n = n_samples as f64;
        let value = match self {
            SplitCriterion::Gini => {
                let sum_sq: f64 = class_counts
                    .iter()
                    .map(|&c| {
                        let p = c as f64 / n;
                        p * p
                    })
                    .sum();
                1.0 - sum_sq
            }
            SplitCriterion::Entropy => -class_counts
                .iter()
                .filter(|&&c| c > 0)
                .map(|&c| {
                    let p = c as f64 / n;
                    p * p.ln()
                })
                .sum::<f64>(),
        };
        Impurity::new(value)
    }
}

/// Best split found for a node.
#[derive(Debug, Clone)]
pub(crate) struct SplitResult {
    pub(crate) feature: FeatureIndex,
    pub(crate) threshold: f64,
    /// `n·I − n_l·I_l − n_r·I_r`.
    pub(crate) impurity_decrease: f64,
    pub(crate) left_indices: Vec<usize>,
    pub(crate) right_indices: Vec<usize>,
}

/// Draw `max_features` distinct predictor positions out of `n_features`.
///
/// Returns the drawn positions in ascending order and the remaining
/// positions in the order they should be tried if none of the drawn ones
/// yields a valid split. When `max_features >= n_features` every predictor
/// is drawn and the RNG is not touched.
pub(crate) fn select_features(
    n_features: usize,
    max_features: usize,
    rng: &mut impl Rng,
) -> (Vec<usize>, Vec<usize>) {
    let mut order: Vec<usize> = (0..n_features).collect();
    if max_features >= n_features {
        return (order, Vec::new());
    }
    // Partial Fisher-Yates over the first `max_features` slots.
    for i in 0..max_features {
        let j = rng.gen_range(i..n_features);
        order.swap(i, j);
    }
    let rest = order.split_off(max_features);
    order.sort_unstable();
    (order, rest)
}

/// Find the split with the largest impurity decrease among `candidates`.
///
/// Candidates are scanned in the given order and thresholds ascending; a
/// later candidate only replaces the current best when strictly better, so
/// ties go to the earlier predictor and then the lower threshold. Predictor
/// order is the model's predictor list, not the source table's schema.
/// Thresholds are midpoints between consecutive distinct values and rows
/// with `value < threshold` go left.
///
/// Returns `None` when no boundary satisfies `min_samples_leaf` or when
/// the best decrease is not strictly positive.
///
/// `columns` is column-major: `columns[feature][row]`. `sample_indices`
/// index rows and may repeat (bootstrap samples).
pub(crate) fn find_best_split(
    columns: &[Vec<f64>],
    targets: &[usize],
    sample_indices: &[usize],
    n_classes: usize,
    criterion: SplitCriterion,
    candidates: &[usize],
    min_samples_leaf: usize,
) -> Option<SplitResult> {
    let n_samples = sample_indices.len();
    if n_samples < 2 || candidates.is_empty() {
        return None;
    }

    let mut parent_counts = vec![0usize; n_classes];
    for &si in sample_indices {
        parent_counts[targets[si]] += 1;
    }
    let parent_impurity = criterion.impurity(&parent_counts, n_samples);
    let weighted_parent = n_samples as f64 * parent_impurity.value();

    let mut best_decrease = f64::NEG_INFINITY;
    let mut best: Option<(usize, f64)> = None;
    let mut sorted: Vec<(f64, usize)> = Vec::with_capacity(n_samples);

    for &feat_idx in candidates {
        let col = &columns[feat_idx];

        sorted.clear();
        sorted.extend(sample_indices.iter().map(|&si| (col[si], targets[si])));
        // Stable sort keeps duplicate values in sample order.
        sorted.sort_by(|a, b| a.0.total_cmp(&b.0));

        let mut left_counts = vec![0usize; n_classes];
        let mut right_counts = parent_counts.clone();

        for i in 0..(n_samples - 1) {
            let (val_i, class_i) = sorted[i];
            left_counts[class_i] += 1;
            right_counts[class_i] -= 1;

            let val_next = sorted[i + 1].0;
            if val_i == val_next {
                continue;
            }

            let n_left = i + 1;
            let n_right = n_samples - n_left;
            if n_left < min_samples_leaf || n_right < min_samples_leaf {
                continue;
            }

            let left_impurity = criterion.impurity(&left_counts, n_left);
            let right_impurity = criterion.impurity(&right_counts, n_right);
            let decrease = weighted_parent
                - n_left as f64 * left_impurity.value()
                - n_right as f64 * right_impurity.value();

            if decrease > best_decrease {
                best_decrease = decrease;
                best = Some((feat_idx, midpoint(val_i, val_next)));
            }
        }
    }

    let (feat_idx, threshold) = best?;
    if best_decrease <= MIN_DECREASE_PER_SAMPLE * n_samples as f64 {
        return None;
    }

    let col = &columns[feat_idx];
    let (left_indices, right_indices): (Vec<usize>, Vec<usize>) =
        sample_indices.iter().partition(|&&si| col[si] < threshold);

    Some(SplitResult {
        feature: FeatureIndex::new(feat_idx),
        threshold,
        impurity_decrease: best_decrease,
        left_indices,
        right_indices,
    })
}

/// Midpoint of `lo < hi` that still sends `lo` left and `hi` right.
fn midpoint(lo: f64, hi: f64) -> f64 {
    let mid = lo + (hi - lo) / 2.0;
    if mid > lo && mid <= hi { mid } else { hi }
}
