//! Confusion matrix and accuracy metrics for land-cover assessment.

use std::fmt;

use landcover_table::ClassLabel;

use crate::error::RfError;

/// `1 - p_e` below this makes kappa undefined.
const KAPPA_EPS: f64 = 1e-12;

/// A square error matrix over an ordered set of class labels.
///
/// Rows are reference labels, columns are predicted labels, both in the
/// ascending order of [`ConfusionMatrix::labels`]. Entry
/// `matrix[i][j]` counts items of reference class `labels[i]` predicted
/// as `labels[j]`.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct ConfusionMatrix {
    labels: Vec<ClassLabel>,
    matrix: Vec<Vec<u64>>,
}

/// Per-class accuracy figures.
///
/// Ratios with a zero denominator are `NaN` rather than 0.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct ClassMetrics {
    /// The class.
    pub label: ClassLabel,
    /// Producer's accuracy (recall): correct / reference total for the class.
    pub producers: f64,
    /// Consumer's accuracy (precision): correct / predicted total for the class.
    pub consumers: f64,
    /// Harmonic mean of producer's and consumer's accuracy; `NaN` when
    /// either is `NaN` or both are zero.
    pub f1: f64,
    /// Number of reference items of this class.
    pub support: u64,
}

impl ConfusionMatrix {
    /// Build a confusion matrix from paired reference and predicted labels.
    ///
    /// The label set is the sorted union of both sequences.
    ///
    /// # Errors
    ///
    /// | Variant | Condition |
    /// |---|---|
    /// | [`RfError::EmptyLabels`] | zero pairs |
    /// | [`RfError::LabelLengthMismatch`] | sequences differ in length |
    pub fn from_labels(reference: &[ClassLabel], predicted: &[ClassLabel]) -> Result<Self, RfError> {
        if reference.len() != predicted.len() {
            return Err(RfError::LabelLengthMismatch {
                reference: reference.len(),
                predicted: predicted.len(),
            });
        }
        if reference.is_empty() {
            return Err(RfError::EmptyLabels);
        }

        let mut labels: Vec<ClassLabel> = reference.iter().chain(predicted).copied().collect();
        labels.sort_unstable();
        labels.dedup();

        let n = labels.len();
        let mut matrix = vec![vec![0u64; n]; n];
        for (r, p) in reference.iter().zip(predicted) {
            // Both are in `labels` by construction.
            if let (Ok(i), Ok(j)) = (labels.binary_search(r), labels.binary_search(p)) {
                matrix[i][j] += 1;
            }
        }
        Ok(Self { labels, matrix })
    }

    /// Build a confusion matrix from explicit counts.
    ///
    /// # Errors
    ///
    /// Returns [`RfError::InvalidConfusionMatrix`] when `labels` is empty,
    /// not strictly ascending, or `matrix` is not `labels.len()` square.
    pub fn from_counts(labels: Vec<ClassLabel>, matrix: Vec<Vec<u64>>) -> Result<Self, RfError> {
        if labels.is_empty() {
            return Err(RfError::InvalidConfusionMatrix {
                reason: "no labels".to_string(),
            });
        }
        if labels.windows(2).any(|w| w[0] >= w[1]) {
            return Err(RfError::InvalidConfusionMatrix {
                reason: "labels must be strictly ascending".to_string(),
            });
        }
        let n = labels.len();
        if matrix.len() != n || matrix.iter().any(|row| row.len() != n) {
            return Err(RfError::InvalidConfusionMatrix {
                reason: format!("expected a {n}x{n} matrix"),
            });
        }
        Ok(Self { labels, matrix })
    }

    /// Return the ordered class labels indexing rows and columns.
    #[must_use]
    pub fn labels(&self) -> &[ClassLabel] {
        &self.labels
    }

    /// Return the number of classes.
    #[must_use]
    pub fn n_classes(&self) -> usize {
        self.labels.len()
    }

    /// Return the underlying matrix rows.
    #[must_use]
    pub fn as_rows(&self) -> &[Vec<u64>] {
        &self.matrix
    }

    /// Return the count for a reference/predicted pair, 0 for unknown labels.
    #[must_use]
    pub fn count(&self, reference: ClassLabel, predicted: ClassLabel) -> u64 {
        match (self.labels.binary_search(&reference), self.labels.binary_search(&predicted)) {
            (Ok(i), Ok(j)) => self.matrix[i][j],
            _ => 0,
        }
    }

    /// Total number of items.
    #[must_use]
    pub fn total(&self) -> u64 {
        self.matrix.iter().flatten().sum()
    }

    /// Sum of the diagonal.
    #[must_use]
    pub fn correct(&self) -> u64 {
        (0..self.n_classes()).map(|i| self.matrix[i][i]).sum()
    }

    /// Reference totals per class.
    #[must_use]
    pub fn row_sums(&self) -> Vec<u64> {
        self.matrix.iter().map(|row| row.iter().sum()).collect()
    }

    /// Predicted totals per class.
    #[must_use]
    pub fn col_sums(&self) -> Vec<u64> {
        (0..self.n_classes())
            .map(|j| self.matrix.iter().map(|row| row[j]).sum())
            .collect()
    }

    /// Overall accuracy: correct / total. `NaN` for an all-zero matrix.
    #[must_use]
    pub fn accuracy(&self) -> f64 {
        ratio(self.correct(), self.total())
    }

    /// Producer's accuracy per class, aligned with [`Self::labels`].
    #[must_use]
    pub fn producers_accuracy(&self) -> Vec<f64> {
        self.row_sums()
            .iter()
            .enumerate()
            .map(|(i, &sum)| ratio(self.matrix[i][i], sum))
            .collect()
    }

    /// Consumer's accuracy per class, aligned with [`Self::labels`].
    #[must_use]
    pub fn consumers_accuracy(&self) -> Vec<f64> {
        self.col_sums()
            .iter()
            .enumerate()
            .map(|(j, &sum)| ratio(self.matrix[j][j], sum))
            .collect()
    }

    /// Cohen's kappa: `(p_o - p_e) / (1 - p_e)`.
    ///
    /// `NaN` when the matrix is empty or `1 - p_e` is effectively zero
    /// (for example a single-class matrix).
    #[must_use]
    pub fn kappa(&self) -> f64 {
        let total = self.total();
        if total == 0 {
            return f64::NAN;
        }
        let n = total as f64;
        let p_o = self.correct() as f64 / n;
        let p_e: f64 = self
            .row_sums()
            .iter()
            .zip(self.col_sums())
            .map(|(&r, c)| (r as f64 / n) * (c as f64 / n))
            .sum();
        let denom = 1.0 - p_e;
        if denom.abs() < KAPPA_EPS {
            return f64::NAN;
        }
        (p_o - p_e) / denom
    }

    /// Producer's, consumer's, F1 and support for every class.
    #[must_use]
    pub fn class_metrics(&self) -> Vec<ClassMetrics> {
        let producers = self.producers_accuracy();
        let consumers = self.consumers_accuracy();
        let support = self.row_sums();
        self.labels
            .iter()
            .enumerate()
            .map(|(i, &label)| {
                let (p, c) = (producers[i], consumers[i]);
                let f1 = if p + c == 0.0 { f64::NAN } else { 2.0 * p * c / (p + c) };
                ClassMetrics {
                    label,
                    producers: p,
                    consumers: c,
                    f1,
                    support: support[i],
                }
            })
            .collect()
    }
}

fn ratio(num: u64, den: u64) -> f64 {
    if den == 0 {
        f64::NAN
    } else {
        num as f64 / den as f64
    }
}

impl fmt::Display for ConfusionMatrix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:>10}", "ref\\pred")?;
        for label in &self.labels {
            write!(f, " {:>8}", label.code())?;
        }
        writeln!(f)?;

        for (label, row) in self.labels.iter().zip(&self.matrix) {
            write!(f, "{:>10}", label.code())?;
            for val in row {
                write!(f, " {val:>8}")?;
            }
            writeln!(f)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use landcover_table::ClassLabel;

    use super::ConfusionMatrix;
    use crate::RfError;

    fn labels(codes: &[i32]) -> Vec<ClassLabel> {
        codes.iter().copied().map(ClassLabel::new).collect()
    }

    #[test]
    fn perfect_predictions() {
        let r = labels(&[10, 10, 40, 40, 80, 80]);
        let cm = ConfusionMatrix::from_labels(&r, &r).unwrap();
        assert!((cm.accuracy() - 1.0).abs() < f64::EPSILON);
        assert!((cm.kappa() - 1.0).abs() < 1e-12);
        for m in cm.class_metrics() {
            assert!((m.producers - 1.0).abs() < f64::EPSILON);
            assert!((m.consumers - 1.0).abs() < f64::EPSILON);
            assert!((m.f1 - 1.0).abs() < f64::EPSILON);
        }
    }

    #[test]
    fn two_class_worked_example() {
        // [[40, 10], [5, 45]]
        let cm = ConfusionMatrix::from_counts(labels(&[10, 40]), vec![vec![40, 10], vec![5, 45]])
            .unwrap();
        assert!((cm.accuracy() - 0.85).abs() < 1e-12);
        let pa = cm.producers_accuracy();
        assert!((pa[0] - 0.8).abs() < 1e-12);
        assert!((pa[1] - 0.9).abs() < 1e-12);
        let ca = cm.consumers_accuracy();
        assert!((ca[0] - 40.0 / 45.0).abs() < 1e-12);
        assert!((ca[1] - 45.0 / 55.0).abs() < 1e-12);
        // p_e = 0.5·0.45 + 0.5·0.55 = 0.5
        assert!((cm.kappa() - 0.7).abs() < 1e-12);
    }

    #[test]
    fn label_set_is_sorted_union() {
        let cm = ConfusionMatrix::from_labels(&labels(&[40, 10]), &labels(&[80, 10])).unwrap();
        assert_eq!(cm.labels(), labels(&[10, 40, 80]).as_slice());
        assert_eq!(cm.count(ClassLabel::new(40), ClassLabel::new(80)), 1);
        assert_eq!(cm.count(ClassLabel::new(10), ClassLabel::new(10)), 1);
        assert_eq!(cm.count(ClassLabel::new(95), ClassLabel::new(10)), 0);
        assert_eq!(cm.total(), 2);
    }

    #[test]
    fn never_predicted_class_has_nan_consumers() {
        let cm = ConfusionMatrix::from_labels(&labels(&[10, 40]), &labels(&[10, 10])).unwrap();
        let ca = cm.consumers_accuracy();
        assert!((ca[0] - 0.5).abs() < 1e-12);
        assert!(ca[1].is_nan());
        let pa = cm.producers_accuracy();
        assert!((pa[1] - 0.0).abs() < f64::EPSILON);
    }

    #[test]
    fn absent_reference_class_has_nan_producers() {
        let cm = ConfusionMatrix::from_labels(&labels(&[10, 10]), &labels(&[10, 40])).unwrap();
        assert!(cm.producers_accuracy()[1].is_nan());
        assert!(cm.class_metrics()[1].f1.is_nan());
    }

    #[test]
    fn never_correct_class_has_nan_f1() {
        let cm = ConfusionMatrix::from_labels(&labels(&[10, 40]), &labels(&[40, 10])).unwrap();
        for m in cm.class_metrics() {
            assert_eq!(m.producers, 0.0);
            assert_eq!(m.consumers, 0.0);
            assert!(m.f1.is_nan());
            assert_eq!(m.support, 1);
        }
    }

    #[test]
    fn single_class_kappa_is_nan() {
        let r = labels(&[50, 50, 50]);
        let cm = ConfusionMatrix::from_labels(&r, &r).unwrap();
        assert!((cm.accuracy() - 1.0).abs() < f64::EPSILON);
        assert!(cm.kappa().is_nan());
    }

    #[test]
    fn scaled_identity_kappa_is_one() {
        let cm = ConfusionMatrix::from_counts(
            labels(&[10, 20, 30]),
            vec![vec![7, 0, 0], vec![0, 7, 0], vec![0, 0, 7]],
        )
        .unwrap();
        assert!((cm.kappa() - 1.0).abs() < 1e-12);
    }

    #[test]
    fn independent_marginals_kappa_is_zero() {
        // Outer product of row marginals [2, 1] and column marginals [1, 3].
        let cm = ConfusionMatrix::from_counts(labels(&[10, 40]), vec![vec![2, 6], vec![1, 3]])
            .unwrap();
        assert!(cm.kappa().abs() < 1e-12);
    }

    #[test]
    fn empty_and_mismatched_inputs_rejected() {
        assert!(matches!(ConfusionMatrix::from_labels(&[], &[]), Err(RfError::EmptyLabels)));
        assert!(matches!(
            ConfusionMatrix::from_labels(&labels(&[10]), &labels(&[10, 40])),
            Err(RfError::LabelLengthMismatch { reference: 1, predicted: 2 })
        ));
    }

    #[test]
    fn from_counts_validates_shape() {
        assert!(ConfusionMatrix::from_counts(vec![], vec![]).is_err());
        assert!(ConfusionMatrix::from_counts(labels(&[40, 10]), vec![vec![1, 0], vec![0, 1]]).is_err());
        assert!(ConfusionMatrix::from_counts(labels(&[10, 40]), vec![vec![1, 0]]).is_err());
    }

    #[test]
    fn all_zero_counts_give_nan() {
        let cm = ConfusionMatrix::from_counts(labels(&[10, 40]), vec![vec![0, 0], vec![0, 0]]).unwrap();
        assert!(cm.accuracy().is_nan());
        assert!(cm.kappa().is_nan());
    }

    #[test]
    fn display_has_codes() {
        let cm = ConfusionMatrix::from_labels(&labels(&[10, 40]), &labels(&[10, 40])).unwrap();
        let output = format!("{cm}");
        assert!(output.contains("ref\\pred"));
        assert!(output.contains("40"));
    }
}
