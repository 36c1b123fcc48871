//! Out-of-bag (OOB) evaluation for Random Forest.

use crate::confusion::ConfusionMatrix;
use crate::dataset::{TrainingData, majority};
use crate::error::RfError;
use crate::node::DecisionNode;

/// Out-of-bag evaluation result.
#[derive(Debug, Clone)]
pub struct OobScore {
    /// Fraction of OOB-evaluated rows predicted correctly.
    pub accuracy: f64,
    /// `1 - accuracy`.
    pub error: f64,
    /// Reference labels against OOB majority votes.
    pub confusion_matrix: ConfusionMatrix,
    /// Number of rows that were out-of-bag for at least one tree.
    pub n_oob_samples: usize,
}

/// Predict each training row with only the trees that did not see it.
///
/// Rows that were in every bootstrap sample are skipped.
pub(crate) fn compute_oob(
    trees: &[DecisionNode],
    data: &TrainingData,
    oob_indices_per_tree: &[Vec<usize>],
) -> Result<OobScore, RfError> {
    let n_samples = data.n_rows();
    let n_classes = data.n_classes();

    let mut oob_votes: Vec<Vec<usize>> = vec![vec![0; n_classes]; n_samples];
    let mut has_oob = vec![false; n_samples];

    for (tree, oob_indices) in trees.iter().zip(oob_indices_per_tree) {
        for &row in oob_indices {
            let label = tree.route(&data.row(row));
            if let Ok(idx) = data.classes.binary_search(&label) {
                oob_votes[row][idx] += 1;
                has_oob[row] = true;
            }
        }
    }

    let mut reference = Vec::new();
    let mut predicted = Vec::new();
    for (row, votes) in oob_votes.iter().enumerate() {
        if has_oob[row] {
            reference.push(data.classes[data.targets[row]]);
            predicted.push(data.classes[majority(votes)]);
        }
    }

    let n_oob_samples = reference.len();
    if n_oob_samples == 0 {
        return Err(RfError::OobEvaluationFailed {
            reason: "no row is out-of-bag for any tree".to_string(),
        });
    }

    let confusion_matrix = ConfusionMatrix::from_labels(&reference, &predicted)?;
    let accuracy = confusion_matrix.accuracy();

    Ok(OobScore {
        accuracy,
        error: 1.0 - accuracy,
        confusion_matrix,
        n_oob_samples,
    })
}
