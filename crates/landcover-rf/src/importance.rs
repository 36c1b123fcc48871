//! Ranking of Mean Decrease in Impurity scores.

/// A predictor with its importance score and rank.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct RankedFeature {
    /// Predictor name.
    pub name: String,
    /// Normalized importance (sums to 1.0 across predictors).
    pub importance: f64,
    /// 1-based rank (1 = most important).
    pub rank: usize,
}

/// Pair `scores` with `names`, sort descending and assign 1-based ranks.
///
/// Equal scores keep predictor order.
pub(crate) fn rank_features(names: &[String], scores: &[f64]) -> Vec<RankedFeature> {
    let mut features: Vec<RankedFeature> = names
        .iter()
        .zip(scores)
        .map(|(name, &importance)| RankedFeature {
            name: name.clone(),
            importance,
            rank: 0,
        })
        .collect();

    features.sort_by(|a, b| b.importance.total_cmp(&a.importance));
    for (i, feat) in features.iter_mut().enumerate() {
        feat.rank = i + 1;
    }
    features
}
