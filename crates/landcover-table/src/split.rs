//! Seeded record-level train/test partitioning.

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use tracing::{debug, instrument};

use crate::error::TableError;
use crate::table::FeatureTable;

/// Deterministic random split of a table into train and test subsets.
///
/// Every row receives a pseudorandom value in `[0, 1)` drawn from a
/// ChaCha8 stream seeded with `seed`, in row order. Rows whose value is
/// below the train proportion go to train, the rest to test. The split is
/// record-level, not stratified.
#[derive(Debug, Clone, Copy)]
pub struct RandomSplit {
    proportion: f64,
    seed: u64,
}

/// The two disjoint halves of a [`RandomSplit`].
#[derive(Debug, Clone)]
pub struct SplitResult {
    /// Rows whose random value fell below the train proportion.
    pub train: FeatureTable,
    /// All remaining rows.
    pub test: FeatureTable,
}

impl RandomSplit {
    /// Create a split with the given train proportion.
    ///
    /// Proportions `<= 0` send every row to test and `>= 1` send every row
    /// to train; training on the resulting empty table is the caller's error.
    ///
    /// # Errors
    ///
    /// Returns [`TableError::InvalidProportion`] if `proportion` is NaN.
    pub fn new(proportion: f64) -> Result<Self, TableError> {
        if proportion.is_nan() {
            return Err(TableError::InvalidProportion { proportion });
        }
        Ok(Self {
            proportion,
            seed: 42,
        })
    }

    /// Set the random seed.
    #[must_use]
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Return the train proportion.
    #[must_use]
    pub fn proportion(&self) -> f64 {
        self.proportion
    }

    /// Return the random seed.
    #[must_use]
    pub fn seed(&self) -> u64 {
        self.seed
    }

    /// Return the random value assigned to each row position.
    #[must_use]
    pub fn row_values(&self, n_rows: usize) -> Vec<f64> {
        let mut rng = ChaCha8Rng::seed_from_u64(self.seed);
        (0..n_rows).map(|_| rng.r#gen::<f64>()).collect()
    }

    /// Partition `table` into train and test subsets.
    #[instrument(skip_all, fields(n_rows = table.len(), proportion = self.proportion, seed = self.seed))]
    pub fn split(&self, table: &FeatureTable) -> SplitResult {
        let mut train = Vec::with_capacity(table.len());
        let mut test = Vec::new();
        for (row, value) in table.iter().zip(self.row_values(table.len())) {
            if value < self.proportion {
                train.push(row.clone());
            } else {
                test.push(row.clone());
            }
        }
        debug!(n_train = train.len(), n_test = test.len(), "table split");
        SplitResult {
            train: FeatureTable::from_parts(table.shared_schema(), train),
            test: FeatureTable::from_parts(table.shared_schema(), test),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::label::ClassLabel;
    use crate::schema::Schema;

    fn make_table(n: usize) -> FeatureTable {
        let mut builder = FeatureTable::builder(Schema::new(["x"]).unwrap());
        for i in 0..n {
            let label = if i % 2 == 0 { 10 } else { 40 };
            builder.push(vec![i as f64], ClassLabel::new(label)).unwrap();
        }
        builder.build()
    }

    fn xs(table: &FeatureTable) -> Vec<f64> {
        table.iter().map(|r| r.values()[0]).collect()
    }

    #[test]
    fn deterministic_for_fixed_seed() {
        let table = make_table(200);
        let split = RandomSplit::new(0.7).unwrap().with_seed(7);
        let a = split.split(&table);
        let b = split.split(&table);
        assert_eq!(xs(&a.train), xs(&b.train));
        assert_eq!(xs(&a.test), xs(&b.test));
    }

    #[test]
    fn partition_is_disjoint_and_complete() {
        let table = make_table(500);
        let result = RandomSplit::new(0.7).unwrap().with_seed(42).split(&table);
        assert_eq!(result.train.len() + result.test.len(), 500);

        let mut all: Vec<f64> = xs(&result.train);
        all.extend(xs(&result.test));
        all.sort_by(f64::total_cmp);
        assert_eq!(all, xs(&table));
    }

    #[test]
    fn train_fraction_near_target() {
        let table = make_table(5000);
        let result = RandomSplit::new(0.7).unwrap().with_seed(3).split(&table);
        let fraction = result.train.len() as f64 / 5000.0;
        assert!((fraction - 0.7).abs() < 0.03, "fraction = {fraction}");
    }

    #[test]
    fn different_seeds_differ() {
        let table = make_table(100);
        let a = RandomSplit::new(0.5).unwrap().with_seed(1).split(&table);
        let b = RandomSplit::new(0.5).unwrap().with_seed(2).split(&table);
        assert_ne!(xs(&a.train), xs(&b.train));
    }

    #[test]
    fn extreme_proportions_empty_one_side() {
        let table = make_table(50);
        let all_test = RandomSplit::new(0.0).unwrap().split(&table);
        assert!(all_test.train.is_empty());
        assert_eq!(all_test.test.len(), 50);

        let all_train = RandomSplit::new(1.0).unwrap().split(&table);
        assert_eq!(all_train.train.len(), 50);
        assert!(all_train.test.is_empty());
    }

    #[test]
    fn nan_proportion_rejected() {
        assert!(matches!(
            RandomSplit::new(f64::NAN),
            Err(TableError::InvalidProportion { .. })
        ));
    }

    #[test]
    fn row_values_in_unit_interval() {
        let values = RandomSplit::new(0.5).unwrap().row_values(1000);
        assert!(values.iter().all(|v| (0.0..1.0).contains(v)));
    }
}
