//! Domain types for landcover-io.

use landcover_table::{ClassLabel, FeatureTable};

use crate::IoError;

/// Label given to rows read without a label column.
///
/// Code 0 is the no-data value of the land-cover products this pipeline
/// classifies, so it never collides with a real class.
pub const NO_DATA: ClassLabel = ClassLabel::new(0);

/// A validated experiment name for output file naming.
///
/// Must match `[a-zA-Z0-9_-]+`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExperimentName(String);

impl ExperimentName {
    /// Parse and validate an experiment name.
    ///
    /// # Errors
    ///
    /// Returns [`IoError::InvalidExperimentName`] if the name is empty or
    /// contains characters outside `[a-zA-Z0-9_-]`.
    pub fn new(name: String) -> Result<Self, IoError> {
        if name.is_empty()
            || !name
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
        {
            return Err(IoError::InvalidExperimentName { name });
        }
        Ok(Self(name))
    }

    /// Return the experiment name as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for ExperimentName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Sample rows read from a CSV file.
///
/// Produced by [`TableReader`](crate::TableReader).
#[derive(Debug)]
pub struct SampleDataset {
    table: FeatureTable,
    labeled: bool,
    n_read: usize,
    n_dropped: usize,
}

impl SampleDataset {
    pub(crate) fn new(table: FeatureTable, labeled: bool, n_read: usize, n_dropped: usize) -> Self {
        Self {
            table,
            labeled,
            n_read,
            n_dropped,
        }
    }

    /// Return the feature table.
    #[must_use]
    pub fn table(&self) -> &FeatureTable {
        &self.table
    }

    /// Consume the dataset and return the feature table.
    #[must_use]
    pub fn into_table(self) -> FeatureTable {
        self.table
    }

    /// Whether rows carry reference labels. When `false`, every row is
    /// labeled [`NO_DATA`].
    #[must_use]
    pub fn is_labeled(&self) -> bool {
        self.labeled
    }

    /// Return the number of data rows read.
    #[must_use]
    pub fn n_read(&self) -> usize {
        self.n_read
    }

    /// Return the number of rows dropped for missing predictor values.
    #[must_use]
    pub fn n_dropped(&self) -> usize {
        self.n_dropped
    }
}
