//! CSV sample-table reader.

use std::path::{Path, PathBuf};

use landcover_table::{ClassLabel, FeatureTable, Schema};
use tracing::{debug, info, instrument};

use crate::IoError;
use crate::domain::{NO_DATA, SampleDataset};

const DEFAULT_LABEL_COLUMN: &str = "Map";

/// Reads a labeled sample table from a CSV file.
///
/// Expected CSV format:
/// - Header row required, one column per predictor plus the label column
/// - `B1,B2,...,Bn,Map` (column order is free, the label column is found by name)
/// - Label cells hold integer class codes (`10` or `10.0`)
///
/// Empty or non-numeric predictor cells count as missing, and rows with any
/// missing predictor are dropped rather than rejected.
///
/// # Defaults
///
/// | Setting | Default |
/// |---|---|
/// | label column | `Map` |
/// | predictors | every non-label column, in header order |
/// | labels | required |
///
/// # Errors
///
/// | Variant | Condition |
/// |---|---|
/// | [`IoError::FileNotFound`] | File doesn't exist or is unreadable |
/// | [`IoError::CsvParse`] | Malformed CSV record |
/// | [`IoError::MissingLabelColumn`] | Labels required but the label column is absent |
/// | [`IoError::UnknownPredictor`] | A requested predictor is absent from the header |
/// | [`IoError::NoPredictorColumns`] | No column left besides the label column |
/// | [`IoError::InconsistentRowLength`] | Row has different column count than header |
/// | [`IoError::InvalidLabel`] | Label cell is not an integer class code |
/// | [`IoError::EmptyDataset`] | No complete row remains |
#[derive(Debug, Clone)]
pub struct TableReader {
    path: PathBuf,
    label_column: String,
    predictors: Option<Vec<String>>,
    labels_optional: bool,
}

impl TableReader {
    /// Create a new reader for the given CSV file path.
    pub fn new(path: &Path) -> Self {
        Self {
            path: path.to_path_buf(),
            label_column: DEFAULT_LABEL_COLUMN.to_string(),
            predictors: None,
            labels_optional: false,
        }
    }

    /// Set the name of the label column.
    #[must_use]
    pub fn with_label_column(mut self, column: impl Into<String>) -> Self {
        self.label_column = column.into();
        self
    }

    /// Restrict and order the predictor columns.
    #[must_use]
    pub fn with_predictors(mut self, predictors: Vec<String>) -> Self {
        self.predictors = Some(predictors);
        self
    }

    /// Accept files without a label column. Rows are then labeled [`NO_DATA`].
    #[must_use]
    pub fn with_optional_labels(mut self, optional: bool) -> Self {
        self.labels_optional = optional;
        self
    }

    fn csv_error(&self, e: csv::Error) -> IoError {
        IoError::CsvParse {
            path: self.path.clone(),
            offset: e.position().map_or(0, |p| p.byte()),
            source: e,
        }
    }

    fn parse_label(&self, raw: &str, row_index: usize) -> Result<ClassLabel, IoError> {
        let trimmed = raw.trim();
        if let Ok(code) = trimmed.parse::<i32>() {
            return Ok(ClassLabel::new(code));
        }
        match trimmed.parse::<f64>() {
            Ok(v) if v.is_finite() && v.fract() == 0.0 && v.abs() <= f64::from(i32::MAX) => {
                Ok(ClassLabel::new(v as i32))
            }
            _ => Err(IoError::InvalidLabel {
                path: self.path.clone(),
                row_index,
                raw: raw.to_string(),
            }),
        }
    }

    /// Read and validate the CSV file, returning a [`SampleDataset`].
    #[instrument(skip_all, fields(path = %self.path.display()))]
    pub fn read(&self) -> Result<SampleDataset, IoError> {
        let file = std::fs::File::open(&self.path).map_err(|e| IoError::FileNotFound {
            path: self.path.clone(),
            source: e,
        })?;

        // flexible(true) lets the InconsistentRowLength check fire instead of CsvParse.
        let mut rdr = csv::ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .from_reader(file);

        let header = rdr.headers().map_err(|e| self.csv_error(e))?.clone();
        let expected_cols = header.len();
        debug!(expected_cols, "read CSV header");

        let label_col = header.iter().position(|h| h == self.label_column);
        if label_col.is_none() && !self.labels_optional {
            return Err(IoError::MissingLabelColumn {
                path: self.path.clone(),
                column: self.label_column.clone(),
            });
        }

        let names: Vec<String> = match &self.predictors {
            Some(requested) => requested.clone(),
            None => header
                .iter()
                .enumerate()
                .filter(|&(i, _)| Some(i) != label_col)
                .map(|(_, h)| h.to_string())
                .collect(),
        };
        if names.is_empty() {
            return Err(IoError::NoPredictorColumns {
                path: self.path.clone(),
            });
        }
        let columns = names
            .iter()
            .map(|name| {
                header
                    .iter()
                    .position(|h| h == name)
                    .ok_or_else(|| IoError::UnknownPredictor {
                        path: self.path.clone(),
                        name: name.clone(),
                    })
            })
            .collect::<Result<Vec<_>, _>>()?;

        let mut builder = FeatureTable::builder(Schema::new(names)?);
        let mut n_read = 0;
        let mut cells = Vec::with_capacity(columns.len());

        for (row_index, result) in rdr.records().enumerate() {
            let record = result.map_err(|e| self.csv_error(e))?;
            if record.len() != expected_cols {
                return Err(IoError::InconsistentRowLength {
                    path: self.path.clone(),
                    row_index,
                    expected: expected_cols,
                    got: record.len(),
                });
            }
            n_read += 1;

            let label = match label_col {
                Some(col) => self.parse_label(record.get(col).unwrap_or(""), row_index)?,
                None => NO_DATA,
            };

            cells.clear();
            cells.extend(columns.iter().map(|&col| {
                record
                    .get(col)
                    .and_then(|raw| raw.trim().parse::<f64>().ok())
            }));
            builder.push_optional(&cells, label)?;
        }

        let n_dropped = builder.n_dropped();
        let table = builder.build();
        if table.is_empty() {
            return Err(IoError::EmptyDataset {
                path: self.path.clone(),
                n_read,
                n_dropped,
            });
        }

        info!(
            n_rows = table.len(),
            n_predictors = table.schema().len(),
            n_dropped,
            labeled = label_col.is_some(),
            "sample table loaded"
        );
        Ok(SampleDataset::new(
            table,
            label_col.is_some(),
            n_read,
            n_dropped,
        ))
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    fn csv_file(contents: &str) -> tempfile::NamedTempFile {
        let mut f = tempfile::NamedTempFile::new().unwrap();
        f.write_all(contents.as_bytes()).unwrap();
        f
    }

    #[test]
    fn reads_predictors_and_labels() {
        let f = csv_file("B1,B2,Map\n0.1,0.2,10\n0.3,0.4,20.0\n");
        let ds = TableReader::new(f.path()).read().unwrap();
        assert!(ds.is_labeled());
        assert_eq!(ds.table().schema().names(), ["B1", "B2"]);
        assert_eq!(
            ds.table().labels(),
            vec![ClassLabel::new(10), ClassLabel::new(20)]
        );
        assert_eq!(ds.table().rows()[1].values(), &[0.3, 0.4]);
    }

    #[test]
    fn label_column_may_come_first() {
        let f = csv_file("class,B1\n30,1.5\n");
        let ds = TableReader::new(f.path())
            .with_label_column("class")
            .read()
            .unwrap();
        assert_eq!(ds.table().schema().names(), ["B1"]);
        assert_eq!(ds.table().labels(), vec![ClassLabel::new(30)]);
    }

    #[test]
    fn drops_rows_with_missing_cells() {
        let f = csv_file("B1,B2,Map\n1,,10\n1,2,10\nx,2,20\n");
        let ds = TableReader::new(f.path()).read().unwrap();
        assert_eq!(ds.table().len(), 1);
        assert_eq!(ds.n_read(), 3);
        assert_eq!(ds.n_dropped(), 2);
    }

    #[test]
    fn selected_predictors_follow_requested_order() {
        let f = csv_file("B1,B2,B3,Map\n1,2,3,10\n");
        let ds = TableReader::new(f.path())
            .with_predictors(vec!["B3".into(), "B1".into()])
            .read()
            .unwrap();
        assert_eq!(ds.table().rows()[0].values(), &[3.0, 1.0]);
    }

    #[test]
    fn unknown_predictor_errors() {
        let f = csv_file("B1,Map\n1,10\n");
        let err = TableReader::new(f.path())
            .with_predictors(vec!["B9".into()])
            .read()
            .unwrap_err();
        assert!(matches!(err, IoError::UnknownPredictor { name, .. } if name == "B9"));
    }

    #[test]
    fn missing_label_column_errors_unless_optional() {
        let f = csv_file("B1,B2\n1,2\n");
        assert!(matches!(
            TableReader::new(f.path()).read(),
            Err(IoError::MissingLabelColumn { .. })
        ));
        let ds = TableReader::new(f.path())
            .with_optional_labels(true)
            .read()
            .unwrap();
        assert!(!ds.is_labeled());
        assert_eq!(ds.table().labels(), vec![NO_DATA]);
    }

    #[test]
    fn invalid_label_errors() {
        let f = csv_file("B1,Map\n1,10\n2,forest\n");
        let err = TableReader::new(f.path()).read().unwrap_err();
        assert!(matches!(err, IoError::InvalidLabel { row_index: 1, .. }));
        let f = csv_file("B1,Map\n1,10.5\n");
        assert!(matches!(
            TableReader::new(f.path()).read(),
            Err(IoError::InvalidLabel { .. })
        ));
    }

    #[test]
    fn inconsistent_row_length_errors() {
        let f = csv_file("B1,B2,Map\n1,2,10\n1,10\n");
        assert!(matches!(
            TableReader::new(f.path()).read(),
            Err(IoError::InconsistentRowLength {
                row_index: 1,
                expected: 3,
                got: 2,
                ..
            })
        ));
    }

    #[test]
    fn label_only_file_has_no_predictors() {
        let f = csv_file("Map\n10\n");
        assert!(matches!(
            TableReader::new(f.path()).read(),
            Err(IoError::NoPredictorColumns { .. })
        ));
    }

    #[test]
    fn all_rows_dropped_is_empty_dataset() {
        let f = csv_file("B1,Map\n,10\nNaN,20\n");
        assert!(matches!(
            TableReader::new(f.path()).read(),
            Err(IoError::EmptyDataset {
                n_read: 2,
                n_dropped: 2,
                ..
            })
        ));
    }

    #[test]
    fn missing_file_errors() {
        let err = TableReader::new(Path::new("/nonexistent/samples.csv"))
            .read()
            .unwrap_err();
        assert!(matches!(err, IoError::FileNotFound { .. }));
    }
}
