//! I/O error types for landcover-io.

use std::path::PathBuf;

use landcover_table::TableError;

/// Errors from file I/O, CSV parsing, and report serialization.
#[derive(Debug, thiserror::Error)]
pub enum IoError {
    /// Returned when the input file does not exist or is unreadable.
    #[error("file not found: {path}")]
    FileNotFound {
        /// Path that was attempted.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// Returned when the CSV parser encounters a malformed record.
    #[error("CSV parse error in {path} at byte offset {offset}")]
    CsvParse {
        /// Path to the CSV file.
        path: PathBuf,
        /// Byte offset where the error occurred.
        offset: u64,
        /// Underlying CSV error.
        source: csv::Error,
    },

    /// Returned when no usable data row remains.
    #[error("empty dataset in {path}: {n_read} data rows read, {n_dropped} dropped for missing predictors")]
    EmptyDataset {
        /// Path to the CSV file.
        path: PathBuf,
        /// Data rows read after the header.
        n_read: usize,
        /// Rows dropped for missing or non-finite predictor values.
        n_dropped: usize,
    },

    /// Returned when the label column is required but absent from the header.
    #[error("label column \"{column}\" not found in {path}")]
    MissingLabelColumn {
        /// Path to the CSV file.
        path: PathBuf,
        /// The requested label column.
        column: String,
    },

    /// Returned when a requested predictor is absent from the header.
    #[error("predictor column \"{name}\" not found in {path}")]
    UnknownPredictor {
        /// Path to the CSV file.
        path: PathBuf,
        /// The requested predictor.
        name: String,
    },

    /// Returned when no predictor column is left after removing the label column.
    #[error("no predictor columns in {path}")]
    NoPredictorColumns {
        /// Path to the CSV file.
        path: PathBuf,
    },

    /// Returned when a label cell is not an integer class code.
    #[error("invalid class label in {path}: row {row_index}, raw value \"{raw}\"")]
    InvalidLabel {
        /// Path to the CSV file.
        path: PathBuf,
        /// Zero-based row index (excluding header).
        row_index: usize,
        /// The raw string value that failed to parse.
        raw: String,
    },

    /// Returned when a data row has a different number of columns than the header.
    #[error("inconsistent row length in {path}: row {row_index} has {got} columns, expected {expected}")]
    InconsistentRowLength {
        /// Path to the CSV file.
        path: PathBuf,
        /// Zero-based row index (excluding header).
        row_index: usize,
        /// Expected number of columns (from header).
        expected: usize,
        /// Actual number of columns in this row.
        got: usize,
    },

    /// Returned when the experiment name contains characters outside `[a-zA-Z0-9_-]`.
    #[error("invalid experiment name \"{name}\": must match [a-zA-Z0-9_-]+")]
    InvalidExperimentName {
        /// The invalid name.
        name: String,
    },

    /// Returned when the output directory cannot be created.
    #[error("cannot create output directory {path}")]
    OutputDirCreate {
        /// Path that was attempted.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// Returned when a report cannot be encoded as JSON.
    #[error("cannot encode report for {path}")]
    SerializeReport {
        /// Destination of the report.
        path: PathBuf,
        /// Underlying JSON error.
        source: serde_json::Error,
    },

    /// Returned when a report file cannot be written.
    #[error("cannot write file {path}")]
    WriteFile {
        /// Path that was attempted.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// Wraps a schema or table construction error.
    #[error(transparent)]
    Table(#[from] TableError),
}
