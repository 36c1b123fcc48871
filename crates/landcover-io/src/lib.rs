//! File I/O, validation, and serialization for the landcover pipeline.

mod domain;
mod error;
mod reader;
mod writer;

pub use domain::{ExperimentName, NO_DATA, SampleDataset};
pub use error::IoError;
pub use reader::TableReader;
pub use writer::ReportWriter;
