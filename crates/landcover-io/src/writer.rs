//! JSON report writer for evaluation and prediction outputs.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use landcover_rf::{Evaluation, ModelExplanation, PipelineReport};
use landcover_table::ClassLabel;
use serde::Serialize;
use tracing::{debug, info, instrument};

use crate::IoError;
use crate::domain::ExperimentName;

/// Writes evaluation and prediction reports to JSON files.
///
/// Creates the output directory on construction if it does not exist.
/// Output files are named `{experiment}_evaluate.json` and
/// `{experiment}_predict.json`; a saved model goes to
/// `{experiment}_model.bin`. Undefined ratios (`NaN`) are written as `null`.
pub struct ReportWriter {
    output_dir: PathBuf,
    experiment: ExperimentName,
}

impl ReportWriter {
    /// Create a new writer targeting the given directory and experiment name.
    ///
    /// # Errors
    ///
    /// Returns [`IoError::OutputDirCreate`] if the directory cannot be created.
    #[instrument(skip_all, fields(dir = %output_dir.display(), experiment = %experiment))]
    pub fn new(output_dir: &Path, experiment: ExperimentName) -> Result<Self, IoError> {
        fs::create_dir_all(output_dir).map_err(|e| IoError::OutputDirCreate {
            path: output_dir.to_path_buf(),
            source: e,
        })?;
        debug!("output directory ready");
        Ok(Self {
            output_dir: output_dir.to_path_buf(),
            experiment,
        })
    }

    fn output_path(&self, suffix: &str) -> PathBuf {
        self.output_dir
            .join(format!("{}_{suffix}", self.experiment.as_str()))
    }

    /// Path where a trained model for this experiment is stored.
    #[must_use]
    pub fn model_path(&self) -> PathBuf {
        self.output_path("model.bin")
    }

    /// Write a pipeline report to `{experiment}_evaluate.json` and return the path.
    ///
    /// # Errors
    ///
    /// | Variant | Condition |
    /// |---|---|
    /// | [`IoError::SerializeReport`] | The report cannot be encoded |
    /// | [`IoError::WriteFile`] | The file cannot be written |
    #[instrument(skip_all, fields(n_samples = report.n_samples))]
    pub fn write_evaluation(&self, report: &PipelineReport) -> Result<PathBuf, IoError> {
        let path = self.output_path("evaluate.json");
        let artifact = EvaluateArtifact {
            experiment: self.experiment.as_str(),
            class_names: class_names(report.class_counts.keys().copied()),
            report,
        };
        write_json(&path, &artifact)?;
        info!(path = %path.display(), "evaluation report written");
        Ok(path)
    }

    /// Write per-row predictions to `{experiment}_predict.json` and return the path.
    ///
    /// `assessment` is the agreement with the reference labels, when the
    /// input rows carried any.
    ///
    /// # Errors
    ///
    /// | Variant | Condition |
    /// |---|---|
    /// | [`IoError::SerializeReport`] | The report cannot be encoded |
    /// | [`IoError::WriteFile`] | The file cannot be written |
    #[instrument(skip_all, fields(n_rows = predictions.len()))]
    pub fn write_predictions(
        &self,
        model: &ModelExplanation,
        predictions: &[ClassLabel],
        assessment: Option<&Evaluation>,
    ) -> Result<PathBuf, IoError> {
        let path = self.output_path("predict.json");
        let mut class_counts: BTreeMap<ClassLabel, usize> = BTreeMap::new();
        for &label in predictions {
            *class_counts.entry(label).or_default() += 1;
        }
        let artifact = PredictArtifact {
            experiment: self.experiment.as_str(),
            model,
            n_rows: predictions.len(),
            class_names: class_names(model.classes.iter().copied()),
            class_counts,
            predictions,
            assessment,
        };
        write_json(&path, &artifact)?;
        info!(path = %path.display(), "prediction report written");
        Ok(path)
    }
}

/// WorldCover names for the labels that have one.
fn class_names(labels: impl Iterator<Item = ClassLabel>) -> BTreeMap<ClassLabel, &'static str> {
    labels
        .filter_map(|label| label.land_cover().map(|class| (label, class.name())))
        .collect()
}

fn write_json<T: Serialize>(path: &Path, artifact: &T) -> Result<(), IoError> {
    let json = serde_json::to_string_pretty(artifact).map_err(|e| IoError::SerializeReport {
        path: path.to_path_buf(),
        source: e,
    })?;
    fs::write(path, json).map_err(|e| IoError::WriteFile {
        path: path.to_path_buf(),
        source: e,
    })
}

#[derive(Serialize)]
struct EvaluateArtifact<'a> {
    experiment: &'a str,
    class_names: BTreeMap<ClassLabel, &'static str>,
    #[serde(flatten)]
    report: &'a PipelineReport,
}

#[derive(Serialize)]
struct PredictArtifact<'a> {
    experiment: &'a str,
    model: &'a ModelExplanation,
    n_rows: usize,
    class_names: BTreeMap<ClassLabel, &'static str>,
    class_counts: BTreeMap<ClassLabel, usize>,
    predictions: &'a [ClassLabel],
    #[serde(skip_serializing_if = "Option::is_none")]
    assessment: Option<&'a Evaluation>,
}
