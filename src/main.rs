use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde::Serialize;
use tracing::info;

use landcover_io::{ExperimentName, ReportWriter, TableReader};
use landcover_rf::{ClassificationPipeline, Classifier, ConfusionMatrix, Evaluation};

#[derive(Parser)]
#[command(name = "landcover")]
#[command(about = "Supervised land-cover classification and accuracy assessment")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// RNG seed for reproducibility
    #[arg(long, default_value_t = 42, global = true)]
    seed: u64,

    /// Enable verbose (debug-level) logging
    #[arg(long, global = true)]
    verbose: bool,

    /// Suppress all output except errors
    #[arg(long, global = true)]
    quiet: bool,

    /// Number of threads for parallel computation (defaults to all cores)
    #[arg(long, global = true)]
    threads: Option<usize>,
}

#[derive(Subcommand)]
enum Command {
    /// Split a labeled sample table, train CART and a random forest, and
    /// assess both on the held-out rows
    Evaluate {
        /// Path to the labeled sample CSV file
        #[arg(long)]
        data: PathBuf,

        /// Experiment name for output files
        #[arg(long)]
        experiment: String,

        /// Output directory for result files
        #[arg(long, default_value = ".")]
        output_dir: PathBuf,

        /// Fraction of rows used for training
        #[arg(long, default_value_t = 0.7)]
        train_fraction: f64,

        /// Number of trees in the random forest
        #[arg(long, default_value_t = 100)]
        n_trees: usize,

        /// Maximum tree depth (unlimited if not set)
        #[arg(long)]
        max_depth: Option<usize>,

        /// Minimum number of rows per leaf
        #[arg(long, default_value_t = 1)]
        min_leaf: usize,

        /// Save the trained forest to `{experiment}_model.bin`
        #[arg(long, default_value_t = false)]
        save_model: bool,

        /// Name of the class label column
        #[arg(long, default_value = "Map")]
        label_column: String,

        /// Comma-separated predictor columns (defaults to every non-label column)
        #[arg(long, value_delimiter = ',')]
        predictors: Option<Vec<String>>,
    },

    /// Classify the rows of a sample table with a saved model
    Predict {
        /// Path to the trained model binary
        #[arg(long)]
        model: PathBuf,

        /// Path to the sample CSV file; labels are optional
        #[arg(long)]
        data: PathBuf,

        /// Experiment name for output files
        #[arg(long)]
        experiment: String,

        /// Output directory for result files
        #[arg(long, default_value = ".")]
        output_dir: PathBuf,

        /// Name of the class label column, used for assessment when present
        #[arg(long, default_value = "Map")]
        label_column: String,
    },
}

// --- JSON stdout output structs ---

#[derive(Serialize)]
struct EvaluateOutput {
    experiment: String,
    n_samples: usize,
    n_dropped: usize,
    n_train: usize,
    n_test: usize,
    cart_accuracy: f64,
    cart_kappa: f64,
    forest_accuracy: f64,
    forest_kappa: f64,
    out_of_bag_error: Option<f64>,
    top_predictor: Option<String>,
    model_path: Option<PathBuf>,
}

#[derive(Serialize)]
struct PredictOutput {
    experiment: String,
    model_kind: &'static str,
    n_rows: usize,
    n_dropped: usize,
    accuracy: Option<f64>,
    kappa: Option<f64>,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = match (cli.verbose, cli.quiet) {
        (true, _) => "debug",
        (_, true) => "error",
        _ => "info",
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    if let Some(threads) = cli.threads {
        rayon::ThreadPoolBuilder::new()
            .num_threads(threads)
            .build_global()
            .context("failed to configure thread pool")?;
        info!(threads, "thread pool configured");
    }

    match cli.command {
        Command::Evaluate {
            data,
            experiment,
            output_dir,
            train_fraction,
            n_trees,
            max_depth,
            min_leaf,
            save_model,
            label_column,
            predictors,
        } => {
            let experiment_name = ExperimentName::new(experiment.clone())?;

            let mut reader = TableReader::new(&data).with_label_column(label_column);
            if let Some(predictors) = predictors {
                reader = reader.with_predictors(predictors);
            }
            let dataset = reader.read().context("failed to read sample CSV")?;
            let table = dataset.table();

            let report = ClassificationPipeline::new(table.class_counts())?
                .with_train_fraction(train_fraction)
                .with_seed(cli.seed)
                .with_n_trees(n_trees)
                .with_max_depth(max_depth)
                .with_min_samples_leaf(min_leaf)
                .run_on_table(table)
                .context("classification failed")?;

            let writer = ReportWriter::new(&output_dir, experiment_name)?;
            writer.write_evaluation(&report)?;

            let model_path = if save_model {
                let path = writer.model_path();
                report
                    .forest_model
                    .save(&path)
                    .context("failed to save model")?;
                info!(path = %path.display(), "model saved");
                Some(path)
            } else {
                None
            };

            let output = EvaluateOutput {
                experiment,
                n_samples: report.n_samples,
                n_dropped: dataset.n_dropped(),
                n_train: report.n_train,
                n_test: report.n_test,
                cart_accuracy: report.cart.accuracy,
                cart_kappa: report.cart.kappa,
                forest_accuracy: report.forest.accuracy,
                forest_kappa: report.forest.kappa,
                out_of_bag_error: report.out_of_bag_error,
                top_predictor: report.importance.first().map(|f| f.name.clone()),
                model_path,
            };
            println!("{}", serde_json::to_string_pretty(&output)?);
        }

        Command::Predict {
            model,
            data,
            experiment,
            output_dir,
            label_column,
        } => {
            let experiment_name = ExperimentName::new(experiment.clone())?;

            let classifier = Classifier::load(&model).context("failed to load model")?;
            info!(
                kind = classifier.kind(),
                n_predictors = classifier.predictors().len(),
                n_classes = classifier.classes().len(),
                "model loaded"
            );

            let dataset = TableReader::new(&data)
                .with_label_column(label_column)
                .with_predictors(classifier.predictors().names().to_vec())
                .with_optional_labels(true)
                .read()
                .context("failed to read sample CSV")?;
            let table = dataset.table();

            let predictions = classifier
                .predict_table(table)
                .context("prediction failed")?;
            let assessment = if dataset.is_labeled() {
                let matrix = ConfusionMatrix::from_labels(&table.labels(), &predictions)?;
                Some(Evaluation::from_matrix(matrix))
            } else {
                None
            };

            let writer = ReportWriter::new(&output_dir, experiment_name)?;
            writer.write_predictions(&classifier.explain(), &predictions, assessment.as_ref())?;

            let output = PredictOutput {
                experiment,
                model_kind: classifier.kind(),
                n_rows: predictions.len(),
                n_dropped: dataset.n_dropped(),
                accuracy: assessment.as_ref().map(|a| a.accuracy),
                kappa: assessment.as_ref().map(|a| a.kappa),
            };
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
    }

    Ok(())
}
