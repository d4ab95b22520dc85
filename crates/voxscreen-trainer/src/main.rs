use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use voxscreen_features::{AudioLoader, FeatureExtractor};
use voxscreen_trainer::{
    build_dataset, load_labelled_folders, train, Dataset, ForestParams, Table, TrainOptions,
    TrainingOutcome,
};

#[derive(Parser, Debug)]
#[command(name = "voxscreen-train")]
#[command(author, version, about = "Build datasets and train voxscreen classifier artifacts")]
#[command(propagate_version = true)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Extract MFCC means from stored recordings into a CSV dataset
    BuildDataset {
        /// Folder of .webm recordings
        #[arg(long, default_value = "uploads")]
        uploads: PathBuf,

        /// CSV file to write
        #[arg(short, long, default_value = "mfcc_dataset.csv")]
        output: PathBuf,

        /// Label written for every recording (0 = healthy, 1 = parkinson)
        #[arg(long, default_value = "0")]
        label: i64,

        /// ffmpeg binary for formats the built-in decoders cannot read
        #[arg(long, env = "VOXSCREEN_FFMPEG", default_value = "ffmpeg")]
        ffmpeg: PathBuf,
    },

    /// Train from a tabular CSV dataset
    Csv {
        /// Input CSV file
        #[arg(short, long, default_value = "parkinsons.csv")]
        input: PathBuf,

        /// Artifact to write
        #[arg(short, long, default_value = "model.json")]
        output: PathBuf,

        /// Target column (auto-detected when omitted)
        #[arg(long)]
        target: Option<String>,

        /// Number of trees
        #[arg(long, default_value = "200")]
        estimators: usize,

        /// Skip feature standardisation
        #[arg(long)]
        no_scaler: bool,

        /// Do not weight classes by inverse frequency
        #[arg(long)]
        no_balance: bool,

        /// Skip 5-fold cross-validation
        #[arg(long)]
        no_cv: bool,
    },

    /// Train on an MFCC dataset written by build-dataset
    Mfcc {
        /// Input CSV file
        #[arg(short, long, default_value = "mfcc_dataset.csv")]
        input: PathBuf,

        /// Artifact to write
        #[arg(short, long, default_value = "model.json")]
        output: PathBuf,

        /// Number of trees
        #[arg(long, default_value = "200")]
        estimators: usize,
    },

    /// Train from healthy/ and parkinson/ folders of WAV files
    Audio {
        /// Folder holding healthy/ and parkinson/
        #[arg(short, long, default_value = "dataset")]
        dataset: PathBuf,

        /// Artifact to write
        #[arg(short, long, default_value = "model.json")]
        output: PathBuf,

        /// Number of trees
        #[arg(long, default_value = "300")]
        estimators: usize,
    },
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match cli.command {
        Commands::BuildDataset {
            uploads,
            output,
            label,
            ffmpeg,
        } => {
            let loader = AudioLoader::new().with_ffmpeg(Some(ffmpeg));
            let summary = build_dataset(&uploads, &output, label, &loader, &FeatureExtractor::new())?;
            println!(
                "Saved {} samples to {} ({} empty, {} unreadable)",
                summary.written,
                output.display(),
                summary.skipped_empty,
                summary.failed
            );
        }

        Commands::Csv {
            input,
            output,
            target,
            estimators,
            no_scaler,
            no_balance,
            no_cv,
        } => {
            let table = Table::read(&input)?;
            println!("Dataset loaded: {} rows, {} columns", table.len(), table.headers.len());

            let (dataset, encoding) = Dataset::from_table(&table, target.as_deref())?;
            info!(?encoding, "target encoding");

            let options = TrainOptions {
                forest: ForestParams {
                    n_estimators: estimators,
                    balanced: !no_balance,
                    ..Default::default()
                },
                scale: !no_scaler,
                cv_folds: (!no_cv).then_some(5),
                source: Some(input.display().to_string()),
                ..Default::default()
            };
            let outcome = train(&dataset, &options)?;
            finish(&outcome, &output)?;
        }

        Commands::Mfcc {
            input,
            output,
            estimators,
        } => {
            let table = Table::read(&input)?;
            let dataset = Dataset::from_labelled_table(&table, Some("label"))?;
            println!(
                "Dataset loaded: {} rows, {} features",
                dataset.len(),
                dataset.n_features()
            );

            let options = TrainOptions {
                forest: ForestParams {
                    n_estimators: estimators,
                    balanced: false,
                    ..Default::default()
                },
                scale: false,
                stratify: false,
                cv_folds: None,
                name: "mfcc_random_forest".to_string(),
                source: Some(input.display().to_string()),
                ..Default::default()
            };
            let outcome = train(&dataset, &options)?;
            finish(&outcome, &output)?;
        }

        Commands::Audio {
            dataset,
            output,
            estimators,
        } => {
            let loader = AudioLoader::new();
            let dataset_rows = load_labelled_folders(&dataset, &loader, &FeatureExtractor::new())?;
            let (healthy, parkinson) = dataset_rows.class_counts();
            println!(
                "Loaded {} samples (Healthy: {healthy}, Parkinson: {parkinson})",
                dataset_rows.len()
            );

            let options = TrainOptions {
                forest: ForestParams {
                    n_estimators: estimators,
                    ..Default::default()
                },
                scale: false,
                cv_folds: None,
                name: "mfcc_random_forest".to_string(),
                source: Some(dataset.display().to_string()),
                ..Default::default()
            };
            let outcome = train(&dataset_rows, &options)?;
            finish(&outcome, &output)?;
        }
    }

    Ok(())
}

fn finish(outcome: &TrainingOutcome, output: &Path) -> anyhow::Result<()> {
    println!();
    println!("Train rows: {}, test rows: {}", outcome.n_train, outcome.n_test);
    println!();
    println!("=== Test set classification report ===");
    println!("{}", outcome.report);

    if let (Some(scores), Some(mean)) = (&outcome.cv_scores, outcome.cv_mean()) {
        let formatted: Vec<String> = scores.iter().map(|s| format!("{s:.4}")).collect();
        println!("CV accuracy scores: [{}]", formatted.join(", "));
        println!("CV mean accuracy: {mean:.4}");
    }

    outcome.artifact.save(output)?;
    println!();
    println!("Model saved to {}", output.display());
    println!(
        "Feature count: {}, classes: {:?}",
        outcome.artifact.n_features_in, outcome.artifact.classes
    );
    Ok(())
}

fn init_logging(verbose: bool) {
    let filter = if verbose {
        "voxscreen_trainer=debug,voxscreen_features=debug,voxscreen_classifiers=debug"
    } else {
        "voxscreen_trainer=info,voxscreen_features=warn,voxscreen_classifiers=info"
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| filter.into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}
