//! voxscreen Trainer
//!
//! Offline tools that produce the classifier artifact the server loads:
//! - [`builder`]: recordings folder to an MFCC dataset CSV
//! - [`table`] and [`dataset`]: CSV parsing, target detection and binarisation
//! - [`audio`]: `healthy/` and `parkinson/` folders of WAV files as a dataset
//! - [`split`]: stratified train/test split and k-fold partitioning
//! - [`forest`]: random forest fitting
//! - [`train`] and [`evaluate`]: the training run and its report

pub mod audio;
pub mod builder;
pub mod dataset;
pub mod evaluate;
pub mod forest;
pub mod split;
pub mod table;
pub mod train;

pub use audio::load_labelled_folders;
pub use builder::{build_dataset, BuildSummary};
pub use dataset::{find_target_column, Dataset, TargetEncoding};
pub use evaluate::{evaluate, EvaluationReport};
pub use forest::{fit_forest, ForestParams};
pub use table::Table;
pub use train::{train, TrainOptions, TrainingOutcome};
