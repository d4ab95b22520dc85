//! voxscreen Classifiers
//!
//! Binary classifier artifacts and the adapter that turns feature vectors
//! into prediction results.
//!
//! - [`classifier`]: the [`ClassifierArtifact`] trait every model implements
//! - [`forest`] and [`scaler`]: the random forest and optional standardisation
//! - [`artifact`]: the JSON artifact format, loading and saving
//! - [`adapter`]: [`InferenceAdapter`], width reconciliation and the
//!   loaded/unloaded model state
//!
//! Inference is CPU-bound and synchronous; async callers run it on a
//! blocking thread.

pub mod adapter;
pub mod artifact;
pub mod classifier;
pub mod forest;
pub mod scaler;

pub use adapter::{reconcile_width, score_from_probabilities, Inference, InferenceAdapter, ModelState};
pub use artifact::{ArtifactMetadata, ForestArtifact, FORMAT_VERSION};
pub use classifier::ClassifierArtifact;
pub use forest::{DecisionTree, RandomForest, TreeNode};
pub use scaler::StandardScaler;

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::adapter::{reconcile_width, InferenceAdapter, ModelState};
    pub use crate::artifact::ForestArtifact;
    pub use crate::classifier::ClassifierArtifact;
}
