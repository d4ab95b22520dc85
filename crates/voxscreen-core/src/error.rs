//! Error types for voxscreen

/// Result type alias using voxscreen's Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for voxscreen operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Audio decoding, resampling or validation errors
    #[error("audio error: {0}")]
    Audio(String),

    /// Feature extraction errors
    #[error("feature extraction error: {0}")]
    Features(String),

    /// Classifier artifact loading or structure errors
    #[error("model error: {0}")]
    Model(String),

    /// Errors raised while running the classifier
    #[error("inference error: {0}")]
    Inference(String),

    /// Training dataset errors
    #[error("dataset error: {0}")]
    Dataset(String),

    /// Configuration errors
    #[error("configuration error: {0}")]
    Config(String),

    /// Filesystem errors
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization errors
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Generic internal errors
    #[error("internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Create a new audio error
    pub fn audio(msg: impl Into<String>) -> Self {
        Self::Audio(msg.into())
    }

    /// Create a new feature extraction error
    pub fn features(msg: impl Into<String>) -> Self {
        Self::Features(msg.into())
    }

    /// Create a new model error
    pub fn model(msg: impl Into<String>) -> Self {
        Self::Model(msg.into())
    }

    /// Create a new inference error
    pub fn inference(msg: impl Into<String>) -> Self {
        Self::Inference(msg.into())
    }

    /// Create a new dataset error
    pub fn dataset(msg: impl Into<String>) -> Self {
        Self::Dataset(msg.into())
    }

    /// Create a new configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create a new internal error
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }
}
