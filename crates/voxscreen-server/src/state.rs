//! Shared application state

use std::sync::Arc;

use metrics_exporter_prometheus::PrometheusHandle;
use tracing::info;
use voxscreen_classifiers::{InferenceAdapter, ModelState};
use voxscreen_core::Result;
use voxscreen_features::{AudioLoader, FeatureExtractor};

use crate::config::ServerConfig;
use crate::pipeline::PredictionPipeline;
use crate::storage::RecordingStore;

/// Immutable state handed to every request
#[derive(Clone)]
pub struct AppState {
    /// Loaded configuration
    pub config: Arc<ServerConfig>,

    /// Decode, extract and classify chain with the start-up model
    pub pipeline: Arc<PredictionPipeline>,

    /// Uploaded recordings
    pub store: Arc<RecordingStore>,

    /// Prometheus metrics handle for rendering
    pub metrics_handle: PrometheusHandle,
}

impl AppState {
    /// Build state around an existing adapter
    pub fn new(
        config: ServerConfig,
        adapter: InferenceAdapter,
        metrics_handle: PrometheusHandle,
    ) -> Result<Self> {
        let store = RecordingStore::open(config.uploads_dir.clone(), config.public_base_url.clone())?;
        let loader = AudioLoader::new().with_ffmpeg(config.ffmpeg_path.clone());
        let pipeline = PredictionPipeline::new(loader, FeatureExtractor::new(), adapter);

        Ok(Self {
            config: Arc::new(config),
            pipeline: Arc::new(pipeline),
            store: Arc::new(store),
            metrics_handle,
        })
    }

    /// Load the configured artifact once and build state around it
    pub fn from_config(config: ServerConfig, metrics_handle: PrometheusHandle) -> Result<Self> {
        let model = ModelState::load(&config.model_path);
        info!(model = ?model, "model state");
        Self::new(config, InferenceAdapter::new(model), metrics_handle)
    }

    pub fn model_loaded(&self) -> bool {
        self.pipeline.adapter().is_loaded()
    }
}
