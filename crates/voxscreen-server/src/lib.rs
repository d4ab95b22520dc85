//! voxscreen HTTP service
//!
//! Accepts voice recordings over multipart upload, stores them on disk and
//! answers with the classifier's prediction. Stored recordings can be
//! listed, downloaded and deleted.

pub mod cli;
pub mod config;
pub mod pipeline;
pub mod routes;
pub mod state;
pub mod storage;

pub use config::ServerConfig;
pub use pipeline::PredictionPipeline;
pub use routes::create_router;
pub use state::AppState;
pub use storage::RecordingStore;
