//! HTTP routes and handlers

use std::time::Instant;

use axum::{
    extract::{DefaultBodyLimit, Multipart, Path, State},
    http::{HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    routing::{delete, get, post},
    Json, Router,
};
use chrono::Local;
use metrics::{counter, histogram};
use serde_json::json;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;
use tracing::{error, info, warn};
use voxscreen_core::PredictionResult;

use crate::config::CorsConfig;
use crate::state::AppState;
use crate::storage::{is_valid_name, RecordingStore};

pub fn create_router(state: AppState) -> Router {
    let uploads = ServeDir::new(state.store.dir());
    let cors = cors_layer(&state.config.cors);
    let max_body = state.config.max_body_bytes;

    Router::new()
        .route("/", get(health_check))
        .route("/predict", post(predict))
        .route("/recordings", get(list_recordings))
        .route("/delete/:filename", delete(delete_recording))
        .route("/metrics", get(metrics))
        .nest_service("/uploads", uploads)
        .layer(DefaultBodyLimit::disable())
        .layer(RequestBodyLimitLayer::new(max_body))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

fn cors_layer(config: &CorsConfig) -> CorsLayer {
    if config.allowed_origins.is_empty() {
        return CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any);
    }

    let origins: Vec<HeaderValue> = config
        .allowed_origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                warn!(origin = %origin, "ignoring invalid CORS origin");
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods(Any)
        .allow_headers(Any)
}

async fn health_check(State(state): State<AppState>) -> Json<serde_json::Value> {
    Json(json!({
        "status": "Backend running",
        "model_loaded": state.model_loaded(),
    }))
}

async fn metrics(State(state): State<AppState>) -> String {
    state.metrics_handle.render()
}

async fn predict(
    State(state): State<AppState>,
    multipart: Option<Multipart>,
) -> Result<Json<PredictionResult>, AppError> {
    counter!("voxscreen_requests_total", "route" => "predict").increment(1);

    let audio = match multipart {
        Some(multipart) => read_audio_field(multipart).await?,
        None => None,
    };
    let Some(audio) = audio else {
        return Err(AppError::InvalidRequest("No audio file uploaded".to_string()));
    };

    let name = RecordingStore::recording_name(Local::now());
    let store = state.store.clone();
    let pipeline = state.pipeline.clone();
    let start = Instant::now();

    let result = tokio::task::spawn_blocking(move || {
        let path = store.save(&name, &audio)?;
        info!(path = %path.display(), "saved recording");
        Ok::<_, voxscreen_core::Error>(pipeline.process_file(&path))
    })
    .await
    .map_err(|e| voxscreen_core::Error::internal(format!("prediction task failed: {e}")))??;

    histogram!("voxscreen_pipeline_latency_us").record(start.elapsed().as_micros() as f64);
    counter!("voxscreen_predictions_total", "outcome" => outcome_label(&result)).increment(1);

    Ok(Json(result))
}

/// Bytes of the first `audio` field, if any
async fn read_audio_field(
    mut multipart: Multipart,
) -> Result<Option<axum::body::Bytes>, AppError> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::InvalidRequest(e.body_text()))?
    {
        if field.name() == Some("audio") {
            let bytes = field
                .bytes()
                .await
                .map_err(|e| AppError::InvalidRequest(e.body_text()))?;
            return Ok(Some(bytes));
        }
    }
    Ok(None)
}

fn outcome_label(result: &PredictionResult) -> &'static str {
    match result.note.as_str() {
        PredictionResult::NOTE_SUCCESS => "success",
        PredictionResult::NOTE_MODEL_NOT_LOADED => "model_not_loaded",
        PredictionResult::NOTE_FAILED => "failed",
        _ => "processing_error",
    }
}

async fn list_recordings(State(state): State<AppState>) -> Result<Json<serde_json::Value>, AppError> {
    counter!("voxscreen_requests_total", "route" => "recordings").increment(1);

    let names = state.store.list()?;
    let urls: Vec<String> = names.iter().map(|name| state.store.url_for(name)).collect();
    Ok(Json(json!({ "recordings": urls })))
}

async fn delete_recording(
    State(state): State<AppState>,
    Path(filename): Path<String>,
) -> Result<Json<serde_json::Value>, AppError> {
    counter!("voxscreen_requests_total", "route" => "delete").increment(1);

    if !is_valid_name(&filename) {
        return Err(AppError::InvalidRequest("Invalid filename".to_string()));
    }

    if state.store.delete(&filename)? {
        info!(file = %filename, "deleted recording");
        Ok(Json(json!({ "message": format!("{filename} deleted") })))
    } else {
        Err(AppError::NotFound("File not found".to_string()))
    }
}

/// Error handling
#[derive(Debug)]
pub enum AppError {
    InvalidRequest(String),
    NotFound(String),
    InternalError(String),
}

impl From<voxscreen_core::Error> for AppError {
    fn from(err: voxscreen_core::Error) -> Self {
        AppError::InternalError(err.to_string())
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            AppError::InvalidRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            AppError::InternalError(msg) => {
                error!(error = %msg, "request failed");
                (StatusCode::INTERNAL_SERVER_ERROR, msg)
            }
        };

        (status, Json(json!({ "error": message }))).into_response()
    }
}
