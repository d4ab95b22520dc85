//! End-to-end tests for the voxscreen HTTP routes

use std::path::Path;

use axum::body::{to_bytes, Body};
use axum::http::{header, Request, StatusCode};
use axum::Router;
use hound::{SampleFormat, WavSpec, WavWriter};
use metrics_exporter_prometheus::PrometheusBuilder;
use serde_json::Value;
use tempfile::TempDir;
use tower::ServiceExt;
use voxscreen_classifiers::{InferenceAdapter, ModelState};
use voxscreen_core::PredictionResult;
use voxscreen_server::{create_router, AppState, ServerConfig};

const BOUNDARY: &str = "voxscreen-test-boundary";

/// Single leaf: every input is class 1 with probability 0.75
const LEAF_ARTIFACT: &str = r#"{
    "format_version": 1,
    "n_features_in": 13,
    "classes": [0, 1],
    "forest": {
        "trees": [
            { "nodes": [ { "type": "leaf", "counts": [1.0, 3.0] } ] }
        ]
    },
    "metadata": { "name": "leaf", "source": "hand-written" }
}"#;

struct TestServer {
    dir: TempDir,
    state: AppState,
}

impl TestServer {
    fn new(with_model: bool) -> Self {
        Self::with_config(with_model, |_| {})
    }

    fn with_config(with_model: bool, tweak: impl FnOnce(&mut ServerConfig)) -> Self {
        let dir = tempfile::tempdir().unwrap();
        let model_path = dir.path().join("model.json");
        if with_model {
            std::fs::write(&model_path, LEAF_ARTIFACT).unwrap();
        }

        let mut config = ServerConfig {
            model_path: model_path.clone(),
            uploads_dir: dir.path().join("uploads"),
            public_base_url: "http://voice.test".to_string(),
            ffmpeg_path: None,
            ..Default::default()
        };
        tweak(&mut config);

        let handle = PrometheusBuilder::new().build_recorder().handle();
        let adapter = InferenceAdapter::new(ModelState::load(&model_path));
        let state = AppState::new(config, adapter, handle).unwrap();

        Self { dir, state }
    }

    fn router(&self) -> Router {
        create_router(self.state.clone())
    }

    fn uploads(&self) -> std::path::PathBuf {
        self.dir.path().join("uploads")
    }
}

fn wav_bytes(samples: &[f32]) -> Vec<u8> {
    let spec = WavSpec {
        channels: 1,
        sample_rate: 16000,
        bits_per_sample: 16,
        sample_format: SampleFormat::Int,
    };
    let mut cursor = std::io::Cursor::new(Vec::new());
    {
        let mut writer = WavWriter::new(&mut cursor, spec).unwrap();
        for &s in samples {
            writer.write_sample((s * 32767.0) as i16).unwrap();
        }
        writer.finalize().unwrap();
    }
    cursor.into_inner()
}

fn tone() -> Vec<f32> {
    (0..16000)
        .map(|i| 0.5 * (2.0 * std::f32::consts::PI * 440.0 * i as f32 / 16000.0).sin())
        .collect()
}

fn multipart_request(field: &str, payload: &[u8]) -> Request<Body> {
    let mut body = Vec::new();
    body.extend_from_slice(format!("--{BOUNDARY}\r\n").as_bytes());
    body.extend_from_slice(
        format!(
            "Content-Disposition: form-data; name=\"{field}\"; filename=\"recording.webm\"\r\n"
        )
        .as_bytes(),
    );
    body.extend_from_slice(b"Content-Type: audio/webm\r\n\r\n");
    body.extend_from_slice(payload);
    body.extend_from_slice(format!("\r\n--{BOUNDARY}--\r\n").as_bytes());

    Request::builder()
        .method("POST")
        .uri("/predict")
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={BOUNDARY}"),
        )
        .header(header::CONTENT_LENGTH, body.len())
        .body(Body::from(body))
        .unwrap()
}

async fn send(router: Router, request: Request<Body>) -> (StatusCode, Vec<u8>) {
    let response = router.oneshot(request).await.unwrap();
    let status = response.status();
    let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    (status, body.to_vec())
}

async fn send_json(router: Router, request: Request<Body>) -> (StatusCode, Value) {
    let (status, body) = send(router, request).await;
    (status, serde_json::from_slice(&body).unwrap())
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

fn delete(uri: &str) -> Request<Body> {
    Request::builder()
        .method("DELETE")
        .uri(uri)
        .body(Body::empty())
        .unwrap()
}

fn stored_files(dir: &Path) -> Vec<String> {
    let mut names: Vec<String> = std::fs::read_dir(dir)
        .unwrap()
        .map(|e| e.unwrap().file_name().into_string().unwrap())
        .collect();
    names.sort();
    names
}

#[tokio::test]
async fn test_health_reports_model_state() {
    let server = TestServer::new(false);
    let (status, body) = send_json(server.router(), get("/")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "Backend running");
    assert_eq!(body["model_loaded"], false);

    let server = TestServer::new(true);
    let (_, body) = send_json(server.router(), get("/")).await;
    assert_eq!(body["model_loaded"], true);
}

#[tokio::test]
async fn test_predict_without_multipart_is_rejected() {
    let server = TestServer::new(true);
    let request = Request::builder()
        .method("POST")
        .uri("/predict")
        .body(Body::empty())
        .unwrap();

    let (status, body) = send_json(server.router(), request).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "No audio file uploaded");
}

#[tokio::test]
async fn test_predict_with_wrong_field_is_rejected() {
    let server = TestServer::new(true);
    let (status, body) =
        send_json(server.router(), multipart_request("file", &wav_bytes(&tone()))).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "No audio file uploaded");
    assert!(stored_files(&server.uploads()).is_empty());
}

#[tokio::test]
async fn test_predict_with_model() {
    let server = TestServer::new(true);
    let (status, body) =
        send(server.router(), multipart_request("audio", &wav_bytes(&tone()))).await;
    assert_eq!(status, StatusCode::OK);

    let result: PredictionResult = serde_json::from_slice(&body).unwrap();
    assert_eq!(result.prediction, 1);
    assert_eq!(result.score, 0.75);
    assert_eq!(result.note, "Prediction successful");

    let files = stored_files(&server.uploads());
    assert_eq!(files.len(), 1);
    assert!(files[0].starts_with("recording_"));
    assert!(files[0].ends_with(".webm"));
}

#[tokio::test]
async fn test_predict_without_model() {
    let server = TestServer::new(false);
    let (status, body) =
        send(server.router(), multipart_request("audio", &wav_bytes(&tone()))).await;
    assert_eq!(status, StatusCode::OK);

    let result: PredictionResult = serde_json::from_slice(&body).unwrap();
    assert_eq!(result, PredictionResult::model_not_loaded());
    assert_eq!(stored_files(&server.uploads()).len(), 1);
}

#[tokio::test]
async fn test_digital_silence_is_classified() {
    let server = TestServer::new(true);
    let (status, body) =
        send(server.router(), multipart_request("audio", &wav_bytes(&[0.0; 8000]))).await;
    assert_eq!(status, StatusCode::OK);

    let result: PredictionResult = serde_json::from_slice(&body).unwrap();
    assert_eq!(result.prediction, 1);
    assert_eq!(result.score, 0.75);
    assert_eq!(result.note, "Prediction successful");
}

#[tokio::test]
async fn test_zero_length_recording_is_a_processing_error() {
    let server = TestServer::new(true);
    let (status, body) = send(server.router(), multipart_request("audio", &wav_bytes(&[]))).await;
    assert_eq!(status, StatusCode::OK);

    let result: PredictionResult = serde_json::from_slice(&body).unwrap();
    assert_eq!(result.prediction, 0);
    assert_eq!(result.score, 0.0);
    assert_eq!(result.note, "Error during processing: Empty or silent audio");
}

#[tokio::test]
async fn test_undecodable_recording_is_a_processing_error() {
    let server = TestServer::new(true);
    let (status, body) =
        send(server.router(), multipart_request("audio", b"not really audio")).await;
    assert_eq!(status, StatusCode::OK);

    let result: PredictionResult = serde_json::from_slice(&body).unwrap();
    assert_eq!(result.prediction, 0);
    assert!(result.note.starts_with("Error during processing:"), "{}", result.note);
}

#[tokio::test]
async fn test_oversized_upload_is_rejected() {
    let server = TestServer::with_config(true, |config| config.max_body_bytes = 1024);
    let response = server
        .router()
        .oneshot(multipart_request("audio", &vec![7u8; 4096]))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
}

#[tokio::test]
async fn test_recordings_are_listed_newest_first() {
    let server = TestServer::new(false);
    for name in [
        "recording_20250101_120000.webm",
        "recording_20250301_080000.webm",
        "recording_20250201_090000.webm",
    ] {
        server.state.store.save(name, b"x").unwrap();
    }
    server.state.store.save("notes.txt", b"x").unwrap();

    let (status, body) = send_json(server.router(), get("/recordings")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        body["recordings"],
        serde_json::json!([
            "http://voice.test/uploads/recording_20250301_080000.webm",
            "http://voice.test/uploads/recording_20250201_090000.webm",
            "http://voice.test/uploads/recording_20250101_120000.webm",
        ])
    );
}

#[tokio::test]
async fn test_uploaded_recordings_are_served() {
    let server = TestServer::new(false);
    server
        .state
        .store
        .save("recording_20250101_120000.webm", b"opus bytes")
        .unwrap();

    let (status, body) = send(
        server.router(),
        get("/uploads/recording_20250101_120000.webm"),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, b"opus bytes");
}

#[tokio::test]
async fn test_delete_recording() {
    let server = TestServer::new(false);
    server
        .state
        .store
        .save("recording_20250101_120000.webm", b"x")
        .unwrap();

    let (status, body) = send_json(
        server.router(),
        delete("/delete/recording_20250101_120000.webm"),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "recording_20250101_120000.webm deleted");
    assert!(stored_files(&server.uploads()).is_empty());

    let (status, body) = send_json(
        server.router(),
        delete("/delete/recording_20250101_120000.webm"),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "File not found");
}

#[tokio::test]
async fn test_delete_rejects_paths_outside_uploads() {
    let server = TestServer::new(true);
    let (status, body) = send_json(server.router(), delete("/delete/..%2Fmodel.json")).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Invalid filename");
    assert!(server.dir.path().join("model.json").exists());
}

#[tokio::test]
async fn test_metrics_endpoint() {
    let server = TestServer::new(false);
    let (status, _) = send(server.router(), get("/metrics")).await;
    assert_eq!(status, StatusCode::OK);
}
