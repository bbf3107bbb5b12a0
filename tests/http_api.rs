use base64::{prelude::BASE64_STANDARD, Engine as _};
use image::{DynamicImage, ImageFormat, RgbImage};
use serde_json::{json, Value};
use std::io::Cursor;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use oral_screening::adapters::http::{
    router,
    state::{BackendStatus, HttpState},
};
use oral_screening::adapters::inference::{mock::MockEngine, Backend, Engine};
use oral_screening::adapters::render::visualization::FsVisualizer;
use oral_screening::adapters::storage::{result_store::FsResultStore, upload_store::FsUploadStore};
use oral_screening::application::services::{DetectionService, RecordService};
use oral_screening::config::{AppConfig, InferenceSettings};
use oral_screening::domain::model::ModelConfig;

fn test_config(root: &Path) -> AppConfig {
    AppConfig {
        host: "127.0.0.1".into(),
        port: 0,
        upload_dir: root.join("uploads"),
        results_dir: root.join("results"),
        segmentation_dir: root.join("segmentation_results"),
        max_file_size: 4 * 1024 * 1024,
        history_limit: 50,
        inference: InferenceSettings {
            use_local_model: false,
            model_path: root.join("models/oral_health_model"),
            model_config_path: root.join("models/model_config.json"),
            remote_endpoint: None,
            api_key: String::new(),
            remote_timeout: Duration::from_secs(1),
        },
    }
}

/// Levanta el servidor en un puerto efímero con backend mock determinista.
async fn spawn_server(root: &Path) -> String {
    let config = test_config(root);
    config.ensure_dirs().unwrap();

    let backend = Arc::new(Backend::new(
        Engine::Mock(MockEngine::with_seed(42)),
        ModelConfig::default(),
    ));
    let fallback = Arc::new(Backend::new(
        Engine::Mock(MockEngine::with_seed(43)),
        ModelConfig::default(),
    ));
    let uploads = Arc::new(FsUploadStore::new(&config.upload_dir, config.max_file_size));
    let results = Arc::new(FsResultStore::new(&config.results_dir));
    let renderer = Arc::new(FsVisualizer::new(&config.segmentation_dir, "/segmentation_results"));

    let state = HttpState {
        detection: Arc::new(DetectionService::new(
            backend,
            fallback,
            uploads.clone(),
            results.clone(),
            renderer,
        )),
        records: Arc::new(RecordService::new(results, uploads, config.history_limit)),
        backend: BackendStatus::default(),
    };
    let app = router(state, &config);

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{}", addr)
}

fn png_base64(width: u32, height: u32) -> String {
    let image = DynamicImage::ImageRgb8(RgbImage::new(width, height));
    let mut buf = Cursor::new(Vec::new());
    image.write_to(&mut buf, ImageFormat::Png).unwrap();
    format!("data:image/png;base64,{}", BASE64_STANDARD.encode(buf.into_inner()))
}

#[tokio::test]
async fn health_reports_mock_backend() {
    let dir = tempfile::tempdir().unwrap();
    let base = spawn_server(dir.path()).await;

    let resp = reqwest::get(format!("{}/api/health", base)).await.unwrap();
    assert_eq!(resp.status(), 200);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["model_type"], "instance_segmentation");
    assert_eq!(body["supported_classes"], json!(["观察", "手术"]));
    assert_eq!(body["model_connected"], false);
    assert_eq!(body["backend"], "mock");
}

#[tokio::test]
async fn detect_without_image_is_bad_request() {
    let dir = tempfile::tempdir().unwrap();
    let base = spawn_server(dir.path()).await;

    let resp = reqwest::Client::new()
        .post(format!("{}/api/detect", base))
        .json(&json!({}))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 400);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["error"], "缺少图像数据");
}

#[tokio::test]
async fn detect_with_unknown_filename_is_not_found() {
    let dir = tempfile::tempdir().unwrap();
    let base = spawn_server(dir.path()).await;

    let resp = reqwest::Client::new()
        .post(format!("{}/api/detect", base))
        .json(&json!({ "filename": "missing.png" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 404);
}

#[tokio::test]
async fn detect_then_fetch_result_and_history() {
    let dir = tempfile::tempdir().unwrap();
    let base = spawn_server(dir.path()).await;
    let client = reqwest::Client::new();

    let resp = client
        .post(format!("{}/api/detect", base))
        .json(&json!({ "image": png_base64(64, 48), "include_visualization": true }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["success"], true);

    let detection = &body["detection"];
    let total = detection["total_instances"].as_u64().unwrap();
    assert_eq!(detection["bounding_boxes"].as_array().unwrap().len() as u64, total);
    assert_eq!(detection["details"]["inference_mode"], "mock");
    assert_eq!(detection["details"]["model_version"], "v1.0.0-demo");
    let recs = detection["recommendations"].as_array().unwrap();
    assert!(!recs.is_empty() && recs.len() <= 5);

    let id = body["result_id"].as_str().unwrap();
    let stored: Value = client
        .get(format!("{}/api/result/{}", base, id))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(stored["id"], id);
    assert_eq!(stored["result"], *detection);
    assert!(stored["filename"].as_str().unwrap().starts_with("temp_"));

    let history: Value = client
        .get(format!("{}/api/history", base))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(history["success"], true);
    assert_eq!(history["history"][0]["id"], id);
}

#[tokio::test]
async fn unknown_result_is_not_found() {
    let dir = tempfile::tempdir().unwrap();
    let base = spawn_server(dir.path()).await;

    let resp = reqwest::get(format!(
        "{}/api/result/0b6d8f2e-7a4c-4f55-9c1e-2d3b4a5c6d7e",
        base
    ))
    .await
    .unwrap();
    assert_eq!(resp.status(), 404);

    let resp = reqwest::get(format!("{}/api/result/not-an-id", base)).await.unwrap();
    assert_eq!(resp.status(), 400);
}

#[tokio::test]
async fn malformed_detect_body_gets_json_error() {
    let dir = tempfile::tempdir().unwrap();
    let base = spawn_server(dir.path()).await;
    let client = reqwest::Client::new();

    let resp = client
        .post(format!("{}/api/detect", base))
        .header("content-type", "application/json")
        .body("{ not json")
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 400);
    let body: Value = resp.json().await.unwrap();
    assert!(body["error"].as_str().unwrap().starts_with("JSON inválido"));

    let resp = client
        .post(format!("{}/api/detect", base))
        .body("image=abc")
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 400);
    let body: Value = resp.json().await.unwrap();
    assert!(body["error"].is_string());
}
