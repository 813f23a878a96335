//! End-to-end tests for the HTTP surface.
//!
//! The router runs on an ephemeral port with in-memory record and blob
//! stores and stub providers in place of the remote services.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use base64::Engine;
use serde_json::{json, Value};

use vizor_api::{router, AppState, ServerConfig};
use vizor_core::{
    DetectionProvider, DetectionRecord, Error, Provider, Result, Vertex, VideoLabel,
    VideoLabelProvider, VideoSegment,
};
use vizor_db::{InMemoryImageRecordRepository, MemoryBackend};
use vizor_inference::ProviderRegistry;

const PUBLIC_BASE: &str = "http://vizor.test";

const PNG_BYTES: &[u8] = &[
    0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A, 0x00, 0x00, 0x00, 0x0D, b'I', b'H', b'D',
    b'R',
];

// ---------------------------------------------------------------------------
// Stubs
// ---------------------------------------------------------------------------

struct StubDetector {
    provider: Provider,
    outcome: std::result::Result<Vec<DetectionRecord>, String>,
}

#[async_trait]
impl DetectionProvider for StubDetector {
    fn provider(&self) -> Provider {
        self.provider
    }

    async fn detect(&self, _image_base64: &str) -> Result<Vec<DetectionRecord>> {
        self.outcome.clone().map_err(Error::Transport)
    }
}

fn detector(provider: Provider, labels: &[(&str, f64)]) -> Arc<dyn DetectionProvider> {
    Arc::new(StubDetector {
        provider,
        outcome: Ok(labels.iter().map(|(n, s)| record(n, *s)).collect()),
    })
}

fn failing(provider: Provider, message: &str) -> Arc<dyn DetectionProvider> {
    Arc::new(StubDetector {
        provider,
        outcome: Err(message.to_string()),
    })
}

fn record(name: &str, score: f64) -> DetectionRecord {
    DetectionRecord {
        name: name.to_string(),
        score,
        bounding_poly: [
            Vertex::new(0.1, 0.2),
            Vertex::new(0.5, 0.2),
            Vertex::new(0.5, 0.6),
            Vertex::new(0.1, 0.6),
        ],
    }
}

struct StubVideo;

#[async_trait]
impl VideoLabelProvider for StubVideo {
    async fn annotate(&self, video_data: &[u8]) -> Result<Vec<VideoLabel>> {
        if video_data == b"broken" {
            return Err(Error::Transport("annotation service unavailable".to_string()));
        }
        Ok(vec![VideoLabel {
            description: "dog".to_string(),
            category_descriptions: vec!["animal".to_string()],
            segments: vec![VideoSegment {
                start_time: 0.0,
                end_time: 12.5,
                confidence: 0.91,
            }],
        }])
    }
}

// ---------------------------------------------------------------------------
// Harness
// ---------------------------------------------------------------------------

async fn spawn(providers: ProviderRegistry) -> String {
    spawn_with(
        providers,
        ServerConfig {
            public_base_url: PUBLIC_BASE.to_string(),
            ..ServerConfig::default()
        },
    )
    .await
}

async fn spawn_with(providers: ProviderRegistry, config: ServerConfig) -> String {
    let state = AppState::new(
        providers,
        Arc::new(InMemoryImageRecordRepository::new()),
        Arc::new(MemoryBackend::new()),
        config.public_base_url.clone(),
    );
    let app = router(state, &config);

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    tokio::time::sleep(Duration::from_millis(50)).await;
    format!("http://{}", addr)
}

fn registry(detectors: Vec<Arc<dyn DetectionProvider>>) -> ProviderRegistry {
    let mut registry = ProviderRegistry::new();
    for d in detectors {
        registry.register(d);
    }
    registry
}

async fn upload(client: &reqwest::Client, base: &str, bytes: &[u8]) -> Value {
    let form = reqwest::multipart::Form::new().part(
        "image",
        reqwest::multipart::Part::bytes(bytes.to_vec()).file_name("cat photo.png"),
    );
    let resp = client
        .post(format!("{}/api/upload", base))
        .multipart(form)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    resp.json().await.unwrap()
}

fn encode(bytes: &[u8]) -> String {
    base64::engine::general_purpose::STANDARD.encode(bytes)
}

// ---------------------------------------------------------------------------
// Health
// ---------------------------------------------------------------------------

#[tokio::test]
async fn test_health_lists_configured_providers() {
    let base = spawn(
        registry(vec![
            detector(Provider::Gemini, &[]),
            detector(Provider::Vision, &[]),
        ])
        .with_video(Arc::new(StubVideo)),
    )
    .await;

    let body: Value = reqwest::get(format!("{}/health", base))
        .await
        .unwrap()
        .json()
        .await
        .unwrap();

    assert_eq!(body["status"], "ok");
    assert_eq!(body["providers"], json!(["vision", "gemini"]));
    assert_eq!(body["video"], true);
}

// ---------------------------------------------------------------------------
// Middleware
// ---------------------------------------------------------------------------

#[tokio::test]
async fn test_oversized_upload_is_rejected() {
    let base = spawn_with(
        ProviderRegistry::new(),
        ServerConfig {
            public_base_url: PUBLIC_BASE.to_string(),
            max_upload_bytes: 1024,
            ..ServerConfig::default()
        },
    )
    .await;

    let resp = reqwest::Client::new()
        .post(format!("{}/api/upload", base))
        .multipart(reqwest::multipart::Form::new().part(
            "image",
            reqwest::multipart::Part::bytes(vec![0u8; 4096]).file_name("big.png"),
        ))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 413);
}

#[tokio::test]
async fn test_cors_preflight_and_request_id() {
    let base = spawn_with(
        ProviderRegistry::new(),
        ServerConfig {
            public_base_url: PUBLIC_BASE.to_string(),
            allowed_origins: vec!["http://app.test".to_string()],
            ..ServerConfig::default()
        },
    )
    .await;
    let client = reqwest::Client::new();

    let resp = client
        .request(reqwest::Method::OPTIONS, format!("{}/api/compare", base))
        .header("origin", "http://app.test")
        .header("access-control-request-method", "POST")
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    assert_eq!(
        resp.headers()["access-control-allow-origin"],
        "http://app.test"
    );

    let resp = client.get(format!("{}/health", base)).send().await.unwrap();
    assert!(resp.headers().contains_key("x-request-id"));
}

// ---------------------------------------------------------------------------
// Single-provider detection
// ---------------------------------------------------------------------------

#[tokio::test]
async fn test_detect_returns_normalized_records() {
    let base = spawn(registry(vec![detector(Provider::Gemini, &[("cat", 0.8)])])).await;

    let resp = reqwest::Client::new()
        .post(format!("{}/api/detect-gemini", base))
        .json(&json!({ "base64Image": format!("data:image/png;base64,{}", encode(PNG_BYTES)) }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);

    let body: Value = resp.json().await.unwrap();
    assert_eq!(body[0]["name"], "cat");
    assert_eq!(body[0]["score"], 0.8);
    assert_eq!(body[0]["boundingPoly"][2], json!({ "x": 0.5, "y": 0.6 }));
}

#[tokio::test]
async fn test_detect_without_image_is_bad_request() {
    let base = spawn(registry(vec![detector(Provider::Vision, &[])])).await;

    let resp = reqwest::Client::new()
        .post(format!("{}/api/detect-vision", base))
        .json(&json!({}))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 400);

    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["error"], "No image data provided");
}

#[tokio::test]
async fn test_detect_with_unconfigured_provider_is_unavailable() {
    let base = spawn(registry(vec![detector(Provider::Vision, &[])])).await;

    let resp = reqwest::Client::new()
        .post(format!("{}/api/detect-vertex", base))
        .json(&json!({ "base64Image": encode(PNG_BYTES) }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 503);
}

#[tokio::test]
async fn test_detect_provider_failure_is_bad_gateway() {
    let base = spawn(registry(vec![failing(Provider::Vision, "quota exceeded")])).await;

    let resp = reqwest::Client::new()
        .post(format!("{}/api/detect-vision", base))
        .json(&json!({ "base64Image": encode(PNG_BYTES) }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 502);

    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["error"], "Failed to detect objects with vision");
    assert!(body["message"].as_str().unwrap().contains("quota exceeded"));
}

#[tokio::test]
async fn test_malformed_json_is_bad_request() {
    let base = spawn(registry(vec![detector(Provider::Vision, &[])])).await;

    let resp = reqwest::Client::new()
        .post(format!("{}/api/detect-vision", base))
        .header("content-type", "application/json")
        .body("{not json")
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 400);
}

// ---------------------------------------------------------------------------
// Compare, persist and search
// ---------------------------------------------------------------------------

#[tokio::test]
async fn test_compare_keeps_successes_when_one_provider_fails() {
    let base = spawn(registry(vec![
        detector(Provider::Vision, &[("Cat", 0.6)]),
        failing(Provider::Vertex, "endpoint returned 500"),
        detector(Provider::Gemini, &[("cat", 0.8)]),
    ]))
    .await;

    let resp = reqwest::Client::new()
        .post(format!("{}/api/compare", base))
        .json(&json!({ "base64Image": encode(PNG_BYTES) }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);

    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["results"]["vision"][0]["name"], "Cat");
    assert_eq!(body["results"]["gemini"][0]["name"], "cat");
    assert!(body["results"].get("vertex").is_none());
    assert!(body["errors"]["vertex"]
        .as_str()
        .unwrap()
        .contains("endpoint returned 500"));
    // No imageUrl, nothing persisted.
    assert!(body.get("recordId").is_none());
}

#[tokio::test]
async fn test_compare_without_providers_is_unavailable() {
    let base = spawn(ProviderRegistry::new()).await;

    let resp = reqwest::Client::new()
        .post(format!("{}/api/compare", base))
        .json(&json!({ "base64Image": encode(PNG_BYTES) }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 503);
}

#[tokio::test]
async fn test_upload_compare_then_search_by_tag() {
    let base = spawn(registry(vec![
        detector(Provider::Vision, &[("Cat", 0.6), ("Dog", 0.9)]),
        detector(Provider::Gemini, &[("cat", 0.8)]),
    ]))
    .await;
    let client = reqwest::Client::new();

    // First image goes through compare and is persisted with the detections.
    let first = upload(&client, &base, PNG_BYTES).await;
    let first_url = first["imageUrl"].as_str().unwrap().to_string();
    assert!(first_url.starts_with("http://vizor.test/api/images/images/"));
    assert!(first_url.ends_with("-cat_photo.png"));
    assert_eq!(first["base64Image"], encode(PNG_BYTES));

    let resp = client
        .post(format!("{}/api/compare", base))
        .json(&json!({
            "base64Image": first["base64Image"],
            "imageUrl": first_url,
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    let body: Value = resp.json().await.unwrap();
    assert!(body["recordId"].is_string());

    // Second image is saved directly with a stronger cat score.
    let mut second_bytes = PNG_BYTES.to_vec();
    second_bytes.extend_from_slice(b"second");
    let second = upload(&client, &base, &second_bytes).await;
    let second_url = second["imageUrl"].as_str().unwrap().to_string();

    let resp = client
        .post(format!("{}/api/save-to-firestore", base))
        .json(&json!({
            "imageUrl": second_url,
            "results": { "vision": [{ "name": "CAT", "score": 0.95, "boundingPoly": [] }] },
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    let saved: Value = resp.json().await.unwrap();
    assert!(saved["id"].is_string());

    // A record pointing outside the blob store is skipped at search time.
    let resp = client
        .post(format!("{}/api/records", base))
        .json(&json!({
            "imageUrl": "https://elsewhere.test/cat.png",
            "results": { "gemini": [{ "name": "cat", "score": 0.99 }] },
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);

    let images: Value = client
        .get(format!("{}/api/images-by-tag/cat", base))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let images = images.as_array().unwrap();
    assert_eq!(images.len(), 2);
    assert_eq!(images[0]["imageUrl"], second_url);
    assert_eq!(images[0]["base64"], encode(&second_bytes));
    assert_eq!(images[0]["mimeType"], "image/png");
    assert_eq!(images[0]["tags"], json!(["CAT"]));
    assert_eq!(images[1]["imageUrl"], first_url);
    assert_eq!(images[1]["tags"], json!(["cat", "Dog"]));

    let dogs: Value = client
        .get(format!("{}/api/images-by-tag/dog", base))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(dogs.as_array().unwrap().len(), 1);

    let none: Value = client
        .get(format!("{}/api/images-by-tag/giraffe", base))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(none, json!([]));
}

#[tokio::test]
async fn test_save_record_requires_image_url() {
    let base = spawn(ProviderRegistry::new()).await;

    let resp = reqwest::Client::new()
        .post(format!("{}/api/save-to-firestore", base))
        .json(&json!({ "results": {} }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 400);
}

// ---------------------------------------------------------------------------
// Blobs
// ---------------------------------------------------------------------------

#[tokio::test]
async fn test_uploaded_image_is_served_back() {
    let base = spawn(ProviderRegistry::new()).await;
    let client = reqwest::Client::new();

    let uploaded = upload(&client, &base, PNG_BYTES).await;
    let path = uploaded["imageUrl"]
        .as_str()
        .unwrap()
        .strip_prefix(PUBLIC_BASE)
        .unwrap()
        .to_string();

    let resp = client.get(format!("{}{}", base, path)).send().await.unwrap();
    assert_eq!(resp.status(), 200);
    assert_eq!(resp.headers()["content-type"], "image/png");
    assert_eq!(resp.bytes().await.unwrap().as_ref(), PNG_BYTES);
}

#[tokio::test]
async fn test_missing_image_is_not_found() {
    let base = spawn(ProviderRegistry::new()).await;

    let resp = reqwest::get(format!("{}/api/images/images/nope.png", base))
        .await
        .unwrap();
    assert_eq!(resp.status(), 404);
}

#[tokio::test]
async fn test_upload_without_file_is_bad_request() {
    let base = spawn(ProviderRegistry::new()).await;

    let form = reqwest::multipart::Form::new().text("caption", "no file here");
    let resp = reqwest::Client::new()
        .post(format!("{}/api/upload", base))
        .multipart(form)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 400);
}

// ---------------------------------------------------------------------------
// Video
// ---------------------------------------------------------------------------

fn video_form(bytes: &[u8]) -> reqwest::multipart::Form {
    reqwest::multipart::Form::new().part(
        "video",
        reqwest::multipart::Part::bytes(bytes.to_vec()).file_name("clip.mp4"),
    )
}

#[tokio::test]
async fn test_detect_video_returns_labels() {
    let base = spawn(ProviderRegistry::new().with_video(Arc::new(StubVideo))).await;

    let resp = reqwest::Client::new()
        .post(format!("{}/api/detect-video", base))
        .multipart(video_form(b"fake mp4 bytes"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);

    let body: Value = resp.json().await.unwrap();
    assert_eq!(body[0]["description"], "dog");
    assert_eq!(body[0]["categoryDescriptions"], json!(["animal"]));
    assert_eq!(body[0]["segments"][0]["endTime"], 12.5);
}

#[tokio::test]
async fn test_detect_video_errors() {
    let base = spawn(ProviderRegistry::new().with_video(Arc::new(StubVideo))).await;
    let client = reqwest::Client::new();

    let resp = client
        .post(format!("{}/api/detect-video", base))
        .multipart(reqwest::multipart::Form::new().text("caption", "none"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 400);

    let resp = client
        .post(format!("{}/api/detect-video", base))
        .multipart(video_form(b"broken"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 502);

    let unconfigured = spawn(ProviderRegistry::new()).await;
    let resp = client
        .post(format!("{}/api/detect-video", unconfigured))
        .multipart(video_form(b"fake mp4 bytes"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 503);
}
