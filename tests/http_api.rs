mod common;

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use common::{FixedDetector, WidthRecognizer, extractor, png_page, region, sample_fragments};
use reqwest::StatusCode;
use reqwest::multipart::{Form, Part};
use serde_json::{Value, json};
use table_extractor_rust::server::build_router;
use table_extractor_rust::settings::Settings;

async fn spawn_server(
    detector: Arc<FixedDetector>,
    recognizer: Arc<WidthRecognizer>,
) -> SocketAddr {
    spawn_server_with(detector, recognizer, &Settings::default()).await
}

async fn spawn_server_with(
    detector: Arc<FixedDetector>,
    recognizer: Arc<WidthRecognizer>,
    settings: &Settings,
) -> SocketAddr {
    let router = build_router(extractor(detector, recognizer), settings);
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind");
    let addr = listener.local_addr().expect("addr");
    tokio::spawn(async move {
        axum::serve(listener, router).await.expect("serve");
    });
    addr
}

async fn post_image(addr: SocketAddr, bytes: Vec<u8>, mime: &str) -> (StatusCode, Value) {
    let part = Part::bytes(bytes)
        .file_name("page")
        .mime_str(mime)
        .expect("mime");
    let form = Form::new().part("image", part);
    let response = reqwest::Client::new()
        .post(format!("http://{}/extract_text_from_image", addr))
        .multipart(form)
        .send()
        .await
        .expect("request");
    let status = response.status();
    let body = response.json::<Value>().await.expect("json body");
    (status, body)
}

#[tokio::test]
async fn extracts_rows_from_uploaded_page() {
    let detector = Arc::new(FixedDetector::returning(vec![region(0.0, 300.0)]));
    let mut recognizer = WidthRecognizer::default();
    recognizer.by_width.insert(300, sample_fragments());
    let addr = spawn_server(detector, Arc::new(recognizer)).await;

    let (status, body) = post_image(addr, png_page(400, 200), "image/png").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        body,
        json!([{
            "table_no": 1,
            "rows": [
                { "row_no": 1, "data": ["Name", "Qty"] },
                { "row_no": 2, "data": ["Widget", "blue", "4"] }
            ]
        }])
    );
}

#[tokio::test]
async fn no_tables_is_an_empty_array() {
    let detector = Arc::new(FixedDetector::returning(Vec::new()));
    let recognizer = Arc::new(WidthRecognizer::default());
    let addr = spawn_server(detector, recognizer.clone()).await;

    let (status, body) = post_image(addr, png_page(64, 64), "image/png").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!([]));
    assert_eq!(recognizer.calls(), 0);
}

#[tokio::test]
async fn failed_region_keeps_partial_success() {
    let detector = Arc::new(FixedDetector::returning(vec![
        region(0.0, 300.0),
        region(300.0, 400.0),
    ]));
    let mut recognizer = WidthRecognizer::default();
    recognizer.by_width.insert(300, sample_fragments());
    let addr = spawn_server(detector, Arc::new(recognizer)).await;

    let (status, body) = post_image(addr, png_page(400, 200), "image/png").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body[0]["table_no"], 1);
    assert_eq!(body[0]["rows"].as_array().map(Vec::len), Some(2));
    assert!(body[0].get("error").is_none());
    assert_eq!(body[1]["table_no"], 2);
    assert_eq!(body[1]["rows"], json!([]));
    assert_eq!(
        body[1]["error"],
        "text recognition failed: recognizer unavailable"
    );
}

#[tokio::test]
async fn non_image_upload_is_rejected_before_detection() {
    let detector = Arc::new(FixedDetector::returning(vec![region(0.0, 300.0)]));
    let recognizer = Arc::new(WidthRecognizer::default());
    let addr = spawn_server(detector.clone(), recognizer.clone()).await;

    let (status, body) = post_image(addr, b"hello, not an image".to_vec(), "image/png").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    let message = body["error"].as_str().expect("error message");
    assert!(message.starts_with("failed to decode image"));
    assert_eq!(detector.calls(), 0);
    assert_eq!(recognizer.calls(), 0);
}

#[tokio::test]
async fn missing_image_field_is_a_bad_request() {
    let detector = Arc::new(FixedDetector::returning(Vec::new()));
    let addr = spawn_server(detector.clone(), Arc::new(WidthRecognizer::default())).await;

    let form = Form::new().text("file", "nothing here");
    let response = reqwest::Client::new()
        .post(format!("http://{}/extract_text_from_image", addr))
        .multipart(form)
        .send()
        .await
        .expect("request");
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = response.json::<Value>().await.expect("json body");
    assert_eq!(
        body,
        json!({ "error": "No image file provided in the variable 'image'." })
    );
    assert_eq!(detector.calls(), 0);
}

#[tokio::test]
async fn non_multipart_body_is_a_bad_request() {
    let detector = Arc::new(FixedDetector::returning(Vec::new()));
    let addr = spawn_server(detector, Arc::new(WidthRecognizer::default())).await;

    let response = reqwest::Client::new()
        .post(format!("http://{}/extract_text_from_image", addr))
        .json(&json!({ "image": "abc" }))
        .send()
        .await
        .expect("request");
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = response.json::<Value>().await.expect("json body");
    assert!(body["error"].is_string());
}

#[tokio::test]
async fn detector_failure_is_an_internal_error() {
    let detector = Arc::new(FixedDetector::failing("weights not loaded"));
    let recognizer = Arc::new(WidthRecognizer::default());
    let addr = spawn_server(detector, recognizer.clone()).await;

    let (status, body) = post_image(addr, png_page(32, 32), "image/png").await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(
        body,
        json!({ "error": "table detection failed: weights not loaded" })
    );
    assert_eq!(recognizer.calls(), 0);
}

#[tokio::test]
async fn health_reports_ok() {
    let detector = Arc::new(FixedDetector::returning(Vec::new()));
    let addr = spawn_server(detector, Arc::new(WidthRecognizer::default())).await;

    let body = reqwest::get(format!("http://{}/health", addr))
        .await
        .expect("request")
        .json::<Value>()
        .await
        .expect("json body");
    assert_eq!(body, json!({ "status": "ok" }));
}

#[tokio::test]
async fn slow_extraction_times_out() {
    let detector = Arc::new(
        FixedDetector::returning(vec![region(0.0, 300.0)]).with_delay(Duration::from_secs(3)),
    );
    let recognizer = Arc::new(WidthRecognizer::default());
    let settings = Settings {
        request_timeout_secs: 1,
        ..Settings::default()
    };
    let addr = spawn_server_with(detector, recognizer.clone(), &settings).await;

    let (status, body) = post_image(addr, png_page(64, 64), "image/png").await;
    assert_eq!(status, StatusCode::GATEWAY_TIMEOUT);
    assert_eq!(body, json!({ "error": "request timed out" }));
    assert_eq!(recognizer.calls(), 0);
}

#[tokio::test]
async fn oversized_upload_is_rejected() {
    let detector = Arc::new(FixedDetector::returning(vec![region(0.0, 300.0)]));
    let settings = Settings {
        max_upload_bytes: 1024,
        ..Settings::default()
    };
    let addr = spawn_server_with(
        detector.clone(),
        Arc::new(WidthRecognizer::default()),
        &settings,
    )
    .await;

    let (status, body) = post_image(addr, vec![0x5a; 4096], "image/png").await;
    assert!(status.is_client_error(), "unexpected status {}", status);
    assert!(body["error"].is_string());
    assert_eq!(detector.calls(), 0);
}
