use anyhow::{Context, Result};
use axum::body::Bytes;
use axum::extract::multipart::MultipartRejection;
use axum::extract::{DefaultBodyLimit, Multipart, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

use super::models::ServerError;
use super::state::ServerState;
use crate::format::{TableResponse, format_tables};
use crate::ocr;
use crate::pipeline::{Extractor, PipelineOptions, Table, decode_image};
use crate::settings::Settings;

const IMAGE_FIELD: &str = "image";

pub async fn run_server(settings: Settings, addr: String) -> Result<()> {
    let detector = ocr::build_detector(&settings)?;
    let recognizer = ocr::build_recognizer(&settings)?;
    let extractor = Extractor::new(
        detector,
        recognizer,
        PipelineOptions::from_settings(&settings),
    );
    let app = build_router(extractor, &settings);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| "failed to bind server address")?;
    info!("listening on {}", addr);
    axum::serve(listener, app).await?;
    Ok(())
}

pub fn build_router(extractor: Extractor, settings: &Settings) -> Router {
    let state = Arc::new(ServerState {
        extractor,
        request_timeout: Duration::from_secs(settings.request_timeout_secs),
    });
    Router::new()
        .route("/health", get(health))
        .route("/extract_text_from_image", post(extract_text_from_image))
        .with_state(state)
        .layer(DefaultBodyLimit::max(settings.max_upload_bytes))
}

async fn health() -> impl IntoResponse {
    (StatusCode::OK, Json(serde_json::json!({ "status": "ok" })))
}

async fn extract_text_from_image(
    State(state): State<Arc<ServerState>>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<Vec<TableResponse>>, ServerError> {
    let mut multipart =
        multipart.map_err(|rejection| ServerError::bad_request(rejection.body_text()))?;
    let bytes = read_image_field(&mut multipart).await?;
    info!("received image ({} bytes)", bytes.len());

    let tables = tokio::time::timeout(state.request_timeout, extract_tables(&state, bytes))
        .await
        .map_err(|_| ServerError::timeout())??;

    info!("extracted {} tables", tables.len());
    Ok(Json(format_tables(&tables)))
}

async fn extract_tables(state: &ServerState, bytes: Bytes) -> Result<Vec<Table>, ServerError> {
    let page = tokio::task::spawn_blocking(move || decode_image(&bytes))
        .await
        .map_err(|err| ServerError::internal(format!("decode task failed: {}", err)))??;
    let tables = state.extractor.extract(page).await?;
    Ok(tables)
}

async fn read_image_field(multipart: &mut Multipart) -> Result<Bytes, ServerError> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|err| ServerError::from_multipart("invalid multipart body", err))?
    {
        if field.name() != Some(IMAGE_FIELD) {
            continue;
        }
        let bytes = field
            .bytes()
            .await
            .map_err(|err| ServerError::from_multipart("failed to read image", err))?;
        if bytes.is_empty() {
            return Err(ServerError::bad_request("Invalid image file"));
        }
        return Ok(bytes);
    }
    Err(ServerError::bad_request(
        "No image file provided in the variable 'image'.",
    ))
}
