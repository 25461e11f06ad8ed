//! Axum request handlers for the HTTP API.
//!
//! Handlers are thin: deserialize the request DTO, resolve the context,
//! hand off to the orchestrator. Storage of results is the caller's job;
//! image endpoints return the cover-fitted PNG inline (base64) together
//! with the provider URL and both sets of dimensions.
use std::sync::Arc;

use axum::extract::State;
use axum::Json;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde_json::{json, Value};

use crate::api::routes::AppState;
use crate::context::pack::ContextPack;
use crate::context::resolver::{self, RawRequest};
use crate::error::AppError;
use crate::orchestrator::{ImageGenRequest, ImageGenResult, TextGenRequest, TextGenResult};

pub async fn root() -> &'static str {
    "AdGen Pipeline"
}

/// Dry-run context resolution, for debugging what a request would resolve to.
pub async fn resolve_context(Json(raw): Json<RawRequest>) -> Json<ContextPack> {
    Json(resolver::resolve(&raw))
}

pub async fn generate_text(
    State(state): State<Arc<AppState>>,
    Json(raw): Json<RawRequest>,
) -> Result<Json<TextGenResult>, AppError> {
    let pack = resolver::resolve(&raw);
    let req = TextGenRequest {
        model: raw.model.clone(),
        temperature: raw.temperature,
        max_tokens: raw.max_tokens,
        debug: raw.debug,
    };
    state
        .orchestrator
        .generate_text(&pack, &req)
        .await
        .map(Json)
}

fn image_request(raw: &RawRequest) -> ImageGenRequest {
    ImageGenRequest {
        width: raw.width,
        height: raw.height,
        format: raw.format.clone(),
        variation_key: raw.variation_key.clone(),
        source_image: raw.source_image.clone(),
        debug: raw.debug,
    }
}

fn image_response(result: ImageGenResult) -> Json<Value> {
    // The URL points at the raw provider asset (source dimensions); the
    // cover-fitted PNG itself travels inline so the post-processed result
    // is what callers actually receive.
    let mut body = json!({
        "publicUrl": result.public_url,
        "sourceWidth": result.source_width,
        "sourceHeight": result.source_height,
        "width": result.width,
        "height": result.height,
        "imageBase64": STANDARD.encode(&result.png_bytes),
    });
    if let Some(debug) = &result.debug {
        body["_debug"] = serde_json::to_value(debug).unwrap_or(Value::Null);
    }
    Json(body)
}

pub async fn generate_image_background(
    State(state): State<Arc<AppState>>,
    Json(raw): Json<RawRequest>,
) -> Result<Json<Value>, AppError> {
    let pack = resolver::resolve(&raw);
    let result = state
        .orchestrator
        .generate_image_background(&pack, &image_request(&raw))
        .await?;
    Ok(image_response(result))
}

pub async fn generate_image_compose(
    State(state): State<Arc<AppState>>,
    Json(raw): Json<RawRequest>,
) -> Result<Json<Value>, AppError> {
    let pack = resolver::resolve(&raw);
    let result = state
        .orchestrator
        .generate_image_compose(&pack, &image_request(&raw))
        .await?;
    Ok(image_response(result))
}

pub async fn generate_image_from_image(
    State(state): State<Arc<AppState>>,
    Json(raw): Json<RawRequest>,
) -> Result<Json<Value>, AppError> {
    let pack = resolver::resolve(&raw);
    let result = state
        .orchestrator
        .generate_image_from_image(&pack, &image_request(&raw))
        .await?;
    Ok(image_response(result))
}
