// src/web/api.rs
// REST API handlers

use axum::{
    Json,
    extract::{State, rejection::JsonRejection},
    response::IntoResponse,
};
use tracing::{debug, info};

use super::error::ApiResult;
use super::state::AppState;
use super::types::{ChatResponse, InferResponse, MessageRequest};
use crate::emotion::{Emotion, classify_blocking};
use crate::error::Result;
use crate::generator::respond_within;

/// Classification step shared by /infer and /chat
pub async fn classify_message(state: &AppState, message: &str) -> Result<Emotion> {
    debug!(message_len = message.len(), "Classifying message");
    let emotion = classify_blocking(state.classifier.clone(), message.to_string()).await?;
    info!(emotion = %emotion, "Message classified");
    Ok(emotion)
}

pub async fn health(State(state): State<AppState>) -> impl IntoResponse {
    let labels: Vec<&str> = state
        .classifier
        .label_map()
        .labels()
        .iter()
        .map(|e| e.as_str())
        .collect();

    Json(serde_json::json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
        "classifier": state.classifier.name(),
        "labels": labels,
        "generator": state.generator.model_name(),
    }))
}

/// POST /infer
pub async fn infer(
    State(state): State<AppState>,
    payload: std::result::Result<Json<MessageRequest>, JsonRejection>,
) -> ApiResult<Json<InferResponse>> {
    let Json(request) = payload?;
    let emotion = classify_message(&state, &request.message).await?;
    Ok(Json(InferResponse { emotion }))
}

/// POST /chat
///
/// Classify, then generate. A generation failure fails the whole request.
pub async fn chat(
    State(state): State<AppState>,
    payload: std::result::Result<Json<MessageRequest>, JsonRejection>,
) -> ApiResult<Json<ChatResponse>> {
    let Json(request) = payload?;
    let emotion = classify_message(&state, &request.message).await?;

    let response = respond_within(
        state.generator.as_ref(),
        &request.message,
        emotion,
        state.generation_timeout,
    )
    .await?;

    info!(
        emotion = %emotion,
        model = state.generator.model_name(),
        reply_len = response.len(),
        "Reply generated"
    );

    Ok(Json(ChatResponse { emotion, response }))
}
