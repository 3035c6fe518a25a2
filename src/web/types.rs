// src/web/types.rs
// Request and response bodies

use serde::{Deserialize, Serialize};

use crate::emotion::Emotion;

/// Body of both POST endpoints
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageRequest {
    pub message: String,
}

/// POST /infer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InferResponse {
    pub emotion: Emotion,
}

/// POST /chat
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatResponse {
    pub emotion: Emotion,
    pub response: String,
}
