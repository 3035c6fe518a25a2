// src/error.rs
// Error types for the classifier, generator and service layers

use thiserror::Error;

/// Main error type for emotion-chat
#[derive(Error, Debug)]
pub enum EmotionChatError {
    #[error("configuration error: {0}")]
    Config(String),

    #[error("failed to load model: {0}")]
    ModelLoad(String),

    #[error("invalid label map: {0}")]
    LabelMap(String),

    #[error("tokenization failed: {0}")]
    Tokenization(String),

    #[error("inference failed: {0}")]
    Inference(String),

    #[error("generation backend error: {0}")]
    Generation(String),

    #[error("generation timed out after {0:?}")]
    GenerationTimeout(std::time::Duration),
}

/// Convenience type alias for Result using EmotionChatError
pub type Result<T> = std::result::Result<T, EmotionChatError>;

impl From<candle_core::Error> for EmotionChatError {
    fn from(err: candle_core::Error) -> Self {
        EmotionChatError::Inference(err.to_string())
    }
}

impl From<tokio::task::JoinError> for EmotionChatError {
    fn from(err: tokio::task::JoinError) -> Self {
        if err.is_cancelled() {
            EmotionChatError::Inference("inference task cancelled".to_string())
        } else {
            EmotionChatError::Inference(format!("inference task panicked: {}", err))
        }
    }
}
