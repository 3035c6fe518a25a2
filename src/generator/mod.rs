// src/generator/mod.rs
// Reply generation through an external language model

pub mod ollama;
pub mod prompt;

use async_trait::async_trait;
use std::time::Duration;
use tracing::warn;

use crate::emotion::Emotion;
use crate::error::{EmotionChatError, Result};

pub use ollama::OllamaGenerator;
pub use prompt::build_prompt;

/// Prompt string -> completion string, backed by some generative model
#[async_trait]
pub trait ResponseGenerator: Send + Sync {
    /// Send one prompt and return the model's text unmodified
    async fn generate(&self, prompt: &str) -> Result<String>;

    fn model_name(&self) -> &str;

    /// Empathetic reply to `message`, given its detected emotion
    async fn respond(&self, message: &str, emotion: Emotion) -> Result<String> {
        let prompt = build_prompt(message, emotion);
        self.generate(&prompt).await
    }
}

/// `respond`, optionally bounded by a deadline
pub async fn respond_within(
    generator: &dyn ResponseGenerator,
    message: &str,
    emotion: Emotion,
    timeout: Option<Duration>,
) -> Result<String> {
    let Some(limit) = timeout else {
        return generator.respond(message, emotion).await;
    };

    match tokio::time::timeout(limit, generator.respond(message, emotion)).await {
        Ok(result) => result,
        Err(_) => {
            warn!(model = generator.model_name(), timeout = ?limit, "Generation timed out");
            Err(EmotionChatError::GenerationTimeout(limit))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    struct Recording {
        prompts: Mutex<Vec<String>>,
        delay: Duration,
    }

    #[async_trait]
    impl ResponseGenerator for Recording {
        async fn generate(&self, prompt: &str) -> Result<String> {
            tokio::time::sleep(self.delay).await;
            self.prompts.lock().unwrap().push(prompt.to_string());
            Ok("  I'm here for you.  ".to_string())
        }

        fn model_name(&self) -> &str {
            "recording"
        }
    }

    fn recording(delay: Duration) -> Recording {
        Recording {
            prompts: Mutex::new(Vec::new()),
            delay,
        }
    }

    #[tokio::test]
    async fn test_respond_builds_prompt_and_keeps_output() {
        let generator = recording(Duration::ZERO);
        let reply = generator.respond("my dog is sick", Emotion::Sadness).await.unwrap();
        assert_eq!(reply, "  I'm here for you.  ");

        let prompts = generator.prompts.lock().unwrap();
        assert_eq!(prompts.len(), 1);
        assert_eq!(prompts[0], build_prompt("my dog is sick", Emotion::Sadness));
    }

    #[tokio::test]
    async fn test_respond_within_no_timeout() {
        let generator = recording(Duration::from_millis(10));
        let reply = respond_within(&generator, "hi", Emotion::Joy, None).await.unwrap();
        assert!(reply.contains("here for you"));
    }

    #[tokio::test]
    async fn test_respond_within_times_out() {
        let generator = recording(Duration::from_secs(5));
        let err = respond_within(&generator, "hi", Emotion::Joy, Some(Duration::from_millis(20)))
            .await
            .unwrap_err();
        assert!(matches!(err, EmotionChatError::GenerationTimeout(d) if d == Duration::from_millis(20)));
        assert!(generator.prompts.lock().unwrap().is_empty());
    }
}
