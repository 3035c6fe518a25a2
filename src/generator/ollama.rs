// src/generator/ollama.rs
// Ollama generate API client (local LLM, no auth)

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument, warn};

use super::ResponseGenerator;
use crate::error::{EmotionChatError, Result};

/// Default Ollama address
pub const DEFAULT_HOST: &str = "http://localhost:11434";

/// Default generation model
pub const DEFAULT_MODEL: &str = "llama2";

/// Normalize Ollama base URL by stripping trailing slashes and /v1 suffix
fn normalize_base_url(url: &str) -> String {
    let mut url = url.trim_end_matches('/').to_string();
    if url.ends_with("/v1") {
        url.truncate(url.len() - 3);
    }
    url
}

/// Check if a URL points to a local address (localhost, 127.0.0.1, [::1])
fn is_local_url(url: &str) -> bool {
    match url::Url::parse(url) {
        Ok(parsed) => match parsed.host() {
            Some(url::Host::Domain(d)) => d == "localhost",
            Some(url::Host::Ipv4(ip)) => ip.is_loopback(),
            Some(url::Host::Ipv6(ip)) => ip.is_loopback(),
            None => true,
        },
        Err(_) => true,
    }
}

#[derive(Debug, Serialize)]
struct GenerateRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    stream: bool,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    response: String,
    #[serde(default)]
    eval_count: Option<u64>,
    #[serde(default)]
    total_duration: Option<u64>,
}

/// Generator backed by a local Ollama server
pub struct OllamaGenerator {
    base_url: String,
    model: String,
    http: reqwest::Client,
}

impl OllamaGenerator {
    pub fn new(base_url: &str, model: impl Into<String>, http: reqwest::Client) -> Self {
        let base_url = normalize_base_url(base_url);

        if !is_local_url(&base_url) {
            warn!(
                host = %base_url,
                "Ollama host is not a local address, prompts containing user messages will leave this machine"
            );
        }

        Self {
            base_url,
            model: model.into(),
            http,
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn generate_url(&self) -> String {
        format!("{}/api/generate", self.base_url)
    }
}

#[async_trait]
impl ResponseGenerator for OllamaGenerator {
    /// Single non-streaming completion. No retry: any failure is returned as is.
    #[instrument(skip(self, prompt), fields(model = %self.model, prompt_len = prompt.len()))]
    async fn generate(&self, prompt: &str) -> Result<String> {
        let url = self.generate_url();
        let body = GenerateRequest {
            model: &self.model,
            prompt,
            stream: false,
        };

        let response = self.http.post(&url).json(&body).send().await.map_err(|e| {
            EmotionChatError::Generation(format!("Ollama unreachable at {}: {}", self.base_url, e))
        })?;

        let status = response.status();
        if !status.is_success() {
            let error_body = response.text().await.unwrap_or_default();
            return Err(EmotionChatError::Generation(format!(
                "Ollama returned {}: {}",
                status,
                error_body.trim()
            )));
        }

        let parsed: GenerateResponse = response.json().await.map_err(|e| {
            EmotionChatError::Generation(format!("malformed Ollama response: {}", e))
        })?;

        debug!(
            eval_count = ?parsed.eval_count,
            total_duration_ns = ?parsed.total_duration,
            reply_len = parsed.response.len(),
            "Ollama generation complete"
        );

        Ok(parsed.response)
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}
