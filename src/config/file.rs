// src/config/file.rs
// TOML config file (~/.emotion-chat/config.toml)

use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

use crate::error::{EmotionChatError, Result};

#[derive(Debug, Default, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ServerSection {
    pub host: Option<String>,
    pub port: Option<u16>,
}

#[derive(Debug, Default, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ModelSection {
    /// Fine-tuned checkpoint directory
    pub checkpoint: Option<PathBuf>,
    /// tokenizer.json, or a directory holding tokenizer.json / vocab.txt
    pub tokenizer: Option<PathBuf>,
    /// JSON array of label names in logit order
    pub labels: Option<PathBuf>,
    pub device: Option<String>,
    pub max_length: Option<usize>,
}

#[derive(Debug, Default, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct GeneratorSection {
    pub ollama_host: Option<String>,
    pub model: Option<String>,
    pub timeout_secs: Option<u64>,
}

/// Contents of the config file. Every field is optional.
#[derive(Debug, Default, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ConfigFile {
    #[serde(default)]
    pub server: ServerSection,
    #[serde(default)]
    pub model: ModelSection,
    #[serde(default)]
    pub generator: GeneratorSection,
}

impl ConfigFile {
    pub fn parse(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|e| EmotionChatError::Config(e.to_string()))
    }

    /// Load an explicitly requested file. Missing or invalid is an error.
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            EmotionChatError::Config(format!("failed to read {}: {}", path.display(), e))
        })?;
        toml::from_str(&content).map_err(|e| {
            EmotionChatError::Config(format!("failed to parse {}: {}", path.display(), e))
        })
    }

    /// Load the default config file, if any. A broken default file only warns.
    pub fn load_default() -> Self {
        let path = config_path();
        if !path.exists() {
            debug!(path = %path.display(), "No config file");
            return Self::default();
        }

        match Self::load_from(&path) {
            Ok(config) => {
                debug!(path = %path.display(), "Loaded config file");
                config
            }
            Err(e) => {
                warn!("{}, using defaults", e);
                Self::default()
            }
        }
    }
}

/// Get the default config file path
pub fn config_path() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_default()
        .join(".emotion-chat")
        .join("config.toml")
}
