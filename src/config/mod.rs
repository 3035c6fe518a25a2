// src/config/mod.rs
// Service configuration: CLI/env overrides > config file > defaults

pub mod file;

use clap::Args;
use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;
use std::time::Duration;
use tracing::warn;

use crate::error::{EmotionChatError, Result};
use crate::generator::ollama::{DEFAULT_HOST, DEFAULT_MODEL};

pub use file::{ConfigFile, config_path};

pub const DEFAULT_BIND_HOST: &str = "0.0.0.0";
pub const DEFAULT_PORT: u16 = 8000;
pub const DEFAULT_CHECKPOINT: &str = "./checkpoint-500";
pub const DEFAULT_DEVICE: &str = "cpu";

/// DistilBERT position embedding limit
pub const DEFAULT_MAX_LENGTH: usize = 512;

const KNOWN_DEVICES: &[&str] = &["cpu", "cuda", "cuda:0", "metal", "mps"];

/// Settings that can come from the command line or the environment
#[derive(Debug, Default, Clone, Args)]
pub struct ConfigOverrides {
    /// Config file (default: ~/.emotion-chat/config.toml)
    #[arg(long, global = true, env = "EMOTION_CHAT_CONFIG")]
    pub config: Option<PathBuf>,

    /// Address to bind
    #[arg(long, global = true, env = "EMOTION_CHAT_HOST")]
    pub host: Option<String>,

    /// Port to listen on
    #[arg(long, short = 'p', global = true, env = "EMOTION_CHAT_PORT")]
    pub port: Option<u16>,

    /// Fine-tuned classifier checkpoint directory
    #[arg(long, global = true, env = "EMOTION_CHAT_CHECKPOINT")]
    pub checkpoint: Option<PathBuf>,

    /// tokenizer.json, or a directory containing tokenizer.json or vocab.txt
    #[arg(long, global = true, env = "EMOTION_CHAT_TOKENIZER")]
    pub tokenizer: Option<PathBuf>,

    /// JSON array of label names in logit order
    #[arg(long, global = true, env = "EMOTION_CHAT_LABELS")]
    pub labels: Option<PathBuf>,

    /// Inference device: cpu, cuda or metal
    #[arg(long, global = true, env = "EMOTION_CHAT_DEVICE")]
    pub device: Option<String>,

    /// Tokenizer truncation length
    #[arg(long, global = true, env = "EMOTION_CHAT_MAX_LENGTH")]
    pub max_length: Option<usize>,

    /// Ollama base URL
    #[arg(long, global = true, env = "OLLAMA_HOST")]
    pub ollama_host: Option<String>,

    /// Ollama model used for replies
    #[arg(long, global = true, env = "EMOTION_CHAT_MODEL")]
    pub model: Option<String>,

    /// Deadline for one generation call, in seconds (unset: no deadline)
    #[arg(long, global = true, env = "EMOTION_CHAT_GENERATION_TIMEOUT")]
    pub generation_timeout: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl ServerConfig {
    /// `host:port`, with IPv6 literals bracketed
    pub fn bind_address(&self) -> String {
        match self.host.parse::<IpAddr>() {
            Ok(IpAddr::V6(ip)) => SocketAddr::from((ip, self.port)).to_string(),
            _ => format!("{}:{}", self.host, self.port),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelConfig {
    pub checkpoint: PathBuf,
    pub tokenizer: Option<PathBuf>,
    pub labels: Option<PathBuf>,
    pub device: String,
    pub max_length: usize,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            checkpoint: PathBuf::from(DEFAULT_CHECKPOINT),
            tokenizer: None,
            labels: None,
            device: DEFAULT_DEVICE.to_string(),
            max_length: DEFAULT_MAX_LENGTH,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratorConfig {
    pub ollama_host: String,
    pub model: String,
    pub timeout: Option<Duration>,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            ollama_host: DEFAULT_HOST.to_string(),
            model: DEFAULT_MODEL.to_string(),
            timeout: None,
        }
    }
}

/// Fully resolved configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceConfig {
    pub server: ServerConfig,
    pub model: ModelConfig,
    pub generator: GeneratorConfig,
}

impl ServiceConfig {
    /// Load the config file named by `overrides` (or the default one) and merge
    pub fn load(overrides: &ConfigOverrides) -> Result<Self> {
        let file = match &overrides.config {
            Some(path) => ConfigFile::load_from(path)?,
            None => ConfigFile::load_default(),
        };
        let config = Self::resolve(overrides, file);
        config.validate().into_result()?;
        Ok(config)
    }

    /// Merge overrides over the file over defaults
    pub fn resolve(overrides: &ConfigOverrides, file: ConfigFile) -> Self {
        let o = overrides.clone();
        let model_defaults = ModelConfig::default();
        let generator_defaults = GeneratorConfig::default();

        Self {
            server: ServerConfig {
                host: o
                    .host
                    .or(file.server.host)
                    .unwrap_or_else(|| DEFAULT_BIND_HOST.to_string()),
                port: o.port.or(file.server.port).unwrap_or(DEFAULT_PORT),
            },
            model: ModelConfig {
                checkpoint: o
                    .checkpoint
                    .or(file.model.checkpoint)
                    .unwrap_or(model_defaults.checkpoint),
                tokenizer: o.tokenizer.or(file.model.tokenizer),
                labels: o.labels.or(file.model.labels),
                device: o
                    .device
                    .or(file.model.device)
                    .unwrap_or(model_defaults.device)
                    .to_lowercase(),
                max_length: o
                    .max_length
                    .or(file.model.max_length)
                    .unwrap_or(model_defaults.max_length),
            },
            generator: GeneratorConfig {
                ollama_host: o
                    .ollama_host
                    .or(file.generator.ollama_host)
                    .unwrap_or(generator_defaults.ollama_host),
                model: o
                    .model
                    .or(file.generator.model)
                    .unwrap_or(generator_defaults.model),
                timeout: o
                    .generation_timeout
                    .or(file.generator.timeout_secs)
                    .map(Duration::from_secs),
            },
        }
    }

    pub fn validate(&self) -> ConfigValidation {
        let mut v = ConfigValidation::new();

        if self.server.host.trim().is_empty() {
            v.add_error("server host is empty");
        }

        if !KNOWN_DEVICES.contains(&self.model.device.as_str()) {
            v.add_error(format!(
                "unknown device '{}' (expected one of: {})",
                self.model.device,
                KNOWN_DEVICES.join(", ")
            ));
        }

        // [CLS] and [SEP] need two positions
        if self.model.max_length < 2 {
            v.add_error(format!("max_length must be at least 2, got {}", self.model.max_length));
        } else if self.model.max_length > DEFAULT_MAX_LENGTH {
            v.add_warning(format!(
                "max_length {} exceeds DistilBERT's {} positions, truncation is capped at the checkpoint's limit",
                self.model.max_length, DEFAULT_MAX_LENGTH
            ));
        }

        match url::Url::parse(&self.generator.ollama_host) {
            Ok(url) if matches!(url.scheme(), "http" | "https") => {}
            Ok(url) => v.add_error(format!("ollama host must be http(s), got '{}'", url.scheme())),
            Err(e) => v.add_error(format!("invalid ollama host '{}': {}", self.generator.ollama_host, e)),
        }

        if self.generator.model.trim().is_empty() {
            v.add_error("generator model name is empty");
        }

        if self.generator.timeout == Some(Duration::ZERO) {
            v.add_error("generation timeout must be greater than zero");
        }

        v
    }
}

/// Configuration validation result
#[derive(Debug, Default)]
pub struct ConfigValidation {
    pub warnings: Vec<String>,
    pub errors: Vec<String>,
}

impl ConfigValidation {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn add_warning(&mut self, msg: impl Into<String>) {
        self.warnings.push(msg.into());
    }

    pub fn add_error(&mut self, msg: impl Into<String>) {
        self.errors.push(msg.into());
    }

    /// Format as a human-readable report
    pub fn report(&self) -> String {
        let mut lines = Vec::new();

        if !self.errors.is_empty() {
            lines.push("Errors:".to_string());
            for err in &self.errors {
                lines.push(format!("  - {}", err));
            }
        }

        if !self.warnings.is_empty() {
            lines.push("Warnings:".to_string());
            for w in &self.warnings {
                lines.push(format!("  - {}", w));
            }
        }

        lines.join("\n")
    }

    /// Log warnings, turn errors into a config error
    pub fn into_result(self) -> Result<()> {
        for w in &self.warnings {
            warn!("Config: {}", w);
        }
        if self.is_valid() {
            Ok(())
        } else {
            Err(EmotionChatError::Config(format!("invalid configuration\n{}", self.report())))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = ServiceConfig::resolve(&ConfigOverrides::default(), ConfigFile::default());
        assert_eq!(config.server.bind_address(), "0.0.0.0:8000");
        assert_eq!(config.model.checkpoint, PathBuf::from("./checkpoint-500"));
        assert_eq!(config.model.device, "cpu");
        assert_eq!(config.model.max_length, 512);
        assert_eq!(config.generator.ollama_host, "http://localhost:11434");
        assert_eq!(config.generator.model, "llama2");
        assert_eq!(config.generator.timeout, None);
        assert!(config.validate().is_valid());
    }

    #[test]
    fn test_overrides_beat_file() {
        let file = ConfigFile::parse(
            "[server]\nport = 9000\nhost = \"127.0.0.1\"\n[generator]\nmodel = \"mistral\"\ntimeout_secs = 10\n",
        )
        .unwrap();
        let overrides = ConfigOverrides {
            port: Some(7000),
            generation_timeout: Some(60),
            device: Some("CUDA".to_string()),
            ..Default::default()
        };

        let config = ServiceConfig::resolve(&overrides, file);
        assert_eq!(config.server.port, 7000);
        assert_eq!(config.server.host, "127.0.0.1");
        assert_eq!(config.generator.model, "mistral");
        assert_eq!(config.generator.timeout, Some(Duration::from_secs(60)));
        assert_eq!(config.model.device, "cuda");
    }

    #[test]
    fn test_validation_collects_errors() {
        let mut config = ServiceConfig::resolve(&ConfigOverrides::default(), ConfigFile::default());
        config.model.device = "tpu".to_string();
        config.model.max_length = 1;
        config.generator.ollama_host = "ftp://localhost".to_string();
        config.generator.timeout = Some(Duration::ZERO);

        let v = config.validate();
        assert_eq!(v.errors.len(), 4);
        assert!(v.report().contains("tpu"));

        let err = v.into_result().unwrap_err();
        assert!(matches!(err, EmotionChatError::Config(_)));
        let message = err.to_string();
        assert!(message.contains("Errors:"));
        assert!(message.contains("unknown device 'tpu'"));
        assert!(message.contains("timeout must be greater than zero"));
    }

    #[test]
    fn test_bind_address_brackets_ipv6() {
        let server = |host: &str| ServerConfig {
            host: host.to_string(),
            port: 8000,
        };
        assert_eq!(server("::1").bind_address(), "[::1]:8000");
        assert_eq!(server("::").bind_address(), "[::]:8000");
        assert_eq!(server("127.0.0.1").bind_address(), "127.0.0.1:8000");
        assert_eq!(server("localhost").bind_address(), "localhost:8000");
        assert!(server("::1").bind_address().parse::<SocketAddr>().is_ok());
    }

    #[test]
    fn test_long_max_length_only_warns() {
        let mut config = ServiceConfig::resolve(&ConfigOverrides::default(), ConfigFile::default());
        config.model.max_length = 1024;
        let v = config.validate();
        assert!(v.is_valid());
        assert_eq!(v.warnings.len(), 1);
    }

    #[test]
    fn test_load_explicit_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[model]\ncheckpoint = \"/srv/ckpt\"\n").unwrap();

        let overrides = ConfigOverrides {
            config: Some(path),
            ..Default::default()
        };
        let config = ServiceConfig::load(&overrides).unwrap();
        assert_eq!(config.model.checkpoint, PathBuf::from("/srv/ckpt"));
    }

    #[test]
    fn test_load_invalid_file_is_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[model]\ndevice = \"abacus\"\n").unwrap();

        let overrides = ConfigOverrides {
            config: Some(path),
            ..Default::default()
        };
        assert!(ServiceConfig::load(&overrides).is_err());
    }
}
