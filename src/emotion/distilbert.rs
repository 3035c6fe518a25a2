// src/emotion/distilbert.rs
// DistilBERT sequence classifier on candle (encoder + pre_classifier + classifier)

use candle_core::{DType, Device, IndexOp, Module, Tensor};
use candle_nn::{Linear, VarBuilder};
use candle_transformers::models::distilbert::{Config as DistilBertConfig, DistilBertModel};
use serde::Deserialize;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tokenizers::{PaddingParams, Tokenizer, TruncationParams};
use tracing::{debug, info};

use super::classifier::EmotionClassifier;
use super::labels::LabelMap;
use crate::config::ModelConfig;
use crate::error::{EmotionChatError, Result};

const ARCHITECTURE: &str = "DistilBertForSequenceClassification";

/// The parts of config.json candle's DistilBERT config does not expose
#[derive(Debug, Deserialize)]
struct CheckpointConfig {
    #[serde(default)]
    architectures: Vec<String>,
    dim: Option<usize>,
    hidden_size: Option<usize>,
    max_position_embeddings: Option<usize>,
    id2label: Option<HashMap<String, String>>,
}

/// Fine-tuned DistilBERT emotion classifier.
///
/// Weights are loaded once; `logits` only reads them.
pub struct DistilBertClassifier {
    name: String,
    tokenizer: Tokenizer,
    model: DistilBertModel,
    pre_classifier: Linear,
    classifier: Linear,
    device: Device,
    labels: LabelMap,
}

impl DistilBertClassifier {
    /// Load checkpoint, tokenizer and label map. Any failure here is fatal to startup.
    pub fn load(config: &ModelConfig) -> Result<Self> {
        let checkpoint = &config.checkpoint;
        if !checkpoint.is_dir() {
            return Err(EmotionChatError::ModelLoad(format!(
                "checkpoint directory not found: {}",
                checkpoint.display()
            )));
        }

        let (config_str, meta) = read_checkpoint_config(checkpoint)?;

        if !meta.architectures.is_empty() && !meta.architectures.iter().any(|a| a == ARCHITECTURE) {
            return Err(EmotionChatError::ModelLoad(format!(
                "checkpoint architecture {:?} is not {}",
                meta.architectures, ARCHITECTURE
            )));
        }

        let hidden_size = meta.dim.or(meta.hidden_size).unwrap_or(768);
        let distilbert_config: DistilBertConfig = serde_json::from_str(&config_str).map_err(|e| {
            EmotionChatError::ModelLoad(format!("incompatible DistilBERT config: {}", e))
        })?;

        let labels = LabelMap::resolve(config.labels.as_deref(), checkpoint, meta.id2label.as_ref())?;
        let max_length = truncation_length(config.max_length, meta.max_position_embeddings);
        if max_length < config.max_length {
            debug!(
                requested = config.max_length,
                max_length, "Truncation capped at the checkpoint's position limit"
            );
        }
        let tokenizer = load_tokenizer(config.tokenizer.as_deref(), checkpoint, max_length)?;
        let device = get_device(&config.device)?;

        let vb = load_weights(checkpoint, &device)?;
        let model = DistilBertModel::load(vb.pp("distilbert"), &distilbert_config)
            .map_err(|e| EmotionChatError::ModelLoad(format!("failed to load DistilBERT encoder: {}", e)))?;
        let pre_classifier = candle_nn::linear(hidden_size, hidden_size, vb.pp("pre_classifier"))
            .map_err(|e| EmotionChatError::ModelLoad(format!("failed to load pre_classifier: {}", e)))?;
        let classifier = candle_nn::linear(hidden_size, labels.len(), vb.pp("classifier")).map_err(|e| {
            EmotionChatError::ModelLoad(format!(
                "failed to load classifier head with {} outputs: {}",
                labels.len(),
                e
            ))
        })?;

        let name = checkpoint
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| "distilbert".to_string());

        info!(
            checkpoint = %checkpoint.display(),
            device = %config.device,
            hidden_size,
            max_length,
            labels = %labels,
            label_source = %labels.source(),
            "Loaded DistilBERT emotion classifier"
        );

        Ok(Self {
            name,
            tokenizer,
            model,
            pre_classifier,
            classifier,
            device,
            labels,
        })
    }

    fn forward(&self, text: &str) -> Result<Vec<f32>> {
        let encoding = self
            .tokenizer
            .encode(text, true)
            .map_err(|e| EmotionChatError::Tokenization(e.to_string()))?;

        let input_ids = Tensor::new(encoding.get_ids(), &self.device)?.unsqueeze(0)?;

        // candle masks positions where the mask is 1, the tokenizer marks attended positions with 1
        let inverted: Vec<u8> = encoding
            .get_attention_mask()
            .iter()
            .map(|&m| if m == 0 { 1u8 } else { 0u8 })
            .collect();
        let attention_mask = Tensor::new(inverted.as_slice(), &self.device)?.unsqueeze(0)?;

        let hidden_states = self.model.forward(&input_ids, &attention_mask)?;
        let cls = hidden_states.i((.., 0))?;
        let pooled = self.pre_classifier.forward(&cls)?.relu()?;
        let logits = self.classifier.forward(&pooled)?;

        Ok(logits.squeeze(0)?.to_dtype(DType::F32)?.to_vec1::<f32>()?)
    }
}

impl EmotionClassifier for DistilBertClassifier {
    fn logits(&self, text: &str) -> Result<Vec<f32>> {
        self.forward(text)
    }

    fn label_map(&self) -> &LabelMap {
        &self.labels
    }

    fn name(&self) -> &str {
        &self.name
    }
}

/// Resolve the label map for a checkpoint without loading its weights
pub fn resolve_labels(config: &ModelConfig) -> Result<LabelMap> {
    let (_, meta) = read_checkpoint_config(&config.checkpoint)?;
    LabelMap::resolve(config.labels.as_deref(), &config.checkpoint, meta.id2label.as_ref())
}

fn read_checkpoint_config(checkpoint: &Path) -> Result<(String, CheckpointConfig)> {
    let config_path = checkpoint.join("config.json");
    let config_str = std::fs::read_to_string(&config_path).map_err(|e| {
        EmotionChatError::ModelLoad(format!("failed to read {}: {}", config_path.display(), e))
    })?;
    let meta: CheckpointConfig = serde_json::from_str(&config_str).map_err(|e| {
        EmotionChatError::ModelLoad(format!("failed to parse {}: {}", config_path.display(), e))
    })?;
    Ok((config_str, meta))
}

/// Tokens kept per message: never more than the position embedding table holds
fn truncation_length(requested: usize, max_positions: Option<usize>) -> usize {
    max_positions.map_or(requested, |limit| requested.min(limit))
}

/// Map a device name onto a candle device
pub fn get_device(device: &str) -> Result<Device> {
    match device.to_lowercase().as_str() {
        "cpu" => Ok(Device::Cpu),
        "cuda" | "cuda:0" => Device::new_cuda(0)
            .map_err(|e| EmotionChatError::ModelLoad(format!("failed to initialize CUDA: {}", e))),
        "metal" | "mps" => Device::new_metal(0)
            .map_err(|e| EmotionChatError::ModelLoad(format!("failed to initialize Metal: {}", e))),
        other => Err(EmotionChatError::Config(format!("unknown device '{}'", other))),
    }
}

fn load_weights(checkpoint: &Path, device: &Device) -> Result<VarBuilder<'static>> {
    let safetensors = checkpoint.join("model.safetensors");
    if safetensors.exists() {
        debug!(path = %safetensors.display(), "Loading safetensors weights");
        // SAFETY: the file is memory-mapped read-only and not modified while the process runs
        return unsafe { VarBuilder::from_mmaped_safetensors(&[safetensors], DType::F32, device) }
            .map_err(|e| EmotionChatError::ModelLoad(format!("failed to load weights: {}", e)));
    }

    let pth = checkpoint.join("pytorch_model.bin");
    if pth.exists() {
        debug!(path = %pth.display(), "Loading PyTorch weights");
        return VarBuilder::from_pth(&pth, DType::F32, device)
            .map_err(|e| EmotionChatError::ModelLoad(format!("failed to load weights: {}", e)));
    }

    Err(EmotionChatError::ModelLoad(format!(
        "no weights in {} (tried model.safetensors, pytorch_model.bin)",
        checkpoint.display()
    )))
}

/// Find the tokenizer files: explicit path first, then the checkpoint directory
fn tokenizer_candidates(explicit: Option<&Path>, checkpoint: &Path) -> Vec<PathBuf> {
    let mut dirs = Vec::new();
    match explicit {
        Some(path) if path.is_file() => return vec![path.to_path_buf()],
        Some(path) => dirs.push(path.to_path_buf()),
        None => {}
    }
    dirs.push(checkpoint.to_path_buf());

    dirs.iter()
        .flat_map(|d| [d.join("tokenizer.json"), d.join("vocab.txt")])
        .filter(|p| p.exists())
        .collect()
}

fn load_tokenizer(explicit: Option<&Path>, checkpoint: &Path, max_length: usize) -> Result<Tokenizer> {
    let path = tokenizer_candidates(explicit, checkpoint)
        .into_iter()
        .next()
        .ok_or_else(|| {
            EmotionChatError::ModelLoad(format!(
                "no tokenizer found (tried tokenizer.json, vocab.txt in {})",
                explicit.unwrap_or(checkpoint).display()
            ))
        })?;

    let mut tokenizer = if path.file_name().is_some_and(|n| n == "vocab.txt") {
        wordpiece_from_vocab(&path)?
    } else {
        Tokenizer::from_file(&path).map_err(|e| {
            EmotionChatError::ModelLoad(format!("failed to load {}: {}", path.display(), e))
        })?
    };

    tokenizer
        .with_truncation(Some(TruncationParams {
            max_length,
            ..Default::default()
        }))
        .map_err(|e| EmotionChatError::ModelLoad(format!("invalid truncation settings: {}", e)))?;
    tokenizer.with_padding(Some(PaddingParams::default()));

    debug!(path = %path.display(), max_length, "Loaded tokenizer");
    Ok(tokenizer)
}

/// Uncased BERT WordPiece tokenizer built from vocab.txt
fn wordpiece_from_vocab(vocab: &Path) -> Result<Tokenizer> {
    use tokenizers::models::wordpiece::WordPiece;
    use tokenizers::normalizers::BertNormalizer;
    use tokenizers::pre_tokenizers::bert::BertPreTokenizer;
    use tokenizers::processors::bert::BertProcessing;

    let wordpiece = WordPiece::from_file(&vocab.to_string_lossy())
        .unk_token("[UNK]".to_string())
        .build()
        .map_err(|e| EmotionChatError::ModelLoad(format!("failed to build WordPiece model: {}", e)))?;

    let mut tokenizer = Tokenizer::new(wordpiece);
    tokenizer.with_normalizer(Some(BertNormalizer::default()));
    tokenizer.with_pre_tokenizer(Some(BertPreTokenizer));

    let special = |token: &str| {
        tokenizer.token_to_id(token).ok_or_else(|| {
            EmotionChatError::ModelLoad(format!("{} missing from {}", token, vocab.display()))
        })
    };
    let sep = ("[SEP]".to_string(), special("[SEP]")?);
    let cls = ("[CLS]".to_string(), special("[CLS]")?);
    tokenizer.with_post_processor(Some(BertProcessing::new(sep, cls)));

    Ok(tokenizer)
}
