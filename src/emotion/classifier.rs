// src/emotion/classifier.rs
// Classifier abstraction shared by the HTTP layer and the CLI

use std::sync::Arc;
use tracing::debug;

use super::labels::{Emotion, LabelMap, argmax};
use crate::error::{EmotionChatError, Result};

/// Raw text -> one emotion from the fixed vocabulary.
///
/// Implementations are loaded once and are read-only afterwards, so `classify`
/// takes `&self` and may be called from many threads at once.
pub trait EmotionClassifier: Send + Sync {
    /// Unnormalized per-class scores for `text`, in label map order
    fn logits(&self, text: &str) -> Result<Vec<f32>>;

    /// Label order of the logits
    fn label_map(&self) -> &LabelMap;

    /// Name shown in logs and `/health`
    fn name(&self) -> &str;

    fn classify(&self, text: &str) -> Result<Emotion> {
        let logits = self.logits(text)?;
        debug!(logits = ?logits, "Classifier output");
        pick_label(self.label_map(), &logits)
    }
}

/// Map a logit vector onto the label map
pub fn pick_label(labels: &LabelMap, logits: &[f32]) -> Result<Emotion> {
    labels.ensure_width(logits.len())?;
    let idx = argmax(logits)
        .ok_or_else(|| EmotionChatError::Inference("classifier produced no usable logits".to_string()))?;
    labels
        .get(idx)
        .ok_or_else(|| EmotionChatError::Inference(format!("logit index {} has no label", idx)))
}

/// Run classification on the blocking pool
pub async fn classify_blocking(classifier: Arc<dyn EmotionClassifier>, text: String) -> Result<Emotion> {
    tokio::task::spawn_blocking(move || classifier.classify(&text)).await?
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FixedLogits(Vec<f32>, LabelMap);

    impl EmotionClassifier for FixedLogits {
        fn logits(&self, _text: &str) -> Result<Vec<f32>> {
            Ok(self.0.clone())
        }
        fn label_map(&self) -> &LabelMap {
            &self.1
        }
        fn name(&self) -> &str {
            "fixed"
        }
    }

    #[test]
    fn test_classify_uses_label_order() {
        let c = FixedLogits(vec![0.0, 0.1, 0.2, 5.0, 0.3, 0.4], LabelMap::dataset_default());
        assert_eq!(c.classify("whatever").unwrap(), Emotion::Anger);
    }

    #[test]
    fn test_classify_width_mismatch_is_error() {
        let c = FixedLogits(vec![1.0, 2.0], LabelMap::dataset_default());
        let err = c.classify("x").unwrap_err();
        assert!(matches!(err, EmotionChatError::LabelMap(_)));
    }

    #[test]
    fn test_all_nan_is_inference_error() {
        let c = FixedLogits(vec![f32::NAN; 6], LabelMap::dataset_default());
        assert!(matches!(c.classify("x").unwrap_err(), EmotionChatError::Inference(_)));
    }

    #[tokio::test]
    async fn test_classify_blocking() {
        let c: Arc<dyn EmotionClassifier> =
            Arc::new(FixedLogits(vec![0.0, 9.0, 0.0, 0.0, 0.0, 0.0], LabelMap::dataset_default()));
        let emotion = classify_blocking(c, "great news".to_string()).await.unwrap();
        assert_eq!(emotion, Emotion::Joy);
    }
}
