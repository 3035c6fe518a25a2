// src/emotion/mod.rs
// Emotion classification: vocabulary, label map and classifier backends

pub mod classifier;
pub mod distilbert;
pub mod labels;

pub use classifier::{EmotionClassifier, classify_blocking, pick_label};
pub use distilbert::DistilBertClassifier;
pub use labels::{Emotion, LabelMap, LabelSource, argmax};
