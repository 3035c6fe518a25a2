// tests/golden_samples.rs
// Needs the real fine-tuned checkpoint:
//   EMOTION_CHAT_CHECKPOINT=./checkpoint-500 cargo test --test golden_samples -- --ignored

use emotion_chat::config::ModelConfig;
use emotion_chat::emotion::{DistilBertClassifier, Emotion, EmotionClassifier};
use std::path::PathBuf;

const SAMPLES: &[(&str, Emotion)] = &[
    ("i feel so alone and hopeless since she left", Emotion::Sadness),
    ("i feel thrilled that i finally got promoted today", Emotion::Joy),
    ("i feel so loved and cherished when he holds my hand", Emotion::Love),
    ("i feel furious that they lied to me again", Emotion::Anger),
    ("i feel terrified walking home alone at night", Emotion::Fear),
    ("i feel amazed that it actually worked out", Emotion::Surprise),
];

fn load() -> Option<DistilBertClassifier> {
    let checkpoint = std::env::var("EMOTION_CHAT_CHECKPOINT").ok()?;
    let config = ModelConfig {
        checkpoint: PathBuf::from(checkpoint),
        ..Default::default()
    };
    Some(DistilBertClassifier::load(&config).expect("checkpoint should load"))
}

#[test]
#[ignore]
fn test_golden_samples() {
    let Some(classifier) = load() else {
        eprintln!("EMOTION_CHAT_CHECKPOINT not set, skipping");
        return;
    };

    let mut misses = Vec::new();
    for (text, expected) in SAMPLES {
        let got = classifier.classify(text).unwrap();
        if got != *expected {
            misses.push(format!("{:?}: expected {}, got {}", text, expected, got));
        }
    }
    assert!(misses.is_empty(), "misclassified:\n{}", misses.join("\n"));
}

#[test]
#[ignore]
fn test_loaded_classifier_is_deterministic() {
    let Some(classifier) = load() else {
        return;
    };

    assert_eq!(classifier.label_map().len(), 6);
    let text = "i feel so lonely tonight";
    let first = classifier.classify(text).unwrap();
    for _ in 0..3 {
        assert_eq!(classifier.classify(text).unwrap(), first);
    }
    assert!(classifier.classify("").is_ok());
}
