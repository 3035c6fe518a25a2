// src/emotion/labels.rs
// Emotion vocabulary and the logit-index -> label mapping

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use strum::{Display, EnumIter, EnumString, IntoEnumIterator};
use tracing::{debug, warn};

use crate::error::{EmotionChatError, Result};

/// Sidecar file checked inside the checkpoint directory
pub const LABELS_FILE: &str = "labels.json";

/// The closed set of emotions the classifier can produce
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString, EnumIter,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum Emotion {
    Sadness,
    Joy,
    Love,
    Anger,
    Fear,
    Surprise,
}

impl Emotion {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Sadness => "sadness",
            Self::Joy => "joy",
            Self::Love => "love",
            Self::Anger => "anger",
            Self::Fear => "fear",
            Self::Surprise => "surprise",
        }
    }

    /// Number of emotions in the vocabulary
    pub fn count() -> usize {
        Self::iter().count()
    }
}

/// Where a label map was resolved from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LabelSource {
    /// Explicit label file supplied through configuration
    File(PathBuf),
    /// `labels.json` found next to the weights
    Sidecar(PathBuf),
    /// `id2label` in the checkpoint's config.json
    CheckpointConfig(PathBuf),
    /// Checkpoint only had `LABEL_n` placeholders
    DatasetDefault,
}

impl fmt::Display for LabelSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::File(p) => write!(f, "label file {}", p.display()),
            Self::Sidecar(p) => write!(f, "checkpoint sidecar {}", p.display()),
            Self::CheckpointConfig(p) => write!(f, "id2label in {}", p.display()),
            Self::DatasetDefault => write!(f, "emotion dataset default order"),
        }
    }
}

/// Maps classifier output positions to emotions.
///
/// Position `i` holds the emotion the checkpoint was trained to emit at logit `i`.
/// Construction always validates: six entries, no duplicates, every name known.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LabelMap {
    labels: Vec<Emotion>,
    source: LabelSource,
}

impl LabelMap {
    /// Training order of the emotion dataset (dair-ai/emotion)
    pub fn dataset_default() -> Self {
        Self {
            labels: vec![
                Emotion::Sadness,
                Emotion::Joy,
                Emotion::Love,
                Emotion::Anger,
                Emotion::Fear,
                Emotion::Surprise,
            ],
            source: LabelSource::DatasetDefault,
        }
    }

    /// Build from label names in logit order
    pub fn from_names<S: AsRef<str>>(names: &[S], source: LabelSource) -> Result<Self> {
        if names.len() != Emotion::count() {
            return Err(EmotionChatError::LabelMap(format!(
                "expected {} labels, found {}",
                Emotion::count(),
                names.len()
            )));
        }

        let mut seen = HashSet::new();
        let mut labels = Vec::with_capacity(names.len());
        for name in names {
            let name = name.as_ref().trim();
            let emotion = Emotion::from_str(name).map_err(|_| {
                EmotionChatError::LabelMap(format!("unknown emotion label '{}'", name))
            })?;
            if !seen.insert(emotion) {
                return Err(EmotionChatError::LabelMap(format!(
                    "duplicate emotion label '{}'",
                    emotion
                )));
            }
            labels.push(emotion);
        }

        Ok(Self { labels, source })
    }

    /// Parse a JSON array of label names
    pub fn from_json_file(path: &Path, source: LabelSource) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            EmotionChatError::LabelMap(format!("failed to read {}: {}", path.display(), e))
        })?;
        let names: Vec<String> = serde_json::from_str(&content).map_err(|e| {
            EmotionChatError::LabelMap(format!("failed to parse {}: {}", path.display(), e))
        })?;
        Self::from_names(&names, source)
    }

    /// Build from a Hugging Face `id2label` table.
    ///
    /// Returns `Ok(None)` when the table only carries `LABEL_n` placeholders.
    pub fn from_id2label(id2label: &HashMap<String, String>, source: LabelSource) -> Result<Option<Self>> {
        let mut ordered = BTreeMap::new();
        for (id, name) in id2label {
            let idx: usize = id.trim().parse().map_err(|_| {
                EmotionChatError::LabelMap(format!("invalid label id '{}' in id2label", id))
            })?;
            ordered.insert(idx, name.clone());
        }

        // ids must be exactly 0..n
        if ordered.keys().enumerate().any(|(pos, idx)| pos != *idx) {
            return Err(EmotionChatError::LabelMap(
                "id2label ids are not contiguous from 0".to_string(),
            ));
        }

        let names: Vec<String> = ordered.into_values().collect();
        if names.iter().all(|n| is_placeholder(n)) {
            return Ok(None);
        }

        Self::from_names(&names, source).map(Some)
    }

    /// Resolve the label map for a checkpoint.
    ///
    /// Order: explicit file, `labels.json` sidecar, `id2label`, dataset default.
    pub fn resolve(
        explicit: Option<&Path>,
        checkpoint_dir: &Path,
        id2label: Option<&HashMap<String, String>>,
    ) -> Result<Self> {
        if let Some(path) = explicit {
            return Self::from_json_file(path, LabelSource::File(path.to_path_buf()));
        }

        let sidecar = checkpoint_dir.join(LABELS_FILE);
        if sidecar.exists() {
            return Self::from_json_file(&sidecar, LabelSource::Sidecar(sidecar.clone()));
        }

        if let Some(table) = id2label {
            let source = LabelSource::CheckpointConfig(checkpoint_dir.join("config.json"));
            if let Some(map) = Self::from_id2label(table, source)? {
                return Ok(map);
            }
            if table.len() != Emotion::count() {
                return Err(EmotionChatError::LabelMap(format!(
                    "checkpoint has {} placeholder labels, expected {}",
                    table.len(),
                    Emotion::count()
                )));
            }
            warn!(
                checkpoint = %checkpoint_dir.display(),
                "Checkpoint id2label only has LABEL_n placeholders, using emotion dataset order"
            );
        } else {
            debug!("No id2label in checkpoint config, using emotion dataset order");
        }

        Ok(Self::dataset_default())
    }

    /// Emotion at a logit position
    pub fn get(&self, index: usize) -> Option<Emotion> {
        self.labels.get(index).copied()
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    pub fn labels(&self) -> &[Emotion] {
        &self.labels
    }

    pub fn source(&self) -> &LabelSource {
        &self.source
    }

    /// Check that the classifier head emits one logit per label
    pub fn ensure_width(&self, num_logits: usize) -> Result<()> {
        if num_logits != self.labels.len() {
            return Err(EmotionChatError::LabelMap(format!(
                "classifier head has {} outputs but label map has {} labels",
                num_logits,
                self.labels.len()
            )));
        }
        Ok(())
    }
}

impl fmt::Display for LabelMap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names: Vec<&str> = self.labels.iter().map(|e| e.as_str()).collect();
        write!(f, "[{}]", names.join(", "))
    }
}

fn is_placeholder(name: &str) -> bool {
    name.strip_prefix("LABEL_")
        .is_some_and(|rest| !rest.is_empty() && rest.chars().all(|c| c.is_ascii_digit()))
}

/// Index of the largest logit. The first index wins on an exact tie.
pub fn argmax(logits: &[f32]) -> Option<usize> {
    let mut best: Option<(usize, f32)> = None;
    for (idx, &value) in logits.iter().enumerate() {
        if value.is_nan() {
            continue;
        }
        if best.is_none_or(|(_, best_value)| value > best_value) {
            best = Some((idx, value));
        }
    }
    best.map(|(idx, _)| idx)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn id2label(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect()
    }

    #[test]
    fn test_dataset_default_order() {
        let map = LabelMap::dataset_default();
        let names: Vec<&str> = map.labels().iter().map(|e| e.as_str()).collect();
        assert_eq!(names, ["sadness", "joy", "love", "anger", "fear", "surprise"]);
        assert_eq!(map.source(), &LabelSource::DatasetDefault);
    }

    #[test]
    fn test_emotion_serde_lowercase() {
        assert_eq!(serde_json::to_string(&Emotion::Surprise).unwrap(), "\"surprise\"");
        let parsed: Emotion = serde_json::from_str("\"anger\"").unwrap();
        assert_eq!(parsed, Emotion::Anger);
    }

    #[test]
    fn test_emotion_display_matches_as_str() {
        for emotion in Emotion::iter() {
            assert_eq!(emotion.to_string(), emotion.as_str());
        }
        assert_eq!(Emotion::count(), 6);
    }

    #[test]
    fn test_from_names_rejects_wrong_count() {
        let err = LabelMap::from_names(&["joy", "sadness"], LabelSource::DatasetDefault).unwrap_err();
        assert!(err.to_string().contains("expected 6 labels"));
    }

    #[test]
    fn test_from_names_rejects_unknown() {
        let names = ["sadness", "joy", "love", "anger", "fear", "disgust"];
        let err = LabelMap::from_names(&names, LabelSource::DatasetDefault).unwrap_err();
        assert!(err.to_string().contains("disgust"));
    }

    #[test]
    fn test_from_names_rejects_duplicates() {
        let names = ["sadness", "joy", "joy", "anger", "fear", "surprise"];
        let err = LabelMap::from_names(&names, LabelSource::DatasetDefault).unwrap_err();
        assert!(err.to_string().contains("duplicate"));
    }

    #[test]
    fn test_from_names_keeps_custom_order() {
        let names = ["Joy", "sadness", "anger", "love", "surprise", "fear"];
        let map = LabelMap::from_names(&names, LabelSource::DatasetDefault).unwrap();
        assert_eq!(map.get(0), Some(Emotion::Joy));
        assert_eq!(map.get(3), Some(Emotion::Love));
        assert_eq!(map.get(6), None);
    }

    #[test]
    fn test_id2label_real_names() {
        let table = id2label(&[
            ("0", "sadness"),
            ("1", "joy"),
            ("2", "love"),
            ("3", "anger"),
            ("4", "fear"),
            ("5", "surprise"),
        ]);
        let map = LabelMap::from_id2label(&table, LabelSource::DatasetDefault)
            .unwrap()
            .unwrap();
        assert_eq!(map.labels(), LabelMap::dataset_default().labels());
    }

    #[test]
    fn test_id2label_placeholders() {
        let table = id2label(&[
            ("0", "LABEL_0"),
            ("1", "LABEL_1"),
            ("2", "LABEL_2"),
            ("3", "LABEL_3"),
            ("4", "LABEL_4"),
            ("5", "LABEL_5"),
        ]);
        assert!(LabelMap::from_id2label(&table, LabelSource::DatasetDefault).unwrap().is_none());
    }

    #[test]
    fn test_id2label_gap_rejected() {
        let table = id2label(&[("0", "joy"), ("2", "fear")]);
        let err = LabelMap::from_id2label(&table, LabelSource::DatasetDefault).unwrap_err();
        assert!(err.to_string().contains("contiguous"));
    }

    #[test]
    fn test_resolve_prefers_sidecar_over_id2label() {
        let dir = tempfile::tempdir().unwrap();
        let mut f = std::fs::File::create(dir.path().join(LABELS_FILE)).unwrap();
        write!(f, r#"["fear","joy","love","anger","sadness","surprise"]"#).unwrap();

        let table = id2label(&[
            ("0", "sadness"),
            ("1", "joy"),
            ("2", "love"),
            ("3", "anger"),
            ("4", "fear"),
            ("5", "surprise"),
        ]);
        let map = LabelMap::resolve(None, dir.path(), Some(&table)).unwrap();
        assert_eq!(map.get(0), Some(Emotion::Fear));
        assert!(matches!(map.source(), LabelSource::Sidecar(_)));
    }

    #[test]
    fn test_resolve_explicit_file_wins() {
        let dir = tempfile::tempdir().unwrap();
        let explicit = dir.path().join("order.json");
        std::fs::write(&explicit, r#"["surprise","fear","anger","love","joy","sadness"]"#).unwrap();
        std::fs::write(
            dir.path().join(LABELS_FILE),
            r#"["sadness","joy","love","anger","fear","surprise"]"#,
        )
        .unwrap();

        let map = LabelMap::resolve(Some(&explicit), dir.path(), None).unwrap();
        assert_eq!(map.get(0), Some(Emotion::Surprise));
        assert!(matches!(map.source(), LabelSource::File(_)));
    }

    #[test]
    fn test_resolve_placeholders_fall_back() {
        let dir = tempfile::tempdir().unwrap();
        let table: HashMap<String, String> =
            (0..6).map(|i| (i.to_string(), format!("LABEL_{}", i))).collect();
        let map = LabelMap::resolve(None, dir.path(), Some(&table)).unwrap();
        assert_eq!(map.source(), &LabelSource::DatasetDefault);
    }

    #[test]
    fn test_resolve_wrong_placeholder_count() {
        let dir = tempfile::tempdir().unwrap();
        let table: HashMap<String, String> =
            (0..2).map(|i| (i.to_string(), format!("LABEL_{}", i))).collect();
        assert!(LabelMap::resolve(None, dir.path(), Some(&table)).is_err());
    }

    #[test]
    fn test_ensure_width() {
        let map = LabelMap::dataset_default();
        assert!(map.ensure_width(6).is_ok());
        assert!(map.ensure_width(7).is_err());
    }

    #[test]
    fn test_argmax_first_index_on_tie() {
        assert_eq!(argmax(&[0.1, 2.0, 2.0, -1.0]), Some(1));
        assert_eq!(argmax(&[3.0, 3.0, 3.0]), Some(0));
    }

    #[test]
    fn test_argmax_basic() {
        assert_eq!(argmax(&[-4.2, -0.5, -3.3, 1.7, 0.0, 1.69]), Some(3));
        assert_eq!(argmax(&[]), None);
    }

    #[test]
    fn test_argmax_skips_nan() {
        assert_eq!(argmax(&[f32::NAN, 0.2, 0.1]), Some(1));
        assert_eq!(argmax(&[f32::NAN]), None);
    }

    #[test]
    fn test_placeholder_detection() {
        assert!(is_placeholder("LABEL_0"));
        assert!(is_placeholder("LABEL_12"));
        assert!(!is_placeholder("LABEL_"));
        assert!(!is_placeholder("joy"));
    }
}
