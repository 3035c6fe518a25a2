// src/web/state.rs
// Handles shared by every request

use std::sync::Arc;
use std::time::Duration;

use crate::emotion::EmotionClassifier;
use crate::generator::ResponseGenerator;

/// Shared application state.
///
/// Built once at startup. Both handles are read-only, so cloning the state
/// per request only bumps reference counts.
#[derive(Clone)]
pub struct AppState {
    /// Loaded emotion classifier
    pub classifier: Arc<dyn EmotionClassifier>,

    /// Reply generator (Ollama in production)
    pub generator: Arc<dyn ResponseGenerator>,

    /// Optional deadline for one generation call
    pub generation_timeout: Option<Duration>,
}

impl AppState {
    pub fn new(classifier: Arc<dyn EmotionClassifier>, generator: Arc<dyn ResponseGenerator>) -> Self {
        Self {
            classifier,
            generator,
            generation_timeout: None,
        }
    }

    pub fn with_generation_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.generation_timeout = timeout;
        self
    }
}
