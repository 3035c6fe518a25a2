// src/generator/prompt.rs
// Prompt template for empathetic replies

use crate::emotion::Emotion;

/// Fill the reply template with the detected emotion and the user's message
pub fn build_prompt(message: &str, emotion: Emotion) -> String {
    format!(
        "Given that the user's message shows {emotion}, please provide an empathetic response \
         so that the person can feel better.\n\
         User message: {message}\n\
         Please keep the response concise and natural."
    )
}
