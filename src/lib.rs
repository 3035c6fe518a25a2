// src/lib.rs
// emotion-chat - emotion classification with empathetic replies

pub mod config;
pub mod emotion;
pub mod error;
pub mod generator;
pub mod http;
pub mod web;

pub use error::{EmotionChatError, Result};
