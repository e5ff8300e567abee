// Generative-AI completion client (Gemini-compatible).

pub mod client;
pub mod models;

pub use client::{DEFAULT_AI_BASE_URL, DEFAULT_AI_MODEL, GenerativeClient};
pub use models::{Completion, TokenUsage};
