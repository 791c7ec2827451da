//! Local LLM access through Ollama.
//!
//! [`LlmClient`] is the seam every agent talks through. [`OllamaClient`] is
//! the blocking HTTP implementation; [`MockLlmClient`] replays scripted
//! replies for tests.

pub mod mock;
pub mod ollama;
pub mod types;

pub use mock::MockLlmClient;
pub use ollama::{OllamaClient, OllamaSettings};
pub use types::*;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum LlmError {
    #[error("Cannot reach Ollama at {0}")]
    Connection(String),

    #[error("HTTP client error: {0}")]
    HttpClient(String),

    #[error("Ollama returned {status}: {body}")]
    Ollama { status: u16, body: String },

    #[error("Response parsing error: {0}")]
    ResponseParsing(String),

    #[error("Model returned an empty embedding")]
    EmptyEmbedding,
}

/// Blocking LLM operations. Implementations must not be called from async code.
pub trait LlmClient: Send + Sync {
    /// One chat completion. Tool calls requested by the model come back on the message.
    fn chat(
        &self,
        model: &str,
        messages: &[ChatMessage],
        tools: &[ToolDefinition],
    ) -> Result<ChatMessage, LlmError>;

    /// Single-turn completion with a system prompt.
    fn generate(&self, model: &str, prompt: &str, system: &str) -> Result<String, LlmError>;

    fn embed(&self, model: &str, text: &str) -> Result<Vec<f32>, LlmError>;

    fn list_models(&self) -> Result<Vec<String>, LlmError>;

    fn is_model_available(&self, model: &str) -> Result<bool, LlmError> {
        Ok(self.list_models()?.iter().any(|m| m.starts_with(model)))
    }
}
