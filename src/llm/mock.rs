use std::collections::VecDeque;
use std::sync::Mutex;

use super::{ChatMessage, LlmClient, LlmError, ToolDefinition};

/// Scripted LLM for tests.
///
/// Chat replies are consumed in order; once the script runs out the
/// fallback text is returned. Every chat request is recorded.
pub struct MockLlmClient {
    replies: Mutex<VecDeque<ChatMessage>>,
    fallback: String,
    available_models: Vec<String>,
    requests: Mutex<Vec<Vec<ChatMessage>>>,
}

impl MockLlmClient {
    pub fn new(fallback: &str) -> Self {
        Self {
            replies: Mutex::new(VecDeque::new()),
            fallback: fallback.to_string(),
            available_models: vec!["llama3.1:latest".to_string()],
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn with_replies(self, replies: Vec<ChatMessage>) -> Self {
        if let Ok(mut queue) = self.replies.lock() {
            queue.extend(replies);
        }
        self
    }

    pub fn with_models(mut self, models: Vec<String>) -> Self {
        self.available_models = models;
        self
    }

    /// Message lists passed to `chat`, oldest first.
    pub fn requests(&self) -> Vec<Vec<ChatMessage>> {
        self.requests.lock().map(|r| r.clone()).unwrap_or_default()
    }
}

impl LlmClient for MockLlmClient {
    fn chat(
        &self,
        _model: &str,
        messages: &[ChatMessage],
        _tools: &[ToolDefinition],
    ) -> Result<ChatMessage, LlmError> {
        if let Ok(mut requests) = self.requests.lock() {
            requests.push(messages.to_vec());
        }
        let scripted = self.replies.lock().ok().and_then(|mut q| q.pop_front());
        Ok(scripted.unwrap_or_else(|| ChatMessage::assistant(self.fallback.clone())))
    }

    fn generate(&self, _model: &str, _prompt: &str, _system: &str) -> Result<String, LlmError> {
        Ok(self.fallback.clone())
    }

    fn embed(&self, _model: &str, text: &str) -> Result<Vec<f32>, LlmError> {
        // Letter-frequency vector: stable and good enough for ranking tests.
        let mut v = vec![0.0_f32; 26];
        for c in text.chars().filter(char::is_ascii_alphabetic) {
            v[(c.to_ascii_lowercase() as u8 - b'a') as usize] += 1.0;
        }
        Ok(v)
    }

    fn list_models(&self) -> Result<Vec<String>, LlmError> {
        Ok(self.available_models.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scripted_replies_then_fallback() {
        let client = MockLlmClient::new("done").with_replies(vec![ChatMessage::assistant("first")]);
        let a = client.chat("m", &[ChatMessage::user("q")], &[]).unwrap();
        let b = client.chat("m", &[ChatMessage::user("q2")], &[]).unwrap();
        assert_eq!(a.content, "first");
        assert_eq!(b.content, "done");
        assert_eq!(client.requests().len(), 2);
    }

    #[test]
    fn model_availability_uses_prefix() {
        let client = MockLlmClient::new("").with_models(vec!["llama3.1:8b".into()]);
        assert!(client.is_model_available("llama3.1").unwrap());
        assert!(!client.is_model_available("medgemma").unwrap());
    }

    #[test]
    fn embeddings_are_deterministic() {
        let client = MockLlmClient::new("");
        assert_eq!(client.embed("m", "abc").unwrap(), client.embed("m", "ABC").unwrap());
    }
}
