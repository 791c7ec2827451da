use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::{ChatMessage, LlmClient, LlmError, ToolDefinition};

/// Sampling options sent with every chat and generate request.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct OllamaSettings {
    pub temperature: f32,
    #[serde(rename = "num_predict")]
    pub max_tokens: u32,
}

impl Default for OllamaSettings {
    fn default() -> Self {
        Self {
            temperature: 0.1,
            max_tokens: 512,
        }
    }
}

/// Blocking Ollama HTTP client.
///
/// Must be built and dropped outside the async runtime's worker threads;
/// the server constructs it before entering the runtime and only calls it
/// from `spawn_blocking`.
pub struct OllamaClient {
    base_url: String,
    client: reqwest::blocking::Client,
    timeout_secs: u64,
    settings: OllamaSettings,
}

impl OllamaClient {
    pub fn new(base_url: &str, timeout: Duration, settings: OllamaSettings) -> Result<Self, LlmError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| LlmError::HttpClient(e.to_string()))?;

        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client,
            timeout_secs: timeout.as_secs(),
            settings,
        })
    }

    pub fn from_config(config: &crate::config::Config) -> Result<Self, LlmError> {
        Self::new(
            &config.ollama_url,
            config.request_timeout(),
            OllamaSettings {
                temperature: config.temperature,
                max_tokens: config.max_tokens,
            },
        )
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn send_error(&self, e: reqwest::Error) -> LlmError {
        if e.is_connect() {
            LlmError::Connection(self.base_url.clone())
        } else if e.is_timeout() {
            LlmError::HttpClient(format!("Request timed out after {}s", self.timeout_secs))
        } else {
            LlmError::HttpClient(e.to_string())
        }
    }

    fn post<B, R>(&self, path: &str, body: &B) -> Result<R, LlmError>
    where
        B: Serialize,
        R: for<'de> Deserialize<'de>,
    {
        let url = format!("{}{path}", self.base_url);
        let response = self
            .client
            .post(&url)
            .json(body)
            .send()
            .map_err(|e| self.send_error(e))?;
        read_json(response)
    }
}

fn read_json<R>(response: reqwest::blocking::Response) -> Result<R, LlmError>
where
    R: for<'de> Deserialize<'de>,
{
    let status = response.status();
    if !status.is_success() {
        let body = response.text().unwrap_or_default();
        return Err(LlmError::Ollama {
            status: status.as_u16(),
            body,
        });
    }
    response
        .json()
        .map_err(|e| LlmError::ResponseParsing(e.to_string()))
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    #[serde(skip_serializing_if = "<[_]>::is_empty")]
    tools: &'a [ToolDefinition],
    stream: bool,
    options: OllamaSettings,
}

#[derive(Deserialize)]
struct ChatResponse {
    message: ChatMessage,
}

#[derive(Serialize)]
struct GenerateRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    system: &'a str,
    stream: bool,
    options: OllamaSettings,
}

#[derive(Deserialize)]
struct GenerateResponse {
    response: String,
}

#[derive(Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    prompt: &'a str,
}

#[derive(Deserialize)]
struct EmbeddingResponse {
    embedding: Vec<f32>,
}

#[derive(Deserialize)]
struct TagsResponse {
    models: Vec<TaggedModel>,
}

#[derive(Deserialize)]
struct TaggedModel {
    name: String,
}

impl LlmClient for OllamaClient {
    fn chat(
        &self,
        model: &str,
        messages: &[ChatMessage],
        tools: &[ToolDefinition],
    ) -> Result<ChatMessage, LlmError> {
        tracing::debug!(model, messages = messages.len(), tools = tools.len(), "Ollama chat");
        let parsed: ChatResponse = self.post(
            "/api/chat",
            &ChatRequest {
                model,
                messages,
                tools,
                stream: false,
                options: self.settings,
            },
        )?;
        Ok(parsed.message)
    }

    fn generate(&self, model: &str, prompt: &str, system: &str) -> Result<String, LlmError> {
        let parsed: GenerateResponse = self.post(
            "/api/generate",
            &GenerateRequest {
                model,
                prompt,
                system,
                stream: false,
                options: self.settings,
            },
        )?;
        Ok(parsed.response)
    }

    fn embed(&self, model: &str, text: &str) -> Result<Vec<f32>, LlmError> {
        let parsed: EmbeddingResponse =
            self.post("/api/embeddings", &EmbeddingRequest { model, prompt: text })?;
        if parsed.embedding.is_empty() {
            return Err(LlmError::EmptyEmbedding);
        }
        Ok(parsed.embedding)
    }

    fn list_models(&self) -> Result<Vec<String>, LlmError> {
        let url = format!("{}/api/tags", self.base_url);
        let response = self.client.get(&url).send().map_err(|e| self.send_error(e))?;
        let parsed: TagsResponse = read_json(response)?;
        Ok(parsed.models.into_iter().map(|m| m.name).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn settings_serialize_as_ollama_options() {
        let json = serde_json::to_value(OllamaSettings::default()).unwrap();
        assert_eq!(json["num_predict"], 512);
        assert!(json.get("max_tokens").is_none());
    }

    #[test]
    fn chat_request_skips_empty_tools() {
        let messages = [ChatMessage::user("hello")];
        let body = ChatRequest {
            model: "llama3.1",
            messages: &messages,
            tools: &[],
            stream: false,
            options: OllamaSettings::default(),
        };
        let json = serde_json::to_value(&body).unwrap();
        assert!(json.get("tools").is_none());
        assert_eq!(json["stream"], false);
        assert_eq!(json["messages"][0]["content"], "hello");
    }

    #[test]
    fn chat_response_parses_tool_calls() {
        let parsed: ChatResponse = serde_json::from_value(json!({
            "model": "llama3.1",
            "message": {
                "role": "assistant",
                "content": "",
                "tool_calls": [{"function": {"name": "get_doctors_list", "arguments": {}}}]
            },
            "done": true
        }))
        .unwrap();
        assert_eq!(parsed.message.tool_calls[0].function.name, "get_doctors_list");
    }

    #[test]
    fn constructor_trims_trailing_slash() {
        let client = OllamaClient::new(
            "http://localhost:11434/",
            Duration::from_secs(60),
            OllamaSettings::default(),
        )
        .unwrap();
        assert_eq!(client.base_url(), "http://localhost:11434");
        assert_eq!(client.timeout_secs, 60);
    }
}
