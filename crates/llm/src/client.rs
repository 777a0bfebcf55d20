//! Provider-neutral generation requests and the [`LlmClient`] trait.
//!
//! Providers translate these types into their own wire formats; nothing here
//! is sent over the network as-is.

use aidoc_core::AppResult;
use futures::Stream;
use std::pin::Pin;

/// A single-turn generation request: one user prompt, an optional system
/// prompt and sampling limits.
#[derive(Debug, Clone, PartialEq)]
pub struct LlmRequest {
    pub prompt: String,
    pub model: String,
    /// Upper bound on generated tokens; provider default when unset
    pub max_tokens: Option<u32>,
    pub temperature: Option<f32>,
    /// Set by [`LlmRequest::with_streaming`]. [`LlmClient::stream`] streams
    /// either way.
    pub stream: bool,
    pub system: Option<String>,
}

impl LlmRequest {
    pub fn new(prompt: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            model: model.into(),
            max_tokens: None,
            temperature: None,
            stream: false,
            system: None,
        }
    }

    pub fn with_streaming(mut self) -> Self {
        self.stream = true;
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    pub fn with_system(mut self, system: impl Into<String>) -> Self {
        self.system = Some(system.into());
        self
    }
}

/// A finished, non-streamed generation.
#[derive(Debug, Clone)]
pub struct LlmResponse {
    pub content: String,
    /// Model reported by the provider, which may differ from the requested alias
    pub model: String,
    pub usage: LlmUsage,
    /// False when the provider stopped early (length limit, truncation)
    pub done: bool,
}

/// Token accounting as reported by the provider. Zero when it reports nothing.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LlmUsage {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
    pub total_tokens: u32,
}

impl LlmUsage {
    pub fn new(prompt_tokens: u32, completion_tokens: u32) -> Self {
        Self {
            prompt_tokens,
            completion_tokens,
            total_tokens: prompt_tokens.saturating_add(completion_tokens),
        }
    }
}

/// One increment of a streamed answer.
///
/// Exactly one chunk per stream has `done` set; it may still carry text, and
/// usage is only ever attached to it.
#[derive(Debug, Clone, PartialEq)]
pub struct LlmStreamChunk {
    pub content: String,
    pub model: String,
    pub done: bool,
    pub usage: Option<LlmUsage>,
}

impl LlmStreamChunk {
    /// Empty terminator for providers that signal the end out of band.
    pub fn end(model: impl Into<String>) -> Self {
        Self {
            content: String::new(),
            model: model.into(),
            done: true,
            usage: None,
        }
    }
}

/// Boxed chunk stream. Dropping it drops the HTTP response body, which
/// aborts the request.
pub type LlmStream = Pin<Box<dyn Stream<Item = AppResult<LlmStreamChunk>> + Send>>;

/// A language-model backend (Ollama, Groq, OpenAI).
///
/// Implementations never retry. Transport and API failures surface as
/// `AppError::Llm`; callers decide how to classify them.
#[async_trait::async_trait]
pub trait LlmClient: Send + Sync {
    fn provider_name(&self) -> &str;

    async fn complete(&self, request: &LlmRequest) -> AppResult<LlmResponse>;

    /// Streams regardless of `request.stream`.
    async fn stream(&self, request: &LlmRequest) -> AppResult<LlmStream>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_builder() {
        let request = LlmRequest::new("question", "llama3.2")
            .with_system("be brief")
            .with_temperature(0.2)
            .with_max_tokens(256)
            .with_streaming();

        assert_eq!(request.system.as_deref(), Some("be brief"));
        assert_eq!(request.temperature, Some(0.2));
        assert_eq!(request.max_tokens, Some(256));
        assert!(request.stream);
    }

    #[test]
    fn test_usage_totals() {
        assert_eq!(LlmUsage::new(120, 30).total_tokens, 150);
        assert_eq!(LlmUsage::new(u32::MAX, 1).total_tokens, u32::MAX);
    }

    #[test]
    fn test_end_chunk_is_empty_and_final() {
        let end = LlmStreamChunk::end("llama-3.1-8b-instant");
        assert!(end.done);
        assert!(end.content.is_empty());
        assert!(end.usage.is_none());
    }
}
