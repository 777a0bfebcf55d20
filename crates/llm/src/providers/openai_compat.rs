//! OpenAI-compatible chat completions provider.
//!
//! Serves Groq (the hosted default for AI-DOC) and OpenAI, which share the
//! `/chat/completions` request shape and server-sent-event streaming.

use crate::client::{LlmClient, LlmRequest, LlmResponse, LlmStream, LlmStreamChunk, LlmUsage};
use crate::lines::split_lines;
use aidoc_core::{AppError, AppResult};
use futures::StreamExt;
use serde::{Deserialize, Serialize};

/// Groq's OpenAI-compatible endpoint.
pub const GROQ_BASE_URL: &str = "https://api.groq.com/openai/v1";

/// OpenAI endpoint.
pub const OPENAI_BASE_URL: &str = "https://api.openai.com/v1";

const SSE_DATA_PREFIX: &str = "data:";
const SSE_DONE: &str = "[DONE]";

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
    stream: bool,
}

#[derive(Debug, Serialize, PartialEq)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    model: String,
    choices: Vec<ChatChoice>,
    #[serde(default)]
    usage: Option<ChatUsage>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChatChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ChatUsage {
    #[serde(default)]
    prompt_tokens: u32,
    #[serde(default)]
    completion_tokens: u32,
}

impl From<ChatUsage> for LlmUsage {
    fn from(usage: ChatUsage) -> Self {
        LlmUsage::new(usage.prompt_tokens, usage.completion_tokens)
    }
}

#[derive(Debug, Deserialize)]
struct ChatStreamEvent {
    #[serde(default)]
    model: String,
    #[serde(default)]
    choices: Vec<ChatStreamChoice>,
    /// Groq reports usage on the final event under `x_groq`
    #[serde(default)]
    x_groq: Option<GroqExtras>,
    #[serde(default)]
    usage: Option<ChatUsage>,
}

#[derive(Debug, Deserialize)]
struct ChatStreamChoice {
    #[serde(default)]
    delta: ChatDelta,
    #[serde(default)]
    finish_reason: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct ChatDelta {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GroqExtras {
    #[serde(default)]
    usage: Option<ChatUsage>,
}

/// Client for OpenAI-compatible chat completion APIs.
pub struct OpenAiCompatClient {
    provider: String,
    base_url: String,
    api_key: String,
    client: reqwest::Client,
}

impl OpenAiCompatClient {
    /// Create a client for a named provider at a base URL.
    pub fn new(
        provider: impl Into<String>,
        base_url: impl Into<String>,
        api_key: impl Into<String>,
    ) -> Self {
        Self {
            provider: provider.into(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            client: reqwest::Client::new(),
        }
    }

    /// Groq client with the default endpoint.
    pub fn groq(api_key: impl Into<String>) -> Self {
        Self::new("groq", GROQ_BASE_URL, api_key)
    }

    fn to_chat_request<'a>(&self, request: &'a LlmRequest, stream: bool) -> ChatRequest<'a> {
        let mut messages = Vec::with_capacity(2);
        if let Some(ref system) = request.system {
            messages.push(ChatMessage {
                role: "system",
                content: system,
            });
        }
        messages.push(ChatMessage {
            role: "user",
            content: &request.prompt,
        });

        ChatRequest {
            model: &request.model,
            messages,
            temperature: request.temperature,
            max_tokens: request.max_tokens,
            stream,
        }
    }

    async fn send(&self, body: &ChatRequest<'_>) -> AppResult<reqwest::Response> {
        let url = format!("{}/chat/completions", self.base_url);

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(body)
            .send()
            .await
            .map_err(|e| {
                AppError::Llm(format!("Failed to send request to {}: {}", self.provider, e))
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(AppError::Llm(format!(
                "{} API error ({}): {}",
                self.provider, status, error_text
            )));
        }

        Ok(response)
    }
}

/// Parse one server-sent-event line. Returns `None` for lines that carry no data.
fn parse_sse_line(line: &str, model: &str) -> Option<AppResult<LlmStreamChunk>> {
    let data = line.strip_prefix(SSE_DATA_PREFIX)?.trim();

    if data == SSE_DONE {
        return Some(Ok(LlmStreamChunk::end(model)));
    }

    let event: ChatStreamEvent = match serde_json::from_str(data) {
        Ok(event) => event,
        Err(e) => return Some(Err(AppError::Llm(format!("Failed to parse event: {}", e)))),
    };

    let finished = event
        .choices
        .iter()
        .any(|choice| choice.finish_reason.is_some());
    let content = event
        .choices
        .into_iter()
        .filter_map(|choice| choice.delta.content)
        .collect::<String>();
    let usage = event
        .usage
        .or_else(|| event.x_groq.and_then(|extras| extras.usage))
        .map(LlmUsage::from);

    Some(Ok(LlmStreamChunk {
        content,
        model: if event.model.is_empty() {
            model.to_string()
        } else {
            event.model
        },
        done: finished,
        usage,
    }))
}

#[async_trait::async_trait]
impl LlmClient for OpenAiCompatClient {
    fn provider_name(&self) -> &str {
        &self.provider
    }

    async fn complete(&self, request: &LlmRequest) -> AppResult<LlmResponse> {
        tracing::info!(
            provider = %self.provider,
            model = %request.model,
            "Sending chat completion request"
        );

        let response = self.send(&self.to_chat_request(request, false)).await?;

        let parsed: ChatResponse = response.json().await.map_err(|e| {
            AppError::Llm(format!("Failed to parse {} response: {}", self.provider, e))
        })?;

        let content = parsed
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or_else(|| {
                AppError::Llm(format!("{} returned no completion choices", self.provider))
            })?;

        Ok(LlmResponse {
            content,
            model: parsed.model,
            usage: parsed.usage.map(LlmUsage::from).unwrap_or_default(),
            done: true,
        })
    }

    async fn stream(&self, request: &LlmRequest) -> AppResult<LlmStream> {
        tracing::info!(
            provider = %self.provider,
            model = %request.model,
            "Starting streaming chat completion"
        );

        let response = self.send(&self.to_chat_request(request, true)).await?;
        let model = request.model.clone();

        let stream = split_lines(response.bytes_stream()).filter_map(move |line| {
            let parsed = match line {
                Ok(line) => parse_sse_line(&line, &model),
                Err(e) => Some(Err(e)),
            };
            futures::future::ready(parsed)
        });

        Ok(Box::pin(stream))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chat_request_includes_system_message_first() {
        let client = OpenAiCompatClient::groq("key");
        let request = LlmRequest::new("What is sepsis?", "llama-3.1-8b-instant")
            .with_system("You are a medical assistant.");

        let chat = client.to_chat_request(&request, false);
        assert_eq!(chat.messages.len(), 2);
        assert_eq!(chat.messages[0].role, "system");
        assert_eq!(chat.messages[1].content, "What is sepsis?");
        assert!(!chat.stream);
    }

    #[test]
    fn test_parse_sse_delta() {
        let line = r#"data: {"model":"llama-3.1-8b-instant","choices":[{"delta":{"content":"Sepsis"},"finish_reason":null}]}"#;
        let chunk = parse_sse_line(line, "fallback").unwrap().unwrap();
        assert_eq!(chunk.content, "Sepsis");
        assert_eq!(chunk.model, "llama-3.1-8b-instant");
        assert!(!chunk.done);
    }

    #[test]
    fn test_parse_sse_final_event_with_groq_usage() {
        let line = r#"data: {"model":"m","choices":[{"delta":{},"finish_reason":"stop"}],"x_groq":{"usage":{"prompt_tokens":10,"completion_tokens":5}}}"#;
        let chunk = parse_sse_line(line, "m").unwrap().unwrap();
        assert!(chunk.done);
        assert_eq!(chunk.usage, Some(LlmUsage::new(10, 5)));
    }

    #[test]
    fn test_parse_sse_done_and_comments() {
        let done = parse_sse_line("data: [DONE]", "m").unwrap().unwrap();
        assert!(done.done);
        assert!(done.content.is_empty());

        assert!(parse_sse_line(": keep-alive", "m").is_none());
        assert!(parse_sse_line("event: ping", "m").is_none());
    }

    #[test]
    fn test_parse_sse_malformed() {
        let result = parse_sse_line("data: {not json", "m").unwrap();
        assert!(matches!(result, Err(AppError::Llm(_))));
    }
}
