//! LLM provider factory.
//!
//! Creates LLM clients from a provider name, resolving endpoints and
//! checking that hosted providers have a key.

use crate::client::LlmClient;
use crate::providers::openai_compat::{GROQ_BASE_URL, OPENAI_BASE_URL};
use crate::providers::{OllamaClient, OpenAiCompatClient};
use aidoc_core::{AppError, AppResult};
use std::sync::Arc;

/// Create an LLM client based on the provider name.
///
/// # Arguments
/// * `provider` - Provider identifier ("ollama", "groq", "openai")
/// * `endpoint` - Optional custom endpoint URL
/// * `api_key` - API key (required for hosted providers)
///
/// # Errors
/// Returns `AppError::Config` if the provider is unknown or a required key is missing.
pub fn create_client(
    provider: &str,
    endpoint: Option<&str>,
    api_key: Option<&str>,
) -> AppResult<Arc<dyn LlmClient>> {
    match provider.to_lowercase().as_str() {
        "ollama" => {
            let client = match endpoint {
                Some(url) => OllamaClient::with_base_url(url),
                None => OllamaClient::new(),
            };
            Ok(Arc::new(client))
        }
        name @ ("groq" | "openai") => {
            let api_key = api_key.ok_or_else(|| {
                AppError::Config(format!("{} provider requires an API key", name))
            })?;
            let default_url = if name == "groq" {
                GROQ_BASE_URL
            } else {
                OPENAI_BASE_URL
            };
            let client = OpenAiCompatClient::new(name, endpoint.unwrap_or(default_url), api_key);
            Ok(Arc::new(client))
        }
        _ => Err(AppError::Config(format!("Unknown provider: {}", provider))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_ollama_client() {
        let client = create_client("ollama", None, None).unwrap();
        assert_eq!(client.provider_name(), "ollama");
    }

    #[test]
    fn test_create_ollama_with_custom_endpoint() {
        let client = create_client("ollama", Some("http://localhost:8080"), None);
        assert!(client.is_ok());
    }

    #[test]
    fn test_create_groq_client() {
        let client = create_client("Groq", None, Some("gsk_test")).unwrap();
        assert_eq!(client.provider_name(), "groq");
    }

    #[test]
    fn test_groq_requires_api_key() {
        match create_client("groq", None, None) {
            Err(AppError::Config(msg)) => assert!(msg.contains("requires an API key")),
            Err(other) => panic!("Unexpected error: {}", other),
            Ok(_) => panic!("Expected error for Groq without API key"),
        }
    }

    #[test]
    fn test_unknown_provider() {
        match create_client("unknown", None, None) {
            Err(err) => assert!(err.to_string().contains("Unknown provider")),
            Ok(_) => panic!("Expected error for unknown provider"),
        }
    }
}
