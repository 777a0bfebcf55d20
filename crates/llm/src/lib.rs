//! Language model integration for AI-DOC.
//!
//! A provider-agnostic abstraction over completion APIs, used by answer
//! synthesis. Every provider offers a blocking completion and a stream of
//! incremental chunks; dropping the stream abandons the underlying request.
//!
//! # Providers
//! - **Ollama**: Local LLM runtime (default)
//! - **OpenAI-compatible**: Groq and OpenAI chat completions
//!
//! # Example
//! ```no_run
//! use aidoc_llm::{LlmClient, LlmRequest, providers::OllamaClient};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let client = OllamaClient::new();
//! let request = LlmRequest::new("What causes anemia?", "llama3.2");
//! let response = client.complete(&request).await?;
//! println!("{}", response.content);
//! # Ok(())
//! # }
//! ```

pub mod client;
pub mod factory;
mod lines;
pub mod providers;

// Re-export main types
pub use client::{LlmClient, LlmRequest, LlmResponse, LlmStream, LlmStreamChunk, LlmUsage};
pub use factory::create_client;
pub use providers::{OllamaClient, OpenAiCompatClient};
