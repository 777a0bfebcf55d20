//! Prompt system for AI-DOC answer synthesis.
//!
//! This crate provides:
//! - The built-in medical question-answering prompt
//! - YAML-based prompt definitions that can replace it
//! - Handlebars template rendering

pub mod builder;
pub mod defaults;
pub mod loader;
pub mod types;

// Re-export main types
pub use builder::build_prompt;
pub use defaults::medical_qa_default;
pub use loader::{load_or_default, load_prompt};
pub use types::{BuiltPrompt, BuiltPromptMetadata, PromptBehavior, PromptDefinition};

/// Template variable holding the user's question.
pub const VAR_QUESTION: &str = "question";

/// Template variable holding retrieved passages; empty when nothing was found.
pub const VAR_CONTEXT: &str = "context";
