//! Built-in prompt definitions.

use crate::types::{PromptBehavior, PromptDefinition};

/// Identifier of the built-in medical QA prompt.
pub const MEDICAL_QA_ID: &str = "aidoc.medical-qa.default";

const MEDICAL_QA_SYSTEM: &str = "\
You are AI-DOC, a medical information assistant. Your tone is {{tone}} and your style is {{style}}.
You explain medical topics clearly for a general audience.
You never diagnose the user or prescribe treatment, and you recommend consulting a qualified \
healthcare professional for personal medical decisions.";

const MEDICAL_QA_TEMPLATE: &str = "\
{{#if context}}
Answer the question using the excerpts from medical reference documents below.
If the excerpts do not contain the answer, say that you could not find it in the documents.

Excerpts:
{{context}}
{{else}}
No relevant passages were found in the reference documents for this question.
Answer from general medical knowledge, state clearly that the answer is not based on the \
provided documents, and keep it brief.
{{/if}}

Question: {{question}}
Answer:";

/// The built-in medical question-answering prompt.
pub fn medical_qa_default() -> PromptDefinition {
    PromptDefinition {
        id: MEDICAL_QA_ID.to_string(),
        title: "Medical question answering".to_string(),
        api_version: "1.0".to_string(),
        behavior: PromptBehavior {
            tone: "professional and empathetic".to_string(),
            style: "concise".to_string(),
        },
        system: Some(MEDICAL_QA_SYSTEM.to_string()),
        template: MEDICAL_QA_TEMPLATE.to_string(),
    }
}
