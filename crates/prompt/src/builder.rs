//! Prompt builder for rendering templates.

use crate::types::{BuiltPrompt, BuiltPromptMetadata, PromptDefinition};
use crate::VAR_CONTEXT;
use aidoc_core::{AppError, AppResult};
use handlebars::Handlebars;
use std::collections::HashMap;

/// Build a prompt from a definition and input variables.
///
/// The definition's `behavior.tone` and `behavior.style` are added as the
/// `tone` and `style` variables unless the caller already set them. Both the
/// system and user templates are rendered with HTML escaping disabled.
///
/// # Example
/// ```
/// use aidoc_prompt::{build_prompt, medical_qa_default};
/// use std::collections::HashMap;
///
/// let mut vars = HashMap::new();
/// vars.insert("question".to_string(), "What is anemia?".to_string());
/// vars.insert("context".to_string(), String::new());
///
/// let built = build_prompt(&medical_qa_default(), vars).unwrap();
/// assert!(built.user.contains("What is anemia?"));
/// assert!(!built.metadata.context_included);
/// ```
pub fn build_prompt(
    definition: &PromptDefinition,
    mut variables: HashMap<String, String>,
) -> AppResult<BuiltPrompt> {
    tracing::debug!("Building prompt: {}", definition.id);

    variables
        .entry("tone".to_string())
        .or_insert_with(|| definition.behavior.tone.clone());
    variables
        .entry("style".to_string())
        .or_insert_with(|| definition.behavior.style.clone());

    let context_included = variables
        .get(VAR_CONTEXT)
        .is_some_and(|ctx| !ctx.trim().is_empty());

    let user = render_template(&definition.template, &variables)?;
    let system = definition
        .system
        .as_deref()
        .map(|template| render_template(template, &variables))
        .transpose()?;

    Ok(BuiltPrompt {
        system,
        user,
        metadata: BuiltPromptMetadata {
            source_prompt_id: definition.id.clone(),
            context_included,
            resolved_variables: variables,
        },
    })
}

/// Render a Handlebars template with variables.
fn render_template(template: &str, variables: &HashMap<String, String>) -> AppResult<String> {
    let mut handlebars = Handlebars::new();

    // Disable HTML escaping for plain text
    handlebars.register_escape_fn(handlebars::no_escape);

    handlebars
        .register_template_string("prompt", template)
        .map_err(|e| AppError::Prompt(format!("Failed to register template: {}", e)))?;

    let rendered = handlebars
        .render("prompt", variables)
        .map_err(|e| AppError::Prompt(format!("Failed to render template: {}", e)))?;

    Ok(rendered)
}
