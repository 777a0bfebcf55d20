//! Prompt loader for YAML prompt definitions.

use crate::defaults::medical_qa_default;
use crate::types::PromptDefinition;
use aidoc_core::{AppError, AppResult};
use std::path::Path;

/// Load a prompt definition from a YAML file.
///
/// # Example
/// ```no_run
/// use aidoc_prompt::load_prompt;
/// use std::path::Path;
///
/// # fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let prompt = load_prompt(Path::new(".aidoc/prompts/medical.yml"))?;
/// println!("Loaded prompt: {}", prompt.title);
/// # Ok(())
/// # }
/// ```
pub fn load_prompt(path: &Path) -> AppResult<PromptDefinition> {
    tracing::debug!("Loading prompt from: {:?}", path);

    if !path.exists() {
        return Err(AppError::Prompt(format!("Prompt file not found: {:?}", path)));
    }

    let contents = std::fs::read_to_string(path).map_err(|e| {
        AppError::Prompt(format!("Failed to read prompt file {:?}: {}", path, e))
    })?;

    let definition: PromptDefinition = serde_yaml::from_str(&contents).map_err(|e| {
        AppError::Prompt(format!("Failed to parse prompt YAML {:?}: {}", path, e))
    })?;

    validate_prompt(&definition)?;

    tracing::info!("Loaded prompt: {} ({})", definition.id, definition.title);

    Ok(definition)
}

/// Load the configured prompt file, or fall back to the built-in medical prompt.
pub fn load_or_default(path: Option<&Path>) -> AppResult<PromptDefinition> {
    match path {
        Some(path) => load_prompt(path),
        None => Ok(medical_qa_default()),
    }
}

/// Validate a prompt definition.
fn validate_prompt(def: &PromptDefinition) -> AppResult<()> {
    if def.id.is_empty() {
        return Err(AppError::Prompt("Prompt ID cannot be empty".to_string()));
    }

    if def.template.trim().is_empty() {
        return Err(AppError::Prompt(
            "Prompt template cannot be empty".to_string(),
        ));
    }

    if !def.template.contains("{{question}}") {
        return Err(AppError::Prompt(format!(
            "Prompt '{}' never renders {{{{question}}}}",
            def.id
        )));
    }

    if !def.api_version.contains('.') {
        return Err(AppError::Prompt(format!(
            "Invalid apiVersion format: {}. Expected format: 'x.y'",
            def.api_version
        )));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::path::PathBuf;
    use tempfile::TempDir;

    fn write_prompt(dir: &Path, body: &str) -> PathBuf {
        let path = dir.join("prompt.yml");
        fs::write(&path, body).unwrap();
        path
    }

    #[test]
    fn test_load_valid_prompt() {
        let temp_dir = TempDir::new().unwrap();
        let path = write_prompt(
            temp_dir.path(),
            r#"
id: clinic.qa
title: "Clinic QA"
apiVersion: "1.0"
behavior:
  tone: professional
  style: concise
template: "Context: {{context}}\nQuestion: {{question}}"
"#,
        );

        let prompt = load_prompt(&path).unwrap();
        assert_eq!(prompt.id, "clinic.qa");
        assert_eq!(prompt.title, "Clinic QA");
    }

    #[test]
    fn test_load_nonexistent_prompt() {
        let temp_dir = TempDir::new().unwrap();
        let result = load_prompt(&temp_dir.path().join("missing.yml"));
        assert!(matches!(result, Err(AppError::Prompt(_))));
    }

    #[test]
    fn test_load_invalid_yaml() {
        let temp_dir = TempDir::new().unwrap();
        let path = write_prompt(temp_dir.path(), "invalid: yaml: content:");

        assert!(load_prompt(&path).is_err());
    }

    #[test]
    fn test_template_must_render_question() {
        let temp_dir = TempDir::new().unwrap();
        let path = write_prompt(
            temp_dir.path(),
            r#"
id: broken
title: Broken
apiVersion: "1.0"
behavior: { tone: neutral, style: concise }
template: "Context only: {{context}}"
"#,
        );

        let err = load_prompt(&path).unwrap_err();
        assert!(err.to_string().contains("never renders"));
    }

    #[test]
    fn test_load_or_default_without_path() {
        let prompt = load_or_default(None).unwrap();
        assert_eq!(prompt, medical_qa_default());
    }
}
