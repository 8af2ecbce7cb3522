//! The system prompt, rendered with tera from the bundled template or an
//! operator supplied file.

use serde::Serialize;
use std::path::PathBuf;
use tera::{Context, Error as TeraError, Tera};

use crate::retrieval::{NO_RELEVANT_CONTEXT_FOUND, RETRIEVE_TOOL_NAME};

const BUNDLED_TEMPLATE: &str = include_str!("prompts/system.md");

/// Variables available to the system prompt template
#[derive(Debug, Clone, Serialize)]
pub struct SystemPromptContext {
    pub organization: String,
    pub tool_name: String,
    pub no_context: String,
}

impl SystemPromptContext {
    pub fn new(organization: impl Into<String>) -> Self {
        Self {
            organization: organization.into(),
            tool_name: RETRIEVE_TOOL_NAME.to_string(),
            no_context: NO_RELEVANT_CONTEXT_FOUND.to_string(),
        }
    }
}

fn render(name: &str, template: &str, context: &SystemPromptContext) -> Result<String, TeraError> {
    let mut tera = Tera::default();
    tera.add_raw_template(name, template)?;
    tera.render(name, &Context::from_serialize(context)?)
}

/// Render the system prompt from `template_file` when given, otherwise from the bundled template.
/// Unknown variables in a custom template are an error rather than an empty string.
pub fn system_prompt(
    context: &SystemPromptContext,
    template_file: Option<PathBuf>,
) -> Result<String, TeraError> {
    match template_file {
        Some(path) => {
            let template = std::fs::read_to_string(&path).map_err(|e| {
                TeraError::chain(format!("Failed to read {}", path.display()), e)
            })?;
            render(&path.display().to_string(), &template, context)
        }
        None => render("system.md", BUNDLED_TEMPLATE, context),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_bundled_prompt_names_tool_and_sentinel() {
        let prompt = system_prompt(&SystemPromptContext::new("Acme Labs"), None).unwrap();

        assert!(prompt.starts_with("You are a professional AI assistant for Acme Labs."));
        assert!(prompt.contains("Acme Labs's services"));
        assert!(prompt.contains("`retrieve_query`"));
        assert!(prompt.contains("NO_RELEVANT_CONTEXT_FOUND"));
        assert!(prompt.contains("Never hallucinate"));
        assert!(!prompt.contains("{{"));
    }

    #[test]
    fn test_custom_template_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("support.md");
        std::fs::write(
            &path,
            "Support desk for {{ organization }}. Search with {{ tool_name }}; on {{ no_context }} apologise.",
        )
        .unwrap();

        let prompt = system_prompt(&SystemPromptContext::new("Northwind"), Some(path)).unwrap();
        assert_eq!(
            prompt,
            "Support desk for Northwind. Search with retrieve_query; on NO_RELEVANT_CONTEXT_FOUND apologise."
        );
    }

    #[test]
    fn test_custom_template_with_unknown_variable() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("bad.md");
        std::fs::write(&path, "Hello from {{ assistant_name }}").unwrap();

        assert!(system_prompt(&SystemPromptContext::new("Northwind"), Some(path)).is_err());
    }

    #[test]
    fn test_missing_template_file() {
        let dir = tempdir().unwrap();
        let err = system_prompt(
            &SystemPromptContext::new("Northwind"),
            Some(dir.path().join("absent.md")),
        )
        .unwrap_err();
        assert!(err.to_string().starts_with("Failed to read"));
    }
}
