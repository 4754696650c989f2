use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::ModelError;

/// Named values substituted into `{name}` placeholders of a [`ChatPrompt`]
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Bindings {
    values: BTreeMap<String, String>,
}

impl Bindings {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.set(key, value);
        self
    }

    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.values.insert(key.into(), value.into());
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(String::as_str)
    }
}

/// A system/user template pair
#[derive(Debug, Clone, Copy)]
pub struct ChatPrompt {
    pub system: &'static str,
    pub user: &'static str,
}

/// A prompt after placeholder substitution, ready to send to a provider
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatRequest {
    pub system: String,
    pub user: String,
}

impl ChatPrompt {
    pub const fn new(system: &'static str, user: &'static str) -> Self {
        Self { system, user }
    }

    pub fn render(&self, bindings: &Bindings) -> Result<ChatRequest, ModelError> {
        Ok(ChatRequest {
            system: render_template(self.system, bindings)?,
            user: render_template(self.user, bindings)?,
        })
    }
}

/// Substitute `{name}` placeholders.
///
/// Only braces enclosing a non-empty `[a-z0-9_]` identifier are placeholders;
/// any other brace is copied through. Bound values are inserted verbatim and
/// never rescanned, so model output containing braces is safe to bind.
pub fn render_template(template: &str, bindings: &Bindings) -> Result<String, ModelError> {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;

    while let Some(open) = rest.find('{') {
        out.push_str(&rest[..open]);
        let after = &rest[open + 1..];

        let placeholder = after.find('}').map(|close| &after[..close]).filter(|name| {
            !name.is_empty()
                && name
                    .chars()
                    .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_')
        });

        match placeholder {
            Some(name) => {
                let value = bindings
                    .get(name)
                    .ok_or_else(|| ModelError::MissingBinding(name.to_string()))?;
                out.push_str(value);
                rest = &after[name.len() + 1..];
            }
            None => {
                out.push('{');
                rest = after;
            }
        }
    }

    out.push_str(rest);
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_substitutes_placeholders() {
        let bindings = Bindings::new()
            .with("aspect", "relevance")
            .with("current_output", "Hello");
        let rendered =
            render_template("Evaluate {current_output} on {aspect}.", &bindings).unwrap();
        assert_eq!(rendered, "Evaluate Hello on relevance.");
    }

    #[test]
    fn test_render_missing_binding_fails() {
        let result = render_template("Feedback: {feedback}", &Bindings::new());
        assert!(matches!(result, Err(ModelError::MissingBinding(name)) if name == "feedback"));
    }

    #[test]
    fn test_render_leaves_non_placeholder_braces() {
        let bindings = Bindings::new().with("x", "1");
        let rendered = render_template(r#"{"a": {x}} {Not Valid} {"#, &bindings).unwrap();
        assert_eq!(rendered, r#"{"a": 1} {Not Valid} {"#);
    }

    #[test]
    fn test_bound_values_are_not_rescanned() {
        let bindings = Bindings::new()
            .with("current_output", "{feedback}")
            .with("feedback", "nope");
        let rendered = render_template("{current_output}", &bindings).unwrap();
        assert_eq!(rendered, "{feedback}");
    }

    #[test]
    fn test_chat_prompt_renders_both_roles() {
        let prompt = ChatPrompt::new("You judge {aspect}.", "Output: {current_output}");
        let bindings = Bindings::new()
            .with("aspect", "coherence")
            .with("current_output", "text");
        let request = prompt.render(&bindings).unwrap();
        assert_eq!(request.system, "You judge coherence.");
        assert_eq!(request.user, "Output: text");
    }
}
