//! Prompt rendering with a Tera template.

use crate::error::{Error, Result};
use serde::Serialize;
use std::fs;
use std::path::Path;
use tera::{Context, Tera};
use tracing::warn;

const TEMPLATE_NAME: &str = "prompt";
const CHARS_PER_TOKEN: usize = 4;

/// Default prompt size, in estimated tokens, above which a warning is logged.
pub const DEFAULT_TOKEN_WARNING: usize = 100_000;

/// Instruction text sent to the completion service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Prompt(String);

impl Prompt {
    /// Prompt text.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Consumes the prompt, returning its text.
    #[must_use]
    pub fn into_string(self) -> String {
        self.0
    }

    /// Rough token count (~4 characters per token).
    #[must_use]
    pub fn estimated_tokens(&self) -> usize {
        self.0.chars().count().div_ceil(CHARS_PER_TOKEN)
    }
}

#[derive(Serialize)]
struct PromptContext<'a> {
    path: &'a str,
    content: &'a str,
}

/// Renders per-file documentation prompts.
///
/// File content is embedded verbatim: no escaping, no truncation.
pub struct PromptFormatter {
    tera: Tera,
    token_warning: usize,
}

impl PromptFormatter {
    /// Creates a formatter using the built-in template.
    ///
    /// # Errors
    ///
    /// Returns an error if the built-in template fails to compile.
    pub fn new() -> Result<Self> {
        Self::from_source(include_str!("../templates/prompt.tera"))
    }

    /// Creates a formatter from a template file.
    ///
    /// The template sees two variables, `path` and `content`.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, or the template does not
    /// parse or render.
    pub fn from_file(path: &Path) -> Result<Self> {
        let source = fs::read_to_string(path).map_err(|e| Error::io(path, e))?;
        Self::from_source(&source)
    }

    fn from_source(source: &str) -> Result<Self> {
        let mut tera = Tera::default();
        tera.autoescape_on(vec![]);
        tera.add_raw_template(TEMPLATE_NAME, source)
            .map_err(|e| Error::template(TEMPLATE_NAME, &e))?;

        let formatter = Self {
            tera,
            token_warning: DEFAULT_TOKEN_WARNING,
        };

        // Catch references to unknown variables before the first file.
        formatter.render("", "")?;

        Ok(formatter)
    }

    /// Sets the estimated prompt size above which a warning is logged.
    #[must_use]
    pub const fn token_warning(mut self, tokens: usize) -> Self {
        self.token_warning = tokens;
        self
    }

    /// Builds the prompt for one file.
    ///
    /// # Errors
    ///
    /// Returns an error if the template fails to render.
    pub fn format(&self, path: &str, content: &str) -> Result<Prompt> {
        let prompt = Prompt(self.render(path, content)?);

        let estimated = prompt.estimated_tokens();
        if estimated > self.token_warning {
            warn!(
                "Prompt for {} is ~{} tokens (warning threshold {}); the completion service may reject it",
                path, estimated, self.token_warning
            );
        }

        Ok(prompt)
    }

    fn render(&self, path: &str, content: &str) -> Result<String> {
        let context = Context::from_serialize(PromptContext { path, content })
            .map_err(|e| Error::template(TEMPLATE_NAME, &e))?;

        self.tera
            .render(TEMPLATE_NAME, &context)
            .map_err(|e| Error::template(TEMPLATE_NAME, &e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_fs::prelude::*;

    #[test]
    fn test_prompt_embeds_path_and_content_verbatim() {
        let formatter = PromptFormatter::new().unwrap();
        let content = "def f(x):\n    return {{ x }} < 3 and '&' != \"<b>\"\n";

        let prompt = formatter.format("pkg/util.py", content).unwrap();

        assert!(prompt.as_str().contains("pkg/util.py"));
        assert!(prompt.as_str().contains(content));
    }

    #[test]
    fn test_prompt_heading_structure() {
        let prompt = PromptFormatter::new()
            .unwrap()
            .format("a.py", "x = 1")
            .unwrap();
        let text = prompt.as_str();

        assert!(text.contains("**File: a.py**"));
        assert!(text.contains("**Summary**:"));
        assert!(text.contains("**Functions**:"));
        assert!(text.contains("1. [function_name()]"));
    }

    #[test]
    fn test_large_content_is_not_truncated() {
        let formatter = PromptFormatter::new().unwrap().token_warning(10);
        let content = "line\n".repeat(10_000);

        let prompt = formatter.format("big.txt", &content).unwrap();

        assert!(prompt.as_str().contains(&content));
        assert!(prompt.estimated_tokens() > 10);
    }

    #[test]
    fn test_custom_template_file() {
        let temp = assert_fs::TempDir::new().unwrap();
        let template = temp.child("prompt.tera");
        template
            .write_str("Document {{ path }} briefly:\n{{ content }}")
            .unwrap();

        let prompt = PromptFormatter::from_file(template.path())
            .unwrap()
            .format("lib.rs", "pub fn f() {}")
            .unwrap();

        assert_eq!(prompt.as_str(), "Document lib.rs briefly:\npub fn f() {}");
    }

    #[test]
    fn test_custom_template_with_unknown_variable_is_rejected() {
        let temp = assert_fs::TempDir::new().unwrap();
        let template = temp.child("prompt.tera");
        template.write_str("{{ language }}: {{ content }}").unwrap();

        let err = PromptFormatter::from_file(template.path())
            .err()
            .unwrap();
        assert!(matches!(err, Error::Template { .. }));
    }

    #[test]
    fn test_missing_template_file() {
        let err = PromptFormatter::from_file(Path::new("/nonexistent/prompt.tera"))
            .err()
            .unwrap();
        assert!(matches!(err, Error::Io { .. }));
    }
}
