//! Per-file documentation generation.
//!
//! [`DocumentationGenerator`] turns a [`Prompt`] into a chat request and
//! checks that the response carries text and token usage.

use crate::completion::{ChatMessage, ChatRequest, ChatResponse, CompletionService};
use crate::error::{Error, Result};
use crate::prompt::Prompt;
use tracing::{debug, info};

/// Default cap on generated tokens per file.
pub const DEFAULT_MAX_OUTPUT_TOKENS: u32 = 4096;

/// Generated documentation for one file plus its token usage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerationResult {
    /// Generated Markdown
    pub text: String,
    /// Tokens consumed by the prompt
    pub prompt_tokens: u64,
    /// Tokens generated
    pub completion_tokens: u64,
    /// Prompt plus completion tokens
    pub total_tokens: u64,
}

impl GenerationResult {
    /// Checks that a response carries generated text and all usage counters.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Generation`] describing the first missing piece.
    pub fn from_response(response: ChatResponse) -> Result<Self> {
        let choice = response
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| Error::generation("response contains no choices"))?;

        let text = choice
            .message
            .and_then(|message| message.content)
            .ok_or_else(|| match choice.finish_reason.as_deref() {
                Some(reason) => Error::generation(format!(
                    "first choice has no message content (finish reason: {reason})"
                )),
                None => Error::generation("first choice has no message content"),
            })?;

        let usage = response
            .usage
            .ok_or_else(|| Error::generation("response is missing token usage"))?;
        let counter = |value: Option<u64>, name: &str| {
            value.ok_or_else(|| Error::generation(format!("token usage is missing '{name}'")))
        };

        Ok(Self {
            text,
            prompt_tokens: counter(usage.prompt_tokens, "prompt_tokens")?,
            completion_tokens: counter(usage.completion_tokens, "completion_tokens")?,
            total_tokens: counter(usage.total_tokens, "total_tokens")?,
        })
    }
}

/// Turns prompts into documentation using a completion service.
pub struct DocumentationGenerator {
    service: Box<dyn CompletionService>,
    deployment: String,
    temperature: f32,
    max_tokens: u32,
}

impl DocumentationGenerator {
    /// Creates a generator with deterministic decoding and the default output cap.
    pub fn new(service: Box<dyn CompletionService>, deployment: impl Into<String>) -> Self {
        Self {
            service,
            deployment: deployment.into(),
            temperature: 0.0,
            max_tokens: DEFAULT_MAX_OUTPUT_TOKENS,
        }
    }

    /// Sets the sampling temperature.
    #[must_use]
    pub const fn temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    /// Sets the maximum number of generated tokens.
    #[must_use]
    pub const fn max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    /// Builds the single-message request for a prompt.
    #[must_use]
    pub fn request(&self, prompt: &Prompt) -> ChatRequest {
        ChatRequest {
            deployment: self.deployment.clone(),
            messages: vec![ChatMessage::user(prompt.as_str())],
            temperature: self.temperature,
            max_tokens: self.max_tokens,
        }
    }

    /// Generates documentation for one prompt.
    ///
    /// # Errors
    ///
    /// Returns the service error, or [`Error::Generation`] if the response
    /// lacks generated text or usage counters.
    pub fn generate(&self, prompt: &Prompt) -> Result<GenerationResult> {
        let response = self.service.complete(&self.request(prompt))?;
        let result = GenerationResult::from_response(response)?;

        debug!(
            "Generated {} characters ({} tokens)",
            result.text.len(),
            result.total_tokens
        );
        info!("Completion response processed successfully");

        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::completion::{ChatChoice, ChatChoiceMessage, ChatUsage, Role};
    use crate::prompt::PromptFormatter;
    use std::cell::RefCell;
    use std::rc::Rc;

    struct CannedService {
        response: ChatResponse,
        seen: Rc<RefCell<Vec<ChatRequest>>>,
    }

    impl CompletionService for CannedService {
        fn complete(&self, request: &ChatRequest) -> Result<ChatResponse> {
            self.seen.borrow_mut().push(request.clone());
            Ok(self.response.clone())
        }
    }

    fn response(content: Option<&str>, usage: Option<ChatUsage>) -> ChatResponse {
        ChatResponse {
            choices: vec![ChatChoice {
                message: Some(ChatChoiceMessage {
                    content: content.map(str::to_string),
                }),
                finish_reason: Some("stop".to_string()),
            }],
            usage,
        }
    }

    fn full_usage() -> ChatUsage {
        ChatUsage {
            prompt_tokens: Some(100),
            completion_tokens: Some(20),
            total_tokens: Some(120),
        }
    }

    fn prompt() -> Prompt {
        PromptFormatter::new().unwrap().format("a.py", "x = 1").unwrap()
    }

    #[test]
    fn test_generate_extracts_text_and_usage() {
        let seen = Rc::new(RefCell::new(Vec::new()));
        let generator = DocumentationGenerator::new(
            Box::new(CannedService {
                response: response(Some("**File: a.py**"), Some(full_usage())),
                seen: Rc::clone(&seen),
            }),
            "docs-deployment",
        );

        let result = generator.generate(&prompt()).unwrap();

        assert_eq!(
            result,
            GenerationResult {
                text: "**File: a.py**".to_string(),
                prompt_tokens: 100,
                completion_tokens: 20,
                total_tokens: 120,
            }
        );

        let requests = seen.borrow();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].deployment, "docs-deployment");
        assert_eq!(requests[0].messages.len(), 1);
        assert_eq!(requests[0].messages[0].role, Role::User);
        assert!(requests[0].messages[0].content.contains("x = 1"));
        assert!(requests[0].temperature.abs() < f32::EPSILON);
        assert_eq!(requests[0].max_tokens, 4096);
    }

    #[test]
    fn test_missing_usage_is_generation_error() {
        let err = GenerationResult::from_response(response(Some("docs"), None)).unwrap_err();
        assert!(matches!(err, Error::Generation { .. }));
        assert!(err.to_string().contains("usage"));
    }

    #[test]
    fn test_partial_usage_is_generation_error() {
        let usage = ChatUsage {
            total_tokens: None,
            ..full_usage()
        };
        let err = GenerationResult::from_response(response(Some("docs"), Some(usage))).unwrap_err();
        assert!(err.to_string().contains("total_tokens"));
    }

    #[test]
    fn test_no_choices_is_generation_error() {
        let err = GenerationResult::from_response(ChatResponse::default()).unwrap_err();
        assert!(err.to_string().contains("no choices"));
    }

    #[test]
    fn test_filtered_content_reports_finish_reason() {
        let mut filtered = response(None, Some(full_usage()));
        filtered.choices[0].finish_reason = Some("content_filter".to_string());

        let err = GenerationResult::from_response(filtered).unwrap_err();
        assert!(err.to_string().contains("content_filter"));
    }
}
