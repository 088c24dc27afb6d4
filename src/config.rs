use crate::completion::DEFAULT_API_VERSION;
use crate::error::{Error, Result};
use crate::event::EventKind;
use crate::filter::FileFilterConfig;
use crate::generator::DEFAULT_MAX_OUTPUT_TOKENS;
use crate::prompt::DEFAULT_TOKEN_WARNING;
use crate::source::RepositoryId;
use crate::writer::DEFAULT_OUTPUT_FILE;
use std::path::PathBuf;
use std::time::Duration;

const DEFAULT_GITHUB_API_URL: &str = "https://api.github.com";
const DEFAULT_TIMEOUT_SECS: u64 = 120;

/// Configuration for a documentation run.
///
/// Use [`Config::builder()`] to construct a new configuration.
#[derive(Clone)]
#[non_exhaustive]
pub struct Config {
    /// Repository to document
    pub repository: RepositoryId,

    /// GitHub access token with read access to the repository
    pub access_token: String,

    /// Event that triggered the run
    pub event: EventKind,

    /// Pull request number, present for pull request events
    pub pull_request_number: Option<u64>,

    /// Pushed ref (`refs/heads/<branch>`) for push events
    pub git_ref: Option<String>,

    /// Completion deployment (model) identifier
    pub deployment: String,

    /// Completion service credential
    pub completion_api_key: String,

    /// Completion service resource endpoint
    pub completion_endpoint: String,

    /// Completion REST API version
    pub completion_api_version: String,

    /// GitHub REST API base URL
    pub github_api_url: String,

    /// Where the documentation is written
    pub output_path: PathBuf,

    /// Path filtering configuration
    pub file_filter_config: FileFilterConfig,

    /// Custom prompt template file
    pub prompt_template: Option<PathBuf>,

    /// Estimated prompt size that triggers a warning
    pub prompt_token_warning: usize,

    /// Maximum tokens generated per file
    pub max_output_tokens: u32,

    /// Sampling temperature
    pub temperature: f32,

    /// HTTP request timeout
    pub request_timeout: Duration,
}

impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Config")
            .field("repository", &self.repository)
            .field("access_token", &"<redacted>")
            .field("event", &self.event)
            .field("pull_request_number", &self.pull_request_number)
            .field("git_ref", &self.git_ref)
            .field("deployment", &self.deployment)
            .field("completion_api_key", &"<redacted>")
            .field("completion_endpoint", &self.completion_endpoint)
            .field("completion_api_version", &self.completion_api_version)
            .field("github_api_url", &self.github_api_url)
            .field("output_path", &self.output_path)
            .field("file_filter_config", &self.file_filter_config)
            .field("prompt_template", &self.prompt_template)
            .field("prompt_token_warning", &self.prompt_token_warning)
            .field("max_output_tokens", &self.max_output_tokens)
            .field("temperature", &self.temperature)
            .field("request_timeout", &self.request_timeout)
            .finish()
    }
}

impl Config {
    /// Creates a new configuration builder.
    ///
    /// # Examples
    ///
    /// ```
    /// use repodoc::Config;
    ///
    /// let config = Config::builder()
    ///     .repository("octo/demo")
    ///     .access_token("ghp_example")
    ///     .event_type("push")
    ///     .deployment("gpt-4o")
    ///     .completion_api_key("azure-key")
    ///     .completion_endpoint("https://example.openai.azure.com")
    ///     .build()
    ///     .expect("valid configuration");
    ///
    /// assert_eq!(config.output_path.to_str(), Some("documentation.md"));
    /// ```
    #[must_use]
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::default()
    }

    /// Validates cross-field constraints.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - A pull request event has no pull request number
    /// - A credential or identifier is blank
    /// - Numeric limits are out of range
    pub fn validate(&self) -> Result<()> {
        if self.event == EventKind::PullRequest && self.pull_request_number.is_none() {
            return Err(Error::missing("pull_request_number"));
        }

        for (field, value) in [
            ("access_token", &self.access_token),
            ("deployment", &self.deployment),
            ("completion_api_key", &self.completion_api_key),
            ("completion_endpoint", &self.completion_endpoint),
        ] {
            if value.trim().is_empty() {
                return Err(Error::config(format!("{field} must not be empty")));
            }
        }

        if self.max_output_tokens == 0 {
            return Err(Error::config("max_output_tokens must be greater than 0"));
        }

        if !(0.0..=2.0).contains(&self.temperature) {
            return Err(Error::config(format!(
                "temperature must be between 0 and 2, got {}",
                self.temperature
            )));
        }

        if self.request_timeout.is_zero() {
            return Err(Error::config("request timeout must be greater than 0"));
        }

        if let Some(ref template) = self.prompt_template {
            if !template.is_file() {
                return Err(Error::config(format!(
                    "Prompt template does not exist: {}",
                    template.display()
                )));
            }
        }

        Ok(())
    }
}

/// Builder for creating a [`Config`].
#[derive(Default)]
pub struct ConfigBuilder {
    repository: Option<String>,
    access_token: Option<String>,
    event_type: Option<String>,
    pull_request_number: Option<u64>,
    git_ref: Option<String>,
    deployment: Option<String>,
    completion_api_key: Option<String>,
    completion_endpoint: Option<String>,
    completion_api_version: Option<String>,
    github_api_url: Option<String>,
    output_path: Option<PathBuf>,
    exclude: Vec<String>,
    prompt_template: Option<PathBuf>,
    prompt_token_warning: Option<usize>,
    max_output_tokens: Option<u32>,
    temperature: Option<f32>,
    request_timeout: Option<Duration>,
}

impl ConfigBuilder {
    /// Sets the repository (`owner/name`).
    #[must_use]
    pub fn repository(mut self, repository: impl Into<String>) -> Self {
        self.repository = Some(repository.into());
        self
    }

    /// Sets the GitHub access token.
    #[must_use]
    pub fn access_token(mut self, token: impl Into<String>) -> Self {
        self.access_token = Some(token.into());
        self
    }

    /// Sets the triggering event type (`pull_request` or `push`).
    #[must_use]
    pub fn event_type(mut self, event_type: impl Into<String>) -> Self {
        self.event_type = Some(event_type.into());
        self
    }

    /// Sets the pull request number.
    #[must_use]
    pub const fn pull_request_number(mut self, number: u64) -> Self {
        self.pull_request_number = Some(number);
        self
    }

    /// Sets the pushed ref.
    #[must_use]
    pub fn git_ref(mut self, git_ref: impl Into<String>) -> Self {
        self.git_ref = Some(git_ref.into());
        self
    }

    /// Sets the completion deployment identifier.
    #[must_use]
    pub fn deployment(mut self, deployment: impl Into<String>) -> Self {
        self.deployment = Some(deployment.into());
        self
    }

    /// Sets the completion service credential.
    #[must_use]
    pub fn completion_api_key(mut self, key: impl Into<String>) -> Self {
        self.completion_api_key = Some(key.into());
        self
    }

    /// Sets the completion service endpoint.
    #[must_use]
    pub fn completion_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.completion_endpoint = Some(endpoint.into());
        self
    }

    /// Sets the completion REST API version.
    #[must_use]
    pub fn completion_api_version(mut self, version: impl Into<String>) -> Self {
        self.completion_api_version = Some(version.into());
        self
    }

    /// Sets the GitHub API base URL.
    #[must_use]
    pub fn github_api_url(mut self, url: impl Into<String>) -> Self {
        self.github_api_url = Some(url.into());
        self
    }

    /// Sets the output file path.
    #[must_use]
    pub fn output_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.output_path = Some(path.into());
        self
    }

    /// Adds glob patterns of paths to skip.
    #[must_use]
    pub fn exclude(mut self, patterns: Vec<String>) -> Self {
        self.exclude.extend(patterns);
        self
    }

    /// Sets a custom prompt template file.
    #[must_use]
    pub fn prompt_template(mut self, path: impl Into<PathBuf>) -> Self {
        self.prompt_template = Some(path.into());
        self
    }

    /// Sets the estimated prompt size that triggers a warning.
    #[must_use]
    pub const fn prompt_token_warning(mut self, tokens: usize) -> Self {
        self.prompt_token_warning = Some(tokens);
        self
    }

    /// Sets the maximum tokens generated per file.
    #[must_use]
    pub const fn max_output_tokens(mut self, tokens: u32) -> Self {
        self.max_output_tokens = Some(tokens);
        self
    }

    /// Sets the sampling temperature.
    #[must_use]
    pub const fn temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    /// Sets the HTTP request timeout.
    #[must_use]
    pub const fn request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = Some(timeout);
        self
    }

    /// Builds and validates the configuration.
    ///
    /// # Errors
    ///
    /// Returns [`Error::MissingField`] naming the first required field that
    /// was not set, or any error from [`Config::validate`].
    pub fn build(self) -> Result<Config> {
        let repository = self
            .repository
            .ok_or(Error::missing("repository"))?
            .parse()?;
        let event = self.event_type.ok_or(Error::missing("event_type"))?.parse()?;

        let config = Config {
            repository,
            access_token: self.access_token.ok_or(Error::missing("access_token"))?,
            event,
            pull_request_number: self.pull_request_number,
            git_ref: self.git_ref,
            deployment: self.deployment.ok_or(Error::missing("deployment"))?,
            completion_api_key: self
                .completion_api_key
                .ok_or(Error::missing("completion_api_key"))?,
            completion_endpoint: self
                .completion_endpoint
                .ok_or(Error::missing("completion_endpoint"))?,
            completion_api_version: self
                .completion_api_version
                .unwrap_or_else(|| DEFAULT_API_VERSION.to_string()),
            github_api_url: self
                .github_api_url
                .unwrap_or_else(|| DEFAULT_GITHUB_API_URL.to_string()),
            output_path: self
                .output_path
                .unwrap_or_else(|| PathBuf::from(DEFAULT_OUTPUT_FILE)),
            file_filter_config: FileFilterConfig::new().exclude(self.exclude),
            prompt_template: self.prompt_template,
            prompt_token_warning: self.prompt_token_warning.unwrap_or(DEFAULT_TOKEN_WARNING),
            max_output_tokens: self.max_output_tokens.unwrap_or(DEFAULT_MAX_OUTPUT_TOKENS),
            temperature: self.temperature.unwrap_or(0.0),
            request_timeout: self
                .request_timeout
                .unwrap_or(Duration::from_secs(DEFAULT_TIMEOUT_SECS)),
        };

        config.validate()?;
        Ok(config)
    }
}
