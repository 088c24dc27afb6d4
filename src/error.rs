use std::path::PathBuf;
use thiserror::Error;

/// Result type alias using the library's Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for repodoc.
#[derive(Error, Debug, Clone)]
#[non_exhaustive]
pub enum Error {
    /// IO error with context about the file path.
    #[error("IO error accessing '{path}': {message}")]
    Io {
        /// Path where the error occurred
        path: PathBuf,
        /// Error message
        message: String,
    },

    /// Configuration validation error.
    #[error("Invalid configuration: {message}")]
    Config {
        /// Detailed error message
        message: String,
    },

    /// A required configuration field was not provided.
    #[error("Missing required configuration field '{field}'")]
    MissingField {
        /// Name of the missing field
        field: &'static str,
    },

    /// Repository identifier is not of the form `owner/name`.
    #[error("Invalid repository identifier '{value}': expected 'owner/name'")]
    InvalidRepository {
        /// The rejected identifier
        value: String,
    },

    /// The remote service rejected our credentials.
    #[error("Authentication failed: {message}")]
    Auth {
        /// Error message
        message: String,
    },

    /// The request never produced an HTTP response (DNS, TLS, timeout, ...).
    #[error("Transport error: {message}")]
    Transport {
        /// Error message
        message: String,
    },

    /// The remote service answered with a non-success status.
    #[error("API error ({status}): {message}")]
    Api {
        /// HTTP status code
        status: u16,
        /// Response body or reason
        message: String,
    },

    /// File content could not be decoded as text.
    #[error("Failed to decode '{path}': {reason}")]
    Decode {
        /// Repository path of the file
        path: String,
        /// Why decoding failed
        reason: String,
    },

    /// The completion service returned something other than a usable completion.
    #[error("Generation failed: {message}")]
    Generation {
        /// Diagnostic message
        message: String,
    },

    /// Template parsing or rendering error.
    #[error("Failed to render template '{template}': {message}")]
    Template {
        /// Template name
        template: String,
        /// Error message
        message: String,
    },

    /// JSON serialization error.
    #[error("Serialization error: {message}")]
    Serialization {
        /// Error message
        message: String,
    },
}

impl Error {
    /// Creates an IO error with path context.
    #[must_use]
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            message: source.to_string(),
        }
    }

    /// Creates a configuration error.
    #[must_use]
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Creates a missing-field error.
    #[must_use]
    pub const fn missing(field: &'static str) -> Self {
        Self::MissingField { field }
    }

    /// Creates a template error.
    #[must_use]
    pub fn template(template: impl Into<String>, source: &tera::Error) -> Self {
        // tera keeps the useful part of the message in the source chain
        let mut message = source.to_string();
        let mut cause = std::error::Error::source(source);
        while let Some(inner) = cause {
            message.push_str(": ");
            message.push_str(&inner.to_string());
            cause = std::error::Error::source(inner);
        }

        Self::Template {
            template: template.into(),
            message,
        }
    }

    /// Creates a decode error for a repository path.
    #[must_use]
    pub fn decode(path: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Decode {
            path: path.into(),
            reason: reason.into(),
        }
    }

    /// Creates a generation error.
    #[must_use]
    pub fn generation(message: impl Into<String>) -> Self {
        Self::Generation {
            message: message.into(),
        }
    }

    /// Returns true if this is an authentication error.
    #[must_use]
    pub const fn is_auth(&self) -> bool {
        matches!(self, Self::Auth { .. })
    }

    /// Returns true if this is a configuration error of any kind.
    #[must_use]
    pub const fn is_config(&self) -> bool {
        matches!(
            self,
            Self::Config { .. } | Self::MissingField { .. } | Self::InvalidRepository { .. }
        )
    }

    /// Returns true if this error only concerns a single file.
    ///
    /// The walker skips such files; every other error aborts traversal.
    #[must_use]
    pub const fn is_per_file(&self) -> bool {
        matches!(self, Self::Decode { .. } | Self::Api { .. })
    }
}

impl From<reqwest::Error> for Error {
    fn from(e: reqwest::Error) -> Self {
        match e.status() {
            Some(status) => Self::Api {
                status: status.as_u16(),
                message: e.to_string(),
            },
            None => Self::Transport {
                message: e.to_string(),
            },
        }
    }
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Self::Serialization {
            message: e.to_string(),
        }
    }
}
