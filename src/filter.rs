//! Path filtering.
//!
//! Decides which repository paths are worth fetching at all. Runs before any
//! content request, so excluded files cost no network round-trip.

use crate::error::{Error, Result};
use globset::{Glob, GlobSet, GlobSetBuilder};

/// Suffixes that are never documented: images, icons, web fonts, environment
/// and ignore files, and Markdown.
pub const DENIED_SUFFIXES: &[&str] = &[
    ".png", ".jpg", ".jpeg", ".gif", ".ico", ".bmp", ".jfif", ".woff", ".woff2", ".env", ".venv",
    ".gitignore", ".md",
];

/// Returns true if the path ends with a denied suffix, ignoring case.
#[must_use]
pub fn is_denied(path: &str) -> bool {
    let lower = path.to_lowercase();
    DENIED_SUFFIXES.iter().any(|suffix| lower.ends_with(suffix))
}

/// Configuration for path filtering with glob patterns.
///
/// The suffix denylist always applies; the globs add to it.
#[derive(Debug, Clone, Default)]
pub struct FileFilterConfig {
    exclude: Vec<String>,
}

impl FileFilterConfig {
    /// Creates an empty configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds glob patterns of paths to skip.
    #[must_use]
    pub fn exclude(mut self, patterns: Vec<String>) -> Self {
        self.exclude.extend(patterns);
        self
    }

    /// Glob patterns of paths to skip.
    #[must_use]
    pub fn patterns(&self) -> &[String] {
        &self.exclude
    }
}

/// Compiled path filter.
#[derive(Debug, Clone)]
pub struct FileFilter {
    exclude: GlobSet,
}

impl FileFilter {
    /// Compiles the configured globs.
    ///
    /// # Errors
    ///
    /// Returns a configuration error if a pattern is not a valid glob.
    pub fn new(config: &FileFilterConfig) -> Result<Self> {
        Ok(Self {
            exclude: Self::build_globset(&config.exclude)?,
        })
    }

    fn build_globset(patterns: &[String]) -> Result<GlobSet> {
        let mut builder = GlobSetBuilder::new();

        for pattern in patterns {
            let glob = Glob::new(pattern)
                .map_err(|e| Error::config(format!("Invalid glob pattern '{pattern}': {e}")))?;
            builder.add(glob);
        }

        builder
            .build()
            .map_err(|e| Error::config(format!("Failed to build glob set: {e}")))
    }

    /// Returns true if the file at `path` should be fetched and documented.
    #[must_use]
    pub fn should_process(&self, path: &str) -> bool {
        !is_denied(path) && !self.exclude.is_match(path)
    }
}

impl Default for FileFilter {
    fn default() -> Self {
        Self {
            exclude: GlobSet::empty(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_denylist_is_case_insensitive() {
        for path in [
            "logo.png",
            "assets/Logo.PNG",
            "photo.JPeG",
            "favicon.ico",
            "fonts/inter.woff2",
            ".env",
            "config/.ENV",
            ".gitignore",
            "README.md",
            "docs/CHANGELOG.MD",
        ] {
            assert!(is_denied(path), "{path} should be denied");
        }
    }

    #[test]
    fn test_denylist_matches_suffix_only() {
        for path in ["a.py", "src/png.rs", "markdown.rs", "env.sh", "image.pngx", "md"] {
            assert!(!is_denied(path), "{path} should be allowed");
        }
    }

    #[test]
    fn test_default_filter_applies_denylist() {
        let filter = FileFilter::default();
        assert!(filter.should_process("src/lib.rs"));
        assert!(!filter.should_process("README.md"));
    }

    #[test]
    fn test_exclude_globs() {
        let config = FileFilterConfig::new().exclude(vec![
            "vendor/**".to_string(),
            "**/*.lock".to_string(),
        ]);
        let filter = FileFilter::new(&config).unwrap();

        assert!(!filter.should_process("vendor/lib/a.js"));
        assert!(!filter.should_process("Cargo.lock"));
        assert!(!filter.should_process("web/yarn.lock"));
        assert!(filter.should_process("src/vendor.rs"));
    }

    #[test]
    fn test_invalid_glob_is_config_error() {
        let config = FileFilterConfig::new().exclude(vec!["src/[".to_string()]);
        let err = FileFilter::new(&config).unwrap_err();
        assert!(err.is_config());
    }
}
