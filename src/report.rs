use crate::generator::GenerationResult;
use std::fmt::Write;

/// Per-file token usage collected over a run.
///
/// Renders as `Total number of files processed: N \n{...}` with one block of
/// usage lines per documented file between the braces.
#[derive(Debug, Clone, Default)]
pub struct UsageReport {
    files_processed: usize,
    lines: String,
}

impl UsageReport {
    /// Creates an empty report.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Counts a file handed to the generator, whether or not it succeeds.
    pub fn count_processed(&mut self) {
        self.files_processed += 1;
    }

    /// Records usage for a documented file.
    pub fn record(&mut self, path: &str, result: &GenerationResult) {
        // Writing to a String cannot fail.
        let _ = write!(
            self.lines,
            "\nDOCUMENTATION GENERATED FOR FILE: {path}\n\
             Total Tokens: {}\n\
             Prompt Tokens: {}\n\
             Completion Tokens: {}\n",
            result.total_tokens, result.prompt_tokens, result.completion_tokens
        );
    }

    /// Number of files counted as processed.
    #[must_use]
    pub const fn files_processed(&self) -> usize {
        self.files_processed
    }

    /// Renders the combined report string.
    #[must_use]
    pub fn render(&self) -> String {
        format!(
            "Total number of files processed: {} \n{{{}}}",
            self.files_processed, self.lines
        )
    }
}
