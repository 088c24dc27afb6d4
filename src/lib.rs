//! # repodoc
//!
//! Generates Markdown documentation for a GitHub repository by asking a
//! chat-completion model to summarize every text file.
//!
//! ## Quick Start
//!
//! ```no_run
//! use repodoc::Config;
//!
//! # fn main() -> anyhow::Result<()> {
//! let config = Config::builder()
//!     .repository("octo/demo")
//!     .access_token(std::env::var("GITHUB_TOKEN")?)
//!     .event_type("push")
//!     .git_ref("refs/heads/main")
//!     .deployment("gpt-4o")
//!     .completion_api_key(std::env::var("AZURE_OPENAI_API_KEY")?)
//!     .completion_endpoint("https://example.openai.azure.com")
//!     .build()?;
//!
//! let stats = repodoc::run(&config)?;
//! println!("{}", stats.report);
//! # Ok(())
//! # }
//! ```
//!
//! ## Architecture
//!
//! The library follows a pipeline architecture:
//! 1. **Walker**: breadth-first traversal of the repository tree, filtering
//!    paths and decoding file content
//! 2. **Prompt**: renders the per-file documentation request
//! 3. **Generator**: calls the completion service and validates the response
//! 4. **Writer**: accumulates the generated sections and writes one Markdown file

#![warn(
    missing_docs,
    rust_2018_idioms,
    unreachable_pub,
    clippy::all,
    clippy::pedantic,
    clippy::nursery
)]
#![allow(clippy::module_name_repetitions)]

mod config;
mod error;
mod event;
mod file;
mod filter;
mod pipeline;
mod report;
mod walker;
mod writer;

pub mod completion;
pub mod generator;
pub mod prompt;
pub mod source;

pub use config::{Config, ConfigBuilder};
pub use error::{Error, Result};
pub use event::{EventKind, Trigger};
pub use file::{FileEntry, TextFile};
pub use filter::{DENIED_SUFFIXES, FileFilter, FileFilterConfig, is_denied};
pub use generator::{DocumentationGenerator, GenerationResult};
pub use pipeline::{Pipeline, RunOutcome, RunStats};
pub use prompt::{Prompt, PromptFormatter};
pub use report::UsageReport;
pub use source::{GitHubClient, RepositoryId, SourceHost};
pub use walker::{RepoWalker, WalkState, WalkStats};
pub use writer::DocumentationBuffer;

use tracing::info;

/// Resolves the triggering event, then documents the repository once.
///
/// The event only shapes what gets logged; every event documents the whole
/// repository.
///
/// # Errors
///
/// Returns an error if:
/// - Configuration is invalid
/// - The pull request of a pull request event cannot be looked up
/// - The output file cannot be written
///
/// A source-host failure during traversal is not an error: the run ends
/// early and [`RunStats::outcome`] says so.
pub fn run(config: &Config) -> Result<RunStats> {
    let pipeline = Pipeline::new(config)?;

    let trigger = Trigger::resolve(
        config.event,
        config.pull_request_number,
        config.git_ref.as_deref(),
        pipeline.source(),
    )?;
    info!("Processing files for {} in {}", trigger, config.repository);

    let stats = pipeline.run()?;
    info!("{}", stats.report);

    Ok(stats)
}
