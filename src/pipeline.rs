use crate::{
    completion::AzureOpenAiClient,
    config::Config,
    error::Result,
    file::TextFile,
    filter::FileFilter,
    generator::{DocumentationGenerator, GenerationResult},
    prompt::PromptFormatter,
    report::UsageReport,
    source::{GitHubClient, SourceHost},
    walker::{RepoWalker, WalkState, WalkStats},
    writer::DocumentationBuffer,
};
use std::path::PathBuf;
use std::time::{Duration, Instant};
use tracing::{error, info, instrument, warn};

/// How a run ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunOutcome {
    /// Every reachable file was visited
    Completed,
    /// Traversal stopped early on a source-host failure
    Aborted {
        /// Why traversal stopped
        reason: String,
    },
}

/// Statistics collected during a run.
#[derive(Debug, Clone)]
pub struct RunStats {
    /// Files handed to the generator
    pub files_processed: usize,

    /// Files whose documentation made it into the output
    pub files_documented: usize,

    /// Files dropped because prompting or generation failed
    pub files_failed: usize,

    /// Traversal counters
    pub walk: WalkStats,

    /// Prompt tokens across documented files
    pub prompt_tokens: u64,

    /// Completion tokens across documented files
    pub completion_tokens: u64,

    /// Total tokens across documented files
    pub total_tokens: u64,

    /// How the run ended
    pub outcome: RunOutcome,

    /// Output file
    pub output_path: PathBuf,

    /// Total execution time
    pub duration: Duration,

    /// Local time the run finished
    pub generated_at: String,

    /// Combined usage report
    pub report: String,
}

impl RunStats {
    /// Returns true if traversal finished without a host failure.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.outcome == RunOutcome::Completed
    }

    /// Prints a human-readable summary to stdout.
    pub fn print_summary(&self) {
        println!("\n╔═══════════════════════════════════════════════════════╗");
        println!("║            Documentation Run Summary                  ║");
        println!("╠═══════════════════════════════════════════════════════╣");
        println!(
            "║ Directories listed:   {:>8}                        ║",
            self.walk.directories
        );
        println!(
            "║ Files filtered:       {:>8}                        ║",
            self.walk.filtered
        );
        println!(
            "║ Files skipped:        {:>8}                        ║",
            self.walk.skipped
        );
        println!("║                                                       ║");
        println!(
            "║ Files processed:      {:>8}                        ║",
            self.files_processed
        );
        println!(
            "║   - Documented:       {:>8}                        ║",
            self.files_documented
        );
        println!(
            "║   - Failed:           {:>8}                        ║",
            self.files_failed
        );
        println!("║                                                       ║");
        println!(
            "║ Prompt Tokens:        {:>8}                        ║",
            self.prompt_tokens
        );
        println!(
            "║ Completion Tokens:    {:>8}                        ║",
            self.completion_tokens
        );
        println!(
            "║ Total Tokens:         {:>8}                        ║",
            self.total_tokens
        );
        println!("║                                                       ║");
        match &self.outcome {
            RunOutcome::Completed => {
                println!("║ Outcome:              completed                       ║");
            }
            RunOutcome::Aborted { reason } => {
                println!("║ Outcome:              aborted                         ║");
                println!("║   {reason}");
            }
        }
        println!("║ Output File:                                          ║");
        println!("║   {}", self.output_path.display());
        println!(
            "║ Duration:             {:>8.2}s                     ║",
            self.duration.as_secs_f64()
        );
        println!("║ Finished:             {}           ║", self.generated_at);
        println!("╚═══════════════════════════════════════════════════════╝\n");
    }
}

/// Runs one documentation pass over a repository.
pub struct Pipeline {
    source: Box<dyn SourceHost>,
    filter: FileFilter,
    formatter: PromptFormatter,
    generator: DocumentationGenerator,
    output_path: PathBuf,
}

impl Pipeline {
    /// Creates a pipeline talking to GitHub and Azure OpenAI.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - Configuration validation fails
    /// - An exclude glob or the prompt template is invalid
    /// - An HTTP client cannot be built
    pub fn new(config: &Config) -> Result<Self> {
        config.validate()?;

        let source = GitHubClient::new(
            &config.github_api_url,
            config.repository.clone(),
            &config.access_token,
            config.request_timeout,
        )?;

        let completion = AzureOpenAiClient::new(
            &config.completion_endpoint,
            &config.completion_api_key,
            config.completion_api_version.clone(),
            config.request_timeout,
        )?;

        let formatter = match config.prompt_template {
            Some(ref path) => PromptFormatter::from_file(path)?,
            None => PromptFormatter::new()?,
        }
        .token_warning(config.prompt_token_warning);

        let generator = DocumentationGenerator::new(Box::new(completion), &config.deployment)
            .temperature(config.temperature)
            .max_tokens(config.max_output_tokens);

        Ok(Self {
            source: Box::new(source),
            filter: FileFilter::new(&config.file_filter_config)?,
            formatter,
            generator,
            output_path: config.output_path.clone(),
        })
    }

    /// Assembles a pipeline from already-built parts.
    #[must_use]
    pub fn from_parts(
        source: Box<dyn SourceHost>,
        filter: FileFilter,
        formatter: PromptFormatter,
        generator: DocumentationGenerator,
        output_path: impl Into<PathBuf>,
    ) -> Self {
        Self {
            source,
            filter,
            formatter,
            generator,
            output_path: output_path.into(),
        }
    }

    /// Source host the pipeline reads from.
    #[must_use]
    pub fn source(&self) -> &dyn SourceHost {
        self.source.as_ref()
    }

    /// Walks the repository, documents every text file, and writes the output.
    ///
    /// # Process
    ///
    /// 1. **Walk**: breadth-first over the repository, yielding decodable files
    /// 2. **Prompt**: render the documentation prompt for each file
    /// 3. **Generate**: call the completion service and validate its response
    /// 4. **Write**: replace the output file with the accumulated Markdown
    ///
    /// A failure on one file drops that file and moves on. A source-host
    /// failure ends the walk early; whatever was generated is still written.
    ///
    /// # Errors
    ///
    /// Returns an error only if the output file cannot be written.
    #[instrument(skip(self), fields(output = %self.output_path.display()))]
    pub fn run(&self) -> Result<RunStats> {
        let start_time = Instant::now();
        info!("Generating documentation for repository");

        let mut walker = RepoWalker::new(self.source.as_ref(), self.filter.clone());
        let mut buffer = DocumentationBuffer::new();
        let mut report = UsageReport::new();
        let (mut prompt_tokens, mut completion_tokens, mut total_tokens) = (0, 0, 0);
        let mut files_failed = 0;

        for file in walker.by_ref() {
            info!("Processing file: {}", file.path);
            report.count_processed();

            match self.document(&file) {
                Ok(result) => {
                    info!("Documentation generated for file: {}", file.path);
                    buffer.append(&result.text);
                    report.record(&file.path, &result);
                    prompt_tokens += result.prompt_tokens;
                    completion_tokens += result.completion_tokens;
                    total_tokens += result.total_tokens;
                }
                Err(e) => {
                    error!("Exception for file {}: {}", file.path, e);
                    files_failed += 1;
                }
            }
        }

        let outcome = match walker.state() {
            WalkState::Aborted(e) => {
                warn!("Writing partial documentation after traversal failure");
                RunOutcome::Aborted {
                    reason: e.to_string(),
                }
            }
            WalkState::Pending | WalkState::Completed => RunOutcome::Completed,
        };

        buffer.write_to(&self.output_path)?;

        let duration = start_time.elapsed();
        info!(
            "✓ Documented {} of {} file(s) in {:.2}s",
            buffer.sections(),
            report.files_processed(),
            duration.as_secs_f64()
        );

        Ok(RunStats {
            files_processed: report.files_processed(),
            files_documented: buffer.sections(),
            files_failed,
            walk: walker.stats(),
            prompt_tokens,
            completion_tokens,
            total_tokens,
            outcome,
            output_path: self.output_path.clone(),
            duration,
            generated_at: chrono::Local::now().format("%Y-%m-%d %H:%M:%S").to_string(),
            report: report.render(),
        })
    }

    fn document(&self, file: &TextFile) -> Result<GenerationResult> {
        let prompt = self.formatter.format(&file.path, &file.text)?;
        self.generator.generate(&prompt)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::completion::{
        ChatChoice, ChatChoiceMessage, ChatRequest, ChatResponse, ChatUsage, CompletionService,
    };
    use crate::error::Error;
    use crate::walker::tests::MemoryHost;
    use assert_fs::prelude::*;
    use std::fs;
    use std::io::Write;
    use std::sync::{Arc, Mutex};

    /// Echoes a section naming the file, unless the prompt mentions `fail_on`.
    struct EchoService {
        fail_on: Option<&'static str>,
    }

    impl CompletionService for EchoService {
        fn complete(&self, request: &ChatRequest) -> Result<ChatResponse> {
            let prompt = &request.messages[0].content;
            let path = prompt
                .lines()
                .find_map(|l| l.strip_prefix("**File: "))
                .and_then(|l| l.strip_suffix("**"))
                .unwrap_or("?")
                .to_string();

            let usage = if self.fail_on.is_some_and(|p| p == path) {
                None
            } else {
                Some(ChatUsage {
                    prompt_tokens: Some(10),
                    completion_tokens: Some(5),
                    total_tokens: Some(15),
                })
            };

            Ok(ChatResponse {
                choices: vec![ChatChoice {
                    message: Some(ChatChoiceMessage {
                        content: Some(format!("## {path}\nGenerated docs.")),
                    }),
                    finish_reason: Some("stop".to_string()),
                }],
                usage,
            })
        }
    }

    fn pipeline(host: MemoryHost, service: EchoService, output: &std::path::Path) -> Pipeline {
        Pipeline::from_parts(
            Box::new(host),
            FileFilter::default(),
            PromptFormatter::new().unwrap(),
            DocumentationGenerator::new(Box::new(service), "test-deployment"),
            output,
        )
    }

    fn sample_host() -> MemoryHost {
        MemoryHost::with_files(&[
            ("a.py", b"def main():\n    return 1\n"),
            ("logo.png", b"\x89PNG\r\n\x1a\n"),
            ("b.bin", b"\x00\xff\x00\xfe"),
        ])
    }

    #[test]
    fn test_only_text_files_are_documented() {
        let temp = assert_fs::TempDir::new().unwrap();
        let output = temp.child("documentation.md");

        let stats = pipeline(sample_host(), EchoService { fail_on: None }, output.path())
            .run()
            .unwrap();

        assert_eq!(stats.files_processed, 1);
        assert_eq!(stats.files_documented, 1);
        assert!(stats.is_complete());
        assert!(
            stats
                .report
                .starts_with("Total number of files processed: 1")
        );
        assert!(stats.report.contains("DOCUMENTATION GENERATED FOR FILE: a.py"));
        assert_eq!(stats.total_tokens, 15);

        output.assert("## a.py\nGenerated docs.");
    }

    #[test]
    fn test_generation_failure_skips_file_and_continues() {
        let temp = assert_fs::TempDir::new().unwrap();
        let output = temp.child("documentation.md");
        let host = MemoryHost::with_files(&[
            ("a.py", b"a = 1"),
            ("b.py", b"b = 2"),
            ("c.py", b"c = 3"),
        ]);

        let stats = pipeline(host, EchoService { fail_on: Some("b.py") }, output.path())
            .run()
            .unwrap();

        assert_eq!(stats.files_processed, 3);
        assert_eq!(stats.files_documented, 2);
        assert_eq!(stats.files_failed, 1);
        assert!(!stats.report.contains("b.py"));
        output.assert("## a.py\nGenerated docs.\n\n## c.py\nGenerated docs.");
    }

    #[test]
    fn test_auth_failure_processes_nothing_and_returns_normally() {
        let temp = assert_fs::TempDir::new().unwrap();
        let output = temp.child("documentation.md");
        let host = sample_host().failing_auth();

        let stats = pipeline(host, EchoService { fail_on: None }, output.path())
            .run()
            .unwrap();

        assert_eq!(stats.files_processed, 0);
        assert!(matches!(stats.outcome, RunOutcome::Aborted { .. }));
        assert!(
            stats
                .report
                .starts_with("Total number of files processed: 0")
        );
        output.assert("");
    }

    /// Collects formatted log output in memory.
    #[derive(Clone, Default)]
    struct LogBuffer(Arc<Mutex<Vec<u8>>>);

    impl Write for LogBuffer {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn test_auth_failure_is_logged_at_error_level() {
        let temp = assert_fs::TempDir::new().unwrap();
        let output = temp.child("documentation.md");
        let logs = LogBuffer::default();
        let writer = logs.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_writer(move || writer.clone())
            .with_ansi(false)
            .with_max_level(tracing::Level::TRACE)
            .finish();

        let stats = tracing::subscriber::with_default(subscriber, || {
            pipeline(sample_host().failing_auth(), EchoService { fail_on: None }, output.path())
                .run()
                .unwrap()
        });

        assert_eq!(stats.files_processed, 0);
        let logged = String::from_utf8(logs.0.lock().unwrap().clone()).unwrap();
        assert!(
            logged
                .lines()
                .any(|l| l.contains("ERROR") && l.contains("Repository traversal aborted")),
            "missing error entry in:\n{logged}"
        );
    }

    #[test]
    fn test_partial_output_is_flushed_after_abort() {
        let temp = assert_fs::TempDir::new().unwrap();
        let output = temp.child("documentation.md");
        let host = MemoryHost::with_files(&[("a.py", b"a = 1"), ("src/lib.rs", b"pub fn f() {}")])
            .failing_listing("src");

        let stats = pipeline(host, EchoService { fail_on: None }, output.path())
            .run()
            .unwrap();

        assert_eq!(stats.files_documented, 1);
        assert!(!stats.is_complete());
        output.assert("## a.py\nGenerated docs.");
    }

    #[test]
    fn test_repeated_runs_are_byte_identical() {
        let temp = assert_fs::TempDir::new().unwrap();
        let output = temp.child("documentation.md");
        output.write_str("left over from last week").unwrap();

        let host = || {
            MemoryHost::with_files(&[
                ("a.py", b"a = 1"),
                ("pkg/b.py", b"b = 2"),
                ("pkg/c.py", b"c = 3"),
            ])
        };

        pipeline(host(), EchoService { fail_on: None }, output.path())
            .run()
            .unwrap();
        let first = fs::read(output.path()).unwrap();

        pipeline(host(), EchoService { fail_on: None }, output.path())
            .run()
            .unwrap();
        let second = fs::read(output.path()).unwrap();

        assert_eq!(first, second);
        assert!(!String::from_utf8(first).unwrap().contains("left over"));
    }

    #[test]
    fn test_unwritable_output_is_io_error() {
        let temp = assert_fs::TempDir::new().unwrap();
        let blocker = temp.child("not-a-dir");
        blocker.write_str("file").unwrap();

        let result = pipeline(
            sample_host(),
            EchoService { fail_on: None },
            &blocker.path().join("documentation.md"),
        )
        .run();

        assert!(matches!(result, Err(Error::Io { .. })));
    }
}
