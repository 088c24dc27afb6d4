use anyhow::Context;
use clap::Parser;
use repodoc::Config;
use std::path::PathBuf;
use std::time::Duration;
use tracing::{error, info};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

#[derive(Parser, Debug)]
#[command(
    name = "repodoc",
    version,
    author,
    about = "Generate Markdown documentation for a GitHub repository with an LLM",
    long_about = "Generate Markdown documentation for a GitHub repository with an LLM.\n\n\
    Every text file in the repository is sent to an Azure OpenAI chat deployment, \
    and the per-file summaries are concatenated into a single Markdown file. \
    Every option can also be supplied through the environment variable shown \
    next to it, which is how CI workflows usually configure it.\n\n\
    USAGE EXAMPLES:\n  \
      # Document the repository a push landed in\n  \
      repodoc --repository octo/demo --event-type push --git-ref refs/heads/main\n\n  \
      # Document from a pull request, skipping vendored code\n  \
      repodoc --repository octo/demo --event-type pull_request --pr-number 42 \\\n    \
        --exclude 'vendor/**'"
)]
struct Cli {
    /// Repository to document, as owner/name
    #[arg(long, env = "REPODOC_REPOSITORY", value_name = "OWNER/NAME")]
    repository: Option<String>,

    /// GitHub access token with read access to the repository
    #[arg(long, env = "GITHUB_TOKEN", hide_env_values = true)]
    token: Option<String>,

    /// Event that triggered the run (pull_request or push)
    #[arg(long, env = "EVENT_TYPE")]
    event_type: Option<String>,

    /// Pull request number (required for pull_request events)
    #[arg(long, env = "PR_NUMBER")]
    pr_number: Option<u64>,

    /// Pushed ref, e.g. refs/heads/main
    #[arg(long, env = "GITHUB_REF")]
    git_ref: Option<String>,

    /// Azure OpenAI deployment used for generation
    #[arg(long, env = "AZURE_OPENAI_MODEL")]
    deployment: Option<String>,

    /// Azure OpenAI API key
    #[arg(long, env = "AZURE_OPENAI_API_KEY", hide_env_values = true)]
    api_key: Option<String>,

    /// Azure OpenAI resource endpoint, e.g. https://my-resource.openai.azure.com
    #[arg(long, env = "AZURE_OPENAI_ENDPOINT")]
    endpoint: Option<String>,

    /// Azure OpenAI REST API version
    #[arg(long, env = "AZURE_OPENAI_API_VERSION")]
    api_version: Option<String>,

    /// GitHub REST API base URL
    #[arg(long, env = "GITHUB_API_URL")]
    github_api_url: Option<String>,

    /// Output Markdown file (overwritten on every run)
    #[arg(short, long, default_value = "documentation.md", value_name = "FILE")]
    output: PathBuf,

    /// Glob of repository paths to skip (can be used multiple times)
    #[arg(long, value_name = "GLOB")]
    exclude: Vec<String>,

    /// Path to a custom Tera prompt template
    ///
    /// The template receives two variables: `path` and `content`.
    #[arg(long, value_name = "FILE")]
    prompt_template: Option<PathBuf>,

    /// Estimated prompt size (tokens) above which a warning is logged
    #[arg(long, default_value_t = 100_000)]
    prompt_token_warning: usize,

    /// Sampling temperature for generation
    #[arg(long, default_value_t = 0.0)]
    temperature: f32,

    /// Max tokens generated per file
    #[arg(long, default_value_t = 4096)]
    max_output_tokens: u32,

    /// HTTP request timeout in seconds
    #[arg(long, default_value_t = 120)]
    timeout: u64,

    /// Print a run summary when finished
    #[arg(long)]
    summary: bool,

    /// Verbose output
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

impl Cli {
    fn into_config(self) -> repodoc::Result<Config> {
        let mut builder = Config::builder()
            .output_path(self.output)
            .exclude(self.exclude)
            .prompt_token_warning(self.prompt_token_warning)
            .max_output_tokens(self.max_output_tokens)
            .temperature(self.temperature)
            .request_timeout(Duration::from_secs(self.timeout));

        if let Some(repository) = self.repository {
            builder = builder.repository(repository);
        }
        if let Some(token) = self.token {
            builder = builder.access_token(token);
        }
        if let Some(event_type) = self.event_type {
            builder = builder.event_type(event_type);
        }
        if let Some(number) = self.pr_number {
            builder = builder.pull_request_number(number);
        }
        if let Some(git_ref) = self.git_ref {
            builder = builder.git_ref(git_ref);
        }
        if let Some(deployment) = self.deployment {
            builder = builder.deployment(deployment);
        }
        if let Some(api_key) = self.api_key {
            builder = builder.completion_api_key(api_key);
        }
        if let Some(endpoint) = self.endpoint {
            builder = builder.completion_endpoint(endpoint);
        }
        if let Some(version) = self.api_version {
            builder = builder.completion_api_version(version);
        }
        if let Some(url) = self.github_api_url {
            builder = builder.github_api_url(url);
        }
        if let Some(template) = self.prompt_template {
            builder = builder.prompt_template(template);
        }

        builder.build()
    }
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    setup_tracing(cli.verbose)?;

    info!("Generating documentation for GitHub repository");

    let summary = cli.summary;

    // Failures are reported through the log; the process still exits cleanly.
    match cli.into_config().and_then(|config| repodoc::run(&config)) {
        Ok(stats) if summary => stats.print_summary(),
        Ok(_) => {}
        Err(e) => error!("Error: {}", e),
    }

    Ok(())
}

fn setup_tracing(verbosity: u8) -> anyhow::Result<()> {
    let filter = match verbosity {
        0 => EnvFilter::new("repodoc=info"),
        1 => EnvFilter::new("repodoc=debug"),
        _ => EnvFilter::new("repodoc=trace"),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(false).with_thread_ids(false))
        .try_init()
        .context("Failed to install tracing subscriber")?;

    Ok(())
}
