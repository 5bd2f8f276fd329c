//! rustpaper - OpenAlex research-paper generator
//!
//! Searches OpenAlex for a topic, keeps the most relevant works and writes
//! them out as a research-paper style document.
//!
//! ## Usage
//!
//! ```bash
//! rustpaper search "graph neural networks" --output paper.md --min-citations 5
//! ```

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use rustpaper::document::OutputFormat;
use rustpaper::openalex::{ClientConfig, OpenAlexClient, SearchQuery, DEFAULT_LIMIT};
use rustpaper::pipeline::{self, PipelineRequest};
use rustpaper::selector::SelectionCriteria;
use rustpaper::PaperError;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::Duration;
use tracing::{error, Level};
use tracing_subscriber::{fmt, EnvFilter};

// ============================================================================
// CLI Definition
// ============================================================================

/// OpenAlex research-paper generator
#[derive(Parser)]
#[command(name = "rustpaper")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Enable debug logging
    #[arg(short, long, global = true)]
    debug: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Search OpenAlex and write the research-paper document
    Search {
        /// Topic keywords
        topic: String,

        /// Output file (default: ./research_paper_<timestamp>.<ext>)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Output format (default: inferred from --output, else text)
        #[arg(long, value_enum)]
        format: Option<FormatArg>,

        /// Number of works requested from OpenAlex (1-200)
        #[arg(long, default_value_t = DEFAULT_LIMIT)]
        limit: usize,

        /// Drop works cited fewer times than this
        #[arg(long, default_value_t = 0)]
        min_citations: u64,

        /// Keep at most this many works in the document
        #[arg(long)]
        max_results: Option<usize>,

        /// Only keep works whose title or abstract contains this text
        #[arg(long)]
        keyword: Option<String>,

        /// Document title (default: the topic)
        #[arg(long)]
        title: Option<String>,

        /// Also export the selected works as CSV
        #[arg(long)]
        records: Option<PathBuf>,

        /// Contact email for the OpenAlex polite pool
        #[arg(long, env = "OPENALEX_EMAIL")]
        mailto: Option<String>,

        /// OpenAlex API root
        #[arg(long, env = "OPENALEX_BASE_URL", default_value = rustpaper::openalex::OPENALEX_API_BASE)]
        base_url: String,

        /// Request timeout in seconds
        #[arg(long, default_value_t = 15)]
        timeout: u64,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum FormatArg {
    Text,
    Markdown,
    Json,
    Docx,
}

impl From<FormatArg> for OutputFormat {
    fn from(arg: FormatArg) -> Self {
        match arg {
            FormatArg::Text => OutputFormat::Text,
            FormatArg::Markdown => OutputFormat::Markdown,
            FormatArg::Json => OutputFormat::Json,
            FormatArg::Docx => OutputFormat::Docx,
        }
    }
}

// ============================================================================
// Main Entry Point
// ============================================================================

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    // Initialize logging
    let log_level = if cli.debug { Level::DEBUG } else { Level::INFO };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(log_level.to_string()));

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(false)
        .init();

    let result = match cli.command {
        Commands::Search {
            topic,
            output,
            format,
            limit,
            min_citations,
            max_results,
            keyword,
            title,
            records,
            mailto,
            base_url,
            timeout,
        } => {
            let config = ClientConfig {
                base_url,
                mailto,
                timeout: Duration::from_secs(timeout),
                ..ClientConfig::default()
            };
            let criteria = SelectionCriteria {
                min_citations,
                max_results,
                keyword,
            };
            run_search(config, &topic, limit, criteria, title, output, format, records).await
        }
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            let kind = e
                .downcast_ref::<PaperError>()
                .map(|p| p.kind().to_string())
                .unwrap_or_else(|| "Error".to_string());
            let message = format!("{:#}", e);
            error!(kind = %kind, error = %message, "Run failed");
            eprintln!("{}: {}", kind, message);
            ExitCode::FAILURE
        }
    }
}

// ============================================================================
// Search Pipeline
// ============================================================================

#[allow(clippy::too_many_arguments)]
async fn run_search(
    config: ClientConfig,
    topic: &str,
    limit: usize,
    criteria: SelectionCriteria,
    title: Option<String>,
    output: Option<PathBuf>,
    format: Option<FormatArg>,
    records_csv: Option<PathBuf>,
) -> Result<()> {
    let query = SearchQuery::new(topic, limit)?;
    let client = OpenAlexClient::new(config)?;

    let format = match (format, &output) {
        (Some(f), _) => OutputFormat::from(f),
        (None, Some(path)) => OutputFormat::from_path(path),
        (None, None) => OutputFormat::Text,
    };
    let output = output.unwrap_or_else(|| pipeline::default_output_path(Path::new("."), format));

    let request = PipelineRequest {
        query,
        criteria,
        title,
        output,
        format,
        records_csv,
    };

    let doc = pipeline::run(&client, &request)
        .await
        .with_context(|| format!("Failed to generate {}", request.output.display()))?;

    println!(
        "✓ Research paper with {} sections saved to {}",
        doc.sections.len(),
        request.output.display()
    );
    Ok(())
}
