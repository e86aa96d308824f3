use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde::Serialize;
use std::path::{Path, PathBuf};
use tokio::io::AsyncReadExt;
use tracing::info;

use citemark::discovery;
use citemark::parallel_processing::{self, BatchConfig};
use citemark::{
    CitationEngine, FormattedCitation, GeneratedResponse, OffsetDiagnostics, ParsedResponse,
    ResolveOptions,
};

#[derive(Parser, Debug)]
#[command(name = "citemark")]
#[command(about = "Resolve inline citation markers in generated responses into numbered references")]
#[command(version)]
struct Args {
    /// Drop annotations with stale offsets instead of searching for their marker
    #[arg(long, global = true)]
    no_fallback_search: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Parse one response JSON file ("-" for stdin) and print the result
    Parse {
        input: PathBuf,

        /// Include display-ready formatted citations
        #[arg(long)]
        formatted: bool,
    },

    /// Report claimed vs actual marker offsets for one response
    DebugOffsets {
        input: PathBuf,
    },

    /// Parse every *.response.json under a directory
    Batch {
        /// Root directory to scan for *.response.json files
        root_dir: PathBuf,

        /// Reparse even when output already exists
        #[arg(long)]
        overwrite_all: bool,

        /// Abort on first error
        #[arg(long)]
        fail_fast: bool,

        /// Maximum files processed concurrently (defaults to CPU count)
        #[arg(long)]
        concurrency: Option<usize>,

        /// Stats output file path
        #[arg(long, default_value = "run_stats.json")]
        stats_out: PathBuf,
    },
}

#[derive(Serialize)]
struct ParseOutput {
    #[serde(flatten)]
    parsed: ParsedResponse,
    #[serde(skip_serializing_if = "Option::is_none")]
    formatted: Option<Vec<FormattedCitation>>,
}

#[tokio::main]
async fn main() -> Result<()> {
    // WHY: logs go to stderr so stdout carries only JSON results
    tracing_subscriber::fmt()
        .with_target(false)
        .with_writer(std::io::stderr)
        .json()
        .init();

    let args = Args::parse();
    info!(?args, "Parsed CLI arguments");

    let resolve = ResolveOptions {
        fallback_search: !args.no_fallback_search,
    };

    match args.command {
        Command::Parse { input, formatted } => {
            let response = read_response(&input).await?;
            let parsed = CitationEngine::new(resolve)
                .parse(&response)
                .context("Citation validation failed")?;
            let output = ParseOutput {
                formatted: formatted.then(|| parsed.formatted()),
                parsed,
            };
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
        Command::DebugOffsets { input } => {
            let response = read_response(&input).await?;
            let report = OffsetDiagnostics::new(resolve)?.diagnose(&response.text, &response.annotations);
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
        Command::Batch {
            root_dir,
            overwrite_all,
            fail_fast,
            concurrency,
            stats_out,
        } => {
            run_batch(root_dir, overwrite_all, fail_fast, concurrency, resolve, &stats_out).await?;
        }
    }

    Ok(())
}

async fn read_response(input: &Path) -> Result<GeneratedResponse> {
    let raw = if input == Path::new("-") {
        let mut buffer = String::new();
        tokio::io::stdin()
            .read_to_string(&mut buffer)
            .await
            .context("Failed to read response from stdin")?;
        buffer
    } else {
        tokio::fs::read_to_string(input)
            .await
            .with_context(|| format!("Failed to read {}", input.display()))?
    };

    serde_json::from_str(&raw).context("Malformed response JSON")
}

async fn run_batch(
    root_dir: PathBuf,
    overwrite_all: bool,
    fail_fast: bool,
    concurrency: Option<usize>,
    resolve: ResolveOptions,
    stats_out: &Path,
) -> Result<()> {
    // WHY: validate root directory exists early to fail fast with clear error
    if !root_dir.is_dir() {
        anyhow::bail!("Root path is not a directory: {}", root_dir.display());
    }

    info!("Starting file discovery in: {}", root_dir.display());
    let valid_paths = discovery::collect_responses(&root_dir, fail_fast).await?;

    let mut config = BatchConfig {
        fail_fast,
        overwrite_all,
        resolve,
        ..BatchConfig::default()
    };
    if let Some(concurrency) = concurrency {
        config.concurrency = concurrency;
    }

    let stats = parallel_processing::process_files_parallel(&valid_paths, &config).await?;
    parallel_processing::write_stats(stats_out, &stats).await?;

    eprintln!(
        "citemark v{}: {} processed, {} skipped, {} failed, {} citations",
        env!("CARGO_PKG_VERSION"),
        stats.files_processed,
        stats.files_skipped,
        stats.files_failed,
        stats.total_citations
    );

    Ok(())
}
