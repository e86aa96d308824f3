// WHY: Concurrent batch parsing of buffered response dumps
// The citation engine itself is synchronous; only file I/O here is async

use anyhow::{Context, Result};
use futures::stream::{self, StreamExt};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{debug, info, warn};

use crate::annotation::GeneratedResponse;
use crate::engine::{CitationEngine, ResolveOptions};
use crate::incremental::{generate_output_path, output_exists};

/// Configuration for a batch run
#[derive(Debug, Clone)]
pub struct BatchConfig {
    /// Abort the run on the first failing file
    pub fail_fast: bool,
    /// Reparse files whose output already exists
    pub overwrite_all: bool,
    /// Maximum files processed concurrently
    pub concurrency: usize,
    pub resolve: ResolveOptions,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            fail_fast: false,
            overwrite_all: false,
            concurrency: num_cpus::get().max(1),
            resolve: ResolveOptions::default(),
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum FileStatus {
    Success,
    Skipped,
    Failed,
}

/// Per-file processing statistics
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct FileStats {
    pub path: String,
    /// Number of annotations supplied by upstream
    pub annotations: u64,
    /// Number of citations in the parsed output
    pub citations: u64,
    pub processing_time_ms: u64,
    pub status: FileStatus,
    /// Error message if processing failed
    pub error: Option<String>,
}

impl FileStats {
    fn empty(path: &Path, status: FileStatus) -> Self {
        Self {
            path: path.display().to_string(),
            annotations: 0,
            citations: 0,
            processing_time_ms: 0,
            status,
            error: None,
        }
    }
}

/// Aggregate statistics for a batch run
#[derive(Serialize, Deserialize, Debug, Clone, Default)]
pub struct RunStats {
    pub files_processed: u64,
    pub files_skipped: u64,
    pub files_failed: u64,
    pub total_citations: u64,
    pub total_time_ms: u64,
    pub files: Vec<FileStats>,
}

impl RunStats {
    fn record(&mut self, stats: FileStats) {
        match stats.status {
            FileStatus::Success => {
                self.files_processed += 1;
                self.total_citations += stats.citations;
            }
            FileStatus::Skipped => self.files_skipped += 1,
            FileStatus::Failed => self.files_failed += 1,
        }
        self.files.push(stats);
    }
}

/// Check whether a response dump needs (re)processing
pub fn should_process_file(path: &Path, config: &BatchConfig) -> bool {
    config.overwrite_all || !output_exists(path)
}

/// Parse one response dump and write its output next to it
pub async fn process_file(path: &Path, engine: &CitationEngine) -> Result<FileStats> {
    let start = Instant::now();

    let raw = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("Failed to read {}", path.display()))?;
    let response: GeneratedResponse = serde_json::from_str(&raw)
        .with_context(|| format!("Malformed response JSON in {}", path.display()))?;

    let parsed = engine
        .parse(&response)
        .with_context(|| format!("Citation validation failed for {}", path.display()))?;

    let output_path = generate_output_path(path);
    let content = serde_json::to_string_pretty(&parsed)?;
    tokio::fs::write(&output_path, content)
        .await
        .with_context(|| format!("Failed to write {}", output_path.display()))?;

    debug!(
        "Parsed {}: {} annotations, {} citations",
        path.display(),
        response.annotations.len(),
        parsed.citations.len()
    );

    Ok(FileStats {
        path: path.display().to_string(),
        annotations: response.annotations.len() as u64,
        citations: parsed.citations.len() as u64,
        processing_time_ms: start.elapsed().as_millis() as u64,
        status: FileStatus::Success,
        error: None,
    })
}

/// Process response dumps concurrently, bounded by `config.concurrency`
pub async fn process_files_parallel(files: &[PathBuf], config: &BatchConfig) -> Result<RunStats> {
    let run_start = Instant::now();
    let engine = CitationEngine::new(config.resolve);
    let mut run_stats = RunStats::default();

    let mut pending = Vec::new();
    for path in files {
        if should_process_file(path, config) {
            pending.push(path.clone());
        } else {
            debug!("Skipping {} (output exists)", path.display());
            run_stats.record(FileStats::empty(path, FileStatus::Skipped));
        }
    }

    info!(
        "Processing {} files ({} skipped) with concurrency {}",
        pending.len(),
        run_stats.files_skipped,
        config.concurrency
    );

    let mut results = stream::iter(pending)
        .map(|path| async move {
            let result = process_file(&path, &engine).await;
            (path, result)
        })
        .buffer_unordered(config.concurrency.max(1));

    while let Some((path, result)) = results.next().await {
        match result {
            Ok(stats) => run_stats.record(stats),
            Err(e) if config.fail_fast => return Err(e),
            Err(e) => {
                warn!("Failed to process {}: {:#}", path.display(), e);
                let mut stats = FileStats::empty(&path, FileStatus::Failed);
                stats.error = Some(format!("{e:#}"));
                run_stats.record(stats);
            }
        }
    }

    run_stats.total_time_ms = run_start.elapsed().as_millis() as u64;
    info!(
        "Batch complete: {} processed, {} skipped, {} failed, {} citations",
        run_stats.files_processed, run_stats.files_skipped, run_stats.files_failed, run_stats.total_citations
    );
    Ok(run_stats)
}

/// Write run statistics as pretty JSON
pub async fn write_stats(stats_path: &Path, stats: &RunStats) -> Result<()> {
    let content = serde_json::to_string_pretty(stats)?;
    tokio::fs::write(stats_path, content)
        .await
        .with_context(|| format!("Failed to write stats to {}", stats_path.display()))?;
    Ok(())
}
