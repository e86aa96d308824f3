// WHY: Finds buffered response dumps for batch runs
// Glob entries are filtered to regular files lazily so huge trees stream instead of loading up front

use anyhow::{Context, Result};
use futures::stream::{self, Stream, TryStreamExt};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Suffix identifying buffered response dumps from the generation service
pub const RESPONSE_SUFFIX: &str = ".response.json";

/// Glob pattern matching every response dump under `root_dir`
pub fn response_pattern(root_dir: &Path) -> String {
    format!("{}/**/*{}", root_dir.display(), RESPONSE_SUFFIX)
}

/// Stream the paths of regular `*.response.json` files under `root_dir`
///
/// Unreadable directory entries are skipped with a warning, or end the stream
/// with an error when `fail_fast` is set. Directories that happen to carry the
/// suffix are never yielded.
pub fn discover_responses(root_dir: &Path, fail_fast: bool) -> Result<impl Stream<Item = Result<PathBuf>>> {
    let pattern = response_pattern(root_dir);
    debug!("Response discovery pattern: {}", pattern);
    let entries = glob::glob(&pattern).with_context(|| format!("Invalid discovery pattern {pattern}"))?;

    Ok(stream::unfold(Some(entries), move |state| async move {
        let mut entries = state?;
        loop {
            match entries.next()? {
                Ok(path) => match tokio::fs::metadata(&path).await {
                    Ok(meta) if meta.is_file() => return Some((Ok(path), Some(entries))),
                    Ok(_) => debug!("Skipping non-file match {}", path.display()),
                    Err(e) if fail_fast => {
                        let err = anyhow::Error::new(e).context(format!("Cannot access {}", path.display()));
                        return Some((Err(err), None));
                    }
                    Err(e) => warn!("Skipping unreadable {}: {}", path.display(), e),
                },
                Err(e) if fail_fast => {
                    return Some((Err(anyhow::Error::new(e).context("Directory walk failed")), None));
                }
                Err(e) => warn!("Skipping unreadable entry: {}", e),
            }
        }
    }))
}

/// Collect every response dump, sorted so batch runs are reproducible
pub async fn collect_responses(root_dir: &Path, fail_fast: bool) -> Result<Vec<PathBuf>> {
    let mut paths: Vec<PathBuf> = discover_responses(root_dir, fail_fast)?.try_collect().await?;
    paths.sort();
    info!("Discovered {} response files under {}", paths.len(), root_dir.display());
    Ok(paths)
}
