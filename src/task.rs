//! Task runner: fetch → merge → stage → convert for one named ruleset
//!
//! Pipeline per task: all sources are fetched concurrently under a bounded
//! semaphore, merged deterministically, staged atomically, then compiled by
//! the converter and promoted to the output directory. Any hard failure
//! aborts only this task; siblings are unaffected.

use crate::config::TaskConfig;
use crate::convert::{RulesetConverter, promote};
use crate::fetch::{FetchResult, Fetcher};
use crate::merge::{merge_contents, write_atomic};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;

/// Shared dependencies for running tasks
pub struct TaskContext {
    /// Source fetcher (shares one HTTP client across all tasks)
    pub fetcher: Fetcher,
    /// Conversion capability
    pub converter: Arc<dyn RulesetConverter>,
    /// Staging directory
    pub work_dir: PathBuf,
    /// Published artifact directory
    pub output_dir: PathBuf,
    /// Bound on concurrent source downloads within one task
    pub max_concurrent_downloads: usize,
}

/// Run one task end to end
///
/// Returns the published artifact paths (`[text, mrs]`) on success, `None`
/// on any hard failure. Failures are logged here; the caller only needs the
/// success signal.
pub async fn run_task(ctx: Arc<TaskContext>, name: &str, task: &TaskConfig) -> Option<Vec<PathBuf>> {
    tracing::info!(task = name, sources = task.sources.len(), "processing ruleset");

    let results = fetch_all(&ctx, name, task).await;

    let body = match merge_contents(name, results, &task.format) {
        Ok(body) => body,
        Err(e) => {
            tracing::error!(task = name, error = %e, "merge failed");
            return None;
        }
    };

    let staged = ctx.work_dir.join(format!("{name}.{}", task.format));
    if let Err(e) = write_atomic(&staged, &body).await {
        tracing::error!(task = name, error = %e, "failed to stage merged content");
        return None;
    }

    let temp_mrs = ctx.work_dir.join(format!("{name}.mrs"));
    if let Err(e) = ctx
        .converter
        .convert(&task.rule_type, &task.format, &staged, &temp_mrs)
        .await
    {
        tracing::error!(task = name, error = %e, "conversion failed");
        return None;
    }

    let final_text = ctx.output_dir.join(format!("{name}.{}", task.format));
    let final_mrs = ctx.output_dir.join(format!("{name}.mrs"));

    if let Err(e) = promote(&staged, &final_text).await {
        tracing::error!(task = name, error = %e, "failed to publish staged text");
        return None;
    }
    if let Err(e) = promote(&temp_mrs, &final_mrs).await {
        tracing::error!(task = name, error = %e, "failed to publish binary ruleset");
        return None;
    }

    tracing::info!(task = name, "ruleset completed");
    Some(vec![final_text, final_mrs])
}

/// Fetch all of a task's sources concurrently, bounded by the download limit
///
/// A source whose retries are exhausted contributes empty content instead of
/// aborting the task; the merge step decides whether anything usable is left.
async fn fetch_all(ctx: &TaskContext, name: &str, task: &TaskConfig) -> Vec<FetchResult> {
    let semaphore = Arc::new(Semaphore::new(ctx.max_concurrent_downloads.max(1)));
    let mut set = JoinSet::new();

    for (index, source) in task.sources.iter().enumerate() {
        let fetcher = ctx.fetcher.clone();
        let source = source.clone();
        let semaphore = Arc::clone(&semaphore);
        let task_name = name.to_string();

        set.spawn(async move {
            // Closed only on shutdown; treat as an empty result
            let _permit = match semaphore.acquire_owned().await {
                Ok(permit) => permit,
                Err(_) => {
                    return FetchResult {
                        index,
                        content: String::new(),
                    };
                }
            };

            match fetcher.fetch_source(&source, index).await {
                Ok(result) => result,
                Err(e) => {
                    tracing::error!(
                        task = %task_name,
                        index,
                        url = %source.url,
                        error = %e,
                        "source failed after retries, continuing without it"
                    );
                    FetchResult {
                        index,
                        content: String::new(),
                    }
                }
            }
        });
    }

    let mut results = Vec::with_capacity(task.sources.len());
    while let Some(joined) = set.join_next().await {
        match joined {
            Ok(result) => results.push(result),
            Err(e) => tracing::error!(task = name, error = %e, "fetch task panicked"),
        }
    }
    results
}
