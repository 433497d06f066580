//! Run orchestrator: bootstrap, concurrent tasks, validation, publish gate
//!
//! Tasks run independently under a bounded semaphore; one task failing never
//! cancels its siblings. The run is publishable only if at least one artifact
//! survives a defensive re-validation at the end.

use crate::config::Config;
use crate::convert::{CliConverter, RulesetConverter};
use crate::error::{Error, Result};
use crate::fetch::Fetcher;
use crate::task::{TaskContext, run_task};
use crate::{bootstrap, publish};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;

/// Ruleset generator: owns the configuration and shared HTTP client
pub struct RulesetGenerator {
    config: Config,
    client: reqwest::Client,
}

impl RulesetGenerator {
    /// Create a generator from validated configuration
    pub fn new(config: Config) -> Self {
        Self {
            config,
            client: reqwest::Client::new(),
        }
    }

    /// Run the full pipeline: bootstrap, all tasks, validation, publish
    ///
    /// Per-task failures are contained; the run itself fails only when the
    /// environment cannot be bootstrapped or no task produced artifacts.
    pub async fn run(&self) -> Result<()> {
        self.init_env().await?;

        let artifacts = self.run_tasks().await;

        let validated = self.validate_artifacts(&artifacts).await?;
        tracing::info!(count = validated, "all generated files validated");

        if let Err(e) = publish::commit_changes(
            &self.config.git,
            &self.config.base.repo_dir,
            &self.config.base.output_dir,
        )
        .await
        {
            tracing::error!(error = %e, "publish step failed");
        }

        tracing::info!("run complete");
        Ok(())
    }

    /// Bootstrap directories and the conversion tool
    async fn init_env(&self) -> Result<()> {
        tracing::info!(
            work_dir = %self.config.base.work_dir.display(),
            output_dir = %self.config.base.output_dir.display(),
            "initializing environment"
        );

        bootstrap::ensure_dirs(&self.config.base.work_dir, &self.config.base.output_dir).await?;
        bootstrap::ensure_tool(
            &self.client,
            &self.config.converter,
            &self.config.tool_path(),
            self.config.base.request_timeout(),
        )
        .await
    }

    /// Run all tasks concurrently, bounded by `max_concurrent_tasks`
    async fn run_tasks(&self) -> Vec<PathBuf> {
        let converter: Arc<dyn RulesetConverter> =
            Arc::new(CliConverter::new(self.config.tool_path()));
        let ctx = Arc::new(TaskContext {
            fetcher: Fetcher::new(
                self.client.clone(),
                self.config.base.request_timeout(),
                self.config.retry_policy(),
            ),
            converter,
            work_dir: self.config.base.work_dir.clone(),
            output_dir: self.config.base.output_dir.clone(),
            max_concurrent_downloads: self.config.base.max_concurrent_downloads,
        });

        let semaphore = Arc::new(Semaphore::new(self.config.base.max_concurrent_tasks.max(1)));
        let mut set = JoinSet::new();

        for (name, task) in &self.config.tasks {
            let ctx = Arc::clone(&ctx);
            let semaphore = Arc::clone(&semaphore);
            let name = name.clone();
            let task = task.clone();

            set.spawn(async move {
                let _permit = match semaphore.acquire_owned().await {
                    Ok(permit) => permit,
                    Err(_) => return (name, None),
                };
                let artifacts = run_task(ctx, &name, &task).await;
                (name, artifacts)
            });
        }

        let mut all_artifacts = Vec::new();
        while let Some(joined) = set.join_next().await {
            match joined {
                Ok((name, Some(artifacts))) => {
                    tracing::debug!(task = %name, count = artifacts.len(), "task produced artifacts");
                    all_artifacts.extend(artifacts);
                }
                Ok((name, None)) => {
                    tracing::warn!(task = %name, "task failed to generate files");
                }
                Err(e) => {
                    tracing::error!(error = %e, "task panicked");
                }
            }
        }
        all_artifacts
    }

    /// Re-check every artifact on disk; the converter validated its own
    /// output, this guards against external interference afterwards. The run
    /// is publishable as long as at least one artifact is still intact.
    async fn validate_artifacts(&self, artifacts: &[PathBuf]) -> Result<usize> {
        let mut valid = 0;
        for path in artifacts {
            match tokio::fs::metadata(path).await {
                Ok(meta) if meta.len() > 0 => {
                    tracing::info!(path = %path.display(), bytes = meta.len(), "artifact validated");
                    valid += 1;
                }
                _ => {
                    tracing::error!(path = %path.display(), "artifact missing or empty");
                }
            }
        }

        if valid == 0 {
            Err(Error::NoArtifacts)
        } else {
            Ok(valid)
        }
    }
}

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{BaseConfig, ConverterConfig, GitConfig};
    use std::collections::BTreeMap;

    fn config(dir: &std::path::Path) -> Config {
        Config {
            base: BaseConfig {
                work_dir: dir.join("work"),
                repo_dir: dir.join("repo"),
                output_dir: dir.join("out"),
                max_concurrent_downloads: 4,
                max_concurrent_tasks: 2,
                max_retries: 0,
                request_timeout_secs: 5,
            },
            converter: ConverterConfig {
                api_url: "http://127.0.0.1:1/releases".to_string(),
                binary_pattern: "mihomo".to_string(),
                file_extension: ".gz".to_string(),
            },
            git: GitConfig {
                user_email: "bot@example.com".to_string(),
                user_name: "bot".to_string(),
                branch: "main".to_string(),
            },
            retry: None,
            tasks: BTreeMap::new(),
        }
    }

    #[tokio::test]
    async fn empty_artifact_list_is_a_fatal_error() {
        let dir = tempfile::tempdir().unwrap();
        let generator = RulesetGenerator::new(config(dir.path()));
        let err = generator.validate_artifacts(&[]).await.unwrap_err();
        assert!(matches!(err, Error::NoArtifacts));
    }

    #[tokio::test]
    async fn one_intact_artifact_keeps_the_run_publishable() {
        let dir = tempfile::tempdir().unwrap();
        let generator = RulesetGenerator::new(config(dir.path()));

        let present = dir.path().join("adlist.mrs");
        std::fs::write(&present, b"data").unwrap();
        let missing = dir.path().join("gone.mrs");

        let valid = generator
            .validate_artifacts(&[present, missing])
            .await
            .unwrap();
        assert_eq!(valid, 1);
    }

    #[tokio::test]
    async fn empty_artifact_file_fails_validation() {
        let dir = tempfile::tempdir().unwrap();
        let generator = RulesetGenerator::new(config(dir.path()));

        let empty = dir.path().join("adlist.mrs");
        std::fs::write(&empty, b"").unwrap();

        let err = generator.validate_artifacts(&[empty]).await.unwrap_err();
        assert!(matches!(err, Error::NoArtifacts));
    }

    #[tokio::test]
    async fn valid_artifacts_pass_validation() {
        let dir = tempfile::tempdir().unwrap();
        let generator = RulesetGenerator::new(config(dir.path()));

        let a = dir.path().join("adlist.yaml");
        let b = dir.path().join("adlist.mrs");
        std::fs::write(&a, b"payload:").unwrap();
        std::fs::write(&b, b"\x00\x01").unwrap();

        assert_eq!(generator.validate_artifacts(&[a, b]).await.unwrap(), 2);
    }
}
