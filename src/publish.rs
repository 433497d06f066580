//! Publish step: commit generated artifacts to the git tree
//!
//! Invoked only when the run produced at least one validated artifact.
//! Publish problems are logged but never change the run's exit status; the
//! artifacts on disk are already correct at this point.

use crate::config::GitConfig;
use crate::error::{Error, Result};
use std::path::Path;
use tokio::process::Command;

/// Commit everything under `output_dir` to the repository at `repo_dir`
///
/// Sets the local committer identity, pulls the configured branch, stages
/// the output directory and commits with a timestamped message. A commit
/// that fails because there is nothing to commit is informational.
pub async fn commit_changes(config: &GitConfig, repo_dir: &Path, output_dir: &Path) -> Result<()> {
    if which::which("git").is_err() {
        return Err(Error::ExternalTool("git not found in PATH".to_string()));
    }

    run_git(repo_dir, &["config", "--local", "user.email", &config.user_email]).await?;
    run_git(repo_dir, &["config", "--local", "user.name", &config.user_name]).await?;
    run_git(repo_dir, &["pull", "origin", &config.branch]).await?;

    let pathspec = format!("{}/*", output_dir.display());
    run_git(repo_dir, &["add", &pathspec]).await?;

    let timestamp = chrono::Local::now().format("%Y-%m-%d %H:%M:%S");
    let message = format!("{timestamp} update mrs rulesets");

    let output = Command::new("git")
        .args(["commit", "-m", &message])
        .current_dir(repo_dir)
        .output()
        .await
        .map_err(|e| Error::ExternalTool(format!("failed to run git commit: {e}")))?;

    if output.status.success() {
        tracing::info!("changes committed");
    } else {
        let stdout = String::from_utf8_lossy(&output.stdout);
        if stdout.contains("nothing to commit") {
            tracing::info!("nothing to commit");
        } else {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(Error::ExternalTool(format!(
                "git commit failed: {}",
                stderr.trim()
            )));
        }
    }

    Ok(())
}

async fn run_git(repo_dir: &Path, args: &[&str]) -> Result<()> {
    let output = Command::new("git")
        .args(args)
        .current_dir(repo_dir)
        .output()
        .await
        .map_err(|e| Error::ExternalTool(format!("failed to run git {}: {e}", args.join(" "))))?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(Error::ExternalTool(format!(
            "git {} failed: {}",
            args.join(" "),
            stderr.trim()
        )));
    }

    tracing::debug!(command = %args.join(" "), "git command succeeded");
    Ok(())
}
