//! Format converter: compiles staged text bodies into binary rulesets
//!
//! The conversion capability is an external binary (mihomo) invoked as
//! `convert-ruleset <rule_type> <format> <input> <output>`. The trait seam
//! lets tests substitute the tool without a real binary.

use crate::error::{Error, Result};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tokio::process::Command;

/// Conversion capability: compile a staged text file into a binary ruleset
#[async_trait]
pub trait RulesetConverter: Send + Sync {
    /// Convert `input` to `output`; on return, `output` must exist and be
    /// non-empty or an error is raised
    async fn convert(
        &self,
        rule_type: &str,
        format: &str,
        input: &Path,
        output: &Path,
    ) -> Result<()>;
}

/// CLI-based converter invoking the mihomo binary
pub struct CliConverter {
    tool_path: PathBuf,
}

impl CliConverter {
    /// Create a converter with an explicit tool path
    pub fn new(tool_path: PathBuf) -> Self {
        Self { tool_path }
    }

    /// Path to the conversion binary
    pub fn tool_path(&self) -> &Path {
        &self.tool_path
    }
}

#[async_trait]
impl RulesetConverter for CliConverter {
    async fn convert(
        &self,
        rule_type: &str,
        format: &str,
        input: &Path,
        output: &Path,
    ) -> Result<()> {
        if !self.tool_path.exists() {
            return Err(Error::ToolMissing(self.tool_path.clone()));
        }

        tracing::debug!(input = %input.display(), output = %output.display(), "converting ruleset");

        let cmd_output = Command::new(&self.tool_path)
            .arg("convert-ruleset")
            .arg(rule_type)
            .arg(format)
            .arg(input)
            .arg(output)
            .output()
            .await
            .map_err(|e| Error::ExternalTool(format!("failed to execute converter: {e}")))?;

        if !cmd_output.status.success() {
            let stderr = String::from_utf8_lossy(&cmd_output.stderr);
            return Err(Error::ExternalTool(format!(
                "convert-ruleset exited with {}: {}",
                cmd_output.status,
                stderr.trim()
            )));
        }

        // Exit code 0 is not trusted on its own
        validate_output(output).await
    }
}

/// Check that the converter actually produced a non-empty file
async fn validate_output(output: &Path) -> Result<()> {
    match tokio::fs::metadata(output).await {
        Ok(meta) if meta.len() > 0 => Ok(()),
        _ => Err(Error::ConversionOutputMissing(output.to_path_buf())),
    }
}

/// Move a file to its final published location
///
/// Rename is preferred to avoid duplicate large-file I/O; if the destination
/// is on a different filesystem, falls back to copy-and-remove.
pub async fn promote(source: &Path, dest: &Path) -> Result<()> {
    if tokio::fs::rename(source, dest).await.is_ok() {
        return Ok(());
    }
    // Cross-device fallback: rename cannot cross filesystems
    tokio::fs::copy(source, dest).await?;
    tokio::fs::remove_file(source).await?;
    Ok(())
}
