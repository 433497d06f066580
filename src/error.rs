//! Error types for mrs-gen
//!
//! The taxonomy follows the pipeline's containment policy: source-level
//! failures degrade to empty content, task-level failures abort one task,
//! and only bootstrap failures or a run with zero artifacts are fatal.

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for mrs-gen operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for mrs-gen
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration error with context about which setting is invalid
    #[error("configuration error: {message}")]
    Config {
        /// Human-readable error message describing the configuration issue
        message: String,
        /// The configuration key that caused the error (e.g., "base.work_dir")
        key: Option<String>,
    },

    /// Network error (transport failure, timeout, or non-2xx status)
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Merged body for a task was entirely blank
    #[error("merged content for task '{0}' is empty")]
    EmptyContent(String),

    /// Conversion tool binary is not present at its expected location
    #[error("conversion tool not found at {0}")]
    ToolMissing(PathBuf),

    /// External tool execution failed (non-zero exit, spawn failure)
    #[error("external tool error: {0}")]
    ExternalTool(String),

    /// Conversion reported success but produced no usable output
    #[error("conversion output missing or empty: {0}")]
    ConversionOutputMissing(PathBuf),

    /// Serialization error (release API payload)
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// No release asset matched the configured pattern
    #[error("no download URL found for conversion tool")]
    ToolUrlNotFound,

    /// Every task failed; nothing to validate or publish
    #[error("no artifacts were produced by any task")]
    NoArtifacts,

    /// Other error
    #[error("{0}")]
    Other(String),
}

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_includes_task_name_for_empty_content() {
        let err = Error::EmptyContent("adlist".to_string());
        assert_eq!(err.to_string(), "merged content for task 'adlist' is empty");
    }

    #[test]
    fn display_includes_tool_path() {
        let err = Error::ToolMissing(PathBuf::from("/work/mihomo"));
        assert!(err.to_string().contains("/work/mihomo"));
    }

    #[test]
    fn io_error_converts() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "gone");
        let err: Error = io.into();
        assert!(matches!(err, Error::Io(_)));
    }
}
