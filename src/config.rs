//! Configuration types for mrs-gen
//!
//! Loaded once at startup from a TOML file and treated as read-only for the
//! rest of the run. Relative directories are resolved against the config
//! file's parent directory so the binary can run from anywhere.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Base pipeline settings (directories, concurrency, retries, timeouts)
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct BaseConfig {
    /// Working directory for staging files and the conversion tool
    pub work_dir: PathBuf,

    /// Git repository root used by the publish step
    pub repo_dir: PathBuf,

    /// Directory where published artifacts land
    pub output_dir: PathBuf,

    /// Maximum concurrent source downloads within one task (default: 10)
    #[serde(default = "default_max_concurrent_downloads")]
    pub max_concurrent_downloads: usize,

    /// Maximum concurrently running tasks (default: 3)
    #[serde(default = "default_max_concurrent_tasks")]
    pub max_concurrent_tasks: usize,

    /// Maximum retry attempts per source download (default: 3)
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    /// HTTP request timeout in seconds (default: 30)
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

impl BaseConfig {
    /// HTTP request timeout as a [`Duration`]
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

/// Conversion tool acquisition settings (GitHub releases lookup)
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ConverterConfig {
    /// Releases API endpoint listing downloadable tool builds
    pub api_url: String,

    /// Substring an asset name must contain (platform/arch selector)
    pub binary_pattern: String,

    /// Extension an asset name must end with (e.g., ".gz")
    pub file_extension: String,
}

/// Git identity and branch used by the publish step
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct GitConfig {
    /// Committer email set with `git config --local`
    pub user_email: String,

    /// Committer name set with `git config --local`
    pub user_name: String,

    /// Branch pulled before staging changes
    pub branch: String,
}

/// One remote source contributing lines to a task
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SourceConfig {
    /// URL fetched with a plain GET
    pub url: String,

    /// Named transforms applied in order; `None` means the default chain
    #[serde(default)]
    pub transforms: Option<Vec<String>>,
}

/// One named ruleset composed from remote sources
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TaskConfig {
    /// Rule type passed to `convert-ruleset` (e.g., "domain", "ipcidr")
    #[serde(rename = "type")]
    pub rule_type: String,

    /// Textual output format (e.g., "yaml", "text")
    pub format: String,

    /// Sources merged into this ruleset, in declared order
    pub sources: Vec<SourceConfig>,
}

/// Retry configuration for transient failures
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Maximum number of retry attempts after the first try (default: 3)
    #[serde(default = "default_max_retries")]
    pub max_attempts: u32,

    /// Initial delay before the first retry (default: 1 second)
    #[serde(default = "default_initial_delay", with = "duration_serde")]
    pub initial_delay: Duration,

    /// Maximum delay between retries (default: 10 seconds)
    #[serde(default = "default_max_delay", with = "duration_serde")]
    pub max_delay: Duration,

    /// Multiplier for exponential backoff (default: 2.0)
    #[serde(default = "default_backoff_multiplier")]
    pub backoff_multiplier: f64,

    /// Add random jitter to delays (default: true)
    #[serde(default = "default_true")]
    pub jitter: bool,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_retries(),
            initial_delay: default_initial_delay(),
            max_delay: default_max_delay(),
            backoff_multiplier: default_backoff_multiplier(),
            jitter: true,
        }
    }
}

/// Main configuration for the ruleset generator
///
/// `tasks` is a [`BTreeMap`] so iteration order (and therefore log output)
/// is stable across runs.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Config {
    /// Base pipeline settings
    pub base: BaseConfig,

    /// Conversion tool acquisition settings
    pub converter: ConverterConfig,

    /// Publish settings
    pub git: GitConfig,

    /// Retry policy override for source downloads; when the `[retry]` table
    /// is absent, `max_attempts` follows `base.max_retries`
    #[serde(default)]
    pub retry: Option<RetryConfig>,

    /// Task table, keyed by unique task name
    #[serde(default)]
    pub tasks: BTreeMap<String, TaskConfig>,
}

impl Config {
    /// Load configuration from a TOML file
    ///
    /// Relative `work_dir`, `repo_dir` and `output_dir` are resolved against
    /// the config file's parent directory. Missing files and parse failures
    /// map to [`Error::Config`].
    pub fn load(path: &Path) -> Result<Config> {
        let raw = std::fs::read_to_string(path).map_err(|e| Error::Config {
            message: format!("cannot read config file {}: {}", path.display(), e),
            key: None,
        })?;

        let mut config: Config = toml::from_str(&raw).map_err(|e| Error::Config {
            message: format!("invalid config file {}: {}", path.display(), e),
            key: None,
        })?;

        if config.tasks.is_empty() {
            return Err(Error::Config {
                message: "task table is empty".to_string(),
                key: Some("tasks".to_string()),
            });
        }

        let base_dir = path.parent().unwrap_or_else(|| Path::new("."));
        config.base.work_dir = resolve(base_dir, &config.base.work_dir);
        config.base.repo_dir = resolve(base_dir, &config.base.repo_dir);
        config.base.output_dir = resolve(base_dir, &config.base.output_dir);

        Ok(config)
    }

    /// Expected location of the conversion tool binary
    pub fn tool_path(&self) -> PathBuf {
        self.base.work_dir.join("mihomo")
    }

    /// Effective retry policy for source downloads
    ///
    /// An explicit `[retry]` table wins; otherwise the default policy with
    /// `max_attempts` taken from `base.max_retries`, so `max_retries = 0`
    /// disables retries without further configuration.
    pub fn retry_policy(&self) -> RetryConfig {
        match &self.retry {
            Some(retry) => retry.clone(),
            None => RetryConfig {
                max_attempts: self.base.max_retries,
                ..RetryConfig::default()
            },
        }
    }
}

fn resolve(base: &Path, path: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        base.join(path)
    }
}

fn default_max_concurrent_downloads() -> usize {
    10
}

fn default_max_concurrent_tasks() -> usize {
    3
}

fn default_max_retries() -> u32 {
    3
}

fn default_request_timeout_secs() -> u64 {
    30
}

fn default_initial_delay() -> Duration {
    Duration::from_secs(1)
}

fn default_max_delay() -> Duration {
    Duration::from_secs(10)
}

fn default_backoff_multiplier() -> f64 {
    2.0
}

fn default_true() -> bool {
    true
}

/// Serialize Duration as seconds for human-editable config files
mod duration_serde {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_u64(duration.as_secs())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let secs = u64::deserialize(deserializer)?;
        Ok(Duration::from_secs(secs))
    }
}
