//! # mrs-gen
//!
//! Concurrent ruleset generator: fetches remote rule lists, normalizes and
//! merges each group into a deduplicated staged file, compiles it to a
//! binary `.mrs` ruleset with the mihomo CLI, and validates the results
//! before publishing.
//!
//! ## Pipeline
//!
//! Two concurrency tiers with partial-failure isolation: tasks run in
//! parallel, and each task downloads its sources in parallel. A source that
//! fails after retries degrades to empty content, a task that fails aborts
//! only itself, and the run fails only when nothing was produced at all.
//!
//! ```no_run
//! use mrs_gen::{Config, RulesetGenerator};
//! use std::path::Path;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = Config::load(Path::new("config.toml"))?;
//!     let generator = RulesetGenerator::new(config);
//!     generator.run().await?;
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::unwrap_used)]
#![warn(clippy::expect_used)]

/// Environment bootstrap (directories, converter acquisition)
pub mod bootstrap;
/// Configuration types
pub mod config;
/// Format conversion via the external mihomo binary
pub mod convert;
/// Error types
pub mod error;
/// Source fetching with retry and transforms
pub mod fetch;
/// Run orchestration
pub mod generator;
/// Deterministic merging and atomic staging
pub mod merge;
/// Git publishing
pub mod publish;
/// Retry logic with exponential backoff
pub mod retry;
/// Per-task pipeline
pub mod task;
/// Pure text transforms
pub mod transform;

// Re-export commonly used types
pub use config::{Config, RetryConfig, SourceConfig, TaskConfig};
pub use convert::{CliConverter, RulesetConverter};
pub use error::{Error, Result};
pub use fetch::{FetchResult, Fetcher};
pub use generator::RulesetGenerator;
pub use transform::Transform;
