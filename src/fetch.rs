//! Source fetcher: one HTTP GET per source with retry and transforms
//!
//! All fetchers share one [`reqwest::Client`] for connection pooling. Each
//! fetch carries the source's position in its task so the merger can order
//! results by declaration instead of completion.

use crate::config::{RetryConfig, SourceConfig};
use crate::error::{Error, Result};
use crate::retry::with_retry;
use crate::transform::{DEFAULT_CHAIN, Transform};
use std::time::Duration;

/// Result of fetching one source
#[derive(Clone, Debug)]
pub struct FetchResult {
    /// Position of the source in its task's source list
    pub index: usize,
    /// Post-transform content, newline-terminated when non-empty
    pub content: String,
}

/// Fetches and transforms remote sources
#[derive(Clone)]
pub struct Fetcher {
    client: reqwest::Client,
    timeout: Duration,
    retry: RetryConfig,
}

impl Fetcher {
    /// Create a fetcher sharing `client` across all source downloads
    pub fn new(client: reqwest::Client, timeout: Duration, retry: RetryConfig) -> Self {
        Self {
            client,
            timeout,
            retry,
        }
    }

    /// Fetch one source and apply its transform chain
    ///
    /// Transport errors and 429/5xx statuses are retried with backoff and
    /// escalate once attempts are exhausted. A body-decode failure after a
    /// successful response degrades to empty content with a warning instead
    /// of failing the task (soft failure).
    pub async fn fetch_source(&self, source: &SourceConfig, index: usize) -> Result<FetchResult> {
        tracing::info!(index, url = %source.url, "downloading source");

        let raw = match with_retry(&self.retry, || self.get_text(&source.url)).await {
            Ok(body) => body,
            Err(Error::Network(e)) if e.is_decode() => {
                tracing::warn!(index, url = %source.url, error = %e,
                    "failed to decode response body, degrading source to empty content");
                return Ok(FetchResult {
                    index,
                    content: String::new(),
                });
            }
            Err(e) => return Err(e),
        };

        let mut content = self.apply_transforms(source, raw);

        if !content.is_empty() && !content.ends_with('\n') {
            content.push('\n');
        }

        let size = content.len();
        tracing::debug!(index, url = %source.url, bytes = size, "post-transform content size");
        if size == 0 {
            tracing::warn!(index, url = %source.url, "source produced empty content");
        }

        Ok(FetchResult { index, content })
    }

    async fn get_text(&self, url: &str) -> Result<String> {
        let response = self
            .client
            .get(url)
            .timeout(self.timeout)
            .send()
            .await?
            .error_for_status()?;

        Ok(response.text().await?)
    }

    fn apply_transforms(&self, source: &SourceConfig, raw: String) -> String {
        let chain: Vec<&str> = match &source.transforms {
            Some(names) => names.iter().map(String::as_str).collect(),
            None => DEFAULT_CHAIN.to_vec(),
        };

        let mut content = raw;
        for name in chain {
            match Transform::from_name(name) {
                Some(transform) => content = transform.apply(&content),
                None => {
                    tracing::warn!(transform = name, url = %source.url, "unknown transform, skipping");
                }
            }
        }
        content
    }
}

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn fast_retry(max_attempts: u32) -> RetryConfig {
        RetryConfig {
            max_attempts,
            initial_delay: Duration::from_millis(10),
            max_delay: Duration::from_millis(100),
            backoff_multiplier: 2.0,
            jitter: false,
        }
    }

    fn fetcher(max_attempts: u32) -> Fetcher {
        Fetcher::new(
            reqwest::Client::new(),
            Duration::from_secs(5),
            fast_retry(max_attempts),
        )
    }

    fn source(url: String, transforms: Option<Vec<&str>>) -> SourceConfig {
        SourceConfig {
            url,
            transforms: transforms.map(|t| t.into_iter().map(String::from).collect()),
        }
    }

    #[tokio::test]
    async fn fetch_applies_default_chain_and_trailing_newline() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/list.txt"))
            .respond_with(ResponseTemplate::new(200).set_body_string("a.com\n# comment\n\nb.com"))
            .mount(&server)
            .await;

        let result = fetcher(0)
            .fetch_source(&source(format!("{}/list.txt", server.uri()), None), 0)
            .await
            .unwrap();

        assert_eq!(result.index, 0);
        assert_eq!(result.content, "a.com\nb.com\n");
    }

    #[tokio::test]
    async fn fetch_applies_declared_chain_in_order() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/list.txt"))
            .respond_with(ResponseTemplate::new(200).set_body_string("# c\nexample.com\n"))
            .mount(&server)
            .await;

        let src = source(
            format!("{}/list.txt", server.uri()),
            Some(vec!["remove_comments_and_empty", "format_pihole"]),
        );
        let result = fetcher(0).fetch_source(&src, 3).await.unwrap();

        assert_eq!(result.index, 3);
        assert_eq!(result.content, "  - '+.example.com'\n");
    }

    #[tokio::test]
    async fn unknown_transform_leaves_content_unchanged() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/list.txt"))
            .respond_with(ResponseTemplate::new(200).set_body_string("a.com\n"))
            .mount(&server)
            .await;

        let src = source(format!("{}/list.txt", server.uri()), Some(vec!["no_such_step"]));
        let result = fetcher(0).fetch_source(&src, 0).await.unwrap();

        assert_eq!(result.content, "a.com\n");
    }

    #[tokio::test]
    async fn server_error_is_retried_until_success() {
        let server = MockServer::start().await;
        // First two attempts fail with 500, third succeeds
        Mock::given(method("GET"))
            .and(path("/flaky.txt"))
            .respond_with(ResponseTemplate::new(500))
            .up_to_n_times(2)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/flaky.txt"))
            .respond_with(ResponseTemplate::new(200).set_body_string("a\n#c\nb\n"))
            .mount(&server)
            .await;

        let result = fetcher(3)
            .fetch_source(&source(format!("{}/flaky.txt", server.uri()), None), 1)
            .await
            .unwrap();

        assert_eq!(result.content, "a\nb\n");
    }

    #[tokio::test]
    async fn persistent_server_error_escalates_after_retries() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/down.txt"))
            .respond_with(ResponseTemplate::new(503))
            .expect(3) // initial try + 2 retries
            .mount(&server)
            .await;

        let err = fetcher(2)
            .fetch_source(&source(format!("{}/down.txt", server.uri()), None), 0)
            .await
            .unwrap_err();

        assert!(matches!(err, Error::Network(_)));
    }

    #[tokio::test]
    async fn client_error_is_not_retried() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/missing.txt"))
            .respond_with(ResponseTemplate::new(404))
            .expect(1)
            .mount(&server)
            .await;

        let err = fetcher(3)
            .fetch_source(&source(format!("{}/missing.txt", server.uri()), None), 0)
            .await
            .unwrap_err();

        assert!(matches!(err, Error::Network(_)));
    }

    #[tokio::test]
    async fn empty_body_yields_empty_content_without_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/empty.txt"))
            .respond_with(ResponseTemplate::new(200).set_body_string("# only comments\n"))
            .mount(&server)
            .await;

        let result = fetcher(0)
            .fetch_source(&source(format!("{}/empty.txt", server.uri()), None), 0)
            .await
            .unwrap();

        assert_eq!(result.content, "");
    }
}
