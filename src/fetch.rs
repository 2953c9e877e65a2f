//! HTTP fetching with bounded retries and exponential backoff
//!
//! [`retry_with_backoff`] is the generic retry loop; [`FetchClient`] applies it
//! to HTTP GET requests. A request succeeds only on status 200 with a fully
//! read body, so callers never see partial content.
//!
//! # Example
//!
//! ```no_run
//! use wallpaper_dl::config::FetchConfig;
//! use wallpaper_dl::fetch::FetchClient;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let client = FetchClient::new(FetchConfig::default())?;
//! let response = client.fetch_with_retry("https://example.com/wall.jpg").await?;
//! println!("{} bytes", response.body.len());
//! # Ok(())
//! # }
//! ```

use crate::config::FetchConfig;
use crate::error::{Error, FetchError, Result};
use async_trait::async_trait;
use bytes::Bytes;
use rand::Rng;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use std::future::Future;
use std::time::Duration;

/// Trait for errors that can be classified as retryable or not
pub trait IsRetryable {
    /// Returns true if another attempt might succeed
    fn is_retryable(&self) -> bool;
}

impl IsRetryable for FetchError {
    fn is_retryable(&self) -> bool {
        // Non-200 statuses and transport failures are all worth another try;
        // a request that cannot be built never will be.
        !matches!(self, FetchError::InvalidRequest { .. })
    }
}

/// Delay to wait after failed attempt `attempt` (1-based) before the next one
pub fn backoff_delay(config: &FetchConfig, attempt: u32) -> Duration {
    let exponent = i32::try_from(attempt.saturating_sub(1)).unwrap_or(i32::MAX);
    let secs = config.base_delay.as_secs_f64() * config.backoff_multiplier.powi(exponent);
    Duration::try_from_secs_f64(secs)
        .unwrap_or(config.max_delay)
        .min(config.max_delay)
}

/// Execute an async operation with exponential backoff retry logic
///
/// `operation` receives the 1-based attempt number. At most
/// `config.max_attempts` attempts are made (at least one); there is no wait
/// after the final attempt. Returns the first success, the first
/// non-retryable error, or the last error once attempts are exhausted.
pub async fn retry_with_backoff<F, Fut, T, E>(
    config: &FetchConfig,
    mut operation: F,
) -> std::result::Result<T, E>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = std::result::Result<T, E>>,
    E: IsRetryable + std::fmt::Display,
{
    let max_attempts = config.max_attempts.max(1);
    let mut attempt = 1;

    loop {
        match operation(attempt).await {
            Ok(result) => {
                if attempt > 1 {
                    tracing::info!(attempts = attempt, "Operation succeeded after retry");
                }
                return Ok(result);
            }
            Err(e) if e.is_retryable() && attempt < max_attempts => {
                let delay = backoff_delay(config, attempt);
                let delay = if config.jitter { add_jitter(delay) } else { delay };

                tracing::warn!(
                    error = %e,
                    attempt,
                    max_attempts,
                    delay_ms = delay.as_millis() as u64,
                    "Attempt failed, retrying"
                );

                tokio::time::sleep(delay).await;
                attempt += 1;
            }
            Err(e) => {
                if e.is_retryable() {
                    tracing::error!(
                        error = %e,
                        attempts = attempt,
                        "Operation failed after all retry attempts exhausted"
                    );
                } else {
                    tracing::error!(error = %e, "Operation failed with non-retryable error");
                }
                return Err(e);
            }
        }
    }
}

/// Add random jitter between 0% and 100% of the delay
fn add_jitter(delay: Duration) -> Duration {
    let mut rng = rand::thread_rng();
    let jitter_factor: f64 = rng.gen_range(0.0..=1.0);
    Duration::from_secs_f64(delay.as_secs_f64() * (1.0 + jitter_factor))
}

/// A successful (HTTP 200) response with its complete body
#[derive(Clone, Debug)]
pub struct FetchedResponse {
    /// Requested URL
    pub url: String,
    /// Content-Type header, if present
    pub content_type: Option<String>,
    /// Complete response body
    pub body: Bytes,
}

/// Capability to fetch a URL's content, retries included
///
/// [`FetchClient`] is the production implementation; the orchestrator only
/// depends on this trait.
#[async_trait]
pub trait Fetcher: Send + Sync {
    /// Fetch `url`, returning the full body or a definitive error
    async fn fetch(&self, url: &str) -> std::result::Result<FetchedResponse, FetchError>;
}

/// HTTP client applying timeout, default headers and the retry policy
#[derive(Clone, Debug)]
pub struct FetchClient {
    client: reqwest::Client,
    config: FetchConfig,
}

impl FetchClient {
    /// Build a client from fetch settings
    ///
    /// Fails with a configuration error when a header name or value is invalid.
    pub fn new(config: FetchConfig) -> Result<Self> {
        let mut headers = HeaderMap::new();
        for (name, value) in &config.headers {
            let name = HeaderName::from_bytes(name.as_bytes()).map_err(|e| {
                Error::config("fetch.headers", format!("invalid header name '{}': {}", name, e))
            })?;
            let value = HeaderValue::from_str(value).map_err(|e| {
                Error::config(
                    "fetch.headers",
                    format!("invalid value for header '{}': {}", name, e),
                )
            })?;
            headers.insert(name, value);
        }

        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .user_agent(config.user_agent.clone())
            .default_headers(headers)
            .build()
            .map_err(|e| Error::config("fetch", format!("failed to create HTTP client: {}", e)))?;

        Ok(Self { client, config })
    }

    /// Settings this client was built with
    pub fn config(&self) -> &FetchConfig {
        &self.config
    }

    /// Perform a single GET attempt
    pub async fn fetch_once(&self, url: &str) -> std::result::Result<FetchedResponse, FetchError> {
        let parsed = url::Url::parse(url).map_err(|e| FetchError::InvalidRequest {
            url: url.to_string(),
            message: e.to_string(),
        })?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(FetchError::InvalidRequest {
                url: url.to_string(),
                message: format!("unsupported scheme '{}'", parsed.scheme()),
            });
        }

        let response = self
            .client
            .get(parsed)
            .send()
            .await
            .map_err(|e| FetchError::from_send(url, e))?;

        let status = response.status();
        if status != reqwest::StatusCode::OK {
            return Err(FetchError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);

        let body = response
            .bytes()
            .await
            .map_err(|e| FetchError::from_body(url, e))?;

        Ok(FetchedResponse {
            url: url.to_string(),
            content_type,
            body,
        })
    }

    /// GET `url`, retrying non-200 statuses and transport failures with backoff
    pub async fn fetch_with_retry(
        &self,
        url: &str,
    ) -> std::result::Result<FetchedResponse, FetchError> {
        retry_with_backoff(&self.config, |attempt| {
            tracing::trace!(url, attempt, max_attempts = self.config.max_attempts, "Fetching");
            self.fetch_once(url)
        })
        .await
    }
}

#[async_trait]
impl Fetcher for FetchClient {
    async fn fetch(&self, url: &str) -> std::result::Result<FetchedResponse, FetchError> {
        self.fetch_with_retry(url).await
    }
}

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicU32, Ordering};
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[derive(Debug)]
    enum TestError {
        Transient,
        Permanent,
    }

    impl std::fmt::Display for TestError {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            match self {
                TestError::Transient => write!(f, "transient error"),
                TestError::Permanent => write!(f, "permanent error"),
            }
        }
    }

    impl IsRetryable for TestError {
        fn is_retryable(&self) -> bool {
            matches!(self, TestError::Transient)
        }
    }

    fn fast_config(max_attempts: u32) -> FetchConfig {
        FetchConfig {
            max_attempts,
            base_delay: Duration::from_millis(10),
            timeout: Duration::from_secs(5),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn first_success_makes_one_attempt() {
        let counter = Arc::new(AtomicU32::new(0));
        let counter_clone = counter.clone();

        let result = retry_with_backoff(&fast_config(3), |_| {
            let counter = counter_clone.clone();
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
                Ok::<_, TestError>(42)
            }
        })
        .await;

        assert_eq!(result.unwrap(), 42);
        assert_eq!(counter.load(Ordering::SeqCst), 1, "should only call once");
    }

    #[tokio::test]
    async fn fails_twice_then_succeeds_in_three_attempts() {
        let counter = Arc::new(AtomicU32::new(0));
        let counter_clone = counter.clone();

        let result = retry_with_backoff(&fast_config(3), |attempt| {
            let counter = counter_clone.clone();
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
                if attempt < 3 {
                    Err(TestError::Transient)
                } else {
                    Ok(attempt)
                }
            }
        })
        .await;

        assert_eq!(result.unwrap(), 3);
        assert_eq!(counter.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn attempts_include_the_first() {
        let counter = Arc::new(AtomicU32::new(0));
        let counter_clone = counter.clone();

        let result = retry_with_backoff(&fast_config(2), |_| {
            let counter = counter_clone.clone();
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
                Err::<i32, _>(TestError::Transient)
            }
        })
        .await;

        assert!(result.is_err());
        assert_eq!(
            counter.load(Ordering::SeqCst),
            2,
            "max_attempts=2 means two attempts in total"
        );
    }

    #[tokio::test]
    async fn non_retryable_error_stops_immediately() {
        let counter = Arc::new(AtomicU32::new(0));
        let counter_clone = counter.clone();

        let result = retry_with_backoff(&fast_config(5), |_| {
            let counter = counter_clone.clone();
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
                Err::<i32, _>(TestError::Permanent)
            }
        })
        .await;

        assert!(result.is_err());
        assert_eq!(counter.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn backoff_has_no_trailing_wait() {
        let config = FetchConfig {
            max_attempts: 3,
            base_delay: Duration::from_millis(40),
            ..Default::default()
        };

        let start = std::time::Instant::now();
        let _ = retry_with_backoff(&config, |_| async { Err::<i32, _>(TestError::Transient) })
            .await;
        let elapsed = start.elapsed();

        // 40ms + 80ms between three attempts; no 160ms wait after the last one
        assert!(
            elapsed >= Duration::from_millis(120),
            "should wait at least 120ms, waited {:?}",
            elapsed
        );
        assert!(
            elapsed < Duration::from_millis(280),
            "should not wait after the final attempt, waited {:?}",
            elapsed
        );
    }

    #[test]
    fn backoff_delay_doubles_and_caps() {
        let config = FetchConfig {
            base_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(5),
            ..Default::default()
        };
        assert_eq!(backoff_delay(&config, 1), Duration::from_secs(1));
        assert_eq!(backoff_delay(&config, 2), Duration::from_secs(2));
        assert_eq!(backoff_delay(&config, 3), Duration::from_secs(4));
        assert_eq!(backoff_delay(&config, 4), Duration::from_secs(5));
        assert_eq!(backoff_delay(&config, u32::MAX), Duration::from_secs(5));
    }

    #[test]
    fn jitter_stays_within_double() {
        let delay = Duration::from_millis(100);
        let jittered = add_jitter(delay);
        assert!(jittered >= delay);
        assert!(jittered <= delay * 2);
    }

    #[tokio::test]
    async fn client_retries_until_200() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/wall.jpg"))
            .respond_with(ResponseTemplate::new(500))
            .up_to_n_times(2)
            .expect(2)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/wall.jpg"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(b"image-bytes".to_vec()))
            .expect(1)
            .mount(&server)
            .await;

        let client = FetchClient::new(fast_config(3)).unwrap();
        let response = client
            .fetch_with_retry(&format!("{}/wall.jpg", server.uri()))
            .await
            .unwrap();

        assert_eq!(response.body.as_ref(), b"image-bytes");
        assert_eq!(server.received_requests().await.unwrap().len(), 3);
    }

    #[tokio::test]
    async fn client_gives_up_with_last_status() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(503))
            .expect(2)
            .mount(&server)
            .await;

        let client = FetchClient::new(fast_config(2)).unwrap();
        let err = client
            .fetch_with_retry(&format!("{}/gone.jpg", server.uri()))
            .await
            .unwrap_err();

        assert_eq!(err.status(), Some(503));
        assert!(matches!(err, FetchError::Status { .. }));
    }

    #[tokio::test]
    async fn client_treats_other_success_codes_as_failure() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(204))
            .expect(1)
            .mount(&server)
            .await;

        let client = FetchClient::new(fast_config(1)).unwrap();
        let err = client
            .fetch_with_retry(&format!("{}/empty", server.uri()))
            .await
            .unwrap_err();
        assert_eq!(err.status(), Some(204));
    }

    #[tokio::test]
    async fn client_times_out() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_millis(500)))
            .mount(&server)
            .await;

        let config = FetchConfig {
            timeout: Duration::from_millis(50),
            ..fast_config(1)
        };
        let client = FetchClient::new(config).unwrap();
        let err = client
            .fetch_with_retry(&format!("{}/slow.jpg", server.uri()))
            .await
            .unwrap_err();
        assert!(matches!(err, FetchError::Timeout { .. }), "got {err:?}");
    }

    #[tokio::test]
    async fn invalid_urls_fail_without_retry() {
        let client = FetchClient::new(fast_config(5)).unwrap();

        let start = std::time::Instant::now();
        let err = client.fetch_with_retry("not a url").await.unwrap_err();
        assert!(matches!(err, FetchError::InvalidRequest { .. }));

        let err = client.fetch_with_retry("ftp://example.com/a.jpg").await.unwrap_err();
        assert!(matches!(err, FetchError::InvalidRequest { .. }));
        assert!(start.elapsed() < Duration::from_millis(100));
    }

    #[tokio::test]
    async fn client_sends_configured_headers() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(header("user-agent", "wallpaper-dl-test"))
            .and(header("accept-language", "en-US,en;q=0.5"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(b"ok".to_vec()))
            .expect(1)
            .mount(&server)
            .await;

        let config = FetchConfig {
            user_agent: "wallpaper-dl-test".to_string(),
            ..fast_config(1)
        };
        let client = FetchClient::new(config).unwrap();
        client
            .fetch_with_retry(&format!("{}/h.jpg", server.uri()))
            .await
            .unwrap();
    }

    #[test]
    fn invalid_header_is_config_error() {
        let mut config = FetchConfig::default();
        config
            .headers
            .insert("bad header".to_string(), "x".to_string());
        let err = FetchClient::new(config).unwrap_err();
        assert!(matches!(err, Error::Config { .. }));
    }

    #[tokio::test]
    async fn connection_refused_is_retryable() {
        // Bind then drop a listener to get a port with nothing behind it
        let port = {
            let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
            listener.local_addr().unwrap().port()
        };
        let client = FetchClient::new(fast_config(2)).unwrap();
        let err = client
            .fetch_with_retry(&format!("http://127.0.0.1:{}/a.jpg", port))
            .await
            .unwrap_err();
        assert!(err.is_retryable(), "got {err:?}");
        assert_eq!(err.status(), None);
    }
}
