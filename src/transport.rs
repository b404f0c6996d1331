//! HTTP transport with exponential backoff retry logic.
//!
//! Every network call in the pipeline goes through [`Transport`], so stages can
//! be exercised against an in-memory transport in tests.
//!
//! # Architecture
//!
//! - [`Transport`]: one bounded GET, redirect-following optional
//! - [`HttpTransport`]: pooled `reqwest` clients with browser-like headers
//! - [`RetryTransport`]: decorator adding retries to any `Transport`
//!
//! # Retry Strategy
//!
//! Only transient failures are retried (timeouts, connection errors, 5xx, 429):
//!
//! ```text
//! delay = min(base_delay * 2^(attempt-1), max_delay) + random_jitter(0..250ms)
//! ```

use crate::error::FetchError;
use rand::{Rng, rng};
use reqwest::header::{self, HeaderMap, HeaderValue};
use reqwest::{Client, redirect};
use std::fmt;
use std::time::{Duration, Instant};
use tokio::time::sleep;
use tracing::{debug, instrument, warn};

const BROWSER_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0.0.0 Safari/537.36";
const BROWSER_ACCEPT: &str =
    "text/html,application/xhtml+xml,application/xml;q=0.9,application/rss+xml;q=0.9,*/*;q=0.8";
const BROWSER_ACCEPT_LANGUAGE: &str = "en-US,en;q=0.9";

/// Per-request knobs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RequestOptions {
    pub timeout: Duration,
    pub follow_redirects: bool,
}

impl RequestOptions {
    pub fn follow(timeout: Duration) -> Self {
        Self {
            timeout,
            follow_redirects: true,
        }
    }

    pub fn manual(timeout: Duration) -> Self {
        Self {
            timeout,
            follow_redirects: false,
        }
    }
}

/// What came back from a GET, whatever the status.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct HttpResponse {
    pub status: u16,
    /// URL after any followed redirects.
    pub final_url: String,
    /// Raw `Location` header, present on unfollowed redirects.
    pub location: Option<String>,
    /// Decoded body; empty for 3xx responses.
    pub body: String,
}

impl HttpResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    pub fn is_redirect(&self) -> bool {
        (300..400).contains(&self.status)
    }
}

/// A bounded HTTP GET.
///
/// Implementations must honour `options.timeout` and report every failure as a
/// [`FetchError`]; non-2xx statuses are returned as responses, not errors.
pub trait Transport {
    async fn get(&self, url: &str, options: RequestOptions) -> Result<HttpResponse, FetchError>;
}

/// `reqwest`-backed transport shared read-only by all concurrent tasks.
///
/// Holds two pooled clients: one following up to `max_redirects` hops, one
/// with redirects disabled for probing `Location` headers. Bodies are read up
/// to `max_body_bytes` and the rest is dropped.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    following: Client,
    manual: Client,
    max_body_bytes: usize,
}

impl HttpTransport {
    pub fn new(max_redirects: usize, max_body_bytes: usize) -> Result<Self, FetchError> {
        let following = Self::builder()
            .redirect(redirect::Policy::limited(max_redirects))
            .build()
            .map_err(|e| FetchError::Client(e.to_string()))?;
        let manual = Self::builder()
            .redirect(redirect::Policy::none())
            .build()
            .map_err(|e| FetchError::Client(e.to_string()))?;
        Ok(Self {
            following,
            manual,
            max_body_bytes,
        })
    }

    fn builder() -> reqwest::ClientBuilder {
        let mut headers = HeaderMap::new();
        headers.insert(header::ACCEPT, HeaderValue::from_static(BROWSER_ACCEPT));
        headers.insert(
            header::ACCEPT_LANGUAGE,
            HeaderValue::from_static(BROWSER_ACCEPT_LANGUAGE),
        );
        Client::builder()
            .user_agent(BROWSER_USER_AGENT)
            .default_headers(headers)
            .gzip(true)
            .deflate(true)
            .brotli(true)
            .connect_timeout(Duration::from_secs(5))
            .pool_max_idle_per_host(8)
    }
}

impl Transport for HttpTransport {
    #[instrument(level = "debug", skip_all, fields(%url, follow = options.follow_redirects))]
    async fn get(&self, url: &str, options: RequestOptions) -> Result<HttpResponse, FetchError> {
        let client = if options.follow_redirects {
            &self.following
        } else {
            &self.manual
        };

        let t0 = Instant::now();
        let response = client
            .get(url)
            .timeout(options.timeout)
            .send()
            .await
            .map_err(|e| FetchError::from_reqwest(url, &e))?;

        let status = response.status();
        let final_url = response.url().to_string();
        let location = response
            .headers()
            .get(header::LOCATION)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);

        let body = if status.is_redirection() {
            String::new()
        } else {
            read_capped(response, self.max_body_bytes)
                .await
                .map_err(|e| FetchError::from_reqwest(url, &e))?
        };

        debug!(
            status = status.as_u16(),
            bytes = body.len(),
            elapsed_ms = t0.elapsed().as_millis() as u64,
            "HTTP GET finished"
        );

        Ok(HttpResponse {
            status: status.as_u16(),
            final_url,
            location,
            body,
        })
    }
}

/// Stream the body as lossy UTF-8, stopping once `limit` bytes are held.
async fn read_capped(mut response: reqwest::Response, limit: usize) -> Result<String, reqwest::Error> {
    let mut bytes = Vec::new();
    while let Some(chunk) = response.chunk().await? {
        if !push_capped(&mut bytes, &chunk, limit) {
            debug!(limit, "Body exceeds size limit; truncated");
            break;
        }
    }
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}

/// Append as much of `chunk` as fits under `limit`; false when some was cut.
fn push_capped(buf: &mut Vec<u8>, chunk: &[u8], limit: usize) -> bool {
    let room = limit.saturating_sub(buf.len());
    let take = chunk.len().min(room);
    buf.extend_from_slice(&chunk[..take]);
    take == chunk.len()
}

/// Wrapper that adds exponential backoff retry logic to any [`Transport`].
pub struct RetryTransport<T> {
    inner: T,
    max_retries: usize,
    base_delay: Duration,
    max_delay: Duration,
}

impl<T> RetryTransport<T> {
    /// Wrap `inner`, retrying transient failures up to `max_retries` times.
    pub fn new(inner: T, max_retries: usize, base_delay: Duration) -> Self {
        Self {
            inner,
            max_retries,
            base_delay,
            max_delay: Duration::from_secs(10),
        }
    }

    fn delay_for(&self, attempt: usize) -> Duration {
        let shift = attempt.saturating_sub(1).min(16) as u32;
        let delay = self.base_delay.saturating_mul(1 << shift).min(self.max_delay);
        let jitter_ms: u64 = rng().random_range(0..=250);
        delay + Duration::from_millis(jitter_ms)
    }
}

impl<T> fmt::Debug for RetryTransport<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RetryTransport")
            .field("max_retries", &self.max_retries)
            .field("base_delay", &self.base_delay)
            .field("max_delay", &self.max_delay)
            .finish()
    }
}

impl<T: Transport> Transport for RetryTransport<T> {
    async fn get(&self, url: &str, options: RequestOptions) -> Result<HttpResponse, FetchError> {
        let mut attempt = 0usize;
        loop {
            let (error, response) = match self.inner.get(url, options).await {
                Ok(response) if response.status >= 500 || response.status == 429 => (
                    FetchError::Status {
                        url: url.to_string(),
                        status: response.status,
                    },
                    Some(response),
                ),
                Ok(response) => return Ok(response),
                Err(e) => (e, None),
            };

            attempt += 1;
            if attempt > self.max_retries || !error.is_transient() {
                // Exhausted: hand back the last server answer if there was one.
                return match response {
                    Some(response) => Ok(response),
                    None => Err(error),
                };
            }

            let delay = self.delay_for(attempt);
            warn!(%url, attempt, max = self.max_retries, ?delay, error = %error, "GET failed; backing off");
            sleep(delay).await;
        }
    }
}
