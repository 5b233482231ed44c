//! # HTTP Retrieval Utilities
//!
//! This module provides an asynchronous API client wrapper around `reqwest`.
//! It keeps a cookie store (the exchange hands out session cookies on first
//! contact), applies an optional exponential-backoff retry policy for transient
//! transport errors, and returns bodies as text so callers decide how to parse.

use super::{Fetch, FetchError};
use async_trait::async_trait;
use reqwest::{header::HeaderMap, Method, Url};
use reqwest_middleware::{ClientBuilder, ClientWithMiddleware};
use reqwest_retry::{policies::ExponentialBackoff, RetryTransientMiddleware};
use std::time::Duration;

/// A standardized container for API responses.
///
/// This struct wraps the response body along with metadata about the
/// HTTP transaction, such as status codes and headers.
#[derive(Debug)]
pub struct ApiResponse<T> {
    /// The response body on success.
    pub data: Option<T>,
    /// The raw error body returned by the server if the request failed.
    pub error_body: Option<String>,
    /// The numeric HTTP status code.
    pub status: u16,
    /// Indicates if the status code was in the 2xx range.
    pub success: bool,
    /// The headers returned by the server.
    pub headers: HeaderMap,
}

/// Transport tuning for [`ApiClient`].
#[derive(Debug, Clone)]
pub struct ClientOptions {
    /// Whole-request timeout.
    pub timeout: Duration,
    /// Transient-failure retries performed by the middleware. `0` disables retrying.
    pub max_retries: u32,
    /// Keep cookies between requests.
    pub cookie_store: bool,
}

impl Default for ClientOptions {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(30),
            max_retries: 0,
            cookie_store: true,
        }
    }
}

/// A flexible asynchronous HTTP client.
///
/// Built on top of `reqwest_middleware`, it handles base URLs, cookies
/// and the retry middleware.
pub struct ApiClient {
    /// The underlying middleware-enabled client.
    inner: ClientWithMiddleware,
    /// The base URL to which relative paths are joined. Absolute paths replace it.
    base_url: Url,
}

impl ApiClient {
    /// Creates a new `ApiClient` instance.
    ///
    /// # Arguments
    /// * `base_url` - The absolute base URL (e.g., "https://www.nseindia.com/").
    /// * `options` - Timeout, retry and cookie settings.
    ///
    /// # Errors
    /// Fails if `base_url` is not absolute or the TLS backend cannot be initialised.
    pub fn new(base_url: &str, options: ClientOptions) -> anyhow::Result<Self> {
        let url = Url::parse(base_url)?;

        let http = reqwest::Client::builder()
            .cookie_store(options.cookie_store)
            .timeout(options.timeout)
            .build()?;

        let retry_policy = ExponentialBackoff::builder().build_with_max_retries(options.max_retries);

        let client = ClientBuilder::new(http)
            .with(RetryTransientMiddleware::new_with_policy(retry_policy))
            .build();

        Ok(Self {
            inner: client,
            base_url: url,
        })
    }

    /// Resolves `path` against the base URL.
    pub fn resolve(&self, path: &str) -> Result<Url, FetchError> {
        self.base_url.join(path).map_err(|e| FetchError::InvalidUrl {
            url: path.to_string(),
            reason: e.to_string(),
        })
    }

    /// Performs a request and returns the body as text.
    ///
    /// Non-2xx statuses are not errors at this level: they come back with
    /// `success == false` and the body in `error_body`.
    ///
    /// # Arguments
    /// * `method` - The HTTP verb.
    /// * `path` - Relative path or absolute URL.
    /// * `headers` - Optional headers for this specific request.
    pub async fn request_text(
        &self,
        method: Method,
        path: &str,
        headers: Option<HeaderMap>,
    ) -> Result<ApiResponse<String>, FetchError> {
        // 1. Construct the full absolute URL
        let full_url = self.resolve(path)?;
        let url_text = full_url.to_string();
        let mut req = self.inner.request(method, full_url);

        // 2. Add custom headers if provided
        if let Some(h) = headers {
            req = req.headers(h);
        }

        // 3. Execute the request and capture response metadata
        let response = req.send().await.map_err(|e| FetchError::Transport {
            url: url_text.clone(),
            reason: e.to_string(),
        })?;
        let status = response.status();
        let resp_headers = response.headers().clone();
        let success = status.is_success();

        // 4. Read the body; on failure keep it for diagnostics
        let body = response.text().await.map_err(|e| FetchError::Transport {
            url: url_text,
            reason: e.to_string(),
        })?;

        if success {
            Ok(ApiResponse {
                data: Some(body),
                error_body: None,
                status: status.as_u16(),
                success: true,
                headers: resp_headers,
            })
        } else {
            Ok(ApiResponse {
                data: None,
                error_body: Some(body),
                status: status.as_u16(),
                success: false,
                headers: resp_headers,
            })
        }
    }
}

#[async_trait]
impl Fetch for ApiClient {
    async fn fetch_text(&self, url: &str, headers: &HeaderMap) -> Result<String, FetchError> {
        let response = self.request_text(Method::GET, url, Some(headers.clone())).await?;
        match response.data {
            Some(body) if response.success => Ok(body),
            _ => Err(FetchError::Status {
                url: url.to_string(),
                status: response.status,
                body: response.error_body,
            }),
        }
    }
}
