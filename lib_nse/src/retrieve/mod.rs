//! # Data Retrieval Module
//!
//! Generic HTTP retrieval for the market clients. Everything above this layer
//! talks to upstream through the [`Fetch`] trait, so the NSE client can be driven
//! by the reqwest-backed [`ky_http::ApiClient`] in production and by canned pages
//! in tests.
//!
//! ## Contained Modules:
//!
//! - **`ky_http`**: A generic HTTP `ApiClient` built on `reqwest` and
//!   `reqwest-middleware`, with a cookie store and an optional transport-level
//!   retry policy.

#![forbid(unsafe_code)]
#![warn(missing_docs, rust_2018_idioms, unused_qualifications)]

use async_trait::async_trait;
use reqwest::header::HeaderMap;
use thiserror::Error;

/// Generic HTTP API client with retry middleware for resilient network requests.
pub mod ky_http;

/// Transport-level failures. These are never retried above the transport.
#[derive(Debug, Error)]
pub enum FetchError {
    /// The URL could not be built or joined.
    #[error("invalid url {url}: {reason}")]
    InvalidUrl {
        /// The offending URL or path.
        url: String,
        /// Parser message.
        reason: String,
    },

    /// Connection, TLS, body decoding or middleware failure.
    #[error("transport failure for {url}: {reason}")]
    Transport {
        /// The requested URL.
        url: String,
        /// Underlying error rendered as text.
        reason: String,
    },

    /// Upstream answered with a non-2xx status.
    #[error("HTTP {status} for {url}")]
    Status {
        /// The requested URL.
        url: String,
        /// Numeric HTTP status.
        status: u16,
        /// Response body, if it could be read.
        body: Option<String>,
    },
}

/// # Fetch Collaborator
///
/// Accepts a URL plus request headers and returns the raw response text.
/// Implementations own cookies, timeouts and any transport retries.
#[async_trait]
pub trait Fetch: Send + Sync {
    /// Issues a GET and returns the body as text.
    async fn fetch_text(&self, url: &str, headers: &HeaderMap) -> Result<String, FetchError>;
}
