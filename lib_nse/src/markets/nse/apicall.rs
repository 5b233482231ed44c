//! # NSE API Call Client
//!
//! Thin layer over the fetch collaborator that knows the exchange's headers
//! and how its JSON endpoints wrap their payloads. No retries happen here;
//! a failed request is logged and surfaced.

use crate::loggers::loggerlocal::LoggerLocal;
use crate::markets::nse::error::{NseError, NseResult};
use crate::retrieve::Fetch;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use serde_json::{json, Value};
use std::sync::Arc;

/// # NSE API Call Client
///
/// Shared by every NSE component. Holds the fetch collaborator, the request
/// headers and the logger.
pub struct ApiCallNse {
    fetcher: Arc<dyn Fetch>,
    headers: HeaderMap,
    logger: Arc<LoggerLocal>,
}

impl ApiCallNse {
    /// Creates the client with browser-like headers for the given user agent and referer.
    pub fn new(fetcher: Arc<dyn Fetch>, user_agent: &str, referer: &str, logger: Arc<LoggerLocal>) -> Self {
        Self {
            fetcher,
            headers: Self::build_headers(user_agent, referer),
            logger,
        }
    }

    /// The headers sent with every request.
    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// Internal helper to construct the browser-mimic headers
    fn build_headers(user_agent: &str, referer: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();

        let header_list = [
            ("accept", "*/*"),
            ("accept-language", "en-US,en;q=0.5"),
            ("referer", referer),
            ("user-agent", user_agent),
            ("x-requested-with", "XMLHttpRequest"),
        ];

        for (name, value) in header_list {
            if let (Ok(h_name), Ok(h_value)) = (HeaderName::from_bytes(name.as_bytes()), HeaderValue::from_str(value)) {
                headers.insert(h_name, h_value);
            }
        }

        headers
    }

    /// Fetches a page as text.
    pub async fn fetch_text(&self, url: &str) -> NseResult<String> {
        match self.fetcher.fetch_text(url, &self.headers).await {
            Ok(body) => {
                self.logger
                    .trace("NSE fetch succeeded", Some(json!({"url": url, "bytes": body.len()})))
                    .await;
                Ok(body)
            }
            Err(e) => {
                self.logger
                    .error(&format!("NSE fetch failed: {}", e), Some(json!({"url": url})))
                    .await;
                Err(NseError::Fetch(e))
            }
        }
    }

    /// Fetches and decodes a JSON document.
    pub async fn fetch_json(&self, url: &str) -> NseResult<Value> {
        let body = self.fetch_text(url).await?;
        match serde_json::from_str::<Value>(&body) {
            Ok(value) => Ok(value),
            Err(e) => {
                self.logger
                    .error(&format!("NSE payload is not JSON: {}", e), Some(json!({"url": url})))
                    .await;
                Err(NseError::Json(e))
            }
        }
    }

    /// Fetches a JSON document and returns its `data` array.
    pub async fn fetch_data_array(&self, url: &str) -> NseResult<Vec<Value>> {
        let document = self.fetch_json(url).await?;
        take_data_array(document).ok_or_else(|| NseError::parse(format!("{} has no data array", url)))
    }
}

/// Extracts the `data` array the exchange wraps its JSON payloads in.
pub fn take_data_array(document: Value) -> Option<Vec<Value>> {
    match document {
        Value::Object(mut map) => match map.remove("data") {
            Some(Value::Array(items)) => Some(items),
            _ => None,
        },
        _ => None,
    }
}
