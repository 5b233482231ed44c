//! # Equity Quotes
//!
//! The quote page embeds its data as a JavaScript-flavoured object inside a
//! hidden `responseDiv`. Extraction is anchored on that marker and cut out
//! with the balanced-brace scanner (aware of both quote styles), then read
//! with a JSON5 parser which tolerates bare keys, single quotes and trailing
//! commas.

use crate::markets::nse::error::{NseError, NseResult};
use crate::markets::nse::normalizer::{clean_object, Quote};
use crate::markets::nse::scanner::{next_balanced_span, JSON5_QUOTES};
use regex::Regex;
use serde::ser::{Serialize, Serializer};
use serde_json::Value;
use static_init::dynamic;
use url::Url;

#[dynamic(lazy)]
static RESPONSE_DIV: Regex =
    Regex::new(r#"<div\s+id="responseDiv"\s+style="display:none">"#).expect("marker pattern is valid");

/// Quote page URL for `code`.
pub fn build_url_for_quote(quote_url: &str, code: &str) -> NseResult<Url> {
    Url::parse_with_params(
        quote_url,
        &[
            ("symbol", code),
            ("illiquid", "0"),
            ("smeFlag", "0"),
            ("itpFlag", "0"),
        ],
    )
    .map_err(|e| NseError::parse(format!("invalid quote url {}: {}", quote_url, e)))
}

/// The first balanced `{...}` following the response marker.
pub fn extract_quote_blob(html: &str) -> Option<&str> {
    let marker = RESPONSE_DIV.find(html)?;
    let span = next_balanced_span(html, marker.end(), b'{', b'}', JSON5_QUOTES)?;
    Some(&html[span])
}

/// Reads the blob and returns its first `data` record, cleaned.
pub fn parse_quote_blob(blob: &str) -> Option<Quote> {
    let document: Value = serde_json5::from_str(blob).ok()?;
    let first = match document {
        Value::Object(mut map) => match map.remove("data")? {
            Value::Array(items) => items.into_iter().next()?,
            _ => return None,
        },
        _ => return None,
    };
    clean_object(first)
}

/// Full page to quote. Any failure to find or read the blob means the
/// symbol has no quote today.
pub fn parse_quote_page(html: &str, symbol: &str) -> NseResult<Quote> {
    extract_quote_blob(html)
        .and_then(parse_quote_blob)
        .ok_or_else(|| NseError::SymbolNotTraded(symbol.to_string()))
}

/// # Quote Batch
///
/// Quotes from a multi-symbol fetch in request order, addressable by symbol.
/// Serializes as a JSON array of records.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QuoteBatch {
    entries: Vec<(String, Quote)>,
}

impl QuoteBatch {
    /// An empty batch.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a quote under `symbol`.
    pub fn push(&mut self, symbol: impl Into<String>, quote: Quote) {
        self.entries.push((symbol.into(), quote));
    }

    /// Quote for `symbol`, ignoring case.
    pub fn get(&self, symbol: &str) -> Option<&Quote> {
        self.entries
            .iter()
            .find(|(s, _)| s.eq_ignore_ascii_case(symbol))
            .map(|(_, q)| q)
    }

    /// Symbols in request order.
    pub fn symbols(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(s, _)| s.as_str())
    }

    /// `(symbol, quote)` pairs in request order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Quote)> {
        self.entries.iter().map(|(s, q)| (s.as_str(), q))
    }

    /// Number of quotes.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// `true` when no symbol survived.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Serialize for QuoteBatch {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_seq(self.entries.iter().map(|(_, q)| q))
    }
}
