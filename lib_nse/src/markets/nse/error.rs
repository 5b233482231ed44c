//! # NSE Error Taxonomy
//!
//! Invalid symbols and indices are not errors: the client returns `None` for
//! them. Everything here is surfaced to the caller.

use crate::retrieve::FetchError;
use thiserror::Error;

/// Errors raised by the NSE client.
#[derive(Debug, Error)]
pub enum NseError {
    /// Transport or HTTP failure. Never retried by the client.
    #[error("fetch failed: {0}")]
    Fetch(#[from] FetchError),

    /// Upstream payload lacked a structure the client requires.
    #[error("malformed upstream payload: {0}")]
    Parse(String),

    /// The quote page for a symbol carried no usable data blob.
    #[error("symbol {0} not traded today")]
    SymbolNotTraded(String),

    /// A JSON payload could not be decoded or a result could not be rendered.
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    /// The equity registry CSV could not be read.
    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),

    /// The client was built from an unusable configuration.
    #[error("configuration error: {0}")]
    Config(#[from] crate::configs::config_nse::NseConfigError),
}

/// Result alias used throughout the NSE client.
pub type NseResult<T> = Result<T, NseError>;

impl NseError {
    /// Builds a [`NseError::Parse`] from anything printable.
    pub fn parse(reason: impl Into<String>) -> Self {
        NseError::Parse(reason.into())
    }

    /// `true` for failures that only concern one symbol and may be dropped from a batch.
    pub fn is_per_symbol(&self) -> bool {
        matches!(self, NseError::SymbolNotTraded(_) | NseError::Parse(_))
    }
}
