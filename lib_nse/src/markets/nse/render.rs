//! # Result Rendering
//!
//! Every caller-facing fetch takes an `as_json` flag. `false` hands back the
//! structured value, `true` a JSON string of it.

use crate::markets::nse::error::NseResult;
use serde::Serialize;

/// A result either as its native value or rendered to JSON text.
#[derive(Debug, Clone, PartialEq)]
pub enum Rendered<T> {
    /// The structured value.
    Native(T),
    /// The value serialized to JSON text.
    Json(String),
}

impl<T: Serialize> Rendered<T> {
    /// Renders `value` as requested.
    pub fn new(value: T, as_json: bool) -> NseResult<Self> {
        if as_json {
            Ok(Rendered::Json(serde_json::to_string(&value)?))
        } else {
            Ok(Rendered::Native(value))
        }
    }
}

impl<T> Rendered<T> {
    /// The native value, if not rendered.
    pub fn into_native(self) -> Option<T> {
        match self {
            Rendered::Native(value) => Some(value),
            Rendered::Json(_) => None,
        }
    }

    /// The JSON text, if rendered.
    pub fn as_json(&self) -> Option<&str> {
        match self {
            Rendered::Native(_) => None,
            Rendered::Json(text) => Some(text),
        }
    }

    /// `true` for rendered text.
    pub fn is_json(&self) -> bool {
        matches!(self, Rendered::Json(_))
    }
}
