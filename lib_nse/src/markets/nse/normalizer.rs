//! # Response Normalizer
//!
//! Upstream records mix numbers rendered as text ("1,234.50"), dash
//! placeholders ("-") and plain strings. [`clean`] turns every textual value
//! into its typed form:
//!
//! - `"-"` becomes `null`;
//! - optionally signed digits with thousands separators and an optional
//!   decimal part become an `f64`;
//! - anything else stays a string.
//!
//! Non-textual values pass through untouched, which makes the operation
//! idempotent.

use regex::Regex;
use serde_json::{Map, Number, Value};
use static_init::dynamic;

/// A normalized upstream record.
pub type Quote = Map<String, Value>;

#[dynamic(lazy)]
static NUMERIC: Regex = Regex::new(r"^[-]?[0-9,]*\.?[0-9]+$").expect("numeric pattern is valid");

/// Normalizes one textual value.
pub fn clean_value(value: Value) -> Value {
    match value {
        Value::String(text) => clean_text(text),
        other => other,
    }
}

fn clean_text(text: String) -> Value {
    if text == "-" {
        return Value::Null;
    }
    if NUMERIC.is_match(&text) {
        let digits: String = text.chars().filter(|&c| c != ',').collect();
        if let Some(number) = digits.parse::<f64>().ok().and_then(Number::from_f64) {
            return Value::Number(number);
        }
    }
    Value::String(text)
}

/// Normalizes every value of a record.
pub fn clean(record: Quote) -> Quote {
    record
        .into_iter()
        .map(|(key, value)| (key, clean_value(value)))
        .collect()
}

/// Normalizes a record held in a generic JSON value. Non-objects are rejected.
pub fn clean_object(value: Value) -> Option<Quote> {
    match value {
        Value::Object(map) => Some(clean(map)),
        _ => None,
    }
}
