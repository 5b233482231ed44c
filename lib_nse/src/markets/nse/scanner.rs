//! # Balanced Span Scanner
//!
//! Finds `{...}` (or any bracket pair) spans in raw upstream text without a
//! regular expression. Nesting is tracked with a depth counter.
//!
//! Callers choose which quote characters delimit strings. Brackets inside
//! such strings are ignored, so a brace in a company name does not end a
//! record early. With no quote characters the scan is plain depth counting.
//! A quote-aware scan that never closes (an unmatched quote upstream) is
//! retried with plain depth counting.

use std::ops::Range;

/// String delimiters of JSON.
pub const JSON_QUOTES: &[u8] = b"\"";
/// String delimiters of JSON5 and JavaScript object literals.
pub const JSON5_QUOTES: &[u8] = b"\"'";

/// Returns the byte range of the first balanced span that starts at or after
/// `from`, including both brackets. `None` when no opening bracket follows
/// `from` or the first one is never closed.
pub fn next_balanced_span(text: &str, from: usize, open: u8, close: u8, quotes: &[u8]) -> Option<Range<usize>> {
    let bytes = text.as_bytes();
    let start = from + bytes.get(from..)?.iter().position(|&b| b == open)?;
    let end = matching_close(bytes, start, open, close, quotes)
        .or_else(|| {
            if quotes.is_empty() {
                None
            } else {
                matching_close(bytes, start, open, close, &[])
            }
        })?;
    Some(start..end + 1)
}

/// Index of the bracket closing the one at `start`.
fn matching_close(bytes: &[u8], start: usize, open: u8, close: u8, quotes: &[u8]) -> Option<usize> {
    let mut depth = 0usize;
    let mut in_string: Option<u8> = None;
    let mut escaped = false;

    for (offset, &b) in bytes[start..].iter().enumerate() {
        if let Some(quote) = in_string {
            if escaped {
                escaped = false;
            } else if b == b'\\' {
                escaped = true;
            } else if b == quote {
                in_string = None;
            }
            continue;
        }

        if quotes.contains(&b) {
            in_string = Some(b);
        } else if b == open {
            depth += 1;
        } else if b == close {
            depth -= 1;
            if depth == 0 {
                return Some(start + offset);
            }
        }
    }
    None
}

/// Iterator over successive balanced `{...}` spans, each search resuming just
/// past the previous span.
pub struct BraceSpans<'a> {
    text: &'a str,
    pos: usize,
    quotes: &'a [u8],
}

impl<'a> BraceSpans<'a> {
    /// Scans `text` from the beginning with plain depth counting.
    pub fn new(text: &'a str) -> Self {
        Self::with_quotes(text, &[])
    }

    /// Scans `text` from the beginning, ignoring braces inside `quotes` strings.
    pub fn with_quotes(text: &'a str, quotes: &'a [u8]) -> Self {
        Self { text, pos: 0, quotes }
    }
}

impl<'a> Iterator for BraceSpans<'a> {
    type Item = &'a str;

    fn next(&mut self) -> Option<Self::Item> {
        let span = next_balanced_span(self.text, self.pos, b'{', b'}', self.quotes)?;
        self.pos = span.end;
        Some(&self.text[span])
    }
}
