//! # Market Reports
//!
//! Top gainers, losers, volume spurts, most active, advances/declines and the
//! index list all come from JSON endpoints that wrap their rows in a `data`
//! array. Each report is one [`ReportKind`].

use crate::configs::config_nse::NseUrls;
use crate::markets::nse::error::{NseError, NseResult};
use crate::markets::nse::normalizer::{clean_object, Quote};
use serde::Serialize;
use serde_json::Value;
use std::fmt;

/// The reports the exchange publishes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub enum ReportKind {
    /// Top gainers.
    Gainers,
    /// Top losers.
    Losers,
    /// Volume spurts.
    Volume,
    /// Most active by traded value.
    Active,
    /// Advances and declines per index.
    AdvancesDeclines,
    /// Names of the published indices.
    IndexList,
}

impl ReportKind {
    /// Every report, in display order.
    pub const ALL: [ReportKind; 6] = [
        ReportKind::Gainers,
        ReportKind::Losers,
        ReportKind::Volume,
        ReportKind::Active,
        ReportKind::AdvancesDeclines,
        ReportKind::IndexList,
    ];

    /// Parses a report name such as `"GAINERS"` or `"advances decline"`.
    /// Unknown names yield `None`.
    pub fn from_name(name: &str) -> Option<Self> {
        let normalized = name.split_whitespace().collect::<Vec<_>>().join(" ").to_uppercase();
        match normalized.as_str() {
            "GAINERS" => Some(ReportKind::Gainers),
            "LOSERS" => Some(ReportKind::Losers),
            "VOLUME" => Some(ReportKind::Volume),
            "ACTIVE" => Some(ReportKind::Active),
            "ADVANCES DECLINE" => Some(ReportKind::AdvancesDeclines),
            "INDEX LIST" => Some(ReportKind::IndexList),
            _ => None,
        }
    }

    /// Upstream endpoint for this report.
    pub fn url<'a>(&self, urls: &'a NseUrls) -> &'a str {
        match self {
            ReportKind::Gainers => &urls.top_gainers,
            ReportKind::Losers => &urls.top_losers,
            ReportKind::Volume => &urls.top_volume,
            ReportKind::Active => &urls.most_active,
            ReportKind::AdvancesDeclines => &urls.advances_declines,
            ReportKind::IndexList => &urls.index_list,
        }
    }

    /// Field naming the row's instrument.
    pub fn index_field(&self) -> Option<&'static str> {
        match self {
            ReportKind::Gainers | ReportKind::Losers | ReportKind::Active => Some("symbol"),
            ReportKind::Volume => Some("sym"),
            ReportKind::AdvancesDeclines => Some("indice"),
            ReportKind::IndexList => None,
        }
    }
}

impl fmt::Display for ReportKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ReportKind::Gainers => "GAINERS",
            ReportKind::Losers => "LOSERS",
            ReportKind::Volume => "VOLUME",
            ReportKind::Active => "ACTIVE",
            ReportKind::AdvancesDeclines => "ADVANCES DECLINE",
            ReportKind::IndexList => "INDEX LIST",
        };
        f.write_str(name)
    }
}

/// A report as returned by [`crate::markets::nse::client::Nse::get_top`].
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Report {
    /// Cleaned rows of a tabular report.
    Records(Vec<Quote>),
    /// Index names.
    Names(Vec<String>),
}

/// Cleans every object row; other rows are a malformed payload.
pub fn parse_report_rows(rows: Vec<Value>) -> NseResult<Vec<Quote>> {
    rows.into_iter()
        .map(|row| clean_object(row).ok_or_else(|| NseError::parse("report row is not an object")))
        .collect()
}

/// Index names from the index list rows' `name` fields.
pub fn parse_index_names(rows: &[Value]) -> NseResult<Vec<String>> {
    rows.iter()
        .map(|row| {
            row.get("name")
                .and_then(Value::as_str)
                .map(str::to_string)
                .ok_or_else(|| NseError::parse("index row has no name"))
        })
        .collect()
}

/// The cleaned index row whose `name` equals `code` (uppercased).
pub fn find_index_quote(rows: Vec<Value>, code: &str) -> Option<Quote> {
    let wanted = code.to_uppercase();
    rows.into_iter()
        .find(|row| row.get("name").and_then(Value::as_str) == Some(wanted.as_str()))
        .and_then(clean_object)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn index_rows() -> Vec<Value> {
        vec![
            json!({"name": "NIFTY 50", "lastPrice": "25,100.40", "change": "-"}),
            json!({"name": "NIFTY BANK", "lastPrice": "56,010.00", "change": "12.5"}),
        ]
    }

    #[test]
    fn names_round_trip_through_display() {
        for kind in ReportKind::ALL {
            assert_eq!(ReportKind::from_name(&kind.to_string()), Some(kind));
        }
        assert_eq!(ReportKind::from_name("  advances   decline "), Some(ReportKind::AdvancesDeclines));
        assert_eq!(ReportKind::from_name("unknown"), None);
    }

    #[test]
    fn each_kind_has_its_url_and_field() {
        let urls = NseUrls::default();
        assert_eq!(ReportKind::Volume.url(&urls), urls.top_volume);
        assert_eq!(ReportKind::Volume.index_field(), Some("sym"));
        assert_eq!(ReportKind::AdvancesDeclines.index_field(), Some("indice"));
        assert_eq!(ReportKind::IndexList.index_field(), None);
    }

    #[test]
    fn report_rows_are_cleaned() {
        let rows = parse_report_rows(vec![json!({"symbol": "INFY", "ltp": "1,500.00"})]).unwrap();
        assert_eq!(rows[0]["ltp"], json!(1500.0));
        assert!(parse_report_rows(vec![json!("flat")]).is_err());
    }

    #[test]
    fn index_lookup_matches_uppercased_name() {
        assert_eq!(parse_index_names(&index_rows()).unwrap(), vec!["NIFTY 50", "NIFTY BANK"]);
        let quote = find_index_quote(index_rows(), "nifty bank").unwrap();
        assert_eq!(quote["lastPrice"], json!(56010.0));
        assert!(find_index_quote(index_rows(), "NIFTY IT").is_none());
        assert_eq!(find_index_quote(index_rows(), "NIFTY 50").unwrap()["change"], Value::Null);
    }

    #[test]
    fn report_serializes_untagged() {
        let names = Report::Names(vec!["NIFTY 50".to_string()]);
        assert_eq!(serde_json::to_value(&names).unwrap(), json!(["NIFTY 50"]));
    }
}
