//! # Peer Companies
//!
//! The peer endpoint answers with a JavaScript object literal whose `data:`
//! array holds one record per peer. The literal as a whole is not valid JSON,
//! and individual records are sometimes broken, so each record is cut out on
//! its own and parsed strictly. Broken records are skipped.
//!
//! Records are cut with plain brace counting: a broken record with an
//! unmatched quote must not hide the records after it.

use crate::markets::nse::normalizer::Quote;
use crate::markets::nse::scanner::BraceSpans;

const DATA_MARKER: &str = "data:";

/// Parsed peer records, without their `industry` field. Text without a
/// `data:` marker yields nothing.
pub fn extract_peers(raw: &str) -> Vec<Quote> {
    let Some(at) = raw.find(DATA_MARKER) else {
        return Vec::new();
    };

    BraceSpans::new(&raw[at + DATA_MARKER.len()..])
        .filter_map(|span| serde_json::from_str::<Quote>(span).ok())
        .map(|mut record| {
            record.remove("industry");
            record
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn keeps_valid_records_and_skips_broken_ones() {
        let raw = r#"{success:"true",results:4,data:[
            {"symbol":"TCS","industry":"IT","ltp":"3,100.00"},
            {symbol:'BROKEN',"ltp":1},
            {"symbol":"WIPRO","industry":"IT","name":"Wipro {Ltd}"},
            {"symbol":"HCL" "oops"},
            {"symbol":"TECHM","nested":{"a":1}}
        ]}"#;
        let peers = extract_peers(raw);
        let symbols: Vec<_> = peers.iter().map(|p| p["symbol"].clone()).collect();
        assert_eq!(symbols, vec![json!("TCS"), json!("WIPRO"), json!("TECHM")]);
        assert!(peers.iter().all(|p| !p.contains_key("industry")));
        assert_eq!(peers[0]["ltp"], json!("3,100.00"));
        assert_eq!(peers[2]["nested"], json!({"a": 1}));
    }

    #[test]
    fn unmatched_quote_does_not_hide_later_records() {
        let peers = extract_peers(r#"data:[{"a":1},{"b":"oops},{"c":2},{"d":3}]"#);
        assert_eq!(peers.len(), 3);
        assert_eq!(peers[1]["c"], json!(2));
        assert_eq!(peers[2]["d"], json!(3));
    }

    #[test]
    fn no_marker_means_no_peers() {
        assert!(extract_peers(r#"{"symbol":"TCS"}"#).is_empty());
        assert!(extract_peers("").is_empty());
    }

    #[test]
    fn unclosed_tail_stops_the_scan() {
        let peers = extract_peers(r#"data:[{"a":1},{"b":2"#);
        assert_eq!(peers.len(), 1);
    }
}
