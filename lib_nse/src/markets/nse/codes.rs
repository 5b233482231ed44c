//! # Equity Registry
//!
//! The exchange publishes its listed equities as a CSV file. Only the symbol
//! matters for validation; the other columns are kept for callers that
//! display them.

use crate::markets::nse::error::NseResult;
use serde::{Deserialize, Serialize};

/// One listed equity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StockCode {
    /// Trading symbol, uppercased.
    #[serde(rename = "SYMBOL")]
    pub symbol: String,
    /// Company name.
    #[serde(rename = "NAME OF COMPANY")]
    pub name: String,
    /// Trading series, e.g. `EQ`.
    #[serde(rename = "SERIES")]
    pub series: String,
    /// Listing date as published.
    #[serde(rename = "DATE OF LISTING")]
    pub date_of_listing: String,
    /// Paid-up value per share.
    #[serde(rename = "PAID UP VALUE")]
    pub paid_up_value: String,
    /// Market lot.
    #[serde(rename = "MARKET LOT")]
    pub market_lot: String,
    /// ISIN.
    #[serde(rename = "ISIN NUMBER")]
    pub isin_number: String,
    /// Face value per share.
    #[serde(rename = "FACE VALUE")]
    pub face_value: String,
}

/// Parses the registry CSV. The header line is skipped and missing trailing
/// columns are left empty; rows without a symbol are dropped.
pub fn parse_stock_codes(csv_text: &str) -> NseResult<Vec<StockCode>> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(csv_text.as_bytes());

    let mut codes = Vec::new();
    for record in reader.records() {
        let record = record?;
        let field = |i: usize| record.get(i).unwrap_or_default().to_string();
        let symbol = field(0).to_uppercase();
        if symbol.is_empty() {
            continue;
        }
        codes.push(StockCode {
            symbol,
            name: field(1),
            series: field(2),
            date_of_listing: field(3),
            paid_up_value: field(4),
            market_lot: field(5),
            isin_number: field(6),
            face_value: field(7),
        });
    }
    Ok(codes)
}

/// `true` when `code` names a listed equity. Matching ignores case.
pub fn contains_symbol(codes: &[StockCode], code: &str) -> bool {
    let code = code.trim();
    !code.is_empty() && codes.iter().any(|c| c.symbol.eq_ignore_ascii_case(code))
}

#[cfg(test)]
mod tests {
    use super::*;

    const CSV: &str = "SYMBOL,NAME OF COMPANY, SERIES, DATE OF LISTING, PAID UP VALUE, MARKET LOT, ISIN NUMBER, FACE VALUE
20MICRONS,20 Microns Limited,EQ,06-OCT-2008,5,1,INE144J01027,5
INFY,Infosys Limited,EQ,08-FEB-1995,5,1,INE009A01021,5
M&M,\"Mahindra & Mahindra, Limited\",EQ,04-JAN-1996,5,1,INE101A01026,5
SHORT,Short Row
";

    #[test]
    fn parses_registry_rows() {
        let codes = parse_stock_codes(CSV).unwrap();
        assert_eq!(codes.len(), 4);
        assert_eq!(codes[1].symbol, "INFY");
        assert_eq!(codes[1].isin_number, "INE009A01021");
        assert_eq!(codes[2].name, "Mahindra & Mahindra, Limited");
        assert_eq!(codes[3].series, "");
    }

    #[test]
    fn symbol_lookup_ignores_case() {
        let codes = parse_stock_codes(CSV).unwrap();
        assert!(contains_symbol(&codes, "infy"));
        assert!(contains_symbol(&codes, "M&M"));
        assert!(!contains_symbol(&codes, "BOGUS"));
        assert!(!contains_symbol(&codes, ""));
    }

    #[test]
    fn header_only_file_is_empty() {
        assert!(parse_stock_codes("SYMBOL,NAME OF COMPANY\n").unwrap().is_empty());
    }
}
