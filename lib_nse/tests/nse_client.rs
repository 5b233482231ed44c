//! End-to-end checks of the NSE client against canned upstream pages.

use async_trait::async_trait;
use chrono::{NaiveDate, NaiveDateTime};
use lib_nse::markets::nse::{FixedClock, Nse, NseError, Quote, Rendered, Report, ReportKind};
use lib_nse::retrieve::{Fetch, FetchError};
use lib_nse::{LoggerLocal, NseConfig};
use reqwest::header::HeaderMap;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

const HOLIDAYS_URL: &str = "http://nse.test/holidays.htm";
const CODES_URL: &str = "http://nse.test/EQUITY_L.csv";
const QUOTE_URL: &str = "http://nse.test/GetQuote.jsp";
const GAINERS_URL: &str = "http://nse.test/gainers.json";
const INDEX_URL: &str = "http://nse.test/indices.json";
const PEERS_URL: &str = "http://nse.test/peers.jsp?symbol=";

/// Serves canned bodies by URL and counts requests.
#[derive(Default)]
struct ScriptedFetch {
    pages: Mutex<HashMap<String, Result<String, u16>>>,
    calls: Mutex<HashMap<String, usize>>,
}

impl ScriptedFetch {
    fn page(&self, url: &str, body: &str) {
        self.pages
            .lock()
            .unwrap()
            .insert(url.to_string(), Ok(body.to_string()));
    }

    fn fail(&self, url: &str, status: u16) {
        self.pages.lock().unwrap().insert(url.to_string(), Err(status));
    }

    fn calls(&self, url: &str) -> usize {
        self.calls.lock().unwrap().get(url).copied().unwrap_or(0)
    }
}

#[async_trait]
impl Fetch for ScriptedFetch {
    async fn fetch_text(&self, url: &str, headers: &HeaderMap) -> Result<String, FetchError> {
        assert!(headers.contains_key("user-agent"));
        *self.calls.lock().unwrap().entry(url.to_string()).or_default() += 1;
        match self.pages.lock().unwrap().get(url) {
            Some(Ok(body)) => Ok(body.clone()),
            Some(Err(status)) => Err(FetchError::Status {
                url: url.to_string(),
                status: *status,
                body: None,
            }),
            None => Err(FetchError::Status {
                url: url.to_string(),
                status: 404,
                body: None,
            }),
        }
    }
}

fn quote_url(symbol: &str) -> String {
    format!("{}?symbol={}&illiquid=0&smeFlag=0&itpFlag=0", QUOTE_URL, symbol)
}

fn quote_page(symbol: &str, price: &str) -> String {
    format!(
        r#"<html><div id="responseDiv" style="display:none">
        {{"tradedDate":"19OCT2026",data:[{{"symbol":"{}","lastPrice":"{}","buyPrice1":"-"}}],}}
        </div></html>"#,
        symbol, price
    )
}

fn at(y: i32, m: u32, d: u32, h: u32, min: u32) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(y, m, d)
        .unwrap()
        .and_hms_opt(h, min, 0)
        .unwrap()
}

struct Harness {
    nse: Nse,
    fetch: Arc<ScriptedFetch>,
    clock: Arc<FixedClock>,
}

/// Client on Monday 2026-10-19, with the market closed (evening) unless moved.
fn harness() -> Harness {
    let mut config = NseConfig::default();
    config.urls.holidays = HOLIDAYS_URL.to_string();
    config.urls.stock_codes = CODES_URL.to_string();
    config.urls.quote = QUOTE_URL.to_string();
    config.urls.top_gainers = GAINERS_URL.to_string();
    config.urls.index_list = INDEX_URL.to_string();
    config.urls.peer_companies = PEERS_URL.to_string();

    let fetch = Arc::new(ScriptedFetch::default());
    fetch.page(
        HOLIDAYS_URL,
        r#"<table>
            <tr><td>1</td><td>Jan 1 2026</td><td>New Year</td></tr>
            <tr><td>2</td><td>22-Oct-2026</td><td>Diwali</td></tr>
            <tr><td>1</td><td>27-Oct-2026</td><td>Clearing holiday</td></tr>
        </table>"#,
    );
    fetch.page(
        CODES_URL,
        "SYMBOL,NAME OF COMPANY,SERIES\nVALID1,Valid One,EQ\nVALID2,Valid Two,EQ\nDARK,Untraded,EQ\n",
    );
    fetch.page(&quote_url("VALID1"), &quote_page("VALID1", "1,000.50"));
    fetch.page(&quote_url("VALID2"), &quote_page("VALID2", "20"));
    fetch.page(&quote_url("DARK"), "<html>no quote here</html>");

    let clock = Arc::new(FixedClock::new(at(2026, 10, 19, 18, 0)));
    let nse = Nse::with_parts(
        config,
        fetch.clone(),
        clock.clone(),
        Arc::new(LoggerLocal::silent("nse-test")),
    )
    .unwrap();

    Harness { nse, fetch, clock }
}

#[tokio::test]
async fn holiday_list_stops_at_serial_reset_and_skips_the_past() {
    let h = harness();
    let list = h.nse.get_holiday_list().await.unwrap();

    assert!(list.contains(NaiveDate::from_ymd_opt(2026, 10, 22).unwrap()));
    assert!(!list.contains(NaiveDate::from_ymd_opt(2026, 1, 1).unwrap()));
    assert!(!list.contains(NaiveDate::from_ymd_opt(2026, 10, 27).unwrap()));
    assert!(list.contains(NaiveDate::from_ymd_opt(2026, 12, 27).unwrap()));
    let today = NaiveDate::from_ymd_opt(2026, 10, 19).unwrap();
    assert!(list.dates().iter().all(|d| *d >= today));

    // Rows are scraped once; the list is rebuilt per call.
    h.nse.get_holiday_list().await.unwrap();
    assert_eq!(h.fetch.calls(HOLIDAYS_URL), 1);
}

#[tokio::test]
async fn market_status_follows_window_and_holidays() {
    let h = harness();
    assert!(!h.nse.market_status().await.unwrap());

    h.clock.set(at(2026, 10, 19, 11, 0));
    assert!(h.nse.market_status().await.unwrap());

    h.clock.set(at(2026, 10, 22, 11, 0));
    assert!(!h.nse.market_status().await.unwrap());
}

#[tokio::test]
async fn batch_keeps_valid_symbols_in_order() {
    let h = harness();
    let batch = h
        .nse
        .get_quotes(["VALID1", "BOGUS", "valid2", "DARK"], false)
        .await
        .unwrap()
        .into_native()
        .unwrap();

    assert_eq!(batch.symbols().collect::<Vec<_>>(), vec!["VALID1", "VALID2"]);
    assert_eq!(batch.get("VALID1").unwrap()["lastPrice"], json!(1000.5));
    assert_eq!(batch.get("valid2").unwrap()["lastPrice"], json!(20.0));
    assert!(batch.get("BOGUS").is_none());
    // Unlisted symbols never reach the quote endpoint.
    assert_eq!(h.fetch.calls(&quote_url("BOGUS")), 0);
}

#[tokio::test]
async fn batch_with_nothing_valid_is_empty() {
    let h = harness();
    let batch = h
        .nse
        .get_quotes(vec!["NOPE".to_string()], true)
        .await
        .unwrap();
    assert_eq!(batch.as_json(), Some("[]"));
}

#[tokio::test]
async fn single_quote_surfaces_not_traded() {
    let h = harness();
    assert!(h.nse.get_quote("BOGUS", false).await.unwrap().is_none());
    assert!(matches!(
        h.nse.get_quote("DARK", false).await,
        Err(NseError::SymbolNotTraded(s)) if s == "DARK"
    ));
}

#[tokio::test]
async fn closed_market_fetches_each_quote_once() {
    let h = harness();
    for _ in 0..3 {
        h.nse.get_quote("VALID1", false).await.unwrap().unwrap();
    }
    assert_eq!(h.fetch.calls(&quote_url("VALID1")), 1);
    assert_eq!(h.nse.cache_stats()["quotes"].hits, 2);

    h.nse.clear_cache().await;
    h.nse.get_quote("VALID1", false).await.unwrap();
    assert_eq!(h.fetch.calls(&quote_url("VALID1")), 2);
}

#[tokio::test]
async fn open_market_fetches_every_time() {
    let h = harness();
    h.clock.set(at(2026, 10, 19, 10, 30));
    for _ in 0..3 {
        h.nse.get_quote("VALID1", false).await.unwrap().unwrap();
    }
    assert_eq!(h.fetch.calls(&quote_url("VALID1")), 3);
    assert_eq!(h.nse.cache_stats()["quotes"].bypasses, 3);
    // The registry is reference data and stays cached while open.
    assert_eq!(h.fetch.calls(CODES_URL), 1);
}

fn last_price(quote: Option<Rendered<Quote>>) -> Value {
    quote.unwrap().into_native().unwrap()["lastPrice"].clone()
}

#[tokio::test]
async fn closed_session_cache_does_not_outlive_the_next_open() {
    let h = harness();
    let monday = h.nse.get_quote("VALID1", false).await.unwrap();
    assert_eq!(last_price(monday), json!(1000.5));

    h.fetch.page(&quote_url("VALID1"), &quote_page("VALID1", "1,200.00"));
    h.clock.set(at(2026, 10, 20, 11, 0));
    let tuesday_open = h.nse.get_quote("VALID1", false).await.unwrap();
    assert_eq!(last_price(tuesday_open), json!(1200.0));

    h.clock.set(at(2026, 10, 20, 18, 0));
    let tuesday_close = h.nse.get_quote("VALID1", false).await.unwrap();
    assert_eq!(last_price(tuesday_close), json!(1200.0));
    assert_eq!(h.fetch.calls(&quote_url("VALID1")), 3);
    // Reference data survives the session change.
    assert_eq!(h.fetch.calls(CODES_URL), 1);
}

#[tokio::test]
async fn closed_session_cache_is_dropped_after_midnight() {
    let h = harness();
    h.nse.get_quote("VALID1", false).await.unwrap().unwrap();
    h.nse.get_quote("VALID1", false).await.unwrap().unwrap();
    assert_eq!(h.fetch.calls(&quote_url("VALID1")), 1);

    h.clock.set(at(2026, 10, 20, 8, 0));
    h.nse.get_quote("VALID1", false).await.unwrap().unwrap();
    h.nse.get_quote("VALID1", false).await.unwrap().unwrap();
    assert_eq!(h.fetch.calls(&quote_url("VALID1")), 2);
}

#[tokio::test]
async fn unreachable_calendar_bypasses_the_cache() {
    let h = harness();
    h.fetch.fail(HOLIDAYS_URL, 503);
    h.nse.get_quote("VALID1", false).await.unwrap().unwrap();
    h.nse.get_quote("VALID1", false).await.unwrap().unwrap();
    assert_eq!(h.fetch.calls(&quote_url("VALID1")), 2);
    assert!(matches!(h.nse.market_status().await, Err(NseError::Fetch(_))));
}

#[tokio::test]
async fn transport_failure_is_surfaced() {
    let h = harness();
    h.fetch.fail(&quote_url("VALID2"), 500);
    assert!(matches!(
        h.nse.get_quote("VALID2", false).await,
        Err(NseError::Fetch(FetchError::Status { status: 500, .. }))
    ));
    assert!(h.nse.get_quotes(["VALID1", "VALID2"], false).await.is_err());
}

#[tokio::test]
async fn quote_renders_as_json_text() {
    let h = harness();
    let rendered = h.nse.get_quote("VALID2", true).await.unwrap().unwrap();
    let value: serde_json::Value = serde_json::from_str(rendered.as_json().unwrap()).unwrap();
    assert_eq!(value, json!({"symbol": "VALID2", "lastPrice": 20.0, "buyPrice1": null}));
}

#[tokio::test]
async fn peers_skip_malformed_records() {
    let h = harness();
    h.fetch.page(
        &format!("{}VALID1", PEERS_URL),
        r#"{success:"true",data:[{"symbol":"VALID1","industry":"X"},{symbol:bad},{"symbol":"PEER","industry":"X"},{"oops"}]}"#,
    );

    let peers = h
        .nse
        .get_peer_companies("valid1", false)
        .await
        .unwrap()
        .unwrap()
        .into_native()
        .unwrap();
    assert_eq!(peers.len(), 2);
    assert!(peers.iter().all(|p| !p.contains_key("industry")));
    assert!(h.nse.get_peer_companies("BOGUS", false).await.unwrap().is_none());
}

#[tokio::test]
async fn reports_and_indices() {
    let h = harness();
    h.fetch.page(
        GAINERS_URL,
        r#"{"time":"Oct 19, 2026","data":[{"symbol":"VALID1","ltp":"1,010.00","netPrice":"2.5"},{"symbol":"VALID2","ltp":"-","netPrice":"1"}]}"#,
    );
    h.fetch.page(
        INDEX_URL,
        r#"{"data":[{"name":"NIFTY 50","lastPrice":"25,100.40","change":"-"},{"name":"NIFTY BANK","lastPrice":"56,010.00","change":"12.5"}]}"#,
    );

    let gainers = h.nse.get_top_gainers(false).await.unwrap().into_native().unwrap();
    assert_eq!(gainers[0]["ltp"], json!(1010.0));
    assert_eq!(gainers[1]["ltp"], serde_json::Value::Null);

    let row = h
        .nse
        .get_report_row(ReportKind::Gainers, "valid2", false)
        .await
        .unwrap()
        .unwrap()
        .into_native()
        .unwrap();
    assert_eq!(row["netPrice"], json!(1.0));

    let top = h
        .nse
        .get_top_by_name(&["GAINERS", "nonsense", "INDEX LIST"], false)
        .await
        .unwrap();
    assert_eq!(top.len(), 2);
    assert!(matches!(&top[1], lib_nse::Rendered::Native(Report::Names(names)) if names.len() == 2));

    assert!(h.nse.is_valid_index("nifty bank").await.unwrap());
    let quote = h
        .nse
        .get_index_quote("nifty bank", false)
        .await
        .unwrap()
        .unwrap()
        .into_native()
        .unwrap();
    assert_eq!(quote["lastPrice"], json!(56010.0));
    assert!(h.nse.get_index_quote("NIFTY IT", false).await.unwrap().is_none());

    let list = h.nse.get_index_list(true).await.unwrap();
    assert_eq!(list.as_json(), Some(r#"["NIFTY 50","NIFTY BANK"]"#));
    // Closed market: gainers are fetched once. The index list is fetched once
    // for the names and once for the index quote.
    assert_eq!(h.fetch.calls(GAINERS_URL), 1);
    assert_eq!(h.fetch.calls(INDEX_URL), 2);
}

#[tokio::test]
async fn registry_and_helpers() {
    let h = harness();
    assert!(h.nse.is_valid_code("valid1").await.unwrap());
    assert!(!h.nse.is_valid_code("").await.unwrap());

    let codes = h.nse.get_stock_codes(false).await.unwrap().into_native().unwrap();
    assert_eq!(codes.len(), 3);
    assert_eq!(codes[0].name, "Valid One");

    assert_eq!(h.nse.build_url_for_quote("valid1").unwrap().as_str(), quote_url("VALID1"));
    assert!(h.nse.nse_headers().contains_key("referer"));
    assert_eq!(h.fetch.calls(CODES_URL), 1);
}
