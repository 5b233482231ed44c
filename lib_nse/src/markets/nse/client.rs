//! # NSE Client
//!
//! The caller-facing facade over every NSE component. Market-sensitive
//! operations (quotes, reports, index quotes) are memoized only while the
//! exchange is closed; reference data (the equity registry, the index list
//! and peer lists) is memoized unconditionally.
//!
//! ## Logic:
//! 1.  Each market-sensitive call asks the [`MarketClock`] once, at entry.
//! 2.  Open market (or an unknown state): run upstream, store nothing.
//! 3.  Closed market: answer from the per-operation LRU cache, computing once.
//! 4.  Market data cached in one session is dropped when the next begins
//!     (at the daily open, or at midnight).
//! 5.  Results are rendered natively or as JSON text, per the `as_json` flag.

use crate::configs::config_nse::NseConfig;
use crate::core::{CacheStats, ConditionalCache};
use crate::loggers::loggerlocal::LoggerLocal;
use crate::markets::nse::apicall::ApiCallNse;
use crate::markets::nse::codes::{contains_symbol, parse_stock_codes, StockCode};
use crate::markets::nse::error::NseResult;
use crate::markets::nse::holidays::{HolidayCalendar, HolidayList};
use crate::markets::nse::marketstatus::{Clock, ExchangeClock, MarketClock, MarketWindow, SessionMark};
use crate::markets::nse::normalizer::Quote;
use crate::markets::nse::peers::extract_peers;
use crate::markets::nse::quote::{build_url_for_quote, parse_quote_page, QuoteBatch};
use crate::markets::nse::render::Rendered;
use crate::markets::nse::reports::{find_index_quote, parse_index_names, parse_report_rows, Report, ReportKind};
use crate::retrieve::ky_http::{ApiClient, ClientOptions};
use crate::retrieve::{Fetch, FetchError};
use futures_util::stream::{self, StreamExt};
use reqwest::header::HeaderMap;
use serde_json::{json, Value};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use url::Url;

/// Application name the client logs under.
const APP_NAME: &str = "lib_nse";

/// One cache per operation, each keyed by that operation's arguments.
struct NseCaches {
    stock_codes: ConditionalCache<(), Arc<Vec<StockCode>>>,
    quotes: ConditionalCache<String, Option<Quote>>,
    peers: ConditionalCache<String, Option<Arc<Vec<Quote>>>>,
    reports: ConditionalCache<ReportKind, Arc<Vec<Quote>>>,
    index_names: ConditionalCache<(), Arc<Vec<String>>>,
    index_quotes: ConditionalCache<String, Option<Quote>>,
}

impl NseCaches {
    fn new(capacity: usize) -> Self {
        Self {
            stock_codes: ConditionalCache::with_capacity(capacity),
            quotes: ConditionalCache::with_capacity(capacity),
            peers: ConditionalCache::with_capacity(capacity),
            reports: ConditionalCache::with_capacity(capacity),
            index_names: ConditionalCache::with_capacity(capacity),
            index_quotes: ConditionalCache::with_capacity(capacity),
        }
    }

    fn clear(&self) {
        self.stock_codes.clear();
        self.peers.clear();
        self.index_names.clear();
        self.clear_market_data();
    }

    fn clear_market_data(&self) {
        self.quotes.clear();
        self.reports.clear();
        self.index_quotes.clear();
    }
}

/// # NSE Client
///
/// Thread-safe; share it behind an `Arc` to use it from several tasks.
pub struct Nse {
    config: NseConfig,
    api: Arc<ApiCallNse>,
    calendar: Arc<HolidayCalendar>,
    market: MarketClock,
    caches: NseCaches,
    session: Mutex<Option<SessionMark>>,
    logger: Arc<LoggerLocal>,
}

impl Nse {
    /// Builds a client that talks to the exchange over HTTP, keeping cookies
    /// between requests and reading the clock in the configured timezone.
    pub fn new(config: NseConfig) -> NseResult<Self> {
        let tz = config.tz()?;
        let options = ClientOptions {
            timeout: Duration::from_secs(config.http_timeout_secs),
            max_retries: config.http_max_retries,
            cookie_store: true,
        };
        let http = ApiClient::new(&config.urls.base, options).map_err(|e| FetchError::Transport {
            url: config.urls.base.clone(),
            reason: e.to_string(),
        })?;
        let logger = Arc::new(LoggerLocal::new(APP_NAME.to_string(), Some(config.logger.clone())));

        Self::with_parts(config, Arc::new(http), Arc::new(ExchangeClock::new(tz)), logger)
    }

    /// Builds a client from explicit collaborators.
    pub fn with_parts(
        config: NseConfig,
        fetcher: Arc<dyn Fetch>,
        clock: Arc<dyn Clock>,
        logger: Arc<LoggerLocal>,
    ) -> NseResult<Self> {
        config.validate()?;

        let api = Arc::new(ApiCallNse::new(
            fetcher,
            &config.user_agent,
            &config.referer,
            Arc::clone(&logger),
        ));
        let calendar = Arc::new(HolidayCalendar::new(
            Arc::clone(&api),
            Arc::clone(&clock),
            config.urls.holidays.clone(),
            config.holiday_cache_size,
            Arc::clone(&logger),
        ));
        let window = MarketWindow {
            open: config.market_open,
            close: config.market_close,
        };
        let market = MarketClock::new(Arc::clone(&calendar), clock, window);
        let caches = NseCaches::new(config.cache_size);

        Ok(Self {
            config,
            api,
            calendar,
            market,
            caches,
            session: Mutex::new(None),
            logger,
        })
    }

    /// The configuration the client was built with.
    pub fn config(&self) -> &NseConfig {
        &self.config
    }

    /// `true` when caching must be skipped for a call starting now. A market
    /// state that cannot be determined counts as open.
    async fn cache_bypass(&self) -> bool {
        self.roll_session().await;
        match self.market.is_open().await {
            Ok(open) => open,
            Err(e) => {
                self.logger
                    .warn(&format!("Market state unknown, caching bypassed: {}", e), None)
                    .await;
                true
            }
        }
    }

    /// Drops cached market data once the session has changed since the
    /// previous call.
    async fn roll_session(&self) {
        let mark = self.market.session_mark();
        let previous = self.session.lock().expect("session lock poisoned").replace(mark);
        if previous.is_some_and(|previous| previous != mark) {
            self.caches.clear_market_data();
            self.logger
                .debug(
                    "New market session, cached market data dropped",
                    Some(json!({"date": mark.date.to_string(), "after_open": mark.after_open})),
                )
                .await;
        }
    }

    // ---------------------------------------------------------------------
    // Equity registry
    // ---------------------------------------------------------------------

    async fn stock_codes(&self) -> NseResult<Arc<Vec<StockCode>>> {
        self.caches
            .stock_codes
            .get_or_try_compute((), false, || self.fetch_stock_codes())
            .await
    }

    async fn fetch_stock_codes(&self) -> NseResult<Arc<Vec<StockCode>>> {
        let text = self.api.fetch_text(&self.config.urls.stock_codes).await?;
        let codes = parse_stock_codes(&text)?;
        self.logger
            .debug("NSE equity registry loaded", Some(json!({"symbols": codes.len()})))
            .await;
        Ok(Arc::new(codes))
    }

    /// Every listed equity.
    pub async fn get_stock_codes(&self, as_json: bool) -> NseResult<Rendered<Vec<StockCode>>> {
        let codes = self.stock_codes().await?;
        Rendered::new(codes.as_ref().clone(), as_json)
    }

    /// `true` when `code` is a listed equity symbol (case-insensitive).
    pub async fn is_valid_code(&self, code: &str) -> NseResult<bool> {
        let codes = self.stock_codes().await?;
        Ok(contains_symbol(&codes, code))
    }

    // ---------------------------------------------------------------------
    // Quotes
    // ---------------------------------------------------------------------

    /// Quote page URL for `code`.
    pub fn build_url_for_quote(&self, code: &str) -> NseResult<Url> {
        build_url_for_quote(&self.config.urls.quote, &normalize_code(code))
    }

    /// Headers sent with every upstream request.
    pub fn nse_headers(&self) -> HeaderMap {
        self.api.headers().clone()
    }

    /// Latest quote for one equity. `None` when the symbol is not listed.
    ///
    /// # Errors
    /// [`crate::markets::nse::error::NseError::SymbolNotTraded`] when the page has no usable quote.
    pub async fn get_quote(&self, code: &str, as_json: bool) -> NseResult<Option<Rendered<Quote>>> {
        let bypass = self.cache_bypass().await;
        self.quote(code, bypass)
            .await?
            .map(|quote| Rendered::new(quote, as_json))
            .transpose()
    }

    async fn quote(&self, code: &str, bypass: bool) -> NseResult<Option<Quote>> {
        let code = normalize_code(code);
        self.caches
            .quotes
            .get_or_try_compute(code.clone(), bypass, || self.fetch_quote(&code))
            .await
    }

    async fn fetch_quote(&self, code: &str) -> NseResult<Option<Quote>> {
        if !self.is_valid_code(code).await? {
            return Ok(None);
        }
        let url = self.build_url_for_quote(code)?;
        let html = self.api.fetch_text(url.as_str()).await?;
        parse_quote_page(&html, code).map(Some)
    }

    /// Quotes for several equities, fetched concurrently.
    ///
    /// ## Logic:
    /// 1.  The market state is read once for the whole batch.
    /// 2.  At most `workers_per_cpu * CPUs` quote fetches are in flight.
    /// 3.  Unlisted symbols and symbols without a quote are dropped and logged.
    /// 4.  Transport failures abort the batch.
    pub async fn get_quotes<I, S>(&self, codes: I, as_json: bool) -> NseResult<Rendered<QuoteBatch>>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let bypass = self.cache_bypass().await;
        let codes: Vec<String> = codes.into_iter().map(|c| normalize_code(c.as_ref())).collect();
        let requested = codes.len();

        let outcomes: Vec<(String, NseResult<Option<Quote>>)> = stream::iter(codes)
            .map(|code| async move {
                let outcome = self.quote(&code, bypass).await;
                (code, outcome)
            })
            .buffered(self.config.worker_count())
            .collect()
            .await;

        let mut batch = QuoteBatch::new();
        for (code, outcome) in outcomes {
            match outcome {
                Ok(Some(quote)) => batch.push(code, quote),
                Ok(None) => {
                    self.logger
                        .debug("Skipping unlisted symbol", Some(json!({"symbol": code})))
                        .await
                }
                Err(e) if e.is_per_symbol() => {
                    self.logger
                        .warn(&format!("Skipping {}: {}", code, e), Some(json!({"symbol": code})))
                        .await
                }
                Err(e) => return Err(e),
            }
        }

        self.logger
            .debug(
                "NSE batch quote finished",
                Some(json!({"requested": requested, "returned": batch.len(), "cached": !bypass})),
            )
            .await;
        Rendered::new(batch, as_json)
    }

    // ---------------------------------------------------------------------
    // Peers
    // ---------------------------------------------------------------------

    /// Peer companies of an equity. `None` when the symbol is not listed.
    pub async fn get_peer_companies(&self, code: &str, as_json: bool) -> NseResult<Option<Rendered<Vec<Quote>>>> {
        let code = normalize_code(code);
        let peers = self
            .caches
            .peers
            .get_or_try_compute(code.clone(), false, || self.fetch_peers(&code))
            .await?;
        peers
            .map(|peers| Rendered::new(peers.as_ref().clone(), as_json))
            .transpose()
    }

    async fn fetch_peers(&self, code: &str) -> NseResult<Option<Arc<Vec<Quote>>>> {
        if !self.is_valid_code(code).await? {
            return Ok(None);
        }
        let encoded: String = url::form_urlencoded::byte_serialize(code.as_bytes()).collect();
        let url = format!("{}{}", self.config.urls.peer_companies, encoded);
        let raw = self.api.fetch_text(&url).await?;
        let peers = extract_peers(&raw);
        self.logger
            .debug("NSE peers extracted", Some(json!({"symbol": code, "peers": peers.len()})))
            .await;
        Ok(Some(Arc::new(peers)))
    }

    // ---------------------------------------------------------------------
    // Reports
    // ---------------------------------------------------------------------

    async fn report(&self, kind: ReportKind, bypass: bool) -> NseResult<Arc<Vec<Quote>>> {
        self.caches
            .reports
            .get_or_try_compute(kind, bypass, || self.fetch_report(kind))
            .await
    }

    async fn fetch_report(&self, kind: ReportKind) -> NseResult<Arc<Vec<Quote>>> {
        let rows = self.api.fetch_data_array(kind.url(&self.config.urls)).await?;
        Ok(Arc::new(parse_report_rows(rows)?))
    }

    async fn top_report(&self, kind: ReportKind, bypass: bool) -> NseResult<Report> {
        match kind {
            ReportKind::IndexList => Ok(Report::Names(self.index_names().await?.as_ref().clone())),
            other => Ok(Report::Records(self.report(other, bypass).await?.as_ref().clone())),
        }
    }

    async fn records(&self, kind: ReportKind, as_json: bool) -> NseResult<Rendered<Vec<Quote>>> {
        let bypass = self.cache_bypass().await;
        let rows = self.report(kind, bypass).await?;
        Rendered::new(rows.as_ref().clone(), as_json)
    }

    /// The requested reports, in request order.
    pub async fn get_top(&self, kinds: &[ReportKind], as_json: bool) -> NseResult<Vec<Rendered<Report>>> {
        let bypass = self.cache_bypass().await;
        let mut reports = Vec::with_capacity(kinds.len());
        for &kind in kinds {
            let report = self.top_report(kind, bypass).await?;
            reports.push(Rendered::new(report, as_json)?);
        }
        Ok(reports)
    }

    /// [`Nse::get_top`] by report name (`"GAINERS"`, `"ADVANCES DECLINE"`, ...).
    /// Unknown names are ignored.
    pub async fn get_top_by_name<S: AsRef<str>>(&self, names: &[S], as_json: bool) -> NseResult<Vec<Rendered<Report>>> {
        let mut kinds = Vec::with_capacity(names.len());
        for name in names {
            match ReportKind::from_name(name.as_ref()) {
                Some(kind) => kinds.push(kind),
                None => {
                    self.logger
                        .debug("Ignoring unknown report", Some(json!({"report": name.as_ref()})))
                        .await
                }
            }
        }
        self.get_top(&kinds, as_json).await
    }

    /// One row of a report, looked up by the report's instrument field.
    /// `None` when no row matches or the report has no such field.
    pub async fn get_report_row(&self, kind: ReportKind, key: &str, as_json: bool) -> NseResult<Option<Rendered<Quote>>> {
        let Some(field) = kind.index_field() else {
            return Ok(None);
        };
        let bypass = self.cache_bypass().await;
        let rows = self.report(kind, bypass).await?;
        rows.iter()
            .find(|row| {
                row.get(field)
                    .and_then(Value::as_str)
                    .is_some_and(|value| value.eq_ignore_ascii_case(key.trim()))
            })
            .cloned()
            .map(|row| Rendered::new(row, as_json))
            .transpose()
    }

    /// Top gainers of the day.
    pub async fn get_top_gainers(&self, as_json: bool) -> NseResult<Rendered<Vec<Quote>>> {
        self.records(ReportKind::Gainers, as_json).await
    }

    /// Top losers of the day.
    pub async fn get_top_losers(&self, as_json: bool) -> NseResult<Rendered<Vec<Quote>>> {
        self.records(ReportKind::Losers, as_json).await
    }

    /// Volume spurts.
    pub async fn get_top_volume(&self, as_json: bool) -> NseResult<Rendered<Vec<Quote>>> {
        self.records(ReportKind::Volume, as_json).await
    }

    /// Most active equities by traded value.
    pub async fn get_most_active(&self, as_json: bool) -> NseResult<Rendered<Vec<Quote>>> {
        self.records(ReportKind::Active, as_json).await
    }

    /// Advances and declines per index.
    pub async fn get_advances_declines(&self, as_json: bool) -> NseResult<Rendered<Vec<Quote>>> {
        self.records(ReportKind::AdvancesDeclines, as_json).await
    }

    // ---------------------------------------------------------------------
    // Indices
    // ---------------------------------------------------------------------

    async fn index_names(&self) -> NseResult<Arc<Vec<String>>> {
        self.caches
            .index_names
            .get_or_try_compute((), false, || self.fetch_index_names())
            .await
    }

    async fn fetch_index_names(&self) -> NseResult<Arc<Vec<String>>> {
        let rows = self.api.fetch_data_array(&self.config.urls.index_list).await?;
        Ok(Arc::new(parse_index_names(&rows)?))
    }

    /// Names of every published index.
    pub async fn get_index_list(&self, as_json: bool) -> NseResult<Rendered<Vec<String>>> {
        let names = self.index_names().await?;
        Rendered::new(names.as_ref().clone(), as_json)
    }

    /// `true` when `code` names a published index (case-insensitive).
    pub async fn is_valid_index(&self, code: &str) -> NseResult<bool> {
        let code = normalize_code(code);
        Ok(self.index_names().await?.iter().any(|name| *name == code))
    }

    /// Latest values of one index. `None` when the index is unknown.
    pub async fn get_index_quote(&self, code: &str, as_json: bool) -> NseResult<Option<Rendered<Quote>>> {
        let code = normalize_code(code);
        let bypass = self.cache_bypass().await;
        let quote = self
            .caches
            .index_quotes
            .get_or_try_compute(code.clone(), bypass, || self.fetch_index_quote(&code))
            .await?;
        quote.map(|quote| Rendered::new(quote, as_json)).transpose()
    }

    async fn fetch_index_quote(&self, code: &str) -> NseResult<Option<Quote>> {
        if !self.is_valid_index(code).await? {
            return Ok(None);
        }
        let rows = self.api.fetch_data_array(&self.config.urls.index_list).await?;
        Ok(find_index_quote(rows, code))
    }

    // ---------------------------------------------------------------------
    // Calendar and housekeeping
    // ---------------------------------------------------------------------

    /// Remaining trading holidays and weekends of the current year.
    pub async fn get_holiday_list(&self) -> NseResult<HolidayList> {
        self.calendar.get_holiday_list().await
    }

    /// `true` while the exchange is trading. Never cached.
    pub async fn market_status(&self) -> NseResult<bool> {
        self.market.is_open().await
    }

    /// Drops every memoized answer, including the scraped holiday table.
    pub async fn clear_cache(&self) {
        self.caches.clear();
        self.calendar.clear_cache();
        self.logger.info("NSE caches cleared", None).await;
    }

    /// Usage counters per cache.
    pub fn cache_stats(&self) -> BTreeMap<&'static str, CacheStats> {
        BTreeMap::from([
            ("holidays", self.calendar.stats()),
            ("index_names", self.caches.index_names.stats()),
            ("index_quotes", self.caches.index_quotes.stats()),
            ("peers", self.caches.peers.stats()),
            ("quotes", self.caches.quotes.stats()),
            ("reports", self.caches.reports.stats()),
            ("stock_codes", self.caches.stock_codes.stats()),
        ])
    }
}

impl fmt::Display for Nse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "NSE client (window {} - {} {}, cache size {}, {} workers)",
            self.config.market_open,
            self.config.market_close,
            self.config.timezone,
            self.config.cache_size,
            self.config.worker_count()
        )
    }
}

/// Symbols and index names are matched uppercased and trimmed.
fn normalize_code(code: &str) -> String {
    code.trim().to_uppercase()
}
