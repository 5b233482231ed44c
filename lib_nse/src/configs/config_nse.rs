use std::path::Path;
use std::{fmt, fs};

use chrono::NaiveTime;
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::loggers::loggerlocal::LoggerLocalOptions;

#[derive(Debug, Error)]
pub enum NseConfigError {
    #[error("I/O error occurred: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Invalid JSON5 configuration: {0}")]
    ParseError(String),

    #[error("Unknown timezone: {0}")]
    InvalidTimezone(String),

    #[error("Market window is empty: open {open} is not before close {close}")]
    InvalidWindow { open: NaiveTime, close: NaiveTime },
}

/// Upstream endpoints. All of them are plain configuration; nothing in the
/// client depends on their exact shape beyond the marker texts.
#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(default, rename_all = "camelCase")]
pub struct NseUrls {
    pub base: String,
    pub quote: String,
    pub stock_codes: String,
    pub holidays: String,
    pub top_gainers: String,
    pub top_losers: String,
    pub top_volume: String,
    pub most_active: String,
    pub advances_declines: String,
    pub index_list: String,
    pub peer_companies: String,
}

impl Default for NseUrls {
    fn default() -> Self {
        Self {
            base: "https://www.nseindia.com/".to_string(),
            quote: "https://www.nseindia.com/live_market/dynaContent/live_watch/get_quote/GetQuote.jsp".to_string(),
            stock_codes: "http://www.nseindia.com/content/equities/EQUITY_L.csv".to_string(),
            holidays: "https://www.nseindia.com/products/content/equities/equities/mrkt_timing_holidays.htm".to_string(),
            top_gainers: "http://www.nseindia.com/live_market/dynaContent/live_analysis/gainers/niftyGainers1.json".to_string(),
            top_losers: "http://www.nseindia.com/live_market/dynaContent/live_analysis/losers/niftyLosers1.json".to_string(),
            top_volume: "http://www.nseindia.com/live_market/dynaContent/live_analysis/volume_spurts/volume_spurts.json".to_string(),
            most_active: "https://nseindia.com/live_market/dynaContent/live_analysis/most_active/allTopValue1.json".to_string(),
            advances_declines: "http://www.nseindia.com/common/json/indicesAdvanceDeclines.json".to_string(),
            index_list: "http://www.nseindia.com/homepage/Indices1.json".to_string(),
            peer_companies: "https://nseindia.com/live_market/dynaContent/live_watch/get_quote/ajaxPeerCompanies.jsp?symbol=".to_string(),
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(default, rename_all = "camelCase")]
pub struct NseConfig {
    pub urls: NseUrls,
    pub user_agent: String,
    pub referer: String,
    /// IANA name of the exchange's timezone; the market window is read in it.
    pub timezone: String,
    pub market_open: NaiveTime,
    pub market_close: NaiveTime,
    /// Capacity of each market-data cache.
    pub cache_size: usize,
    /// Capacity of the holiday-page cache.
    pub holiday_cache_size: usize,
    /// Batch fetches run at most `workers_per_cpu * available CPUs` requests at once.
    pub workers_per_cpu: usize,
    pub http_timeout_secs: u64,
    /// Transport-level retries for transient failures. The client itself never retries.
    pub http_max_retries: u32,
    pub logger: LoggerLocalOptions,
}

impl Default for NseConfig {
    fn default() -> Self {
        Self {
            urls: NseUrls::default(),
            user_agent: "Mozilla/5.0 (Windows NT 6.1; WOW64; rv:28.0) Gecko/20100101 Firefox/28.0".to_string(),
            referer: "https://www.nseindia.com/live_market/dynaContent/live_watch/get_quote/GetQuote.jsp?symbol=INFY&illiquid=0&smeFlag=0&itpFlag=0".to_string(),
            timezone: "Asia/Kolkata".to_string(),
            market_open: NaiveTime::from_hms_opt(9, 15, 0).unwrap_or(NaiveTime::MIN),
            market_close: NaiveTime::from_hms_opt(15, 30, 0).unwrap_or(NaiveTime::MIN),
            cache_size: 64,
            holiday_cache_size: 2,
            workers_per_cpu: 2,
            http_timeout_secs: 30,
            http_max_retries: 0,
            logger: LoggerLocalOptions::console(),
        }
    }
}

impl NseConfig {
    /// Reads a JSON5 configuration file. Missing fields take their defaults.
    pub fn from_file(path: &Path) -> Result<Self, NseConfigError> {
        let text = fs::read_to_string(path)?;
        Self::from_json5_str(&text)
    }

    /// Parses JSON5 text. Missing fields take their defaults.
    pub fn from_json5_str(text: &str) -> Result<Self, NseConfigError> {
        let config: NseConfig =
            serde_json5::from_str(text).map_err(|e| NseConfigError::ParseError(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Checks the fields that cannot be expressed through types alone.
    pub fn validate(&self) -> Result<(), NseConfigError> {
        self.tz()?;
        if self.market_open >= self.market_close {
            return Err(NseConfigError::InvalidWindow {
                open: self.market_open,
                close: self.market_close,
            });
        }
        Ok(())
    }

    /// The configured exchange timezone.
    pub fn tz(&self) -> Result<Tz, NseConfigError> {
        self.timezone
            .parse::<Tz>()
            .map_err(|_| NseConfigError::InvalidTimezone(self.timezone.clone()))
    }

    /// Upper bound on concurrent quote fetches in a batch.
    pub fn worker_count(&self) -> usize {
        let cpus = std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(1);
        (cpus * self.workers_per_cpu).max(1)
    }
}

impl fmt::Display for NseConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "NseConfig
    Timezone: {},
    Market window: {} - {},
    Cache size: {} (holidays: {}),
    Workers per CPU: {},
    HTTP timeout: {}s, retries: {}
",
            self.timezone,
            self.market_open,
            self.market_close,
            self.cache_size,
            self.holiday_cache_size,
            self.workers_per_cpu,
            self.http_timeout_secs,
            self.http_max_retries
        )
    }
}
