//! # NSE Holiday Calendar
//!
//! Scrapes the exchange's trading-holiday table and merges it with the
//! remaining weekends of the current year.
//!
//! The holiday page carries several tables whose rows each start with a
//! serial number. Only the first run of strictly increasing serials is the
//! trading-holiday table; once serials restart, the rows belong to a
//! different table and are ignored.

use crate::core::ConditionalCache;
use crate::loggers::loggerlocal::LoggerLocal;
use crate::markets::nse::apicall::ApiCallNse;
use crate::markets::nse::error::{NseError, NseResult};
use crate::markets::nse::marketstatus::Clock;
use chrono::{Datelike, Duration, NaiveDate, Weekday};
use regex::Regex;
use serde::Serialize;
use serde_json::json;
use static_init::dynamic;
use std::sync::Arc;

#[dynamic(lazy)]
static ROW: Regex = Regex::new(r"(?is)<tr(?:\s[^>]*)?>(.*?)</tr\s*>").expect("row pattern is valid");

#[dynamic(lazy)]
static CELL: Regex = Regex::new(r"(?is)<td(?:\s[^>]*)?>(.*?)</td\s*>").expect("cell pattern is valid");

#[dynamic(lazy)]
static TAG: Regex = Regex::new(r"(?s)<[^>]*>").expect("tag pattern is valid");

/// Date layouts seen in the holiday table, tried in order.
/// Two-digit years come first: `%Y` would otherwise read "26" as year 26.
const FULL_FORMATS: [&str; 10] = [
    "%d-%b-%y",
    "%d-%b-%Y",
    "%d-%B-%Y",
    "%b %d %Y",
    "%B %d %Y",
    "%d %b %Y",
    "%d %B %Y",
    "%Y-%m-%d",
    "%d/%m/%Y",
    "%d.%m.%Y",
];

/// Layouts without a year; the reference year is appended before parsing.
const YEARLESS_FORMATS: [&str; 4] = ["%b %d", "%B %d", "%d-%b", "%d %b"];

/// One row of the holiday table, text already stripped of markup.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HolidayRow {
    /// Serial number from the first cell.
    pub serial: u32,
    /// Date text as shown on the page.
    pub date: String,
    /// Last cell of the row.
    pub description: String,
}

/// Extracts every `<tr>` that looks like a holiday row: at least three cells,
/// the first one an integer serial. The last cell is the description.
pub fn parse_holiday_table(html: &str) -> Vec<HolidayRow> {
    ROW.captures_iter(html)
        .filter_map(|row| {
            let cells: Vec<String> = CELL
                .captures_iter(&row[1])
                .map(|cell| cell_text(&cell[1]))
                .collect();
            if cells.len() < 3 {
                return None;
            }
            let serial = cells[0].parse::<u32>().ok()?;
            Some(HolidayRow {
                serial,
                date: cells[1].clone(),
                description: cells[cells.len() - 1].clone(),
            })
        })
        .collect()
}

/// Visible text of a cell, commas removed and whitespace collapsed.
fn cell_text(raw: &str) -> String {
    let text = TAG.replace_all(raw, " ");
    let text = text
        .replace("&nbsp;", " ")
        .replace("&amp;", "&")
        .replace(',', " ");
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Keeps the rows of the first strictly increasing serial run.
///
/// ## Logic:
/// 1.  Start with `previous = 0`.
/// 2.  A row is accepted when its serial exceeds `previous`; `previous` then
///     advances by one.
/// 3.  Rows whose serial does not exceed `previous` are skipped.
pub fn select_first_run(rows: &[HolidayRow]) -> Vec<&HolidayRow> {
    let mut previous = 0u32;
    let mut accepted = Vec::new();
    for row in rows {
        if row.serial > previous {
            accepted.push(row);
            previous += 1;
        }
    }
    accepted
}

/// Parses a holiday date. Yearless dates fall in `reference_year`.
pub fn parse_holiday_date(text: &str, reference_year: i32) -> NseResult<NaiveDate> {
    let text = text.split_whitespace().collect::<Vec<_>>().join(" ");

    for format in FULL_FORMATS {
        if let Ok(date) = NaiveDate::parse_from_str(&text, format) {
            return Ok(date);
        }
    }

    let with_year = format!("{} {}", text, reference_year);
    for format in YEARLESS_FORMATS {
        if let Ok(date) = NaiveDate::parse_from_str(&with_year, &format!("{} %Y", format)) {
            return Ok(date);
        }
    }

    Err(NseError::parse(format!("unrecognised holiday date '{}'", text)))
}

/// Every Saturday and Sunday from `today` to the end of `today`'s year,
/// in ascending order.
pub fn remaining_weekends(today: NaiveDate) -> Vec<NaiveDate> {
    let year = today.year();
    let offset = (Weekday::Sat.num_days_from_monday() + 7 - today.weekday().num_days_from_monday()) % 7;
    let mut saturday = today + Duration::days(i64::from(offset));

    // A Sunday `today` is not covered by the forward Saturday walk.
    let mut weekends = Vec::new();
    if today.weekday() == Weekday::Sun {
        weekends.push(today);
    }

    while saturday.year() == year {
        weekends.push(saturday);
        let sunday = saturday + Duration::days(1);
        if sunday.year() == year {
            weekends.push(sunday);
        }
        saturday += Duration::days(7);
    }
    weekends
}

/// Dates on which the exchange is closed from `today` to the end of the year.
///
/// Holds the remaining trading holidays followed by the remaining weekends.
/// A date can appear in both parts.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
#[serde(transparent)]
pub struct HolidayList {
    dates: Vec<NaiveDate>,
}

impl HolidayList {
    /// Builds the list from scraped rows as of `today`.
    pub fn build(rows: &[HolidayRow], today: NaiveDate) -> NseResult<Self> {
        let mut dates = Vec::new();
        for row in select_first_run(rows) {
            let date = parse_holiday_date(&row.date, today.year())?;
            if date >= today {
                dates.push(date);
            }
        }
        dates.extend(remaining_weekends(today));
        Ok(Self { dates })
    }

    /// `true` when the exchange is closed on `date`.
    pub fn contains(&self, date: NaiveDate) -> bool {
        self.dates.contains(&date)
    }

    /// Holidays first, then weekends.
    pub fn dates(&self) -> &[NaiveDate] {
        &self.dates
    }

    /// Number of dates, duplicates included.
    pub fn len(&self) -> usize {
        self.dates.len()
    }

    /// `true` when no closed day remains this year.
    pub fn is_empty(&self) -> bool {
        self.dates.is_empty()
    }
}

/// # Holiday Calendar
///
/// Fetches the holiday page once per URL and rebuilds the list against the
/// clock on every call, so past dates never leak into a cached answer.
pub struct HolidayCalendar {
    api: Arc<ApiCallNse>,
    clock: Arc<dyn Clock>,
    url: String,
    rows: ConditionalCache<String, Arc<Vec<HolidayRow>>>,
    logger: Arc<LoggerLocal>,
}

impl HolidayCalendar {
    /// Creates the calendar for the holiday page at `url`.
    pub fn new(api: Arc<ApiCallNse>, clock: Arc<dyn Clock>, url: String, cache_size: usize, logger: Arc<LoggerLocal>) -> Self {
        Self {
            api,
            clock,
            url,
            rows: ConditionalCache::with_capacity(cache_size),
            logger,
        }
    }

    /// Remaining trading holidays and weekends of the current year.
    pub async fn get_holiday_list(&self) -> NseResult<HolidayList> {
        let rows = self
            .rows
            .get_or_try_compute(self.url.clone(), false, || self.fetch_rows())
            .await?;
        HolidayList::build(&rows, self.clock.today())
    }

    async fn fetch_rows(&self) -> NseResult<Arc<Vec<HolidayRow>>> {
        let html = self.api.fetch_text(&self.url).await?;
        let rows = parse_holiday_table(&html);
        self.logger
            .debug("NSE holiday table scraped", Some(json!({"rows": rows.len()})))
            .await;
        Ok(Arc::new(rows))
    }

    /// Forgets the scraped table.
    pub fn clear_cache(&self) {
        self.rows.clear();
    }

    /// Counters of the scraped-table cache.
    pub fn stats(&self) -> crate::core::CacheStats {
        self.rows.stats()
    }
}
