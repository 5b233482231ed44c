//! # NSE Integration Module
//!
//! Scrapes and normalizes market data published by the National Stock
//! Exchange of India. The exchange has no formal API: data comes from HTML
//! pages with embedded JavaScript objects, CSV files and loosely formed JSON.
//!
//! ## Contained Modules:
//!
//! - **`client`**: The [`Nse`] facade with market-state aware caching.
//! - **`apicall`**: Request headers and fetch helpers shared by every component.
//! - **`holidays`**: Holiday-table scraping and the remaining-weekends list.
//! - **`marketstatus`**: Clocks, the trading window and the open/closed rule.
//! - **`quote`**: Quote-page extraction and the batch result type.
//! - **`peers`**: Record-by-record extraction of peer companies.
//! - **`reports`**: Top-mover reports and the index list.
//! - **`codes`**: The listed-equity registry.
//! - **`normalizer`**: Text-to-number cleanup of upstream records.
//! - **`scanner`**: Balanced-bracket span finder.
//! - **`render`**: Native or JSON-text results.
//! - **`error`**: The error taxonomy.

pub mod apicall;
pub mod client;
pub mod codes;
pub mod error;
pub mod holidays;
pub mod marketstatus;
pub mod normalizer;
pub mod peers;
pub mod quote;
pub mod render;
pub mod reports;
pub mod scanner;

// --- Public API Re-exports ---
pub use client::Nse;
pub use codes::StockCode;
pub use error::{NseError, NseResult};
pub use holidays::{HolidayCalendar, HolidayList, HolidayRow};
pub use marketstatus::{Clock, ExchangeClock, FixedClock, MarketClock, MarketWindow, SessionMark};
pub use normalizer::Quote;
pub use quote::QuoteBatch;
pub use render::Rendered;
pub use reports::{Report, ReportKind};
