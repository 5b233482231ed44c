//! # lib_nse
//!
//! Market data client for the National Stock Exchange of India.
//!
//! Modules are gated by folder features (`configs`, `core`, `loggers`,
//! `markets`, `retrieve`); `full` (the default) enables all of them.

#[cfg(feature = "configs")]
pub mod configs;
#[cfg(feature = "core")]
pub mod core;
#[cfg(feature = "loggers")]
pub mod loggers;
#[cfg(feature = "markets")]
pub mod markets;
#[cfg(feature = "retrieve")]
pub mod retrieve;

// Re-export the everyday surface
#[cfg(feature = "configs")]
pub use configs::config_nse::{NseConfig, NseConfigError, NseUrls};
#[cfg(feature = "loggers")]
pub use loggers::loggerlocal::{LoggerLocal, LoggerLocalOptions};
#[cfg(feature = "markets")]
pub use markets::nse::{Nse, NseError, NseResult, Quote, QuoteBatch, Rendered, Report, ReportKind};
#[cfg(feature = "retrieve")]
pub use retrieve::{Fetch, FetchError};
