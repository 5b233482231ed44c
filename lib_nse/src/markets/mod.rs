//! # Financial Market APIs Module
//!
//! Client implementations for specific market data providers. Each provider
//! module turns the provider's pages and feeds into normalized records and
//! market-state information for the rest of the system.
//!
//! ## Contained Modules:
//!
//! - **`nse`**: National Stock Exchange of India. Equity quotes, top-mover
//!   reports, index quotes, peer companies, the holiday calendar and the
//!   market clock that drives caching.

#![forbid(unsafe_code)]
#![warn(missing_docs, rust_2018_idioms, unused_qualifications)]

/// Client for the National Stock Exchange of India.
pub mod nse;
