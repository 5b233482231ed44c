//! # Configuration Modules
//!
//! Configuration for the market clients, loadable from JSON5 files.

/// NSE client configuration: endpoints, market window, cache sizes and transport tuning.
pub mod config_nse;
