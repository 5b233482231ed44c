//! # Core Engine Module
//!
//! Shared building blocks that are not tied to a particular exchange.
//!
//! ## Core Components:
//!
//! - **`cache`**: Bounded, market-state aware memoization. Callers decide per
//!   call whether caching applies; concurrent callers of the same key share a
//!   single upstream computation.

#![forbid(unsafe_code)]
#![warn(missing_docs, rust_2018_idioms, unused_qualifications)]

/// Market-state aware LRU memoization.
pub mod cache;

// --- Public API Re-exports ---
pub use cache::{CacheStats, CacheStore, ConditionalCache, LruStore, DEFAULT_CAPACITY};
