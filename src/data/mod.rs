//! Data plumbing around the metrics engine
//!
//! Handles:
//! - Provider JSON normalization into canonical rows
//! - The staleness-aware metrics cache (fresh / stale / expired)
//! - Stale-while-revalidate fetch orchestration
//! - Yahoo Finance chain client
//! - Persisted metrics-history records

pub mod cache;
pub mod history;
pub mod normalize;
pub mod provider;
pub mod service;

pub use cache::*;
pub use history::*;
pub use normalize::*;
pub use provider::*;
pub use service::*;
