//! Core data types for chain-metrics
//!
//! Defines fundamental types:
//! - OptionRow: one normalized contract (strike, expiry, IV, OI, quotes)
//! - OptionsSnapshot: spot + rows as delivered by the fetch path
//! - MetricsResult: the fourteen derived analytics
//! - ChainError: crate error taxonomy

pub mod error;
pub mod metrics;
pub mod row;

pub use error::*;
pub use metrics::*;
pub use row::*;
