//! # Chain Metrics - Options-Chain Market-Risk Analytics
//!
//! Derives a fixed set of market-risk analytics from a raw options-chain
//! snapshot plus an underlying spot price: dealer gamma, skew, ATM implied
//! volatility, put/call ratios, max pain, net delta/vega/vanna, gamma walls,
//! the IV term structure, the zero-gamma level, and multi-expiry expected
//! moves.
//!
//! ## Key Components
//!
//! - **Normalization**: provider JSON → canonical `OptionRow`s, dropping
//!   malformed contracts row-by-row
//! - **Black-Scholes primitives**: d1/d2, the rational normal-CDF
//!   approximation, per-contract delta/gamma/vega/vanna
//! - **Metrics Engine**: a pure, clock-free derivation of fourteen
//!   independently-optional analytics
//! - **Staleness-aware cache**: fresh / stale / expired entries with
//!   injectable time
//! - **Fetch orchestration**: the stale-while-revalidate read path over an
//!   upstream chain provider
//!
//! ## Usage
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use chain_metrics::prelude::*;
//!
//! let client = YahooChainClient::new().unwrap();
//! let cache = Arc::new(MetricsCache::default());
//! let service = ChainService::new(client, cache);
//!
//! let outcome = service.metrics_for("SPY");
//! if let Some(line) = outcome.result.format_dealer_gamma() {
//!     println!("dealer gamma: {}", line);
//! }
//! ```
//!
//! ## What This Crate Does NOT Do
//!
//! - Reconstruct historical option chains (upstream data is always a
//!   current snapshot)
//! - Exchange connectivity or order routing
//! - Multi-underlying portfolio aggregation

pub mod core;
pub mod data;
pub mod engine;
pub mod models;

/// Prelude with commonly used types
pub mod prelude {
    // Core types
    pub use crate::core::{
        AtmQuote, ChainError, ChainResult, ExpectedMove, GammaWall, MetricsResult, OptionRow,
        OptionType, OptionsSnapshot, TermShape, TermStructure,
    };

    // Engine
    pub use crate::engine::{compute_metrics, EngineConfig, MetricsEngine};

    // Black-Scholes primitives
    pub use crate::models::black_scholes::{
        d1, d2, delta as bs_delta, gamma as bs_gamma, norm_cdf, norm_pdf, vanna as bs_vanna,
        vega as bs_vega,
    };

    // Data plumbing
    pub use crate::data::{
        normalize_snapshot, CacheKey, CachePolicy, CacheState, ChainService, Clock, DataFreshness,
        FetchConfig, HistoryStore, MetricsCache, MetricsHistoryRecord, MetricsOutcome,
        RawChainDocument, SnapshotSource, SystemClock, YahooChainClient,
    };
}

// Re-export main types at crate root
pub use crate::core::{ChainError, ChainResult, MetricsResult};
pub use crate::engine::{compute_metrics, MetricsEngine};
