//! Configuration for the metrics engine

use serde::{Deserialize, Serialize};

/// Configuration for metric computation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Day horizon for dealer-gamma aggregation
    /// Rows expiring beyond this many days from the reference time are
    /// excluded from the dealer-gamma sum.
    /// Default: 30.0
    pub max_days: f64,

    /// Number of gamma walls to report (top strikes by |dollar gamma|)
    /// Default: 3
    pub wall_count: usize,

    /// Candidate-strike band for the zero-gamma search, as a fraction of spot
    /// Default: 0.10 (±10%)
    pub zero_gamma_band: f64,

    /// ATM band for per-expiry expected-move IV, as a fraction of spot
    /// Default: 0.05 (±5%)
    pub expected_move_band: f64,

    /// Number of nearest expiries for the expected-move ladder
    /// Default: 3
    pub expected_move_expiries: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_days: 30.0,
            wall_count: 3,
            zero_gamma_band: 0.10,
            expected_move_band: 0.05,
            expected_move_expiries: 3,
        }
    }
}
