//! Metrics Engine
//!
//! Pure derivation of the fourteen market-risk analytics from one chain
//! snapshot: ATM IV, put/call ratios, implied move, max pain, net
//! delta/vega/vanna, gamma walls, term structure, zero gamma, expected moves,
//! dealer gamma, and skew.
//!
//! The engine performs no I/O and reads no clock; the caller threads a single
//! `reference_time` through every time-to-maturity computation, so replaying
//! a historical snapshot is deterministic.

mod chain_stats;
mod config;
mod exposure;

pub use config::EngineConfig;

use chrono::{DateTime, Utc};

use crate::core::{MetricsResult, OptionRow};

/// Main metrics engine
pub struct MetricsEngine {
    config: EngineConfig,
}

impl MetricsEngine {
    /// Create an engine with default configuration
    pub fn new() -> Self {
        Self {
            config: EngineConfig::default(),
        }
    }

    /// Create with custom configuration
    pub fn with_config(config: EngineConfig) -> Self {
        Self { config }
    }

    /// Get current configuration
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Compute all analytics for one snapshot.
    ///
    /// Empty rows or a missing/non-positive spot yield the all-`None` record;
    /// that is the documented empty case, never an error. Each metric fills
    /// in independently, so a sparse chain produces whatever subset is
    /// computable.
    pub fn compute(
        &self,
        symbol: &str,
        rows: &[OptionRow],
        spot: Option<f64>,
        reference_time: DateTime<Utc>,
    ) -> MetricsResult {
        let spot = match spot {
            Some(s) if s > 0.0 => s,
            _ => return MetricsResult::empty(symbol, reference_time),
        };
        if rows.is_empty() {
            return MetricsResult::empty(symbol, reference_time);
        }

        let mut result = MetricsResult::empty(symbol, reference_time);

        if let Some(expiry) = chain_stats::nearest_expiry(rows) {
            let near = chain_stats::rows_at_expiry(rows, expiry);

            result.atm = chain_stats::atm_quote(&near, spot);
            result.put_call_volume_ratio = chain_stats::volume_ratio(&near);
            result.put_call_oi_ratio = chain_stats::oi_ratio(&near);
            result.implied_move = result
                .atm
                .and_then(|atm| chain_stats::implied_move(&near, atm.strike));
            result.max_pain = chain_stats::max_pain(&near);
            result.gamma_walls =
                exposure::gamma_walls(&near, spot, reference_time, self.config.wall_count);
            result.zero_gamma =
                exposure::zero_gamma(&near, spot, reference_time, self.config.zero_gamma_band);
        }

        result.term_structure = chain_stats::term_structure(rows);
        result.expected_moves = chain_stats::expected_moves(
            rows,
            spot,
            reference_time,
            self.config.expected_move_band,
            self.config.expected_move_expiries,
        );
        result.total_delta = exposure::total_delta(rows, spot, reference_time);
        result.total_vega = exposure::total_vega(rows, spot, reference_time);
        result.vanna = exposure::total_vanna(rows, spot, reference_time);
        result.dealer_gamma =
            exposure::dealer_gamma(rows, spot, reference_time, self.config.max_days);
        result.skew = chain_stats::skew(rows, spot);

        result
    }
}

impl Default for MetricsEngine {
    fn default() -> Self {
        Self::new()
    }
}

/// Convenience function: compute all metrics with the default configuration
pub fn compute_metrics(
    symbol: &str,
    rows: &[OptionRow],
    spot: Option<f64>,
    reference_time: DateTime<Utc>,
) -> MetricsResult {
    MetricsEngine::new().compute(symbol, rows, spot, reference_time)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{OptionType, TermShape};
    use chrono::TimeZone;

    fn reference() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 6, 13, 0, 0, 0).unwrap()
    }

    fn row(
        strike: f64,
        ty: OptionType,
        iv: f64,
        oi: u64,
        volume: u64,
        day: u32,
        bid: f64,
        ask: f64,
    ) -> OptionRow {
        OptionRow {
            expiry_utc: Utc.with_ymd_and_hms(2025, 6, day, 0, 0, 0).unwrap(),
            ttm_days: (day as f64) - 13.0,
            strike,
            option_type: ty,
            iv,
            oi,
            volume,
            bid,
            ask,
            last_price: 0.0,
        }
    }

    #[test]
    fn test_empty_inputs_never_throw() {
        let empty = compute_metrics("SPY", &[], Some(450.0), reference());
        assert!(empty.is_unavailable());

        let rows = vec![row(100.0, OptionType::Call, 0.30, 50, 10, 20, 1.0, 1.2)];
        let no_spot = compute_metrics("SPY", &rows, None, reference());
        assert!(no_spot.is_unavailable());

        let bad_spot = compute_metrics("SPY", &rows, Some(0.0), reference());
        assert!(bad_spot.is_unavailable());
    }

    #[test]
    fn test_end_to_end_atm_scenario() {
        // Single ATM call (IV 0.30, OI 50) and put (IV 0.32, OI 40), spot 100,
        // 7 days out
        let rows = vec![
            row(100.0, OptionType::Call, 0.30, 50, 20, 20, 2.0, 2.2),
            row(100.0, OptionType::Put, 0.32, 40, 10, 20, 1.8, 2.0),
        ];

        let result = compute_metrics("TEST", &rows, Some(100.0), reference());

        let atm = result.atm.unwrap();
        assert_eq!(atm.strike, 100.0);
        assert!((atm.iv - 0.31).abs() < 1e-12);
        assert!((result.put_call_oi_ratio.unwrap() - 0.8).abs() < 1e-12);
        assert!((result.put_call_volume_ratio.unwrap() - 0.5).abs() < 1e-12);
        // Straddle mid: 2.1 + 1.9
        assert!((result.implied_move.unwrap() - 4.0).abs() < 1e-12);
        assert_eq!(result.max_pain.unwrap(), 100.0);

        // Greek aggregates all present
        assert!(result.total_delta.is_some());
        assert!(result.total_vega.unwrap() > 0.0);
        assert!(result.dealer_gamma.unwrap() < 0.0);
        assert!(result.vanna.is_some());
    }

    #[test]
    fn test_multi_expiry_fields() {
        let rows = vec![
            row(95.0, OptionType::Put, 0.36, 80, 0, 16, 1.0, 1.2),
            row(100.0, OptionType::Call, 0.34, 100, 0, 16, 2.0, 2.2),
            row(100.0, OptionType::Put, 0.34, 90, 0, 16, 1.9, 2.1),
            row(105.0, OptionType::Call, 0.32, 60, 0, 16, 0.8, 1.0),
            row(100.0, OptionType::Call, 0.26, 120, 0, 27, 3.0, 3.4),
            row(100.0, OptionType::Put, 0.26, 110, 0, 27, 2.8, 3.2),
        ];

        let result = compute_metrics("TEST", &rows, Some(100.0), reference());

        let ts = result.term_structure.unwrap();
        assert_eq!(ts.shape, TermShape::Backwardation);
        assert!(ts.near_iv > ts.far_iv);

        let moves = result.expected_moves.unwrap();
        assert_eq!(moves.len(), 2);
        assert!(moves[0].ttm_days < moves[1].ttm_days);
        assert!(moves[1].dollars > moves[0].dollars);

        // Nearest-expiry-only metrics ignore the day-27 chain
        let walls = result.gamma_walls.unwrap();
        assert!(walls.iter().all(|w| [95.0, 100.0, 105.0].contains(&w.strike)));
    }

    #[test]
    fn test_reference_time_determinism() {
        let rows = vec![
            row(100.0, OptionType::Call, 0.30, 50, 20, 20, 2.0, 2.2),
            row(100.0, OptionType::Put, 0.32, 40, 10, 20, 1.8, 2.0),
        ];

        let a = compute_metrics("TEST", &rows, Some(100.0), reference());
        let b = compute_metrics("TEST", &rows, Some(100.0), reference());
        assert_eq!(a.total_delta, b.total_delta);
        assert_eq!(a.dealer_gamma, b.dealer_gamma);

        // A later reference time shrinks TTM and changes the Greeks
        let later = Utc.with_ymd_and_hms(2025, 6, 18, 0, 0, 0).unwrap();
        let c = compute_metrics("TEST", &rows, Some(100.0), later);
        assert_ne!(a.dealer_gamma, c.dealer_gamma);
    }
}
