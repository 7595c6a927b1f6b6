//! Canonical option-chain rows
//!
//! One immutable `OptionRow` per listed contract, plus the `OptionsSnapshot`
//! bundle handed to the metrics engine. Rows are produced by the normalizer
//! (`data::normalize`) which enforces the validity rules; the engine still
//! re-checks `iv > 0` and positive time-to-maturity before any Greek sum.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Seconds in a 365.25-day year, used for all time-to-maturity conversions.
const SECONDS_PER_YEAR: f64 = 365.25 * 86_400.0;

/// Option type (Call or Put)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OptionType {
    Call,
    Put,
}

impl OptionType {
    /// Payoff direction: +1 for call, -1 for put
    pub fn phi(&self) -> f64 {
        match self {
            OptionType::Call => 1.0,
            OptionType::Put => -1.0,
        }
    }

    /// Intrinsic value at given spot
    pub fn intrinsic(&self, spot: f64, strike: f64) -> f64 {
        match self {
            OptionType::Call => (spot - strike).max(0.0),
            OptionType::Put => (strike - spot).max(0.0),
        }
    }
}

/// A single normalized option contract
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OptionRow {
    /// Expiration instant (UTC)
    pub expiry_utc: DateTime<Utc>,
    /// Days to expiry at snapshot time
    pub ttm_days: f64,
    /// Strike price (> 0)
    pub strike: f64,
    /// Call or put
    pub option_type: OptionType,
    /// Annualized implied volatility, decimal form (> 0)
    pub iv: f64,
    /// Open interest
    pub oi: u64,
    /// Day volume
    pub volume: u64,
    /// Best bid (0 when absent)
    pub bid: f64,
    /// Best ask (0 when absent)
    pub ask: f64,
    /// Last traded price (0 when absent)
    pub last_price: f64,
}

impl OptionRow {
    /// Time to maturity in years from a reference instant (365.25-day year).
    ///
    /// Negative when the contract has already expired relative to
    /// `reference_time`; callers exclude such rows from Greek sums.
    pub fn ttm_years(&self, reference_time: DateTime<Utc>) -> f64 {
        let secs = (self.expiry_utc - reference_time).num_milliseconds() as f64 / 1000.0;
        secs / SECONDS_PER_YEAR
    }

    /// Mid price: `(bid + ask) / 2` when both sides are positive, otherwise
    /// the last traded price when positive, otherwise none.
    pub fn mid_price(&self) -> Option<f64> {
        if self.bid > 0.0 && self.ask > 0.0 {
            Some((self.bid + self.ask) / 2.0)
        } else if self.last_price > 0.0 {
            Some(self.last_price)
        } else {
            None
        }
    }
}

/// A full chain snapshot as delivered by the fetch path
///
/// `spot` is `None` only when the upstream failed entirely; in that case
/// `rows` is empty. A snapshot is never "rows without spot".
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OptionsSnapshot {
    /// Underlying spot price
    pub spot: Option<f64>,
    /// Normalized contract rows
    pub rows: Vec<OptionRow>,
    /// When the upstream data was fetched
    pub fetched_at: DateTime<Utc>,
    /// Whether this snapshot was served from the stale cache path
    pub is_stale: bool,
}

impl OptionsSnapshot {
    pub fn new(spot: f64, rows: Vec<OptionRow>, fetched_at: DateTime<Utc>) -> Self {
        Self {
            spot: Some(spot),
            rows,
            fetched_at,
            is_stale: false,
        }
    }

    /// The total-failure snapshot: no spot, no rows.
    pub fn empty(fetched_at: DateTime<Utc>) -> Self {
        Self {
            spot: None,
            rows: Vec::new(),
            fetched_at,
            is_stale: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn row(bid: f64, ask: f64, last: f64) -> OptionRow {
        OptionRow {
            expiry_utc: Utc.with_ymd_and_hms(2025, 6, 20, 0, 0, 0).unwrap(),
            ttm_days: 7.0,
            strike: 100.0,
            option_type: OptionType::Call,
            iv: 0.30,
            oi: 10,
            volume: 5,
            bid,
            ask,
            last_price: last,
        }
    }

    #[test]
    fn test_option_type() {
        assert_eq!(OptionType::Call.phi(), 1.0);
        assert_eq!(OptionType::Put.phi(), -1.0);

        assert_eq!(OptionType::Call.intrinsic(110.0, 100.0), 10.0);
        assert_eq!(OptionType::Put.intrinsic(90.0, 100.0), 10.0);
        assert_eq!(OptionType::Call.intrinsic(90.0, 100.0), 0.0);
    }

    #[test]
    fn test_mid_price_fallback() {
        // Both sides quoted: use the mid
        assert_eq!(row(1.0, 2.0, 5.0).mid_price(), Some(1.5));
        // One side missing: fall back to last
        assert_eq!(row(0.0, 2.0, 5.0).mid_price(), Some(5.0));
        // Nothing usable
        assert_eq!(row(0.0, 0.0, 0.0).mid_price(), None);
    }

    #[test]
    fn test_ttm_years() {
        let reference = Utc.with_ymd_and_hms(2025, 6, 13, 0, 0, 0).unwrap();
        let r = row(1.0, 2.0, 0.0);

        // 7 days out of a 365.25-day year
        let ttm = r.ttm_years(reference);
        assert!((ttm - 7.0 / 365.25).abs() < 1e-9);

        // Expired relative to a later reference
        let later = Utc.with_ymd_and_hms(2025, 7, 1, 0, 0, 0).unwrap();
        assert!(r.ttm_years(later) < 0.0);
    }

    #[test]
    fn test_empty_snapshot_invariant() {
        let snap = OptionsSnapshot::empty(Utc::now());
        assert!(snap.spot.is_none());
        assert!(snap.rows.is_empty());
        assert!(!snap.is_stale);
    }
}
