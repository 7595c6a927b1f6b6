//! Derived market-risk analytics
//!
//! `MetricsResult` is the one output record of the metrics engine: fourteen
//! independently-optional analytics over a single chain snapshot. A field is
//! `None` whenever its preconditions are unmet; an all-`None` record is the
//! documented empty case, not an error.
//!
//! Records are immutable after construction and have no identity beyond
//! `(symbol, generated_at)`; recomputation always produces a new instance.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// The at-the-money strike and its implied volatility (nearest expiry)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AtmQuote {
    /// Strike closest to spot (ties prefer the lower strike)
    pub strike: f64,
    /// Average of call/put IV at that strike, or whichever side exists
    pub iv: f64,
}

/// A high-gamma strike: per-strike summed dollar gamma at the nearest expiry
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GammaWall {
    pub strike: f64,
    /// Summed `gamma * spot^2 * 100 * oi` across both option types
    pub dollar_gamma: f64,
}

impl GammaWall {
    /// `"$<strike> (<sign>$<abs-billions-1dp>B)"`
    pub fn format(&self) -> String {
        format!(
            "${} ({}${:.1}B)",
            format_strike(self.strike),
            sign_str(self.dollar_gamma),
            self.dollar_gamma.abs() / 1e9
        )
    }
}

/// Shape of the implied-volatility term structure
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TermShape {
    /// Near-dated IV above far-dated IV
    Backwardation,
    /// Far-dated IV at or above near-dated IV
    Contango,
}

/// OI-weighted IV at the nearest vs. farthest expiry present
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TermStructure {
    pub near_iv: f64,
    pub far_iv: f64,
    pub shape: TermShape,
}

/// One-standard-deviation expected move for a single expiry
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ExpectedMove {
    pub expiry_utc: DateTime<Utc>,
    pub ttm_days: f64,
    /// OI-weighted IV over contracts within the ATM band
    pub iv: f64,
    /// `spot * iv * sqrt(ttm_years)`, in dollars
    pub dollars: f64,
}

/// Full analytics record for one `(symbol, generated_at)` computation
///
/// Every analytic is independently optional; callers request "whatever subset
/// is computable" and never see a partial-computation error.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricsResult {
    pub symbol: String,
    pub generated_at: DateTime<Utc>,

    /// ATM strike and IV at the nearest expiry
    pub atm: Option<AtmQuote>,
    /// Put volume / call volume over nearest-expiry rows
    pub put_call_volume_ratio: Option<f64>,
    /// ATM straddle mid price, dollars
    pub implied_move: Option<f64>,
    /// Strike minimizing aggregate option-holder payoff at expiry
    pub max_pain: Option<f64>,
    /// Put OI / call OI over nearest-expiry rows
    pub put_call_oi_ratio: Option<f64>,
    /// Net dollar delta over all live open interest
    pub total_delta: Option<f64>,
    /// Top strikes by absolute dollar gamma (nearest expiry), descending
    pub gamma_walls: Option<Vec<GammaWall>>,
    /// Near vs. far OI-weighted IV
    pub term_structure: Option<TermStructure>,
    /// Strike near spot where net dealer gamma flips sign
    pub zero_gamma: Option<f64>,
    /// Expected moves for up to the 3 nearest expiries
    pub expected_moves: Option<Vec<ExpectedMove>>,
    /// Net dollar vega per 1 pp IV move
    pub total_vega: Option<f64>,
    /// Net dollar vanna
    pub vanna: Option<f64>,
    /// Negated aggregate dollar gamma (dealers assumed net short)
    pub dealer_gamma: Option<f64>,
    /// Put-side minus call-side IV, percentage points
    pub skew: Option<f64>,
}

impl MetricsResult {
    /// All-`None` record: the empty-input case.
    pub fn empty(symbol: impl Into<String>, generated_at: DateTime<Utc>) -> Self {
        Self {
            symbol: symbol.into(),
            generated_at,
            atm: None,
            put_call_volume_ratio: None,
            implied_move: None,
            max_pain: None,
            put_call_oi_ratio: None,
            total_delta: None,
            gamma_walls: None,
            term_structure: None,
            zero_gamma: None,
            expected_moves: None,
            total_vega: None,
            vanna: None,
            dealer_gamma: None,
            skew: None,
        }
    }

    /// True when no analytic could be computed.
    pub fn is_unavailable(&self) -> bool {
        self.atm.is_none()
            && self.put_call_volume_ratio.is_none()
            && self.implied_move.is_none()
            && self.max_pain.is_none()
            && self.put_call_oi_ratio.is_none()
            && self.total_delta.is_none()
            && self.gamma_walls.is_none()
            && self.term_structure.is_none()
            && self.zero_gamma.is_none()
            && self.expected_moves.is_none()
            && self.total_vega.is_none()
            && self.vanna.is_none()
            && self.dealer_gamma.is_none()
            && self.skew.is_none()
    }

    /// Directional read of net delta: positive = bullish positioning.
    pub fn directional_bias(&self) -> Option<&'static str> {
        self.total_delta.map(|d| {
            if d > 0.0 {
                "bullish"
            } else if d < 0.0 {
                "bearish"
            } else {
                "neutral"
            }
        })
    }

    /// Fixed two-way read of the vanna sign.
    pub fn vanna_interpretation(&self) -> Option<&'static str> {
        self.vanna.map(|v| {
            if v >= 0.0 {
                "rising IV increases delta"
            } else {
                "rising IV decreases delta"
            }
        })
    }

    /// `"<sign>$<abs-billions-1dp>B (<short|long>)"`
    pub fn format_dealer_gamma(&self) -> Option<String> {
        self.dealer_gamma.map(|g| {
            let label = if g < 0.0 { "short" } else { "long" };
            format!("{}${:.1}B ({})", sign_str(g), g.abs() / 1e9, label)
        })
    }

    /// `"<pp-1dp> pp"`
    pub fn format_skew(&self) -> Option<String> {
        self.skew.map(|s| format!("{:.1} pp", s))
    }

    /// `"<sign>$<abs-millions-int>M"`
    pub fn format_total_delta(&self) -> Option<String> {
        self.total_delta.map(format_millions)
    }

    /// `"<sign>$<abs-millions-int>M per 1% IV"`
    pub fn format_total_vega(&self) -> Option<String> {
        self.total_vega.map(|v| format!("{} per 1% IV", format_millions(v)))
    }

    /// `"<sign>$<abs-millions-int>M"`
    pub fn format_vanna(&self) -> Option<String> {
        self.vanna.map(format_millions)
    }
}

fn sign_str(v: f64) -> &'static str {
    if v < 0.0 {
        "-"
    } else {
        "+"
    }
}

fn format_millions(v: f64) -> String {
    format!("{}${:.0}M", sign_str(v), v.abs() / 1e6)
}

/// Strikes print without decimals when whole, one decimal otherwise.
fn format_strike(strike: f64) -> String {
    if (strike - strike.round()).abs() < 1e-9 {
        format!("{:.0}", strike)
    } else {
        format!("{:.1}", strike)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_is_unavailable() {
        let r = MetricsResult::empty("SPY", Utc::now());
        assert!(r.is_unavailable());
        assert!(r.format_dealer_gamma().is_none());
        assert!(r.directional_bias().is_none());
    }

    #[test]
    fn test_dealer_gamma_format() {
        let mut r = MetricsResult::empty("SPY", Utc::now());
        r.dealer_gamma = Some(-1_230_000_000.0);
        assert_eq!(r.format_dealer_gamma().unwrap(), "-$1.2B (short)");

        r.dealer_gamma = Some(400_000_000.0);
        assert_eq!(r.format_dealer_gamma().unwrap(), "+$0.4B (long)");
    }

    #[test]
    fn test_exposure_formats() {
        let mut r = MetricsResult::empty("SPY", Utc::now());
        r.total_delta = Some(152_400_000.0);
        r.total_vega = Some(-38_000_000.0);
        r.vanna = Some(12_000_000.0);
        r.skew = Some(5.04);

        assert_eq!(r.format_total_delta().unwrap(), "+$152M");
        assert_eq!(r.format_total_vega().unwrap(), "-$38M per 1% IV");
        assert_eq!(r.format_vanna().unwrap(), "+$12M");
        assert_eq!(r.format_skew().unwrap(), "5.0 pp");
    }

    #[test]
    fn test_wall_format() {
        let wall = GammaWall {
            strike: 450.0,
            dollar_gamma: 2_100_000_000.0,
        };
        assert_eq!(wall.format(), "$450 (+$2.1B)");

        let half = GammaWall {
            strike: 452.5,
            dollar_gamma: -900_000_000.0,
        };
        assert_eq!(half.format(), "$452.5 (-$0.9B)");
    }

    #[test]
    fn test_bias_and_vanna_labels() {
        let mut r = MetricsResult::empty("QQQ", Utc::now());
        r.total_delta = Some(1.0);
        r.vanna = Some(-1.0);
        assert_eq!(r.directional_bias().unwrap(), "bullish");
        assert_eq!(r.vanna_interpretation().unwrap(), "rising IV decreases delta");

        r.total_delta = Some(0.0);
        assert_eq!(r.directional_bias().unwrap(), "neutral");
    }
}
