//! Open-interest-weighted Greek exposure aggregates
//!
//! Dealer gamma, net delta/vega/vanna, gamma walls, and the zero-gamma
//! search. All sums run over live rows only: `oi > 0`, `iv > 0`, positive
//! time to maturity at the reference instant. Expired or zero-IV rows are
//! excluded before any primitive call, never zero-filled into a sum.

use chrono::{DateTime, Utc};

use crate::core::{GammaWall, OptionRow, OptionType};
use crate::models::black_scholes;

use super::chain_stats::distinct_strikes;

/// Contract multiplier for US equity options.
const CONTRACT_MULTIPLIER: f64 = 100.0;

fn is_live(row: &OptionRow, ttm_years: f64) -> bool {
    row.oi > 0 && row.iv > 0.0 && ttm_years > 0.0
}

/// Net dollar delta over all live rows:
/// `sum(delta * oi * 100 * spot)`. Positive = bullish positioning.
pub fn total_delta(rows: &[OptionRow], spot: f64, reference_time: DateTime<Utc>) -> Option<f64> {
    aggregate(rows, reference_time, |row, ttm| {
        black_scholes::delta(spot, row.strike, ttm, row.iv, row.option_type)
            * row.oi as f64
            * CONTRACT_MULTIPLIER
            * spot
    })
}

/// Net dollar vega per 1 pp IV move over all live rows:
/// `sum(vega * oi * 100)`. Positive = net long volatility.
pub fn total_vega(rows: &[OptionRow], spot: f64, reference_time: DateTime<Utc>) -> Option<f64> {
    aggregate(rows, reference_time, |row, ttm| {
        black_scholes::vega(spot, row.strike, ttm, row.iv) * row.oi as f64 * CONTRACT_MULTIPLIER
    })
}

/// Net dollar vanna over all live rows: `sum(vanna * oi * 100 * spot)`.
pub fn total_vanna(rows: &[OptionRow], spot: f64, reference_time: DateTime<Utc>) -> Option<f64> {
    aggregate(rows, reference_time, |row, ttm| {
        black_scholes::vanna(spot, row.strike, ttm, row.iv)
            * row.oi as f64
            * CONTRACT_MULTIPLIER
            * spot
    })
}

/// Dealer gamma: `-sum(gamma * spot^2 * 100 * oi)` over live rows expiring
/// within `max_days` of the reference time. Negated by convention (dealers
/// assumed net short gamma); negative = dealers short.
pub fn dealer_gamma(
    rows: &[OptionRow],
    spot: f64,
    reference_time: DateTime<Utc>,
    max_days: f64,
) -> Option<f64> {
    let horizon_years = max_days / 365.25;
    let mut any = false;
    let mut sum = 0.0;
    for row in rows {
        let ttm = row.ttm_years(reference_time);
        if !is_live(row, ttm) || ttm > horizon_years {
            continue;
        }
        any = true;
        sum += black_scholes::gamma(spot, row.strike, ttm, row.iv)
            * spot
            * spot
            * CONTRACT_MULTIPLIER
            * row.oi as f64;
    }
    if any {
        Some(-sum)
    } else {
        None
    }
}

/// Gamma walls: per-strike summed dollar gamma over nearest-expiry rows,
/// reported as the top `count` strikes by `|dollar gamma|`, descending.
/// Call OI contributes positive dollar gamma, put OI negative.
pub fn gamma_walls(
    near: &[&OptionRow],
    spot: f64,
    reference_time: DateTime<Utc>,
    count: usize,
) -> Option<Vec<GammaWall>> {
    let strikes = distinct_strikes(near);
    let mut walls: Vec<GammaWall> = Vec::new();

    for &strike in &strikes {
        let mut dollar_gamma = 0.0;
        let mut any = false;
        for row in near.iter().filter(|r| (r.strike - strike).abs() < 1e-6) {
            let ttm = row.ttm_years(reference_time);
            if !is_live(row, ttm) {
                continue;
            }
            any = true;
            dollar_gamma += row.option_type.phi()
                * black_scholes::gamma(spot, row.strike, ttm, row.iv)
                * spot
                * spot
                * CONTRACT_MULTIPLIER
                * row.oi as f64;
        }
        if any {
            walls.push(GammaWall {
                strike,
                dollar_gamma,
            });
        }
    }

    if walls.is_empty() {
        return None;
    }

    walls.sort_by(|a, b| {
        b.dollar_gamma
            .abs()
            .partial_cmp(&a.dollar_gamma.abs())
            .unwrap()
            .then(a.strike.partial_cmp(&b.strike).unwrap())
    });
    walls.truncate(count);
    Some(walls)
}

/// Zero-gamma level: among nearest-expiry strikes within `±band` of spot,
/// the candidate minimizing `|net gamma|` when every nearest-expiry contract
/// is revalued with spot moved to the candidate. Calls contribute positive
/// gamma, puts negative, so the net crosses zero between call- and put-heavy
/// strike regions. Requires at least two candidate strikes and at least one
/// live row; a chain of dead rows has no net gamma to flip.
pub fn zero_gamma(
    near: &[&OptionRow],
    spot: f64,
    reference_time: DateTime<Utc>,
    band: f64,
) -> Option<f64> {
    let live: Vec<&OptionRow> = near
        .iter()
        .copied()
        .filter(|r| is_live(r, r.ttm_years(reference_time)))
        .collect();
    if live.is_empty() {
        return None;
    }

    let lo = spot * (1.0 - band);
    let hi = spot * (1.0 + band);
    let candidates: Vec<f64> = distinct_strikes(near)
        .into_iter()
        .filter(|&k| k >= lo && k <= hi)
        .collect();
    if candidates.len() < 2 {
        return None;
    }

    let mut best: Option<(f64, f64)> = None;
    for &candidate in &candidates {
        let net: f64 = live
            .iter()
            .map(|r| {
                r.option_type.phi()
                    * black_scholes::gamma(candidate, r.strike, r.ttm_years(reference_time), r.iv)
                    * candidate
                    * candidate
                    * CONTRACT_MULTIPLIER
                    * r.oi as f64
            })
            .sum();
        match best {
            Some((_, best_net)) if net.abs() >= best_net => {}
            _ => best = Some((candidate, net.abs())),
        }
    }
    best.map(|(k, _)| k)
}

fn aggregate(
    rows: &[OptionRow],
    reference_time: DateTime<Utc>,
    term: impl Fn(&OptionRow, f64) -> f64,
) -> Option<f64> {
    let mut any = false;
    let mut sum = 0.0;
    for row in rows {
        let ttm = row.ttm_years(reference_time);
        if !is_live(row, ttm) {
            continue;
        }
        any = true;
        sum += term(row, ttm);
    }
    if any {
        Some(sum)
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn reference() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 6, 13, 0, 0, 0).unwrap()
    }

    fn row(strike: f64, ty: OptionType, iv: f64, oi: u64, day: u32) -> OptionRow {
        OptionRow {
            expiry_utc: Utc.with_ymd_and_hms(2025, 6, day, 0, 0, 0).unwrap(),
            ttm_days: (day as f64) - 13.0,
            strike,
            option_type: ty,
            iv,
            oi,
            volume: 0,
            bid: 0.0,
            ask: 0.0,
            last_price: 0.0,
        }
    }

    #[test]
    fn test_total_delta_sign() {
        // Call-heavy chain: positive net delta
        let rows = vec![
            row(100.0, OptionType::Call, 0.30, 100, 20),
            row(100.0, OptionType::Put, 0.30, 10, 20),
        ];
        let delta = total_delta(&rows, 100.0, reference()).unwrap();
        assert!(delta > 0.0);

        // Put-heavy chain: negative net delta
        let rows = vec![
            row(100.0, OptionType::Call, 0.30, 10, 20),
            row(100.0, OptionType::Put, 0.30, 100, 20),
        ];
        assert!(total_delta(&rows, 100.0, reference()).unwrap() < 0.0);
    }

    #[test]
    fn test_dead_rows_do_not_move_aggregates() {
        let live = vec![
            row(100.0, OptionType::Call, 0.30, 100, 20),
            row(105.0, OptionType::Put, 0.32, 50, 20),
        ];
        let mut polluted = live.clone();
        // One expired row and one zero-IV row
        polluted.push(row(100.0, OptionType::Call, 0.30, 1000, 10));
        polluted.push(row(100.0, OptionType::Call, 0.0, 1000, 20));

        let r = reference();
        for (a, b) in [
            (total_delta(&live, 100.0, r), total_delta(&polluted, 100.0, r)),
            (total_vega(&live, 100.0, r), total_vega(&polluted, 100.0, r)),
            (total_vanna(&live, 100.0, r), total_vanna(&polluted, 100.0, r)),
            (
                dealer_gamma(&live, 100.0, r, 30.0),
                dealer_gamma(&polluted, 100.0, r, 30.0),
            ),
        ] {
            assert!((a.unwrap() - b.unwrap()).abs() < 1e-9);
        }
    }

    #[test]
    fn test_no_live_rows_is_unavailable() {
        let rows = vec![row(100.0, OptionType::Call, 0.30, 0, 20)];
        assert!(total_delta(&rows, 100.0, reference()).is_none());
        assert!(dealer_gamma(&rows, 100.0, reference(), 30.0).is_none());
    }

    #[test]
    fn test_dealer_gamma_is_negated() {
        let rows = vec![row(100.0, OptionType::Call, 0.30, 100, 20)];
        // Raw gamma is positive, so the dealer convention flips it negative
        assert!(dealer_gamma(&rows, 100.0, reference(), 30.0).unwrap() < 0.0);
    }

    #[test]
    fn test_dealer_gamma_horizon() {
        let near = vec![row(100.0, OptionType::Call, 0.30, 100, 20)];
        let mut with_far = near.clone();
        with_far.push(row(100.0, OptionType::Call, 0.30, 100, 30));

        // 4-day horizon excludes the day-30 expiry
        let a = dealer_gamma(&near, 100.0, reference(), 4.0).unwrap();
        let b = dealer_gamma(&with_far, 100.0, reference(), 4.0).unwrap();
        assert!((a - b).abs() < 1e-9);
    }

    #[test]
    fn test_gamma_walls_top_by_magnitude() {
        let rows = vec![
            row(95.0, OptionType::Put, 0.30, 50, 20),
            row(100.0, OptionType::Call, 0.30, 500, 20),
            row(105.0, OptionType::Call, 0.30, 200, 20),
            row(110.0, OptionType::Call, 0.30, 20, 20),
        ];
        let near: Vec<&OptionRow> = rows.iter().collect();

        let walls = gamma_walls(&near, 100.0, reference(), 3).unwrap();
        assert_eq!(walls.len(), 3);
        // Biggest wall is the 500-lot ATM strike
        assert_eq!(walls[0].strike, 100.0);
        assert!(walls[0].dollar_gamma.abs() >= walls[1].dollar_gamma.abs());
        assert!(walls[1].dollar_gamma.abs() >= walls[2].dollar_gamma.abs());
    }

    #[test]
    fn test_zero_gamma_flips_between_put_and_call_mass() {
        // Put OI stacked low, call OI stacked high: the flip sits between
        let rows = vec![
            row(92.0, OptionType::Put, 0.30, 400, 20),
            row(96.0, OptionType::Put, 0.30, 300, 20),
            row(100.0, OptionType::Call, 0.30, 100, 20),
            row(104.0, OptionType::Call, 0.30, 300, 20),
            row(108.0, OptionType::Call, 0.30, 400, 20),
        ];
        let near: Vec<&OptionRow> = rows.iter().collect();

        let level = zero_gamma(&near, 100.0, reference(), 0.10).unwrap();
        assert!(level > 92.0 && level < 108.0);
    }

    #[test]
    fn test_zero_gamma_needs_live_rows() {
        // Plenty of in-band candidate strikes, but zero open interest
        // everywhere: no level, not the lowest candidate
        let rows = vec![
            row(95.0, OptionType::Put, 0.30, 0, 20),
            row(100.0, OptionType::Call, 0.30, 0, 20),
            row(105.0, OptionType::Call, 0.30, 0, 20),
        ];
        let near: Vec<&OptionRow> = rows.iter().collect();
        assert!(zero_gamma(&near, 100.0, reference(), 0.10).is_none());

        // Same strikes with OI, but the reference time is past expiry
        let rows = vec![
            row(95.0, OptionType::Put, 0.30, 100, 20),
            row(100.0, OptionType::Call, 0.30, 100, 20),
            row(105.0, OptionType::Call, 0.30, 100, 20),
        ];
        let near: Vec<&OptionRow> = rows.iter().collect();
        let late = Utc.with_ymd_and_hms(2025, 6, 25, 0, 0, 0).unwrap();
        assert!(zero_gamma(&near, 100.0, late, 0.10).is_none());
    }

    #[test]
    fn test_zero_gamma_needs_two_candidates() {
        let rows = vec![row(100.0, OptionType::Call, 0.30, 100, 20)];
        let near: Vec<&OptionRow> = rows.iter().collect();
        assert!(zero_gamma(&near, 100.0, reference(), 0.10).is_none());
    }
}
