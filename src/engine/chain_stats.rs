//! Chain statistics: ATM IV, ratios, implied move, max pain, term structure,
//! expected moves, and skew
//!
//! Most ratio metrics operate on the nearest-expiry subset of the chain, not
//! the whole snapshot; the term structure, expected-move ladder, and skew look
//! across expiries. Every function returns `None` when its preconditions are
//! unmet instead of erroring.

use chrono::{DateTime, Utc};

use crate::core::{ExpectedMove, OptionRow, OptionType, TermShape, TermStructure};

/// Seconds in a 365.25-day year.
const SECONDS_PER_YEAR: f64 = 365.25 * 86_400.0;

/// Strikes closer than this are treated as the same strike.
const STRIKE_EPS: f64 = 1e-6;

/// Earliest expiry present in the chain.
pub(crate) fn nearest_expiry(rows: &[OptionRow]) -> Option<DateTime<Utc>> {
    rows.iter().map(|r| r.expiry_utc).min()
}

/// Distinct expiries, ascending.
pub(crate) fn distinct_expiries(rows: &[OptionRow]) -> Vec<DateTime<Utc>> {
    let mut expiries: Vec<DateTime<Utc>> = rows.iter().map(|r| r.expiry_utc).collect();
    expiries.sort();
    expiries.dedup();
    expiries
}

/// Rows belonging to one expiry.
pub(crate) fn rows_at_expiry(rows: &[OptionRow], expiry: DateTime<Utc>) -> Vec<&OptionRow> {
    rows.iter().filter(|r| r.expiry_utc == expiry).collect()
}

/// Distinct strikes across a row subset, ascending.
pub(crate) fn distinct_strikes(rows: &[&OptionRow]) -> Vec<f64> {
    let mut strikes: Vec<f64> = rows.iter().map(|r| r.strike).collect();
    strikes.sort_by(|a, b| a.partial_cmp(b).unwrap());
    strikes.dedup_by(|a, b| (*a - *b).abs() < STRIKE_EPS);
    strikes
}

fn year_fraction(expiry: DateTime<Utc>, reference_time: DateTime<Utc>) -> f64 {
    (expiry - reference_time).num_milliseconds() as f64 / 1000.0 / SECONDS_PER_YEAR
}

/// ATM strike and IV over nearest-expiry rows.
///
/// The ATM strike minimizes `|strike - spot|`; when two strikes are
/// equidistant the lower strike wins. The IV is the call/put average at that
/// strike when both legs carry a usable IV, otherwise whichever side exists.
pub fn atm_quote(near: &[&OptionRow], spot: f64) -> Option<crate::core::AtmQuote> {
    let strikes = distinct_strikes(near);
    let strike = strikes.into_iter().min_by(|a, b| {
        let da = (a - spot).abs();
        let db = (b - spot).abs();
        da.partial_cmp(&db)
            .unwrap()
            .then(a.partial_cmp(b).unwrap())
    })?;

    let leg_iv = |ty: OptionType| {
        near.iter()
            .find(|r| r.option_type == ty && (r.strike - strike).abs() < STRIKE_EPS && r.iv > 0.0)
            .map(|r| r.iv)
    };

    let iv = match (leg_iv(OptionType::Call), leg_iv(OptionType::Put)) {
        (Some(c), Some(p)) => (c + p) / 2.0,
        (Some(c), None) => c,
        (None, Some(p)) => p,
        (None, None) => return None,
    };

    Some(crate::core::AtmQuote { strike, iv })
}

/// Put volume / call volume over nearest-expiry rows; `None` when the call
/// side has zero volume.
pub fn volume_ratio(near: &[&OptionRow]) -> Option<f64> {
    let call: u64 = sum_by_type(near, OptionType::Call, |r| r.volume);
    let put: u64 = sum_by_type(near, OptionType::Put, |r| r.volume);
    if call == 0 {
        return None;
    }
    Some(put as f64 / call as f64)
}

/// Put OI / call OI over nearest-expiry rows; `None` when the call side has
/// zero open interest.
pub fn oi_ratio(near: &[&OptionRow]) -> Option<f64> {
    let call: u64 = sum_by_type(near, OptionType::Call, |r| r.oi);
    let put: u64 = sum_by_type(near, OptionType::Put, |r| r.oi);
    if call == 0 {
        return None;
    }
    Some(put as f64 / call as f64)
}

fn sum_by_type(rows: &[&OptionRow], ty: OptionType, f: impl Fn(&OptionRow) -> u64) -> u64 {
    rows.iter()
        .filter(|r| r.option_type == ty)
        .map(|r| f(r))
        .sum()
}

/// ATM straddle mid price: call mid + put mid at the ATM strike. `None`
/// unless both legs have a positive mid.
pub fn implied_move(near: &[&OptionRow], atm_strike: f64) -> Option<f64> {
    let leg_mid = |ty: OptionType| {
        near.iter()
            .find(|r| r.option_type == ty && (r.strike - atm_strike).abs() < STRIKE_EPS)
            .and_then(|r| r.mid_price())
    };

    let call = leg_mid(OptionType::Call)?;
    let put = leg_mid(OptionType::Put)?;
    Some(call + put)
}

/// Max pain: the nearest-expiry strike minimizing total option-holder payoff
/// at expiry, `sum(intrinsic(contract, spot=k) * oi * 100)` over all
/// nearest-expiry contracts. Ties resolve to the lower strike.
pub fn max_pain(near: &[&OptionRow]) -> Option<f64> {
    let strikes = distinct_strikes(near);
    // O(strikes x contracts); chains run to a few hundred rows.
    let mut best: Option<(f64, f64)> = None;
    for &k in &strikes {
        let payoff: f64 = near
            .iter()
            .map(|r| r.option_type.intrinsic(k, r.strike) * r.oi as f64 * 100.0)
            .sum();
        match best {
            Some((_, best_payoff)) if payoff >= best_payoff => {}
            _ => best = Some((k, payoff)),
        }
    }
    best.map(|(k, _)| k)
}

/// OI-weighted average IV at one expiry; `None` when no open interest backs
/// any positive-IV row there.
fn oi_weighted_iv(rows: &[&OptionRow]) -> Option<f64> {
    let mut weight = 0.0;
    let mut weighted = 0.0;
    for r in rows.iter().filter(|r| r.iv > 0.0) {
        weight += r.oi as f64;
        weighted += r.iv * r.oi as f64;
    }
    if weight <= 0.0 {
        return None;
    }
    Some(weighted / weight)
}

/// IV term structure: OI-weighted IV at the nearest vs. farthest expiry.
/// Requires at least two distinct expiries and positive OI at both ends.
pub fn term_structure(rows: &[OptionRow]) -> Option<TermStructure> {
    let expiries = distinct_expiries(rows);
    if expiries.len() < 2 {
        return None;
    }

    let near = oi_weighted_iv(&rows_at_expiry(rows, expiries[0]))?;
    let far = oi_weighted_iv(&rows_at_expiry(rows, *expiries.last().unwrap()))?;

    let shape = if near > far {
        TermShape::Backwardation
    } else {
        TermShape::Contango
    };

    Some(TermStructure {
        near_iv: near,
        far_iv: far,
        shape,
    })
}

/// Expected moves for up to `count` nearest expiries.
///
/// Per expiry: OI-weighted IV over contracts within `±band` of spot, then
/// `spot * iv * sqrt(ttm_years)`. An expiry with no qualifying contracts, no
/// backing OI, or a non-finite IV is skipped rather than zero-filled.
pub fn expected_moves(
    rows: &[OptionRow],
    spot: f64,
    reference_time: DateTime<Utc>,
    band: f64,
    count: usize,
) -> Option<Vec<ExpectedMove>> {
    let mut expiries = distinct_expiries(rows);
    expiries.truncate(count);

    let lo = spot * (1.0 - band);
    let hi = spot * (1.0 + band);

    let mut moves = Vec::new();
    for expiry in expiries {
        let ttm_years = year_fraction(expiry, reference_time);
        if ttm_years <= 0.0 {
            continue;
        }

        let banded: Vec<&OptionRow> = rows
            .iter()
            .filter(|r| r.expiry_utc == expiry && r.strike >= lo && r.strike <= hi)
            .collect();

        let iv = match oi_weighted_iv(&banded) {
            Some(iv) if iv.is_finite() && iv > 0.0 => iv,
            _ => continue,
        };

        moves.push(ExpectedMove {
            expiry_utc: expiry,
            ttm_days: ttm_years * 365.25,
            iv,
            dollars: spot * iv * ttm_years.sqrt(),
        });
    }

    if moves.is_empty() {
        None
    } else {
        Some(moves)
    }
}

/// Skew: put-side IV at `0.9 * spot` minus call-side IV at `1.1 * spot`, in
/// percentage points.
///
/// Each side linearly interpolates between the bracketing strikes of its own
/// sorted strike list; with no bracket the nearer single-sided value is used.
/// `None` when either side has zero candidates.
pub fn skew(rows: &[OptionRow], spot: f64) -> Option<f64> {
    let put = side_iv(rows, OptionType::Put, spot * 0.9)?;
    let call = side_iv(rows, OptionType::Call, spot * 1.1)?;
    Some((put - call) * 100.0)
}

fn side_iv(rows: &[OptionRow], ty: OptionType, target: f64) -> Option<f64> {
    // Collapse duplicate strikes (multiple expiries) to their mean IV so the
    // walk sees a strictly increasing strike list.
    let mut quotes: Vec<(f64, f64)> = rows
        .iter()
        .filter(|r| r.option_type == ty && r.iv > 0.0)
        .map(|r| (r.strike, r.iv))
        .collect();
    if quotes.is_empty() {
        return None;
    }
    quotes.sort_by(|a, b| a.0.partial_cmp(&b.0).unwrap());

    let mut points: Vec<(f64, f64)> = Vec::with_capacity(quotes.len());
    for (strike, iv) in quotes {
        match points.last_mut() {
            Some((last_strike, last_iv)) if (strike - *last_strike).abs() < STRIKE_EPS => {
                *last_iv = (*last_iv + iv) / 2.0;
            }
            _ => points.push((strike, iv)),
        }
    }

    if target <= points[0].0 {
        return Some(points[0].1);
    }
    if target >= points[points.len() - 1].0 {
        return Some(points[points.len() - 1].1);
    }

    for pair in points.windows(2) {
        let (k0, iv0) = pair[0];
        let (k1, iv1) = pair[1];
        if k0 <= target && target <= k1 {
            let frac = (target - k0) / (k1 - k0);
            return Some(iv0 + frac * (iv1 - iv0));
        }
    }

    None
}
