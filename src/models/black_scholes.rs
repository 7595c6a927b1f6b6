//! Black-Scholes primitives
//!
//! Provides:
//! - d1/d2 and the standard-normal PDF/CDF
//! - Per-contract delta, gamma, vega, and vanna
//!
//! The CDF is the Abramowitz & Stegun 26.2.17 rational approximation
//! (|error| < 7.5e-8), not an exact error-function call; that tolerance is
//! well inside what any consumer of these primitives needs.
//!
//! All functions treat `ttm_years <= 0` or `iv <= 0` as out of domain and
//! return 0.0. Aggregate callers must still skip such rows up front so that
//! degenerate contracts never enter a sum in the first place.

use std::f64::consts::PI;

use crate::core::OptionType;

/// Standard normal PDF
pub fn norm_pdf(x: f64) -> f64 {
    (-0.5 * x * x).exp() / (2.0 * PI).sqrt()
}

/// Standard normal CDF via the Abramowitz & Stegun 26.2.17 approximation
///
/// Phi(x) = 1 - phi(x) * (b1*t + b2*t^2 + b3*t^3 + b4*t^4 + b5*t^5)
/// where t = 1 / (1 + 0.2316419 * |x|), reflected for x < 0.
pub fn norm_cdf(x: f64) -> f64 {
    const P: f64 = 0.231_641_9;
    const B1: f64 = 0.319_381_530;
    const B2: f64 = -0.356_563_782;
    const B3: f64 = 1.781_477_937;
    const B4: f64 = -1.821_255_978;
    const B5: f64 = 1.330_274_429;

    let abs_x = x.abs();
    let t = 1.0 / (1.0 + P * abs_x);
    let poly = t * (B1 + t * (B2 + t * (B3 + t * (B4 + t * B5))));
    let cdf_pos = 1.0 - norm_pdf(abs_x) * poly;

    if x < 0.0 {
        1.0 - cdf_pos
    } else {
        cdf_pos
    }
}

/// Black-Scholes d1 (zero rate and carry): `[ln(S/K) + 0.5σ²T] / (σ√T)`
pub fn d1(spot: f64, strike: f64, ttm_years: f64, iv: f64) -> f64 {
    if ttm_years <= 0.0 || iv <= 0.0 || spot <= 0.0 || strike <= 0.0 {
        return 0.0;
    }
    ((spot / strike).ln() + 0.5 * iv * iv * ttm_years) / (iv * ttm_years.sqrt())
}

/// Black-Scholes d2: `d1 - σ√T`
pub fn d2(spot: f64, strike: f64, ttm_years: f64, iv: f64) -> f64 {
    if ttm_years <= 0.0 || iv <= 0.0 || spot <= 0.0 || strike <= 0.0 {
        return 0.0;
    }
    d1(spot, strike, ttm_years, iv) - iv * ttm_years.sqrt()
}

/// Delta: `N(d1)` for calls, `N(d1) - 1` for puts
pub fn delta(spot: f64, strike: f64, ttm_years: f64, iv: f64, option_type: OptionType) -> f64 {
    if ttm_years <= 0.0 || iv <= 0.0 || spot <= 0.0 || strike <= 0.0 {
        return 0.0;
    }
    let nd1 = norm_cdf(d1(spot, strike, ttm_years, iv));
    match option_type {
        OptionType::Call => nd1,
        OptionType::Put => nd1 - 1.0,
    }
}

/// Gamma (identical for calls and puts): `phi(d1) / (S σ √T)`
pub fn gamma(spot: f64, strike: f64, ttm_years: f64, iv: f64) -> f64 {
    if ttm_years <= 0.0 || iv <= 0.0 || spot <= 0.0 || strike <= 0.0 {
        return 0.0;
    }
    norm_pdf(d1(spot, strike, ttm_years, iv)) / (spot * iv * ttm_years.sqrt())
}

/// Vega per 1 percentage-point IV move: `S phi(d1) √T / 100`
pub fn vega(spot: f64, strike: f64, ttm_years: f64, iv: f64) -> f64 {
    if ttm_years <= 0.0 || iv <= 0.0 || spot <= 0.0 || strike <= 0.0 {
        return 0.0;
    }
    spot * norm_pdf(d1(spot, strike, ttm_years, iv)) * ttm_years.sqrt() / 100.0
}

/// Vanna: `-phi(d1) d2 / σ`
pub fn vanna(spot: f64, strike: f64, ttm_years: f64, iv: f64) -> f64 {
    if ttm_years <= 0.0 || iv <= 0.0 || spot <= 0.0 || strike <= 0.0 {
        return 0.0;
    }
    let d1v = d1(spot, strike, ttm_years, iv);
    let d2v = d1v - iv * ttm_years.sqrt();
    -norm_pdf(d1v) * d2v / iv
}
