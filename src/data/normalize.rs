//! Snapshot normalization
//!
//! Converts the provider's raw chain document into canonical `OptionRow`s.
//! Validation is row-local: a malformed contract drops that row only and the
//! rest of the batch proceeds. Drop rules:
//!
//! - non-positive or missing IV or strike
//! - missing or unparseable expiry or contract type
//! - expiry non-positive or beyond the fetch horizon at `now`
//! - negative open interest or volume
//!
//! Quote fields the provider omits (bid/ask/last, volume, OI) default to
//! zero, which downstream code reads as "absent": a zero-OI row never enters
//! a Greek sum and a zero quote never produces a mid price. A document with
//! no spot always normalizes to the empty snapshot, whatever its rows claim.

use chrono::{DateTime, Utc};
use serde::Deserialize;

use crate::core::{OptionRow, OptionType, OptionsSnapshot};

/// Raw chain document as emitted by the upstream provider bridge
#[derive(Debug, Clone, Deserialize)]
pub struct RawChainDocument {
    pub spot: Option<f64>,
    pub fetched_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub rows: Vec<RawContract>,
}

/// One raw contract from the provider payload
#[derive(Debug, Clone, Deserialize)]
pub struct RawContract {
    #[serde(rename = "expiryUTC")]
    pub expiry_utc: Option<DateTime<Utc>>,
    pub strike: Option<f64>,
    #[serde(rename = "type")]
    pub contract_type: Option<String>,
    pub iv: Option<f64>,
    pub oi: Option<i64>,
    pub volume: Option<i64>,
    pub bid: Option<f64>,
    pub ask: Option<f64>,
    #[serde(rename = "lastPrice")]
    pub last_price: Option<f64>,
}

/// Normalize a raw document into an `OptionsSnapshot`.
///
/// `max_days` is the expiry horizon; `now` is the snapshot reference instant
/// used to recompute time-to-expiry (never the wall clock).
pub fn normalize_snapshot(
    doc: &RawChainDocument,
    max_days: f64,
    now: DateTime<Utc>,
) -> OptionsSnapshot {
    let fetched_at = doc.fetched_at.unwrap_or(now);

    // No spot means the upstream failed entirely; rows without spot are
    // never admitted.
    let spot = match doc.spot {
        Some(s) if s > 0.0 => s,
        _ => return OptionsSnapshot::empty(fetched_at),
    };

    let mut rows = Vec::with_capacity(doc.rows.len());
    let mut dropped = 0usize;
    for contract in &doc.rows {
        match normalize_row(contract, max_days, now) {
            Some(row) => rows.push(row),
            None => dropped += 1,
        }
    }

    if dropped > 0 {
        tracing::debug!(dropped, kept = rows.len(), "dropped malformed or out-of-horizon rows");
    }

    OptionsSnapshot::new(spot, rows, fetched_at)
}

fn normalize_row(contract: &RawContract, max_days: f64, now: DateTime<Utc>) -> Option<OptionRow> {
    let expiry_utc = contract.expiry_utc?;
    let strike = contract.strike.filter(|&s| s > 0.0)?;
    let iv = contract.iv.filter(|&v| v > 0.0)?;
    let option_type = parse_option_type(contract.contract_type.as_deref()?)?;

    let ttm_days = (expiry_utc - now).num_milliseconds() as f64 / 1000.0 / 86_400.0;
    if ttm_days <= 0.0 || ttm_days > max_days {
        return None;
    }

    let oi = non_negative(contract.oi)?;
    let volume = non_negative(contract.volume)?;

    Some(OptionRow {
        expiry_utc,
        ttm_days,
        strike,
        option_type,
        iv,
        oi,
        volume,
        bid: contract.bid.unwrap_or(0.0).max(0.0),
        ask: contract.ask.unwrap_or(0.0).max(0.0),
        last_price: contract.last_price.unwrap_or(0.0).max(0.0),
    })
}

fn parse_option_type(raw: &str) -> Option<OptionType> {
    match raw.to_ascii_lowercase().as_str() {
        "call" | "c" => Some(OptionType::Call),
        "put" | "p" => Some(OptionType::Put),
        _ => None,
    }
}

fn non_negative(value: Option<i64>) -> Option<u64> {
    match value {
        None => Some(0),
        Some(v) if v >= 0 => Some(v as u64),
        Some(_) => None,
    }
}
