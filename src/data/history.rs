//! Persisted metrics-history layout
//!
//! One record per `(ticker, date)`, upserted, with the numeric fields of a
//! `MetricsResult` flattened for storage alongside the freshness of the data
//! that produced them. The durable store is an external collaborator; this
//! module defines the record shape and an in-memory store with the same
//! upsert semantics for tests and backfill dry runs.

use chrono::{DateTime, NaiveDate, Utc};
use dashmap::DashMap;
use serde::{Deserialize, Serialize};

use crate::core::MetricsResult;

/// How the data backing a record was obtained
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DataFreshness {
    Fresh,
    Stale,
    Unavailable,
    Backfilled,
}

/// Flattened numeric snapshot of one day's metrics for one ticker
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricsHistoryRecord {
    pub ticker: String,
    pub date: NaiveDate,

    pub atm_strike: Option<f64>,
    pub atm_iv: Option<f64>,
    pub put_call_volume_ratio: Option<f64>,
    pub implied_move: Option<f64>,
    pub max_pain: Option<f64>,
    pub put_call_oi_ratio: Option<f64>,
    pub total_delta: Option<f64>,
    pub total_vega: Option<f64>,
    pub vanna: Option<f64>,
    pub dealer_gamma: Option<f64>,
    pub skew: Option<f64>,
    pub zero_gamma: Option<f64>,
    /// Largest nearest-expiry gamma wall, when any
    pub top_wall_strike: Option<f64>,
    pub top_wall_dollar_gamma: Option<f64>,
    pub near_iv: Option<f64>,
    pub far_iv: Option<f64>,

    pub data_freshness: DataFreshness,
    pub recorded_at: DateTime<Utc>,
}

impl MetricsHistoryRecord {
    pub fn from_result(
        result: &MetricsResult,
        freshness: DataFreshness,
        recorded_at: DateTime<Utc>,
    ) -> Self {
        let top_wall = result
            .gamma_walls
            .as_ref()
            .and_then(|walls| walls.first().copied());

        Self {
            ticker: result.symbol.clone(),
            date: recorded_at.date_naive(),
            atm_strike: result.atm.map(|a| a.strike),
            atm_iv: result.atm.map(|a| a.iv),
            put_call_volume_ratio: result.put_call_volume_ratio,
            implied_move: result.implied_move,
            max_pain: result.max_pain,
            put_call_oi_ratio: result.put_call_oi_ratio,
            total_delta: result.total_delta,
            total_vega: result.total_vega,
            vanna: result.vanna,
            dealer_gamma: result.dealer_gamma,
            skew: result.skew,
            zero_gamma: result.zero_gamma,
            top_wall_strike: top_wall.map(|w| w.strike),
            top_wall_dollar_gamma: top_wall.map(|w| w.dollar_gamma),
            near_iv: result.term_structure.map(|t| t.near_iv),
            far_iv: result.term_structure.map(|t| t.far_iv),
            data_freshness: freshness,
            recorded_at,
        }
    }
}

/// In-memory history store with `(ticker, date)` upsert semantics
#[derive(Default)]
pub struct HistoryStore {
    records: DashMap<(String, NaiveDate), MetricsHistoryRecord>,
}

impl HistoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace the record for its `(ticker, date)` key.
    pub fn upsert(&self, record: MetricsHistoryRecord) {
        let key = (record.ticker.clone(), record.date);
        self.records.insert(key, record);
    }

    pub fn get(&self, ticker: &str, date: NaiveDate) -> Option<MetricsHistoryRecord> {
        self.records
            .get(&(ticker.to_string(), date))
            .map(|r| r.value().clone())
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}
