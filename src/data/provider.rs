//! Yahoo Finance chain provider
//!
//! Fetches the underlying spot and per-expiry option chains from Yahoo
//! Finance's unofficial API and assembles the raw chain document consumed by
//! the normalizer. Data is delayed ~15 minutes and intended for personal use.
//!
//! This client is the concrete `SnapshotSource`; the engine and cache never
//! see it directly.

use chrono::{DateTime, Utc};
use serde::Deserialize;

use crate::core::{ChainError, ChainResult};

use super::normalize::{RawChainDocument, RawContract};
use super::service::{FetchConfig, SnapshotSource};

/// Yahoo Finance API client
pub struct YahooChainClient {
    client: reqwest::blocking::Client,
    base_url: String,
}

impl YahooChainClient {
    pub fn new() -> ChainResult<Self> {
        let client = reqwest::blocking::Client::builder()
            .user_agent("Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36")
            .build()
            .map_err(|e| ChainError::network(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url: "https://query1.finance.yahoo.com/v7/finance".to_string(),
        })
    }

    /// Fetch the option chain for one expiration timestamp (or the default
    /// nearest expiry when `expiry_ts` is `None`).
    fn get_chain_page(&self, symbol: &str, expiry_ts: Option<i64>) -> ChainResult<ChainPage> {
        let url = match expiry_ts {
            Some(ts) => format!("{}/options/{}?date={}", self.base_url, symbol, ts),
            None => format!("{}/options/{}", self.base_url, symbol),
        };

        let response: OptionsResponse = self
            .client
            .get(&url)
            .send()
            .map_err(|e| ChainError::network(e.to_string()))?
            .json()
            .map_err(|e| ChainError::data(format!("failed to parse options payload: {}", e)))?;

        response
            .option_chain
            .result
            .into_iter()
            .next()
            .ok_or_else(|| ChainError::data("no options data returned"))
    }
}

impl SnapshotSource for YahooChainClient {
    /// Fetch up to `config.expiry_count` nearest expiries within the day
    /// horizon and flatten them into one raw document. A single bad expiry
    /// page is skipped, not fatal.
    fn fetch_chain(&self, symbol: &str, config: &FetchConfig) -> ChainResult<RawChainDocument> {
        if symbol.is_empty() {
            return Err(ChainError::invalid_input("empty symbol"));
        }

        let now = Utc::now();
        let first_page = self.get_chain_page(symbol, None)?;
        let spot = first_page.quote.regular_market_price;

        let horizon = now + chrono::Duration::days(config.max_days as i64);
        let expiries: Vec<i64> = first_page
            .expiration_dates
            .iter()
            .copied()
            .filter(|&ts| {
                DateTime::from_timestamp(ts, 0).is_some_and(|dt| dt > now && dt <= horizon)
            })
            .take(config.expiry_count.min(FetchConfig::MAX_EXPIRIES) as usize)
            .collect();

        let mut rows = Vec::new();
        for ts in expiries {
            let page = match self.get_chain_page(symbol, Some(ts)) {
                Ok(page) => page,
                Err(e) => {
                    tracing::warn!(symbol, expiry_ts = ts, error = %e, "skipping expiry page");
                    continue;
                }
            };
            let expiry_utc = DateTime::from_timestamp(ts, 0);
            if let Some(options) = page.options.first() {
                for contract in &options.calls {
                    rows.push(to_raw_contract(contract, expiry_utc, "call"));
                }
                for contract in &options.puts {
                    rows.push(to_raw_contract(contract, expiry_utc, "put"));
                }
            }
        }

        Ok(RawChainDocument {
            spot,
            fetched_at: Some(now),
            rows,
        })
    }
}

fn to_raw_contract(
    data: &ContractData,
    expiry_utc: Option<DateTime<Utc>>,
    contract_type: &str,
) -> RawContract {
    RawContract {
        expiry_utc,
        strike: data.strike,
        contract_type: Some(contract_type.to_string()),
        iv: data.implied_volatility,
        oi: data.open_interest,
        volume: data.volume,
        bid: data.bid,
        ask: data.ask,
        last_price: data.last_price,
    }
}

// Yahoo Finance API response structures

#[derive(Debug, Deserialize)]
struct OptionsResponse {
    #[serde(rename = "optionChain")]
    option_chain: OptionChainNode,
}

#[derive(Debug, Deserialize)]
struct OptionChainNode {
    result: Vec<ChainPage>,
}

#[derive(Debug, Deserialize)]
struct ChainPage {
    #[serde(rename = "expirationDates", default)]
    expiration_dates: Vec<i64>,
    quote: QuoteData,
    #[serde(default)]
    options: Vec<OptionsNode>,
}

#[derive(Debug, Deserialize)]
struct QuoteData {
    #[serde(rename = "regularMarketPrice")]
    regular_market_price: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct OptionsNode {
    #[serde(default)]
    calls: Vec<ContractData>,
    #[serde(default)]
    puts: Vec<ContractData>,
}

#[derive(Debug, Deserialize)]
struct ContractData {
    strike: Option<f64>,
    bid: Option<f64>,
    ask: Option<f64>,
    #[serde(rename = "lastPrice")]
    last_price: Option<f64>,
    volume: Option<i64>,
    #[serde(rename = "openInterest")]
    open_interest: Option<i64>,
    #[serde(rename = "impliedVolatility")]
    implied_volatility: Option<f64>,
}
