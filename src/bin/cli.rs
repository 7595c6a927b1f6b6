//! Chain Metrics CLI
//!
//! Computes the full analytics set over a synthetic chain, then attempts a
//! live fetch for the symbol given as the first argument (default SPY).

use std::sync::Arc;

use chain_metrics::prelude::*;
use chrono::{Duration, Utc};

fn main() {
    println!("Chain Metrics");
    println!("=============\n");

    let reference = Utc::now();
    let spot = 100.0;
    let rows = synthetic_chain(reference);

    println!("Synthetic chain: {} rows, spot ${:.2}\n", rows.len(), spot);

    let result = compute_metrics("DEMO", &rows, Some(spot), reference);

    if let Some(atm) = result.atm {
        println!("ATM: ${:.2} @ {:.1}% IV", atm.strike, atm.iv * 100.0);
    }
    if let Some(ratio) = result.put_call_oi_ratio {
        println!("Put/Call OI: {:.2}", ratio);
    }
    if let Some(mp) = result.max_pain {
        println!("Max pain: ${:.2}", mp);
    }
    if let Some(line) = result.format_dealer_gamma() {
        println!("Dealer gamma: {}", line);
    }
    if let Some(line) = result.format_skew() {
        println!("Skew: {}", line);
    }
    if let (Some(line), Some(bias)) = (result.format_total_delta(), result.directional_bias()) {
        println!("Net delta: {} ({})", line, bias);
    }
    if let Some(line) = result.format_total_vega() {
        println!("Net vega: {}", line);
    }
    if let (Some(line), Some(read)) = (result.format_vanna(), result.vanna_interpretation()) {
        println!("Vanna: {} - {}", line, read);
    }
    if let Some(walls) = &result.gamma_walls {
        let rendered: Vec<String> = walls.iter().map(|w| w.format()).collect();
        println!("Gamma walls: {}", rendered.join(", "));
    }
    if let Some(moves) = &result.expected_moves {
        for m in moves {
            println!(
                "Expected move ({:.0}d): ±${:.2} @ {:.1}% IV",
                m.ttm_days,
                m.dollars,
                m.iv * 100.0
            );
        }
    }

    // Try fetching real data
    println!("\n--- Live Data ---");
    let symbol = std::env::args().nth(1).unwrap_or_else(|| "SPY".to_string());
    println!("Attempting to fetch {} options from Yahoo Finance...\n", symbol);

    match YahooChainClient::new() {
        Ok(client) => {
            let cache = Arc::new(MetricsCache::default());
            let service = ChainService::new(client, cache);
            let outcome = service.metrics_for(&symbol);

            println!("Freshness: {:?}", outcome.freshness);
            match outcome.result.format_dealer_gamma() {
                Some(line) => println!("{} dealer gamma: {}", symbol, line),
                None => println!("(no computable metrics - offline or sparse chain)"),
            }
        }
        Err(e) => println!("Could not build client: {:?}", e),
    }

    println!("\n--- Done ---");
}

/// Two-expiry synthetic chain around spot 100
fn synthetic_chain(reference: chrono::DateTime<Utc>) -> Vec<OptionRow> {
    let mut rows = Vec::new();
    let near = reference + Duration::days(7);
    let far = reference + Duration::days(21);

    for (strike, call_iv, put_iv, call_oi, put_oi) in [
        (90.0, 0.34, 0.38, 200u64, 900u64),
        (95.0, 0.31, 0.34, 400, 700),
        (100.0, 0.30, 0.32, 800, 600),
        (105.0, 0.29, 0.30, 600, 250),
        (110.0, 0.28, 0.29, 300, 100),
    ] {
        for (ty, iv, oi, expiry, ttm) in [
            (OptionType::Call, call_iv, call_oi, near, 7.0),
            (OptionType::Put, put_iv, put_oi, near, 7.0),
            (OptionType::Call, call_iv - 0.02, call_oi / 2, far, 21.0),
            (OptionType::Put, put_iv - 0.02, put_oi / 2, far, 21.0),
        ] {
            rows.push(OptionRow {
                expiry_utc: expiry,
                ttm_days: ttm,
                strike,
                option_type: ty,
                iv,
                oi,
                volume: oi / 4,
                bid: 1.0,
                ask: 1.4,
                last_price: 1.2,
            });
        }
    }
    rows
}
