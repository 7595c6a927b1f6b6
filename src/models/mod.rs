//! Pricing primitives
//!
//! Implements:
//! - Black-Scholes d1/d2 and the standard-normal PDF/CDF approximation
//! - Per-contract Greeks (delta, gamma, vega, vanna)

pub mod black_scholes;

pub use black_scholes::*;
