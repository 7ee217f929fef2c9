//! Option pricing capability consumed by the batch pipeline.
//!
//! The pipeline only talks to [`PricingClient`]; [`BlackScholesPricer`] is the
//! production implementation, and tests substitute deterministic stubs.

pub mod black_scholes;

#[cfg(test)]
pub(crate) mod stub;

pub use black_scholes::{norm_cdf, norm_pdf, BlackScholesPricer};

use crate::data::Greeks;

/// Implied volatility and Greeks for European options.
///
/// All operations assume continuous compounding, a flat risk-free `rate` and
/// no dividends. `time` is in years. Volatilities are annualized decimals
/// (0.20 = 20%). When no volatility reproduces `market_price`, implementations
/// return `f64::NAN` rather than failing the run.
pub trait PricingClient {
    fn implied_volatility_call(
        &self,
        spot: f64,
        strike: f64,
        rate: f64,
        time: f64,
        market_price: f64,
    ) -> f64;

    fn implied_volatility_put(
        &self,
        spot: f64,
        strike: f64,
        rate: f64,
        time: f64,
        market_price: f64,
    ) -> f64;

    fn partials_call(&self, spot: f64, strike: f64, rate: f64, volatility: f64, time: f64)
        -> Greeks;

    fn partials_put(&self, spot: f64, strike: f64, rate: f64, volatility: f64, time: f64)
        -> Greeks;
}
