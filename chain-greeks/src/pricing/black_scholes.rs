//! Black-Scholes pricing, implied volatility and Greeks.
//!
//! Implied volatility comes from a bracketing bisection search (the batch
//! path) or a Newton-Raphson search (diagnostics only). Greeks are the
//! closed-form partial derivatives in raw units:
//! - Delta, Gamma: per unit of spot
//! - Theta: per year
//! - Vega: per unit of volatility (1.0 = 100 vol points)
//! - Rho: per unit of rate

use std::f64::consts::{PI, SQRT_2};

use statrs::function::erf::erfc;

use crate::data::{Greeks, OptionType};

use super::PricingClient;

/// Standard normal CDF.
pub fn norm_cdf(x: f64) -> f64 {
    0.5 * erfc(-x / SQRT_2)
}

/// Standard normal PDF.
pub fn norm_pdf(x: f64) -> f64 {
    (-0.5 * x * x).exp() / (2.0 * PI).sqrt()
}

/// Lower end of the bisection bracket.
const SIGMA_LOW: f64 = 1e-5;

/// First guess for the upper end of the bisection bracket.
const SIGMA_HIGH_START: f64 = 0.3;

/// Give up when no upper bracket is found below this volatility.
const SIGMA_HIGH_LIMIT: f64 = 1e10;

/// Black-Scholes calculator for European options without dividends.
#[derive(Debug, Clone)]
pub struct BlackScholesPricer {
    /// Solvers stop once the model price is within this distance of the
    /// market price.
    pub accuracy: f64,
    /// Iteration cap for both solvers.
    pub max_iterations: usize,
}

impl Default for BlackScholesPricer {
    fn default() -> Self {
        Self {
            accuracy: 1e-5,
            max_iterations: 100,
        }
    }
}

impl BlackScholesPricer {
    pub fn new(accuracy: f64, max_iterations: usize) -> Self {
        Self {
            accuracy,
            max_iterations,
        }
    }

    /// Calculate d1 parameter.
    fn d1(spot: f64, strike: f64, rate: f64, vol: f64, time: f64) -> f64 {
        let sqrt_t = time.sqrt();
        ((spot / strike).ln() + rate * time) / (vol * sqrt_t) + 0.5 * vol * sqrt_t
    }

    /// Calculate call option price.
    pub fn call_price(&self, spot: f64, strike: f64, rate: f64, vol: f64, time: f64) -> f64 {
        if time <= 0.0 {
            return OptionType::Call.intrinsic(spot, strike);
        }

        let d1 = Self::d1(spot, strike, rate, vol, time);
        let d2 = d1 - vol * time.sqrt();

        spot * norm_cdf(d1) - strike * (-rate * time).exp() * norm_cdf(d2)
    }

    /// Calculate put option price.
    pub fn put_price(&self, spot: f64, strike: f64, rate: f64, vol: f64, time: f64) -> f64 {
        if time <= 0.0 {
            return OptionType::Put.intrinsic(spot, strike);
        }

        let d1 = Self::d1(spot, strike, rate, vol, time);
        let d2 = d1 - vol * time.sqrt();

        strike * (-rate * time).exp() * norm_cdf(-d2) - spot * norm_cdf(-d1)
    }

    /// Calculate option price based on type.
    pub fn price(
        &self,
        spot: f64,
        strike: f64,
        rate: f64,
        vol: f64,
        time: f64,
        opt_type: OptionType,
    ) -> f64 {
        match opt_type {
            OptionType::Call => self.call_price(spot, strike, rate, vol, time),
            OptionType::Put => self.put_price(spot, strike, rate, vol, time),
        }
    }

    /// True when the quote can be inverted at all: positive inputs and a
    /// price not below the discounted intrinsic value (with 1% slack).
    fn is_invertible(
        spot: f64,
        strike: f64,
        rate: f64,
        time: f64,
        market_price: f64,
        opt_type: OptionType,
    ) -> bool {
        if !(time > 0.0 && spot > 0.0 && strike > 0.0 && market_price.is_finite()) {
            return false;
        }

        let discounted_strike = strike * (-rate * time).exp();
        let lower_bound = match opt_type {
            OptionType::Call => spot - discounted_strike,
            OptionType::Put => discounted_strike - spot,
        };

        market_price >= 0.99 * lower_bound
    }

    /// Implied volatility by bisection.
    ///
    /// The upper bracket starts at 0.3 and doubles until the model price
    /// exceeds `market_price`. Returns NaN when the quote violates the
    /// no-arbitrage bound, when no bracket exists, or when the search does not
    /// converge.
    pub fn implied_vol_bisection(
        &self,
        spot: f64,
        strike: f64,
        rate: f64,
        time: f64,
        market_price: f64,
        opt_type: OptionType,
    ) -> f64 {
        if !Self::is_invertible(spot, strike, rate, time, market_price, opt_type) {
            return f64::NAN;
        }

        let mut sigma_low = SIGMA_LOW;
        let mut sigma_high = SIGMA_HIGH_START;

        while self.price(spot, strike, rate, sigma_high, time, opt_type) < market_price {
            sigma_high *= 2.0;
            if sigma_high > SIGMA_HIGH_LIMIT {
                return f64::NAN;
            }
        }

        for _ in 0..self.max_iterations {
            let sigma = 0.5 * (sigma_low + sigma_high);
            let diff = self.price(spot, strike, rate, sigma, time, opt_type) - market_price;

            if diff.abs() < self.accuracy {
                return sigma;
            }

            if diff < 0.0 {
                sigma_low = sigma;
            } else {
                sigma_high = sigma;
            }
        }

        f64::NAN
    }

    /// Implied volatility by Newton-Raphson.
    ///
    /// Starts from the Brenner-Subrahmanyam approximation. Returns NaN on the
    /// same bound violations as the bisection search, or when the iteration
    /// leaves the positive volatilities or fails to converge.
    pub fn implied_vol_newton(
        &self,
        spot: f64,
        strike: f64,
        rate: f64,
        time: f64,
        market_price: f64,
        opt_type: OptionType,
    ) -> f64 {
        if !Self::is_invertible(spot, strike, rate, time, market_price, opt_type) {
            return f64::NAN;
        }

        let sqrt_t = time.sqrt();
        let mut vol = (market_price / spot) / (0.398 * sqrt_t);

        for _ in 0..self.max_iterations {
            if !(vol > 0.0 && vol.is_finite()) {
                break;
            }

            let diff = market_price - self.price(spot, strike, rate, vol, time, opt_type);
            if diff.abs() < self.accuracy {
                return vol;
            }

            let vega = spot * sqrt_t * norm_pdf(Self::d1(spot, strike, rate, vol, time));
            if vega.abs() < 1e-12 {
                break;
            }

            vol += diff / vega;
        }

        f64::NAN
    }

    pub fn implied_volatility_call_newton(
        &self,
        spot: f64,
        strike: f64,
        rate: f64,
        time: f64,
        market_price: f64,
    ) -> f64 {
        self.implied_vol_newton(spot, strike, rate, time, market_price, OptionType::Call)
    }

    pub fn implied_volatility_put_newton(
        &self,
        spot: f64,
        strike: f64,
        rate: f64,
        time: f64,
        market_price: f64,
    ) -> f64 {
        self.implied_vol_newton(spot, strike, rate, time, market_price, OptionType::Put)
    }

    /// Closed-form Greeks.
    ///
    /// With a non-positive or non-finite volatility every Greek is NaN. At or
    /// past expiry delta is the payoff step and the rest are zero.
    pub fn greeks(
        &self,
        spot: f64,
        strike: f64,
        rate: f64,
        vol: f64,
        time: f64,
        opt_type: OptionType,
    ) -> Greeks {
        if !(vol > 0.0 && vol.is_finite()) {
            return Greeks::nan();
        }

        if time <= 0.0 {
            let delta = match opt_type {
                OptionType::Call => {
                    if spot > strike {
                        1.0
                    } else {
                        0.0
                    }
                }
                OptionType::Put => {
                    if spot < strike {
                        -1.0
                    } else {
                        0.0
                    }
                }
            };
            return Greeks::new(delta, 0.0, 0.0, 0.0, 0.0);
        }

        let sqrt_t = time.sqrt();
        let d1 = Self::d1(spot, strike, rate, vol, time);
        let d2 = d1 - vol * sqrt_t;
        let pdf_d1 = norm_pdf(d1);
        let discount = (-rate * time).exp();

        let gamma = pdf_d1 / (spot * vol * sqrt_t);
        let vega = spot * sqrt_t * pdf_d1;
        let decay = -(spot * vol * pdf_d1) / (2.0 * sqrt_t);

        match opt_type {
            OptionType::Call => Greeks::new(
                norm_cdf(d1),
                gamma,
                decay - rate * strike * discount * norm_cdf(d2),
                vega,
                strike * time * discount * norm_cdf(d2),
            ),
            OptionType::Put => Greeks::new(
                -norm_cdf(-d1),
                gamma,
                decay + rate * strike * discount * norm_cdf(-d2),
                vega,
                -strike * time * discount * norm_cdf(-d2),
            ),
        }
    }
}

impl PricingClient for BlackScholesPricer {
    fn implied_volatility_call(
        &self,
        spot: f64,
        strike: f64,
        rate: f64,
        time: f64,
        market_price: f64,
    ) -> f64 {
        self.implied_vol_bisection(spot, strike, rate, time, market_price, OptionType::Call)
    }

    fn implied_volatility_put(
        &self,
        spot: f64,
        strike: f64,
        rate: f64,
        time: f64,
        market_price: f64,
    ) -> f64 {
        self.implied_vol_bisection(spot, strike, rate, time, market_price, OptionType::Put)
    }

    fn partials_call(&self, spot: f64, strike: f64, rate: f64, volatility: f64, time: f64) -> Greeks {
        self.greeks(spot, strike, rate, volatility, time, OptionType::Call)
    }

    fn partials_put(&self, spot: f64, strike: f64, rate: f64, volatility: f64, time: f64) -> Greeks {
        self.greeks(spot, strike, rate, volatility, time, OptionType::Put)
    }
}
