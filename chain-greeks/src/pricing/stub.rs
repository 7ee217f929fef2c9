//! Deterministic pricer that records every request.

use std::cell::RefCell;

use crate::data::Greeks;

use super::PricingClient;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PricingCall {
    ImpliedVolCall {
        spot: f64,
        strike: f64,
        rate: f64,
        time: f64,
        market_price: f64,
    },
    ImpliedVolPut {
        spot: f64,
        strike: f64,
        rate: f64,
        time: f64,
        market_price: f64,
    },
    PartialsCall {
        spot: f64,
        strike: f64,
        rate: f64,
        volatility: f64,
        time: f64,
    },
    PartialsPut {
        spot: f64,
        strike: f64,
        rate: f64,
        volatility: f64,
        time: f64,
    },
}

#[derive(Debug, Default)]
pub struct RecordingPricer {
    calls: RefCell<Vec<PricingCall>>,
}

impl RecordingPricer {
    pub const VOL: f64 = 0.25;

    pub const GREEKS: Greeks = Greeks {
        delta: 0.5,
        gamma: 0.05,
        theta: -12.5,
        vega: 11.25,
        rho: 4.0,
    };

    pub fn calls(&self) -> Vec<PricingCall> {
        self.calls.borrow().clone()
    }

    fn record(&self, call: PricingCall) {
        self.calls.borrow_mut().push(call);
    }
}

impl PricingClient for RecordingPricer {
    fn implied_volatility_call(
        &self,
        spot: f64,
        strike: f64,
        rate: f64,
        time: f64,
        market_price: f64,
    ) -> f64 {
        self.record(PricingCall::ImpliedVolCall {
            spot,
            strike,
            rate,
            time,
            market_price,
        });
        Self::VOL
    }

    fn implied_volatility_put(
        &self,
        spot: f64,
        strike: f64,
        rate: f64,
        time: f64,
        market_price: f64,
    ) -> f64 {
        self.record(PricingCall::ImpliedVolPut {
            spot,
            strike,
            rate,
            time,
            market_price,
        });
        Self::VOL
    }

    fn partials_call(&self, spot: f64, strike: f64, rate: f64, volatility: f64, time: f64) -> Greeks {
        self.record(PricingCall::PartialsCall {
            spot,
            strike,
            rate,
            volatility,
            time,
        });
        Self::GREEKS
    }

    fn partials_put(&self, spot: f64, strike: f64, rate: f64, volatility: f64, time: f64) -> Greeks {
        self.record(PricingCall::PartialsPut {
            spot,
            strike,
            rate,
            volatility,
            time,
        });
        Self::GREEKS
    }
}
