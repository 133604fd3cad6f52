//! Closed-form Black models on the forward spread or the forward price.

use crate::error::Result;
use crate::models::black::{black, implied_std_dev, lognormal_probability};
use crate::models::traits::OptionModel;
use crate::models::utils::{check_volatility, std_dev, Inversion};

/// Black on the forward spread, with forward and strike shifted by `shift`.
#[derive(Debug, Clone)]
pub struct SpreadModel {
    forward: f64,
    strike: f64,
    multiplier: f64,
    is_call: bool,
    time: f64,
    shift: f64,
    inversion: Inversion,
}

impl SpreadModel {
    pub fn new(forward: f64, strike: f64, multiplier: f64, is_call: bool, time: f64) -> Self {
        Self {
            forward,
            strike,
            multiplier,
            is_call,
            time,
            shift: 0.0,
            inversion: Inversion::default(),
        }
    }

    pub fn with_shift(mut self, shift: f64) -> Self {
        self.shift = shift;
        self
    }

    pub fn with_inversion(mut self, inversion: Inversion) -> Self {
        self.inversion = inversion;
        self
    }

    pub fn shift(&self) -> f64 {
        self.shift
    }

    fn shifted(&self) -> (f64, f64) {
        (self.forward + self.shift, self.strike + self.shift)
    }
}

impl OptionModel for SpreadModel {
    fn forward(&self) -> f64 {
        self.forward
    }

    fn strike(&self) -> f64 {
        self.strike
    }

    fn multiplier(&self) -> f64 {
        self.multiplier
    }

    fn is_call(&self) -> bool {
        self.is_call
    }

    fn time(&self) -> f64 {
        self.time
    }

    fn fair_value(&self, volatility: f64) -> Result<f64> {
        let v = std_dev(check_volatility(volatility)?, self.time);
        let (f, k) = self.shifted();
        Ok(black(f, k, v, self.multiplier, self.is_call))
    }

    fn exercise_probability(&self, volatility: f64) -> Result<f64> {
        let v = std_dev(check_volatility(volatility)?, self.time);
        let (f, k) = self.shifted();
        Ok(lognormal_probability(f, k, v, self.is_call))
    }

    fn implied_volatility(&self, fair_value: f64) -> Result<f64> {
        if !(self.time > 0.0) {
            return Ok(f64::NAN);
        }
        let root_t = self.time.sqrt();
        let (f, k) = self.shifted();
        let sd = implied_std_dev(
            fair_value,
            f,
            k,
            self.multiplier,
            self.is_call,
            &self.inversion.solver,
            &self.inversion.config.scaled_by(root_t),
        );
        Ok(sd / root_t)
    }
}

/// Black on the spread with the front-end protection folded into forward and
/// strike as a running spread.
#[derive(Debug, Clone)]
pub struct ArbitrageFreeSpreadModel {
    inner: SpreadModel,
}

impl ArbitrageFreeSpreadModel {
    /// `front_end_shift` is in spread units: `factor·front_end_protection/pv01`,
    /// the front-end protection per unit forward annuity, added to forward and strike.
    pub fn new(inner: SpreadModel, front_end_shift: f64) -> Self {
        Self {
            inner: inner.with_shift(front_end_shift),
        }
    }

    pub fn shift(&self) -> f64 {
        self.inner.shift()
    }
}

impl OptionModel for ArbitrageFreeSpreadModel {
    fn forward(&self) -> f64 {
        self.inner.forward()
    }

    fn strike(&self) -> f64 {
        self.inner.strike()
    }

    fn multiplier(&self) -> f64 {
        self.inner.multiplier()
    }

    fn is_call(&self) -> bool {
        self.inner.is_call()
    }

    fn time(&self) -> f64 {
        self.inner.time()
    }

    fn fair_value(&self, volatility: f64) -> Result<f64> {
        self.inner.fair_value(volatility)
    }

    fn exercise_probability(&self, volatility: f64) -> Result<f64> {
        self.inner.exercise_probability(volatility)
    }

    fn implied_volatility(&self, fair_value: f64) -> Result<f64> {
        self.inner.implied_volatility(fair_value)
    }
}

/// Black on the forward price `1 − upfront`. A payer on the spread is a put
/// on the price.
#[derive(Debug, Clone)]
pub struct PriceModel {
    forward: f64,
    strike: f64,
    multiplier: f64,
    is_call: bool,
    time: f64,
    inversion: Inversion,
}

impl PriceModel {
    /// `forward` and `strike` are upfronts.
    pub fn new(forward: f64, strike: f64, multiplier: f64, is_call: bool, time: f64) -> Self {
        Self {
            forward,
            strike,
            multiplier,
            is_call,
            time,
            inversion: Inversion::default(),
        }
    }

    pub fn with_inversion(mut self, inversion: Inversion) -> Self {
        self.inversion = inversion;
        self
    }

    fn price_space(&self) -> (f64, f64, bool) {
        (1.0 - self.forward, 1.0 - self.strike, !self.is_call)
    }
}

impl OptionModel for PriceModel {
    fn forward(&self) -> f64 {
        self.forward
    }

    fn strike(&self) -> f64 {
        self.strike
    }

    fn multiplier(&self) -> f64 {
        self.multiplier
    }

    fn is_call(&self) -> bool {
        self.is_call
    }

    fn time(&self) -> f64 {
        self.time
    }

    fn fair_value(&self, volatility: f64) -> Result<f64> {
        let v = std_dev(check_volatility(volatility)?, self.time);
        let (f, k, call) = self.price_space();
        Ok(black(f, k, v, self.multiplier, call))
    }

    fn exercise_probability(&self, volatility: f64) -> Result<f64> {
        let v = std_dev(check_volatility(volatility)?, self.time);
        let (f, k, call) = self.price_space();
        Ok(lognormal_probability(f, k, v, call))
    }

    fn implied_volatility(&self, fair_value: f64) -> Result<f64> {
        if !(self.time > 0.0) {
            return Ok(f64::NAN);
        }
        let root_t = self.time.sqrt();
        let (f, k, call) = self.price_space();
        let sd = implied_std_dev(
            fair_value,
            f,
            k,
            self.multiplier,
            call,
            &self.inversion.solver,
            &self.inversion.config.scaled_by(root_t),
        );
        Ok(sd / root_t)
    }
}
