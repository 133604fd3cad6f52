//! Cash-or-nothing options paying the multiplier when exercised.

use crate::error::Result;
use crate::models::modified_black::ModifiedBlackModel;
use crate::models::spread::PriceModel;
use crate::models::traits::OptionModel;
use crate::models::utils::{invert_volatility, Inversion};

/// Digital on the spread, with the exercise probability taken from the
/// modified Black spread distribution.
#[derive(Debug, Clone)]
pub struct SpreadDigitalModel {
    inner: ModifiedBlackModel,
}

impl SpreadDigitalModel {
    pub fn new(inner: ModifiedBlackModel) -> Self {
        Self { inner }
    }
}

impl OptionModel for SpreadDigitalModel {
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
        Ok(self.multiplier() * self.exercise_probability(volatility)?)
    }

    fn exercise_probability(&self, volatility: f64) -> Result<f64> {
        self.inner.exercise_probability(volatility)
    }

    fn implied_volatility(&self, fair_value: f64) -> Result<f64> {
        invert_volatility(self, fair_value, self.inner.inversion())
    }
}

/// Digital on the forward price.
#[derive(Debug, Clone)]
pub struct PriceDigitalModel {
    inner: PriceModel,
    inversion: Inversion,
}

impl PriceDigitalModel {
    pub fn new(inner: PriceModel, inversion: Inversion) -> Self {
        Self { inner, inversion }
    }
}

impl OptionModel for PriceDigitalModel {
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
        Ok(self.multiplier() * self.exercise_probability(volatility)?)
    }

    fn exercise_probability(&self, volatility: f64) -> Result<f64> {
        self.inner.exercise_probability(volatility)
    }

    fn implied_volatility(&self, fair_value: f64) -> Result<f64> {
        invert_volatility(self, fair_value, &self.inversion)
    }
}
