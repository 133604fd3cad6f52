//! Full index value driven by a log-normal flat hazard rate.
//!
//! At expiry the index is worth `protection − fee·Q` to the protection buyer,
//! front-end losses included, on a pricer dated today and settled at expiry.
//! The hazard rate is log-normal with its center calibrated to the forward
//! value. [`BarrierModel`] restricts the payoff to a spread band observed at
//! expiry.

use std::sync::Arc;

use crate::calibration::expectation::{NonlinearLogNormal, Region};
use crate::calibration::solver::Solver;
use crate::error::Result;
use crate::market::context::PricerContext;
use crate::market::pricer::{hazard_for_spread, CreditPricer};
use crate::model_params::Barrier;
use crate::models::traits::OptionModel;
use crate::models::utils::{check_volatility, invert_volatility, std_dev, Inversion};

#[derive(Debug, Clone)]
pub struct FullSpreadModel {
    forward: f64,
    strike: f64,
    multiplier: f64,
    is_call: bool,
    time: f64,
    pricer: Arc<dyn CreditPricer>,
    guess: f64,
    engine: NonlinearLogNormal,
    inversion: Inversion,
}

impl FullSpreadModel {
    /// `pricer` is dated today with settle at expiry.
    pub fn new(
        forward: f64,
        strike: f64,
        multiplier: f64,
        is_call: bool,
        time: f64,
        pricer: Arc<dyn CreditPricer>,
        context: &PricerContext,
    ) -> Self {
        let guess = pricer.premium() / (1.0 - pricer.recovery_rate());
        Self {
            forward,
            strike,
            multiplier,
            is_call,
            time,
            pricer,
            guess,
            engine: context.engine(),
            inversion: context.inversion(),
        }
    }

    pub fn pricer(&self) -> &dyn CreditPricer {
        self.pricer.as_ref()
    }

    /// Index value to the protection buyer at expiry for flat hazard `hazard`.
    pub fn index_value(&self, hazard: f64) -> Result<f64> {
        let p = self.pricer.as_ref();
        Ok(p.protection_pv(hazard)
            - p.flat_fee_pv(hazard, p.premium()) * p.survival_probability(hazard))
    }

    fn value_in(&self, volatility: f64, region: Region) -> Result<f64> {
        let sigma = std_dev(check_volatility(volatility)?, self.time);
        let payoff = |h: f64| self.index_value(h);
        let value = self.engine.calculate_value(
            &payoff,
            self.forward,
            self.strike,
            self.guess,
            sigma,
            self.is_call,
            region,
        )?;
        Ok(value * self.multiplier)
    }

    fn probability_in(&self, volatility: f64, region: Region) -> Result<f64> {
        let sigma = std_dev(check_volatility(volatility)?, self.time);
        let payoff = |h: f64| self.index_value(h);
        self.engine.calculate_probability(
            &payoff,
            self.forward,
            self.strike,
            self.guess,
            sigma,
            self.is_call,
            region,
        )
    }
}

impl OptionModel for FullSpreadModel {
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
        self.value_in(volatility, Region::unbounded())
    }

    fn exercise_probability(&self, volatility: f64) -> Result<f64> {
        self.probability_in(volatility, Region::unbounded())
    }

    fn implied_volatility(&self, fair_value: f64) -> Result<f64> {
        invert_volatility(self, fair_value, &self.inversion)
    }
}

/// Knock-out option on the full index value. Pays `multiplier·P` instead of
/// the index payoff when `digital` is set.
#[derive(Debug, Clone)]
pub struct BarrierModel {
    inner: FullSpreadModel,
    barrier: Barrier,
    region: Region,
    digital: bool,
}

impl BarrierModel {
    /// Spread levels are mapped to hazard rates through the par spread of
    /// `forward_pricer`, dated and settled at expiry.
    pub fn new(
        inner: FullSpreadModel,
        barrier: Barrier,
        forward_pricer: &dyn CreditPricer,
        solver: &Solver,
        digital: bool,
    ) -> Result<Self> {
        barrier.validate()?;
        let to_hazard = |spread: f64| -> Result<f64> {
            if spread <= 0.0 {
                Ok(0.0)
            } else {
                hazard_for_spread(forward_pricer, spread, solver)
            }
        };
        let region = Region::new(to_hazard(barrier.lower)?, to_hazard(barrier.upper)?);
        Ok(Self {
            inner,
            barrier,
            region,
            digital,
        })
    }

    pub fn barrier(&self) -> &Barrier {
        &self.barrier
    }

    /// Hazard-rate band equivalent to the spread barrier.
    pub fn region(&self) -> Region {
        self.region
    }

    pub fn is_digital(&self) -> bool {
        self.digital
    }
}

impl OptionModel for BarrierModel {
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
        if self.digital {
            let p = self.inner.probability_in(volatility, self.region)?;
            return Ok(self.inner.multiplier() * p);
        }
        self.inner.value_in(volatility, self.region)
    }

    fn exercise_probability(&self, volatility: f64) -> Result<f64> {
        self.inner.probability_in(volatility, self.region)
    }

    fn implied_volatility(&self, fair_value: f64) -> Result<f64> {
        invert_volatility(self, fair_value, &self.inner.inversion)
    }
}
