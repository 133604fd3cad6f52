use crate::calibration::solver::Solver;
use crate::error::{PricingError, Result};
use crate::market::curves::{DiscountCurve, FlatDiscountCurve, FlatSurvivalCurve, SurvivalCurve};
use crate::market::pricer::{hazard_for_spread, CdsTerms, CreditPricer, IndexCdsPricer};

/// Forward market snapshot for one option expiry, per unit notional.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Forwards {
    /// Forward par spread.
    pub value: f64,
    /// Strike spread expressed as a forward clean upfront.
    pub strike_value: f64,
    /// Forward risky annuity, discounted to today and weighted by survival.
    pub pv01: f64,
    /// Discount factor from today to expiry.
    pub discount_factor: f64,
    /// Survival probability from today to expiry.
    pub survival_probability: f64,
    /// Outstanding notional over original notional.
    pub factor: f64,
    /// Notional at trade inception over original notional.
    pub initial_factor: f64,
    /// Expected loss before expiry per unit original notional, undiscounted.
    pub loss: f64,
    /// Present value of `loss`.
    pub front_end_protection: f64,
    /// Forward clean upfront conditional on survival to expiry.
    pub upfront: f64,
}

impl Forwards {
    pub fn validate(&self) -> Result<()> {
        let finite = [
            self.value,
            self.strike_value,
            self.pv01,
            self.discount_factor,
            self.survival_probability,
            self.factor,
            self.initial_factor,
            self.loss,
            self.front_end_protection,
            self.upfront,
        ]
        .iter()
        .all(|x| x.is_finite());
        if !finite {
            return Err(PricingError::input("forwards contain non-finite fields"));
        }
        if !(self.discount_factor > 0.0 && self.discount_factor <= 1.0 + 1e-12) {
            return Err(PricingError::input(format!(
                "discount factor {} outside (0, 1]",
                self.discount_factor
            )));
        }
        if !(0.0..=1.0).contains(&self.survival_probability) {
            return Err(PricingError::input(format!(
                "survival probability {} outside [0, 1]",
                self.survival_probability
            )));
        }
        if self.factor < 0.0 || self.initial_factor < 0.0 || self.pv01 < 0.0 {
            return Err(PricingError::input(
                "factors and pv01 must be non-negative",
            ));
        }
        Ok(())
    }
}

/// Source of forward snapshots.
pub trait ForwardProvider: Send + Sync + std::fmt::Debug {
    fn forwards(&self, expiry: f64, strike: f64) -> Result<Forwards>;
}

/// Forwards implied by a flat rate, a flat hazard and the index terms.
#[derive(Debug, Clone)]
pub struct FlatForwardProvider {
    terms: CdsTerms,
    discount: FlatDiscountCurve,
    survival: FlatSurvivalCurve,
    factor: f64,
    initial_factor: f64,
    solver: Solver,
}

impl FlatForwardProvider {
    pub fn new(terms: CdsTerms, hazard: f64, solver: Solver) -> Result<Self> {
        terms.validate()?;
        Ok(Self {
            terms,
            discount: FlatDiscountCurve::new(terms.rate)?,
            survival: FlatSurvivalCurve::new(hazard)?,
            factor: 1.0,
            initial_factor: 1.0,
            solver,
        })
    }

    /// Scale for realized index losses.
    pub fn with_factors(mut self, factor: f64, initial_factor: f64) -> Result<Self> {
        if !(factor >= 0.0 && initial_factor >= 0.0) {
            return Err(PricingError::input("index factors must be non-negative"));
        }
        self.factor = factor;
        self.initial_factor = initial_factor;
        Ok(self)
    }

    pub fn hazard(&self) -> f64 {
        self.survival.hazard
    }

    /// Forward clean upfront of a contract whose par spread is `spread`.
    fn upfront_at_spread(&self, pricer: &IndexCdsPricer, spread: f64) -> Result<f64> {
        if !spread.is_finite() {
            return Err(PricingError::input(format!("strike spread must be finite, got {spread}")));
        }
        let hazard = hazard_for_spread(pricer, spread, &self.solver)?;
        Ok(-pricer.clean_pv(hazard))
    }
}

impl ForwardProvider for FlatForwardProvider {
    fn forwards(&self, expiry: f64, strike: f64) -> Result<Forwards> {
        if !(expiry >= 0.0 && expiry < self.terms.maturity) {
            return Err(PricingError::input(format!(
                "expiry {expiry} must lie in [0, {})",
                self.terms.maturity
            )));
        }
        let hazard = self.survival.hazard;
        let pricer = IndexCdsPricer::new(self.terms, expiry, expiry)?;
        let discount_factor = self.discount.discount_factor(0.0, expiry);
        let survival_probability = self.survival.survival_probability(0.0, expiry);
        let loss = (1.0 - self.terms.recovery_rate) * (1.0 - survival_probability);

        let forwards = Forwards {
            value: pricer.par_spread(hazard),
            strike_value: self.upfront_at_spread(&pricer, strike)?,
            pv01: discount_factor * survival_probability * pricer.annuity(hazard),
            discount_factor,
            survival_probability,
            factor: self.factor,
            initial_factor: self.initial_factor,
            loss,
            front_end_protection: discount_factor * loss,
            upfront: -pricer.clean_pv(hazard),
        };
        forwards.validate()?;
        Ok(forwards)
    }
}
