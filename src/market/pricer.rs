//! Single-name credit pricer used by the numerical option models.
//!
//! Every quantity is a pure function of an explicit trial flat hazard rate,
//! so one pricer can be shared by nested calibrations without any scratch
//! state. Values are per unit notional and expressed at the settle date.

use std::fmt;

use crate::calibration::solver::{Domain, Solver};
use crate::error::{PricingError, Result};

/// Contract of the pricer consumed by the option models.
pub trait CreditPricer: Send + Sync + fmt::Debug {
    /// Date (years) the survival and discounting are measured from.
    fn as_of(&self) -> f64;

    /// Date (years) the legs start and values are expressed at.
    fn settle(&self) -> f64;

    /// Running deal coupon of the contract.
    fn premium(&self) -> f64;

    fn recovery_rate(&self) -> f64;

    /// Same contract with a different settle date.
    fn with_settle(&self, settle: f64) -> Result<Box<dyn CreditPricer>>;

    /// Discount factor from `as_of` to `settle`.
    fn discount_factor(&self) -> f64;

    /// Survival probability from `as_of` to `settle` at flat hazard `hazard`.
    fn survival_probability(&self, hazard: f64) -> f64;

    /// Coupon accrued between the last coupon date and `settle`.
    fn accrued(&self) -> f64;

    /// Protection leg from `settle` to maturity, weighted by survival to
    /// `settle`, plus the front-end loss `(1 - R)(1 - Q)` incurred before it.
    fn protection_pv(&self, hazard: f64) -> f64;

    /// Clean fee leg at running coupon `premium`, conditional on survival to
    /// `settle`, including accrual on default.
    fn flat_fee_pv(&self, hazard: f64, premium: f64) -> f64;

    /// Risky annuity: the clean fee leg per unit coupon.
    fn annuity(&self, hazard: f64) -> f64 {
        self.flat_fee_pv(hazard, 1.0)
    }

    /// Full value to the protection seller.
    fn product_pv(&self, hazard: f64) -> f64 {
        let q = self.survival_probability(hazard);
        (self.flat_fee_pv(hazard, self.premium()) + self.accrued()) * q
            - self.protection_pv(hazard)
    }

    /// Seller value net of the accrued coupon.
    fn clean_pv(&self, hazard: f64) -> f64 {
        self.product_pv(hazard) - self.accrued()
    }

    /// Running spread at which the contract is worth zero.
    fn par_spread(&self, hazard: f64) -> f64 {
        let risky_annuity = self.annuity(hazard) * self.survival_probability(hazard);
        if risky_annuity <= 0.0 {
            return f64::INFINITY;
        }
        self.protection_pv(hazard) / risky_annuity
    }
}

/// Flat hazard rate at which `pricer` quotes `spread` as its par spread.
///
/// Zero maps to zero and `+inf` to `+inf`; negative spreads are rejected.
pub fn hazard_for_spread(pricer: &dyn CreditPricer, spread: f64, solver: &Solver) -> Result<f64> {
    if spread.is_nan() || spread < 0.0 {
        return Err(PricingError::input(format!(
            "spread must be non-negative, got {spread}"
        )));
    }
    if spread == 0.0 {
        return Ok(0.0);
    }
    if spread.is_infinite() {
        return Ok(f64::INFINITY);
    }
    let guess = spread / (1.0 - pricer.recovery_rate());
    solver.solve_expanding(
        |h| Ok(pricer.par_spread(h)),
        spread,
        0.5 * guess,
        2.0 * guess,
        Domain::non_negative(),
    )
}

/// Static terms of an index CDS.
#[derive(Debug, Clone, Copy, PartialEq, serde::Deserialize)]
pub struct CdsTerms {
    /// Maturity in years from today.
    pub maturity: f64,
    /// Running deal coupon.
    pub premium: f64,
    pub recovery_rate: f64,
    /// Flat continuously compounded discount rate.
    pub rate: f64,
    /// Coupon payments per year.
    pub frequency: u32,
}

impl CdsTerms {
    pub fn validate(&self) -> Result<()> {
        if !(self.maturity > 0.0 && self.maturity.is_finite()) {
            return Err(PricingError::input(format!(
                "maturity must be positive, got {}",
                self.maturity
            )));
        }
        if !(self.premium >= 0.0 && self.premium.is_finite()) {
            return Err(PricingError::input(format!(
                "premium must be non-negative, got {}",
                self.premium
            )));
        }
        if !(0.0..1.0).contains(&self.recovery_rate) {
            return Err(PricingError::input(format!(
                "recovery rate must lie in [0, 1), got {}",
                self.recovery_rate
            )));
        }
        if !self.rate.is_finite() {
            return Err(PricingError::input("discount rate must be finite"));
        }
        if self.frequency == 0 {
            return Err(PricingError::input("coupon frequency must be positive"));
        }
        Ok(())
    }

    pub fn with_premium(self, premium: f64) -> Self {
        Self { premium, ..self }
    }
}

/// Builds pricers for given dates and coupon.
pub trait PricerSource: Send + Sync + fmt::Debug {
    fn pricer(&self, as_of: f64, settle: f64, premium: f64) -> Result<Box<dyn CreditPricer>>;
}

impl PricerSource for CdsTerms {
    fn pricer(&self, as_of: f64, settle: f64, premium: f64) -> Result<Box<dyn CreditPricer>> {
        Ok(Box::new(IndexCdsPricer::new(
            self.with_premium(premium),
            as_of,
            settle,
        )?))
    }
}

/// Index CDS on a flat hazard rate and flat discount rate.
///
/// Coupon dates roll back from maturity in steps of `1 / frequency`; the fee
/// leg accrues from `max(period start, settle)` and pays accrual on default
/// exactly for the flat curves.
#[derive(Debug, Clone, PartialEq)]
pub struct IndexCdsPricer {
    terms: CdsTerms,
    as_of: f64,
    settle: f64,
}

impl IndexCdsPricer {
    pub fn new(terms: CdsTerms, as_of: f64, settle: f64) -> Result<Self> {
        terms.validate()?;
        if !(as_of.is_finite() && settle.is_finite()) || settle < as_of {
            return Err(PricingError::input(format!(
                "settle ({settle}) must not precede as-of ({as_of})"
            )));
        }
        Ok(Self {
            terms,
            as_of,
            settle,
        })
    }

    pub fn terms(&self) -> &CdsTerms {
        &self.terms
    }

    /// Last coupon date on or before settle.
    pub fn last_coupon_date(&self) -> f64 {
        let step = 1.0 / self.terms.frequency as f64;
        let remaining = self.terms.maturity - self.settle;
        if remaining <= 0.0 {
            return self.terms.maturity;
        }
        let periods = (remaining / step - 1e-9).ceil();
        self.terms.maturity - periods * step
    }

    /// Accrual periods `(start, end)` after settle, start clipped to settle.
    fn periods(&self) -> Vec<(f64, f64)> {
        let step = 1.0 / self.terms.frequency as f64;
        let remaining = self.terms.maturity - self.settle;
        if remaining <= 0.0 {
            return Vec::new();
        }
        let count = (remaining / step - 1e-9).ceil() as usize;
        (1..=count)
            .rev()
            .map(|j| {
                let start = self.terms.maturity - j as f64 * step;
                let end = self.terms.maturity - (j - 1) as f64 * step;
                (start.max(self.settle), end)
            })
            .collect()
    }
}

/// `(1 − e^{−x}(1 + x)) / x²`, the normalized accrual-on-default integral.
fn accrual_kernel(x: f64) -> f64 {
    if x.abs() < 1e-2 {
        0.5 - x / 3.0 + x * x / 8.0 - x * x * x / 30.0 + x * x * x * x / 144.0
    } else {
        (1.0 - (-x).exp() * (1.0 + x)) / (x * x)
    }
}

/// `∫₀^τ e^{−k u} du`.
fn discounted_duration(k: f64, tau: f64) -> f64 {
    if (k * tau).abs() < 1e-12 {
        tau
    } else {
        -(-k * tau).exp_m1() / k
    }
}

impl CreditPricer for IndexCdsPricer {
    fn as_of(&self) -> f64 {
        self.as_of
    }

    fn settle(&self) -> f64 {
        self.settle
    }

    fn premium(&self) -> f64 {
        self.terms.premium
    }

    fn recovery_rate(&self) -> f64 {
        self.terms.recovery_rate
    }

    fn with_settle(&self, settle: f64) -> Result<Box<dyn CreditPricer>> {
        Ok(Box::new(Self::new(self.terms, self.as_of, settle)?))
    }

    fn discount_factor(&self) -> f64 {
        (-self.terms.rate * (self.settle - self.as_of)).exp()
    }

    fn survival_probability(&self, hazard: f64) -> f64 {
        if hazard.is_infinite() {
            return if self.settle > self.as_of { 0.0 } else { 1.0 };
        }
        (-hazard * (self.settle - self.as_of)).exp()
    }

    fn accrued(&self) -> f64 {
        self.terms.premium * (self.settle - self.last_coupon_date()).max(0.0)
    }

    fn protection_pv(&self, hazard: f64) -> f64 {
        let lgd = 1.0 - self.terms.recovery_rate;
        let q = self.survival_probability(hazard);
        let tau = (self.terms.maturity - self.settle).max(0.0);
        let k = self.terms.rate + hazard;
        let forward_protection = if hazard.is_infinite() {
            lgd
        } else {
            lgd * hazard * discounted_duration(k, tau)
        };
        lgd * (1.0 - q) + q * forward_protection
    }

    fn flat_fee_pv(&self, hazard: f64, premium: f64) -> f64 {
        if hazard.is_infinite() {
            return 0.0;
        }
        let k = self.terms.rate + hazard;
        let legs: f64 = self
            .periods()
            .iter()
            .map(|&(start, end)| {
                let u0 = start - self.settle;
                let delta = end - start;
                let coupon = delta * (-k * (u0 + delta)).exp();
                let accrual_on_default =
                    hazard * (-k * u0).exp() * delta * delta * accrual_kernel(k * delta);
                coupon + accrual_on_default
            })
            .sum();
        premium * legs
    }
}
