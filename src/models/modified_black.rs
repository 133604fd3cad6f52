//! Log-normal forward spread with a spread-dependent forward annuity.
//!
//! The exercise value of a payer is `U(S) − K_U` where `U(S) = A(S)·(S − c)` is
//! the forward clean upfront at par spread `S`. Plain Black on the spread
//! freezes `A`; here every sampled spread is mapped back to a flat hazard rate
//! on the forward pricer, so the decreasing annuity enters the expectation.
//!
//! The center of the spread distribution is calibrated so that the expected
//! product value matches the forward upfront.

use std::sync::Arc;

use crate::calibration::expectation::NonlinearLogNormal;
use crate::calibration::solver::{Domain, Solver};
use crate::diagnostics::Diagnostics;
use crate::error::Result;
use crate::market::context::PricerContext;
use crate::market::pricer::{hazard_for_spread, CreditPricer};
use crate::models::black::{black, lognormal_probability, MIN_STD_DEV};
use crate::models::traits::OptionModel;
use crate::models::utils::{check_volatility, intrinsic, invert_volatility, std_dev, Inversion};

/// Hazard guess used when neither a spread nor a coupon is available.
const FALLBACK_HAZARD: f64 = 1e-4;

/// Calibrated spread distribution for one volatility.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SpreadCalibration {
    pub forward_spread: f64,
    pub strike_spread: f64,
    /// Log-center of the spread distribution.
    pub mu: f64,
}

#[derive(Debug, Clone)]
pub struct ModifiedBlackModel {
    /// Forward clean upfront.
    forward: f64,
    /// Strike clean upfront.
    strike: f64,
    multiplier: f64,
    is_call: bool,
    time: f64,
    pricer: Arc<dyn CreditPricer>,
    engine: NonlinearLogNormal,
    diagnostics: Arc<dyn Diagnostics>,
    precision_tolerance: f64,
    inversion: Inversion,
}

impl ModifiedBlackModel {
    /// `pricer` must be forward-dated: as-of and settle both at expiry.
    pub fn new(
        forward: f64,
        strike: f64,
        multiplier: f64,
        is_call: bool,
        time: f64,
        pricer: Arc<dyn CreditPricer>,
        context: &PricerContext,
    ) -> Self {
        Self {
            forward,
            strike,
            multiplier,
            is_call,
            time,
            pricer,
            engine: context.engine(),
            diagnostics: Arc::clone(context.diagnostics()),
            precision_tolerance: context.config().precision_tolerance,
            inversion: context.inversion(),
        }
    }

    pub fn pricer(&self) -> &dyn CreditPricer {
        self.pricer.as_ref()
    }

    pub fn inversion(&self) -> &Inversion {
        &self.inversion
    }

    fn solver(&self) -> &Solver {
        self.engine.solver()
    }

    /// Flat hazard at which the clean value of the forward contract equals
    /// `target_clean_pv`.
    pub fn calibrate_from_pv(
        &self,
        target_clean_pv: f64,
        guessed_spread: Option<f64>,
    ) -> Result<f64> {
        let pricer = self.pricer.as_ref();
        let lgd = 1.0 - pricer.recovery_rate();
        let spread = guessed_spread
            .filter(|s| *s > 0.0 && s.is_finite())
            .unwrap_or_else(|| pricer.premium());
        let guess = if spread > 0.0 {
            spread / lgd
        } else {
            FALLBACK_HAZARD
        };

        let target = target_clean_pv + pricer.accrued();
        let hazard = self.solver().solve_expanding(
            |h| Ok(pricer.product_pv(h)),
            target,
            0.5 * guess,
            2.0 * guess,
            Domain::non_negative(),
        )?;

        let residual = pricer.product_pv(hazard) - target;
        if residual.abs() > self.precision_tolerance {
            self.diagnostics.warn(&format!(
                "hazard calibration residual {residual:e} exceeds tolerance {:e} \
                 (target pv {target:e}, hazard {hazard:e})",
                self.precision_tolerance
            ));
        }
        Ok(hazard)
    }

    /// Par spread of the forward contract whose clean upfront is `upfront`.
    pub fn calibrate_spread_from_upfront(&self, upfront: f64) -> Result<f64> {
        let hazard = self.calibrate_from_pv(-upfront, None)?;
        let pricer = self.pricer.as_ref();
        Ok(pricer.protection_pv(hazard)
            / (pricer.flat_fee_pv(hazard, 1.0) * pricer.survival_probability(hazard)))
    }

    fn hazard_at_spread(&self, spread: f64) -> Result<f64> {
        hazard_for_spread(self.pricer.as_ref(), spread, self.solver())
    }

    /// Forward risky annuity `A(S)`.
    pub fn annuity_at_spread(&self, spread: f64) -> Result<f64> {
        let hazard = self.hazard_at_spread(spread)?;
        Ok(self.pricer.annuity(hazard) * self.pricer.survival_probability(hazard))
    }

    /// Forward clean upfront `U(S) = A(S)·(S − c)`.
    pub fn upfront_at_spread(&self, spread: f64) -> Result<f64> {
        Ok(self.annuity_at_spread(spread)? * (spread - self.pricer.premium()))
    }

    /// Log-center `mu` of the spread with `E[product_pv(S)] == accrued − upfront`.
    pub fn calibrate_spread_center(
        &self,
        upfront: f64,
        spot_spread: f64,
        strike_spread: f64,
        std_dev: f64,
    ) -> Result<f64> {
        let pricer = self.pricer.as_ref();
        let product_pv = |s: f64| -> Result<f64> {
            let hazard = self.hazard_at_spread(s)?;
            Ok(pricer.product_pv(hazard))
        };
        let mu_guess = spot_spread.ln() - 0.5 * std_dev * std_dev;
        self.engine.calibrate_center(
            &product_pv,
            pricer.accrued() - upfront,
            std_dev,
            mu_guess,
            Some(strike_spread),
        )
    }

    pub fn calibrate(&self, std_dev: f64) -> Result<SpreadCalibration> {
        let forward_spread = self.calibrate_spread_from_upfront(self.forward)?;
        let strike_spread = self.calibrate_spread_from_upfront(self.strike)?;
        let mu =
            self.calibrate_spread_center(self.forward, forward_spread, strike_spread, std_dev)?;
        self.diagnostics.debug(&format!(
            "spread calibration: forward {forward_spread:e}, strike {strike_spread:e}, mu {mu}"
        ));
        Ok(SpreadCalibration {
            forward_spread,
            strike_spread,
            mu,
        })
    }

    /// `E[max(±(U(S) − K_U), 0)]` on the fixed nodes, split into a Black term
    /// at the strike annuity and the annuity correlation term.
    fn node_value(&self, calibration: &SpreadCalibration, sigma: f64) -> Result<f64> {
        let SpreadCalibration {
            strike_spread, mu, ..
        } = *calibration;
        let premium = self.pricer.premium();
        let strike_annuity = self.annuity_at_spread(strike_spread)?;
        let mean = (mu + 0.5 * sigma * sigma).exp();
        let frozen = strike_annuity * black(mean, strike_spread, sigma, 1.0, self.is_call);

        let nodes = self.engine.quadrature().nodes();
        let annuity = |s: f64| self.annuity_at_spread(s);
        let correlation = if self.is_call {
            nodes.payer_correlation_term(mu, sigma, strike_spread, premium, annuity)?
        } else {
            -nodes.receiver_correlation_term(mu, sigma, strike_spread, premium, annuity)?
        };
        Ok(frozen + correlation)
    }

    /// Same expectation integrated adaptively over the exercised tail.
    fn adaptive_value(&self, calibration: &SpreadCalibration, sigma: f64) -> Result<f64> {
        let SpreadCalibration {
            strike_spread, mu, ..
        } = *calibration;
        let strike = self.strike;
        let quadrature = self.engine.quadrature();
        if self.is_call {
            quadrature.right_expectation(mu, sigma, strike_spread, |s| {
                Ok(self.upfront_at_spread(s)? - strike)
            })
        } else {
            quadrature.left_expectation(mu, sigma, strike_spread, |s| {
                Ok(strike - self.upfront_at_spread(s)?)
            })
        }
    }
}

impl OptionModel for ModifiedBlackModel {
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
        let sigma = std_dev(check_volatility(volatility)?, self.time);
        if sigma < MIN_STD_DEV {
            return Ok(intrinsic(self.forward, self.strike, self.is_call) * self.multiplier);
        }
        let calibration = self.calibrate(sigma)?;
        let value = if self.engine.quadrature().uses_nodes() {
            self.node_value(&calibration, sigma)?
        } else {
            self.adaptive_value(&calibration, sigma)?
        };
        Ok(value.max(0.0) * self.multiplier)
    }

    fn exercise_probability(&self, volatility: f64) -> Result<f64> {
        let sigma = std_dev(check_volatility(volatility)?, self.time);
        if sigma < MIN_STD_DEV {
            let in_the_money = if self.is_call {
                self.forward > self.strike
            } else {
                self.forward < self.strike
            };
            return Ok(if in_the_money { 1.0 } else { 0.0 });
        }
        let calibration = self.calibrate(sigma)?;
        let mean = (calibration.mu + 0.5 * sigma * sigma).exp();
        Ok(lognormal_probability(
            mean,
            calibration.strike_spread,
            sigma,
            self.is_call,
        ))
    }

    fn implied_volatility(&self, fair_value: f64) -> Result<f64> {
        invert_volatility(self, fair_value, &self.inversion)
    }
}
