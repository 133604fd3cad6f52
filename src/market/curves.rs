use crate::error::{PricingError, Result};

pub trait DiscountCurve: Send + Sync + std::fmt::Debug {
    /// Discount factor from `t1` to `t2` (years).
    fn discount_factor(&self, t1: f64, t2: f64) -> f64;
}

pub trait SurvivalCurve: Send + Sync + std::fmt::Debug {
    /// Probability of surviving from `t1` to `t2` given survival to `t1`.
    fn survival_probability(&self, t1: f64, t2: f64) -> f64;
}

/// Continuously compounded flat rate.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FlatDiscountCurve {
    pub rate: f64,
}

impl FlatDiscountCurve {
    pub fn new(rate: f64) -> Result<Self> {
        if !rate.is_finite() {
            return Err(PricingError::input(format!("discount rate must be finite, got {rate}")));
        }
        Ok(Self { rate })
    }
}

impl DiscountCurve for FlatDiscountCurve {
    fn discount_factor(&self, t1: f64, t2: f64) -> f64 {
        (-self.rate * (t2 - t1)).exp()
    }
}

/// Constant default intensity.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FlatSurvivalCurve {
    pub hazard: f64,
}

impl FlatSurvivalCurve {
    pub fn new(hazard: f64) -> Result<Self> {
        if !(hazard >= 0.0 && hazard.is_finite()) {
            return Err(PricingError::input(format!(
                "hazard rate must be finite and non-negative, got {hazard}"
            )));
        }
        Ok(Self { hazard })
    }
}

impl SurvivalCurve for FlatSurvivalCurve {
    fn survival_probability(&self, t1: f64, t2: f64) -> f64 {
        (-self.hazard * (t2 - t1)).exp()
    }
}
