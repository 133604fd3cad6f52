//! Option terms and model selection passed to the factory.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::{PricingError, Result};

/// Valuation model requested by the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModelType {
    /// Black on the forward spread.
    Black,
    /// Black on the forward price `1 - upfront`.
    BlackPrice,
    /// Black on the spread, shifted for front-end protection.
    BlackArbitrageFree,
    /// Log-normal spread with a spread-dependent annuity.
    ModifiedBlack,
    /// Log-normal flat hazard rate driving the full index value.
    FullSpread,
}

impl ModelType {
    pub const ALL: [ModelType; 5] = [
        ModelType::Black,
        ModelType::BlackPrice,
        ModelType::BlackArbitrageFree,
        ModelType::ModifiedBlack,
        ModelType::FullSpread,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ModelType::Black => "black",
            ModelType::BlackPrice => "black_price",
            ModelType::BlackArbitrageFree => "black_arbitrage_free",
            ModelType::ModifiedBlack => "modified_black",
            ModelType::FullSpread => "full_spread",
        }
    }

    /// Price-quoted models value options on `1 - upfront`.
    pub fn is_price_quoted(&self) -> bool {
        matches!(self, ModelType::BlackPrice)
    }
}

impl fmt::Display for ModelType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ModelType {
    type Err = PricingError;

    fn from_str(s: &str) -> Result<Self> {
        let normalized = s.trim().to_ascii_lowercase().replace(['-', ' '], "_");
        ModelType::ALL
            .into_iter()
            .find(|m| m.as_str() == normalized)
            .ok_or_else(|| PricingError::config(format!("unknown model type '{s}'")))
    }
}

/// Knock-out spread levels observed at expiry. Either side may be infinite.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Barrier {
    pub lower: f64,
    pub upper: f64,
}

impl Barrier {
    pub fn new(lower: f64, upper: f64) -> Result<Self> {
        let barrier = Self { lower, upper };
        barrier.validate()?;
        Ok(barrier)
    }

    pub fn validate(&self) -> Result<()> {
        if self.lower.is_nan() || self.upper.is_nan() {
            return Err(PricingError::config("barrier levels must not be NaN"));
        }
        if self.lower >= self.upper {
            return Err(PricingError::config(format!(
                "barrier lower level {} must be below upper level {}",
                self.lower, self.upper
            )));
        }
        Ok(())
    }

    pub fn contains(&self, spread: f64) -> bool {
        spread > self.lower && spread < self.upper
    }
}

/// Terms of one option on a credit index.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct OptionSpec {
    /// Payer (call on spread) when true, receiver otherwise.
    pub is_call: bool,
    /// Strike spread.
    pub strike: f64,
    /// Notional scaling.
    pub multiplier: f64,
    /// Running deal coupon of the underlying index.
    pub premium: f64,
    /// Expiry in years.
    pub expiry: f64,
    #[serde(default)]
    pub barrier: Option<Barrier>,
    #[serde(default)]
    pub digital: bool,
}

impl OptionSpec {
    pub fn payer(strike: f64, premium: f64, expiry: f64) -> Self {
        Self {
            is_call: true,
            strike,
            multiplier: 1.0,
            premium,
            expiry,
            barrier: None,
            digital: false,
        }
    }

    pub fn receiver(strike: f64, premium: f64, expiry: f64) -> Self {
        Self {
            is_call: false,
            ..Self::payer(strike, premium, expiry)
        }
    }

    pub fn with_multiplier(self, multiplier: f64) -> Self {
        Self { multiplier, ..self }
    }

    pub fn with_barrier(self, barrier: Barrier) -> Self {
        Self {
            barrier: Some(barrier),
            ..self
        }
    }

    pub fn digital(self) -> Self {
        Self {
            digital: true,
            ..self
        }
    }

    pub fn validate(&self) -> Result<()> {
        if !(self.expiry > 0.0 && self.expiry.is_finite()) {
            return Err(PricingError::config(format!(
                "expiry must be positive, got {}",
                self.expiry
            )));
        }
        if !self.strike.is_finite() || !self.premium.is_finite() || !self.multiplier.is_finite() {
            return Err(PricingError::config("strike, premium and multiplier must be finite"));
        }
        if let Some(barrier) = &self.barrier {
            barrier.validate()?;
        }
        Ok(())
    }
}
