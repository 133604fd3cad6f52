//! Error types shared by every valuation model.

use thiserror::Error;

/// Failures surfaced by model construction and valuation.
///
/// Degenerate inputs (zero volatility, non-positive forward or strike) are not
/// errors: they take closed-form branches. Only configuration mistakes and
/// numerical calibration failures are reported here.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum PricingError {
    /// Unknown model or barrier type, or option terms that cannot be valued.
    #[error("invalid configuration: {0}")]
    InvalidConfiguration(String),

    /// A root solve could not bracket or converge, or an integrator ran out of budget.
    #[error("numerical failure: {0}")]
    NumericalFailure(String),

    /// Malformed collaborator data (node tables, curve parameters, schedules).
    #[error("invalid input: {0}")]
    InvalidInput(String),
}

impl PricingError {
    pub fn config(msg: impl Into<String>) -> Self {
        Self::InvalidConfiguration(msg.into())
    }

    pub fn numerical(msg: impl Into<String>) -> Self {
        Self::NumericalFailure(msg.into())
    }

    pub fn input(msg: impl Into<String>) -> Self {
        Self::InvalidInput(msg.into())
    }

    pub fn is_numerical(&self) -> bool {
        matches!(self, Self::NumericalFailure(_))
    }
}

pub type Result<T> = std::result::Result<T, PricingError>;
