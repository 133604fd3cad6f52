//! # CDX-Option-Lib: Credit Index Option Valuation
//!
//! `cdx-option-lib` values payer and receiver options on a credit index, together with their
//! barrier and digital variants. Every model answers the same three questions for a volatility
//! input: fair value, exercise probability and, inversely, the implied volatility of a price.
//!
//! ## Core Features
//!
//! - **Black family**: Black on the forward spread, on the forward price `1 - upfront`, and an
//!   arbitrage-free variant shifted for front-end protection
//! - **Modified Black**: log-normal spread with a spread-dependent forward annuity, calibrated
//!   through nested hazard-rate solves
//! - **Full spread**: log-normal flat hazard rate driving the whole index value, with knock-out
//!   barriers and digital payoffs
//! - **Quadrature**: fixed Gauss-Hermite nodes or adaptive Gauss-Legendre integration, chosen
//!   by configuration
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use cdx_option_lib::{
//!     default_configs, value_option, CdsTerms, FlatForwardProvider, ForwardProvider,
//!     ModelType, OptionSpec, PricerContext, Solver,
//! };
//!
//! let terms = CdsTerms {
//!     maturity: 5.0,
//!     premium: 0.01,
//!     recovery_rate: 0.4,
//!     rate: 0.03,
//!     frequency: 4,
//! };
//! let config = default_configs::fast();
//! let context = PricerContext::new(Arc::new(terms), config.clone())?;
//!
//! // Forward snapshot for a 6m payer struck at 75bp
//! let provider = FlatForwardProvider::new(terms, 0.01, Solver::new(config.solver))?;
//! let spec = OptionSpec::payer(0.0075, 0.01, 0.5);
//! let forwards = provider.forwards(spec.expiry, spec.strike)?;
//!
//! let result = value_option(&spec, &forwards, ModelType::ModifiedBlack, 0.5, &context)?;
//! println!("{}: {:.6} (p = {:.3})", result.model, result.fair_value, result.exercise_probability);
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
//!
//! ## Model Selection
//!
//! [`build_model`] picks the model in a fixed order: a barrier always gives a barrier model,
//! the digital flag gives a digital model, and only then is the requested [`ModelType`] used.
//!
//! ## Configuration Presets
//!
//! - `production()`: adaptive integration with tight tolerances
//! - `fast()`: 64 Gauss-Hermite nodes
//! - `research()`: deeper adaptive panels and a wider tail
//! - `minimal()`: quick validation settings

// ================================================================================================
// MODULES
// ================================================================================================

pub mod calibration;
pub mod diagnostics;
pub mod error;
pub mod market;
pub mod model_params;
pub mod models;
pub mod quadrature;

// ================================================================================================
// IMPORTS
// ================================================================================================

use std::cmp::Ordering;

use models::traits::OptionModel;

// ================================================================================================
// PUBLIC RE-EXPORTS
// ================================================================================================

// Configuration and numerics
pub use calibration::{
    config::{ImpliedVolConfig, QuadratureConfig, SolverConfig, ValuationConfig},
    expectation::{NonlinearLogNormal, Region},
    solver::{Domain, Solver},
};

// Errors and diagnostics
pub use diagnostics::{Diagnostics, RecordingDiagnostics, Severity, TracingDiagnostics};
pub use error::{PricingError, Result};

// Market collaborators
pub use market::{
    hazard_for_spread, CdsTerms, CreditPricer, DiscountCurve, FlatDiscountCurve,
    FlatForwardProvider, FlatSurvivalCurve, ForwardProvider, Forwards, IndexCdsPricer,
    PricerContext, PricerSource, SurvivalCurve,
};

// Option terms and models
pub use model_params::{Barrier, ModelType, OptionSpec};
pub use models::{
    factory::{build_model, build_model_named},
    ArbitrageFreeSpreadModel, BarrierModel, FullSpreadModel, ModifiedBlackModel,
    PriceDigitalModel, PriceModel, SpreadDigitalModel, SpreadModel, ValuationModel,
};
pub use quadrature::{Quadrature, QuadratureNodes};

// ================================================================================================
// DEFAULT CONFIGURATIONS
// ================================================================================================

/// Pre-configured valuation settings for common use cases.
///
/// # Available Configurations
///
/// - [`production()`]: Adaptive integration for end-of-day marks
/// - [`fast()`]: Fixed Gauss-Hermite nodes for intraday use
/// - [`research()`]: High-precision settings for model validation
/// - [`minimal()`]: Quick validation settings
pub mod default_configs {
    use crate::calibration::config::ValuationConfig;

    /// Production configuration using the adaptive integrator.
    ///
    /// **Characteristics:**
    /// - Adaptive Gauss-Legendre panels over `|z| <= 8.5`
    /// - Relative root tolerance: 1e-14
    /// - Implied volatility search up to 1600%
    ///
    /// # Example
    ///
    /// ```rust
    /// use cdx_option_lib::default_configs;
    ///
    /// let config = default_configs::production();
    /// assert_eq!(config.quadrature.node_count, 0);
    /// ```
    pub fn production() -> ValuationConfig {
        ValuationConfig::production()
    }

    /// Fast configuration using 64 Gauss-Hermite nodes.
    ///
    /// **Characteristics:**
    /// - Fixed node table, annuity correlation term on the nodes
    /// - Relative root tolerance: 1e-12
    /// - Maximum Brent iterations: 1,000
    ///
    /// # Example
    ///
    /// ```rust
    /// use cdx_option_lib::default_configs;
    ///
    /// let config = default_configs::fast();
    /// assert_eq!(config.quadrature.node_count, 64);
    /// ```
    pub fn fast() -> ValuationConfig {
        ValuationConfig::fast()
    }

    /// High-precision configuration for research and model validation.
    ///
    /// **Characteristics:**
    /// - Adaptive panels up to depth 24 over `|z| <= 9.5`
    /// - Relative root tolerance: 1e-15
    /// - Implied volatility search up to 3200%
    ///
    /// # Example
    ///
    /// ```rust
    /// use cdx_option_lib::default_configs;
    ///
    /// let config = default_configs::research();
    /// assert!(config.quadrature.z_max > 9.0);
    /// ```
    pub fn research() -> ValuationConfig {
        ValuationConfig::research()
    }

    /// Minimal configuration for quick validation and debugging.
    ///
    /// **Characteristics:**
    /// - 24 Gauss-Hermite nodes
    /// - Relative root tolerance: 1e-9
    /// - Lower accuracy, suitable for smoke tests
    ///
    /// # Example
    ///
    /// ```rust
    /// use cdx_option_lib::default_configs;
    ///
    /// let config = default_configs::minimal();
    /// assert_eq!(config.quadrature.node_count, 24);
    /// ```
    pub fn minimal() -> ValuationConfig {
        ValuationConfig::minimal()
    }
}

/// Outcome of valuing one option at one volatility.
#[derive(Debug, Clone, PartialEq)]
pub struct ValuationResult {
    /// Name of the model that produced the numbers.
    pub model: &'static str,
    pub is_call: bool,
    pub strike: f64,
    pub fair_value: f64,
    pub exercise_probability: f64,
}

/// Build the model for `spec` and value it at `volatility`.
///
/// # Errors
///
/// * [`PricingError::InvalidConfiguration`] for invalid option terms or barriers
/// * [`PricingError::InvalidInput`] for negative volatilities or inconsistent forwards
/// * [`PricingError::NumericalFailure`] when a nested calibration does not converge
///
/// # Example
///
/// ```rust,no_run
/// use cdx_option_lib::{value_option, ModelType, OptionSpec};
/// # use cdx_option_lib::{Forwards, PricerContext};
/// # fn run(forwards: &Forwards, context: &PricerContext) -> cdx_option_lib::Result<()> {
/// let spec = OptionSpec::receiver(0.005, 0.01, 0.25);
/// let result = value_option(&spec, forwards, ModelType::Black, 0.45, context)?;
/// assert!(result.exercise_probability <= 1.0);
/// # Ok(())
/// # }
/// ```
pub fn value_option(
    spec: &OptionSpec,
    forwards: &Forwards,
    model_type: ModelType,
    volatility: f64,
    context: &PricerContext,
) -> Result<ValuationResult> {
    let model = build_model(spec, forwards, model_type, context)?;
    Ok(ValuationResult {
        model: model.name(),
        is_call: spec.is_call,
        strike: spec.strike,
        fair_value: model.fair_value(volatility)?,
        exercise_probability: model.exercise_probability(volatility)?,
    })
}

/// Volatility at which the model for `spec` reproduces `price`.
///
/// Returns NaN when no volatility in range reproduces the price, e.g. a price
/// below intrinsic value.
pub fn imply_volatility(
    spec: &OptionSpec,
    forwards: &Forwards,
    model_type: ModelType,
    price: f64,
    context: &PricerContext,
) -> Result<f64> {
    build_model(spec, forwards, model_type, context)?.implied_volatility(price)
}

/// Value a strip of options at one volatility, fetching forwards per option.
///
/// Results are sorted by strike, receivers before payers at equal strikes.
pub fn value_options(
    specs: &[OptionSpec],
    provider: &dyn ForwardProvider,
    model_type: ModelType,
    volatility: f64,
    context: &PricerContext,
) -> Result<Vec<ValuationResult>> {
    let mut results = Vec::with_capacity(specs.len());
    for spec in specs {
        let forwards = provider.forwards(spec.expiry, spec.strike)?;
        results.push(value_option(spec, &forwards, model_type, volatility, context)?);
    }

    results.sort_by(|a, b| {
        a.strike
            .partial_cmp(&b.strike)
            .unwrap_or(Ordering::Equal)
            .then(a.is_call.cmp(&b.is_call))
    });
    Ok(results)
}
