pub mod black;
pub mod digital;
pub mod factory;
pub mod full_spread;
pub mod modified_black;
pub mod spread;

use crate::error::Result;

pub use digital::{PriceDigitalModel, SpreadDigitalModel};
pub use full_spread::{BarrierModel, FullSpreadModel};
pub use modified_black::ModifiedBlackModel;
pub use spread::{ArbitrageFreeSpreadModel, PriceModel, SpreadModel};

/// Common traits used by all valuation models
pub mod traits {
    use crate::error::Result;

    /// Valuation contract shared by every option model.
    ///
    /// Volatilities are annualized; the model converts them to a standard
    /// deviation over its time to expiry.
    pub trait OptionModel: Send + Sync + std::fmt::Debug {
        fn forward(&self) -> f64;
        fn strike(&self) -> f64;
        fn multiplier(&self) -> f64;
        fn is_call(&self) -> bool;
        /// Years to expiry.
        fn time(&self) -> f64;

        fn fair_value(&self, volatility: f64) -> Result<f64>;

        /// Probability in `[0, 1]` that the option is exercised.
        fn exercise_probability(&self, volatility: f64) -> Result<f64>;

        /// Volatility reproducing `fair_value`, or NaN when none exists in range.
        fn implied_volatility(&self, fair_value: f64) -> Result<f64>;
    }
}

/// Helpers shared by the model implementations
pub mod utils {
    use crate::calibration::config::ImpliedVolConfig;
    use crate::calibration::solver::Solver;
    use crate::error::{PricingError, Result};
    use crate::models::traits::OptionModel;

    /// Solver and bracket settings used to invert a model for volatility.
    #[derive(Debug, Clone, Default)]
    pub struct Inversion {
        pub solver: Solver,
        pub config: ImpliedVolConfig,
    }

    impl Inversion {
        pub fn new(solver: Solver, config: ImpliedVolConfig) -> Self {
            Self { solver, config }
        }
    }

    /// Reject negative or non-finite volatility inputs.
    pub fn check_volatility(volatility: f64) -> Result<f64> {
        if !(volatility >= 0.0) || !volatility.is_finite() {
            return Err(PricingError::input(format!(
                "volatility must be finite and non-negative, got {volatility}"
            )));
        }
        Ok(volatility)
    }

    /// Standard deviation of the log driver over `time` years.
    pub fn std_dev(volatility: f64, time: f64) -> f64 {
        volatility * time.max(0.0).sqrt()
    }

    /// Deterministic payoff `max(±(F − K), 0)` per unit multiplier.
    pub fn intrinsic(forward: f64, strike: f64, is_call: bool) -> f64 {
        let sign = if is_call { 1.0 } else { -1.0 };
        (sign * (forward - strike)).max(0.0)
    }

    /// Invert `model.fair_value` numerically.
    ///
    /// Out-of-domain prices, prices below the zero-volatility value and prices
    /// above the value at `max_volatility` give NaN; a price within
    /// `intrinsic_tolerance` of the zero-volatility value gives `0`. Failures
    /// of the model's own calibration propagate.
    pub fn invert_volatility<M>(model: &M, price: f64, inversion: &Inversion) -> Result<f64>
    where
        M: OptionModel + ?Sized,
    {
        if !(price > 0.0) || !(model.multiplier() > 0.0) {
            return Ok(f64::NAN);
        }

        let config = &inversion.config;
        let floor = model.fair_value(0.0)?;
        let gap = price - floor;
        if gap.abs() <= config.intrinsic_tolerance {
            return Ok(0.0);
        }
        if gap < 0.0 {
            return Ok(f64::NAN);
        }

        let mut bracket = None;
        for upper in config.upper_brackets() {
            if model.fair_value(upper)? >= price {
                bracket = Some(upper);
                break;
            }
        }
        let Some(upper) = bracket else {
            return Ok(f64::NAN);
        };

        inversion
            .solver
            .solve(|v| model.fair_value(v), price, 0.0, upper)
    }
}

use traits::OptionModel;

/// Closed set of valuation models built by [`factory::build_model`].
#[derive(Debug, Clone)]
pub enum ValuationModel {
    Spread(SpreadModel),
    Price(PriceModel),
    ArbitrageFreeSpread(ArbitrageFreeSpreadModel),
    ModifiedBlack(ModifiedBlackModel),
    FullSpread(FullSpreadModel),
    Barrier(BarrierModel),
    SpreadDigital(SpreadDigitalModel),
    PriceDigital(PriceDigitalModel),
}

impl ValuationModel {
    pub fn as_model(&self) -> &dyn OptionModel {
        match self {
            ValuationModel::Spread(m) => m,
            ValuationModel::Price(m) => m,
            ValuationModel::ArbitrageFreeSpread(m) => m,
            ValuationModel::ModifiedBlack(m) => m,
            ValuationModel::FullSpread(m) => m,
            ValuationModel::Barrier(m) => m,
            ValuationModel::SpreadDigital(m) => m,
            ValuationModel::PriceDigital(m) => m,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            ValuationModel::Spread(_) => "spread",
            ValuationModel::Price(_) => "price",
            ValuationModel::ArbitrageFreeSpread(_) => "arbitrage_free_spread",
            ValuationModel::ModifiedBlack(_) => "modified_black",
            ValuationModel::FullSpread(_) => "full_spread",
            ValuationModel::Barrier(_) => "barrier",
            ValuationModel::SpreadDigital(_) => "spread_digital",
            ValuationModel::PriceDigital(_) => "price_digital",
        }
    }
}

impl OptionModel for ValuationModel {
    fn forward(&self) -> f64 {
        self.as_model().forward()
    }

    fn strike(&self) -> f64 {
        self.as_model().strike()
    }

    fn multiplier(&self) -> f64 {
        self.as_model().multiplier()
    }

    fn is_call(&self) -> bool {
        self.as_model().is_call()
    }

    fn time(&self) -> f64 {
        self.as_model().time()
    }

    fn fair_value(&self, volatility: f64) -> Result<f64> {
        self.as_model().fair_value(volatility)
    }

    fn exercise_probability(&self, volatility: f64) -> Result<f64> {
        self.as_model().exercise_probability(volatility)
    }

    fn implied_volatility(&self, fair_value: f64) -> Result<f64> {
        self.as_model().implied_volatility(fair_value)
    }
}
