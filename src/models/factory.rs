//! Builds the valuation model for one option from its terms and forwards.
//!
//! Selection order: a barrier always selects [`BarrierModel`], then the digital
//! flag selects a digital variant, and only then is the requested
//! [`ModelType`] consulted.

use std::sync::Arc;

use crate::error::Result;
use crate::market::context::PricerContext;
use crate::market::forwards::Forwards;
use crate::market::pricer::CreditPricer;
use crate::model_params::{ModelType, OptionSpec};
use crate::models::{
    ArbitrageFreeSpreadModel, BarrierModel, FullSpreadModel, ModifiedBlackModel,
    PriceDigitalModel, PriceModel, SpreadDigitalModel, SpreadModel, ValuationModel,
};

pub fn build_model(
    spec: &OptionSpec,
    forwards: &Forwards,
    model_type: ModelType,
    context: &PricerContext,
) -> Result<ValuationModel> {
    spec.validate()?;
    forwards.validate()?;

    let model = if let Some(barrier) = spec.barrier {
        let forward_pricer = context.pricer(spec.expiry, spec.expiry, spec.premium)?;
        ValuationModel::Barrier(BarrierModel::new(
            full_spread_model(spec, forwards, context)?,
            barrier,
            forward_pricer.as_ref(),
            context.solver(),
            spec.digital,
        )?)
    } else if spec.digital {
        if model_type.is_price_quoted() {
            ValuationModel::PriceDigital(PriceDigitalModel::new(
                price_model(spec, forwards, context),
                context.inversion(),
            ))
        } else {
            ValuationModel::SpreadDigital(SpreadDigitalModel::new(modified_black_model(
                spec, forwards, context,
            )?))
        }
    } else {
        match model_type {
            ModelType::Black => ValuationModel::Spread(
                spread_model(spec, forwards, context)
                    .with_shift(forwards.factor * spec.premium * forwards.pv01),
            ),
            ModelType::BlackPrice => ValuationModel::Price(price_model(spec, forwards, context)),
            ModelType::BlackArbitrageFree => {
                let shift = if forwards.pv01 > 0.0 {
                    forwards.factor * forwards.front_end_protection / forwards.pv01
                } else {
                    0.0
                };
                ValuationModel::ArbitrageFreeSpread(ArbitrageFreeSpreadModel::new(
                    spread_model(spec, forwards, context),
                    shift,
                ))
            }
            ModelType::ModifiedBlack => {
                ValuationModel::ModifiedBlack(modified_black_model(spec, forwards, context)?)
            }
            ModelType::FullSpread => {
                ValuationModel::FullSpread(full_spread_model(spec, forwards, context)?)
            }
        }
    };

    context.diagnostics().debug(&format!(
        "built {} model (requested {model_type}, expiry {}, strike {})",
        model.name(),
        spec.expiry,
        spec.strike
    ));
    Ok(model)
}

/// [`build_model`] with the model type given by name, e.g. from a config file.
pub fn build_model_named(
    spec: &OptionSpec,
    forwards: &Forwards,
    model_name: &str,
    context: &PricerContext,
) -> Result<ValuationModel> {
    let model_type: ModelType = model_name.parse()?;
    build_model(spec, forwards, model_type, context)
}

/// Unshifted Black on the spread; the caller adds the shift.
fn spread_model(spec: &OptionSpec, forwards: &Forwards, context: &PricerContext) -> SpreadModel {
    SpreadModel::new(
        forwards.value,
        spec.strike,
        spec.multiplier * forwards.factor * forwards.pv01,
        spec.is_call,
        spec.expiry,
    )
    .with_inversion(context.inversion())
}

fn price_model(spec: &OptionSpec, forwards: &Forwards, context: &PricerContext) -> PriceModel {
    PriceModel::new(
        forwards.upfront,
        forwards.strike_value,
        spec.multiplier * forwards.factor * forwards.discount_factor,
        spec.is_call,
        spec.expiry,
    )
    .with_inversion(context.inversion())
}

fn modified_black_model(
    spec: &OptionSpec,
    forwards: &Forwards,
    context: &PricerContext,
) -> Result<ModifiedBlackModel> {
    let pricer: Arc<dyn CreditPricer> =
        Arc::from(context.pricer(spec.expiry, spec.expiry, spec.premium)?);
    Ok(ModifiedBlackModel::new(
        forwards.upfront,
        forwards.strike_value,
        spec.multiplier * forwards.factor * forwards.discount_factor,
        spec.is_call,
        spec.expiry,
        pricer,
        context,
    ))
}

fn full_spread_model(
    spec: &OptionSpec,
    forwards: &Forwards,
    context: &PricerContext,
) -> Result<FullSpreadModel> {
    let spot = context.pricer(0.0, 0.0, spec.premium)?;
    let pricer: Arc<dyn CreditPricer> = Arc::from(spot.with_settle(spec.expiry)?);
    Ok(FullSpreadModel::new(
        forwards.survival_probability * forwards.upfront + forwards.loss,
        forwards.strike_value,
        spec.multiplier * forwards.initial_factor * forwards.discount_factor,
        spec.is_call,
        spec.expiry,
        pricer,
        context,
    ))
}
