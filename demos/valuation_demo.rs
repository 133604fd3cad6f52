// demos/valuation_demo.rs

//! Demonstration of credit index option valuation
//!
//! This example shows how to:
//! 1. Build a forward snapshot from a flat-hazard index curve
//! 2. Value a strip of payers and receivers under every model
//! 3. Recover the volatility from a model price
//! 4. Value a knock-out payer and a digital payer

use std::sync::Arc;

use anyhow::Result;
use cdx_option_lib::models::traits::OptionModel;
use cdx_option_lib::{
    build_model, default_configs, imply_volatility, value_options, Barrier, CdsTerms,
    FlatForwardProvider, ForwardProvider, ModelType, OptionSpec, PricerContext, Solver,
};

fn main() -> Result<()> {
    println!("Credit Index Option Valuation Demo");
    println!("==================================");

    let terms = CdsTerms {
        maturity: 5.0,
        premium: 0.01,
        recovery_rate: 0.4,
        rate: 0.03,
        frequency: 4,
    };
    let expiry = 0.25;
    let volatility = 0.5;

    // Use fast configuration for the demo
    let config = default_configs::fast();
    let context = PricerContext::new(Arc::new(terms), config.clone())?;
    let provider = FlatForwardProvider::new(terms, 0.0095, Solver::new(config.solver))?;

    let atm = provider.forwards(expiry, 0.006)?;
    println!("\nStep 1: Forward snapshot at {expiry}y");
    println!("  Forward spread:   {:.2}bp", atm.value * 1e4);
    println!("  Forward upfront:  {:.6}", atm.upfront);
    println!("  Forward pv01:     {:.4}", atm.pv01);
    println!("  Front-end prot.:  {:.6}", atm.front_end_protection);

    println!("\nStep 2: Strip valuation at {:.0}% volatility", volatility * 100.0);
    let specs: Vec<OptionSpec> = [0.0045, 0.0055, 0.0065, 0.0075, 0.009]
        .iter()
        .flat_map(|&k| {
            [
                OptionSpec::payer(k, terms.premium, expiry),
                OptionSpec::receiver(k, terms.premium, expiry),
            ]
        })
        .collect();

    for model_type in [
        ModelType::Black,
        ModelType::BlackArbitrageFree,
        ModelType::ModifiedBlack,
        ModelType::FullSpread,
    ] {
        println!("\n  {model_type}");
        println!(
            "  {:<10} {:<10} {:<14} {:<10}",
            "Type", "Strike", "Value", "Prob"
        );
        println!("  {}", "-".repeat(46));
        for result in value_options(&specs, &provider, model_type, volatility, &context)? {
            println!(
                "  {:<10} {:<10} {:<14.8} {:<10.4}",
                if result.is_call { "payer" } else { "receiver" },
                format!("{:.1}bp", result.strike * 1e4),
                result.fair_value,
                result.exercise_probability
            );
        }
    }

    println!("\nStep 3: Implied volatility round trip");
    let spec = OptionSpec::payer(0.0075, terms.premium, expiry);
    let forwards = provider.forwards(expiry, spec.strike)?;
    let model = build_model(&spec, &forwards, ModelType::ModifiedBlack, &context)?;
    let price = model.fair_value(volatility)?;
    let implied = imply_volatility(&spec, &forwards, ModelType::ModifiedBlack, price, &context)?;
    println!("  Price {price:.8} implies {:.4}%", implied * 100.0);

    println!("\nStep 4: Exotic payers");
    let knock_out = spec.with_barrier(Barrier::new(0.0, 0.012)?);
    let barrier = build_model(&knock_out, &forwards, ModelType::FullSpread, &context)?;
    println!(
        "  Knock-out at 120bp: {:.8} (p = {:.4})",
        barrier.fair_value(volatility)?,
        barrier.exercise_probability(volatility)?
    );
    let digital = build_model(&spec.digital(), &forwards, ModelType::ModifiedBlack, &context)?;
    println!("  Digital payer:      {:.8}", digital.fair_value(volatility)?);

    Ok(())
}
