
use std::sync::Arc;

use cdx_option_lib::models::traits::OptionModel;
use cdx_option_lib::{
    build_model, CreditPricer, ForwardProvider, ModelType, ModifiedBlackModel, OptionSpec,
    SpreadModel, ValuationModel,
};
use test_utils::{
    assert_close, create_adaptive_test_config, create_context, create_provider,
    create_test_config, forwards_for, LinearAnnuityPricer, EXPIRY, PREMIUM,
};

const VOLS: [f64; 5] = [0.1, 0.3, 0.5, 1.0, 2.0];

fn modified_black(spec: &OptionSpec, adaptive: bool) -> ValuationModel {
    let config = if adaptive {
        create_adaptive_test_config()
    } else {
        create_test_config()
    };
    let context = create_context(config);
    let forwards = forwards_for(spec.strike);
    build_model(spec, &forwards, ModelType::ModifiedBlack, &context).expect("modified black")
}

#[test]
fn test_modified_black_round_trip() {
    for spec in [
        OptionSpec::payer(0.0075, PREMIUM, EXPIRY),
        OptionSpec::receiver(0.005, PREMIUM, EXPIRY),
    ] {
        let model = modified_black(&spec, false);
        for &v in &VOLS {
            let price = model.fair_value(v).expect("fair value");
            let implied = model.implied_volatility(price).expect("implied volatility");
            println!(
                "call={} v={v}: price {price:.8e} implied {implied:.10}",
                spec.is_call
            );
            assert!(price > 0.0);
            assert_close(implied, v, 1e-4, "modified black round trip");
        }
    }
}

#[test]
fn test_modified_black_parity() {
    let payer = modified_black(&OptionSpec::payer(0.0075, PREMIUM, EXPIRY), false);
    let receiver = modified_black(&OptionSpec::receiver(0.0075, PREMIUM, EXPIRY), false);
    for &v in &[0.2, 0.8, 1.5] {
        let diff = payer.fair_value(v).unwrap() - receiver.fair_value(v).unwrap();
        let expected = (payer.forward() - payer.strike()) * payer.multiplier();
        assert_close(diff, expected, 1e-8, "modified black parity");
    }
}

#[test]
fn test_reduces_to_black_with_constant_annuity() {
    let annuity = 4.2;
    let pricer = LinearAnnuityPricer::new(annuity);
    let (f, k) = (0.006, 0.0075);

    for config in [create_test_config(), create_adaptive_test_config()] {
        let context = create_context(config);
        let vols: &[f64] = if context.quadrature().uses_nodes() {
            &[0.2, 0.6, 1.2]
        } else {
            &[0.6]
        };
        for &is_call in &[true, false] {
            let model = ModifiedBlackModel::new(
                pricer.upfront(f),
                pricer.upfront(k),
                1.0,
                is_call,
                1.0,
                Arc::new(pricer.clone()),
                &context,
            );
            let black = SpreadModel::new(f, k, annuity, is_call, 1.0);
            for &v in vols {
                let mb = model.fair_value(v).unwrap();
                let reference = black.fair_value(v).unwrap();
                println!(
                    "nodes={} call={is_call} v={v}: {mb:.12} vs {reference:.12}",
                    context.quadrature().uses_nodes()
                );
                assert_close(mb, reference, 1e-9, "constant annuity value");

                let p = model.exercise_probability(v).unwrap();
                assert_close(p, black.exercise_probability(v).unwrap(), 1e-9, "probability");
            }
        }
    }
}

#[test]
fn test_node_and_adaptive_paths_agree() {
    let spec = OptionSpec::payer(0.0075, PREMIUM, EXPIRY);
    let nodes = modified_black(&spec, false).fair_value(0.6).unwrap();
    let adaptive = modified_black(&spec, true).fair_value(0.6).unwrap();
    println!("nodes {nodes:.12} adaptive {adaptive:.12}");
    assert!((nodes / adaptive - 1.0).abs() < 1e-4);
}

#[test]
fn test_calibration_recovers_forward_and_strike_spreads() {
    let spec = OptionSpec::payer(0.0075, PREMIUM, EXPIRY);
    let forwards = forwards_for(spec.strike);
    let model = modified_black(&spec, false);
    let ValuationModel::ModifiedBlack(mb) = &model else {
        panic!("expected modified black, got {}", model.name());
    };

    let v = 0.8;
    let sigma = v * EXPIRY.sqrt();
    let calibration = mb.calibrate(sigma).unwrap();
    assert!((calibration.forward_spread / forwards.value - 1.0).abs() < 1e-9);
    assert!((calibration.strike_spread / spec.strike - 1.0).abs() < 1e-9);
    // the spread mean moves away from the forward spread once A(S) varies
    let mean = (calibration.mu + 0.5 * sigma * sigma).exp();
    assert!((mean / forwards.value - 1.0).abs() > 1e-9);

    // Black with the annuity frozen at the strike is close but not equal
    let strike_annuity = mb.annuity_at_spread(spec.strike).unwrap();
    let frozen = SpreadModel::new(
        forwards.value,
        spec.strike,
        strike_annuity * model.multiplier(),
        true,
        EXPIRY,
    )
    .fair_value(v)
    .unwrap();
    let value = model.fair_value(v).unwrap();
    println!("modified black {value:.10} frozen annuity {frozen:.10}");
    assert!((value / frozen - 1.0).abs() > 1e-9);
    assert!((value / frozen - 1.0).abs() < 0.2);
}

#[test]
fn test_probability_falls_with_strike() {
    let provider = create_provider(&create_test_config());
    let context = create_context(create_test_config());
    let mut last = 1.0;
    for &k in &[0.003, 0.005, 0.006, 0.0075, 0.01, 0.02] {
        let spec = OptionSpec::payer(k, PREMIUM, EXPIRY);
        let forwards = provider.forwards(EXPIRY, k).unwrap();
        let model = build_model(&spec, &forwards, ModelType::ModifiedBlack, &context).unwrap();
        let p = model.exercise_probability(0.7).unwrap();
        assert!((0.0..=1.0).contains(&p));
        assert!(p < last, "k={k}: {p} >= {last}");
        last = p;
    }
}

#[test]
fn test_zero_volatility_is_intrinsic() {
    let spec = OptionSpec::payer(0.004, PREMIUM, EXPIRY);
    let model = modified_black(&spec, false);
    let intrinsic = (model.forward() - model.strike()).max(0.0) * model.multiplier();
    assert!(intrinsic > 0.0);
    assert_close(model.fair_value(0.0).unwrap(), intrinsic, 0.0, "zero vol");
    assert_eq!(model.exercise_probability(0.0).unwrap(), 1.0);
    assert!(model.implied_volatility(intrinsic * 0.9).unwrap().is_nan());
}

#[test]
fn test_unreachable_strike_is_numerical_failure() {
    // no spread gives an upfront below the zero-hazard annuity times -premium
    let context = create_context(create_test_config());
    let pricer: Arc<dyn CreditPricer> =
        Arc::from(context.pricer(EXPIRY, EXPIRY, PREMIUM).unwrap());
    let floor = -pricer.annuity(0.0) * PREMIUM;
    let model = ModifiedBlackModel::new(
        -0.01,
        floor - 0.01,
        1.0,
        false,
        EXPIRY,
        pricer,
        &context,
    );
    let err = model.fair_value(0.5).unwrap_err();
    assert!(err.is_numerical(), "unexpected error {err}");
}
