
use std::sync::Arc;

use cdx_option_lib::models::traits::OptionModel;
use cdx_option_lib::{
    build_model, build_model_named, imply_volatility, value_option, value_options, Barrier,
    ForwardProvider, ModelType, OptionSpec, PricerContext, PricingError, RecordingDiagnostics,
    Severity, ValuationConfig, ValuationModel,
};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use test_utils::{
    assert_close, create_context, create_provider, create_test_config, forwards_for, index_terms,
    EXPIRY, PREMIUM,
};

#[test]
fn test_dispatch_order() {
    let context = create_context(create_test_config());
    let forwards = forwards_for(0.0075);
    let vanilla = OptionSpec::payer(0.0075, PREMIUM, EXPIRY);
    let barrier = Barrier::new(0.002, 0.02).unwrap();

    let expected = [
        (ModelType::Black, "spread"),
        (ModelType::BlackPrice, "price"),
        (ModelType::BlackArbitrageFree, "arbitrage_free_spread"),
        (ModelType::ModifiedBlack, "modified_black"),
        (ModelType::FullSpread, "full_spread"),
    ];
    for (model_type, name) in expected {
        let model = build_model(&vanilla, &forwards, model_type, &context).unwrap();
        assert_eq!(model.name(), name, "{model_type}");

        // a barrier wins over everything, digital or not
        for spec in [vanilla.with_barrier(barrier), vanilla.with_barrier(barrier).digital()] {
            let model = build_model(&spec, &forwards, model_type, &context).unwrap();
            assert!(matches!(model, ValuationModel::Barrier(_)), "{model_type}");
        }

        // then the digital flag, price-quoted or spread-quoted
        let digital = build_model(&vanilla.digital(), &forwards, model_type, &context).unwrap();
        if model_type == ModelType::BlackPrice {
            assert!(matches!(digital, ValuationModel::PriceDigital(_)));
        } else {
            assert!(matches!(digital, ValuationModel::SpreadDigital(_)));
        }
    }
}

#[test]
fn test_arbitrage_free_shift_is_front_end_protection_per_annuity() {
    let context = create_context(create_test_config());
    let forwards = forwards_for(0.0075);
    let spec = OptionSpec::payer(0.0075, PREMIUM, EXPIRY);
    let model = build_model(&spec, &forwards, ModelType::BlackArbitrageFree, &context).unwrap();
    let ValuationModel::ArbitrageFreeSpread(shifted) = &model else {
        panic!("expected arbitrage-free spread model, got {}", model.name());
    };
    let expected = forwards.factor * forwards.front_end_protection / forwards.pv01;
    assert!(expected > 0.0);
    assert_close(shifted.shift(), expected, 1e-15, "front-end shift");
    // a spread-sized shift, far below the annuity itself
    assert!(shifted.shift() < forwards.value);
}

#[test]
fn test_context_rejects_unbounded_vol_ladder() {
    let mut flat = create_test_config();
    flat.implied_vol.growth = 1.0;
    let mut zero = create_test_config();
    zero.implied_vol.initial_upper = 0.0;

    for config in [flat, zero] {
        let err = PricerContext::new(Arc::new(index_terms()), config).unwrap_err();
        assert!(matches!(err, PricingError::InvalidConfiguration(_)), "{err}");
    }
}

#[test]
fn test_build_model_named() {
    let context = create_context(create_test_config());
    let forwards = forwards_for(0.0075);
    let spec = OptionSpec::receiver(0.0075, PREMIUM, EXPIRY);

    let model = build_model_named(&spec, &forwards, "Modified-Black", &context).unwrap();
    assert!(matches!(model, ValuationModel::ModifiedBlack(_)));

    let err = build_model_named(&spec, &forwards, "sabr", &context).unwrap_err();
    assert!(matches!(err, PricingError::InvalidConfiguration(_)), "{err}");
}

#[test]
fn test_invalid_terms_are_rejected() {
    let context = create_context(create_test_config());
    let forwards = forwards_for(0.0075);

    let expired = OptionSpec::payer(0.0075, PREMIUM, 0.0);
    let err = build_model(&expired, &forwards, ModelType::Black, &context).unwrap_err();
    assert!(matches!(err, PricingError::InvalidConfiguration(_)));

    let mut inverted = OptionSpec::payer(0.0075, PREMIUM, EXPIRY);
    inverted.barrier = Some(Barrier { lower: 0.02, upper: 0.01 });
    let err = build_model(&inverted, &forwards, ModelType::Black, &context).unwrap_err();
    assert!(matches!(err, PricingError::InvalidConfiguration(_)));

    let mut broken = forwards;
    broken.pv01 = f64::NAN;
    let spec = OptionSpec::payer(0.0075, PREMIUM, EXPIRY);
    let err = build_model(&spec, &broken, ModelType::Black, &context).unwrap_err();
    assert!(matches!(err, PricingError::InvalidInput(_)));

    let model = build_model(&spec, &forwards, ModelType::Black, &context).unwrap();
    assert!(matches!(model.fair_value(-0.1), Err(PricingError::InvalidInput(_))));
}

#[test]
fn test_value_option_and_imply_volatility() {
    let context = create_context(create_test_config());
    let spec = OptionSpec::payer(0.0075, PREMIUM, EXPIRY).with_multiplier(10.0);
    let forwards = forwards_for(spec.strike);

    for model_type in ModelType::ALL {
        let result = value_option(&spec, &forwards, model_type, 0.6, &context).unwrap();
        println!("{model_type}: {:.10} p={:.6}", result.fair_value, result.exercise_probability);
        assert!(result.is_call);
        assert_eq!(result.strike, spec.strike);
        assert!(result.fair_value > 0.0);
        assert!((0.0..=1.0).contains(&result.exercise_probability));

        // price-quoted volatilities live on a different scale
        let vol = if model_type.is_price_quoted() {
            0.02
        } else {
            0.6
        };
        let price = value_option(&spec, &forwards, model_type, vol, &context)
            .unwrap()
            .fair_value;
        let implied = imply_volatility(&spec, &forwards, model_type, price, &context).unwrap();
        assert_close(implied, vol, 1e-4 * vol.max(1.0), "implied volatility");
    }
}

#[test]
fn test_value_options_sorted_by_strike() {
    let config = create_test_config();
    let context = create_context(config.clone());
    let provider = create_provider(&config);
    let specs = [
        OptionSpec::payer(0.009, PREMIUM, EXPIRY),
        OptionSpec::receiver(0.0045, PREMIUM, EXPIRY),
        OptionSpec::payer(0.006, PREMIUM, EXPIRY),
        OptionSpec::receiver(0.006, PREMIUM, EXPIRY),
    ];

    let results = value_options(&specs, &provider, ModelType::Black, 0.5, &context).unwrap();
    let order: Vec<(f64, bool)> = results.iter().map(|r| (r.strike, r.is_call)).collect();
    assert_eq!(
        order,
        vec![(0.0045, false), (0.006, false), (0.006, true), (0.009, true)]
    );
    assert!(results.iter().all(|r| r.model == "spread"));
}

#[test]
fn test_loose_calibration_reports_precision_warning() {
    let mut config = create_test_config();
    config.solver.tol_x = 1e-3;
    config.solver.tol_f = 1e-3;
    config.precision_tolerance = 0.0;
    let recorder = Arc::new(RecordingDiagnostics::new());
    let context = create_context(config).with_diagnostics(recorder.clone());

    let spec = OptionSpec::payer(0.0075, PREMIUM, EXPIRY);
    let forwards = forwards_for(spec.strike);
    let model = build_model(&spec, &forwards, ModelType::ModifiedBlack, &context).unwrap();
    assert_eq!(recorder.count(Severity::Debug), 1);

    let value = model.fair_value(0.5).unwrap();
    assert!(value.is_finite());
    let warnings = recorder.count(Severity::Warn);
    assert!(warnings > 0, "expected precision warnings");
    assert!(recorder
        .entries()
        .iter()
        .any(|(s, m)| *s == Severity::Warn && m.contains("residual")));
}

#[test]
fn test_tight_calibration_is_silent() {
    let mut config = ValuationConfig::fast();
    config.precision_tolerance = 1e-8;
    let recorder = Arc::new(RecordingDiagnostics::new());
    let context = create_context(config).with_diagnostics(recorder.clone());

    let spec = OptionSpec::receiver(0.006, PREMIUM, EXPIRY);
    let forwards = forwards_for(spec.strike);
    let model = build_model(&spec, &forwards, ModelType::ModifiedBlack, &context).unwrap();
    model.fair_value(0.5).unwrap();
    assert_eq!(recorder.count(Severity::Warn), 0);
}

#[test]
fn test_random_terms_respect_bounds() {
    let mut rng = StdRng::seed_from_u64(42);
    let context = create_context(create_test_config());
    let provider = create_provider(&create_test_config());
    let models = [
        ModelType::Black,
        ModelType::BlackArbitrageFree,
        ModelType::ModifiedBlack,
    ];

    for _ in 0..20 {
        let strike = rng.gen_range(0.003..0.02);
        let expiry = rng.gen_range(0.1..1.0);
        let vol = rng.gen_range(0.1..1.5);
        let is_call = rng.gen_bool(0.5);
        let spec = if is_call {
            OptionSpec::payer(strike, PREMIUM, expiry)
        } else {
            OptionSpec::receiver(strike, PREMIUM, expiry)
        };
        let forwards = provider.forwards(expiry, strike).unwrap();

        for model_type in models {
            let model = build_model(&spec, &forwards, model_type, &context).unwrap();
            let value = model.fair_value(vol).unwrap();
            let p = model.exercise_probability(vol).unwrap();
            let moneyness = if model.is_call() {
                model.forward() - model.strike()
            } else {
                model.strike() - model.forward()
            };
            let intrinsic = moneyness.max(0.0) * model.multiplier();
            assert!(value >= intrinsic - 1e-10, "{model_type}: {value} < {intrinsic}");
            assert!((0.0..=1.0).contains(&p), "{model_type}: p = {p}");
        }
    }
}
