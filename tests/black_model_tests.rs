
use cdx_option_lib::models::traits::OptionModel;
use cdx_option_lib::{build_model, ModelType, OptionSpec, PriceModel, SpreadModel, ValuationModel};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use statrs::distribution::{ContinuousCDF, Normal};
use test_utils::{assert_close, create_context, create_test_config, spread_forwards};

const VOLS: [f64; 5] = [0.1, 0.3, 0.5, 1.0, 2.0];

/// Reference payer from the textbook formula `pv01·(m·Φ(d1) − Φ(d2))·K`.
fn reference_payer(f: f64, k: f64, v: f64, pv01: f64) -> f64 {
    let n = Normal::new(0.0, 1.0).unwrap();
    let m = f / k;
    let d1 = m.ln() / v + 0.5 * v;
    let d2 = d1 - v;
    pv01 * (m * n.cdf(d1) - n.cdf(d2)) * k
}

#[test]
fn test_reference_payer_value() {
    // F = 60bp, K = 75bp, 120% vol over one year, pv01 4.5, no coupon shift
    let context = create_context(create_test_config());
    let spec = OptionSpec::payer(0.0075, 0.0, 1.0);
    let forwards = spread_forwards(0.006, 4.5);

    let model = build_model(&spec, &forwards, ModelType::Black, &context).expect("spread model");
    assert!(matches!(model, ValuationModel::Spread(_)));

    let value = model.fair_value(1.2).expect("fair value");
    let expected = reference_payer(0.006, 0.0075, 1.2, 4.5);
    println!("payer value {value:.10} vs reference {expected:.10}");
    assert!((value / expected - 1.0).abs() < 1e-6);
    assert_close(value, 0.0105474, 5e-8, "hand value");
}

#[test]
fn test_zero_volatility_limit_and_monotonicity() {
    let f = 0.006;
    for &k in &[0.004, 0.006, 0.0075] {
        let payer = SpreadModel::new(f, k, 4.5, true, 1.0);
        let limit = payer.fair_value(1e-11).unwrap();
        assert_close(limit, (f - k).max(0.0) * 4.5, 1e-12, "intrinsic limit");
        assert_close(payer.fair_value(0.0).unwrap(), (f - k).max(0.0) * 4.5, 0.0, "zero vol");

        let mut last = payer.fair_value(0.0).unwrap();
        for v in (1..=40).map(|i| i as f64 * 0.05) {
            let value = payer.fair_value(v).unwrap();
            assert!(value >= last, "k={k} v={v}: {value} < {last}");
            last = value;
        }
    }
}

#[test]
fn test_forward_parity() {
    let (f, k, pv01) = (0.006, 0.0075, 4.5);
    for &v in &VOLS {
        let payer = SpreadModel::new(f, k, pv01, true, 0.75).fair_value(v).unwrap();
        let receiver = SpreadModel::new(f, k, pv01, false, 0.75).fair_value(v).unwrap();
        assert_close(payer - receiver, (f - k) * pv01, 1e-8, "spread parity");
    }

    let (uf, uk) = (-0.018, -0.011);
    for &v in &[0.005, 0.02, 0.1] {
        let payer = PriceModel::new(uf, uk, 0.98, true, 0.5).fair_value(v).unwrap();
        let receiver = PriceModel::new(uf, uk, 0.98, false, 0.5).fair_value(v).unwrap();
        assert_close(payer - receiver, (uf - uk) * 0.98, 1e-8, "price parity");
    }
}

#[test]
fn test_spread_model_round_trip() {
    for &is_call in &[true, false] {
        let model = SpreadModel::new(0.006, 0.0075, 4.5, is_call, 0.5);
        for &v in &VOLS {
            let price = model.fair_value(v).unwrap();
            let implied = model.implied_volatility(price).unwrap();
            println!("call={is_call} v={v}: price {price:.8e} implied {implied:.10}");
            assert_close(implied, v, 1e-4, "spread round trip");
        }
    }
}

#[test]
fn test_implied_volatility_outside_range_is_nan() {
    let model = SpreadModel::new(0.006, 0.0075, 4.5, false, 1.0);
    let intrinsic = (0.0075 - 0.006) * 4.5;
    assert!(model.implied_volatility(intrinsic * 0.5).unwrap().is_nan());
    assert!(model.implied_volatility(-1.0).unwrap().is_nan());
    // receiver value is capped by the strike
    assert!(model.implied_volatility(0.0075 * 4.5 * 1.01).unwrap().is_nan());
    assert_eq!(model.implied_volatility(intrinsic).unwrap(), 0.0);
}

#[test]
fn test_probability_bounds_and_strike_monotonicity() {
    let mut rng = StdRng::seed_from_u64(7);
    for _ in 0..200 {
        let f = rng.gen_range(0.001..0.05);
        let v = rng.gen_range(0.05..2.5);
        let t = rng.gen_range(0.05..2.0);
        let mut last = 1.0;
        for i in 0..20 {
            let k = f * (0.5 + 0.1 * i as f64);
            let payer = SpreadModel::new(f, k, 1.0, true, t);
            let receiver = SpreadModel::new(f, k, 1.0, false, t);
            let p = payer.exercise_probability(v).unwrap();
            let q = receiver.exercise_probability(v).unwrap();
            assert!((0.0..=1.0).contains(&p) && (0.0..=1.0).contains(&q));
            assert_close(p + q, 1.0, 1e-12, "payer + receiver probability");
            assert!(p <= last + 1e-15, "probability must fall with the strike");
            last = p;
        }
    }
}

#[test]
fn test_price_model_payer_is_price_put() {
    let context = create_context(create_test_config());
    let mut forwards = spread_forwards(0.006, 4.5);
    forwards.upfront = -0.018;
    forwards.strike_value = -0.011;
    forwards.discount_factor = 0.985;

    let payer = build_model(
        &OptionSpec::payer(0.0075, 0.01, 0.5),
        &forwards,
        ModelType::BlackPrice,
        &context,
    )
    .unwrap();
    assert!(matches!(payer, ValuationModel::Price(_)));
    assert_close(payer.multiplier(), 0.985, 1e-15, "price multiplier");
    // the forward upfront is below the strike upfront: payer out of the money
    assert_eq!(payer.exercise_probability(0.0).unwrap(), 0.0);
    assert!(payer.fair_value(0.05).unwrap() > 0.0);
}
