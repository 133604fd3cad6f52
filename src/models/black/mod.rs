// Forward-measure Black arithmetic shared by every valuation model: normal
// CDF and its inverse, undiscounted Black value, exercise probability and
// implied standard deviation.

use crate::calibration::config::ImpliedVolConfig;
use crate::calibration::solver::Solver;

/// Standard deviations below this are treated as deterministic.
pub const MIN_STD_DEV: f64 = 1e-12;

/// Standard normal CDF, accurate deep into both tails.
pub fn norm_cdf(x: f64) -> f64 {
    0.5 * libm::erfc(-x / std::f64::consts::SQRT_2)
}

/// Inverse standard normal CDF. Returns `±inf` at the end points and NaN outside `[0, 1]`.
pub fn norm_inv_cdf(p: f64) -> f64 {
    if !(0.0..=1.0).contains(&p) {
        return f64::NAN;
    }
    if p == 0.0 {
        return f64::NEG_INFINITY;
    }
    if p == 1.0 {
        return f64::INFINITY;
    }
    -std::f64::consts::SQRT_2 * statrs::function::erf::erfc_inv(2.0 * p)
}

/// Normalized Black value `B(m, v) = m·Φ(d1) − Φ(d2)` for moneyness `m`.
fn normalized_black(moneyness: f64, std_dev: f64) -> f64 {
    let d1 = moneyness.ln() / std_dev + 0.5 * std_dev;
    let d2 = d1 - std_dev;
    moneyness * norm_cdf(d1) - norm_cdf(d2)
}

fn intrinsic(forward: f64, strike: f64, is_call: bool) -> f64 {
    let sign = if is_call { 1.0 } else { -1.0 };
    (sign * (forward - strike)).max(0.0)
}

/// Black value of the out-of-the-money side per unit multiplier.
fn out_of_the_money_black(forward: f64, strike: f64, std_dev: f64, is_call: bool) -> f64 {
    let value = if is_call {
        normalized_black(forward / strike, std_dev) * strike
    } else {
        normalized_black(strike / forward, std_dev) * forward
    };
    value.max(0.0)
}

/// Undiscounted Black value of a call (`is_call`) or put on `forward`.
///
/// In-the-money options are valued as intrinsic plus the opposite option, so
/// the value never drops below intrinsic.
pub fn black(forward: f64, strike: f64, std_dev: f64, multiplier: f64, is_call: bool) -> f64 {
    if std_dev < MIN_STD_DEV || strike <= 0.0 || forward <= 0.0 {
        return intrinsic(forward, strike, is_call) * multiplier;
    }
    let in_the_money = if is_call {
        forward > strike
    } else {
        forward < strike
    };
    let value = if in_the_money {
        intrinsic(forward, strike, is_call)
            + out_of_the_money_black(forward, strike, std_dev, !is_call)
    } else {
        out_of_the_money_black(forward, strike, std_dev, is_call)
    };
    value * multiplier
}

/// Probability that a log-normal forward finishes in the money.
pub fn lognormal_probability(forward: f64, strike: f64, std_dev: f64, is_call: bool) -> f64 {
    if std_dev <= 0.0 || forward <= 0.0 || strike <= 0.0 {
        let itm = if is_call {
            forward > strike
        } else {
            forward < strike
        };
        return if itm { 1.0 } else { 0.0 };
    }
    let u = (forward / strike).ln() / std_dev - 0.5 * std_dev;
    if is_call {
        norm_cdf(u)
    } else {
        norm_cdf(-u)
    }
}

/// Standard deviation `v` with `black(forward, strike, v, multiplier, is_call) == fair_value`.
///
/// Returns NaN for out-of-domain input, for prices below intrinsic or at or
/// above the no-arbitrage bound, and when no bracket is found below
/// `config.max_volatility`. Prices within `config.intrinsic_tolerance` of
/// intrinsic return `0`.
pub fn implied_std_dev(
    fair_value: f64,
    forward: f64,
    strike: f64,
    multiplier: f64,
    is_call: bool,
    solver: &Solver,
    config: &ImpliedVolConfig,
) -> f64 {
    if !(fair_value > 0.0) || !(multiplier > 0.0) || !(forward > 0.0) || !(strike > 0.0) {
        return f64::NAN;
    }

    // Work in units of the strike (call) or forward (put) so B(m, v) is the target.
    let (moneyness, scale) = if is_call {
        (forward / strike, strike)
    } else {
        (strike / forward, forward)
    };
    let target = fair_value / (multiplier * scale);
    let gap = target - (moneyness - 1.0).max(0.0);

    if gap.abs() <= config.intrinsic_tolerance {
        return 0.0;
    }
    if gap < 0.0 || target >= moneyness {
        return f64::NAN;
    }

    // Invert the time value of the out-of-the-money side; in call units the
    // opposite option is worth `m·B(1/m, v)`.
    let objective = |v: f64| {
        let v = v.max(MIN_STD_DEV);
        if moneyness > 1.0 {
            moneyness * normalized_black(1.0 / moneyness, v)
        } else {
            normalized_black(moneyness, v)
        }
    };
    let Some(upper) = config.upper_brackets().find(|&u| objective(u) >= gap) else {
        return f64::NAN;
    };

    solver
        .solve(|v| Ok(objective(v)), gap, 0.0, upper)
        .unwrap_or(f64::NAN)
}
