//! Expectations of a nonlinear, increasing payoff of a log-normal latent level.
//!
//! The latent level `X = e^{mu + sigma·Z}` is a flat hazard rate or a par
//! spread. The center `mu` is never given directly: it is calibrated so that
//! the payoff's expectation matches a forward value, and the option payoff is
//! then integrated over the exercise region, optionally clipped to a barrier
//! region.

use std::sync::Arc;

use crate::calibration::solver::{Domain, Solver};
use crate::error::Result;
use crate::models::black::{norm_cdf, MIN_STD_DEV};
use crate::quadrature::{LogNormal, Quadrature};

/// Initial half-width of the bracket around the guessed center.
const CENTER_STEP: f64 = 0.25;

/// Fallback latent level when the caller's guess is unusable.
const DEFAULT_GUESS: f64 = 1e-4;

/// Closed interval of latent levels. Either end may be `0` or `+inf`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Region {
    pub lower: f64,
    pub upper: f64,
}

impl Region {
    pub const fn new(lower: f64, upper: f64) -> Self {
        Self { lower, upper }
    }

    /// `[0, +inf)`.
    pub const fn unbounded() -> Self {
        Self::new(0.0, f64::INFINITY)
    }

    pub fn is_unbounded(&self) -> bool {
        self.lower <= 0.0 && self.upper == f64::INFINITY
    }

    pub fn contains(&self, level: f64) -> bool {
        level >= self.lower && level <= self.upper
    }

    pub fn is_empty(&self) -> bool {
        !(self.lower < self.upper)
    }
}

impl Default for Region {
    fn default() -> Self {
        Self::unbounded()
    }
}

#[derive(Debug, Clone)]
pub struct NonlinearLogNormal {
    quadrature: Arc<Quadrature>,
    solver: Solver,
}

impl NonlinearLogNormal {
    pub fn new(quadrature: Arc<Quadrature>, solver: Solver) -> Self {
        Self { quadrature, solver }
    }

    pub fn quadrature(&self) -> &Quadrature {
        &self.quadrature
    }

    pub fn solver(&self) -> &Solver {
        &self.solver
    }

    /// `E[payoff(X)]`. With the adaptive integrator and a `split` level the
    /// integral is taken as the sum of the two tails either side of it, which
    /// keeps a kink of the payoff on a panel boundary.
    pub fn expectation<P>(
        &self,
        payoff: &P,
        mu: f64,
        sigma: f64,
        split: Option<f64>,
    ) -> Result<f64>
    where
        P: Fn(f64) -> Result<f64>,
    {
        match split {
            Some(cut) if !self.quadrature.uses_nodes() && cut > 0.0 && cut.is_finite() => {
                let left = self.quadrature.left_expectation(mu, sigma, cut, payoff)?;
                let right = self.quadrature.right_expectation(mu, sigma, cut, payoff)?;
                Ok(left + right)
            }
            _ => self.quadrature.expectation(mu, sigma, payoff),
        }
    }

    /// Solve `mu` such that `E[payoff(e^{mu + sigma·Z})] == target`.
    pub fn calibrate_center<P>(
        &self,
        payoff: &P,
        target: f64,
        sigma: f64,
        mu_guess: f64,
        split: Option<f64>,
    ) -> Result<f64>
    where
        P: Fn(f64) -> Result<f64>,
    {
        self.solver.solve_expanding(
            |mu| self.expectation(payoff, mu, sigma, split),
            target,
            mu_guess - CENTER_STEP,
            mu_guess + CENTER_STEP,
            Domain::unbounded(),
        )
    }

    /// Latent level at which the increasing `payoff` reaches `level`.
    ///
    /// Levels at or below `payoff(0)` map to `0`; levels at or above
    /// `payoff(+inf)` map to `+inf`.
    pub fn solve_level<P>(&self, payoff: &P, level: f64, guess: f64) -> Result<f64>
    where
        P: Fn(f64) -> Result<f64>,
    {
        if payoff(0.0)? >= level {
            return Ok(0.0);
        }
        if payoff(f64::INFINITY)? <= level {
            return Ok(f64::INFINITY);
        }
        let start = usable_guess(guess);
        self.solver.solve_expanding(
            |x| payoff(x),
            level,
            0.5 * start,
            2.0 * start,
            Domain::non_negative(),
        )
    }

    /// Undiscounted expected payoff `E[max(±(payoff(X) − strike), 0)·1{X in region}]`
    /// after calibrating `E[payoff(X)] == forward`.
    #[allow(clippy::too_many_arguments)]
    pub fn calculate_value<P>(
        &self,
        payoff: &P,
        forward: f64,
        strike: f64,
        guess: f64,
        sigma: f64,
        is_call: bool,
        region: Region,
    ) -> Result<f64>
    where
        P: Fn(f64) -> Result<f64>,
    {
        let sign = if is_call { 1.0 } else { -1.0 };
        if sigma < MIN_STD_DEV {
            if !self.deterministic_level_in(payoff, forward, guess, region)? {
                return Ok(0.0);
            }
            return Ok((sign * (forward - strike)).max(0.0));
        }

        let mu = self.center(payoff, forward, guess, sigma)?;
        let exercise = self.exercise_region(payoff, strike, guess, is_call, region)?;
        self.quadrature
            .between_expectation(mu, sigma, exercise.lower, exercise.upper, |x| {
                Ok(sign * (payoff(x)? - strike))
            })
    }

    /// Probability that the option finishes in the money inside `region`.
    #[allow(clippy::too_many_arguments)]
    pub fn calculate_probability<P>(
        &self,
        payoff: &P,
        forward: f64,
        strike: f64,
        guess: f64,
        sigma: f64,
        is_call: bool,
        region: Region,
    ) -> Result<f64>
    where
        P: Fn(f64) -> Result<f64>,
    {
        if sigma < MIN_STD_DEV {
            let in_the_money = if is_call {
                forward > strike
            } else {
                forward < strike
            };
            let inside = self.deterministic_level_in(payoff, forward, guess, region)?;
            return Ok(if in_the_money && inside { 1.0 } else { 0.0 });
        }

        let exercise = self.exercise_region(payoff, strike, guess, is_call, region)?;
        if exercise.is_empty() {
            return Ok(0.0);
        }
        let mu = self.center(payoff, forward, guess, sigma)?;
        let latent = LogNormal::new(mu, sigma);
        let p = norm_cdf(latent.z_of(exercise.upper)) - norm_cdf(latent.z_of(exercise.lower));
        Ok(p.clamp(0.0, 1.0))
    }

    fn center<P>(&self, payoff: &P, forward: f64, guess: f64, sigma: f64) -> Result<f64>
    where
        P: Fn(f64) -> Result<f64>,
    {
        let mu_guess = usable_guess(guess).ln() - 0.5 * sigma * sigma;
        self.calibrate_center(payoff, forward, sigma, mu_guess, None)
    }

    /// Exercise region for the strike intersected with `region`.
    fn exercise_region<P>(
        &self,
        payoff: &P,
        strike: f64,
        guess: f64,
        is_call: bool,
        region: Region,
    ) -> Result<Region>
    where
        P: Fn(f64) -> Result<f64>,
    {
        let at_strike = self.solve_level(payoff, strike, guess)?;
        Ok(if is_call {
            Region::new(at_strike.max(region.lower), region.upper)
        } else {
            Region::new(region.lower, at_strike.min(region.upper))
        })
    }

    fn deterministic_level_in<P>(
        &self,
        payoff: &P,
        forward: f64,
        guess: f64,
        region: Region,
    ) -> Result<bool>
    where
        P: Fn(f64) -> Result<f64>,
    {
        if region.is_unbounded() {
            return Ok(true);
        }
        let level = self.solve_level(payoff, forward, guess)?;
        Ok(region.contains(level))
    }
}

fn usable_guess(guess: f64) -> f64 {
    if guess > 0.0 && guess.is_finite() {
        guess
    } else {
        DEFAULT_GUESS
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::calibration::config::QuadratureConfig;
    use crate::models::black::black;

    fn engine(node_count: usize) -> NonlinearLogNormal {
        let quadrature = Quadrature::from_config(&QuadratureConfig {
            node_count,
            ..QuadratureConfig::default()
        })
        .unwrap();
        NonlinearLogNormal::new(Arc::new(quadrature), Solver::default())
    }

    fn identity(x: f64) -> Result<f64> {
        Ok(x)
    }

    #[test]
    fn center_of_identity_payoff_is_martingale_center() {
        let sigma = 0.4;
        for e in [engine(0), engine(64)] {
            let mu = e.calibrate_center(&identity, 0.02, sigma, -3.0, None).unwrap();
            let expected = 0.02f64.ln() - 0.5 * sigma * sigma;
            assert!((mu - expected).abs() < 1e-9, "mu={mu}");
        }
    }

    #[test]
    fn identity_payoff_reproduces_black() {
        let e = engine(0);
        let (f, k, sigma) = (0.02, 0.025, 0.5);
        let call = e
            .calculate_value(&identity, f, k, f, sigma, true, Region::unbounded())
            .unwrap();
        let put = e
            .calculate_value(&identity, f, k, f, sigma, false, Region::unbounded())
            .unwrap();
        assert!((call - black(f, k, sigma, 1.0, true)).abs() < 1e-10);
        assert!((put - black(f, k, sigma, 1.0, false)).abs() < 1e-10);

        let p = e
            .calculate_probability(&identity, f, k, f, sigma, true, Region::unbounded())
            .unwrap();
        let expected = crate::models::black::lognormal_probability(f, k, sigma, true);
        assert!((p - expected).abs() < 1e-9);
    }

    #[test]
    fn region_clips_value_and_probability() {
        let e = engine(0);
        let (f, k, sigma) = (0.02, 0.02, 0.6);
        let full = e
            .calculate_value(&identity, f, k, f, sigma, true, Region::unbounded())
            .unwrap();
        let clipped = e
            .calculate_value(&identity, f, k, f, sigma, true, Region::new(0.0, 0.03))
            .unwrap();
        assert!(clipped > 0.0 && clipped < full);

        let empty = Region::new(0.0, k);
        assert_eq!(
            e.calculate_value(&identity, f, k, f, sigma, true, empty).unwrap(),
            0.0
        );
        assert_eq!(
            e.calculate_probability(&identity, f, k, f, sigma, true, empty)
                .unwrap(),
            0.0
        );
    }

    #[test]
    fn zero_sigma_is_intrinsic_inside_region() {
        let e = engine(0);
        let v = e
            .calculate_value(&identity, 0.03, 0.02, 0.03, 0.0, true, Region::unbounded())
            .unwrap();
        assert!((v - 0.01).abs() < 1e-15);
        let knocked_out = e
            .calculate_value(&identity, 0.03, 0.02, 0.03, 0.0, true, Region::new(0.0, 0.025))
            .unwrap();
        assert_eq!(knocked_out, 0.0);
    }

    #[test]
    fn solve_level_saturates_at_payoff_limits() {
        let e = engine(0);
        let bounded = |x: f64| -> Result<f64> {
            if x.is_infinite() {
                Ok(1.0)
            } else {
                Ok(x / (1.0 + x))
            }
        };
        assert_eq!(e.solve_level(&bounded, -0.5, 0.1).unwrap(), 0.0);
        assert_eq!(e.solve_level(&bounded, 1.0, 0.1).unwrap(), f64::INFINITY);
        let x = e.solve_level(&bounded, 0.5, 0.1).unwrap();
        assert!((x - 1.0).abs() < 1e-12);
    }
}
